//! Evaluation event stream and its standard consumers.

use asperity_base::{Interpretation, Literal, Result};
use asperity_ground::{ExternalAtomId, Registry, Symbol};

/// One step of an external-atom evaluation.
#[derive(Debug, Clone, Copy)]
pub enum EvalEvent<'a> {
    /// The external atom under consideration. Emitted once, first.
    Atom(ExternalAtomId),
    /// One concrete input tuple (the constant inputs; predicate inputs
    /// travel in the query's projected interpretation).
    Input(&'a [Symbol]),
    /// One returned output tuple, already arity-checked.
    Output(&'a [Symbol]),
}

/// Consumer of an evaluation event stream.
pub trait EvalSink {
    /// Accepts one event.
    fn on_event(&mut self, registry: &Registry, event: EvalEvent<'_>) -> Result<()>;
}

/// Standard consumer: integrates every output tuple as a fact into an
/// output interpretation. Reusable across several external atoms; the
/// `Atom` event switches the auxiliary lookup target.
#[derive(Debug, Default)]
pub struct OutputIntegrator {
    current: Option<ExternalAtomId>,
    output: Interpretation,
}

impl OutputIntegrator {
    /// Creates an integrator with an empty output interpretation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The accumulated output interpretation.
    #[must_use]
    pub fn output(&self) -> &Interpretation {
        &self.output
    }

    /// Consumes the integrator, yielding the output interpretation.
    #[must_use]
    pub fn into_output(self) -> Interpretation {
        self.output
    }
}

impl EvalSink for OutputIntegrator {
    fn on_event(&mut self, registry: &Registry, event: EvalEvent<'_>) -> Result<()> {
        match event {
            EvalEvent::Atom(e) => self.current = Some(e),
            EvalEvent::Input(_) => {}
            EvalEvent::Output(tuple) => {
                if let Some(e) = self.current {
                    // Tuples without a registered auxiliary were never
                    // grounded into the program and carry no information
                    // for the check.
                    if let Some(aux) = registry.lookup_external_aux(e, tuple, false) {
                        self.output.set(aux);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Standard consumer: verifies outputs against a prior positive/negative
/// guess, recording the first falsified guess literal.
#[derive(Debug)]
pub struct GuessVerifier<'a> {
    guess: &'a Interpretation,
    current: Option<ExternalAtomId>,
    seen: Interpretation,
    falsified: Option<Literal>,
}

impl<'a> GuessVerifier<'a> {
    /// Creates a verifier against the guessed auxiliary truth values.
    #[must_use]
    pub fn new(guess: &'a Interpretation) -> Self {
        Self {
            guess,
            current: None,
            seen: Interpretation::new(),
            falsified: None,
        }
    }

    /// Closes the stream against the auxiliaries the external atom could
    /// have produced: a guessed-true auxiliary that never showed up
    /// falsifies its positive guess.
    pub fn finish(&mut self, output_mask: &Interpretation) {
        if self.falsified.is_some() {
            return;
        }
        for aux in output_mask.iter() {
            if self.guess.get(aux) && !self.seen.get(aux) {
                self.falsified = Some(Literal::pos(aux));
                return;
            }
        }
    }

    /// The first falsified guess literal, if any.
    #[must_use]
    pub fn falsified(&self) -> Option<Literal> {
        self.falsified
    }

    /// Whether the guess survived so far.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.falsified.is_none()
    }
}

impl EvalSink for GuessVerifier<'_> {
    fn on_event(&mut self, registry: &Registry, event: EvalEvent<'_>) -> Result<()> {
        match event {
            EvalEvent::Atom(e) => self.current = Some(e),
            EvalEvent::Input(_) => {}
            EvalEvent::Output(tuple) => {
                if let (Some(e), None) = (self.current, self.falsified) {
                    if let Some(aux) = registry.lookup_external_aux(e, tuple, false) {
                        self.seen.set(aux);
                        if !self.guess.get(aux) {
                            // Guessed false, actually output.
                            self.falsified = Some(Literal::neg(aux));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
