//! On-demand model enumeration over a nogood store.

use asperity_base::{AtomId, Interpretation, Literal, Nogood};
use tracing::trace;

use crate::propagate::{propagate, propagate_all, PropagationResult, SearchState};
use crate::store::NogoodStore;

/// Configuration for the embedded solver.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Phase assigned to decision variables first.
    pub default_phase: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            default_phase: false,
        }
    }
}

/// Solver statistics.
#[derive(Debug, Clone, Default)]
pub struct SolverStats {
    /// Number of decisions made.
    pub decisions: u64,
    /// Number of unit propagations.
    pub propagations: u64,
    /// Number of conflicts encountered.
    pub conflicts: u64,
    /// Number of models delivered.
    pub models: u64,
    /// Number of restarts.
    pub restarts: u64,
}

/// A total assignment delivered by the solver.
#[derive(Debug, Clone)]
pub struct Model {
    values: Vec<bool>,
}

impl Model {
    /// Truth value of a variable; variables beyond the solver's range are
    /// false.
    #[must_use]
    pub fn get(&self, var: AtomId) -> bool {
        self.values.get(var as usize).copied().unwrap_or(false)
    }

    /// The true variables as an interpretation.
    #[must_use]
    pub fn to_interpretation(&self) -> Interpretation {
        let mut i = Interpretation::with_capacity(self.values.len());
        for (v, &t) in self.values.iter().enumerate() {
            if t {
                i.set(v as AtomId);
            }
        }
        i
    }
}

/// The embedded nogood solver.
///
/// Permanent nogoods accumulate across the solver's lifetime; a restart
/// installs fresh assumptions and clears session nogoods without
/// re-parsing anything. `next_model` enumerates total assignments that
/// violate no stored nogood, pairwise distinct on the projection scope.
pub struct NogoodSolver {
    store: NogoodStore,
    num_vars: usize,
    assumptions: Vec<Literal>,
    scope: Option<Vec<AtomId>>,
    exhausted: bool,
    config: SolverConfig,
    stats: SolverStats,
}

impl NogoodSolver {
    /// Creates a solver over the given number of variables.
    #[must_use]
    pub fn new(num_vars: usize) -> Self {
        Self::with_config(num_vars, SolverConfig::default())
    }

    /// Creates a solver with custom configuration.
    #[must_use]
    pub fn with_config(num_vars: usize, config: SolverConfig) -> Self {
        let mut store = NogoodStore::new();
        store.reserve(num_vars);
        Self {
            store,
            num_vars,
            assumptions: Vec::new(),
            scope: None,
            exhausted: false,
            config,
            stats: SolverStats::default(),
        }
    }

    /// Grows the variable space. Addresses already handed out stay valid.
    pub fn reserve(&mut self, num_vars: usize) {
        if num_vars > self.num_vars {
            self.num_vars = num_vars;
            self.store.reserve(num_vars);
        }
    }

    /// Number of variables.
    #[must_use]
    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    /// Adds a permanent nogood. May be called between solves at any time.
    pub fn add_nogood(&mut self, nogood: Nogood) {
        for l in nogood.literals() {
            self.reserve(l.atom() as usize + 1);
        }
        self.store.add_permanent(nogood);
    }

    /// Adds a nogood that lives until the next restart.
    pub fn add_session_nogood(&mut self, nogood: Nogood) {
        for l in nogood.literals() {
            self.reserve(l.atom() as usize + 1);
        }
        self.store.add_session(nogood);
    }

    /// Restricts model distinctness to the given variables. Two models
    /// agreeing on the scope count as the same model.
    pub fn set_projection_scope(&mut self, scope: &Interpretation) {
        let vars = scope.to_vec();
        if let Some(&max) = vars.last() {
            self.reserve(max as usize + 1);
        }
        self.scope = Some(vars);
    }

    /// Resets the search under new assumptions: session nogoods are
    /// dropped, permanent nogoods stay, nothing is re-parsed.
    pub fn restart_with_assumptions(&mut self, assumptions: Vec<Literal>) {
        for l in &assumptions {
            self.reserve(l.atom() as usize + 1);
        }
        self.assumptions = assumptions;
        self.store.clear_session();
        self.exhausted = false;
        self.stats.restarts += 1;
    }

    /// Whether enumeration has run dry for the current assumptions.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Solver statistics.
    #[must_use]
    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    /// Delivers the next model, or `None` when no further model exists.
    ///
    /// Each delivered model is blocked on the projection scope before
    /// returning, so consecutive calls never repeat a scope assignment.
    pub fn next_model(&mut self) -> Option<Model> {
        if self.exhausted || self.store.trivially_unsat() {
            self.exhausted = true;
            return None;
        }

        let mut state = SearchState::new(self.num_vars);
        for &l in &self.assumptions {
            if !state.assign(l.atom(), l.positive()) {
                trace!("conflicting assumptions");
                self.exhausted = true;
                return None;
            }
        }
        if propagate_all(&self.store, &mut state, &mut self.stats.propagations)
            == PropagationResult::Conflict
        {
            self.stats.conflicts += 1;
            if !self.recover(&mut state) {
                return None;
            }
        }

        loop {
            match propagate(&self.store, &mut state, &mut self.stats.propagations) {
                PropagationResult::Conflict => {
                    self.stats.conflicts += 1;
                    if !self.recover(&mut state) {
                        return None;
                    }
                }
                PropagationResult::Ok => {
                    if let Some(var) = state.pick_unassigned() {
                        self.stats.decisions += 1;
                        state.decide(var, self.config.default_phase);
                    } else {
                        return Some(self.deliver(&state));
                    }
                }
            }
        }
    }

    /// Backtracks after a conflict; marks the solver exhausted when the
    /// search space is spent.
    fn recover(&mut self, state: &mut SearchState) -> bool {
        if state.backtrack() {
            true
        } else {
            self.exhausted = true;
            false
        }
    }

    /// Extracts the model and blocks it on the projection scope.
    fn deliver(&mut self, state: &SearchState) -> Model {
        let model = Model {
            values: state.snapshot(),
        };
        self.stats.models += 1;

        let block: Nogood = match &self.scope {
            Some(vars) => vars
                .iter()
                .map(|&v| Literal::new(v, model.get(v)))
                .collect(),
            None => (0..self.num_vars as AtomId)
                .map(|v| Literal::new(v, model.get(v)))
                .collect(),
        };
        if block.is_empty() {
            // Nothing to block on: there is exactly one scope class.
            self.exhausted = true;
        } else {
            self.store.add_session(block);
        }
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ng(lits: &[Literal]) -> Nogood {
        Nogood::from_literals(lits.iter().copied())
    }

    #[test]
    fn test_single_model() {
        // Forbid {~0} and {~1}: both variables must be true.
        let mut s = NogoodSolver::new(2);
        s.add_nogood(ng(&[Literal::neg(0)]));
        s.add_nogood(ng(&[Literal::neg(1)]));

        let m = s.next_model().expect("model");
        assert!(m.get(0));
        assert!(m.get(1));
        assert!(s.next_model().is_none());
    }

    #[test]
    fn test_unsat() {
        let mut s = NogoodSolver::new(1);
        s.add_nogood(ng(&[Literal::pos(0)]));
        s.add_nogood(ng(&[Literal::neg(0)]));
        assert!(s.next_model().is_none());
        assert!(s.is_exhausted());
    }

    #[test]
    fn test_enumeration_counts() {
        // One nogood {0, 1}: forbids both true; three models remain.
        let mut s = NogoodSolver::new(2);
        s.add_nogood(ng(&[Literal::pos(0), Literal::pos(1)]));

        let mut seen = Vec::new();
        while let Some(m) = s.next_model() {
            seen.push((m.get(0), m.get(1)));
        }
        assert_eq!(seen.len(), 3);
        assert!(!seen.contains(&(true, true)));
    }

    #[test]
    fn test_propagation_chain() {
        // 0 true forces 1 true forces 2 true.
        let mut s = NogoodSolver::new(3);
        s.add_nogood(ng(&[Literal::pos(0), Literal::neg(1)]));
        s.add_nogood(ng(&[Literal::pos(1), Literal::neg(2)]));
        s.restart_with_assumptions(vec![Literal::pos(0)]);

        let m = s.next_model().expect("model");
        assert!(m.get(1));
        assert!(m.get(2));
    }

    #[test]
    fn test_projection_scope() {
        // Two free variables, scope restricted to var 0: two models.
        let mut s = NogoodSolver::new(2);
        s.set_projection_scope(&Interpretation::from_atoms([0]));

        let mut count = 0;
        while s.next_model().is_some() {
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn test_assumptions_restart() {
        let mut s = NogoodSolver::new(2);
        s.add_nogood(ng(&[Literal::pos(0), Literal::pos(1)]));

        s.restart_with_assumptions(vec![Literal::pos(0)]);
        let m = s.next_model().expect("model under assumption");
        assert!(m.get(0));
        assert!(!m.get(1));
        assert!(s.next_model().is_none());

        s.restart_with_assumptions(vec![Literal::pos(1)]);
        let m = s.next_model().expect("model under flipped assumption");
        assert!(!m.get(0));
        assert!(m.get(1));
    }

    #[test]
    fn test_incremental_addition_between_solves() {
        let mut s = NogoodSolver::new(2);
        let m = s.next_model().expect("first model");
        assert!(!m.get(0));

        // Forbid everything with 0 false; enumeration continues soundly.
        s.add_nogood(ng(&[Literal::neg(0)]));
        while let Some(m) = s.next_model() {
            assert!(m.get(0));
        }
    }
}
