//! Per-verification bookkeeping of pending auxiliaries.

use std::collections::HashMap;

use asperity_base::{AtomId, Interpretation};
use asperity_ground::{AnnotatedGroundProgram, ExternalAtomId, Registry};

/// Which auxiliaries still need their guessed truth value confirmed, and
/// by which external atoms.
///
/// Built once per candidate: every domain auxiliary whose truth differs
/// between the candidate and the compatible set is registered pending,
/// indexed by the external atom(s) producing it. Both maps only shrink;
/// each external atom is taken off the list exactly once.
#[derive(Debug, Default)]
pub struct VerificationStatus {
    pending: HashMap<ExternalAtomId, Vec<AtomId>>,
    remaining: HashMap<AtomId, usize>,
}

impl VerificationStatus {
    /// Registers every auxiliary in the domain whose truth value changed
    /// between the candidate guess and the compatible set.
    #[must_use]
    pub fn build(
        program: &AnnotatedGroundProgram,
        registry: &Registry,
        domain: &Interpretation,
        candidate_aux: &Interpretation,
        compatible: &Interpretation,
    ) -> Self {
        let mut status = Self::default();
        for atom in domain.iter() {
            if !registry.is_external_aux(atom) {
                continue;
            }
            if candidate_aux.get(atom) == compatible.get(atom) {
                continue;
            }
            let producers = program.externals_of_aux(atom);
            debug_assert!(
                !producers.is_empty(),
                "auxiliary without a producing external atom"
            );
            if producers.is_empty() {
                continue;
            }
            for &e in producers {
                status.pending.entry(e).or_default().push(atom);
            }
            status.remaining.insert(atom, producers.len());
        }
        status
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// External atoms with pending auxiliaries, in ascending id order.
    #[must_use]
    pub fn externals(&self) -> Vec<ExternalAtomId> {
        let mut es: Vec<ExternalAtomId> = self.pending.keys().copied().collect();
        es.sort_unstable();
        es
    }

    /// Records that an external atom has been evaluated and returns the
    /// auxiliaries it was the last pending explanation for.
    pub fn mark_evaluated(&mut self, external: ExternalAtomId) -> Vec<AtomId> {
        let mut resolved = Vec::new();
        if let Some(auxes) = self.pending.remove(&external) {
            for aux in auxes {
                if let Some(r) = self.remaining.get_mut(&aux) {
                    *r -= 1;
                    if *r == 0 {
                        self.remaining.remove(&aux);
                        resolved.push(aux);
                    }
                }
            }
        }
        resolved.sort_unstable();
        resolved
    }
}
