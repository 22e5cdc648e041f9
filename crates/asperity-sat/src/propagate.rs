//! Unit propagation over nogoods and the backtracking search state.

use asperity_base::{AtomId, Nogood};

use crate::store::{NogoodRef, NogoodStore};

/// Status of one nogood under a partial assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NogoodStatus {
    /// Some literal is falsified; the nogood cannot fire.
    Open,
    /// All literals but one are satisfied; the remaining literal must be
    /// falsified.
    Unit(asperity_base::Literal),
    /// Every literal is satisfied.
    Violated,
}

/// Result of a propagation round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationResult {
    /// Fixpoint reached without violating a nogood.
    Ok,
    /// A nogood became fully satisfied.
    Conflict,
}

/// A decision point in the search.
#[derive(Debug, Clone)]
pub struct Decision {
    /// The decided variable.
    pub var: AtomId,
    /// Phase assigned first.
    pub phase: bool,
    /// Whether the opposite phase was already tried.
    pub flipped: bool,
    /// Trail length before this decision.
    pub trail_pos: usize,
}

/// Assignment, trail, and decision stack of one enumeration run.
#[derive(Debug)]
pub struct SearchState {
    assignment: Vec<Option<bool>>,
    trail: Vec<AtomId>,
    head: usize,
    decisions: Vec<Decision>,
}

impl SearchState {
    /// Fresh state over `num_vars` variables, all unassigned.
    #[must_use]
    pub fn new(num_vars: usize) -> Self {
        Self {
            assignment: vec![None; num_vars],
            trail: Vec::with_capacity(num_vars),
            head: 0,
            decisions: Vec::new(),
        }
    }

    /// Current value of a variable.
    #[must_use]
    pub fn value(&self, var: AtomId) -> Option<bool> {
        self.assignment.get(var as usize).copied().flatten()
    }

    /// Assigns a variable, pushing it on the trail. Returns false when
    /// the variable already holds the opposite value.
    pub fn assign(&mut self, var: AtomId, value: bool) -> bool {
        match self.assignment[var as usize] {
            Some(v) => v == value,
            None => {
                self.assignment[var as usize] = Some(value);
                self.trail.push(var);
                true
            }
        }
    }

    /// Records a decision and assigns its phase.
    pub fn decide(&mut self, var: AtomId, phase: bool) {
        self.decisions.push(Decision {
            var,
            phase,
            flipped: false,
            trail_pos: self.trail.len(),
        });
        let ok = self.assign(var, phase);
        debug_assert!(ok, "decided variable was already assigned");
    }

    /// Chronological backtracking: undoes decisions until one can be
    /// flipped, flips it, and returns true. Returns false when no
    /// decision is left to flip.
    pub fn backtrack(&mut self) -> bool {
        while let Some(mut d) = self.decisions.pop() {
            for &v in &self.trail[d.trail_pos..] {
                self.assignment[v as usize] = None;
            }
            self.trail.truncate(d.trail_pos);
            self.head = d.trail_pos;
            if !d.flipped {
                d.flipped = true;
                let var = d.var;
                let phase = d.phase;
                self.decisions.push(d);
                let ok = self.assign(var, !phase);
                debug_assert!(ok, "flipped variable was still assigned");
                return true;
            }
        }
        false
    }

    /// First unassigned variable, lowest address first.
    #[must_use]
    pub fn pick_unassigned(&self) -> Option<AtomId> {
        self.assignment
            .iter()
            .position(Option::is_none)
            .map(|i| i as AtomId)
    }

    /// Snapshot of the assignment, unassigned variables defaulting to
    /// false.
    #[must_use]
    pub fn snapshot(&self) -> Vec<bool> {
        self.assignment
            .iter()
            .map(|v| v.unwrap_or(false))
            .collect()
    }

    fn next_queued(&mut self) -> Option<AtomId> {
        if self.head < self.trail.len() {
            let v = self.trail[self.head];
            self.head += 1;
            Some(v)
        } else {
            None
        }
    }
}

/// Classifies one nogood under the current assignment.
#[must_use]
pub fn nogood_status(nogood: &Nogood, state: &SearchState) -> NogoodStatus {
    let mut unassigned = None;
    for &l in nogood.literals() {
        match state.value(l.atom()) {
            Some(v) if v == l.positive() => {}
            Some(_) => return NogoodStatus::Open,
            None => {
                if unassigned.is_some() {
                    return NogoodStatus::Open;
                }
                unassigned = Some(l);
            }
        }
    }
    match unassigned {
        Some(l) => NogoodStatus::Unit(l),
        None => NogoodStatus::Violated,
    }
}

/// Propagates the queued trail suffix to fixpoint.
pub fn propagate(store: &NogoodStore, state: &mut SearchState, propagations: &mut u64) -> PropagationResult {
    while let Some(v) = state.next_queued() {
        let refs: Vec<NogoodRef> = store.occurrences(v).collect();
        for r in refs {
            match nogood_status(store.get(r), state) {
                NogoodStatus::Violated => return PropagationResult::Conflict,
                NogoodStatus::Unit(l) => {
                    *propagations += 1;
                    let ok = state.assign(l.atom(), !l.positive());
                    debug_assert!(ok, "unit literal was assigned both ways");
                }
                NogoodStatus::Open => {}
            }
        }
    }
    PropagationResult::Ok
}

/// Checks every stored nogood once and propagates the consequences. Run
/// after installing assumptions, before the first decision.
pub fn propagate_all(store: &NogoodStore, state: &mut SearchState, propagations: &mut u64) -> PropagationResult {
    let refs: Vec<NogoodRef> = store.all().collect();
    for r in refs {
        match nogood_status(store.get(r), state) {
            NogoodStatus::Violated => return PropagationResult::Conflict,
            NogoodStatus::Unit(l) => {
                *propagations += 1;
                let ok = state.assign(l.atom(), !l.positive());
                debug_assert!(ok, "unit literal was assigned both ways");
            }
            NogoodStatus::Open => {}
        }
    }
    propagate(store, state, propagations)
}
