//! Nogood storage with occurrence lists.

use asperity_base::{AtomId, Nogood};

/// Where a stored nogood lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NogoodRef {
    /// Survives restarts.
    Permanent(usize),
    /// Cleared by the next restart (blocking nogoods, per-solve extras).
    Session(usize),
}

/// Database of nogoods with per-variable occurrence lists.
///
/// Permanent nogoods accumulate for the lifetime of the solver; session
/// nogoods are dropped wholesale on restart. Vacuous nogoods (an atom in
/// both polarities) are never stored since they cannot be violated.
#[derive(Debug, Default)]
pub struct NogoodStore {
    permanent: Vec<Nogood>,
    session: Vec<Nogood>,
    occ_permanent: Vec<Vec<usize>>,
    occ_session: Vec<Vec<usize>>,
    trivially_unsat: bool,
}

impl NogoodStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures occurrence lists exist for variables below `num_vars`.
    pub fn reserve(&mut self, num_vars: usize) {
        if self.occ_permanent.len() < num_vars {
            self.occ_permanent.resize_with(num_vars, Vec::new);
            self.occ_session.resize_with(num_vars, Vec::new);
        }
    }

    /// Adds a permanent nogood. An empty nogood marks the whole problem
    /// unsatisfiable.
    pub fn add_permanent(&mut self, nogood: Nogood) {
        if nogood.is_empty() {
            self.trivially_unsat = true;
            return;
        }
        if nogood.is_vacuous() {
            return;
        }
        let id = self.permanent.len();
        for l in nogood.literals() {
            let v = l.atom() as usize;
            self.reserve(v + 1);
            self.occ_permanent[v].push(id);
        }
        self.permanent.push(nogood);
    }

    /// Adds a session nogood, dropped by the next restart.
    pub fn add_session(&mut self, nogood: Nogood) {
        if nogood.is_empty() {
            self.trivially_unsat = true;
            return;
        }
        if nogood.is_vacuous() {
            return;
        }
        let id = self.session.len();
        for l in nogood.literals() {
            let v = l.atom() as usize;
            self.reserve(v + 1);
            self.occ_session[v].push(id);
        }
        self.session.push(nogood);
    }

    /// Drops all session nogoods.
    pub fn clear_session(&mut self) {
        self.session.clear();
        for occ in &mut self.occ_session {
            occ.clear();
        }
    }

    /// Resolves a reference.
    #[must_use]
    pub fn get(&self, r: NogoodRef) -> &Nogood {
        match r {
            NogoodRef::Permanent(i) => &self.permanent[i],
            NogoodRef::Session(i) => &self.session[i],
        }
    }

    /// References of every nogood mentioning the variable.
    pub fn occurrences(&self, var: AtomId) -> impl Iterator<Item = NogoodRef> + '_ {
        let v = var as usize;
        let perm = self
            .occ_permanent
            .get(v)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .map(|&i| NogoodRef::Permanent(i));
        let sess = self
            .occ_session
            .get(v)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .map(|&i| NogoodRef::Session(i));
        perm.chain(sess)
    }

    /// References of all stored nogoods.
    pub fn all(&self) -> impl Iterator<Item = NogoodRef> + '_ {
        (0..self.permanent.len())
            .map(NogoodRef::Permanent)
            .chain((0..self.session.len()).map(NogoodRef::Session))
    }

    /// Whether an empty nogood was added.
    #[must_use]
    pub fn trivially_unsat(&self) -> bool {
        self.trivially_unsat
    }

    /// Number of permanent nogoods.
    #[must_use]
    pub fn num_permanent(&self) -> usize {
        self.permanent.len()
    }

    /// Number of session nogoods.
    #[must_use]
    pub fn num_session(&self) -> usize {
        self.session.len()
    }
}
