//! Nogoods and the shared learning container.
//!
//! A nogood is a set of signed literals that must never be jointly
//! satisfied. The main search and the unfounded-set checkers exchange
//! learned nogoods through an append-only container; every consumer tracks
//! its own read position.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::types::{Interpretation, Literal};

/// A set of signed literals that must never be jointly satisfied.
///
/// Literals are kept sorted and deduplicated, so nogoods compare and hash
/// structurally.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nogood {
    literals: Vec<Literal>,
}

impl Nogood {
    /// Creates an empty nogood. An empty nogood is violated by every
    /// assignment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a nogood from literals, sorting and deduplicating.
    pub fn from_literals(literals: impl IntoIterator<Item = Literal>) -> Self {
        let mut ng = Self::new();
        for l in literals {
            ng.insert(l);
        }
        ng
    }

    /// Inserts a literal, keeping the sorted order. Duplicates are ignored.
    pub fn insert(&mut self, literal: Literal) {
        if let Err(pos) = self.literals.binary_search(&literal) {
            self.literals.insert(pos, literal);
        }
    }

    /// Whether the literal occurs in this nogood.
    #[must_use]
    pub fn contains(&self, literal: Literal) -> bool {
        self.literals.binary_search(&literal).is_ok()
    }

    /// The literals in ascending order.
    #[must_use]
    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    /// Number of literals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.literals.len()
    }

    /// Whether the nogood has no literals.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Whether the nogood contains an atom in both polarities. Such a
    /// nogood can never be violated and carries no constraint.
    #[must_use]
    pub fn is_vacuous(&self) -> bool {
        self.literals
            .windows(2)
            .any(|w| w[0].atom() == w[1].atom() && w[0].positive() != w[1].positive())
    }

    /// Whether every literal holds under the interpretation, i.e. the
    /// interpretation violates this nogood.
    #[must_use]
    pub fn violated_by(&self, interpretation: &Interpretation) -> bool {
        self.literals.iter().all(|l| l.satisfied_by(interpretation))
    }
}

impl std::fmt::Debug for Nogood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl std::fmt::Display for Nogood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ ")?;
        for (i, l) in self.literals.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", l)?;
        }
        write!(f, " }}")
    }
}

impl FromIterator<Literal> for Nogood {
    fn from_iter<T: IntoIterator<Item = Literal>>(iter: T) -> Self {
        Self::from_literals(iter)
    }
}

/// Growable, append-only collection of nogoods shared for learning.
///
/// The container deduplicates structurally: adding a nogood twice returns
/// the original id. Consumers keep their own monotonic cursor into the
/// ordered list; `since` yields everything a cursor has not seen yet.
#[derive(Default)]
pub struct NogoodContainer {
    nogoods: Vec<Nogood>,
    index: HashMap<Nogood, usize>,
}

impl NogoodContainer {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a nogood, returning its id. Duplicates are not re-added.
    pub fn add(&mut self, nogood: Nogood) -> usize {
        if let Some(&id) = self.index.get(&nogood) {
            return id;
        }
        let id = self.nogoods.len();
        self.index.insert(nogood.clone(), id);
        self.nogoods.push(nogood);
        id
    }

    /// Gets a nogood by id.
    #[must_use]
    pub fn get(&self, id: usize) -> Option<&Nogood> {
        self.nogoods.get(id)
    }

    /// Number of nogoods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nogoods.len()
    }

    /// Whether the container is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nogoods.is_empty()
    }

    /// The nogoods appended at or after the given cursor position.
    #[must_use]
    pub fn since(&self, cursor: usize) -> &[Nogood] {
        &self.nogoods[cursor.min(self.nogoods.len())..]
    }
}

/// Shared handle to the learning container.
///
/// The core is single-threaded, but a multi-threaded host needs
/// concurrent-append with independent cursors, so the handle is a mutex
/// rather than a cell.
pub type SharedNogoods = Arc<Mutex<NogoodContainer>>;

/// Creates a fresh shared container.
#[must_use]
pub fn shared_container() -> SharedNogoods {
    Arc::new(Mutex::new(NogoodContainer::new()))
}
