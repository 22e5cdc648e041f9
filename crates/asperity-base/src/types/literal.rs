//! Signed atom occurrences.

use serde::{Deserialize, Serialize};

use super::{AtomId, Interpretation};

/// A signed literal: an atom address plus a polarity, packed into one word.
///
/// The polarity states which truth value the literal asserts; a positive
/// literal is satisfied when its atom is true, a negative literal when it
/// is false.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Literal(u32);

impl Literal {
    /// Creates a literal with the given polarity.
    #[must_use]
    pub fn new(atom: AtomId, positive: bool) -> Self {
        debug_assert!(atom < (1 << 31), "atom address exceeds literal range");
        Self(atom << 1 | positive as u32)
    }

    /// Creates a positive literal.
    #[must_use]
    pub fn pos(atom: AtomId) -> Self {
        Self::new(atom, true)
    }

    /// Creates a negative literal.
    #[must_use]
    pub fn neg(atom: AtomId) -> Self {
        Self::new(atom, false)
    }

    /// The atom address.
    #[must_use]
    pub fn atom(self) -> AtomId {
        self.0 >> 1
    }

    /// Whether this literal asserts the atom true.
    #[must_use]
    pub fn positive(self) -> bool {
        self.0 & 1 == 1
    }

    /// The same atom with flipped polarity.
    #[must_use]
    pub fn negated(self) -> Self {
        Self(self.0 ^ 1)
    }

    /// Whether the literal holds under the given interpretation.
    #[must_use]
    pub fn satisfied_by(self, interpretation: &Interpretation) -> bool {
        interpretation.get(self.atom()) == self.positive()
    }
}

impl std::fmt::Debug for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", if self.positive() { "" } else { "~" }, self.atom())
    }
}
