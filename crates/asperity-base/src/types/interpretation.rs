//! Bitset-backed truth assignments over atom addresses.

use serde::{Deserialize, Serialize};

use super::AtomId;

const WORD_BITS: usize = 64;

/// A boolean mapping from atom addresses to truth values.
///
/// Backed by a growable word bitset; addresses stay stable as the set grows.
/// An interpretation is owned exclusively by one checker while mutable and
/// shared read-only (behind `Arc`) otherwise.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Interpretation {
    words: Vec<u64>,
}

impl Interpretation {
    /// Creates an empty interpretation.
    #[must_use]
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Creates an interpretation with room for the given number of atoms.
    #[must_use]
    pub fn with_capacity(atoms: usize) -> Self {
        Self {
            words: Vec::with_capacity(atoms.div_ceil(WORD_BITS)),
        }
    }

    /// Builds an interpretation from a list of true atoms.
    pub fn from_atoms(atoms: impl IntoIterator<Item = AtomId>) -> Self {
        let mut i = Self::new();
        for a in atoms {
            i.set(a);
        }
        i
    }

    /// Sets an atom to true, growing the storage if needed.
    pub fn set(&mut self, atom: AtomId) {
        let w = atom as usize / WORD_BITS;
        if w >= self.words.len() {
            self.words.resize(w + 1, 0);
        }
        self.words[w] |= 1 << (atom as usize % WORD_BITS);
    }

    /// Sets an atom to false.
    pub fn clear(&mut self, atom: AtomId) {
        let w = atom as usize / WORD_BITS;
        if w < self.words.len() {
            self.words[w] &= !(1 << (atom as usize % WORD_BITS));
        }
    }

    /// Returns the truth value of an atom. Addresses beyond the storage
    /// are false.
    #[must_use]
    pub fn get(&self, atom: AtomId) -> bool {
        let w = atom as usize / WORD_BITS;
        w < self.words.len() && self.words[w] & (1 << (atom as usize % WORD_BITS)) != 0
    }

    /// Number of true atoms.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Whether no atom is true.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// In-place union: every atom true in `other` becomes true here.
    pub fn union_with(&mut self, other: &Self) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (w, o) in self.words.iter_mut().zip(other.words.iter()) {
            *w |= o;
        }
    }

    /// In-place difference: every atom true in `other` becomes false here.
    pub fn difference_with(&mut self, other: &Self) {
        for (w, o) in self.words.iter_mut().zip(other.words.iter()) {
            *w &= !o;
        }
    }

    /// In-place intersection.
    pub fn intersect_with(&mut self, other: &Self) {
        for (i, w) in self.words.iter_mut().enumerate() {
            *w &= other.words.get(i).copied().unwrap_or(0);
        }
    }

    /// Whether any atom is true in both interpretations.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(w, o)| w & o != 0)
    }

    /// Whether every atom true here is also true in `other`.
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.words
            .iter()
            .enumerate()
            .all(|(i, w)| w & !other.words.get(i).copied().unwrap_or(0) == 0)
    }

    /// Iterates the true atoms in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = AtomId> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let base = (i * WORD_BITS) as u32;
            BitIter { word, base }
        })
    }

    /// Collects the true atoms into a sorted address list.
    #[must_use]
    pub fn to_vec(&self) -> Vec<AtomId> {
        self.iter().collect()
    }
}

/// Iterator over the set bits of a single word.
struct BitIter {
    word: u64,
    base: u32,
}

impl Iterator for BitIter {
    type Item = AtomId;

    fn next(&mut self) -> Option<AtomId> {
        if self.word == 0 {
            return None;
        }
        let bit = self.word.trailing_zeros();
        self.word &= self.word - 1;
        Some(self.base + bit)
    }
}

impl PartialEq for Interpretation {
    fn eq(&self, other: &Self) -> bool {
        let common = self.words.len().min(other.words.len());
        self.words[..common] == other.words[..common]
            && self.words[common..].iter().all(|&w| w == 0)
            && other.words[common..].iter().all(|&w| w == 0)
    }
}

impl Eq for Interpretation {}

impl std::fmt::Debug for Interpretation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<AtomId> for Interpretation {
    fn from_iter<T: IntoIterator<Item = AtomId>>(iter: T) -> Self {
        Self::from_atoms(iter)
    }
}
