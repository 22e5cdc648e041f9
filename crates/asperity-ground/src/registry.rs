//! Atom registry: the arena of dense ground-atom addresses.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use asperity_base::{AtomId, Literal};

/// Interned constant symbol (predicate names and ground terms).
pub type Symbol = u32;

/// Index of an external atom instance within its program.
pub type ExternalAtomId = u32;

/// What an atom address stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomInfo {
    /// A regular ground atom `predicate(args)`.
    Ordinary { predicate: Symbol, args: Vec<Symbol> },
    /// An auxiliary atom standing for one output tuple of an external
    /// atom. The negative flag marks the replacement for the default
    /// negation of that output.
    ExternalAux {
        external: ExternalAtomId,
        tuple: Vec<Symbol>,
        negative: bool,
    },
}

/// Arena of ground atoms with dense, immutable addresses.
///
/// Atoms are created once and never move; interpretations and nogoods key
/// on the addresses handed out here. The registry is shared read-only
/// during checking (see [`SharedRegistry`]) and only grows between
/// grounding rounds.
#[derive(Debug, Default)]
pub struct Registry {
    symbols: Vec<String>,
    symbol_ids: HashMap<String, Symbol>,
    atoms: Vec<AtomInfo>,
    ordinary_ids: HashMap<(Symbol, Vec<Symbol>), AtomId>,
    aux_ids: HashMap<(ExternalAtomId, Vec<Symbol>, bool), AtomId>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a constant symbol.
    pub fn intern(&mut self, text: &str) -> Symbol {
        if let Some(&s) = self.symbol_ids.get(text) {
            return s;
        }
        let s = self.symbols.len() as Symbol;
        self.symbols.push(text.to_string());
        self.symbol_ids.insert(text.to_string(), s);
        s
    }

    /// The text of an interned symbol.
    #[must_use]
    pub fn symbol_text(&self, symbol: Symbol) -> &str {
        &self.symbols[symbol as usize]
    }

    /// Gets or creates the ordinary atom `predicate(args)`.
    pub fn ordinary_atom(&mut self, predicate: &str, args: &[&str]) -> AtomId {
        let p = self.intern(predicate);
        let a: Vec<Symbol> = args.iter().map(|t| self.intern(t)).collect();
        self.ordinary_atom_ids(p, a)
    }

    /// Gets or creates an ordinary atom from interned symbols.
    pub fn ordinary_atom_ids(&mut self, predicate: Symbol, args: Vec<Symbol>) -> AtomId {
        if let Some(&id) = self.ordinary_ids.get(&(predicate, args.clone())) {
            return id;
        }
        let id = self.atoms.len() as AtomId;
        self.ordinary_ids.insert((predicate, args.clone()), id);
        self.atoms.push(AtomInfo::Ordinary { predicate, args });
        id
    }

    /// Looks up an ordinary atom without creating it.
    #[must_use]
    pub fn lookup_ordinary(&self, predicate: Symbol, args: &[Symbol]) -> Option<AtomId> {
        self.ordinary_ids.get(&(predicate, args.to_vec())).copied()
    }

    /// Gets or creates the auxiliary atom for one output tuple of an
    /// external atom.
    pub fn external_aux(
        &mut self,
        external: ExternalAtomId,
        tuple: Vec<Symbol>,
        negative: bool,
    ) -> AtomId {
        if let Some(&id) = self.aux_ids.get(&(external, tuple.clone(), negative)) {
            return id;
        }
        let id = self.atoms.len() as AtomId;
        self.aux_ids.insert((external, tuple.clone(), negative), id);
        self.atoms.push(AtomInfo::ExternalAux {
            external,
            tuple,
            negative,
        });
        id
    }

    /// Looks up an auxiliary atom without creating it.
    #[must_use]
    pub fn lookup_external_aux(
        &self,
        external: ExternalAtomId,
        tuple: &[Symbol],
        negative: bool,
    ) -> Option<AtomId> {
        self.aux_ids
            .get(&(external, tuple.to_vec(), negative))
            .copied()
    }

    /// What the atom address stands for.
    #[must_use]
    pub fn info(&self, atom: AtomId) -> &AtomInfo {
        &self.atoms[atom as usize]
    }

    /// Whether the address names an external-auxiliary atom (either
    /// polarity of replacement).
    #[must_use]
    pub fn is_external_aux(&self, atom: AtomId) -> bool {
        matches!(self.atoms.get(atom as usize), Some(AtomInfo::ExternalAux { .. }))
    }

    /// Rewrites a literal over a negative-replacement auxiliary into the
    /// equivalent literal over the positive replacement. Ordinary atoms
    /// and positive-replacement auxiliaries pass through unchanged.
    /// Returns `None` when the positive counterpart was never registered.
    #[must_use]
    pub fn normalize_literal(&self, literal: Literal) -> Option<Literal> {
        match self.atoms.get(literal.atom() as usize) {
            Some(AtomInfo::ExternalAux {
                external,
                tuple,
                negative: true,
            }) => self
                .lookup_external_aux(*external, tuple, false)
                .map(|pos| Literal::new(pos, !literal.positive())),
            Some(_) => Some(literal),
            None => None,
        }
    }

    /// Number of atoms allocated so far.
    #[must_use]
    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    /// Human-readable rendering of an atom, for diagnostics.
    #[must_use]
    pub fn atom_text(&self, atom: AtomId) -> String {
        match self.atoms.get(atom as usize) {
            Some(AtomInfo::Ordinary { predicate, args }) => {
                if args.is_empty() {
                    self.symbol_text(*predicate).to_string()
                } else {
                    format!(
                        "{}({})",
                        self.symbol_text(*predicate),
                        args.iter()
                            .map(|&a| self.symbol_text(a))
                            .collect::<Vec<_>>()
                            .join(",")
                    )
                }
            }
            Some(AtomInfo::ExternalAux {
                external,
                tuple,
                negative,
            }) => format!(
                "aux{}_e{}({})",
                if *negative { "_n" } else { "" },
                external,
                tuple
                    .iter()
                    .map(|&a| self.symbol_text(a))
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            None => format!("#{}", atom),
        }
    }
}

/// Reference-counted read-mostly handle to the registry.
///
/// Checkers take read locks for the duration of a check; the host takes a
/// write lock only between grounding rounds.
pub type SharedRegistry = Arc<RwLock<Registry>>;

/// Wraps a registry into a shared handle.
#[must_use]
pub fn shared_registry(registry: Registry) -> SharedRegistry {
    Arc::new(RwLock::new(registry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinary_atom_dedup() {
        let mut reg = Registry::new();
        let a = reg.ordinary_atom("p", &["1"]);
        let b = reg.ordinary_atom("p", &["1"]);
        let c = reg.ordinary_atom("p", &["2"]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(reg.num_atoms(), 2);
    }

    #[test]
    fn test_normalize_negative_replacement() {
        let mut reg = Registry::new();
        let one = reg.intern("1");
        let pos = reg.external_aux(0, vec![one], false);
        let neg = reg.external_aux(0, vec![one], true);

        let n = reg.normalize_literal(Literal::pos(neg)).unwrap();
        assert_eq!(n, Literal::neg(pos));

        let p = reg.normalize_literal(Literal::neg(pos)).unwrap();
        assert_eq!(p, Literal::neg(pos));
    }

    #[test]
    fn test_atom_text() {
        let mut reg = Registry::new();
        let a = reg.ordinary_atom("edge", &["a", "b"]);
        assert_eq!(reg.atom_text(a), "edge(a,b)");
    }
}
