//! The plugin-atom interface.

use std::collections::HashMap;
use std::sync::Arc;

use asperity_base::{Error, Interpretation, Result};
use asperity_ground::{Registry, Symbol};

/// A ground output tuple of interned symbols.
pub type Tuple = Vec<Symbol>;

/// One evaluation request for a plugin atom.
pub struct Query<'a> {
    /// Read-only registry for resolving symbols and atoms.
    pub registry: &'a Registry,
    /// True atoms of the interpretation, projected to the external
    /// atom's input mask.
    pub projected: &'a Interpretation,
    /// Constant inputs in declared order.
    pub constants: &'a [Symbol],
}

/// A precomputed sufficient condition for one output tuple: if every
/// `requires_true` atom holds and every `requires_false` atom does not,
/// the tuple is in the output. A plugin declaring support sets declares
/// them complete: a tuple is output if and only if some support set for
/// it fires.
#[derive(Debug, Clone)]
pub struct SupportSet {
    /// Ordinary atoms that must be true, as (predicate, args).
    pub requires_true: Vec<(Symbol, Vec<Symbol>)>,
    /// Ordinary atoms that must be false.
    pub requires_false: Vec<(Symbol, Vec<Symbol>)>,
    /// The output tuple this set supports.
    pub output: Tuple,
}

impl SupportSet {
    /// Whether the condition fires under the interpretation. Atoms never
    /// registered count as false.
    #[must_use]
    pub fn fires(&self, registry: &Registry, interpretation: &Interpretation) -> bool {
        self.requires_true.iter().all(|(p, args)| {
            registry
                .lookup_ordinary(*p, args)
                .is_some_and(|a| interpretation.get(a))
        }) && self.requires_false.iter().all(|(p, args)| {
            registry
                .lookup_ordinary(*p, args)
                .map_or(true, |a| !interpretation.get(a))
        })
    }
}

/// A computable external predicate supplied by a plugin.
///
/// Implementations must be deterministic per query; evaluation failures
/// propagate as fatal.
pub trait PluginAtom: Send + Sync {
    /// Name the plugin atom is registered under.
    fn name(&self) -> &str;

    /// Whether a larger input extension can only grow the output.
    fn monotonic(&self) -> bool {
        false
    }

    /// Complete support-set family, when the source can declare one.
    fn support_sets(&self) -> Option<&[SupportSet]> {
        None
    }

    /// Computes the output tuples for one query.
    fn retrieve(&self, query: &Query<'_>) -> Result<Vec<Tuple>>;
}

/// Name-indexed collection of plugin atoms.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn PluginAtom>>,
}

impl PluginRegistry {
    /// Creates an empty plugin registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin atom under its own name.
    pub fn register(&mut self, plugin: Arc<dyn PluginAtom>) {
        self.plugins.insert(plugin.name().to_string(), plugin);
    }

    /// Looks up a plugin atom.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn PluginAtom>> {
        self.plugins.get(name).cloned()
    }

    /// Looks up a plugin atom, failing with [`Error::UnknownPlugin`].
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn PluginAtom>> {
        self.get(name)
            .ok_or_else(|| Error::UnknownPlugin(name.to_string()))
    }
}
