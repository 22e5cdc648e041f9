//! Ground programs and their JSON document form.

use asperity_base::Interpretation;
use serde::{Deserialize, Serialize};

use crate::registry::{ExternalAtomId, Symbol};
use crate::rule::{GroundRule, RuleId};

/// One input position of an external atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSpec {
    /// A fixed constant term.
    Const(Symbol),
    /// A predicate whose extension is projected from the interpretation.
    Predicate(Symbol),
}

/// A ground external atom instance: which plugin computes it and what it
/// is fed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalAtom {
    /// Name of the plugin atom (interned).
    pub plugin: Symbol,
    /// Input signature, constants and predicate inputs in declared order.
    pub inputs: Vec<InputSpec>,
    /// Declared arity of output tuples.
    pub output_arity: usize,
}

impl ExternalAtom {
    /// The predicate-input symbols in declared order.
    pub fn predicate_inputs(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.inputs.iter().filter_map(|i| match i {
            InputSpec::Predicate(p) => Some(*p),
            InputSpec::Const(_) => None,
        })
    }

    /// The constant-input symbols in declared order.
    pub fn constant_inputs(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.inputs.iter().filter_map(|i| match i {
            InputSpec::Const(c) => Some(*c),
            InputSpec::Predicate(_) => None,
        })
    }
}

/// A ground program: rules, EDB facts, and the external atoms its rules
/// refer to. This is also the serde document exchanged with the grounder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundProgram {
    /// Rules in id order.
    pub rules: Vec<GroundRule>,
    /// Extensional facts.
    pub edb: Interpretation,
    /// External atom instances, indexed by [`ExternalAtomId`].
    pub externals: Vec<ExternalAtom>,
}

impl GroundProgram {
    /// Creates an empty program.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule, returning its id.
    pub fn add_rule(&mut self, rule: GroundRule) -> RuleId {
        let id = self.rules.len() as RuleId;
        self.rules.push(rule);
        id
    }

    /// Appends an external atom instance, returning its id.
    pub fn add_external(&mut self, external: ExternalAtom) -> ExternalAtomId {
        let id = self.externals.len() as ExternalAtomId;
        self.externals.push(external);
        id
    }

    /// Gets a rule by id.
    #[must_use]
    pub fn rule(&self, id: RuleId) -> &GroundRule {
        &self.rules[id as usize]
    }

    /// Parses from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
