//! Configuration for the unfounded-set subsystem.

use asperity_plugin::EvalConfig;

/// How the detection subproblem is built and reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UfsStrategy {
    /// Rebuild the full subproblem on every check. Suited to infrequent
    /// or volatile checks.
    Encoding,
    /// Build once, reuse across checks via solver assumptions. The
    /// default when available.
    Assumption,
}

/// Which conflict nogood a found unfounded set is turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NogoodStrategy {
    /// One witness per excluded rule plus the smaller model.
    ReductBased,
    /// One unfounded atom plus one witness per external rule.
    UfsBased,
}

/// Toggles for the unfounded-set checkers and their manager.
#[derive(Debug, Clone)]
pub struct UfsConfig {
    /// Subproblem construction strategy.
    pub strategy: UfsStrategy,
    /// Conflict nogood construction strategy.
    pub nogood_strategy: NogoodStrategy,
    /// Pull learned nogoods from the shared container into the checkers.
    pub learn_from_main: bool,
    /// Push io-nogoods observed during verification into the shared
    /// container.
    pub external_learning: bool,
    /// Decide auxiliary truth through declared support sets instead of
    /// evaluation where possible.
    pub use_support_sets: bool,
    /// Add external-behavior nogoods to the subproblem: an auxiliary
    /// whose domain inputs are untouched keeps its compatible-set value.
    pub external_behavior_nogoods: bool,
    /// One checker for the whole program instead of one per component.
    pub monolithic: bool,
    /// Construct per-component checkers up front instead of on first use.
    pub eager_checkers: bool,
    /// Treat weight-rule cycles as excluded-from-UFS instead of fatal.
    pub tolerate_weight_cycles: bool,
    /// Run the other strategy side by side and compare non-emptiness.
    /// Debug scaffolding, off by default.
    pub cross_check: bool,
    /// Escalate malformed external output tuples instead of dropping
    /// them with a warning.
    pub strict_tuples: bool,
}

impl Default for UfsConfig {
    fn default() -> Self {
        Self {
            strategy: UfsStrategy::Assumption,
            nogood_strategy: NogoodStrategy::UfsBased,
            learn_from_main: true,
            external_learning: true,
            use_support_sets: true,
            external_behavior_nogoods: true,
            monolithic: false,
            eager_checkers: false,
            tolerate_weight_cycles: false,
            cross_check: false,
            strict_tuples: false,
        }
    }
}

impl UfsConfig {
    /// The evaluation-side view of this configuration.
    #[must_use]
    pub fn eval_config(&self) -> EvalConfig {
        EvalConfig {
            strict_tuples: self.strict_tuples,
            learn_io_nogoods: self.external_learning,
            learn_negative: false,
        }
    }
}
