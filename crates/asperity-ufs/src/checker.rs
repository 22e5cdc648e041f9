//! The shared unfounded-set checker contract and strategy dispatch.

use std::sync::Arc;

use asperity_base::{AtomId, Interpretation, Nogood, Result};
use asperity_ground::{AnnotatedGroundProgram, GroundRule, Registry, RuleId};
use asperity_plugin::EvalCache;
use tracing::debug;

use crate::assumption::AssumptionBasedUnfoundedSetChecker;
use crate::config::{NogoodStrategy, UfsStrategy};
use crate::context::UfsContext;
use crate::encoding::EncodingBasedUnfoundedSetChecker;
use crate::nogoods::{reduct_based_nogood, ufs_based_nogood};

/// What part of the program a checker is responsible for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckScope {
    /// The whole program.
    Monolithic,
    /// One component, by index into the annotated program.
    Component(usize),
}

/// Counters kept by every checker.
#[derive(Debug, Clone, Default)]
pub struct CheckerStats {
    /// Number of `get_unfounded_set` calls.
    pub checks: u64,
    /// Candidates delivered by the embedded solver.
    pub candidates: u64,
    /// Candidates rejected by external verification.
    pub rejected: u64,
}

/// State both strategies share: collaborators, scope, the monotonically
/// growing domain, the learning cursor, and the evaluation cache.
pub(crate) struct CheckerCore {
    pub ctx: UfsContext,
    pub program: Arc<AnnotatedGroundProgram>,
    pub scope: CheckScope,
    pub domain: Interpretation,
    pub cursor: usize,
    pub cache: EvalCache,
    pub last_found: Option<Vec<AtomId>>,
    pub stats: CheckerStats,
}

impl CheckerCore {
    pub(crate) fn new(
        ctx: UfsContext,
        program: Arc<AnnotatedGroundProgram>,
        scope: CheckScope,
    ) -> Self {
        Self {
            ctx,
            program,
            scope,
            domain: Interpretation::new(),
            cursor: 0,
            cache: EvalCache::new(),
            last_found: None,
            stats: CheckerStats::default(),
        }
    }

    /// Rules the scope is responsible for.
    pub(crate) fn scope_rules(&self) -> Vec<RuleId> {
        match self.scope {
            CheckScope::Monolithic => {
                (0..self.program.program().rules.len() as RuleId).collect()
            }
            CheckScope::Component(c) => self.program.component(c).rules.clone(),
        }
    }

    /// The working universe of candidate atoms for the scope: component
    /// atoms (or all program atoms) plus the auxiliaries in scope-rule
    /// bodies. The caller unions this into the domain, which only grows.
    pub(crate) fn scope_domain(&self) -> Interpretation {
        let program = self.program.program();
        let mut dom = match self.scope {
            CheckScope::Monolithic => {
                let mut d = program.edb.clone();
                for rule in &program.rules {
                    for &a in rule.head.iter().chain(&rule.body_pos).chain(&rule.body_neg) {
                        d.set(a);
                    }
                    for l in &rule.body_ext {
                        d.set(l.aux);
                    }
                }
                d
            }
            CheckScope::Component(c) => self.program.component(c).atoms.clone(),
        };
        if let CheckScope::Component(c) = self.scope {
            for &rid in &self.program.component(c).rules {
                for l in &program.rules[rid as usize].body_ext {
                    dom.set(l.aux);
                }
            }
        }
        dom
    }

    /// Splits the domain into ordinary atoms and external auxiliaries.
    pub(crate) fn split_domain(&self, registry: &Registry) -> (Interpretation, Interpretation) {
        let mut ordinary = Interpretation::new();
        let mut aux = Interpretation::new();
        for a in self.domain.iter() {
            if registry.is_external_aux(a) {
                aux.set(a);
            } else {
                ordinary.set(a);
            }
        }
        (ordinary, aux)
    }
}

/// Whether a weight rule participates in a positive cycle: some head
/// atom shares a component with some positive body atom.
pub(crate) fn weight_rule_cyclic(program: &AnnotatedGroundProgram, rule: &GroundRule) -> bool {
    rule.head.iter().any(|&h| {
        program.component_of(h).is_some()
            && rule
                .body_pos
                .iter()
                .any(|&b| program.component_of(b) == program.component_of(h))
    })
}

/// An unfounded-set checker, strategy chosen at construction.
///
/// `get_unfounded_set` returns an address list; empty means the
/// compatible set is locally stable for this checker's scope. A
/// non-empty result `U` satisfies the contract: `U` is inside the
/// domain, intersects the compatible set, no rule justifies it from
/// outside, and every auxiliary whose truth changed was re-verified by
/// actual or cached evaluation.
pub enum UnfoundedSetChecker {
    /// Rebuilds the detection problem on every call.
    Encoding(EncodingBasedUnfoundedSetChecker),
    /// Builds once and reuses the problem via assumptions.
    Assumption(AssumptionBasedUnfoundedSetChecker),
}

impl UnfoundedSetChecker {
    /// Creates a checker using the strategy from the context's
    /// configuration.
    pub fn new(
        ctx: UfsContext,
        program: Arc<AnnotatedGroundProgram>,
        scope: CheckScope,
    ) -> Result<Self> {
        let strategy = ctx.config.strategy;
        Self::with_strategy(ctx, program, scope, strategy)
    }

    /// Creates a checker with an explicit strategy, e.g. for running
    /// both side by side.
    pub fn with_strategy(
        ctx: UfsContext,
        program: Arc<AnnotatedGroundProgram>,
        scope: CheckScope,
        strategy: UfsStrategy,
    ) -> Result<Self> {
        debug!(?scope, ?strategy, "constructing unfounded set checker");
        match strategy {
            UfsStrategy::Encoding => Ok(Self::Encoding(EncodingBasedUnfoundedSetChecker::new(
                ctx, program, scope,
            ))),
            UfsStrategy::Assumption => Ok(Self::Assumption(
                AssumptionBasedUnfoundedSetChecker::new(ctx, program, scope)?,
            )),
        }
    }

    pub(crate) fn core(&self) -> &CheckerCore {
        match self {
            Self::Encoding(c) => &c.core,
            Self::Assumption(c) => &c.core,
        }
    }

    pub(crate) fn core_mut(&mut self) -> &mut CheckerCore {
        match self {
            Self::Encoding(c) => &mut c.core,
            Self::Assumption(c) => &mut c.core,
        }
    }

    /// Searches for an unfounded set of the compatible set. Rules in
    /// `skip` are left out of the check; their head atoms cannot join
    /// the result. An empty list means no unfounded set exists in this
    /// scope.
    pub fn get_unfounded_set(
        &mut self,
        compatible: &Interpretation,
        skip: &[RuleId],
    ) -> Result<Vec<AtomId>> {
        match self {
            Self::Encoding(c) => c.get_unfounded_set(compatible, skip),
            Self::Assumption(c) => c.get_unfounded_set(compatible, skip),
        }
    }

    /// Builds the conflict nogood justifying a previously found
    /// unfounded set against the given interpretation.
    ///
    /// Requesting a nogood before a non-empty unfounded set was found is
    /// a programming error.
    pub fn get_ufs_nogood(&self, ufs: &[AtomId], interpretation: &Interpretation) -> Nogood {
        let core = self.core();
        debug_assert!(
            core.last_found.is_some(),
            "unfounded set nogood requested before a set was found"
        );
        let registry = core.ctx.registry.read().expect("registry lock poisoned");
        let u = Interpretation::from_atoms(ufs.iter().copied());
        match core.ctx.config.nogood_strategy {
            NogoodStrategy::ReductBased => {
                reduct_based_nogood(&core.program, &registry, &u, interpretation)
            }
            NogoodStrategy::UfsBased => ufs_based_nogood(&core.program, &u, interpretation),
        }
    }

    /// Pulls unseen nogoods from the shared container into this
    /// checker's subproblem. `reset` rewinds the cursor first.
    pub fn learn_nogoods_from_main_search(&mut self, reset: bool) {
        if reset {
            self.core_mut().cursor = 0;
        }
        if let Self::Assumption(c) = self {
            c.inject_learned_nogoods();
        }
        // The encoding-based checker transforms learned nogoods against
        // the compatible set, so it consumes the container during the
        // next rebuild.
    }

    /// Adopts a grown program. The assumption-based checker expands its
    /// subproblem in place; the encoding-based one picks the growth up
    /// at the next rebuild.
    pub fn expand(&mut self, program: Arc<AnnotatedGroundProgram>) -> Result<()> {
        match self {
            Self::Encoding(c) => {
                c.core.program = program;
                Ok(())
            }
            Self::Assumption(c) => c.expand_and_reinstantiate(program),
        }
    }

    /// The checker's working domain. Grows monotonically over the
    /// checker's lifetime.
    #[must_use]
    pub fn domain(&self) -> &Interpretation {
        &self.core().domain
    }

    /// Checker statistics.
    #[must_use]
    pub fn stats(&self) -> &CheckerStats {
        &self.core().stats
    }
}
