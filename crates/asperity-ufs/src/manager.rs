//! Per-component orchestration of unfounded-set checks.

use std::sync::Arc;

use asperity_base::{AtomId, Interpretation, Nogood, Result};
use asperity_ground::{AnnotatedGroundProgram, RuleId};
use tracing::{debug, error, trace};

use crate::checker::{CheckScope, UnfoundedSetChecker};
use crate::config::UfsStrategy;
use crate::context::UfsContext;

/// Manager statistics.
#[derive(Debug, Clone, Default)]
pub struct UfsStats {
    /// Number of `get_unfounded_set` rounds.
    pub checks: u64,
    /// Rounds skipped because the global criteria held trivially.
    pub skipped_trivially: u64,
    /// Components skipped inside rounds.
    pub components_skipped: u64,
    /// Rounds that produced a non-empty unfounded set.
    pub ufs_found: u64,
}

/// Which checker produced the last non-empty result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckerSlot {
    Monolithic,
    Component(usize),
}

struct LastCheck {
    ufs: Vec<AtomId>,
    slot: CheckerSlot,
}

/// Owns the per-component checkers and short-circuits rounds.
///
/// A round is skipped entirely when the program has no head cycles and no
/// relevant external-atom cycles. In component mode, a component is
/// skipped when it has no head cycles, does not intersect a head-cyclic
/// disjunctive rule of another component, and has no external-atom
/// cycle; the first component yielding a non-empty unfounded set ends
/// the round.
pub struct UnfoundedSetCheckerManager {
    ctx: UfsContext,
    program: Arc<AnnotatedGroundProgram>,
    monolithic: Option<UnfoundedSetChecker>,
    per_component: Vec<Option<UnfoundedSetChecker>>,
    /// Component intersects a head-cyclic disjunctive rule whose cycle
    /// lives in another component.
    foreign_disjunctive: Vec<bool>,
    last: Option<LastCheck>,
    stats: UfsStats,
}

impl UnfoundedSetCheckerManager {
    /// Creates a manager over an annotated program. With eager
    /// construction configured, all relevant checkers are built up
    /// front.
    pub fn new(ctx: UfsContext, program: Arc<AnnotatedGroundProgram>) -> Result<Self> {
        let foreign_disjunctive = derive_foreign_disjunctive(&program);
        let mut manager = Self {
            per_component: (0..program.components().len()).map(|_| None).collect(),
            monolithic: None,
            foreign_disjunctive,
            ctx,
            program,
            last: None,
            stats: UfsStats::default(),
        };
        if manager.ctx.config.eager_checkers {
            manager.build_eagerly()?;
        }
        Ok(manager)
    }

    fn build_eagerly(&mut self) -> Result<()> {
        if self.ctx.config.monolithic {
            self.ensure_monolithic()?;
        } else {
            for c in 0..self.program.components().len() {
                if self.component_needs_check(c) {
                    self.ensure_component(c)?;
                }
            }
        }
        Ok(())
    }

    /// Whether any check is needed for this program at all.
    fn needs_check(&self) -> bool {
        self.program.has_head_cycles()
            || (self.program.has_externals() && self.program.has_e_cycles())
    }

    /// Whether one component can contribute an unfounded set.
    fn component_needs_check(&self, c: usize) -> bool {
        let comp = self.program.component(c);
        comp.head_cycles || self.foreign_disjunctive[c] || comp.e_cycles
    }

    fn ensure_monolithic(&mut self) -> Result<()> {
        if self.monolithic.is_none() {
            self.monolithic = Some(UnfoundedSetChecker::new(
                self.ctx.clone(),
                self.program.clone(),
                CheckScope::Monolithic,
            )?);
        }
        Ok(())
    }

    fn ensure_component(&mut self, c: usize) -> Result<()> {
        if self.per_component[c].is_none() {
            self.per_component[c] = Some(UnfoundedSetChecker::new(
                self.ctx.clone(),
                self.program.clone(),
                CheckScope::Component(c),
            )?);
        }
        Ok(())
    }

    /// Searches the compatible set for an unfounded set, component by
    /// component or monolithically. Returns the first verified set, or
    /// an empty list when the compatible set is founded.
    pub fn get_unfounded_set(
        &mut self,
        compatible: &Interpretation,
        skip: &[RuleId],
    ) -> Result<Vec<AtomId>> {
        self.stats.checks += 1;
        self.last = None;

        if !self.needs_check() {
            self.stats.skipped_trivially += 1;
            trace!("no head or external cycles, check skipped");
            return Ok(Vec::new());
        }

        let result = if self.ctx.config.monolithic {
            self.ensure_monolithic()?;
            let checker = self.monolithic.as_mut().expect("monolithic checker built");
            let ufs = checker.get_unfounded_set(compatible, skip)?;
            if !ufs.is_empty() {
                self.last = Some(LastCheck {
                    ufs: ufs.clone(),
                    slot: CheckerSlot::Monolithic,
                });
            }
            ufs
        } else {
            let mut found = Vec::new();
            for c in 0..self.program.components().len() {
                if !self.component_needs_check(c) {
                    self.stats.components_skipped += 1;
                    continue;
                }
                self.ensure_component(c)?;
                let checker = self.per_component[c]
                    .as_mut()
                    .expect("component checker built");
                let ufs = checker.get_unfounded_set(compatible, skip)?;
                if !ufs.is_empty() {
                    debug!(component = c, size = ufs.len(), "component yielded unfounded set");
                    self.last = Some(LastCheck {
                        ufs: ufs.clone(),
                        slot: CheckerSlot::Component(c),
                    });
                    found = ufs;
                    break;
                }
            }
            found
        };

        if !result.is_empty() {
            self.stats.ufs_found += 1;
        }
        if self.ctx.config.cross_check {
            self.cross_check(compatible, skip, !result.is_empty())?;
        }
        Ok(result)
    }

    /// The conflict nogood for the last non-empty result, built against
    /// the given interpretation. `None` (and a debug assertion) when no
    /// unfounded set was found first.
    pub fn get_last_ufs_nogood(&self, compatible: &Interpretation) -> Option<Nogood> {
        debug_assert!(
            self.last.is_some(),
            "unfounded set nogood requested before a set was found"
        );
        let last = self.last.as_ref()?;
        let checker = match last.slot {
            CheckerSlot::Monolithic => self.monolithic.as_ref()?,
            CheckerSlot::Component(c) => self.per_component[c].as_ref()?,
        };
        Some(checker.get_ufs_nogood(&last.ufs, compatible))
    }

    /// Adopts a grown program from incremental grounding. The
    /// cross-component intersection flags are re-derived; checkers whose
    /// component was restructured are dropped and rebuilt lazily, the
    /// rest expand in place.
    pub fn extend(&mut self, program: Arc<AnnotatedGroundProgram>) -> Result<()> {
        let old = std::mem::replace(&mut self.program, program);
        self.foreign_disjunctive = derive_foreign_disjunctive(&self.program);
        self.last = None;

        let new_len = self.program.components().len();
        let mut checkers = std::mem::take(&mut self.per_component);
        checkers.resize_with(new_len, || None);
        for (c, slot) in checkers.iter_mut().enumerate() {
            if slot.is_none() {
                continue;
            }
            let unchanged = old
                .components()
                .get(c)
                .map(|comp| comp.atoms == self.program.component(c).atoms)
                .unwrap_or(false);
            if unchanged {
                if let Some(checker) = slot.as_mut() {
                    checker.expand(self.program.clone())?;
                }
            } else {
                debug!(component = c, "component restructured, dropping its checker");
                *slot = None;
            }
        }
        self.per_component = checkers;

        if let Some(m) = self.monolithic.as_mut() {
            m.expand(self.program.clone())?;
        }
        Ok(())
    }

    /// Debug scaffolding: runs a from-scratch encoding-based monolithic
    /// check and compares non-emptiness with the primary result.
    fn cross_check(
        &self,
        compatible: &Interpretation,
        skip: &[RuleId],
        primary_nonempty: bool,
    ) -> Result<()> {
        let mut reference = UnfoundedSetChecker::with_strategy(
            self.ctx.clone(),
            self.program.clone(),
            CheckScope::Monolithic,
            UfsStrategy::Encoding,
        )?;
        let reference_ufs = reference.get_unfounded_set(compatible, skip)?;
        if reference_ufs.is_empty() == primary_nonempty {
            error!(
                primary_nonempty,
                reference_nonempty = !reference_ufs.is_empty(),
                "strategy cross-check disagrees"
            );
        }
        Ok(())
    }

    /// Manager statistics.
    #[must_use]
    pub fn stats(&self) -> &UfsStats {
        &self.stats
    }

    /// The program currently checked against.
    #[must_use]
    pub fn program(&self) -> &Arc<AnnotatedGroundProgram> {
        &self.program
    }
}

/// For every component: does a disjunctive rule whose head cycles
/// through some other component also touch this one? Disjunction-as-
/// choice encodings can let several components jointly justify atoms, so
/// such components cannot be skipped.
fn derive_foreign_disjunctive(program: &AnnotatedGroundProgram) -> Vec<bool> {
    let n = program.components().len();
    let mut flags = vec![false; n];
    for rule in &program.program().rules {
        if !rule.is_disjunctive() {
            continue;
        }
        // Components holding at least two head atoms of this rule.
        let mut homes: Vec<usize> = Vec::new();
        let mut seen: Vec<usize> = Vec::new();
        for &h in &rule.head {
            if let Some(c) = program.component_of(h) {
                if seen.contains(&c) && !homes.contains(&c) {
                    homes.push(c);
                }
                seen.push(c);
            }
        }
        if homes.is_empty() {
            continue;
        }
        for &h in &rule.head {
            if let Some(c) = program.component_of(h) {
                if !homes.contains(&c) {
                    flags[c] = true;
                }
            }
        }
    }
    flags
}
