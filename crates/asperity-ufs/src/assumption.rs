//! The build-once unfounded-set checker, reused via solver assumptions.
//!
//! The detection problem lives in a checker-owned variable space: every
//! program atom gets a primary variable (candidate membership for
//! ordinary atoms, guessed truth for auxiliaries) and an interpretation
//! shadow asserted per check through assumptions. Ordinary atoms
//! additionally get derived shadows `residual` (true in the compatible
//! set minus the candidate) and `became_false` (true in both), defined
//! once by permanent nogoods. Constraints quantifying over the current
//! domain snapshot carry a hook atom, so domain growth can neutralize
//! them without deletion.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use asperity_base::{AtomId, Error, Interpretation, Literal, Nogood, Result};
use asperity_ground::{AnnotatedGroundProgram, GroundProgram, GroundRule, Registry, RuleId};
use asperity_sat::NogoodSolver;
use tracing::{debug, trace};

use crate::checker::{weight_rule_cyclic, CheckScope, CheckerCore};
use crate::context::UfsContext;
use crate::verify::verify_external_atoms;

/// Solver variables backing one program atom.
#[derive(Debug, Clone, Copy)]
struct VarBundle {
    /// Candidate membership (ordinary) or guessed truth (auxiliary).
    primary: AtomId,
    /// True in the compatible set; assumed per check.
    shadow: AtomId,
    /// True in compatible set minus candidate. Ordinary atoms only.
    residual: Option<AtomId>,
    /// True in compatible set and candidate. Ordinary atoms only.
    became_false: Option<AtomId>,
}

/// Builds the detection problem once and reuses it across checks via
/// assumptions. Larger one-time cost, cheap repeated checks; the default
/// strategy when available.
pub struct AssumptionBasedUnfoundedSetChecker {
    pub(crate) core: CheckerCore,
    solver: NogoodSolver,
    bundles: HashMap<AtomId, VarBundle>,
    rules_encoded: HashSet<RuleId>,
    next_var: AtomId,
    hook: AtomId,
    /// Primary variables of domain atoms; the enumeration projection.
    scope_vars: Interpretation,
}

impl AssumptionBasedUnfoundedSetChecker {
    pub(crate) fn new(
        ctx: UfsContext,
        program: Arc<AnnotatedGroundProgram>,
        scope: CheckScope,
    ) -> Result<Self> {
        let mut checker = Self {
            core: CheckerCore::new(ctx, program, scope),
            solver: NogoodSolver::new(0),
            bundles: HashMap::new(),
            rules_encoded: HashSet::new(),
            next_var: 0,
            hook: 0,
            scope_vars: Interpretation::new(),
        };
        checker.hook = checker.alloc();

        let registry_handle = checker.core.ctx.registry.clone();
        let registry = registry_handle.read().expect("registry lock poisoned");
        checker.install_scope(&registry)?;
        Ok(checker)
    }

    pub(crate) fn get_unfounded_set(
        &mut self,
        compatible: &Interpretation,
        skip: &[RuleId],
    ) -> Result<Vec<AtomId>> {
        self.core.stats.checks += 1;
        if self.core.ctx.config.learn_from_main {
            self.inject_learned_nogoods();
        }

        let program = self.core.program.clone();
        let registry_handle = self.core.ctx.registry.clone();
        let (dom_ord, dom_aux) = {
            let registry = registry_handle.read().expect("registry lock poisoned");
            self.set_assumptions(compatible, skip, program.program());
            self.core.split_domain(&registry)
        };

        loop {
            let Some(model) = self.solver.next_model() else {
                trace!("detection problem exhausted, no unfounded set");
                return Ok(Vec::new());
            };
            self.core.stats.candidates += 1;

            let mut ufs = Interpretation::new();
            for a in dom_ord.iter() {
                if model.get(self.bundle(a).primary) {
                    ufs.set(a);
                }
            }
            let mut aux_guess = Interpretation::new();
            for a in dom_aux.iter() {
                if model.get(self.bundle(a).primary) {
                    aux_guess.set(a);
                }
            }

            if verify_external_atoms(
                &self.core.ctx,
                &program,
                &self.core.domain,
                &ufs,
                &aux_guess,
                compatible,
                &mut self.core.cache,
            )? {
                let result = ufs.to_vec();
                debug!(size = result.len(), "unfounded set verified");
                self.core.last_found = Some(result.clone());
                return Ok(result);
            }
            self.core.stats.rejected += 1;
        }
    }

    /// Adopts a grown program: retires the hook, allocates a fresh one,
    /// and emits only delta-scoped definitions and rules, live, without
    /// re-parsing the existing problem.
    pub(crate) fn expand_and_reinstantiate(
        &mut self,
        program: Arc<AnnotatedGroundProgram>,
    ) -> Result<()> {
        self.core.program = program;

        // Pinning the old hook false permanently neutralizes every soft
        // nogood emitted against the previous domain snapshot.
        let retired = self.hook;
        self.solver
            .add_nogood(Nogood::from_literals([Literal::pos(retired)]));
        self.hook = self.alloc();
        debug!(retired, hook = self.hook, "expanding detection problem");

        let registry_handle = self.core.ctx.registry.clone();
        let registry = registry_handle.read().expect("registry lock poisoned");
        self.install_scope(&registry)
    }

    /// Pulls unseen nogoods from the shared container, transforms them
    /// compatible-set-independently, and injects them permanently.
    pub(crate) fn inject_learned_nogoods(&mut self) {
        let registry_handle = self.core.ctx.registry.clone();
        let nogoods_handle = self.core.ctx.nogoods.clone();
        let registry = registry_handle.read().expect("registry lock poisoned");
        let container = nogoods_handle.lock().expect("nogood container poisoned");

        let mut transformed = Vec::new();
        for ng in container.since(self.core.cursor) {
            if let Some(t) = self.transform(ng, &registry) {
                transformed.push(t);
            }
        }
        self.core.cursor = container.len();
        drop(container);
        drop(registry);

        let injected = transformed.len();
        for t in transformed {
            self.solver.add_nogood(t);
        }
        if injected > 0 {
            trace!(injected, "injected transformed nogoods from main search");
        }
    }

    /// Encodes everything of the scope that is not yet encoded: atom
    /// definitions for new domain atoms, new rules, and fresh soft
    /// constraints under the current hook.
    fn install_scope(&mut self, registry: &Registry) -> Result<()> {
        let target = self.core.scope_domain();
        let program = self.core.program.clone();
        let prog = program.program();

        let new_atoms: Vec<AtomId> = target
            .iter()
            .filter(|&a| !self.core.domain.get(a))
            .collect();
        for &a in &new_atoms {
            self.ensure_bundle(a, registry, true);
            if prog.edb.get(a) {
                // Facts are never unfounded.
                let p = self.bundle(a).primary;
                self.solver.add_nogood(Nogood::from_literals([Literal::pos(p)]));
            }
        }
        self.core.domain.union_with(&target);

        for rid in self.core.scope_rules() {
            if self.rules_encoded.contains(&rid) {
                continue;
            }
            self.encode_rule(rid, &prog.rules[rid as usize], &program, registry)?;
            self.rules_encoded.insert(rid);
        }

        self.emit_soft_constraints(&program, registry);
        Ok(())
    }

    /// Allocates a fresh solver variable.
    fn alloc(&mut self) -> AtomId {
        let v = self.next_var;
        self.next_var += 1;
        self.solver.reserve(self.next_var as usize);
        v
    }

    fn bundle(&self, atom: AtomId) -> &VarBundle {
        self.bundles.get(&atom).expect("atom without variable bundle")
    }

    /// Creates the variable bundle and shadow definitions for a program
    /// atom. Atoms referenced by scope rules but outside the domain get
    /// a bundle too, with their primary pinned excluded.
    fn ensure_bundle(&mut self, atom: AtomId, registry: &Registry, in_domain: bool) {
        if self.bundles.contains_key(&atom) {
            return;
        }
        let primary = self.alloc();
        let shadow = self.alloc();

        let (residual, became_false) = if registry.is_external_aux(atom) {
            (None, None)
        } else {
            let r = self.alloc();
            let f = self.alloc();
            // r is true exactly when the atom is true in the compatible
            // set and not in the candidate.
            self.solver
                .add_nogood(Nogood::from_literals([Literal::pos(r), Literal::neg(shadow)]));
            self.solver
                .add_nogood(Nogood::from_literals([Literal::pos(r), Literal::pos(primary)]));
            self.solver.add_nogood(Nogood::from_literals([
                Literal::neg(r),
                Literal::pos(shadow),
                Literal::neg(primary),
            ]));
            // f is true exactly when the atom is true in the compatible
            // set and in the candidate.
            self.solver
                .add_nogood(Nogood::from_literals([Literal::pos(f), Literal::neg(shadow)]));
            self.solver
                .add_nogood(Nogood::from_literals([Literal::pos(f), Literal::neg(primary)]));
            self.solver.add_nogood(Nogood::from_literals([
                Literal::neg(f),
                Literal::pos(shadow),
                Literal::pos(primary),
            ]));
            (Some(r), Some(f))
        };

        if in_domain {
            self.scope_vars.set(primary);
        } else {
            self.solver
                .add_nogood(Nogood::from_literals([Literal::pos(primary)]));
        }

        self.bundles.insert(
            atom,
            VarBundle {
                primary,
                shadow,
                residual,
                became_false,
            },
        );
    }

    fn encode_rule(
        &mut self,
        rid: RuleId,
        rule: &GroundRule,
        program: &AnnotatedGroundProgram,
        registry: &Registry,
    ) -> Result<()> {
        for &a in rule.head.iter().chain(&rule.body_pos).chain(&rule.body_neg) {
            let in_domain = self.core.domain.get(a);
            self.ensure_bundle(a, registry, in_domain);
        }
        for l in &rule.body_ext {
            let in_domain = self.core.domain.get(l.aux);
            self.ensure_bundle(l.aux, registry, in_domain);
        }

        if rule.is_weight() {
            if weight_rule_cyclic(program, rule) && !self.core.ctx.config.tolerate_weight_cycles {
                return Err(Error::UnsupportedStructure(format!(
                    "weight rule {} (head {}) participates in a cycle",
                    rid,
                    rule.head
                        .first()
                        .map(|&h| registry.atom_text(h))
                        .unwrap_or_default()
                )));
            }
            for &h in &rule.head {
                let p = self.bundle(h).primary;
                self.solver.add_nogood(Nogood::from_literals([Literal::pos(p)]));
            }
            return Ok(());
        }

        let hr = self.alloc();

        // hr is true exactly when the head intersects the candidate.
        let mut bind = Nogood::from_literals([Literal::pos(hr)]);
        for &h in &rule.head {
            bind.insert(Literal::neg(self.bundle(h).primary));
        }
        self.solver.add_nogood(bind);
        for &h in &rule.head {
            self.solver.add_nogood(Nogood::from_literals([
                Literal::neg(hr),
                Literal::pos(self.bundle(h).primary),
            ]));
        }

        // The crux, phrased over shadows so it is valid for every
        // compatible set: while the head intersects the candidate, it is
        // forbidden that every positive body atom survives withdrawal,
        // the negative body stays false, every external literal keeps a
        // body-satisfying value, and no true head atom survives outside
        // the candidate.
        let mut crux = Nogood::from_literals([Literal::pos(hr)]);
        for &b in &rule.body_pos {
            let r = self
                .bundle(b)
                .residual
                .expect("ordinary body atom without residual shadow");
            crux.insert(Literal::pos(r));
        }
        for &n in &rule.body_neg {
            crux.insert(Literal::neg(self.bundle(n).shadow));
        }
        for l in &rule.body_ext {
            let b = *self.bundle(l.aux);
            crux.insert(Literal::new(b.shadow, l.positive));
            crux.insert(Literal::new(b.primary, l.positive));
        }
        for &h in &rule.head {
            let r = self
                .bundle(h)
                .residual
                .expect("head atom without residual shadow");
            crux.insert(Literal::neg(r));
        }
        self.solver.add_nogood(crux);
        Ok(())
    }

    /// Emits the constraints that quantify over the current domain
    /// snapshot, guarded by the live hook: the nonempty/overlap
    /// constraint and the external-behavior nogoods.
    fn emit_soft_constraints(&mut self, program: &AnnotatedGroundProgram, registry: &Registry) {
        let (dom_ord, dom_aux) = self.core.split_domain(registry);

        let mut nonempty = Nogood::from_literals([Literal::pos(self.hook)]);
        for a in dom_ord.iter() {
            let f = self
                .bundle(a)
                .became_false
                .expect("ordinary domain atom without became-false shadow");
            nonempty.insert(Literal::neg(f));
        }
        self.solver.add_nogood(nonempty);

        if self.core.ctx.config.external_behavior_nogoods {
            let prog = program.program();
            for e in 0..prog.externals.len() as u32 {
                let omask = program.output_mask(e);
                if !omask.intersects(&dom_aux) {
                    continue;
                }
                let mut base = Nogood::from_literals([Literal::pos(self.hook)]);
                for i in program.input_mask(e).iter() {
                    if dom_ord.get(i) {
                        let f = self
                            .bundle(i)
                            .became_false
                            .expect("input atom without became-false shadow");
                        base.insert(Literal::neg(f));
                    }
                }
                for aux in omask.iter() {
                    if !dom_aux.get(aux) {
                        continue;
                    }
                    let b = *self.bundle(aux);
                    let mut flip_down = base.clone();
                    flip_down.insert(Literal::pos(b.shadow));
                    flip_down.insert(Literal::neg(b.primary));
                    self.solver.add_nogood(flip_down);

                    let mut flip_up = base.clone();
                    flip_up.insert(Literal::neg(b.shadow));
                    flip_up.insert(Literal::pos(b.primary));
                    self.solver.add_nogood(flip_up);
                }
            }
        }
    }

    /// Pushes the per-check assumptions: shadow values for every encoded
    /// atom, exclusion pins for false non-auxiliary atoms and skip-rule
    /// heads, and the live hook.
    fn set_assumptions(
        &mut self,
        compatible: &Interpretation,
        skip: &[RuleId],
        prog: &GroundProgram,
    ) {
        let mut assumptions = vec![Literal::pos(self.hook)];
        for (&atom, bundle) in &self.bundles {
            assumptions.push(Literal::new(bundle.shadow, compatible.get(atom)));
            if bundle.residual.is_some() && self.core.domain.get(atom) && !compatible.get(atom) {
                // False non-auxiliary atoms cannot join the candidate.
                assumptions.push(Literal::neg(bundle.primary));
            }
        }
        for &rid in skip {
            for &h in &prog.rules[rid as usize].head {
                if let Some(b) = self.bundles.get(&h) {
                    assumptions.push(Literal::neg(b.primary));
                }
            }
        }
        self.solver.restart_with_assumptions(assumptions);
        self.solver.set_projection_scope(&self.scope_vars);
    }

    /// Transforms a main-search nogood into this checker's literal
    /// space. Independent of any compatible set: ordinary literals map
    /// onto the residual shadow, auxiliary literals onto their primary
    /// after normalization. Nogoods that would expand the domain are
    /// dropped.
    fn transform(&self, nogood: &Nogood, registry: &Registry) -> Option<Nogood> {
        let mut out = Nogood::new();
        for &lit in nogood.literals() {
            let lit = registry.normalize_literal(lit)?;
            let atom = lit.atom();
            let bundle = self.bundles.get(&atom)?;
            if registry.is_external_aux(atom) {
                if !self.core.domain.get(atom) {
                    return None;
                }
                out.insert(Literal::new(bundle.primary, lit.positive()));
            } else {
                let r = bundle.residual?;
                out.insert(Literal::new(r, lit.positive()));
            }
        }
        if out.is_empty() {
            return None;
        }
        Some(out)
    }
}
