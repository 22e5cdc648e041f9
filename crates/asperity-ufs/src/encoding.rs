//! The rebuild-every-call unfounded-set checker.
//!
//! Each check constructs a fresh detection problem over the program
//! atoms (candidate membership for ordinary atoms, guessed truth for
//! auxiliaries) plus one fresh head indicator per rule, enumerates its
//! models, and verifies each candidate against the external semantics.

use std::collections::HashSet;
use std::sync::Arc;

use asperity_base::{AtomId, Error, Interpretation, Literal, Nogood, Result};
use asperity_ground::{AnnotatedGroundProgram, Registry, RuleId};
use asperity_sat::NogoodSolver;
use tracing::{debug, trace};

use crate::checker::{weight_rule_cyclic, CheckScope, CheckerCore};
use crate::context::UfsContext;
use crate::verify::verify_external_atoms;

/// Rebuilds the full subproblem every call. Pays the construction cost
/// each time but never carries stale state; suited to infrequent or
/// volatile checks.
pub struct EncodingBasedUnfoundedSetChecker {
    pub(crate) core: CheckerCore,
}

impl EncodingBasedUnfoundedSetChecker {
    pub(crate) fn new(
        ctx: UfsContext,
        program: Arc<AnnotatedGroundProgram>,
        scope: CheckScope,
    ) -> Self {
        Self {
            core: CheckerCore::new(ctx, program, scope),
        }
    }

    pub(crate) fn get_unfounded_set(
        &mut self,
        compatible: &Interpretation,
        skip: &[RuleId],
    ) -> Result<Vec<AtomId>> {
        self.core.stats.checks += 1;
        let program = self.core.program.clone();
        let registry_handle = self.core.ctx.registry.clone();

        let (mut solver, dom_ord, dom_aux) = {
            let registry = registry_handle.read().expect("registry lock poisoned");
            self.core.domain.union_with(&self.core.scope_domain());
            let (dom_ord, dom_aux) = self.core.split_domain(&registry);
            let solver = self.build(&registry, &program, compatible, skip, &dom_ord, &dom_aux)?;
            (solver, dom_ord, dom_aux)
        };

        loop {
            let Some(model) = solver.next_model() else {
                trace!("detection problem exhausted, no unfounded set");
                return Ok(Vec::new());
            };
            self.core.stats.candidates += 1;

            let assignment = model.to_interpretation();
            let mut ufs = assignment.clone();
            ufs.intersect_with(&dom_ord);
            let mut aux_guess = assignment;
            aux_guess.intersect_with(&dom_aux);

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

    /// Builds the detection problem for one compatible set.
    fn build(
        &mut self,
        registry: &Registry,
        program: &AnnotatedGroundProgram,
        compatible: &Interpretation,
        skip: &[RuleId],
        dom_ord: &Interpretation,
        dom_aux: &Interpretation,
    ) -> Result<NogoodSolver> {
        let prog = program.program();
        let skip_set: HashSet<RuleId> = skip.iter().copied().collect();
        let config = &self.core.ctx.config;

        let mut solver = NogoodSolver::new(registry.num_atoms());
        let mut next_var = registry.num_atoms() as AtomId;
        let mut pinned = Interpretation::new();

        // --- Necessary part -------------------------------------------

        for rid in self.core.scope_rules() {
            let rule = &prog.rules[rid as usize];

            if skip_set.contains(&rid) {
                for &h in &rule.head {
                    pin(&mut solver, &mut pinned, h);
                }
                continue;
            }

            // Ordinary atoms outside this checker's universe can never
            // join the candidate. Auxiliaries of scope-rule bodies are
            // always part of the domain.
            for &a in rule.head.iter().chain(&rule.body_pos) {
                if !self.core.domain.get(a) {
                    pin(&mut solver, &mut pinned, a);
                }
            }

            if rule.is_weight() {
                if weight_rule_cyclic(program, rule) && !config.tolerate_weight_cycles {
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
                    pin(&mut solver, &mut pinned, h);
                }
                continue;
            }

            if !rule.body_satisfied(compatible) {
                continue;
            }

            let hr = next_var;
            next_var += 1;

            // hr is true exactly when the head intersects the candidate.
            let mut bind = Nogood::from_literals([Literal::pos(hr)]);
            for &h in &rule.head {
                bind.insert(Literal::neg(h));
            }
            solver.add_nogood(bind);
            for &h in &rule.head {
                solver.add_nogood(Nogood::from_literals([Literal::neg(hr), Literal::pos(h)]));
            }

            // The crux: while the head intersects the candidate, it is
            // forbidden that no positive body atom is withdrawn, every
            // external literal keeps its compatible-set value, and every
            // true head atom is inside the candidate.
            let mut crux = Nogood::from_literals([Literal::pos(hr)]);
            for &b in &rule.body_pos {
                if compatible.get(b) {
                    crux.insert(Literal::neg(b));
                }
            }
            for l in &rule.body_ext {
                crux.insert(Literal::new(l.aux, compatible.get(l.aux)));
            }
            for &h in &rule.head {
                if compatible.get(h) {
                    crux.insert(Literal::pos(h));
                }
            }
            solver.add_nogood(crux);
        }

        // Facts are never unfounded.
        for a in prog.edb.iter() {
            if self.core.domain.get(a) {
                pin(&mut solver, &mut pinned, a);
            }
        }

        // --- Optimization part (solution-set preserving) --------------

        for a in dom_ord.iter() {
            if !compatible.get(a) {
                pin(&mut solver, &mut pinned, a);
            }
        }

        if config.external_behavior_nogoods {
            for e in 0..prog.externals.len() as u32 {
                let omask = program.output_mask(e);
                if !omask.intersects(dom_aux) {
                    continue;
                }
                let mut base = Nogood::new();
                for i in program.input_mask(e).iter() {
                    if dom_ord.get(i) && compatible.get(i) {
                        base.insert(Literal::neg(i));
                    }
                }
                for aux in omask.iter() {
                    if dom_aux.get(aux) {
                        let mut ng = base.clone();
                        ng.insert(Literal::new(aux, !compatible.get(aux)));
                        solver.add_nogood(ng);
                    }
                }
            }
        }

        if config.learn_from_main {
            let container = self.core.ctx.nogoods.lock().expect("nogood container poisoned");
            let mut injected = 0usize;
            for ng in container.since(self.core.cursor) {
                if let Some(t) =
                    transform_learned(ng, compatible, registry, &self.core.domain)
                {
                    solver.add_nogood(t);
                    injected += 1;
                }
            }
            self.core.cursor = container.len();
            trace!(injected, "copied transformed nogoods from main search");
        }

        // The candidate must intersect the compatible set.
        let nonempty: Nogood = dom_ord
            .iter()
            .filter(|&a| compatible.get(a) && !pinned.get(a))
            .map(Literal::neg)
            .collect();
        solver.add_nogood(nonempty);

        solver.set_projection_scope(&self.core.domain);
        Ok(solver)
    }
}

/// Pins an atom out of the candidate, once.
fn pin(solver: &mut NogoodSolver, pinned: &mut Interpretation, atom: AtomId) {
    if !pinned.get(atom) {
        pinned.set(atom);
        solver.add_nogood(Nogood::from_literals([Literal::pos(atom)]));
    }
}

/// Transforms a nogood learned by the main search into the detection
/// problem's literal space, against the current compatible set: the
/// injected constraint asserts that the withdrawn interpretation does
/// not violate the original nogood. Returns `None` when the nogood can
/// never fire here or would have to expand the domain.
fn transform_learned(
    nogood: &Nogood,
    compatible: &Interpretation,
    registry: &Registry,
    domain: &Interpretation,
) -> Option<Nogood> {
    let mut out = Nogood::new();
    for &lit in nogood.literals() {
        let lit = registry.normalize_literal(lit)?;
        let a = lit.atom();
        if registry.is_external_aux(a) {
            if !domain.get(a) {
                return None;
            }
            out.insert(lit);
        } else if lit.positive() {
            // The atom must hold after withdrawal: true in the
            // compatible set and not withdrawn.
            if !compatible.get(a) {
                return None;
            }
            if domain.get(a) {
                out.insert(Literal::neg(a));
            }
            // A true atom outside the domain cannot be withdrawn; the
            // literal holds unconditionally.
        } else {
            // The atom must be false after withdrawal.
            if compatible.get(a) {
                if !domain.get(a) {
                    return None;
                }
                out.insert(Literal::pos(a));
            }
        }
    }
    if out.is_empty() {
        return None;
    }
    Some(out)
}
