//! External-atom verification of unfounded-set candidates.
//!
//! A candidate produced by the embedded solver guesses, for every domain
//! auxiliary, its truth under the withdrawn interpretation. Guesses that
//! differ from the compatible set are never taken on faith: the producing
//! external atom is re-evaluated (or decided through its support sets)
//! and any mismatch rejects the candidate.

use asperity_base::traits::NogoodSink;
use asperity_base::{Interpretation, Result};
use asperity_ground::AnnotatedGroundProgram;
use asperity_plugin::{evaluate_external, EvalCache, OutputIntegrator};
use tracing::trace;

use crate::context::UfsContext;
use crate::status::VerificationStatus;

/// Verifies one candidate against the external-atom semantics.
///
/// `ufs_ordinary` holds the withdrawn ordinary atoms; `candidate_aux` the
/// guessed auxiliary values. Returns whether every pending auxiliary
/// resolves without a mismatch. Each external atom is evaluated at most
/// once per pass.
pub(crate) fn verify_external_atoms(
    ctx: &UfsContext,
    program: &AnnotatedGroundProgram,
    domain: &Interpretation,
    ufs_ordinary: &Interpretation,
    candidate_aux: &Interpretation,
    compatible: &Interpretation,
    cache: &mut EvalCache,
) -> Result<bool> {
    let registry = ctx.registry.read().expect("registry lock poisoned");

    let mut status =
        VerificationStatus::build(program, &registry, domain, candidate_aux, compatible);
    if status.is_empty() {
        return Ok(true);
    }

    // Evaluation input: the compatible set with the withdrawn ordinary
    // atoms removed, auxiliaries kept.
    let mut input = compatible.clone();
    input.difference_with(ufs_ordinary);

    let eval_cfg = ctx.config.eval_config();
    let mut evaluated = Interpretation::new();

    for e in status.externals() {
        let external = &program.program().externals[e as usize];
        let plugin = ctx.plugins.resolve(registry.symbol_text(external.plugin))?;

        let support = if ctx.config.use_support_sets {
            plugin.support_sets()
        } else {
            None
        };
        match support {
            Some(sets) => {
                // Complete support family: an output holds iff some set
                // fires under the withdrawn input.
                for ss in sets {
                    if ss.fires(&registry, &input) {
                        if let Some(aux) = registry.lookup_external_aux(e, &ss.output, false) {
                            evaluated.set(aux);
                        }
                    }
                }
            }
            None => {
                let mut integrator = OutputIntegrator::new();
                if ctx.config.external_learning {
                    let mut container = ctx.nogoods.lock().expect("nogood container poisoned");
                    evaluate_external(
                        &registry,
                        e,
                        external,
                        program.input_mask(e),
                        program.output_mask(e),
                        &input,
                        plugin.as_ref(),
                        cache,
                        &eval_cfg,
                        &mut integrator,
                        Some(&mut *container as &mut dyn NogoodSink),
                    )?;
                } else {
                    evaluate_external(
                        &registry,
                        e,
                        external,
                        program.input_mask(e),
                        program.output_mask(e),
                        &input,
                        plugin.as_ref(),
                        cache,
                        &eval_cfg,
                        &mut integrator,
                        None,
                    )?;
                }
                evaluated.union_with(integrator.output());
            }
        }

        for aux in status.mark_evaluated(e) {
            if evaluated.get(aux) != candidate_aux.get(aux) {
                trace!(aux, external = e, "auxiliary guess contradicts evaluation");
                return Ok(false);
            }
        }
    }

    Ok(true)
}
