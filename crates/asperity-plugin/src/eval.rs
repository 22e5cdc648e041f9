//! Driving one external-atom evaluation: projection, caching, events,
//! and incidental nogood learning.

use std::collections::HashMap;
use std::sync::Arc;

use asperity_base::traits::NogoodSink;
use asperity_base::{AtomId, Error, Interpretation, Literal, Nogood, Result};
use asperity_ground::{ExternalAtom, ExternalAtomId, Registry, Symbol};
use tracing::{trace, warn};

use crate::atom::{PluginAtom, Query, Tuple};
use crate::events::{EvalEvent, EvalSink};

/// Evaluation behavior toggles.
#[derive(Debug, Clone, Default)]
pub struct EvalConfig {
    /// Escalate malformed output tuples instead of dropping them with a
    /// warning.
    pub strict_tuples: bool,
    /// Emit io-nogoods (input state implies output) into the learner.
    pub learn_io_nogoods: bool,
    /// Also emit negative io-nogoods for known auxiliaries the source
    /// did not output. Requires the full input valuation, so these are
    /// emitted regardless of monotonicity declarations.
    pub learn_negative: bool,
}

/// Cache of evaluation results keyed by (external atom, projected input).
///
/// A hit drives exactly the event sequence the original computation
/// drove.
#[derive(Debug, Default)]
pub struct EvalCache {
    map: HashMap<(ExternalAtomId, Vec<AtomId>), Arc<Vec<Tuple>>>,
    /// Number of lookups answered from the cache.
    pub hits: u64,
    /// Number of lookups that went to the plugin.
    pub misses: u64,
}

impl EvalCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&mut self, key: &(ExternalAtomId, Vec<AtomId>)) -> Option<Arc<Vec<Tuple>>> {
        let hit = self.map.get(key).cloned();
        if hit.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        hit
    }

    fn store(&mut self, key: (ExternalAtomId, Vec<AtomId>), outputs: Arc<Vec<Tuple>>) {
        self.map.insert(key, outputs);
    }
}

/// Evaluates one external atom under the given interpretation.
///
/// Projects the interpretation to the atom's input mask, serves the
/// output tuples from the cache or the plugin, arity-checks them, and
/// drives the event stream into `sink`. With learning enabled, the
/// behavior observed is pushed into `learner` as io-nogoods.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_external(
    registry: &Registry,
    external_id: ExternalAtomId,
    external: &ExternalAtom,
    input_mask: &Interpretation,
    output_mask: &Interpretation,
    interpretation: &Interpretation,
    plugin: &dyn PluginAtom,
    cache: &mut EvalCache,
    config: &EvalConfig,
    sink: &mut dyn EvalSink,
    mut learner: Option<&mut dyn NogoodSink>,
) -> Result<()> {
    let mut projected = interpretation.clone();
    projected.intersect_with(input_mask);
    let constants: Vec<Symbol> = external.constant_inputs().collect();

    let key = (external_id, projected.to_vec());
    let outputs = match cache.lookup(&key) {
        Some(cached) => {
            trace!(external = external_id, "evaluation served from cache");
            cached
        }
        None => {
            let query = Query {
                registry,
                projected: &projected,
                constants: &constants,
            };
            let raw = plugin.retrieve(&query)?;
            let mut accepted = Vec::with_capacity(raw.len());
            for tuple in raw {
                if tuple.len() != external.output_arity {
                    if config.strict_tuples {
                        return Err(Error::MalformedOutput {
                            plugin: plugin.name().to_string(),
                            detail: format!(
                                "arity {} does not match declared {}",
                                tuple.len(),
                                external.output_arity
                            ),
                        });
                    }
                    warn!(
                        plugin = plugin.name(),
                        arity = tuple.len(),
                        declared = external.output_arity,
                        "dropping malformed output tuple"
                    );
                    continue;
                }
                accepted.push(tuple);
            }
            let accepted = Arc::new(accepted);
            cache.store(key, accepted.clone());
            accepted
        }
    };

    sink.on_event(registry, EvalEvent::Atom(external_id))?;
    sink.on_event(registry, EvalEvent::Input(&constants))?;
    for tuple in outputs.iter() {
        sink.on_event(registry, EvalEvent::Output(tuple))?;
    }

    if config.learn_io_nogoods {
        if let Some(learner) = learner.as_deref_mut() {
            learn_io_nogoods(
                registry,
                external_id,
                input_mask,
                output_mask,
                &projected,
                plugin.monotonic(),
                config.learn_negative,
                &outputs,
                learner,
            );
        }
    }

    Ok(())
}

/// Emits the observed input/output behavior as nogoods: the recorded
/// input state together with the opposite of an output's actual truth is
/// forbidden.
#[allow(clippy::too_many_arguments)]
fn learn_io_nogoods(
    registry: &Registry,
    external_id: ExternalAtomId,
    input_mask: &Interpretation,
    output_mask: &Interpretation,
    projected: &Interpretation,
    monotonic: bool,
    learn_negative: bool,
    outputs: &[Tuple],
    learner: &mut dyn NogoodSink,
) {
    let mut absent = input_mask.clone();
    absent.difference_with(projected);

    let full_valuation = |ng: &mut Nogood| {
        for i in projected.iter() {
            ng.insert(Literal::pos(i));
        }
        for i in absent.iter() {
            ng.insert(Literal::neg(i));
        }
    };

    let mut produced = Interpretation::new();
    for tuple in outputs {
        let Some(aux) = registry.lookup_external_aux(external_id, tuple, false) else {
            continue;
        };
        produced.set(aux);
        let mut ng = Nogood::new();
        if monotonic {
            // A larger extension keeps the tuple: positive inputs suffice.
            for i in projected.iter() {
                ng.insert(Literal::pos(i));
            }
        } else {
            full_valuation(&mut ng);
        }
        ng.insert(Literal::neg(aux));
        learner.push_nogood(ng);
    }

    if learn_negative {
        for aux in output_mask.iter() {
            if produced.get(aux) {
                continue;
            }
            let mut ng = Nogood::new();
            full_valuation(&mut ng);
            ng.insert(Literal::pos(aux));
            learner.push_nogood(ng);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::PluginAtom;
    use crate::events::OutputIntegrator;
    use asperity_ground::InputSpec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes the arguments of every true `q` atom in its input.
    struct EchoQ {
        calls: AtomicUsize,
    }

    impl PluginAtom for EchoQ {
        fn name(&self) -> &str {
            "echo_q"
        }

        fn monotonic(&self) -> bool {
            true
        }

        fn retrieve(&self, query: &Query<'_>) -> Result<Vec<Tuple>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut out = Vec::new();
            for atom in query.projected.iter() {
                if let asperity_ground::AtomInfo::Ordinary { args, .. } =
                    query.registry.info(atom)
                {
                    out.push(args.clone());
                }
            }
            Ok(out)
        }
    }

    fn setup() -> (Registry, ExternalAtom, Interpretation, Interpretation, AtomId, AtomId) {
        let mut reg = Registry::new();
        let q1 = reg.ordinary_atom("q", &["1"]);
        let qsym = reg.intern("q");
        let one = reg.intern("1");
        let aux = reg.external_aux(0, vec![one], false);

        let ext = ExternalAtom {
            plugin: reg.intern("echo_q"),
            inputs: vec![InputSpec::Predicate(qsym)],
            output_arity: 1,
        };
        let input_mask = Interpretation::from_atoms([q1]);
        let output_mask = Interpretation::from_atoms([aux]);
        (reg, ext, input_mask, output_mask, q1, aux)
    }

    #[test]
    fn test_evaluation_integrates_and_caches() {
        let (reg, ext, imask, omask, q1, aux) = setup();
        let plugin = EchoQ {
            calls: AtomicUsize::new(0),
        };
        let mut cache = EvalCache::new();
        let config = EvalConfig::default();
        let interp = Interpretation::from_atoms([q1]);

        let mut sink = OutputIntegrator::new();
        evaluate_external(
            &reg, 0, &ext, &imask, &omask, &interp, &plugin, &mut cache, &config, &mut sink, None,
        )
        .unwrap();
        assert!(sink.output().get(aux));

        // Second evaluation over the same projection: served from cache,
        // same events.
        let mut sink2 = OutputIntegrator::new();
        evaluate_external(
            &reg, 0, &ext, &imask, &omask, &interp, &plugin, &mut cache, &config, &mut sink2, None,
        )
        .unwrap();
        assert!(sink2.output().get(aux));
        assert_eq!(plugin.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.hits, 1);
    }

    #[test]
    fn test_io_nogood_learning() {
        let (reg, ext, imask, omask, q1, aux) = setup();
        let plugin = EchoQ {
            calls: AtomicUsize::new(0),
        };
        let mut cache = EvalCache::new();
        let config = EvalConfig {
            learn_io_nogoods: true,
            ..Default::default()
        };
        let interp = Interpretation::from_atoms([q1]);

        let mut sink = OutputIntegrator::new();
        let mut learned: Vec<Nogood> = Vec::new();
        evaluate_external(
            &reg,
            0,
            &ext,
            &imask,
            &omask,
            &interp,
            &plugin,
            &mut cache,
            &config,
            &mut sink,
            Some(&mut learned as &mut dyn NogoodSink),
        )
        .unwrap();

        // Monotonic atom: { q(1), ~aux }, forbidding the input present
        // with the output absent.
        assert_eq!(learned.len(), 1);
        assert!(learned[0].contains(Literal::pos(q1)));
        assert!(learned[0].contains(Literal::neg(aux)));
    }

    /// Returns a tuple of the wrong arity.
    struct Broken;

    impl PluginAtom for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn retrieve(&self, _query: &Query<'_>) -> Result<Vec<Tuple>> {
            Ok(vec![vec![0, 1]])
        }
    }

    #[test]
    fn test_malformed_tuple_handling() {
        let (reg, ext, imask, omask, q1, _aux) = setup();
        let interp = Interpretation::from_atoms([q1]);

        // Lenient: dropped with a warning.
        let mut cache = EvalCache::new();
        let mut sink = OutputIntegrator::new();
        evaluate_external(
            &reg,
            0,
            &ext,
            &imask,
            &omask,
            &interp,
            &Broken,
            &mut cache,
            &EvalConfig::default(),
            &mut sink,
            None,
        )
        .unwrap();
        assert!(sink.output().is_empty());

        // Strict: escalates.
        let mut cache = EvalCache::new();
        let mut sink = OutputIntegrator::new();
        let strict = EvalConfig {
            strict_tuples: true,
            ..Default::default()
        };
        let err = evaluate_external(
            &reg,
            0,
            &ext,
            &imask,
            &omask,
            &interp,
            &Broken,
            &mut cache,
            &strict,
            &mut sink,
            None,
        );
        assert!(matches!(err, Err(Error::MalformedOutput { .. })));
    }
}
