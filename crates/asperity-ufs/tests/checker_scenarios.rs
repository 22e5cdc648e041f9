//! Scenario tests for the unfounded-set checkers, run against both
//! construction strategies.

mod common;

use std::sync::Arc;

use asperity_base::{Interpretation, Literal, Nogood};
use asperity_ground::{
    AnnotatedGroundProgram, ExternalAtom, GroundProgram, GroundRule, InputSpec, Registry,
};
use asperity_plugin::PluginRegistry;
use asperity_ufs::{CheckScope, NogoodStrategy, UfsConfig, UfsContext, UfsStrategy, UnfoundedSetChecker};
use common::{context_with, EchoPlugin};

const STRATEGIES: [UfsStrategy; 2] = [UfsStrategy::Encoding, UfsStrategy::Assumption];

fn checker(ctx: &UfsContext, program: &Arc<AnnotatedGroundProgram>, strategy: UfsStrategy) -> UnfoundedSetChecker {
    UnfoundedSetChecker::with_strategy(ctx.clone(), program.clone(), CheckScope::Monolithic, strategy)
        .expect("checker construction")
}

// =============================================================================
// Ordinary-program scenarios
// =============================================================================

#[test]
fn test_negation_choice_is_stable() {
    // a :- not b.  b :- not a.  under {a}: a genuine stable model.
    let mut reg = Registry::new();
    let a = reg.ordinary_atom("a", &[]);
    let b = reg.ordinary_atom("b", &[]);

    let mut prog = GroundProgram::new();
    prog.add_rule(GroundRule::rule(vec![a], vec![], vec![b]));
    prog.add_rule(GroundRule::rule(vec![b], vec![], vec![a]));
    let ann = Arc::new(AnnotatedGroundProgram::analyze(prog, &reg));

    let ctx = context_with(reg, PluginRegistry::new(), UfsConfig::default());
    let compatible = Interpretation::from_atoms([a]);

    for strategy in STRATEGIES {
        let mut chk = checker(&ctx, &ann, strategy);
        let ufs = chk.get_unfounded_set(&compatible, &[]).unwrap();
        assert!(ufs.is_empty(), "{:?}: expected stability", strategy);
    }
}

#[test]
fn test_self_support_is_unfounded() {
    // a :- a.  under {a}: the singleton {a} is unfounded.
    let mut reg = Registry::new();
    let a = reg.ordinary_atom("a", &[]);

    let mut prog = GroundProgram::new();
    prog.add_rule(GroundRule::rule(vec![a], vec![a], vec![]));
    let ann = Arc::new(AnnotatedGroundProgram::analyze(prog, &reg));

    let ctx = context_with(reg, PluginRegistry::new(), UfsConfig::default());
    let compatible = Interpretation::from_atoms([a]);

    for strategy in STRATEGIES {
        let mut chk = checker(&ctx, &ann, strategy);
        let ufs = chk.get_unfounded_set(&compatible, &[]).unwrap();
        assert_eq!(ufs, vec![a], "{:?}", strategy);
    }
}

#[test]
fn test_disjunctive_guess_never_empty() {
    // a v b.  under {a, b}: some unfounded subset must exist.
    let mut reg = Registry::new();
    let a = reg.ordinary_atom("a", &[]);
    let b = reg.ordinary_atom("b", &[]);

    let mut prog = GroundProgram::new();
    prog.add_rule(GroundRule::rule(vec![a, b], vec![], vec![]));
    let ann = Arc::new(AnnotatedGroundProgram::analyze(prog, &reg));

    let ctx = context_with(reg, PluginRegistry::new(), UfsConfig::default());
    let compatible = Interpretation::from_atoms([a, b]);

    for strategy in STRATEGIES {
        let mut chk = checker(&ctx, &ann, strategy);
        let ufs = chk.get_unfounded_set(&compatible, &[]).unwrap();
        assert!(!ufs.is_empty(), "{:?}: {{a,b}} is not stable", strategy);
        assert!(ufs.iter().all(|&x| x == a || x == b));
        assert!(ufs.iter().any(|&x| compatible.get(x)));
    }
}

#[test]
fn test_mutual_support_is_unfounded() {
    // a :- b.  b :- a.  under {a, b}: the whole loop is unfounded.
    let mut reg = Registry::new();
    let a = reg.ordinary_atom("a", &[]);
    let b = reg.ordinary_atom("b", &[]);

    let mut prog = GroundProgram::new();
    prog.add_rule(GroundRule::rule(vec![a], vec![b], vec![]));
    prog.add_rule(GroundRule::rule(vec![b], vec![a], vec![]));
    let ann = Arc::new(AnnotatedGroundProgram::analyze(prog, &reg));

    let ctx = context_with(reg, PluginRegistry::new(), UfsConfig::default());
    let compatible = Interpretation::from_atoms([a, b]);

    for strategy in STRATEGIES {
        let mut chk = checker(&ctx, &ann, strategy);
        let ufs = chk.get_unfounded_set(&compatible, &[]).unwrap();
        assert_eq!(ufs, vec![a, b], "{:?}", strategy);
    }
}

// =============================================================================
// External-atom scenarios
// =============================================================================

/// p(1) :- &id[q](1).  EDB q(1).  Registry addresses in creation order.
fn external_program(reg: &mut Registry) -> (GroundProgram, u32, u32, u32) {
    let q1 = reg.ordinary_atom("q", &["1"]);
    let p1 = reg.ordinary_atom("p", &["1"]);
    let one = reg.intern("1");
    let aux = reg.external_aux(0, vec![one], false);
    let qsym = reg.intern("q");

    let mut prog = GroundProgram::new();
    prog.add_external(ExternalAtom {
        plugin: reg.intern("id"),
        inputs: vec![InputSpec::Predicate(qsym)],
        output_arity: 1,
    });
    prog.add_rule(GroundRule::rule(vec![p1], vec![], vec![]).with_external(aux, true));
    (prog, q1, p1, aux)
}

#[test]
fn test_wrong_external_guess_rejected() {
    // The only candidate flips the auxiliary to false; evaluation
    // refutes the guess, so the compatible set stands. Each strategy
    // gets a fresh container, or the io-nogood learned by the first run
    // would prune the candidate before verification.
    for strategy in STRATEGIES {
        let mut reg = Registry::new();
        let (mut prog, q1, p1, aux) = external_program(&mut reg);
        prog.edb.set(q1);
        let ann = Arc::new(AnnotatedGroundProgram::analyze(prog, &reg));

        let mut plugins = PluginRegistry::new();
        plugins.register(Arc::new(EchoPlugin::new()));
        let config = UfsConfig {
            // Force candidates through the verification path.
            external_behavior_nogoods: false,
            ..Default::default()
        };
        let ctx = context_with(reg, plugins, config);
        let compatible = Interpretation::from_atoms([q1, p1, aux]);

        let mut chk = checker(&ctx, &ann, strategy);
        let ufs = chk.get_unfounded_set(&compatible, &[]).unwrap();
        assert!(ufs.is_empty(), "{:?}: p(1) is justified", strategy);
        assert!(
            chk.stats().rejected >= 1,
            "{:?}: the flipped guess must be rejected by evaluation",
            strategy
        );

        // The evaluation left its observed behavior in the shared
        // container.
        let container = ctx.nogoods.lock().unwrap();
        assert!(container.len() > 0);
        let expected = Nogood::from_literals([Literal::pos(q1), Literal::neg(aux)]);
        assert!(container.since(0).contains(&expected));
    }
}

#[test]
fn test_external_cycle_unfounded() {
    // p(1) :- &id[q](1).  q(1) :- p(1).  under {q(1), p(1), aux}: the
    // loop through the external atom is unfounded.
    let mut reg = Registry::new();
    let (mut prog, q1, p1, aux) = external_program(&mut reg);
    prog.add_rule(GroundRule::rule(vec![q1], vec![p1], vec![]));
    let ann = Arc::new(AnnotatedGroundProgram::analyze(prog, &reg));

    let mut plugins = PluginRegistry::new();
    plugins.register(Arc::new(EchoPlugin::new()));
    let ctx = context_with(reg, plugins, UfsConfig::default());
    let compatible = Interpretation::from_atoms([q1, p1, aux]);

    for strategy in STRATEGIES {
        let mut chk = checker(&ctx, &ann, strategy);
        let ufs = chk.get_unfounded_set(&compatible, &[]).unwrap();
        assert_eq!(ufs, vec![q1, p1], "{:?}", strategy);
    }
}

#[test]
fn test_support_sets_replace_evaluation() {
    let mut reg = Registry::new();
    let (mut prog, q1, p1, aux) = external_program(&mut reg);
    prog.add_rule(GroundRule::rule(vec![q1], vec![p1], vec![]));
    let qsym = reg.intern("q");
    let one = reg.intern("1");
    let ann = Arc::new(AnnotatedGroundProgram::analyze(prog, &reg));

    let plugin = Arc::new(EchoPlugin::with_support(vec![asperity_plugin::SupportSet {
        requires_true: vec![(qsym, vec![one])],
        requires_false: vec![],
        output: vec![one],
    }]));
    let mut plugins = PluginRegistry::new();
    plugins.register(plugin.clone());
    let ctx = context_with(reg, plugins, UfsConfig::default());
    let compatible = Interpretation::from_atoms([q1, p1, aux]);

    let mut chk = checker(&ctx, &ann, UfsStrategy::Assumption);
    let ufs = chk.get_unfounded_set(&compatible, &[]).unwrap();
    assert_eq!(ufs, vec![q1, p1]);
    assert_eq!(
        plugin.calls.load(std::sync::atomic::Ordering::SeqCst),
        0,
        "support sets must replace evaluation"
    );
}

// =============================================================================
// Cross-cutting properties
// =============================================================================

#[test]
fn test_strategy_equivalence_on_emptiness() {
    // Both strategies must agree on non-emptiness for the same program
    // and compatible set, though the witness sets may differ.
    let cases: Vec<(fn(&mut Registry) -> (GroundProgram, Vec<u32>), &[usize])> = vec![
        (
            |reg| {
                let a = reg.ordinary_atom("a", &[]);
                let b = reg.ordinary_atom("b", &[]);
                let mut p = GroundProgram::new();
                p.add_rule(GroundRule::rule(vec![a, b], vec![], vec![]));
                p.add_rule(GroundRule::rule(vec![a], vec![b], vec![]));
                (p, vec![a, b])
            },
            &[0, 1],
        ),
        (
            |reg| {
                let a = reg.ordinary_atom("a", &[]);
                let b = reg.ordinary_atom("b", &[]);
                let mut p = GroundProgram::new();
                p.add_rule(GroundRule::rule(vec![a], vec![], vec![b]));
                p.add_rule(GroundRule::rule(vec![b], vec![], vec![a]));
                (p, vec![a])
            },
            &[0],
        ),
    ];

    for (build, true_atoms) in cases {
        let mut reg = Registry::new();
        let (prog, atoms) = build(&mut reg);
        let ann = Arc::new(AnnotatedGroundProgram::analyze(prog, &reg));
        let ctx = context_with(reg, PluginRegistry::new(), UfsConfig::default());
        let compatible = Interpretation::from_atoms(true_atoms.iter().map(|&i| atoms[i]));

        let mut enc = checker(&ctx, &ann, UfsStrategy::Encoding);
        let mut asm = checker(&ctx, &ann, UfsStrategy::Assumption);
        let from_enc = enc.get_unfounded_set(&compatible, &[]).unwrap();
        let from_asm = asm.get_unfounded_set(&compatible, &[]).unwrap();
        assert_eq!(from_enc.is_empty(), from_asm.is_empty());
    }
}

#[test]
fn test_domain_never_shrinks() {
    let mut reg = Registry::new();
    let a = reg.ordinary_atom("a", &[]);
    let b = reg.ordinary_atom("b", &[]);

    let mut prog = GroundProgram::new();
    prog.add_rule(GroundRule::rule(vec![a], vec![b], vec![]));
    prog.add_rule(GroundRule::rule(vec![b], vec![a], vec![]));
    let ann = Arc::new(AnnotatedGroundProgram::analyze(prog, &reg));

    let ctx = context_with(reg, PluginRegistry::new(), UfsConfig::default());
    let compatible = Interpretation::from_atoms([a, b]);

    for strategy in STRATEGIES {
        let mut chk = checker(&ctx, &ann, strategy);
        chk.get_unfounded_set(&compatible, &[]).unwrap();
        let first = chk.domain().to_vec();
        chk.get_unfounded_set(&compatible, &[]).unwrap();
        let second = chk.domain().to_vec();
        assert_eq!(first, second, "{:?}: domain must not move", strategy);
        assert_eq!(first, vec![a, b]);
    }
}

#[test]
fn test_ufs_nogood_excludes_interpretation() {
    // Whatever the construction, the produced nogood must be violated
    // by the interpretation it was built against, so the main search can
    // never repeat that exact combination.
    for nogood_strategy in [NogoodStrategy::UfsBased, NogoodStrategy::ReductBased] {
        let mut reg = Registry::new();
        let (mut prog, q1, p1, aux) = external_program(&mut reg);
        prog.add_rule(GroundRule::rule(vec![q1], vec![p1], vec![]));
        let ann = Arc::new(AnnotatedGroundProgram::analyze(prog, &reg));

        let mut plugins = PluginRegistry::new();
        plugins.register(Arc::new(EchoPlugin::new()));
        let ctx = context_with(
            reg,
            plugins,
            UfsConfig {
                nogood_strategy,
                ..Default::default()
            },
        );
        let compatible = Interpretation::from_atoms([q1, p1, aux]);

        let mut chk = checker(&ctx, &ann, UfsStrategy::Assumption);
        let ufs = chk.get_unfounded_set(&compatible, &[]).unwrap();
        assert!(!ufs.is_empty());
        let ng = chk.get_ufs_nogood(&ufs, &compatible);
        assert!(
            ng.violated_by(&compatible),
            "{:?}: {} must exclude the interpretation",
            nogood_strategy,
            ng
        );
    }
}

#[test]
fn test_learned_nogood_restricts_candidates() {
    // a v b. under {a,b} normally yields {a}, {b}, or {a,b}; a learned
    // nogood forbidding "a survives withdrawal" leaves only sets
    // containing a.
    let mut reg = Registry::new();
    let a = reg.ordinary_atom("a", &[]);
    let b = reg.ordinary_atom("b", &[]);

    let mut prog = GroundProgram::new();
    prog.add_rule(GroundRule::rule(vec![a, b], vec![], vec![]));
    let ann = Arc::new(AnnotatedGroundProgram::analyze(prog, &reg));

    let ctx = context_with(reg, PluginRegistry::new(), UfsConfig::default());
    ctx.nogoods
        .lock()
        .unwrap()
        .add(Nogood::from_literals([Literal::pos(a)]));
    let compatible = Interpretation::from_atoms([a, b]);

    for strategy in STRATEGIES {
        let mut chk = checker(&ctx, &ann, strategy);
        let ufs = chk.get_unfounded_set(&compatible, &[]).unwrap();
        assert!(
            ufs.contains(&a),
            "{:?}: learned nogood must force a into the set, got {:?}",
            strategy,
            ufs
        );
    }
}

#[test]
fn test_learn_cursor_reset_is_idempotent() {
    // Rewinding the cursor re-injects the same nogoods; results and the
    // domain must not change.
    let mut reg = Registry::new();
    let a = reg.ordinary_atom("a", &[]);
    let b = reg.ordinary_atom("b", &[]);

    let mut prog = GroundProgram::new();
    prog.add_rule(GroundRule::rule(vec![a, b], vec![], vec![]));
    let ann = Arc::new(AnnotatedGroundProgram::analyze(prog, &reg));

    let ctx = context_with(reg, PluginRegistry::new(), UfsConfig::default());
    ctx.nogoods
        .lock()
        .unwrap()
        .add(Nogood::from_literals([Literal::pos(a)]));
    let compatible = Interpretation::from_atoms([a, b]);

    for strategy in STRATEGIES {
        let mut chk = checker(&ctx, &ann, strategy);
        let first = chk.get_unfounded_set(&compatible, &[]).unwrap();
        chk.learn_nogoods_from_main_search(true);
        let second = chk.get_unfounded_set(&compatible, &[]).unwrap();
        assert_eq!(first, second, "{:?}", strategy);
    }
}

// =============================================================================
// Weight rules
// =============================================================================

#[test]
fn test_weight_cycle_is_fatal() {
    // a :- 1 <= { a = 1 }.  A cycle through a weight rule.
    let mut reg = Registry::new();
    let a = reg.ordinary_atom("a", &[]);

    let mut prog = GroundProgram::new();
    prog.add_rule(GroundRule::weight(vec![a], vec![a], vec![], 1, vec![1]));
    let ann = Arc::new(AnnotatedGroundProgram::analyze(prog, &reg));

    let ctx = context_with(reg, PluginRegistry::new(), UfsConfig::default());
    let compatible = Interpretation::from_atoms([a]);

    // Assumption-based: fatal at construction.
    assert!(UnfoundedSetChecker::with_strategy(
        ctx.clone(),
        ann.clone(),
        CheckScope::Monolithic,
        UfsStrategy::Assumption
    )
    .is_err());

    // Encoding-based: fatal at the first check.
    let mut chk = checker(&ctx, &ann, UfsStrategy::Encoding);
    assert!(chk.get_unfounded_set(&compatible, &[]).is_err());
}

#[test]
fn test_weight_cycle_tolerated() {
    let mut reg = Registry::new();
    let a = reg.ordinary_atom("a", &[]);

    let mut prog = GroundProgram::new();
    prog.add_rule(GroundRule::weight(vec![a], vec![a], vec![], 1, vec![1]));
    let ann = Arc::new(AnnotatedGroundProgram::analyze(prog, &reg));

    let config = UfsConfig {
        tolerate_weight_cycles: true,
        ..Default::default()
    };
    let ctx = context_with(reg, PluginRegistry::new(), config);
    let compatible = Interpretation::from_atoms([a]);

    for strategy in STRATEGIES {
        let mut chk = checker(&ctx, &ann, strategy);
        // Tolerated: the head is pinned out of any candidate.
        let ufs = chk.get_unfounded_set(&compatible, &[]).unwrap();
        assert!(ufs.is_empty(), "{:?}", strategy);
    }
}
