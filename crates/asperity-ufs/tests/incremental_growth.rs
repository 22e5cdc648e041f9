//! Incremental grounding: expanding a live checker must match a
//! from-scratch encoding-based check over the accumulated program.

mod common;

use std::sync::Arc;

use asperity_base::Interpretation;
use asperity_ground::{
    AnnotatedGroundProgram, ExternalAtom, GroundProgram, GroundRule, InputSpec, Registry,
};
use asperity_plugin::PluginRegistry;
use asperity_ufs::{
    CheckScope, UfsConfig, UfsStrategy, UnfoundedSetChecker, UnfoundedSetCheckerManager,
};
use common::{context_with, EchoPlugin};

#[test]
fn test_expand_matches_from_scratch() {
    let mut reg = Registry::new();
    let a = reg.ordinary_atom("a", &[]);
    let b = reg.ordinary_atom("b", &[]);

    let mut prog = GroundProgram::new();
    prog.add_rule(GroundRule::rule(vec![a], vec![b], vec![]));
    prog.add_rule(GroundRule::rule(vec![b], vec![a], vec![]));
    let ann1 = Arc::new(AnnotatedGroundProgram::analyze(prog, &reg));

    let ctx = context_with(reg, PluginRegistry::new(), UfsConfig::default());
    let mut live = UnfoundedSetChecker::with_strategy(
        ctx.clone(),
        ann1.clone(),
        CheckScope::Monolithic,
        UfsStrategy::Assumption,
    )
    .unwrap();

    let round1 = Interpretation::from_atoms([a, b]);
    assert_eq!(live.get_unfounded_set(&round1, &[]).unwrap(), vec![a, b]);
    let domain_before = live.domain().clone();

    // Grounding grows: c :- d.  d :- c.
    let (c, d) = {
        let mut registry = ctx.registry.write().unwrap();
        (
            registry.ordinary_atom("c", &[]),
            registry.ordinary_atom("d", &[]),
        )
    };
    let mut delta = GroundProgram::new();
    delta.add_rule(GroundRule::rule(vec![c], vec![d], vec![]));
    delta.add_rule(GroundRule::rule(vec![d], vec![c], vec![]));
    let ann2 = {
        let registry = ctx.registry.read().unwrap();
        Arc::new(ann1.extend(&delta, &registry))
    };

    live.expand(ann2.clone()).unwrap();
    assert!(domain_before.is_subset_of(live.domain()));

    // The expanded checker and a from-scratch encoding-based checker
    // must agree over the accumulated program.
    for compatible in [
        Interpretation::from_atoms([c, d]),
        Interpretation::from_atoms([a, b, c, d]),
        Interpretation::from_atoms([a, b]),
    ] {
        let from_live = live.get_unfounded_set(&compatible, &[]).unwrap();
        let mut scratch = UnfoundedSetChecker::with_strategy(
            ctx.clone(),
            ann2.clone(),
            CheckScope::Monolithic,
            UfsStrategy::Encoding,
        )
        .unwrap();
        let from_scratch = scratch.get_unfounded_set(&compatible, &[]).unwrap();
        assert_eq!(
            from_live.is_empty(),
            from_scratch.is_empty(),
            "under {:?}: live {:?} vs scratch {:?}",
            compatible,
            from_live,
            from_scratch
        );
    }

    // The loop {c,d} is found by both.
    let round2 = Interpretation::from_atoms([c, d]);
    assert_eq!(live.get_unfounded_set(&round2, &[]).unwrap(), vec![c, d]);
}

#[test]
fn test_manager_extend_keeps_checking() {
    let mut reg = Registry::new();
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
    prog.add_rule(GroundRule::rule(vec![q1], vec![p1], vec![]));
    let ann1 = Arc::new(AnnotatedGroundProgram::analyze(prog, &reg));

    let mut plugins = PluginRegistry::new();
    plugins.register(Arc::new(EchoPlugin::new()));
    let ctx = context_with(reg, plugins, UfsConfig::default());
    let mut manager = UnfoundedSetCheckerManager::new(ctx.clone(), ann1.clone()).unwrap();

    let compatible = Interpretation::from_atoms([q1, p1, aux]);
    assert_eq!(
        manager.get_unfounded_set(&compatible, &[]).unwrap(),
        vec![q1, p1]
    );

    // A later grounding round appends an unrelated loop.
    let (c, d) = {
        let mut registry = ctx.registry.write().unwrap();
        (
            registry.ordinary_atom("c", &[]),
            registry.ordinary_atom("d", &[]),
        )
    };
    let mut delta = GroundProgram::new();
    delta.add_rule(GroundRule::rule(vec![c], vec![d], vec![]));
    delta.add_rule(GroundRule::rule(vec![d], vec![c], vec![]));
    let ann2 = {
        let registry = ctx.registry.read().unwrap();
        Arc::new(ann1.extend(&delta, &registry))
    };
    manager.extend(ann2).unwrap();

    // The grown program still yields the external loop under the same
    // compatible set; the new atoms stay false and contribute nothing.
    assert_eq!(
        manager.get_unfounded_set(&compatible, &[]).unwrap(),
        vec![q1, p1]
    );
}
