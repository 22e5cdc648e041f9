//! Turning a found unfounded set into a conflict nogood for the main
//! search.
//!
//! Both constructions are sound: every literal of the produced nogood
//! holds under the interpretation the unfounded set was found against,
//! so the main search can never repeat that exact combination.

use asperity_base::{Interpretation, Literal, Nogood};
use asperity_ground::{AnnotatedGroundProgram, GroundRule, Registry, RuleKind};

/// Reduct-based construction: one witness literal per rule whose body is
/// unsatisfied, all non-auxiliary atoms of the smaller model, and one
/// atom the unfounded set removed.
pub(crate) fn reduct_based_nogood(
    program: &AnnotatedGroundProgram,
    registry: &Registry,
    ufs: &Interpretation,
    interpretation: &Interpretation,
) -> Nogood {
    let mut ng = Nogood::new();

    for rule in &program.program().rules {
        if rule.body_satisfied(interpretation) {
            continue;
        }
        match &rule.kind {
            RuleKind::Regular => {
                if let Some(w) = falsified_body_literal(rule, interpretation) {
                    ng.insert(w);
                }
            }
            RuleKind::Weight { .. } => {
                // No single literal witnesses a missed bound; pin the
                // whole body valuation.
                for &b in rule.body_pos.iter().chain(rule.body_neg.iter()) {
                    ng.insert(Literal::new(b, interpretation.get(b)));
                }
            }
        }
    }

    // The smaller model: interpretation minus the unfounded set.
    for a in interpretation.iter() {
        if !registry.is_external_aux(a) && !ufs.get(a) {
            ng.insert(Literal::pos(a));
        }
    }

    // One atom present in the interpretation but absent from the smaller
    // model.
    if let Some(removed) = ufs.iter().find(|&a| interpretation.get(a)) {
        ng.insert(Literal::pos(removed));
    }

    ng
}

/// UFS-based construction: one true unfounded atom plus, for every rule
/// whose head intersects the set and which is external to it, a witness
/// for why the rule does not justify the set. Witness priority: a true
/// head atom outside the set, else a falsified ordinary body literal,
/// else the input valuation of the relevant external atoms.
pub(crate) fn ufs_based_nogood(
    program: &AnnotatedGroundProgram,
    ufs: &Interpretation,
    interpretation: &Interpretation,
) -> Nogood {
    let mut ng = Nogood::new();

    if let Some(a) = ufs.iter().find(|&a| interpretation.get(a)) {
        ng.insert(Literal::pos(a));
    }

    for rule in &program.program().rules {
        if !rule.head.iter().any(|&h| ufs.get(h)) {
            continue;
        }
        // Rules whose positive ordinary body intersects the set can
        // never justify it from outside.
        if rule.body_pos.iter().any(|&b| ufs.get(b)) {
            continue;
        }

        if let Some(&h) = rule
            .head
            .iter()
            .find(|&&h| interpretation.get(h) && !ufs.get(h))
        {
            ng.insert(Literal::pos(h));
            continue;
        }

        if let Some(w) = falsified_ordinary_body_literal(rule, interpretation) {
            ng.insert(w);
            continue;
        }

        // The rule fails only through its external literals: pin the
        // input valuation that determines their values.
        debug_assert!(
            !rule.body_ext.is_empty(),
            "rule externally justifies the unfounded set"
        );
        for l in &rule.body_ext {
            for &e in program.externals_of_aux(l.aux) {
                for i in program.input_mask(e).iter() {
                    ng.insert(Literal::new(i, interpretation.get(i)));
                }
            }
        }
    }

    ng
}

/// A body literal falsified under the interpretation, ordinary literals
/// first, externals as fallback.
fn falsified_body_literal(rule: &GroundRule, interpretation: &Interpretation) -> Option<Literal> {
    falsified_ordinary_body_literal(rule, interpretation).or_else(|| {
        rule.body_ext
            .iter()
            .find(|l| interpretation.get(l.aux) != l.positive)
            .map(|l| Literal::new(l.aux, interpretation.get(l.aux)))
    })
}

/// A falsified ordinary body literal, at its current truth value.
fn falsified_ordinary_body_literal(
    rule: &GroundRule,
    interpretation: &Interpretation,
) -> Option<Literal> {
    if let Some(&b) = rule.body_pos.iter().find(|&&b| !interpretation.get(b)) {
        return Some(Literal::neg(b));
    }
    rule.body_neg
        .iter()
        .find(|&&b| interpretation.get(b))
        .map(|&b| Literal::pos(b))
}
