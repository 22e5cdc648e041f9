//! Ground rules.

use asperity_base::{AtomId, Interpretation};
use serde::{Deserialize, Serialize};

/// Index of a rule within its program.
pub type RuleId = u32;

/// Body shape of a ground rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleKind {
    /// Plain conjunctive body.
    Regular,
    /// Weight body: the rule fires when the summed weights of satisfied
    /// body literals reach the bound. Weights run parallel to the
    /// positive body followed by the negative body.
    Weight { bound: u64, weights: Vec<u64> },
}

/// An external-auxiliary body literal, already normalized to the positive
/// replacement atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtLiteral {
    /// Positive-replacement auxiliary address.
    pub aux: AtomId,
    /// Polarity the body requires of the auxiliary.
    pub positive: bool,
}

/// A ground rule: disjunctive head, ordinary positive/negative body, and
/// external-auxiliary body literals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundRule {
    /// Head atoms (disjunction). Empty for constraints.
    pub head: Vec<AtomId>,
    /// Positive ordinary body atoms.
    pub body_pos: Vec<AtomId>,
    /// Default-negated ordinary body atoms.
    pub body_neg: Vec<AtomId>,
    /// External-auxiliary body literals.
    pub body_ext: Vec<ExtLiteral>,
    /// Body shape.
    pub kind: RuleKind,
}

impl GroundRule {
    /// A fact.
    #[must_use]
    pub fn fact(head: AtomId) -> Self {
        Self::rule(vec![head], vec![], vec![])
    }

    /// A rule with an ordinary body.
    #[must_use]
    pub fn rule(head: Vec<AtomId>, body_pos: Vec<AtomId>, body_neg: Vec<AtomId>) -> Self {
        Self {
            head,
            body_pos,
            body_neg,
            body_ext: Vec::new(),
            kind: RuleKind::Regular,
        }
    }

    /// Adds an external-auxiliary body literal.
    #[must_use]
    pub fn with_external(mut self, aux: AtomId, positive: bool) -> Self {
        self.body_ext.push(ExtLiteral { aux, positive });
        self
    }

    /// A weight rule. Weights run parallel to `body_pos ++ body_neg`.
    #[must_use]
    pub fn weight(
        head: Vec<AtomId>,
        body_pos: Vec<AtomId>,
        body_neg: Vec<AtomId>,
        bound: u64,
        weights: Vec<u64>,
    ) -> Self {
        debug_assert_eq!(weights.len(), body_pos.len() + body_neg.len());
        Self {
            head,
            body_pos,
            body_neg,
            body_ext: Vec::new(),
            kind: RuleKind::Weight { bound, weights },
        }
    }

    /// Whether the head is a proper disjunction.
    #[must_use]
    pub fn is_disjunctive(&self) -> bool {
        self.head.len() > 1
    }

    /// Whether this is a weight rule.
    #[must_use]
    pub fn is_weight(&self) -> bool {
        matches!(self.kind, RuleKind::Weight { .. })
    }

    /// Whether the body holds under the interpretation. External body
    /// literals are checked against the auxiliary's recorded truth value.
    #[must_use]
    pub fn body_satisfied(&self, interpretation: &Interpretation) -> bool {
        match &self.kind {
            RuleKind::Regular => {
                self.body_pos.iter().all(|&b| interpretation.get(b))
                    && self.body_neg.iter().all(|&b| !interpretation.get(b))
                    && self
                        .body_ext
                        .iter()
                        .all(|l| interpretation.get(l.aux) == l.positive)
            }
            RuleKind::Weight { bound, weights } => {
                let mut sum = 0u64;
                for (i, &b) in self.body_pos.iter().enumerate() {
                    if interpretation.get(b) {
                        sum += weights[i];
                    }
                }
                for (i, &b) in self.body_neg.iter().enumerate() {
                    if !interpretation.get(b) {
                        sum += weights[self.body_pos.len() + i];
                    }
                }
                sum >= *bound
            }
        }
    }
}
