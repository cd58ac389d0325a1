//! Function-literal effect inference.
//!
//! A function literal whose nominal signature is effect-polymorphic
//! starts out polymorphic and may be promoted to the UI effect by
//! evidence found during traversal, either a UI-effect call in its body
//! or a flow into a UI-qualified target. Promotion is a one-way latch:
//! once constrained, a literal never reverts, so checking each literal
//! body once is sound.

use rustc_hash::FxHashMap;
use uivet_ast::ExprId;

use crate::lattice::Effect;

#[derive(Debug, Clone, Copy)]
struct LambdaRecord {
    /// The effect of the literal's nominal interface signature.
    nominal: Effect,
    /// Whether evidence has forced the literal to the UI effect.
    constrained: bool,
}

/// Per-run inference state for function literals, keyed by node identity.
#[derive(Debug, Default)]
pub struct LambdaInference {
    records: FxHashMap<ExprId, LambdaRecord>,
}

impl LambdaInference {
    pub fn new() -> Self {
        Self::default()
    }

    /// The literal's current inferred effect. Creates the record on first
    /// sight so later constraint calls have something to latch.
    pub fn effect_of(&mut self, node: ExprId, nominal: Effect) -> Effect {
        let record = self
            .records
            .entry(node)
            .or_insert(LambdaRecord {
                nominal,
                constrained: false,
            });
        if record.constrained {
            Effect::Ui
        } else {
            record.nominal
        }
    }

    /// Latches the literal to the UI effect. Only a nominally polymorphic
    /// literal can be promoted; anything else is left alone and the
    /// call-site check reports the mismatch instead. Returns whether this
    /// call newly constrained the literal.
    pub fn constrain_to_ui(&mut self, node: ExprId, nominal: Effect) -> bool {
        let record = self
            .records
            .entry(node)
            .or_insert(LambdaRecord {
                nominal,
                constrained: false,
            });
        if !record.nominal.is_poly() || record.constrained {
            return false;
        }
        record.constrained = true;
        true
    }

    pub fn is_constrained(&self, node: ExprId) -> bool {
        self.records.get(&node).is_some_and(|r| r.constrained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn poly_literal_starts_poly_and_latches_to_ui() {
        let mut inference = LambdaInference::new();
        let node = ExprId(0);

        assert_eq!(inference.effect_of(node, Effect::Poly), Effect::Poly);
        assert!(!inference.is_constrained(node));

        assert!(inference.constrain_to_ui(node, Effect::Poly));
        assert_eq!(inference.effect_of(node, Effect::Poly), Effect::Ui);
        assert!(inference.is_constrained(node));
    }

    #[test]
    fn constraining_is_idempotent() {
        let mut inference = LambdaInference::new();
        let node = ExprId(1);

        assert!(inference.constrain_to_ui(node, Effect::Poly));
        assert!(!inference.constrain_to_ui(node, Effect::Poly));
        assert_eq!(inference.effect_of(node, Effect::Poly), Effect::Ui);
    }

    #[test]
    fn non_poly_literals_never_promote() {
        let mut inference = LambdaInference::new();
        let safe = ExprId(2);
        let ui = ExprId(3);

        assert!(!inference.constrain_to_ui(safe, Effect::Safe));
        assert_eq!(inference.effect_of(safe, Effect::Safe), Effect::Safe);

        assert!(!inference.constrain_to_ui(ui, Effect::Ui));
        assert_eq!(inference.effect_of(ui, Effect::Ui), Effect::Ui);
        assert!(!inference.is_constrained(ui));
    }
}
