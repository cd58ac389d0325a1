//! The three-point effect lattice.
//!
//! Effects are ordered `Safe ⊑ Poly ⊑ Ui` for the purposes of `lub`/`glb`,
//! but `Poly` is not simply "between" the other two: it stands for "inherits
//! the effect of the instantiation context", so the call-site ordering
//! check treats it as comparable only to itself and to `Ui`. See
//! [`Effect::le`].

use std::fmt;
use uivet_ast::{EffectTag, TypeTag, UseQualifier};

/// The effect of an executable declaration or context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    /// May run in any context.
    Safe,
    /// Effect-polymorphic: resolves to the effect of the instantiation.
    Poly,
    /// May only run in a UI context.
    Ui,
}

impl Effect {
    /// Whether an operation with effect `target` may execute inside a
    /// context permitting `context`.
    ///
    /// `Safe` targets run anywhere and `Ui` contexts permit anything; a
    /// `Poly` target is otherwise only permitted by a `Poly` context at
    /// the same binding site.
    pub fn le(target: Effect, context: Effect) -> bool {
        target == Effect::Safe || context == Effect::Ui || target == context
    }

    /// Least upper bound: the tightest effect permitting both.
    pub fn lub(a: Effect, b: Effect) -> Effect {
        if a == Effect::Ui || b == Effect::Ui {
            Effect::Ui
        } else if a == Effect::Poly || b == Effect::Poly {
            Effect::Poly
        } else {
            Effect::Safe
        }
    }

    /// Greatest lower bound, the dual of [`Effect::lub`].
    pub fn glb(a: Effect, b: Effect) -> Effect {
        if a == Effect::Safe || b == Effect::Safe {
            Effect::Safe
        } else if a == Effect::Poly || b == Effect::Poly {
            Effect::Poly
        } else {
            Effect::Ui
        }
    }

    /// The effect implied by a use-site qualifier. An untagged use
    /// defaults to safe.
    pub fn from_qualifier(qualifier: UseQualifier) -> Effect {
        match qualifier {
            UseQualifier::Untagged | UseQualifier::Safe => Effect::Safe,
            UseQualifier::Poly | UseQualifier::PolyAll => Effect::Poly,
            UseQualifier::Ui => Effect::Ui,
        }
    }

    pub fn is_safe(self) -> bool {
        self == Effect::Safe
    }

    pub fn is_poly(self) -> bool {
        self == Effect::Poly
    }

    pub fn is_ui(self) -> bool {
        self == Effect::Ui
    }
}

impl From<EffectTag> for Effect {
    fn from(tag: EffectTag) -> Effect {
        match tag {
            EffectTag::Safe => Effect::Safe,
            EffectTag::Poly => Effect::Poly,
            EffectTag::Ui => Effect::Ui,
        }
    }
}

impl From<TypeTag> for Effect {
    fn from(tag: TypeTag) -> Effect {
        match tag {
            TypeTag::Safe => Effect::Safe,
            TypeTag::Poly => Effect::Poly,
            TypeTag::Ui => Effect::Ui,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Safe => write!(f, "@SafeEffect"),
            Effect::Poly => write!(f, "@PolyUIEffect"),
            Effect::Ui => write!(f, "@UIEffect"),
        }
    }
}

/// Summary of the effects of every declaration a method transitively
/// overrides: the greatest lower bound and least upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectRange {
    pub min: Effect,
    pub max: Effect,
}

impl EffectRange {
    /// A degenerate range covering a single effect.
    pub fn of(effect: Effect) -> Self {
        Self {
            min: effect,
            max: effect,
        }
    }

    /// Widens the range to cover `effect`.
    pub fn extend(&mut self, effect: Effect) {
        self.min = Effect::glb(self.min, effect);
        self.max = Effect::lub(self.max, effect);
    }

    /// Merges another range into this one.
    pub fn merge(&mut self, other: EffectRange) {
        self.extend(other.min);
        self.extend(other.max);
    }
}

impl fmt::Display for EffectRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}
