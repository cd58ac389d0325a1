//! Declaration effect resolution.
//!
//! Computes the effect of every executable declaration: an explicit tag
//! when one is present, otherwise a default derived from the declarations
//! it overrides and from the enclosing type's tag. Results are memoized by
//! declaration identity and never change for the remainder of a checking
//! run; the traversal is single-threaded, so the cache has a single
//! writer.

use rustc_hash::FxHashMap;
use uivet_ast::{EffectTag, MethodId, Program};

use crate::lattice::{Effect, EffectRange};

/// Memoized declared-effect and inherited-range tables.
#[derive(Debug, Default)]
pub struct DeclEffects {
    effects: FxHashMap<MethodId, Effect>,
    ranges: FxHashMap<MethodId, Option<EffectRange>>,
}

impl DeclEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// The resolved effect of a declaration.
    ///
    /// Explicit tags win; conflicting tags recover to `Safe` and a `Poly`
    /// tag outside an effect-polymorphic type recovers to the structural
    /// default (the traversal reports both conditions separately). The
    /// result is cached so later lookups are O(1).
    pub fn declared_effect(&mut self, program: &Program, method: MethodId) -> Effect {
        if let Some(&effect) = self.effects.get(&method) {
            return effect;
        }

        let decl = program.method(method);
        let enclosing = program.enclosing_class(method);
        let effect = match decl.tags.len() {
            0 => self.structural_default(program, method),
            1 => {
                let tag = decl.tags[0].node;
                if tag == EffectTag::Poly && !enclosing.effect_poly {
                    self.structural_default(program, method)
                } else {
                    Effect::from(tag)
                }
            }
            // Conflicting annotations: continue the analysis as safe.
            _ => Effect::Safe,
        };

        self.effects.insert(method, effect);
        effect
    }

    /// The effect range over every declaration `method` transitively
    /// overrides, or `None` when it overrides nothing. Ancestors are
    /// resolved before the descendant so their effects are available.
    pub fn inherited_range(&mut self, program: &Program, method: MethodId) -> Option<EffectRange> {
        if let Some(range) = self.ranges.get(&method) {
            return *range;
        }
        // Pre-seed so a malformed override cycle resolves to no range
        // instead of recursing forever.
        self.ranges.insert(method, None);

        let overrides = program.method(method).overrides.clone();
        let mut range: Option<EffectRange> = None;
        for overridden in overrides {
            let effect = self.declared_effect(program, overridden);
            match &mut range {
                Some(r) => r.extend(effect),
                None => range = Some(EffectRange::of(effect)),
            }
            if let Some(ancestor) = self.inherited_range(program, overridden) {
                range
                    .as_mut()
                    .expect("range initialized above")
                    .merge(ancestor);
            }
        }

        self.ranges.insert(method, range);
        range
    }

    /// The default effect of an untagged declaration:
    /// - inside an effect-polymorphic type, the minimum of the inherited
    ///   range (else `Poly`),
    /// - otherwise, when it overrides anything, the least upper bound of
    ///   its ancestors' effects,
    /// - otherwise `Ui` inside a `@UI` type, else `Safe`.
    fn structural_default(&mut self, program: &Program, method: MethodId) -> Effect {
        let range = self.inherited_range(program, method);
        let enclosing = program.enclosing_class(method);
        if enclosing.effect_poly {
            range.map(|r| r.min).unwrap_or(Effect::Poly)
        } else if let Some(range) = range {
            range.max
        } else if enclosing.is_ui() {
            Effect::Ui
        } else {
            Effect::Safe
        }
    }
}
