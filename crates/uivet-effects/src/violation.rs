//! Violation and fatal-error types.
//!
//! Every user-facing finding the checker produces is an
//! [`EffectViolation`]; they accumulate and never abort the traversal.
//! [`CheckError`] is different in kind: it signals a defect in the
//! traversal itself, and the run aborts rather than validate calls
//! against an undefined context.

use thiserror::Error;
use uivet_ast::{ClassId, MethodId, Span};
use uivet_diagnostics::span::SourceSpan;
use uivet_diagnostics::{Diagnostic, DiagnosticSeverity};

use crate::lattice::Effect;

/// A finding reported against the checked program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectViolation {
    /// A declaration carries more than one mutually-exclusive effect tag.
    #[error("conflicting effect annotations on declaration")]
    ConflictingEffectAnnotations { method: MethodId, span: Span },

    /// A `@PolyUIEffect` tag on a declaration whose enclosing type is not
    /// effect-polymorphic.
    #[error("@PolyUIEffect declaration outside an effect-polymorphic type")]
    InvalidPolymorphismUse { method: MethodId, span: Span },

    /// A `@UIEffect` tag inside a type that is already `@UI`. Warning
    /// only.
    #[error("redundant @UIEffect annotation inside a @UI type")]
    RedundantEffectAnnotation { method: MethodId, span: Span },

    /// A type instantiation whose tag is incompatible with its
    /// declaration.
    #[error("type use incompatible with its declaration")]
    InvalidTypeUse { class: ClassId, span: Span },

    /// A call whose effect exceeds the caller's permitted effect.
    #[error("call with effect {callee} from a context permitting only {caller}")]
    CallEffectViolation {
        callee: Effect,
        caller: Effect,
        span: Span,
    },

    /// An explicitly tagged override whose effect exceeds an ancestor's.
    #[error("override effect {found} exceeds inherited effect {required}")]
    InvalidOverrideEffect {
        method: MethodId,
        found: Effect,
        required: Effect,
        span: Span,
    },

    /// A function-literal value whose final inferred effect is
    /// incompatible with its assignment or argument target.
    #[error("function literal with effect {found} incompatible with target effect {expected}")]
    IncompatibleArgument {
        found: Effect,
        expected: Effect,
        span: Span,
    },
}

impl EffectViolation {
    /// The source location the finding points at.
    pub fn span(&self) -> Span {
        match self {
            EffectViolation::ConflictingEffectAnnotations { span, .. }
            | EffectViolation::InvalidPolymorphismUse { span, .. }
            | EffectViolation::RedundantEffectAnnotation { span, .. }
            | EffectViolation::InvalidTypeUse { span, .. }
            | EffectViolation::CallEffectViolation { span, .. }
            | EffectViolation::InvalidOverrideEffect { span, .. }
            | EffectViolation::IncompatibleArgument { span, .. } => *span,
        }
    }

    /// The registered error code for this finding.
    pub fn code(&self) -> &'static str {
        match self {
            EffectViolation::ConflictingEffectAnnotations { .. } => "E5001",
            EffectViolation::InvalidPolymorphismUse { .. } => "E5002",
            EffectViolation::RedundantEffectAnnotation { .. } => "E5003",
            EffectViolation::InvalidTypeUse { .. } => "E5004",
            EffectViolation::CallEffectViolation { .. } => "E5005",
            EffectViolation::InvalidOverrideEffect { .. } => "E5006",
            EffectViolation::IncompatibleArgument { .. } => "E5007",
        }
    }

    pub fn severity(&self) -> DiagnosticSeverity {
        match self {
            EffectViolation::RedundantEffectAnnotation { .. } => DiagnosticSeverity::Warning,
            _ => DiagnosticSeverity::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity().is_error()
    }

    /// The single funnel from checker findings to renderable diagnostics.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let span = self.span();
        let source_span = SourceSpan::new(span.start, span.end);
        let diagnostic = Diagnostic::new(self.severity(), Some(self.code().to_string()), self.to_string());
        match self {
            EffectViolation::CallEffectViolation { callee, .. } => {
                diagnostic.with_primary_span(source_span, format!("callee requires {}", callee))
            }
            EffectViolation::IncompatibleArgument { expected, .. } => {
                diagnostic.with_primary_span(source_span, format!("target permits only {}", expected))
            }
            _ => diagnostic.with_primary_span(source_span, ""),
        }
    }
}

/// A defect in the traversal itself. Fatal to the current run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// The context stack was empty where a frame was expected.
    #[error("context stack empty where a frame was expected")]
    EmptyContextStack,

    /// A literal context frame refers to a node that is not a function
    /// literal, so its permitted effect cannot be determined.
    #[error("cannot determine the permitted effect of the enclosing context")]
    UndeterminedContext { span: Span },
}

impl CheckError {
    /// Internal errors surface as a single coded diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::error("E9001", self.to_string());
        match self {
            CheckError::UndeterminedContext { span } => {
                diagnostic.with_primary_span(SourceSpan::new(span.start, span.end), "")
            }
            CheckError::EmptyContextStack => diagnostic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn redundant_annotation_is_a_warning() {
        let v = EffectViolation::RedundantEffectAnnotation {
            method: MethodId(0),
            span: Span::dummy(),
        };
        assert!(!v.is_error());
        assert_eq!(v.code(), "E5003");
    }

    #[test]
    fn fatal_errors_use_the_internal_code() {
        let err = CheckError::EmptyContextStack;
        assert_eq!(err.to_diagnostic().code.as_deref(), Some("E9001"));
    }

    #[test]
    fn call_violation_diagnostic_carries_both_effects() {
        let v = EffectViolation::CallEffectViolation {
            callee: Effect::Ui,
            caller: Effect::Safe,
            span: Span::new(4, 12),
        };
        assert!(v.is_error());

        let d = v.to_diagnostic();
        assert_eq!(d.code.as_deref(), Some("E5005"));
        assert!(d.message.contains("@UIEffect"));
        assert!(d.message.contains("@SafeEffect"));
        assert!(d.has_spans());
    }
}
