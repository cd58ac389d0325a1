//! uivet diagnostics - error message and diagnostic carrier for the
//! UI-effect checker.
//!
//! This crate provides:
//!
//! - `Diagnostic` - the core diagnostic type with code, severity, message, and spans
//! - `DiagnosticSeverity` - Error, Warning, Note, and Help levels
//! - Source spans for tracking diagnostic locations
//! - Terminal rendering with color support
//!
//! # Example
//!
//! ```rust
//! use uivet_diagnostics::{Diagnostic, DiagnosticSeverity};
//! use uivet_diagnostics::span::SourceSpan;
//!
//! let span = SourceSpan::new(20, 22);
//! let diagnostic = Diagnostic::error("E5005", "call with UI effect from a safe context")
//!     .with_primary_span(span, "callee requires the UI effect");
//!
//! assert_eq!(diagnostic.severity, DiagnosticSeverity::Error);
//! assert_eq!(diagnostic.code, Some("E5005".to_string()));
//! ```

pub mod render;
pub mod span;

use span::{MultiSpan, SourceSpan};
use thiserror::Error;

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DiagnosticSeverity {
    /// An error that makes the checked unit invalid.
    #[default]
    Error,
    /// A warning; checking continues and the unit remains valid.
    Warning,
    /// Informational note, usually attached to another diagnostic.
    Note,
    /// A suggestion for fixing an issue.
    Help,
}

impl DiagnosticSeverity {
    /// Returns the text prefix for this severity level.
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Note => "note",
            DiagnosticSeverity::Help => "help",
        }
    }

    /// Returns true if this severity level fails the check.
    pub fn is_error(&self) -> bool {
        matches!(self, DiagnosticSeverity::Error)
    }
}

/// A checker diagnostic (error, warning, note, or help message).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The error code (e.g., "E5005").
    pub code: Option<String>,
    /// The severity level.
    pub severity: DiagnosticSeverity,
    /// The main message.
    pub message: String,
    /// Source locations related to this diagnostic.
    pub spans: MultiSpan,
    /// Child diagnostics (notes, helps attached to this diagnostic).
    pub children: Vec<Diagnostic>,
}

impl Diagnostic {
    /// Creates a new diagnostic with the given severity, code, and message.
    pub fn new(
        severity: DiagnosticSeverity,
        code: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            spans: MultiSpan::new(),
            children: Vec::new(),
        }
    }

    /// Creates an error diagnostic.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Error, Some(code.into()), message)
    }

    /// Creates a warning diagnostic.
    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Warning, Some(code.into()), message)
    }

    /// Creates a note diagnostic.
    pub fn note(message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Note, None, message)
    }

    /// Creates a help diagnostic.
    pub fn help(message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Help, None, message)
    }

    /// Adds a primary span with a label message.
    pub fn with_primary_span(mut self, span: SourceSpan, message: impl Into<String>) -> Self {
        self.spans.push_primary(span, message);
        self
    }

    /// Adds a secondary span with a label message.
    pub fn with_secondary_span(mut self, span: SourceSpan, message: impl Into<String>) -> Self {
        self.spans.push_secondary(span, message);
        self
    }

    /// Adds a child diagnostic (note or help).
    pub fn with_child(mut self, child: Diagnostic) -> Self {
        self.children.push(child);
        self
    }

    /// Returns true if this diagnostic has any spans.
    pub fn has_spans(&self) -> bool {
        !self.spans.is_empty()
    }
}

/// Error categories for the error code registry.
///
/// Error codes follow the pattern EXXXX where the first digit indicates
/// the category. The checker only emits effect-system and internal codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// E5XXX: Effect system errors
    Effects,
    /// E9XXX: Internal checker errors
    Internal,
}

impl ErrorCategory {
    /// Creates a category from an error code.
    pub fn from_code(code: &str) -> Option<Self> {
        if !code.starts_with('E') || code.len() < 2 {
            return None;
        }
        match code.chars().nth(1)? {
            '5' => Some(ErrorCategory::Effects),
            '9' => Some(ErrorCategory::Internal),
            _ => None,
        }
    }

    /// Returns a human-readable name for this category.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCategory::Effects => "Effects",
            ErrorCategory::Internal => "Internal",
        }
    }
}

/// Information about a registered error code.
#[derive(Debug, Clone)]
pub struct ErrorCodeInfo {
    pub code: String,
    pub category: ErrorCategory,
    pub description: String,
}

/// Registry of all error codes the checker emits.
#[derive(Debug, Default)]
pub struct ErrorCodeRegistry {
    codes: std::collections::HashMap<String, ErrorCodeInfo>,
}

impl ErrorCodeRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the standard uivet error codes.
    pub fn with_standard_codes() -> Self {
        let mut registry = Self::new();

        registry.register("E5001", "conflicting effect annotations");
        registry.register("E5002", "invalid effect polymorphism");
        registry.register("E5003", "redundant UI effect annotation");
        registry.register("E5004", "invalid type use");
        registry.register("E5005", "call effect exceeds caller context");
        registry.register("E5006", "override widens inherited effect");
        registry.register("E5007", "incompatible function-literal argument");

        registry.register("E9001", "internal checker error");

        registry
    }

    /// Registers a new error code. Returns false for a malformed code.
    pub fn register(&mut self, code: impl Into<String>, description: impl Into<String>) -> bool {
        let code = code.into();
        match ErrorCategory::from_code(&code) {
            Some(category) => {
                self.codes.insert(
                    code.clone(),
                    ErrorCodeInfo {
                        code,
                        category,
                        description: description.into(),
                    },
                );
                true
            }
            None => false,
        }
    }

    /// Looks up an error code.
    pub fn get(&self, code: &str) -> Option<&ErrorCodeInfo> {
        self.codes.get(code)
    }

    /// Returns all registered error codes.
    pub fn all_codes(&self) -> impl Iterator<Item = &ErrorCodeInfo> {
        self.codes.values()
    }
}

/// Result type for diagnostic operations.
pub type DiagnosticResult<T> = Result<T, DiagnosticError>;

/// Errors that can occur while rendering diagnostics.
#[derive(Debug, Error)]
pub enum DiagnosticError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An invalid error code was used.
    #[error("invalid error code: {0}")]
    InvalidErrorCode(String),
}
