//! Source span and label types for tracking diagnostic locations.
//!
//! The checker runs over one compilation unit at a time, so spans are bare
//! byte ranges into that unit's source text; the unit's path lives on the
//! renderer, not on every span.

/// A contiguous byte range in the checked compilation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceSpan {
    /// The starting byte offset (inclusive).
    pub start: usize,
    /// The ending byte offset (exclusive).
    pub end: usize,
}

impl SourceSpan {
    /// Creates a new source span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if this span has zero length.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Merges two spans into one that covers both.
    pub fn merge(&self, other: &SourceSpan) -> SourceSpan {
        SourceSpan {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Returns true if this span contains the given byte offset.
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }
}

/// The visual style for a label's underline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LabelStyle {
    /// Primary label (error location) - uses `^^^` underline.
    #[default]
    Primary,
    /// Secondary label (related location) - uses `---` underline.
    Secondary,
}

/// A label that annotates a source span with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub span: SourceSpan,
    pub message: String,
    pub style: LabelStyle,
}

impl Label {
    /// Creates a new primary label.
    pub fn primary(span: SourceSpan, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            style: LabelStyle::Primary,
        }
    }

    /// Creates a new secondary label.
    pub fn secondary(span: SourceSpan, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            style: LabelStyle::Secondary,
        }
    }
}

/// A collection of spans for diagnostics that involve several locations,
/// such as an effect violation that wants to point at both the call and
/// the enclosing declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiSpan {
    primary: Option<SourceSpan>,
    labels: Vec<Label>,
}

impl MultiSpan {
    /// Creates a new empty multi-span.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a multi-span from a single primary span.
    pub fn from_span(span: SourceSpan) -> Self {
        Self {
            primary: Some(span),
            labels: Vec::new(),
        }
    }

    /// Returns the primary span, if any.
    pub fn primary_span(&self) -> Option<SourceSpan> {
        self.primary
    }

    /// Adds a primary label with a message.
    pub fn push_primary(&mut self, span: SourceSpan, message: impl Into<String>) {
        if self.primary.is_none() {
            self.primary = Some(span);
        }
        self.labels.push(Label::primary(span, message));
    }

    /// Adds a secondary label with a message.
    pub fn push_secondary(&mut self, span: SourceSpan, message: impl Into<String>) {
        self.labels.push(Label::secondary(span, message));
    }

    /// Returns all labels.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Returns true if this multi-span has no spans.
    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.labels.is_empty()
    }
}

/// Position information for a span (line and column, both 1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

impl LineColumn {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}
