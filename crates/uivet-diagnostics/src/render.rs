//! Diagnostic rendering for terminal output.
//!
//! Renders [`Diagnostic`]s against the single compilation unit the checker
//! ran over, with colored severity headers, source context, and label
//! underlines.

use crate::span::{Label, LabelStyle, LineColumn};
use crate::{Diagnostic, DiagnosticSeverity};
use std::io::{self, Write};
use termcolor::{Buffer, Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use unicode_width::UnicodeWidthStr;

/// Configuration for the diagnostic renderer.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Whether to use colors.
    pub use_color: bool,
    /// Maximum line width for output.
    pub max_width: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            use_color: true,
            max_width: 100,
        }
    }
}

/// The source text of the checked compilation unit.
#[derive(Debug, Clone)]
pub struct SourceText {
    path: String,
    text: String,
}

impl SourceText {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Converts a byte offset to a 1-indexed line and column.
    pub fn line_col(&self, offset: usize) -> LineColumn {
        let offset = offset.min(self.text.len());
        let mut line = 1;
        let mut col = 1;
        let mut current = 0;

        for ch in self.text.chars() {
            if current >= offset {
                break;
            }
            if ch == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
            current += ch.len_utf8();
        }

        LineColumn::new(line, col)
    }

    /// Returns the 1-indexed source line, if it exists.
    pub fn line(&self, line: usize) -> Option<&str> {
        self.text.lines().nth(line.saturating_sub(1))
    }
}

/// Terminal renderer for diagnostics.
pub struct TerminalRenderer {
    config: RenderConfig,
    stream: StandardStream,
}

impl TerminalRenderer {
    /// Creates a renderer writing to stderr with default settings.
    pub fn new() -> Self {
        Self::with_config(RenderConfig::default())
    }

    /// Creates a renderer writing to stderr with the given configuration.
    pub fn with_config(config: RenderConfig) -> Self {
        let choice = if config.use_color {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        Self {
            config,
            stream: StandardStream::stderr(choice),
        }
    }

    /// Renders a single diagnostic.
    pub fn render(&mut self, diagnostic: &Diagnostic, source: &SourceText) -> io::Result<()> {
        let config = self.config.clone();
        render_to(&mut self.stream, &config, diagnostic, source)
    }

    /// Renders every diagnostic followed by an error/warning summary.
    pub fn render_all(&mut self, diagnostics: &[Diagnostic], source: &SourceText) -> io::Result<()> {
        for diagnostic in diagnostics {
            self.render(diagnostic, source)?;
        }
        self.render_summary(diagnostics)
    }

    /// Renders the closing summary line.
    pub fn render_summary(&mut self, diagnostics: &[Diagnostic]) -> io::Result<()> {
        render_summary_to(&mut self.stream, diagnostics)
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders a diagnostic into a plain string (no color); used by tests and
/// by hosts that embed the checker without a terminal.
pub fn render_to_string(diagnostic: &Diagnostic, source: &SourceText) -> String {
    let mut buffer = Buffer::no_color();
    render_to(&mut buffer, &RenderConfig::default(), diagnostic, source)
        .expect("rendering into a memory buffer cannot fail");
    String::from_utf8_lossy(buffer.as_slice()).into_owned()
}

fn severity_color(severity: DiagnosticSeverity) -> Color {
    match severity {
        DiagnosticSeverity::Error => Color::Red,
        DiagnosticSeverity::Warning => Color::Yellow,
        DiagnosticSeverity::Note => Color::Cyan,
        DiagnosticSeverity::Help => Color::Green,
    }
}

fn underline_char(style: LabelStyle, severity: DiagnosticSeverity) -> char {
    match (style, severity) {
        (LabelStyle::Primary, DiagnosticSeverity::Error) => '^',
        (LabelStyle::Primary, DiagnosticSeverity::Warning) => '~',
        (LabelStyle::Primary, DiagnosticSeverity::Note) => '-',
        (LabelStyle::Primary, DiagnosticSeverity::Help) => '+',
        (LabelStyle::Secondary, _) => '-',
    }
}

fn write_colored<W: WriteColor>(out: &mut W, text: &str, color: Color, bold: bool) -> io::Result<()> {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(color));
    spec.set_bold(bold);
    out.set_color(&spec)?;
    write!(out, "{}", text)?;
    out.reset()
}

fn render_to<W: WriteColor>(
    out: &mut W,
    config: &RenderConfig,
    diagnostic: &Diagnostic,
    source: &SourceText,
) -> io::Result<()> {
    let color = severity_color(diagnostic.severity);

    // Severity header: "error[E5005]: message"
    write_colored(out, diagnostic.severity.prefix(), color, true)?;
    if let Some(code) = &diagnostic.code {
        write_colored(out, &format!("[{}]", code), color, true)?;
    }
    write_colored(out, &format!(": {}", diagnostic.message), color, true)?;
    writeln!(out)?;

    if let Some(primary) = diagnostic.spans.primary_span() {
        let start = source.line_col(primary.start);
        writeln!(out, " --> {}:{}:{}", source.path(), start.line, start.column)?;

        let gutter = start.line.to_string().len().max(2);
        writeln!(out, "{:>width$} |", "", width = gutter)?;

        for label in diagnostic.spans.labels() {
            write_label(out, config, diagnostic.severity, label, source, gutter)?;
        }
    }

    for child in &diagnostic.children {
        let child_color = severity_color(child.severity);
        write!(out, "  ")?;
        write_colored(out, child.severity.prefix(), child_color, false)?;
        writeln!(out, ": {}", child.message)?;
    }

    writeln!(out)
}

fn write_label<W: WriteColor>(
    out: &mut W,
    config: &RenderConfig,
    severity: DiagnosticSeverity,
    label: &Label,
    source: &SourceText,
    gutter: usize,
) -> io::Result<()> {
    let start = source.line_col(label.span.start);
    let end = source.line_col(label.span.end);
    let Some(line) = source.line(start.line) else {
        return Ok(());
    };

    // Source line with line number.
    let shown = if line.len() > config.max_width.saturating_sub(gutter + 4) {
        let mut cut = config.max_width.saturating_sub(gutter + 7).min(line.len());
        // The byte budget can land inside a multibyte character; snap back
        // to a char boundary before slicing.
        while cut > 0 && !line.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &line[..cut])
    } else {
        line.to_string()
    };
    write_colored(out, &format!("{:>width$}", start.line, width = gutter), Color::Blue, false)?;
    writeln!(out, " | {}", shown)?;

    // Underline, positioned by display width of the prefix so wide
    // characters line up.
    let prefix_bytes = line
        .char_indices()
        .take(start.column.saturating_sub(1))
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let pad = UnicodeWidthStr::width(&line[..prefix_bytes]);
    let len = if end.line == start.line {
        end.column.saturating_sub(start.column).max(1)
    } else {
        1
    };

    let color = severity_color(match label.style {
        LabelStyle::Primary => severity,
        LabelStyle::Secondary => DiagnosticSeverity::Note,
    });
    let ch = underline_char(label.style, severity);
    write!(out, "{:>width$} | {:>pad$}", "", "", width = gutter, pad = pad)?;
    let underline: String = std::iter::repeat(ch).take(len).collect();
    write_colored(out, &underline, color, false)?;
    if !label.message.is_empty() {
        write!(out, " ")?;
        write_colored(out, &label.message, color, false)?;
    }
    writeln!(out)
}

fn render_summary_to<W: WriteColor>(out: &mut W, diagnostics: &[Diagnostic]) -> io::Result<()> {
    let errors = diagnostics.iter().filter(|d| d.severity.is_error()).count();
    let warnings = diagnostics
        .iter()
        .filter(|d| d.severity == DiagnosticSeverity::Warning)
        .count();

    if errors > 0 {
        write_colored(out, "error", severity_color(DiagnosticSeverity::Error), true)?;
        if errors == 1 {
            writeln!(out, ": check failed with 1 error")?;
        } else {
            writeln!(out, ": check failed with {} errors", errors)?;
        }
    } else if warnings > 0 {
        write_colored(out, "warning", severity_color(DiagnosticSeverity::Warning), true)?;
        if warnings == 1 {
            writeln!(out, ": check passed with 1 warning")?;
        } else {
            writeln!(out, ": check passed with {} warnings", warnings)?;
        }
    }
    Ok(())
}
