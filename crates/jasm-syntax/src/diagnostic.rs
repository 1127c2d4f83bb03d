//! Diagnostics produced while scanning and parsing.
//!
//! Diagnostics are collected, never thrown: a parse returns every problem it
//! found alongside the (possibly partial) syntax tree. Each diagnostic carries
//! a [`DiagnosticKind`], a severity, a message, the exact source position and
//! byte span, and an optional suggestion.
//!
//! [`Diagnostic`] implements [`miette::Diagnostic`], so a host can render it
//! against the source text:
//!
//! ```
//! let src = "LOAD A,\n";
//! let out = jasm_syntax::parse(src).unwrap();
//! let report = out.diagnostics[0].to_report("demo.jasm", src);
//! assert!(report.to_string().contains("expected an operand"));
//! ```

use std::fmt;

use jasm_lang_core::{Position, Severity, Span};
use serde::{Deserialize, Serialize};

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// The final line of the input has no terminating newline.
    UnterminatedLine,
    /// A `"` with no closing `"` on the same line.
    UnterminatedString,
    /// End of input inside a `MACRO` block.
    UnterminatedMacro,
    /// A label, macro call or nested `MACRO` inside a macro body.
    RestrictedLineInMacroBody,
    /// The first tokens of a line match no line form.
    UnrecognizedLine,
    /// A digit-initial lexeme that is not a valid number.
    MalformedNumber,
    /// A missing `(` or `)`.
    UnbalancedExpression,
    /// Extra tokens after a complete line.
    ExpectedNewline,
    /// A character that cannot start any token.
    UnexpectedCharacter,
    /// A missing or invalid operand, expression term or constant.
    ExpectedOperand,
    /// A `MACRO` line with a bad name or parameter list.
    MalformedMacroHeader,
    /// A call to a macro defined earlier in the file with a different
    /// number of operands.
    ArityMismatch,
}

impl DiagnosticKind {
    /// Stable code, rendered by miette as `jasm::<code>`.
    pub fn code(self) -> &'static str {
        match self {
            DiagnosticKind::UnterminatedLine => "jasm::unterminated_line",
            DiagnosticKind::UnterminatedString => "jasm::unterminated_string",
            DiagnosticKind::UnterminatedMacro => "jasm::unterminated_macro",
            DiagnosticKind::RestrictedLineInMacroBody => "jasm::restricted_line_in_macro_body",
            DiagnosticKind::UnrecognizedLine => "jasm::unrecognized_line",
            DiagnosticKind::MalformedNumber => "jasm::malformed_number",
            DiagnosticKind::UnbalancedExpression => "jasm::unbalanced_expression",
            DiagnosticKind::ExpectedNewline => "jasm::expected_newline",
            DiagnosticKind::UnexpectedCharacter => "jasm::unexpected_character",
            DiagnosticKind::ExpectedOperand => "jasm::expected_operand",
            DiagnosticKind::MalformedMacroHeader => "jasm::malformed_macro_header",
            DiagnosticKind::ArityMismatch => "jasm::arity_mismatch",
        }
    }

    /// Severity a diagnostic of this kind is reported with.
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::ArityMismatch => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::UnterminatedLine => "unterminated line",
            DiagnosticKind::UnterminatedString => "unterminated string",
            DiagnosticKind::UnterminatedMacro => "unterminated macro",
            DiagnosticKind::RestrictedLineInMacroBody => "line not allowed in macro body",
            DiagnosticKind::UnrecognizedLine => "unrecognized line",
            DiagnosticKind::MalformedNumber => "malformed number",
            DiagnosticKind::UnbalancedExpression => "unbalanced expression",
            DiagnosticKind::ExpectedNewline => "expected end of line",
            DiagnosticKind::UnexpectedCharacter => "unexpected character",
            DiagnosticKind::ExpectedOperand => "expected operand",
            DiagnosticKind::MalformedMacroHeader => "malformed macro header",
            DiagnosticKind::ArityMismatch => "macro arity mismatch",
        };
        f.write_str(name)
    }
}

/// A diagnostic message from the scanner or parser.
///
/// # Example
///
/// ```
/// use jasm_syntax::{Diagnostic, DiagnosticKind};
/// use jasm_lang_core::{Position, Severity, Span};
///
/// let d = Diagnostic::new(
///     DiagnosticKind::ExpectedNewline,
///     "unexpected register `B` after operand list",
///     Span::main(7, 8),
///     Position::new(1, 8, 7),
/// )
/// .with_suggestion("separate operands with `,`");
///
/// assert_eq!(d.severity, Severity::Error);
/// assert_eq!(d.line(), 1);
/// assert!(d.suggestion.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// Human-readable message describing the issue.
    pub message: String,
    /// Byte range the diagnostic points at.
    pub span: Span,
    /// Line and column of the start of `span`.
    pub pos: Position,
    /// Optional suggestion for how to fix the issue.
    pub suggestion: Option<String>,
}

impl Diagnostic {
    /// Create a diagnostic with the kind's default severity.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, span: Span, pos: Position) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message: message.into(),
            span,
            pos,
            suggestion: None,
        }
    }

    /// Add a suggestion to this diagnostic.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn line(&self) -> u32 {
        self.pos.line
    }

    pub fn column(&self) -> u32 {
        self.pos.column
    }

    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// Wrap this diagnostic in a [`miette::Report`] carrying the named source
    /// text, ready for graphical or narrated rendering.
    ///
    /// `source` must be the text the diagnostic was produced from (after
    /// line-ending normalization, when that was enabled).
    pub fn to_report(&self, name: &str, source: &str) -> miette::Report {
        miette::Report::new(self.clone())
            .with_source_code(miette::NamedSource::new(name, source.to_string()))
    }
}

impl miette::Diagnostic for Diagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.severity {
            Severity::Error => miette::Severity::Error,
            Severity::Warning => miette::Severity::Warning,
            Severity::Info => miette::Severity::Advice,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.suggestion
            .as_ref()
            .map(|s| Box::new(s) as Box<dyn fmt::Display + 'a>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        let label = miette::LabeledSpan::at(self.span.to_range(), self.kind.to_string());
        Some(Box::new(std::iter::once(label)))
    }
}
