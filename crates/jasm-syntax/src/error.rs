//! Errors that fail a parse call outright.
//!
//! Problems in the source text are never errors of this kind: they are
//! collected as [`crate::Diagnostic`]s. A [`JasmError`] means the caller
//! broke a precondition of the API.

/// Error returned by [`crate::parse`] and [`crate::parse_with_config`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum JasmError {
    /// The source buffer is empty.
    #[error("source buffer is empty")]
    #[diagnostic(
        code(jasm::empty_input),
        help("a JASM source file holds at least one newline-terminated line")
    )]
    EmptyInput,
}
