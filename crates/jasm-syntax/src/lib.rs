//! JASM: syntax front end for the JASM assembly language.
//!
//! This crate provides:
//!
//! - **Scanner**: line-oriented tokenizer with case-insensitive mnemonics
//!   and registers, comments stripped, numbers decoded with their radix
//! - **Parser**: ordered per-line dispatch into six line forms, with
//!   restricted macro bodies and flat (precedence-free) expressions
//! - **AST**: serializable syntax tree that prints back to canonical JASM
//! - **Diagnostics**: collected, positioned, renderable with `miette`
//!
//! Parsing never stops at the first problem. Every line-local problem in
//! the file is reported in one pass; only an unterminated macro, a string
//! left open to the end of input, or a final line without a newline stop
//! the parse early.
//!
//! # Example
//!
//! ```
//! use jasm_syntax::{parse, LineKind};
//!
//! let src = "start:\n  LOAD A, (1 + 2)\n  JUMP start\n";
//! let out = parse(src).unwrap();
//!
//! assert!(out.diagnostics.is_empty());
//! assert!(matches!(out.file.lines[0].kind, LineKind::Label(_)));
//! assert_eq!(out.file.to_string(), "start:\nLOAD A, (1 + 2)\nJUMP start\n");
//! ```

#[macro_use]
mod macros;

pub mod ast;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod macro_scope;
pub mod parser;
pub mod scanner;
pub mod token;

pub use ast::{
    Constant, Expression, Instruction, Line, LineKind, MacroBodyLine, MacroCall, MacroDef,
    Operand, SourceFile, Term,
};
pub use config::ParserConfig;
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use error::JasmError;
pub use macro_scope::MacroScope;
pub use parser::{ParseOutput, Parser};
pub use scanner::{scan, ScannedLine, ScannedSource, Scanner};
pub use token::{Directive, Mnemonic, Number, Operator, Radix, Register, Token, TokenKind};

/// Parse JASM source text with the default configuration.
///
/// Returns the syntax tree, every diagnostic, and the macro table. Fails
/// only when `source` is empty.
pub fn parse(source: &str) -> Result<ParseOutput, JasmError> {
    parse_with_config(source, &ParserConfig::default())
}

/// Parse JASM source text with an explicit configuration.
pub fn parse_with_config(source: &str, config: &ParserConfig) -> Result<ParseOutput, JasmError> {
    if source.is_empty() {
        return Err(JasmError::EmptyInput);
    }
    Ok(Parser::new(source, config).finish())
}
