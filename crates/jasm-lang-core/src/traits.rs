//! Pipeline traits for the front end.
//!
//! The scanner and parser implement these so that tooling built on top of the
//! front end (formatters, editors, batch checkers) can drive a parse without
//! knowing the concrete scanner or parser types.

use crate::span::Span;

/// AST nodes that carry source location information.
///
/// # Example
///
/// ```
/// use jasm_lang_core::{AstNode, Span};
///
/// struct Block {
///     span: Span,
/// }
///
/// impl AstNode for Block {
///     fn span(&self) -> Span {
///         self.span
///     }
/// }
///
/// let block = Block { span: Span::main(4, 12) };
/// assert_eq!(block.span().len(), 8);
/// ```
pub trait AstNode {
    /// Returns the source span covering this AST node.
    fn span(&self) -> Span;
}

/// A scanner turning source text into tokens.
///
/// Scanning recovers where it can: the result carries every token that could
/// be formed alongside every error found.
pub trait Lexer {
    /// The token type produced by this lexer.
    type Token;
    /// The error type produced by this lexer.
    type Error;

    /// Tokenize the given source text.
    fn tokenize(&mut self, source: &str) -> (Vec<Self::Token>, Vec<Self::Error>);
}

/// A parser turning a scanned source into an AST.
///
/// Parsing recovers where it can: a partial AST is returned alongside the
/// accumulated errors. The AST is `None` only when nothing usable could be
/// built.
pub trait Parse {
    /// The AST root type produced by this parser.
    type Ast: AstNode;
    /// The error type produced by this parser.
    type Error;

    /// Parse into an AST.
    fn parse(&mut self) -> (Option<Self::Ast>, Vec<Self::Error>);
}
