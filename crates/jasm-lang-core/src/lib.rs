//! Shared building blocks for the JASM assembler front end.
//!
//! - **Source location tracking**: [`Span`], [`FileId`], [`Position`]
//! - **Preprocessing**: [`PreprocessedSource`] normalizes line endings and
//!   resolves byte offsets to line/column positions
//! - **Severity**: [`Severity`], shared by every diagnostic producer
//! - **Pipeline traits**: [`AstNode`], [`Lexer`], [`Parse`]
//!
//! This crate has no required dependencies. The optional `serde` feature
//! derives `Serialize`/`Deserialize` for the location and severity types.
//! Diagnostics themselves live in `jasm-syntax`, which adds
//! `miette`/`thiserror` on top for rendering.

mod preprocess;
mod severity;
mod span;
mod traits;

pub use preprocess::{normalize_line_endings, LineIndex, PreprocessedSource};
pub use severity::Severity;
pub use span::{FileId, Position, Span};
pub use traits::{AstNode, Lexer, Parse};
