//! Parser configuration.

use jasm_lang_core::FileId;
use serde::{Deserialize, Serialize};

/// Options for a single parse call.
///
/// Deserializable so a host can keep it in its own configuration file; every
/// field has a default, so a partial table is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// File id stamped into every span.
    pub file: FileId,
    /// Convert `\r\n` and bare `\r` to `\n` before scanning. When disabled,
    /// any `\r` is reported as an unexpected character.
    pub normalize_line_endings: bool,
    /// Warn when a call to a macro defined earlier in the file passes a
    /// different number of operands than the macro declares.
    pub warn_on_arity_mismatch: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            file: FileId::MAIN,
            normalize_line_endings: true,
            warn_on_arity_mismatch: true,
        }
    }
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, file: FileId) -> Self {
        self.file = file;
        self
    }

    pub fn with_line_ending_normalization(mut self, enabled: bool) -> Self {
        self.normalize_line_endings = enabled;
        self
    }

    pub fn with_arity_warnings(mut self, enabled: bool) -> Self {
        self.warn_on_arity_mismatch = enabled;
        self
    }
}
