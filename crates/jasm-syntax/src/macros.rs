//! Macro for generating closed keyword sets.
//!
//! JASM has two closed, case-insensitive word classes (mnemonics and
//! registers). Each is declared once with [`keyword_enum!`], which generates
//! the enum, the `ALL` table, canonical `as_str()` spelling, case-insensitive
//! lookup and `Display`.
//!
//! # Adding a mnemonic
//!
//! Add one `Variant => "SPELLING"` line to the `Mnemonic` declaration in
//! `token.rs`. Scanner classification, printing and the parser dispatch pick
//! it up automatically.

/// Declare a closed keyword enum.
///
/// The string literal is the canonical upper-case spelling used for lookup
/// (case-folded) and for printing.
macro_rules! keyword_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every member of the set, in declaration order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            /// Canonical upper-case spelling.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }

            /// Case-insensitive lookup of a whole word.
            pub fn from_word(word: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|k| k.as_str().eq_ignore_ascii_case(word))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}
