//! JASM token types.

use std::fmt;

use jasm_lang_core::{Position, Span};
use serde::{Deserialize, Serialize};

keyword_enum! {
    /// Instruction mnemonics. Matched case-insensitively.
    pub enum Mnemonic {
        Load => "LOAD",
        Store => "STORE",
        Move => "MOVE",
        Push => "PUSH",
        Pop => "POP",
        Add => "ADD",
        Addc => "ADDC",
        Sub => "SUB",
        Subb => "SUBB",
        Inc => "INC",
        Dec => "DEC",
        Lshf => "LSHF",
        Rshf => "RSHF",
        And => "AND",
        Or => "OR",
        Nor => "NOR",
        Not => "NOT",
        Xor => "XOR",
        Inb => "INB",
        Outb => "OUTB",
        Cmp => "CMP",
        Setc => "SETC",
        Clrc => "CLRC",
        Clrz => "CLRZ",
        Jump => "JUMP",
        Jz => "JZ",
        Jnz => "JNZ",
        Jc => "JC",
        Jnc => "JNC",
        Int => "INT",
        Halt => "HALT",
        Nop => "NOP",
    }
}

keyword_enum! {
    /// Machine registers. Matched case-insensitively.
    pub enum Register {
        A => "A",
        B => "B",
        C => "C",
        D => "D",
        X => "X",
        Y => "Y",
        /// Stack pointer.
        Sp => "SP",
        /// Program counter.
        Pc => "PC",
        Z => "Z",
        F => "F",
        Mb => "MB",
        /// Status register.
        Sts => "STS",
    }
}

/// Line-structure keywords. Unlike mnemonics these are matched exactly, in
/// upper case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Directive {
    /// `MACRO` opens a macro definition.
    Macro,
    /// `END`, the first half of `END MACRO`.
    End,
    /// `DATA` starts a constant list.
    Data,
}

impl Directive {
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "MACRO" => Some(Directive::Macro),
            "END" => Some(Directive::End),
            "DATA" => Some(Directive::Data),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Directive::Macro => "MACRO",
            Directive::End => "END",
            Directive::Data => "DATA",
        }
    }
}

/// Expression operators.
///
/// There is no precedence between them: expressions keep operators in
/// source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `&`
    And,
    /// `|`
    Or,
    /// `^`
    Xor,
    /// `~`
    Not,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Shl => "<<",
            Operator::Shr => ">>",
            Operator::And => "&",
            Operator::Or => "|",
            Operator::Xor => "^",
            Operator::Not => "~",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The literal form a number was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Radix {
    /// `0x1F`
    Hexadecimal,
    /// `0b101`
    Binary,
    /// `31`
    Decimal,
}

impl Radix {
    pub fn base(self) -> u32 {
        match self {
            Radix::Hexadecimal => 16,
            Radix::Binary => 2,
            Radix::Decimal => 10,
        }
    }
}

/// A decoded numeric literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Number {
    pub value: u64,
    pub radix: Radix,
}

impl Number {
    pub fn new(value: u64, radix: Radix) -> Self {
        Self { value, radix }
    }

    pub fn decimal(value: u64) -> Self {
        Self::new(value, Radix::Decimal)
    }

    /// Decode a complete literal lexeme.
    ///
    /// Returns `None` when the text matches none of the three literal forms
    /// or the value does not fit in 64 bits.
    pub fn parse(text: &str) -> Option<Self> {
        let (digits, radix) = if let Some(rest) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            (rest, Radix::Hexadecimal)
        } else if let Some(rest) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
            (rest, Radix::Binary)
        } else {
            (text, Radix::Decimal)
        };

        let valid = !digits.is_empty()
            && digits.chars().all(|c| match radix {
                Radix::Hexadecimal => c.is_ascii_hexdigit(),
                Radix::Binary => c == '0' || c == '1',
                Radix::Decimal => c.is_ascii_digit(),
            });
        if !valid {
            return None;
        }

        u64::from_str_radix(digits, radix.base())
            .ok()
            .map(|value| Self { value, radix })
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.radix {
            Radix::Hexadecimal => write!(f, "0x{:X}", self.value),
            Radix::Binary => write!(f, "0b{:b}", self.value),
            Radix::Decimal => write!(f, "{}", self.value),
        }
    }
}

/// A JASM token kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    // -- Words --
    /// An instruction mnemonic (any case in source).
    Mnemonic(Mnemonic),
    /// A register name (any case in source).
    Register(Register),
    /// `MACRO`, `END` or `DATA`.
    Directive(Directive),
    /// Any other identifier-shaped word (label or macro name).
    Identifier(String),
    /// `%name`, stored without the `%`.
    MacroArg(String),

    // -- Literals --
    Number(Number),
    /// `"..."`, stored without the quotes.
    Str(String),

    // -- Punctuation --
    Operator(Operator),
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `(`
    LParen,
    /// `)`
    RParen,

    /// End of a physical line.
    Newline,
    /// A lexeme the scanner already reported (malformed number, stray
    /// character, unterminated string).
    Error,
}

impl TokenKind {
    /// Short description for diagnostics ("register `A`", "`,`", ...).
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Mnemonic(m) => format!("mnemonic `{m}`"),
            TokenKind::Register(r) => format!("register `{r}`"),
            TokenKind::Directive(d) => format!("`{}`", d.as_str()),
            TokenKind::Identifier(name) => format!("identifier `{name}`"),
            TokenKind::MacroArg(name) => format!("macro argument `%{name}`"),
            TokenKind::Number(n) => format!("number `{n}`"),
            TokenKind::Str(_) => "string".to_string(),
            TokenKind::Operator(op) => format!("operator `{op}`"),
            TokenKind::Comma => "`,`".to_string(),
            TokenKind::Colon => "`:`".to_string(),
            TokenKind::LParen => "`(`".to_string(),
            TokenKind::RParen => "`)`".to_string(),
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Error => "invalid token".to_string(),
        }
    }
}

/// A JASM token with its source text and location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// The exact source text of the lexeme (`"\n"` for `Newline`).
    pub text: String,
    pub span: Span,
    pub pos: Position,
}

impl Token {
    /// Canonical spelling: upper case for mnemonics, registers and
    /// directives; the source text for everything else.
    pub fn canonical(&self) -> &str {
        match &self.kind {
            TokenKind::Mnemonic(m) => m.as_str(),
            TokenKind::Register(r) => r.as_str(),
            TokenKind::Directive(d) => d.as_str(),
            _ => &self.text,
        }
    }
}
