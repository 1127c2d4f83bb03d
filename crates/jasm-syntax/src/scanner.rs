//! JASM scanner: turns source text into tokens, one physical line at a time.
//!
//! Lexical rules:
//! - Spaces and tabs separate tokens and are discarded
//! - `\n` ends a line and is kept as an explicit `Newline` token
//! - `;` starts a comment running to the end of the line
//! - Words (`[A-Za-z][A-Za-z0-9_]*`) are mnemonics or registers (any case),
//!   directives (`MACRO`, `END`, `DATA`, exact case) or identifiers
//! - `%name` is a macro argument; a `%` not followed by a letter is modulo
//! - Numbers are `0x` hex, `0b` binary or decimal
//! - Strings are `"..."` on one line, with no escapes
//!
//! The scanner reports its own problems (malformed numbers, stray
//! characters, unterminated strings) and flags the affected lines so the
//! parser skips them instead of reporting them a second time.

use jasm_lang_core::{FileId, Lexer, Position, PreprocessedSource, Span};

use crate::config::ParserConfig;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::token::{Directive, Mnemonic, Number, Operator, Register, Token, TokenKind};

/// The tokens of one physical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedLine {
    /// Line number (1-based).
    pub number: u32,
    /// Position of the first character of the line.
    pub start: Position,
    /// Tokens in source order; the last one is always `Newline`.
    pub tokens: Vec<Token>,
    /// The scanner reported a problem on this line.
    pub has_errors: bool,
}

impl ScannedLine {
    /// Span from the first character of the line through its newline.
    pub fn span(&self) -> Span {
        let first = self.tokens.first().map(|t| t.span);
        let last = self.tokens.last().map(|t| t.span);
        match (first, last) {
            (Some(first), Some(last)) => Span::new(first.file, self.start.offset, last.end),
            _ => Span::main(self.start.offset, self.start.offset),
        }
    }
}

/// Result of scanning a whole source buffer.
#[derive(Debug, Clone)]
pub struct ScannedSource {
    /// The (normalized) text all positions refer to.
    pub source: PreprocessedSource,
    pub file: FileId,
    pub lines: Vec<ScannedLine>,
    pub diagnostics: Vec<Diagnostic>,
    /// A structural problem stopped scanning before the end of the input.
    pub halted: bool,
}

/// Scan source text with the default configuration.
pub fn scan(source: &str) -> ScannedSource {
    Scanner::new(&ParserConfig::default()).scan(source)
}

/// The JASM scanner.
#[derive(Debug, Clone)]
pub struct Scanner {
    file: FileId,
    normalize_line_endings: bool,
}

impl Scanner {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            file: config.file,
            normalize_line_endings: config.normalize_line_endings,
        }
    }

    /// Scan a complete source buffer into lines of tokens.
    pub fn scan(&self, raw: &str) -> ScannedSource {
        let source = if self.normalize_line_endings {
            PreprocessedSource::new(raw)
        } else {
            PreprocessedSource::from_unix(raw.to_string())
        };

        let mut lines = Vec::new();
        let mut diagnostics = Vec::new();
        let mut halted = false;
        let mut offset = 0usize;
        let last_quote = source.text.rfind('"');

        for (idx, segment) in source.text.split_inclusive('\n').enumerate() {
            let number = idx as u32 + 1;
            let Some(body) = segment.strip_suffix('\n') else {
                let end = source.position(source.text.len() as u32);
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::UnterminatedLine,
                        format!("line {number} is not terminated by a newline"),
                        Span::new(self.file, offset as u32, source.text.len() as u32),
                        end,
                    )
                    .with_suggestion("add a newline at the end of the file"),
                );
                halted = true;
                break;
            };

            let later_quote = last_quote.is_some_and(|q| q >= offset + segment.len());
            let mut line = LineScanner::new(body, number, offset as u32, self.file);
            line.run(later_quote);
            diagnostics.append(&mut line.diagnostics);
            if line.halted {
                halted = true;
                break;
            }
            lines.push(ScannedLine {
                number,
                start: Position::new(number, 1, offset as u32),
                tokens: line.tokens,
                has_errors: line.has_errors,
            });
            offset += segment.len();
        }

        tracing::debug!(
            lines = lines.len(),
            diagnostics = diagnostics.len(),
            halted,
            "scanned source"
        );

        ScannedSource {
            source,
            file: self.file,
            lines,
            diagnostics,
            halted,
        }
    }
}

impl Lexer for Scanner {
    type Token = Token;
    type Error = Diagnostic;

    /// Flat token stream: every line's tokens, each line ending in `Newline`.
    fn tokenize(&mut self, source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
        let scanned = self.scan(source);
        let tokens = scanned.lines.into_iter().flat_map(|l| l.tokens).collect();
        (tokens, scanned.diagnostics)
    }
}

/// Cursor over one physical line (without its `\n`).
struct LineScanner<'a> {
    text: &'a str,
    /// Characters with their byte offset inside `text`.
    chars: Vec<(usize, char)>,
    pos: usize,
    number: u32,
    /// Byte offset of the line start in the whole source.
    base: u32,
    file: FileId,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
    has_errors: bool,
    halted: bool,
}

impl<'a> LineScanner<'a> {
    fn new(text: &'a str, number: u32, base: u32, file: FileId) -> Self {
        Self {
            text,
            chars: text.char_indices().collect(),
            pos: 0,
            number,
            base,
            file,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
            has_errors: false,
            halted: false,
        }
    }

    /// Scan the line. `later_quote` is set when a `"` follows this line's
    /// newline somewhere in the input.
    fn run(&mut self, later_quote: bool) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' => self.pos += 1,
                ';' => break,
                '"' => {
                    if !self.lex_string(later_quote) {
                        break;
                    }
                }
                ',' => self.single(TokenKind::Comma),
                ':' => self.single(TokenKind::Colon),
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                '+' => self.single(TokenKind::Operator(Operator::Add)),
                '-' => self.single(TokenKind::Operator(Operator::Sub)),
                '*' => self.single(TokenKind::Operator(Operator::Mul)),
                '/' => self.single(TokenKind::Operator(Operator::Div)),
                '&' => self.single(TokenKind::Operator(Operator::And)),
                '|' => self.single(TokenKind::Operator(Operator::Or)),
                '^' => self.single(TokenKind::Operator(Operator::Xor)),
                '~' => self.single(TokenKind::Operator(Operator::Not)),
                '%' => self.lex_percent(),
                '<' | '>' => self.lex_shift(c),
                _ if c.is_ascii_digit() => self.lex_number(),
                _ if c.is_ascii_alphabetic() => self.lex_word(),
                _ => self.unexpected(c),
            }
        }

        if self.halted {
            return;
        }

        let end = self.text.len() as u32;
        self.tokens.push(Token {
            kind: TokenKind::Newline,
            text: "\n".to_string(),
            span: Span::new(self.file, self.base + end, self.base + end + 1),
            pos: self.position(self.chars.len()),
        });
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).map(|&(_, c)| c)
    }

    /// Byte offset (inside the line) of the character at index `idx`.
    fn byte_at(&self, idx: usize) -> usize {
        self.chars.get(idx).map_or(self.text.len(), |&(b, _)| b)
    }

    fn position(&self, idx: usize) -> Position {
        Position::new(self.number, idx as u32 + 1, self.base + self.byte_at(idx) as u32)
    }

    fn span(&self, start: usize, end: usize) -> Span {
        Span::new(
            self.file,
            self.base + self.byte_at(start) as u32,
            self.base + self.byte_at(end) as u32,
        )
    }

    /// Push a token covering characters `start..end`.
    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        let text = self.text[self.byte_at(start)..self.byte_at(end)].to_string();
        let span = self.span(start, end);
        let pos = self.position(start);
        self.tokens.push(Token { kind, text, span, pos });
    }

    fn single(&mut self, kind: TokenKind) {
        self.push(kind, self.pos, self.pos + 1);
        self.pos += 1;
    }

    fn report(&mut self, kind: DiagnosticKind, message: String, start: usize, end: usize) -> &mut Diagnostic {
        self.has_errors = true;
        let diagnostic = Diagnostic::new(kind, message, self.span(start, end), self.position(start));
        self.diagnostics.push(diagnostic);
        let last = self.diagnostics.len() - 1;
        &mut self.diagnostics[last]
    }

    /// Advance past `[A-Za-z0-9_]*` and return the index after the run.
    fn take_word_chars(&mut self) -> usize {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        self.pos
    }

    /// Lex a string literal. Returns `false` when the rest of the line was
    /// consumed by an unterminated string.
    fn lex_string(&mut self, later_quote: bool) -> bool {
        let start = self.pos;
        let close = self.chars[start + 1..]
            .iter()
            .position(|&(_, c)| c == '"')
            .map(|i| start + 1 + i);

        if let Some(close) = close {
            let content = self.text[self.byte_at(start + 1)..self.byte_at(close)].to_string();
            self.push(TokenKind::Str(content), start, close + 1);
            self.pos = close + 1;
            return true;
        }

        let end = self.chars.len();
        if later_quote {
            self.report(
                DiagnosticKind::UnterminatedString,
                "string literal is not closed on this line".to_string(),
                start,
                end,
            )
            .suggestion = Some("strings cannot span lines or contain `\"`".to_string());
            self.push(TokenKind::Error, start, end);
        } else {
            self.report(
                DiagnosticKind::UnterminatedString,
                "string literal is never closed".to_string(),
                start,
                end,
            );
            self.halted = true;
            tracing::debug!(line = self.number, "unterminated string reaches end of input");
        }
        self.pos = end;
        false
    }

    fn lex_percent(&mut self) {
        let start = self.pos;
        if self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
            let end = self.take_word_chars();
            let name = self.text[self.byte_at(start + 1)..self.byte_at(end)].to_string();
            self.push(TokenKind::MacroArg(name), start, end);
        } else {
            self.single(TokenKind::Operator(Operator::Mod));
        }
    }

    fn lex_shift(&mut self, c: char) {
        if self.peek_at(1) == Some(c) {
            let op = if c == '<' { Operator::Shl } else { Operator::Shr };
            self.push(TokenKind::Operator(op), self.pos, self.pos + 2);
            self.pos += 2;
        } else {
            let start = self.pos;
            self.report(
                DiagnosticKind::UnexpectedCharacter,
                format!("unexpected character `{c}`"),
                start,
                start + 1,
            )
            .suggestion = Some(format!("the shift operator is written `{c}{c}`"));
            self.push(TokenKind::Error, start, start + 1);
            self.pos += 1;
        }
    }

    fn lex_number(&mut self) {
        let start = self.pos;
        let end = self.take_word_chars();
        let src = self.text;
        let text = &src[self.byte_at(start)..self.byte_at(end)];
        match Number::parse(text) {
            Some(number) => self.push(TokenKind::Number(number), start, end),
            None => {
                let message = format!("malformed number `{text}`");
                self.report(DiagnosticKind::MalformedNumber, message, start, end)
                    .suggestion = Some("numbers are decimal digits, `0x` + hex digits, or `0b` + binary digits".to_string());
                self.push(TokenKind::Error, start, end);
            }
        }
    }

    fn lex_word(&mut self) {
        let start = self.pos;
        let end = self.take_word_chars();
        let src = self.text;
        let word = &src[self.byte_at(start)..self.byte_at(end)];

        let kind = if let Some(m) = Mnemonic::from_word(word) {
            TokenKind::Mnemonic(m)
        } else if let Some(r) = Register::from_word(word) {
            TokenKind::Register(r)
        } else if let Some(d) = Directive::from_word(word) {
            TokenKind::Directive(d)
        } else {
            TokenKind::Identifier(word.to_string())
        };
        self.push(kind, start, end);
    }

    fn unexpected(&mut self, c: char) {
        let start = self.pos;
        self.report(
            DiagnosticKind::UnexpectedCharacter,
            format!("unexpected character `{}`", c.escape_default()),
            start,
            start + 1,
        );
        self.push(TokenKind::Error, start, start + 1);
        self.pos += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
