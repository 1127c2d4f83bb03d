//! JASM parser: builds a [`SourceFile`] from scanned lines.
//!
//! Each physical line is dispatched on its first tokens, in a fixed order:
//!
//! 1. only a newline → empty line
//! 2. `MACRO` → macro definition (header, restricted body, `END MACRO`)
//! 3. `DATA` → constant list
//! 4. a mnemonic → instruction (mnemonics win over labels and calls)
//! 5. identifier followed by `:` → label
//! 6. any other identifier → macro call, known or not
//! 7. anything else → unrecognized line
//!
//! Problems confined to one line are reported and the line is dropped; the
//! parse resumes on the next line. End of input inside a macro definition
//! stops the parse, and so does a structural scanner error. Either way the
//! lines parsed so far and every diagnostic are returned.

use std::collections::BTreeMap;

use jasm_lang_core::Parse;

use crate::ast::*;
use crate::config::ParserConfig;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::macro_scope::MacroScope;
use crate::scanner::{ScannedLine, Scanner};
use crate::token::{Directive, Token, TokenKind};

/// Everything a parse call produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutput {
    pub file: SourceFile,
    /// Scanner and parser diagnostics, in source order.
    pub diagnostics: Vec<Diagnostic>,
    /// Macros defined in the file: name → parameter count.
    pub macros: BTreeMap<String, usize>,
}

impl ParseOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }
}

/// File-level parser state for one parse call.
pub struct Parser {
    config: ParserConfig,
    lines: std::vec::IntoIter<ScannedLine>,
    scope: MacroScope,
    diagnostics: Vec<Diagnostic>,
    /// The scanner stopped early and already said why.
    scan_halted: bool,
    /// A structural parse error stopped the parse.
    halted: bool,
}

impl Parser {
    /// Scan `source` and prepare to parse it.
    pub fn new(source: &str, config: &ParserConfig) -> Self {
        let scanned = Scanner::new(config).scan(source);
        tracing::debug!(
            lines = scanned.lines.len(),
            scan_halted = scanned.halted,
            "parsing JASM source"
        );
        Self {
            config: config.clone(),
            lines: scanned.lines.into_iter(),
            scope: MacroScope::new(),
            diagnostics: scanned.diagnostics,
            scan_halted: scanned.halted,
            halted: false,
        }
    }

    /// Parse the whole file.
    pub fn finish(mut self) -> ParseOutput {
        let file = self.parse_file();
        ParseOutput {
            file,
            diagnostics: self.diagnostics,
            macros: self.scope.into_table(),
        }
    }

    fn parse_file(&mut self) -> SourceFile {
        let mut lines = Vec::new();
        while !self.halted {
            let Some(scanned) = self.lines.next() else {
                break;
            };
            if let Some(line) = self.parse_line(scanned) {
                lines.push(line);
            }
        }

        // Scanner and parser diagnostics were collected separately.
        self.diagnostics.sort_by_key(|d| d.span.start);

        tracing::debug!(
            lines = lines.len(),
            diagnostics = self.diagnostics.len(),
            macros = self.scope.len(),
            halted = self.halted || self.scan_halted,
            "parsed JASM source"
        );
        SourceFile::new(lines)
    }

    // -----------------------------------------------------------------------
    // Line dispatch
    // -----------------------------------------------------------------------

    fn parse_line(&mut self, scanned: ScannedLine) -> Option<Line> {
        if opens_macro(&scanned) {
            return self.parse_macro(scanned);
        }
        if scanned.has_errors {
            return None;
        }

        let mut cur = LineParser::new(&scanned.tokens);
        let result = match &cur.peek().kind {
            TokenKind::Newline => Ok(LineKind::Empty),
            // `DATA:`, `MACRO:` and `END:` are ordinary labels.
            TokenKind::Identifier(_) | TokenKind::Directive(_)
                if cur.peek_nth(1) == Some(&TokenKind::Colon) =>
            {
                cur.parse_label()
            }
            TokenKind::Directive(Directive::Data) => cur.parse_data().map(LineKind::Data),
            TokenKind::Mnemonic(_) => cur.parse_instruction().map(LineKind::Instruction),
            TokenKind::Directive(Directive::End)
                if cur.peek_nth(1) == Some(&TokenKind::Directive(Directive::Macro)) =>
            {
                Err(cur.error_here(
                    DiagnosticKind::UnrecognizedLine,
                    "`END MACRO` outside of a macro definition",
                ))
            }
            // A lone `END` is only a keyword as part of `END MACRO`.
            TokenKind::Identifier(_) | TokenKind::Directive(Directive::End) => {
                self.parse_macro_call(&mut cur).map(LineKind::MacroCall)
            }
            other => Err(cur.error_here(
                DiagnosticKind::UnrecognizedLine,
                format!("a line cannot start with {}", other.describe()),
            )),
        };

        match result {
            Ok(kind) => {
                tracing::trace!(line = scanned.number, kind = kind.name(), "parsed line");
                Some(Line {
                    kind,
                    line: scanned.number,
                    span: scanned.span(),
                })
            }
            Err(diagnostic) => {
                self.diagnostics.push(diagnostic);
                None
            }
        }
    }

    fn parse_macro_call(&mut self, cur: &mut LineParser<'_>) -> Result<MacroCall, Diagnostic> {
        let name_tok = cur.advance();
        let name = name_tok.text.clone();
        let operands = cur.parse_operand_list()?;
        cur.expect_newline("after the macro call")?;

        if self.config.warn_on_arity_mismatch {
            if let Some(arity) = self.scope.lookup(&name) {
                if arity != operands.len() {
                    let plural = if arity == 1 { "" } else { "s" };
                    let given = operands.len();
                    let verb = if given == 1 { "was" } else { "were" };
                    self.diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::ArityMismatch,
                            format!(
                                "macro `{name}` takes {arity} argument{plural} but {given} {verb} given"
                            ),
                            name_tok.span,
                            name_tok.pos,
                        )
                        .with_suggestion(format!("`{name}` is defined earlier in this file")),
                    );
                }
            }
        }

        Ok(MacroCall { name, operands })
    }

    // -----------------------------------------------------------------------
    // Macro definitions
    // -----------------------------------------------------------------------

    fn parse_macro(&mut self, header: ScannedLine) -> Option<Line> {
        // A header the scanner already rejected still opens a body, which is
        // checked and then dropped.
        let signature = if header.has_errors {
            None
        } else {
            match LineParser::new(&header.tokens).parse_macro_header() {
                Ok(signature) => Some(signature),
                Err(diagnostic) => {
                    self.diagnostics.push(diagnostic);
                    None
                }
            }
        };

        let mut body = Vec::new();
        let end_line = loop {
            let Some(scanned) = self.lines.next() else {
                self.halted = true;
                if !self.scan_halted {
                    let macro_tok = &header.tokens[0];
                    self.diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::UnterminatedMacro,
                            "macro definition is never closed",
                            macro_tok.span,
                            macro_tok.pos,
                        )
                        .with_suggestion("add an `END MACRO` line"),
                    );
                }
                tracing::debug!(line = header.number, "end of input inside macro definition, stopping parse");
                return None;
            };

            if is_end_macro(&scanned) {
                if !scanned.has_errors {
                    let mut cur = LineParser::new(&scanned.tokens);
                    cur.pos = 2;
                    if let Err(diagnostic) = cur.expect_newline("after `END MACRO`") {
                        self.diagnostics.push(diagnostic);
                    }
                }
                break scanned;
            }
            if scanned.has_errors {
                continue;
            }

            match LineParser::new(&scanned.tokens).parse_body_line() {
                Ok(line) => body.push(line),
                Err(diagnostic) => self.diagnostics.push(diagnostic),
            }
        };

        let (name, params) = signature?;
        let previous = self.scope.define(&name, params.len());
        tracing::debug!(
            name = %name,
            arity = params.len(),
            redefined = previous.is_some(),
            "registered macro"
        );

        Some(Line {
            kind: LineKind::MacroDef(MacroDef { name, params, body }),
            line: header.number,
            span: header.span().extend(end_line.span()),
        })
    }
}

impl Parse for Parser {
    type Ast = SourceFile;
    type Error = Diagnostic;

    fn parse(&mut self) -> (Option<SourceFile>, Vec<Diagnostic>) {
        let file = self.parse_file();
        (Some(file), std::mem::take(&mut self.diagnostics))
    }
}

/// A line starting with the `MACRO` keyword (not a `MACRO:` label).
fn opens_macro(line: &ScannedLine) -> bool {
    matches!(
        (line.tokens.first().map(|t| &t.kind), line.tokens.get(1).map(|t| &t.kind)),
        (Some(TokenKind::Directive(Directive::Macro)), next) if next != Some(&TokenKind::Colon)
    )
}

/// A line whose first two tokens are `END MACRO`.
fn is_end_macro(line: &ScannedLine) -> bool {
    matches!(
        (line.tokens.first().map(|t| &t.kind), line.tokens.get(1).map(|t| &t.kind)),
        (
            Some(TokenKind::Directive(Directive::End)),
            Some(TokenKind::Directive(Directive::Macro))
        )
    )
}

// ---------------------------------------------------------------------------
// Single-line parsing
// ---------------------------------------------------------------------------

/// Cursor over the tokens of one line.
///
/// The scanner ends every line with a `Newline` token and the cursor never
/// moves past it, so `peek` always has a token to return.
struct LineParser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> LineParser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &'t Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_nth(&self, n: usize) -> Option<&'t TokenKind> {
        self.tokens.get(self.pos + n).map(|t| &t.kind)
    }

    fn advance(&mut self) -> &'t Token {
        let tok = self.peek();
        if tok.kind != TokenKind::Newline {
            self.pos += 1;
        }
        tok
    }

    fn at_newline(&self) -> bool {
        self.peek().kind == TokenKind::Newline
    }

    fn error_at(tok: &Token, kind: DiagnosticKind, message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(kind, message, tok.span, tok.pos)
    }

    fn error_here(&self, kind: DiagnosticKind, message: impl Into<String>) -> Diagnostic {
        Self::error_at(self.peek(), kind, message)
    }

    /// The line must end here.
    fn expect_newline(&self, context: &str) -> Result<(), Diagnostic> {
        let tok = self.peek();
        match &tok.kind {
            TokenKind::Newline => Ok(()),
            TokenKind::RParen => Err(Self::error_at(tok, DiagnosticKind::UnbalancedExpression, "unmatched `)`")),
            other => Err(Self::error_at(
                tok,
                DiagnosticKind::ExpectedNewline,
                format!("unexpected {} {context}", other.describe()),
            )
            .with_suggestion("each line holds a single label, instruction, macro call or `DATA` list")),
        }
    }

    // -- line forms ---------------------------------------------------------

    fn parse_label(&mut self) -> Result<LineKind, Diagnostic> {
        let name = self.advance().text.clone();
        self.advance(); // ':'
        self.expect_newline("after the label")?;
        Ok(LineKind::Label(name))
    }

    fn parse_instruction(&mut self) -> Result<Instruction, Diagnostic> {
        let mnemonic = match self.advance().kind {
            TokenKind::Mnemonic(m) => m,
            _ => {
                return Err(self.error_here(DiagnosticKind::UnrecognizedLine, "expected an instruction mnemonic"))
            }
        };
        let operands = self.parse_operand_list()?;
        self.expect_newline("after the operand list")?;
        Ok(Instruction { mnemonic, operands })
    }

    fn parse_data(&mut self) -> Result<Vec<Constant>, Diagnostic> {
        self.advance(); // DATA
        if self.at_newline() {
            return Err(self.error_here(
                DiagnosticKind::ExpectedOperand,
                "`DATA` needs at least one constant",
            ));
        }

        let mut constants = Vec::new();
        loop {
            constants.push(self.parse_constant()?);
            if self.peek().kind != TokenKind::Comma {
                break;
            }
            self.advance();
            if self.at_newline() {
                return Err(self
                    .error_here(DiagnosticKind::ExpectedOperand, "expected a constant after `,`")
                    .with_suggestion("remove the trailing `,`"));
            }
        }
        self.expect_newline("after the constant list")?;
        Ok(constants)
    }

    fn parse_constant(&mut self) -> Result<Constant, Diagnostic> {
        let tok = self.peek();
        let constant = match &tok.kind {
            TokenKind::Number(n) => Constant::Number(*n),
            TokenKind::Str(s) => Constant::Str(s.clone()),
            TokenKind::MacroArg(name) => {
                return Err(Self::error_at(
                    tok,
                    DiagnosticKind::ExpectedOperand,
                    format!("macro argument `%{name}` cannot be a `DATA` constant"),
                ))
            }
            other => {
                return Err(Self::error_at(
                    tok,
                    DiagnosticKind::ExpectedOperand,
                    format!("expected a number or string, found {}", other.describe()),
                ))
            }
        };
        self.advance();
        Ok(constant)
    }

    /// `MACRO name %p1, %p2, ...`, returning the name and parameter names.
    fn parse_macro_header(&mut self) -> Result<(String, Vec<String>), Diagnostic> {
        self.advance(); // MACRO

        let tok = self.peek();
        let name = match &tok.kind {
            TokenKind::Identifier(_) | TokenKind::Directive(_) => tok.text.clone(),
            TokenKind::Newline => {
                return Err(Self::error_at(tok, DiagnosticKind::MalformedMacroHeader, "expected a macro name after `MACRO`"))
            }
            other => {
                return Err(Self::error_at(
                    tok,
                    DiagnosticKind::MalformedMacroHeader,
                    format!("expected a macro name, found {}", other.describe()),
                )
                .with_suggestion("macro names cannot be mnemonics or registers"))
            }
        };
        self.advance();

        let mut params = Vec::new();
        loop {
            let tok = self.peek();
            match &tok.kind {
                TokenKind::MacroArg(param) => params.push(param.clone()),
                other => {
                    return Err(Self::error_at(
                        tok,
                        DiagnosticKind::MalformedMacroHeader,
                        format!("expected a `%name` parameter, found {}", other.describe()),
                    )
                    .with_suggestion("a macro takes one or more parameters, as in `MACRO name %a, %b`"))
                }
            }
            self.advance();
            if self.peek().kind != TokenKind::Comma {
                break;
            }
            self.advance();
        }

        let tok = self.peek();
        if tok.kind != TokenKind::Newline {
            return Err(Self::error_at(
                tok,
                DiagnosticKind::MalformedMacroHeader,
                format!("unexpected {} in macro header", tok.kind.describe()),
            )
            .with_suggestion("separate parameters with `,`"));
        }
        Ok((name, params))
    }

    /// A line inside a macro body: empty, instruction or `DATA` only.
    fn parse_body_line(&mut self) -> Result<MacroBodyLine, Diagnostic> {
        let tok = self.peek();
        let restricted = |what: &str| {
            Self::error_at(
                tok,
                DiagnosticKind::RestrictedLineInMacroBody,
                format!("{what} not allowed inside a macro body"),
            )
        };
        match &tok.kind {
            TokenKind::Newline => Ok(MacroBodyLine::Empty),
            TokenKind::Mnemonic(_) => self.parse_instruction().map(MacroBodyLine::Instruction),
            TokenKind::Identifier(_) | TokenKind::Directive(_)
                if self.peek_nth(1) == Some(&TokenKind::Colon) =>
            {
                Err(restricted("labels are"))
            }
            TokenKind::Directive(Directive::Data) => self.parse_data().map(MacroBodyLine::Data),
            TokenKind::Directive(Directive::Macro) => Err(restricted("nested macro definitions are")),
            TokenKind::Identifier(_) | TokenKind::Directive(Directive::End) => {
                Err(restricted("macro calls are"))
            }
            other => Err(Self::error_at(
                tok,
                DiagnosticKind::UnrecognizedLine,
                format!("a line cannot start with {}", other.describe()),
            )),
        }
    }

    // -- operands and expressions -------------------------------------------

    /// Zero or more comma-separated operands, up to (not including) the
    /// end of the line.
    fn parse_operand_list(&mut self) -> Result<Vec<Operand>, Diagnostic> {
        let mut operands = Vec::new();
        if self.at_newline() {
            return Ok(operands);
        }
        loop {
            operands.push(self.parse_operand()?);
            if self.peek().kind != TokenKind::Comma {
                break;
            }
            self.advance();
            if self.at_newline() {
                return Err(self
                    .error_here(DiagnosticKind::ExpectedOperand, "expected an operand after `,`")
                    .with_suggestion("remove the trailing `,`"));
            }
        }
        Ok(operands)
    }

    fn parse_operand(&mut self) -> Result<Operand, Diagnostic> {
        let tok = self.peek();
        let operand = match &tok.kind {
            TokenKind::Register(r) => {
                self.advance();
                if self.peek().kind != TokenKind::Colon {
                    return Ok(Operand::Register(*r));
                }
                self.advance();
                let lo = self.peek();
                match &lo.kind {
                    TokenKind::Register(lo_reg) => Operand::RegisterPair(*r, *lo_reg),
                    other => {
                        return Err(Self::error_at(
                            lo,
                            DiagnosticKind::ExpectedOperand,
                            format!("expected a register after `:`, found {}", other.describe()),
                        ))
                    }
                }
            }
            TokenKind::Number(n) => Operand::Number(*n),
            TokenKind::Identifier(name) => Operand::LabelRef(name.clone()),
            // Line keywords are plain names in operand position.
            TokenKind::Directive(_) => Operand::LabelRef(tok.text.clone()),
            TokenKind::MacroArg(name) => Operand::MacroArg(name.clone()),
            TokenKind::LParen => return self.parse_expression().map(Operand::Expression),
            TokenKind::RParen => {
                return Err(Self::error_at(tok, DiagnosticKind::UnbalancedExpression, "unmatched `)`"))
            }
            other => {
                return Err(Self::error_at(
                    tok,
                    DiagnosticKind::ExpectedOperand,
                    format!("expected an operand, found {}", other.describe()),
                ))
            }
        };
        self.advance();
        Ok(operand)
    }

    /// `(` [operator] term { operator term } `)`, kept flat.
    fn parse_expression(&mut self) -> Result<Expression, Diagnostic> {
        let open = self.advance(); // '('

        let prefix = match self.peek().kind {
            TokenKind::Operator(op) => {
                self.advance();
                Some(op)
            }
            _ => None,
        };
        let first = self.parse_term(open)?;

        let mut rest = Vec::new();
        loop {
            let tok = self.peek();
            match &tok.kind {
                TokenKind::RParen => {
                    self.advance();
                    break;
                }
                TokenKind::Operator(op) => {
                    self.advance();
                    let term = self.parse_term(open)?;
                    rest.push((*op, term));
                }
                TokenKind::Newline => return Err(unclosed(open)),
                other => {
                    return Err(Self::error_at(
                        tok,
                        DiagnosticKind::ExpectedOperand,
                        format!("expected an operator or `)`, found {}", other.describe()),
                    ))
                }
            }
        }

        Ok(Expression { prefix, first, rest })
    }

    fn parse_term(&mut self, open: &Token) -> Result<Term, Diagnostic> {
        let tok = self.peek();
        let term = match &tok.kind {
            TokenKind::Number(n) => Term::Number(*n),
            TokenKind::MacroArg(name) => Term::MacroArg(name.clone()),
            TokenKind::LParen => return self.parse_expression().map(|e| Term::Group(Box::new(e))),
            TokenKind::Newline => return Err(unclosed(open)),
            other => {
                return Err(Self::error_at(
                    tok,
                    DiagnosticKind::ExpectedOperand,
                    format!("expected a number, macro argument or `(`, found {}", other.describe()),
                ))
            }
        };
        self.advance();
        Ok(term)
    }
}

fn unclosed(open: &Token) -> Diagnostic {
    Diagnostic::new(DiagnosticKind::UnbalancedExpression, "unclosed `(`", open.span, open.pos)
    .with_suggestion("add a closing `)` before the end of the line")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use jasm_lang_core::Span;
    use crate::token::{Mnemonic, Number, Operator, Radix, Register};

    fn parse_src(src: &str) -> ParseOutput {
        Parser::new(src, &ParserConfig::default()).finish()
    }

    fn parse_clean(src: &str) -> SourceFile {
        let out = parse_src(src);
        assert!(out.diagnostics.is_empty(), "unexpected diagnostics: {:?}", out.diagnostics);
        out.file
    }

    fn single(src: &str) -> LineKind {
        let file = parse_clean(src);
        assert_eq!(file.lines.len(), 1, "{:?}", file.lines);
        file.lines[0].kind.clone()
    }

    fn diag_kinds(out: &ParseOutput) -> Vec<DiagnosticKind> {
        out.diagnostics.iter().map(|d| d.kind).collect()
    }

    fn num(value: u64) -> Number {
        Number::decimal(value)
    }

    // -- the six line forms -------------------------------------------------

    #[test]
    fn test_parse_empty_and_comment_lines() {
        let file = parse_clean("\n   \n; comment\n");
        assert_eq!(file.lines.len(), 3);
        assert!(file.kinds().all(|k| *k == LineKind::Empty));
    }

    #[test]
    fn test_parse_label() {
        match single("loop_1:\n") {
            LineKind::Label(name) => assert_eq!(name, "loop_1"),
            other => panic!("expected Label, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_instruction() {
        match single("LOAD A, 0x10\n") {
            LineKind::Instruction(instr) => {
                assert_eq!(instr.mnemonic, Mnemonic::Load);
                assert_eq!(
                    instr.operands,
                    vec![
                        Operand::Register(Register::A),
                        Operand::Number(Number::new(16, Radix::Hexadecimal)),
                    ]
                );
            }
            other => panic!("expected Instruction, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_instruction_without_operands() {
        match single("HALT\n") {
            LineKind::Instruction(instr) => {
                assert_eq!(instr.mnemonic, Mnemonic::Halt);
                assert!(instr.operands.is_empty());
            }
            other => panic!("expected Instruction, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_macro_def() {
        let file = parse_clean("MACRO swap %a, %b\nPUSH %a\n\nDATA 1, \"x\"\nEND MACRO\n");
        assert_eq!(file.lines.len(), 1);
        match &file.lines[0].kind {
            LineKind::MacroDef(def) => {
                assert_eq!(def.name, "swap");
                assert_eq!(def.params, vec!["a", "b"]);
                assert_eq!(def.body.len(), 3);
                assert_eq!(def.body[1], MacroBodyLine::Empty);
                match &def.body[2] {
                    MacroBodyLine::Data(c) => assert_eq!(c.len(), 2),
                    other => panic!("expected Data, got {other:?}"),
                }
            }
            other => panic!("expected MacroDef, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_macro_call() {
        match single("FOO A, B\n") {
            LineKind::MacroCall(call) => {
                assert_eq!(call.name, "FOO");
                assert_eq!(
                    call.operands,
                    vec![Operand::Register(Register::A), Operand::Register(Register::B)]
                );
            }
            other => panic!("expected MacroCall, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_macro_call_without_operands() {
        match single("reset\n") {
            LineKind::MacroCall(call) => assert!(call.operands.is_empty()),
            other => panic!("expected MacroCall, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_data() {
        match single("DATA \"hello\", 0, 0b11\n") {
            LineKind::Data(constants) => assert_eq!(
                constants,
                vec![
                    Constant::Str("hello".to_string()),
                    Constant::Number(num(0)),
                    Constant::Number(Number::new(3, Radix::Binary)),
                ]
            ),
            other => panic!("expected Data, got {other:?}"),
        }
    }

    // -- dispatch -----------------------------------------------------------

    #[test]
    fn test_mnemonic_case_insensitive() {
        let a = single("load A, B\n");
        let b = single("LOAD A, B\n");
        let c = single("LoAd a, b\n");
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_mnemonic_wins_over_label() {
        // A mnemonic followed by `:` is an instruction with a bad operand.
        let out = parse_src("NOP:\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::ExpectedOperand]);
    }

    #[test]
    fn test_label_with_trailing_instruction() {
        let out = parse_src("start: NOP\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::ExpectedNewline]);
        assert!(out.file.is_empty());
    }

    #[test]
    fn test_end_macro_outside_macro() {
        let out = parse_src("END MACRO\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::UnrecognizedLine]);
        assert_eq!(out.diagnostics[0].message, "`END MACRO` outside of a macro definition");
    }

    #[test]
    fn test_line_keywords_as_operands() {
        for (src, name) in [("JUMP END\n", "END"), ("LOAD A, DATA\n", "DATA"), ("JUMP MACRO\n", "MACRO")] {
            match single(src) {
                LineKind::Instruction(instr) => {
                    assert_eq!(instr.operands.last(), Some(&Operand::LabelRef(name.to_string())))
                }
                other => panic!("expected Instruction, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_line_keywords_as_labels() {
        let file = parse_clean("END:\nDATA:\nMACRO:\n");
        let labels: Vec<&str> = file.labels().collect();
        assert_eq!(labels, vec!["END", "DATA", "MACRO"]);
    }

    #[test]
    fn test_lone_end_is_macro_call() {
        match single("END A\n") {
            LineKind::MacroCall(call) => {
                assert_eq!(call.name, "END");
                assert_eq!(call.operands, vec![Operand::Register(Register::A)]);
            }
            other => panic!("expected MacroCall, got {other:?}"),
        }
    }

    #[test]
    fn test_line_keywords_inside_macro_body() {
        let out = parse_src("MACRO m %x\nJUMP END\nEND:\nEND %x\nEND MACRO\n");
        assert_eq!(
            diag_kinds(&out),
            vec![
                DiagnosticKind::RestrictedLineInMacroBody,
                DiagnosticKind::RestrictedLineInMacroBody,
            ]
        );
        match &out.file.lines[0].kind {
            LineKind::MacroDef(def) => assert_eq!(def.body.len(), 1),
            other => panic!("expected MacroDef, got {other:?}"),
        }
    }

    #[test]
    fn test_macro_named_like_keyword() {
        let out = parse_src("MACRO DATA %x\nEND MACRO\n");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        assert_eq!(out.macros.get("DATA"), Some(&1));
    }

    #[test]
    fn test_unrecognized_line() {
        let out = parse_src("A, B\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::UnrecognizedLine]);
        assert_eq!(out.diagnostics[0].message, "a line cannot start with register `A`");
    }

    #[test]
    fn test_line_numbers_and_spans() {
        let file = parse_clean("NOP\n\nstart:\n");
        let numbers: Vec<u32> = file.lines.iter().map(|l| l.line).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(file.lines[2].span, Span::main(5, 12));
        assert_eq!(file.span, Span::main(0, 12));
    }

    // -- operands -----------------------------------------------------------

    #[test]
    fn test_register_pair() {
        match single("MOVE MB:SP, x\n") {
            LineKind::Instruction(instr) => assert_eq!(
                instr.operands,
                vec![
                    Operand::RegisterPair(Register::Mb, Register::Sp),
                    Operand::LabelRef("x".to_string()),
                ]
            ),
            other => panic!("expected Instruction, got {other:?}"),
        }
    }

    #[test]
    fn test_register_pair_needs_register() {
        let out = parse_src("MOVE A:5\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::ExpectedOperand]);
        assert_eq!(out.diagnostics[0].column(), 8);
    }

    #[test]
    fn test_trailing_comma() {
        let out = parse_src("LOAD A,\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::ExpectedOperand]);
        assert_eq!(out.diagnostics[0].message, "expected an operand after `,`");
        assert!(out.file.is_empty());
    }

    #[test]
    fn test_missing_comma() {
        let out = parse_src("LOAD A B\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::ExpectedNewline]);
    }

    #[test]
    fn test_operand_cannot_be_mnemonic() {
        let out = parse_src("JUMP nop\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::ExpectedOperand]);
        assert_eq!(out.diagnostics[0].message, "expected an operand, found mnemonic `NOP`");
    }

    #[test]
    fn test_macro_arg_operand() {
        match single("CALLME %x, (%y)\n") {
            LineKind::MacroCall(call) => {
                assert_eq!(call.operands[0], Operand::MacroArg("x".to_string()));
                match &call.operands[1] {
                    Operand::Expression(e) => assert_eq!(e.first, Term::MacroArg("y".to_string())),
                    other => panic!("expected Expression, got {other:?}"),
                }
            }
            other => panic!("expected MacroCall, got {other:?}"),
        }
    }

    // -- expressions --------------------------------------------------------

    fn single_expression(src: &str) -> Expression {
        match single(src) {
            LineKind::Instruction(mut instr) => match instr.operands.pop() {
                Some(Operand::Expression(e)) => e,
                other => panic!("expected Expression, got {other:?}"),
            },
            other => panic!("expected Instruction, got {other:?}"),
        }
    }

    #[test]
    fn test_expression_flat_chain() {
        let e = single_expression("LOAD A, (1 + 2 * 3)\n");
        assert_eq!(e.prefix, None);
        assert_eq!(e.first, Term::Number(num(1)));
        assert_eq!(
            e.rest,
            vec![
                (Operator::Add, Term::Number(num(2))),
                (Operator::Mul, Term::Number(num(3))),
            ]
        );
    }

    #[test]
    fn test_expression_prefix_and_nesting() {
        let e = single_expression("LOAD A, (-(%x << 2) & 0xFF)\n");
        assert_eq!(e.prefix, Some(Operator::Sub));
        match &e.first {
            Term::Group(inner) => {
                assert_eq!(inner.first, Term::MacroArg("x".to_string()));
                assert_eq!(inner.rest, vec![(Operator::Shl, Term::Number(num(2)))]);
            }
            other => panic!("expected Group, got {other:?}"),
        }
        assert_eq!(e.operators().collect::<Vec<_>>(), vec![Operator::And]);
    }

    #[test]
    fn test_expression_modulo_and_not() {
        let e = single_expression("LOAD A, (%a % 4 ~ 1)\n");
        assert_eq!(e.operators().collect::<Vec<_>>(), vec![Operator::Mod, Operator::Not]);
    }

    #[test]
    fn test_unclosed_expression() {
        let out = parse_src("LOAD A, (1 + 2\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::UnbalancedExpression]);
        // Reported at the opening parenthesis.
        assert_eq!(out.diagnostics[0].column(), 9);
    }

    #[test]
    fn test_unmatched_close_paren() {
        let out = parse_src("LOAD A, 1)\nPUSH )\n");
        assert_eq!(
            diag_kinds(&out),
            vec![DiagnosticKind::UnbalancedExpression, DiagnosticKind::UnbalancedExpression]
        );
    }

    #[test]
    fn test_expression_bad_term() {
        let out = parse_src("LOAD A, (B)\nLOAD A, ()\nLOAD A, (1 2)\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::ExpectedOperand; 3]);
    }

    // -- DATA ---------------------------------------------------------------

    #[test]
    fn test_data_needs_constant() {
        let out = parse_src("DATA\nDATA 1,\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::ExpectedOperand; 2]);
    }

    #[test]
    fn test_data_rejects_macro_arg() {
        let out = parse_src("DATA %x\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::ExpectedOperand]);
        assert!(out.diagnostics[0].message.contains("`%x`"));
    }

    // -- macros -------------------------------------------------------------

    #[test]
    fn test_macro_registered() {
        let out = parse_src("MACRO twice %r\nINC %r\nINC %r\nEND MACRO\n");
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.macros.get("twice"), Some(&1));
    }

    #[test]
    fn test_end_macro_whitespace() {
        let out = parse_src("MACRO m %x\nNOP\nEND \t  MACRO   ; done\n");
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.file.macro_defs().count(), 1);
    }

    #[test]
    fn test_end_macro_trailing_tokens() {
        let out = parse_src("MACRO m %x\nNOP\nEND MACRO m\nHALT\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::ExpectedNewline]);
        // The macro still closes and the following line is top-level.
        assert_eq!(out.file.lines.len(), 2);
        assert_eq!(out.macros.get("m"), Some(&1));
    }

    #[test]
    fn test_label_in_macro_body() {
        let out = parse_src("MACRO m %x\ninner:\nNOP\nEND MACRO\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::RestrictedLineInMacroBody]);
        match &out.file.lines[0].kind {
            LineKind::MacroDef(def) => assert_eq!(def.body.len(), 1),
            other => panic!("expected MacroDef, got {other:?}"),
        }
        assert_eq!(out.macros.get("m"), Some(&1));
    }

    #[test]
    fn test_call_and_nested_macro_in_body() {
        let out = parse_src("MACRO m %x\nother %x\nMACRO n %y\nEND MACRO\nHALT\n");
        assert_eq!(
            diag_kinds(&out),
            vec![
                DiagnosticKind::RestrictedLineInMacroBody,
                DiagnosticKind::RestrictedLineInMacroBody,
            ]
        );
        // The first END MACRO closes the outer macro.
        assert_eq!(out.file.lines.len(), 2);
        assert!(!out.macros.contains_key("n"));
    }

    #[test]
    fn test_unterminated_macro() {
        let out = parse_src("MACRO m %x\nLOAD A\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::UnterminatedMacro]);
        assert!(out.macros.is_empty());
        assert!(out.file.is_empty());
        assert_eq!(out.diagnostics[0].line(), 1);
    }

    #[test]
    fn test_unterminated_macro_keeps_earlier_lines() {
        let out = parse_src("NOP\nstart:\nMACRO m %x\nLOAD A\n");
        assert_eq!(out.file.lines.len(), 2);
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::UnterminatedMacro]);
    }

    #[test]
    fn test_macro_header_needs_parameter() {
        let out = parse_src("MACRO m\nNOP\nEND MACRO\nHALT\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::MalformedMacroHeader]);
        // Body consumed, nothing registered, parsing continues after it.
        assert!(out.macros.is_empty());
        assert_eq!(out.file.lines.len(), 1);
        match &out.file.lines[0].kind {
            LineKind::Instruction(i) => assert_eq!(i.mnemonic, Mnemonic::Halt),
            other => panic!("expected Instruction, got {other:?}"),
        }
    }

    #[test]
    fn test_macro_header_bad_name() {
        let out = parse_src("MACRO push %x\nEND MACRO\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::MalformedMacroHeader]);
        assert!(out.diagnostics[0].suggestion.is_some());
    }

    #[test]
    fn test_macro_header_missing_comma() {
        let out = parse_src("MACRO m %a %b\nEND MACRO\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::MalformedMacroHeader]);
    }

    #[test]
    fn test_macro_redefinition_overwrites() {
        let out = parse_src("MACRO m %a\nEND MACRO\nMACRO m %a, %b\nEND MACRO\nm 1, 2\n");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        assert_eq!(out.macros.get("m"), Some(&2));
        assert_eq!(out.file.macro_defs().count(), 2);
    }

    #[test]
    fn test_arity_mismatch_warning() {
        let out = parse_src("MACRO m %a, %b\nEND MACRO\nm 1\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::ArityMismatch]);
        assert!(!out.has_errors());
        assert_eq!(out.warnings().count(), 1);
        assert_eq!(out.diagnostics[0].message, "macro `m` takes 2 arguments but 1 was given");
        // The call is still part of the tree.
        assert!(matches!(out.file.lines[1].kind, LineKind::MacroCall(_)));
    }

    #[test]
    fn test_arity_warning_disabled() {
        let config = ParserConfig::default().with_arity_warnings(false);
        let out = Parser::new("MACRO m %a\nEND MACRO\nm\n", &config).finish();
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_call_before_definition_not_checked() {
        let out = parse_src("m\nMACRO m %a\nEND MACRO\n");
        assert!(out.diagnostics.is_empty());
    }

    // -- recovery -----------------------------------------------------------

    #[test]
    fn test_line_local_errors_all_reported() {
        let out = parse_src("LOAD A,\nNOP\nDATA\n: x\nHALT\n");
        assert_eq!(
            diag_kinds(&out),
            vec![
                DiagnosticKind::ExpectedOperand,
                DiagnosticKind::ExpectedOperand,
                DiagnosticKind::UnrecognizedLine,
            ]
        );
        assert_eq!(out.file.lines.len(), 2);
        let lines: Vec<u32> = out.diagnostics.iter().map(|d| d.line()).collect();
        assert_eq!(lines, vec![1, 3, 4]);
    }

    #[test]
    fn test_scanner_errors_not_reported_twice() {
        let out = parse_src("LOAD A, 0x\nNOP\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::MalformedNumber]);
        assert_eq!(out.file.lines.len(), 1);
    }

    #[test]
    fn test_diagnostics_in_source_order() {
        let out = parse_src("LOAD A,\nDATA 0b2\nPUSH )\n");
        let lines: Vec<u32> = out.diagnostics.iter().map(|d| d.line()).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn test_unterminated_final_line_stops() {
        let out = parse_src("NOP\nHALT");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::UnterminatedLine]);
        assert_eq!(out.file.lines.len(), 1);
    }

    #[test]
    fn test_scanner_halt_inside_macro_reports_once() {
        let out = parse_src("MACRO m %x\nDATA \"open\nEND MACRO\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::UnterminatedString]);
        assert!(out.macros.is_empty());
    }

    #[test]
    fn test_poisoned_macro_header_consumes_body() {
        let out = parse_src("MACRO m %x, @\nNOP\nEND MACRO\nHALT\n");
        assert_eq!(diag_kinds(&out), vec![DiagnosticKind::UnexpectedCharacter]);
        assert_eq!(out.file.lines.len(), 1);
        assert!(out.macros.is_empty());
    }

    #[test]
    fn test_parse_trait() {
        let mut parser = Parser::new("NOP\nLOAD A,\n", &ParserConfig::default());
        let (ast, errors) = parser.parse();
        let ast = ast.unwrap();
        assert_eq!(ast.lines.len(), 1);
        assert_eq!(errors.len(), 1);
    }
}
