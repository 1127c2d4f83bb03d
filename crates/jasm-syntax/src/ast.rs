//! JASM abstract syntax tree.
//!
//! A JASM file is a sequence of physical lines, each parsed into exactly one
//! [`LineKind`]. A macro definition is the one node that spans several
//! physical lines (header, body, `END MACRO`).
//!
//! Positions live on [`Line`] only. Everything below a line is position-free,
//! so two trees with the same `LineKind`s compare equal however the source
//! was laid out.
//!
//! Every node implements `Display`, printing canonical JASM that parses back
//! to the same tree.

use std::fmt;

use jasm_lang_core::{AstNode, Span};
use serde::{Deserialize, Serialize};

use crate::token::{Mnemonic, Number, Operator, Register};

/// A parsed JASM file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceFile {
    /// Lines in program order.
    pub lines: Vec<Line>,
    pub span: Span,
}

impl SourceFile {
    pub fn new(lines: Vec<Line>) -> Self {
        let span = match (lines.first(), lines.last()) {
            (Some(first), Some(last)) => first.span.extend(last.span),
            _ => Span::default(),
        };
        Self { lines, span }
    }

    /// The line kinds, without positions.
    pub fn kinds(&self) -> impl Iterator<Item = &LineKind> {
        self.lines.iter().map(|l| &l.kind)
    }

    /// All label names, in order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.kinds().filter_map(|k| match k {
            LineKind::Label(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// All macro definitions, in order.
    pub fn macro_defs(&self) -> impl Iterator<Item = &MacroDef> {
        self.kinds().filter_map(|k| match k {
            LineKind::MacroDef(def) => Some(def),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl AstNode for SourceFile {
    fn span(&self) -> Span {
        self.span
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// One parsed line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub kind: LineKind,
    /// Source line where this line begins (1-based).
    pub line: u32,
    /// For a macro definition, the span runs from `MACRO` through `END MACRO`.
    pub span: Span,
}

impl AstNode for Line {
    fn span(&self) -> Span {
        self.span
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

/// The six line forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineKind {
    /// Blank or comment-only line.
    Empty,
    /// Label definition: `name:`
    Label(String),
    /// `MNEMONIC [operand, ...]`
    Instruction(Instruction),
    /// `MACRO name %p, ...` / body / `END MACRO`
    MacroDef(MacroDef),
    /// `name [operand, ...]`
    MacroCall(MacroCall),
    /// `DATA constant, ...`
    Data(Vec<Constant>),
}

impl LineKind {
    /// Short name of the line form, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            LineKind::Empty => "empty",
            LineKind::Label(_) => "label",
            LineKind::Instruction(_) => "instruction",
            LineKind::MacroDef(_) => "macro definition",
            LineKind::MacroCall(_) => "macro call",
            LineKind::Data(_) => "data",
        }
    }
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineKind::Empty => Ok(()),
            LineKind::Label(name) => write!(f, "{name}:"),
            LineKind::Instruction(instr) => instr.fmt(f),
            LineKind::MacroDef(def) => def.fmt(f),
            LineKind::MacroCall(call) => call.fmt(f),
            LineKind::Data(constants) => write_data(f, constants),
        }
    }
}

/// A machine instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub mnemonic: Mnemonic,
    pub operands: Vec<Operand>,
}

impl Instruction {
    pub fn new(mnemonic: Mnemonic, operands: Vec<Operand>) -> Self {
        Self { mnemonic, operands }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic.as_str())?;
        write_operands(f, &self.operands)
    }
}

/// A macro definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroDef {
    pub name: String,
    /// Parameter names without the leading `%`. Never empty.
    pub params: Vec<String>,
    pub body: Vec<MacroBodyLine>,
}

impl MacroDef {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for MacroDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MACRO {}", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}%{param}")?;
        }
        writeln!(f)?;
        for line in &self.body {
            writeln!(f, "{line}")?;
        }
        f.write_str("END MACRO")
    }
}

/// A line inside a macro body. Labels, macro calls and nested definitions
/// are not allowed there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacroBodyLine {
    Empty,
    Instruction(Instruction),
    Data(Vec<Constant>),
}

impl fmt::Display for MacroBodyLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroBodyLine::Empty => Ok(()),
            MacroBodyLine::Instruction(instr) => instr.fmt(f),
            MacroBodyLine::Data(constants) => write_data(f, constants),
        }
    }
}

/// A call to a macro. The name need not be defined anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroCall {
    pub name: String,
    pub operands: Vec<Operand>,
}

impl fmt::Display for MacroCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        write_operands(f, &self.operands)
    }
}

/// An instruction or macro-call operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// `A:B`
    RegisterPair(Register, Register),
    Register(Register),
    Number(Number),
    /// A label name used as a value.
    LabelRef(String),
    /// `%name`, without the `%`.
    MacroArg(String),
    Expression(Expression),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::RegisterPair(hi, lo) => write!(f, "{hi}:{lo}"),
            Operand::Register(r) => r.fmt(f),
            Operand::Number(n) => n.fmt(f),
            Operand::LabelRef(name) => f.write_str(name),
            Operand::MacroArg(name) => write!(f, "%{name}"),
            Operand::Expression(expr) => expr.fmt(f),
        }
    }
}

/// A parenthesised expression, kept as a flat left-to-right chain.
///
/// `(1 + 2 * 3)` is `first = 1, rest = [(+, 2), (*, 3)]`. No precedence is
/// applied; evaluation order is left to a later pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expression {
    /// Optional leading (unary) operator, as in `(-1)` or `(~%mask)`.
    pub prefix: Option<Operator>,
    pub first: Term,
    pub rest: Vec<(Operator, Term)>,
}

impl Expression {
    pub fn new(first: Term) -> Self {
        Self {
            prefix: None,
            first,
            rest: Vec::new(),
        }
    }

    pub fn with_prefix(mut self, op: Operator) -> Self {
        self.prefix = Some(op);
        self
    }

    pub fn then(mut self, op: Operator, term: Term) -> Self {
        self.rest.push((op, term));
        self
    }

    /// Terms in source order.
    pub fn terms(&self) -> impl Iterator<Item = &Term> {
        std::iter::once(&self.first).chain(self.rest.iter().map(|(_, t)| t))
    }

    /// Binary operators in source order.
    pub fn operators(&self) -> impl Iterator<Item = Operator> + '_ {
        self.rest.iter().map(|(op, _)| *op)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        if let Some(op) = self.prefix {
            op.fmt(f)?;
        }
        self.first.fmt(f)?;
        for (op, term) in &self.rest {
            write!(f, " {op} {term}")?;
        }
        f.write_str(")")
    }
}

/// An expression term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Term {
    Number(Number),
    MacroArg(String),
    /// A nested `( ... )`.
    Group(Box<Expression>),
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Number(n) => n.fmt(f),
            Term::MacroArg(name) => write!(f, "%{name}"),
            Term::Group(expr) => expr.fmt(f),
        }
    }
}

/// A `DATA` constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constant {
    Number(Number),
    /// String contents, without quotes.
    Str(String),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Number(n) => n.fmt(f),
            Constant::Str(s) => write!(f, "\"{s}\""),
        }
    }
}

fn write_operands(f: &mut fmt::Formatter<'_>, operands: &[Operand]) -> fmt::Result {
    for (i, op) in operands.iter().enumerate() {
        let sep = if i == 0 { " " } else { ", " };
        write!(f, "{sep}{op}")?;
    }
    Ok(())
}

fn write_data(f: &mut fmt::Formatter<'_>, constants: &[Constant]) -> fmt::Result {
    f.write_str("DATA")?;
    for (i, c) in constants.iter().enumerate() {
        let sep = if i == 0 { " " } else { ", " };
        write!(f, "{sep}{c}")?;
    }
    Ok(())
}
