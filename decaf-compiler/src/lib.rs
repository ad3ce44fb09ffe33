//! Decaf compiler pipeline.
//!
//! Four strictly sequential phases over one shared AST:
//!
//! 1. [`frontend::parser`] — recursive-descent parsing of the token stream.
//! 2. [`analysis`] — symbol resolution, type inference, and accumulated
//!    semantic diagnostics.
//! 3. [`codegen`] — lowering to a virtual-register ILOC instruction list.
//! 4. [`regalloc`] — linear-scan mapping of virtual registers onto a fixed
//!    physical register set, with spills.
//!
//! Parsing is fail-fast; analysis accumulates every diagnostic and the
//! *driver* here refuses to run codegen on a non-empty list. Codegen and
//! allocation assume a validated AST and report only pipeline contract
//! violations, as [`CompileError::Internal`].

pub mod analysis;
pub mod ast;
pub mod codegen;
pub mod frontend;
pub mod iloc;
pub mod regalloc;

use std::fmt;
use thiserror::Error;

/// Default physical register count used by [`compile`]'s callers.
pub const DEFAULT_PHYSICAL_REGS: usize = 4;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Lexical error on line {line}: {message}")]
    Lexical { line: usize, message: String },

    #[error("Parse error on line {line}: expected {expected} but found '{found}'")]
    Parse {
        expected: String,
        found: String,
        line: usize,
    },

    #[error("Semantic analysis failed:\n{0}")]
    Semantic(DiagnosticList),

    #[error("internal compiler error: {0}")]
    Internal(String),
}

/// A reported semantic error: message plus 1-indexed source line.
/// Accumulated in order, never thrown as control flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub line: usize,
}

impl Diagnostic {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on line {}", self.message, self.line)
    }
}

/// Ordered list of diagnostics from one analysis pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticList(pub Vec<Diagnostic>);

impl fmt::Display for DiagnosticList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in &self.0 {
            writeln!(f, "  {d}")?;
        }
        Ok(())
    }
}

/// Lex and parse source text into an AST. The token queue is fully drained
/// on success.
pub fn parse_source(source: &str) -> Result<ast::Ast, CompileError> {
    let tokens = frontend::lex(source)?;
    frontend::parse(tokens)
}

/// Parse and analyze, returning the annotated AST, symbol tables, and the
/// full (possibly empty) diagnostic list.
pub fn analyze_source(
    source: &str,
) -> Result<(ast::Ast, analysis::SymbolTables, DiagnosticList), CompileError> {
    let mut tree = parse_source(source)?;
    let (symbols, diagnostics) = analysis::analyze(&mut tree);
    Ok((tree, symbols, DiagnosticList(diagnostics)))
}

/// Compile to the virtual-register ILOC list (no register allocation).
pub fn compile_to_virtual_iloc(source: &str) -> Result<Vec<iloc::Insn>, CompileError> {
    let (tree, symbols, diagnostics) = analyze_source(source)?;
    if !diagnostics.0.is_empty() {
        return Err(CompileError::Semantic(diagnostics));
    }
    Ok(codegen::generate(&tree, &symbols))
}

/// Full pipeline: source text to a physical-register ILOC instruction list.
pub fn compile(source: &str, num_physical_regs: usize) -> Result<Vec<iloc::Insn>, CompileError> {
    let mut code = compile_to_virtual_iloc(source)?;
    regalloc::allocate_registers(&mut code, num_physical_regs)?;
    Ok(code)
}

/// Render an instruction list as text, one instruction per line.
pub fn emit_text(code: &[iloc::Insn]) -> String {
    let mut out = String::new();
    for insn in code {
        out.push_str(&insn.to_string());
        out.push('\n');
    }
    out
}
