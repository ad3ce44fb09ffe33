use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use decaf_compiler::ast::{Ast, Literal, NodeId, NodeKind};
use decaf_compiler::DEFAULT_PHYSICAL_REGS;

/// Decaf compiler: parses, analyzes, and lowers a source file to an
/// ILOC instruction listing on stdout.
#[derive(Parser)]
#[command(name = "decafc", version, about)]
struct Args {
    /// Source file to compile
    file: PathBuf,

    /// Dump the token stream and stop
    #[arg(long)]
    tokens: bool,

    /// Dump the parsed AST and stop
    #[arg(long)]
    ast: bool,

    /// Emit virtual-register ILOC, skipping register allocation
    #[arg(long, conflicts_with = "allocated")]
    iloc: bool,

    /// Emit physical-register ILOC (the default output)
    #[arg(long)]
    allocated: bool,

    /// Physical register count for allocation
    #[arg(long, default_value_t = DEFAULT_PHYSICAL_REGS)]
    registers: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let source = fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;

    if args.tokens {
        let mut tokens = decaf_compiler::frontend::lex(&source)?;
        while let Some(token) = tokens.next() {
            println!("{:<8} {:?} (line {})", token.kind.to_string(), token.text, token.line);
        }
        return Ok(());
    }

    if args.ast {
        let tree = decaf_compiler::parse_source(&source)?;
        print!("{}", dump_ast(&tree));
        return Ok(());
    }

    let code = if args.iloc && !args.allocated {
        decaf_compiler::compile_to_virtual_iloc(&source)?
    } else {
        decaf_compiler::compile(&source, args.registers)?
    };
    print!("{}", decaf_compiler::emit_text(&code));
    Ok(())
}

fn dump_ast(tree: &Ast) -> String {
    let mut out = String::new();
    dump_node(tree, tree.root(), 0, &mut out);
    out
}

fn dump_node(tree: &Ast, id: NodeId, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    let line = tree.line(id);
    let label = match tree.kind(id) {
        NodeKind::Program { .. } => "Program".to_string(),
        NodeKind::VarDecl {
            name,
            ty,
            is_array,
            array_length,
        } => {
            if *is_array {
                format!("VarDecl {name}: {ty}[{array_length}]")
            } else {
                format!("VarDecl {name}: {ty}")
            }
        }
        NodeKind::FuncDecl {
            name,
            return_type,
            params,
            ..
        } => {
            let params: Vec<String> = params
                .iter()
                .map(|p| format!("{}: {}", p.name, p.ty))
                .collect();
            format!("FuncDecl {name}({}) -> {return_type}", params.join(", "))
        }
        NodeKind::Block { .. } => "Block".to_string(),
        NodeKind::Conditional { .. } => "If".to_string(),
        NodeKind::WhileLoop { .. } => "While".to_string(),
        NodeKind::Return { .. } => "Return".to_string(),
        NodeKind::Break => "Break".to_string(),
        NodeKind::Continue => "Continue".to_string(),
        NodeKind::Assignment { .. } => "Assign".to_string(),
        NodeKind::Location { name, .. } => format!("Location {name}"),
        NodeKind::FuncCall { name, .. } => format!("Call {name}"),
        NodeKind::BinaryOp { op, .. } => format!("BinaryOp {op}"),
        NodeKind::UnaryOp { op, .. } => format!("UnaryOp {op:?}"),
        NodeKind::Literal(Literal::Int(v)) => format!("Literal {v}"),
        NodeKind::Literal(Literal::Bool(b)) => format!("Literal {b}"),
        NodeKind::Literal(Literal::Str(s)) => format!("Literal {s:?}"),
    };
    let _ = writeln!(out, "{pad}{label} [line {line}]");
    for child in tree.kind(id).children() {
        dump_node(tree, child, depth + 1, out);
    }
}
