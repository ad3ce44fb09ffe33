//! Parser structure tests: declarations, statement dispatch, and
//! precedence-climbing expression shapes.

use decaf_compiler::ast::{Ast, BinaryOp, Literal, NodeId, NodeKind, Type, UnaryOp};
use decaf_compiler::{parse_source, CompileError};

fn parse(source: &str) -> Ast {
    parse_source(source).unwrap()
}

/// The single statement of `main`'s body in `tree`.
fn main_statement(tree: &Ast) -> NodeId {
    let NodeKind::Program { functions, .. } = tree.kind(tree.root()) else {
        panic!("root is not a program");
    };
    let NodeKind::FuncDecl { body, .. } = tree.kind(functions[0]) else {
        panic!("expected a function declaration");
    };
    let NodeKind::Block { statements, .. } = tree.kind(*body) else {
        panic!("expected a block body");
    };
    assert_eq!(statements.len(), 1);
    statements[0]
}

/// The expression returned by `main` in `tree`.
fn returned_expr(tree: &Ast) -> NodeId {
    let NodeKind::Return { value } = tree.kind(main_statement(tree)) else {
        panic!("expected a return statement");
    };
    value.unwrap()
}

#[test]
fn global_and_function_structure() {
    let tree = parse("int x; def int main() { return x; }");

    let NodeKind::Program {
        variables,
        functions,
    } = tree.kind(tree.root())
    else {
        panic!("root is not a program");
    };
    assert_eq!(variables.len(), 1);
    assert_eq!(functions.len(), 1);

    let NodeKind::VarDecl {
        name,
        ty,
        is_array,
        ..
    } = tree.kind(variables[0])
    else {
        panic!("expected a variable declaration");
    };
    assert_eq!(name, "x");
    assert_eq!(*ty, Type::Int);
    assert!(!*is_array);

    let NodeKind::FuncDecl {
        name,
        return_type,
        params,
        ..
    } = tree.kind(functions[0])
    else {
        panic!("expected a function declaration");
    };
    assert_eq!(name, "main");
    assert_eq!(*return_type, Type::Int);
    assert!(params.is_empty());

    let NodeKind::Location { name, index } = tree.kind(returned_expr(&tree)) else {
        panic!("expected a location");
    };
    assert_eq!(name, "x");
    assert!(index.is_none());
}

#[test]
fn missing_close_brace_is_end_of_input_error() {
    let err = parse_source("def int main() { return 0; ").unwrap_err();
    match err {
        CompileError::Parse {
            expected, found, ..
        } => {
            assert_eq!(expected, "'}'");
            assert_eq!(found, "end of input");
        }
        other => panic!("expected a parse error, got {other}"),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let tree = parse("def int main() { return 1 + 2 * 3; }");
    let NodeKind::BinaryOp { op, right, .. } = tree.kind(returned_expr(&tree)) else {
        panic!("expected a binary operator");
    };
    assert_eq!(*op, BinaryOp::Add);
    let NodeKind::BinaryOp { op, .. } = tree.kind(*right) else {
        panic!("expected a nested binary operator");
    };
    assert_eq!(*op, BinaryOp::Mul);
}

#[test]
fn same_level_operators_associate_left() {
    let tree = parse("def int main() { return 10 - 4 - 3; }");
    let NodeKind::BinaryOp { op, left, right } = tree.kind(returned_expr(&tree)) else {
        panic!("expected a binary operator");
    };
    assert_eq!(*op, BinaryOp::Sub);
    assert!(matches!(tree.kind(*left), NodeKind::BinaryOp { op: BinaryOp::Sub, .. }));
    assert!(matches!(
        tree.kind(*right),
        NodeKind::Literal(Literal::Int(3))
    ));
}

#[test]
fn parentheses_reset_precedence() {
    let tree = parse("def int main() { return (1 + 2) * 3; }");
    let NodeKind::BinaryOp { op, left, .. } = tree.kind(returned_expr(&tree)) else {
        panic!("expected a binary operator");
    };
    assert_eq!(*op, BinaryOp::Mul);
    assert!(matches!(tree.kind(*left), NodeKind::BinaryOp { op: BinaryOp::Add, .. }));
}

#[test]
fn unary_binds_tighter_than_binary() {
    let tree = parse("def int main() { int x; return -x + 1; }");
    let NodeKind::Program { functions, .. } = tree.kind(tree.root()) else {
        panic!("root is not a program");
    };
    let NodeKind::FuncDecl { body, .. } = tree.kind(functions[0]) else {
        panic!("expected a function declaration");
    };
    let NodeKind::Block { statements, .. } = tree.kind(*body) else {
        panic!("expected a block body");
    };
    let NodeKind::Return { value } = tree.kind(statements[0]) else {
        panic!("expected a return statement");
    };
    let NodeKind::BinaryOp { op, left, .. } = tree.kind(value.unwrap()) else {
        panic!("expected a binary operator");
    };
    assert_eq!(*op, BinaryOp::Add);
    assert!(matches!(
        tree.kind(*left),
        NodeKind::UnaryOp { op: UnaryOp::Neg, .. }
    ));
}

#[test]
fn array_declaration_carries_length() {
    let tree = parse("int a[10]; def int main() { return a[3]; }");
    let NodeKind::Program { variables, .. } = tree.kind(tree.root()) else {
        panic!("root is not a program");
    };
    let NodeKind::VarDecl {
        is_array,
        array_length,
        ..
    } = tree.kind(variables[0])
    else {
        panic!("expected a variable declaration");
    };
    assert!(*is_array);
    assert_eq!(*array_length, 10);

    let NodeKind::Location { index, .. } = tree.kind(returned_expr(&tree)) else {
        panic!("expected a location");
    };
    assert!(index.is_some());
}

#[test]
fn hex_literals_parse_to_their_value() {
    let tree = parse("def int main() { return 0x1F; }");
    assert!(matches!(
        tree.kind(returned_expr(&tree)),
        NodeKind::Literal(Literal::Int(31))
    ));
}

#[test]
fn string_escapes_unescape_known_and_preserve_unknown() {
    let tree = parse(r#"def void main() { print_str("a\n\q\\"); }"#);
    let NodeKind::FuncCall { name, args } = tree.kind(main_statement(&tree)) else {
        panic!("expected a call statement");
    };
    assert_eq!(name, "print_str");
    let NodeKind::Literal(Literal::Str(s)) = tree.kind(args[0]) else {
        panic!("expected a string literal");
    };
    assert_eq!(s, "a\n\\q\\");
}

#[test]
fn multi_char_symbols_lex_greedily() {
    let tree = parse("def bool main() { int a; return a <= 1; }");
    let NodeKind::Program { functions, .. } = tree.kind(tree.root()) else {
        panic!("root is not a program");
    };
    let NodeKind::FuncDecl { body, .. } = tree.kind(functions[0]) else {
        panic!("expected a function declaration");
    };
    let NodeKind::Block { statements, .. } = tree.kind(*body) else {
        panic!("expected a block body");
    };
    let NodeKind::Return { value } = tree.kind(statements[0]) else {
        panic!("expected a return statement");
    };
    assert!(matches!(
        tree.kind(value.unwrap()),
        NodeKind::BinaryOp { op: BinaryOp::Le, .. }
    ));
}

#[test]
fn reserved_words_are_fatal_lexical_errors() {
    let err = parse_source("def int main() { class x; }").unwrap_err();
    assert!(matches!(err, CompileError::Lexical { .. }));
}

#[test]
fn parse_error_reports_line_number() {
    let err = parse_source("def int main()\n{ return 0 }").unwrap_err();
    match err {
        CompileError::Parse { line, .. } => assert_eq!(line, 2),
        other => panic!("expected a parse error, got {other}"),
    }
}
