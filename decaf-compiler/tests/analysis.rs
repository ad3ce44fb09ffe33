//! Semantic analysis tests: diagnostics accumulate in source order, type
//! inference annotates expression nodes, and storage layout is assigned.

use decaf_compiler::analyze_source;
use decaf_compiler::ast::{NodeKind, Type};

fn diagnostics(source: &str) -> Vec<String> {
    let (_, _, list) = analyze_source(source).unwrap();
    list.0.into_iter().map(|d| d.message).collect()
}

fn assert_reports(source: &str, needle: &str) {
    let messages = diagnostics(source);
    assert!(
        messages.iter().any(|m| m.contains(needle)),
        "no diagnostic containing {needle:?} in {messages:?}"
    );
}

#[test]
fn valid_program_has_no_diagnostics() {
    let source = "
        int x;
        def int add(int a, int b) { return a + b; }
        def int main() {
            x = add(1, 2);
            if (x > 0) { print_int(x); }
            return x;
        }
    ";
    assert!(diagnostics(source).is_empty());
}

#[test]
fn break_outside_loop_is_reported() {
    assert_reports(
        "def int main() { break; return 0; }",
        "'break' used outside of a loop",
    );
}

#[test]
fn break_inside_loop_is_fine() {
    let source = "
        def int main() {
            while (true) { break; }
            return 0;
        }
    ";
    assert!(diagnostics(source).is_empty());
}

#[test]
fn continue_outside_loop_is_reported() {
    assert_reports(
        "def int main() { continue; return 0; }",
        "'continue' used outside of a loop",
    );
}

#[test]
fn duplicate_declaration_in_same_scope_is_reported() {
    assert_reports(
        "int x; int x; def int main() { return 0; }",
        "Duplicate declaration of 'x'",
    );
}

#[test]
fn shadowing_across_scopes_is_allowed() {
    let source = "
        int x;
        def int main() {
            int x;
            x = 1;
            return x;
        }
    ";
    assert!(diagnostics(source).is_empty());
}

#[test]
fn assignment_type_mismatch_is_reported() {
    assert_reports(
        "def int main() { int x; x = true; return x; }",
        "cannot assign bool to int",
    );
}

#[test]
fn unary_operand_type_mismatch_is_reported() {
    assert_reports(
        "def int main() { return -true; }",
        "operator '-' requires int, found bool",
    );
    assert_reports(
        "def int main() { if (!1) { } return 0; }",
        "operator '!' requires bool, found int",
    );
}

#[test]
fn undefined_variable_is_reported() {
    assert_reports(
        "def int main() { return y; }",
        "Use of undefined variable 'y'",
    );
}

#[test]
fn condition_must_be_bool() {
    assert_reports(
        "def int main() { if (1 + 2) { } return 0; }",
        "if condition must be bool",
    );
    assert_reports(
        "def int main() { while (3) { } return 0; }",
        "while condition must be bool",
    );
}

#[test]
fn return_type_is_checked_for_operator_expressions() {
    assert_reports(
        "def int main() { return 0; } def bool f() { return 1 + 2; }",
        "returning int from a function declared to return bool",
    );
}

#[test]
fn return_value_in_void_function_is_reported() {
    assert_reports(
        "def int main() { return 0; } def void f() { return 1; }",
        "Cannot return a value from a void function",
    );
}

#[test]
fn missing_return_value_is_reported() {
    assert_reports(
        "def int main() { return; }",
        "Missing return value in function returning int",
    );
}

#[test]
fn call_checks_existence_arity_and_types() {
    assert_reports(
        "def int main() { return g(); }",
        "Call to undefined function 'g'",
    );
    assert_reports(
        "def int f(int a) { return a; } def int main() { return f(); }",
        "expects 1 argument(s) but was given 0",
    );
    assert_reports(
        "def int f(int a) { return a; } def int main() { return f(true); }",
        "argument 1 of 'f': expected int, found bool",
    );
}

#[test]
fn function_and_variable_confusion_is_reported() {
    assert_reports(
        "def int f() { return 0; } def int main() { return f; }",
        "Function 'f' used as a variable",
    );
    assert_reports(
        "int x; def int main() { return x(); }",
        "'x' is not a function",
    );
}

#[test]
fn void_results_cannot_be_compared() {
    assert_reports(
        "def void f() { return; } def int main() { if (f() == f()) { } return 0; }",
        "cannot compare void values",
    );
}

#[test]
fn main_must_exist_with_the_right_signature() {
    assert_reports("int x;", "does not define a 'main' function");
    assert_reports(
        "def int main(int a) { return a; }",
        "'main' must take no parameters",
    );
    assert_reports("def void main() { return; }", "'main' must return int");
}

#[test]
fn variables_cannot_reuse_the_name_main() {
    assert_reports(
        "int main; def int main() { return 0; }",
        "Invalid variable with name 'main'",
    );
    assert_reports(
        "def int main() { int main; return 0; }",
        "Invalid variable with name 'main'",
    );
    assert_reports(
        "def int f(int main) { return main; } def int main() { return f(1); }",
        "Invalid parameter with name 'main'",
    );
}

#[test]
fn array_access_shape_is_checked() {
    assert_reports(
        "int a[4]; def int main() { return a; }",
        "Array 'a' accessed without an index",
    );
    assert_reports(
        "int x; def int main() { return x[0]; }",
        "'x' is not an array",
    );
    assert_reports(
        "int a[4]; def int main() { return a[true]; }",
        "array index must be int, found bool",
    );
}

#[test]
fn local_arrays_and_void_variables_are_reported() {
    assert_reports(
        "def int main() { int a[4]; return 0; }",
        "Array 'a' declared outside global scope",
    );
    assert_reports(
        "void v; def int main() { return 0; }",
        "Variable 'v' declared with type 'void'",
    );
}

#[test]
fn diagnostics_accumulate_in_source_order() {
    let source = "
        def int main() {
            int x;
            x = true;
            break;
            return y;
        }
    ";
    let messages = diagnostics(source);
    assert_eq!(messages.len(), 3);
    assert!(messages[0].contains("cannot assign"));
    assert!(messages[1].contains("'break'"));
    assert!(messages[2].contains("undefined variable 'y'"));
}

#[test]
fn inference_annotates_expression_nodes() {
    let (tree, _, list) = analyze_source("def int main() { return 1 + 2; }").unwrap();
    assert!(list.0.is_empty());

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
    assert_eq!(tree.node(value.unwrap()).inferred_type, Some(Type::Int));
}

#[test]
fn storage_layout_follows_declaration_order() {
    let source = "
        int x;
        int a[4];
        def int f(int p, int q) {
            int l;
            int m;
            return p;
        }
        def int main() { return f(1, 2); }
    ";
    let (tree, symbols, list) = analyze_source(source).unwrap();
    assert!(list.0.is_empty());

    let root = tree.root();
    assert_eq!(symbols.lookup(root, "x").unwrap().offset, 0);
    assert_eq!(symbols.lookup(root, "a").unwrap().offset, 8);
    assert_eq!(symbols.static_bytes(), 40);

    let NodeKind::Program { functions, .. } = tree.kind(root) else {
        panic!("root is not a program");
    };
    let func = functions[0];
    assert_eq!(symbols.lookup(func, "p").unwrap().offset, 16);
    assert_eq!(symbols.lookup(func, "q").unwrap().offset, 24);
    assert_eq!(symbols.local_bytes(func), 16);

    let NodeKind::FuncDecl { body, .. } = tree.kind(func) else {
        panic!("expected a function declaration");
    };
    assert_eq!(symbols.lookup(*body, "l").unwrap().offset, -8);
    assert_eq!(symbols.lookup(*body, "m").unwrap().offset, -16);
}

#[test]
fn diagnostics_carry_line_numbers() {
    let (_, _, list) = analyze_source("def int main() {\n    return y;\n}").unwrap();
    assert_eq!(list.0.len(), 1);
    assert_eq!(list.0[0].line, 2);
}
