//! Semantic analysis: symbol tables, type inference, and diagnostics.
//!
//! Two passes over the AST. The first builds the scope hierarchy and
//! assigns storage offsets; the second resolves every name, infers a type
//! for every expression node, and records a [`Diagnostic`] for each
//! violation. Analysis never aborts early: the full diagnostic list comes
//! back in source order and the pipeline driver decides whether to
//! continue.

pub mod symbols;

pub use symbols::{Storage, Symbol, SymbolKind, SymbolTables};

use crate::ast::{Ast, BinaryOp, Literal, NodeId, NodeKind, Type, UnaryOp};
use crate::iloc::WORD_SIZE;
use crate::Diagnostic;
use symbols::{local_offset, param_offset};

/// Built-in output routines, declared in the program scope before any
/// user symbol.
const BUILTINS: [(&str, Type); 3] = [
    ("print_int", Type::Int),
    ("print_bool", Type::Bool),
    ("print_str", Type::Str),
];

/// Analyze `ast` in place, annotating expression nodes with inferred
/// types. Returns the populated symbol tables and every diagnostic found.
pub fn analyze(ast: &mut Ast) -> (SymbolTables, Vec<Diagnostic>) {
    let mut analyzer = Analyzer {
        ast,
        tables: SymbolTables::new(),
        diagnostics: Vec::new(),
        local_slots: 0,
    };
    analyzer.build_tables();
    analyzer.check_program();
    (analyzer.tables, analyzer.diagnostics)
}

struct Analyzer<'a> {
    ast: &'a mut Ast,
    tables: SymbolTables,
    diagnostics: Vec<Diagnostic>,
    /// Local slots assigned so far in the function being built.
    local_slots: usize,
}

impl Analyzer<'_> {
    fn report(&mut self, line: usize, message: String) {
        self.diagnostics.push(Diagnostic::new(line, message));
    }

    // ---- pass 1: scope construction and storage layout ----

    fn build_tables(&mut self) {
        let root = self.ast.root();
        let NodeKind::Program {
            variables,
            functions,
        } = self.ast.kind(root).clone()
        else {
            return;
        };

        self.tables.create_scope(root, None);
        for (name, arg) in BUILTINS {
            let _ = self
                .tables
                .declare(root, Symbol::function(name, vec![arg], Type::Void));
        }

        let mut static_offset = 0;
        for &var in &variables {
            static_offset = self.build_global(var, root, static_offset);
        }
        self.tables.set_static_bytes(static_offset);

        for &func in &functions {
            self.build_function(func, root);
        }
        self.check_main(root);
    }

    fn build_global(&mut self, var: NodeId, root: NodeId, offset: i64) -> i64 {
        let NodeKind::VarDecl {
            name,
            ty,
            is_array,
            array_length,
        } = self.ast.kind(var).clone()
        else {
            return offset;
        };
        let line = self.ast.line(var);

        if name == "main" {
            self.report(line, "Invalid variable with name 'main'".to_string());
        }
        if ty == Type::Void {
            self.report(line, format!("Variable '{name}' declared with type 'void'"));
        }
        if is_array && array_length == 0 {
            self.report(line, format!("Array '{name}' declared with length zero"));
        }

        let (symbol, size) = if is_array {
            (
                Symbol::array(&name, ty, array_length, offset),
                array_length as i64 * WORD_SIZE,
            )
        } else {
            (
                Symbol::scalar(&name, ty, Storage::Static, offset),
                WORD_SIZE,
            )
        };
        if self.tables.declare(root, symbol).is_err() {
            self.report(line, format!("Duplicate declaration of '{name}'"));
            offset
        } else {
            offset + size
        }
    }

    fn build_function(&mut self, func: NodeId, root: NodeId) {
        let NodeKind::FuncDecl {
            name,
            return_type,
            params,
            body,
        } = self.ast.kind(func).clone()
        else {
            return;
        };
        let line = self.ast.line(func);

        let param_types = params.iter().map(|p| p.ty).collect();
        let symbol = Symbol::function(&name, param_types, return_type);
        if self.tables.declare(root, symbol).is_err() {
            self.report(line, format!("Duplicate declaration of '{name}'"));
        }

        self.tables.create_scope(func, Some(root));
        for (i, param) in params.iter().enumerate() {
            if param.name == "main" {
                self.report(line, "Invalid parameter with name 'main'".to_string());
            }
            if param.ty == Type::Void {
                self.report(
                    line,
                    format!("Parameter '{}' declared with type 'void'", param.name),
                );
            }
            let symbol = Symbol::scalar(&param.name, param.ty, Storage::Param, param_offset(i));
            if self.tables.declare(func, symbol).is_err() {
                self.report(line, format!("Duplicate declaration of '{}'", param.name));
            }
        }

        // Local slots are numbered per function, across all nested blocks,
        // so shadowed locals keep distinct frame offsets.
        self.local_slots = 0;
        self.build_block(body, func);
        self.tables
            .set_local_bytes(func, self.local_slots as i64 * WORD_SIZE);
    }

    fn build_block(&mut self, block: NodeId, parent: NodeId) {
        self.tables.create_scope(block, Some(parent));
        let NodeKind::Block {
            variables,
            statements,
        } = self.ast.kind(block).clone()
        else {
            return;
        };

        for &var in &variables {
            let NodeKind::VarDecl {
                name, ty, is_array, ..
            } = self.ast.kind(var).clone()
            else {
                continue;
            };
            let line = self.ast.line(var);
            if name == "main" {
                self.report(line, "Invalid variable with name 'main'".to_string());
            }
            if ty == Type::Void {
                self.report(line, format!("Variable '{name}' declared with type 'void'"));
            }
            if is_array {
                self.report(line, format!("Array '{name}' declared outside global scope"));
            }
            let symbol = Symbol::scalar(&name, ty, Storage::Local, local_offset(self.local_slots));
            if self.tables.declare(block, symbol).is_err() {
                self.report(line, format!("Duplicate declaration of '{name}'"));
            } else {
                self.local_slots += 1;
            }
        }

        for &stmt in &statements {
            match self.ast.kind(stmt).clone() {
                NodeKind::Conditional {
                    if_block,
                    else_block,
                    ..
                } => {
                    self.build_block(if_block, block);
                    if let Some(else_block) = else_block {
                        self.build_block(else_block, block);
                    }
                }
                NodeKind::WhileLoop { body, .. } => self.build_block(body, block),
                _ => {}
            }
        }
    }

    fn check_main(&mut self, root: NodeId) {
        let line = self.ast.line(root);
        match self.tables.lookup_here(root, "main").cloned() {
            None => self.report(line, "Program does not define a 'main' function".into()),
            Some(sym) => match sym.kind {
                SymbolKind::Function {
                    params,
                    return_type,
                } => {
                    if !params.is_empty() {
                        self.report(line, "'main' must take no parameters".into());
                    }
                    if return_type != Type::Int {
                        self.report(line, "'main' must return int".into());
                    }
                }
                _ => self.report(line, "'main' must be a function".into()),
            },
        }
    }

    // ---- pass 2: name resolution and type checking ----

    fn check_program(&mut self) {
        let root = self.ast.root();
        let NodeKind::Program { functions, .. } = self.ast.kind(root).clone() else {
            return;
        };
        for &func in &functions {
            if let NodeKind::FuncDecl { body, .. } = self.ast.kind(func).clone() {
                self.check_block(body);
            }
        }
    }

    fn check_block(&mut self, block: NodeId) {
        let NodeKind::Block { statements, .. } = self.ast.kind(block).clone() else {
            return;
        };
        for &stmt in &statements {
            self.check_stmt(stmt, block);
        }
    }

    fn check_stmt(&mut self, stmt: NodeId, scope: NodeId) {
        let line = self.ast.line(stmt);
        match self.ast.kind(stmt).clone() {
            NodeKind::Assignment { location, value } => {
                let loc_ty = self.check_expr(location, scope);
                let val_ty = self.check_expr(value, scope);
                if let (Some(loc_ty), Some(val_ty)) = (loc_ty, val_ty) {
                    if loc_ty != val_ty {
                        self.report(
                            line,
                            format!("Type mismatch: cannot assign {val_ty} to {loc_ty} variable"),
                        );
                    }
                }
            }
            NodeKind::Conditional {
                condition,
                if_block,
                else_block,
            } => {
                self.check_condition(condition, scope, "if");
                self.check_block(if_block);
                if let Some(else_block) = else_block {
                    self.check_block(else_block);
                }
            }
            NodeKind::WhileLoop { condition, body } => {
                self.check_condition(condition, scope, "while");
                self.check_block(body);
            }
            NodeKind::Return { value } => self.check_return(stmt, value, scope),
            NodeKind::Break => {
                if self.ast.enclosing_loop(stmt).is_none() {
                    self.report(line, "'break' used outside of a loop".into());
                }
            }
            NodeKind::Continue => {
                if self.ast.enclosing_loop(stmt).is_none() {
                    self.report(line, "'continue' used outside of a loop".into());
                }
            }
            NodeKind::FuncCall { .. } => {
                // Call statement: any return type may be discarded.
                self.check_expr(stmt, scope);
            }
            _ => {}
        }
    }

    fn check_condition(&mut self, condition: NodeId, scope: NodeId, construct: &str) {
        let line = self.ast.line(condition);
        if let Some(ty) = self.check_expr(condition, scope) {
            if ty != Type::Bool {
                self.report(
                    line,
                    format!("Type mismatch: {construct} condition must be bool, found {ty}"),
                );
            }
        }
    }

    fn check_return(&mut self, stmt: NodeId, value: Option<NodeId>, scope: NodeId) {
        let line = self.ast.line(stmt);
        let declared = self
            .ast
            .enclosing_function(stmt)
            .and_then(|f| match self.ast.kind(f) {
                NodeKind::FuncDecl { return_type, .. } => Some(*return_type),
                _ => None,
            });
        let Some(declared) = declared else { return };

        match value {
            None => {
                if declared != Type::Void {
                    self.report(
                        line,
                        format!("Missing return value in function returning {declared}"),
                    );
                }
            }
            Some(value) => {
                let value_ty = self.check_expr(value, scope);
                if declared == Type::Void {
                    self.report(line, "Cannot return a value from a void function".into());
                } else if let Some(value_ty) = value_ty {
                    if value_ty != declared {
                        self.report(
                            line,
                            format!(
                                "Type mismatch: returning {value_ty} from a function declared to return {declared}"
                            ),
                        );
                    }
                }
            }
        }
    }

    /// Type-check one expression subtree. Returns the inferred type (also
    /// written onto the node); `None` when resolution failed, which
    /// suppresses dependent mismatch reports rather than cascading them.
    fn check_expr(&mut self, expr: NodeId, scope: NodeId) -> Option<Type> {
        let line = self.ast.line(expr);
        let inferred = match self.ast.kind(expr).clone() {
            NodeKind::Literal(Literal::Int(_)) => Some(Type::Int),
            NodeKind::Literal(Literal::Bool(_)) => Some(Type::Bool),
            NodeKind::Literal(Literal::Str(_)) => Some(Type::Str),
            NodeKind::Location { name, index } => self.check_location(&name, index, scope, line),
            NodeKind::FuncCall { name, args } => self.check_call(&name, &args, scope, line),
            NodeKind::BinaryOp { op, left, right } => {
                let left_ty = self.check_expr(left, scope);
                let right_ty = self.check_expr(right, scope);
                Some(self.check_binary(op, left_ty, right_ty, line))
            }
            NodeKind::UnaryOp { op, operand } => {
                let operand_ty = self.check_expr(operand, scope);
                let (expected, result) = match op {
                    UnaryOp::Neg => (Type::Int, Type::Int),
                    UnaryOp::Not => (Type::Bool, Type::Bool),
                };
                if let Some(found) = operand_ty {
                    if found != expected {
                        self.report(
                            line,
                            format!(
                                "Type mismatch: operator '{op}' requires {expected}, found {found}"
                            ),
                        );
                    }
                }
                Some(result)
            }
            _ => None,
        };
        self.ast.node_mut(expr).inferred_type = inferred;
        inferred
    }

    fn check_location(
        &mut self,
        name: &str,
        index: Option<NodeId>,
        scope: NodeId,
        line: usize,
    ) -> Option<Type> {
        let Some(symbol) = self.tables.lookup(scope, name).cloned() else {
            self.report(line, format!("Use of undefined variable '{name}'"));
            if let Some(index) = index {
                self.check_expr(index, scope);
            }
            return None;
        };
        if symbol.is_function() {
            self.report(line, format!("Function '{name}' used as a variable"));
            return None;
        }

        match (symbol.is_array(), index) {
            (true, None) => {
                self.report(line, format!("Array '{name}' accessed without an index"));
            }
            (false, Some(index)) => {
                self.report(line, format!("'{name}' is not an array"));
                self.check_expr(index, scope);
            }
            (true, Some(index)) => {
                if let Some(index_ty) = self.check_expr(index, scope) {
                    if index_ty != Type::Int {
                        self.report(
                            line,
                            format!("Type mismatch: array index must be int, found {index_ty}"),
                        );
                    }
                }
            }
            (false, None) => {}
        }
        Some(symbol.ty)
    }

    fn check_call(
        &mut self,
        name: &str,
        args: &[NodeId],
        scope: NodeId,
        line: usize,
    ) -> Option<Type> {
        let arg_types: Vec<Option<Type>> =
            args.iter().map(|&a| self.check_expr(a, scope)).collect();

        let Some(symbol) = self.tables.lookup(scope, name).cloned() else {
            self.report(line, format!("Call to undefined function '{name}'"));
            return None;
        };
        let SymbolKind::Function {
            params,
            return_type,
        } = symbol.kind
        else {
            self.report(line, format!("'{name}' is not a function"));
            return None;
        };

        if params.len() != args.len() {
            self.report(
                line,
                format!(
                    "Function '{name}' expects {} argument(s) but was given {}",
                    params.len(),
                    args.len()
                ),
            );
        } else {
            for (i, (expected, actual)) in params.iter().zip(&arg_types).enumerate() {
                if let Some(actual) = actual {
                    if actual != expected {
                        self.report(
                            line,
                            format!(
                                "Type mismatch in argument {} of '{name}': expected {expected}, found {actual}",
                                i + 1
                            ),
                        );
                    }
                }
            }
        }
        Some(return_type)
    }

    /// Operator typing. The result type is returned even when an operand
    /// is wrong, so inference stays total over well-formed trees.
    fn check_binary(
        &mut self,
        op: BinaryOp,
        left: Option<Type>,
        right: Option<Type>,
        line: usize,
    ) -> Type {
        match op {
            BinaryOp::Or | BinaryOp::And => {
                self.expect_operands(op, Type::Bool, left, right, line);
                Type::Bool
            }
            BinaryOp::Eq | BinaryOp::Neq => {
                if let (Some(left), Some(right)) = (left, right) {
                    if left != right {
                        self.report(
                            line,
                            format!("Type mismatch: cannot compare {left} and {right}"),
                        );
                    } else if left == Type::Void {
                        self.report(
                            line,
                            format!("Type mismatch: operator '{op}' cannot compare void values"),
                        );
                    }
                }
                Type::Bool
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                self.expect_operands(op, Type::Int, left, right, line);
                Type::Bool
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                self.expect_operands(op, Type::Int, left, right, line);
                Type::Int
            }
        }
    }

    fn expect_operands(
        &mut self,
        op: BinaryOp,
        expected: Type,
        left: Option<Type>,
        right: Option<Type>,
        line: usize,
    ) {
        for found in [left, right].into_iter().flatten() {
            if found != expected {
                self.report(
                    line,
                    format!("Type mismatch: operator '{op}' requires {expected} operands, found {found}"),
                );
            }
        }
    }
}
