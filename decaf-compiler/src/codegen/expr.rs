//! Expression lowering: each expression returns its instruction sublist
//! plus the operand holding its value.

use super::{Gen, STATIC_BASE};
use crate::analysis::Symbol;
use crate::ast::{BinaryOp, Literal, NodeId, NodeKind, UnaryOp};
use crate::iloc::{Insn, Opcode, Operand, WORD_SIZE};

impl Gen<'_> {
    pub(super) fn gen_expr(&mut self, expr: NodeId, scope: NodeId) -> (Vec<Insn>, Operand) {
        match self.ast.kind(expr).clone() {
            NodeKind::Literal(lit) => self.gen_literal(lit),
            NodeKind::Location { name, index } => self.gen_location(&name, index, scope),
            NodeKind::BinaryOp { op, left, right } => self.gen_binary(op, left, right, scope),
            NodeKind::UnaryOp { op, operand } => self.gen_unary(op, operand, scope),
            NodeKind::FuncCall { name, args } => self.gen_call(&name, &args, scope),
            // Statements never reach here on a validated tree.
            _ => (Vec::new(), Operand::IntConst(0)),
        }
    }

    fn gen_literal(&mut self, lit: Literal) -> (Vec<Insn>, Operand) {
        match lit {
            Literal::Int(v) => {
                let dst = self.fresh_vreg();
                (
                    vec![Insn::op2(Opcode::LoadI, Operand::IntConst(v), dst.clone())],
                    dst,
                )
            }
            Literal::Bool(b) => {
                let dst = self.fresh_vreg();
                (
                    vec![Insn::op2(
                        Opcode::LoadI,
                        Operand::IntConst(i64::from(b)),
                        dst.clone(),
                    )],
                    dst,
                )
            }
            // Strings only ever feed `print`; the constant is the operand.
            Literal::Str(s) => (Vec::new(), Operand::StrConst(s)),
        }
    }

    /// Base register and byte offset addressing a scalar symbol: statics
    /// through a freshly loaded base address, stack symbols through BP.
    pub(super) fn scalar_address(&mut self, symbol: &Symbol, code: &mut Vec<Insn>) -> (Operand, i64) {
        match symbol.storage {
            crate::analysis::Storage::Static => {
                let base = self.fresh_vreg();
                code.push(Insn::op2(
                    Opcode::LoadI,
                    Operand::IntConst(STATIC_BASE),
                    base.clone(),
                ));
                (base, symbol.offset)
            }
            _ => (Operand::BasePtr, symbol.offset),
        }
    }

    fn gen_location(
        &mut self,
        name: &str,
        index: Option<NodeId>,
        scope: NodeId,
    ) -> (Vec<Insn>, Operand) {
        let mut code = Vec::new();
        let Some(symbol) = self.symbols.lookup(scope, name).cloned() else {
            return (code, Operand::IntConst(0));
        };
        let dst = self.fresh_vreg();

        match index {
            Some(index) => {
                let (index_code, idx) = self.gen_expr(index, scope);
                code.extend(index_code);
                let offset_reg = self.fresh_vreg();
                code.push(Insn::op3(
                    Opcode::MultI,
                    idx,
                    Operand::IntConst(WORD_SIZE),
                    offset_reg.clone(),
                ));
                let base = self.fresh_vreg();
                code.push(Insn::op2(
                    Opcode::LoadI,
                    Operand::IntConst(STATIC_BASE + symbol.offset),
                    base.clone(),
                ));
                code.push(Insn::op3(Opcode::LoadAO, base, offset_reg, dst.clone()));
            }
            None => {
                let (base, offset) = self.scalar_address(&symbol, &mut code);
                code.push(Insn::op3(
                    Opcode::LoadAI,
                    base,
                    Operand::IntConst(offset),
                    dst.clone(),
                ));
            }
        }
        (code, dst)
    }

    fn gen_binary(
        &mut self,
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
        scope: NodeId,
    ) -> (Vec<Insn>, Operand) {
        let (mut code, lhs) = self.gen_expr(left, scope);
        let (right_code, rhs) = self.gen_expr(right, scope);
        code.extend(right_code);
        let dst = self.fresh_vreg();

        // a % b lowers to a - (a/b)*b; with truncating division this is
        // C-style remainder, sign following the dividend.
        if op == BinaryOp::Mod {
            let quotient = self.fresh_vreg();
            let product = self.fresh_vreg();
            code.push(Insn::op3(
                Opcode::Div,
                lhs.clone(),
                rhs.clone(),
                quotient.clone(),
            ));
            code.push(Insn::op3(Opcode::Mult, quotient, rhs, product.clone()));
            code.push(Insn::op3(Opcode::Sub, lhs, product, dst.clone()));
            return (code, dst);
        }

        let opcode = match op {
            BinaryOp::Or => Opcode::Or,
            BinaryOp::And => Opcode::And,
            BinaryOp::Eq => Opcode::CmpEq,
            BinaryOp::Neq => Opcode::CmpNe,
            BinaryOp::Lt => Opcode::CmpLt,
            BinaryOp::Le => Opcode::CmpLe,
            BinaryOp::Gt => Opcode::CmpGt,
            BinaryOp::Ge => Opcode::CmpGe,
            BinaryOp::Add => Opcode::Add,
            BinaryOp::Sub => Opcode::Sub,
            BinaryOp::Mul => Opcode::Mult,
            BinaryOp::Div => Opcode::Div,
            BinaryOp::Mod => unreachable!(),
        };
        code.push(Insn::op3(opcode, lhs, rhs, dst.clone()));
        (code, dst)
    }

    fn gen_unary(&mut self, op: UnaryOp, operand: NodeId, scope: NodeId) -> (Vec<Insn>, Operand) {
        let (mut code, src) = self.gen_expr(operand, scope);
        let dst = self.fresh_vreg();
        let opcode = match op {
            UnaryOp::Neg => Opcode::Neg,
            UnaryOp::Not => Opcode::Not,
        };
        code.push(Insn::op2(opcode, src, dst.clone()));
        (code, dst)
    }

    fn gen_call(&mut self, name: &str, args: &[NodeId], scope: NodeId) -> (Vec<Insn>, Operand) {
        // Built-in output intercepts normal call lowering entirely.
        if matches!(name, "print_int" | "print_bool" | "print_str") {
            let mut code = Vec::new();
            let value = match args.first() {
                Some(&arg) => {
                    let (arg_code, value) = self.gen_expr(arg, scope);
                    code.extend(arg_code);
                    value
                }
                None => Operand::IntConst(0),
            };
            code.push(Insn::op1(Opcode::Print, value));
            return (code, Operand::IntConst(0));
        }

        // Evaluate left-to-right, then push in reverse so the first
        // argument ends up nearest the callee's BP.
        let mut code = Vec::new();
        let mut values = Vec::with_capacity(args.len());
        for &arg in args {
            let (arg_code, value) = self.gen_expr(arg, scope);
            code.extend(arg_code);
            values.push(value);
        }
        for value in values.into_iter().rev() {
            code.push(Insn::op1(Opcode::Push, value));
        }
        code.push(Insn::op1(Opcode::Call, Operand::CallLabel(name.to_string())));
        if !args.is_empty() {
            code.push(Insn::op3(
                Opcode::AddI,
                Operand::StackPtr,
                Operand::IntConst(args.len() as i64 * WORD_SIZE),
                Operand::StackPtr,
            ));
        }
        let dst = self.fresh_vreg();
        code.push(Insn::op2(Opcode::I2i, Operand::ReturnReg, dst.clone()));
        (code, dst)
    }
}
