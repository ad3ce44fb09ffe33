//! Lowering from the validated AST to virtual-register ILOC.
//!
//! Generation is bottom-up: every node produces its own instruction
//! sublist, splicing in its children's sublists in evaluation order before
//! appending its own tail. Functions get a label, a three-instruction
//! prologue, and a single shared epilogue; every `return` routes through
//! the epilogue label. The frame-reservation immediate in the prologue is
//! deliberately left in place for register allocation to enlarge when it
//! spills.

mod expr;

use crate::analysis::SymbolTables;
use crate::ast::{Ast, NodeId, NodeKind};
use crate::iloc::{Insn, Opcode, Operand, WORD_SIZE};

/// Absolute address where static (global) storage begins.
const STATIC_BASE: i64 = 0;

/// Lower the whole program. Functions are emitted in declaration order;
/// callers must have verified that analysis produced no diagnostics.
pub fn generate(ast: &Ast, symbols: &SymbolTables) -> Vec<Insn> {
    let mut gen = Gen {
        ast,
        symbols,
        next_vreg: 0,
        next_label: 0,
        loops: Vec::new(),
        epilogue: 0,
    };
    gen.gen_program()
}

/// Labels for one active loop: `break` targets `end`, `continue` targets
/// `cont` (the condition re-test).
struct LoopLabels {
    cont: usize,
    end: usize,
}

struct Gen<'a> {
    ast: &'a Ast,
    symbols: &'a SymbolTables,
    next_vreg: usize,
    next_label: usize,
    /// Innermost loop last; pushed on loop entry, popped on exit.
    loops: Vec<LoopLabels>,
    /// Epilogue label of the function currently being lowered.
    epilogue: usize,
}

impl<'a> Gen<'a> {
    fn fresh_vreg(&mut self) -> Operand {
        let id = self.next_vreg;
        self.next_vreg += 1;
        Operand::VirtualReg(id)
    }

    fn fresh_label(&mut self) -> usize {
        let id = self.next_label;
        self.next_label += 1;
        id
    }

    fn gen_program(&mut self) -> Vec<Insn> {
        let NodeKind::Program { functions, .. } = self.ast.kind(self.ast.root()) else {
            return Vec::new();
        };
        let mut code = Vec::new();
        for &func in functions {
            code.extend(self.gen_function(func));
        }
        code
    }

    fn gen_function(&mut self, func: NodeId) -> Vec<Insn> {
        let NodeKind::FuncDecl { name, body, .. } = self.ast.kind(func) else {
            return Vec::new();
        };
        self.epilogue = self.fresh_label();

        let mut code = vec![
            Insn::op1(Opcode::Label, Operand::CallLabel(name.clone())),
            Insn::op1(Opcode::Push, Operand::BasePtr),
            Insn::op2(Opcode::I2i, Operand::StackPtr, Operand::BasePtr),
            // Frame reservation; allocation grows this immediate per spill.
            Insn::op3(
                Opcode::AddI,
                Operand::StackPtr,
                Operand::IntConst(-self.symbols.local_bytes(func)),
                Operand::StackPtr,
            ),
        ];

        code.extend(self.gen_block(*body));

        code.push(Insn::op1(Opcode::Label, Operand::AnonLabel(self.epilogue)));
        code.push(Insn::op2(Opcode::I2i, Operand::BasePtr, Operand::StackPtr));
        code.push(Insn::op1(Opcode::Pop, Operand::BasePtr));
        code.push(Insn::op0(Opcode::Return));
        code
    }

    fn gen_block(&mut self, block: NodeId) -> Vec<Insn> {
        let NodeKind::Block { statements, .. } = self.ast.kind(block) else {
            return Vec::new();
        };
        let mut code = Vec::new();
        for &stmt in statements {
            code.extend(self.gen_stmt(stmt, block));
        }
        code
    }

    fn gen_stmt(&mut self, stmt: NodeId, scope: NodeId) -> Vec<Insn> {
        match self.ast.kind(stmt) {
            NodeKind::Assignment { location, value } => {
                self.gen_assignment(*location, *value, scope)
            }
            NodeKind::Conditional {
                condition,
                if_block,
                else_block,
            } => self.gen_conditional(*condition, *if_block, *else_block, scope),
            NodeKind::WhileLoop { condition, body } => self.gen_while(*condition, *body, scope),
            NodeKind::Return { value } => self.gen_return(*value, scope),
            // Analysis rejects break/continue outside a loop, so the loop
            // stack is non-empty here; the epilogue fallback is unreachable.
            NodeKind::Break => {
                let end = self.loops.last().map(|l| l.end).unwrap_or(self.epilogue);
                vec![Insn::op1(Opcode::Jump, Operand::AnonLabel(end))]
            }
            NodeKind::Continue => {
                let cont = self.loops.last().map(|l| l.cont).unwrap_or(self.epilogue);
                vec![Insn::op1(Opcode::Jump, Operand::AnonLabel(cont))]
            }
            NodeKind::FuncCall { .. } => {
                // Expression statement; the result register is simply unused.
                let (code, _) = self.gen_expr(stmt, scope);
                code
            }
            _ => Vec::new(),
        }
    }

    fn gen_assignment(&mut self, location: NodeId, value: NodeId, scope: NodeId) -> Vec<Insn> {
        let (mut code, val) = self.gen_expr(value, scope);
        let NodeKind::Location { name, index } = self.ast.kind(location) else {
            return code;
        };
        let Some(symbol) = self.symbols.lookup(scope, name) else {
            return code;
        };

        match index {
            Some(index) => {
                let (base, offset_reg) = {
                    let (index_code, idx) = self.gen_expr(*index, scope);
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
                    (base, offset_reg)
                };
                code.push(Insn::op3(Opcode::StoreAO, val, base, offset_reg));
            }
            None => {
                let (base, offset) = self.scalar_address(symbol, &mut code);
                code.push(Insn::op3(Opcode::StoreAI, val, base, Operand::IntConst(offset)));
            }
        }
        code
    }

    fn gen_conditional(
        &mut self,
        condition: NodeId,
        if_block: NodeId,
        else_block: Option<NodeId>,
        scope: NodeId,
    ) -> Vec<Insn> {
        let then_label = self.fresh_label();
        let end_label = self.fresh_label();
        let else_label = else_block.map(|_| self.fresh_label());

        let (mut code, cond) = self.gen_expr(condition, scope);
        code.push(Insn::op3(
            Opcode::Cbr,
            cond,
            Operand::AnonLabel(then_label),
            Operand::AnonLabel(else_label.unwrap_or(end_label)),
        ));
        code.push(Insn::op1(Opcode::Label, Operand::AnonLabel(then_label)));
        code.extend(self.gen_block(if_block));
        if let (Some(else_label), Some(else_block)) = (else_label, else_block) {
            code.push(Insn::op1(Opcode::Jump, Operand::AnonLabel(end_label)));
            code.push(Insn::op1(Opcode::Label, Operand::AnonLabel(else_label)));
            code.extend(self.gen_block(else_block));
        }
        code.push(Insn::op1(Opcode::Label, Operand::AnonLabel(end_label)));
        code
    }

    fn gen_while(&mut self, condition: NodeId, body: NodeId, scope: NodeId) -> Vec<Insn> {
        let cond_label = self.fresh_label();
        let body_label = self.fresh_label();
        let end_label = self.fresh_label();

        let mut code = vec![Insn::op1(Opcode::Label, Operand::AnonLabel(cond_label))];
        let (cond_code, cond) = self.gen_expr(condition, scope);
        code.extend(cond_code);
        code.push(Insn::op3(
            Opcode::Cbr,
            cond,
            Operand::AnonLabel(body_label),
            Operand::AnonLabel(end_label),
        ));
        code.push(Insn::op1(Opcode::Label, Operand::AnonLabel(body_label)));

        self.loops.push(LoopLabels {
            cont: cond_label,
            end: end_label,
        });
        code.extend(self.gen_block(body));
        self.loops.pop();

        code.push(Insn::op1(Opcode::Jump, Operand::AnonLabel(cond_label)));
        code.push(Insn::op1(Opcode::Label, Operand::AnonLabel(end_label)));
        code
    }

    fn gen_return(&mut self, value: Option<NodeId>, scope: NodeId) -> Vec<Insn> {
        let mut code = Vec::new();
        if let Some(value) = value {
            let (value_code, result) = self.gen_expr(value, scope);
            code.extend(value_code);
            code.push(Insn::op2(Opcode::I2i, result, Operand::ReturnReg));
        }
        code.push(Insn::op1(Opcode::Jump, Operand::AnonLabel(self.epilogue)));
        code
    }
}
