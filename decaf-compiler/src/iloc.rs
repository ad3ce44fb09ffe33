//! ILOC-style intermediate instruction model.
//!
//! Instructions carry an opcode and up to three operands. Code generation
//! produces operands in the unbounded virtual register space; register
//! allocation rewrites them to a bounded physical set. The stack pointer,
//! base (frame) pointer, and return register are dedicated operand variants
//! that allocation never touches.
//!
//! `Display` lowers an instruction to one line of text, suitable for direct
//! emission or further lowering to a target ISA.

use std::fmt;

/// Machine word size in bytes; also the stack slot granularity.
pub const WORD_SIZE: i64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// `loadI c => r` — load immediate
    LoadI,
    Add,
    Sub,
    Mult,
    Div,
    /// `addI r, c => r'`
    AddI,
    /// `multI r, c => r'`
    MultI,
    Or,
    And,
    CmpEq,
    CmpNe,
    CmpLt,
    CmpLe,
    CmpGt,
    CmpGe,
    Neg,
    Not,
    /// `loadAI base, c => r` — base + constant offset
    LoadAI,
    /// `loadAO base, off => r` — base + register offset
    LoadAO,
    /// `storeAI r => base, c`
    StoreAI,
    /// `storeAO r => base, off`
    StoreAO,
    Push,
    Pop,
    Call,
    Return,
    Jump,
    /// `cbr r -> l1, l2`
    Cbr,
    Label,
    Print,
    /// `i2i r => r'` — register move
    I2i,
}

impl Opcode {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::LoadI => "loadI",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mult => "mult",
            Opcode::Div => "div",
            Opcode::AddI => "addI",
            Opcode::MultI => "multI",
            Opcode::Or => "or",
            Opcode::And => "and",
            Opcode::CmpEq => "cmp_EQ",
            Opcode::CmpNe => "cmp_NE",
            Opcode::CmpLt => "cmp_LT",
            Opcode::CmpLe => "cmp_LE",
            Opcode::CmpGt => "cmp_GT",
            Opcode::CmpGe => "cmp_GE",
            Opcode::Neg => "neg",
            Opcode::Not => "not",
            Opcode::LoadAI => "loadAI",
            Opcode::LoadAO => "loadAO",
            Opcode::StoreAI => "storeAI",
            Opcode::StoreAO => "storeAO",
            Opcode::Push => "push",
            Opcode::Pop => "pop",
            Opcode::Call => "call",
            Opcode::Return => "return",
            Opcode::Jump => "jump",
            Opcode::Cbr => "cbr",
            Opcode::Label => "",
            Opcode::Print => "print",
            Opcode::I2i => "i2i",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Unbounded-id placeholder assigned during code generation.
    VirtualReg(usize),
    /// Bounded-id register assigned during allocation.
    PhysicalReg(usize),
    /// Stack pointer (dedicated; never reallocated).
    StackPtr,
    /// Base/frame pointer (dedicated; never reallocated).
    BasePtr,
    /// Return-value register (dedicated; never reallocated).
    ReturnReg,
    IntConst(i64),
    StrConst(String),
    /// Named function entry label.
    CallLabel(String),
    /// Anonymous label for control-flow lowering.
    AnonLabel(usize),
}

impl Operand {
    pub fn is_virtual(&self) -> bool {
        matches!(self, Operand::VirtualReg(_))
    }

    /// Virtual register id, if this operand is one.
    pub fn virtual_id(&self) -> Option<usize> {
        match self {
            Operand::VirtualReg(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::VirtualReg(id) => write!(f, "r{id}"),
            Operand::PhysicalReg(id) => write!(f, "R{id}"),
            Operand::StackPtr => write!(f, "SP"),
            Operand::BasePtr => write!(f, "BP"),
            Operand::ReturnReg => write!(f, "RET"),
            Operand::IntConst(c) => write!(f, "{c}"),
            Operand::StrConst(s) => write!(f, "{s:?}"),
            Operand::CallLabel(name) => write!(f, "{name}"),
            Operand::AnonLabel(n) => write!(f, "l{n}"),
        }
    }
}

/// One instruction: opcode plus 0–3 operands in positional form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insn {
    pub op: Opcode,
    pub operands: Vec<Operand>,
}

impl Insn {
    pub fn op0(op: Opcode) -> Self {
        Self {
            op,
            operands: Vec::new(),
        }
    }

    pub fn op1(op: Opcode, a: Operand) -> Self {
        Self {
            op,
            operands: vec![a],
        }
    }

    pub fn op2(op: Opcode, a: Operand, b: Operand) -> Self {
        Self {
            op,
            operands: vec![a, b],
        }
    }

    pub fn op3(op: Opcode, a: Operand, b: Operand, c: Operand) -> Self {
        Self {
            op,
            operands: vec![a, b, c],
        }
    }

    /// Operand positions *read* by this instruction, per opcode.
    ///
    /// Only positions that may hold register operands are listed; constant
    /// and label positions are skipped by the caller's virtual-reg filter
    /// anyway, but keeping the table tight makes the contract obvious.
    pub fn read_positions(&self) -> &'static [usize] {
        match self.op {
            // [src, dst]
            Opcode::Neg | Opcode::Not | Opcode::I2i => &[0],
            // [a, b, dst]
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mult
            | Opcode::Div
            | Opcode::Or
            | Opcode::And
            | Opcode::CmpEq
            | Opcode::CmpNe
            | Opcode::CmpLt
            | Opcode::CmpLe
            | Opcode::CmpGt
            | Opcode::CmpGe => &[0, 1],
            // [a, const, dst]
            Opcode::AddI | Opcode::MultI => &[0],
            // [base, const, dst]
            Opcode::LoadAI => &[0],
            // [base, off, dst]
            Opcode::LoadAO => &[0, 1],
            // [src, base, const]
            Opcode::StoreAI => &[0, 1],
            // [src, base, off]
            Opcode::StoreAO => &[0, 1, 2],
            Opcode::Push | Opcode::Print => &[0],
            Opcode::Cbr => &[0],
            Opcode::LoadI
            | Opcode::Pop
            | Opcode::Call
            | Opcode::Return
            | Opcode::Jump
            | Opcode::Label => &[],
        }
    }

    /// Operand position *written* by this instruction, if any.
    pub fn write_position(&self) -> Option<usize> {
        match self.op {
            Opcode::LoadI => Some(1),
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mult
            | Opcode::Div
            | Opcode::AddI
            | Opcode::MultI
            | Opcode::Or
            | Opcode::And
            | Opcode::CmpEq
            | Opcode::CmpNe
            | Opcode::CmpLt
            | Opcode::CmpLe
            | Opcode::CmpGt
            | Opcode::CmpGe
            | Opcode::LoadAI
            | Opcode::LoadAO => Some(2),
            Opcode::Neg | Opcode::Not | Opcode::I2i => Some(1),
            Opcode::Pop => Some(0),
            Opcode::StoreAI
            | Opcode::StoreAO
            | Opcode::Push
            | Opcode::Call
            | Opcode::Return
            | Opcode::Jump
            | Opcode::Cbr
            | Opcode::Label
            | Opcode::Print => None,
        }
    }

    /// Virtual register ids read by this instruction.
    pub fn read_virtual_regs(&self) -> Vec<usize> {
        self.read_positions()
            .iter()
            .filter_map(|&pos| self.operands.get(pos).and_then(Operand::virtual_id))
            .collect()
    }

    /// Virtual register id written by this instruction, if any.
    pub fn written_virtual_reg(&self) -> Option<usize> {
        self.write_position()
            .and_then(|pos| self.operands.get(pos))
            .and_then(Operand::virtual_id)
    }

    /// True if any operand references the given virtual register.
    pub fn references_virtual(&self, vr: usize) -> bool {
        self.operands
            .iter()
            .any(|op| op.virtual_id() == Some(vr))
    }

    /// True if this is a function entry label (`LABEL f` with a call label).
    pub fn is_call_label(&self) -> bool {
        self.op == Opcode::Label && matches!(self.operands.first(), Some(Operand::CallLabel(_)))
    }
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            Opcode::Label => write!(f, "{}:", self.operands[0]),
            Opcode::LoadI | Opcode::I2i | Opcode::Neg | Opcode::Not => write!(
                f,
                "  {} {} => {}",
                self.op.mnemonic(),
                self.operands[0],
                self.operands[1]
            ),
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mult
            | Opcode::Div
            | Opcode::AddI
            | Opcode::MultI
            | Opcode::Or
            | Opcode::And
            | Opcode::CmpEq
            | Opcode::CmpNe
            | Opcode::CmpLt
            | Opcode::CmpLe
            | Opcode::CmpGt
            | Opcode::CmpGe
            | Opcode::LoadAI
            | Opcode::LoadAO => write!(
                f,
                "  {} {}, {} => {}",
                self.op.mnemonic(),
                self.operands[0],
                self.operands[1],
                self.operands[2]
            ),
            Opcode::StoreAI | Opcode::StoreAO => write!(
                f,
                "  {} {} => {}, {}",
                self.op.mnemonic(),
                self.operands[0],
                self.operands[1],
                self.operands[2]
            ),
            Opcode::Cbr => write!(
                f,
                "  cbr {} -> {}, {}",
                self.operands[0], self.operands[1], self.operands[2]
            ),
            Opcode::Push | Opcode::Pop | Opcode::Call | Opcode::Jump | Opcode::Print => {
                write!(f, "  {} {}", self.op.mnemonic(), self.operands[0])
            }
            Opcode::Return => write!(f, "  return"),
        }
    }
}
