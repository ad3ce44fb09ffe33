//! Linear-scan register allocation over the flat instruction list.
//!
//! One forward pass per function block. A small map tracks which virtual
//! register each physical slot currently holds; reads are satisfied by
//! `ensure` (reuse or reload), writes by `allocate` (free slot or evict).
//! Eviction follows furthest-next-use: spill the resident value whose next
//! reference in the remaining stream is farthest away, preferring values
//! never referenced again, breaking ties toward the lowest slot number.
//!
//! Spill stores and reload loads are spliced into the list at the scan
//! cursor, so the pass processes them like original instructions. Each
//! spill widens the owning function's frame by patching the reservation
//! immediate emitted in the prologue.

use std::collections::HashMap;

use crate::iloc::{Insn, Opcode, Operand, WORD_SIZE};
use crate::CompileError;

/// Offset of the frame-reservation `addI` from its function label.
const FRAME_INSN_OFFSET: usize = 3;

/// Rewrite every virtual-register operand in `code` to one of
/// `num_physical_regs` physical registers, inserting spill and reload
/// instructions as needed. Allocation state resets at every function
/// label; values never live across calls (caller-saves) or functions.
pub fn allocate_registers(
    code: &mut Vec<Insn>,
    num_physical_regs: usize,
) -> Result<(), CompileError> {
    if num_physical_regs == 0 {
        return Err(CompileError::Internal(
            "cannot allocate with zero physical registers".into(),
        ));
    }

    let mut alloc = Allocator {
        name: vec![None; num_physical_regs],
        pinned: vec![false; num_physical_regs],
        spill_offsets: HashMap::new(),
        frame_insn: None,
    };

    let mut i = 0;
    while i < code.len() {
        if code[i].is_call_label() {
            alloc.reset(i);
            i += 1;
            continue;
        }
        alloc.pinned.fill(false);

        // Caller-saves: everything resident is spilled before the call.
        if code[i].op == Opcode::Call {
            for slot in 0..num_physical_regs {
                alloc.spill(code, &mut i, slot)?;
            }
        }

        let mut read_vrs = Vec::new();
        for &pos in code[i].read_positions() {
            let Some(vr) = code[i].operands.get(pos).and_then(Operand::virtual_id) else {
                continue;
            };
            let slot = alloc.ensure(code, &mut i, vr)?;
            code[i].operands[pos] = Operand::PhysicalReg(slot);
            read_vrs.push((vr, slot));
        }
        // A read operand at its last use frees its slot immediately.
        for (vr, slot) in read_vrs {
            if next_use(code, vr, i + 1).is_none() {
                alloc.name[slot] = None;
            }
        }

        if let Some(pos) = code[i].write_position() {
            if let Some(vr) = code[i].operands.get(pos).and_then(Operand::virtual_id) {
                alloc.pinned.fill(false);
                let slot = alloc.allocate(code, &mut i, vr)?;
                alloc.name[slot] = Some(vr);
                code[i].operands[pos] = Operand::PhysicalReg(slot);
            }
        }
        i += 1;
    }
    Ok(())
}

/// Instruction count from `from` to the next reference of `vr`; `None`
/// when the remaining stream never references it.
fn next_use(code: &[Insn], vr: usize, from: usize) -> Option<usize> {
    code.get(from..)?
        .iter()
        .position(|insn| insn.references_virtual(vr))
}

struct Allocator {
    /// Slot -> resident virtual register.
    name: Vec<Option<usize>>,
    /// Slots serving the instruction currently under the cursor; never
    /// eviction candidates.
    pinned: Vec<bool>,
    /// Virtual register -> spill slot offset, scoped to one function.
    spill_offsets: HashMap<usize, i64>,
    frame_insn: Option<usize>,
}

impl Allocator {
    /// Start a new function block whose label is at index `label_idx`.
    fn reset(&mut self, label_idx: usize) {
        self.name.fill(None);
        self.spill_offsets.clear();
        self.frame_insn = Some(label_idx + FRAME_INSN_OFFSET);
    }

    /// Return a slot holding `vr`'s value, reloading from its spill slot
    /// when the value is not resident.
    fn ensure(
        &mut self,
        code: &mut Vec<Insn>,
        cursor: &mut usize,
        vr: usize,
    ) -> Result<usize, CompileError> {
        if let Some(slot) = self.name.iter().position(|&held| held == Some(vr)) {
            self.pinned[slot] = true;
            return Ok(slot);
        }
        let slot = self.allocate(code, cursor, vr)?;
        self.name[slot] = Some(vr);
        self.pinned[slot] = true;
        if let Some(&offset) = self.spill_offsets.get(&vr) {
            insert_before(
                code,
                cursor,
                Insn::op3(
                    Opcode::LoadAI,
                    Operand::BasePtr,
                    Operand::IntConst(offset),
                    Operand::PhysicalReg(slot),
                ),
            );
        }
        Ok(slot)
    }

    /// Obtain a slot for `vr`: any free slot first, otherwise evict the
    /// unpinned occupant with the furthest next use.
    fn allocate(
        &mut self,
        code: &mut Vec<Insn>,
        cursor: &mut usize,
        vr: usize,
    ) -> Result<usize, CompileError> {
        if let Some(slot) = self.name.iter().position(Option::is_none) {
            return Ok(slot);
        }

        let mut victim: Option<(usize, Option<usize>)> = None;
        for slot in 0..self.name.len() {
            if self.pinned[slot] {
                continue;
            }
            let held = self.name[slot].ok_or_else(|| {
                CompileError::Internal("occupied slot with no resident register".into())
            })?;
            // Distance measured from the current instruction, so operands
            // the instruction still references virtually stay at zero.
            let d = next_use(code, held, *cursor);
            let farther = match (&victim, d) {
                (None, _) => true,
                (Some((_, None)), _) => false,
                (Some(_), None) => true,
                (Some((_, Some(best))), Some(d)) => d > *best,
            };
            if farther {
                victim = Some((slot, d));
            }
        }
        let Some((slot, _)) = victim else {
            return Err(CompileError::Internal(format!(
                "no evictable register for r{vr}"
            )));
        };
        self.spill(code, cursor, slot)?;
        Ok(slot)
    }

    /// Spill `slot`'s resident value (if any) to its stack slot, assigning
    /// a fresh one by widening the frame on first spill of that value.
    fn spill(
        &mut self,
        code: &mut Vec<Insn>,
        cursor: &mut usize,
        slot: usize,
    ) -> Result<(), CompileError> {
        let Some(vr) = self.name[slot] else {
            return Ok(());
        };
        let offset = match self.spill_offsets.get(&vr) {
            Some(&offset) => offset,
            None => {
                let frame = self.frame_insn.ok_or_else(|| {
                    CompileError::Internal("spill encountered outside a function".into())
                })?;
                let Some(Operand::IntConst(imm)) = code.get_mut(frame).and_then(|insn| {
                    insn.operands.get_mut(1)
                }) else {
                    return Err(CompileError::Internal(
                        "malformed frame reservation instruction".into(),
                    ));
                };
                *imm -= WORD_SIZE;
                let offset = *imm;
                self.spill_offsets.insert(vr, offset);
                offset
            }
        };
        insert_before(
            code,
            cursor,
            Insn::op3(
                Opcode::StoreAI,
                Operand::PhysicalReg(slot),
                Operand::BasePtr,
                Operand::IntConst(offset),
            ),
        );
        self.name[slot] = None;
        Ok(())
    }
}

/// Splice `insn` in directly before the cursor position, keeping the
/// cursor on the instruction being processed.
fn insert_before(code: &mut Vec<Insn>, cursor: &mut usize, insn: Insn) {
    code.insert(*cursor, insn);
    *cursor += 1;
}
