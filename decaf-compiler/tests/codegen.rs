//! Codegen tests over the virtual-register ILOC list: evaluation order,
//! frame setup, control-flow labels, and calling convention.

use decaf_compiler::compile_to_virtual_iloc;
use decaf_compiler::iloc::{Insn, Opcode, Operand, WORD_SIZE};

fn lower(source: &str) -> Vec<Insn> {
    compile_to_virtual_iloc(source).unwrap()
}

fn position(code: &[Insn], op: Opcode) -> usize {
    code.iter()
        .position(|insn| insn.op == op)
        .unwrap_or_else(|| panic!("no {op:?} in {code:#?}"))
}

#[test]
fn assignment_loads_operands_before_storing() {
    let code = lower("int a; int b; def int main() { a = b + 1; return a; }");
    let load = position(&code, Opcode::LoadAI);
    let add = position(&code, Opcode::Add);
    let store = position(&code, Opcode::StoreAI);
    assert!(load < add, "operand load must precede the add");
    assert!(add < store, "the add must precede the result store");
}

#[test]
fn prologue_has_patchable_frame_reservation() {
    let code = lower("def int main() { int x; int y; x = 1; y = 2; return x + y; }");

    assert_eq!(
        code[0],
        Insn::op1(Opcode::Label, Operand::CallLabel("main".into()))
    );
    assert_eq!(code[1], Insn::op1(Opcode::Push, Operand::BasePtr));
    assert_eq!(
        code[2],
        Insn::op2(Opcode::I2i, Operand::StackPtr, Operand::BasePtr)
    );
    assert_eq!(
        code[3],
        Insn::op3(
            Opcode::AddI,
            Operand::StackPtr,
            Operand::IntConst(-2 * WORD_SIZE),
            Operand::StackPtr,
        )
    );
}

#[test]
fn returns_route_through_a_single_epilogue() {
    let code = lower(
        "def int main() { if (true) { return 1; } return 2; }",
    );

    let len = code.len();
    let Insn { op: Opcode::Label, operands } = &code[len - 4] else {
        panic!("expected the epilogue label, got {:?}", code[len - 4]);
    };
    let epilogue = operands[0].clone();
    assert_eq!(
        code[len - 3],
        Insn::op2(Opcode::I2i, Operand::BasePtr, Operand::StackPtr)
    );
    assert_eq!(code[len - 2], Insn::op1(Opcode::Pop, Operand::BasePtr));
    assert_eq!(code[len - 1], Insn::op0(Opcode::Return));

    let jumps_to_epilogue = code
        .iter()
        .filter(|insn| insn.op == Opcode::Jump && insn.operands[0] == epilogue)
        .count();
    assert_eq!(jumps_to_epilogue, 2, "both returns target the epilogue");

    // Each return value lands in the dedicated return register first.
    let ret_moves = code
        .iter()
        .filter(|insn| insn.op == Opcode::I2i && insn.operands[1] == Operand::ReturnReg)
        .count();
    assert_eq!(ret_moves, 2);
}

#[test]
fn break_jumps_to_the_loop_end_label() {
    let code = lower("def int main() { while (true) { break; } return 0; }");

    let cbr = &code[position(&code, Opcode::Cbr)];
    let end_label = cbr.operands[2].clone();

    assert!(
        code.iter()
            .any(|insn| insn.op == Opcode::Jump && insn.operands[0] == end_label),
        "break must jump to the loop's end label"
    );
    assert!(
        code.iter()
            .any(|insn| insn.op == Opcode::Label && insn.operands[0] == end_label),
        "the end label must be emitted"
    );
}

#[test]
fn while_retests_its_condition() {
    let code = lower("def int main() { int i; i = 0; while (i < 3) { i = i + 1; } return i; }");

    // The condition label opens the loop; the body's back edge jumps to it.
    let cbr = position(&code, Opcode::Cbr);
    let cond_label = code[..cbr]
        .iter()
        .rev()
        .find(|insn| {
            insn.op == Opcode::Label && matches!(insn.operands[0], Operand::AnonLabel(_))
        })
        .map(|insn| insn.operands[0].clone())
        .unwrap();
    let back_edge = code[cbr..]
        .iter()
        .any(|insn| insn.op == Opcode::Jump && insn.operands[0] == cond_label);
    assert!(back_edge, "loop body must jump back to the condition label");
}

#[test]
fn call_pushes_arguments_in_reverse_and_cleans_up() {
    let code = lower(
        "def int f(int a, int b) { return a - b; } def int main() { return f(1, 2); }",
    );

    let second_arg = code
        .iter()
        .find(|insn| insn.op == Opcode::LoadI && insn.operands[0] == Operand::IntConst(2))
        .and_then(|insn| insn.operands[1].virtual_id())
        .unwrap();

    let call = code
        .iter()
        .position(|insn| {
            insn.op == Opcode::Call
                && insn.operands[0] == Operand::CallLabel("f".into())
        })
        .unwrap();
    let pushes: Vec<&Insn> = code[..call]
        .iter()
        .filter(|insn| insn.op == Opcode::Push && insn.operands[0].is_virtual())
        .collect();
    assert_eq!(pushes.len(), 2);
    assert_eq!(
        pushes[0].operands[0],
        Operand::VirtualReg(second_arg),
        "the last argument is pushed first"
    );

    assert_eq!(
        code[call + 1],
        Insn::op3(
            Opcode::AddI,
            Operand::StackPtr,
            Operand::IntConst(2 * WORD_SIZE),
            Operand::StackPtr,
        ),
        "the caller pops the argument space"
    );
    assert_eq!(code[call + 2].op, Opcode::I2i);
    assert_eq!(code[call + 2].operands[0], Operand::ReturnReg);
}

#[test]
fn print_builtins_become_print_instructions() {
    let code = lower(r#"def int main() { print_int(42); print_str("hi"); return 0; }"#);

    assert!(
        !code
            .iter()
            .any(|insn| matches!(&insn.operands.first(), Some(Operand::CallLabel(l)) if insn.op == Opcode::Call && l.starts_with("print"))),
        "print builtins must not lower to calls"
    );
    let prints: Vec<&Insn> = code.iter().filter(|insn| insn.op == Opcode::Print).collect();
    assert_eq!(prints.len(), 2);
    assert!(prints[0].operands[0].is_virtual());
    assert_eq!(prints[1].operands[0], Operand::StrConst("hi".into()));
}

#[test]
fn modulo_expands_to_div_mult_sub() {
    let code = lower("def int main() { return 7 % 3; }");
    let div = position(&code, Opcode::Div);
    assert_eq!(code[div + 1].op, Opcode::Mult);
    assert_eq!(code[div + 2].op, Opcode::Sub);
}

#[test]
fn statics_and_locals_use_different_bases() {
    let code = lower("int g; def int main() { int l; l = g; return l; }");

    // Global read: base address loaded as a constant, then offset 0.
    let global_load = code
        .iter()
        .find(|insn| insn.op == Opcode::LoadAI && insn.operands[0].is_virtual())
        .unwrap();
    assert_eq!(global_load.operands[1], Operand::IntConst(0));

    // Local store: frame-pointer relative at the first local slot.
    let local_store = code
        .iter()
        .find(|insn| insn.op == Opcode::StoreAI)
        .unwrap();
    assert_eq!(local_store.operands[1], Operand::BasePtr);
    assert_eq!(local_store.operands[2], Operand::IntConst(-WORD_SIZE));
}

#[test]
fn array_reads_scale_the_index_by_word_size() {
    let code = lower("int a[4]; def int main() { int i; i = 2; return a[i]; }");

    let scale = &code[position(&code, Opcode::MultI)];
    assert_eq!(scale.operands[1], Operand::IntConst(WORD_SIZE));
    let load = &code[position(&code, Opcode::LoadAO)];
    assert!(load.operands[0].is_virtual());
    assert!(load.operands[1].is_virtual());
}

#[test]
fn semantic_errors_gate_codegen() {
    let err = compile_to_virtual_iloc("def int main() { return y; }").unwrap_err();
    assert!(matches!(
        err,
        decaf_compiler::CompileError::Semantic(_)
    ));
}

#[test]
fn emitted_text_is_one_instruction_per_line() {
    let code = lower("def int main() { return 0; }");
    let text = decaf_compiler::emit_text(&code);
    assert_eq!(text.lines().count(), code.len());
    assert!(text.starts_with("main:"));
}
