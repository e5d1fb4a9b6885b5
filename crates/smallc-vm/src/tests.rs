use pretty_assertions::assert_eq;
use proptest::prelude::*;
use smallc_core::{CodeBuf, CALL_SEQUENCE_LEN};

use super::*;

fn exec(build: impl FnOnce(&mut CodeBuf), data: u32) -> Result<String, VmError> {
    let mut c = CodeBuf::new();
    build(&mut c);
    run_to_string(&c.finish(data))
}

fn fault(build: impl FnOnce(&mut CodeBuf), data: u32) -> RuntimeError { exec(build, data).unwrap_err().kind }

#[test]
fn right_operand_is_on_top() {
    let out = exec(
        |c| {
            c.op_i32(Op::PushI, 7);
            c.op_i32(Op::PushI, 2);
            c.op(Op::Sub);
            c.op(Op::PrintInt);
            c.op(Op::PrintLn);
            c.op_i32(Op::PushI, -7);
            c.op_i32(Op::PushI, 2);
            c.op(Op::Div);
            c.op(Op::PrintInt);
            c.op(Op::PrintLn);
            c.op_i32(Op::PushI, -7);
            c.op_i32(Op::PushI, 3);
            c.op(Op::Mod);
            c.op(Op::PrintInt);
            c.op(Op::PrintLn);
            c.op(Op::Halt);
        },
        0,
    )
    .unwrap();
    assert_eq!(out, "5\n-3\n-1\n");
}

#[test]
fn float_arithmetic_and_conversions() {
    let out = exec(
        |c| {
            c.op_i32(Op::PushI, 3);
            c.op(Op::ConvToFloat);
            c.op_f32(Op::FPushI, 0.5);
            c.op(Op::FAdd);
            c.op(Op::PrintFloat);
            c.op(Op::PrintLn);
            c.op_f32(Op::FPushI, -2.9);
            c.op(Op::ConvToInt);
            c.op(Op::PrintInt);
            c.op(Op::PrintLn);
            c.op_f32(Op::FPushI, 2.0);
            c.op(Op::FNeg);
            c.op(Op::PrintFloat);
            c.op(Op::Halt);
        },
        0,
    )
    .unwrap();
    assert_eq!(out, "3.500000\n-2\n-2.000000");
}

#[test]
fn division_by_zero_is_fatal() {
    let err = exec(
        |c| {
            c.op_i32(Op::PushI, 1);
            c.op_i32(Op::PushI, 0);
            c.op(Op::Div);
            c.op(Op::Halt);
        },
        0,
    )
    .unwrap_err();
    assert_eq!(err, VmError { pc: 10, kind: RuntimeError::DivisionByZero });
    assert_eq!(err.to_string(), "division by zero (pc 0010)");

    let kind = fault(
        |c| {
            c.op_f32(Op::FPushI, 1.0);
            c.op_f32(Op::FPushI, 0.0);
            c.op(Op::FDiv);
            c.op(Op::Halt);
        },
        0,
    );
    assert_eq!(kind, RuntimeError::DivisionByZero);
    assert_eq!(
        fault(
            |c| {
                c.op_i32(Op::PushI, 1);
                c.op_i32(Op::PushI, 0);
                c.op(Op::Mod);
            },
            0
        ),
        RuntimeError::DivisionByZero
    );
}

#[test]
fn comparisons_and_logic() {
    let out = exec(
        |c| {
            c.op_i32(Op::PushI, 3);
            c.op_f32(Op::FPushI, 2.5);
            c.op(Op::Greater);
            c.op(Op::PrintInt);
            c.op_i32(Op::PushI, 3);
            c.op_i32(Op::PushI, 3);
            c.op(Op::Neq);
            c.op(Op::PrintInt);
            c.op_f32(Op::FPushI, 0.5);
            c.op_i32(Op::PushI, 0);
            c.op(Op::Or);
            c.op(Op::PrintInt);
            c.op_i32(Op::PushI, 2);
            c.op_i32(Op::PushI, 0);
            c.op(Op::And);
            c.op(Op::PrintInt);
            c.op(Op::Halt);
        },
        0,
    )
    .unwrap();
    assert_eq!(out, "1010");
}

#[test]
fn nan_compares_unequal_to_everything() {
    let out = exec(
        |c| {
            for op in [Op::Eq, Op::Neq, Op::Less, Op::Leq, Op::Greater, Op::Geq] {
                c.op_f32(Op::FPushI, f32::NAN);
                c.op_f32(Op::FPushI, 1.0);
                c.op(op);
                c.op(Op::PrintInt);
            }
            c.op_f32(Op::FPushI, f32::NAN);
            c.op(Op::Dup);
            c.op(Op::Eq);
            c.op(Op::PrintInt);
            c.op(Op::Halt);
        },
        0,
    )
    .unwrap();
    assert_eq!(out, "0100000");
}

#[test]
fn conditional_jumps_are_relative_to_operand_end() {
    let out = exec(
        |c| {
            c.op_i32(Op::PushI, 0);
            let skip = c.hole(Op::JFalse);
            c.op_i32(Op::PushI, 1);
            c.op(Op::PrintInt);
            c.patch_here(skip).unwrap();
            c.op_i32(Op::PushI, 2);
            c.op(Op::PrintInt);
            c.op(Op::Halt);
        },
        0,
    )
    .unwrap();
    assert_eq!(out, "2");
}

#[test]
fn backward_loop_counts_down() {
    // x = 3; do { print x; x = x - 1; } while (x);
    let out = exec(
        |c| {
            c.op_i32(Op::PushI, 3);
            c.op_i32(Op::Pop, 0);
            let head = c.here();
            c.op_i32(Op::Push, 0);
            c.op(Op::PrintInt);
            c.op_i32(Op::Push, 0);
            c.op_i32(Op::PushI, 1);
            c.op(Op::Sub);
            c.op_i32(Op::Pop, 0);
            c.op_i32(Op::Push, 0);
            c.jump_back(Op::JTrue, head);
            c.op(Op::Halt);
        },
        4,
    )
    .unwrap();
    assert_eq!(out, "321");
}

#[test]
fn call_sequence_carries_return_address() {
    let mut c = CodeBuf::new();
    let skip = c.hole(Op::Jmp);
    let entry = c.here();
    c.op_i32(Op::Pop, 0);
    c.op_i32(Op::FPop, 4);
    c.op_i32(Op::Push, 0);
    c.op(Op::PrintInt);
    c.op_i32(Op::FPush, 4);
    c.op(Op::PrintFloat);
    c.op(Op::Return);
    c.patch_here(skip).unwrap();
    c.op_i32(Op::PushI, 9);
    c.op_f32(Op::FPushI, 0.25);
    let ret = c.here() + CALL_SEQUENCE_LEN;
    c.op_i32(Op::PushI, i32::try_from(ret).unwrap());
    c.op_i32(Op::Reverse, 3);
    c.op_i32(Op::Call, i32::try_from(entry).unwrap());
    assert_eq!(c.here(), ret);
    c.op(Op::PrintLn);
    c.op(Op::Halt);

    let prog = c.finish(8);
    let mut vm = Vm::new(&prog, Vec::new(), VmOptions::default());
    vm.run().unwrap();
    assert!(vm.halted());
    assert!(vm.stack().is_empty());
    assert_eq!(String::from_utf8(vm.into_output()).unwrap(), "90.250000\n");
}

#[test]
fn indirect_access_through_addresses() {
    let out = exec(
        |c| {
            c.op_i32(Op::PushI, 4);
            c.op_i32(Op::PushI, 42);
            c.op(Op::Put);
            c.op_i32(Op::PushI, 8);
            c.op_f32(Op::FPushI, 1.5);
            c.op(Op::FPut);
            c.op_i32(Op::PushI, 4);
            c.op(Op::Get);
            c.op(Op::PrintInt);
            c.op_i32(Op::PushI, 8);
            c.op(Op::FGet);
            c.op(Op::PrintFloat);
            c.op_i32(Op::Push, 0);
            c.op(Op::PrintInt);
            c.op(Op::Halt);
        },
        12,
    )
    .unwrap();
    assert_eq!(out, "421.5000000");
}

#[test]
fn print_char_writes_raw_byte() {
    let out = exec(
        |c| {
            c.op_i32(Op::PushI, i32::from(b'k'));
            c.op_i32(Op::PushI, i32::from(b'o'));
            c.op(Op::PrintChar);
            c.op(Op::PrintChar);
            c.op(Op::PrintLn);
            c.op(Op::Halt);
        },
        0,
    )
    .unwrap();
    assert_eq!(out, "ok\n");
}

#[test]
fn dup_exch_remove() {
    let out = exec(
        |c| {
            c.op_i32(Op::PushI, 1);
            c.op_i32(Op::PushI, 2);
            c.op(Op::Exch);
            c.op(Op::Dup);
            c.op(Op::PrintInt);
            c.op(Op::Remove);
            c.op(Op::PrintInt);
            c.op(Op::Halt);
        },
        0,
    )
    .unwrap();
    assert_eq!(out, "12");
}

#[test]
fn stack_faults() {
    let overflow = |c: &mut CodeBuf| {
        c.op_i32(Op::PushI, 1);
        c.jump_back(Op::Jmp, 0);
    };
    let mut c = CodeBuf::new();
    overflow(&mut c);
    let prog = c.finish(0);
    let mut vm = Vm::new(&prog, Vec::new(), VmOptions { stack_capacity: 10, max_steps: None });
    assert_eq!(vm.run().unwrap_err().kind, RuntimeError::StackOverflow(10));
    assert_eq!(vm.stack().len(), 10);

    assert_eq!(fault(|c| c.op(Op::PrintInt), 0), RuntimeError::StackUnderflow);
    assert_eq!(fault(|c| c.op(Op::Return), 0), RuntimeError::StackUnderflow);
    assert_eq!(RuntimeError::StackUnderflow.to_string(), "pop() failed (stack is empty)");
}

#[test]
fn tag_mismatch_is_fatal() {
    assert_eq!(
        fault(
            |c| {
                c.op_f32(Op::FPushI, 1.0);
                c.op(Op::PrintInt);
            },
            0
        ),
        RuntimeError::TypeMismatch { expected: "int", found: Value::Real(1.0) }
    );
}

#[test]
fn bad_addresses() {
    assert_eq!(fault(|c| c.op_i32(Op::Push, 4), 4), RuntimeError::DataOutOfBounds(4));
    assert_eq!(fault(|c| c.op_i32(Op::Call, 99), 0), RuntimeError::CodeOutOfBounds(99));
    assert_eq!(fault(|c| c.op_i32(Op::PushI, 1), 0), RuntimeError::CodeOutOfBounds(5));
    assert_eq!(
        run_to_string(&Program::new(vec![0xff], 0)).unwrap_err().kind,
        RuntimeError::Decode(CoreError::UnknownOpcode { pc: 0, byte: 0xff })
    );
}

#[test]
fn step_budget() {
    let mut c = CodeBuf::new();
    c.jump_back(Op::Jmp, 0);
    let prog = c.finish(0);
    let mut vm = Vm::new(&prog, io::sink(), VmOptions { max_steps: Some(100), ..VmOptions::default() });
    assert_eq!(vm.run().unwrap_err().kind, RuntimeError::StepLimit(100));
    assert_eq!(vm.steps(), 100);
}

proptest! {
    #[test]
    fn int_ops_wrap(a in any::<i32>(), b in any::<i32>()) {
        let out = exec(|c| {
            c.op_i32(Op::PushI, a);
            c.op_i32(Op::PushI, b);
            c.op(Op::Add);
            c.op(Op::PrintInt);
            c.op(Op::PrintLn);
            c.op_i32(Op::PushI, a);
            c.op_i32(Op::PushI, b);
            c.op(Op::Mul);
            c.op(Op::PrintInt);
            c.op(Op::Halt);
        }, 0).unwrap();
        prop_assert_eq!(out, format!("{}\n{}", a.wrapping_add(b), a.wrapping_mul(b)));
    }
}
