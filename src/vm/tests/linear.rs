// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

//! Execution over the flat, `ModuleDef`-delimited program shape, including
//! modules that wrap around the end of the sequence.

use alloc::vec;
use alloc::vec::Vec;

use super::support::{buf, ONES, ZEROS};
use crate::inst::{default_instruction_library, InstructionLibrary};
use crate::matchbin::HammingPolicy;
use crate::memory::MemBuffer;
use crate::program::{LinearProgram, ProgramModel};
use crate::tag::BitTag;
use crate::vm::{TagVm, ThreadId};

type TestTag = BitTag<16>;
type Program = LinearProgram<TestTag>;
type Vm = TagVm<Program, HammingPolicy>;

fn new_vm() -> Vm {
    TagVm::new(default_instruction_library(), HammingPolicy::default(), 2)
}

fn lib() -> InstructionLibrary<Program, HammingPolicy> {
    default_instruction_library()
}

fn push(program: &mut Program, lib: &InstructionLibrary<Program, HammingPolicy>, name: &str, args: [i32; 3]) {
    program.push_inst_named(lib, name, args.to_vec(), vec![]).unwrap();
}

fn push_tagged(
    program: &mut Program,
    lib: &InstructionLibrary<Program, HammingPolicy>,
    name: &str,
    args: [i32; 3],
    tag_bits: u128,
) {
    program
        .push_inst_named(lib, name, args.to_vec(), vec![TestTag::new(tag_bits)])
        .unwrap();
}

fn working(vm: &Vm, tid: ThreadId) -> &MemBuffer {
    &vm.thread(tid)
        .unwrap()
        .exec_state()
        .top_call()
        .unwrap()
        .memory
        .working
}

#[test]
fn leading_delimiter_module_runs_to_the_end() {
    let lib = lib();
    let mut program = Program::new();
    push_tagged(&mut program, &lib, "ModuleDef", [0, 0, 0], ZEROS);
    push(&mut program, &lib, "Inc", [0, 0, 0]);
    push(&mut program, &lib, "Inc", [1, 0, 0]);

    let mut vm = new_vm();
    vm.set_program(program).unwrap();
    assert_eq!(vm.program().num_modules(), 1);
    let tid = vm.spawn_thread_with_id(0, 0).unwrap();

    for _ in 0..2 {
        vm.single_process();
    }
    assert_eq!(*working(&vm, tid), buf(&[(0, 1.0), (1, 1.0)]));
    vm.single_process();
    assert!(vm.active_thread_ids().is_empty());
}

#[test]
fn wrapping_module_executes_across_the_seam() {
    // Positions: 0=Inc(0) 1=Inc(1) 2=ModuleDef 3=Inc(2) 4=Inc(3).
    // The sole module covers 3, 4, 0, 1.
    let lib = lib();
    let mut program = Program::new();
    push(&mut program, &lib, "Inc", [0, 0, 0]);
    push(&mut program, &lib, "Inc", [1, 0, 0]);
    push_tagged(&mut program, &lib, "ModuleDef", [0, 0, 0], ZEROS);
    push(&mut program, &lib, "Inc", [2, 0, 0]);
    push(&mut program, &lib, "Inc", [3, 0, 0]);

    let mut vm = new_vm();
    vm.set_program(program).unwrap();
    let tid = vm.spawn_thread_with_id(0, 0).unwrap();

    for _ in 0..4 {
        vm.single_process();
    }
    assert_eq!(
        *working(&vm, tid),
        buf(&[(0, 1.0), (1, 1.0), (2, 1.0), (3, 1.0)])
    );
    // Position 2 is the delimiter again: off the module's edge, so the
    // thread returns.
    vm.single_process();
    assert!(vm.active_thread_ids().is_empty());
}

#[test]
fn tag_dispatch_crosses_modules() {
    // Module 0 (ZEROS): SetMem(0, 3); Call(ONES). Module 1 (ONES):
    // InputToWorking(0, 1); WorkingToOutput(1, 5).
    let lib = lib();
    let mut program = Program::new();
    push_tagged(&mut program, &lib, "ModuleDef", [0, 0, 0], ZEROS);
    push(&mut program, &lib, "SetMem", [0, 3, 0]);
    push_tagged(&mut program, &lib, "Call", [0, 0, 0], ONES);
    push_tagged(&mut program, &lib, "ModuleDef", [0, 0, 0], ONES);
    push(&mut program, &lib, "InputToWorking", [0, 1, 0]);
    push(&mut program, &lib, "WorkingToOutput", [1, 5, 0]);

    let mut vm = new_vm();
    vm.set_program(program).unwrap();
    assert_eq!(vm.program().num_modules(), 2);
    let tid = vm.spawn_thread_with_id(0, 0).unwrap();

    // SetMem, Call, two callee instructions, return.
    for _ in 0..5 {
        vm.single_process();
    }
    assert_eq!(*working(&vm, tid), buf(&[(0, 3.0), (5, 3.0)]));
}

#[test]
fn while_loop_inside_a_wrapped_module() {
    // Positions: 0=Inc(1) 1=Close 2=ModuleDef 3=SetMem(0,2) 4=Countdown(0).
    // Module covers 3, 4, 0, 1: the loop body wraps across the seam.
    let lib = lib();
    let mut program = Program::new();
    push(&mut program, &lib, "Inc", [1, 0, 0]);
    push(&mut program, &lib, "Close", [0, 0, 0]);
    push_tagged(&mut program, &lib, "ModuleDef", [0, 0, 0], ZEROS);
    push(&mut program, &lib, "SetMem", [0, 2, 0]);
    push(&mut program, &lib, "Countdown", [0, 0, 0]);

    let mut vm = new_vm();
    vm.set_program(program).unwrap();
    let tid = vm.spawn_thread_with_id(0, 0).unwrap();

    // SetMem; then each iteration is Countdown (wrapping scan finds the
    // Close at position 1), Inc(1), Close; then the final Countdown skips.
    for _ in 0..8 {
        vm.single_process();
    }
    assert_eq!(*working(&vm, tid), buf(&[(0, 0.0), (1, 2.0)]));
    vm.single_process();
    assert!(vm.active_thread_ids().is_empty());
}

#[test]
fn spawn_by_tag_picks_the_closest_module() {
    let lib = lib();
    let mut program = Program::new();
    push_tagged(&mut program, &lib, "ModuleDef", [0, 0, 0], ZEROS);
    push(&mut program, &lib, "Inc", [0, 0, 0]);
    push_tagged(&mut program, &lib, "ModuleDef", [0, 0, 0], ONES);
    push(&mut program, &lib, "Inc", [1, 0, 0]);

    let mut vm = new_vm();
    vm.set_program(program).unwrap();

    let near_ones = TestTag::new(0xfff0);
    let tid = vm.spawn_thread_with_tag(&near_ones, 0).unwrap();
    let mp = vm
        .thread(tid)
        .unwrap()
        .exec_state()
        .top_call()
        .unwrap()
        .mp()
        .unwrap();
    assert_eq!(mp, 1);

    let matches: Vec<usize> = vm.find_module_match(&near_ones, 2);
    assert_eq!(matches, vec![1, 0]);
}
