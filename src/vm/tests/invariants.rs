// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

//! Property-style tests: random program soup, bookkeeping invariants, cache
//! consistency, and seeded determinism.

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use rand::rngs::SmallRng;
use rand::{RngExt, SeedableRng};

use super::support::{new_vm, tag, ProgramBuilder, TestProgram, TestTag, TestVm, ZEROS};
use crate::inst::default_instruction_library;
use crate::matchbin::HammingPolicy;
use crate::program::{Function, FunctionsProgram, Instruction, ProgramModel};
use crate::tag::Tag;

fn random_program(seed: u64) -> TestProgram {
    let lib = default_instruction_library::<TestProgram, HammingPolicy>();
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut program = FunctionsProgram::new();
    for _ in 0..rng.random_range(1..=4usize) {
        let mut function = Function::new(vec![TestTag::from_rng(&mut rng)]);
        for _ in 0..rng.random_range(1..=16usize) {
            let id = rng.random_range(0..lib.len());
            let args = vec![
                rng.random_range(0..16i32),
                rng.random_range(0..16i32),
                rng.random_range(0..16i32),
            ];
            function.push_inst(Instruction::new(id, args, vec![TestTag::from_rng(&mut rng)]));
        }
        program.push_function(function);
    }
    program
}

fn assert_exec_invariants(vm: &TestVm) {
    let live: Vec<usize> = vm
        .active_thread_ids()
        .iter()
        .chain(vm.pending_thread_ids())
        .copied()
        .collect();
    for tid in live {
        let thread = vm.thread(tid).unwrap();
        let stack = &thread.exec_state().call_stack;
        assert!(!stack.is_empty(), "live thread {tid} has an empty call stack");
        assert!(stack.len() <= vm.max_call_depth());
        for call in stack {
            assert!(call.is_flow(), "live call with an empty flow stack");
            for flow in &call.flow_stack {
                assert!(flow.mp < vm.program().num_modules());
                assert!(flow.ip <= vm.program().module_len(flow.mp));
            }
        }
    }
}

#[test]
fn random_soup_preserves_invariants() {
    for seed in [3u64, 17, 99, 2024] {
        let mut vm = new_vm();
        let program = random_program(seed);
        let modules = program.num_modules();
        vm.set_program(program).unwrap();

        for slot in 0..4 {
            vm.spawn_thread_with_id(slot % modules, slot as i32 - 1);
        }
        for cycle in 0..100 {
            vm.single_process();
            assert!(vm.validate_thread_state(), "seed {seed} cycle {cycle}");
            assert_exec_invariants(&vm);
            if cycle % 7 == 0 {
                vm.spawn_thread_with_id(cycle % modules, 1);
            }
        }
    }
}

fn soup_fingerprint(seed: u64) -> String {
    let mut vm = new_vm();
    let program = random_program(seed);
    let modules = program.num_modules();
    vm.set_program(program).unwrap();
    for slot in 0..4 {
        vm.spawn_thread_with_id(slot % modules, slot as i32 - 1);
    }
    for cycle in 0..60 {
        vm.single_process();
        if cycle % 5 == 0 {
            vm.spawn_thread_with_id(cycle % modules, 2);
        }
    }
    let threads: Vec<String> = vm
        .active_thread_ids()
        .iter()
        .chain(vm.pending_thread_ids())
        .map(|&tid| format!("{tid}:{:?}", vm.thread(tid).unwrap().exec_state()))
        .collect();
    format!(
        "{:?}|{:?}|{:?}|{:?}",
        vm.active_thread_ids(),
        vm.pending_thread_ids(),
        threads,
        vm.memory().global()
    )
}

#[test]
fn identical_seeds_replay_bit_identically() {
    for seed in [5u64, 11, 42] {
        assert_eq!(soup_fingerprint(seed), soup_fingerprint(seed));
    }
}

#[test]
fn match_results_are_stable_across_cycles() {
    let program = ProgramBuilder::new()
        .func(ZEROS)
        .op("Nop", [0, 0, 0])
        .op("Nop", [0, 0, 0])
        .func(0x00ff)
        .op("Nop", [0, 0, 0])
        .func(0xff00)
        .op("Nop", [0, 0, 0])
        .build();
    let mut vm = new_vm();
    vm.set_program(program).unwrap();

    let query = tag(0x000f);
    let first = vm.find_module_match(&query, 3);
    assert_eq!(first, vec![0, 1, 2]);

    vm.spawn_thread_with_id(0, 0).unwrap();
    for _ in 0..5 {
        vm.single_process();
        assert_eq!(vm.find_module_match(&query, 3), first);
    }

    // A fresh VM over the same program ranks identically.
    let mut other = new_vm();
    other
        .set_program(
            ProgramBuilder::new()
                .func(ZEROS)
                .op("Nop", [0, 0, 0])
                .op("Nop", [0, 0, 0])
                .func(0x00ff)
                .op("Nop", [0, 0, 0])
                .func(0xff00)
                .op("Nop", [0, 0, 0])
                .build(),
        )
        .unwrap();
    assert_eq!(other.find_module_match(&query, 3), first);
}

#[test]
fn dead_threads_never_linger_past_the_cycle() {
    let program = ProgramBuilder::new()
        .func(ZEROS)
        .op("Inc", [0, 0, 0])
        .build();
    let mut vm = new_vm();
    vm.set_program(program).unwrap();
    for _ in 0..3 {
        vm.spawn_thread_with_id(0, 0).unwrap();
    }

    // One instruction plus the off-edge return: every thread is gone after
    // two cycles, and no slot leaks.
    vm.single_process();
    vm.single_process();
    assert!(vm.active_thread_ids().is_empty());
    assert_eq!(vm.unused_thread_ids().len(), vm.thread_capacity());
    assert!(vm.validate_thread_state());
}
