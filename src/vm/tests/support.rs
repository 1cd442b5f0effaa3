// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

//! Shared fixtures for the VM tests.

use alloc::vec;
use alloc::vec::Vec;

use crate::inst::{default_instruction_library, InstructionLibrary};
use crate::matchbin::HammingPolicy;
use crate::memory::MemBuffer;
use crate::program::{Function, FunctionsProgram};
use crate::tag::BitTag;
use crate::vm::{TagVm, ThreadId};

pub(crate) type TestTag = BitTag<16>;
pub(crate) type TestProgram = FunctionsProgram<TestTag>;
pub(crate) type TestVm = TagVm<TestProgram, HammingPolicy>;

pub(crate) const ZEROS: u128 = 0x0000;
pub(crate) const ONES: u128 = 0xffff;

pub(crate) fn tag(bits: u128) -> TestTag {
    TestTag::new(bits)
}

pub(crate) fn new_vm() -> TestVm {
    TagVm::new(default_instruction_library(), HammingPolicy::default(), 2)
}

pub(crate) fn buf(pairs: &[(i32, f64)]) -> MemBuffer {
    pairs.iter().copied().collect()
}

/// Builder for function-shaped test programs.
pub(crate) struct ProgramBuilder {
    lib: InstructionLibrary<TestProgram, HammingPolicy>,
    program: TestProgram,
}

impl ProgramBuilder {
    pub(crate) fn new() -> Self {
        Self {
            lib: default_instruction_library(),
            program: FunctionsProgram::new(),
        }
    }

    /// Start a new function tagged with `tag_bits`.
    pub(crate) fn func(mut self, tag_bits: u128) -> Self {
        self.program.push_function(Function::new(vec![tag(tag_bits)]));
        self
    }

    /// Append a tagless instruction to the current function.
    pub(crate) fn op(mut self, name: &str, args: [i32; 3]) -> Self {
        self.program
            .push_inst_named(&self.lib, name, args.to_vec(), vec![])
            .unwrap();
        self
    }

    /// Append an instruction carrying one tag to the current function.
    pub(crate) fn op_tag(mut self, name: &str, args: [i32; 3], tag_bits: u128) -> Self {
        self.program
            .push_inst_named(&self.lib, name, args.to_vec(), vec![tag(tag_bits)])
            .unwrap();
        self
    }

    pub(crate) fn build(self) -> TestProgram {
        self.program
    }
}

/// Load a program and spawn one thread on module 0.
pub(crate) fn load_and_spawn(vm: &mut TestVm, program: TestProgram) -> ThreadId {
    vm.set_program(program).unwrap();
    vm.spawn_thread_with_id(0, 0).unwrap()
}

pub(crate) fn working(vm: &TestVm, tid: ThreadId) -> &MemBuffer {
    &vm.thread(tid)
        .unwrap()
        .exec_state()
        .top_call()
        .unwrap()
        .memory
        .working
}

pub(crate) fn set_working(vm: &mut TestVm, tid: ThreadId, address: i32, value: f64) {
    vm.thread_mut(tid)
        .unwrap()
        .exec_state_mut()
        .top_call_mut()
        .unwrap()
        .memory
        .set_working(address, value);
}

pub(crate) fn call_depth(vm: &TestVm, tid: ThreadId) -> usize {
    vm.thread(tid).unwrap().exec_state().call_stack.len()
}

pub(crate) fn run(vm: &mut TestVm, cycles: usize) {
    for _ in 0..cycles {
        vm.single_process();
    }
}

pub(crate) fn active_priorities(vm: &TestVm) -> Vec<i32> {
    vm.active_thread_ids()
        .iter()
        .map(|&tid| vm.thread(tid).unwrap().priority())
        .collect()
}
