// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

//! Memory-movement instruction behaviors: within working memory, across the
//! per-call buffers, and between working memory and the global buffer.

use crate::matchbin::MatchPolicy;
use crate::program::{Instruction, ProgramModel};
use crate::vm::TagVm;

pub fn set_mem<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(call) = hw.current_call_mut() else {
        return;
    };
    call.memory.set_working(inst.arg(0), f64::from(inst.arg(1)));
}

pub fn copy_mem<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(call) = hw.current_call_mut() else {
        return;
    };
    let value = *call.memory.access_working(inst.arg(0));
    call.memory.set_working(inst.arg(1), value);
}

pub fn swap_mem<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(call) = hw.current_call_mut() else {
        return;
    };
    let a = *call.memory.access_working(inst.arg(0));
    let b = *call.memory.access_working(inst.arg(1));
    call.memory.set_working(inst.arg(0), b);
    call.memory.set_working(inst.arg(1), a);
}

pub fn input_to_working<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(call) = hw.current_call_mut() else {
        return;
    };
    let value = *call.memory.access_input(inst.arg(0));
    call.memory.set_working(inst.arg(1), value);
}

pub fn working_to_output<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(call) = hw.current_call_mut() else {
        return;
    };
    let value = *call.memory.access_working(inst.arg(0));
    call.memory.set_output(inst.arg(1), value);
}

pub fn working_to_global<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(call) = hw.current_call_mut() else {
        return;
    };
    let value = *call.memory.access_working(inst.arg(0));
    hw.memory_mut().set_global(inst.arg(1), value);
}

pub fn global_to_working<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let value = *hw.memory_mut().access_global(inst.arg(0));
    let Some(call) = hw.current_call_mut() else {
        return;
    };
    call.memory.set_working(inst.arg(1), value);
}

/// Copy the entire working memory buffer into global memory, overwriting
/// conflicts.
pub fn full_working_to_global<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    _inst: &Instruction<P::Tag>,
) {
    let Some(call) = hw.current_call_mut() else {
        return;
    };
    let working = call.memory.working.clone();
    hw.memory_mut().global_mut().extend(working);
}

/// Copy the entire global memory buffer into working memory, overwriting
/// conflicts.
pub fn full_global_to_working<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    _inst: &Instruction<P::Tag>,
) {
    let global = hw.memory().global().clone();
    let Some(call) = hw.current_call_mut() else {
        return;
    };
    call.memory.working.extend(global);
}
