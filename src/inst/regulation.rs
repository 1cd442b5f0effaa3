// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

//! Regulation instruction behaviors.
//!
//! The "by tag" variants resolve their target with a *raw* match so that
//! regulation decisions are not themselves biased by regulators. The "own"
//! variants act on the module the executing flow is in, bypassing tag lookup
//! entirely. Positive regulator values down-regulate a module, negative
//! values up-regulate it.

use crate::matchbin::MatchPolicy;
use crate::program::{Instruction, ProgramModel};
use crate::vm::TagVm;

fn raw_target<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) -> Option<usize> {
    let tag = inst.tag(0)?;
    hw.find_module_match_raw(tag, 1).first().copied()
}

fn own_module<P: ProgramModel, M: MatchPolicy<P::Tag>>(hw: &TagVm<P, M>) -> Option<usize> {
    hw.current_call()?.top_flow().map(|flow| flow.mp)
}

pub fn set_regulator<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(target) = raw_target(hw, inst) else {
        return;
    };
    let Some(call) = hw.current_call_mut() else {
        return;
    };
    let value = *call.memory.access_working(inst.arg(0));
    hw.matchbin_mut().set_regulator(target, value);
}

pub fn set_own_regulator<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(target) = own_module(hw) else {
        return;
    };
    let Some(call) = hw.current_call_mut() else {
        return;
    };
    let value = *call.memory.access_working(inst.arg(0));
    hw.matchbin_mut().set_regulator(target, value);
}

pub fn adj_regulator<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(target) = raw_target(hw, inst) else {
        return;
    };
    let Some(call) = hw.current_call_mut() else {
        return;
    };
    let delta = *call.memory.access_working(inst.arg(0));
    hw.matchbin_mut().adj_regulator(target, delta);
}

pub fn adj_own_regulator<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(target) = own_module(hw) else {
        return;
    };
    let Some(call) = hw.current_call_mut() else {
        return;
    };
    let delta = *call.memory.access_working(inst.arg(0));
    hw.matchbin_mut().adj_regulator(target, delta);
}

pub fn inc_regulator<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(target) = raw_target(hw, inst) else {
        return;
    };
    hw.matchbin_mut().adj_regulator(target, 1.0);
}

pub fn inc_own_regulator<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    _inst: &Instruction<P::Tag>,
) {
    let Some(target) = own_module(hw) else {
        return;
    };
    hw.matchbin_mut().adj_regulator(target, 1.0);
}

pub fn dec_regulator<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(target) = raw_target(hw, inst) else {
        return;
    };
    hw.matchbin_mut().adj_regulator(target, -1.0);
}

pub fn dec_own_regulator<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    _inst: &Instruction<P::Tag>,
) {
    let Some(target) = own_module(hw) else {
        return;
    };
    hw.matchbin_mut().adj_regulator(target, -1.0);
}

pub fn clear_regulator<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(target) = raw_target(hw, inst) else {
        return;
    };
    hw.matchbin_mut().set_regulator(target, 0.0);
}

pub fn clear_own_regulator<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    _inst: &Instruction<P::Tag>,
) {
    let Some(target) = own_module(hw) else {
        return;
    };
    hw.matchbin_mut().set_regulator(target, 0.0);
}

pub fn sense_regulator<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(target) = raw_target(hw, inst) else {
        return;
    };
    let value = hw.matchbin().view_regulator(target);
    let Some(call) = hw.current_call_mut() else {
        return;
    };
    call.memory.set_working(inst.arg(0), value);
}

pub fn sense_own_regulator<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(target) = own_module(hw) else {
        return;
    };
    let value = hw.matchbin().view_regulator(target);
    let Some(call) = hw.current_call_mut() else {
        return;
    };
    call.memory.set_working(inst.arg(0), value);
}
