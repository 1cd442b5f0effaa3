// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

//! Control-flow instruction behaviors.
//!
//! Block openers read the executing flow's ip *after* the stepper has already
//! advanced it, so the block body starts at the current ip and the opener
//! itself sits at `previous_position(ip)`. Truth is `working[arg0] != 0`;
//! skipping jumps to the end of the block and, when still in-module, one past
//! the `Close`.

use crate::matchbin::MatchPolicy;
use crate::program::{Instruction, ProgramModel};
use crate::vm::{FlowInfo, FlowKind, TagVm};

/// Marks the beginning of a module in linear programs. No effect at runtime.
pub fn module_def<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    _hw: &mut TagVm<P, M>,
    _inst: &Instruction<P::Tag>,
) {
}

fn conditional_open<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
    kind: FlowKind,
    countdown: bool,
) {
    let Some(tid) = hw.current_thread_id() else {
        return;
    };
    let Some((raw_ip, mp)) = hw
        .current_call()
        .and_then(|call| call.top_flow())
        .map(|flow| (flow.ip, flow.mp))
    else {
        return;
    };
    let begin = hw.program().previous_position(mp, raw_ip);
    let ip = hw.program().normalize_position(mp, raw_ip);
    let end = hw.find_end_of_block(mp, ip);

    let test = {
        let Some(call) = hw.current_call_mut() else {
            return;
        };
        *call.memory.access_working(inst.arg(0))
    };
    let skip = if countdown { test <= 0.0 } else { test == 0.0 };
    if skip {
        let advance = hw.program().is_valid_position(mp, end);
        let Some(call) = hw.current_call_mut() else {
            return;
        };
        call.set_ip(if advance { end + 1 } else { end });
        return;
    }
    if countdown {
        if let Some(call) = hw.current_call_mut() {
            *call.memory.access_working(inst.arg(0)) -= 1.0;
        }
    }
    hw.open_flow(tid, FlowInfo { kind, mp, ip, begin, end });
}

pub fn if_branch<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    conditional_open(hw, inst, FlowKind::Basic, false);
}

pub fn while_loop<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    conditional_open(hw, inst, FlowKind::WhileLoop, false);
}

pub fn countdown<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    conditional_open(hw, inst, FlowKind::WhileLoop, true);
}

/// Close the innermost BASIC or WHILE_LOOP flow. A no-op when the top flow is
/// anything else.
pub fn close<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    _inst: &Instruction<P::Tag>,
) {
    let Some(tid) = hw.current_thread_id() else {
        return;
    };
    let kind = hw
        .current_call()
        .and_then(|call| call.top_flow())
        .map(|flow| flow.kind);
    match kind {
        Some(FlowKind::Basic) => hw.close_flow(tid, FlowKind::Basic),
        Some(FlowKind::WhileLoop) => hw.close_flow(tid, FlowKind::WhileLoop),
        _ => {}
    }
}

/// Break out of the nearest loop on the flow stack that is not preceded by a
/// routine or call frame.
pub fn break_loop<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    _inst: &Instruction<P::Tag>,
) {
    let Some(tid) = hw.current_thread_id() else {
        return;
    };
    let Some(call) = hw.current_call() else {
        return;
    };
    let mut found_loop = false;
    for flow in call.flow_stack.iter().rev() {
        match flow.kind {
            FlowKind::Basic => {}
            FlowKind::WhileLoop => {
                found_loop = true;
                break;
            }
            _ => break,
        }
    }
    if !found_loop {
        return;
    }
    // Pop the BASIC frames sitting above the loop, then break the loop.
    loop {
        let kind = hw
            .current_call()
            .and_then(|call| call.top_flow())
            .map(|flow| flow.kind);
        match kind {
            Some(FlowKind::Basic) => {
                if let Some(call) = hw.current_call_mut() {
                    call.flow_stack.pop();
                }
            }
            Some(FlowKind::WhileLoop) => {
                hw.break_flow(tid, FlowKind::WhileLoop);
                break;
            }
            _ => break,
        }
    }
}

/// Call the module best matching `tag0`.
pub fn call<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(tid) = hw.current_thread_id() else {
        return;
    };
    let Some(tag) = inst.tag(0) else {
        return;
    };
    hw.call_module(tid, tag, false);
}

/// Run the module best matching `tag0` as a routine, sharing the current
/// call's memory.
pub fn routine<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(tid) = hw.current_thread_id() else {
        return;
    };
    let Some(tag) = inst.tag(0) else {
        return;
    };
    let matches = hw.find_module_match(tag, 1);
    let Some(&target) = matches.first() else {
        return;
    };
    let span = hw.program().module_span(target);
    hw.open_flow(
        tid,
        FlowInfo {
            kind: FlowKind::Routine,
            mp: target,
            ip: span.entry,
            begin: span.begin,
            end: span.end,
        },
    );
}

/// Return from the nearest routine or call on the flow stack, closing any
/// block flows on the way.
pub fn ret<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    _inst: &Instruction<P::Tag>,
) {
    let Some(tid) = hw.current_thread_id() else {
        return;
    };
    loop {
        let Some(kind) = hw
            .current_call()
            .and_then(|call| call.top_flow())
            .map(|flow| flow.kind)
        else {
            break;
        };
        match kind {
            FlowKind::Call => {
                hw.close_flow(tid, FlowKind::Call);
                hw.return_call(tid);
                break;
            }
            FlowKind::Routine => {
                hw.close_flow(tid, FlowKind::Routine);
                break;
            }
            other => hw.close_flow(tid, other),
        }
    }
}

/// Spawn a new thread on the module best matching `tag0`. The spawned thread
/// inherits the forking call's working memory as input.
pub fn fork<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(from) = hw.current_thread_id() else {
        return;
    };
    let Some(tag) = inst.tag(0) else {
        return;
    };
    let matches = hw.find_module_match(tag, 1);
    let Some(&target) = matches.first() else {
        return;
    };
    let Some(to) = hw.spawn_thread_with_id(target, 0) else {
        return;
    };
    hw.copy_call_memory(from, to);
}

/// Mark the current thread as dead.
pub fn terminate<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    _inst: &Instruction<P::Tag>,
) {
    if let Some(tid) = hw.current_thread_id() {
        hw.terminate_thread(tid);
    }
}
