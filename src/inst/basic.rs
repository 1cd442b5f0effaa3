// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

//! Arithmetic, logic, and comparison instruction behaviors.
//!
//! Every behavior reads and writes the working memory of the executing
//! thread's top call state. Division and modulo by zero are silent no-ops.

use crate::matchbin::MatchPolicy;
use crate::program::{Instruction, ProgramModel};
use crate::tag::Tag;
use crate::vm::TagVm;

pub fn nop<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    _hw: &mut TagVm<P, M>,
    _inst: &Instruction<P::Tag>,
) {
}

pub fn inc<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(call) = hw.current_call_mut() else {
        return;
    };
    *call.memory.access_working(inst.arg(0)) += 1.0;
}

pub fn dec<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(call) = hw.current_call_mut() else {
        return;
    };
    *call.memory.access_working(inst.arg(0)) -= 1.0;
}

pub fn not<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(call) = hw.current_call_mut() else {
        return;
    };
    let value = call.memory.get_working(inst.arg(0));
    call.memory
        .set_working(inst.arg(0), f64::from(u8::from(value == 0.0)));
}

macro_rules! binary_op {
    ($name:ident, $op:tt) => {
        pub fn $name<P: ProgramModel, M: MatchPolicy<P::Tag>>(
            hw: &mut TagVm<P, M>,
            inst: &Instruction<P::Tag>,
        ) {
            let Some(call) = hw.current_call_mut() else {
                return;
            };
            let lhs = *call.memory.access_working(inst.arg(0));
            let rhs = *call.memory.access_working(inst.arg(1));
            call.memory.set_working(inst.arg(2), lhs $op rhs);
        }
    };
}

binary_op!(add, +);
binary_op!(sub, -);
binary_op!(mult, *);

pub fn div<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(call) = hw.current_call_mut() else {
        return;
    };
    let denom = *call.memory.access_working(inst.arg(1));
    if denom == 0.0 {
        return;
    }
    let num = *call.memory.access_working(inst.arg(0));
    call.memory.set_working(inst.arg(2), num / denom);
}

pub fn modulo<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(call) = hw.current_call_mut() else {
        return;
    };
    let denom = *call.memory.access_working(inst.arg(1)) as i64;
    if denom == 0 {
        return;
    }
    let num = *call.memory.access_working(inst.arg(0)) as i64;
    call.memory.set_working(inst.arg(2), (num % denom) as f64);
}

macro_rules! comparison_op {
    ($name:ident, $op:tt) => {
        pub fn $name<P: ProgramModel, M: MatchPolicy<P::Tag>>(
            hw: &mut TagVm<P, M>,
            inst: &Instruction<P::Tag>,
        ) {
            let Some(call) = hw.current_call_mut() else {
                return;
            };
            let lhs = *call.memory.access_working(inst.arg(0));
            let rhs = *call.memory.access_working(inst.arg(1));
            call.memory
                .set_working(inst.arg(2), f64::from(u8::from(lhs $op rhs)));
        }
    };
}

comparison_op!(test_equ, ==);
comparison_op!(test_nequ, !=);
comparison_op!(test_less, <);
comparison_op!(test_less_equ, <=);
comparison_op!(test_greater, >);
comparison_op!(test_greater_equ, >=);

/// `working[arg0] = tag0` projected onto `[MIN, MAX]`, with the range
/// expressed as compile-time rationals.
pub fn terminal<
    P: ProgramModel,
    M: MatchPolicy<P::Tag>,
    const MAX_NUM: i64,
    const MAX_DEN: i64,
    const MIN_NUM: i64,
    const MIN_DEN: i64,
>(
    hw: &mut TagVm<P, M>,
    inst: &Instruction<P::Tag>,
) {
    let Some(tag) = inst.tag(0) else {
        return;
    };
    let bits = tag.size_bits();
    if bits == 0 || bits > 128 {
        return;
    }
    let max = MAX_NUM as f64 / MAX_DEN as f64;
    let min = MIN_NUM as f64 / MIN_DEN as f64;
    let tag_max = (u128::MAX >> (128 - bits)) as f64;
    let value = (tag.as_integer() as f64 / tag_max) * (max - min) - min;
    let Some(call) = hw.current_call_mut() else {
        return;
    };
    call.memory.set_working(inst.arg(0), value);
}
