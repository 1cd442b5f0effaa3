// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

// Instruction library - id <-> name <-> behavior registry with property
// flags, plus the stock instruction set.

pub mod basic;
pub mod ctrl;
pub mod mem;
pub mod regulation;

mod library;

pub use library::{
    BeforeInstFn, HookKey, InstProperty, InstProps, InstructionDef, InstructionLibrary, RunFn,
};

use crate::matchbin::MatchPolicy;
use crate::program::ProgramModel;

/// Build a library containing the full default instruction set.
///
/// Ids are assigned in registration order, so two libraries built by this
/// function agree on every id. `Terminal` uses its default `[0, 1]` range;
/// register `basic::terminal` with other rational parameters for a different
/// range.
pub fn default_instruction_library<P, M>() -> InstructionLibrary<P, M>
where
    P: ProgramModel,
    M: MatchPolicy<P::Tag>,
{
    let mut lib = InstructionLibrary::new();

    lib.add_inst("Nop", basic::nop, "No operation.", InstProps::NONE);
    lib.add_inst(
        "Inc",
        basic::inc,
        "Increment working memory at [arg0].",
        InstProps::NONE,
    );
    lib.add_inst(
        "Dec",
        basic::dec,
        "Decrement working memory at [arg0].",
        InstProps::NONE,
    );
    lib.add_inst(
        "Not",
        basic::not,
        "Logical not. [arg0] = 1 if ([arg0] == 0) else 0",
        InstProps::NONE,
    );
    lib.add_inst("Add", basic::add, "[arg2] = [arg0] + [arg1]", InstProps::NONE);
    lib.add_inst("Sub", basic::sub, "[arg2] = [arg0] - [arg1]", InstProps::NONE);
    lib.add_inst(
        "Mult",
        basic::mult,
        "[arg2] = [arg0] * [arg1]",
        InstProps::NONE,
    );
    lib.add_inst(
        "Div",
        basic::div,
        "[arg2] = [arg0] / [arg1]. No-op when [arg1] is 0.",
        InstProps::NONE,
    );
    lib.add_inst(
        "Mod",
        basic::modulo,
        "[arg2] = [arg0] % [arg1] over 64-bit integers. No-op when [arg1] truncates to 0.",
        InstProps::NONE,
    );
    lib.add_inst("TestEqu", basic::test_equ, "Test if equals", InstProps::NONE);
    lib.add_inst(
        "TestNEqu",
        basic::test_nequ,
        "Test if not equals",
        InstProps::NONE,
    );
    lib.add_inst(
        "TestLess",
        basic::test_less,
        "Test if less than",
        InstProps::NONE,
    );
    lib.add_inst(
        "TestLessEqu",
        basic::test_less_equ,
        "Test if less than or equal to",
        InstProps::NONE,
    );
    lib.add_inst(
        "TestGreater",
        basic::test_greater,
        "Test if greater than",
        InstProps::NONE,
    );
    lib.add_inst(
        "TestGreaterEqu",
        basic::test_greater_equ,
        "Test if greater than or equal to",
        InstProps::NONE,
    );
    lib.add_inst(
        "Terminal",
        basic::terminal::<P, M, 1, 1, 0, 1>,
        "working[arg0] = tag0 interpreted as a double.",
        InstProps::NONE,
    );

    lib.add_inst(
        "SetMem",
        mem::set_mem,
        "working[arg0] = arg1",
        InstProps::NONE,
    );
    lib.add_inst(
        "CopyMem",
        mem::copy_mem,
        "working[arg1] = working[arg0]",
        InstProps::NONE,
    );
    lib.add_inst(
        "SwapMem",
        mem::swap_mem,
        "Swap working[arg0] and working[arg1]",
        InstProps::NONE,
    );
    lib.add_inst(
        "InputToWorking",
        mem::input_to_working,
        "working[arg1] = input[arg0]",
        InstProps::NONE,
    );
    lib.add_inst(
        "WorkingToOutput",
        mem::working_to_output,
        "output[arg1] = working[arg0]",
        InstProps::NONE,
    );
    lib.add_inst(
        "WorkingToGlobal",
        mem::working_to_global,
        "global[arg1] = working[arg0]",
        InstProps::NONE,
    );
    lib.add_inst(
        "GlobalToWorking",
        mem::global_to_working,
        "working[arg1] = global[arg0]",
        InstProps::NONE,
    );
    lib.add_inst(
        "FullWorkingToGlobal",
        mem::full_working_to_global,
        "Copy entire working memory buffer into global memory, overwriting conflicts.",
        InstProps::NONE,
    );
    lib.add_inst(
        "FullGlobalToWorking",
        mem::full_global_to_working,
        "Copy entire global memory buffer into working memory, overwriting conflicts.",
        InstProps::NONE,
    );

    lib.add_inst(
        "ModuleDef",
        ctrl::module_def,
        "Mark the beginning of a module.",
        InstProps::just(InstProperty::Module),
    );
    lib.add_inst(
        "If",
        ctrl::if_branch,
        "If statement. Defines the beginning of an if control flow block.",
        InstProps::just(InstProperty::BlockDef),
    );
    lib.add_inst(
        "While",
        ctrl::while_loop,
        "Marks the beginning of a while loop.",
        InstProps::just(InstProperty::BlockDef),
    );
    lib.add_inst(
        "Countdown",
        ctrl::countdown,
        "Countdown loop. Loop until [arg0] memory value <= 0.",
        InstProps::just(InstProperty::BlockDef),
    );
    lib.add_inst(
        "Close",
        ctrl::close,
        "Mark the end of basic and loop control flow.",
        InstProps::just(InstProperty::BlockClose),
    );
    lib.add_inst(
        "Break",
        ctrl::break_loop,
        "Break out of nearest loop in the flow stack (that isn't preceded by a routine or call).",
        InstProps::NONE,
    );
    lib.add_inst(
        "Call",
        ctrl::call,
        "Call a module specified by tag0.",
        InstProps::NONE,
    );
    lib.add_inst(
        "Routine",
        ctrl::routine,
        "Call a module specified by tag0 as a routine (shares local memory with current call).",
        InstProps::NONE,
    );
    lib.add_inst(
        "Return",
        ctrl::ret,
        "Return from nearest routine in the flow stack. Or, if no routines, the current call.",
        InstProps::NONE,
    );
    lib.add_inst(
        "Fork",
        ctrl::fork,
        "Fork a new thread with a function call specified by tag0",
        InstProps::NONE,
    );
    lib.add_inst(
        "Terminate",
        ctrl::terminate,
        "Mark the current thread as dead.",
        InstProps::NONE,
    );

    lib.add_inst(
        "SetRegulator",
        regulation::set_regulator,
        "Set the regulator of the module specified by tag0 to working[arg0]",
        InstProps::NONE,
    );
    lib.add_inst(
        "SetOwnRegulator",
        regulation::set_own_regulator,
        "Set the regulator of the currently executing module to working[arg0]",
        InstProps::NONE,
    );
    lib.add_inst(
        "AdjRegulator",
        regulation::adj_regulator,
        "Adjust the regulator of the module specified by tag0 by working[arg0]",
        InstProps::NONE,
    );
    lib.add_inst(
        "AdjOwnRegulator",
        regulation::adj_own_regulator,
        "Adjust the regulator of the currently executing module by working[arg0]",
        InstProps::NONE,
    );
    lib.add_inst(
        "IncRegulator",
        regulation::inc_regulator,
        "Increment the regulator of the module specified by tag0 by 1",
        InstProps::NONE,
    );
    lib.add_inst(
        "IncOwnRegulator",
        regulation::inc_own_regulator,
        "Increment the regulator of the currently executing module by 1",
        InstProps::NONE,
    );
    lib.add_inst(
        "DecRegulator",
        regulation::dec_regulator,
        "Decrement the regulator of the module specified by tag0 by 1",
        InstProps::NONE,
    );
    lib.add_inst(
        "DecOwnRegulator",
        regulation::dec_own_regulator,
        "Decrement the regulator of the currently executing module by 1",
        InstProps::NONE,
    );
    lib.add_inst(
        "ClearRegulator",
        regulation::clear_regulator,
        "Set regulator of the module specified by tag0 to 0",
        InstProps::NONE,
    );
    lib.add_inst(
        "ClearOwnRegulator",
        regulation::clear_own_regulator,
        "Set regulator of the currently executing module to 0",
        InstProps::NONE,
    );
    lib.add_inst(
        "SenseRegulator",
        regulation::sense_regulator,
        "working[arg0] = regulator value of the module specified by tag0",
        InstProps::NONE,
    );
    lib.add_inst(
        "SenseOwnRegulator",
        regulation::sense_own_regulator,
        "working[arg0] = regulator value of the currently executing module",
        InstProps::NONE,
    );

    lib
}
