// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(unknown_lints)]
// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]
// We'll default to building for no_std - use core, alloc instead of std.
#![no_std]

extern crate alloc;

// Import std crate if building with std support.
// We don't import types or macros from std.
// As a result, types and macros from std must be qualified via `std::`
// making dependencies on std easier to spot.
#[cfg(any(feature = "std", test))]
extern crate std;

pub mod events;
pub mod inst;
pub mod matchbin;
pub mod memory;
pub mod program;
pub mod tag;
pub mod vm;

#[cfg(feature = "arc")]
pub(crate) use alloc::sync::Arc as Rc;

#[cfg(not(feature = "arc"))]
pub(crate) use alloc::rc::Rc;

pub use events::{spawn_on_event, Event, EventDef, EventHandlerFn, EventLibrary};
pub use inst::{
    default_instruction_library, HookKey, InstProperty, InstProps, InstructionDef,
    InstructionLibrary,
};
pub use matchbin::{HammingPolicy, MatchBin, MatchPolicy};
pub use memory::{MemBuffer, MemoryModel, MemoryState};
pub use program::{
    Function, FunctionsProgram, Instruction, LinearProgram, ModuleSpan, ProgramModel,
};
pub use tag::{BitTag, Tag};
pub use vm::{
    CallState, ExecState, FlowControl, FlowInfo, FlowKind, TagVm, Thread, ThreadId, ThreadStatus,
    VmError,
};

/// VM over a program of tagged functions, matched by Hamming similarity.
pub type FunctionsVm<const W: usize> = TagVm<FunctionsProgram<BitTag<W>>, HammingPolicy>;

/// VM over a flat, `ModuleDef`-delimited program, matched by Hamming similarity.
pub type LinearVm<const W: usize> = TagVm<LinearProgram<BitTag<W>>, HammingPolicy>;
