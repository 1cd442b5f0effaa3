// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

use thiserror::Error;

/// Programmatic misuse of the VM API.
///
/// Program-level mis-execution (empty-module calls, unmatched tags, stray
/// block closers, call-depth overflow) is deliberately *not* represented
/// here: the VM tolerates arbitrary programs and treats those as silent
/// no-ops.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("Instruction id {id} at module {mp} position {ip} is not in the instruction library")]
    UnknownInstruction { id: usize, mp: usize, ip: usize },

    #[error("Thread capacity {requested} is below the active thread limit {max_active}")]
    CapacityBelowActiveLimit { requested: usize, max_active: usize },

    #[error("Active thread limit {requested} exceeds the thread capacity {capacity}")]
    ActiveLimitExceedsCapacity { requested: usize, capacity: usize },

    #[error("Cannot resize the thread pool while {live} threads are live")]
    ThreadPoolBusy { live: usize },
}

pub type Result<T> = core::result::Result<T, VmError>;
