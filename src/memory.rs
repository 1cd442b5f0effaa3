// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

//! Layered memory model: per-call working/input/output buffers plus a global
//! buffer shared by every thread of a VM instance.
//!
//! Buffers map integer addresses to `f64` values. Absent addresses read as
//! `0.0`; the `access_*` accessors materialize the entry on first touch, which
//! is observable (and relied upon by programs that test uninitialized
//! addresses). `BTreeMap` keeps iteration order deterministic so bulk copies
//! and replays are bit-identical across runs.

use alloc::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Address -> value buffer.
pub type MemBuffer = BTreeMap<i32, f64>;

/// Memory local to one call on a thread's call stack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryState {
    /// Scratch space for intra-call computation.
    pub working: MemBuffer,
    /// Arguments copied from the caller's working memory at call time.
    pub input: MemBuffer,
    /// Results copied back into the caller's working memory at return time.
    pub output: MemBuffer,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set value at given address in working memory. No questions asked.
    pub fn set_working(&mut self, address: i32, value: f64) {
        self.working.insert(address, value);
    }

    /// Set value at given address in input memory. No questions asked.
    pub fn set_input(&mut self, address: i32, value: f64) {
        self.input.insert(address, value);
    }

    /// Set value at given address in output memory. No questions asked.
    pub fn set_output(&mut self, address: i32, value: f64) {
        self.output.insert(address, value);
    }

    /// Value at the given working address, or `0.0` when absent.
    pub fn get_working(&self, address: i32) -> f64 {
        self.working.get(&address).copied().unwrap_or(0.0)
    }

    /// Value at the given input address, or `0.0` when absent.
    pub fn get_input(&self, address: i32) -> f64 {
        self.input.get(&address).copied().unwrap_or(0.0)
    }

    /// Value at the given output address, or `0.0` when absent.
    pub fn get_output(&self, address: i32) -> f64 {
        self.output.get(&address).copied().unwrap_or(0.0)
    }

    /// Mutable handle into working memory, inserting `0.0` when absent.
    pub fn access_working(&mut self, address: i32) -> &mut f64 {
        self.working.entry(address).or_insert(0.0)
    }

    /// Mutable handle into input memory, inserting `0.0` when absent.
    pub fn access_input(&mut self, address: i32) -> &mut f64 {
        self.input.entry(address).or_insert(0.0)
    }

    /// Mutable handle into output memory, inserting `0.0` when absent.
    pub fn access_output(&mut self, address: i32) -> &mut f64 {
        self.output.entry(address).or_insert(0.0)
    }
}

/// Memory model owning the global buffer and the call/return dataflow.
#[derive(Debug, Clone, Default)]
pub struct MemoryModel {
    global: MemBuffer,
}

impl MemoryModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh, empty memory state for a new call.
    pub fn new_state(&self) -> MemoryState {
        MemoryState::new()
    }

    /// Clear the global buffer.
    pub fn reset(&mut self) {
        self.global.clear();
    }

    /// Copy the caller's working memory into the callee's input memory.
    pub fn on_call(&self, caller: &MemoryState, callee: &mut MemoryState) {
        for (&address, &value) in &caller.working {
            callee.set_input(address, value);
        }
    }

    /// Copy the returning call's output memory into the caller's working
    /// memory, overwriting existing addresses.
    pub fn on_return(&self, returning: &MemoryState, caller: &mut MemoryState) {
        for (&address, &value) in &returning.output {
            caller.set_working(address, value);
        }
    }

    /// Value at the given global address, or `0.0` when absent.
    pub fn get_global(&self, address: i32) -> f64 {
        self.global.get(&address).copied().unwrap_or(0.0)
    }

    /// Set value at given global address.
    pub fn set_global(&mut self, address: i32, value: f64) {
        self.global.insert(address, value);
    }

    /// Mutable handle into the global buffer, inserting `0.0` when absent.
    pub fn access_global(&mut self, address: i32) -> &mut f64 {
        self.global.entry(address).or_insert(0.0)
    }

    pub fn global(&self) -> &MemBuffer {
        &self.global
    }

    pub fn global_mut(&mut self) -> &mut MemBuffer {
        &mut self.global
    }
}
