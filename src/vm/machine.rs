// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

#![allow(missing_debug_implementations)] // VM structs are not debug printed

use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec::Vec;

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::events::{Event, EventLibrary};
use crate::inst::{HookKey, InstProperty, InstructionLibrary};
use crate::matchbin::{MatchBin, MatchPolicy};
use crate::memory::MemoryModel;
use crate::program::ProgramModel;
use crate::tag::Tag;
use crate::Rc;

use super::errors::{Result, VmError};
use super::flow::FlowControl;
use super::state::CallState;
use super::threads::{Thread, ThreadId};

pub const DEFAULT_THREAD_CAPACITY: usize = 64;
pub const DEFAULT_ACTIVE_LIMIT: usize = 64;
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// The tag-dispatch virtual machine.
///
/// Hosts a pool of cooperatively scheduled logical threads executing one
/// shared program. Generic over the program shape and the tag-match policy.
pub struct TagVm<P: ProgramModel, M: MatchPolicy<P::Tag>> {
    /// The installed program. Shared with in-flight dispatch, never mutated
    /// in place.
    pub(crate) program: Rc<P>,

    /// Instruction registry used for dispatch and block scanning.
    pub(crate) inst_lib: InstructionLibrary<P, M>,

    /// Event registry consulted when queued events are dispatched.
    pub(crate) event_lib: EventLibrary<P, M>,

    /// Global buffer and call/return dataflow.
    pub(crate) memory: MemoryModel,

    /// Regulated tag-match store over the program's module tags.
    pub(crate) matchbin: MatchBin<P::Tag, M>,

    /// Set when the match store no longer reflects the program's modules;
    /// rebuilt lazily before the next dispatch.
    pub(crate) matchbin_dirty: bool,

    /// Seeded random source shared by the VM's consumers.
    pub(crate) rng: SmallRng,

    /// Thread slot pool, fixed capacity.
    pub(crate) threads: Vec<Thread>,

    /// Ordered execution list for the current cycle.
    pub(crate) active_ids: Vec<ThreadId>,

    /// Spawned threads awaiting admission, in spawn order.
    pub(crate) pending_ids: Vec<ThreadId>,

    /// Free slots.
    pub(crate) unused_ids: Vec<ThreadId>,

    /// Events queued for dispatch at the top of the next step-cycle.
    pub(crate) event_queue: VecDeque<Event<P::Tag>>,

    /// Thread currently executing an instruction, if any.
    pub(crate) cur_thread: Option<ThreadId>,

    /// Cap on per-thread call stack growth. Calls beyond it are silently
    /// dropped.
    pub(crate) max_call_depth: usize,

    /// Cap on concurrently active threads.
    pub(crate) max_active: usize,

    /// Handler trios for user-registered flow kinds.
    pub(crate) custom_flows: BTreeMap<u32, FlowControl<P, M>>,
}

impl<P: ProgramModel, M: MatchPolicy<P::Tag>> TagVm<P, M> {
    /// Create a VM with the given instruction set, match policy, and RNG
    /// seed.
    pub fn new(inst_lib: InstructionLibrary<P, M>, policy: M, seed: u64) -> Self {
        let mut vm = Self {
            program: Rc::new(P::default()),
            inst_lib,
            event_lib: EventLibrary::new(),
            memory: MemoryModel::new(),
            matchbin: MatchBin::new(policy),
            matchbin_dirty: false,
            rng: SmallRng::seed_from_u64(seed),
            threads: Vec::new(),
            active_ids: Vec::new(),
            pending_ids: Vec::new(),
            unused_ids: Vec::new(),
            event_queue: VecDeque::new(),
            cur_thread: None,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_active: DEFAULT_ACTIVE_LIMIT,
            custom_flows: BTreeMap::new(),
        };
        vm.resize_thread_pool(DEFAULT_THREAD_CAPACITY);
        vm
    }

    /// Install a program: validate it, reset all hardware state, and rebuild
    /// the match store.
    pub fn set_program(&mut self, program: P) -> Result<()> {
        let mut program = program;
        program.prepare(&|id| self.inst_lib.has_property(id, InstProperty::Module));
        if let Some((mp, ip, id)) =
            program.find_unknown_instruction(&|id| id < self.inst_lib.len())
        {
            return Err(VmError::UnknownInstruction { id, mp, ip });
        }
        self.program = Rc::new(program);
        self.reset();
        // Regulators die with the old program; the store refills on the next
        // dispatch.
        self.matchbin.clear();
        self.matchbin_dirty = true;
        Ok(())
    }

    /// Reset hardware state: threads, global memory, and queued events. The
    /// program and the match store's regulators stay put.
    pub fn reset(&mut self) {
        let capacity = self.threads.len();
        for thread in &mut self.threads {
            thread.clear();
        }
        self.active_ids.clear();
        self.pending_ids.clear();
        self.unused_ids = (0..capacity).rev().collect();
        self.event_queue.clear();
        self.cur_thread = None;
        self.memory.reset();
    }

    /// Rebuild the match store from the program's module tags.
    pub(crate) fn reset_matchbin(&mut self) {
        let program = Rc::clone(&self.program);
        self.matchbin.clear();
        for mp in 0..program.num_modules() {
            if let Some(tag) = program.module_tag(mp) {
                self.matchbin.set(mp, tag.clone());
            }
        }
        self.matchbin_dirty = false;
    }

    /// Up to `n` module ids ordered by regulated similarity to `tag`.
    pub fn find_module_match(&mut self, tag: &P::Tag, n: usize) -> Vec<usize> {
        if self.matchbin_dirty {
            self.reset_matchbin();
        }
        self.matchbin.match_n(tag, n)
    }

    /// Up to `n` module ids ordered by raw similarity, ignoring regulators.
    pub fn find_module_match_raw(&mut self, tag: &P::Tag, n: usize) -> Vec<usize> {
        if self.matchbin_dirty {
            self.reset_matchbin();
        }
        self.matchbin.match_raw(tag, n)
    }

    /// Draw a random tag from the VM's seeded random source.
    pub fn random_tag(&mut self) -> P::Tag {
        P::Tag::from_rng(&mut self.rng)
    }

    // --- Configuration ---

    /// Resize the thread slot pool. Only allowed while no threads are live.
    pub fn set_thread_capacity(&mut self, capacity: usize) -> Result<()> {
        if capacity < self.max_active {
            return Err(VmError::CapacityBelowActiveLimit {
                requested: capacity,
                max_active: self.max_active,
            });
        }
        let live = self.active_ids.len() + self.pending_ids.len();
        if live > 0 {
            return Err(VmError::ThreadPoolBusy { live });
        }
        self.resize_thread_pool(capacity);
        Ok(())
    }

    /// Cap the number of concurrently active threads. Lowering the limit
    /// below the current active count kills the weakest actives immediately.
    pub fn set_active_thread_limit(&mut self, limit: usize) -> Result<()> {
        if limit > self.threads.len() {
            return Err(VmError::ActiveLimitExceedsCapacity {
                requested: limit,
                capacity: self.threads.len(),
            });
        }
        self.max_active = limit;
        while self.active_ids.len() > self.max_active {
            let victim_idx = self
                .active_ids
                .iter()
                .enumerate()
                .min_by_key(|&(_, &tid)| self.threads[tid].priority)
                .map(|(idx, _)| idx)
                .unwrap_or(0);
            let tid = self.active_ids.remove(victim_idx);
            self.threads[tid].clear();
            self.unused_ids.push(tid);
        }
        Ok(())
    }

    pub fn set_max_call_depth(&mut self, depth: usize) {
        self.max_call_depth = depth;
    }

    /// Replace the event library.
    pub fn set_event_library(&mut self, event_lib: EventLibrary<P, M>) {
        self.event_lib = event_lib;
    }

    fn resize_thread_pool(&mut self, capacity: usize) {
        self.threads = alloc::vec![Thread::default(); capacity];
        self.active_ids.clear();
        self.pending_ids.clear();
        self.unused_ids = (0..capacity).rev().collect();
    }

    // --- Accessors ---

    pub fn program(&self) -> &P {
        &self.program
    }

    pub fn instruction_library(&self) -> &InstructionLibrary<P, M> {
        &self.inst_lib
    }

    pub fn event_library(&self) -> &EventLibrary<P, M> {
        &self.event_lib
    }

    pub fn memory(&self) -> &MemoryModel {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryModel {
        &mut self.memory
    }

    pub fn matchbin(&self) -> &MatchBin<P::Tag, M> {
        &self.matchbin
    }

    pub fn matchbin_mut(&mut self) -> &mut MatchBin<P::Tag, M> {
        &mut self.matchbin
    }

    pub fn rng_mut(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    pub fn thread(&self, tid: ThreadId) -> Option<&Thread> {
        self.threads.get(tid)
    }

    pub fn thread_mut(&mut self, tid: ThreadId) -> Option<&mut Thread> {
        self.threads.get_mut(tid)
    }

    pub fn active_thread_ids(&self) -> &[ThreadId] {
        &self.active_ids
    }

    pub fn pending_thread_ids(&self) -> &[ThreadId] {
        &self.pending_ids
    }

    pub fn unused_thread_ids(&self) -> &[ThreadId] {
        &self.unused_ids
    }

    pub fn thread_capacity(&self) -> usize {
        self.threads.len()
    }

    pub fn max_active(&self) -> usize {
        self.max_active
    }

    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    /// Id of the thread currently executing an instruction.
    pub fn current_thread_id(&self) -> Option<ThreadId> {
        self.cur_thread
    }

    /// Top call state of the currently executing thread.
    pub fn current_call(&self) -> Option<&CallState> {
        let tid = self.cur_thread?;
        self.threads.get(tid)?.exec.top_call()
    }

    /// Mutable top call state of the currently executing thread.
    pub fn current_call_mut(&mut self) -> Option<&mut CallState> {
        let tid = self.cur_thread?;
        self.threads.get_mut(tid)?.exec.top_call_mut()
    }

    pub(crate) fn top_call_mut(&mut self, tid: ThreadId) -> Option<&mut CallState> {
        self.threads.get_mut(tid)?.exec.top_call_mut()
    }

    // --- Hooks ---

    /// Install the before-exec observer, replacing any previous one.
    pub fn on_before_inst_exec<F>(&mut self, observer: F) -> HookKey
    where
        F: Fn(&TagVm<P, M>, &crate::program::Instruction<P::Tag>) + 'static,
    {
        self.inst_lib.on_before_inst_exec(observer)
    }

    /// Remove the observer registered under `key`.
    pub fn remove_before_inst_exec(&mut self, key: HookKey) -> bool {
        self.inst_lib.remove_before_inst_exec(key)
    }
}
