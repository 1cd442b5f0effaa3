// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

//! Thread slots and the thread-manager operations: spawning, priority-based
//! admission, and dead-thread collection.

use alloc::vec::Vec;
use core::cmp::Reverse;

use crate::matchbin::MatchPolicy;
use crate::program::ProgramModel;

use super::machine::TagVm;
use super::state::ExecState;

/// Index of a thread slot in the VM's pool.
pub type ThreadId = usize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThreadStatus {
    #[default]
    Unused,
    Pending,
    Active,
    Dead,
}

/// One slot of the VM's thread pool.
#[derive(Debug, Clone, Default)]
pub struct Thread {
    pub(crate) exec: ExecState,
    pub(crate) priority: i32,
    pub(crate) status: ThreadStatus,
}

impl Thread {
    pub fn exec_state(&self) -> &ExecState {
        &self.exec
    }

    pub fn exec_state_mut(&mut self) -> &mut ExecState {
        &mut self.exec
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn status(&self) -> ThreadStatus {
        self.status
    }

    pub fn is_dead(&self) -> bool {
        self.status == ThreadStatus::Dead
    }

    pub(crate) fn clear(&mut self) {
        self.exec.clear();
        self.priority = 0;
        self.status = ThreadStatus::Unused;
    }
}

impl<P: ProgramModel, M: MatchPolicy<P::Tag>> TagVm<P, M> {
    /// Spawn a pending thread running the given module. Returns `None` when
    /// the module id is invalid or every slot is occupied by an active
    /// thread.
    pub fn spawn_thread_with_id(&mut self, module_id: usize, priority: i32) -> Option<ThreadId> {
        if module_id >= self.program.num_modules() {
            return None;
        }
        let tid = self.allocate_thread_slot()?;
        {
            let thread = &mut self.threads[tid];
            thread.exec.clear();
            thread.priority = priority;
            thread.status = ThreadStatus::Pending;
        }
        self.pending_ids.push(tid);
        self.init_thread(tid, module_id);
        Some(tid)
    }

    /// Spawn a pending thread on the module best matching `tag`.
    pub fn spawn_thread_with_tag(&mut self, tag: &P::Tag, priority: i32) -> Option<ThreadId> {
        let matches = self.find_module_match(tag, 1);
        let &module_id = matches.first()?;
        self.spawn_thread_with_id(module_id, priority)
    }

    /// Mark a thread dead. Its slot is reclaimed at the end of the current
    /// step-cycle.
    pub fn terminate_thread(&mut self, tid: ThreadId) {
        if let Some(thread) = self.threads.get_mut(tid) {
            if thread.status != ThreadStatus::Unused {
                thread.status = ThreadStatus::Dead;
            }
        }
    }

    /// Claim a free slot, displacing the lowest-priority pending thread when
    /// none is free (first spawned wins ties). Fails only when every slot is
    /// active.
    fn allocate_thread_slot(&mut self) -> Option<ThreadId> {
        if let Some(tid) = self.unused_ids.pop() {
            return Some(tid);
        }
        let victim_idx = self
            .pending_ids
            .iter()
            .enumerate()
            .min_by_key(|&(_, &tid)| self.threads[tid].priority)
            .map(|(idx, _)| idx)?;
        let tid = self.pending_ids.remove(victim_idx);
        self.threads[tid].clear();
        Some(tid)
    }

    /// Admit pending threads in priority order (FIFO among equals) until the
    /// active list is full. Once full, a pending thread is admitted only when
    /// its priority is strictly greater than every active thread's; the
    /// lowest-priority active thread is killed to make room.
    pub(crate) fn activate_pending_threads(&mut self) {
        if self.pending_ids.is_empty() {
            return;
        }
        let mut pending = core::mem::take(&mut self.pending_ids);
        pending.sort_by_key(|&tid| Reverse(self.threads[tid].priority));

        let mut kept = Vec::new();
        let mut candidates = pending.into_iter();
        while let Some(tid) = candidates.next() {
            if self.active_ids.len() < self.max_active {
                self.threads[tid].status = ThreadStatus::Active;
                self.active_ids.push(tid);
                continue;
            }
            let outranks_all = self
                .active_ids
                .iter()
                .map(|&active| self.threads[active].priority)
                .max()
                .is_some_and(|highest| self.threads[tid].priority > highest);
            if !outranks_all {
                // Candidates are sorted; nobody further back can outrank
                // either.
                kept.push(tid);
                kept.extend(candidates);
                break;
            }
            self.evict_weakest_active();
            self.threads[tid].status = ThreadStatus::Active;
            self.active_ids.push(tid);
        }
        self.pending_ids = kept;
    }

    fn evict_weakest_active(&mut self) {
        let Some(victim_idx) = self
            .active_ids
            .iter()
            .enumerate()
            .min_by_key(|&(_, &tid)| self.threads[tid].priority)
            .map(|(idx, _)| idx)
        else {
            return;
        };
        let tid = self.active_ids.remove(victim_idx);
        self.threads[tid].clear();
        self.unused_ids.push(tid);
    }

    /// Return dead threads' slots to the free pool.
    pub(crate) fn collect_dead_threads(&mut self) {
        let mut idx = 0;
        while idx < self.active_ids.len() {
            let tid = self.active_ids[idx];
            if self.threads[tid].is_dead() {
                self.active_ids.remove(idx);
                self.threads[tid].clear();
                self.unused_ids.push(tid);
            } else {
                idx += 1;
            }
        }
        let mut idx = 0;
        while idx < self.pending_ids.len() {
            let tid = self.pending_ids[idx];
            if self.threads[tid].is_dead() {
                self.pending_ids.remove(idx);
                self.threads[tid].clear();
                self.unused_ids.push(tid);
            } else {
                idx += 1;
            }
        }
    }

    /// Check the thread-pool bookkeeping: active/pending/unused ids partition
    /// the slot range with matching statuses, and the active list respects
    /// the limit.
    pub fn validate_thread_state(&self) -> bool {
        let capacity = self.threads.len();
        if self.active_ids.len() > self.max_active {
            return false;
        }
        let mut seen = alloc::vec![false; capacity];
        let mut mark = |tid: ThreadId| {
            if tid >= capacity || seen[tid] {
                return false;
            }
            seen[tid] = true;
            true
        };
        for &tid in &self.active_ids {
            if !mark(tid) {
                return false;
            }
            if !matches!(
                self.threads[tid].status,
                ThreadStatus::Active | ThreadStatus::Dead
            ) {
                return false;
            }
        }
        for &tid in &self.pending_ids {
            if !mark(tid) {
                return false;
            }
            if !matches!(
                self.threads[tid].status,
                ThreadStatus::Pending | ThreadStatus::Dead
            ) {
                return false;
            }
        }
        for &tid in &self.unused_ids {
            if !mark(tid) {
                return false;
            }
            if self.threads[tid].status != ThreadStatus::Unused {
                return false;
            }
        }
        seen.iter().all(|&slot| slot)
    }
}
