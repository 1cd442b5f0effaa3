// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

//! The execution stepper: per-thread fetch/execute, the step-cycle over the
//! active thread list, calls and returns, and block scanning.

use crate::inst::InstProperty;
use crate::matchbin::MatchPolicy;
use crate::program::{Instruction, ProgramModel};
use crate::Rc;

use super::flow::{FlowInfo, FlowKind};
use super::machine::TagVm;
use super::state::CallState;
use super::threads::{ThreadId, ThreadStatus};

impl<P: ProgramModel, M: MatchPolicy<P::Tag>> TagVm<P, M> {
    /// One step-cycle: dispatch queued events, promote pending threads, step
    /// every admitted thread exactly once, then collect the dead.
    ///
    /// Threads spawned while the cycle runs stay pending until the next
    /// cycle; threads that die stay visible until the cycle's end.
    pub fn single_process(&mut self) {
        self.dispatch_queued_events();
        self.activate_pending_threads();
        let active_at_start = self.active_ids.len();
        for idx in 0..active_at_start {
            let tid = self.active_ids[idx];
            if self.threads[tid].is_dead() {
                continue;
            }
            self.cur_thread = Some(tid);
            self.single_execution_step(tid);
        }
        self.cur_thread = None;
        self.collect_dead_threads();
    }

    /// Advance one thread by a single execution step: either one real
    /// instruction, or a return from an exhausted call. Flows whose ip has
    /// run off the edge are closed on the way, within the same step.
    ///
    /// The ip is incremented *before* dispatch: the instruction may push or
    /// pop flows, or pop the whole call, and must never see stale position
    /// state.
    pub fn single_execution_step(&mut self, tid: ThreadId) {
        let program = Rc::clone(&self.program);
        loop {
            let Some(thread) = self.threads.get_mut(tid) else {
                return;
            };
            let Some(call) = thread.exec.call_stack.last_mut() else {
                break;
            };
            let Some(flow) = call.flow_stack.last_mut() else {
                // No flow left in this call: return.
                self.return_call(tid);
                break;
            };
            let mp = flow.mp;
            let ip = program.normalize_position(mp, flow.ip);
            flow.ip = ip;
            debug_assert!(
                mp < program.num_modules(),
                "flow references module {mp} of {}",
                program.num_modules()
            );
            if program.is_valid_position(mp, ip) {
                flow.ip = ip + 1;
                let Some(inst) = program.instruction(mp, ip) else {
                    break;
                };
                self.dispatch_instruction(inst);
                break;
            }
            // The ip is off the edge of the module: close the flow and try
            // again beneath it.
            let kind = flow.kind;
            self.close_flow(tid, kind);
        }
        if let Some(thread) = self.threads.get_mut(tid) {
            if thread.exec.call_stack.is_empty() {
                thread.status = ThreadStatus::Dead;
            }
        }
    }

    fn dispatch_instruction(&mut self, inst: &Instruction<P::Tag>) {
        if let Some(hook) = self.inst_lib.before_exec_hook() {
            hook(self, inst);
        }
        let Some(def) = self.inst_lib.def(inst.id) else {
            debug_assert!(false, "instruction id {} not in library", inst.id);
            return;
        };
        let run = def.run;
        run(self, inst);
    }

    /// Initialize a thread to run the given module: clear its call stack and
    /// call the module.
    pub(crate) fn init_thread(&mut self, tid: ThreadId, module_id: usize) {
        if let Some(thread) = self.threads.get_mut(tid) {
            thread.exec.clear();
        }
        self.call_module_id(tid, module_id, false);
    }

    /// Call a module by id on a thread: push a fresh call state, open its
    /// CALL flow, and copy the caller's working memory into the callee's
    /// input. Silently refuses when at max call depth or when the module is
    /// empty or unknown.
    pub fn call_module_id(&mut self, tid: ThreadId, module_id: usize, circular: bool) {
        let program = Rc::clone(&self.program);
        if module_id >= program.num_modules() {
            return;
        }
        let Some(thread) = self.threads.get_mut(tid) else {
            return;
        };
        if thread.exec.call_stack.len() >= self.max_call_depth {
            return;
        }
        if program.module_len(module_id) == 0 {
            return;
        }
        let state = CallState::new(self.memory.new_state(), circular);
        thread.exec.call_stack.push(state);
        let span = program.module_span(module_id);
        self.open_flow(
            tid,
            FlowInfo {
                kind: FlowKind::Call,
                mp: module_id,
                ip: span.entry,
                begin: span.begin,
                end: span.end,
            },
        );
        let stack = &mut self.threads[tid].exec.call_stack;
        if let [.., caller, callee] = &mut stack[..] {
            self.memory.on_call(&caller.memory, &mut callee.memory);
        }
    }

    /// Call the module best matching `tag` on a thread. No match is a no-op.
    pub fn call_module(&mut self, tid: ThreadId, tag: &P::Tag, circular: bool) {
        let at_depth = self
            .threads
            .get(tid)
            .is_some_and(|t| t.exec.call_stack.len() >= self.max_call_depth);
        if at_depth {
            return;
        }
        let matches = self.find_module_match(tag, 1);
        if let Some(&module_id) = matches.first() {
            self.call_module_id(tid, module_id, circular);
        }
    }

    /// Pop a thread's top call state, copying its output memory into the
    /// caller's working memory when a caller exists.
    pub fn return_call(&mut self, tid: ThreadId) {
        let Some(thread) = self.threads.get_mut(tid) else {
            return;
        };
        let stack = &mut thread.exec.call_stack;
        if stack.is_empty() {
            return;
        }
        if let [.., caller, returning] = &mut stack[..] {
            self.memory.on_return(&returning.memory, &mut caller.memory);
        }
        stack.pop();
    }

    /// Scan forward from `ip` for the close of the block opened just before
    /// it, tracking nesting depth. Returns the matching close's position, or
    /// the first invalid position when the block never closes. The scan wraps
    /// in program shapes whose modules wrap.
    pub fn find_end_of_block(&self, mp: usize, ip: usize) -> usize {
        let mut ip = ip;
        let mut depth: usize = 1;
        loop {
            ip = self.program.normalize_position(mp, ip);
            if !self.program.is_valid_position(mp, ip) {
                break;
            }
            let Some(inst) = self.program.instruction(mp, ip) else {
                break;
            };
            if self.inst_lib.has_property(inst.id, InstProperty::BlockDef) {
                depth += 1;
            } else if self.inst_lib.has_property(inst.id, InstProperty::BlockClose) {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            ip += 1;
        }
        ip
    }

    /// Copy the on-call dataflow (working -> input) from one thread's top
    /// call into another's. Used by `Fork` so spawned threads inherit input.
    pub(crate) fn copy_call_memory(&mut self, from: ThreadId, to: ThreadId) {
        if from == to || from >= self.threads.len() || to >= self.threads.len() {
            return;
        }
        let split = from.max(to);
        let (left, right) = self.threads.split_at_mut(split);
        let (src, dst) = if from < to {
            (&left[from], &mut right[0])
        } else {
            (&right[0], &mut left[to])
        };
        let Some(src_call) = src.exec.top_call() else {
            return;
        };
        let Some(dst_call) = dst.exec.top_call_mut() else {
            return;
        };
        self.memory.on_call(&src_call.memory, &mut dst_call.memory);
    }

    fn dispatch_queued_events(&mut self) {
        while let Some(event) = self.event_queue.pop_front() {
            let Some(handler) = self.event_lib.handler(event.id) else {
                continue;
            };
            handler(self, &event);
        }
    }

    /// Queue an event for dispatch at the top of the next step-cycle.
    pub fn queue_event(&mut self, event: crate::events::Event<P::Tag>) {
        self.event_queue.push_back(event);
    }
}
