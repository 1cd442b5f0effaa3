// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

//! Flow frames and the open/close/break handlers for each flow kind.
//!
//! Built-in kinds are resolved by pattern match; user-provided kinds register
//! a handler trio keyed by an integer kind id.

use crate::matchbin::MatchPolicy;
use crate::program::ProgramModel;

use super::machine::TagVm;
use super::threads::ThreadId;

/// Kinds of in-module control context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    /// If-style block.
    Basic,
    WhileLoop,
    /// In-frame subroutine: shares the caller's memory, resumes in place.
    Routine,
    /// Proper function call: bottom frame of a call state's flow stack.
    Call,
    /// User-registered kind, dispatched through [`FlowControl`].
    Custom(u32),
}

/// Everything the stepper needs to manage one flow frame. `begin`/`end`
/// bracket the range the flow covers: the block body for BASIC/WHILE_LOOP,
/// the whole target module for ROUTINE/CALL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowInfo {
    pub kind: FlowKind,
    /// Module pointer. Which module is being executed?
    pub mp: usize,
    /// Instruction pointer. Which instruction is executed next?
    pub ip: usize,
    /// Where does the flow begin?
    pub begin: usize,
    /// Where does the flow end?
    pub end: usize,
}

/// Handler trio for a user-registered flow kind.
pub struct FlowControl<P: ProgramModel, M: MatchPolicy<P::Tag>> {
    pub on_open: fn(&mut TagVm<P, M>, ThreadId, FlowInfo),
    pub on_close: fn(&mut TagVm<P, M>, ThreadId),
    pub on_break: fn(&mut TagVm<P, M>, ThreadId),
}

impl<P: ProgramModel, M: MatchPolicy<P::Tag>> Clone for FlowControl<P, M> {
    fn clone(&self) -> Self {
        Self {
            on_open: self.on_open,
            on_close: self.on_close,
            on_break: self.on_break,
        }
    }
}

impl<P: ProgramModel, M: MatchPolicy<P::Tag>> TagVm<P, M> {
    /// Register handlers for a custom flow kind, replacing any previous
    /// registration for `kind_id`.
    pub fn register_flow_kind(&mut self, kind_id: u32, control: FlowControl<P, M>) {
        self.custom_flows.insert(kind_id, control);
    }

    /// Push a new flow frame onto a thread's top call state.
    pub fn open_flow(&mut self, tid: ThreadId, flow: FlowInfo) {
        if let FlowKind::Custom(kind_id) = flow.kind {
            let handler = self.custom_flows.get(&kind_id).map(|c| c.on_open);
            if let Some(handler) = handler {
                handler(self, tid, flow);
            }
            return;
        }
        if let Some(call) = self.top_call_mut(tid) {
            call.flow_stack.push(flow);
        }
    }

    /// Close the top flow frame of a thread's top call state.
    pub fn close_flow(&mut self, tid: ThreadId, kind: FlowKind) {
        match kind {
            FlowKind::Basic => {
                let Some(call) = self.top_call_mut(tid) else {
                    return;
                };
                // Hand the popped frame's position down so the enclosing flow
                // resumes after the block.
                let Some(popped) = call.flow_stack.pop() else {
                    return;
                };
                if let Some(top) = call.flow_stack.last_mut() {
                    top.ip = popped.ip;
                    top.mp = popped.mp;
                }
            }
            FlowKind::WhileLoop => {
                let Some(call) = self.top_call_mut(tid) else {
                    return;
                };
                // Re-enter the loop header; it re-tests and may re-open.
                let Some(popped) = call.flow_stack.pop() else {
                    return;
                };
                if let Some(top) = call.flow_stack.last_mut() {
                    top.ip = popped.begin;
                    top.mp = popped.mp;
                }
            }
            FlowKind::Routine => {
                // The caller resumes where it was; nothing propagates down.
                if let Some(call) = self.top_call_mut(tid) {
                    call.flow_stack.pop();
                }
            }
            FlowKind::Call => {
                let Some(call) = self.top_call_mut(tid) else {
                    return;
                };
                if call.circular {
                    if let Some(top) = call.flow_stack.last_mut() {
                        top.ip = top.begin;
                    }
                } else {
                    call.flow_stack.pop();
                }
            }
            FlowKind::Custom(kind_id) => {
                let handler = self.custom_flows.get(&kind_id).map(|c| c.on_close);
                if let Some(handler) = handler {
                    handler(self, tid);
                }
            }
        }
    }

    /// Break out of the top flow frame of a thread's top call state.
    pub fn break_flow(&mut self, tid: ThreadId, kind: FlowKind) {
        match kind {
            FlowKind::Basic | FlowKind::WhileLoop => {
                let Some(call) = self.top_call_mut(tid) else {
                    return;
                };
                let Some(popped) = call.flow_stack.pop() else {
                    return;
                };
                let Some(enclosing_mp) = call.mp() else {
                    return;
                };
                // Jump the enclosing flow to the popped frame's end and, when
                // still in-module, past the Close.
                let advance = self.program.is_valid_position(enclosing_mp, popped.end);
                if let Some(call) = self.top_call_mut(tid) {
                    call.set_ip(if advance { popped.end + 1 } else { popped.end });
                }
            }
            FlowKind::Routine => self.close_flow(tid, FlowKind::Routine),
            FlowKind::Call => self.close_flow(tid, FlowKind::Call),
            FlowKind::Custom(kind_id) => {
                let handler = self.custom_flows.get(&kind_id).map(|c| c.on_break);
                if let Some(handler) = handler {
                    handler(self, tid);
                }
            }
        }
    }
}
