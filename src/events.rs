// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

//! Event library: named event definitions whose handlers run when queued
//! events are dispatched at the top of a step-cycle. Events manifest as
//! spawning new threads with a preloaded input buffer.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::matchbin::MatchPolicy;
use crate::memory::MemBuffer;
use crate::program::ProgramModel;
use crate::vm::TagVm;

/// One queued event: a library id, the tag handlers dispatch on, and an input
/// payload for the receiving thread.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<T> {
    pub id: usize,
    pub tag: T,
    pub input: MemBuffer,
}

impl<T> Event<T> {
    pub fn new(id: usize, tag: T) -> Self {
        Self {
            id,
            tag,
            input: MemBuffer::new(),
        }
    }

    pub fn with_input(mut self, input: MemBuffer) -> Self {
        self.input = input;
        self
    }
}

/// Behavior invoked when an event of a given id is dispatched.
pub type EventHandlerFn<P, M> = fn(&mut TagVm<P, M>, &Event<<P as ProgramModel>::Tag>);

/// Definition for one event kind.
pub struct EventDef<P: ProgramModel, M: MatchPolicy<P::Tag>> {
    pub name: String,
    pub handler: EventHandlerFn<P, M>,
}

impl<P: ProgramModel, M: MatchPolicy<P::Tag>> Clone for EventDef<P, M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            handler: self.handler,
        }
    }
}

/// Registry associating event ids with names and handlers.
pub struct EventLibrary<P: ProgramModel, M: MatchPolicy<P::Tag>> {
    defs: Vec<EventDef<P, M>>,
    name_map: BTreeMap<String, usize>,
}

impl<P: ProgramModel, M: MatchPolicy<P::Tag>> Default for EventLibrary<P, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ProgramModel, M: MatchPolicy<P::Tag>> EventLibrary<P, M> {
    pub fn new() -> Self {
        Self {
            defs: Vec::new(),
            name_map: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Register an event kind, returning its id.
    pub fn add_event(&mut self, name: &str, handler: EventHandlerFn<P, M>) -> usize {
        let id = self.defs.len();
        self.defs.push(EventDef {
            name: name.to_string(),
            handler,
        });
        self.name_map.insert(name.to_string(), id);
        id
    }

    pub fn get_id(&self, name: &str) -> Option<usize> {
        self.name_map.get(name).copied()
    }

    pub fn name(&self, id: usize) -> Option<&str> {
        self.defs.get(id).map(|d| d.name.as_str())
    }

    pub fn handler(&self, id: usize) -> Option<EventHandlerFn<P, M>> {
        self.defs.get(id).map(|d| d.handler)
    }
}

/// Stock event handler: spawn a thread on the module best matching the
/// event's tag and preload the spawned call's input buffer with the event
/// payload.
pub fn spawn_on_event<P: ProgramModel, M: MatchPolicy<P::Tag>>(
    vm: &mut TagVm<P, M>,
    event: &Event<P::Tag>,
) {
    let Some(tid) = vm.spawn_thread_with_tag(&event.tag, 0) else {
        return;
    };
    if let Some(call) = vm
        .thread_mut(tid)
        .and_then(|t| t.exec_state_mut().top_call_mut())
    {
        call.memory.input = event.input.clone();
    }
}
