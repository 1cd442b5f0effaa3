// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::matchbin::MatchPolicy;
use crate::program::{Instruction, ProgramModel};
use crate::vm::TagVm;
use crate::Rc;

/// Special properties an instruction definition can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstProperty {
    /// Demarcates a module in linear programs.
    Module,
    /// Closes a block.
    BlockClose,
    /// Opens a block.
    BlockDef,
}

/// Compact set of [`InstProperty`] flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstProps(u8);

impl InstProps {
    pub const NONE: Self = Self(0);

    pub const fn just(prop: InstProperty) -> Self {
        Self::NONE.with(prop)
    }

    pub const fn with(self, prop: InstProperty) -> Self {
        Self(self.0 | (1 << prop as u8))
    }

    pub const fn has(self, prop: InstProperty) -> bool {
        self.0 & (1 << prop as u8) != 0
    }
}

/// Behavior invoked when an instruction is dispatched.
pub type RunFn<P, M> = fn(&mut TagVm<P, M>, &Instruction<<P as ProgramModel>::Tag>);

/// Observer invoked before every dispatch. Observers may read VM state but
/// not mutate it.
pub type BeforeInstFn<P, M> = dyn Fn(&TagVm<P, M>, &Instruction<<P as ProgramModel>::Tag>);

/// Removable handle for a registered before-exec observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookKey(u64);

/// Full definition for one instruction.
pub struct InstructionDef<P: ProgramModel, M: MatchPolicy<P::Tag>> {
    /// Name of this instruction.
    pub name: String,
    /// Description of the instruction.
    pub desc: String,
    /// Function to call when the instruction is executed.
    pub run: RunFn<P, M>,
    /// Properties specific to this instruction.
    pub props: InstProps,
}

impl<P: ProgramModel, M: MatchPolicy<P::Tag>> Clone for InstructionDef<P, M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            desc: self.desc.clone(),
            run: self.run,
            props: self.props,
        }
    }
}

/// Registry associating instruction ids with names, behaviors, and property
/// flags, plus a single before-exec observer slot.
pub struct InstructionLibrary<P: ProgramModel, M: MatchPolicy<P::Tag>> {
    defs: Vec<InstructionDef<P, M>>,
    name_map: BTreeMap<String, usize>,
    before_exec: Option<(HookKey, Rc<BeforeInstFn<P, M>>)>,
    next_hook_key: u64,
}

impl<P: ProgramModel, M: MatchPolicy<P::Tag>> Default for InstructionLibrary<P, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ProgramModel, M: MatchPolicy<P::Tag>> InstructionLibrary<P, M> {
    pub fn new() -> Self {
        Self {
            defs: Vec::new(),
            name_map: BTreeMap::new(),
            before_exec: None,
            next_hook_key: 0,
        }
    }

    /// Number of instructions in this set.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Add a new instruction to the set, returning its id.
    pub fn add_inst(&mut self, name: &str, run: RunFn<P, M>, desc: &str, props: InstProps) -> usize {
        let id = self.defs.len();
        self.defs.push(InstructionDef {
            name: name.to_string(),
            desc: desc.to_string(),
            run,
            props,
        });
        self.name_map.insert(name.to_string(), id);
        id
    }

    /// Is the given instruction name in the library?
    pub fn is_inst(&self, name: &str) -> bool {
        self.name_map.contains_key(name)
    }

    /// The id of the instruction with the given name.
    pub fn get_id(&self, name: &str) -> Option<usize> {
        self.name_map.get(name).copied()
    }

    pub fn def(&self, id: usize) -> Option<&InstructionDef<P, M>> {
        self.defs.get(id)
    }

    /// The name associated with the given instruction id.
    pub fn name(&self, id: usize) -> Option<&str> {
        self.defs.get(id).map(|d| d.name.as_str())
    }

    /// The description associated with the given instruction id.
    pub fn desc(&self, id: usize) -> Option<&str> {
        self.defs.get(id).map(|d| d.desc.as_str())
    }

    /// Does the instruction have a particular property? Unknown ids have
    /// none.
    pub fn has_property(&self, id: usize, prop: InstProperty) -> bool {
        self.defs.get(id).is_some_and(|d| d.props.has(prop))
    }

    /// Install the before-exec observer, replacing any previous one.
    pub fn on_before_inst_exec<F>(&mut self, observer: F) -> HookKey
    where
        F: Fn(&TagVm<P, M>, &Instruction<P::Tag>) + 'static,
    {
        let key = HookKey(self.next_hook_key);
        self.next_hook_key += 1;
        self.before_exec = Some((key, Rc::new(observer)));
        key
    }

    /// Remove the observer registered under `key`. Returns whether an
    /// observer was removed.
    pub fn remove_before_inst_exec(&mut self, key: HookKey) -> bool {
        match self.before_exec {
            Some((current, _)) if current == key => {
                self.before_exec = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn before_exec_hook(&self) -> Option<Rc<BeforeInstFn<P, M>>> {
        self.before_exec.as_ref().map(|(_, hook)| Rc::clone(hook))
    }
}
