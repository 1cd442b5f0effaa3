// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use anyhow::{bail, Result as AnyResult};
use serde::{Deserialize, Serialize};

use crate::inst::InstructionLibrary;
use crate::matchbin::MatchPolicy;
use crate::tag::Tag;

use super::{Instruction, ModuleSpan, ProgramModel};

/// One module of a [`FunctionsProgram`]: a tag set and an instruction body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function<T> {
    tags: Vec<T>,
    body: Vec<Instruction<T>>,
}

impl<T> Function<T> {
    pub fn new(tags: Vec<T>) -> Self {
        Self {
            tags,
            body: Vec::new(),
        }
    }

    pub fn push_inst(&mut self, inst: Instruction<T>) {
        self.body.push(inst);
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn tags(&self) -> &[T] {
        &self.tags
    }

    pub fn tag(&self, i: usize) -> Option<&T> {
        self.tags.get(i)
    }

    pub fn inst(&self, ip: usize) -> Option<&Instruction<T>> {
        self.body.get(ip)
    }

    pub fn body(&self) -> &[Instruction<T>] {
        &self.body
    }
}

/// Program shape where every module is a tagged function with module-local
/// instruction pointers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionsProgram<T> {
    functions: Vec<Function<T>>,
}

impl<T> Default for FunctionsProgram<T> {
    fn default() -> Self {
        Self {
            functions: Vec::new(),
        }
    }
}

impl<T: Tag> FunctionsProgram<T> {
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
        }
    }

    pub fn push_function(&mut self, function: Function<T>) {
        self.functions.push(function);
    }

    pub fn function(&self, mp: usize) -> Option<&Function<T>> {
        self.functions.get(mp)
    }

    pub fn function_mut(&mut self, mp: usize) -> Option<&mut Function<T>> {
        self.functions.get_mut(mp)
    }

    pub fn functions(&self) -> &[Function<T>] {
        &self.functions
    }

    pub fn clear(&mut self) {
        self.functions.clear();
    }

    /// Append an instruction to the most recently pushed function.
    pub fn push_inst(&mut self, inst: Instruction<T>) {
        debug_assert!(!self.functions.is_empty(), "no function to append to");
        if let Some(last) = self.functions.last_mut() {
            last.push_inst(inst);
        }
    }

    /// Append an instruction by library name to the most recently pushed
    /// function.
    pub fn push_inst_named<P: ProgramModel, M: MatchPolicy<P::Tag>>(
        &mut self,
        lib: &InstructionLibrary<P, M>,
        name: &str,
        args: Vec<i32>,
        tags: Vec<T>,
    ) -> AnyResult<()> {
        let Some(id) = lib.get_id(name) else {
            bail!("unknown instruction name: {name}");
        };
        self.push_inst(Instruction::new(id, args, tags));
        Ok(())
    }
}

impl<T: Tag + fmt::Display> FunctionsProgram<T> {
    /// Human-readable listing of the program against an instruction library.
    pub fn listing<P: ProgramModel, M: MatchPolicy<P::Tag>>(
        &self,
        lib: &InstructionLibrary<P, M>,
    ) -> String {
        let mut out = String::new();
        for (mp, function) in self.functions.iter().enumerate() {
            let tags = function
                .tags()
                .iter()
                .map(|t| format!("{t}"))
                .collect::<Vec<_>>()
                .join(",");
            out.push_str(&format!("fn-{mp} ({tags}):\n"));
            for inst in function.body() {
                let name = lib.name(inst.id).unwrap_or("<unknown>");
                out.push_str(&format!("  {}\n", inst.listing_line(name)));
            }
        }
        out
    }
}

impl<T: Tag> ProgramModel for FunctionsProgram<T> {
    type Tag = T;

    fn num_modules(&self) -> usize {
        self.functions.len()
    }

    fn module_len(&self, mp: usize) -> usize {
        self.functions.get(mp).map_or(0, Function::len)
    }

    fn module_tag(&self, mp: usize) -> Option<&T> {
        self.functions.get(mp)?.tag(0)
    }

    fn module_span(&self, mp: usize) -> ModuleSpan {
        ModuleSpan {
            entry: 0,
            begin: 0,
            end: self.module_len(mp),
        }
    }

    fn is_valid_position(&self, mp: usize, ip: usize) -> bool {
        ip < self.module_len(mp)
    }

    fn instruction(&self, mp: usize, ip: usize) -> Option<&Instruction<T>> {
        self.functions.get(mp)?.inst(ip)
    }

    fn normalize_position(&self, _mp: usize, ip: usize) -> usize {
        ip
    }

    fn previous_position(&self, _mp: usize, ip: usize) -> usize {
        ip.saturating_sub(1)
    }

    fn find_unknown_instruction(
        &self,
        is_known: &dyn Fn(usize) -> bool,
    ) -> Option<(usize, usize, usize)> {
        for (mp, function) in self.functions.iter().enumerate() {
            for (ip, inst) in function.body().iter().enumerate() {
                if !is_known(inst.id) {
                    return Some((mp, ip, inst.id));
                }
            }
        }
        None
    }
}
