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

/// One derived module of a [`LinearProgram`]: a `[begin, end)` range over
/// global positions. `begin > end` means the module wraps past the end of the
/// flat sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LinearModule<T> {
    begin: usize,
    end: usize,
    len: usize,
    tag: Option<T>,
}

impl<T> LinearModule<T> {
    fn contains(&self, pos: usize, prog_len: usize) -> bool {
        if pos >= prog_len {
            return false;
        }
        if self.begin <= self.end {
            pos >= self.begin && pos < self.end
        } else {
            pos >= self.begin || pos < self.end
        }
    }
}

/// Program shape with a single flat instruction sequence. Modules are the
/// stretches between instructions carrying the MODULE property, addressed by
/// global positions, and may wrap around the end of the sequence. With no
/// delimiter at all, the whole sequence is module 0.
///
/// The derived module table is rebuilt by [`ProgramModel::prepare`], which the
/// VM invokes on program load (delimiter detection needs the instruction
/// library's property flags).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearProgram<T> {
    insts: Vec<Instruction<T>>,
    #[serde(skip)]
    modules: Vec<LinearModule<T>>,
}

impl<T> Default for LinearProgram<T> {
    fn default() -> Self {
        Self {
            insts: Vec::new(),
            modules: Vec::new(),
        }
    }
}

impl<T: Tag> LinearProgram<T> {
    pub fn new() -> Self {
        Self {
            insts: Vec::new(),
            modules: Vec::new(),
        }
    }

    /// Number of instructions in the flat sequence.
    pub fn len(&self) -> usize {
        self.insts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    pub fn inst(&self, pos: usize) -> Option<&Instruction<T>> {
        self.insts.get(pos)
    }

    pub fn insts(&self) -> &[Instruction<T>] {
        &self.insts
    }

    pub fn clear(&mut self) {
        self.insts.clear();
        self.modules.clear();
    }

    /// Append an instruction. The module table is stale until the next
    /// `prepare`.
    pub fn push_inst(&mut self, inst: Instruction<T>) {
        self.insts.push(inst);
    }

    /// Append an instruction by library name.
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

impl<T: Tag + fmt::Display> LinearProgram<T> {
    /// Human-readable listing of the flat sequence against an instruction
    /// library.
    pub fn listing<P: ProgramModel, M: MatchPolicy<P::Tag>>(
        &self,
        lib: &InstructionLibrary<P, M>,
    ) -> String {
        let mut out = String::new();
        for inst in &self.insts {
            let name = lib.name(inst.id).unwrap_or("<unknown>");
            out.push_str(&format!("{}\n", inst.listing_line(name)));
        }
        out
    }
}

impl<T: Tag> ProgramModel for LinearProgram<T> {
    type Tag = T;

    fn num_modules(&self) -> usize {
        self.modules.len()
    }

    fn module_len(&self, mp: usize) -> usize {
        self.modules.get(mp).map_or(0, |m| m.len)
    }

    fn module_tag(&self, mp: usize) -> Option<&T> {
        self.modules.get(mp)?.tag.as_ref()
    }

    fn module_span(&self, mp: usize) -> ModuleSpan {
        self.modules.get(mp).map_or(
            ModuleSpan {
                entry: 0,
                begin: 0,
                end: 0,
            },
            |m| ModuleSpan {
                entry: m.begin,
                begin: m.begin,
                end: m.end,
            },
        )
    }

    fn is_valid_position(&self, mp: usize, ip: usize) -> bool {
        self.modules
            .get(mp)
            .is_some_and(|m| m.len > 0 && m.contains(ip, self.insts.len()))
    }

    fn instruction(&self, _mp: usize, ip: usize) -> Option<&Instruction<T>> {
        self.insts.get(ip)
    }

    fn normalize_position(&self, mp: usize, ip: usize) -> usize {
        if ip != self.insts.len() {
            return ip;
        }
        // Walking off the flat end re-enters at 0 when the module wraps.
        match self.modules.get(mp) {
            Some(m) if m.begin > m.end && m.end > 0 => 0,
            _ => ip,
        }
    }

    fn previous_position(&self, _mp: usize, ip: usize) -> usize {
        if ip == 0 {
            self.insts.len().saturating_sub(1)
        } else {
            ip - 1
        }
    }

    fn prepare(&mut self, is_module_marker: &dyn Fn(usize) -> bool) {
        self.modules.clear();
        let len = self.insts.len();
        if len == 0 {
            return;
        }
        let markers: Vec<usize> = self
            .insts
            .iter()
            .enumerate()
            .filter_map(|(pos, inst)| is_module_marker(inst.id).then_some(pos))
            .collect();
        if markers.is_empty() {
            self.modules.push(LinearModule {
                begin: 0,
                end: len,
                len,
                tag: None,
            });
            return;
        }
        for (i, &marker) in markers.iter().enumerate() {
            let begin = (marker + 1) % len;
            let end = markers[(i + 1) % markers.len()];
            let module_len = (end + len - begin) % len;
            self.modules.push(LinearModule {
                begin,
                end,
                len: module_len,
                tag: self.insts[marker].tags.first().cloned(),
            });
        }
    }

    fn find_unknown_instruction(
        &self,
        is_known: &dyn Fn(usize) -> bool,
    ) -> Option<(usize, usize, usize)> {
        let len = self.insts.len();
        for (pos, inst) in self.insts.iter().enumerate() {
            if !is_known(inst.id) {
                let mp = self
                    .modules
                    .iter()
                    .position(|m| m.contains(pos, len))
                    .unwrap_or(0);
                return Some((mp, pos, inst.id));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::BitTag;
    use alloc::vec;

    type Tag16 = BitTag<16>;

    const MARKER: usize = 99;

    fn inst(id: usize) -> Instruction<Tag16> {
        Instruction::new(id, vec![0, 0, 0], vec![])
    }

    fn marker(tag_bits: u128) -> Instruction<Tag16> {
        Instruction::new(MARKER, vec![0, 0, 0], vec![Tag16::new(tag_bits)])
    }

    fn prepare(program: &mut LinearProgram<Tag16>) {
        program.prepare(&|id| id == MARKER);
    }

    #[test]
    fn no_delimiter_means_one_untagged_module() {
        let mut program = LinearProgram::new();
        program.push_inst(inst(0));
        program.push_inst(inst(1));
        prepare(&mut program);

        assert_eq!(program.num_modules(), 1);
        assert_eq!(program.module_len(0), 2);
        assert_eq!(program.module_tag(0), None);
        assert!(program.is_valid_position(0, 1));
        assert!(!program.is_valid_position(0, 2));
        assert_eq!(
            program.module_span(0),
            ModuleSpan { entry: 0, begin: 0, end: 2 }
        );
    }

    #[test]
    fn delimiters_split_the_sequence_with_wrap() {
        // Positions: 0=M(a) 1 2 3=M(b) 4 5
        let mut program = LinearProgram::new();
        program.push_inst(marker(0x000f));
        program.push_inst(inst(0));
        program.push_inst(inst(1));
        program.push_inst(marker(0x00f0));
        program.push_inst(inst(2));
        program.push_inst(inst(3));
        prepare(&mut program);

        assert_eq!(program.num_modules(), 2);
        // Module 0: (0, 3) -> positions 1, 2.
        assert_eq!(program.module_len(0), 2);
        assert_eq!(program.module_tag(0), Some(&Tag16::new(0x000f)));
        assert!(program.is_valid_position(0, 1));
        assert!(!program.is_valid_position(0, 3));
        // Module 1: (3, 0) -> positions 4, 5, wrapping past the end.
        assert_eq!(program.module_len(1), 2);
        assert!(program.is_valid_position(1, 5));
        assert!(!program.is_valid_position(1, 0));
        assert!(!program.is_valid_position(1, 6));
    }

    #[test]
    fn wrapping_module_re_enters_at_zero() {
        // Positions: 0 1 2=M(a) 3 4 -> module spans 3, 4, 0, 1.
        let mut program = LinearProgram::new();
        program.push_inst(inst(0));
        program.push_inst(inst(1));
        program.push_inst(marker(0x0001));
        program.push_inst(inst(2));
        program.push_inst(inst(3));
        prepare(&mut program);

        assert_eq!(program.num_modules(), 1);
        assert_eq!(program.module_len(0), 4);
        assert!(program.is_valid_position(0, 0));
        assert!(program.is_valid_position(0, 4));
        assert!(!program.is_valid_position(0, 2));
        assert_eq!(program.normalize_position(0, 5), 0);
        assert_eq!(program.previous_position(0, 0), 4);
    }

    #[test]
    fn single_delimiter_module_excludes_only_the_marker() {
        let mut program = LinearProgram::new();
        program.push_inst(marker(0x0001));
        prepare(&mut program);
        assert_eq!(program.num_modules(), 1);
        assert_eq!(program.module_len(0), 0);
        assert!(!program.is_valid_position(0, 0));
    }

    #[test]
    fn adjacent_delimiters_make_an_empty_module() {
        let mut program = LinearProgram::new();
        program.push_inst(marker(0x0001));
        program.push_inst(marker(0x0002));
        program.push_inst(inst(0));
        prepare(&mut program);
        assert_eq!(program.num_modules(), 2);
        assert_eq!(program.module_len(0), 0);
        // Module 1: (1, 0) -> position 2, wrapping.
        assert_eq!(program.module_len(1), 1);
        assert!(program.is_valid_position(1, 2));
    }

    #[test]
    fn serde_round_trip_requires_re_preparation() {
        let mut program = LinearProgram::new();
        program.push_inst(marker(0x000f));
        program.push_inst(inst(0));
        prepare(&mut program);

        let json = serde_json::to_string(&program).unwrap();
        let mut back: LinearProgram<Tag16> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.num_modules(), 0);
        prepare(&mut back);
        assert_eq!(back, program);
    }
}
