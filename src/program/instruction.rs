// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use serde::{Deserialize, Serialize};

/// One tagged instruction: a library id, integer arguments used as memory
/// addresses or immediates, and tags used for dispatch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Instruction<T> {
    pub id: usize,
    pub args: Vec<i32>,
    pub tags: Vec<T>,
}

impl<T> Instruction<T> {
    pub fn new(id: usize, args: Vec<i32>, tags: Vec<T>) -> Self {
        Self { id, args, tags }
    }

    /// Argument `i`, or `0` when the genome carries fewer arguments.
    pub fn arg(&self, i: usize) -> i32 {
        self.args.get(i).copied().unwrap_or(0)
    }

    /// Tag `i`, when present.
    pub fn tag(&self, i: usize) -> Option<&T> {
        self.tags.get(i)
    }
}

impl<T: fmt::Display> Instruction<T> {
    /// One listing line: `(tags) Name [args]`.
    pub fn listing_line(&self, name: &str) -> String {
        let tags = self
            .tags
            .iter()
            .map(|t| format!("{t}"))
            .collect::<Vec<_>>()
            .join(",");
        let args = self
            .args
            .iter()
            .map(|a| format!("{a}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("({tags}) {name} [{args}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::BitTag;
    use alloc::vec;

    #[test]
    fn missing_arguments_default_to_zero() {
        let inst: Instruction<BitTag<4>> = Instruction::new(3, vec![7], vec![]);
        assert_eq!(inst.arg(0), 7);
        assert_eq!(inst.arg(1), 0);
        assert_eq!(inst.arg(2), 0);
        assert!(inst.tag(0).is_none());
    }

    #[test]
    fn listing_line_renders_tags_and_args() {
        let inst = Instruction::new(0, vec![1, 2, 3], vec![BitTag::<4>::new(0b0101)]);
        assert_eq!(inst.listing_line("Add"), "(0101) Add [1, 2, 3]");
    }
}
