// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

//! Fixed-width bit-pattern tags used as approximate-match keys for module
//! dispatch.

use core::fmt;
use core::hash::Hash;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Contract for tag types consumed by the VM.
///
/// Tags are opaque bit patterns: the VM never inspects their structure beyond
/// what this trait exposes. Ordering is required so tags can key deterministic
/// caches; the integer projection feeds the `Terminal` instruction and
/// integer-based match policies.
pub trait Tag: Clone + Eq + Ord + Hash {
    /// Width of the tag's bit pattern.
    fn size_bits(&self) -> usize;

    /// The tag's bit pattern projected onto an unsigned integer.
    fn as_integer(&self) -> u128;

    /// Draw a uniformly random tag.
    fn from_rng<R: Rng + ?Sized>(rng: &mut R) -> Self;
}

/// A `W`-bit tag stored in the low bits of a `u128` (`W <= 128`).
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BitTag<const W: usize>(u128);

impl<const W: usize> BitTag<W> {
    const MASK: u128 = if W >= 128 {
        u128::MAX
    } else {
        (1u128 << W) - 1
    };

    /// Create a tag from raw bits. Bits above the tag width are discarded.
    pub const fn new(bits: u128) -> Self {
        Self(bits & Self::MASK)
    }

    /// The raw bit pattern.
    pub const fn bits(self) -> u128 {
        self.0
    }

    /// Number of positions at which two tags differ.
    pub const fn hamming(self, other: Self) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl<const W: usize> Tag for BitTag<W> {
    fn size_bits(&self) -> usize {
        W
    }

    fn as_integer(&self) -> u128 {
        self.0
    }

    fn from_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let lo = rng.next_u64() as u128;
        let hi = (rng.next_u64() as u128) << 64;
        Self::new(hi | lo)
    }
}

impl<const W: usize> From<u128> for BitTag<W> {
    fn from(bits: u128) -> Self {
        Self::new(bits)
    }
}

impl<const W: usize> fmt::Display for BitTag<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$b}", self.0, width = W)
    }
}
