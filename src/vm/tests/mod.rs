// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

//! VM test modules

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::unseparated_literal_suffix,
    clippy::as_conversions
)] // VM tests assert/unwrap to validate scenarios

mod invariants;
mod linear;
mod support;
