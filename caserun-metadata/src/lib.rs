// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Machine-readable output produced by caserun.
//!
//! This crate documents the exit codes of the `caserun` binary and the records it writes when
//! run with `--message-format json`. Each line of JSON output deserializes into an
//! [`EventRecord`].

mod exit_codes;
mod records;

pub use exit_codes::*;
pub use records::*;
