// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs script-based regression suites against a binary under test.
//!
//! Each case in a test manifest is passed to the binary under test in its own process. A case
//! passes if the process's exit status matches what the case expects and, if the case names a
//! golden file, its combined output matches that file byte for byte.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, StderrStyles};
