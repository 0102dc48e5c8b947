// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for caserun, a runner for script-based regression suites.
//!
//! The basic flow is:
//!
//! 1. Load a [`TestManifest`](manifest::TestManifest) describing test sets and their cases.
//! 2. Build a [`RunConfig`](config::RunConfig), optionally seeded from a layered
//!    [`ToolConfig`](config::ToolConfig) file.
//! 3. Create a [`TestRunner`](runner::TestRunner) and execute it, feeding each
//!    [`TestEvent`](reporter::events::TestEvent) to a [`Reporter`](reporter::Reporter).
//!
//! Cases run one at a time, each in its own process, with combined output capture and a
//! per-case timeout.

pub mod classify;
pub mod config;
pub mod errors;
pub mod manifest;
pub mod reporter;
pub mod runner;
pub mod skip;
mod test_command;
pub mod test_output;
mod time;
