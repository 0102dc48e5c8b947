// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for a caserun run.
//!
//! The main structure in this module is [`RunConfig`], built once through a
//! [`RunConfigBuilder`] before any case executes. Defaults may be read from a layered
//! [`ToolConfig`] file.

mod run_config;
mod tool_config;

pub use run_config::*;
pub use tool_config::*;
