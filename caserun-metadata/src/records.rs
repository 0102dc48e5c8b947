// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

/// A single line of `caserun --message-format json` output.
///
/// Records are written in run order: one `run-started`, then for each test set a `set-started`
/// followed by one record per case, and finally a `run-finished` record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EventRecord {
    /// The run configuration was announced.
    RunStarted {
        /// The absolute path to the binary under test.
        binary: String,
        /// The target platform identifier used for skip evaluation.
        platform: String,
        /// The configured stability tier, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stability: Option<String>,
        /// The number of test sets in the manifest.
        set_count: usize,
        /// The total number of cases in the manifest.
        case_count: usize,
    },

    /// A test set started.
    SetStarted {
        /// The name of the set.
        set: String,
    },

    /// A case was skipped without spawning a process.
    CaseSkipped {
        /// The set this case belongs to.
        set: String,
        /// The name of the case.
        name: String,
        /// The reason for skipping; empty if the manifest did not provide one.
        reason: String,
    },

    /// A case passed.
    CasePassed {
        /// The set this case belongs to.
        set: String,
        /// The name of the case.
        name: String,
        /// Time taken, in seconds.
        exec_time: f64,
        /// Captured combined output, if output echoing is enabled.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },

    /// A case failed.
    CaseFailed {
        /// The set this case belongs to.
        set: String,
        /// The name of the case.
        name: String,
        /// Time taken, in seconds.
        exec_time: f64,
        /// A description of why the case failed.
        reason: String,
        /// The exit code of the process, if it ran to completion and exited normally.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        /// Captured combined output.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },

    /// A case exceeded its timeout and was terminated.
    CaseTimedOut {
        /// The set this case belongs to.
        set: String,
        /// The name of the case.
        name: String,
        /// Time taken, in seconds.
        exec_time: f64,
        /// Output captured before the process was terminated.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },

    /// The run finished.
    RunFinished(RunSummary),
}

impl EventRecord {
    /// Parses a single line of JSON output.
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// The final tally of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// The number of cases that passed.
    pub passed: usize,
    /// The number of cases that failed.
    pub failed: usize,
    /// The number of cases that were skipped.
    pub skipped: usize,
    /// The number of cases that timed out.
    pub timed_out: usize,
    /// Total time taken by the run, in seconds.
    pub exec_time: f64,
    /// Whether the run is considered a success: no failures and no timeouts.
    pub success: bool,
}
