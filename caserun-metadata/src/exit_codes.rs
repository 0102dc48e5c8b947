// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `caserun` failures.
///
/// `caserun` runs may fail for a variety of reasons. This structure documents the exit codes
/// that may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum CaserunExitCode {}

impl CaserunExitCode {
    /// No errors occurred and every executed case passed.
    pub const OK: i32 = 0;

    /// One or more cases failed or timed out.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// The manifest could not be read or parsed.
    pub const MANIFEST_LOAD_FAILED: i32 = 104;

    /// A user issue happened while setting up a run: an invalid tool config, a missing binary
    /// under test, or a malformed command prefix.
    pub const SETUP_ERROR: i32 = 96;

    /// Writing data to stdout, stderr or a report file produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
