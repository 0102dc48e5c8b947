// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    classify::Outcome,
    manifest::{TestCase, TestSet},
    runner::RunStats,
    skip::SkipReason,
    test_output::ChildOutput,
};
use camino::Utf8Path;
use chrono::{DateTime, FixedOffset, Local};
use std::time::Duration;

/// A test event.
///
/// Events are produced by a [`TestRunner`](crate::runner::TestRunner) and consumed by a
/// [`Reporter`](crate::reporter::Reporter). Within a run they are totally ordered: one
/// `RunStarted`, then for each set in manifest order a `SetStarted` followed by one event per case
/// in set order, then one `RunFinished`.
#[derive(Clone, Debug)]
pub struct TestEvent<'a> {
    /// The time at which the event was generated, including the offset from UTC.
    pub timestamp: DateTime<FixedOffset>,

    /// The amount of time elapsed since the start of the run.
    pub elapsed: Duration,

    /// The kind of test event this is.
    pub kind: TestEventKind<'a>,
}

/// The kind of test event this is.
///
/// Forms part of [`TestEvent`].
#[derive(Clone, Debug)]
pub enum TestEventKind<'a> {
    /// The run started.
    RunStarted {
        /// The binary under test.
        binary: &'a Utf8Path,

        /// The target platform identifier.
        platform: &'a str,

        /// The stability tier, if configured.
        stability: Option<&'a str>,

        /// The number of sets in the manifest.
        set_count: usize,

        /// The number of cases in the manifest.
        case_count: usize,
    },

    /// A test set started.
    SetStarted {
        /// The set.
        set: &'a TestSet,
    },

    /// A case was skipped. No process was spawned for it.
    CaseSkipped {
        /// The set the case belongs to.
        set: &'a TestSet,

        /// The case.
        case: &'a TestCase,

        /// Why the case was skipped.
        reason: SkipReason,
    },

    /// A case passed.
    CasePassed {
        /// The set the case belongs to.
        set: &'a TestSet,

        /// The case.
        case: &'a TestCase,

        /// Details about the execution.
        run_status: CaseRunStatus,
    },

    /// A case failed.
    CaseFailed {
        /// The set the case belongs to.
        set: &'a TestSet,

        /// The case.
        case: &'a TestCase,

        /// Details about the execution. The outcome is [`Outcome::Fail`].
        run_status: CaseRunStatus,
    },

    /// A case ran past its timeout and was terminated.
    CaseTimedOut {
        /// The set the case belongs to.
        set: &'a TestSet,

        /// The case.
        case: &'a TestCase,

        /// Details about the execution.
        run_status: CaseRunStatus,
    },

    /// The run finished.
    RunFinished {
        /// The time at which the run started.
        start_time: DateTime<FixedOffset>,

        /// The amount of time the run took.
        elapsed: Duration,

        /// Final statistics for the run.
        run_stats: RunStats,
    },
}

/// Information about a single execution of a case.
#[derive(Clone, Debug)]
pub struct CaseRunStatus {
    /// The verdict for this execution.
    pub outcome: Outcome,

    /// The exit code of the process, if it exited normally.
    pub exit_code: Option<i32>,

    /// The captured combined output. Empty if the process could not be started.
    pub output: ChildOutput,

    /// The time at which the process was started.
    pub start_time: DateTime<Local>,

    /// The time the process took to run.
    pub time_taken: Duration,

    /// The timeout that applied to this execution.
    pub timeout: Duration,
}
