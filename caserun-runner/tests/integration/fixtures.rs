// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use caserun_runner::{
    classify::Outcome,
    config::{RunConfig, RunConfigBuilder},
    manifest::TestManifest,
    reporter::events::{CaseRunStatus, TestEventKind},
    runner::{RunStats, TestRunnerBuilder},
    skip::SkipReason,
};
use color_eyre::eyre::{Result, WrapErr};
use std::{collections::HashMap, fmt, sync::Once, time::Duration};

pub(crate) fn test_init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = color_eyre::install();
    });
}

pub(crate) fn fixture_root() -> Utf8PathBuf {
    // one level up from the manifest dir -> into fixtures/caserun-tests
    Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("manifest dir has a parent")
        .join("fixtures/caserun-tests")
}

pub(crate) fn load_manifest() -> Result<TestManifest> {
    let path = fixture_root().join("testsets.json");
    TestManifest::load(&path).wrap_err_with(|| format!("failed to load {path}"))
}

pub(crate) fn config_builder() -> RunConfigBuilder {
    let mut builder = RunConfigBuilder::new("/bin/sh");
    // Keep the platform fixed so host skip tags don't affect the expected results.
    builder.set_platform("caserun-test-platform");
    builder
}

/// The expected result of running the fixture suite with the default configuration, in manifest
/// order.
pub(crate) static EXPECTED_CASES: &[(&str, &str, FixtureStatus)] = &[
    ("run_pass", "test_pass.sh", FixtureStatus::Pass),
    ("run_pass", "test_fs_read.sh", FixtureStatus::Pass),
    ("run_pass", "test_net_basic.sh", FixtureStatus::Pass),
    ("run_pass", "test_golden.sh", FixtureStatus::Pass),
    ("run_pass", "test_interleaved.sh", FixtureStatus::Pass),
    ("run_pass", "test_leak.sh", FixtureStatus::Pass),
    ("run_pass", "test_platform.sh", FixtureStatus::Pass),
    ("run_pass", "test_skip_all.sh", FixtureStatus::Skip),
    ("run_fail", "test_expected_fail.sh", FixtureStatus::Pass),
    ("run_fail", "test_unexpected_pass.sh", FixtureStatus::Fail),
    ("run_fail", "test_crash.sh", FixtureStatus::Fail),
    ("run_fail", "test_golden_mismatch.sh", FixtureStatus::Fail),
    ("run_fail", "test_missing.sh", FixtureStatus::Fail),
    ("run_timeout", "test_sleep.sh", FixtureStatus::Timeout),
    ("run_timeout", "test_sleep_after.sh", FixtureStatus::Pass),
];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum FixtureStatus {
    Pass,
    Fail,
    Skip,
    Timeout,
}

impl FixtureStatus {
    pub(crate) fn of(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Pass => Self::Pass,
            Outcome::Fail(_) => Self::Fail,
            Outcome::Skip(_) => Self::Skip,
            Outcome::Timeout => Self::Timeout,
        }
    }
}

/// What a run reported about a single case.
#[derive(Clone)]
pub(crate) enum InstanceStatus {
    Skipped(SkipReason),
    Finished(CaseRunStatus),
}

impl InstanceStatus {
    pub(crate) fn fixture_status(&self) -> FixtureStatus {
        match self {
            Self::Skipped(_) => FixtureStatus::Skip,
            Self::Finished(run_status) => FixtureStatus::of(&run_status.outcome),
        }
    }

    pub(crate) fn run_status(&self) -> &CaseRunStatus {
        match self {
            Self::Skipped(reason) => panic!("case was skipped ({reason}), expected it to run"),
            Self::Finished(run_status) => run_status,
        }
    }

    pub(crate) fn skip_reason(&self) -> &SkipReason {
        match self {
            Self::Skipped(reason) => reason,
            Self::Finished(run_status) => {
                panic!("case finished ({:?}), expected it to be skipped", run_status.outcome)
            }
        }
    }
}

impl fmt::Debug for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped(reason) => write!(f, "skipped: {reason}"),
            Self::Finished(run_status) => write!(
                f,
                "{:?} (exit code {:?})\n---OUTPUT---\n{}\n",
                run_status.outcome,
                run_status.exit_code,
                run_status.output.as_str_lossy(),
            ),
        }
    }
}

/// The events of a run, flattened for assertions.
#[derive(Debug)]
pub(crate) struct RunRecord {
    /// One line per event, e.g. `set-started run_pass` or `case-passed run_pass test_pass.sh`.
    pub(crate) event_log: Vec<String>,
    pub(crate) statuses: HashMap<(String, String), InstanceStatus>,
    pub(crate) run_stats: RunStats,
}

impl RunRecord {
    pub(crate) fn status(&self, set: &str, case: &str) -> &InstanceStatus {
        self.statuses
            .get(&(set.to_owned(), case.to_owned()))
            .unwrap_or_else(|| panic!("no status recorded for {set}/{case}"))
    }
}

pub(crate) fn execute_collect(manifest: &TestManifest, config: &RunConfig) -> Result<RunRecord> {
    let runner = TestRunnerBuilder::default().build(manifest, config)?;

    let mut event_log = Vec::new();
    let mut statuses = HashMap::new();
    let run_stats = runner.execute(|event| {
        let (line, status) = match event.kind {
            TestEventKind::RunStarted { .. } => ("run-started".to_owned(), None),
            TestEventKind::SetStarted { set } => (format!("set-started {}", set.name), None),
            TestEventKind::CaseSkipped { set, case, reason } => (
                format!("case-skipped {} {}", set.name, case.name),
                Some((set, case, InstanceStatus::Skipped(reason))),
            ),
            TestEventKind::CasePassed {
                set,
                case,
                run_status,
            } => (
                format!("case-passed {} {}", set.name, case.name),
                Some((set, case, InstanceStatus::Finished(run_status))),
            ),
            TestEventKind::CaseFailed {
                set,
                case,
                run_status,
            } => (
                format!("case-failed {} {}", set.name, case.name),
                Some((set, case, InstanceStatus::Finished(run_status))),
            ),
            TestEventKind::CaseTimedOut {
                set,
                case,
                run_status,
            } => (
                format!("case-timed-out {} {}", set.name, case.name),
                Some((set, case, InstanceStatus::Finished(run_status))),
            ),
            TestEventKind::RunFinished { .. } => ("run-finished".to_owned(), None),
        };

        event_log.push(line);
        if let Some((set, case, status)) = status {
            statuses.insert((set.name.clone(), case.name.clone()), status);
        }
    });

    Ok(RunRecord {
        event_log,
        statuses,
        run_stats,
    })
}

/// An upper bound for cases that shouldn't wait on anything.
pub(crate) const QUICK: Duration = Duration::from_secs(3);
