// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JUnit XML output.

use super::{
    Reporter,
    events::{CaseRunStatus, TestEvent, TestEventKind},
};
use crate::{classify::Outcome, errors::WriteEventError};
use camino::{Utf8Path, Utf8PathBuf};
use debug_ignore::DebugIgnore;
use indexmap::IndexMap;
use quick_junit::{NonSuccessKind, Report, TestCase, TestCaseStatus, TestSuite};
use std::fs::File;

const REPORT_NAME: &str = "caserun-run";

/// Collects case results into one `<testsuite>` per test set, and writes them out as a JUnit XML
/// report once the run finishes.
#[derive(Clone, Debug)]
pub struct JunitReporter {
    path: Utf8PathBuf,
    test_suites: DebugIgnore<IndexMap<String, TestSuite>>,
}

impl JunitReporter {
    /// Creates a new reporter that writes to `path` when the run finishes.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            test_suites: DebugIgnore(IndexMap::new()),
        }
    }

    /// Returns the path the report is written to.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn testsuite_for_set(&mut self, name: &str) -> &mut TestSuite {
        self.test_suites
            .entry(name.to_owned())
            .or_insert_with(|| TestSuite::new(name))
    }

    fn add_finished(&mut self, set: &str, name: &str, run_status: &CaseRunStatus) {
        let mut status = match &run_status.outcome {
            Outcome::Pass => TestCaseStatus::success(),
            Outcome::Fail(reason) => {
                let mut status = TestCaseStatus::non_success(NonSuccessKind::Failure);
                status
                    .set_type("case failure")
                    .set_message(reason.to_string());
                status
            }
            Outcome::Timeout => {
                let mut status = TestCaseStatus::non_success(NonSuccessKind::Failure);
                status.set_type("case timeout").set_message(format!(
                    "timed out after {}s",
                    run_status.timeout.as_secs()
                ));
                status
            }
            Outcome::Skip(reason) => {
                let mut status = TestCaseStatus::skipped();
                status.set_message(reason.to_string());
                status
            }
        };
        if let Some(code) = run_status.exit_code
            && !matches!(run_status.outcome, Outcome::Pass)
        {
            status.set_description(format!("exit code: {code}"));
        }

        let mut testcase = TestCase::new(name, status);
        testcase
            .set_classname(set)
            .set_timestamp(run_status.start_time.fixed_offset())
            .set_time(run_status.time_taken);
        if !run_status.output.is_empty() {
            testcase.set_system_out(run_status.output.as_str_lossy().into_owned());
        }

        self.testsuite_for_set(set).add_test_case(testcase);
    }

    fn write_report(&self, report: &Report) -> Result<(), WriteEventError> {
        if let Some(dir) = self.path.parent()
            && !dir.as_str().is_empty()
        {
            std::fs::create_dir_all(dir).map_err(|error| WriteEventError::Fs {
                file: dir.to_path_buf(),
                error,
            })?;
        }

        let f = File::create(&self.path).map_err(|error| WriteEventError::Fs {
            file: self.path.clone(),
            error,
        })?;
        report
            .serialize(f)
            .map_err(|error| WriteEventError::Junit {
                file: self.path.clone(),
                error,
            })
    }
}

impl<'a> Reporter<'a> for JunitReporter {
    fn report_event(&mut self, event: &TestEvent<'a>) -> Result<(), WriteEventError> {
        match &event.kind {
            TestEventKind::RunStarted { .. } => {}
            TestEventKind::SetStarted { set } => {
                // Sets with no cases still get an empty suite.
                self.testsuite_for_set(&set.name);
            }
            TestEventKind::CaseSkipped { set, case, reason } => {
                let mut status = TestCaseStatus::skipped();
                status.set_message(reason.to_string());
                let mut testcase = TestCase::new(case.name.as_str(), status);
                testcase.set_classname(set.name.as_str());
                self.testsuite_for_set(&set.name).add_test_case(testcase);
            }
            TestEventKind::CasePassed {
                set,
                case,
                run_status,
            }
            | TestEventKind::CaseFailed {
                set,
                case,
                run_status,
            }
            | TestEventKind::CaseTimedOut {
                set,
                case,
                run_status,
            } => {
                self.add_finished(&set.name, &case.name, run_status);
            }
            TestEventKind::RunFinished {
                start_time,
                elapsed,
                ..
            } => {
                let mut report = Report::new(REPORT_NAME);
                report
                    .set_timestamp(*start_time)
                    .set_time(*elapsed)
                    .add_test_suites(self.test_suites.drain(..).map(|(_, suite)| suite));
                self.write_report(&report)?;
            }
        }

        Ok(())
    }
}
