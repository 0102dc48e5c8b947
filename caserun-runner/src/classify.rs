// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns the result of running a case into a verdict.

use crate::{
    errors::{ChildStartError, ChildWaitError, DisplayErrorChain},
    manifest::TestCase,
    skip::SkipReason,
    test_output::{ChildExecutionOutput, ChildOutput, ExitOutcome},
};
use camino::Utf8PathBuf;
use std::{fmt, io, sync::Arc};
use tracing::warn;

/// The verdict for a single case.
#[derive(Clone, Debug)]
pub enum Outcome {
    /// The case behaved as expected.
    Pass,

    /// The case did not behave as expected.
    Fail(FailureReason),

    /// The case was not run.
    Skip(SkipReason),

    /// The case ran past its timeout and was terminated.
    Timeout,
}

impl Outcome {
    /// Returns true if this outcome counts against the run.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fail(_) | Self::Timeout)
    }
}

/// Why a case failed.
#[derive(Clone, Debug)]
pub enum FailureReason {
    /// The process could not be started.
    StartError(ChildStartError),

    /// Waiting for the process failed.
    WaitError(ChildWaitError),

    /// The process's success or failure did not match the case's expectation.
    ExitMismatch {
        /// Whether the case expected the process to fail.
        expected_failure: bool,

        /// The exit code, or `None` if the process was terminated by a signal.
        exit_code: Option<i32>,
    },

    /// The captured output differs from the golden file.
    OutputMismatch {
        /// The golden file.
        golden: Utf8PathBuf,
    },

    /// The golden file could not be read.
    GoldenUnreadable {
        /// The golden file.
        golden: Utf8PathBuf,

        /// The error that occurred while reading it.
        error: Arc<io::Error>,
    },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartError(error) => write!(f, "{}", DisplayErrorChain::new(error)),
            Self::WaitError(error) => write!(f, "{}", DisplayErrorChain::new(error)),
            Self::ExitMismatch {
                expected_failure: true,
                ..
            } => f.write_str("expected failure, but exited with code 0"),
            Self::ExitMismatch {
                expected_failure: false,
                exit_code: Some(code),
            } => write!(f, "exited with code {code}"),
            Self::ExitMismatch {
                expected_failure: false,
                exit_code: None,
            } => f.write_str("terminated by a signal"),
            Self::OutputMismatch { golden } => write!(f, "output differs from {golden}"),
            Self::GoldenUnreadable { golden, error } => {
                write!(f, "error reading golden file {golden}: {error}")
            }
        }
    }
}

/// Classifies the result of running `case`.
///
/// The exit status is checked first: a process whose success or failure doesn't match
/// `case.expect_failure` fails regardless of its output. Only then, if `check_expected` is set
/// and the case names a golden file, is the output compared byte for byte.
pub fn classify(case: &TestCase, exec: &ChildExecutionOutput, check_expected: bool) -> Outcome {
    let (result, output) = match exec {
        ChildExecutionOutput::StartError(error) => {
            return Outcome::Fail(FailureReason::StartError(error.clone()));
        }
        ChildExecutionOutput::Output { result, output, .. } => (result, output),
    };

    let status = match result {
        Ok(ExitOutcome::TimedOut) => return Outcome::Timeout,
        Ok(ExitOutcome::Exited(status)) => status,
        Err(error) => return Outcome::Fail(FailureReason::WaitError(error.clone())),
    };

    // A process terminated by a signal has no exit code, and counts as having failed.
    let exited_with_failure = !status.success();
    if exited_with_failure != case.expect_failure {
        return Outcome::Fail(FailureReason::ExitMismatch {
            expected_failure: case.expect_failure,
            exit_code: status.code(),
        });
    }

    match &case.expected_output {
        Some(golden) if check_expected => compare_golden(golden, output),
        _ => Outcome::Pass,
    }
}

fn compare_golden(golden: &Utf8PathBuf, output: &ChildOutput) -> Outcome {
    match std::fs::read(golden) {
        Ok(expected) if expected[..] == output.buf[..] => Outcome::Pass,
        Ok(_) => Outcome::Fail(FailureReason::OutputMismatch {
            golden: golden.clone(),
        }),
        Err(error) => {
            warn!("error reading golden file {golden}: {error}");
            Outcome::Fail(FailureReason::GoldenUnreadable {
                golden: golden.clone(),
                error: Arc::new(error),
            })
        }
    }
}
