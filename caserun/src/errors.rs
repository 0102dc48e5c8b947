// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use caserun_metadata::CaserunExitCode;
use caserun_runner::errors::{
    ManifestLoadError, RunConfigBuildError, TestRunnerBuildError, ToolConfigParseError,
    WriteEventError,
};
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An expected failure: one that is reported with a message and a documented exit code.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("config parse error")]
    ToolConfigParseError {
        #[from]
        err: ToolConfigParseError,
    },
    #[error("run config build error")]
    RunConfigBuildError {
        #[from]
        err: RunConfigBuildError,
    },
    #[error("manifest load error")]
    ManifestLoadError {
        #[from]
        err: ManifestLoadError,
    },
    #[error("test runner build error")]
    TestRunnerBuildError {
        #[from]
        err: TestRunnerBuildError,
    },
    #[error("write event error")]
    WriteEventError {
        #[from]
        err: WriteEventError,
    },
    #[error("test run failed")]
    TestRunFailed,
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::ToolConfigParseError { .. }
            | Self::RunConfigBuildError { .. }
            | Self::TestRunnerBuildError { .. } => CaserunExitCode::SETUP_ERROR,
            Self::ManifestLoadError { .. } => CaserunExitCode::MANIFEST_LOAD_FAILED,
            Self::WriteEventError { .. } => CaserunExitCode::WRITE_OUTPUT_ERROR,
            Self::TestRunFailed => CaserunExitCode::TEST_RUN_FAILED,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::ToolConfigParseError { err } => {
                error!(
                    "failed to parse caserun config at `{}`",
                    err.config_file().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::RunConfigBuildError { err } => {
                error!("invalid run configuration");
                Some(err as &dyn Error)
            }
            Self::ManifestLoadError { err } => {
                error!(
                    "failed to load manifest at `{}`",
                    err.path().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::TestRunnerBuildError { err } => {
                error!("failed to build test runner");
                Some(err as &dyn Error)
            }
            Self::WriteEventError { err } => {
                error!("failed to write event to output");
                Some(err as &dyn Error)
            }
            Self::TestRunFailed => {
                error!("test run failed");
                None
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
