// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The result of running a single case's process.

use crate::errors::{ChildFdError, ChildStartError, ChildWaitError};
use bytes::Bytes;
use std::{borrow::Cow, process::ExitStatus, time::Duration};

/// The output of executing a child process.
#[derive(Clone, Debug)]
pub enum ChildExecutionOutput {
    /// The process was started and ran to completion or was terminated.
    Output {
        /// How the process finished, or the error that occurred while waiting for it.
        result: Result<ExitOutcome, ChildWaitError>,

        /// Combined standard output and standard error, in the order they were written.
        output: ChildOutput,

        /// Wall-clock time from spawning the process to reaping it.
        time_taken: Duration,
    },

    /// The process could not be started.
    StartError(ChildStartError),
}

/// How a child process finished.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExitOutcome {
    /// The process exited on its own, normally or through a signal.
    Exited(ExitStatus),

    /// The process outlived its deadline and was killed.
    TimedOut,
}

impl ExitOutcome {
    /// Returns the exit code, if the process exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exited(status) => status.code(),
            Self::TimedOut => None,
        }
    }
}

/// Captured output of a child process.
#[derive(Clone, Debug, Default)]
pub struct ChildOutput {
    /// The raw bytes read from the combined pipe.
    pub buf: Bytes,

    /// An error that stopped reading before end of file. `buf` holds whatever was read before it.
    pub read_error: Option<ChildFdError>,
}

impl ChildOutput {
    /// Returns the output as a lossy UTF-8 string.
    pub fn as_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.buf)
    }

    /// Returns true if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
