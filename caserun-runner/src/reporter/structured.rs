// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Machine-readable output: one JSON record per line.

use super::{
    Reporter,
    events::{CaseRunStatus, TestEvent, TestEventKind},
};
use crate::{classify::Outcome, errors::WriteEventError};
use caserun_metadata::{EventRecord, RunSummary};
use std::io::Write;

/// Writes each event as an [`EventRecord`] on its own line.
pub struct StructuredReporter<'b> {
    writer: Box<dyn Write + 'b>,
    show_output: bool,
}

impl<'b> StructuredReporter<'b> {
    /// Creates a new reporter writing to `writer`.
    ///
    /// The captured output of failed and timed-out cases is always included. With `show_output`,
    /// the output of passing cases is included too.
    pub fn new(writer: Box<dyn Write + 'b>, show_output: bool) -> Self {
        Self {
            writer,
            show_output,
        }
    }

    fn to_record(&self, event: &TestEvent<'_>) -> EventRecord {
        match &event.kind {
            TestEventKind::RunStarted {
                binary,
                platform,
                stability,
                set_count,
                case_count,
            } => EventRecord::RunStarted {
                binary: binary.to_string(),
                platform: (*platform).to_owned(),
                stability: stability.map(str::to_owned),
                set_count: *set_count,
                case_count: *case_count,
            },
            TestEventKind::SetStarted { set } => EventRecord::SetStarted {
                set: set.name.clone(),
            },
            TestEventKind::CaseSkipped { set, case, reason } => EventRecord::CaseSkipped {
                set: set.name.clone(),
                name: case.name.clone(),
                reason: reason.to_string(),
            },
            TestEventKind::CasePassed {
                set,
                case,
                run_status,
            } => EventRecord::CasePassed {
                set: set.name.clone(),
                name: case.name.clone(),
                exec_time: run_status.time_taken.as_secs_f64(),
                output: self.output_for(run_status),
            },
            TestEventKind::CaseFailed {
                set,
                case,
                run_status,
            } => EventRecord::CaseFailed {
                set: set.name.clone(),
                name: case.name.clone(),
                exec_time: run_status.time_taken.as_secs_f64(),
                reason: match &run_status.outcome {
                    Outcome::Fail(reason) => reason.to_string(),
                    _ => String::new(),
                },
                exit_code: run_status.exit_code,
                output: self.output_for(run_status),
            },
            TestEventKind::CaseTimedOut {
                set,
                case,
                run_status,
            } => EventRecord::CaseTimedOut {
                set: set.name.clone(),
                name: case.name.clone(),
                exec_time: run_status.time_taken.as_secs_f64(),
                output: self.output_for(run_status),
            },
            TestEventKind::RunFinished {
                elapsed, run_stats, ..
            } => EventRecord::RunFinished(RunSummary {
                passed: run_stats.passed,
                failed: run_stats.failed,
                skipped: run_stats.skipped,
                timed_out: run_stats.timed_out,
                exec_time: elapsed.as_secs_f64(),
                success: run_stats.is_success(),
            }),
        }
    }

    fn output_for(&self, run_status: &CaseRunStatus) -> Option<String> {
        let include = self.show_output || run_status.outcome.is_failure();
        (include && !run_status.output.is_empty())
            .then(|| run_status.output.as_str_lossy().into_owned())
    }
}

impl<'a> Reporter<'a> for StructuredReporter<'_> {
    fn report_event(&mut self, event: &TestEvent<'a>) -> Result<(), WriteEventError> {
        let record = self.to_record(event);
        serde_json::to_writer(&mut self.writer, &record).map_err(WriteEventError::Json)?;
        writeln!(self.writer).map_err(WriteEventError::Io)?;
        self.writer.flush().map_err(WriteEventError::Io)
    }

    fn finish(&mut self) -> Result<(), WriteEventError> {
        self.writer.flush().map_err(WriteEventError::Io)
    }
}
