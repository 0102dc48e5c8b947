// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prints out and records test events.
//!
//! The main structure in this module is [`TestReporter`], which renders events for humans on
//! standard error and can additionally emit JSON lines on standard output and a JUnit XML report.

mod displayer;
pub mod events;
mod junit;
mod structured;

pub use displayer::Displayer;
pub use junit::JunitReporter;
pub use structured::StructuredReporter;

use crate::errors::WriteEventError;
use camino::Utf8PathBuf;
use events::TestEvent;
use std::io::Write;

/// A sink for test events.
///
/// Events are passed in the order the runner produces them.
pub trait Reporter<'a> {
    /// Reports a single event.
    fn report_event(&mut self, event: &TestEvent<'a>) -> Result<(), WriteEventError>;

    /// Called once after the last event.
    fn finish(&mut self) -> Result<(), WriteEventError> {
        Ok(())
    }
}

/// The format for machine-readable output on standard output.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum MessageFormat {
    /// No machine-readable output: human-readable output is written to standard error only.
    #[default]
    Human,

    /// One JSON record per line, as described by [`caserun_metadata::EventRecord`].
    Json,
}

/// Test reporter builder.
#[derive(Debug, Default)]
pub struct TestReporterBuilder {
    should_colorize: bool,
    show_output: bool,
    message_format: MessageFormat,
    junit_path: Option<Utf8PathBuf>,
}

impl TestReporterBuilder {
    /// Set to true if the reporter should colorize output.
    pub fn set_colorize(&mut self, should_colorize: bool) -> &mut Self {
        self.should_colorize = should_colorize;
        self
    }

    /// Set to true to echo the captured output of every executed case.
    pub fn set_show_output(&mut self, show_output: bool) -> &mut Self {
        self.show_output = show_output;
        self
    }

    /// Sets the format of machine-readable output.
    pub fn set_message_format(&mut self, message_format: MessageFormat) -> &mut Self {
        self.message_format = message_format;
        self
    }

    /// Sets the path to write a JUnit XML report to.
    pub fn set_junit_path(&mut self, path: Option<Utf8PathBuf>) -> &mut Self {
        self.junit_path = path;
        self
    }

    /// Creates a new test reporter.
    pub fn build<'b>(
        &self,
        stderr: Box<dyn Write + 'b>,
        stdout: Box<dyn Write + 'b>,
    ) -> TestReporter<'b> {
        let displayer = Displayer::new(stderr, self.should_colorize, self.show_output);
        let structured = match self.message_format {
            MessageFormat::Human => None,
            MessageFormat::Json => Some(StructuredReporter::new(stdout, self.show_output)),
        };
        let junit = self.junit_path.clone().map(JunitReporter::new);

        TestReporter {
            displayer,
            structured,
            junit,
        }
    }
}

/// Reports test events to standard error, and optionally as JSON lines and JUnit XML.
///
/// Created using [`TestReporterBuilder::build`].
pub struct TestReporter<'b> {
    displayer: Displayer<'b>,
    structured: Option<StructuredReporter<'b>>,
    junit: Option<JunitReporter>,
}

impl<'a> Reporter<'a> for TestReporter<'_> {
    fn report_event(&mut self, event: &TestEvent<'a>) -> Result<(), WriteEventError> {
        self.displayer.report_event(event)?;
        if let Some(structured) = &mut self.structured {
            structured.report_event(event)?;
        }
        if let Some(junit) = &mut self.junit {
            junit.report_event(event)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), WriteEventError> {
        self.displayer.finish()?;
        if let Some(structured) = &mut self.structured {
            structured.finish()?;
        }
        Ok(())
    }
}
