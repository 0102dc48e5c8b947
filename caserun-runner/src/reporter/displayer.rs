// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-readable output.

use super::{
    Reporter,
    events::{CaseRunStatus, TestEvent, TestEventKind},
};
use crate::{
    classify::Outcome,
    errors::WriteEventError,
    manifest::{TestCase, TestSet},
    runner::{FinalRunStats, RunStats},
};
use owo_colors::{OwoColorize, Style};
use std::{
    fmt::Write as _,
    io::{self, Write},
    time::Duration,
};

/// Writes test events to a terminal (or any other writer) in a human-readable form.
pub struct Displayer<'b> {
    writer: Box<dyn Write + 'b>,
    styles: Box<Styles>,
    show_output: bool,
}

impl<'b> Displayer<'b> {
    /// Creates a new displayer writing to `writer`.
    pub fn new(writer: Box<dyn Write + 'b>, should_colorize: bool, show_output: bool) -> Self {
        let mut styles = Box::<Styles>::default();
        if should_colorize {
            styles.colorize();
        }
        Self {
            writer,
            styles,
            show_output,
        }
    }

    fn write_event_impl(&mut self, event: &TestEvent<'_>) -> io::Result<()> {
        match &event.kind {
            TestEventKind::RunStarted {
                binary,
                platform,
                stability,
                set_count,
                case_count,
            } => {
                writeln!(self.writer, "------------")?;
                write!(self.writer, "{:>12} ", "Starting".style(self.styles.pass))?;
                write!(
                    self.writer,
                    "{} {} across {} {} (platform: {}",
                    case_count.style(self.styles.count),
                    plural(*case_count, "case", "cases"),
                    set_count.style(self.styles.count),
                    plural(*set_count, "set", "sets"),
                    platform.style(self.styles.count),
                )?;
                if let Some(stability) = stability {
                    write!(
                        self.writer,
                        ", stability: {}",
                        stability.style(self.styles.count)
                    )?;
                }
                writeln!(self.writer, ")")?;
                writeln!(self.writer, "{:>12} {binary}", "Binary".style(self.styles.pass))?;
            }
            TestEventKind::SetStarted { set } => {
                writeln!(
                    self.writer,
                    "{:>12} {}",
                    "Running".style(self.styles.pass),
                    set.name.style(self.styles.set),
                )?;
            }
            TestEventKind::CaseSkipped { set, case, reason } => {
                write!(self.writer, "{:>12} ", "SKIP".style(self.styles.skip))?;
                // same spacing as [   0.034s]
                write!(self.writer, "[         ] ")?;
                self.write_instance(set, case)?;
                let reason = reason.to_string();
                if !reason.is_empty() {
                    write!(self.writer, ": {reason}")?;
                }
                writeln!(self.writer)?;
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
                self.write_status_line(set, case, run_status)?;
                if self.show_output && !run_status.output.is_empty() {
                    self.write_output(set, case, run_status)?;
                }
            }
            TestEventKind::RunFinished {
                elapsed, run_stats, ..
            } => {
                self.write_summary(*elapsed, run_stats)?;
            }
        }

        self.writer.flush()
    }

    fn write_status_line(
        &mut self,
        set: &TestSet,
        case: &TestCase,
        run_status: &CaseRunStatus,
    ) -> io::Result<()> {
        match &run_status.outcome {
            Outcome::Pass => {
                write!(self.writer, "{:>12} ", "PASS".style(self.styles.pass))?;
            }
            Outcome::Fail(_) => {
                write!(self.writer, "{:>12} ", "FAIL".style(self.styles.fail))?;
            }
            Outcome::Timeout => {
                write!(self.writer, "{:>12} ", "TIMEOUT".style(self.styles.fail))?;
            }
            Outcome::Skip(_) => {
                write!(self.writer, "{:>12} ", "SKIP".style(self.styles.skip))?;
            }
        }
        self.write_duration(run_status.time_taken)?;
        self.write_instance(set, case)?;
        writeln!(self.writer)?;

        match &run_status.outcome {
            Outcome::Fail(reason) => {
                write!(self.writer, "{:>12} ", "Reason".style(self.styles.fail))?;
                write!(self.writer, "[         ] ")?;
                writeln!(self.writer, "{reason}")?;
            }
            Outcome::Timeout => {
                write!(self.writer, "{:>12} ", "Reason".style(self.styles.fail))?;
                write!(self.writer, "[         ] ")?;
                writeln!(
                    self.writer,
                    "terminated after {}s",
                    run_status.timeout.as_secs()
                )?;
            }
            Outcome::Pass | Outcome::Skip(_) => {}
        }

        Ok(())
    }

    fn write_output(
        &mut self,
        set: &TestSet,
        case: &TestCase,
        run_status: &CaseRunStatus,
    ) -> io::Result<()> {
        let header_style = if run_status.outcome.is_failure() {
            self.styles.fail
        } else {
            self.styles.pass
        };

        write!(self.writer, "\n{}", "--- OUTPUT: ".style(header_style))?;
        self.write_instance(set, case)?;
        writeln!(self.writer, "{}", " ---".style(header_style))?;

        let output = &run_status.output.buf;
        self.writer.write_all(output)?;
        if !output.ends_with(b"\n") {
            writeln!(self.writer)?;
        }
        writeln!(self.writer)
    }

    fn write_summary(&mut self, elapsed: Duration, run_stats: &RunStats) -> io::Result<()> {
        let summary_style = match run_stats.summarize_final() {
            FinalRunStats::Success => self.styles.pass,
            FinalRunStats::NoTestsRun => self.styles.skip,
            FinalRunStats::Incomplete | FinalRunStats::Failed { .. } => self.styles.fail,
        };
        write!(
            self.writer,
            "------------\n{:>12} ",
            "Summary".style(summary_style)
        )?;
        self.write_duration(elapsed)?;

        let finished_count = run_stats.finished_count();
        write!(self.writer, "{}", finished_count.style(self.styles.count))?;
        if finished_count != run_stats.initial_run_count {
            write!(
                self.writer,
                "/{}",
                run_stats.initial_run_count.style(self.styles.count)
            )?;
        }
        let cases_str = if run_stats.initial_run_count != 1 || finished_count != 1 {
            "cases"
        } else {
            "case"
        };

        let mut summary_str = String::new();
        write_summary_str(run_stats, &self.styles, &mut summary_str);
        writeln!(self.writer, " {cases_str} run: {summary_str}")
    }

    fn write_instance(&mut self, set: &TestSet, case: &TestCase) -> io::Result<()> {
        write!(
            self.writer,
            "{} {}",
            set.name.style(self.styles.set),
            case.name
        )
    }

    fn write_duration(&mut self, duration: Duration) -> io::Result<()> {
        // * > means right-align.
        // * 8 is the number of characters to pad to.
        // * .3 means print three digits after the decimal point.
        write!(self.writer, "[{:>8.3?}s] ", duration.as_secs_f64())
    }
}

impl<'a> Reporter<'a> for Displayer<'_> {
    fn report_event(&mut self, event: &TestEvent<'a>) -> Result<(), WriteEventError> {
        self.write_event_impl(event).map_err(WriteEventError::Io)
    }

    fn finish(&mut self) -> Result<(), WriteEventError> {
        self.writer.flush().map_err(WriteEventError::Io)
    }
}

fn write_summary_str(run_stats: &RunStats, styles: &Styles, out: &mut String) {
    // Writing to a String can't fail.
    let _ = write!(
        out,
        "{} {}, ",
        run_stats.passed.style(styles.count),
        "passed".style(styles.pass),
    );

    if run_stats.failed > 0 {
        let _ = write!(
            out,
            "{} {}, ",
            run_stats.failed.style(styles.count),
            "failed".style(styles.fail),
        );
    }

    if run_stats.timed_out > 0 {
        let _ = write!(
            out,
            "{} {}, ",
            run_stats.timed_out.style(styles.count),
            "timed out".style(styles.fail),
        );
    }

    let _ = write!(
        out,
        "{} {}",
        run_stats.skipped.style(styles.count),
        "skipped".style(styles.skip),
    );
}

fn plural(count: usize, singular: &'static str, plural: &'static str) -> &'static str {
    if count == 1 { singular } else { plural }
}

#[derive(Debug, Default)]
struct Styles {
    count: Style,
    pass: Style,
    fail: Style,
    skip: Style,
    set: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.skip = Style::new().yellow().bold();
        self.set = Style::new().magenta();
    }
}
