// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::executor::run_case;
use crate::{
    classify::{Outcome, classify},
    config::RunConfig,
    errors::TestRunnerBuildError,
    manifest::{TestCase, TestManifest, TestSet},
    reporter::events::{CaseRunStatus, TestEvent, TestEventKind},
    skip::{self, SkipDecision},
    test_output::{ChildExecutionOutput, ChildOutput},
    time::StopwatchStart,
};
use chrono::Local;
use std::convert::Infallible;
use tokio::runtime::Runtime;
use tracing::debug;

/// Test runner options.
#[derive(Debug, Default)]
pub struct TestRunnerBuilder {}

impl TestRunnerBuilder {
    /// Creates a new test runner.
    ///
    /// Cases run one at a time, in manifest order, on a dedicated single-threaded runtime.
    pub fn build<'a>(
        self,
        manifest: &'a TestManifest,
        config: &'a RunConfig,
    ) -> Result<TestRunner<'a>, TestRunnerBuildError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(TestRunnerBuildError::TokioRuntimeCreate)?;

        Ok(TestRunner {
            manifest,
            config,
            runtime,
        })
    }
}

/// Context for running cases.
///
/// Created using [`TestRunnerBuilder::build`].
#[derive(Debug)]
pub struct TestRunner<'a> {
    manifest: &'a TestManifest,
    config: &'a RunConfig,
    runtime: Runtime,
}

impl<'a> TestRunner<'a> {
    /// Executes every case in the manifest, each one in its own process.
    ///
    /// The callback is called with each event, in order.
    pub fn execute<F>(self, mut callback: F) -> RunStats
    where
        F: FnMut(TestEvent<'a>),
    {
        let res = self.try_execute::<Infallible, _>(|event| {
            callback(event);
            Ok(())
        });
        match res {
            Ok(run_stats) => run_stats,
            Err(never) => match never {},
        }
    }

    /// Executes every case in the manifest, each one in its own process.
    ///
    /// Accepts a callback that is called with each event, in order. If the callback returns an
    /// error, no further cases are started and the error is returned.
    pub fn try_execute<E, F>(self, mut callback: F) -> Result<RunStats, E>
    where
        F: FnMut(TestEvent<'a>) -> Result<(), E>,
    {
        let stopwatch = crate::time::stopwatch();
        let mut cx = RunContext {
            stopwatch: &stopwatch,
            callback: &mut callback,
        };

        let res = self.runtime.block_on(run_inner(self.manifest, self.config, &mut cx));

        // A descendant of a case may still hold an output pipe open, keeping a blocking read
        // alive. Don't wait for it.
        self.runtime.shutdown_background();

        res
    }
}

struct RunContext<'s, F> {
    stopwatch: &'s StopwatchStart,
    callback: &'s mut F,
}

impl<'s, F> RunContext<'s, F> {
    fn emit<'a, E>(&mut self, kind: TestEventKind<'a>) -> Result<(), E>
    where
        F: FnMut(TestEvent<'a>) -> Result<(), E>,
    {
        let event = TestEvent {
            timestamp: Local::now().fixed_offset(),
            elapsed: self.stopwatch.snapshot().duration,
            kind,
        };
        (self.callback)(event)
    }
}

async fn run_inner<'a, E, F>(
    manifest: &'a TestManifest,
    config: &'a RunConfig,
    cx: &mut RunContext<'_, F>,
) -> Result<RunStats, E>
where
    F: FnMut(TestEvent<'a>) -> Result<(), E>,
{
    let mut run_stats = RunStats {
        initial_run_count: manifest.case_count(),
        ..RunStats::default()
    };

    cx.emit(TestEventKind::RunStarted {
        binary: config.binary(),
        platform: config.platform(),
        stability: config.stability(),
        set_count: manifest.set_count(),
        case_count: manifest.case_count(),
    })?;

    let skip_cx = config.skip_context();
    for set in manifest.sets() {
        debug!("starting test set `{}` in {}", set.name, set.dir);
        cx.emit(TestEventKind::SetStarted { set })?;

        for case in &set.cases {
            let kind = match skip::evaluate(case, &skip_cx) {
                SkipDecision::Skip { reason } => {
                    debug!("skipping case `{}`: {reason}", case.name);
                    run_stats.on_case_finished(&Outcome::Skip(reason.clone()));
                    TestEventKind::CaseSkipped { set, case, reason }
                }
                SkipDecision::Run => {
                    let run_status = run_one(config, set, case).await;
                    run_stats.on_case_finished(&run_status.outcome);
                    case_finished_kind(set, case, run_status)
                }
            };
            cx.emit(kind)?;
        }
    }

    cx.emit(TestEventKind::RunFinished {
        start_time: cx.stopwatch.start_time().fixed_offset(),
        elapsed: cx.stopwatch.snapshot().duration,
        run_stats,
    })?;

    Ok(run_stats)
}

async fn run_one(config: &RunConfig, set: &TestSet, case: &TestCase) -> CaseRunStatus {
    let timeout = case.effective_timeout(config.default_timeout());
    let start_time = Local::now();
    let exec = run_case(config, set, case, timeout).await;
    let outcome = classify(case, &exec, config.check_expected());

    let (exit_code, output, time_taken) = match exec {
        ChildExecutionOutput::Output {
            result,
            output,
            time_taken,
        } => (
            result.ok().and_then(|result| result.exit_code()),
            output,
            time_taken,
        ),
        ChildExecutionOutput::StartError(_) => {
            (None, ChildOutput::default(), std::time::Duration::ZERO)
        }
    };

    CaseRunStatus {
        outcome,
        exit_code,
        output,
        start_time,
        time_taken,
        timeout,
    }
}

fn case_finished_kind<'a>(
    set: &'a TestSet,
    case: &'a TestCase,
    run_status: CaseRunStatus,
) -> TestEventKind<'a> {
    match &run_status.outcome {
        Outcome::Pass => TestEventKind::CasePassed {
            set,
            case,
            run_status,
        },
        Outcome::Fail(_) => TestEventKind::CaseFailed {
            set,
            case,
            run_status,
        },
        Outcome::Timeout => TestEventKind::CaseTimedOut {
            set,
            case,
            run_status,
        },
        Outcome::Skip(reason) => TestEventKind::CaseSkipped {
            set,
            case,
            reason: reason.clone(),
        },
    }
}

/// Statistics for a run: the tally of case outcomes.
///
/// At every point during a run, `passed + failed + skipped + timed_out` equals the number of
/// cases evaluated so far.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
pub struct RunStats {
    /// The number of cases in the manifest.
    ///
    /// If the run was stopped early, this is more than [`Self::finished_count`] at the end.
    pub initial_run_count: usize,

    /// The number of cases that passed.
    pub passed: usize,

    /// The number of cases that failed.
    pub failed: usize,

    /// The number of cases that were skipped.
    pub skipped: usize,

    /// The number of cases that timed out.
    pub timed_out: usize,
}

impl RunStats {
    /// Returns the number of cases that reached a verdict.
    #[inline]
    pub fn finished_count(&self) -> usize {
        self.passed + self.failed + self.skipped + self.timed_out
    }

    /// Returns true if this run is considered a success: no case failed or timed out, and the
    /// run was not stopped early.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.timed_out == 0 && self.initial_run_count <= self.finished_count()
    }

    /// Summarizes the stats into a [`FinalRunStats`].
    pub fn summarize_final(&self) -> FinalRunStats {
        if self.failed > 0 || self.timed_out > 0 {
            FinalRunStats::Failed {
                failed: self.failed,
                timed_out: self.timed_out,
            }
        } else if self.initial_run_count > self.finished_count() {
            FinalRunStats::Incomplete
        } else if self.passed == 0 {
            FinalRunStats::NoTestsRun
        } else {
            FinalRunStats::Success
        }
    }

    pub(super) fn on_case_finished(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Pass => self.passed += 1,
            Outcome::Fail(_) => self.failed += 1,
            Outcome::Skip(_) => self.skipped += 1,
            Outcome::Timeout => self.timed_out += 1,
        }
    }
}

/// A final, summarized version of [`RunStats`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FinalRunStats {
    /// At least one case ran, and all cases that ran passed.
    Success,

    /// No cases ran: every case was skipped, or the manifest was empty.
    NoTestsRun,

    /// The run was stopped before every case finished, because reporting failed.
    Incomplete,

    /// At least one case failed or timed out.
    Failed {
        /// The number of cases that failed.
        failed: usize,

        /// The number of cases that timed out.
        timed_out: usize,
    },
}
