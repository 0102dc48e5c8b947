// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino_tempfile::Utf8TempDir;
use caserun_metadata::EventRecord;
use caserun_runner::{
    classify::FailureReason,
    reporter::{MessageFormat, Reporter, TestReporterBuilder},
    runner::{FinalRunStats, RunStats, TestRunnerBuilder},
    skip::SkipReason,
};
use color_eyre::eyre::{Result, bail, ensure};
use pretty_assertions::assert_eq;
use std::{cell::RefCell, rc::Rc, time::Duration};
use test_case::test_case;

#[test]
fn test_run_fixtures() -> Result<()> {
    test_init();

    let manifest = load_manifest()?;
    let config = config_builder().build()?;
    let record = execute_collect(&manifest, &config)?;

    for (set, case, expected) in EXPECTED_CASES {
        let status = record.status(set, case);
        assert_eq!(
            status.fixture_status(),
            *expected,
            "{set}/{case} has the expected status: {status:?}"
        );
    }

    assert_eq!(
        record.run_stats,
        RunStats {
            initial_run_count: EXPECTED_CASES.len(),
            passed: 9,
            failed: 4,
            skipped: 1,
            timed_out: 1,
        }
    );
    assert_eq!(
        record.run_stats.summarize_final(),
        FinalRunStats::Failed {
            failed: 4,
            timed_out: 1
        }
    );

    Ok(())
}

#[test]
fn test_event_order() -> Result<()> {
    test_init();

    let manifest = load_manifest()?;
    let config = config_builder().build()?;
    let record = execute_collect(&manifest, &config)?;

    let mut expected = vec!["run-started".to_owned()];
    let mut current_set = None;
    for (set, case, status) in EXPECTED_CASES {
        if current_set != Some(*set) {
            expected.push(format!("set-started {set}"));
            current_set = Some(*set);
        }
        let kind = match status {
            FixtureStatus::Pass => "case-passed",
            FixtureStatus::Fail => "case-failed",
            FixtureStatus::Skip => "case-skipped",
            FixtureStatus::Timeout => "case-timed-out",
        };
        expected.push(format!("{kind} {set} {case}"));
    }
    expected.push("run-finished".to_owned());

    assert_eq!(record.event_log, expected);
    Ok(())
}

#[test]
fn test_failure_reasons() -> Result<()> {
    test_init();

    let manifest = load_manifest()?;
    let config = config_builder().build()?;
    let record = execute_collect(&manifest, &config)?;

    let reason = |case: &str| match &record.status("run_fail", case).run_status().outcome {
        caserun_runner::classify::Outcome::Fail(reason) => reason.clone(),
        other => panic!("{case} failed, found {other:?}"),
    };

    assert!(matches!(
        reason("test_unexpected_pass.sh"),
        FailureReason::ExitMismatch {
            expected_failure: true,
            exit_code: Some(0),
        }
    ));
    assert!(matches!(
        reason("test_crash.sh"),
        FailureReason::ExitMismatch {
            expected_failure: false,
            exit_code: Some(3),
        }
    ));
    // The shell can't open the script. The exit code depends on the shell.
    assert!(matches!(
        reason("test_missing.sh"),
        FailureReason::ExitMismatch {
            expected_failure: false,
            exit_code: Some(code),
        } if code != 0
    ));
    match reason("test_golden_mismatch.sh") {
        FailureReason::OutputMismatch { golden } => {
            assert_eq!(golden, fixture_root().join("expected/golden_ok.txt"));
        }
        other => bail!("expected an output mismatch, found {other}"),
    }

    Ok(())
}

#[test]
fn test_combined_output() -> Result<()> {
    test_init();

    let manifest = load_manifest()?;
    let config = config_builder().build()?;
    let record = execute_collect(&manifest, &config)?;

    let run_status = record.status("run_pass", "test_pass.sh").run_status();
    assert_eq!(run_status.exit_code, Some(0));
    assert_eq!(run_status.output.as_str_lossy(), "hello from test_pass\n");

    // stdout and stderr share one pipe, so writes keep their order.
    let run_status = record.status("run_pass", "test_interleaved.sh").run_status();
    assert_eq!(
        run_status.output.as_str_lossy(),
        "out1\nerr1\nout2\nerr2\n"
    );

    let run_status = record.status("run_fail", "test_expected_fail.sh").run_status();
    assert_eq!(run_status.exit_code, Some(1));
    assert_eq!(run_status.output.as_str_lossy(), "failing on purpose\n");

    Ok(())
}

#[test]
fn test_timeout_terminates_process_group() -> Result<()> {
    test_init();

    let manifest = load_manifest()?;
    let config = config_builder().build()?;
    let record = execute_collect(&manifest, &config)?;

    let run_status = record.status("run_timeout", "test_sleep.sh").run_status();
    assert_eq!(run_status.timeout, Duration::from_secs(1));
    assert_eq!(run_status.exit_code, None, "killed processes have no exit code");
    // Both the script and its background sleep are gone well before their 30 seconds are up.
    ensure!(
        run_status.time_taken < Duration::from_secs(1) + QUICK,
        "timed out case took {:?}",
        run_status.time_taken
    );
    // Output written before the deadline is kept.
    assert_eq!(run_status.output.as_str_lossy(), "sleeping\n");

    Ok(())
}

#[test]
fn test_deadline_does_not_outlive_its_case() -> Result<()> {
    test_init();

    let manifest = load_manifest()?;
    let config = config_builder().build()?;
    let record = execute_collect(&manifest, &config)?;

    assert_eq!(
        record.status("run_timeout", "test_sleep.sh").fixture_status(),
        FixtureStatus::Timeout
    );

    // This case runs after a case with a 1 second timeout, and takes longer than that.
    let status = record.status("run_timeout", "test_sleep_after.sh");
    assert_eq!(status.fixture_status(), FixtureStatus::Pass, "{status:?}");
    let run_status = status.run_status();
    assert_eq!(run_status.timeout, Duration::from_secs(10));
    assert_eq!(run_status.exit_code, Some(0));
    assert_eq!(run_status.output.as_str_lossy(), "slept\n");
    ensure!(
        run_status.time_taken >= Duration::from_secs(2)
            && run_status.time_taken < Duration::from_secs(2) + QUICK,
        "case after a timeout took {:?}",
        run_status.time_taken
    );

    Ok(())
}

#[test]
fn test_leaked_pipe_does_not_stall() -> Result<()> {
    test_init();

    let manifest = load_manifest()?;
    let config = config_builder()
        .set_leak_timeout(Duration::from_millis(50))
        .build()?;
    let record = execute_collect(&manifest, &config)?;

    let run_status = record.status("run_pass", "test_leak.sh").run_status();
    ensure!(
        run_status.time_taken < QUICK,
        "leaky case took {:?}",
        run_status.time_taken
    );
    assert_eq!(run_status.output.as_str_lossy(), "leaking\n");

    Ok(())
}

#[test]
fn test_skip_modules() -> Result<()> {
    test_init();

    let manifest = load_manifest()?;
    let config = config_builder()
        .set_skip_modules(["fs_read".to_owned()])
        .build()?;
    let record = execute_collect(&manifest, &config)?;

    assert_eq!(
        record
            .status("run_pass", "test_fs_read.sh")
            .skip_reason()
            .to_string(),
        "module disabled"
    );
    assert_eq!(
        record.status("run_pass", "test_pass.sh").fixture_status(),
        FixtureStatus::Pass
    );
    assert_eq!(record.run_stats.skipped, 2);

    Ok(())
}

#[test]
fn test_enabled_modules() -> Result<()> {
    test_init();

    let manifest = load_manifest()?;
    let config = config_builder()
        .set_enabled_modules(["fs".to_owned(), "sleep".to_owned()])
        .build()?;
    let record = execute_collect(&manifest, &config)?;

    assert_eq!(
        record.status("run_pass", "test_fs_read.sh").fixture_status(),
        FixtureStatus::Pass
    );
    match record.status("run_pass", "test_net_basic.sh").skip_reason() {
        SkipReason::ModuleNotBuilt { module } => assert_eq!(module, "net"),
        other => bail!("expected module not built, found {other:?}"),
    }
    assert_eq!(
        record.status("run_timeout", "test_sleep.sh").fixture_status(),
        FixtureStatus::Timeout
    );
    // Tag-based skips take precedence over module gating.
    assert_eq!(
        record
            .status("run_pass", "test_skip_all.sh")
            .skip_reason()
            .to_string(),
        "not ready"
    );

    Ok(())
}

#[test_case(None, FixtureStatus::Pass; "other platform")]
#[test_case(Some("testos"), FixtureStatus::Skip; "tagged platform")]
fn test_platform_tag(platform: Option<&str>, expected: FixtureStatus) -> Result<()> {
    test_init();

    let manifest = load_manifest()?;
    let mut builder = config_builder();
    if let Some(platform) = platform {
        builder.set_platform(platform);
    }
    let config = builder.build()?;
    let record = execute_collect(&manifest, &config)?;

    let status = record.status("run_pass", "test_platform.sh");
    assert_eq!(status.fixture_status(), expected);
    if expected == FixtureStatus::Skip {
        assert_eq!(status.skip_reason().to_string(), "unsupported on testos");
    }

    Ok(())
}

#[test]
fn test_skip_expected() -> Result<()> {
    test_init();

    let manifest = load_manifest()?;
    let config = config_builder().set_check_expected(false).build()?;
    let record = execute_collect(&manifest, &config)?;

    assert_eq!(
        record
            .status("run_fail", "test_golden_mismatch.sh")
            .fixture_status(),
        FixtureStatus::Pass
    );
    assert_eq!(record.run_stats.failed, 3);

    Ok(())
}

#[test]
fn test_start_error() -> Result<()> {
    test_init();

    let manifest = load_manifest()?;
    let config = config_builder()
        .set_cmd_prefix("/nonexistent/caserun-wrapper --flag")
        .build()?;
    let record = execute_collect(&manifest, &config)?;

    for (set, case, expected) in EXPECTED_CASES {
        let status = record.status(set, case);
        if *expected == FixtureStatus::Skip {
            assert_eq!(status.fixture_status(), FixtureStatus::Skip);
            continue;
        }
        let run_status = status.run_status();
        assert!(
            matches!(
                run_status.outcome,
                caserun_runner::classify::Outcome::Fail(FailureReason::StartError(_))
            ),
            "{set}/{case} failed to start: {status:?}"
        );
        assert!(run_status.output.is_empty());
    }
    assert_eq!(record.run_stats.failed, EXPECTED_CASES.len() - 1);
    assert_eq!(record.run_stats.skipped, 1);

    Ok(())
}

#[test]
fn test_callback_error_stops_run() -> Result<()> {
    test_init();

    let manifest = load_manifest()?;
    let config = config_builder().build()?;
    let runner = TestRunnerBuilder::default().build(&manifest, &config)?;

    let mut seen = 0;
    let res = runner.try_execute(|_event| {
        seen += 1;
        // run-started, set-started, then the first case.
        if seen == 3 { Err("stop") } else { Ok(()) }
    });

    assert_eq!(res, Err("stop"));
    assert_eq!(seen, 3, "no events after the callback fails");
    Ok(())
}

#[test]
fn test_reporter_outputs() -> Result<()> {
    test_init();

    let manifest = load_manifest()?;
    let config = config_builder().build()?;
    let dir = Utf8TempDir::new()?;
    let junit_path = dir.path().join("junit").join("caserun.xml");

    let stderr = SharedBuf::default();
    let stdout = SharedBuf::default();
    let mut reporter = TestReporterBuilder::default()
        .set_message_format(MessageFormat::Json)
        .set_junit_path(Some(junit_path.clone()))
        .build(Box::new(stderr.clone()), Box::new(stdout.clone()));

    let runner = TestRunnerBuilder::default().build(&manifest, &config)?;
    let run_stats = runner.try_execute(|event| reporter.report_event(&event))?;
    reporter.finish()?;
    drop(reporter);
    assert!(!run_stats.is_success());

    let human = stderr.contents();
    assert!(human.contains("Starting 15 cases across 3 sets"), "{human}");
    assert!(
        human.contains("15 cases run: 9 passed, 4 failed, 1 timed out, 1 skipped"),
        "{human}"
    );

    let records = stdout
        .contents()
        .lines()
        .map(EventRecord::from_json_line)
        .collect::<Result<Vec<_>, _>>()?;
    // run-started, 3 set-started, 15 cases, run-finished
    assert_eq!(records.len(), 20);
    match records.last() {
        Some(EventRecord::RunFinished(summary)) => {
            assert_eq!(
                (summary.passed, summary.failed, summary.skipped, summary.timed_out),
                (9, 4, 1, 1)
            );
            assert!(!summary.success);
        }
        other => bail!("expected run-finished last, found {other:?}"),
    }

    let xml = std::fs::read_to_string(&junit_path)?;
    for set in ["run_pass", "run_fail", "run_timeout"] {
        assert!(xml.contains(&format!(r#"name="{set}""#)), "{xml}");
    }
    assert!(xml.contains("timed out after 1s"), "{xml}");

    Ok(())
}

/// A writer that can be inspected after being handed to a reporter.
#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl std::io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
