// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs a single case's process against a deadline.

use crate::{
    config::RunConfig,
    errors::ChildWaitError,
    manifest::{TestCase, TestSet},
    test_command::{Child, ChildAccumulator, TestCommand},
    test_output::{ChildExecutionOutput, ExitOutcome},
};
use std::{io, process::ExitStatus, sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Runs `case` to completion or until `timeout` elapses, whichever comes first.
///
/// The child is never left running when this returns: on timeout it is killed (with its process
/// group on Unix) and reaped. The deadline lives only as long as this call.
pub(super) async fn run_case(
    config: &RunConfig,
    set: &TestSet,
    case: &TestCase,
    timeout: Duration,
) -> ChildExecutionOutput {
    let mut cmd = TestCommand::new(config, set, case);
    super::os::set_process_group(cmd.command_mut());

    debug!(
        command = %cmd,
        cwd = %set.dir,
        timeout = ?timeout,
        "starting case `{}`",
        case.name,
    );

    let stopwatch = crate::time::stopwatch();
    let Child {
        mut child,
        mut child_acc,
    } = match cmd.spawn() {
        Ok(child) => child,
        Err(error) => {
            debug!("failed to start case `{}`: {error}", case.name);
            return ChildExecutionOutput::StartError(error);
        }
    };

    let mut deadline = std::pin::pin!(tokio::time::sleep(timeout));

    let result = loop {
        tokio::select! {
            () = child_acc.fill_buf(), if !child_acc.is_done() => {}
            res = child.wait() => {
                break res
                    .map(ExitOutcome::Exited)
                    .map_err(|error| ChildWaitError(Arc::new(error)));
            }
            () = &mut deadline => {
                debug!("case `{}` timed out after {timeout:?}, killing it", case.name);
                super::os::terminate_child(&mut child);
                // Reap the child before returning, so it's gone before the next case starts.
                let reaped = child.wait().await;
                break Ok(timed_out_outcome(&case.name, reaped));
            }
        }
    };

    let leaked = drain_output(&mut child_acc, config.leak_timeout()).await;
    if leaked {
        warn!(
            "case `{}` left a process holding its output open after exiting",
            case.name,
        );
    }

    let time_taken = stopwatch.snapshot().duration;
    let output = child_acc.freeze();
    if let Some(error) = &output.read_error {
        warn!("error reading output of case `{}`: {error}", case.name);
    }

    debug!(
        result = ?result,
        time_taken = ?time_taken,
        "case `{}` finished",
        case.name,
    );

    ChildExecutionOutput::Output {
        result,
        output,
        time_taken,
    }
}

/// The outcome of a case whose deadline expired. A failure to reap the killed child is logged but
/// doesn't change the outcome.
fn timed_out_outcome(case_name: &str, reaped: io::Result<ExitStatus>) -> ExitOutcome {
    if let Err(error) = reaped {
        warn!("error waiting for case `{case_name}` to exit after killing it: {error}");
    }
    ExitOutcome::TimedOut
}

/// Reads the remaining output after the child has exited.
///
/// Descendants of the child may keep the pipe open. Reading stops after `leak_timeout`, keeping
/// whatever was read so far. Returns true if the pipe was still open at that point.
async fn drain_output(child_acc: &mut ChildAccumulator, leak_timeout: Duration) -> bool {
    let mut sleep = std::pin::pin!(tokio::time::sleep(leak_timeout));

    loop {
        tokio::select! {
            biased;

            () = child_acc.fill_buf(), if !child_acc.is_done() => {}
            () = &mut sleep, if !child_acc.is_done() => {
                break true;
            }
            else => {
                break false;
            }
        }
    }
}
