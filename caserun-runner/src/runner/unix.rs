// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use libc::SIGKILL;
use std::os::unix::process::CommandExt;
use tokio::process::Child;

/// Places the child in a new process group, so that it and its descendants can be killed
/// together.
pub(super) fn set_process_group(cmd: &mut std::process::Command) {
    cmd.process_group(0);
}

/// Kills the child's process group. The child must still be reaped with `wait`.
pub(super) fn terminate_child(child: &mut Child) {
    let Some(pid) = child.id() else {
        // Already reaped.
        return;
    };
    // The process group ID is the child's PID, and a negative PID targets the whole group.
    unsafe {
        libc::kill(-(pid as libc::pid_t), SIGKILL);
    }
}
