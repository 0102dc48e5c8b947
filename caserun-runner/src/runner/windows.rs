// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use tokio::process::Child;

// Processes aren't grouped on Windows: only the child itself is killed on timeout.
pub(super) fn set_process_group(_cmd: &mut std::process::Command) {}

/// Kills the child. The child must still be reaped with `wait`.
pub(super) fn terminate_child(child: &mut Child) {
    // This fails if the child has already exited, which is fine.
    let _ = child.start_kill();
}
