// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    config::RunConfig,
    errors::ChildStartError,
    manifest::{TestCase, TestSet},
};
use std::fmt;

mod imp;

pub(crate) use imp::{Child, ChildAccumulator};

/// The command line for a single case: `[prefix program] [prefix args] <binary> <case name>`.
pub(crate) struct TestCommand {
    command: std::process::Command,
}

impl TestCommand {
    /// Creates the command for `case`, to be run in the directory of `set`.
    pub(crate) fn new(config: &RunConfig, set: &TestSet, case: &TestCase) -> Self {
        let mut command = match config.cmd_prefix() {
            Some(prefix) => {
                let mut command = std::process::Command::new(prefix.program());
                command.args(prefix.args()).arg(config.binary());
                command
            }
            None => std::process::Command::new(config.binary()),
        };
        command.arg(&case.name).current_dir(&set.dir);

        Self { command }
    }

    #[inline]
    pub(crate) fn command_mut(&mut self) -> &mut std::process::Command {
        &mut self.command
    }

    /// Spawns the command with standard output and standard error sent to the same pipe.
    pub(crate) fn spawn(self) -> Result<Child, ChildStartError> {
        imp::spawn(self.command)
    }
}

impl fmt::Display for TestCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let program = self.command.get_program().to_string_lossy();
        let args = self
            .command
            .get_args()
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>();
        f.write_str(&shell_words::join(std::iter::once(&program).chain(&args)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::RunConfigBuilder, manifest::TestManifest};
    use camino_tempfile::Utf8TempDir;
    use pretty_assertions::assert_eq;

    #[test]
    fn command_line() {
        let dir = Utf8TempDir::new().expect("temp dir created");
        let binary = dir.path().join("iotjs");
        std::fs::write(&binary, b"").expect("binary written");
        let manifest = TestManifest::parse(
            dir.path().join("testsets.json"),
            r#"{ "run_pass": [ { "name": "test_fs open.js" } ] }"#,
        )
        .expect("manifest is valid");
        let set = &manifest.sets()[0];

        let config = RunConfigBuilder::new(&binary)
            .build()
            .expect("config is valid");
        let command = TestCommand::new(&config, set, &set.cases[0]);
        assert_eq!(
            command.to_string(),
            format!("{binary} 'test_fs open.js'"),
        );
        assert_eq!(
            command.command.get_current_dir(),
            Some(dir.path().join("run_pass").as_std_path()),
        );

        let config = RunConfigBuilder::new(&binary)
            .set_cmd_prefix("valgrind --error-exitcode=5")
            .build()
            .expect("config is valid");
        let command = TestCommand::new(&config, set, &set.cases[0]);
        assert_eq!(
            command.to_string(),
            // shell-words quotes `=`.
            format!("valgrind '--error-exitcode=5' {binary} 'test_fs open.js'"),
        );
    }
}
