// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::ToolConfig;
use crate::{errors::RunConfigBuildError, skip::SkipContext};
use camino::{Utf8Path, Utf8PathBuf};
use std::{collections::BTreeSet, time::Duration};

/// Returns the identifier of the platform caserun is running on.
///
/// This is the value of [`std::env::consts::OS`], e.g. `linux`, `macos` or `windows`.
pub fn host_platform() -> &'static str {
    std::env::consts::OS
}

/// Process-wide, read-only configuration for a run.
///
/// Created through [`RunConfigBuilder::build`]; never mutated afterwards.
#[derive(Clone, Debug)]
pub struct RunConfig {
    binary: Utf8PathBuf,
    default_timeout: Duration,
    leak_timeout: Duration,
    cmd_prefix: Option<CommandPrefix>,
    show_output: bool,
    check_expected: bool,
    skip_modules: Vec<String>,
    enabled_modules: BTreeSet<String>,
    stability: Option<String>,
    platform: String,
}

impl RunConfig {
    /// Returns the absolute path to the binary under test.
    pub fn binary(&self) -> &Utf8Path {
        &self.binary
    }

    /// Returns the timeout applied to cases that don't override it.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Returns how long to keep draining output after a child process exits.
    pub fn leak_timeout(&self) -> Duration {
        self.leak_timeout
    }

    /// Returns the command the binary under test is wrapped in, if any.
    pub fn cmd_prefix(&self) -> Option<&CommandPrefix> {
        self.cmd_prefix.as_ref()
    }

    /// Returns true if captured output should be echoed.
    pub fn show_output(&self) -> bool {
        self.show_output
    }

    /// Returns true if captured output is compared against golden files.
    pub fn check_expected(&self) -> bool {
        self.check_expected
    }

    /// Returns the disabled modules.
    pub fn skip_modules(&self) -> &[String] {
        &self.skip_modules
    }

    /// Returns the allow-list of modules built into the binary under test.
    ///
    /// An empty list disables module gating.
    pub fn enabled_modules(&self) -> &BTreeSet<String> {
        &self.enabled_modules
    }

    /// Returns the stability tier of this run.
    pub fn stability(&self) -> Option<&str> {
        self.stability.as_deref()
    }

    /// Returns the target platform identifier.
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Returns the subset of this configuration used to decide whether cases are skipped.
    pub fn skip_context(&self) -> SkipContext<'_> {
        SkipContext {
            platform: &self.platform,
            stability: self.stability.as_deref(),
            skip_modules: &self.skip_modules,
            enabled_modules: &self.enabled_modules,
        }
    }
}

/// A wrapper command that the binary under test is run under.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandPrefix {
    program: String,
    args: Vec<String>,
}

impl CommandPrefix {
    /// Splits `prefix` into words using shell quoting rules.
    ///
    /// Returns `Ok(None)` if `prefix` contains no words.
    pub fn parse(prefix: &str) -> Result<Option<Self>, RunConfigBuildError> {
        let mut words =
            shell_words::split(prefix).map_err(|error| RunConfigBuildError::CmdPrefixParse {
                prefix: prefix.to_owned(),
                error,
            })?;
        if words.is_empty() {
            return Ok(None);
        }
        let program = words.remove(0);
        Ok(Some(Self {
            program,
            args: words,
        }))
    }

    /// Returns the program to run.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the arguments passed to the program before the binary under test.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Builder for [`RunConfig`].
#[derive(Clone, Debug)]
pub struct RunConfigBuilder {
    binary: Utf8PathBuf,
    default_timeout: Duration,
    leak_timeout: Duration,
    cmd_prefix: Option<String>,
    show_output: bool,
    check_expected: bool,
    skip_modules: Vec<String>,
    enabled_modules: Vec<String>,
    stability: Option<String>,
    platform: Option<String>,
}

impl RunConfigBuilder {
    /// The default timeout for a case.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

    /// The default time to keep reading output after a child process exits.
    pub const DEFAULT_LEAK_TIMEOUT: Duration = Duration::from_millis(100);

    /// Creates a new builder for the given binary under test.
    pub fn new(binary: impl Into<Utf8PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            default_timeout: Self::DEFAULT_TIMEOUT,
            leak_timeout: Self::DEFAULT_LEAK_TIMEOUT,
            cmd_prefix: None,
            show_output: false,
            check_expected: true,
            skip_modules: Vec::new(),
            enabled_modules: Vec::new(),
            stability: None,
            platform: None,
        }
    }

    /// Applies the settings in a tool config file.
    ///
    /// Settings applied afterwards, such as those from the command line, take precedence.
    pub fn apply_tool_config(&mut self, tool_config: &ToolConfig) -> &mut Self {
        self.default_timeout = tool_config.default_timeout();
        self.leak_timeout = tool_config.leak_timeout();
        self.cmd_prefix = tool_config.cmd_prefix().map(ToOwned::to_owned);
        self.show_output = tool_config.show_output();
        self.check_expected = tool_config.check_expected();
        self.skip_modules = tool_config.skip_modules().to_vec();
        self.enabled_modules = tool_config.enabled_modules().to_vec();
        self.stability = tool_config.stability().map(ToOwned::to_owned);
        self.platform = tool_config.platform().map(ToOwned::to_owned);
        self
    }

    /// Sets the default timeout.
    pub fn set_default_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.default_timeout = timeout;
        self
    }

    /// Sets how long to keep reading output after a child process exits.
    pub fn set_leak_timeout(&mut self, leak_timeout: Duration) -> &mut Self {
        self.leak_timeout = leak_timeout;
        self
    }

    /// Sets the command prefix, as a single shell-quoted string.
    pub fn set_cmd_prefix(&mut self, cmd_prefix: impl Into<String>) -> &mut Self {
        self.cmd_prefix = Some(cmd_prefix.into());
        self
    }

    /// Sets whether captured output is echoed.
    pub fn set_show_output(&mut self, show_output: bool) -> &mut Self {
        self.show_output = show_output;
        self
    }

    /// Sets whether captured output is compared against golden files.
    pub fn set_check_expected(&mut self, check_expected: bool) -> &mut Self {
        self.check_expected = check_expected;
        self
    }

    /// Sets the disabled modules.
    pub fn set_skip_modules(&mut self, modules: impl IntoIterator<Item = String>) -> &mut Self {
        self.skip_modules = modules.into_iter().collect();
        self
    }

    /// Sets the modules built into the binary under test.
    pub fn set_enabled_modules(&mut self, modules: impl IntoIterator<Item = String>) -> &mut Self {
        self.enabled_modules = modules.into_iter().collect();
        self
    }

    /// Sets the stability tier.
    pub fn set_stability(&mut self, stability: impl Into<String>) -> &mut Self {
        self.stability = Some(stability.into());
        self
    }

    /// Sets the target platform identifier. Defaults to [`host_platform`].
    pub fn set_platform(&mut self, platform: impl Into<String>) -> &mut Self {
        self.platform = Some(platform.into());
        self
    }

    /// Validates the settings and creates a [`RunConfig`].
    ///
    /// The binary under test must exist; its path is made absolute since cases run in their
    /// test set's directory.
    pub fn build(&self) -> Result<RunConfig, RunConfigBuildError> {
        if self.default_timeout.is_zero() {
            return Err(RunConfigBuildError::ZeroTimeout);
        }

        let metadata =
            std::fs::metadata(&self.binary).map_err(|error| RunConfigBuildError::BinaryNotFound {
                path: self.binary.clone(),
                error,
            })?;
        if !metadata.is_file() {
            return Err(RunConfigBuildError::BinaryNotAFile {
                path: self.binary.clone(),
            });
        }
        let binary = std::path::absolute(&self.binary).map_err(|error| {
            RunConfigBuildError::BinaryNotFound {
                path: self.binary.clone(),
                error,
            }
        })?;
        let binary =
            Utf8PathBuf::try_from(binary).map_err(RunConfigBuildError::BinaryPathNotUtf8)?;

        let cmd_prefix = match &self.cmd_prefix {
            Some(prefix) => CommandPrefix::parse(prefix)?,
            None => None,
        };

        Ok(RunConfig {
            binary,
            default_timeout: self.default_timeout,
            leak_timeout: self.leak_timeout,
            cmd_prefix,
            show_output: self.show_output,
            check_expected: self.check_expected,
            skip_modules: self
                .skip_modules
                .iter()
                .filter(|module| !module.is_empty())
                .cloned()
                .collect(),
            enabled_modules: self
                .enabled_modules
                .iter()
                .filter(|module| !module.is_empty())
                .cloned()
                .collect(),
            stability: self.stability.clone().filter(|tier| !tier.is_empty()),
            platform: self
                .platform
                .clone()
                .unwrap_or_else(|| host_platform().to_owned()),
        })
    }
}
