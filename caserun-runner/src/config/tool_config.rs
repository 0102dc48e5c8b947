// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::{ToolConfigParseError, ToolConfigParseErrorKind};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::{collections::BTreeSet, time::Duration};
use tracing::warn;

/// Settings for caserun, loaded from the embedded defaults and an optional config file.
///
/// Values set on the command line take precedence over these: see
/// [`RunConfigBuilder::apply_tool_config`](super::RunConfigBuilder::apply_tool_config).
#[derive(Clone, Debug)]
pub struct ToolConfig {
    config_file: Utf8PathBuf,
    inner: ToolConfigDeserialize,
}

impl ToolConfig {
    /// The default location of the config file, relative to the current directory.
    pub const CONFIG_PATH: &'static str = ".config/caserun.toml";

    /// Contains the default config as a TOML file.
    ///
    /// User-provided config files are layered on top of this.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../../default-config.toml");

    /// Reads the config, layering the file at `config_file` over the defaults.
    ///
    /// If `config_file` is `None`, [`Self::CONFIG_PATH`] is looked up relative to `root` and
    /// used only if it exists. An explicitly specified file must exist.
    pub fn from_sources(
        root: &Utf8Path,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ToolConfigParseError> {
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let (inner, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ToolConfigParseError::new(&config_file, kind))?;

        if !unknown.is_empty() {
            let keys = unknown.into_iter().collect::<Vec<_>>().join(", ");
            warn!("ignoring unknown configuration keys in {config_file}: {keys}");
        }

        Ok(Self { config_file, inner })
    }

    /// Returns the path to the user config file, whether or not it exists.
    pub fn config_file(&self) -> &Utf8Path {
        &self.config_file
    }

    /// Returns the default timeout for cases.
    pub fn default_timeout(&self) -> Duration {
        self.inner.default_timeout
    }

    /// Returns how long to keep reading output after a child process exits.
    pub fn leak_timeout(&self) -> Duration {
        self.inner.leak_timeout
    }

    /// Returns the command prefix, if configured.
    pub fn cmd_prefix(&self) -> Option<&str> {
        self.inner.cmd_prefix.as_deref()
    }

    /// Returns true if captured output should be echoed.
    pub fn show_output(&self) -> bool {
        self.inner.show_output
    }

    /// Returns true if output is compared against golden files.
    pub fn check_expected(&self) -> bool {
        self.inner.check_expected
    }

    /// Returns the disabled modules.
    pub fn skip_modules(&self) -> &[String] {
        &self.inner.skip_modules
    }

    /// Returns the modules built into the binary under test.
    pub fn enabled_modules(&self) -> &[String] {
        &self.inner.enabled_modules
    }

    /// Returns the stability tier.
    pub fn stability(&self) -> Option<&str> {
        self.inner.stability.as_deref()
    }

    /// Returns the target platform identifier, if overridden.
    pub fn platform(&self) -> Option<&str> {
        self.inner.platform.as_deref()
    }

    /// Returns the JUnit configuration.
    pub fn junit(&self) -> &JunitConfig {
        &self.inner.junit
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(ToolConfigDeserialize, BTreeSet<String>), ToolConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ToolConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: ToolConfigDeserialize =
            serde_path_to_error::deserialize(ignored_de).map_err(|error| {
                // The config crate also reports the key. Drop it since serde_path_to_error
                // already tracks the path.
                let path = error.path().clone();
                let error = match error.into_inner() {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ToolConfigParseErrorKind::DeserializeError(Box::new(
                    serde_path_to_error::Error::new(path, error),
                ))
            })?;

        Ok((config, ignored))
    }
}

/// JUnit report settings.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JunitConfig {
    #[serde(default)]
    path: Option<Utf8PathBuf>,
}

impl JunitConfig {
    /// Returns the path to write the JUnit report to, if set.
    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ToolConfigDeserialize {
    #[serde(with = "humantime_serde")]
    default_timeout: Duration,
    #[serde(with = "humantime_serde")]
    leak_timeout: Duration,
    #[serde(default)]
    cmd_prefix: Option<String>,
    show_output: bool,
    check_expected: bool,
    #[serde(default)]
    skip_modules: Vec<String>,
    #[serde(default)]
    enabled_modules: Vec<String>,
    #[serde(default)]
    stability: Option<String>,
    #[serde(default)]
    platform: Option<String>,
    #[serde(default)]
    junit: JunitConfig,
}
