// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{ExpectedError, Result},
    output::{OutputContext, OutputOpts, clap_styles},
};
use camino::{Utf8Path, Utf8PathBuf};
use caserun_runner::{
    config::{RunConfig, RunConfigBuilder, ToolConfig},
    manifest::TestManifest,
    reporter::{MessageFormat, Reporter, TestReporterBuilder},
    runner::TestRunnerBuilder,
};
use clap::{Args, Parser, ValueEnum};
use std::{io::BufWriter, time::Duration};
use tracing::debug;

/// Runs script-based regression suites against a binary under test.
///
/// Every case listed in the manifest is passed, in its own process, as an argument to the binary
/// under test. The working directory is the case's test set directory.
#[derive(Debug, Parser)]
#[command(version, styles = clap_styles::style())]
pub struct CaserunApp {
    /// The binary under test
    #[arg(value_name = "BINARY")]
    binary: Utf8PathBuf,

    /// Path to the test manifest
    #[arg(long, value_name = "PATH", default_value = "test/testsets.json")]
    manifest: Utf8PathBuf,

    /// Config file [default: .config/caserun.toml]
    #[arg(long, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,

    #[command(flatten)]
    run_opts: RunOpts,

    #[command(flatten)]
    reporter_opts: ReporterOpts,

    #[command(flatten)]
    output: OutputOpts,
}

impl CaserunApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the process exit code on success.
    pub fn exec(self, output: OutputContext) -> Result<i32> {
        let tool_config = ToolConfig::from_sources(Utf8Path::new("."), self.config_file.as_deref())?;
        debug!("loaded tool config from {}", tool_config.config_file());

        let config = self.run_opts.make_config(&self.binary, &tool_config)?;
        let manifest = TestManifest::load(&self.manifest)?;
        debug!(
            "loaded {} cases in {} sets from {}",
            manifest.case_count(),
            manifest.set_count(),
            manifest.path(),
        );

        let junit_path = self
            .reporter_opts
            .junit
            .clone()
            .or_else(|| tool_config.junit().path().map(ToOwned::to_owned));

        let mut reporter_builder = TestReporterBuilder::default();
        reporter_builder
            .set_colorize(output.color.should_colorize(supports_color::Stream::Stderr))
            .set_show_output(config.show_output())
            .set_message_format(self.reporter_opts.message_format.into())
            .set_junit_path(junit_path);
        let mut reporter = reporter_builder.build(
            Box::new(BufWriter::new(std::io::stderr())),
            Box::new(BufWriter::new(std::io::stdout())),
        );

        let runner = TestRunnerBuilder::default().build(&manifest, &config)?;
        let run_stats = runner.try_execute(|event| reporter.report_event(&event))?;
        reporter.finish()?;

        if run_stats.is_success() {
            Ok(0)
        } else {
            Err(ExpectedError::TestRunFailed)
        }
    }
}

#[derive(Debug, Default, Args)]
#[command(next_help_heading = "Run options")]
struct RunOpts {
    /// Default timeout for each case, in seconds
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Command to run the binary under test with, e.g. "valgrind --error-exitcode=5"
    #[arg(long, value_name = "STRING", allow_hyphen_values = true)]
    cmd_prefix: Option<String>,

    /// Print the combined output of each executed case
    #[arg(long)]
    show_output: bool,

    /// Don't compare output against golden files
    #[arg(long)]
    skip_expected: bool,

    /// Skip cases whose names contain any of these strings
    #[arg(long, value_name = "MODULES", value_delimiter = ',')]
    skip_modules: Option<Vec<String>>,

    /// Modules built into the binary under test; cases for other modules are skipped
    #[arg(long, value_name = "MODULES", value_delimiter = ',')]
    enabled_modules: Option<Vec<String>>,

    /// Stability tier of this run; cases tagged with it are skipped
    #[arg(long, value_name = "TIER")]
    stability: Option<String>,

    /// Target platform identifier used for skip tags [default: host OS]
    #[arg(long, value_name = "OS")]
    platform: Option<String>,
}

impl RunOpts {
    fn make_config(&self, binary: &Utf8Path, tool_config: &ToolConfig) -> Result<RunConfig> {
        let mut builder = RunConfigBuilder::new(binary);
        builder.apply_tool_config(tool_config);

        if let Some(timeout) = self.timeout {
            builder.set_default_timeout(Duration::from_secs(timeout));
        }
        if let Some(cmd_prefix) = &self.cmd_prefix {
            builder.set_cmd_prefix(cmd_prefix.clone());
        }
        if self.show_output {
            builder.set_show_output(true);
        }
        if self.skip_expected {
            builder.set_check_expected(false);
        }
        if let Some(modules) = &self.skip_modules {
            builder.set_skip_modules(modules.iter().cloned());
        }
        if let Some(modules) = &self.enabled_modules {
            builder.set_enabled_modules(modules.iter().cloned());
        }
        if let Some(stability) = &self.stability {
            builder.set_stability(stability.clone());
        }
        if let Some(platform) = &self.platform {
            builder.set_platform(platform.clone());
        }

        Ok(builder.build()?)
    }
}

#[derive(Debug, Default, Args)]
#[command(next_help_heading = "Reporter options")]
struct ReporterOpts {
    /// Format of machine-readable output on stdout
    #[arg(long, value_enum, default_value_t, value_name = "FORMAT")]
    message_format: MessageFormatOpt,

    /// Write a JUnit XML report to this path
    #[arg(long, value_name = "PATH")]
    junit: Option<Utf8PathBuf>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
enum MessageFormatOpt {
    /// Human-readable output on stderr only
    #[default]
    Human,
    /// JSON lines on stdout, in addition to human-readable output on stderr
    Json,
}

impl From<MessageFormatOpt> for MessageFormat {
    fn from(opt: MessageFormatOpt) -> Self {
        match opt {
            MessageFormatOpt::Human => MessageFormat::Human,
            MessageFormatOpt::Json => MessageFormat::Json,
        }
    }
}
