// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by caserun.

use camino::{FromPathBufError, Utf8Path, Utf8PathBuf};
use config::ConfigError;
use std::{error, fmt, io, sync::Arc};
use thiserror::Error;

/// An error that occurred while loading a test manifest.
///
/// This is a configuration error: it aborts the run before any case executes.
#[derive(Debug, Error)]
#[error("failed to load manifest at `{path}`")]
#[non_exhaustive]
pub struct ManifestLoadError {
    path: Utf8PathBuf,
    #[source]
    kind: ManifestLoadErrorKind,
}

impl ManifestLoadError {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>, kind: ManifestLoadErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Returns the path to the manifest that failed to load.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the kind of error that occurred.
    pub fn kind(&self) -> &ManifestLoadErrorKind {
        &self.kind
    }
}

/// The kind of error returned by [`ManifestLoadError`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ManifestLoadErrorKind {
    /// The manifest file could not be read.
    #[error("error reading manifest file")]
    Read(#[source] io::Error),

    /// The manifest is not valid JSON, or does not have the expected shape.
    #[error("error parsing manifest at `{path}`")]
    Parse {
        /// The JSON path to the value that failed to parse.
        path: String,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// A case has an empty name.
    #[error("case {index} in test set `{set}` has an empty name")]
    EmptyCaseName {
        /// The test set the case belongs to.
        set: String,

        /// The zero-based index of the case within its set.
        index: usize,
    },

    /// A case has a timeout of zero seconds.
    #[error("case `{name}` in test set `{set}` has a timeout of zero")]
    ZeroTimeout {
        /// The test set the case belongs to.
        set: String,

        /// The name of the case.
        name: String,
    },

    /// A case sets both `fail` and `expected-failure`, which are two names for the same setting.
    #[error(
        "case `{name}` in test set `{set}` sets both `fail` and `expected-failure` \
         (they are aliases; use one)"
    )]
    ConflictingFailureKeys {
        /// The test set the case belongs to.
        set: String,

        /// The name of the case.
        name: String,
    },

    /// A test set was defined more than once.
    #[error("test set `{name}` is defined more than once")]
    DuplicateSet {
        /// The name of the set.
        name: String,
    },

    /// A test set in the explicit form has an empty path.
    #[error("test set {index} has an empty path")]
    EmptySetPath {
        /// The zero-based index of the set.
        index: usize,
    },
}

/// An error that occurred while parsing a caserun tool config file.
#[derive(Debug, Error)]
#[error("failed to parse caserun config at `{config_file}`")]
#[non_exhaustive]
pub struct ToolConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ToolConfigParseErrorKind,
}

impl ToolConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ToolConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file that failed to parse.
    pub fn config_file(&self) -> &Utf8Path {
        &self.config_file
    }

    /// Returns the kind of error that occurred.
    pub fn kind(&self) -> &ToolConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error returned by [`ToolConfigParseError`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ToolConfigParseErrorKind {
    /// An error occurred while building the layered config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// An error that occurred while building a [`RunConfig`](crate::config::RunConfig).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunConfigBuildError {
    /// The binary under test could not be found.
    #[error("binary under test `{path}` not found")]
    BinaryNotFound {
        /// The path that was provided.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The binary under test is not a regular file.
    #[error("binary under test `{path}` is not a file")]
    BinaryNotAFile {
        /// The path that was provided.
        path: Utf8PathBuf,
    },

    /// The absolute path to the binary under test is not valid UTF-8.
    #[error("absolute path to binary under test is not valid UTF-8")]
    BinaryPathNotUtf8(#[source] FromPathBufError),

    /// The command prefix could not be split into words.
    #[error("failed to parse command prefix `{prefix}`")]
    CmdPrefixParse {
        /// The prefix that was provided.
        prefix: String,

        /// The underlying error.
        #[source]
        error: shell_words::ParseError,
    },

    /// The default timeout was zero.
    #[error("default timeout must be greater than zero")]
    ZeroTimeout,
}

/// An error that occurred while starting a child process.
///
/// Start errors are local to a single case: the case is classified as failed and the run
/// continues.
#[derive(Clone, Debug, Error)]
pub enum ChildStartError {
    /// An error occurred while creating the pipe used to capture output.
    #[error("error creating output pipe")]
    PipeCreate(#[source] Arc<io::Error>),

    /// An error occurred while spawning the child process.
    #[error("error spawning child process")]
    Spawn(#[source] Arc<io::Error>),
}

/// An error that occurred while waiting for a child process to exit.
#[derive(Clone, Debug, Error)]
#[error("error waiting for child process to exit")]
pub struct ChildWaitError(#[source] pub Arc<io::Error>);

/// An error that occurred while reading the output of a child process.
#[derive(Clone, Debug, Error)]
pub enum ChildFdError {
    /// An error occurred while reading combined output.
    #[error("error reading combined output")]
    ReadCombined(#[source] Arc<io::Error>),
}

/// An error that occurred while building a [`TestRunner`](crate::runner::TestRunner).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TestRunnerBuildError {
    /// An error occurred while creating the Tokio runtime.
    #[error("error creating Tokio runtime")]
    TokioRuntimeCreate(#[source] io::Error),
}

/// An error that occurs while writing an event.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteEventError {
    /// An error occurred while writing the event to the provided output.
    #[error("error writing to output")]
    Io(#[source] io::Error),

    /// An error occurred while operating on the file system.
    #[error("error operating on path {file}")]
    Fs {
        /// The file being operated on.
        file: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: io::Error,
    },

    /// An error occurred while producing JUnit XML.
    #[error("error writing JUnit output to {file}")]
    Junit {
        /// The output file.
        file: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: quick_junit::SerializeError,
    },

    /// An error occurred while serializing a JSON record.
    #[error("error serializing JSON record")]
    Json(#[source] serde_json::Error),
}

/// Displays an error along with its chain of sources, one per line.
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: error::Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: error::Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let mut next = self.error.source();
        if next.is_some() {
            write!(f, "\n  caused by:")?;
        }
        while let Some(source) = next {
            write!(f, "\n  - {source}")?;
            next = source.source();
        }

        Ok(())
    }
}
