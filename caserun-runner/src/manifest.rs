// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test manifest: test sets and the cases they contain.
//!
//! A manifest is a JSON document in one of two shapes. The *map form* maps each test set name to
//! its ordered list of cases:
//!
//! ```json
//! {
//!   "run_pass": [
//!     { "name": "test_assert.js" },
//!     { "name": "test_fs_open.js", "skip": ["nuttx"], "reason": "no filesystem" }
//!   ]
//! }
//! ```
//!
//! The *explicit form* lists set descriptors, each carrying a path relative to the test root:
//!
//! ```json
//! { "testsets": [ { "path": "run_pass", "tests": [ { "name": "test_assert.js" } ] } ] }
//! ```
//!
//! The test root is the directory that contains the manifest file. Golden-output files named by
//! `expected` are looked up in the [`EXPECTED_DIR`] subdirectory of the test root.

use crate::errors::{ManifestLoadError, ManifestLoadErrorKind};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{
    Deserialize, Deserializer,
    de::{MapAccess, Visitor},
};
use std::{
    collections::{BTreeSet, HashSet},
    fmt,
    time::Duration,
};
use tracing::warn;

/// The subdirectory of the test root that golden-output files are resolved against.
pub const EXPECTED_DIR: &str = "expected";

/// The skip tag that suppresses a case on every platform.
pub const SKIP_ALL_TAG: &str = "all";

/// A loaded test manifest.
///
/// Sets are kept in manifest order, and cases within each set are kept in the order they were
/// listed. A manifest is immutable once loaded.
#[derive(Clone, Debug)]
pub struct TestManifest {
    path: Utf8PathBuf,
    test_root: Utf8PathBuf,
    sets: Vec<TestSet>,
    ignored_keys: BTreeSet<String>,
}

impl TestManifest {
    /// Reads and parses the manifest at `path`.
    pub fn load(path: impl Into<Utf8PathBuf>) -> Result<Self, ManifestLoadError> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path)
            .map_err(|error| ManifestLoadError::new(&path, ManifestLoadErrorKind::Read(error)))?;
        Self::parse(path, &contents)
    }

    /// Parses manifest contents as if they had been read from `path`.
    ///
    /// `path` is used to determine the test root; it is not read.
    pub fn parse(path: impl Into<Utf8PathBuf>, contents: &str) -> Result<Self, ManifestLoadError> {
        let path = path.into();
        let test_root = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
            _ => Utf8PathBuf::from("."),
        };

        let (sets, ignored_keys) = parse_sets(&test_root, contents)
            .map_err(|kind| ManifestLoadError::new(&path, kind))?;

        if !ignored_keys.is_empty() {
            warn!(
                "ignoring unknown keys in manifest `{path}`: {}",
                ignored_keys.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
            );
        }

        Ok(Self {
            path,
            test_root,
            sets,
            ignored_keys,
        })
    }

    /// Returns the path the manifest was loaded from.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the test root: the directory containing the manifest.
    pub fn test_root(&self) -> &Utf8Path {
        &self.test_root
    }

    /// Returns the test sets in manifest order.
    pub fn sets(&self) -> &[TestSet] {
        &self.sets
    }

    /// Returns the number of test sets.
    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    /// Returns the total number of cases across all sets.
    pub fn case_count(&self) -> usize {
        self.sets.iter().map(|set| set.cases.len()).sum()
    }

    /// Returns the JSON paths of keys that were present in the manifest but not understood.
    pub fn ignored_keys(&self) -> &BTreeSet<String> {
        &self.ignored_keys
    }
}

/// A named, ordered collection of cases sharing a working directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestSet {
    /// The name of the set.
    pub name: String,

    /// The working directory cases in this set run in.
    pub dir: Utf8PathBuf,

    /// The cases in this set, in manifest order.
    pub cases: Vec<TestCase>,
}

/// A single executable test case.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestCase {
    /// The name of the case. This is also the argument passed to the binary under test.
    pub name: String,

    /// A timeout overriding the run-wide default.
    pub timeout: Option<Duration>,

    /// If true, a non-zero exit code is the success condition.
    pub expect_failure: bool,

    /// The resolved path to a golden-output file to compare captured output against.
    pub expected_output: Option<Utf8PathBuf>,

    /// Tags (platform names, stability tiers or [`SKIP_ALL_TAG`]) that suppress execution.
    pub skip_tags: BTreeSet<String>,

    /// A human-readable reason, surfaced only when the case is skipped.
    pub skip_reason: Option<String>,
}

impl TestCase {
    /// Returns the timeout to apply to this case: its override if set, otherwise `default`.
    pub fn effective_timeout(&self, default: Duration) -> Duration {
        self.timeout.unwrap_or(default)
    }
}

// ---
// Deserialization
// ---

#[derive(Deserialize)]
struct ExplicitManifestDeserialize {
    testsets: Vec<SetDeserialize>,
}

#[derive(Deserialize)]
struct SetDeserialize {
    path: Utf8PathBuf,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    tests: Vec<CaseDeserialize>,
}

/// Sets in the map form, in document order. Repeated set names are kept so they can be reported.
struct MapManifestDeserialize(Vec<(String, Vec<CaseDeserialize>)>);

impl<'de> Deserialize<'de> for MapManifestDeserialize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SetsVisitor;

        impl<'de> Visitor<'de> for SetsVisitor {
            type Value = MapManifestDeserialize;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of test set names to lists of cases")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut sets = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Vec<CaseDeserialize>>()? {
                    sets.push(entry);
                }
                Ok(MapManifestDeserialize(sets))
            }
        }

        deserializer.deserialize_map(SetsVisitor)
    }
}

#[derive(Deserialize)]
struct CaseDeserialize {
    name: String,
    /// Timeout in seconds.
    #[serde(default)]
    timeout: Option<u64>,
    #[serde(default)]
    fail: Option<bool>,
    #[serde(default, rename = "expected-failure")]
    expected_failure: Option<bool>,
    #[serde(default)]
    expected: Option<Utf8PathBuf>,
    #[serde(default)]
    skip: Vec<String>,
    #[serde(default)]
    reason: Option<String>,
}

fn parse_sets(
    test_root: &Utf8Path,
    contents: &str,
) -> Result<(Vec<TestSet>, BTreeSet<String>), ManifestLoadErrorKind> {
    // The shape is picked from a parsed value, but sets are read from the text itself: a value
    // keeps only the last of several sets with the same name.
    let value: serde_json::Value = serde_json::from_str(contents).map_err(|error| {
        ManifestLoadErrorKind::Parse {
            path: ".".to_owned(),
            error,
        }
    })?;
    let is_explicit = value
        .get("testsets")
        .is_some_and(serde_json::Value::is_array);

    let mut ignored_keys = BTreeSet::new();
    let mut cb = |path: serde_ignored::Path| {
        ignored_keys.insert(path.to_string());
    };
    let mut json_de = serde_json::Deserializer::from_str(contents);
    let ignored_de = serde_ignored::Deserializer::new(&mut json_de, &mut cb);

    let raw_sets: Vec<(String, Utf8PathBuf, Vec<CaseDeserialize>)> = if is_explicit {
        let manifest: ExplicitManifestDeserialize =
            serde_path_to_error::deserialize(ignored_de).map_err(path_error)?;
        let mut raw_sets = Vec::with_capacity(manifest.testsets.len());
        for (index, set) in manifest.testsets.into_iter().enumerate() {
            if set.path.as_str().is_empty() {
                return Err(ManifestLoadErrorKind::EmptySetPath { index });
            }
            let name = set.name.unwrap_or_else(|| set.path.to_string());
            raw_sets.push((name, test_root.join(&set.path), set.tests));
        }
        raw_sets
    } else {
        let manifest: MapManifestDeserialize =
            serde_path_to_error::deserialize(ignored_de).map_err(path_error)?;
        manifest
            .0
            .into_iter()
            .map(|(name, cases)| {
                let dir = test_root.join(&name);
                (name, dir, cases)
            })
            .collect()
    };

    let mut seen = HashSet::new();
    let mut sets = Vec::with_capacity(raw_sets.len());
    for (name, dir, cases) in raw_sets {
        if !seen.insert(name.clone()) {
            return Err(ManifestLoadErrorKind::DuplicateSet { name });
        }
        let cases = cases
            .into_iter()
            .enumerate()
            .map(|(index, case)| convert_case(test_root, &name, index, case))
            .collect::<Result<Vec<_>, _>>()?;
        sets.push(TestSet { name, dir, cases });
    }

    Ok((sets, ignored_keys))
}

fn convert_case(
    test_root: &Utf8Path,
    set: &str,
    index: usize,
    case: CaseDeserialize,
) -> Result<TestCase, ManifestLoadErrorKind> {
    if case.name.is_empty() {
        return Err(ManifestLoadErrorKind::EmptyCaseName {
            set: set.to_owned(),
            index,
        });
    }

    let timeout = match case.timeout {
        Some(0) => {
            return Err(ManifestLoadErrorKind::ZeroTimeout {
                set: set.to_owned(),
                name: case.name,
            });
        }
        Some(secs) => Some(Duration::from_secs(secs)),
        None => None,
    };

    let expect_failure = match (case.fail, case.expected_failure) {
        (Some(_), Some(_)) => {
            return Err(ManifestLoadErrorKind::ConflictingFailureKeys {
                set: set.to_owned(),
                name: case.name,
            });
        }
        (Some(fail), None) | (None, Some(fail)) => fail,
        (None, None) => false,
    };

    Ok(TestCase {
        name: case.name,
        timeout,
        expect_failure,
        expected_output: case
            .expected
            .map(|expected| test_root.join(EXPECTED_DIR).join(expected)),
        skip_tags: case.skip.into_iter().collect(),
        skip_reason: case.reason,
    })
}

fn path_error(error: serde_path_to_error::Error<serde_json::Error>) -> ManifestLoadErrorKind {
    ManifestLoadErrorKind::Parse {
        path: error.path().to_string(),
        error: error.into_inner(),
    }
}
