// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decides whether a case should run.
//!
//! Skip evaluation is a pure function of a [`TestCase`] and a [`SkipContext`]: it never spawns
//! processes or reads the file system.

use crate::manifest::{SKIP_ALL_TAG, TestCase};
use std::{collections::BTreeSet, fmt};

/// The subset of the run configuration that skip evaluation depends on.
///
/// Obtained through [`RunConfig::skip_context`](crate::config::RunConfig::skip_context).
#[derive(Clone, Copy, Debug)]
pub struct SkipContext<'a> {
    /// The target platform identifier.
    pub platform: &'a str,

    /// The stability tier of this run, if any.
    pub stability: Option<&'a str>,

    /// Modules whose cases are skipped. Matched as substrings of the case name.
    pub skip_modules: &'a [String],

    /// Modules built into the binary under test. Empty disables module gating.
    pub enabled_modules: &'a BTreeSet<String>,
}

/// Whether a case should run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SkipDecision {
    /// The case should run.
    Run,

    /// The case should be skipped.
    Skip {
        /// Why the case is skipped.
        reason: SkipReason,
    },
}

impl SkipDecision {
    /// Returns true if the case should be skipped.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }
}

/// The reason a case was skipped.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SkipReason {
    /// One of the case's skip tags matched `all`, the platform or the stability tier.
    Tagged {
        /// The reason given in the manifest, if any.
        reason: Option<String>,
    },

    /// The case name contains a disabled module.
    ModuleDisabled {
        /// The disabled module that matched.
        module: String,
    },

    /// The case tests a module that isn't built into the binary under test.
    ModuleNotBuilt {
        /// The module derived from the case name.
        module: String,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tagged { reason } => f.write_str(reason.as_deref().unwrap_or_default()),
            Self::ModuleDisabled { .. } => f.write_str("module disabled"),
            Self::ModuleNotBuilt { .. } => f.write_str("module not built"),
        }
    }
}

/// Decides whether `case` should run. The first matching rule wins:
///
/// 1. The case's skip tags contain `all`, the target platform or the stability tier.
/// 2. A disabled module is a substring of the case name.
/// 3. Module gating is enabled and the case's [tested module](tested_module) is not enabled.
pub fn evaluate(case: &TestCase, cx: &SkipContext<'_>) -> SkipDecision {
    let tags = &case.skip_tags;
    let tagged = tags.contains(SKIP_ALL_TAG)
        || tags.contains(cx.platform)
        || cx.stability.is_some_and(|tier| tags.contains(tier));
    if tagged {
        return SkipDecision::Skip {
            reason: SkipReason::Tagged {
                reason: case.skip_reason.clone(),
            },
        };
    }

    if let Some(module) = cx
        .skip_modules
        .iter()
        .find(|module| !module.is_empty() && case.name.contains(module.as_str()))
    {
        return SkipDecision::Skip {
            reason: SkipReason::ModuleDisabled {
                module: module.clone(),
            },
        };
    }

    if !cx.enabled_modules.is_empty()
        && let Some(module) = tested_module(&case.name)
        && !cx.enabled_modules.contains(module)
    {
        return SkipDecision::Skip {
            reason: SkipReason::ModuleNotBuilt {
                module: module.to_owned(),
            },
        };
    }

    SkipDecision::Run
}

/// Returns the module a case tests, according to its name.
///
/// Cases named `test_<module>.<ext>` or `test_<module>_<rest>.<ext>` test `<module>`. Only the
/// final `/`-separated component of the name is considered. Other names test no module.
pub fn tested_module(case_name: &str) -> Option<&str> {
    let file_name = case_name.rsplit('/').next().unwrap_or(case_name);
    let stem = match file_name.rfind('.') {
        Some(0) | None => file_name,
        Some(index) => &file_name[..index],
    };
    let rest = stem.strip_prefix("test_")?;
    let module = rest.split('_').next().unwrap_or(rest);
    (!module.is_empty()).then_some(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::TestManifest;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_case::test_case;

    fn case_from_json(json: &str) -> TestCase {
        let manifest = TestManifest::parse("testsets.json", &format!(r#"{{"set": [{json}]}}"#))
            .expect("manifest is valid");
        manifest.sets()[0].cases[0].clone()
    }

    struct Context {
        platform: String,
        stability: Option<String>,
        skip_modules: Vec<String>,
        enabled_modules: BTreeSet<String>,
    }

    impl Context {
        fn new() -> Self {
            Self {
                platform: "linux".to_owned(),
                stability: None,
                skip_modules: Vec::new(),
                enabled_modules: BTreeSet::new(),
            }
        }

        fn cx(&self) -> SkipContext<'_> {
            SkipContext {
                platform: &self.platform,
                stability: self.stability.as_deref(),
                skip_modules: &self.skip_modules,
                enabled_modules: &self.enabled_modules,
            }
        }
    }

    #[test_case("test_fs_open.js", Some("fs"); "module with suffix")]
    #[test_case("test_net.js", Some("net"); "module only")]
    #[test_case("run_pass/test_dgram_1.js", Some("dgram"); "nested path")]
    #[test_case("test_console", Some("console"); "no extension")]
    #[test_case("regression-1.js", None; "no prefix")]
    #[test_case("test_.js", None; "empty module")]
    #[test_case("dir/test_x/regression.js", None; "prefix in directory only")]
    fn tested_module_convention(name: &str, expected: Option<&str>) {
        assert_eq!(tested_module(name), expected);
    }

    #[test]
    fn tags_take_precedence() {
        let case = case_from_json(indoc! {r#"
            { "name": "test_fs_open.js", "skip": ["linux"], "reason": "flaky on linux" }
        "#});
        let mut context = Context::new();
        context.skip_modules.push("fs".to_owned());

        assert_eq!(
            evaluate(&case, &context.cx()),
            SkipDecision::Skip {
                reason: SkipReason::Tagged {
                    reason: Some("flaky on linux".to_owned())
                }
            }
        );
    }

    #[test]
    fn skip_all_without_reason() {
        let case = case_from_json(r#"{ "name": "test_a.js", "skip": ["all"] }"#);
        let decision = evaluate(&case, &Context::new().cx());
        let SkipDecision::Skip { reason } = &decision else {
            panic!("expected skip, found {decision:?}");
        };
        assert_eq!(reason.to_string(), "");
    }

    #[test]
    fn stability_tag() {
        let case = case_from_json(r#"{ "name": "test_a.js", "skip": ["experimental"] }"#);
        let mut context = Context::new();
        assert_eq!(evaluate(&case, &context.cx()), SkipDecision::Run);

        context.stability = Some("experimental".to_owned());
        assert!(evaluate(&case, &context.cx()).is_skip());
    }

    #[test]
    fn disabled_module_is_substring_match() {
        let mut context = Context::new();
        context.skip_modules = vec!["net".to_owned()];

        let decision = evaluate(
            &case_from_json(r#"{ "name": "test_net_socket.js" }"#),
            &context.cx(),
        );
        assert_eq!(
            decision,
            SkipDecision::Skip {
                reason: SkipReason::ModuleDisabled {
                    module: "net".to_owned()
                }
            }
        );
        assert_eq!(
            evaluate(&case_from_json(r#"{ "name": "test_fs.js" }"#), &context.cx()),
            SkipDecision::Run
        );
    }

    #[test]
    fn module_gating() {
        let mut context = Context::new();
        context.enabled_modules = ["fs".to_owned()].into_iter().collect();

        assert_eq!(
            evaluate(&case_from_json(r#"{ "name": "test_fs_read.js" }"#), &context.cx()),
            SkipDecision::Run
        );
        let decision = evaluate(
            &case_from_json(r#"{ "name": "test_net_basic.js" }"#),
            &context.cx(),
        );
        let SkipDecision::Skip { reason } = &decision else {
            panic!("expected skip, found {decision:?}");
        };
        assert_eq!(
            reason,
            &SkipReason::ModuleNotBuilt {
                module: "net".to_owned()
            }
        );
        assert_eq!(reason.to_string(), "module not built");
        // Names without a module are never gated.
        assert_eq!(
            evaluate(&case_from_json(r#"{ "name": "regression-42.js" }"#), &context.cx()),
            SkipDecision::Run
        );
    }

    proptest! {
        #[test]
        fn evaluate_is_deterministic(
            name in "[a-z_/]{1,16}(\\.js)?",
            skip_modules in proptest::collection::vec("[a-z]{0,4}", 0..3),
            tag in proptest::option::of("(all|linux|nuttx|experimental)"),
        ) {
            let skip = tag.map(|tag| format!(r#", "skip": ["{tag}"]"#)).unwrap_or_default();
            let case = case_from_json(&format!(r#"{{ "name": "{name}"{skip} }}"#));
            let mut context = Context::new();
            context.stability = Some("experimental".to_owned());
            context.skip_modules = skip_modules.clone();

            let first = evaluate(&case, &context.cx());
            let second = evaluate(&case, &context.cx());
            prop_assert_eq!(&first, &second);

            // A non-empty disabled module contained in the name always causes a skip.
            if skip_modules.iter().any(|module| !module.is_empty() && name.contains(module.as_str())) {
                prop_assert!(first.is_skip());
            }
        }
    }
}
