use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_with::{OneOrMany, formats::PreferMany, serde_as};

/// How a project's test groups participate in sharding.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunMode {
    #[default]
    Default,
    Always,
}

/// A configured, independent test suite: its own directory, matchers, worker
/// parameters and staging ordinal.
#[serde_as]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Project {
    pub name: String,
    pub test_dir: PathBuf,
    #[serde_as(as = "OneOrMany<_, PreferMany>")]
    #[serde(default)]
    pub test_match: Vec<String>,
    #[serde_as(as = "OneOrMany<_, PreferMany>")]
    #[serde(default)]
    pub test_ignore: Vec<String>,
    pub grep: Option<String>,
    pub grep_invert: Option<String>,
    #[serde(default = "default_repeat_each")]
    pub repeat_each: usize,
    #[serde(default)]
    pub retries: usize,
    #[serde(default)]
    pub run: RunMode,
    #[serde(default)]
    pub stage: i64,
    #[serde(default)]
    pub fully_parallel: bool,
    pub output_dir: PathBuf,
    #[serde(default = "default_true")]
    pub respect_git_ignore: bool,
    /// Arbitrary fixture parameters handed to the worker dispatcher verbatim.
    #[serde(default)]
    pub use_options: indexmap::IndexMap<String, serde_json::Value>,
}

fn default_repeat_each() -> usize {
    1
}

fn default_true() -> bool {
    true
}

impl Project {
    pub fn new(name: impl Into<String>, test_dir: impl Into<PathBuf>) -> Self {
        let name = name.into();
        Self {
            test_dir: test_dir.into(),
            output_dir: PathBuf::from("test-results").join(&name),
            name,
            test_match: Vec::new(),
            test_ignore: Vec::new(),
            grep: None,
            grep_invert: None,
            repeat_each: 1,
            retries: 0,
            run: RunMode::Default,
            stage: 0,
            fully_parallel: false,
            respect_git_ignore: true,
            use_options: indexmap::IndexMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let p = Project::new("chromium", "tests/e2e");
        assert_eq!(p.stage, 0);
        assert_eq!(p.repeat_each, 1);
        assert!(p.respect_git_ignore);
        assert_eq!(p.run, RunMode::Default);
    }

    #[test]
    fn deserializes_single_or_many_test_match() {
        let toml = r#"
            name = "chromium"
            testDir = "tests"
            testMatch = "*.spec.rs"
            outputDir = "out"
        "#;
        let p: Project = toml::from_str(toml).unwrap();
        assert_eq!(p.test_match, vec!["*.spec.rs".to_string()]);
    }
}
