use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::Project;
use crate::plugin::PluginRegistrationSink;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
pub struct Shard {
    /// 1-based.
    pub current: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UpdateSnapshots {
    All,
    #[default]
    None,
    Missing,
}

/// The validated value produced by the (out-of-scope) configuration loader.
/// In this crate the loader is a thin `serde`-driven reader over TOML/YAML/
/// JSON, mirroring the teacher's own multi-format `Config::read`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default = "default_workers")]
    pub workers: usize,
    pub shard: Option<Shard>,
    #[serde(default, with = "duration_secs_opt")]
    pub global_timeout: Option<Duration>,
    pub max_failures: Option<usize>,
    #[serde(default)]
    pub forbid_only: bool,
    pub global_setup: Option<String>,
    pub global_teardown: Option<String>,
    #[serde(default)]
    pub reporters: Vec<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub quiet: bool,
    #[serde(default)]
    pub ignore_snapshots: bool,
    #[serde(default)]
    pub update_snapshots: UpdateSnapshots,
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("test-results")
}

mod duration_secs_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(v: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(d) => s.serialize_some(&d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs: Option<f64> = Option::deserialize(d)?;
        Ok(secs.map(Duration::from_secs_f64))
    }
}

impl Config {
    /// Reads a config file, dispatching on extension the way the teacher's
    /// own `Config::read` dispatches between `toml`/`yaml`/`json`.
    ///
    /// `plugins` is threaded through here, not constructed later in the
    /// CLI, so that a future config-driven plugin (e.g. one derived from a
    /// project's own fields) can register itself during the same pass that
    /// validates the rest of the file, the way the teacher's config loader
    /// is the single place new plugin bindings get made.
    pub fn read(path: &Path, _plugins: &mut PluginRegistrationSink) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config: Config = match ext {
            "toml" => toml::from_str(&raw)?,
            "yaml" | "yml" => serde_yaml::from_str(&raw)?,
            "json" => serde_json::from_str(&raw)?,
            other => return Err(Error::UnsupportedConfigExtension(other.to_string())),
        };
        Ok(config)
    }

    /// Applies CLI-originated overrides (§6). Each field is independent and
    /// only takes effect when `Some`/non-default.
    pub fn apply_overrides(&mut self, overrides: &ConfigCliOverrides) {
        if let Some(v) = overrides.forbid_only {
            self.forbid_only = v;
        }
        if let Some(v) = overrides.fully_parallel {
            for p in &mut self.projects {
                p.fully_parallel = v;
            }
        }
        if let Some(v) = overrides.global_timeout {
            self.global_timeout = Some(v);
        }
        if let Some(v) = overrides.max_failures {
            self.max_failures = Some(v);
        }
        if let Some(v) = &overrides.output_dir {
            self.output_dir = v.clone();
            for p in &mut self.projects {
                p.output_dir = v.clone();
            }
        }
        if let Some(v) = overrides.quiet {
            self.quiet = v;
        }
        if let Some(v) = overrides.repeat_each {
            for p in &mut self.projects {
                p.repeat_each = v;
            }
        }
        if let Some(v) = overrides.retries {
            for p in &mut self.projects {
                p.retries = v;
            }
        }
        if let Some(v) = &overrides.reporter {
            self.reporters = v.clone();
        }
        if let Some(v) = overrides.shard {
            self.shard = Some(v);
        }
        if let Some(v) = overrides.workers {
            self.workers = v;
        }
        if let Some(v) = overrides.ignore_snapshots {
            self.ignore_snapshots = v;
        }
        if let Some(v) = overrides.update_snapshots {
            self.update_snapshots = v;
        }
    }

    pub fn filter_projects(&mut self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        let wanted: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
        let known: Vec<String> = self.projects.iter().map(|p| p.name.clone()).collect();
        let unknown: Vec<&String> = wanted
            .iter()
            .filter(|w| !known.iter().any(|k| k.to_lowercase() == **w))
            .collect();
        if !unknown.is_empty() {
            return Err(Error::UnknownProjects(
                unknown.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", "),
            ));
        }
        self.projects
            .retain(|p| wanted.iter().any(|w| *w == p.name.to_lowercase()));
        Ok(())
    }
}

/// CLI-originated config overrides, mirroring `HookOptions` in the teacher:
/// a plain struct of optional fields, each independently applied.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConfigCliOverrides {
    #[clap(long)]
    pub forbid_only: Option<bool>,
    #[clap(long)]
    pub fully_parallel: Option<bool>,
    #[clap(long, value_parser = parse_duration_secs)]
    pub global_timeout: Option<Duration>,
    #[clap(long)]
    pub max_failures: Option<usize>,
    #[clap(long)]
    pub output_dir: Option<PathBuf>,
    #[clap(long)]
    pub quiet: Option<bool>,
    #[clap(long)]
    pub repeat_each: Option<usize>,
    #[clap(long)]
    pub retries: Option<usize>,
    #[clap(long = "reporter", value_delimiter = ',')]
    pub reporter: Option<Vec<String>>,
    #[clap(skip)]
    pub shard: Option<Shard>,
    #[clap(long)]
    pub timeout: Option<u64>,
    #[clap(long)]
    pub ignore_snapshots: Option<bool>,
    #[clap(long)]
    pub update_snapshots: Option<UpdateSnapshots>,
    #[clap(long)]
    pub workers: Option<usize>,
}

fn parse_duration_secs(s: &str) -> std::result::Result<Duration, String> {
    s.parse::<f64>()
        .map(Duration::from_secs_f64)
        .map_err(|e| e.to_string())
}

impl std::str::FromStr for UpdateSnapshots {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "all" => Ok(UpdateSnapshots::All),
            "none" => Ok(UpdateSnapshots::None),
            "missing" => Ok(UpdateSnapshots::Missing),
            other => Err(format!("unknown update-snapshots mode: {other}")),
        }
    }
}

impl clap::ValueEnum for UpdateSnapshots {
    fn value_variants<'a>() -> &'a [Self] {
        &[UpdateSnapshots::All, UpdateSnapshots::None, UpdateSnapshots::Missing]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(match self {
            UpdateSnapshots::All => "all",
            UpdateSnapshots::None => "none",
            UpdateSnapshots::Missing => "missing",
        }))
    }
}

/// Resolves a config path per §6: a file is the config as-is; a directory is
/// searched, in order, for `stagerun.toml`/`stagerun.yaml`/`stagerun.json`;
/// if none exist the directory is treated as a bare testing root. A
/// non-existent path is an error.
pub fn resolve_config_path(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Err(Error::ConfigPathNotFound(path.to_path_buf()));
    }
    if path.is_file() {
        return Ok(Some(path.to_path_buf()));
    }
    for candidate in ["stagerun.toml", "stagerun.yaml", "stagerun.json"] {
        let candidate = path.join(candidate);
        if candidate.exists() {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

/// Glue: reporter name resolution order (§6) — `PW_TEST_REPORTER` is
/// appended, and when none are configured a default is chosen from `CI`.
pub fn resolve_reporter_names(configured: &[String]) -> Vec<String> {
    let mut names = configured.to_vec();
    if let Ok(extra) = std::env::var("PW_TEST_REPORTER") {
        if !extra.trim().is_empty() {
            names.push(extra);
        }
    }
    if names.is_empty() {
        names.push(if is_ci::cached() { "dot".to_string() } else { "line".to_string() });
    }
    names
}

#[derive(Debug, Clone, Serialize)]
pub struct ListFilesReport {
    pub projects: Vec<ListFilesProject>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListFilesProject {
    pub docker: Option<String>,
    pub name: String,
    pub test_dir: PathBuf,
    pub files: Vec<PathBuf>,
}

pub fn docker_env() -> Option<String> {
    std::env::var("PLAYWRIGHT_DOCKER").ok()
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub list_only: bool,
    pub test_file_filters: Vec<TestFileFilter>,
    pub test_title_matcher: Option<regex::Regex>,
    pub project_filter: Vec<String>,
    pub pass_with_no_tests: bool,
}

#[derive(Debug, Clone)]
pub struct TestFileFilter {
    pub file_pattern: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

pub type ReporterOptionsMap = IndexMap<String, serde_json::Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_toml_config() {
        let toml = r#"
            workers = 3
            forbidOnly = true

            [[projects]]
            name = "chromium"
            testDir = "tests"
            outputDir = "out/chromium"
        "#;
        let tmp = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        std::fs::write(tmp.path(), toml).unwrap();
        let mut plugins = PluginRegistrationSink::new();
        let config = Config::read(tmp.path(), &mut plugins).unwrap();
        assert_eq!(config.workers, 3);
        assert!(config.forbid_only);
        assert_eq!(config.projects.len(), 1);
    }

    #[test]
    fn filter_projects_rejects_unknown_names() {
        let mut config = Config {
            projects: vec![Project::new("chromium", "tests")],
            ..Default::default()
        };
        let err = config.filter_projects(&["firefox".to_string()]).unwrap_err();
        assert!(matches!(err, Error::UnknownProjects(_)));
    }

    #[test]
    fn filter_projects_is_case_insensitive() {
        let mut config = Config {
            projects: vec![Project::new("Chromium", "tests")],
            ..Default::default()
        };
        config.filter_projects(&["chromium".to_string()]).unwrap();
        assert_eq!(config.projects.len(), 1);
    }

    #[test]
    fn resolve_config_path_rejects_missing_path() {
        let err = resolve_config_path(Path::new("/does/not/exist")).unwrap_err();
        assert!(matches!(err, Error::ConfigPathNotFound(_)));
    }
}
