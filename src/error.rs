use thiserror::Error;

use crate::model::result::TestError;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Glob(#[from] globset::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("unsupported config file extension: {0}")]
    UnsupportedConfigExtension(String),

    #[error("config path does not exist: {}", .0.display())]
    ConfigPathNotFound(std::path::PathBuf),

    #[error("unknown project(s) in --project filter: {0}")]
    UnknownProjects(String),

    #[error("no tests found matching the given pattern(s)")]
    NoTestsFound,

    #[error("duplicate test title \"{0}\" in {}", .1.display())]
    DuplicateTitle(String, std::path::PathBuf),

    #[error("--forbid-only found {0} test(s) focused with .only")]
    ForbidOnly(usize),

    #[error("failed to load test file {}: {1}", .0.display())]
    SuiteLoad(std::path::PathBuf, String),

    #[error("unknown reporter: {0}")]
    UnknownReporter(String),

    #[error("{0}")]
    Setup(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<&Error> for TestError {
    fn from(err: &Error) -> Self {
        TestError {
            message: err.to_string(),
            stack: None,
            is_not_a_fatal_error: false,
        }
    }
}
