use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Timedout,
    Skipped,
    Interrupted,
}

impl TestStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, TestStatus::Failed | TestStatus::Timedout | TestStatus::Interrupted)
    }
}

/// A thrown/reported error. Errors synthesized by the orchestrator itself
/// (signal, timeout, skip-cascade) carry no stack and are flagged so
/// reporters can filter them out of "real" failures if they choose to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TestError {
    pub message: String,
    pub stack: Option<String>,
    #[serde(default)]
    pub is_not_a_fatal_error: bool,
}

impl TestError {
    pub fn synthetic(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
            is_not_a_fatal_error: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TestResult {
    pub status: TestStatus,
    pub duration_ms: u64,
    pub errors: Vec<TestError>,
    pub retry: usize,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FullStatus {
    Passed,
    Failed,
    Timedout,
    Interrupted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullResult {
    pub status: FullStatus,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub duration_ms: u64,
}
