use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;

use super::Reporter;
use crate::model::{FullResult, TestCase, TestResult};

#[derive(Default, Serialize)]
struct JsonReport {
    tests: Vec<JsonTestEntry>,
}

#[derive(Serialize)]
struct JsonTestEntry {
    title: String,
    status: String,
    duration_ms: u64,
}

/// Accumulates results in memory and writes one JSON document on `on_end`,
/// mirroring the teacher's own end-of-run JSON summary writers.
pub struct JsonReporter {
    path: PathBuf,
    report: Mutex<JsonReport>,
}

impl JsonReporter {
    pub fn new(path: PathBuf) -> Self {
        Self { path, report: Mutex::new(JsonReport::default()) }
    }
}

impl Reporter for JsonReporter {
    fn on_test_end(&self, test: &TestCase, result: &TestResult) {
        self.report.lock().unwrap().tests.push(JsonTestEntry {
            title: test.title.clone(),
            status: result.status.to_string(),
            duration_ms: result.duration_ms,
        });
    }

    fn on_end(&self, _full: &FullResult) {
        let report = self.report.lock().unwrap();
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(body) = serde_json::to_string_pretty(&*report) {
            let _ = std::fs::write(&self.path, body);
        }
    }

    fn prints_to_stdio(&self) -> bool {
        false
    }
}
