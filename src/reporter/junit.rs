use std::path::PathBuf;
use std::sync::Mutex;

use super::Reporter;
use crate::model::{FullResult, TestCase, TestResult, TestStatus};

struct Entry {
    title: String,
    status: TestStatus,
    duration_ms: u64,
    message: Option<String>,
}

/// Writes a minimal JUnit XML document, the format CI dashboards consume.
pub struct JunitReporter {
    path: PathBuf,
    entries: Mutex<Vec<Entry>>,
}

impl JunitReporter {
    pub fn new(path: PathBuf) -> Self {
        Self { path, entries: Mutex::new(Vec::new()) }
    }
}

impl Reporter for JunitReporter {
    fn on_test_end(&self, test: &TestCase, result: &TestResult) {
        self.entries.lock().unwrap().push(Entry {
            title: test.title.clone(),
            status: result.status,
            duration_ms: result.duration_ms,
            message: result.errors.first().map(|e| e.message.clone()),
        });
    }

    fn on_end(&self, _full: &FullResult) {
        let entries = self.entries.lock().unwrap();
        let failures = entries.iter().filter(|e| e.status.is_failure()).count();
        let mut xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<testsuite tests=\"{}\" failures=\"{}\">\n",
            entries.len(),
            failures
        );
        for entry in entries.iter() {
            let seconds = entry.duration_ms as f64 / 1000.0;
            xml.push_str(&format!(
                "  <testcase name=\"{}\" time=\"{seconds:.3}\">\n",
                xml_escape(&entry.title)
            ));
            if let Some(message) = &entry.message {
                xml.push_str(&format!("    <failure message=\"{}\"/>\n", xml_escape(message)));
            }
            xml.push_str("  </testcase>\n");
        }
        xml.push_str("</testsuite>\n");
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = std::fs::write(&self.path, xml);
    }

    fn prints_to_stdio(&self) -> bool {
        false
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}
