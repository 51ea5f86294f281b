use std::path::PathBuf;
use std::sync::Mutex;

use super::Reporter;
use crate::model::{FullResult, TestCase, TestResult, TestStatus};

struct Entry {
    title: String,
    status: TestStatus,
}

/// Writes a single self-contained HTML summary page.
pub struct HtmlReporter {
    path: PathBuf,
    entries: Mutex<Vec<Entry>>,
}

impl HtmlReporter {
    pub fn new(path: PathBuf) -> Self {
        Self { path, entries: Mutex::new(Vec::new()) }
    }
}

impl Reporter for HtmlReporter {
    fn on_test_end(&self, test: &TestCase, result: &TestResult) {
        self.entries.lock().unwrap().push(Entry { title: test.title.clone(), status: result.status });
    }

    fn on_end(&self, _full: &FullResult) {
        let entries = self.entries.lock().unwrap();
        let mut body = String::from("<!doctype html><html><body><table>\n");
        for entry in entries.iter() {
            let class = if entry.status == TestStatus::Passed { "pass" } else { "fail" };
            body.push_str(&format!(
                "<tr class=\"{class}\"><td>{}</td><td>{}</td></tr>\n",
                html_escape(&entry.title),
                entry.status
            ));
        }
        body.push_str("</table></body></html>\n");
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = std::fs::write(&self.path, body);
    }

    fn prints_to_stdio(&self) -> bool {
        false
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
