use super::Reporter;
use crate::model::{TestCase, TestError, TestResult};

/// Emits GitHub Actions `::error::` workflow-command annotations for
/// failures, so they surface in the PR diff view.
pub struct GithubReporter;

impl Reporter for GithubReporter {
    fn on_test_end(&self, test: &TestCase, result: &TestResult) {
        if !result.status.is_failure() {
            return;
        }
        let message = result
            .errors
            .first()
            .map(|e| e.message.as_str())
            .unwrap_or("test failed");
        println!("::error title={}::{}", escape(&test.title), escape(message));
    }

    fn on_error(&self, error: &TestError) {
        if !error.is_not_a_fatal_error {
            println!("::error::{}", escape(&error.message));
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}
