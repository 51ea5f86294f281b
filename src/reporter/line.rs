use std::sync::Mutex;

use console::Term;

use super::Reporter;
use crate::model::{TestCase, TestResult, TestStatus};

/// Overwrites a single terminal line with the currently running test, the
/// way a human-facing default reporter does (mirrors the teacher's own
/// `clx::progress` single-line job display).
#[derive(Default)]
pub struct LineReporter {
    term: Mutex<Option<Term>>,
    count: Mutex<usize>,
}

impl LineReporter {
    fn term(&self) -> Term {
        let mut guard = self.term.lock().unwrap();
        guard.get_or_insert_with(Term::stdout).clone()
    }
}

impl Reporter for LineReporter {
    fn on_test_begin(&self, test: &TestCase) {
        let term = self.term();
        let _ = term.clear_line();
        let _ = term.write_str(&format!("  {}", test.title));
    }

    fn on_test_end(&self, test: &TestCase, result: &TestResult) {
        *self.count.lock().unwrap() += 1;
        if result.status != TestStatus::Passed {
            let term = self.term();
            let _ = term.clear_line();
            println!("  {:?}: {}", result.status, test.title);
        }
    }

    fn on_end(&self, _full: &crate::model::FullResult) {
        let term = self.term();
        let _ = term.clear_line();
    }
}
