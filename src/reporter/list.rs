use std::sync::Mutex;

use super::Reporter;
use crate::model::{SuiteArena, SuiteId, TestCase, TestResult, TestStatus};

/// Prints every test's title up front, then a result line per completion.
#[derive(Default)]
pub struct ListReporter {
    index: Mutex<usize>,
}

impl Reporter for ListReporter {
    fn on_begin(&self, _config: &crate::config::Config, arena: &SuiteArena, root: SuiteId) {
        for test in arena.all_tests(root) {
            println!("  {}", test.full_title(arena));
        }
    }

    fn on_test_end(&self, test: &TestCase, result: &TestResult) {
        let mut index = self.index.lock().unwrap();
        *index += 1;
        let marker = if result.status == TestStatus::Passed { "✓" } else { "✗" };
        println!("  {marker} {} {}", *index, test.title);
    }
}

/// Used in `--list` mode instead of `list`/`line`/`dot`: prints only the
/// enumerated titles, no execution events (list mode never dispatches).
#[derive(Default)]
pub struct ListModeReporter;

impl Reporter for ListModeReporter {
    fn on_begin(&self, _config: &crate::config::Config, arena: &SuiteArena, root: SuiteId) {
        for test in arena.all_tests(root) {
            println!("{}", test.full_title(arena));
        }
    }
}
