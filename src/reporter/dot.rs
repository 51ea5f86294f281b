use std::io::Write;
use std::sync::Mutex;

use super::Reporter;
use crate::model::{TestCase, TestResult, TestStatus};

/// One character per test: `.` on pass, `F` on failure, `T` on timeout, `s`
/// on skip.
#[derive(Default)]
pub struct DotReporter {
    printed: Mutex<usize>,
}

impl Reporter for DotReporter {
    fn on_test_end(&self, _test: &TestCase, result: &TestResult) {
        let ch = match result.status {
            TestStatus::Passed => '.',
            TestStatus::Failed => 'F',
            TestStatus::Timedout => 'T',
            TestStatus::Skipped => 's',
            TestStatus::Interrupted => 'I',
        };
        let mut printed = self.printed.lock().unwrap();
        *printed += 1;
        print!("{ch}");
        if *printed % 80 == 0 {
            println!();
        }
        let _ = std::io::stdout().flush();
    }

    fn on_end(&self, _full: &crate::model::FullResult) {
        println!();
    }
}
