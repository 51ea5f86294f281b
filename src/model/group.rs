use std::path::PathBuf;

use crate::model::project::RunMode;
use crate::model::suite::TestCase;

/// The unit submitted to the dispatcher. Every test in a group shares
/// `(worker_hash, require_file, repeat_each_index, project_id)` — see
/// `grouper::group_purity_holds` for the invariant checked in tests.
#[derive(Debug, Clone)]
pub struct TestGroup {
    pub worker_hash: String,
    pub require_file: PathBuf,
    pub repeat_each_index: usize,
    pub project_id: String,
    pub run: RunMode,
    pub tests: Vec<TestCase>,
    pub watch_mode: bool,
}

impl TestGroup {
    pub fn is_always(&self) -> bool {
        self.run == RunMode::Always
    }

    pub fn test_count(&self) -> usize {
        self.tests.len()
    }
}
