pub mod group;
pub mod project;
pub mod result;
pub mod suite;

pub use group::TestGroup;
pub use project::{Project, RunMode};
pub use result::{FullResult, FullStatus, TestError, TestResult, TestStatus};
pub use suite::{Entry, HookKind, Location, ParallelMode, SuiteArena, SuiteId, SuiteKind, SuiteNode, TestCase};
