use super::Reporter;

/// Discards every event; used in tests and for `--reporter=null` runs.
pub struct NullReporter;

impl Reporter for NullReporter {
    fn prints_to_stdio(&self) -> bool {
        false
    }
}
