//! Worker dispatcher (§4.6): explicitly out of scope per §1 — this module
//! only defines the interface the stage dispatcher consumes. A real
//! implementation runs test groups out-of-process and reports through the
//! configured [`crate::reporter::Reporter`]; fixtures under `tests/` provide
//! an in-process stand-in.

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait Dispatcher: Send {
    /// Runs every group handed to this dispatcher to completion (or until
    /// stopped), reporting through whatever reporter it was built with.
    fn run(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Requests an orderly drain of in-flight groups; awaited after `run()`
    /// returns or is raced away by a signal.
    fn stop(&mut self) -> BoxFuture<'_, ()>;

    fn has_worker_errors(&self) -> bool;

    /// `true` if any test in the groups this dispatcher ran ended in a
    /// failing `TestStatus`.
    fn any_test_failed(&self) -> bool;
}

pub trait DispatcherFactory: Send + Sync {
    fn build(&self, groups: Vec<crate::model::TestGroup>) -> Box<dyn Dispatcher>;
}
