//! Global lifecycle (§4.7): plugin and user `globalSetup`/`globalTeardown`
//! ordering, raced against the signal watcher.

use crate::error::Result;
use crate::model::TestError;
use crate::plugin::Plugin;
use crate::reporter::Reporter;
use crate::signal::SignalWatcher;

/// A `globalSetup` hook's return value: nothing, or a teardown thunk to run
/// before `globalTeardown`.
pub type SetupTeardown = Option<Box<dyn FnOnce() -> Result<()> + Send>>;

pub struct Lifecycle<'a> {
    plugins: &'a [Box<dyn Plugin>],
    set_up_plugins: Vec<&'a dyn Plugin>,
    setup_teardown: SetupTeardown,
}

impl<'a> Lifecycle<'a> {
    pub fn new(plugins: &'a [Box<dyn Plugin>]) -> Self {
        Self { plugins, set_up_plugins: Vec::new(), setup_teardown: None }
    }

    /// Runs each plugin's `setup` in order, racing it against the signal
    /// watcher; then the user `globalSetup` hook, if any. Returns `Ok(false)`
    /// if interrupted mid-setup — callers should still run teardown for
    /// whatever plugins completed.
    pub async fn setup(
        &mut self,
        watcher: &SignalWatcher,
        global_setup: Option<&(dyn Fn() -> Result<SetupTeardown> + Send + Sync)>,
    ) -> Result<bool> {
        for plugin in self.plugins {
            let setup = plugin.setup();
            tokio::select! {
                result = setup => {
                    result?;
                    self.set_up_plugins.push(plugin.as_ref());
                }
                _ = watcher.wait() => return Ok(false),
            }
        }
        if let Some(global_setup) = global_setup {
            self.setup_teardown = global_setup()?;
        }
        Ok(true)
    }

    /// Runs every teardown step unconditionally, in reverse order: the
    /// `globalSetup`-returned thunk, then `global_teardown`, then plugins in
    /// reverse registration order. A failing step is reported via `on_error`
    /// and flips the caller's status to failed without skipping the rest.
    pub async fn teardown(
        self,
        reporter: &dyn Reporter,
        global_teardown: Option<&(dyn Fn() -> Result<()> + Send + Sync)>,
    ) -> bool {
        let mut failed = false;

        if let Some(thunk) = self.setup_teardown {
            failed |= run_and_report(reporter, || thunk());
        }
        if let Some(global_teardown) = global_teardown {
            failed |= run_and_report(reporter, || global_teardown());
        }
        for plugin in self.set_up_plugins.iter().rev() {
            let teardown = plugin.teardown();
            failed |= run_and_report_async(reporter, teardown).await;
        }
        failed
    }
}

fn run_and_report(reporter: &dyn Reporter, f: impl FnOnce() -> Result<()>) -> bool {
    match f() {
        Ok(()) => false,
        Err(err) => {
            reporter.on_error(&TestError::from(&err));
            true
        }
    }
}

async fn run_and_report_async(reporter: &dyn Reporter, fut: impl std::future::Future<Output = Result<()>>) -> bool {
    match fut.await {
        Ok(()) => false,
        Err(err) => {
            reporter.on_error(&TestError::from(&err));
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::Reporter as _;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct RecordingPlugin {
        name: &'static str,
        order: Arc<std::sync::Mutex<Vec<&'static str>>>,
    }

    impl Plugin for RecordingPlugin {
        fn name(&self) -> &'static str {
            self.name
        }

        fn setup(&self) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + '_>> {
            let order = self.order.clone();
            let name = self.name;
            Box::pin(async move {
                order.lock().unwrap().push(name);
                Ok(())
            })
        }

        fn teardown(&self) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + '_>> {
            let order = self.order.clone();
            let name = self.name;
            Box::pin(async move {
                order.lock().unwrap().push(name);
                Ok(())
            })
        }
    }

    struct CountingReporter(AtomicUsize);
    impl Reporter for CountingReporter {
        fn on_error(&self, _error: &TestError) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn teardown_runs_plugins_in_reverse_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let plugins: Vec<Box<dyn Plugin>> = vec![
            Box::new(RecordingPlugin { name: "a", order: order.clone() }),
            Box::new(RecordingPlugin { name: "b", order: order.clone() }),
        ];
        let watcher = SignalWatcher::spawn();
        let mut lifecycle = Lifecycle::new(&plugins);
        let ok = lifecycle.setup(&watcher, None).await.unwrap();
        assert!(ok);
        assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);

        let reporter = CountingReporter(AtomicUsize::new(0));
        let failed = lifecycle.teardown(&reporter, None).await;
        assert!(!failed);
        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "b", "a"]);
    }
}
