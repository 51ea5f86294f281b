//! Stage dispatcher and overall run orchestration (§4.6, §4.7).

use tokio::time::Instant;

use crate::config::{Config, RunOptions};
use crate::dispatcher::DispatcherFactory;
use crate::error::{Error, Result};
use crate::lifecycle::{Lifecycle, SetupTeardown};
use crate::model::{FullResult, FullStatus, SuiteArena, SuiteId, TestGroup, TestResult, TestStatus};
use crate::output_dir;
use crate::plugin::Plugin;
use crate::reporter::Reporter;
use crate::signal::SignalWatcher;

pub struct RunInputs<'a> {
    pub config: &'a Config,
    pub arena: &'a SuiteArena,
    pub root: SuiteId,
    pub stages: Vec<Vec<TestGroup>>,
    pub fatal_errors: Vec<Error>,
    pub run_options: &'a RunOptions,
    pub reporter: &'a dyn Reporter,
    pub dispatcher_factory: &'a dyn DispatcherFactory,
    pub plugins: &'a [Box<dyn Plugin>],
    pub global_setup: Option<&'a (dyn Fn() -> Result<SetupTeardown> + Send + Sync)>,
    pub global_teardown: Option<&'a (dyn Fn() -> Result<()> + Send + Sync)>,
}

/// Runs the full control flow described in §4.6: fatal-error short-circuit,
/// list-mode short-circuit, output-dir cleanup, global setup, the per-stage
/// dispatch loop with cascade-on-failure and interrupt handling, and
/// unconditional teardown — all raced against a global timeout that aborts
/// the *wait*, not in-flight workers.
pub async fn run(inputs: RunInputs<'_>) -> FullResult {
    let start_time = chrono::Utc::now();
    inputs.reporter.on_begin(inputs.config, inputs.arena, inputs.root);

    if !inputs.fatal_errors.is_empty() {
        for err in &inputs.fatal_errors {
            inputs.reporter.on_error(&(err).into());
        }
        return finish(inputs.reporter, start_time, FullStatus::Failed);
    }

    if inputs.run_options.list_only {
        return finish(inputs.reporter, start_time, FullStatus::Passed);
    }

    let watcher = SignalWatcher::spawn();
    let timeout = inputs.config.global_timeout;

    // The timeout only aborts the *wait*: dropping this future when the
    // timer wins stops polling the stage loop, but workers are separate
    // processes owned by the dispatcher and are unaffected by that drop.
    let status = match timeout {
        Some(duration) => {
            let deadline = Instant::now() + duration;
            tokio::select! {
                status = run_body(&inputs, &watcher) => status,
                _ = tokio::time::sleep_until(deadline) => FullStatus::Timedout,
            }
        }
        None => run_body(&inputs, &watcher).await,
    };

    finish(inputs.reporter, start_time, status)
}

async fn run_body(inputs: &RunInputs<'_>, watcher: &SignalWatcher) -> FullStatus {
    for project in &inputs.config.projects {
        if let Err(err) = output_dir::clean(&project.output_dir) {
            inputs.reporter.on_error(&(&err).into());
            return FullStatus::Failed;
        }
    }

    let mut lifecycle = Lifecycle::new(inputs.plugins);
    match lifecycle.setup(watcher, inputs.global_setup).await {
        Ok(true) => {}
        Ok(false) => {
            lifecycle.teardown(inputs.reporter, inputs.global_teardown).await;
            return FullStatus::Interrupted;
        }
        Err(err) => {
            inputs.reporter.on_error(&(&err).into());
            lifecycle.teardown(inputs.reporter, inputs.global_teardown).await;
            return FullStatus::Failed;
        }
    }

    let status = stage_loop(inputs, watcher).await;
    let teardown_failed = lifecycle.teardown(inputs.reporter, inputs.global_teardown).await;
    if teardown_failed && status == FullStatus::Passed {
        FullStatus::Failed
    } else {
        status
    }
}

async fn stage_loop(inputs: &RunInputs<'_>, watcher: &SignalWatcher) -> FullStatus {
    let mut previous_stage_failed = false;
    let mut had_worker_errors = false;
    let mut any_test_failed = false;

    for mut groups in inputs.stages.iter().cloned() {
        if previous_stage_failed {
            groups = skip_non_always(groups, inputs.reporter);
        }
        if groups.is_empty() {
            continue;
        }

        let mut dispatcher = inputs.dispatcher_factory.build(groups);
        let run_fut = dispatcher.run();
        tokio::select! {
            _ = run_fut => {}
            _ = watcher.wait() => {
                dispatcher.stop().await;
                return FullStatus::Interrupted;
            }
        }
        dispatcher.stop().await;

        if dispatcher.has_worker_errors() {
            had_worker_errors = true;
            break;
        }
        previous_stage_failed = dispatcher.any_test_failed();
        any_test_failed |= previous_stage_failed;
    }

    if watcher.had_signal() {
        FullStatus::Interrupted
    } else if had_worker_errors || any_test_failed {
        FullStatus::Failed
    } else {
        FullStatus::Passed
    }
}

/// Emits synthetic `on_test_begin`/`on_test_end(status=skipped)` for every
/// non-`always` test and drops its group; `always`-run groups are kept.
fn skip_non_always(groups: Vec<TestGroup>, reporter: &dyn Reporter) -> Vec<TestGroup> {
    let mut kept = Vec::with_capacity(groups.len());
    for group in groups {
        if group.is_always() {
            kept.push(group);
            continue;
        }
        for test in &group.tests {
            reporter.on_test_begin(test);
            reporter.on_test_end(
                test,
                &TestResult { status: TestStatus::Skipped, duration_ms: 0, errors: Vec::new(), retry: 0 },
            );
        }
    }
    kept
}

fn finish(reporter: &dyn Reporter, start_time: chrono::DateTime<chrono::Utc>, status: FullStatus) -> FullResult {
    let duration_ms = (chrono::Utc::now() - start_time).num_milliseconds().max(0) as u64;
    let full = FullResult { status, start_time, duration_ms };
    reporter.on_end(&full);
    reporter.on_exit();
    full
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{Dispatcher, DispatcherFactory};
    use crate::reporter::Reporter;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct ImmediatePassDispatcher;
    impl Dispatcher for ImmediatePassDispatcher {
        fn run(&mut self) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + '_>> {
            Box::pin(async { Ok(()) })
        }
        fn stop(&mut self) -> Pin<Box<dyn std::future::Future<Output = ()> + Send + '_>> {
            Box::pin(async {})
        }
        fn has_worker_errors(&self) -> bool {
            false
        }
        fn any_test_failed(&self) -> bool {
            false
        }
    }

    struct ImmediatePassFactory;
    impl DispatcherFactory for ImmediatePassFactory {
        fn build(&self, _groups: Vec<TestGroup>) -> Box<dyn Dispatcher> {
            Box::new(ImmediatePassDispatcher)
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        ended: AtomicBool,
    }
    impl Reporter for RecordingReporter {
        fn on_end(&self, _full: &FullResult) {
            self.ended.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn empty_stages_produce_a_passed_run() {
        let config = Config::default();
        let (arena, root) = SuiteArena::root();
        let reporter = RecordingReporter::default();
        let factory = ImmediatePassFactory;
        let run_options = RunOptions::default();
        let full = run(RunInputs {
            config: &config,
            arena: &arena,
            root,
            stages: vec![],
            fatal_errors: vec![],
            run_options: &run_options,
            reporter: &reporter,
            dispatcher_factory: &factory,
            plugins: &[],
            global_setup: None,
            global_teardown: None,
        })
        .await;
        assert_eq!(full.status, FullStatus::Passed);
        assert!(reporter.ended.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn fatal_errors_short_circuit_to_failed() {
        let config = Config::default();
        let (arena, root) = SuiteArena::root();
        let reporter = RecordingReporter::default();
        let factory = ImmediatePassFactory;
        let run_options = RunOptions::default();
        let full = run(RunInputs {
            config: &config,
            arena: &arena,
            root,
            stages: vec![],
            fatal_errors: vec![Error::NoTestsFound],
            run_options: &run_options,
            reporter: &reporter,
            dispatcher_factory: &factory,
            plugins: &[],
            global_setup: None,
            global_teardown: None,
        })
        .await;
        assert_eq!(full.status, FullStatus::Failed);
    }
}
