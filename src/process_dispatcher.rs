//! Default, process-based [`Dispatcher`]: runs each group's tests by
//! spawning one worker process per group and reading back a line-delimited
//! JSON result stream. This is the production realization of the worker
//! dispatcher collaborator — test bodies run out-of-process, never inside
//! this crate.

use std::pin::Pin;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::dispatcher::{Dispatcher, DispatcherFactory};
use crate::error::Result;
use crate::model::{TestError, TestGroup, TestResult, TestStatus};
use crate::reporter::Reporter;

type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkerMessage {
    test_id: u64,
    status: TestStatus,
    duration_ms: u64,
    #[serde(default)]
    errors: Vec<WorkerError>,
}

#[derive(Debug, Deserialize)]
struct WorkerError {
    message: String,
    stack: Option<String>,
}

pub struct ProcessDispatcherFactory {
    program: Arc<String>,
    reporter: Arc<dyn Reporter>,
    per_test_timeout: Option<Duration>,
}

impl ProcessDispatcherFactory {
    pub fn new(program: impl Into<String>, reporter: Arc<dyn Reporter>, per_test_timeout: Option<Duration>) -> Self {
        Self { program: Arc::new(program.into()), reporter, per_test_timeout }
    }
}

impl DispatcherFactory for ProcessDispatcherFactory {
    fn build(&self, groups: Vec<TestGroup>) -> Box<dyn Dispatcher> {
        Box::new(ProcessDispatcher {
            program: self.program.clone(),
            reporter: self.reporter.clone(),
            per_test_timeout: self.per_test_timeout,
            groups,
            worker_errors: AtomicBool::new(false),
            any_test_failed: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        })
    }
}

/// One process per group, run one at a time; each process is handed the
/// group's test ids on stdin (one id per line) and is expected to emit one
/// [`WorkerMessage`] per line on stdout as it completes each test.
pub struct ProcessDispatcher {
    program: Arc<String>,
    reporter: Arc<dyn Reporter>,
    per_test_timeout: Option<Duration>,
    groups: Vec<TestGroup>,
    worker_errors: AtomicBool,
    any_test_failed: AtomicBool,
    stopped: AtomicBool,
}

impl Dispatcher for ProcessDispatcher {
    fn run(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let groups = std::mem::take(&mut self.groups);
            for group in &groups {
                self.run_group(group).await?;
            }
            self.groups = groups;
            Ok(())
        })
    }

    fn stop(&mut self) -> BoxFuture<'_, ()> {
        self.stopped.store(true, Ordering::SeqCst);
        Box::pin(async {})
    }

    fn has_worker_errors(&self) -> bool {
        self.worker_errors.load(Ordering::SeqCst)
    }

    fn any_test_failed(&self) -> bool {
        self.any_test_failed.load(Ordering::SeqCst)
    }
}

impl ProcessDispatcher {
    async fn run_group(&self, group: &TestGroup) -> Result<()> {
        use std::io::Write;

        if self.stopped.load(Ordering::SeqCst) {
            return Ok(());
        }
        for test in &group.tests {
            self.reporter.on_test_begin(test);
        }

        let mut child = Command::new(self.program.as_str())
            .arg(&group.require_file)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            let ids: String = group.tests.iter().map(|t| t.id.to_string()).collect::<Vec<_>>().join("\n");
            let _ = tokio::io::AsyncWriteExt::write_all(&mut stdin, ids.as_bytes()).await;
        }

        let stdout = child.stdout.take().expect("piped stdout");
        let mut lines = BufReader::new(stdout).lines();
        let mut seen = std::collections::HashSet::new();

        let read_loop = async {
            while let Ok(Some(line)) = lines.next_line().await {
                let Ok(msg) = serde_json::from_str::<WorkerMessage>(&line) else { continue };
                if let Some(test) = group.tests.iter().find(|t| t.id == msg.test_id) {
                    seen.insert(msg.test_id);
                    if msg.status.is_failure() {
                        self.any_test_failed.store(true, Ordering::SeqCst);
                    }
                    let result = TestResult {
                        status: msg.status,
                        duration_ms: msg.duration_ms,
                        errors: msg.errors.into_iter().map(|e| TestError { message: e.message, stack: e.stack, is_not_a_fatal_error: false }).collect(),
                        retry: 0,
                    };
                    self.reporter.on_test_end(test, &result);
                }
            }
        };

        if let Some(timeout) = self.per_test_timeout {
            let _ = tokio::time::timeout(timeout * group.tests.len().max(1) as u32, read_loop).await;
        } else {
            read_loop.await;
        }

        let status = child.wait().await?;
        for test in &group.tests {
            if !seen.contains(&test.id) {
                self.worker_errors.store(true, Ordering::SeqCst);
                self.reporter.on_test_end(
                    test,
                    &TestResult {
                        status: TestStatus::Failed,
                        duration_ms: 0,
                        errors: vec![TestError::synthetic(format!("worker exited without reporting this test ({status})"))],
                        retry: 0,
                    },
                );
            }
        }
        let _ = std::io::stdout().flush();
        Ok(())
    }
}

