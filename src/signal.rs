//! Signal watcher (§4.9): a scoped resource observing the process interrupt
//! signal, generalizing the teacher's own `watch_for_ctrl_c` helper (see
//! `hook.rs`), which spawns a ctrl-c listener against a `CancellationToken`.

use tokio_util::sync::CancellationToken;

/// Races against long operations so interrupts surface as an orderly
/// `interrupted` status rather than abrupt termination.
pub struct SignalWatcher {
    cancel: CancellationToken,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl SignalWatcher {
    pub fn spawn() -> Self {
        let cancel = CancellationToken::new();
        let task = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    tracing::warn!("failed to watch for ctrl-c: {err}");
                    return;
                }
                cancel.cancel();
                // exit immediately on a second ctrl-c
                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(130);
                }
            })
        };
        Self { cancel, task: Some(task) }
    }

    /// Resolves the first time the signal arrives.
    pub async fn wait(&self) {
        self.cancel.cancelled().await;
    }

    pub fn had_signal(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Detaches the handler; future `wait()` calls never resolve via signal.
    pub fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for SignalWatcher {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn had_signal_is_false_until_cancelled() {
        let watcher = SignalWatcher::spawn();
        assert!(!watcher.had_signal());
    }

    #[tokio::test]
    async fn disarm_prevents_further_signal_delivery() {
        let mut watcher = SignalWatcher::spawn();
        watcher.disarm();
        assert!(watcher.task.is_none());
    }
}
