//! Plugin trait (§4.7): the web-server/container-runtime extension point.
//! Generalizes the teacher's own `Plugin` trait (`src/plugins/plugin.rs`,
//! `fn name(&self) -> &'static str` plus one domain method) to an async
//! `setup`/`teardown` pair.

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;

type BoxFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Raced against the signal watcher; an interrupt mid-setup still
    /// leaves already-set-up plugins eligible for teardown.
    fn setup(&self) -> BoxFuture<'_>;

    fn teardown(&self) -> BoxFuture<'_>;
}

/// Registered during config load (e.g. by a `use: { webServer: ... }`
/// project field); the teacher's single module-level registration binding
/// generalizes here to an explicit sink passed by reference rather than a
/// process-wide static (see DESIGN.md).
#[derive(Default)]
pub struct PluginRegistrationSink {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistrationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn into_plugins(self) -> Vec<Box<dyn Plugin>> {
        self.plugins
    }
}
