//! Logging setup (§1's ambient stack): a `tracing-subscriber` `fmt` layer
//! driven by `RUST_LOG`/`-v`, with `log` macros bridged in via `LogTracer` so
//! dependency crates that still use `log` show up the same way. Grounded in
//! the teacher's `trace::init_tracing`, trimmed to the single layer this
//! crate actually needs (no span-timing JSON mode, no trace-level toggle).

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

/// Installs the global subscriber. `level` overrides `RUST_LOG` when given
/// (derived from `-v`/`-q`/`--silent` in the CLI); safe to call once per
/// process — a second call from within a test binary is a no-op.
pub fn init(level: Option<tracing::Level>) {
    let _ = tracing_log::LogTracer::init();

    let filter = match level {
        Some(level) => EnvFilter::new(level.to_string()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(console::Term::stderr().features().colors_supported())
        .try_init();
}
