//! Staged, sharded test run orchestrator: discovers test files, compiles
//! them into a suite tree, groups tests for worker-sharing, shards, and
//! dispatches them stage by stage. See `SPEC_FULL.md` for the full design.

pub mod cli;
pub mod collector;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod grouper;
pub mod lifecycle;
pub mod model;
pub mod output_dir;
pub mod plugin;
pub mod process_dispatcher;
pub mod process_loader;
pub mod project_files;
pub mod reporter;
pub mod run;
pub mod shard;
pub mod signal;
pub mod stage;
pub mod suite_builder;
pub mod tracing_init;

pub use error::{Error, Result};
