//! CLI entry point (§6), grounded in the teacher's `cli/mod.rs`: parse args,
//! initialize logging first, resolve config, then hand off to [`run::run`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{Context, Result};

use crate::config::{self, Config, ConfigCliOverrides, RunOptions, Shard, TestFileFilter};
use crate::dispatcher::DispatcherFactory;
use crate::model::{Project, SuiteArena, SuiteNode};
use crate::plugin::PluginRegistrationSink;
use crate::process_dispatcher::ProcessDispatcherFactory;
use crate::process_loader::ProcessSuiteLoader;
use crate::project_files;
use crate::reporter::{self, Multiplexer, Reporter};
use crate::stage;
use crate::suite_builder::SuiteBuilder;
use crate::{grouper, shard, tracing_init};

#[derive(clap::Parser)]
#[clap(name = "stagerun", version = env!("CARGO_PKG_VERSION"), about = env!("CARGO_PKG_DESCRIPTION"))]
struct Cli {
    /// Path to a config file, or a directory to search for one.
    #[clap(long, default_value = ".")]
    config: PathBuf,

    /// Only run these projects (case-insensitive, repeatable).
    #[clap(long = "project")]
    project: Vec<String>,

    /// List matched tests instead of running them.
    #[clap(long)]
    list: bool,

    /// `pattern[:line[:column]]` file filters, e.g. `tests/foo.spec.rs:42`.
    #[clap(value_name = "FILE_FILTER")]
    file_filters: Vec<String>,

    /// Only run tests whose full title matches this regex.
    #[clap(long)]
    grep: Option<String>,

    /// Command that lists a test file's suite tree as JSON (see `process_loader`).
    #[clap(long, default_value = "stagerun-list-tests")]
    loader_cmd: String,

    /// Command that runs one test group out of process (see `process_dispatcher`).
    #[clap(long, default_value = "stagerun-run-group")]
    dispatcher_cmd: String,

    /// Per-test timeout passed to the worker dispatcher, in seconds.
    #[clap(long, value_parser = parse_secs)]
    per_test_timeout: Option<Duration>,

    /// Run only this shard, `k/n` (1-based).
    #[clap(long, value_parser = parse_shard)]
    shard: Option<Shard>,

    #[clap(flatten)]
    overrides: ConfigCliOverrides,

    /// Increase log verbosity (repeatable).
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

fn parse_secs(s: &str) -> std::result::Result<Duration, String> {
    s.parse::<f64>().map(Duration::from_secs_f64).map_err(|e| e.to_string())
}

fn parse_shard(s: &str) -> std::result::Result<Shard, String> {
    let (current, total) = s.split_once('/').ok_or_else(|| format!("expected k/n, got {s}"))?;
    Ok(Shard {
        current: current.parse().map_err(|_| "invalid shard numerator".to_string())?,
        total: total.parse().map_err(|_| "invalid shard denominator".to_string())?,
    })
}

pub async fn run() -> Result<()> {
    let mut args = Cli::parse();

    let level = match args.verbose {
        0 => None,
        1 => Some(tracing::Level::DEBUG),
        _ => Some(tracing::Level::TRACE),
    };
    tracing_init::init(level);

    let mut plugins = PluginRegistrationSink::new();
    let mut cfg = match config::resolve_config_path(&args.config).wrap_err("resolving config path")? {
        Some(path) => Config::read(&path, &mut plugins)
            .wrap_err_with(|| format!("reading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(shard) = args.shard.take() {
        cfg.shard = Some(shard);
    }
    cfg.apply_overrides(&args.overrides);
    cfg.filter_projects(&args.project).wrap_err("filtering --project")?;

    let test_file_filters: Vec<TestFileFilter> = args.file_filters.iter().map(|f| parse_file_filter(f)).collect();
    let test_title_matcher = args.grep.as_deref().map(regex::Regex::new).transpose().wrap_err("compiling --grep")?;

    let run_options = RunOptions {
        list_only: args.list,
        test_file_filters,
        test_title_matcher,
        project_filter: args.project.clone(),
        pass_with_no_tests: false,
    };

    let reporter_names = config::resolve_reporter_names(&cfg.reporters);
    let reporters = reporter::build_reporters(&reporter_names, &cfg.output_dir, run_options.list_only)
        .wrap_err("building reporters")?;
    let reporter: Arc<dyn Reporter> = Arc::new(Multiplexer::new(reporters));

    let loader = ProcessSuiteLoader::new(args.loader_cmd.clone());
    let mut builder = SuiteBuilder::new(&loader, &run_options, cfg.forbid_only, run_options.list_only);

    let (mut arena, root) = SuiteArena::root();
    let mut fatal_errors = Vec::new();
    let mut stages = Vec::new();
    let projects: Vec<Arc<Project>> = cfg.projects.iter().cloned().map(Arc::new).collect();

    for stage_entry in stage::collect_stages(&projects) {
        let stage_root = arena.add_child_suite(root, SuiteNode::new(crate::model::SuiteKind::Root, ""));
        for project in &stage_entry.projects {
            match collect_project_files(project, &run_options.test_file_filters) {
                Ok(files) => {
                    if let Err(err) = builder.add_project(&mut arena, stage_root, project, &files) {
                        fatal_errors.push(err);
                    }
                }
                Err(err) => fatal_errors.push(err),
            }
        }
        let groups = grouper::group_tests(&arena, stage_root, cfg.workers, false);
        stages.push(groups);
    }

    let shardable = shard::shardable_total(&stages);
    let stages = if shardable == 0 && fatal_errors.is_empty() && !run_options.pass_with_no_tests && !run_options.list_only {
        fatal_errors.push(crate::error::Error::NoTestsFound);
        stages
    } else {
        shard::filter_stage_groups(stages, cfg.shard)
    };

    let dispatcher_factory =
        ProcessDispatcherFactory::new(args.dispatcher_cmd.clone(), reporter.clone(), args.per_test_timeout);
    let plugins = plugins.into_plugins();

    let inputs = crate::run::RunInputs {
        config: &cfg,
        arena: &arena,
        root,
        stages,
        fatal_errors,
        run_options: &run_options,
        reporter: reporter.as_ref(),
        dispatcher_factory: &dispatcher_factory as &dyn DispatcherFactory,
        plugins: &plugins,
        global_setup: None,
        global_teardown: None,
    };

    let full = crate::run::run(inputs).await;
    if full.status != crate::model::FullStatus::Passed {
        std::process::exit(1);
    }
    Ok(())
}

fn collect_project_files(project: &Project, cli_filters: &[TestFileFilter]) -> crate::error::Result<Vec<PathBuf>> {
    let collected = crate::collector::collect_files(&project.test_dir, project.respect_git_ignore)?;
    project_files::select_project_files(project, &collected, cli_filters)
}

fn parse_file_filter(raw: &str) -> TestFileFilter {
    let mut parts = raw.splitn(3, ':');
    let file_pattern = parts.next().unwrap_or(raw).to_string();
    let line = parts.next().and_then(|s| s.parse().ok());
    let column = parts.next().and_then(|s| s.parse().ok());
    TestFileFilter { file_pattern, line, column }
}
