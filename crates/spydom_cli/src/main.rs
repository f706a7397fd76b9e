mod args;

use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use engine_logging::{engine_error, engine_info, engine_warn, LogDestination};
use log::LevelFilter;
use spydom_core::{parse_target_list, RunConfig, Target, TaskConfig};
use spydom_engine::chrome::{ChromeAllocator, ChromeOptions};
use spydom_engine::tasks::builtin_registry;
use spydom_engine::{write_report, Engine, EngineSettings, TaskRegistry};
use tokio_util::sync::CancellationToken;

use crate::args::Cli;

const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let destination = match &cli.log_file {
        Some(path) => LogDestination::TerminalAndFile(path.clone()),
        None => LogDestination::Terminal,
    };
    engine_logging::initialize(destination, level);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            engine_error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let registry = builtin_registry().context("building the task registry")?;
    if cli.list_tasks {
        print_tasks(&registry, &cli.run_config().task_config());
        return Ok(ExitCode::SUCCESS);
    }

    let config = cli.run_config();
    config.validate().context("invalid configuration")?;

    let Some(path) = cli.targets.as_deref() else {
        bail!("no targets file given");
    };
    let targets = read_targets(path)?;

    let plan = registry
        .prepare(config.task_filter(), &config.task_config())
        .context("initialising tasks")?;
    if plan.is_empty() {
        engine_warn!("No tasks enabled; pages will be loaded but nothing will be saved");
    }
    engine_info!(
        "Running {} tasks on {} targets with {} workers: {}",
        plan.len(),
        targets.len(),
        config.threads,
        plan.slugs().join(", ")
    );

    let allocator = launch_browser(&config).await?;
    let engine = Engine::new(EngineSettings::from_config(&config), plan, allocator);

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_ctrl_c(shutdown.clone()));

    let summary = engine
        .run(targets.clone(), shutdown)
        .await
        .context("run aborted")?;

    if !cli.no_report {
        match write_report(&config.output_dir, &targets, &summary) {
            Ok(path) => engine_info!("Report written to {}", path.display()),
            Err(err) => engine_warn!("Failed to write report: {}", err),
        }
    }

    if summary.interrupted {
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    Ok(ExitCode::SUCCESS)
}

fn read_targets(path: &Path) -> Result<Vec<Target>> {
    let input = fs::read_to_string(path)
        .with_context(|| format!("reading targets file {}", path.display()))?;
    let list = parse_target_list(&input);
    for (line, err) in &list.rejected {
        engine_warn!("{}:{}: skipping target: {}", path.display(), line, err);
    }
    for target in &list.duplicates {
        engine_warn!("Skipping duplicate target {}", target);
    }
    if list.targets.is_empty() {
        engine_warn!("No usable targets in {}", path.display());
    }
    Ok(list.targets)
}

async fn launch_browser(config: &RunConfig) -> Result<Arc<ChromeAllocator>> {
    let options = ChromeOptions {
        visible: config.visible,
        insecure: config.insecure,
    };
    let allocator = ChromeAllocator::launch(options)
        .await
        .context("launching the browser")?;
    Ok(Arc::new(allocator))
}

async fn watch_ctrl_c(shutdown: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        engine_warn!("Interrupt received; finishing in-flight targets");
        shutdown.cancel();
    }
}

fn print_tasks(registry: &TaskRegistry, config: &TaskConfig) {
    let descriptors = registry.descriptors(config);
    let width = descriptors
        .iter()
        .map(|d| d.slug.len())
        .max()
        .unwrap_or_default();
    println!("{:<width$}  PRIORITY  NAME / DESCRIPTION", "SLUG");
    for d in descriptors {
        println!(
            "{:<width$}  {:<8}  {}: {}",
            d.slug,
            d.priority.value(),
            d.name,
            d.description
        );
    }
}
