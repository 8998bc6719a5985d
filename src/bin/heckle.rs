use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::warn;

use heckler::heckle::logging::{init_logging, parse_level};
use heckler::heckle::{
    GlobDiscovery, HeckleConfig, HeckleContext, HeckleError, Manifest, ManifestMutator, NodeKind,
    ReportFormat, ValidationOrchestrator,
};

#[derive(Debug, Parser)]
#[command(name = "heckle")]
#[command(about = "Mutate a class one change at a time and check the tests notice")]
struct Cli {
    /// Class to validate.
    class_name: String,
    /// Single method to validate; prefix class-level methods with `self.`.
    method_name: Option<String>,
    /// Project directory.
    #[arg(long)]
    project: Option<PathBuf>,
    /// Manifest describing classes and mutation sites (default: <project>/heckle.json).
    #[arg(long)]
    manifest: Option<PathBuf>,
    /// Glob selecting test files, relative to the project.
    #[arg(long = "tests")]
    test_pattern: Option<String>,
    /// Only run tests named after the targeted method.
    #[arg(long)]
    focus: bool,
    /// Fixed timeout in seconds instead of calibrating from the baseline.
    #[arg(long)]
    timeout: Option<u64>,
    /// Comma-separated node kinds to mutate (e.g. "if,lit").
    #[arg(long, value_delimiter = ',')]
    nodes: Vec<NodeKind>,
    /// Continue even if the unmutated tests fail.
    #[arg(long)]
    force: bool,
    /// Show test output.
    #[arg(long)]
    verbose: bool,
    /// Report format.
    #[arg(long, value_enum, default_value = "console")]
    format: OutputFormat,
    /// Log level: off, error, warn, info, debug, trace.
    #[arg(long = "log-level")]
    log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Plain text
    Console,
    /// JSON
    Json,
}

fn make_config(cli: &Cli) -> HeckleConfig {
    let mut config = HeckleConfig::default()
        .with_focus(cli.focus)
        .with_force(cli.force)
        .with_verbose(cli.verbose)
        .with_format(match cli.format {
            OutputFormat::Console => ReportFormat::Console,
            OutputFormat::Json => ReportFormat::Json,
        });
    if let Some(project) = &cli.project {
        config = config.with_project_dir(project);
    }
    if let Some(pattern) = &cli.test_pattern {
        config = config.with_test_pattern(pattern);
    }
    if let Some(timeout) = cli.timeout {
        config = config.with_timeout_secs(timeout);
    }
    if !cli.nodes.is_empty() {
        config = config.with_nodes(cli.nodes.clone());
    }
    config
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(parse_level(cli.log_level.as_deref())).context("logger already installed")?;

    let config = make_config(&cli);
    let manifest_path = cli
        .manifest
        .clone()
        .unwrap_or_else(|| config.project_dir.join("heckle.json"));
    let manifest = Manifest::load(&manifest_path)?;

    let mut ctx = HeckleContext::new(
        config.clone(),
        GlobDiscovery::new(&config.project_dir),
        manifest.clone(),
        ManifestMutator::new(manifest, &config.project_dir),
    );

    let interrupted = ctx.interrupt_flag();
    ctrlc::set_handler(move || {
        warn!("Received Ctrl-C, finishing the current trial..");
        interrupted.store(true, Ordering::SeqCst);
    })
    .context("failed to install Ctrl-C handler")?;

    let result = ValidationOrchestrator::new(&mut ctx).validate(
        &cli.class_name,
        cli.method_name.as_deref(),
        None,
        config.force,
    );

    match result {
        Ok(true) => Ok(ExitCode::SUCCESS),
        Ok(false) => Ok(ExitCode::FAILURE),
        Err(HeckleError::Interrupted) => {
            eprintln!("Interrupted.");
            Ok(ExitCode::from(2))
        }
        Err(err) => {
            eprintln!("{err}");
            Ok(ExitCode::FAILURE)
        }
    }
}
