mod cli;

use passforge::{
    acquire::Acquirer,
    config,
    logging,
    pipeline::{
        DryRunRunner, JobRunner, PipelineExecutor, PipelineSettings, ProcessRunner, RunReport,
    },
    profile::ProfileSet,
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use passforge_av::{Encoder, Workspace};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = config::load_config_or_default(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config::validate_config(&config)?;

    let (log_path, _log_guard) = logging::init(&config.paths.log_dir, cli.verbose)?;
    tracing::info!("Logging to {:?}", log_path);

    let rt = tokio::runtime::Runtime::new()?;
    let report = match rt.block_on(transcode(&cli, &config)) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Run aborted: {:#}", e);
            return Err(e);
        }
    };

    print!("{}", report.summary());

    if report.has_failures() {
        tracing::warn!("Finished with failures");
        Ok(ExitCode::FAILURE)
    } else {
        tracing::info!("Finished successfully");
        Ok(ExitCode::SUCCESS)
    }
}

async fn transcode(cli: &Cli, config: &config::Config) -> Result<RunReport> {
    let profiles = ProfileSet::load(&cli.profiles)
        .with_context(|| format!("Failed to load profiles from {:?}", cli.profiles))?;
    tracing::info!("Loaded {} profiles from {:?}", profiles.len(), cli.profiles);

    let acquirer = Acquirer::new(Workspace::at(&config.paths.scratch_dir), &config.fetch);
    let source = acquirer
        .acquire(&cli.input)
        .await
        .context("Source acquisition failed; nothing was transcoded")?;

    let encoder = if cli.dry_run {
        Encoder::resolve(&config.encoder.program)
            .map(Encoder::into_path)
            .unwrap_or_else(|_| config.encoder.program.clone())
    } else {
        let encoder = Encoder::resolve(&config.encoder.program)?;
        match encoder.version().await {
            Some(banner) => tracing::info!("Encoder: {}", banner),
            None => tracing::warn!("Could not read version of {:?}", encoder.path()),
        }
        encoder.into_path()
    };
    tracing::debug!("Using encoder {:?}", encoder);

    let runner: Arc<dyn JobRunner> = if cli.dry_run {
        Arc::new(DryRunRunner)
    } else {
        Arc::new(ProcessRunner)
    };

    let settings = PipelineSettings::from_config(config, encoder).with_dry_run(cli.dry_run);
    let executor = PipelineExecutor::new(runner, settings);
    executor.run(&source, &cli.dest_root, &profiles).await
}
