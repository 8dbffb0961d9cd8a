//! FileCon - batch file format converter
//!
//! Command line front end: selects files, runs the batch on the background
//! worker and reports the outcome.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use filecon::batch::BatchSummary;
use filecon::category::MediaCategory;
use filecon::cli::{Args, Commands, ConfigAction};
use filecon::config::{Config, DEFAULT_CONFIG_FILE};
use filecon::convert::ConverterRegistry;
use filecon::error::FileConError;
use filecon::media::MediaProcessorFactory;
use filecon::options::ConversionOptions;
use filecon::selection::FileSelection;
use filecon::worker::{BatchEvent, BatchRequest, BatchWorker};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Convert {
            category,
            format,
            output_dir,
            bitrate,
            quality,
            codec,
            resolution,
            options_file,
            json,
            paths,
        } => {
            let overrides = ConversionOptions {
                format,
                bitrate,
                quality,
                codec,
                audio_codec: None,
                resolution,
            };
            let mut options = config.conversion_options();
            if let Some(path) = &options_file {
                let content = std::fs::read_to_string(path)?;
                options = options.overlay(ConversionOptions::from_json(&content)?);
                info!("Loaded conversion options from {}", path.display());
            }
            let options = options.overlay(overrides);
            let output_dir = output_dir.unwrap_or_else(|| config.output.directory.clone());

            let summary = run_conversion(&config, category, &paths, output_dir, options).await?;
            report(&summary, json)?;
        }
        Commands::Formats { category } => {
            let categories = match category {
                Some(category) => vec![category],
                None => MediaCategory::ALL.to_vec(),
            };
            for category in categories {
                println!("{}", category);
                println!("  Output formats: {}", category.target_formats().join(", "));
                println!("  Input files:    {}", category.input_extensions().join(", "));
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { path, force } => {
                let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
                if path.exists() && !force {
                    anyhow::bail!("{} already exists, use --force to overwrite", path.display());
                }
                Config::default().save_to_file(&path)?;
                println!("Wrote default configuration to {}", path.display());
            }
            ConfigAction::Show => {
                let content = toml::to_string_pretty(&config)?;
                println!("{}", content);
            }
        },
    }

    Ok(())
}

async fn run_conversion(
    config: &Config,
    category: MediaCategory,
    paths: &[PathBuf],
    output_dir: PathBuf,
    options: ConversionOptions,
) -> Result<BatchSummary> {
    let mut selection = FileSelection::new(category);
    for path in paths {
        if path.is_dir() {
            let added = selection.add_dir(path);
            info!("Added {} file(s) from {}", added, path.display());
        } else if !selection.add(path.clone()) {
            warn!("Ignoring duplicate path {}", path.display());
        }
    }

    if selection.is_empty() {
        return Err(FileConError::NoFiles.into());
    }
    info!("Selected {} {} file(s)", selection.len(), selection.category());

    if matches!(category, MediaCategory::Audio | MediaCategory::Video) {
        let media = MediaProcessorFactory::create_processor(config.media.clone());
        media.check_availability()?;
        info!("Using {}", media.get_version_info().await?);
    }

    if !output_dir.exists() {
        info!("Creating output directory {}", output_dir.display());
        tokio::fs::create_dir_all(&output_dir).await?;
    }

    let worker = BatchWorker::new(Arc::new(ConverterRegistry::from_config(config)));
    let total = selection.len();
    let mut events = worker.submit(BatchRequest {
        category,
        files: selection.into_files(),
        output_dir,
        options,
    })?;

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos:>3}% {msg}")?.progress_chars("=> "),
    );
    bar.set_message(format!("converting {} file(s)", total));

    while let Some(event) = events.recv().await {
        match event {
            BatchEvent::Progress(fraction) => bar.set_position(fraction.round() as u64),
            BatchEvent::Completed(summary) => {
                bar.finish_and_clear();
                return Ok(summary);
            }
        }
    }

    bar.abandon();
    Err(FileConError::Worker("Batch ended without reporting completion".to_string()).into())
}

fn report(summary: &BatchSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!(
        "Converted {} of {} files successfully!",
        summary.succeeded(),
        summary.total()
    );
    println!("Files saved to: {}", summary.output_dir.display());

    let cwd = std::env::current_dir()?;
    for failure in summary.failures() {
        let shown = pathdiff::diff_paths(&failure.file, &cwd).unwrap_or_else(|| failure.file.clone());
        println!("  failed: {} - {}", shown.display(), failure.message);
    }
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".filecon").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation
    let file_appender = rolling::daily(&log_dir, "filecon.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("filecon.log").display());

    Ok(())
}
