//! dupfind - content-hash duplicate file finder
//!
//! Walks a directory tree, hashes every regular file with a streaming digest
//! and reports each group of files sharing a digest, along with the bytes
//! wasted by the copies.
//!
//! The pipeline is [`scanner::Walker`] → [`scanner::hash_all`] →
//! [`duplicates::DuplicateIndex`], driven by [`duplicates::DuplicateFinder`].

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::Cli;
use crate::config::Config;
use crate::duplicates::{DuplicateFinder, FinderError};
use crate::error::ExitCode;
use crate::output::{JsonOutput, OutputFormat, TextOutput};
use crate::progress::Progress;

/// Run the application and write the report to stdout.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the root cannot be
/// walked, the run is interrupted, or the report cannot be written.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_app_with_writer(cli, &mut out)
}

/// Run the application and write the report to `writer`.
///
/// # Errors
///
/// See [`run_app`].
pub fn run_app_with_writer<W: Write>(cli: Cli, writer: &mut W) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Config::try_load_from_path(path, cli.profile.as_deref())
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => Config::load(cli.profile.as_deref()),
    };
    config.merge_cli(&cli);
    config.validate()?;
    log::debug!("Effective configuration: {:?}", config);

    let handler = signal::install_handler()?;

    let mut finder_config = config
        .finder_config()
        .with_strict(cli.strict)
        .with_shutdown_flag(handler.get_flag());
    if cli.progress && !cli.quiet {
        finder_config = finder_config.with_progress_callback(Arc::new(Progress::new(false)));
    }

    let finder = DuplicateFinder::new(finder_config);
    let report = finder
        .find_duplicates(&cli.path)
        .with_context(|| format!("Failed to scan {}", cli.path.display()))?;

    let (index, verify_stats) = report.index();
    if handler.is_shutdown_requested() {
        return Err(FinderError::Interrupted.into());
    }
    let summary = report.summary(&index, verify_stats.as_ref());

    if summary.warnings > 0 {
        log::warn!(
            "{} entries could not be read and were skipped",
            summary.warnings
        );
    }
    if summary.collisions > 0 {
        log::warn!(
            "{} files shared a digest with different content and were removed from their group",
            summary.collisions
        );
    }
    log::info!(
        "{} duplicate groups, {} duplicate files, {} wasted ({})",
        summary.duplicate_groups,
        summary.duplicate_files,
        summary.wasted_display(),
        summary.wasted_space
    );

    match config.output {
        OutputFormat::Text => TextOutput::new(&index, &summary)
            .with_human_sizes(cli.verbose > 0)
            .write_to(writer)
            .context("Failed to write report")?,
        OutputFormat::Json => JsonOutput::new(&index, &summary)
            .write_to(writer, true)
            .context("Failed to write report")?,
    }

    Ok(ExitCode::Success)
}
