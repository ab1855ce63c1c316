use crate::cli::Cli;
use crate::errors::{AppError, Result};
use std::path::PathBuf;

/// Shared per-batch options, resolved once from CLI arguments and cloned
/// into each track job.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub output_dir: PathBuf,
    pub audio_format: String,
    pub audio_quality: String,
    pub with_metadata: bool,
    pub concurrency: usize,
}

impl DownloadConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            output_dir: cli.output_dir.clone(),
            audio_format: cli.format.clone(),
            audio_quality: cli.quality.clone(),
            with_metadata: !cli.no_metadata,
            concurrency: cli.concurrency.max(1),
        }
    }

    /// Creates the output directory if needed and checks it is usable.
    /// A failure here is fatal for the whole batch, no tracks can proceed.
    pub fn prepare_output_dir(&self) -> Result<()> {
        if !self.output_dir.exists() {
            std::fs::create_dir_all(&self.output_dir).map_err(|e| {
                AppError::Filesystem(format!(
                    "cannot create output directory {:?}: {}",
                    self.output_dir, e
                ))
            })?;
            log::info!("Created output directory: {:?}", self.output_dir);
        } else if !self.output_dir.is_dir() {
            return Err(AppError::Filesystem(format!(
                "output path {:?} exists but is not a directory",
                self.output_dir
            )));
        }
        Ok(())
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            audio_format: "mp3".to_string(),
            audio_quality: "320k".to_string(),
            with_metadata: true,
            concurrency: 3,
        }
    }
}
