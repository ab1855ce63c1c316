use super::{DownloadRequest, TrackDownloader};
use crate::errors::{AppError, Result};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Downloader backend that shells out to yt-dlp for extraction and
/// transcoding. Expects the `yt-dlp` binary (and ffmpeg) on PATH.
pub struct YtDlpDownloader {
    ytdlp_path: String,
}

impl YtDlpDownloader {
    pub fn new() -> Self {
        Self {
            ytdlp_path: "yt-dlp".to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_ytdlp_path(mut self, path: String) -> Self {
        self.ytdlp_path = path;
        self
    }

    fn build_command(&self, request: &DownloadRequest) -> Command {
        let template = request.output_dir.join("%(title)s.%(ext)s");

        let mut cmd = Command::new(&self.ytdlp_path);
        cmd.args([
            "--extract-audio",
            "--audio-format",
            &request.audio_format,
            "--audio-quality",
            &request.audio_quality,
            "--output",
            &template.to_string_lossy(),
            "--no-playlist",
            "--no-warnings",
            "--print",
            "after_move:filepath",
            &request.url,
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
        cmd
    }

    /// Recovers the produced file path from yt-dlp's stdout. Under
    /// `--print after_move:filepath` the final path is the only line
    /// printed, so the first line ending in the requested extension is the
    /// one.
    fn parse_output_path(stdout: &str, format: &str) -> Option<PathBuf> {
        let suffix = format!(".{}", format);
        stdout
            .lines()
            .map(str::trim)
            .find(|line| line.ends_with(&suffix))
            .map(PathBuf::from)
    }
}

impl Default for YtDlpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TrackDownloader for YtDlpDownloader {
    async fn download(&self, request: &DownloadRequest) -> Result<PathBuf> {
        log::info!("Downloading from: {}", request.url);

        let mut cmd = self.build_command(request);
        let child = cmd.spawn().map_err(|e| {
            AppError::Download(format!("failed to start {}: {}", self.ytdlp_path, e))
        })?;

        // kill_on_drop reaps the child if the timeout fires or the task is
        // cancelled mid-download.
        let output = tokio::time::timeout(DOWNLOAD_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| {
                AppError::Download(format!(
                    "yt-dlp timed out after {}s for {}",
                    DOWNLOAD_TIMEOUT.as_secs(),
                    request.url
                ))
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Download(format!(
                "yt-dlp exited with {} for {}: {}",
                output.status,
                request.url,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = Self::parse_output_path(&stdout, &request.audio_format).ok_or_else(|| {
            AppError::Download(format!(
                "yt-dlp reported no output file for {}",
                request.url
            ))
        })?;

        if !path.exists() {
            return Err(AppError::Download(format!(
                "yt-dlp reported {:?} but the file does not exist",
                path
            )));
        }

        log::info!("Downloaded audio file: {:?}", path);
        Ok(path)
    }
}
