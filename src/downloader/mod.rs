pub mod ytdlp;

use crate::errors::Result;
use std::path::PathBuf;

pub use ytdlp::YtDlpDownloader;

/// One track to download: the source URL plus the options resolved from the
/// CLI. Immutable once created.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub output_dir: PathBuf,
    pub audio_format: String,
    pub audio_quality: String,
}

/// A downloader backend turns a request into exactly one audio file on disk
/// and reports failure through the error. Behind a trait so orchestration
/// can be exercised without the external tool.
#[async_trait::async_trait]
pub trait TrackDownloader {
    async fn download(&self, request: &DownloadRequest) -> Result<PathBuf>;
}
