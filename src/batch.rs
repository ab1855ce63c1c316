use crate::config::DownloadConfig;
use crate::downloader::{DownloadRequest, TrackDownloader};
use crate::errors::{AppError, Result};
use crate::scrape::{MetadataSource, TrackMetadata};
use crate::tags;
use crate::utils::NameRegistry;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use url::Url;

/// Per-track result, reported in input order.
#[derive(Debug)]
pub struct TrackOutcome {
    pub url: String,
    pub file: Option<PathBuf>,
    pub error: Option<String>,
}

impl TrackOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    fn failed(url: &str, error: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            file: None,
            error: Some(error.into()),
        }
    }
}

/// Overall batch verdict, mapped onto the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    AllSucceeded,
    PartialFailure,
    AllFailed,
}

impl BatchStatus {
    pub fn of(outcomes: &[TrackOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.succeeded()).count();
        if succeeded == outcomes.len() {
            BatchStatus::AllSucceeded
        } else if succeeded > 0 {
            BatchStatus::PartialFailure
        } else {
            BatchStatus::AllFailed
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            BatchStatus::AllSucceeded => 0,
            BatchStatus::PartialFailure => 1,
            BatchStatus::AllFailed => 2,
        }
    }
}

/// Shared per-batch state, passed explicitly into each worker rather than
/// held as globals so the pipeline stays independently testable.
pub struct BatchContext<D, M> {
    pub config: DownloadConfig,
    pub downloader: D,
    pub metadata_source: M,
    pub names: NameRegistry,
    pub cancelled: AtomicBool,
}

impl<D, M> BatchContext<D, M>
where
    D: TrackDownloader + Send + Sync,
    M: MetadataSource + Send + Sync,
{
    pub fn new(config: DownloadConfig, downloader: D, metadata_source: M) -> Self {
        Self {
            config,
            downloader,
            metadata_source,
            names: NameRegistry::new(),
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Checks that the input is an HTTP(S) SoundCloud URL before any work is
/// spawned for it.
pub fn validate_track_url(url: &str) -> Result<()> {
    let parsed =
        Url::parse(url).map_err(|e| AppError::InvalidUrl(format!("{}: {}", url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::InvalidUrl(format!(
            "{}: unsupported scheme {}",
            url,
            parsed.scheme()
        )));
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| AppError::InvalidUrl(format!("{}: missing host", url)))?;

    if host != "soundcloud.com" && !host.ends_with(".soundcloud.com") {
        return Err(AppError::InvalidUrl(format!(
            "{}: not a soundcloud.com URL",
            url
        )));
    }

    Ok(())
}

/// Runs the whole batch with bounded parallelism. Outcomes come back in
/// input order regardless of completion order. Only batch-fatal setup
/// problems surface as `Err`; per-track failures are folded into outcomes.
pub async fn run_batch<D, M>(
    context: Arc<BatchContext<D, M>>,
    urls: &[String],
) -> Result<Vec<TrackOutcome>>
where
    D: TrackDownloader + Send + Sync + 'static,
    M: MetadataSource + Send + Sync + 'static,
{
    context.config.prepare_output_dir()?;

    let progress = batch_progress_bar(urls.len() as u64);

    let outcomes: Vec<TrackOutcome> = stream::iter(urls.iter().cloned())
        .map(|url| {
            let context = Arc::clone(&context);
            let progress = progress.clone();
            async move {
                let outcome = run_track(&context, &url).await;
                match &outcome.error {
                    None => progress.println(format!("done: {}", url)),
                    Some(reason) => progress.println(format!("failed: {} ({})", url, reason)),
                }
                progress.inc(1);
                outcome
            }
        })
        .buffered(context.config.concurrency)
        .collect()
        .await;

    progress.finish_and_clear();
    Ok(outcomes)
}

/// The per-track pipeline: validate, then download and scrape concurrently,
/// then tag and rename. Metadata problems never fail the track; download
/// success and metadata success are independent outcomes by design.
async fn run_track<D, M>(context: &BatchContext<D, M>, url: &str) -> TrackOutcome
where
    D: TrackDownloader + Send + Sync,
    M: MetadataSource + Send + Sync,
{
    if let Err(e) = validate_track_url(url) {
        log::error!("Skipping track: {}", e);
        return TrackOutcome::failed(url, e.to_string());
    }

    if context.is_cancelled() {
        return TrackOutcome::failed(url, "cancelled before start");
    }

    let request = DownloadRequest {
        url: url.to_string(),
        output_dir: context.config.output_dir.clone(),
        audio_format: context.config.audio_format.clone(),
        audio_quality: context.config.audio_quality.clone(),
    };

    // Scraping and downloading are independent of each other, run them
    // concurrently when metadata is enabled.
    let (download_result, metadata) = if context.config.with_metadata {
        tokio::join!(
            context.downloader.download(&request),
            context.metadata_source.fetch(url)
        )
    } else {
        (context.downloader.download(&request).await, TrackMetadata::default())
    };

    let file = match download_result {
        Ok(path) => path,
        Err(e) => {
            log::error!("Download failed for {}: {}", url, e);
            return TrackOutcome::failed(url, e.to_string());
        }
    };

    let file = if context.config.with_metadata {
        finish_with_metadata(context, file, &metadata)
    } else {
        file
    };

    TrackOutcome {
        url: url.to_string(),
        file: Some(file),
        error: None,
    }
}

/// Applies tags and the title-derived filename. Both steps are best-effort:
/// the audio file itself already counts as a success.
fn finish_with_metadata<D, M>(
    context: &BatchContext<D, M>,
    file: PathBuf,
    metadata: &TrackMetadata,
) -> PathBuf {
    if let Err(e) = tags::write_tags(&file, metadata) {
        log::warn!("Tagging failed for {:?}: {}", file, e);
    }

    match tags::rename_to_title(&file, metadata, &context.names) {
        Ok(renamed) => renamed,
        Err(e) => {
            log::warn!("Rename failed for {:?}: {}", file, e);
            file
        }
    }
}

fn batch_progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:30}] {pos}/{len} tracks")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message("Downloading");
    bar
}

/// Logs the final per-batch summary and lists every failed URL with its
/// reason.
pub fn report_summary(outcomes: &[TrackOutcome]) {
    let succeeded = outcomes.iter().filter(|o| o.succeeded()).count();
    println!(
        "Successfully downloaded {} of {} tracks.",
        succeeded,
        outcomes.len()
    );

    for outcome in outcomes.iter().filter(|o| !o.succeeded()) {
        if let Some(reason) = &outcome.error {
            println!("  failed: {} ({})", outcome.url, reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct FakeDownloader {
        dir: PathBuf,
        fail_urls: HashSet<String>,
    }

    #[async_trait::async_trait]
    impl TrackDownloader for FakeDownloader {
        async fn download(&self, request: &DownloadRequest) -> Result<PathBuf> {
            if self.fail_urls.contains(&request.url) {
                return Err(AppError::Download(format!("unresolvable: {}", request.url)));
            }
            let name = request.url.rsplit('/').next().unwrap_or("track");
            let path = self.dir.join(format!("{}.{}", name, request.audio_format));
            std::fs::write(&path, b"audio")?;
            Ok(path)
        }
    }

    struct FakeMetadata {
        record: TrackMetadata,
    }

    #[async_trait::async_trait]
    impl MetadataSource for FakeMetadata {
        async fn fetch(&self, _url: &str) -> TrackMetadata {
            self.record.clone()
        }
    }

    fn context_with(
        dir: &std::path::Path,
        fail_urls: &[&str],
        record: TrackMetadata,
        with_metadata: bool,
    ) -> Arc<BatchContext<FakeDownloader, FakeMetadata>> {
        let config = DownloadConfig {
            output_dir: dir.to_path_buf(),
            with_metadata,
            ..DownloadConfig::default()
        };
        Arc::new(BatchContext::new(
            config,
            FakeDownloader {
                dir: dir.to_path_buf(),
                fail_urls: fail_urls.iter().map(|s| s.to_string()).collect(),
            },
            FakeMetadata { record },
        ))
    }

    #[test]
    fn validates_soundcloud_urls() {
        assert!(validate_track_url("https://soundcloud.com/artist/track").is_ok());
        assert!(validate_track_url("https://on.soundcloud.com/abc").is_ok());
        assert!(validate_track_url("https://youtube.com/watch?v=x").is_err());
        assert!(validate_track_url("ftp://soundcloud.com/a/b").is_err());
        assert!(validate_track_url("not a url").is_err());
    }

    #[test]
    fn batch_status_maps_to_exit_codes() {
        let ok = TrackOutcome {
            url: "u".into(),
            file: None,
            error: None,
        };
        let bad = TrackOutcome::failed("u", "x");
        assert_eq!(BatchStatus::of(&[ok]).exit_code(), 0);
        let ok = TrackOutcome {
            url: "u".into(),
            file: None,
            error: None,
        };
        assert_eq!(BatchStatus::of(&[ok, TrackOutcome::failed("u", "x")]).exit_code(), 1);
        assert_eq!(BatchStatus::of(&[bad]).exit_code(), 2);
    }

    #[tokio::test]
    async fn failures_do_not_abort_siblings_and_order_is_preserved() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let urls: Vec<String> = vec![
            "https://soundcloud.com/a/one".into(),
            "https://soundcloud.com/a/two".into(),
            "https://soundcloud.com/a/three".into(),
        ];
        let context = context_with(
            tmp.path(),
            &["https://soundcloud.com/a/two"],
            TrackMetadata::default(),
            false,
        );

        let outcomes = run_batch(context, &urls).await.expect("batch");
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].url, urls[0]);
        assert_eq!(outcomes[1].url, urls[1]);
        assert_eq!(outcomes[2].url, urls[2]);
        assert!(outcomes[0].succeeded());
        assert!(!outcomes[1].succeeded());
        assert!(outcomes[2].succeeded());
        assert_eq!(BatchStatus::of(&outcomes), BatchStatus::PartialFailure);

        let reason = outcomes[1].error.as_deref().unwrap_or("");
        assert!(reason.contains("https://soundcloud.com/a/two"));
    }

    #[tokio::test]
    async fn invalid_url_is_reported_without_download() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let urls = vec!["https://example.com/nope".to_string()];
        let context = context_with(tmp.path(), &[], TrackMetadata::default(), false);

        let outcomes = run_batch(context, &urls).await.expect("batch");
        assert!(!outcomes[0].succeeded());
        assert!(outcomes[0]
            .error
            .as_deref()
            .unwrap_or("")
            .contains("Invalid URL"));
    }

    #[tokio::test]
    async fn empty_metadata_record_still_succeeds() {
        // Simulates a scrape failure: the source degrades to an empty record
        // and the download outcome is unaffected.
        let tmp = tempfile::tempdir().expect("tempdir");
        let urls = vec!["https://soundcloud.com/a/solo".to_string()];
        let context = context_with(tmp.path(), &[], TrackMetadata::default(), true);

        let outcomes = run_batch(context, &urls).await.expect("batch");
        assert!(outcomes[0].succeeded());
        // No title scraped, the downloader-assigned filename is kept.
        assert_eq!(
            outcomes[0].file.as_deref(),
            Some(tmp.path().join("solo.mp3").as_path())
        );
    }

    #[tokio::test]
    async fn scraped_title_renames_the_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let urls = vec!["https://soundcloud.com/a/raw".to_string()];
        let record = TrackMetadata {
            title: Some("Nice Title".to_string()),
            ..TrackMetadata::default()
        };
        let context = context_with(tmp.path(), &[], record, true);

        let outcomes = run_batch(context, &urls).await.expect("batch");
        assert!(outcomes[0].succeeded());
        assert_eq!(
            outcomes[0].file.as_deref(),
            Some(tmp.path().join("Nice Title.mp3").as_path())
        );
    }

    #[tokio::test]
    async fn no_metadata_skips_rename() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let urls = vec!["https://soundcloud.com/a/plain".to_string()];
        let record = TrackMetadata {
            title: Some("Should Not Apply".to_string()),
            ..TrackMetadata::default()
        };
        let context = context_with(tmp.path(), &[], record, false);

        let outcomes = run_batch(context, &urls).await.expect("batch");
        assert_eq!(
            outcomes[0].file.as_deref(),
            Some(tmp.path().join("plain.mp3").as_path())
        );
    }

    #[tokio::test]
    async fn cancelled_context_skips_pending_tracks() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let urls = vec!["https://soundcloud.com/a/late".to_string()];
        let context = context_with(tmp.path(), &[], TrackMetadata::default(), false);
        context.cancel();

        let outcomes = run_batch(context, &urls).await.expect("batch");
        assert!(!outcomes[0].succeeded());
        assert_eq!(outcomes[0].error.as_deref(), Some("cancelled before start"));
    }

    #[tokio::test]
    async fn unwritable_output_dir_is_batch_fatal() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let blocked = tmp.path().join("blocked");
        std::fs::write(&blocked, b"file in the way").expect("write");

        let config = DownloadConfig {
            output_dir: blocked,
            ..DownloadConfig::default()
        };
        let context = Arc::new(BatchContext::new(
            config,
            FakeDownloader {
                dir: tmp.path().to_path_buf(),
                fail_urls: HashSet::new(),
            },
            FakeMetadata {
                record: TrackMetadata::default(),
            },
        ));

        let err = run_batch(context, &["https://soundcloud.com/a/b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Filesystem(_)));
    }
}
