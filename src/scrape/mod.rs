pub mod soundcloud;

use crate::errors::{AppError, Result};
use reqwest::Client;
use std::time::Duration;

pub use soundcloud::SoundCloudExtractor;

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36";

/// Best-effort descriptive metadata recovered from a track's web page.
/// Any field may be absent; absence never fails the enclosing track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
}

impl TrackMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.artist.is_none() && self.genre.is_none()
    }
}

/// Field extraction strategy over a fetched page body. Kept behind a trait
/// so page-format drift is isolated to one implementation.
pub trait PageExtractor {
    fn extract(&self, body: &str) -> TrackMetadata;
}

/// Source of best-effort metadata for a track URL. The batch runner only
/// sees this trait, which keeps the per-track pipeline testable without a
/// network.
#[async_trait::async_trait]
pub trait MetadataSource {
    async fn fetch(&self, url: &str) -> TrackMetadata;
}

/// Fetches the track's public page over HTTP and runs an extractor over the
/// body.
pub struct HttpMetadataSource<E: PageExtractor> {
    client: Client,
    extractor: E,
}

impl<E: PageExtractor + Send + Sync> HttpMetadataSource<E> {
    pub fn new(client: Client, extractor: E) -> Self {
        Self { client, extractor }
    }
}

#[async_trait::async_trait]
impl<E: PageExtractor + Send + Sync> MetadataSource for HttpMetadataSource<E> {
    async fn fetch(&self, url: &str) -> TrackMetadata {
        fetch_metadata(&self.client, &self.extractor, url).await
    }
}

/// Builds the shared HTTP client used for page fetches. A realistic browser
/// user-agent is required, the platform serves a stub page to unknown agents.
pub fn build_http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(10))
        .user_agent(BROWSER_USER_AGENT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Fetches a track page and extracts metadata from it. Network failures,
/// non-2xx responses and unparseable pages all degrade to an empty record:
/// downloading succeeds even when scraping fails.
pub async fn fetch_metadata<E: PageExtractor>(
    client: &Client,
    extractor: &E,
    url: &str,
) -> TrackMetadata {
    match fetch_page(client, url).await {
        Ok(body) => {
            let metadata = extractor.extract(&body);
            if metadata.is_empty() {
                log::warn!("No metadata recovered from page: {}", url);
            } else {
                log::debug!("Scraped metadata for {}: {:?}", url, metadata);
            }
            metadata
        }
        Err(e) => {
            log::warn!("Metadata fetch failed for {}: {}", url, e);
            TrackMetadata::default()
        }
    }
}

async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(AppError::Scrape(format!(
            "HTTP {} from {}",
            response.status(),
            url
        )));
    }
    Ok(response.text().await?)
}
