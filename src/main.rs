mod batch;
mod cli;
mod config;
mod downloader;
mod errors;
mod scrape;
mod tags;
mod utils;

use batch::{BatchContext, BatchStatus};
use clap::Parser;
use config::DownloadConfig;
use downloader::YtDlpDownloader;
use log::info;
use scrape::{HttpMetadataSource, SoundCloudExtractor};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = cli::Cli::parse();
    let config = DownloadConfig::from_cli(&cli);

    if config.with_metadata {
        info!("Metadata extraction and tagging is enabled");
    }

    let metadata_source =
        HttpMetadataSource::new(scrape::build_http_client(), SoundCloudExtractor::new());
    let context = Arc::new(BatchContext::new(
        config,
        YtDlpDownloader::new(),
        metadata_source,
    ));

    // Ctrl-C stops launching new tracks; in-flight yt-dlp children die with
    // their handles.
    let signal_context = Arc::clone(&context);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, finishing in-flight tracks");
            signal_context.cancel();
        }
    });

    let outcomes = match batch::run_batch(Arc::clone(&context), &cli.urls).await {
        Ok(outcomes) => outcomes,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(2);
        }
    };

    batch::report_summary(&outcomes);
    std::process::exit(BatchStatus::of(&outcomes).exit_code());
}
