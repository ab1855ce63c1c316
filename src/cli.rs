use clap::Parser;
use std::path::PathBuf;

/// Download audio tracks from SoundCloud URLs and tag them with scraped metadata.
#[derive(Debug, Parser)]
#[command(name = "scdl", version, about)]
pub struct Cli {
    /// SoundCloud track URLs to download
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Output directory for downloaded files
    #[arg(short, long, default_value = ".", value_name = "PATH")]
    pub output_dir: PathBuf,

    /// Target audio format
    #[arg(short, long, default_value = "mp3", value_name = "EXT")]
    pub format: String,

    /// Target audio quality / bitrate
    #[arg(short, long, default_value = "320k", value_name = "BITRATE")]
    pub quality: String,

    /// Disable metadata scraping and tagging
    #[arg(long)]
    pub no_metadata: bool,

    /// Maximum number of tracks downloaded concurrently
    #[arg(short = 'j', long, default_value_t = 3, value_name = "N")]
    pub concurrency: usize,
}
