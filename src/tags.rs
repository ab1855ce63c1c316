use crate::errors::{AppError, Result};
use crate::scrape::TrackMetadata;
use crate::utils::{sanitize_filename, NameRegistry};
use lofty::config::WriteOptions;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::Tag;
use std::path::{Path, PathBuf};

/// Writes the scraped metadata into the file's primary tag. Only fields
/// present in the record are touched; absent fields are left as-is rather
/// than overwritten with empty strings.
pub fn write_tags(path: &Path, metadata: &TrackMetadata) -> Result<()> {
    if metadata.is_empty() {
        return Ok(());
    }

    let tagged_file = Probe::open(path)
        .map_err(|e| AppError::TagWrite(format!("cannot probe {:?}: {}", path, e)))?
        .read()
        .map_err(|e| AppError::TagWrite(format!("cannot read {:?}: {}", path, e)))?;

    let mut tag = match tagged_file.primary_tag() {
        Some(existing) => existing.clone(),
        None => Tag::new(tagged_file.primary_tag_type()),
    };

    apply_metadata(&mut tag, metadata);

    tag.save_to_path(path, WriteOptions::default())
        .map_err(|e| AppError::TagWrite(format!("cannot save tags to {:?}: {}", path, e)))?;

    log::info!("Updated metadata for: {:?}", path.file_name().unwrap_or_default());
    Ok(())
}

fn apply_metadata(tag: &mut Tag, metadata: &TrackMetadata) {
    if let Some(title) = &metadata.title {
        tag.set_title(title.clone());
    }
    if let Some(artist) = &metadata.artist {
        tag.set_artist(artist.clone());
    }
    if let Some(genre) = &metadata.genre {
        tag.set_genre(genre.clone());
    }
}

/// Renames the downloaded file to the sanitized scraped title, keeping the
/// extension. Collisions within the batch or with files already on disk get
/// a ` (n)` suffix through the shared registry. Without a title the
/// yt-dlp-assigned name is kept.
pub fn rename_to_title(
    path: &Path,
    metadata: &TrackMetadata,
    registry: &NameRegistry,
) -> Result<PathBuf> {
    let Some(title) = metadata.title.as_deref() else {
        return Ok(path.to_path_buf());
    };

    let stem = sanitize_filename(title);
    if stem.is_empty() {
        return Ok(path.to_path_buf());
    }

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp3");

    // yt-dlp already names files after the platform title; when that matches
    // the sanitized scraped title there is nothing to do, and claiming would
    // collide with our own file.
    if path == dir.join(format!("{}.{}", stem, ext)) {
        return Ok(path.to_path_buf());
    }

    let target = registry.claim(dir, &stem, ext);
    std::fs::rename(path, &target)?;
    log::debug!("Renamed {:?} -> {:?}", path, target);
    Ok(target)
}
