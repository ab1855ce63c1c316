use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Sanitizes a filename by replacing characters that are invalid on common
/// filesystems.
pub fn sanitize_filename(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    sanitized
        .trim_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string()
}

/// Tracks filenames already claimed within the current batch so that two
/// tracks resolving to the same sanitized title cannot overwrite each other.
#[derive(Debug, Default)]
pub struct NameRegistry {
    claimed: Mutex<HashSet<PathBuf>>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `dir/stem.ext`, or `dir/stem (n).ext` when that name is
    /// already on disk or claimed by a concurrent track.
    pub fn claim(&self, dir: &Path, stem: &str, ext: &str) -> PathBuf {
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());

        let mut candidate = dir.join(format!("{}.{}", stem, ext));
        let mut suffix = 1u32;
        while candidate.exists() || claimed.contains(&candidate) {
            candidate = dir.join(format!("{} ({}).{}", stem, suffix, ext));
            suffix += 1;
        }

        claimed.insert(candidate.clone());
        candidate
    }
}
