use super::{PageExtractor, TrackMetadata};
use regex::Regex;
use serde_json::Value;

/// Extracts title, artist and genre from a SoundCloud track page.
///
/// The page embeds a `window.__sc_hydration` JSON array carrying the full
/// track object; that is tried first. When it is missing or incomplete the
/// extractor falls back to meta-tag heuristics, and whatever cannot be
/// recovered is simply left unset.
#[derive(Debug, Default)]
pub struct SoundCloudExtractor;

impl SoundCloudExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_from_hydration(&self, body: &str) -> TrackMetadata {
        let mut metadata = TrackMetadata::default();

        let Some(sound) = find_hydrated_sound(body) else {
            return metadata;
        };

        metadata.title = sound
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|s| !s.is_empty());
        metadata.genre = sound
            .get("genre")
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|s| !s.is_empty());
        metadata.artist = sound
            .get("user")
            .and_then(|user| user.get("username"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|s| !s.is_empty());

        metadata
    }

    fn extract_from_markup(&self, body: &str) -> TrackMetadata {
        let mut metadata = TrackMetadata::default();

        // og:title is the most reliable markup source for the title.
        if let Some(title) = meta_content(body, "og:title") {
            metadata.title = Some(title);
        }

        // The soundcloud:user meta tag carries the uploader's profile URL;
        // the page links that profile with the display name as anchor text.
        if metadata.artist.is_none() {
            metadata.artist = uploader_from_profile_link(body);
        }

        // schema.org markup carries the uploader name on some page variants.
        if metadata.artist.is_none() {
            if let Ok(re) =
                Regex::new(r#"itemprop="byArtist"[^>]*>\s*<meta[^>]*content="([^"]+)""#)
            {
                if let Some(caps) = re.captures(body) {
                    metadata.artist = caps.get(1).map(|m| decode_entities(m.as_str()));
                }
            }
        }

        // The <title> tag follows the pattern
        // "Track Name by Artist Name | Listen online for free on SoundCloud".
        if metadata.title.is_none() || metadata.artist.is_none() {
            if let Ok(re) = Regex::new(r"<title>\s*(.+?) by (.+?) \| Listen") {
                if let Some(caps) = re.captures(body) {
                    if metadata.title.is_none() {
                        metadata.title =
                            caps.get(1).map(|m| decode_entities(m.as_str().trim()));
                    }
                    if metadata.artist.is_none() {
                        metadata.artist =
                            caps.get(2).map(|m| decode_entities(m.as_str().trim()));
                    }
                }
            }
        }

        metadata
    }
}

/// Resolves the uploader name via the `soundcloud:user` meta tag: take the
/// permalink from the profile URL, then read the display name from the
/// anchor linking to `/<permalink>`.
fn uploader_from_profile_link(body: &str) -> Option<String> {
    let profile_url = meta_content(body, "soundcloud:user")?;
    let permalink = Regex::new(r"soundcloud\.com/([^/?#\s]+)")
        .ok()?
        .captures(&profile_url)?
        .get(1)?
        .as_str()
        .to_string();

    let anchor = Regex::new(&format!(
        r#"<a[^>]*href="/{}"[^>]*>([^<]+)</a>"#,
        regex::escape(&permalink)
    ))
    .ok()?;
    anchor
        .captures(body)?
        .get(1)
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|s| !s.is_empty())
}

impl PageExtractor for SoundCloudExtractor {
    fn extract(&self, body: &str) -> TrackMetadata {
        let mut metadata = self.extract_from_hydration(body);

        if metadata.title.is_none() || metadata.artist.is_none() {
            let fallback = self.extract_from_markup(body);
            metadata.title = metadata.title.or(fallback.title);
            metadata.artist = metadata.artist.or(fallback.artist);
            metadata.genre = metadata.genre.or(fallback.genre);
        }

        // Uploaders commonly put "ARTIST - TITLE" in the title field; when
        // both halves are non-empty they win over the uploader name.
        if let Some(title) = metadata.title.take() {
            let (artist, title) = split_artist_title(&title);
            if let Some(artist) = artist {
                metadata.artist = Some(artist);
            }
            metadata.title = Some(format_title(&title));
        }

        metadata
    }
}

/// Locates the `window.__sc_hydration` payload and returns the `data` object
/// of the entry hydrating the sound, if any.
fn find_hydrated_sound(body: &str) -> Option<Value> {
    let start = body.find("window.__sc_hydration")?;
    let json_start = start + body[start..].find('[')?;

    // serde_json stops at the end of the first complete value, so the
    // trailing ";</script>..." after the array is ignored.
    let mut stream = serde_json::Deserializer::from_str(&body[json_start..]).into_iter::<Value>();
    let hydration = stream.next()?.ok()?;

    hydration
        .as_array()?
        .iter()
        .find(|entry| entry.get("hydratable").and_then(Value::as_str) == Some("sound"))
        .and_then(|entry| entry.get("data"))
        .cloned()
}

fn meta_content(body: &str, property: &str) -> Option<String> {
    let patterns = [
        format!(r#"<meta\s+property="{}"\s+content="([^"]+)""#, property),
        format!(r#"<meta\s+content="([^"]+)"\s+property="{}""#, property),
    ];
    for pattern in &patterns {
        if let Ok(re) = Regex::new(pattern) {
            if let Some(caps) = re.captures(body) {
                return caps.get(1).map(|m| decode_entities(m.as_str()));
            }
        }
    }
    None
}

/// Splits an "ARTIST - TITLE" title (space-hyphen-space) into its halves.
/// Returns `(None, original)` when the pattern does not apply.
fn split_artist_title(title: &str) -> (Option<String>, String) {
    if let Some((artist, rest)) = title.split_once(" - ") {
        let artist = artist.trim();
        let rest = rest.trim();
        if !artist.is_empty() && !rest.is_empty() {
            return (Some(artist.to_string()), rest.to_string());
        }
    }
    (None, title.to_string())
}

/// Applies the house style to a title: "with" becomes "w/" and any form of
/// "feat"/"featuring" becomes "ft".
fn format_title(title: &str) -> String {
    let mut formatted = title.to_string();
    for (pattern, replacement) in [
        (r"(?i)\bwith\b", "w/"),
        (r"(?i)\bfeaturing\b", "ft"),
        (r"(?i)\bfeat\b\.?", "ft"),
    ] {
        if let Ok(re) = Regex::new(pattern) {
            formatted = re.replace_all(&formatted, replacement).to_string();
        }
    }
    formatted
}

// &amp; must decode last, otherwise "&amp;lt;" would collapse to "<".
fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
