use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static TRACK_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:https?://open\.spotify\.com/)?(?:track/|track:)([A-Za-z0-9]+)")
        .expect("valid track id regex")
});

/// Whether `input` should be parsed as a URL/URI rather than used as a bare ID.
pub fn looks_like_reference(input: &str) -> bool {
    let s = input.trim();
    s.starts_with("http://") || s.starts_with("https://") || s.contains("spotify:")
}

/// Extract a track ID from an `open.spotify.com/track/...` URL or a
/// `spotify:track:...` URI.
pub fn track_id_from_reference(input: &str) -> Result<String> {
    let s = input.trim();
    if s.is_empty() {
        return Err(Error::InvalidTrackReference("empty reference".into()));
    }

    if (s.starts_with("http://") || s.starts_with("https://"))
        && let Ok(url) = reqwest::Url::parse(s)
    {
        let mut segments = url.path().trim_matches('/').split('/');
        if let (Some(kind), Some(id)) = (segments.next(), segments.next())
            && kind.eq_ignore_ascii_case("track")
            && !id.is_empty()
        {
            return Ok(id.to_string());
        }
    }

    TRACK_ID_RE
        .captures(s)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::InvalidTrackReference(format!("could not extract track id from {s}")))
}

/// Resolve either a bare ID or a URL/URI to a track ID.
pub fn resolve(input: &str) -> Result<String> {
    if looks_like_reference(input) {
        return track_id_from_reference(input);
    }
    let id = input.trim();
    if id.is_empty() {
        return Err(Error::InvalidTrackReference("track id is required".into()));
    }
    Ok(id.to_string())
}
