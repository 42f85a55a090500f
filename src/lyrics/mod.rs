//! Lyrics retrieval, caching and reformatting.
//!
//! This module provides:
//! - Response types for the color-lyrics endpoint
//! - A TTL-bound on-disk cache of raw responses
//! - The client that ties token handling and caching together
//! - LRC / SRT / plain-text converters

pub mod cache;
pub mod client;
pub mod format;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

pub use cache::LyricsCache;
pub use client::LyricsClient;

/// A single line of lyrics as returned by Spotify.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Line {
    /// Milliseconds from start, as a decimal string.
    pub start_time_ms: String,
    pub words: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub syllables: Vec<String>,
    pub end_time_ms: String,
}

/// Lyrics for one track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lyrics {
    pub sync_type: String,
    pub lines: Vec<Line>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawLyrics {
    sync_type: String,
    lines: Option<Vec<Line>>,
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    lyrics: RawLyrics,
}

/// Decode a `{ "lyrics": { "syncType", "lines" } }` body.
///
/// `lines` may be empty but must be present.
pub fn parse_response(body: &[u8]) -> Result<Lyrics> {
    let raw: RawResponse = serde_json::from_slice(body)
        .map_err(|e| Error::MalformedLyricsResponse(e.to_string()))?;
    let lines = raw
        .lyrics
        .lines
        .ok_or_else(|| Error::MalformedLyricsResponse("missing lines".into()))?;
    Ok(Lyrics {
        sync_type: raw.lyrics.sync_type,
        lines,
    })
}

fn null_as_empty<'de, D>(d: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(d)?.unwrap_or_default())
}
