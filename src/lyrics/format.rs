//! Conversions from Spotify lyric lines to LRC, SRT and plain text.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use super::Line;
use crate::error::{Error, Result};

/// A single LRC entry: `[mm:ss.hh]words`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LrcLine {
    pub time_tag: String,
    pub words: String,
}

/// A single SRT cue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SrtLine {
    pub index: usize,
    pub start_time: String,
    pub end_time: String,
    pub words: String,
}

/// `mm:ss.hh` (hundredths).
pub fn format_lrc_timestamp(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!(
        "{:02}:{:02}.{:02}",
        total_secs / 60,
        total_secs % 60,
        (ms % 1000) / 10
    )
}

/// `hh:mm:ss,mmm`.
pub fn format_srt_timestamp(ms: u64) -> String {
    format!(
        "{:02}:{:02}:{:02},{:03}",
        ms / 3_600_000,
        (ms % 3_600_000) / 60_000,
        (ms % 60_000) / 1000,
        ms % 1000
    )
}

fn parse_ms(raw: &str) -> Result<u64> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(Error::MalformedLyricsResponse(
            "empty milliseconds value".into(),
        ));
    }
    // Parse signed first so "-5" is reported as negative rather than garbage.
    let v: i64 = s
        .parse()
        .map_err(|e| Error::MalformedLyricsResponse(format!("invalid milliseconds {s:?}: {e}")))?;
    u64::try_from(v)
        .map_err(|_| Error::MalformedLyricsResponse(format!("negative milliseconds {s:?}")))
}

pub fn to_lrc(lines: &[Line]) -> Result<Vec<LrcLine>> {
    lines
        .iter()
        .map(|ln| {
            Ok(LrcLine {
                time_tag: format_lrc_timestamp(parse_ms(&ln.start_time_ms)?),
                words: ln.words.clone(),
            })
        })
        .collect()
}

/// Each line ends where the next begins; the final line has no end and is
/// dropped, so fewer than two lines produce nothing.
pub fn to_srt(lines: &[Line]) -> Result<Vec<SrtLine>> {
    lines
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            Ok(SrtLine {
                index: i + 1,
                start_time: format_srt_timestamp(parse_ms(&pair[0].start_time_ms)?),
                end_time: format_srt_timestamp(parse_ms(&pair[1].start_time_ms)?),
                words: pair[0].words.clone(),
            })
        })
        .collect()
}

pub fn to_plain_text(lines: &[Line]) -> String {
    lines.iter().fold(String::new(), |mut out, ln| {
        out.push_str(&ln.words);
        out.push('\n');
        out
    })
}

/// Render an `.lrc` document.
pub fn render_lrc(lines: &[LrcLine]) -> String {
    let mut out = String::new();
    for ln in lines {
        let _ = writeln!(out, "[{}]{}", ln.time_tag, ln.words);
    }
    out
}

/// Render an `.srt` document.
pub fn render_srt(lines: &[SrtLine]) -> String {
    let mut out = String::new();
    for ln in lines {
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            ln.index, ln.start_time, ln.end_time, ln.words
        );
    }
    out
}
