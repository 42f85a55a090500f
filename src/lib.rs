//! Client for Spotify's web-player lyrics endpoint.
//!
//! Access tokens are minted from an `sp_dc` cookie and a TOTP derived from a
//! remotely published secret. Tokens, the secret document and lyrics are all
//! cached as single files so repeated calls are cheap.

pub mod config;
pub mod error;
pub mod lyrics;
pub mod payload;
pub mod spotify;
pub mod storage;

pub use config::{ClientOptions, Config};
pub use error::{Error, Result};
pub use lyrics::{Line, Lyrics, LyricsClient};
pub use payload::{Payload, get_lyrics_payload};

pub(crate) fn unix_now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

pub(crate) fn unix_now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
