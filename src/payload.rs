//! JSON payload for thin host bindings (CLI, scripts, UI bridges).

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::time::Duration;

use crate::config::ClientOptions;
use crate::lyrics::{Line, LyricsClient};

const PAYLOAD_DEADLINE: Duration = Duration::from_secs(30);

/// `{"error":false,"syncType":...,"lines":[...]}` or `{"error":true,"message":...}`.
///
/// The `error` flag is derived from the variant when serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Ok { sync_type: String, lines: Vec<Line> },
    Err { message: String },
}

impl Serialize for Payload {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Payload::Ok { sync_type, lines } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("error", &false)?;
                map.serialize_entry("syncType", sync_type)?;
                map.serialize_entry("lines", lines)?;
                map.end()
            }
            Payload::Err { message } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("error", &true)?;
                map.serialize_entry("message", message)?;
                map.end()
            }
        }
    }
}

impl Payload {
    pub fn failure(message: impl Into<String>) -> Self {
        Payload::Err {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Payload::Err { .. })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"error":true,"message":{}}}"#,
                serde_json::Value::String(e.to_string())
            )
        })
    }
}

/// Fetch lyrics with default options for the given `sp_dc` cookie.
pub async fn get_lyrics_payload(sp_dc: &str, reference: &str) -> Payload {
    match ClientOptions::new(sp_dc) {
        Ok(opts) => get_lyrics_payload_with_options(opts, reference).await,
        Err(e) => Payload::failure(e.to_string()),
    }
}

pub async fn get_lyrics_payload_with_options(options: ClientOptions, reference: &str) -> Payload {
    let client = match LyricsClient::new(options) {
        Ok(c) => c,
        Err(e) => return Payload::failure(e.to_string()),
    };
    match client.get_lyrics_within(reference, PAYLOAD_DEADLINE).await {
        Ok(lyrics) => Payload::Ok {
            sync_type: lyrics.sync_type,
            lines: lyrics.lines,
        },
        Err(e) => Payload::failure(e.to_string()),
    }
}
