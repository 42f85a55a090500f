//! Versioned TOTP secret, fetched from a public document and cached on disk.
//!
//! The document is a JSON object `{ "<version>": [int, ...], ... }`. The
//! entry that appears *last* in the document is the current one, so the
//! object is decoded in source order rather than into a map.

use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::StatusCode;
use reqwest::header::{ETAG, IF_NONE_MATCH, USER_AGENT};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage;

/// Decoded secret, ready to key the TOTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secret {
    pub version: String,
    pub value: String,
}

/// One `version -> encoded digits` pair, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretEntry {
    pub version: String,
    pub encoded: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SecretCache {
    /// Entity tag of `body`, sent back as `If-None-Match`.
    etag: String,
    body: String,
    #[serde(rename = "savedAt")]
    saved_at: i64,
}

/// Fetches the secret document with conditional requests.
#[derive(Debug, Clone)]
pub struct SecretStore {
    http: reqwest::Client,
    url: String,
    cache_path: PathBuf,
    user_agent: String,
}

impl SecretStore {
    pub fn new(http: reqwest::Client, url: &str, cache_path: &Path, user_agent: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
            cache_path: cache_path.to_path_buf(),
            user_agent: user_agent.to_string(),
        }
    }

    /// Fetch (or revalidate) the document and decode its latest secret.
    pub async fn fetch_latest(&self) -> Result<Secret> {
        let cached = read_cache(&self.cache_path);

        let mut req = self
            .http
            .get(&self.url)
            .header(USER_AGENT, self.user_agent.as_str());
        if let Some(c) = cached.as_ref().filter(|c| !c.etag.is_empty()) {
            req = req.header(IF_NONE_MATCH, c.etag.as_str());
        }
        let resp = req.send().await?;

        let status = resp.status();
        let body = if status == StatusCode::NOT_MODIFIED {
            let cached = cached.ok_or(Error::CacheInconsistency)?;
            tracing::debug!("secret document not modified; using cached copy");
            cached.body
        } else if status.is_client_error() || status.is_server_error() {
            return Err(Error::RemoteFetch {
                status: status.as_u16(),
            });
        } else {
            let etag = resp
                .headers()
                .get(ETAG)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let bytes = resp.bytes().await?;
            let body = String::from_utf8(bytes.to_vec())
                .map_err(|e| Error::MalformedSecretDocument(e.to_string()))?;
            if let Err(e) = write_cache(&self.cache_path, &etag, &body) {
                tracing::warn!("secret cache write failed: {e}");
            }
            body
        };

        latest_secret(&body)
    }
}

/// Decode the document and pick the last entry.
pub fn latest_secret(body: &str) -> Result<Secret> {
    let entries = decode_ordered(body)?;
    let latest = entries.last().ok_or(Error::EmptySecretDocument)?;
    if latest.version.is_empty() {
        return Err(Error::EmptyVersionLabel);
    }
    if latest.encoded.is_empty() {
        return Err(Error::EmptySecretVersion(latest.version.clone()));
    }
    Ok(Secret {
        version: latest.version.clone(),
        value: decode_digits(&latest.encoded),
    })
}

/// `v ^ ((i % 33) + 9)` for every element, printed in base 10 and joined.
pub fn decode_digits(encoded: &[i64]) -> String {
    encoded
        .iter()
        .enumerate()
        .map(|(i, v)| (v ^ ((i as i64 % 33) + 9)).to_string())
        .collect()
}

/// Parse the document into entries, preserving the order keys appear in.
pub fn decode_ordered(body: &str) -> Result<Vec<SecretEntry>> {
    let doc: OrderedDocument = serde_json::from_str(body)
        .map_err(|e| Error::MalformedSecretDocument(e.to_string()))?;
    Ok(doc.0)
}

struct OrderedDocument(Vec<SecretEntry>);

impl<'de> Deserialize<'de> for OrderedDocument {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DocVisitor;

        impl<'de> Visitor<'de> for DocVisitor {
            type Value = OrderedDocument;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of version -> integer array")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut out = Vec::new();
                while let Some(version) = map.next_key::<String>()? {
                    let encoded = map.next_value::<Vec<i64>>()?;
                    out.push(SecretEntry { version, encoded });
                }
                Ok(OrderedDocument(out))
            }
        }

        deserializer.deserialize_map(DocVisitor)
    }
}

fn read_cache(path: &Path) -> Option<SecretCache> {
    let raw = storage::read_optional(path)?;
    match serde_json::from_slice::<SecretCache>(&raw) {
        Ok(c) if !c.body.is_empty() => Some(c),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("ignoring unreadable secret cache: {e}");
            None
        }
    }
}

fn write_cache(path: &Path, etag: &str, body: &str) -> std::io::Result<()> {
    let entry = SecretCache {
        etag: etag.to_string(),
        body: body.to_string(),
        saved_at: crate::unix_now_secs(),
    };
    let raw = serde_json::to_vec(&entry)?;
    storage::write_atomic(path, &raw)
}
