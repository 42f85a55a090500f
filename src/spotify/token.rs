//! Bearer-token acquisition.
//!
//! A token is minted by proving possession of the `sp_dc` cookie plus a TOTP
//! computed from the server's clock and the current secret. The raw JSON
//! response is kept on disk and reused until it expires.

use std::path::{Path, PathBuf};

use reqwest::header::{COOKIE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Error, Result};
use crate::spotify::secret::SecretStore;
use crate::spotify::totp;
use crate::storage;

const MAX_ERROR_BODY_CHARS: usize = 600;

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub access_token_expiration_timestamp_ms: i64,
    #[serde(default)]
    pub is_anonymous: bool,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field(
                "access_token_expiration_timestamp_ms",
                &self.access_token_expiration_timestamp_ms,
            )
            .field("is_anonymous", &self.is_anonymous)
            .finish()
    }
}

impl Credential {
    /// Structurally usable: non-empty, tied to a user, with an expiry.
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty()
            && !self.is_anonymous
            && self.access_token_expiration_timestamp_ms != 0
    }

    pub fn is_fresh(&self, now_ms: i64) -> bool {
        self.is_valid() && self.access_token_expiration_timestamp_ms > now_ms
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerTime {
    server_time: i64,
}

#[derive(Debug, Clone)]
pub struct TokenBroker {
    http: reqwest::Client,
    secrets: SecretStore,
    sp_dc: String,
    server_time_url: String,
    token_url: String,
    user_agent: String,
    cache_path: PathBuf,
    diagnostics_path: PathBuf,
}

impl TokenBroker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        http: reqwest::Client,
        secrets: SecretStore,
        sp_dc: &str,
        server_time_url: &str,
        token_url: &str,
        user_agent: &str,
        cache_path: &Path,
        diagnostics_path: &Path,
    ) -> Self {
        Self {
            http,
            secrets,
            sp_dc: sp_dc.to_string(),
            server_time_url: server_time_url.to_string(),
            token_url: token_url.to_string(),
            user_agent: user_agent.to_string(),
            cache_path: cache_path.to_path_buf(),
            diagnostics_path: diagnostics_path.to_path_buf(),
        }
    }

    /// Return a fresh credential, from disk if possible, otherwise by
    /// running the full exchange.
    pub async fn ensure_token(&self) -> Result<Credential> {
        if let Some(cred) = self.read_cached() {
            if cred.is_fresh(crate::unix_now_millis()) {
                tracing::debug!("using cached token");
                return Ok(cred);
            }
            tracing::debug!("cached token expired");
        }
        self.exchange().await.inspect_err(|e| {
            tracing::warn!("token exchange failed: {e}");
        })
    }

    /// Delete the cached credential. Never fails.
    pub fn invalidate(&self) {
        tracing::debug!("invalidating cached token");
        storage::remove_quietly(&self.cache_path);
    }

    fn read_cached(&self) -> Option<Credential> {
        let raw = storage::read_optional(&self.cache_path)?;
        serde_json::from_slice::<Credential>(&raw)
            .ok()
            .filter(Credential::is_valid)
    }

    async fn server_time(&self) -> Result<i64> {
        let resp = self
            .http
            .get(&self.server_time_url)
            .header(USER_AGENT, self.user_agent.as_str())
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::TimeSource {
                status: Some(status.as_u16()),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }
        let st: ServerTime = resp.json().await.map_err(|e| Error::TimeSource {
            status: None,
            reason: format!("invalid server time response: {e}"),
        })?;
        if st.server_time <= 0 {
            return Err(Error::TimeSource {
                status: None,
                reason: format!("invalid server time value {}", st.server_time),
            });
        }
        Ok(st.server_time)
    }

    async fn exchange(&self) -> Result<Credential> {
        let server_time = self.server_time().await?;
        let secret = self.secrets.fetch_latest().await?;
        let code = totp::generate(server_time, &secret.value)?;

        let url = format!(
            "{}?reason=transport&productType=web-player&totp={}&totpVer={}&ts={}",
            self.token_url,
            urlencoding::encode(&code),
            urlencoding::encode(&secret.version),
            crate::unix_now_secs()
        );
        let resp = self
            .http
            .get(&url)
            .header(USER_AGENT, self.user_agent.as_str())
            .header(COOKIE, format!("sp_dc={}", self.sp_dc))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        if !status.is_success() {
            self.write_failure_snapshot(status.as_u16(), &body);
            return Err(Error::CredentialExchange {
                status: status.as_u16(),
                body: truncate_body(&String::from_utf8_lossy(&body)),
            });
        }

        let cred: Credential = serde_json::from_slice(&body)
            .map_err(|e| Error::InvalidCredential(format!("invalid token response: {e}")))?;
        if cred.access_token.is_empty() || cred.is_anonymous {
            return Err(Error::InvalidCredential("SP_DC appears to be invalid".into()));
        }
        if cred.access_token_expiration_timestamp_ms == 0 {
            return Err(Error::InvalidCredential(
                "token response missing expiration timestamp".into(),
            ));
        }

        // Keep the raw body so fields we don't model survive.
        storage::write_atomic(&self.cache_path, &body).map_err(Error::CachePersist)?;
        Ok(cred)
    }

    fn write_failure_snapshot(&self, status: u16, body: &[u8]) {
        let timestamp = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        let snapshot = json!({
            "timestamp": timestamp,
            "status": status,
            "body": String::from_utf8_lossy(body),
        });
        let Ok(raw) = serde_json::to_vec_pretty(&snapshot) else {
            return;
        };
        if let Err(e) = storage::write_atomic(&self.diagnostics_path, &raw) {
            tracing::debug!("token failure snapshot not written: {e}");
        }
    }
}

fn truncate_body(body: &str) -> String {
    let msg = body.trim();
    if msg.is_empty() {
        return "empty response body".to_string();
    }
    if msg.chars().count() > MAX_ERROR_BODY_CHARS {
        let mut out: String = msg.chars().take(MAX_ERROR_BODY_CHARS).collect();
        out.push_str("...");
        out
    } else {
        msg.to_string()
    }
}
