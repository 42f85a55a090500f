//! Spotify web-player plumbing: track references, the TOTP secret and the
//! bearer-token exchange.

pub mod secret;
pub mod token;
pub mod totp;
pub mod track;

use anyhow::Context;
use std::time::Duration;

pub use secret::{Secret, SecretStore};
pub use token::{Credential, TokenBroker};

/// HTTP clients used by one [`crate::LyricsClient`].
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    /// Secret document host; always verifies TLS.
    pub secret: reqwest::Client,
    /// Lyrics endpoint.
    pub spotify: reqwest::Client,
    /// Server time and token exchange, with the longer token timeout.
    pub token: reqwest::Client,
}

impl Transport {
    pub fn new(
        request_timeout: Duration,
        token_timeout: Duration,
        insecure_tls: bool,
    ) -> anyhow::Result<Self> {
        let secret = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("build secret http client")?;
        let spotify = reqwest::Client::builder()
            .timeout(request_timeout)
            .danger_accept_invalid_certs(insecure_tls)
            .build()
            .context("build spotify http client")?;
        let token = reqwest::Client::builder()
            .timeout(token_timeout)
            .danger_accept_invalid_certs(insecure_tls)
            .build()
            .context("build token http client")?;
        Ok(Self {
            secret,
            spotify,
            token,
        })
    }
}
