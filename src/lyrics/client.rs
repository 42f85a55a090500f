use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use std::sync::Arc;
use std::time::Duration;

use super::{Lyrics, LyricsCache, parse_response};
use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::spotify::{Credential, SecretStore, TokenBroker, Transport, track};

#[derive(Debug)]
struct Inner {
    options: ClientOptions,
    http: reqwest::Client,
    broker: TokenBroker,
    cache: LyricsCache,
}

/// Spotify lyrics client.
///
/// Holds configuration and HTTP clients only; every call re-reads the token,
/// secret and lyrics caches from disk.
#[derive(Debug, Clone)]
pub struct LyricsClient {
    inner: Arc<Inner>,
}

impl LyricsClient {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let transport = Transport::new(
            options.request_timeout,
            options.token_timeout,
            options.insecure_tls,
        )
        .map_err(|e| Error::Configuration(format!("{e:#}")))?;

        let secrets = SecretStore::new(
            transport.secret,
            &options.endpoints.secret_dict_url,
            &options.secret_cache_path,
            &options.token_user_agent,
        );
        let broker = TokenBroker::new(
            transport.token,
            secrets,
            &options.sp_dc,
            &options.endpoints.server_time_url,
            &options.endpoints.token_url,
            &options.token_user_agent,
            &options.token_cache_path,
            &options.diagnostics_path,
        );
        let cache = LyricsCache::new(&options.lyrics_cache_dir);

        Ok(Self {
            inner: Arc::new(Inner {
                options,
                http: transport.spotify,
                broker,
                cache,
            }),
        })
    }

    /// Make sure a non-expired token exists, fetching one if needed.
    pub async fn check_token(&self) -> Result<Credential> {
        self.inner.broker.ensure_token().await
    }

    pub fn invalidate_token(&self) {
        self.inner.broker.invalidate();
    }

    /// Lyrics for a bare track ID, a track URL or a `spotify:track:` URI.
    pub async fn get_lyrics(&self, reference: &str) -> Result<Lyrics> {
        let track_id = track::resolve(reference)?;
        self.get_lyrics_by_id(&track_id).await
    }

    /// Like [`Self::get_lyrics`], failing with [`Error::Timeout`] once
    /// `deadline` elapses. Caches are never left half-written.
    pub async fn get_lyrics_within(&self, reference: &str, deadline: Duration) -> Result<Lyrics> {
        tokio::time::timeout(deadline, self.get_lyrics(reference))
            .await
            .map_err(|_| Error::Timeout)?
    }

    pub async fn get_lyrics_by_id(&self, track_id: &str) -> Result<Lyrics> {
        let track_id = track_id.trim();
        if track_id.is_empty() {
            return Err(Error::InvalidTrackReference("track id is required".into()));
        }
        let opts = &self.inner.options;

        if opts.lyrics_cache_enabled
            && let Some(lyrics) = self.inner.cache.read(track_id, opts.lyrics_cache_ttl)
        {
            tracing::debug!("lyrics cache hit for {track_id}");
            return Ok(lyrics);
        }

        let token = self.inner.broker.ensure_token().await?;
        let body = self.fetch_lyrics(track_id, &token).await?;

        let lyrics = match parse_response(&body) {
            Ok(l) => l,
            Err(e) => {
                self.inner.broker.invalidate();
                return Err(e);
            }
        };

        if opts.lyrics_cache_enabled
            && let Err(e) = self.inner.cache.write(track_id, &body)
        {
            tracing::warn!("lyrics cache write failed for {track_id}: {e:#}");
        }
        Ok(lyrics)
    }

    /// GET the raw lyrics body. Any failure drops the cached token so the
    /// next call starts from a fresh exchange.
    async fn fetch_lyrics(&self, track_id: &str, token: &Credential) -> Result<Vec<u8>> {
        let opts = &self.inner.options;
        let url = format!(
            "{}{}?format=json&market=from_token",
            opts.endpoints.lyrics_base_url,
            urlencoding::encode(track_id)
        );

        let result = async {
            let resp = self
                .inner
                .http
                .get(&url)
                .header(USER_AGENT, opts.lyrics_user_agent.as_str())
                .header("App-platform", "WebPlayer")
                .header(AUTHORIZATION, format!("Bearer {}", token.access_token))
                .send()
                .await?;
            let status = resp.status();
            let body = resp.bytes().await?;
            Ok::<_, Error>((status, body))
        }
        .await;

        let (status, body) = match result {
            Ok(r) => r,
            Err(e) => {
                self.inner.broker.invalidate();
                return Err(e);
            }
        };

        match status {
            StatusCode::OK => Ok(body.to_vec()),
            StatusCode::NOT_FOUND => {
                self.inner.broker.invalidate();
                Err(Error::LyricsNotFound)
            }
            StatusCode::TOO_MANY_REQUESTS => {
                self.inner.broker.invalidate();
                Err(Error::RateLimited)
            }
            s if s.as_u16() >= 400 => {
                self.inner.broker.invalidate();
                Err(Error::Upstream { status: s.as_u16() })
            }
            // Other 2xx/3xx: let the body decide.
            _ => Ok(body.to_vec()),
        }
    }
}
