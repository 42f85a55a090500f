use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while talking to the lyrics endpoints.
///
/// Variants are kept distinct so callers can react per kind (for example,
/// backing off on [`Error::RateLimited`] or prompting for a new cookie on
/// [`Error::InvalidCredential`]).
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to fetch server time: {reason}")]
    TimeSource { status: Option<u16>, reason: String },

    #[error("failed to fetch secret document (HTTP {status})")]
    RemoteFetch { status: u16 },

    #[error("malformed secret document: {0}")]
    MalformedSecretDocument(String),

    #[error("secret document was empty")]
    EmptySecretDocument,

    #[error("secret for version {0} was empty")]
    EmptySecretVersion(String),

    #[error("secret document: last version label was empty")]
    EmptyVersionLabel,

    #[error("invalid trusted time {0}")]
    InvalidTime(i64),

    #[error("token request failed (HTTP {status}): {body}")]
    CredentialExchange { status: u16, body: String },

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("secret document answered 304 but no cached copy is available")]
    CacheInconsistency,

    #[error("failed to write token cache: {0}")]
    CachePersist(#[source] std::io::Error),

    #[error("invalid track reference: {0}")]
    InvalidTrackReference(String),

    #[error("lyrics for this track were not found on spotify")]
    LyricsNotFound,

    #[error("rate limited by spotify; try again later")]
    RateLimited,

    #[error("spotify api error (HTTP {status})")]
    Upstream { status: u16 },

    #[error("spotify returned an invalid lyrics response: {0}")]
    MalformedLyricsResponse(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("operation timed out")]
    Timeout,
}

impl Error {
    /// HTTP status associated with this error, if the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::TimeSource { status, .. } => *status,
            Error::RemoteFetch { status }
            | Error::CredentialExchange { status, .. }
            | Error::Upstream { status } => Some(*status),
            Error::LyricsNotFound => Some(404),
            Error::RateLimited => Some(429),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited)
    }
}
