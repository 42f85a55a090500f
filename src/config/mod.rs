use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_TOKEN_URL: &str = "https://open.spotify.com/api/token";
pub const DEFAULT_LYRICS_BASE_URL: &str = "https://spclient.wg.spotify.com/color-lyrics/v2/track/";
pub const DEFAULT_SERVER_TIME_URL: &str = "https://open.spotify.com/api/server-time";
pub const DEFAULT_SECRET_DICT_URL: &str =
    "https://github.com/xyloflake/spot-secrets-go/blob/main/secrets/secretDict.json?raw=true";

// Spotify is picky about these; the two endpoints historically saw different browsers.
const DEFAULT_TOKEN_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const DEFAULT_LYRICS_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/101.0.0.0 Safari/537.36";

const SP_DC_ENV: &str = "SP_DC";

pub const TOKEN_CACHE_FILE: &str = "token.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub spotify: SpotifyConfig,
    pub endpoints: EndpointsConfig,
    pub paths: PathsConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    /// Value of the `sp_dc` cookie from a logged-in web player session.
    pub sp_dc: Option<String>,
    pub token_user_agent: String,
    pub lyrics_user_agent: String,
    pub request_timeout_secs: u64,
    pub token_timeout_secs: u64,
    /// Skip TLS verification for Spotify hosts (never for the secret document).
    pub insecure_tls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub token_url: String,
    pub lyrics_base_url: String,
    pub server_time_url: String,
    pub secret_dict_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub cache_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub lyrics_enabled: bool,
    pub lyrics_ttl_secs: u64,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            sp_dc: None,
            token_user_agent: DEFAULT_TOKEN_USER_AGENT.to_string(),
            lyrics_user_agent: DEFAULT_LYRICS_USER_AGENT.to_string(),
            request_timeout_secs: 30,
            token_timeout_secs: 600,
            insecure_tls: false,
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            lyrics_base_url: DEFAULT_LYRICS_BASE_URL.to_string(),
            server_time_url: DEFAULT_SERVER_TIME_URL.to_string(),
            secret_dict_url: DEFAULT_SECRET_DICT_URL.to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            lyrics_enabled: true,
            lyrics_ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}

/// Validated, immutable options the client is built from.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub sp_dc: String,
    pub endpoints: EndpointsConfig,
    pub token_user_agent: String,
    pub lyrics_user_agent: String,
    pub request_timeout: Duration,
    pub token_timeout: Duration,
    pub insecure_tls: bool,
    pub token_cache_path: PathBuf,
    pub secret_cache_path: PathBuf,
    pub lyrics_cache_dir: PathBuf,
    pub lyrics_cache_enabled: bool,
    pub lyrics_cache_ttl: Duration,
    /// Where failed token exchanges are dumped for debugging.
    pub diagnostics_path: PathBuf,
}

impl ClientOptions {
    /// Options with default endpoints and cache locations.
    pub fn new(sp_dc: &str) -> Result<Self> {
        let mut cfg = Config::default();
        cfg.spotify.sp_dc = Some(sp_dc.to_string());
        Self::from_config(&cfg)
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let sp_dc = cfg
            .spotify
            .sp_dc
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Configuration("SP_DC is required".into()))?
            .to_string();

        if cfg.spotify.token_user_agent.trim().is_empty()
            || cfg.spotify.lyrics_user_agent.trim().is_empty()
        {
            return Err(Error::Configuration("user agent is empty".into()));
        }
        if cfg.spotify.request_timeout_secs == 0 || cfg.spotify.token_timeout_secs == 0 {
            return Err(Error::Configuration("timeouts must be > 0".into()));
        }
        if cfg.cache.lyrics_enabled && cfg.cache.lyrics_ttl_secs == 0 {
            return Err(Error::Configuration(
                "lyrics cache ttl must be > 0 when the cache is enabled".into(),
            ));
        }
        let ep = &cfg.endpoints;
        for (name, url) in [
            ("token_url", &ep.token_url),
            ("lyrics_base_url", &ep.lyrics_base_url),
            ("server_time_url", &ep.server_time_url),
            ("secret_dict_url", &ep.secret_dict_url),
        ] {
            if reqwest::Url::parse(url).is_err() {
                return Err(Error::Configuration(format!("{name} is not a valid url: {url}")));
            }
        }

        let cache_dir = &cfg.paths.cache_dir;
        Ok(Self {
            sp_dc,
            endpoints: cfg.endpoints.clone(),
            token_user_agent: cfg.spotify.token_user_agent.clone(),
            lyrics_user_agent: cfg.spotify.lyrics_user_agent.clone(),
            request_timeout: Duration::from_secs(cfg.spotify.request_timeout_secs),
            token_timeout: Duration::from_secs(cfg.spotify.token_timeout_secs),
            insecure_tls: cfg.spotify.insecure_tls,
            token_cache_path: cache_dir.join(TOKEN_CACHE_FILE),
            secret_cache_path: cache_dir.join("secretDict_cache.json"),
            lyrics_cache_dir: cache_dir.join("lyrics"),
            lyrics_cache_enabled: cfg.cache.lyrics_enabled,
            lyrics_cache_ttl: Duration::from_secs(cfg.cache.lyrics_ttl_secs),
            diagnostics_path: std::env::temp_dir().join("spotlyrics-token-error.json"),
        })
    }
}

pub fn default_cache_dir() -> PathBuf {
    ProjectDirs::from("dev", "spotlyrics", "spotlyrics")
        .map(|p| p.cache_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("spotlyrics"))
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let proj = ProjectDirs::from("dev", "spotlyrics", "spotlyrics")
        .context("ProjectDirs unavailable")?;
    Ok(proj.config_dir().join("config.toml"))
}

pub fn save(cfg: &Config, override_path: Option<&Path>) -> anyhow::Result<()> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    let raw = toml::to_string_pretty(cfg).context("serialize config")?;
    write_private(&path, &raw)
}

/// Load the config file, creating it with defaults if missing.
/// `SP_DC` from the environment takes precedence over the file.
pub fn load(override_path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    let mut cfg = if path.exists() {
        let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        toml::from_str::<Config>(&raw).with_context(|| format!("parse {}", path.display()))?
    } else {
        let cfg = Config::default();
        let raw = toml::to_string_pretty(&cfg).context("serialize default config")?;
        write_private(&path, &raw)?;
        cfg
    };

    if let Ok(v) = std::env::var(SP_DC_ENV)
        && !v.trim().is_empty()
    {
        cfg.spotify.sp_dc = Some(v);
    }
    Ok(cfg)
}

fn write_private(path: &Path, raw: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    fs::write(path, raw).with_context(|| format!("write {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    Ok(())
}
