use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use spotlyrics::lyrics::format;
use spotlyrics::spotify::track;
use spotlyrics::{ClientOptions, LyricsClient, config, payload};

#[derive(Debug, Parser)]
#[command(name = "spotlyrics", version, about = "Fetch Spotify lyrics from the command line")]
struct Cli {
    /// Override config file path.
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Bypass the lyrics cache for this run.
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print lyrics for a track ID, URL or URI.
    Lyrics {
        track: String,
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Print the `{error, syncType, lines}` JSON payload used by host bindings.
    Payload { track: String },
    /// Ensure a valid access token exists and print its expiry.
    Token,
    /// Print the track ID extracted from a URL or URI.
    TrackId { reference: String },
    /// Drop the cached access token.
    Logout,
    /// Configuration helpers.
    Config {
        #[command(subcommand)]
        cmd: ConfigCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Store the sp_dc cookie in the config file.
    SetSpDc { value: String },
    /// Print the config file location.
    Path,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Lrc,
    Srt,
    Raw,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let mut cfg = config::load(cli.config.as_deref()).context("load config")?;
    let client_cfg = {
        let mut c = cfg.clone();
        if cli.no_cache {
            c.cache.lyrics_enabled = false;
        }
        c
    };

    match cli.command {
        Command::Lyrics { track, format: fmt } => {
            let client = make_client(&client_cfg)?;
            let lyrics = client.get_lyrics(&track).await?;
            match fmt {
                Format::Json => println!("{}", serde_json::to_string_pretty(&lyrics)?),
                Format::Lrc => print!("{}", format::render_lrc(&format::to_lrc(&lyrics.lines)?)),
                Format::Srt => print!("{}", format::render_srt(&format::to_srt(&lyrics.lines)?)),
                Format::Raw => print!("{}", format::to_plain_text(&lyrics.lines)),
            }
        }
        Command::Payload { track } => {
            let out = match ClientOptions::from_config(&client_cfg) {
                Ok(opts) => payload::get_lyrics_payload_with_options(opts, &track).await,
                Err(e) => payload::Payload::failure(e.to_string()),
            };
            println!("{}", out.to_json());
        }
        Command::Token => {
            let client = make_client(&client_cfg)?;
            let cred = client.check_token().await?;
            println!(
                "token valid until {} (epoch ms)",
                cred.access_token_expiration_timestamp_ms
            );
        }
        Command::TrackId { reference } => {
            println!("{}", track::resolve(&reference)?);
        }
        Command::Logout => {
            let path = client_cfg.paths.cache_dir.join(config::TOKEN_CACHE_FILE);
            spotlyrics::storage::remove_quietly(&path);
            println!("Removed cached token.");
        }
        Command::Config { cmd } => match cmd {
            ConfigCommand::SetSpDc { value } => {
                cfg.spotify.sp_dc = Some(value.trim().to_string());
                config::save(&cfg, cli.config.as_deref()).context("save config")?;
                println!("Updated sp_dc in config.");
            }
            ConfigCommand::Path => {
                let path = match cli.config {
                    Some(p) => p,
                    None => config::default_config_path()?,
                };
                println!("{}", path.display());
            }
        },
    }

    Ok(())
}

fn make_client(cfg: &config::Config) -> anyhow::Result<LyricsClient> {
    let opts = ClientOptions::from_config(cfg).context("invalid client options")?;
    Ok(LyricsClient::new(opts)?)
}
