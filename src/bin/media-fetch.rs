//! media-fetch server binary.
//!
//! Usage:
//!   media-fetch [--config path] [--bind addr] [--profile name] [--scratch-dir dir] [--ytdlp path]

use clap::Parser;
use media_fetch::{Config, FetchCoordinator, ProfilePreset, YtDlpExtractor};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "media-fetch",
    version,
    about = "Fetch videos on demand and stream them back over HTTP"
)]
struct Cli {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Address to listen on (overrides the config file)
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Extractor profile preset: basic, enhanced, legacy_client
    #[arg(long)]
    profile: Option<ProfilePreset>,
    /// Directory for scratch files
    #[arg(long)]
    scratch_dir: Option<PathBuf>,
    /// Path to the yt-dlp binary (searched on PATH when omitted)
    #[arg(long)]
    ytdlp: Option<PathBuf>,
}

fn load_config(cli: Cli) -> media_fetch::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|e| media_fetch::Error::Config {
                message: format!("failed to read {}: {e}", path.display()),
                key: None,
            })?;
            serde_json::from_str(&raw)?
        }
        None => Config::default(),
    };

    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(preset) = cli.profile {
        let binary = config.extractor.binary.take();
        config.extractor = media_fetch::ExtractorProfile::preset(preset);
        config.extractor.binary = binary;
    }
    if let Some(dir) = cli.scratch_dir {
        config.fetch.scratch_dir = dir;
    }
    if let Some(ytdlp) = cli.ytdlp {
        config.extractor.binary = Some(ytdlp);
    }

    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> media_fetch::Result<()> {
    let config = Arc::new(load_config(cli)?);
    let extractor = Arc::new(YtDlpExtractor::from_profile(&config.extractor)?);

    tracing::info!(
        binary = %extractor.binary_path().display(),
        scratch_dir = %config.fetch.scratch_dir.display(),
        max_attempts = config.retry.max_attempts,
        "Extractor ready"
    );

    let coordinator = FetchCoordinator::new(&config, extractor);
    media_fetch::api::start_api_server(coordinator, config, media_fetch::shutdown_signal()).await
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "media-fetch exited with an error");
            ExitCode::FAILURE
        }
    }
}
