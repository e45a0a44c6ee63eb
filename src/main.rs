use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};
use vc_recorder::voice::BridgeSettings;
use vc_recorder::{
    create_router, AppState, BridgeCaptureSink, Config, DiscordNotifier, DriveCredentials,
    GoogleDrive, ObjectStorage, SessionManager, UnavailableStorage,
};

#[derive(Debug, Parser)]
#[command(name = "vc-recorder", about = "Records busy voice channels and shares the result")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, default_value = "config.json")]
    config: String,

    /// Override http.bind
    #[arg(long)]
    bind: Option<String>,

    /// Override http.port
    #[arg(long)]
    port: Option<u16>,

    /// Override logLevel (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let cfg = Arc::new(Config::load(&cli.config)?);

    let level = cli
        .log_level
        .as_deref()
        .or(cfg.log_level.as_deref())
        .and_then(|l| l.parse::<Level>().ok())
        .unwrap_or(Level::INFO);
    let _log_guards = vc_recorder::logging::init(level, Path::new(&cfg.log_directory));

    info!("vc-recorder v{}", env!("CARGO_PKG_VERSION"));
    info!("Recordings directory: {}", cfg.storage_dir().display());
    info!("Recording format: {} ({} kbps)", cfg.recording_format, cfg.recording_bitrate);

    std::fs::create_dir_all(cfg.storage_dir()).context("Failed to create recordings directory")?;

    let token = std::env::var("DISCORD_TOKEN").context("DISCORD_TOKEN is not set")?;
    let notifier = Arc::new(DiscordNotifier::new(cfg.discord.api_base.clone(), token));

    let storage = drive_storage(&cfg);

    let capture = Arc::new(BridgeCaptureSink::new(BridgeSettings::from_config(&cfg)));
    if !cfg.is_wav() {
        info!(
            "Audio from the bridge is stored as-is; it must already be {} at {} bps",
            cfg.recording_format,
            cfg.bitrate_bps()
        );
    }

    let manager = Arc::new(SessionManager::new(
        Arc::clone(&cfg),
        capture.clone(),
        storage,
        notifier,
    ));

    let state = AppState::new(Arc::clone(&manager), capture);
    let dispatcher = Arc::clone(&state.dispatcher);
    let app = create_router(state);

    let bind = cli.bind.unwrap_or_else(|| cfg.http.bind.clone());
    let port = cli.port.unwrap_or(cfg.http.port);
    let listener = tokio::net::TcpListener::bind((bind.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", bind, port))?;

    info!("Listening for the voice bridge on {}:{}", bind, port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown requested");
        })
        .await
        .context("HTTP server failed")?;

    dispatcher.close().await;
    let outcomes = manager.shutdown().await;
    info!("Stopped {} active recording(s)", outcomes.len());

    Ok(())
}

/// Google Drive when credentials load; otherwise a storage that fails every
/// upload so recordings are still kept locally
fn drive_storage(cfg: &Config) -> Arc<dyn ObjectStorage> {
    let credentials_path = std::env::var("GOOGLE_APPLICATION_CREDENTIALS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(&cfg.google_drive.credentials_path));
    let token_path = PathBuf::from(&cfg.google_drive.token_path);

    match DriveCredentials::load(&credentials_path, &token_path) {
        Ok(credentials) => {
            info!("Google Drive credentials loaded from {}", credentials_path.display());
            Arc::new(GoogleDrive::new(credentials))
        }
        Err(e) => {
            warn!("{}", e);
            warn!("Google Drive uploads are disabled; recordings stay in the local directory");
            Arc::new(UnavailableStorage::new(e.to_string()))
        }
    }
}
