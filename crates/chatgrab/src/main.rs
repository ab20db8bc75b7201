//! # chatgrab
//!
//! WhatsApp Web inline-image monitor binary — wires the browser session,
//! conversation navigation, and the poll loop together.
//!
//! Startup flow: launch Chrome with a persistent profile, open WhatsApp Web,
//! wait for the operator to confirm QR login on stdin, open the target
//! conversation, then poll for inline images until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use chatgrab_browser::{BrowserSession, LaunchOptions, chrome};
use chatgrab_monitor::{
    CdpImageSource, HttpUploadSink, ImagePersister, Monitor, NoopUploadSink, UploadSink,
    open_conversation,
};
use chatgrab_settings::ChatgrabSettings;

/// WhatsApp Web inline-image monitor.
#[derive(Parser, Debug)]
#[command(name = "chatgrab", about = "Capture inline images from a WhatsApp Web conversation")]
struct Cli {
    /// Exact display name of the conversation to monitor.
    #[arg(long)]
    conversation: Option<String>,

    /// Only capture images from this sender display name.
    #[arg(long)]
    sender_filter: Option<String>,

    /// Directory saved images are written to.
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// Poll interval in milliseconds.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Settings file (defaults to `~/.chatgrab/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Run Chrome headless. Not usable for first-time QR login.
    #[arg(long)]
    headless: bool,

    /// Explicit Chrome/Chromium executable path.
    #[arg(long)]
    chrome_path: Option<PathBuf>,
}

impl Cli {
    /// Fold CLI flags over loaded settings. Flags win.
    fn apply(&self, settings: &mut ChatgrabSettings) {
        if let Some(ref conversation) = self.conversation {
            settings.monitor.conversation = conversation.clone();
        }
        if let Some(ref filter) = self.sender_filter {
            settings.monitor.sender_filter = Some(filter.clone());
        }
        if let Some(ref dir) = self.storage_dir {
            settings.monitor.storage_dir = dir.display().to_string();
        }
        if let Some(interval) = self.interval_ms {
            settings.monitor.poll_interval_ms = interval;
        }
        if self.headless {
            settings.browser.headed = false;
        }
        if let Some(ref path) = self.chrome_path {
            settings.browser.chrome_path = Some(path.display().to_string());
        }
    }
}

/// Initialize the global tracing subscriber with stderr output only.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // try_init is a no-op if already set
    let _ = subscriber.try_init();
}

/// Resolve the Chrome executable from settings or well-known locations.
fn resolve_chrome(settings: &ChatgrabSettings) -> Result<PathBuf> {
    if let Some(ref path) = settings.browser.chrome_path {
        return Ok(PathBuf::from(path));
    }
    chrome::find_chrome().context(
        "No Chrome/Chromium executable found; set browser.chromePath or --chrome-path",
    )
}

/// Resolve the profile directory, anchoring relative paths under `~/.chatgrab`.
fn resolve_profile_dir(settings: &ChatgrabSettings) -> PathBuf {
    let configured = PathBuf::from(&settings.browser.profile_dir);
    if configured.is_absolute() {
        configured
    } else {
        chatgrab_settings::home_dir().join(configured)
    }
}

/// Block until the operator presses Enter, confirming QR login is complete.
async fn wait_for_login_confirmation() -> Result<()> {
    eprintln!("Scan the QR code in the browser window if prompted, then press Enter to continue...");
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| ())
    })
    .await
    .context("stdin reader task failed")?
    .context("Failed to read from stdin")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Settings loading itself logs, so a subscriber must exist before it
    // runs. `RUST_LOG` is honored from this first init onward.
    init_subscriber(&chatgrab_settings::LoggingSettings::default().level);

    let mut settings = match cli.settings {
        Some(ref path) => chatgrab_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => chatgrab_settings::load_settings().context("Failed to load settings")?,
    };
    cli.apply(&mut settings);

    // No-op once the early init has installed a subscriber; use `RUST_LOG`
    // to override the level at runtime.
    init_subscriber(&settings.logging.level);

    // The loader validates file and env values, but CLI flags land after
    // that, so the merged result is checked again here.
    chatgrab_settings::validate_settings(&settings).context("Invalid settings")?;

    if settings.monitor.conversation.trim().is_empty() {
        anyhow::bail!("No conversation configured; pass --conversation or set monitor.conversation");
    }

    let chrome_path = resolve_chrome(&settings)?;
    let options = LaunchOptions {
        profile_dir: resolve_profile_dir(&settings),
        headed: settings.browser.headed,
        ..LaunchOptions::default()
    };

    info!(chrome = %chrome_path.display(), profile = %options.profile_dir.display(), "launching browser");
    let session = Arc::new(
        BrowserSession::launch(&chrome_path, &options)
            .await
            .context("Failed to launch browser")?,
    );

    session
        .navigate(&settings.browser.app_url)
        .await
        .with_context(|| format!("Failed to open {}", settings.browser.app_url))?;

    wait_for_login_confirmation().await?;

    open_conversation(
        &session,
        &settings.monitor.conversation,
        settings.monitor.wait_timeout_ms,
    )
    .await
    .with_context(|| format!("Failed to open conversation '{}'", settings.monitor.conversation))?;

    let persister = ImagePersister::new(&settings.monitor.storage_dir)
        .with_context(|| format!("Failed to prepare {}", settings.monitor.storage_dir))?;

    let upload: Arc<dyn UploadSink> = match (settings.upload.enabled, &settings.upload.endpoint) {
        (true, Some(endpoint)) => Arc::new(HttpUploadSink::new(endpoint.clone())),
        (true, None) => {
            anyhow::bail!("upload.enabled is set but upload.endpoint is missing")
        }
        (false, _) => Arc::new(NoopUploadSink),
    };

    let monitor = Monitor::new(
        Arc::new(CdpImageSource::new(session.clone())),
        persister,
        upload,
        settings.monitor.sender_filter.clone(),
        Duration::from_millis(settings.monitor.poll_interval_ms),
    );

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    let _ = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            signal_cancel.cancel();
        }
    });

    info!(
        conversation = %settings.monitor.conversation,
        interval_ms = settings.monitor.poll_interval_ms,
        "monitoring for inline images"
    );
    let saved = monitor.run(cancel).await;
    info!(saved, "done");

    session.close().await.context("Failed to close browser")?;
    Ok(())
}
