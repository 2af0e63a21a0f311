//! Photoblur - headless pipeline driver
//!
//! Opens an image, replays a sequence of intensity control movements through
//! the pipeline exactly as a window would, and optionally saves the final
//! foreground preview. UI notifications are reported through tracing.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, ensure, Context, Result};
use clap::Parser;
use photoblur::store::PngImageStore;
use photoblur::ui::TracingSink;
use photoblur::{ControlEvent, GaussianBlurFilter, Intensity, PipelineConfig, PipelineSession};
use photoblur_common::config::{LoggingConfig, TomlConfig, CONFIG_ENV_VAR};
use photoblur_common::events::{JobRole, PipelineEvent};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for photoblur
#[derive(Parser, Debug)]
#[command(name = "photoblur")]
#[command(about = "Interactive blur pipeline driver")]
#[command(version)]
struct Args {
    /// Configuration file (defaults to $PHOTOBLUR_CONFIG, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Source image to open
    #[arg(short, long)]
    image: PathBuf,

    /// Intensity control positions to replay, in order (0-100)
    #[arg(short = 'n', long = "intensity")]
    intensities: Vec<i64>,

    /// Delay between replayed control positions (milliseconds)
    #[arg(long, default_value = "200")]
    step_ms: u64,

    /// Save the final foreground preview as PNG
    #[arg(short, long)]
    save: Option<PathBuf>,

    /// Print every pipeline event as a JSON line on stdout
    #[arg(long)]
    json_events: bool,

    /// Give up waiting for a preview after this many seconds
    #[arg(long, default_value = "60")]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml = TomlConfig::resolve(args.config.as_deref(), CONFIG_ENV_VAR)
        .context("Failed to load configuration")?;
    init_tracing(&toml.logging)?;

    ensure!(
        args.image.is_file(),
        "Image not found: {}",
        args.image.display()
    );

    let config = PipelineConfig::from_toml(&toml);
    let initial = config.initial_intensity;
    let settle_wait = config.debounce + Duration::from_secs(args.timeout_secs);
    let filter = Arc::new(GaussianBlurFilter::new(config.sigma_per_step));

    let session = PipelineSession::spawn(
        config,
        filter,
        Box::new(TracingSink::default()),
        Box::new(PngImageStore),
    );

    if args.json_events {
        let mut rx = session.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(line) => println!("{}", line),
                        Err(e) => warn!("Failed to serialize event: {}", e),
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("JSON event stream skipped {} events", n)
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    let mut events = session.subscribe();

    info!("Opening {}", args.image.display());
    session.send(ControlEvent::ImageOpened(args.image.clone()))?;
    wait_for_foreground(&mut events, initial, settle_wait).await?;

    for (i, value) in args.intensities.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(Duration::from_millis(args.step_ms)).await;
        }
        session.send(ControlEvent::IntensityChanged(*value))?;
    }

    if let Some(last) = args.intensities.last() {
        let target = Intensity::saturating(*last);
        if target != initial {
            wait_for_foreground(&mut events, target, settle_wait).await?;
        }
    }

    if let Some(path) = args.save {
        session.send(ControlEvent::SaveRequested(path))?;
    }

    let stats = session.stats();
    info!(
        "Jobs: {} submitted, {} completed, {} cancelled, {} superseded, {} without result",
        stats.submitted, stats.completed, stats.cancelled, stats.superseded, stats.unavailable
    );

    session.shutdown().await;
    Ok(())
}

/// Initialize tracing from the logging configuration
///
/// RUST_LOG overrides the configured level.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("photoblur={0},photoblur_common={0}", logging.level).into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(std::sync::Mutex::new(file)),
                )
                .init();
        }
        None => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
    Ok(())
}

/// Wait until the foreground layer shows the given intensity
async fn wait_for_foreground(
    events: &mut broadcast::Receiver<PipelineEvent>,
    intensity: Intensity,
    timeout: Duration,
) -> Result<()> {
    tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(PipelineEvent::LayerUpdated {
                    role: JobRole::Foreground,
                    intensity: painted,
                    ..
                }) if painted == intensity => return Ok(()),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Event stream lagged by {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(anyhow!("Pipeline stopped before the preview was painted"))
                }
            }
        }
    })
    .await
    .with_context(|| format!("Timed out waiting for the {} preview", intensity))?
}
