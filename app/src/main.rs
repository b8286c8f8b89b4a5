use clap::Parser;
use mw_capture::{FfmpegCameraSource, FrameSource, ImageSequenceSource};
use mw_config::Config;
use mw_core::{telemetry, LogFormat, Result};
use mw_monitor::{ExitReason, MotionMonitor};
use mw_wake::CommandWakeSink;
use std::{path::PathBuf, process};
use tokio_util::sync::CancellationToken;

const DEFAULT_PREVIEW_PATH: &str = "motion-preview.png";

/// Keep the display awake while the camera sees motion
#[derive(Debug, Parser)]
#[command(name = "motion-wake", version, about)]
struct Cli {
    /// Camera index (default: 0)
    #[arg(long)]
    camera: Option<u32>,

    /// Threshold sensitivity 0-255, lower = more sensitive (default: 25)
    #[arg(long)]
    sensitivity: Option<u8>,

    /// Minimum motion area in pixels (default: 500)
    #[arg(long)]
    min_area: Option<u32>,

    /// Seconds between wake signals while motion persists (default: 10)
    #[arg(long)]
    interval: Option<u64>,

    /// Gaussian blur kernel size, odd (default: 21)
    #[arg(long)]
    blur_size: Option<u32>,

    /// Milliseconds between ticks (default: 100)
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Write an annotated debug frame after every tick
    #[arg(long)]
    show_video: bool,

    /// Where --show-video writes its frame
    #[arg(long, value_name = "FILE")]
    preview_path: Option<PathBuf>,

    /// Log motion only, do not actually wake the screen
    #[arg(long)]
    dry_run: bool,

    /// Replay a directory of images instead of opening the camera
    #[arg(long, value_name = "DIR")]
    replay: Option<PathBuf>,

    /// TOML config file (default: ./motion-wake.toml if present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log output format: pretty or json
    #[arg(long)]
    log_format: Option<LogFormat>,
}

impl Cli {
    /// Command-line flags take precedence over file and environment settings
    fn apply(&self, mut config: Config) -> Result<Config> {
        if let Some(index) = self.camera {
            config.camera.index = index;
        }
        if let Some(sensitivity) = self.sensitivity {
            config.monitor.detection.sensitivity = sensitivity;
        }
        if let Some(min_area) = self.min_area {
            config.monitor.detection.min_area = min_area;
        }
        if let Some(interval) = self.interval {
            config.monitor.wake_interval_secs = interval;
        }
        if let Some(blur_size) = self.blur_size {
            config.monitor.detection.blur_size = blur_size;
        }
        if let Some(tick_ms) = self.tick_ms {
            config.monitor.tick_interval_ms = tick_ms;
        }
        if let Some(path) = &self.preview_path {
            config.monitor.preview_path = Some(path.clone());
        } else if self.show_video && config.monitor.preview_path.is_none() {
            config.monitor.preview_path = Some(PathBuf::from(DEFAULT_PREVIEW_PATH));
        }
        if self.dry_run {
            config.monitor.dry_run = true;
        }
        if let Some(dir) = &self.replay {
            config.replay_dir = Some(dir.clone());
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        config.validated()
    }
}

fn open_source(config: &Config) -> Result<Box<dyn FrameSource>> {
    match &config.replay_dir {
        Some(dir) => Ok(Box::new(ImageSequenceSource::open(dir)?)),
        None => Ok(Box::new(FfmpegCameraSource::open(&config.camera)?)),
    }
}

/// Cancel `token` on Ctrl+C or SIGTERM
fn spawn_signal_listener(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = term.recv() => {}
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Cannot listen for SIGTERM, using Ctrl+C only");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        tracing::info!("Interrupt received");
        token.cancel();
    });
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()).and_then(|c| cli.apply(c)) {
        Ok(config) => config,
        Err(e) => {
            telemetry::init_tracing(cli.log_format.unwrap_or_default(), "motion-wake");
            tracing::error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    telemetry::init_tracing(config.logging.format, "motion-wake");
    tracing::debug!(?config, "Configuration loaded successfully");

    let mut monitor = match MotionMonitor::new(config.monitor.clone()) {
        Ok(monitor) => monitor,
        Err(e) => {
            tracing::error!("Invalid monitor configuration: {}", e);
            process::exit(1);
        }
    };

    let source = match open_source(&config) {
        Ok(source) => source,
        Err(e) => {
            tracing::error!("Failed to open frame source: {}", e);
            process::exit(1);
        }
    };

    let sink = CommandWakeSink::new(&config.wake);
    let cancel = CancellationToken::new();
    spawn_signal_listener(cancel.clone());
    tracing::info!("Press Ctrl+C to quit");

    match monitor.run(source, &sink, cancel).await {
        Ok(summary) if summary.exit_reason == ExitReason::SourceFailed => {
            tracing::error!(ticks = summary.ticks, "Stopped after frame source failure");
            process::exit(1);
        }
        Ok(summary) => {
            tracing::info!(
                session = %summary.session_id,
                ticks = summary.ticks,
                "Cleanup complete"
            );
        }
        Err(e) => {
            tracing::error!("Motion monitor failed: {}", e);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("motion-wake").chain(args.iter().copied()))
    }

    #[test]
    fn test_no_flags_keep_config() {
        let config = parse(&[]).apply(Config::default()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = parse(&[
            "--camera", "2",
            "--sensitivity", "40",
            "--min-area", "800",
            "--interval", "30",
            "--dry-run",
            "--log-format", "json",
        ]);
        let config = cli.apply(Config::default()).unwrap();

        assert_eq!(config.camera.index, 2);
        assert_eq!(config.monitor.detection.sensitivity, 40);
        assert_eq!(config.monitor.detection.min_area, 800);
        assert_eq!(config.monitor.wake_interval_secs, 30);
        assert!(config.monitor.dry_run);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_show_video_uses_default_preview_path() {
        let config = parse(&["--show-video"]).apply(Config::default()).unwrap();
        assert_eq!(
            config.monitor.preview_path,
            Some(PathBuf::from(DEFAULT_PREVIEW_PATH))
        );
    }

    #[test]
    fn test_invalid_override_rejected() {
        assert!(parse(&["--blur-size", "10"]).apply(Config::default()).is_err());
    }

    #[test]
    fn test_sensitivity_out_of_range_rejected_by_parser() {
        let result = Cli::try_parse_from(["motion-wake", "--sensitivity", "300"]);
        assert!(result.is_err());
    }
}
