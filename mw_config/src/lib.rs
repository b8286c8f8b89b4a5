//! ABOUTME: Configuration management with validation and layered loading
//! ABOUTME: Merges defaults, an optional TOML file, and MOTIONWAKE_ environment variables

use config::{Config as ConfigBuilder, Environment, File};
use mw_capture::CameraConfig;
use mw_core::{Error, LogFormat, Result};
use mw_monitor::MonitorConfig;
use mw_wake::WakeCommandConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

/// Config file picked up from the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "motion-wake.toml";

/// Main configuration struct
#[derive(Debug, Clone, Deserialize, Serialize, Validate, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub camera: CameraConfig,
    /// Replay images from this directory instead of opening the camera
    pub replay_dir: Option<PathBuf>,
    #[validate(nested)]
    pub monitor: MonitorConfig,
    #[validate(nested)]
    pub wake: WakeCommandConfig,
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl Config {
    /// Load configuration from defaults, a TOML file, and `MOTIONWAKE_` environment variables.
    ///
    /// An explicit `file` must exist; otherwise `motion-wake.toml` is used if present.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder()
            .set_default("camera.index", 0)?
            .set_default("camera.input_format", "v4l2")?
            .set_default("camera.width", 640)?
            .set_default("camera.height", 480)?
            .set_default("camera.frame_rate", 10)?
            .set_default("camera.warmup_ms", 1000)?
            .set_default("camera.ffmpeg_path", "ffmpeg")?
            .set_default("monitor.detection.sensitivity", 25)?
            .set_default("monitor.detection.min_area", 500)?
            .set_default("monitor.detection.blur_size", 21)?
            .set_default("monitor.wake_interval_secs", 10)?
            .set_default("monitor.dry_run", false)?
            .set_default("monitor.tick_interval_ms", 100)?
            .set_default("wake.program", "xset")?
            .set_default("wake.args", vec!["dpms", "force", "on"])?
            .set_default("wake.timeout_ms", 5000)?
            .set_default("logging.format", "pretty")?;

        match file {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false));
            }
        }

        // Nested keys use a double underscore: MOTIONWAKE_MONITOR__DRY_RUN=true
        builder = builder.add_source(
            Environment::with_prefix("MOTIONWAKE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(" ")
                .with_list_parse_key("wake.args")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build config: {}", e)))?;

        let parsed: Config = config
            .try_deserialize()
            .map_err(|e| Error::Config(format!("Failed to deserialize config: {}", e)))?;

        parsed.validated()
    }

    /// Validate, converting failures into `Error::Config`
    pub fn validated(self) -> Result<Self> {
        self.validate()
            .map_err(|e| Error::Config(format!("Config validation failed: {}", e)))?;
        Ok(self)
    }
}
