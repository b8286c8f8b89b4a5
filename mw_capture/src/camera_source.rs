//! ABOUTME: Live camera frames decoded by an ffmpeg child process
//! ABOUTME: Reads fixed-size rgb24 raw frames from ffmpeg's stdout

use crate::FrameSource;
use metrics::counter;
use mw_core::{Error, Result};
use mw_vision::Frame;
use serde::{Deserialize, Serialize};
use std::{
    io::{ErrorKind, Read},
    process::{Child, ChildStdout, Command, Stdio},
    time::Duration,
};
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Camera capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera index, mapped to `/dev/video{index}` unless `device` is set
    pub index: u32,
    /// Explicit device path or ffmpeg input URL
    pub device: Option<String>,
    /// ffmpeg input format (`v4l2`, `avfoundation`, ...)
    #[validate(length(min = 1))]
    pub input_format: String,
    #[validate(range(min = 16, max = 4096))]
    pub width: u32,
    #[validate(range(min = 16, max = 4096))]
    pub height: u32,
    #[validate(range(min = 1, max = 120))]
    pub frame_rate: u32,
    /// Settle time after the probe read before frames are used
    pub warmup_ms: u64,
    /// ffmpeg executable
    #[validate(length(min = 1))]
    pub ffmpeg_path: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            device: None,
            input_format: "v4l2".to_string(),
            width: 640,
            height: 480,
            frame_rate: 10,
            warmup_ms: 1000,
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }
}

impl CameraConfig {
    /// Input passed to ffmpeg's `-i`
    pub fn input(&self) -> String {
        self.device
            .clone()
            .unwrap_or_else(|| format!("/dev/video{}", self.index))
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    fn build_args(&self) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-f".to_string(),
            self.input_format.clone(),
            "-framerate".to_string(),
            self.frame_rate.to_string(),
            "-video_size".to_string(),
            format!("{}x{}", self.width, self.height),
            "-i".to_string(),
            self.input(),
            // Scale in case the device ignored the requested size
            "-vf".to_string(),
            format!("scale={}:{}", self.width, self.height),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "rgb24".to_string(),
            "pipe:1".to_string(),
        ]
    }
}

/// Camera frames from an ffmpeg process
#[derive(Debug)]
pub struct FfmpegCameraSource {
    config: CameraConfig,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    frames_read: u64,
}

impl FfmpegCameraSource {
    /// Open the camera, verify it can deliver a frame, then let it warm up
    #[instrument(skip(config), fields(input = %config.input()))]
    pub fn open(config: &CameraConfig) -> Result<Self> {
        info!(index = config.index, "Opening camera");
        let args = config.build_args();
        debug!(program = %config.ffmpeg_path, ?args, "Spawning ffmpeg");

        let mut child = Command::new(&config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                Error::Capture(format!(
                    "Could not open camera {}: failed to spawn {}: {}",
                    config.index, config.ffmpeg_path, e
                ))
            })?;
        let stdout = child.stdout.take();

        let mut source = Self {
            config: config.clone(),
            child: Some(child),
            stdout,
            frames_read: 0,
        };

        match source.read() {
            Ok(Some(frame)) => {
                info!(
                    width = frame.width(),
                    height = frame.height(),
                    "Camera probe read successful"
                );
            }
            Ok(None) => {
                source.release();
                return Err(Error::Capture(format!(
                    "Camera {} opened but cannot read frames",
                    config.index
                )));
            }
            Err(e) => {
                source.release();
                return Err(e);
            }
        }

        std::thread::sleep(Duration::from_millis(config.warmup_ms));
        info!(index = config.index, "Camera initialized");
        Ok(source)
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }
}

impl FrameSource for FfmpegCameraSource {
    fn read(&mut self) -> Result<Option<Frame>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut buffer = vec![0u8; self.config.frame_len()];
        match stdout.read_exact(&mut buffer) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                warn!(frames_read = self.frames_read, "Camera stream ended");
                return Ok(None);
            }
            Err(e) => {
                return Err(Error::Capture(format!("Failed to read frame: {}", e)));
            }
        }

        self.frames_read += 1;
        counter!("camera_frames_read_total").increment(1);
        Frame::from_raw(self.config.width, self.config.height, buffer)
            .map(Some)
            .ok_or_else(|| Error::Capture("Raw frame has unexpected size".to_string()))
    }

    fn release(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                debug!(error = %e, "ffmpeg already exited");
            }
            match child.wait() {
                Ok(status) => debug!(?status, "ffmpeg exited"),
                Err(e) => warn!(error = %e, "Failed to reap ffmpeg"),
            }
        }
    }

    fn describe(&self) -> String {
        format!("camera {} ({})", self.config.index, self.config.input())
    }
}

impl Drop for FfmpegCameraSource {
    fn drop(&mut self) {
        self.release();
    }
}
