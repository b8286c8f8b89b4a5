//! ABOUTME: Adaptive-baseline motion detection on smoothed grayscale frames
//! ABOUTME: Frame -> preprocess -> difference against baseline -> adapt baseline

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub mod adapter;
pub mod baseline;
pub mod difference;
pub mod preprocess;
pub mod utils;

pub use adapter::{adapt_baseline, BaselineUpdate, SUSTAINED_MOTION_TICKS};
pub use baseline::BaselineStore;
pub use difference::{detect, Detection, MotionRegion};
pub use preprocess::preprocess;

// Re-export image types for downstream crates and benchmarks
pub use image;

/// A raw color frame as delivered by a frame source
pub type Frame = RgbImage;

/// Tuning for the motion detector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DetectionConfig {
    /// Per-pixel intensity change counted as "changed" (lower = more sensitive; 0 flags every pixel)
    pub sensitivity: u8,
    /// Minimum changed-pixel area of a single region to count as motion
    pub min_area: u32,
    /// Gaussian smoothing kernel size; odd, 1 disables smoothing
    #[validate(custom(function = "validate_blur_size"))]
    pub blur_size: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sensitivity: 25,
            min_area: 500,
            blur_size: 21,
        }
    }
}

fn validate_blur_size(blur_size: u32) -> Result<(), ValidationError> {
    if blur_size == 0 || blur_size % 2 == 0 {
        let mut err = ValidationError::new("odd_kernel");
        err.message = Some("blur_size must be an odd number >= 1".into());
        return Err(err);
    }
    Ok(())
}

/// Smoothed single-channel intensity image derived from a [`Frame`]
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityFrame(GrayImage);

impl IntensityFrame {
    pub fn new(image: GrayImage) -> Self {
        Self(image)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.0
    }

    pub fn into_image(self) -> GrayImage {
        self.0
    }

    /// Mean pixel intensity, 0.0 for an empty frame
    pub fn mean_intensity(&self) -> f64 {
        let raw = self.0.as_raw();
        if raw.is_empty() {
            return 0.0;
        }
        raw.iter().map(|&p| p as f64).sum::<f64>() / raw.len() as f64
    }
}

impl From<GrayImage> for IntensityFrame {
    fn from(image: GrayImage) -> Self {
        Self(image)
    }
}

/// Fail fast when two frames in one session disagree on size
pub(crate) fn ensure_same_dimensions(
    what: &str,
    expected: (u32, u32),
    actual: (u32, u32),
) -> mw_core::Result<()> {
    if expected != actual {
        return Err(mw_core::Error::Validation(format!(
            "{} dimensions {}x{} do not match frame dimensions {}x{}",
            what, expected.0, expected.1, actual.0, actual.1
        )));
    }
    Ok(())
}
