//! ABOUTME: Holds the reference "no motion" intensity frame
//! ABOUTME: Supports one-time seeding and weighted blending with the current frame

use crate::{ensure_same_dimensions, IntensityFrame};
use image::GrayImage;
use mw_core::Result;

/// Reference frame the current frame is differenced against
#[derive(Debug, Default, Clone)]
pub struct BaselineStore {
    frame: Option<IntensityFrame>,
}

impl BaselineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.frame.is_some()
    }

    pub fn get(&self) -> Option<&IntensityFrame> {
        self.frame.as_ref()
    }

    /// Assign the baseline verbatim; only valid while uninitialized
    pub fn seed(&mut self, frame: IntensityFrame) {
        debug_assert!(self.frame.is_none(), "baseline seeded twice");
        self.frame = Some(frame);
    }

    /// Replace the baseline with `keep * baseline + (1 - keep) * current`.
    ///
    /// Values round to nearest and saturate to `u8`. An uninitialized store is
    /// seeded with `current` instead.
    pub fn blend(&mut self, current: &IntensityFrame, keep: f32) -> Result<()> {
        let Some(baseline) = self.frame.as_ref() else {
            self.frame = Some(current.clone());
            return Ok(());
        };
        ensure_same_dimensions("Baseline", baseline.dimensions(), current.dimensions())?;

        let take = 1.0 - keep;
        let (width, height) = baseline.dimensions();
        let blended: Vec<u8> = baseline
            .as_image()
            .as_raw()
            .iter()
            .zip(current.as_image().as_raw())
            .map(|(&b, &c)| (b as f32 * keep + c as f32 * take).round().clamp(0.0, 255.0) as u8)
            .collect();

        let image = GrayImage::from_raw(width, height, blended).ok_or_else(|| {
            mw_core::Error::Validation("Blended baseline has wrong buffer size".to_string())
        })?;
        self.frame = Some(IntensityFrame::new(image));
        Ok(())
    }
}
