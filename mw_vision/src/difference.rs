//! ABOUTME: Differences the current intensity frame against the baseline
//! ABOUTME: Threshold, dilate, label connected regions, and compare region areas to min_area

use crate::{ensure_same_dimensions, DetectionConfig, IntensityFrame};
use image::{GrayImage, Luma};
use imageproc::{
    distance_transform::Norm,
    morphology::dilate,
    region_labelling::{connected_components, Connectivity},
};
use mw_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Chebyshev radius equivalent to two passes of a 3x3 square dilation
const DILATION_RADIUS: u8 = 2;

const CHANGED: u8 = 255;

/// One connected blob of change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionRegion {
    /// Changed pixels inside the region, before dilation
    pub area: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Outcome of differencing one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// At least one region reached `min_area`
    pub motion: bool,
    /// Every extracted region, in no particular order
    pub regions: Vec<MotionRegion>,
    /// Pixels at or above the sensitivity threshold
    pub changed_pixels: u32,
}

impl Detection {
    /// Area of the largest region, 0 when nothing changed
    pub fn largest_area(&self) -> u32 {
        self.regions.iter().map(|r| r.area).max().unwrap_or(0)
    }
}

/// Compare `current` with `baseline` and decide whether motion occurred
pub fn detect(
    current: &IntensityFrame,
    baseline: &IntensityFrame,
    config: &DetectionConfig,
) -> Result<Detection> {
    ensure_same_dimensions("Baseline", baseline.dimensions(), current.dimensions())?;

    let (mask, changed_pixels) = threshold_difference(current, baseline, config.sensitivity)?;
    if changed_pixels == 0 {
        return Ok(Detection::default());
    }

    let merged = dilate(&mask, Norm::LInf, DILATION_RADIUS);
    let regions = extract_regions(&mask, &merged);
    let motion = regions.iter().any(|r| r.area >= config.min_area);

    debug!(
        changed_pixels,
        regions = regions.len(),
        largest_area = regions.iter().map(|r| r.area).max().unwrap_or(0),
        min_area = config.min_area,
        motion,
        "Frame difference analysed"
    );

    Ok(Detection {
        motion,
        regions,
        changed_pixels,
    })
}

/// Binary mask of pixels whose absolute difference is >= `sensitivity`
fn threshold_difference(
    current: &IntensityFrame,
    baseline: &IntensityFrame,
    sensitivity: u8,
) -> Result<(GrayImage, u32)> {
    let (width, height) = current.dimensions();
    let mut changed = 0u32;
    let mask: Vec<u8> = current
        .as_image()
        .as_raw()
        .iter()
        .zip(baseline.as_image().as_raw())
        .map(|(&c, &b)| {
            if c.abs_diff(b) >= sensitivity {
                changed += 1;
                CHANGED
            } else {
                0
            }
        })
        .collect();

    let mask = GrayImage::from_raw(width, height, mask).ok_or_else(|| {
        mw_core::Error::Validation("Difference mask has wrong buffer size".to_string())
    })?;
    Ok((mask, changed))
}

#[derive(Default)]
struct RegionBounds {
    area: u32,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    seen: bool,
}

impl RegionBounds {
    fn include(&mut self, x: u32, y: u32) {
        if !self.seen {
            self.min_x = x;
            self.max_x = x;
            self.min_y = y;
            self.max_y = y;
            self.seen = true;
            return;
        }
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }
}

/// Label the dilated mask and count original changed pixels per label
fn extract_regions(mask: &GrayImage, merged: &GrayImage) -> Vec<MotionRegion> {
    let labels = connected_components(merged, Connectivity::Eight, Luma([0u8]));
    let mut bounds: BTreeMap<u32, RegionBounds> = BTreeMap::new();

    for (x, y, label) in labels.enumerate_pixels() {
        let label = label.0[0];
        if label == 0 {
            continue;
        }
        let region = bounds.entry(label).or_default();
        region.include(x, y);
        if mask.get_pixel(x, y).0[0] == CHANGED {
            region.area += 1;
        }
    }

    bounds
        .into_values()
        .filter(|r| r.area > 0)
        .map(|r| MotionRegion {
            area: r.area,
            x: r.min_x,
            y: r.min_y,
            width: r.max_x - r.min_x + 1,
            height: r.max_y - r.min_y + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{create_test_frame_with_motion, uniform_intensity_frame};

    fn config(sensitivity: u8, min_area: u32) -> DetectionConfig {
        DetectionConfig {
            sensitivity,
            min_area,
            blur_size: 1,
        }
    }

    #[test]
    fn test_identical_frames_have_no_motion() {
        let frame = create_test_frame_with_motion(100, 100, 10, 10, 20, 20, 64, 200);
        let result = detect(&frame, &frame, &config(25, 10)).unwrap();
        assert!(!result.motion);
        assert!(result.regions.is_empty());
        assert_eq!(result.changed_pixels, 0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let baseline = uniform_intensity_frame(20, 20, 100);
        let current = create_test_frame_with_motion(20, 20, 0, 0, 5, 5, 100, 125);

        let at = detect(&current, &baseline, &config(25, 25)).unwrap();
        assert_eq!(at.changed_pixels, 25);
        assert!(at.motion);

        let above = detect(&current, &baseline, &config(26, 25)).unwrap();
        assert_eq!(above.changed_pixels, 0);
        assert!(!above.motion);
    }

    #[test]
    fn test_darker_pixels_count_as_change() {
        let baseline = uniform_intensity_frame(30, 30, 200);
        let current = create_test_frame_with_motion(30, 30, 5, 5, 10, 10, 200, 20);
        let result = detect(&current, &baseline, &config(25, 100)).unwrap();
        assert!(result.motion);
        assert_eq!(result.largest_area(), 100);
    }

    #[test]
    fn test_region_bounds_include_dilation() {
        let baseline = uniform_intensity_frame(50, 50, 0);
        let current = create_test_frame_with_motion(50, 50, 20, 20, 4, 4, 0, 255);
        let result = detect(&current, &baseline, &config(25, 1)).unwrap();

        assert_eq!(result.regions.len(), 1);
        let region = result.regions[0];
        assert_eq!(region.area, 16);
        assert_eq!((region.x, region.y), (18, 18));
        assert_eq!((region.width, region.height), (8, 8));
    }

    #[test]
    fn test_dilation_merges_nearby_fragments() {
        let baseline = uniform_intensity_frame(60, 60, 0);
        // Two 5x5 blocks separated by a 3 pixel gap become one region
        let mut current = create_test_frame_with_motion(60, 60, 10, 10, 5, 5, 0, 255).into_image();
        for y in 10..15 {
            for x in 18..23 {
                current.put_pixel(x, y, Luma([255]));
            }
        }
        let result = detect(&IntensityFrame::new(current), &baseline, &config(25, 50)).unwrap();

        assert_eq!(result.regions.len(), 1);
        assert_eq!(result.regions[0].area, 50);
        assert!(result.motion);
    }

    #[test]
    fn test_distant_fragments_stay_separate() {
        let baseline = uniform_intensity_frame(80, 80, 0);
        let mut current = create_test_frame_with_motion(80, 80, 5, 5, 5, 5, 0, 255).into_image();
        for y in 60..65 {
            for x in 60..65 {
                current.put_pixel(x, y, Luma([255]));
            }
        }
        let result = detect(&IntensityFrame::new(current), &baseline, &config(25, 30)).unwrap();

        assert_eq!(result.regions.len(), 2);
        assert_eq!(result.changed_pixels, 50);
        // Neither region alone reaches min_area
        assert!(!result.motion);
    }

    #[test]
    fn test_zero_sensitivity_flags_every_pixel() {
        let frame = uniform_intensity_frame(20, 10, 77);
        let result = detect(&frame, &frame, &config(0, 1)).unwrap();
        assert_eq!(result.changed_pixels, 200);
        assert_eq!(result.regions.len(), 1);
        assert_eq!(result.largest_area(), 200);
        assert!(result.motion);
    }

    #[test]
    fn test_zero_min_area_counts_any_region() {
        let baseline = uniform_intensity_frame(30, 30, 0);
        let current = create_test_frame_with_motion(30, 30, 12, 12, 1, 1, 0, 255);
        let result = detect(&current, &baseline, &config(25, 0)).unwrap();
        assert_eq!(result.largest_area(), 1);
        assert!(result.motion);

        // No changed pixels means no region, so still no motion
        let quiet = detect(&baseline, &baseline, &config(25, 0)).unwrap();
        assert!(!quiet.motion);
    }

    #[test]
    fn test_mismatched_dimensions_fail_fast() {
        let baseline = uniform_intensity_frame(10, 10, 0);
        let current = uniform_intensity_frame(10, 12, 0);
        let err = detect(&current, &baseline, &config(25, 1)).unwrap_err();
        assert!(matches!(err, mw_core::Error::Validation(_)));
    }
}
