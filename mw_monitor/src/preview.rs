//! ABOUTME: Debug preview that writes an annotated frame to disk each tick
//! ABOUTME: Green border when quiet, red when motion, yellow boxes around qualifying regions

use crate::TickOutcome;
use image::Rgb;
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use mw_core::Result;
use mw_vision::Frame;
use std::path::{Path, PathBuf};

const QUIET: Rgb<u8> = Rgb([0, 255, 0]);
const MOTION: Rgb<u8> = Rgb([255, 0, 0]);
const REGION: Rgb<u8> = Rgb([255, 255, 0]);
const BORDER: u32 = 4;

/// Writes the latest annotated frame as a PNG
#[derive(Debug, Clone)]
pub struct DebugPreview {
    path: PathBuf,
}

impl DebugPreview {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Annotate `frame` and replace the preview file atomically
    pub fn render(&self, frame: &Frame, outcome: &TickOutcome, min_area: u32) -> Result<()> {
        let annotated = annotate(frame, outcome, min_area);
        let staging = self.path.with_extension("partial.png");
        annotated
            .save(&staging)
            .map_err(|e| mw_core::Error::External(format!("Failed to write preview: {}", e)))?;
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

fn annotate(frame: &Frame, outcome: &TickOutcome, min_area: u32) -> Frame {
    let mut image = frame.clone();
    let (width, height) = image.dimensions();
    let color = if outcome.motion { MOTION } else { QUIET };

    for inset in 0..BORDER.min(width / 2).min(height / 2) {
        let rect = Rect::at(inset as i32, inset as i32)
            .of_size(width - 2 * inset, height - 2 * inset);
        draw_hollow_rect_mut(&mut image, rect, color);
    }

    if let Some(detection) = &outcome.detection {
        for region in detection.regions.iter().filter(|r| r.area >= min_area) {
            let rect = Rect::at(region.x as i32, region.y as i32).of_size(region.width, region.height);
            draw_hollow_rect_mut(&mut image, rect, REGION);
        }
    }

    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debounce::Action;
    use mw_vision::{utils::solid_rgb_frame, BaselineUpdate, Detection, MotionRegion};
    use tempfile::TempDir;

    fn outcome(motion: bool, regions: Vec<MotionRegion>) -> TickOutcome {
        TickOutcome {
            motion,
            detection: Some(Detection {
                motion,
                changed_pixels: regions.iter().map(|r| r.area).sum(),
                regions,
            }),
            action: Action::NoOp,
            baseline_update: BaselineUpdate::Held,
        }
    }

    #[test]
    fn test_border_color_follows_motion() {
        let frame = solid_rgb_frame(32, 32, [0, 0, 0]);
        assert_eq!(annotate(&frame, &outcome(false, vec![]), 10).get_pixel(0, 0), &QUIET);
        assert_eq!(annotate(&frame, &outcome(true, vec![]), 10).get_pixel(0, 0), &MOTION);
        // Interior untouched
        assert_eq!(
            annotate(&frame, &outcome(true, vec![]), 10).get_pixel(16, 16),
            &Rgb([0, 0, 0])
        );
    }

    #[test]
    fn test_only_qualifying_regions_are_boxed() {
        let frame = solid_rgb_frame(64, 64, [0, 0, 0]);
        let big = MotionRegion {
            area: 100,
            x: 10,
            y: 10,
            width: 12,
            height: 12,
        };
        let small = MotionRegion {
            area: 4,
            x: 40,
            y: 40,
            width: 6,
            height: 6,
        };
        let image = annotate(&frame, &outcome(true, vec![big, small]), 50);

        assert_eq!(image.get_pixel(10, 10), &REGION);
        assert_eq!(image.get_pixel(40, 40), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_render_writes_png() {
        let temp = TempDir::new().unwrap();
        let preview = DebugPreview::new(temp.path().join("preview.png"));
        let frame = solid_rgb_frame(16, 16, [10, 10, 10]);

        preview.render(&frame, &outcome(false, vec![]), 10).unwrap();

        let written = image::open(preview.path()).unwrap().to_rgb8();
        assert_eq!(written.dimensions(), (16, 16));
        assert!(!temp.path().join("preview.partial.png").exists());
    }
}
