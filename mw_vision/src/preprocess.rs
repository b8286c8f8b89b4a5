//! ABOUTME: Converts raw color frames into smoothed grayscale intensity frames
//! ABOUTME: Grayscale conversion followed by a Gaussian blur sized by kernel width

use crate::{Frame, IntensityFrame};
use image::imageops;
use imageproc::filter::gaussian_blur_f32;

/// Convert a color frame to a smoothed intensity frame.
///
/// `blur_size` is an odd kernel width; 1 skips smoothing entirely.
pub fn preprocess(frame: &Frame, blur_size: u32) -> IntensityFrame {
    let gray = imageops::grayscale(frame);
    if blur_size <= 1 {
        return IntensityFrame::new(gray);
    }
    IntensityFrame::new(gaussian_blur_f32(&gray, kernel_sigma(blur_size)))
}

/// Standard deviation a Gaussian kernel of width `k` implies when none is given explicitly
fn kernel_sigma(k: u32) -> f32 {
    0.3 * ((k as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{rgb_frame_with_block, solid_rgb_frame};

    #[test]
    fn test_kernel_sigma() {
        assert!((kernel_sigma(21) - 3.5).abs() < 1e-6);
        assert!((kernel_sigma(3) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_preserves_dimensions() {
        let frame = solid_rgb_frame(64, 48, [10, 20, 30]);
        let out = preprocess(&frame, 21);
        assert_eq!(out.dimensions(), (64, 48));
    }

    #[test]
    fn test_unit_kernel_is_plain_grayscale() {
        let frame = solid_rgb_frame(8, 8, [200, 200, 200]);
        let out = preprocess(&frame, 1);
        assert!(out.as_image().pixels().all(|p| p.0[0] == 200));
    }

    #[test]
    fn test_deterministic() {
        let frame = rgb_frame_with_block(80, 60, 10, 10, 20, 20, [0, 0, 0], [255, 255, 255]);
        assert_eq!(preprocess(&frame, 21), preprocess(&frame, 21));
    }

    #[test]
    fn test_blur_softens_edges() {
        let frame = rgb_frame_with_block(40, 40, 20, 0, 20, 40, [0, 0, 0], [255, 255, 255]);
        let sharp = preprocess(&frame, 1);
        let smooth = preprocess(&frame, 9);

        // The pixel just left of the edge is black before smoothing and grey after
        assert_eq!(sharp.as_image().get_pixel(19, 20).0[0], 0);
        let blurred = smooth.as_image().get_pixel(19, 20).0[0];
        assert!(blurred > 0 && blurred < 255);
    }
}
