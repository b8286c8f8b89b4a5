//! ABOUTME: Synthetic frame builders for tests, benchmarks and offline tuning
//! ABOUTME: Produces uniform frames and frames with a solid block of motion

use crate::IntensityFrame;
use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};

/// Create an intensity frame of uniform `background` with one solid block
#[allow(clippy::too_many_arguments)]
pub fn create_test_frame_with_motion(
    width: u32,
    height: u32,
    motion_x: u32,
    motion_y: u32,
    motion_width: u32,
    motion_height: u32,
    background: u8,
    intensity: u8,
) -> IntensityFrame {
    let mut img: GrayImage = ImageBuffer::from_pixel(width, height, Luma([background]));

    for y in motion_y..(motion_y + motion_height).min(height) {
        for x in motion_x..(motion_x + motion_width).min(width) {
            img.put_pixel(x, y, Luma([intensity]));
        }
    }

    IntensityFrame::new(img)
}

/// Uniform intensity frame
pub fn uniform_intensity_frame(width: u32, height: u32, value: u8) -> IntensityFrame {
    IntensityFrame::new(ImageBuffer::from_pixel(width, height, Luma([value])))
}

/// Uniform color frame
pub fn solid_rgb_frame(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    ImageBuffer::from_pixel(width, height, Rgb(color))
}

/// Color frame of `background` with a solid `foreground` block
#[allow(clippy::too_many_arguments)]
pub fn rgb_frame_with_block(
    width: u32,
    height: u32,
    block_x: u32,
    block_y: u32,
    block_width: u32,
    block_height: u32,
    background: [u8; 3],
    foreground: [u8; 3],
) -> RgbImage {
    let mut img = solid_rgb_frame(width, height, background);
    for y in block_y..(block_y + block_height).min(height) {
        for x in block_x..(block_x + block_width).min(width) {
            img.put_pixel(x, y, Rgb(foreground));
        }
    }
    img
}
