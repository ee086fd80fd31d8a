//! Frame-to-ASCII conversion.
//!
//! A decoded RGB frame is reduced to single-channel brightness, downsampled
//! to the target character grid, and mapped onto a character ramp ordered
//! from sparsest to densest.

use image::imageops::{self, FilterType};
use image::GrayImage;

use crate::decode::VideoFrame;
use crate::PlayerError;

/// Character rows come out roughly twice as tall as they are wide, so the
/// vertical resolution is halved to preserve the source aspect ratio.
const FONT_HEIGHT_RATIO: u32 = 2;

/// Compute the output row count for a source frame at a given target width.
///
/// Always at least 1, even for extreme aspect ratios.
pub fn ascii_height(src_width: u32, src_height: u32, target_width: u32) -> u32 {
    let h = src_height as u64 * target_width as u64 / src_width as u64 / FONT_HEIGHT_RATIO as u64;
    (h as u32).max(1)
}

fn luminance(r: u8, g: u8, b: u8) -> u8 {
    (0.2126 * r as f64 + 0.7152 * g as f64 + 0.0722 * b as f64).round() as u8
}

fn char_for(luma: u8, ascii_chars: &[u8]) -> char {
    let last = ascii_chars.len() - 1;
    let idx = (luma as usize * last / 255).min(last);
    ascii_chars[idx] as char
}

fn to_gray(frame: &VideoFrame) -> GrayImage {
    let mut gray = GrayImage::new(frame.width, frame.height);
    for (pixel, rgb) in gray.pixels_mut().zip(frame.data.chunks_exact(3)) {
        pixel.0[0] = luminance(rgb[0], rgb[1], rgb[2]);
    }
    gray
}

/// Render a frame as a block of ASCII text.
///
/// The output has exactly [`ascii_height`] lines of exactly `target_width`
/// characters each, joined by newlines.
pub fn frame_to_ascii(
    frame: &VideoFrame,
    target_width: u32,
    ascii_chars: &[u8],
) -> Result<String, PlayerError> {
    if target_width == 0 {
        return Err(PlayerError::InvalidWidth);
    }
    if frame.width == 0
        || frame.height == 0
        || frame.data.len() != frame.width as usize * frame.height as usize * 3
    {
        return Err(PlayerError::EmptyFrame);
    }

    let target_height = ascii_height(frame.width, frame.height, target_width);
    let gray = to_gray(frame);
    let resized = imageops::resize(&gray, target_width, target_height, FilterType::Triangle);

    let w = target_width as usize;
    let h = target_height as usize;
    let mut out = String::with_capacity((w + 1) * h);
    for (i, pixel) in resized.pixels().enumerate() {
        if i > 0 && i % w == 0 {
            out.push('\n');
        }
        out.push(char_for(pixel.0[0], ascii_chars));
    }
    Ok(out)
}
