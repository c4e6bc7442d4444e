//! Conversions between 8-bit frames and real-valued planes.

use super::{ImageError, Plane};
use crate::stream::PixelFormat;

/// Fixed-point BT.601 luma weights for B, G, R (sum to 1 << 14).
const LUMA_B: u32 = 1868;
const LUMA_G: u32 = 9617;
const LUMA_R: u32 = 4899;
const LUMA_SHIFT: u32 = 14;

/// Converts interleaved BGR pixels to 8-bit luma.
pub fn gray_from_bgr(bgr: &[u8]) -> Vec<u8> {
    bgr.chunks_exact(3)
        .map(|px| {
            let y = px[0] as u32 * LUMA_B
                + px[1] as u32 * LUMA_G
                + px[2] as u32 * LUMA_R
                + (1 << (LUMA_SHIFT - 1));
            (y >> LUMA_SHIFT) as u8
        })
        .collect()
}

/// Converts raw 8-bit pixels to a grayscale `f32` plane.
pub fn to_gray_plane(
    pixels: &[u8],
    width: usize,
    height: usize,
    format: PixelFormat,
) -> Result<Plane, ImageError> {
    if width == 0 || height == 0 || pixels.is_empty() {
        return Err(ImageError::EmptyInput);
    }
    let expected = width * height * format.channels();
    if pixels.len() != expected {
        return Err(ImageError::BufferSize {
            expected,
            got: pixels.len(),
        });
    }

    let data = match format {
        PixelFormat::Gray8 => pixels.iter().map(|&v| v as f32).collect(),
        PixelFormat::Bgr24 => gray_from_bgr(pixels).into_iter().map(f32::from).collect(),
    };
    Plane::from_vec(width, height, data)
}

/// Rounds half to even and saturates a plane to 8-bit values. NaN maps to 0.
pub fn quantize(plane: &Plane) -> Vec<u8> {
    plane
        .data()
        .iter()
        .map(|&v| {
            if v.is_nan() {
                0
            } else {
                v.round_ties_even().clamp(0.0, 255.0) as u8
            }
        })
        .collect()
}

/// Replicates single-channel pixels into the requested layout.
pub fn expand_gray(gray: &[u8], format: PixelFormat) -> Vec<u8> {
    match format {
        PixelFormat::Gray8 => gray.to_vec(),
        PixelFormat::Bgr24 => gray.iter().flat_map(|&v| [v, v, v]).collect(),
    }
}
