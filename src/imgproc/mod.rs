//! Image primitives used by the denoising filter.
//!
//! The filter treats these as collaborators with a narrow numerical
//! contract: they are deterministic for identical inputs and preserve the
//! spatial extent of the image. Borders are handled by reflect-101
//! mirroring (`dcb|abcd|cba`), the same policy for every frame.

mod bilateral;
mod box_filter;
mod color;
mod plane;

pub use bilateral::{bilateral_filter, BilateralParams};
pub use box_filter::box_filter;
pub use color::{expand_gray, gray_from_bgr, quantize, to_gray_plane};
pub use plane::Plane;

use thiserror::Error;

/// Errors raised by image primitives.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImageError {
    #[error("image has no content")]
    EmptyInput,
    #[error("dimension mismatch: expected {expected:?}, got {got:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
    #[error("buffer holds {got} values, expected {expected}")]
    BufferSize { expected: usize, got: usize },
    #[error("invalid window size {0}")]
    InvalidWindow(usize),
}

/// Maps an out-of-range index back into `0..n` by reflect-101 mirroring.
#[inline]
pub(crate) fn reflect_101(mut i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let n = n as isize;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - 2 - i;
        } else {
            return i as usize;
        }
    }
}
