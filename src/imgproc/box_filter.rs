//! Normalized box (mean) filter.

use super::{reflect_101, ImageError, Plane};
use rayon::prelude::*;

/// Replaces every pixel with the unweighted mean of a `window × window`
/// neighbourhood.
///
/// The filter is separable: a horizontal pass followed by a vertical pass.
/// For even windows the anchor sits at `window / 2`.
pub fn box_filter(src: &Plane, window: usize) -> Result<Plane, ImageError> {
    if src.is_empty() {
        return Err(ImageError::EmptyInput);
    }
    if window == 0 {
        return Err(ImageError::InvalidWindow(window));
    }
    if window == 1 {
        return Ok(src.clone());
    }

    let (width, height) = src.dimensions();
    let anchor = (window / 2) as isize;
    let offsets: Vec<isize> = (0..window as isize).map(|k| k - anchor).collect();
    let norm = window as f32;

    let mut horizontal = Plane::zeros(width, height);
    horizontal
        .data_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, out)| {
            let row = src.row(y);
            for (x, dst) in out.iter_mut().enumerate() {
                let sum: f32 = offsets
                    .iter()
                    .map(|&k| row[reflect_101(x as isize + k, width)])
                    .sum();
                *dst = sum / norm;
            }
        });

    let mut output = Plane::zeros(width, height);
    output
        .data_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, out)| {
            for &k in &offsets {
                let source = horizontal.row(reflect_101(y as isize + k, height));
                for (dst, &v) in out.iter_mut().zip(source) {
                    *dst += v;
                }
            }
            for dst in out.iter_mut() {
                *dst /= norm;
            }
        });

    Ok(output)
}
