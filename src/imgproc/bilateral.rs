//! Edge-preserving bilateral filter.
//!
//! Each output pixel is a weighted mean of its neighbours inside a disc of
//! radius `diameter / 2`. The weight of a neighbour is the product of a
//! spatial Gaussian on its distance and a range Gaussian on its intensity
//! difference to the centre pixel, so strong edges receive little weight.

use super::{reflect_101, ImageError, Plane};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Bilateral filter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BilateralParams {
    /// Neighbourhood diameter in pixels. Zero derives it from `sigma_space`.
    pub diameter: usize,
    /// Range (intensity) spread.
    pub sigma_color: f32,
    /// Spatial spread.
    pub sigma_space: f32,
}

impl BilateralParams {
    /// Same spread for intensity and distance.
    pub fn uniform(diameter: usize, sigma: f32) -> Self {
        Self {
            diameter,
            sigma_color: sigma,
            sigma_space: sigma,
        }
    }

    fn radius(&self) -> isize {
        if self.diameter == 0 {
            (self.sigma_space.max(f32::EPSILON) * 1.5).round() as isize
        } else {
            (self.diameter / 2) as isize
        }
    }
}

/// One precomputed neighbour in the spatial kernel.
struct Tap {
    dx: isize,
    dy: isize,
    weight: f32,
}

fn spatial_kernel(radius: isize, sigma_space: f32) -> Vec<Tap> {
    let coeff = -0.5 / (sigma_space * sigma_space);
    let mut taps = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let r2 = (dx * dx + dy * dy) as f32;
            if r2.sqrt() > radius as f32 {
                continue;
            }
            taps.push(Tap {
                dx,
                dy,
                weight: (r2 * coeff).exp(),
            });
        }
    }
    taps
}

/// Applies the bilateral filter to a single-channel plane.
///
/// Non-positive spreads are replaced by 1. The result has the same
/// dimensions as `src` and is deterministic for identical inputs.
pub fn bilateral_filter(src: &Plane, params: &BilateralParams) -> Result<Plane, ImageError> {
    if src.is_empty() {
        return Err(ImageError::EmptyInput);
    }

    let sigma_color = if params.sigma_color > 0.0 {
        params.sigma_color
    } else {
        1.0
    };
    let sigma_space = if params.sigma_space > 0.0 {
        params.sigma_space
    } else {
        1.0
    };
    let radius = params.radius().max(1);
    let taps = spatial_kernel(radius, sigma_space);
    let color_coeff = -0.5 / (sigma_color * sigma_color);

    let (width, height) = src.dimensions();
    let mut output = Plane::zeros(width, height);
    output
        .data_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, out)| {
            for (x, dst) in out.iter_mut().enumerate() {
                let centre = src.get(x, y);
                let mut sum = 0.0f32;
                let mut weight_sum = 0.0f32;

                for tap in &taps {
                    let sx = reflect_101(x as isize + tap.dx, width);
                    let sy = reflect_101(y as isize + tap.dy, height);
                    let value = src.get(sx, sy);
                    let diff = value - centre;
                    let weight = tap.weight * (diff * diff * color_coeff).exp();
                    sum += value * weight;
                    weight_sum += weight;
                }

                // The centre tap always contributes weight 1
                *dst = sum / weight_sum;
            }
        });

    tracing::trace!(
        width,
        height,
        radius,
        taps = taps.len(),
        "Bilateral pass complete"
    );

    Ok(output)
}
