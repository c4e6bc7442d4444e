//! Summary statistics of a real-valued field.

use crate::imgproc::Plane;
use serde::Serialize;

/// Statistics over the finite elements of a plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct PlaneStatistics {
    /// Mean value.
    pub mean: f64,
    /// Mean absolute value.
    pub mean_abs: f64,
    /// Smallest finite value.
    pub min: f64,
    /// Largest finite value.
    pub max: f64,
    /// Population variance.
    pub variance: f64,
    /// Number of NaN or infinite elements.
    pub non_finite: usize,
}

impl PlaneStatistics {
    /// Computes statistics over the finite elements of `plane`.
    pub fn analyze(plane: &Plane) -> Self {
        let mut count = 0usize;
        let mut non_finite = 0usize;
        let mut sum = 0.0f64;
        let mut sum_abs = 0.0f64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for &v in plane.data() {
            if !v.is_finite() {
                non_finite += 1;
                continue;
            }
            let v = v as f64;
            count += 1;
            sum += v;
            sum_abs += v.abs();
            min = min.min(v);
            max = max.max(v);
        }

        if count == 0 {
            return Self {
                non_finite,
                ..Self::default()
            };
        }

        let n = count as f64;
        let mean = sum / n;
        let variance = plane
            .data()
            .iter()
            .filter(|v| v.is_finite())
            .map(|&v| (v as f64 - mean).powi(2))
            .sum::<f64>()
            / n;

        Self {
            mean,
            mean_abs: sum_abs / n,
            min,
            max,
            variance,
            non_finite,
        }
    }

    /// Returns true if every element was finite.
    pub fn is_finite(&self) -> bool {
        self.non_finite == 0
    }
}
