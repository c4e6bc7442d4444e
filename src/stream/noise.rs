//! Additive Gaussian noise for building test inputs.
//!
//! Noise is applied to the luma channel only; color frames come back as
//! gray replicated across three channels.

use super::{Frame, PixelFormat};
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

/// Adds zero-mean Gaussian noise to frames.
pub struct NoiseInjector {
    rng: ChaCha20Rng,
    /// Standard deviation in 8-bit intensity units.
    std_dev: f32,
}

impl NoiseInjector {
    /// Default standard deviation.
    pub const DEFAULT_STD_DEV: f32 = 10.0;

    /// Creates an injector seeded from the OS entropy source.
    pub fn new(std_dev: f32) -> Self {
        Self {
            rng: ChaCha20Rng::from_entropy(),
            std_dev: std_dev.max(0.0),
        }
    }

    /// Creates a reproducible injector.
    pub fn with_seed(std_dev: f32, seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            std_dev: std_dev.max(0.0),
        }
    }

    /// Returns the configured standard deviation.
    pub fn std_dev(&self) -> f32 {
        self.std_dev
    }

    /// Draws one standard normal sample (Box-Muller).
    fn next_gaussian(&mut self) -> f32 {
        // u1 in (0, 1] so the logarithm stays finite
        let u1 = (self.rng.next_u32() as f64 + 1.0) / (u32::MAX as f64 + 1.0);
        let u2 = self.rng.next_u32() as f64 / (u32::MAX as f64 + 1.0);
        ((-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()) as f32
    }

    /// Returns a noisy copy of `frame` in the same channel layout.
    pub fn apply(&mut self, frame: &Frame) -> Frame {
        let gray = frame.to_format(PixelFormat::Gray8);
        let noisy: Vec<u8> = gray
            .pixels()
            .iter()
            .map(|&v| {
                let sample = v as f32 + self.next_gaussian() * self.std_dev;
                sample.round().clamp(0.0, 255.0) as u8
            })
            .collect();

        Frame::gray(noisy, frame.width(), frame.height(), frame.sequence())
            .to_format(frame.format())
    }
}

impl Default for NoiseInjector {
    fn default() -> Self {
        Self::new(Self::DEFAULT_STD_DEV)
    }
}

impl std::fmt::Debug for NoiseInjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseInjector")
            .field("std_dev", &self.std_dev)
            .finish_non_exhaustive()
    }
}
