//! Metrics collection and registry.

use crate::analysis::FrameDiagnostics;
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of filter state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Frames processed since the stream opened.
    pub frames_processed: u64,
    /// Wall time spent on the last frame.
    pub frame_seconds: f64,
    /// Mean Kalman gain.
    pub gain_mean: f64,
    /// Mean measurement noise.
    pub measurement_noise_mean: f64,
    /// Mean corrected uncertainty.
    pub uncertainty_mean: f64,
    /// Mean absolute temporal delta.
    pub delta_abs_mean: f64,
    /// Mean block motion (block-matching mode only).
    pub motion_mean: Option<f64>,
    /// Mean novelty weight (block-matching mode only).
    pub novelty_mean: Option<f64>,
    /// History length (block-matching mode only).
    pub history_len: Option<usize>,
}

impl MetricsSnapshot {
    /// Creates a snapshot from the diagnostics of one frame.
    pub fn from_diagnostics(diagnostics: &FrameDiagnostics, elapsed: Duration) -> Self {
        Self {
            frames_processed: diagnostics.frames_processed,
            frame_seconds: elapsed.as_secs_f64(),
            gain_mean: diagnostics.gain.mean,
            measurement_noise_mean: diagnostics.measurement_noise.mean,
            uncertainty_mean: diagnostics.uncertainty.mean,
            delta_abs_mean: diagnostics.delta.mean_abs,
            motion_mean: diagnostics.motion.map(|s| s.mean),
            novelty_mean: diagnostics.novelty.map(|s| s.mean),
            history_len: diagnostics.history_len,
        }
    }
}

/// Prometheus metrics registry for filter monitoring.
///
/// Clones share the same underlying metrics, so one handle can be updated
/// by the pipeline while another is served over HTTP.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,

    // Throughput
    frames_processed: IntCounter,
    frame_seconds: Gauge,

    // Kalman fields
    gain_mean: Gauge,
    measurement_noise_mean: Gauge,
    uncertainty_mean: Gauge,
    delta_abs_mean: Gauge,

    // Block matching
    motion_mean: Gauge,
    novelty_mean: Gauge,
    history_len: IntGauge,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all filter metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let frames_processed = IntCounter::new(
            "kalman_denoise_frames_processed_total",
            "Total number of frames filtered",
        )?;
        let frame_seconds = Gauge::new(
            "kalman_denoise_frame_seconds",
            "Wall time spent filtering the last frame",
        )?;

        let gain_mean = Gauge::new("kalman_denoise_gain_mean", "Mean per-pixel Kalman gain")?;
        let measurement_noise_mean = Gauge::new(
            "kalman_denoise_measurement_noise_mean",
            "Mean per-pixel measurement noise",
        )?;
        let uncertainty_mean = Gauge::new(
            "kalman_denoise_uncertainty_mean",
            "Mean per-pixel corrected uncertainty",
        )?;
        let delta_abs_mean = Gauge::new(
            "kalman_denoise_delta_abs_mean",
            "Mean absolute temporal delta of the smoothed reference",
        )?;

        let motion_mean = Gauge::new(
            "kalman_denoise_motion_mean",
            "Mean block motion against the frame history",
        )?;
        let novelty_mean = Gauge::new(
            "kalman_denoise_novelty_weight_mean",
            "Mean novelty weight (diagnostic, not applied)",
        )?;
        let history_len = IntGauge::new(
            "kalman_denoise_history_len",
            "Frames currently held in the history buffer",
        )?;

        registry.register(Box::new(frames_processed.clone()))?;
        registry.register(Box::new(frame_seconds.clone()))?;
        registry.register(Box::new(gain_mean.clone()))?;
        registry.register(Box::new(measurement_noise_mean.clone()))?;
        registry.register(Box::new(uncertainty_mean.clone()))?;
        registry.register(Box::new(delta_abs_mean.clone()))?;
        registry.register(Box::new(motion_mean.clone()))?;
        registry.register(Box::new(novelty_mean.clone()))?;
        registry.register(Box::new(history_len.clone()))?;

        Ok(Self {
            registry,
            frames_processed,
            frame_seconds,
            gain_mean,
            measurement_noise_mean,
            uncertainty_mean,
            delta_abs_mean,
            motion_mean,
            novelty_mean,
            history_len,
        })
    }

    /// Updates all metrics from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        // For counters, we need to increment by the difference
        let current = self.frames_processed.get();
        if snapshot.frames_processed > current {
            self.frames_processed
                .inc_by(snapshot.frames_processed - current);
        }
        self.frame_seconds.set(snapshot.frame_seconds);

        self.gain_mean.set(snapshot.gain_mean);
        self.measurement_noise_mean
            .set(snapshot.measurement_noise_mean);
        self.uncertainty_mean.set(snapshot.uncertainty_mean);
        self.delta_abs_mean.set(snapshot.delta_abs_mean);

        // Block-matching metrics (only update if present)
        if let Some(motion) = snapshot.motion_mean {
            self.motion_mean.set(motion);
        }
        if let Some(novelty) = snapshot.novelty_mean {
            self.novelty_mean.set(novelty);
        }
        if let Some(len) = snapshot.history_len {
            self.history_len.set(len as i64);
        }
    }

    /// Frames counted so far.
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed.get()
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
