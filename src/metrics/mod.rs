//! Prometheus metrics exporter for filter monitoring.
//!
//! The registry is always available; the HTTP endpoint is compiled only
//! with the `metrics` feature.
//!
//! # Metrics Exposed
//!
//! ## Throughput
//! - `kalman_denoise_frames_processed_total` - Frames filtered
//! - `kalman_denoise_frame_seconds` - Wall time of the last frame
//!
//! ## Kalman Fields
//! - `kalman_denoise_gain_mean` - Mean per-pixel gain
//! - `kalman_denoise_measurement_noise_mean` - Mean measurement noise
//! - `kalman_denoise_uncertainty_mean` - Mean corrected uncertainty
//! - `kalman_denoise_delta_abs_mean` - Mean absolute temporal delta
//!
//! ## Block Matching
//! - `kalman_denoise_motion_mean` - Mean block motion
//! - `kalman_denoise_novelty_weight_mean` - Mean novelty weight
//! - `kalman_denoise_history_len` - Frames held in history
//!
//! # Example
//!
//! ```no_run
//! use kalman_denoise::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let snapshot = MetricsSnapshot {
//!     frames_processed: 100,
//!     gain_mean: 0.12,
//!     history_len: Some(5),
//!     ..Default::default()
//! };
//!
//! registry.update(&snapshot);
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
