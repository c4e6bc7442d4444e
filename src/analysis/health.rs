//! Numerical health monitoring of the filter fields.
//!
//! A non-finite value in any field is fatal: it would propagate into every
//! later frame through the recurrence. A gain outside `[0, 1]` is only
//! reported, since the recurrence does not clamp it.

use super::FrameDiagnostics;

/// Health violation types.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HealthViolation {
    #[error("{count} non-finite values in {field}")]
    NonFinite { field: &'static str, count: usize },
}

/// Running health counters.
#[derive(Debug, Clone, Default)]
pub struct HealthMetrics {
    /// Frames checked.
    pub frames_checked: u64,
    /// Frames whose gain left `[0, 1]`.
    pub gain_out_of_range: u64,
    /// Most recent violation, if any.
    pub last_violation: Option<HealthViolation>,
}

/// Checks every frame's diagnostics for numerical failure.
#[derive(Debug)]
pub struct HealthMonitor {
    metrics: HealthMetrics,
    gain_was_in_range: bool,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self {
            metrics: HealthMetrics::default(),
            gain_was_in_range: true,
        }
    }

    /// Checks one frame. Fails on the first non-finite field.
    pub fn check(&mut self, diagnostics: &FrameDiagnostics) -> Result<(), HealthViolation> {
        self.metrics.frames_checked += 1;

        if let Some((field, stats)) = diagnostics.fields().find(|(_, s)| !s.is_finite()) {
            let violation = HealthViolation::NonFinite {
                field,
                count: stats.non_finite,
            };
            tracing::warn!(
                frame = diagnostics.frames_processed,
                violation = %violation,
                "Filter state became non-finite"
            );
            self.metrics.last_violation = Some(violation.clone());
            return Err(violation);
        }

        let gain = &diagnostics.gain;
        let in_range = gain.min >= 0.0 && gain.max <= 1.0;
        if !in_range {
            self.metrics.gain_out_of_range += 1;
            if self.gain_was_in_range {
                tracing::warn!(
                    frame = diagnostics.frames_processed,
                    min = gain.min,
                    max = gain.max,
                    "Kalman gain left [0, 1]"
                );
            }
        }
        self.gain_was_in_range = in_range;

        tracing::trace!(
            gain = gain.mean,
            noise = diagnostics.measurement_noise.mean,
            uncertainty = diagnostics.uncertainty.mean,
            "Health check passed"
        );
        Ok(())
    }

    /// Returns current health metrics.
    pub fn metrics(&self) -> &HealthMetrics {
        &self.metrics
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}
