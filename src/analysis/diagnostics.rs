//! Per-frame summary of the filter fields.

use super::PlaneStatistics;
use crate::filter::{FilterMode, KalmanState};
use crate::imgproc::Plane;
use serde::Serialize;

/// Snapshot of the filter after one frame.
///
/// Motion, novelty and history length are only reported by the
/// block-matching mode.
#[derive(Debug, Clone, Serialize)]
pub struct FrameDiagnostics {
    /// Filter variant.
    pub mode: FilterMode,
    /// Frames processed so far.
    pub frames_processed: u64,
    /// Kalman gain.
    pub gain: PlaneStatistics,
    /// Measurement noise.
    pub measurement_noise: PlaneStatistics,
    /// Corrected uncertainty.
    pub uncertainty: PlaneStatistics,
    /// Corrected state estimate.
    pub estimate: PlaneStatistics,
    /// Temporal delta of the smoothed reference.
    pub delta: PlaneStatistics,
    /// Block motion measure.
    pub motion: Option<PlaneStatistics>,
    /// Novelty weight (computed, not applied to the correction).
    pub novelty: Option<PlaneStatistics>,
    /// Entries in the frame history.
    pub history_len: Option<usize>,
}

impl FrameDiagnostics {
    /// Summarizes the Kalman fields.
    pub fn from_state(mode: FilterMode, frames_processed: u64, state: &KalmanState) -> Self {
        Self {
            mode,
            frames_processed,
            gain: PlaneStatistics::analyze(state.gain()),
            measurement_noise: PlaneStatistics::analyze(state.measurement_noise()),
            uncertainty: PlaneStatistics::analyze(state.p_correction()),
            estimate: PlaneStatistics::analyze(state.x_correction()),
            delta: PlaneStatistics::analyze(state.delta()),
            motion: None,
            novelty: None,
            history_len: None,
        }
    }

    /// Adds the block-matching fields.
    pub fn with_motion(mut self, motion: &Plane, novelty: &Plane, history_len: usize) -> Self {
        self.motion = Some(PlaneStatistics::analyze(motion));
        self.novelty = Some(PlaneStatistics::analyze(novelty));
        self.history_len = Some(history_len);
        self
    }

    /// Iterates over every summarized field with its name.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &PlaneStatistics)> {
        [
            ("gain", Some(&self.gain)),
            ("measurement_noise", Some(&self.measurement_noise)),
            ("uncertainty", Some(&self.uncertainty)),
            ("estimate", Some(&self.estimate)),
            ("delta", Some(&self.delta)),
            ("motion", self.motion.as_ref()),
            ("novelty", self.novelty.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, stats)| stats.map(|s| (name, s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_initial_state() {
        let state = KalmanState::new(Plane::filled(4, 4, 10.0), 5.0);
        let diag = FrameDiagnostics::from_state(FilterMode::Recursive, 0, &state);

        assert_eq!(diag.gain.mean, 0.5);
        assert_eq!(diag.measurement_noise.mean, 5.0);
        assert_eq!(diag.estimate.mean, 10.0);
        assert!(diag.motion.is_none());
        assert_eq!(diag.fields().count(), 5);
    }

    #[test]
    fn test_with_motion_adds_fields() {
        let state = KalmanState::new(Plane::zeros(2, 2), 5.0);
        let diag = FrameDiagnostics::from_state(FilterMode::BlockMatching, 1, &state)
            .with_motion(&Plane::zeros(2, 2), &Plane::filled(2, 2, 1.0), 2);

        assert_eq!(diag.novelty.unwrap().mean, 1.0);
        assert_eq!(diag.history_len, Some(2));
        assert_eq!(diag.fields().count(), 7);
    }
}
