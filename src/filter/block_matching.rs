//! History/block-matching filter.

use super::{
    block_motion, check_frame, novelty_weights, Denoiser, FilterError, FilterMode, HistoryBuffer,
    KalmanState,
};
use crate::analysis::FrameDiagnostics;
use crate::config::BlockMatchingConfig;
use crate::imgproc::{bilateral_filter, box_filter, expand_gray, quantize, to_gray_plane, Plane};
use crate::stream::{Frame, PixelFormat};

/// Kalman filter whose process noise follows the temporal change of a
/// box-smoothed reference, with block-wise motion measured against a
/// short history of corrected frames.
///
/// Output frames keep the channel layout of the input.
pub struct BlockMatchingFilter {
    config: BlockMatchingConfig,
    state: KalmanState,
    history: HistoryBuffer,
    /// Motion measure of the last frame.
    motion: Plane,
    /// Novelty weight of the last frame. Diagnostic only: it does not
    /// enter the correction.
    novelty: Plane,
    width: u32,
    height: u32,
    frames_processed: u64,
}

impl BlockMatchingFilter {
    /// Initializes the filter from the first frame of a stream.
    ///
    /// The state estimate starts at the frame's grayscale value and the
    /// history holds that frame as its only entry.
    pub fn new(first: &Frame, config: BlockMatchingConfig) -> Result<Self, FilterError> {
        config.validate()?;
        check_frame(first, None)?;

        let (width, height) = first.dimensions();
        let initial = to_gray_plane(
            first.pixels(),
            width as usize,
            height as usize,
            first.format(),
        )?;

        let mut history = HistoryBuffer::new(config.history_capacity);
        history.push(&initial);

        Ok(Self {
            motion: Plane::zeros(width as usize, height as usize),
            novelty: Plane::filled(width as usize, height as usize, 1.0),
            state: KalmanState::new(initial, config.initial_noise),
            history,
            config,
            width,
            height,
            frames_processed: 0,
        })
    }

    /// Initializes with the default parameters.
    pub fn with_defaults(first: &Frame) -> Result<Self, FilterError> {
        Self::new(first, BlockMatchingConfig::default())
    }

    pub fn config(&self) -> &BlockMatchingConfig {
        &self.config
    }

    /// Past corrected frames used for motion measurement.
    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Block motion measured for the last frame.
    pub fn motion(&self) -> &Plane {
        &self.motion
    }

    /// Novelty weights `exp(-m² / 2σc²)` of the last frame.
    pub fn novelty_weights(&self) -> &Plane {
        &self.novelty
    }
}

impl Denoiser for BlockMatchingFilter {
    fn mode(&self) -> FilterMode {
        FilterMode::BlockMatching
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn process(&mut self, frame: &Frame) -> Result<Frame, FilterError> {
        check_frame(frame, Some((self.width, self.height)))?;

        // Everything fallible runs before the first state mutation
        let observed = to_gray_plane(
            frame.pixels(),
            self.width as usize,
            self.height as usize,
            frame.format(),
        )?;
        let smoothed = box_filter(&observed, self.config.prefilter_window)?;
        let motion = block_motion(&smoothed, &self.history, self.config.block_size)?;
        let bilateral = bilateral_filter(&observed, &self.config.bilateral())?;

        self.state.update_delta(&smoothed)?;
        self.state.update_measurement_noise();
        self.state.predict(self.config.process_noise);
        self.state.update_gain();
        self.novelty = novelty_weights(&motion, self.config.novelty_sigma);
        self.motion = motion;
        self.state.correct(&observed, &bilateral)?;
        self.history.push(self.state.x_correction());
        self.frames_processed += 1;

        tracing::trace!(
            frame = frame.sequence(),
            history = self.history.len(),
            "Block-matching correction applied"
        );

        let gray = quantize(self.state.x_correction());
        Ok(Frame::new(
            expand_gray(&gray, frame.format()),
            self.width,
            self.height,
            frame.format(),
            frame.sequence(),
        ))
    }

    fn state(&self) -> &KalmanState {
        &self.state
    }

    fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    fn diagnostics(&self) -> FrameDiagnostics {
        FrameDiagnostics::from_state(self.mode(), self.frames_processed, &self.state)
            .with_motion(&self.motion, &self.novelty, self.history.len())
    }

    fn output_format(&self, input: PixelFormat) -> PixelFormat {
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_frame(width: u32, height: u32, level: u8, sequence: u64) -> Frame {
        Frame::uniform(width, height, PixelFormat::Gray8, level, sequence)
    }

    #[test]
    fn test_initial_estimate_is_first_frame() {
        let first = Frame::gray((0..64).collect(), 8, 8, 0);
        let filter = BlockMatchingFilter::with_defaults(&first).unwrap();

        let expected: Vec<f32> = (0..64).map(|v| v as f32).collect();
        assert_eq!(filter.state().x_correction().data(), expected.as_slice());
        assert_eq!(filter.history().len(), 1);
    }

    #[test]
    fn test_output_keeps_layout_and_size() {
        let first = Frame::uniform(20, 12, PixelFormat::Bgr24, 60, 0);
        let mut filter = BlockMatchingFilter::with_defaults(&first).unwrap();

        let out = filter.process(&first).unwrap();
        assert_eq!(out.dimensions(), (20, 12));
        assert_eq!(out.format(), PixelFormat::Bgr24);
        assert!(out.is_valid());
    }

    #[test]
    fn test_constant_sequence_converges() {
        let first = gray_frame(4, 4, 128, 0);
        let mut filter = BlockMatchingFilter::with_defaults(&first).unwrap();

        let mut uncertainties = Vec::new();
        for i in 1..=10 {
            let out = filter.process(&gray_frame(4, 4, 128, i)).unwrap();
            assert!(out.pixels().iter().all(|&v| v == 128));
            uncertainties.push(filter.state().p_correction().get(0, 0));
        }

        assert!(uncertainties.windows(2).all(|w| w[1] < w[0]));
        assert!(filter
            .state()
            .x_correction()
            .data()
            .iter()
            .all(|&v| (v - 128.0).abs() < 1e-3));
        assert!(filter.motion().data().iter().all(|&v| v == 0.0));
        assert!(filter.state().delta().data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_history_bounded_by_capacity() {
        let first = gray_frame(16, 16, 50, 0);
        let config = BlockMatchingConfig {
            history_capacity: 3,
            ..Default::default()
        };
        let mut filter = BlockMatchingFilter::new(&first, config).unwrap();

        for i in 1..=6 {
            filter.process(&gray_frame(16, 16, 50, i)).unwrap();
            assert!(filter.history().len() <= 3);
        }
        assert_eq!(filter.history().len(), 3);
    }

    #[test]
    fn test_dimension_mismatch_leaves_state_untouched() {
        let first = gray_frame(8, 8, 40, 0);
        let mut filter = BlockMatchingFilter::with_defaults(&first).unwrap();
        filter.process(&gray_frame(8, 8, 45, 1)).unwrap();

        let before = filter.state().clone();
        let history_before = filter.history().len();

        let result = filter.process(&gray_frame(16, 8, 45, 2));
        assert!(matches!(
            result,
            Err(FilterError::DimensionMismatch {
                expected: (8, 8),
                got: (16, 8)
            })
        ));

        assert_eq!(filter.state().x_correction(), before.x_correction());
        assert_eq!(filter.state().p_correction(), before.p_correction());
        assert_eq!(filter.state().gain(), before.gain());
        assert_eq!(filter.state().measurement_noise(), before.measurement_noise());
        assert_eq!(filter.history().len(), history_before);
        assert_eq!(filter.frames_processed(), 1);
    }

    #[test]
    fn test_motion_detected_on_change() {
        let first = gray_frame(16, 16, 20, 0);
        let mut filter = BlockMatchingFilter::with_defaults(&first).unwrap();
        filter.process(&gray_frame(16, 16, 120, 1)).unwrap();

        assert!(filter.motion().get(0, 0) > 0.0);
        assert!(filter.novelty_weights().get(0, 0) < 1.0);
        let diagnostics = filter.diagnostics();
        assert!(diagnostics.motion.is_some());
        assert_eq!(diagnostics.history_len, Some(2));
    }
}
