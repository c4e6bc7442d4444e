//! Recursive-noise filter without frame history.

use super::{check_frame, Denoiser, FilterError, FilterMode, KalmanState};
use crate::analysis::FrameDiagnostics;
use crate::config::RecursiveConfig;
use crate::imgproc::{bilateral_filter, box_filter, quantize, to_gray_plane, ImageError, Plane};
use crate::stream::{Frame, PixelFormat};

/// Kalman filter without frame history.
///
/// Novelty comes only from the frame-to-frame change of the box-smoothed
/// image. The observation is smoothed by cascaded bilateral passes, and
/// the corrected estimate is low-passed against the previous correction.
///
/// Output frames are single-channel; the caller expands channels.
pub struct RecursiveFilter {
    config: RecursiveConfig,
    state: KalmanState,
    /// Corrected estimate of the previous frame, after blending.
    previous: Plane,
    width: u32,
    height: u32,
    frames_processed: u64,
}

impl RecursiveFilter {
    /// Initializes the filter from the first frame of a stream.
    pub fn new(first: &Frame, config: RecursiveConfig) -> Result<Self, FilterError> {
        config.validate()?;
        check_frame(first, None)?;

        let (width, height) = first.dimensions();
        let initial = to_gray_plane(
            first.pixels(),
            width as usize,
            height as usize,
            first.format(),
        )?;

        Ok(Self {
            previous: initial.clone(),
            state: KalmanState::new(initial, config.initial_noise),
            config,
            width,
            height,
            frames_processed: 0,
        })
    }

    /// Initializes with the default parameters.
    pub fn with_defaults(first: &Frame) -> Result<Self, FilterError> {
        Self::new(first, RecursiveConfig::default())
    }

    pub fn config(&self) -> &RecursiveConfig {
        &self.config
    }

    /// Blended estimate carried into the next frame.
    pub fn previous_correction(&self) -> &Plane {
        &self.previous
    }

    /// Runs the configured number of bilateral passes over `observed`.
    fn cascade(&self, observed: &Plane) -> Result<Plane, ImageError> {
        let params = self.config.bilateral();
        let mut smoothed = bilateral_filter(observed, &params)?;
        for _ in 1..self.config.bilateral_passes {
            smoothed = bilateral_filter(&smoothed, &params)?;
        }
        Ok(smoothed)
    }
}

impl Denoiser for RecursiveFilter {
    fn mode(&self) -> FilterMode {
        FilterMode::Recursive
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn process(&mut self, frame: &Frame) -> Result<Frame, FilterError> {
        check_frame(frame, Some((self.width, self.height)))?;

        let observed = to_gray_plane(
            frame.pixels(),
            self.width as usize,
            self.height as usize,
            frame.format(),
        )?;
        let reference = box_filter(&observed, self.config.mask_size)?;
        let bilateral = self.cascade(&observed)?;

        self.state.update_delta(&reference)?;
        self.state.update_measurement_noise();
        self.state.predict(self.config.process_noise);
        self.state.update_gain();
        self.state.correct(&observed, &bilateral)?;
        self.state
            .blend_with(&self.previous, self.config.temporal_blend)?;
        self.previous.copy_from(self.state.x_correction())?;
        self.frames_processed += 1;

        tracing::trace!(frame = frame.sequence(), "Recursive correction applied");

        Ok(Frame::gray(
            quantize(self.state.x_correction()),
            self.width,
            self.height,
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
    }

    fn output_format(&self, _input: PixelFormat) -> PixelFormat {
        PixelFormat::Gray8
    }
}
