//! Adaptive spatio-temporal Kalman filter.
//!
//! Each pixel carries a recursive brightness estimate whose process noise
//! is driven by the temporal change of a smoothed reference image. The
//! correction blends the prediction with the raw observation and with a
//! bilateral-smoothed copy of it.
//!
//! Two variants share the [`KalmanState`] recurrence:
//!
//! - [`BlockMatchingFilter`] keeps a short history of corrected
//!   frames and measures block-wise change against it.
//! - [`RecursiveFilter`] keeps no history; it cascades bilateral
//!   passes and finishes with an exponential temporal blend.
//!
//! Frames must be fed in presentation order. A filter instance belongs to
//! one stream; per-pixel state is never shared between instances.

mod block_matching;
mod history;
mod motion;
mod recursive;
mod state;

pub use block_matching::BlockMatchingFilter;
pub use history::HistoryBuffer;
pub use motion::{block_motion, novelty_weights};
pub use recursive::RecursiveFilter;
pub use state::KalmanState;

use crate::analysis::FrameDiagnostics;
use crate::config::{ConfigError, FilterConfig};
use crate::imgproc::ImageError;
use crate::stream::{Frame, PixelFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while filtering a frame.
///
/// A failed call leaves every retained field of the filter untouched.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("frame has no content")]
    EmptyInput,
    #[error("frame is {got:?}, stream resolution is {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        got: (u32, u32),
    },
    #[error("frame buffer holds {got} bytes, expected {expected}")]
    MalformedFrame { expected: usize, got: usize },
    #[error("image operation failed: {0}")]
    Image(#[from] ImageError),
    #[error("invalid filter configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Filter variant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum FilterMode {
    /// History/block-matching driven, the CPU path.
    #[default]
    BlockMatching,
    /// Recursive-noise driven with no frame history, the accelerated path.
    Recursive,
}

impl FilterMode {
    /// Mode chosen for an execution device.
    ///
    /// The non-accelerated path runs block matching; the accelerated path
    /// runs the history-free recursive variant.
    pub fn for_device(device: Device) -> Self {
        match device {
            Device::Cpu => FilterMode::BlockMatching,
            Device::Accelerated => FilterMode::Recursive,
        }
    }
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterMode::BlockMatching => f.write_str("block-matching"),
            FilterMode::Recursive => f.write_str("recursive"),
        }
    }
}

/// Execution substrate reported by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    /// No accelerator present.
    Cpu,
    /// A massively parallel accelerator is present.
    Accelerated,
}

/// Common interface of both filter variants.
pub trait Denoiser: Send {
    /// The variant this instance implements.
    fn mode(&self) -> FilterMode;

    /// Stream resolution fixed by the first frame.
    fn dimensions(&self) -> (u32, u32);

    /// Filters one frame and returns the quantized output.
    fn process(&mut self, frame: &Frame) -> Result<Frame, FilterError>;

    /// Current per-pixel state.
    fn state(&self) -> &KalmanState;

    /// Number of frames processed since construction.
    fn frames_processed(&self) -> u64;

    /// Summary of the fields after the most recent frame.
    fn diagnostics(&self) -> FrameDiagnostics;

    /// Channel layout of frames returned for an input layout.
    fn output_format(&self, input: PixelFormat) -> PixelFormat;
}

/// Builds the filter selected by `config`, initialized from `first`.
pub fn create_denoiser(
    first: &Frame,
    config: &FilterConfig,
) -> Result<Box<dyn Denoiser>, FilterError> {
    let denoiser: Box<dyn Denoiser> = match config.mode {
        FilterMode::BlockMatching => Box::new(BlockMatchingFilter::new(
            first,
            config.block_matching.clone(),
        )?),
        FilterMode::Recursive => {
            Box::new(RecursiveFilter::new(first, config.recursive.clone())?)
        }
    };
    tracing::info!(
        mode = %config.mode,
        width = first.width(),
        height = first.height(),
        "Filter initialized from first frame"
    );
    Ok(denoiser)
}

/// Rejects empty, malformed or wrongly sized frames.
pub(crate) fn check_frame(frame: &Frame, expected: Option<(u32, u32)>) -> Result<(), FilterError> {
    if frame.is_empty() {
        return Err(FilterError::EmptyInput);
    }
    if let Some(expected) = expected {
        if frame.dimensions() != expected {
            return Err(FilterError::DimensionMismatch {
                expected,
                got: frame.dimensions(),
            });
        }
    }
    if frame.pixels().len() != frame.expected_len() {
        return Err(FilterError::MalformedFrame {
            expected: frame.expected_len(),
            got: frame.pixels().len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_for_device() {
        assert_eq!(FilterMode::for_device(Device::Cpu), FilterMode::BlockMatching);
        assert_eq!(
            FilterMode::for_device(Device::Accelerated),
            FilterMode::Recursive
        );
    }

    #[test]
    fn test_create_each_mode() {
        let first = Frame::uniform(16, 16, PixelFormat::Bgr24, 90, 0);
        let mut config = FilterConfig::default();

        let a = create_denoiser(&first, &config).unwrap();
        assert_eq!(a.mode(), FilterMode::BlockMatching);
        assert_eq!(a.output_format(PixelFormat::Bgr24), PixelFormat::Bgr24);

        config.mode = FilterMode::Recursive;
        let b = create_denoiser(&first, &config).unwrap();
        assert_eq!(b.mode(), FilterMode::Recursive);
        assert_eq!(b.output_format(PixelFormat::Bgr24), PixelFormat::Gray8);
    }

    #[test]
    fn test_create_rejects_invalid_config() {
        let first = Frame::uniform(8, 8, PixelFormat::Gray8, 0, 0);
        let mut config = FilterConfig::default();
        config.block_matching.history_capacity = 0;
        assert!(matches!(
            create_denoiser(&first, &config),
            Err(FilterError::Config(ConfigError::InvalidHistory))
        ));
    }

    #[test]
    fn test_check_frame() {
        let ok = Frame::uniform(4, 4, PixelFormat::Gray8, 1, 0);
        assert!(check_frame(&ok, Some((4, 4))).is_ok());

        assert!(matches!(
            check_frame(&ok, Some((8, 4))),
            Err(FilterError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            check_frame(&Frame::gray(Vec::new(), 4, 4, 0), None),
            Err(FilterError::EmptyInput)
        ));
        assert!(matches!(
            check_frame(&Frame::gray(vec![0; 5], 4, 4, 0), None),
            Err(FilterError::MalformedFrame { .. })
        ));
    }
}
