//! Kalman Video Denoising Library
//!
//! Frame-by-frame video denoising with a per-pixel recursive estimator.
//! Process noise follows the temporal change of a smoothed reference image,
//! and the correction fuses the prediction with an edge-preserving
//! (bilateral) copy of the current frame.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! stream (source) → filter → stream (sink)
//!                     ↓
//!        analysis (diagnostics, health) → metrics
//! ```
//!
//! `imgproc` supplies the image primitives the filter is built on, and
//! `pipeline` drives one stream through one filter instance.
//!
//! # Design Principles
//!
//! - **Sequential in time**: frame *k* depends on frame *k-1*, so frames are
//!   processed in arrival order by a single filter instance
//! - **Parallel in space**: per-row and per-block work runs on `rayon`
//! - **Atomic per frame**: a rejected frame leaves the filter state untouched
//! - **Fail-closed numerics**: a non-finite field aborts the stream
//!
//! # Example
//!
//! ```no_run
//! use kalman_denoise::{
//!     config::FilterConfig,
//!     pipeline::StreamProcessor,
//!     stream::{FrameSource, MemorySink, PixelFormat, SyntheticSource},
//! };
//!
//! let mut source = SyntheticSource::new(320, 240, PixelFormat::Bgr24, 60);
//! let mut sink = MemorySink::new(source.info());
//!
//! let summary = StreamProcessor::new(FilterConfig::default())
//!     .run(&mut source, &mut sink)
//!     .unwrap();
//!
//! println!("{} frames at {:.1} fps", summary.frames_written, summary.fps());
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod config;
pub mod filter;
pub mod imgproc;
pub mod metrics;
pub mod pipeline;
pub mod stream;

// Re-export commonly used types at crate root
pub use analysis::{FrameDiagnostics, HealthMonitor};
pub use config::{FileConfig, FilterConfig};
pub use filter::{
    create_denoiser, BlockMatchingFilter, Denoiser, Device, FilterError, FilterMode,
    KalmanState, RecursiveFilter,
};
pub use imgproc::Plane;
pub use pipeline::{PipelineError, StreamProcessor, StreamSummary};
pub use stream::{Frame, FrameSink, FrameSource, PixelFormat};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
