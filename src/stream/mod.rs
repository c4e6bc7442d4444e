//! Video frame input and output.
//!
//! Frames enter through a [`FrameSource`] and leave through a
//! [`FrameSink`]. Both ends are external collaborators of the filter: the
//! filter never chooses containers or codecs, it only sees fixed-layout
//! 8-bit frames in presentation order.

mod frame;
mod noise;
mod sink;
mod source;

pub use frame::{Frame, PixelFormat};
pub use noise::NoiseInjector;
pub use sink::{FrameSink, MemorySink, RawVideoSink, SinkError};
pub use source::{
    FrameSource, NoisySource, RawVideoSource, SourceError, StreamInfo, SyntheticSource,
};
