//! Frame type representing one 8-bit video frame with metadata.

use crate::imgproc::{expand_gray, gray_from_bgr};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Channel layout of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// One 8-bit luma channel.
    Gray8,
    /// Three interleaved 8-bit channels in blue, green, red order.
    Bgr24,
}

impl PixelFormat {
    /// Number of interleaved channels.
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Bgr24 => 3,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelFormat::Gray8 => f.write_str("gray8"),
            PixelFormat::Bgr24 => f.write_str("bgr24"),
        }
    }
}

/// A single video frame.
///
/// Holds interleaved pixel data along with the metadata the pipeline
/// needs to keep frames in presentation order.
#[derive(Clone)]
pub struct Frame {
    /// Interleaved pixel data.
    pixels: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Channel layout.
    format: PixelFormat,
    /// Time the frame entered the process.
    timestamp: Instant,
    /// Monotonic sequence number.
    sequence: u64,
}

impl Frame {
    /// Creates a new frame with the given parameters.
    pub fn new(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        sequence: u64,
    ) -> Self {
        Self {
            pixels,
            width,
            height,
            format,
            timestamp: Instant::now(),
            sequence,
        }
    }

    /// Creates a single-channel frame.
    pub fn gray(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self::new(pixels, width, height, PixelFormat::Gray8, sequence)
    }

    /// Creates a frame where every pixel has the same gray level.
    pub fn uniform(width: u32, height: u32, format: PixelFormat, level: u8, sequence: u64) -> Self {
        let len = width as usize * height as usize * format.channels();
        Self::new(vec![level; len], width, height, format, sequence)
    }

    /// Returns a reference to the raw pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns the capture timestamp.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Number of bytes the pixel buffer should hold.
    #[inline]
    pub fn expected_len(&self) -> usize {
        self.pixel_count() * self.format.channels()
    }

    /// Returns true if the frame carries no pixels.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty() || self.pixel_count() == 0
    }

    /// Validates that the pixel buffer size matches dimensions.
    pub fn is_valid(&self) -> bool {
        !self.is_empty() && self.pixels.len() == self.expected_len()
    }

    /// Converts the frame to another channel layout.
    ///
    /// Gray to BGR replicates the luma channel; BGR to gray applies the
    /// BT.601 luma weights. Metadata is preserved.
    pub fn to_format(&self, format: PixelFormat) -> Frame {
        let pixels = match (self.format, format) {
            (PixelFormat::Gray8, PixelFormat::Bgr24) => expand_gray(&self.pixels, format),
            (PixelFormat::Bgr24, PixelFormat::Gray8) => gray_from_bgr(&self.pixels),
            _ => self.pixels.clone(),
        };
        Frame {
            pixels,
            width: self.width,
            height: self.height,
            format,
            timestamp: self.timestamp,
            sequence: self.sequence,
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}
