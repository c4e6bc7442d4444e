//! Frame sources.
//!
//! A source supplies frames of a fixed layout and resolution, one at a
//! time, in presentation order, and signals end-of-stream by returning
//! `Ok(None)`.

use super::{Frame, NoiseInjector, PixelFormat};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while reading frames.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read frame: {0}")]
    Io(#[from] io::Error),
    #[error("source is closed")]
    Closed,
    #[error("invalid stream format: {0}")]
    InvalidFormat(String),
}

/// Properties of a video stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Channel layout.
    pub format: PixelFormat,
    /// Nominal frame rate.
    pub fps: f64,
    /// Total number of frames, when the source knows it.
    pub frame_count: Option<u64>,
}

impl StreamInfo {
    /// Size in bytes of one frame.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * self.format.channels()
    }

    /// Checks that the stream has a non-empty resolution.
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.width == 0 || self.height == 0 {
            return Err(SourceError::InvalidFormat(format!(
                "resolution {}x{} is empty",
                self.width, self.height
            )));
        }
        if !(self.fps > 0.0) {
            return Err(SourceError::InvalidFormat(format!(
                "frame rate {} must be positive",
                self.fps
            )));
        }
        Ok(())
    }
}

/// Trait for frame source implementations.
///
/// This abstraction allows swapping between file-backed input and
/// synthetic sources for testing.
pub trait FrameSource {
    /// Returns the stream properties.
    fn info(&self) -> StreamInfo;

    /// Reads the next frame, or `None` at end of stream.
    fn read(&mut self) -> Result<Option<Frame>, SourceError>;

    /// Releases the underlying handle. Further reads fail.
    fn close(&mut self);
}

/// Reads headerless raw frames (`width * height * channels` bytes each).
pub struct RawVideoSource<R> {
    reader: Option<R>,
    info: StreamInfo,
    sequence: u64,
}

impl<R: Read> RawVideoSource<R> {
    /// Wraps a reader producing raw frames described by `info`.
    pub fn new(reader: R, info: StreamInfo) -> Result<Self, SourceError> {
        info.validate()?;
        Ok(Self {
            reader: Some(reader),
            info,
            sequence: 0,
        })
    }
}

impl RawVideoSource<Box<dyn Read + Send>> {
    /// Opens a file, or standard input when `path` is `-`.
    ///
    /// The frame count is derived from the file size when possible.
    pub fn open(path: impl AsRef<Path>, mut info: StreamInfo) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let reader: Box<dyn Read + Send> = if path.as_os_str() == "-" {
            Box::new(BufReader::new(io::stdin()))
        } else {
            let file = File::open(path)?;
            let frame_bytes = info.frame_bytes() as u64;
            if frame_bytes > 0 {
                info.frame_count = Some(file.metadata()?.len() / frame_bytes);
            }
            Box::new(BufReader::new(file))
        };
        tracing::info!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            format = %info.format,
            fps = info.fps,
            frames = ?info.frame_count,
            "Opened raw video input"
        );
        Self::new(reader, info)
    }
}

impl<R: Read> FrameSource for RawVideoSource<R> {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn read(&mut self) -> Result<Option<Frame>, SourceError> {
        let reader = self.reader.as_mut().ok_or(SourceError::Closed)?;
        let mut buffer = vec![0u8; self.info.frame_bytes()];

        let mut filled = 0;
        while filled < buffer.len() {
            match reader.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(SourceError::Io(e)),
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled < buffer.len() {
            tracing::warn!(
                bytes = filled,
                expected = buffer.len(),
                "Discarding truncated trailing frame"
            );
            return Ok(None);
        }

        self.sequence += 1;
        Ok(Some(Frame::new(
            buffer,
            self.info.width,
            self.info.height,
            self.info.format,
            self.sequence,
        )))
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            tracing::debug!(frames = self.sequence, "Raw video input closed");
        }
    }
}

/// Generates a finite sequence of synthetic frames.
///
/// The pattern is a horizontal gradient with a bright square that moves
/// one pixel per frame, optionally corrupted with Gaussian noise.
pub struct SyntheticSource {
    info: StreamInfo,
    frames: u64,
    sequence: u64,
    noise: Option<NoiseInjector>,
    open: bool,
}

impl SyntheticSource {
    /// Side of the moving square in pixels.
    const SQUARE: u32 = 16;

    /// Creates a source producing `frames` frames.
    pub fn new(width: u32, height: u32, format: PixelFormat, frames: u64) -> Self {
        Self {
            info: StreamInfo {
                width,
                height,
                format,
                fps: 30.0,
                frame_count: Some(frames),
            },
            frames,
            sequence: 0,
            noise: None,
            open: true,
        }
    }

    /// Adds noise to every generated frame.
    pub fn with_noise(mut self, noise: NoiseInjector) -> Self {
        self.noise = Some(noise);
        self
    }

    fn render(&self) -> Frame {
        let (width, height) = (self.info.width, self.info.height);
        let offset = self.sequence as u32;
        let square_x = offset % width.max(1);
        let square_y = height / 4;

        let mut gray = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                let inside = x >= square_x
                    && x < square_x + Self::SQUARE
                    && y >= square_y
                    && y < square_y + Self::SQUARE;
                let value = if inside {
                    230
                } else {
                    (32 + x * 160 / width.max(1)) as u8
                };
                gray.push(value);
            }
        }

        Frame::gray(gray, width, height, self.sequence).to_format(self.info.format)
    }
}

impl FrameSource for SyntheticSource {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn read(&mut self) -> Result<Option<Frame>, SourceError> {
        if !self.open {
            return Err(SourceError::Closed);
        }
        if self.sequence >= self.frames {
            return Ok(None);
        }

        self.sequence += 1;
        let clean = self.render();
        Ok(Some(match self.noise.as_mut() {
            Some(noise) => noise.apply(&clean),
            None => clean,
        }))
    }

    fn close(&mut self) {
        self.open = false;
        tracing::debug!("Synthetic source closed");
    }
}

/// Wraps another source and corrupts every frame it yields.
pub struct NoisySource<S> {
    inner: S,
    noise: NoiseInjector,
}

impl<S: FrameSource> NoisySource<S> {
    pub fn new(inner: S, noise: NoiseInjector) -> Self {
        Self { inner, noise }
    }
}

impl<S: FrameSource> FrameSource for NoisySource<S> {
    fn info(&self) -> StreamInfo {
        self.inner.info()
    }

    fn read(&mut self) -> Result<Option<Frame>, SourceError> {
        Ok(self.inner.read()?.map(|frame| self.noise.apply(&frame)))
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

impl FrameSource for Box<dyn FrameSource> {
    fn info(&self) -> StreamInfo {
        (**self).info()
    }

    fn read(&mut self) -> Result<Option<Frame>, SourceError> {
        (**self).read()
    }

    fn close(&mut self) {
        (**self).close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn gray_info(width: u32, height: u32) -> StreamInfo {
        StreamInfo {
            width,
            height,
            format: PixelFormat::Gray8,
            fps: 25.0,
            frame_count: None,
        }
    }

    #[test]
    fn test_raw_source_reads_whole_frames() {
        let bytes: Vec<u8> = (0..32).collect();
        let mut source = RawVideoSource::new(Cursor::new(bytes), gray_info(4, 4)).unwrap();

        let first = source.read().unwrap().unwrap();
        assert_eq!(first.sequence(), 1);
        assert_eq!(first.pixels()[0], 0);

        let second = source.read().unwrap().unwrap();
        assert_eq!(second.pixels()[0], 16);

        assert!(source.read().unwrap().is_none());
    }

    #[test]
    fn test_raw_source_drops_truncated_tail() {
        let bytes = vec![7u8; 20];
        let mut source = RawVideoSource::new(Cursor::new(bytes), gray_info(4, 4)).unwrap();

        assert!(source.read().unwrap().is_some());
        assert!(source.read().unwrap().is_none());
    }

    #[test]
    fn test_raw_source_closed() {
        let mut source = RawVideoSource::new(Cursor::new(vec![0u8; 16]), gray_info(4, 4)).unwrap();
        source.close();
        assert!(matches!(source.read(), Err(SourceError::Closed)));
    }

    #[test]
    fn test_invalid_info_rejected() {
        let result = RawVideoSource::new(Cursor::new(Vec::new()), gray_info(0, 4));
        assert!(matches!(result, Err(SourceError::InvalidFormat(_))));
    }

    #[test]
    fn test_synthetic_source_lifecycle() {
        let mut source = SyntheticSource::new(32, 24, PixelFormat::Bgr24, 3);

        for expected in 1..=3 {
            let frame = source.read().unwrap().unwrap();
            assert!(frame.is_valid());
            assert_eq!(frame.sequence(), expected);
            assert_eq!(frame.format(), PixelFormat::Bgr24);
        }
        assert!(source.read().unwrap().is_none());

        source.close();
        assert!(matches!(source.read(), Err(SourceError::Closed)));
    }

    #[test]
    fn test_synthetic_square_moves() {
        let mut source = SyntheticSource::new(32, 32, PixelFormat::Gray8, 2);
        let a = source.read().unwrap().unwrap();
        let b = source.read().unwrap().unwrap();
        assert_ne!(a.pixels(), b.pixels());
    }

    #[test]
    fn test_noisy_source_keeps_layout() {
        let inner: Box<dyn FrameSource> =
            Box::new(SyntheticSource::new(16, 8, PixelFormat::Bgr24, 2));
        let mut source = NoisySource::new(inner, NoiseInjector::with_seed(20.0, 3));

        let clean = SyntheticSource::new(16, 8, PixelFormat::Bgr24, 1)
            .read()
            .unwrap()
            .unwrap();
        let noisy = source.read().unwrap().unwrap();

        assert_eq!(source.info().format, PixelFormat::Bgr24);
        assert_eq!(noisy.dimensions(), (16, 8));
        assert!(noisy.is_valid());
        assert_ne!(noisy.pixels(), clean.pixels());
        assert!(source.read().unwrap().is_some());
        assert!(source.read().unwrap().is_none());
    }
}
