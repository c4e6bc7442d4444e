//! Frame sinks.

use super::{Frame, PixelFormat, StreamInfo};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while writing frames.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write frame: {0}")]
    Io(#[from] io::Error),
    #[error("frame {got:?} does not match sink layout {expected:?}")]
    FormatMismatch {
        expected: (u32, u32, PixelFormat),
        got: (u32, u32, PixelFormat),
    },
    #[error("sink is closed")]
    Closed,
}

/// Trait for frame sink implementations.
pub trait FrameSink {
    /// Returns the layout every written frame must have.
    fn info(&self) -> StreamInfo;

    /// Accepts one output frame.
    fn write(&mut self, frame: &Frame) -> Result<(), SinkError>;

    /// Flushes buffered output and closes the sink. Idempotent.
    fn finish(&mut self) -> Result<(), SinkError>;
}

fn check_layout(info: &StreamInfo, frame: &Frame) -> Result<(), SinkError> {
    let expected = (info.width, info.height, info.format);
    let got = (frame.width(), frame.height(), frame.format());
    if expected != got || !frame.is_valid() {
        return Err(SinkError::FormatMismatch { expected, got });
    }
    Ok(())
}

/// Writes headerless raw frames to any writer.
pub struct RawVideoSink<W: Write> {
    writer: Option<BufWriter<W>>,
    info: StreamInfo,
    frames_written: u64,
}

impl<W: Write> RawVideoSink<W> {
    pub fn new(writer: W, info: StreamInfo) -> Self {
        Self {
            writer: Some(BufWriter::new(writer)),
            info,
            frames_written: 0,
        }
    }

    /// Number of frames accepted so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl RawVideoSink<File> {
    /// Creates the output file, making parent directories as needed.
    pub fn create(path: impl AsRef<Path>, info: StreamInfo) -> Result<Self, SinkError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file = File::create(path)?;
        tracing::info!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            format = %info.format,
            "Opened raw video output"
        );
        Ok(Self::new(file, info))
    }
}

impl<W: Write> FrameSink for RawVideoSink<W> {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn write(&mut self, frame: &Frame) -> Result<(), SinkError> {
        let writer = self.writer.as_mut().ok_or(SinkError::Closed)?;
        check_layout(&self.info, frame)?;
        writer.write_all(frame.pixels())?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            tracing::debug!(frames = self.frames_written, "Raw video output finalized");
        }
        Ok(())
    }
}

impl<W: Write> Drop for RawVideoSink<W> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            tracing::warn!(error = %e, "Failed to flush output on drop");
        }
    }
}

/// Collects frames in memory.
#[derive(Debug)]
pub struct MemorySink {
    info: StreamInfo,
    frames: Vec<Frame>,
    finished: bool,
}

impl MemorySink {
    pub fn new(info: StreamInfo) -> Self {
        Self {
            info,
            frames: Vec::new(),
            finished: false,
        }
    }

    /// Frames written so far, in order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Returns true once [`FrameSink::finish`] has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for MemorySink {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn write(&mut self, frame: &Frame) -> Result<(), SinkError> {
        if self.finished {
            return Err(SinkError::Closed);
        }
        check_layout(&self.info, frame)?;
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(format: PixelFormat) -> StreamInfo {
        StreamInfo {
            width: 2,
            height: 2,
            format,
            fps: 30.0,
            frame_count: None,
        }
    }

    #[test]
    fn test_raw_sink_writes_bytes() {
        let mut buffer = Vec::new();
        {
            let mut sink = RawVideoSink::new(&mut buffer, info(PixelFormat::Gray8));
            sink.write(&Frame::gray(vec![1, 2, 3, 4], 2, 2, 1)).unwrap();
            sink.write(&Frame::gray(vec![5, 6, 7, 8], 2, 2, 2)).unwrap();
            assert_eq!(sink.frames_written(), 2);
            sink.finish().unwrap();
        }
        assert_eq!(buffer, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_raw_sink_rejects_wrong_layout() {
        let mut sink = RawVideoSink::new(Vec::new(), info(PixelFormat::Bgr24));
        let result = sink.write(&Frame::gray(vec![0; 4], 2, 2, 1));
        assert!(matches!(result, Err(SinkError::FormatMismatch { .. })));
    }

    #[test]
    fn test_raw_sink_closed_after_finish() {
        let mut sink = RawVideoSink::new(Vec::new(), info(PixelFormat::Gray8));
        sink.finish().unwrap();
        sink.finish().unwrap();
        let result = sink.write(&Frame::gray(vec![0; 4], 2, 2, 1));
        assert!(matches!(result, Err(SinkError::Closed)));
    }

    #[test]
    fn test_memory_sink_collects() {
        let mut sink = MemorySink::new(info(PixelFormat::Gray8));
        sink.write(&Frame::gray(vec![9; 4], 2, 2, 1)).unwrap();
        sink.finish().unwrap();

        assert_eq!(sink.frames().len(), 1);
        assert!(sink.is_finished());
        assert!(sink.write(&Frame::gray(vec![9; 4], 2, 2, 2)).is_err());
    }
}
