//! Stream driver: source → filter → sink.
//!
//! The first frame fixes the stream resolution and initializes the filter.
//! Every input frame, the first included, yields one output frame.
//!
//! # Error policy
//!
//! - A source failure before the first frame is fatal. Later source
//!   failures end the stream normally after a warning.
//! - An empty frame, a filter error or a sink rejection aborts the stream.
//! - A non-finite filter field aborts the stream before the frame is
//!   written.
//!
//! The sink is finished on every exit path, so frames written before a
//! failure stay intact.

use crate::analysis::{HealthMonitor, HealthViolation};
use crate::config::FilterConfig;
use crate::filter::{create_denoiser, Denoiser, FilterError, FilterMode};
use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use crate::stream::{Frame, FrameSink, FrameSource, SinkError, SourceError, StreamInfo};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors that abort a stream.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source failed before the first frame: {0}")]
    UpstreamReadFailure(#[source] SourceError),
    #[error("source supplied no frames")]
    NoFrames,
    #[error("frame {sequence} has no content")]
    EmptyInput { sequence: u64 },
    #[error("filter failed: {0}")]
    Filter(#[from] FilterError),
    #[error("sink rejected output: {0}")]
    SinkWriteFailure(#[source] SinkError),
    #[error("numerical failure: {0}")]
    NumericalFailure(#[from] HealthViolation),
}

/// Outcome of a completed stream.
#[derive(Debug, Clone, Serialize)]
pub struct StreamSummary {
    /// Filter variant that ran.
    pub mode: FilterMode,
    /// Frames taken from the source.
    pub frames_read: u64,
    /// Frames accepted by the sink.
    pub frames_written: u64,
    /// True if the stream stopped on a cancellation request.
    pub cancelled: bool,
    /// Wall-clock start of the run.
    pub started_at: DateTime<Utc>,
    /// Time spent in the run.
    pub elapsed: Duration,
}

impl StreamSummary {
    /// Average output frame rate.
    pub fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames_written as f64 / secs
        } else {
            0.0
        }
    }
}

#[derive(Debug, Default)]
struct Progress {
    frames_read: u64,
    frames_written: u64,
    cancelled: bool,
}

/// Drives one stream through one filter instance.
pub struct StreamProcessor {
    config: FilterConfig,
    progress_interval: u64,
    cancel: Arc<AtomicBool>,
    metrics: Option<MetricsRegistry>,
}

impl StreamProcessor {
    /// Creates a processor for the filter described by `config`.
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            progress_interval: 30,
            cancel: Arc::new(AtomicBool::new(false)),
            metrics: None,
        }
    }

    /// Sets the number of frames between progress lines. Zero disables them.
    pub fn with_progress_interval(mut self, frames: u64) -> Self {
        self.progress_interval = frames;
        self
    }

    /// Publishes per-frame diagnostics to `registry`.
    pub fn with_metrics(mut self, registry: MetricsRegistry) -> Self {
        self.metrics = Some(registry);
        self
    }

    /// Flag that stops the stream between frames once set.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Processes the whole stream.
    pub fn run(
        &self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
    ) -> Result<StreamSummary, PipelineError> {
        let info = source.info();
        let started_at = Utc::now();
        let start = Instant::now();

        tracing::info!(
            width = info.width,
            height = info.height,
            format = %info.format,
            fps = info.fps,
            frames = ?info.frame_count,
            mode = %self.config.mode,
            "Stream opened"
        );

        let mut progress = Progress::default();
        let outcome = self.drive(source, sink, &info, start, &mut progress);

        source.close();
        let finished = sink.finish();

        match (outcome, finished) {
            (Err(e), finished) => {
                if let Err(finish_err) = finished {
                    tracing::warn!(error = %finish_err, "Failed to finalize sink after abort");
                }
                tracing::error!(
                    error = %e,
                    frames_written = progress.frames_written,
                    "Stream aborted"
                );
                Err(e)
            }
            (Ok(()), Err(e)) => Err(PipelineError::SinkWriteFailure(e)),
            (Ok(()), Ok(())) => {
                let summary = StreamSummary {
                    mode: self.config.mode,
                    frames_read: progress.frames_read,
                    frames_written: progress.frames_written,
                    cancelled: progress.cancelled,
                    started_at,
                    elapsed: start.elapsed(),
                };
                tracing::info!(
                    frames_read = summary.frames_read,
                    frames_written = summary.frames_written,
                    cancelled = summary.cancelled,
                    elapsed_secs = summary.elapsed.as_secs_f64(),
                    fps = summary.fps(),
                    "Stream closed"
                );
                Ok(summary)
            }
        }
    }

    fn drive(
        &self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        info: &StreamInfo,
        start: Instant,
        progress: &mut Progress,
    ) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            progress.cancelled = true;
            return Ok(());
        }

        let first = match source.read() {
            Ok(Some(frame)) => frame,
            Ok(None) => return Err(PipelineError::NoFrames),
            Err(e) => return Err(PipelineError::UpstreamReadFailure(e)),
        };
        progress.frames_read += 1;
        ensure_content(&first)?;

        let mut filter = create_denoiser(&first, &self.config)?;
        let mut health = HealthMonitor::new();
        self.emit(filter.as_mut(), &first, sink, &mut health, progress)?;

        while let Some(frame) = self.next_frame(source, progress) {
            ensure_content(&frame)?;
            self.emit(filter.as_mut(), &frame, sink, &mut health, progress)?;
            self.report_progress(info, start, progress);
        }
        Ok(())
    }

    /// Reads the next frame. Stops on cancellation, end of stream or a
    /// source failure.
    fn next_frame(&self, source: &mut dyn FrameSource, progress: &mut Progress) -> Option<Frame> {
        if self.is_cancelled() {
            tracing::info!(frames = progress.frames_read, "Cancellation requested");
            progress.cancelled = true;
            return None;
        }
        match source.read() {
            Ok(Some(frame)) => {
                progress.frames_read += 1;
                Some(frame)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    frames = progress.frames_read,
                    "Source read failed, treating as end of stream"
                );
                None
            }
        }
    }

    fn emit(
        &self,
        filter: &mut dyn Denoiser,
        frame: &Frame,
        sink: &mut dyn FrameSink,
        health: &mut HealthMonitor,
        progress: &mut Progress,
    ) -> Result<(), PipelineError> {
        let frame_start = Instant::now();
        let output = filter.process(frame)?;
        let elapsed = frame_start.elapsed();

        let diagnostics = filter.diagnostics();
        tracing::debug!(
            sequence = frame.sequence(),
            gain = diagnostics.gain.mean,
            noise = diagnostics.measurement_noise.mean,
            uncertainty = diagnostics.uncertainty.mean,
            delta = diagnostics.delta.mean_abs,
            motion = ?diagnostics.motion.map(|s| s.mean),
            "Frame filtered"
        );
        health.check(&diagnostics)?;

        if let Some(metrics) = &self.metrics {
            metrics.update(&MetricsSnapshot::from_diagnostics(&diagnostics, elapsed));
        }

        let target = sink.info().format;
        let output = if output.format() == target {
            output
        } else {
            output.to_format(target)
        };
        sink.write(&output)
            .map_err(PipelineError::SinkWriteFailure)?;
        progress.frames_written += 1;
        Ok(())
    }

    fn report_progress(&self, info: &StreamInfo, start: Instant, progress: &Progress) {
        if self.progress_interval == 0 || progress.frames_written % self.progress_interval != 0 {
            return;
        }
        let elapsed = start.elapsed().as_secs_f64();
        let fps = if elapsed > 0.0 {
            progress.frames_written as f64 / elapsed
        } else {
            0.0
        };
        let eta_secs = info
            .frame_count
            .filter(|_| fps > 0.0)
            .map(|total| total.saturating_sub(progress.frames_read) as f64 / fps);

        tracing::info!(
            frames = progress.frames_written,
            total = ?info.frame_count,
            fps,
            eta_secs = ?eta_secs,
            "Progress"
        );
    }
}

fn ensure_content(frame: &Frame) -> Result<(), PipelineError> {
    if frame.is_empty() {
        return Err(PipelineError::EmptyInput {
            sequence: frame.sequence(),
        });
    }
    Ok(())
}
