//! Filter diagnostics and numerical health monitoring.
//!
//! These summaries describe the internal fields of the filter. They are
//! not a perceptual quality assessment of the output video.

mod diagnostics;
mod health;
mod statistics;

pub use diagnostics::FrameDiagnostics;
pub use health::{HealthMetrics, HealthMonitor, HealthViolation};
pub use statistics::PlaneStatistics;
