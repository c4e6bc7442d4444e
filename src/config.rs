//! Filter and stream configuration.
//!
//! All parameters are fixed at construction and stay immutable for the
//! lifetime of a stream. Defaults are the tuned values of each filter
//! mode.

use crate::filter::FilterMode;
use crate::imgproc::BilateralParams;
use crate::stream::{PixelFormat, StreamInfo};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters of the history/block-matching filter (CPU path).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockMatchingConfig {
    /// Process noise `q`.
    pub process_noise: f32,
    /// Initial measurement noise `r0`.
    pub initial_noise: f32,
    /// Number of past corrected frames kept for motion measurement.
    pub history_capacity: usize,
    /// Side of the square blocks used for motion measurement.
    pub block_size: usize,
    /// Box pre-filter window.
    pub prefilter_window: usize,
    /// Bilateral kernel diameter.
    pub bilateral_diameter: usize,
    /// Bilateral spread, used for both intensity and distance.
    pub bilateral_sigma: f32,
    /// Decay `σc` of the novelty weight `exp(-m² / 2σc²)`.
    pub novelty_sigma: f32,
}

impl Default for BlockMatchingConfig {
    fn default() -> Self {
        Self {
            process_noise: 0.1,
            initial_noise: 10.0,
            history_capacity: 5,
            block_size: 8,
            prefilter_window: 3,
            bilateral_diameter: 5,
            bilateral_sigma: 25.0,
            novelty_sigma: 30.0,
        }
    }
}

impl BlockMatchingConfig {
    /// Bilateral parameters for the correction step.
    pub fn bilateral(&self) -> BilateralParams {
        BilateralParams::uniform(self.bilateral_diameter, self.bilateral_sigma)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_noise("process_noise", self.process_noise)?;
        check_noise("initial_noise", self.initial_noise)?;
        if self.history_capacity == 0 {
            return Err(ConfigError::InvalidHistory);
        }
        if self.block_size == 0 {
            return Err(ConfigError::InvalidWindow {
                name: "block_size",
                value: self.block_size,
            });
        }
        check_odd_window("prefilter_window", self.prefilter_window)?;
        check_window("bilateral_diameter", self.bilateral_diameter)?;
        check_spread("bilateral_sigma", self.bilateral_sigma)?;
        check_spread("novelty_sigma", self.novelty_sigma)?;
        Ok(())
    }
}

/// Parameters of the recursive-noise filter (accelerated path).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecursiveConfig {
    /// Process noise `q`.
    pub process_noise: f32,
    /// Initial measurement noise `r0`.
    pub initial_noise: f32,
    /// Box filter window for the temporal-delta reference.
    pub mask_size: usize,
    /// Bilateral kernel diameter.
    pub bilateral_diameter: usize,
    /// Bilateral intensity spread; the spatial spread is half of it.
    pub bilateral_sigma: f32,
    /// Number of cascaded bilateral passes.
    pub bilateral_passes: u32,
    /// Weight of the new correction in the final temporal blend.
    pub temporal_blend: f32,
}

impl Default for RecursiveConfig {
    fn default() -> Self {
        Self {
            process_noise: 0.05,
            initial_noise: 5.0,
            mask_size: 5,
            bilateral_diameter: 7,
            bilateral_sigma: 35.0,
            bilateral_passes: 2,
            temporal_blend: 0.7,
        }
    }
}

impl RecursiveConfig {
    /// Bilateral parameters for each cascaded pass.
    pub fn bilateral(&self) -> BilateralParams {
        BilateralParams {
            diameter: self.bilateral_diameter,
            sigma_color: self.bilateral_sigma,
            sigma_space: self.bilateral_sigma / 2.0,
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_noise("process_noise", self.process_noise)?;
        check_noise("initial_noise", self.initial_noise)?;
        check_odd_window("mask_size", self.mask_size)?;
        check_window("bilateral_diameter", self.bilateral_diameter)?;
        check_spread("bilateral_sigma", self.bilateral_sigma)?;
        if self.bilateral_passes == 0 {
            return Err(ConfigError::InvalidPasses);
        }
        if !(0.0..=1.0).contains(&self.temporal_blend) {
            return Err(ConfigError::InvalidBlend(self.temporal_blend));
        }
        Ok(())
    }
}

/// Filter selection and per-mode parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    /// Which filter variant runs.
    pub mode: FilterMode,
    pub block_matching: BlockMatchingConfig,
    pub recursive: RecursiveConfig,
}

impl FilterConfig {
    /// Validates the parameters of the selected mode.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.mode {
            FilterMode::BlockMatching => self.block_matching.validate(),
            FilterMode::Recursive => self.recursive.validate(),
        }
    }
}

fn check_noise(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::InvalidNoise { name, value });
    }
    Ok(())
}

fn check_spread(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::InvalidSpread { name, value });
    }
    Ok(())
}

fn check_window(name: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidWindow { name, value });
    }
    Ok(())
}

fn check_odd_window(name: &'static str, value: usize) -> Result<(), ConfigError> {
    if value % 2 == 0 {
        return Err(ConfigError::InvalidWindow { name, value });
    }
    Ok(())
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("invalid frame rate")]
    InvalidFrameRate,
    #[error("{name} must be a finite non-negative value, got {value}")]
    InvalidNoise { name: &'static str, value: f32 },
    #[error("{name} must be positive, got {value}")]
    InvalidSpread { name: &'static str, value: f32 },
    #[error("invalid {name} {value}")]
    InvalidWindow { name: &'static str, value: usize },
    #[error("history capacity must be at least 1")]
    InvalidHistory,
    #[error("at least one bilateral pass is required")]
    InvalidPasses,
    #[error("temporal blend {0} outside [0, 1]")]
    InvalidBlend(f32),
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Layout of headerless raw video input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Channel layout.
    pub format: PixelFormat,
    /// Nominal frame rate.
    pub fps: f64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            format: PixelFormat::Bgr24,
            fps: 30.0,
        }
    }
}

impl StreamConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if !(self.fps > 0.0 && self.fps.is_finite()) {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(())
    }

    /// Stream properties for a source of unknown length.
    pub fn info(&self) -> StreamInfo {
        StreamInfo {
            width: self.width,
            height: self.height,
            format: self.format,
            fps: self.fps,
            frame_count: None,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Frames between progress log lines (0 to disable).
    pub progress_interval: u64,
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            progress_interval: 30,
            metrics_port: 0,
        }
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.filter.validate()?;
        self.stream.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(FileConfig::default().validate().is_ok());
        assert!(BlockMatchingConfig::default().validate().is_ok());
        assert!(RecursiveConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_dimensions_invalid() {
        let mut config = StreamConfig::default();
        config.width = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_zero_history_invalid() {
        let config = BlockMatchingConfig {
            history_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidHistory)));
    }

    #[test]
    fn test_even_mask_invalid() {
        let config = RecursiveConfig {
            mask_size: 4,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWindow {
                name: "mask_size",
                value: 4
            })
        ));
    }

    #[test]
    fn test_blend_out_of_range_invalid() {
        let config = RecursiveConfig {
            temporal_blend: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBlend(_))));
    }

    #[test]
    fn test_zero_noise_allowed() {
        let config = BlockMatchingConfig {
            initial_noise: 0.0,
            process_noise: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_recursive_bilateral_halves_spatial_spread() {
        let params = RecursiveConfig::default().bilateral();
        assert_eq!(params.diameter, 7);
        assert_eq!(params.sigma_color, 35.0);
        assert_eq!(params.sigma_space, 17.5);
    }

    #[test]
    fn test_parse_toml() {
        let config = FileConfig::from_toml(
            r#"
            [filter]
            mode = "recursive"

            [filter.recursive]
            bilateral_passes = 1

            [stream]
            width = 320
            height = 240
            format = "gray8"
            "#,
        )
        .unwrap();

        assert_eq!(config.filter.mode, FilterMode::Recursive);
        assert_eq!(config.filter.recursive.bilateral_passes, 1);
        assert_eq!(config.filter.recursive.mask_size, 5);
        assert_eq!(config.stream.format, PixelFormat::Gray8);
        assert_eq!(config.stream.fps, 30.0);
    }

    #[test]
    fn test_parse_rejects_invalid_values() {
        let result = FileConfig::from_toml(
            r#"
            [filter.block_matching]
            block_size = 0
            "#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidWindow { .. })));
    }
}
