//! Calibration configuration types

use crate::calibration::stats::{NormalizationMethod, select_method};

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression
    Lzw,
    /// Deflate compression - fast level
    DeflateFast,
    /// Deflate compression - balanced
    DeflateBalanced,
    /// Deflate compression - best compression (slower)
    DeflateBest,
}

/// Sample type of the written frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    /// Rounded and clamped 16-bit counts
    #[default]
    Gray16,
    /// Full precision 32-bit float
    Gray32Float,
}

/// Configuration for frame normalization and output
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationConfig {
    /// Column estimator used for every gain profile
    pub method: NormalizationMethod,
    /// Shared output level; derived from the frame when `None`
    pub target_level: Option<f64>,
    /// Skip the self-referenced pass after dark-row compensation
    pub dark_rows_only: bool,
    /// Run a Wiener filter over the normalized frame
    pub smooth: bool,
    pub sample_format: SampleFormat,
    pub compression: TiffCompression,
    /// Predictor value for compression (2 for horizontal differencing)
    pub predictor: Option<u16>,
    /// Whether to reject zero-sized frames before normalization
    pub validate_dimensions: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            method: NormalizationMethod::RobustMean,
            target_level: None,
            dark_rows_only: false,
            smooth: false,
            sample_format: SampleFormat::Gray16,
            compression: TiffCompression::None,
            predictor: None,
            validate_dimensions: true,
        }
    }
}

impl CalibrationConfig {
    pub fn builder() -> CalibrationConfigBuilder {
        CalibrationConfigBuilder::default()
    }
}

/// Builder for CalibrationConfig
#[derive(Default)]
pub struct CalibrationConfigBuilder {
    method: Option<NormalizationMethod>,
    target_level: Option<Option<f64>>,
    dark_rows_only: Option<bool>,
    smooth: Option<bool>,
    sample_format: Option<SampleFormat>,
    compression: Option<TiffCompression>,
    predictor: Option<Option<u16>>,
    validate_dimensions: Option<bool>,
}

impl CalibrationConfigBuilder {
    pub fn method(mut self, method: NormalizationMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the method by name; unknown names fall back to the robust mean
    /// with a warning.
    pub fn method_name(mut self, name: &str) -> Self {
        self.method = Some(select_method(name).method);
        self
    }

    pub fn target_level(mut self, level: Option<f64>) -> Self {
        self.target_level = Some(level);
        self
    }

    pub fn dark_rows_only(mut self, enable: bool) -> Self {
        self.dark_rows_only = Some(enable);
        self
    }

    pub fn smooth(mut self, enable: bool) -> Self {
        self.smooth = Some(enable);
        self
    }

    pub fn sample_format(mut self, format: SampleFormat) -> Self {
        self.sample_format = Some(format);
        self
    }

    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn predictor(mut self, predictor: Option<u16>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn validate_dimensions(mut self, validate: bool) -> Self {
        self.validate_dimensions = Some(validate);
        self
    }

    pub fn build(self) -> CalibrationConfig {
        let default = CalibrationConfig::default();
        CalibrationConfig {
            method: self.method.unwrap_or(default.method),
            target_level: self.target_level.unwrap_or(default.target_level),
            dark_rows_only: self.dark_rows_only.unwrap_or(default.dark_rows_only),
            smooth: self.smooth.unwrap_or(default.smooth),
            sample_format: self.sample_format.unwrap_or(default.sample_format),
            compression: self.compression.unwrap_or(default.compression),
            predictor: self.predictor.unwrap_or(default.predictor),
            validate_dimensions: self.validate_dimensions.unwrap_or(default.validate_dimensions),
        }
    }
}
