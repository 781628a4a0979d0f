//! Frame value types flowing through the pipeline.
//!
//! Every stage takes frames by reference and returns a new frame, so a raw
//! input is never aliased by a partially corrected output.

use ndarray::Array2;

use crate::calibration::common::error::{CalibrationError, Result};
use crate::calibration::geometry::{FrameLayout, SensorGeometry};

/// Fixed-point sensor readout, indexed `[row, col]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub pixels: Array2<u16>,
    /// Significant bits per sample (12 for the DayStar readout).
    pub bits_per_sample: u32,
}

impl RawFrame {
    pub fn new(pixels: Array2<u16>, bits_per_sample: u32) -> Self {
        Self {
            pixels,
            bits_per_sample,
        }
    }

    /// Builds a frame from row-major samples.
    pub fn from_samples(
        rows: usize,
        cols: usize,
        samples: Vec<u16>,
        bits_per_sample: u32,
    ) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(CalibrationError::InvalidDimensions(cols, rows));
        }
        let pixels = Array2::from_shape_vec((rows, cols), samples)
            .map_err(|e| CalibrationError::DecodeError(e.to_string()))?;
        Ok(Self::new(pixels, bits_per_sample))
    }

    pub fn rows(&self) -> usize {
        self.pixels.nrows()
    }

    pub fn cols(&self) -> usize {
        self.pixels.ncols()
    }

    pub fn layout(&self) -> Result<FrameLayout> {
        SensorGeometry::classify(self.rows(), self.cols())
    }

    /// Pixel values widened to floating point for estimation.
    pub fn to_f64(&self) -> Array2<f64> {
        self.pixels.mapv(f64::from)
    }
}

/// Gain-corrected frame with dark bands removed.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratedFrame {
    pub pixels: Array2<f64>,
}

impl CalibratedFrame {
    pub fn new(pixels: Array2<f64>) -> Self {
        Self { pixels }
    }

    pub fn rows(&self) -> usize {
        self.pixels.nrows()
    }

    pub fn cols(&self) -> usize {
        self.pixels.ncols()
    }

    /// Rounds to the nearest count, clamped to the `u16` range.
    pub fn to_u16(&self) -> Array2<u16> {
        self.pixels.mapv(|v| {
            if v.is_nan() {
                0
            } else {
                v.round().clamp(0.0, f64::from(u16::MAX)) as u16
            }
        })
    }
}
