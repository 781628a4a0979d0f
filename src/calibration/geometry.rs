//! Raw frame layout of the two-half DayStar sensor.
//!
//! The sensor reads out two independent halves. Each half carries a 16-row
//! band of shielded (dark) rows next to the half boundary, and every row is
//! flanked by 16 shielded columns on each side. The numbers here are physical
//! properties of the detector and are the only place they are written down.

use std::ops::Range;

use crate::calibration::common::error::{CalibrationError, Result};

/// Width of every dark reference band, in rows or columns.
pub const DARK_BAND: usize = 16;

/// Image rows read out by each sensor half.
pub const HALF_IMAGE_ROWS: usize = 1080;

/// Full raw frame, dark bands included.
pub const FULL_ROWS: usize = 2192;
pub const FULL_COLS: usize = 2592;

/// Frame after all dark bands have been cropped away.
pub const CROPPED_ROWS: usize = 2160;
pub const CROPPED_COLS: usize = 2560;

/// Row and column boundaries of a full raw frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorRegion {
    pub top_image_rows: Range<usize>,
    pub top_dark_rows: Range<usize>,
    pub bottom_dark_rows: Range<usize>,
    pub bottom_image_rows: Range<usize>,
    pub left_dark_cols: Range<usize>,
    pub active_cols: Range<usize>,
    pub right_dark_cols: Range<usize>,
}

pub const SENSOR_REGION: SensorRegion = SensorRegion {
    top_image_rows: 0..HALF_IMAGE_ROWS,
    top_dark_rows: HALF_IMAGE_ROWS..HALF_IMAGE_ROWS + DARK_BAND,
    bottom_dark_rows: HALF_IMAGE_ROWS + DARK_BAND..HALF_IMAGE_ROWS + 2 * DARK_BAND,
    bottom_image_rows: HALF_IMAGE_ROWS + 2 * DARK_BAND..FULL_ROWS,
    left_dark_cols: 0..DARK_BAND,
    active_cols: DARK_BAND..DARK_BAND + CROPPED_COLS,
    right_dark_cols: DARK_BAND + CROPPED_COLS..FULL_COLS,
};

impl SensorRegion {
    /// Rows read out by the top half: image rows followed by its dark band.
    pub fn top_half_rows(&self) -> Range<usize> {
        self.top_image_rows.start..self.top_dark_rows.end
    }

    /// Rows read out by the bottom half: its dark band followed by image rows.
    pub fn bottom_half_rows(&self) -> Range<usize> {
        self.bottom_dark_rows.start..self.bottom_image_rows.end
    }
}

/// Recognized frame layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLayout {
    /// 2192x2592 raw readout with dark rows and columns.
    FullRaw,
    /// 2160x2560 frame with every dark band already removed.
    Cropped,
}

impl FrameLayout {
    pub fn dimensions(self) -> (usize, usize) {
        match self {
            FrameLayout::FullRaw => (FULL_ROWS, FULL_COLS),
            FrameLayout::Cropped => (CROPPED_ROWS, CROPPED_COLS),
        }
    }
}

pub struct SensorGeometry;

impl SensorGeometry {
    /// Classifies a frame by its `(rows, cols)` shape.
    pub fn classify(rows: usize, cols: usize) -> Result<FrameLayout> {
        match (rows, cols) {
            (FULL_ROWS, FULL_COLS) => Ok(FrameLayout::FullRaw),
            (CROPPED_ROWS, CROPPED_COLS) => Ok(FrameLayout::Cropped),
            _ => Err(CalibrationError::UnsupportedShape { rows, cols }),
        }
    }

    /// Boundaries of a full raw frame, or `UnsupportedShape` for anything else.
    pub fn region(rows: usize, cols: usize) -> Result<SensorRegion> {
        match Self::classify(rows, cols)? {
            FrameLayout::FullRaw => Ok(SENSOR_REGION),
            FrameLayout::Cropped => Err(CalibrationError::UnsupportedShape { rows, cols }),
        }
    }

    /// Row index where the bottom half starts in a frame of `rows` rows.
    pub fn half_boundary(rows: usize) -> usize {
        rows / 2
    }
}
