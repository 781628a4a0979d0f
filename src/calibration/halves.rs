//! Normalization that keeps the two sensor halves apart.
//!
//! Unlike `DarkRowCompensator`, no level matching or self pass happens here:
//! each half is scaled straight to a single background level using column
//! estimates taken either from its dark rows or from its own image rows.

use ndarray::{Array2, ArrayView2, Axis, concatenate, s};
use tracing::instrument;

use crate::calibration::common::error::{CalibrationError, Result};
use crate::calibration::gain::ColumnGainNormalizer;
use crate::calibration::geometry::{DARK_BAND, SensorGeometry};
use crate::calibration::stats::{self, NormalizationMethod};

/// Where per-column estimates are taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnSource {
    /// Each half's dark rows; full raw frames only.
    DarkRows,
    /// Each half's image rows.
    #[default]
    Image,
}

/// Scales the top and bottom halves to `background` independently.
///
/// Full raw frames lose their dark rows and columns; any other frame is split
/// at `rows / 2`. Without a `background` the robust mean of the top image
/// half is used.
#[instrument(skip(frame), fields(rows = frame.nrows(), cols = frame.ncols()))]
pub fn normalize_halves(
    frame: ArrayView2<'_, f64>,
    source: ColumnSource,
    background: Option<f64>,
    method: NormalizationMethod,
) -> Result<Array2<f64>> {
    let (rows, cols) = frame.dim();
    let (image, dark) = match SensorGeometry::region(rows, cols) {
        Ok(region) => {
            let top = frame.slice(s![region.top_image_rows.clone(), region.active_cols.clone()]);
            let bottom =
                frame.slice(s![region.bottom_image_rows.clone(), region.active_cols.clone()]);
            let dark = frame.slice(s![
                region.top_dark_rows.start..region.bottom_dark_rows.end,
                region.active_cols.clone()
            ]);
            (concatenate![Axis(0), top, bottom], Some(dark))
        }
        Err(CalibrationError::UnsupportedShape { .. }) => (frame.to_owned(), None),
        Err(e) => return Err(e),
    };

    let middle = image.nrows() / 2;
    let (top_reference, bottom_reference) = match (source, dark) {
        (ColumnSource::DarkRows, Some(dark)) => (
            dark.slice_move(s![..DARK_BAND, ..]),
            dark.slice_move(s![DARK_BAND.., ..]),
        ),
        (ColumnSource::DarkRows, None) => {
            return Err(CalibrationError::UnsupportedShape { rows, cols });
        }
        (ColumnSource::Image, _) => (
            image.slice(s![..middle, ..]),
            image.slice(s![middle.., ..]),
        ),
    };

    let background = match background {
        Some(level) => level,
        None => stats::estimate(image.slice(s![..middle, ..]), NormalizationMethod::RobustMean)?,
    };

    let normalizer = ColumnGainNormalizer::new(method);
    let top = normalizer
        .compute_profile(top_reference, Some(background))?
        .apply(image.slice(s![..middle, ..]))?;
    let bottom = normalizer
        .compute_profile(bottom_reference, Some(background))?
        .apply(image.slice(s![middle.., ..]))?;

    Ok(concatenate![Axis(0), top, bottom])
}
