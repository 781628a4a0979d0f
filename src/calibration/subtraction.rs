//! Additive (bias) corrections on integer frames.
//!
//! These model column error as an offset rather than a gain and subtract a
//! per-column level directly from the counts. Every subtraction is clamped
//! at zero.

use ndarray::parallel::prelude::*;
use ndarray::{Array2, ArrayView2, Axis, concatenate, s};
use tracing::instrument;

use crate::calibration::arith::subtract_clamped;
use crate::calibration::common::error::{CalibrationError, Result};
use crate::calibration::frame::RawFrame;
use crate::calibration::geometry::{FrameLayout, SensorGeometry};

/// Truncated integer mean of every column.
fn column_means(block: ArrayView2<'_, u16>) -> Vec<u16> {
    let rows = block.nrows().max(1) as u64;
    block
        .axis_iter(Axis(1))
        .into_par_iter()
        .map(|column| (column.iter().map(|&v| u64::from(v)).sum::<u64>() / rows) as u16)
        .collect()
}

fn subtract_per_column(block: ArrayView2<'_, u16>, levels: &[u16]) -> Array2<u16> {
    let mut out = block.to_owned();
    out.axis_iter_mut(Axis(1))
        .into_par_iter()
        .zip(levels.par_iter())
        .for_each(|(mut column, &level)| column.mapv_inplace(|v| subtract_clamped(v, level)));
    out
}

/// Subtracts each half's dark-row column means from that half's image rows.
///
/// Only full raw frames carry dark rows; the result is the cropped image.
#[instrument(skip(frame), fields(rows = frame.rows(), cols = frame.cols()))]
pub fn subtract_dark_rows(frame: &RawFrame) -> Result<Array2<u16>> {
    let region = SensorGeometry::region(frame.rows(), frame.cols())?;
    let pixels = frame.pixels.view();
    let active = region.active_cols.clone();

    let top_levels = column_means(pixels.slice(s![region.top_dark_rows.clone(), active.clone()]));
    let bottom_levels =
        column_means(pixels.slice(s![region.bottom_dark_rows.clone(), active.clone()]));

    let top = subtract_per_column(
        pixels.slice(s![region.top_image_rows.clone(), active.clone()]),
        &top_levels,
    );
    let bottom = subtract_per_column(
        pixels.slice(s![region.bottom_image_rows.clone(), active]),
        &bottom_levels,
    );
    Ok(concatenate![Axis(0), top, bottom])
}

/// Subtracts each half's own column means from a cropped frame.
#[instrument(skip(frame), fields(rows = frame.nrows(), cols = frame.ncols()))]
pub fn subtract_column_means(frame: ArrayView2<'_, u16>) -> Result<Array2<u16>> {
    let (rows, cols) = frame.dim();
    if SensorGeometry::classify(rows, cols)? != FrameLayout::Cropped {
        return Err(CalibrationError::UnsupportedShape { rows, cols });
    }
    let middle = SensorGeometry::half_boundary(rows);

    let top = frame.slice(s![..middle, ..]);
    let bottom = frame.slice(s![middle.., ..]);
    let top = subtract_per_column(top, &column_means(top));
    let bottom = subtract_per_column(bottom, &column_means(bottom));
    Ok(concatenate![Axis(0), top, bottom])
}
