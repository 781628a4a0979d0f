//! Local background removal around a candidate star.
//!
//! The background is estimated per column from search bands directly above
//! and below the window, never from the window itself since that holds the
//! star's flux. A window that crosses the sensor half boundary takes its
//! upper rows' background from the band above and its lower rows' from the
//! band below, because the two halves are read out independently.

use ndarray::parallel::prelude::*;
use ndarray::{Array2, ArrayView2, Axis, concatenate, s};
use tracing::{debug, instrument};

use crate::calibration::common::error::{CalibrationError, Result};
use crate::calibration::geometry::SensorGeometry;
use crate::calibration::stats::{self, NormalizationMethod, RobustMeanParams, robust_mean_with};

/// Region of interest around a candidate star.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowRequest {
    /// Point of interest as `(x, y)`, i.e. `(column, row)`.
    pub center: (f64, f64),
    /// Nominal half width and half height, before scaling.
    pub half_extent: (usize, usize),
    pub scale: f64,
    /// Clip threshold for the background robust mean.
    pub sigma: f64,
    pub allow_negative: bool,
}

impl WindowRequest {
    pub fn new(center: (f64, f64), half_extent: (usize, usize)) -> Self {
        Self {
            center,
            half_extent,
            scale: 1.5,
            sigma: 2.0,
            allow_negative: false,
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    pub fn with_allow_negative(mut self, allow: bool) -> Self {
        self.allow_negative = allow;
        self
    }
}

/// Half-open pixel bounds in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub left: usize,
    pub right: usize,
    pub top: usize,
    pub bottom: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowExtraction {
    pub subimage: Array2<f64>,
    /// Frame coordinates `(x, y)` of the subimage's top-left pixel.
    pub offset: (usize, usize),
    /// The requested center in subimage coordinates.
    pub local_center: (f64, f64),
}

pub struct WindowedBackgroundSubtractor;

impl WindowedBackgroundSubtractor {
    /// Window bounds for `request`, clipped to the frame.
    pub fn bounds(frame_dim: (usize, usize), request: &WindowRequest) -> Result<WindowBounds> {
        let (height, width) = frame_dim;
        let (x, y) = request.center;
        let inside = x.is_finite()
            && y.is_finite()
            && x >= 0.0
            && y >= 0.0
            && x <= width as f64 - 1.0
            && y <= height as f64 - 1.0;
        if !inside {
            return Err(CalibrationError::OutOfBounds {
                x,
                y,
                width,
                height,
            });
        }

        if !request.scale.is_finite() || request.scale < 0.0 {
            return Err(CalibrationError::InvalidScale(request.scale));
        }

        let (w, h) = scaled_extent(request);
        let (xi, yi) = (x as usize, y as usize);
        Ok(WindowBounds {
            left: xi.saturating_sub(w),
            right: xi.saturating_add(w).saturating_add(1).min(width),
            top: yi.saturating_sub(h),
            bottom: yi.saturating_add(h).saturating_add(1).min(height),
        })
    }

    /// Cuts out the window and removes its locally estimated background.
    ///
    /// Fails with `InsufficientContext` when a search band is empty; callers
    /// can then fall back to [`WindowedBackgroundSubtractor::extract_global`].
    #[instrument(skip(frame), fields(rows = frame.nrows(), cols = frame.ncols()))]
    pub fn extract(frame: ArrayView2<'_, f64>, request: &WindowRequest) -> Result<WindowExtraction> {
        let (height, _) = frame.dim();
        let b = Self::bounds(frame.dim(), request)?;
        let (_, h) = scaled_extent(request);
        let middle = SensorGeometry::half_boundary(height);
        let window = frame.slice(s![b.top..b.bottom, b.left..b.right]);

        let band = h.saturating_mul(2);
        let mut above = b.top.saturating_sub(band)..b.top;
        let mut below = b.bottom..b.bottom.saturating_add(band).min(height);

        let subtracted = if b.top < middle && b.bottom > middle {
            debug!(?b, middle, "Window straddles the half boundary");
            let upper_bg = column_backgrounds(frame.slice(s![above, b.left..b.right]), request.sigma)?;
            let lower_bg = column_backgrounds(frame.slice(s![below, b.left..b.right]), request.sigma)?;
            subtract_columns(window, middle - b.top, &upper_bg, &lower_bg)
        } else {
            // keep both bands inside the window's half
            if b.top >= middle {
                above.start = above.start.max(middle);
            } else {
                below.end = below.end.min(middle);
            }
            let above = frame.slice(s![above.start..above.end.max(above.start), b.left..b.right]);
            let below = frame.slice(s![below.start..below.end.max(below.start), b.left..b.right]);
            let search = concatenate![Axis(0), above, below];
            let bg = column_backgrounds(search.view(), request.sigma)?;
            subtract_columns(window, window.nrows(), &bg, &bg)
        };

        Ok(finish(subtracted, b, request))
    }

    /// Cuts out the window and removes one robust level for the whole frame.
    pub fn extract_global(
        frame: ArrayView2<'_, f64>,
        request: &WindowRequest,
    ) -> Result<WindowExtraction> {
        let b = Self::bounds(frame.dim(), request)?;
        let level = stats::estimate(frame, NormalizationMethod::RobustMean)?;
        let window = frame.slice(s![b.top..b.bottom, b.left..b.right]);
        Ok(finish(window.mapv(|v| v - level), b, request))
    }
}

fn scaled_extent(request: &WindowRequest) -> (usize, usize) {
    let (w, h) = request.half_extent;
    (
        (request.scale * w as f64) as usize,
        (request.scale * h as f64) as usize,
    )
}

fn finish(mut subimage: Array2<f64>, b: WindowBounds, request: &WindowRequest) -> WindowExtraction {
    if !request.allow_negative {
        subimage.mapv_inplace(|v| v.max(0.0));
    }
    let (x, y) = request.center;
    WindowExtraction {
        subimage,
        offset: (b.left, b.top),
        local_center: (x - b.left as f64, y - b.top as f64),
    }
}

/// Robust background of every column of a search band.
fn column_backgrounds(band: ArrayView2<'_, f64>, sigma: f64) -> Result<Vec<f64>> {
    if band.nrows() == 0 || band.ncols() == 0 {
        return Err(CalibrationError::InsufficientContext(format!(
            "search band is {}x{}",
            band.nrows(),
            band.ncols()
        )));
    }
    let params = RobustMeanParams::with_sigma(sigma);
    band.axis_iter(Axis(1))
        .into_par_iter()
        .map(|column| robust_mean_with(&column.to_vec(), params).map(|e| e.mean))
        .collect()
}

/// Subtracts `upper[c]` from rows `< split` and `lower[c]` from the rest.
fn subtract_columns(
    window: ArrayView2<'_, f64>,
    split: usize,
    upper: &[f64],
    lower: &[f64],
) -> Array2<f64> {
    let mut out = window.to_owned();
    for (row, mut line) in out.axis_iter_mut(Axis(0)).enumerate() {
        let levels = if row < split { upper } else { lower };
        for (v, &level) in line.iter_mut().zip(levels) {
            *v -= level;
        }
    }
    out
}
