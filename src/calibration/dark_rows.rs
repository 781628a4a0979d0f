//! Dark-row based gain compensation of full raw frames.
//!
//! Each sensor half is corrected against its own 16 dark rows, the halves are
//! brought to a common level so no seam shows at the boundary, and the
//! joined image is optionally corrected once more against itself to remove
//! residual column bias the dark rows did not capture.

use std::ops::Range;

use ndarray::{Array2, ArrayView2, Axis, concatenate, s};
use tracing::{debug, info_span, instrument, warn};

use crate::calibration::common::error::{CalibrationError, Result};
use crate::calibration::gain::ColumnGainNormalizer;
use crate::calibration::geometry::{FrameLayout, SensorGeometry, SensorRegion};
use crate::calibration::stats::{self, NormalizationMethod};

/// Rows of one sensor half as laid out in the raw frame.
struct HalfBands {
    name: &'static str,
    readout: Range<usize>,
    dark: Range<usize>,
    image: Range<usize>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DarkRowCompensator {
    normalizer: ColumnGainNormalizer,
}

impl DarkRowCompensator {
    pub fn new(method: NormalizationMethod) -> Self {
        Self {
            normalizer: ColumnGainNormalizer::new(method),
        }
    }

    pub fn method(&self) -> NormalizationMethod {
        self.normalizer.method()
    }

    /// Gain-normalizes a frame and strips its dark bands.
    ///
    /// Full raw frames go through per-half dark-row compensation, followed by
    /// a self-referenced pass unless `self_pass` is false. Any other shape
    /// is normalized against itself.
    #[instrument(skip(self, frame), fields(method = %self.method(), rows = frame.nrows(), cols = frame.ncols()))]
    pub fn compensate(
        &self,
        frame: ArrayView2<'_, f64>,
        target_level: Option<f64>,
        self_pass: bool,
    ) -> Result<Array2<f64>> {
        let (rows, cols) = frame.dim();
        let region = match SensorGeometry::region(rows, cols) {
            Ok(region) => region,
            Err(CalibrationError::UnsupportedShape { .. }) => {
                if !self_pass {
                    warn!(
                        rows,
                        cols,
                        "Dark-row only output requested for a frame without dark rows; normalizing against the image"
                    );
                } else if !matches!(SensorGeometry::classify(rows, cols), Ok(FrameLayout::Cropped)) {
                    warn!(rows, cols, "Unrecognized frame shape; normalizing against the image");
                }
                return self.normalizer.self_normalize(frame, target_level);
            }
            Err(e) => return Err(e),
        };

        let top = self.correct_half(
            frame,
            &region,
            HalfBands {
                name: "top",
                readout: region.top_half_rows(),
                dark: region.top_dark_rows.clone(),
                image: region.top_image_rows.clone(),
            },
        )?;
        let bottom = self.correct_half(
            frame,
            &region,
            HalfBands {
                name: "bottom",
                readout: region.bottom_half_rows(),
                dark: region.bottom_dark_rows.clone(),
                image: region.bottom_image_rows.clone(),
            },
        )?;

        let top_mean = stats::mean_of(top.view())?;
        let bottom_mean = stats::mean_of(bottom.view())?;
        let shared = target_level.unwrap_or((top_mean + bottom_mean) / 2.0);
        debug!(top_mean, bottom_mean, shared, "Matching half levels");

        let top = rescale(top, "top", top_mean, shared)?;
        let bottom = rescale(bottom, "bottom", bottom_mean, shared)?;
        let joined = concatenate![Axis(0), top, bottom];

        if !self_pass {
            return Ok(joined);
        }

        let _span = info_span!("self_pass").entered();
        let profile = self.normalizer.compute_profile(joined.view(), Some(shared))?;
        profile.apply(joined.view())
    }

    /// Corrects one half against its dark rows and crops it to its active image.
    fn correct_half(
        &self,
        frame: ArrayView2<'_, f64>,
        region: &SensorRegion,
        half: HalfBands,
    ) -> Result<Array2<f64>> {
        let _span = info_span!("dark_row_half", half = half.name).entered();

        let level = stats::estimate(
            frame.slice(s![half.readout, ..]),
            NormalizationMethod::RobustMean,
        )?;
        let dark = frame.slice(s![half.dark, region.active_cols.clone()]);
        let profile = self.normalizer.compute_profile(dark, Some(level))?;

        profile.apply(frame.slice(s![half.image, region.active_cols.clone()]))
    }
}

fn rescale(half: Array2<f64>, name: &'static str, mean: f64, shared: f64) -> Result<Array2<f64>> {
    let factor = shared / mean;
    if !factor.is_finite() || factor <= 0.0 {
        return Err(CalibrationError::DegenerateHalf { half: name, mean });
    }
    Ok(half * factor)
}
