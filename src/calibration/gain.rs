//! Per-column multiplicative gain correction.
//!
//! Column gain error comes from each column's analog readout chain, so it is
//! modeled as a multiplicative bias. A profile is measured on a reference
//! region that should be flat (dark rows, or the image itself) and then
//! multiplied into the target region column by column.

use std::ops::Range;

use ndarray::{Array1, Array2, ArrayView2, s};
use tracing::{debug, instrument};

use crate::calibration::common::error::{CalibrationError, Result};
use crate::calibration::stats::{self, NormalizationMethod};

/// Central rows and columns used for the default self-reference level.
/// Stars and vignetting near the edges skew a whole-frame estimate.
const CENTRAL_ROWS: Range<usize> = 800..1200;
const CENTRAL_COLS: Range<usize> = 700..1300;

/// One correction factor per column, `target / estimate(column)`.
#[derive(Debug, Clone, PartialEq)]
pub struct GainProfile {
    factors: Array1<f64>,
    target_level: f64,
}

impl GainProfile {
    pub fn factors(&self) -> &Array1<f64> {
        &self.factors
    }

    pub fn target_level(&self) -> f64 {
        self.target_level
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// Multiplies each column of `frame` by its factor, returning a new frame.
    pub fn apply(&self, frame: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if frame.ncols() != self.factors.len() {
            return Err(CalibrationError::ProfileMismatch {
                expected: frame.ncols(),
                actual: self.factors.len(),
            });
        }
        Ok(&frame * &self.factors)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnGainNormalizer {
    method: NormalizationMethod,
}

impl ColumnGainNormalizer {
    pub fn new(method: NormalizationMethod) -> Self {
        Self { method }
    }

    pub fn method(&self) -> NormalizationMethod {
        self.method
    }

    /// Measures a gain profile on `reference`.
    ///
    /// Without an explicit `target_level` the robust mean of the whole
    /// reference region is used.
    #[instrument(skip(self, reference), fields(method = %self.method, rows = reference.nrows(), cols = reference.ncols()))]
    pub fn compute_profile(
        &self,
        reference: ArrayView2<'_, f64>,
        target_level: Option<f64>,
    ) -> Result<GainProfile> {
        let target_level = match target_level {
            Some(level) => level,
            None => stats::estimate(reference, NormalizationMethod::RobustMean)?,
        };
        if !target_level.is_finite() || target_level <= 0.0 {
            return Err(CalibrationError::InvalidTarget(target_level));
        }

        let estimates = stats::estimate_columns(reference, self.method)?;
        let mut factors = Array1::zeros(estimates.len());
        for (column, (&estimate, factor)) in estimates.iter().zip(factors.iter_mut()).enumerate() {
            let value = target_level / estimate;
            if !value.is_finite() || value <= 0.0 {
                return Err(CalibrationError::DegenerateColumn {
                    column,
                    value: estimate,
                });
            }
            *factor = value;
        }

        debug!(target_level, columns = factors.len(), "Computed gain profile");
        Ok(GainProfile {
            factors,
            target_level,
        })
    }

    /// Uses `frame` as its own reference and applies the resulting profile.
    ///
    /// Without an explicit `target_level` the robust mean of the central
    /// window is used (the whole frame when it is too small to have one).
    pub fn self_normalize(
        &self,
        frame: ArrayView2<'_, f64>,
        target_level: Option<f64>,
    ) -> Result<Array2<f64>> {
        let target_level = match target_level {
            Some(level) => level,
            None => central_reference_level(frame)?,
        };
        let profile = self.compute_profile(frame, Some(target_level))?;
        profile.apply(frame)
    }
}

/// Robust mean of the frame's central window.
pub fn central_reference_level(frame: ArrayView2<'_, f64>) -> Result<f64> {
    let rows = CENTRAL_ROWS.start.min(frame.nrows())..CENTRAL_ROWS.end.min(frame.nrows());
    let cols = CENTRAL_COLS.start.min(frame.ncols())..CENTRAL_COLS.end.min(frame.ncols());
    let window = frame.slice(s![rows, cols]);
    if window.is_empty() {
        stats::estimate(frame, NormalizationMethod::RobustMean)
    } else {
        stats::estimate(window, NormalizationMethod::RobustMean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array2, array};

    fn reference_band() -> Array2<f64> {
        array![
            [9.0, 18.0, 29.0, 40.0],
            [11.0, 22.0, 31.0, 40.0],
            [10.0, 19.0, 30.0, 39.0],
            [10.0, 21.0, 30.0, 41.0],
        ]
    }

    #[test]
    fn test_profile_against_column_means() {
        let normalizer = ColumnGainNormalizer::new(NormalizationMethod::Mean);
        let profile = normalizer
            .compute_profile(reference_band().view(), Some(25.0))
            .unwrap();
        let expected = [2.5, 1.25, 25.0 / 30.0, 0.625];
        for (got, want) in profile.factors().iter().zip(expected) {
            assert_relative_eq!(*got, want, max_relative = 1e-12);
        }

        let target = Array2::from_elem((3, 4), 10.0);
        let corrected = profile.apply(target.view()).unwrap();
        assert_eq!(corrected.dim(), target.dim());
        let expected = [25.0, 12.5, 250.0 / 30.0, 6.25];
        for row in corrected.rows() {
            for (got, want) in row.iter().zip(expected) {
                assert_relative_eq!(*got, want, max_relative = 1e-12);
            }
        }
        // input untouched
        assert!(target.iter().all(|&v| v == 10.0));
    }

    #[test]
    fn test_columns_converge_to_target() {
        let frame = Array2::from_shape_fn((40, 6), |(r, c)| {
            let gain = 1.0 + 0.1 * c as f64;
            gain * (100.0 + ((r * 7 + c * 3) % 11) as f64)
        });
        for method in NormalizationMethod::ALL {
            let normalizer = ColumnGainNormalizer::new(method);
            let profile = normalizer.compute_profile(frame.view(), Some(250.0)).unwrap();
            let corrected = profile.apply(frame.view()).unwrap();
            for estimate in stats::estimate_columns(corrected.view(), method).unwrap() {
                assert_relative_eq!(estimate, 250.0, max_relative = 1e-6);
            }
        }
    }

    #[test]
    fn test_self_pass_is_idempotent() {
        let frame = Array2::from_shape_fn((30, 5), |(r, c)| {
            (1.0 + 0.2 * c as f64) * (50.0 + ((r * 5 + c) % 7) as f64)
        });
        let normalizer = ColumnGainNormalizer::new(NormalizationMethod::RobustMean);
        let once = normalizer.self_normalize(frame.view(), Some(80.0)).unwrap();
        let twice = normalizer.self_normalize(once.view(), Some(80.0)).unwrap();

        let first = stats::estimate_columns(once.view(), NormalizationMethod::RobustMean).unwrap();
        let second = stats::estimate_columns(twice.view(), NormalizationMethod::RobustMean).unwrap();
        for (a, b) in first.iter().zip(second.iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_default_target_is_reference_robust_mean() {
        let reference = Array2::from_elem((4, 3), 40.0);
        let profile = ColumnGainNormalizer::default()
            .compute_profile(reference.view(), None)
            .unwrap();
        assert_relative_eq!(profile.target_level(), 40.0);
        assert!(profile.factors().iter().all(|&f| (f - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_zero_column_is_reported() {
        let mut reference = Array2::from_elem((4, 3), 40.0);
        reference.column_mut(1).fill(0.0);
        let result = ColumnGainNormalizer::new(NormalizationMethod::Median)
            .compute_profile(reference.view(), Some(10.0));
        assert!(matches!(
            result,
            Err(CalibrationError::DegenerateColumn { column: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_target_and_mismatch() {
        let reference = Array2::from_elem((4, 3), 40.0);
        let normalizer = ColumnGainNormalizer::new(NormalizationMethod::Mean);
        assert!(matches!(
            normalizer.compute_profile(reference.view(), Some(0.0)),
            Err(CalibrationError::InvalidTarget(_))
        ));

        let profile = normalizer.compute_profile(reference.view(), Some(10.0)).unwrap();
        let wrong = Array2::from_elem((2, 5), 1.0);
        assert!(matches!(
            profile.apply(wrong.view()),
            Err(CalibrationError::ProfileMismatch { expected: 5, actual: 3 })
        ));
    }

    #[test]
    fn test_central_reference_level_small_frame_uses_whole_frame() {
        let frame = Array2::from_elem((10, 10), 7.0);
        assert_relative_eq!(central_reference_level(frame.view()).unwrap(), 7.0);
    }
}
