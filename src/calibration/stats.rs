//! Column and region summary estimators.
//!
//! Every estimator reduces a sample to one value. `estimate` applies it to a
//! whole 2-D region, `estimate_columns` applies it to each column separately
//! (in parallel, since columns are independent).

mod method;
mod robust;

use ndarray::parallel::prelude::*;
use ndarray::{Array1, ArrayView2, Axis};

use crate::calibration::common::error::{CalibrationError, Result};

pub use method::{MethodSelection, NormalizationMethod, select_method};
pub use robust::{MAD_TO_SIGMA, RobustEstimate, RobustMeanParams, robust_mean, robust_mean_with};

/// Signature shared by every estimator in the strategy table.
pub type Estimator = fn(&[f64]) -> Result<f64>;

fn ensure_not_empty(values: &[f64], what: &str) -> Result<()> {
    if values.is_empty() {
        return Err(CalibrationError::EmptyRegion(what.to_string()));
    }
    Ok(())
}

pub fn mean(values: &[f64]) -> Result<f64> {
    ensure_not_empty(values, "mean")?;
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median; even-length samples average the two middle values.
pub fn median(values: &[f64]) -> Result<f64> {
    ensure_not_empty(values, "median")?;
    let mut scratch = values.to_vec();
    Ok(median_mut(&mut scratch))
}

/// Median of a non-empty buffer, reordering it in place.
pub(crate) fn median_mut(data: &mut [f64]) -> f64 {
    debug_assert!(!data.is_empty());
    let len = data.len();
    let mid = len / 2;
    let (left, upper, _) = data.select_nth_unstable_by(mid, f64::total_cmp);
    let upper = *upper;
    if len % 2 == 1 {
        upper
    } else {
        let lower = left.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (lower + upper) * 0.5
    }
}

/// Most frequent value, compared exactly. Ties resolve to the smallest value.
///
/// Raw frames hold integer counts, so exact comparison is meaningful there.
/// On gain-corrected (continuous) data nearly every value is unique and the
/// result degrades towards the sample minimum; treat it as an approximation.
pub fn mode(values: &[f64]) -> Result<f64> {
    ensure_not_empty(values, "mode")?;
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);

    let mut best = sorted[0];
    let mut best_run = 0usize;
    let mut run_start = 0usize;
    for i in 1..=sorted.len() {
        if i == sorted.len() || sorted[i] != sorted[run_start] {
            let run = i - run_start;
            if run > best_run {
                best_run = run;
                best = sorted[run_start];
            }
            run_start = i;
        }
    }
    Ok(best)
}

/// Default sigma-clipped mean.
pub fn robust(values: &[f64]) -> Result<f64> {
    Ok(robust_mean(values)?.mean)
}

/// Average of median, robust mean, mean and mode.
pub fn blended(values: &[f64]) -> Result<f64> {
    let parts = [median(values)?, robust(values)?, mean(values)?, mode(values)?];
    Ok(parts.iter().sum::<f64>() / parts.len() as f64)
}

/// Arithmetic mean of a whole region, without copying it.
pub fn mean_of(region: ArrayView2<'_, f64>) -> Result<f64> {
    region.mean().ok_or_else(|| {
        CalibrationError::EmptyRegion(format!("{}x{} region", region.nrows(), region.ncols()))
    })
}

/// Reduces the whole region to a single value.
pub fn estimate(region: ArrayView2<'_, f64>, method: NormalizationMethod) -> Result<f64> {
    if region.is_empty() {
        return Err(CalibrationError::EmptyRegion(format!(
            "{}x{} region",
            region.nrows(),
            region.ncols()
        )));
    }
    let values: Vec<f64> = region.iter().copied().collect();
    (method.estimator())(&values)
}

/// Reduces each column of the region to one value.
///
/// A column that cannot be estimated fails the whole call.
pub fn estimate_columns(
    region: ArrayView2<'_, f64>,
    method: NormalizationMethod,
) -> Result<Array1<f64>> {
    if region.is_empty() {
        return Err(CalibrationError::EmptyRegion(format!(
            "{}x{} region",
            region.nrows(),
            region.ncols()
        )));
    }
    let estimator = method.estimator();
    let per_column = region
        .axis_iter(Axis(1))
        .into_par_iter()
        .map(|column| estimator(&column.to_vec()))
        .collect::<Result<Vec<f64>>>()?;
    Ok(Array1::from(per_column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array2, array};

    #[test]
    fn test_mean_median() {
        let v = [4.0, 1.0, 3.0, 2.0];
        assert_relative_eq!(mean(&v).unwrap(), 2.5);
        assert_relative_eq!(median(&v).unwrap(), 2.5);
        assert_relative_eq!(median(&[7.0, 1.0, 3.0]).unwrap(), 3.0);
    }

    #[test]
    fn test_mode_prefers_smallest_on_tie() {
        assert_eq!(mode(&[3.0, 1.0, 3.0, 2.0, 2.0]).unwrap(), 2.0);
        assert_eq!(mode(&[5.0, 9.0, 9.0, 1.0]).unwrap(), 9.0);
        assert_eq!(mode(&[4.5]).unwrap(), 4.5);
    }

    #[test]
    fn test_empty_inputs_are_errors() {
        assert!(matches!(mean(&[]), Err(CalibrationError::EmptyRegion(_))));
        assert!(matches!(median(&[]), Err(CalibrationError::EmptyRegion(_))));
        assert!(matches!(mode(&[]), Err(CalibrationError::EmptyRegion(_))));
        assert!(matches!(blended(&[]), Err(CalibrationError::EmptyRegion(_))));

        let empty = Array2::<f64>::zeros((0, 4));
        assert!(matches!(
            estimate_columns(empty.view(), NormalizationMethod::Mean),
            Err(CalibrationError::EmptyRegion(_))
        ));
        assert!(matches!(
            estimate(empty.view(), NormalizationMethod::Median),
            Err(CalibrationError::EmptyRegion(_))
        ));
    }

    #[test]
    fn test_blended_is_average_of_components() {
        let v = [10.0, 10.0, 11.0, 12.0, 13.0];
        let expected = (median(&v).unwrap()
            + robust(&v).unwrap()
            + mean(&v).unwrap()
            + mode(&v).unwrap())
            / 4.0;
        assert_relative_eq!(blended(&v).unwrap(), expected);
    }

    #[test]
    fn test_estimate_columns_per_method() {
        let region = array![
            [10.0, 20.0, 30.0],
            [10.0, 22.0, 30.0],
            [13.0, 24.0, 30.0],
        ];
        let means = estimate_columns(region.view(), NormalizationMethod::Mean).unwrap();
        assert_relative_eq!(means[0], 11.0);
        assert_relative_eq!(means[1], 22.0);
        assert_relative_eq!(means[2], 30.0);

        let medians = estimate_columns(region.view(), NormalizationMethod::Median).unwrap();
        assert_eq!(medians.to_vec(), vec![10.0, 22.0, 30.0]);

        let modes = estimate_columns(region.view(), NormalizationMethod::Mode).unwrap();
        assert_eq!(modes.to_vec(), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_constant_region_agrees_across_methods() {
        let region = Array2::from_elem((6, 5), 100.0);
        for method in NormalizationMethod::ALL {
            assert_relative_eq!(estimate(region.view(), method).unwrap(), 100.0);
            for v in estimate_columns(region.view(), method).unwrap() {
                assert_relative_eq!(v, 100.0);
            }
        }
    }
}
