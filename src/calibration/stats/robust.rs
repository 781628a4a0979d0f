//! Iterative sigma-clipped mean.
//!
//! Each pass takes the median and median absolute deviation of the surviving
//! sample, converts the MAD to a Gaussian sigma, and drops everything farther
//! than `sigma_threshold` sigmas from the median. Passes repeat until nothing
//! more is clipped or the iteration cap is hit; the mean of what is left is
//! the estimate.

use crate::calibration::common::error::{CalibrationError, Result};
use crate::calibration::stats::median_mut;

/// For a normal distribution, sigma = 1.4826 * MAD.
pub const MAD_TO_SIGMA: f64 = 1.482_602_218_505_602;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobustMeanParams {
    /// Clip threshold in MAD-derived sigmas.
    pub sigma_threshold: f64,
    pub max_iterations: usize,
    /// Below this many survivors the clipped result is abandoned for a plain mean.
    pub min_survivors: usize,
}

impl Default for RobustMeanParams {
    fn default() -> Self {
        Self {
            sigma_threshold: 3.0,
            max_iterations: 10,
            min_survivors: 3,
        }
    }
}

impl RobustMeanParams {
    pub fn with_sigma(sigma_threshold: f64) -> Self {
        Self {
            sigma_threshold,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobustEstimate {
    pub mean: f64,
    /// Standard deviation of the surviving sample.
    pub sigma: f64,
    pub survivors: usize,
}

impl RobustEstimate {
    fn of(sample: &[f64]) -> Self {
        let n = sample.len() as f64;
        let mean = sample.iter().sum::<f64>() / n;
        let variance = sample.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean,
            sigma: variance.sqrt(),
            survivors: sample.len(),
        }
    }
}

pub fn robust_mean(values: &[f64]) -> Result<RobustEstimate> {
    robust_mean_with(values, RobustMeanParams::default())
}

pub fn robust_mean_with(values: &[f64], params: RobustMeanParams) -> Result<RobustEstimate> {
    if values.is_empty() {
        return Err(CalibrationError::EmptyRegion("robust mean".to_string()));
    }

    let mut sample = values.to_vec();
    let mut scratch = Vec::with_capacity(sample.len());

    for _ in 0..params.max_iterations {
        let center = median_mut(&mut sample);

        scratch.clear();
        scratch.extend(sample.iter().map(|v| (v - center).abs()));
        let sigma = MAD_TO_SIGMA * median_mut(&mut scratch);
        let limit = params.sigma_threshold * sigma;

        let before = sample.len();
        sample.retain(|v| (v - center).abs() <= limit);

        if sample.len() < params.min_survivors.min(values.len()) || sample.is_empty() {
            return Ok(RobustEstimate::of(values));
        }
        if sample.len() == before {
            break;
        }
    }

    Ok(RobustEstimate::of(&sample))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_sample() {
        let est = robust_mean(&[100.0; 16]).unwrap();
        assert_relative_eq!(est.mean, 100.0);
        assert_relative_eq!(est.sigma, 0.0);
        assert_eq!(est.survivors, 16);
    }

    #[test]
    fn test_outlier_is_clipped() {
        let mut values = vec![10.0, 11.0, 9.0, 10.0, 10.5, 9.5, 10.0, 11.0, 9.0, 10.0];
        values.push(5000.0);
        let est = robust_mean(&values).unwrap();
        assert_eq!(est.survivors, 10);
        assert_relative_eq!(est.mean, 10.0, epsilon = 1e-12);

        let plain = values.iter().sum::<f64>() / values.len() as f64;
        assert!(plain > 400.0);
    }

    #[test]
    fn test_tighter_threshold_clips_more() {
        let values: Vec<f64> = (0..50).map(|i| (i % 10) as f64).chain([30.0, 31.0]).collect();
        let loose = robust_mean_with(&values, RobustMeanParams::with_sigma(10.0)).unwrap();
        let tight = robust_mean_with(&values, RobustMeanParams::with_sigma(2.0)).unwrap();
        assert!(tight.survivors < loose.survivors);
        assert!(tight.mean < loose.mean);
    }

    #[test]
    fn test_two_point_sample() {
        let est = robust_mean(&[1.0, 100.0]).unwrap();
        assert_relative_eq!(est.mean, 50.5);
        assert_eq!(est.survivors, 2);
    }

    #[test]
    fn test_scaling_commutes() {
        let values = [12.0, 15.0, 11.0, 14.0, 90.0, 13.0, 12.0, 16.0];
        let base = robust_mean(&values).unwrap().mean;
        let scaled: Vec<f64> = values.iter().map(|v| v * 2.5).collect();
        assert_relative_eq!(robust_mean(&scaled).unwrap().mean, base * 2.5, max_relative = 1e-12);
    }

    #[test]
    fn test_empty_is_error() {
        assert!(matches!(robust_mean(&[]), Err(CalibrationError::EmptyRegion(_))));
    }
}
