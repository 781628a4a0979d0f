use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::calibration::common::error::CalibrationError;
use crate::calibration::stats::{self, Estimator};

/// Column estimator used for gain normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizationMethod {
    Mean,
    Median,
    /// Most frequent value; slowest of the single estimators.
    Mode,
    /// Iterative sigma-clipped mean.
    #[default]
    RobustMean,
    /// Average of median, robust mean, mean and mode.
    Blended,
}

impl NormalizationMethod {
    pub const ALL: [NormalizationMethod; 5] = [
        NormalizationMethod::Mean,
        NormalizationMethod::Median,
        NormalizationMethod::Mode,
        NormalizationMethod::RobustMean,
        NormalizationMethod::Blended,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NormalizationMethod::Mean => "mean",
            NormalizationMethod::Median => "median",
            NormalizationMethod::Mode => "mode",
            NormalizationMethod::RobustMean => "robust-mean",
            NormalizationMethod::Blended => "blended",
        }
    }

    /// Estimator implementing this method.
    pub fn estimator(self) -> Estimator {
        match self {
            NormalizationMethod::Mean => stats::mean,
            NormalizationMethod::Median => stats::median,
            NormalizationMethod::Mode => stats::mode,
            NormalizationMethod::RobustMean => stats::robust,
            NormalizationMethod::Blended => stats::blended,
        }
    }
}

impl fmt::Display for NormalizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NormalizationMethod {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(NormalizationMethod::Mean),
            "median" => Ok(NormalizationMethod::Median),
            "mode" => Ok(NormalizationMethod::Mode),
            "robust-mean" | "robustmean" | "robust_mean" | "frobomad" | "frobustmean" => {
                Ok(NormalizationMethod::RobustMean)
            }
            "blended" => Ok(NormalizationMethod::Blended),
            _ => Err(CalibrationError::UnknownMethod(s.to_string())),
        }
    }
}

/// Outcome of resolving a method name leniently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSelection {
    pub method: NormalizationMethod,
    /// The unrecognized name that was replaced by the robust mean, if any.
    pub fallback_from: Option<String>,
}

impl MethodSelection {
    pub fn is_fallback(&self) -> bool {
        self.fallback_from.is_some()
    }
}

/// Resolves a method name, substituting the robust mean for unknown names.
///
/// Kept lenient for compatibility with existing callers; use `str::parse`
/// to reject unknown names instead.
pub fn select_method(name: &str) -> MethodSelection {
    match name.parse::<NormalizationMethod>() {
        Ok(method) => MethodSelection {
            method,
            fallback_from: None,
        },
        Err(_) => {
            let accepted: Vec<&str> = NormalizationMethod::ALL.iter().map(|m| m.name()).collect();
            warn!(
                requested = name,
                accepted = ?accepted,
                "Invalid normalization method, using the robust mean"
            );
            MethodSelection {
                method: NormalizationMethod::RobustMean,
                fallback_from: Some(name.to_string()),
            }
        }
    }
}
