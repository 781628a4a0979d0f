//! Optional cosmetic post-processing of a calibrated frame.

use ndarray::{Array2, ArrayView2, Zip};

use crate::calibration::common::error::{CalibrationError, Result};

/// A stage run on the calibrated frame after gain correction.
pub trait PostProcessor {
    fn name(&self) -> &'static str;
    fn process(&self, frame: ArrayView2<'_, f64>) -> Result<Array2<f64>>;
}

/// Adaptive Wiener smoothing.
///
/// Pixels are pulled toward their local mean in proportion to how much of
/// the local variance is attributed to noise. Windows are truncated at the
/// frame edges rather than zero padded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WienerFilter {
    /// Window height and width; even sizes are rounded up to the next odd.
    pub window: (usize, usize),
    /// Noise power. Estimated as the mean local variance when `None`.
    pub noise: Option<f64>,
}

impl Default for WienerFilter {
    fn default() -> Self {
        Self {
            window: (3, 3),
            noise: None,
        }
    }
}

/// Summed-area table with a zero first row and column.
fn integral(frame: ArrayView2<'_, f64>, f: impl Fn(f64) -> f64) -> Array2<f64> {
    let (rows, cols) = frame.dim();
    let mut table = Array2::zeros((rows + 1, cols + 1));
    for r in 0..rows {
        let mut running = 0.0;
        for c in 0..cols {
            running += f(frame[[r, c]]);
            table[[r + 1, c + 1]] = table[[r, c + 1]] + running;
        }
    }
    table
}

fn box_sum(table: &Array2<f64>, rows: (usize, usize), cols: (usize, usize)) -> f64 {
    table[[rows.1, cols.1]] - table[[rows.0, cols.1]] - table[[rows.1, cols.0]]
        + table[[rows.0, cols.0]]
}

impl PostProcessor for WienerFilter {
    fn name(&self) -> &'static str {
        "wiener"
    }

    fn process(&self, frame: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let (rows, cols) = frame.dim();
        if rows == 0 || cols == 0 {
            return Err(CalibrationError::EmptyRegion("wiener filter input".to_string()));
        }
        let half_r = self.window.0 / 2;
        let half_c = self.window.1 / 2;

        let sums = integral(frame, |v| v);
        let squares = integral(frame, |v| v * v);

        let mut local_mean = Array2::zeros((rows, cols));
        let mut local_var = Array2::zeros((rows, cols));
        Zip::indexed(&mut local_mean)
            .and(&mut local_var)
            .par_for_each(|(r, c), mean, var| {
                let rr = (r.saturating_sub(half_r), (r + half_r + 1).min(rows));
                let cc = (c.saturating_sub(half_c), (c + half_c + 1).min(cols));
                let n = ((rr.1 - rr.0) * (cc.1 - cc.0)) as f64;
                let m = box_sum(&sums, rr, cc) / n;
                *mean = m;
                *var = (box_sum(&squares, rr, cc) / n - m * m).max(0.0);
            });

        let noise = match self.noise {
            Some(noise) => noise,
            None => local_var.mean().unwrap_or(0.0),
        };

        let mut out = Array2::zeros((rows, cols));
        Zip::from(&mut out)
            .and(frame)
            .and(&local_mean)
            .and(&local_var)
            .par_for_each(|o, &x, &mean, &var| {
                *o = if var <= noise {
                    mean
                } else {
                    mean + (1.0 - noise / var) * (x - mean)
                };
            });
        Ok(out)
    }
}
