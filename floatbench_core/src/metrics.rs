//! Reconstruction error statistics.
//!
//! All per-element differences are taken in `f64` and summed with Neumaier
//! compensation, so the means stay accurate over inputs of hundreds of
//! millions of floats.

use serde::{Deserialize, Serialize};

/// How PSNR is derived from MSE and the value range of the original data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PsnrFormula {
    /// `20·log10(range − 10·log10(MSE))`, the figure recorded by earlier runs.
    #[default]
    RangeOffset,
    /// `20·log10(range) − 10·log10(MSE)`.
    Conventional,
}

impl PsnrFormula {
    /// NaN whenever `mse` is not strictly positive or a log argument is not positive.
    pub fn apply(self, value_range: f64, mse: f64) -> f64 {
        if mse.is_nan() || mse <= 0.0 {
            return f64::NAN;
        }
        match self {
            PsnrFormula::RangeOffset => {
                let arg = value_range - 10.0 * mse.log10();
                if arg > 0.0 {
                    20.0 * arg.log10()
                } else {
                    f64::NAN
                }
            }
            PsnrFormula::Conventional => {
                if value_range > 0.0 {
                    20.0 * value_range.log10() - 10.0 * mse.log10()
                } else {
                    f64::NAN
                }
            }
        }
    }
}

/// Compensated (Neumaier) running sum.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeumaierSum {
    sum: f64,
    compensation: f64,
}

impl NeumaierSum {
    pub fn add(&mut self, x: f64) {
        let t = self.sum + x;
        if self.sum.abs() >= x.abs() {
            self.compensation += (self.sum - t) + x;
        } else {
            self.compensation += (x - t) + self.sum;
        }
        self.sum = t;
    }

    pub fn total(&self) -> f64 {
        self.sum + self.compensation
    }
}

/// NaN-propagating maximum.
fn max_propagating(acc: f64, x: f64) -> f64 {
    if acc.is_nan() || x.is_nan() {
        f64::NAN
    } else {
        acc.max(x)
    }
}

/// Error profile of a reconstruction against its original.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetrics {
    #[serde(rename = "MSE")]
    pub mse: f64,
    #[serde(rename = "PSNR")]
    pub psnr: f64,
    /// Percent.
    #[serde(rename = "meanRelError")]
    pub mean_rel_error: f64,
    /// Percent.
    #[serde(rename = "maxRelError")]
    pub max_rel_error: f64,
    #[serde(rename = "meanAbsError")]
    pub mean_abs_error: f64,
    #[serde(rename = "maxAbsError")]
    pub max_abs_error: f64,
}

impl ErrorMetrics {
    /// Every metric NaN: the degraded outcome for empty or length-mismatched input.
    pub fn nan() -> Self {
        Self {
            mse: f64::NAN,
            psnr: f64::NAN,
            mean_rel_error: f64::NAN,
            max_rel_error: f64::NAN,
            mean_abs_error: f64::NAN,
            max_abs_error: f64::NAN,
        }
    }

    /// Compare `reconstructed` against `original`.
    ///
    /// Returns [`ErrorMetrics::nan`] when the lengths differ or the input is
    /// empty. Elements whose original value is exactly zero contribute a
    /// relative error of 0.
    pub fn compute(original: &[f32], reconstructed: &[f32], formula: PsnrFormula) -> Self {
        if original.len() != reconstructed.len() || original.is_empty() {
            return Self::nan();
        }
        let n = original.len() as f64;

        let mut sq = NeumaierSum::default();
        let mut abs = NeumaierSum::default();
        let mut rel = NeumaierSum::default();
        let mut max_abs = 0.0f64;
        let mut max_rel = 0.0f64;

        for (&a, &b) in original.iter().zip(reconstructed) {
            let a = a as f64;
            let diff = a - b as f64;
            let abs_err = diff.abs();
            let rel_err = if a != 0.0 { abs_err * 100.0 / a.abs() } else { 0.0 };

            sq.add(diff * diff);
            abs.add(abs_err);
            rel.add(rel_err);
            max_abs = max_propagating(max_abs, abs_err);
            max_rel = max_propagating(max_rel, rel_err);
        }

        let mse = sq.total() / n;
        Self {
            mse,
            psnr: formula.apply(value_range(original), mse),
            mean_rel_error: rel.total() / n,
            max_rel_error: max_rel,
            mean_abs_error: abs.total() / n,
            max_abs_error: max_abs,
        }
    }
}

/// `max − min` over the finite values of `values`; NaN when there are none.
pub fn value_range(values: &[f32]) -> f64 {
    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if min > max {
        return f64::NAN;
    }
    max as f64 - min as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sequences_have_zero_error_and_nan_psnr() {
        let x = [1.0f32, -2.0, 3.5, 0.0];
        let m = ErrorMetrics::compute(&x, &x, PsnrFormula::RangeOffset);
        assert_eq!(m.mse, 0.0);
        assert!(m.psnr.is_nan(), "zero MSE leaves PSNR undefined");
        assert_eq!(m.max_abs_error, 0.0);
        assert_eq!(m.mean_rel_error, 0.0);
    }

    #[test]
    fn known_errors() {
        let original = [1.0f32, 2.0, 4.0, 0.0];
        let decoded = [1.5f32, 2.0, 3.0, 0.25];
        let m = ErrorMetrics::compute(&original, &decoded, PsnrFormula::Conventional);

        // diffs: 0.5, 0, 1, 0.25
        assert!((m.mse - (0.25 + 0.0 + 1.0 + 0.0625) / 4.0).abs() < 1e-12);
        assert!((m.mean_abs_error - 1.75 / 4.0).abs() < 1e-12);
        assert_eq!(m.max_abs_error, 1.0);
        // rel %: 50, 0, 25, 0 (zero original contributes 0)
        assert!((m.mean_rel_error - 75.0 / 4.0).abs() < 1e-12);
        assert_eq!(m.max_rel_error, 50.0);

        let expected_psnr = 20.0 * 4.0f64.log10() - 10.0 * m.mse.log10();
        assert!((m.psnr - expected_psnr).abs() < 1e-12);
    }

    #[test]
    fn range_offset_formula_reproduces_recorded_figures() {
        // range 10, mse 0.01 → 20·log10(10 + 20) = 29.542...
        let psnr = PsnrFormula::RangeOffset.apply(10.0, 0.01);
        assert!((psnr - 20.0 * 30.0f64.log10()).abs() < 1e-12);
        // a non-positive log argument is not a number, not -inf
        assert!(PsnrFormula::RangeOffset.apply(-100.0, 10.0).is_nan());
    }

    #[test]
    fn length_mismatch_and_empty_input_degrade_to_nan() {
        let m = ErrorMetrics::compute(&[1.0, 2.0], &[1.0], PsnrFormula::default());
        assert!(m.mse.is_nan() && m.psnr.is_nan());
        assert!(m.mean_abs_error.is_nan() && m.max_abs_error.is_nan());
        assert!(m.mean_rel_error.is_nan() && m.max_rel_error.is_nan());

        let m = ErrorMetrics::compute(&[], &[], PsnrFormula::default());
        assert!(m.mse.is_nan() && m.max_rel_error.is_nan());
    }

    #[test]
    fn nan_element_propagates_to_max() {
        let m = ErrorMetrics::compute(&[1.0, 2.0], &[1.0, f32::NAN], PsnrFormula::default());
        assert!(m.max_abs_error.is_nan());
        assert!(m.mean_abs_error.is_nan());
    }

    #[test]
    fn compensated_sum_keeps_small_terms() {
        let mut s = NeumaierSum::default();
        s.add(1.0e16);
        for _ in 0..1000 {
            s.add(1.0);
        }
        s.add(-1.0e16);
        assert_eq!(s.total(), 1000.0);
    }

    #[test]
    fn value_range_ignores_non_finite() {
        assert_eq!(value_range(&[3.0, f32::NAN, -1.0, f32::INFINITY]), 4.0);
        assert!(value_range(&[]).is_nan());
    }
}
