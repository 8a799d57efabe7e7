use eb_core::{CoreError, FeatureMatrix, NormalizationPolicy};

/// Ranges or deviations below this are treated as constant rows.
const DEGENERATE_EPS: f32 = 1e-12;

/// What a normalization pass had to correct.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Rows with zero range / zero variance, written as all-zero.
    pub degenerate_rows: usize,
}

impl NormalizeReport {
    /// Under strict validation a corrected row is an error.
    ///
    /// # Errors
    /// `NumericDegeneracy` if any row was degenerate and `strict` is set.
    pub fn check(self, strict: bool) -> Result<(), CoreError> {
        if strict && self.degenerate_rows > 0 {
            return Err(CoreError::NumericDegeneracy(format!(
                "{} ligne(s) de variance nulle",
                self.degenerate_rows
            )));
        }
        if self.degenerate_rows > 0 {
            log::debug!("{} constant feature row(s) set to 0", self.degenerate_rows);
        }
        Ok(())
    }
}

/// Rescale each row in place; the output keeps the input shape.
///
/// # Example
/// ```
/// use eb_audio::normalize::normalize;
/// use eb_core::{FeatureMatrix, NormalizationPolicy};
/// let mut m = FeatureMatrix::from_rows(&[vec![0.0, 5.0, 10.0], vec![3.0, 3.0, 3.0]]).unwrap();
/// let report = normalize(&mut m, NormalizationPolicy::MinMax);
/// assert_eq!(m.row(0), &[-1.0, 0.0, 1.0]);
/// assert_eq!(m.row(1), &[0.0, 0.0, 0.0]);
/// assert_eq!(report.degenerate_rows, 1);
/// ```
pub fn normalize(matrix: &mut FeatureMatrix, policy: NormalizationPolicy) -> NormalizeReport {
    let mut report = NormalizeReport::default();
    for row in matrix.rows_mut() {
        let ok = match policy {
            NormalizationPolicy::MinMax => min_max_row(row),
            NormalizationPolicy::Standardize => standardize_row(row),
        };
        if !ok {
            row.fill(0.0);
            report.degenerate_rows += 1;
        }
    }
    report
}

/// `2*(x-min)/(max-min) - 1`. Returns false for a constant or non-finite row.
fn min_max_row(row: &mut [f32]) -> bool {
    if row.iter().any(|v| !v.is_finite()) {
        return false;
    }
    let (min, max) = row
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    if !range.is_finite() || range < DEGENERATE_EPS {
        return false;
    }
    for v in row.iter_mut() {
        *v = 2.0 * (*v - min) / range - 1.0;
    }
    true
}

/// `(x-mean)/std` with population std. Returns false for zero variance.
fn standardize_row(row: &mut [f32]) -> bool {
    if row.is_empty() {
        return false;
    }
    let n = row.len() as f64;
    let mean = row.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let var = row
        .iter()
        .map(|&v| (f64::from(v) - mean).powi(2))
        .sum::<f64>()
        / n;
    let std = var.sqrt();
    if !std.is_finite() || std < f64::from(DEGENERATE_EPS) {
        return false;
    }
    for v in row.iter_mut() {
        *v = ((f64::from(*v) - mean) / std) as f32;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(rows: usize, cols: usize) -> FeatureMatrix {
        let data = (0..rows * cols)
            .map(|i| ((i * 7919) % 97) as f32 - 40.0)
            .collect();
        FeatureMatrix::from_vec(rows, cols, data).unwrap()
    }

    #[test]
    fn min_max_bounds_every_row() {
        let mut m = ramp(20, 50);
        normalize(&mut m, NormalizationPolicy::MinMax);
        for r in 0..m.rows() {
            let row = m.row(r);
            let lo = row.iter().copied().fold(f32::INFINITY, f32::min);
            let hi = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            assert!((lo + 1.0).abs() < 1e-6);
            assert!((hi - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn min_max_round_trip() {
        let mut once = ramp(20, 50);
        normalize(&mut once, NormalizationPolicy::MinMax);
        let mut twice = once.clone();
        normalize(&mut twice, NormalizationPolicy::MinMax);
        for (a, b) in once.as_slice().iter().zip(twice.as_slice()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn standardize_zero_mean_unit_variance() {
        let mut m = ramp(4, 200);
        normalize(&mut m, NormalizationPolicy::Standardize);
        for r in 0..m.rows() {
            let row = m.row(r);
            let n = row.len() as f32;
            let mean = row.iter().sum::<f32>() / n;
            let var = row.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
            assert!(mean.abs() < 1e-4);
            assert!((var - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn zero_variance_rows_stay_finite() {
        for policy in [NormalizationPolicy::MinMax, NormalizationPolicy::Standardize] {
            let varied: Vec<f32> = (0..16).map(|i| (i % 8 + 1) as f32).collect();
            let mut m = FeatureMatrix::from_rows(&[vec![-100.0; 16], varied]).unwrap();
            let report = normalize(&mut m, policy);
            assert!(m.is_finite());
            assert_eq!(m.row(0), &[0.0; 16]);
            assert_eq!(report.degenerate_rows, 1);
            assert!(report.check(false).is_ok());
            assert!(matches!(
                report.check(true),
                Err(CoreError::NumericDegeneracy(_))
            ));
        }
    }

    #[test]
    fn nan_row_treated_as_degenerate() {
        let mut m = FeatureMatrix::from_rows(&[vec![f32::NAN, 1.0, 2.0]]).unwrap();
        let report = normalize(&mut m, NormalizationPolicy::Standardize);
        assert_eq!(report.degenerate_rows, 1);
        assert!(m.is_finite());
    }
}
