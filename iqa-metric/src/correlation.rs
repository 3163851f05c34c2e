//! Agreement between predicted quality scores and ground-truth opinion scores.

use core::{cmp::Ordering, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::{MetricError, MetricResult},
    fit::{fit_curve, CurveType},
};

fn check_lengths(x: &[f64], y: &[f64]) -> MetricResult<()> {
    if x.len() != y.len() {
        return Err(MetricError::LengthMismatch {
            predictions: x.len(),
            targets: y.len(),
        });
    }
    Ok(())
}

fn check_pairs(metric: &'static str, x: &[f64], y: &[f64]) -> MetricResult<()> {
    check_lengths(x, y)?;
    if x.len() < 2 {
        return Err(MetricError::InsufficientSamples {
            metric,
            required: 2,
            actual: x.len(),
        });
    }
    Ok(())
}

fn rescale(x: &[f64], y: &[f64], curve_type: Option<CurveType>) -> MetricResult<Vec<f64>> {
    match curve_type {
        Some(curve_type) => fit_curve(x, y, curve_type),
        None => Ok(x.to_vec()),
    }
}

/// Root of the summed squared error between `x` and `y`.
///
/// The sum is not divided by the number of samples: the reported value is
/// `sqrt(Σ (x − y)²)`. Empty inputs give `0.0`. With `fit_scale`, `x` is first
/// mapped onto `y` by a 4-parameter logistic fit.
///
/// # Errors
///
/// Returns an error on length mismatch or when the rescaling fit fails.
pub fn calculate_rmse(x: &[f64], y: &[f64], fit_scale: bool) -> MetricResult<f64> {
    rmse(x, y, fit_scale.then_some(CurveType::FourParams))
}

fn rmse(x: &[f64], y: &[f64], curve_type: Option<CurveType>) -> MetricResult<f64> {
    check_lengths(x, y)?;
    if x.is_empty() {
        return Ok(0.0);
    }
    let x = rescale(x, y, curve_type)?;
    let sum_sq: f64 = x.iter().zip(y).map(|(a, b)| (a - b) * (a - b)).sum();
    Ok(sum_sq.sqrt())
}

/// Pearson linear correlation coefficient, optionally after a 4-parameter
/// logistic rescale of `x`.
///
/// Returns `NaN` when either input has zero variance.
///
/// # Errors
///
/// Returns an error on length mismatch, fewer than two samples, or when the
/// rescaling fit fails.
pub fn calculate_plcc(x: &[f64], y: &[f64], fit_scale: bool) -> MetricResult<f64> {
    plcc(x, y, fit_scale.then_some(CurveType::FourParams))
}

fn plcc(x: &[f64], y: &[f64], curve_type: Option<CurveType>) -> MetricResult<f64> {
    check_pairs("PLCC", x, y)?;
    let x = rescale(x, y, curve_type)?;
    Ok(pearson(&x, y))
}

/// Spearman rank correlation: Pearson correlation of the average ranks.
///
/// # Errors
///
/// Returns an error on length mismatch or fewer than two samples.
pub fn calculate_srcc(x: &[f64], y: &[f64]) -> MetricResult<f64> {
    check_pairs("SRCC", x, y)?;
    Ok(pearson(&average_ranks(x), &average_ranks(y)))
}

/// Kendall rank correlation, tau-b variant (adjusted for ties).
///
/// Returns `NaN` when every pair is tied in `x` or in `y`.
///
/// # Errors
///
/// Returns an error on length mismatch or fewer than two samples.
pub fn calculate_krcc(x: &[f64], y: &[f64]) -> MetricResult<f64> {
    check_pairs("KRCC", x, y)?;

    let n = x.len();
    let mut net_concordant: i64 = 0;
    let mut tied_x: u64 = 0;
    let mut tied_y: u64 = 0;
    for i in 0..n {
        for j in i + 1..n {
            let dx = sign(x[i] - x[j]);
            let dy = sign(y[i] - y[j]);
            if dx == 0 {
                tied_x += 1;
            }
            if dy == 0 {
                tied_y += 1;
            }
            net_concordant += i64::from(dx * dy);
        }
    }

    let pairs = (n * (n - 1) / 2) as u64;
    let denominator = (((pairs - tied_x) as f64) * ((pairs - tied_y) as f64)).sqrt();
    if denominator == 0.0 {
        return Ok(f64::NAN);
    }
    Ok((net_concordant as f64 / denominator).clamp(-1.0, 1.0))
}

fn sign(v: f64) -> i32 {
    match v.partial_cmp(&0.0) {
        Some(Ordering::Greater) => 1,
        Some(Ordering::Less) => -1,
        _ => 0,
    }
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 {
        return f64::NAN;
    }
    (cov / denominator).clamp(-1.0, 1.0)
}

/// 1-based ranks with tied values sharing the mean of their positions.
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end hold equal values; ranks are start+1 ..= end.
        let rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}

/// The four score-agreement statistics, addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorrelationMetric {
    Rmse,
    Plcc,
    Srcc,
    Krcc,
}

impl CorrelationMetric {
    pub const ALL: [Self; 4] = [Self::Rmse, Self::Plcc, Self::Srcc, Self::Krcc];

    /// Name the metric is registered under.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rmse => "calculate_rmse",
            Self::Plcc => "calculate_plcc",
            Self::Srcc => "calculate_srcc",
            Self::Krcc => "calculate_krcc",
        }
    }

    /// Short upper-case label for reports.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rmse => "RMSE",
            Self::Plcc => "PLCC",
            Self::Srcc => "SRCC",
            Self::Krcc => "KRCC",
        }
    }

    /// Whether a higher value means better agreement.
    pub const fn higher_is_better(self) -> bool {
        !matches!(self, Self::Rmse)
    }

    /// Compute the metric; `fit_scale` applies the 4-parameter logistic
    /// rescale to RMSE and PLCC and is ignored by the rank correlations.
    pub fn compute(self, x: &[f64], y: &[f64], fit_scale: bool) -> MetricResult<f64> {
        self.compute_with_curve(x, y, fit_scale.then_some(CurveType::FourParams))
    }

    /// Like [`compute`](Self::compute) but with an explicit rescaling curve.
    pub fn compute_with_curve(
        self,
        x: &[f64],
        y: &[f64],
        curve_type: Option<CurveType>,
    ) -> MetricResult<f64> {
        match self {
            Self::Rmse => rmse(x, y, curve_type),
            Self::Plcc => plcc(x, y, curve_type),
            Self::Srcc => calculate_srcc(x, y),
            Self::Krcc => calculate_krcc(x, y),
        }
    }
}

impl fmt::Display for CorrelationMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CorrelationMetric {
    type Err = MetricError;

    /// Accepts the registered name (`calculate_plcc`) or the short label in
    /// any case (`plcc`, `PLCC`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s || m.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| MetricError::UnknownMetric { name: s.to_owned() })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn perfect_agreement_and_reversal() {
        let x = [1.0, 2.0, 3.0];
        let up = [1.0, 2.0, 3.0];
        let down = [3.0, 2.0, 1.0];

        assert_abs_diff_eq!(calculate_plcc(&x, &up, false).unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(calculate_plcc(&x, &down, false).unwrap(), -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(calculate_srcc(&x, &up).unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(calculate_srcc(&x, &down).unwrap(), -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(calculate_krcc(&x, &up).unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(calculate_krcc(&x, &down).unwrap(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn rmse_is_root_of_summed_squares() {
        let x = [1.0, 2.0, 3.0];
        let y = [2.0, 2.0, 5.0];

        // sqrt(1 + 0 + 4), not the per-sample sqrt(5 / 3).
        assert_abs_diff_eq!(
            calculate_rmse(&x, &y, false).unwrap(),
            5f64.sqrt(),
            epsilon = 1e-12
        );
        assert_eq!(calculate_rmse(&[], &[], false).unwrap(), 0.0);
        assert_eq!(calculate_rmse(&[], &[], true).unwrap(), 0.0);
    }

    #[test]
    fn pearson_matches_hand_computation() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 2.9, 5.2, 6.9];
        // Sxy = 10, Sxx = 5, Syy = 9 + 1.21 + 1.44 + 8.41 = 20.06
        let expected = 10.0 / (5.0f64 * 20.06).sqrt();
        assert_abs_diff_eq!(calculate_plcc(&x, &y, false).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn ties_use_average_ranks() {
        assert_eq!(average_ranks(&[10.0, 20.0, 10.0, 30.0]), vec![1.5, 3.0, 1.5, 4.0]);

        // Ranks of x: [1.5, 1.5, 3, 4]; y is strictly increasing.
        let x = [1.0, 1.0, 2.0, 3.0];
        let y = [1.0, 2.0, 3.0, 4.0];
        let rx = [1.5, 1.5, 3.0, 4.0];
        let ry = [1.0, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(
            calculate_srcc(&x, &y).unwrap(),
            pearson(&rx, &ry),
            epsilon = 1e-12
        );
    }

    #[test]
    fn kendall_tau_b_corrects_for_ties() {
        // Pairs: 6 total, 1 tied in x, none in y, all others concordant.
        let x = [1.0, 1.0, 2.0, 3.0];
        let y = [1.0, 2.0, 3.0, 4.0];
        let expected = 5.0 / (5.0f64 * 6.0).sqrt();
        assert_abs_diff_eq!(calculate_krcc(&x, &y).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_inputs_give_nan() {
        let flat = [2.0, 2.0, 2.0];
        let y = [1.0, 2.0, 3.0];

        assert!(calculate_plcc(&flat, &y, false).unwrap().is_nan());
        assert!(calculate_srcc(&flat, &y).unwrap().is_nan());
        assert!(calculate_krcc(&flat, &y).unwrap().is_nan());
    }

    #[test]
    fn precondition_errors() {
        assert!(matches!(
            calculate_plcc(&[1.0, 2.0], &[1.0], false),
            Err(MetricError::LengthMismatch {
                predictions: 2,
                targets: 1
            })
        ));
        assert!(matches!(
            calculate_srcc(&[1.0], &[1.0]),
            Err(MetricError::InsufficientSamples {
                metric: "SRCC",
                required: 2,
                actual: 1
            })
        ));
        assert!(matches!(
            calculate_rmse(&[1.0], &[1.0, 2.0], false),
            Err(MetricError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn fit_scale_improves_monotonic_nonlinear_predictions() {
        let x: Vec<f64> = (0..=20).map(|i| f64::from(i) * 0.5).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|&xi| 4.0 / (1.0 + (-(xi - 5.0) / 1.5).exp()) + 1.0)
            .collect();

        let raw = calculate_plcc(&x, &y, false).unwrap();
        let fitted = calculate_plcc(&x, &y, true).unwrap();
        assert!(fitted > raw);
        assert_abs_diff_eq!(fitted, 1.0, epsilon = 1e-9);

        // Rank metrics are invariant to the rescale.
        assert_eq!(
            CorrelationMetric::Srcc.compute(&x, &y, true).unwrap(),
            CorrelationMetric::Srcc.compute(&x, &y, false).unwrap()
        );
    }

    #[test]
    fn metric_names_round_trip() {
        for metric in CorrelationMetric::ALL {
            assert_eq!(metric.name().parse::<CorrelationMetric>().unwrap(), metric);
            assert_eq!(metric.label().parse::<CorrelationMetric>().unwrap(), metric);
        }
        assert_eq!("krcc".parse::<CorrelationMetric>().unwrap(), CorrelationMetric::Krcc);
        assert!(matches!(
            "calculate_mae".parse::<CorrelationMetric>(),
            Err(MetricError::UnknownMetric { .. })
        ));
        assert!(!CorrelationMetric::Rmse.higher_is_better());
        assert!(CorrelationMetric::Plcc.higher_is_better());
    }

    /// Predictions in `[0, 1]` against MOS in `[1, 5]` related by a steep
    /// sigmoid, with a small deterministic wobble standing in for rater noise.
    fn noisy_quality_scores() -> (Vec<f64>, Vec<f64>) {
        let n = 40;
        let x: Vec<f64> = (0..n).map(|i| f64::from(i) / f64::from(n - 1)).collect();
        let y = x
            .iter()
            .zip(0..n)
            .map(|(&xi, i)| {
                let wobble = 0.15 * (2.3 * f64::from(i) + 0.7).sin();
                1.0 + 4.0 / (1.0 + (-(xi - 0.55) / 0.08).exp()) + wobble
            })
            .collect();
        (x, y)
    }

    #[test]
    fn logistic_rescale_improves_plcc_on_noisy_scores() {
        let (x, y) = noisy_quality_scores();
        let raw = CorrelationMetric::Plcc.compute_with_curve(&x, &y, None).unwrap();
        assert!(raw < 0.97, "raw PLCC {raw}");

        for curve_type in [CurveType::FourParams, CurveType::FiveParams] {
            let fitted = CorrelationMetric::Plcc
                .compute_with_curve(&x, &y, Some(curve_type))
                .unwrap();
            assert!(fitted > raw + 0.03, "{curve_type}: {fitted} vs raw {raw}");
            assert!(fitted > 0.99, "{curve_type}: {fitted}");

            let rmse_raw = CorrelationMetric::Rmse.compute_with_curve(&x, &y, None).unwrap();
            let rmse_fitted = CorrelationMetric::Rmse
                .compute_with_curve(&x, &y, Some(curve_type))
                .unwrap();
            assert!(rmse_fitted < rmse_raw);
        }
    }
}
