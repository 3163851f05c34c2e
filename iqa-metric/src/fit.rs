//! Logistic rescaling of predicted scores onto the ground-truth scale.

use core::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::{MetricError, MetricResult},
    optimize::{LevenbergMarquardt, Model},
};

/// Which logistic family to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CurveType {
    /// `ŷ = (β1 − β2) / (1 + exp(−(x − β3) / β4)) + β2`
    #[default]
    #[serde(rename = "4params")]
    FourParams,
    /// `ŷ = β1 · (0.5 − 1 / (1 + exp(β2 · (x − β3)))) + β4 · x + β5`
    #[serde(rename = "5params")]
    FiveParams,
}

impl CurveType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FourParams => "4params",
            Self::FiveParams => "5params",
        }
    }
}

impl fmt::Display for CurveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurveType {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "4params" => Ok(Self::FourParams),
            "5params" => Ok(Self::FiveParams),
            _ => Err(MetricError::InvalidCurveType { name: s.to_owned() }),
        }
    }
}

/// Numerically stable logistic function.
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

struct Logistic4;

impl Model<4> for Logistic4 {
    fn eval(&self, x: f64, b: &[f64; 4]) -> f64 {
        (b[0] - b[1]) * sigmoid((x - b[2]) / b[3]) + b[1]
    }

    fn gradient(&self, x: f64, b: &[f64; 4]) -> [f64; 4] {
        let s = sigmoid((x - b[2]) / b[3]);
        let slope = (b[0] - b[1]) * s * (1.0 - s) / b[3];
        [s, 1.0 - s, -slope, -slope * (x - b[2]) / b[3]]
    }
}

struct Logistic5;

impl Model<5> for Logistic5 {
    fn eval(&self, x: f64, b: &[f64; 5]) -> f64 {
        // 0.5 − 1 / (1 + exp(u)) == σ(u) − 0.5
        b[0] * (sigmoid(b[1] * (x - b[2])) - 0.5) + b[3] * x + b[4]
    }

    fn gradient(&self, x: f64, b: &[f64; 5]) -> [f64; 5] {
        let s = sigmoid(b[1] * (x - b[2]));
        let ds = b[0] * s * (1.0 - s);
        [s - 0.5, ds * (x - b[2]), -ds * b[1], x, 1.0]
    }
}

fn mean(v: &[f64]) -> f64 {
    v.iter().sum::<f64>() / v.len() as f64
}

/// Population standard deviation.
fn std_dev(v: &[f64]) -> f64 {
    let m = mean(v);
    (v.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / v.len() as f64).sqrt()
}

/// Fit a logistic curve mapping `x` onto `y` and return the curve evaluated
/// at `x`.
///
/// # Errors
///
/// - [`MetricError::LengthMismatch`] if `x` and `y` differ in length
/// - [`MetricError::InsufficientSamples`] with fewer samples than parameters
/// - [`MetricError::FitFailed`] if the solver does not converge
pub fn fit_curve(x: &[f64], y: &[f64], curve_type: CurveType) -> MetricResult<Vec<f64>> {
    if x.len() != y.len() {
        return Err(MetricError::LengthMismatch {
            predictions: x.len(),
            targets: y.len(),
        });
    }

    let solver = LevenbergMarquardt::default();
    match curve_type {
        CurveType::FourParams => {
            check_samples(x.len(), 4)?;
            let y_max = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let y_min = y.iter().copied().fold(f64::INFINITY, f64::min);
            let init = [y_max, y_min, mean(x), std_dev(x) / 4.0];
            let report = solver.minimize(&Logistic4, x, y, init)?;
            log::debug!(
                "4-parameter logistic fit: {:?} after {} evaluations",
                report.params,
                report.evaluations
            );
            Ok(x.iter().map(|&xi| Logistic4.eval(xi, &report.params)).collect())
        }
        CurveType::FiveParams => {
            check_samples(x.len(), 5)?;
            let init = [10.0, 0.0, mean(y), 0.1, 0.1];
            let report = solver.minimize(&Logistic5, x, y, init)?;
            log::debug!(
                "5-parameter logistic fit: {:?} after {} evaluations",
                report.params,
                report.evaluations
            );
            Ok(x.iter().map(|&xi| Logistic5.eval(xi, &report.params)).collect())
        }
    }
}

fn check_samples(actual: usize, required: usize) -> MetricResult<()> {
    if actual < required {
        return Err(MetricError::InsufficientSamples {
            metric: "fit_curve",
            required,
            actual,
        });
    }
    Ok(())
}
