//! # IQA Metrics
//!
//! Statistics that measure how well predicted image quality scores agree with
//! ground-truth mean opinion scores (MOS).
//!
//! - [`calculate_rmse`]: root of the summed squared error
//! - [`calculate_plcc`]: Pearson linear correlation
//! - [`calculate_srcc`]: Spearman rank correlation
//! - [`calculate_krcc`]: Kendall rank correlation (tau-b)
//!
//! RMSE and PLCC can first map predictions onto the MOS scale with a logistic
//! curve ([`fit_curve`]), fitted by a small Levenberg–Marquardt solver.
//! [`ScoreCollector`] gathers Burn tensors over evaluation batches and
//! computes a [`CorrelationReport`] at the end.
//!
//! ## Usage
//!
//! ```rust
//! use iqa_metric::{calculate_plcc, calculate_srcc};
//!
//! let predictions = [0.2, 0.5, 0.4, 0.9];
//! let mos = [1.5, 3.0, 2.5, 4.8];
//!
//! let plcc = calculate_plcc(&predictions, &mos, false).unwrap();
//! let srcc = calculate_srcc(&predictions, &mos).unwrap();
//! assert!(plcc > 0.9);
//! assert!((srcc - 1.0).abs() < 1e-12);
//! ```

pub mod collector;
pub mod correlation;
pub mod error;
pub mod fit;
pub mod optimize;

pub use collector::{CorrelationReport, ScoreCollector};
pub use correlation::{
    calculate_krcc, calculate_plcc, calculate_rmse, calculate_srcc, CorrelationMetric,
};
pub use error::{MetricError, MetricResult};
pub use fit::{fit_curve, CurveType};
pub use optimize::{FitReport, LevenbergMarquardt, Model};
