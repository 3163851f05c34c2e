//! Accumulates scores over evaluation batches.

use core::{fmt, marker::PhantomData};

use burn::tensor::{backend::Backend, Tensor};
use serde::{Deserialize, Serialize};

use crate::{
    correlation::CorrelationMetric,
    error::{MetricError, MetricResult},
    fit::CurveType,
};

/// All four agreement statistics for one set of scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub rmse: f64,
    pub plcc: f64,
    pub srcc: f64,
    pub krcc: f64,
}

impl CorrelationReport {
    /// Compute every metric on `x` against `y`, rescaling RMSE and PLCC with
    /// `curve_type` when given.
    pub fn compute(x: &[f64], y: &[f64], curve_type: Option<CurveType>) -> MetricResult<Self> {
        Ok(Self {
            rmse: CorrelationMetric::Rmse.compute_with_curve(x, y, curve_type)?,
            plcc: CorrelationMetric::Plcc.compute_with_curve(x, y, curve_type)?,
            srcc: CorrelationMetric::Srcc.compute_with_curve(x, y, curve_type)?,
            krcc: CorrelationMetric::Krcc.compute_with_curve(x, y, curve_type)?,
        })
    }

    pub const fn get(&self, metric: CorrelationMetric) -> f64 {
        match metric {
            CorrelationMetric::Rmse => self.rmse,
            CorrelationMetric::Plcc => self.plcc,
            CorrelationMetric::Srcc => self.srcc,
            CorrelationMetric::Krcc => self.krcc,
        }
    }
}

impl fmt::Display for CorrelationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RMSE: {:.4}, PLCC: {:.4}, SRCC: {:.4}, KRCC: {:.4}",
            self.rmse, self.plcc, self.srcc, self.krcc
        )
    }
}

/// Collects predicted and ground-truth scores batch by batch.
///
/// Tensors of any rank are flattened, so both `[B]` and `[B, 1]` score
/// tensors are accepted.
#[derive(Debug, Clone)]
pub struct ScoreCollector<B: Backend> {
    predictions: Vec<f64>,
    targets: Vec<f64>,
    _backend: PhantomData<B>,
}

impl<B: Backend> Default for ScoreCollector<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> ScoreCollector<B> {
    pub const fn new() -> Self {
        Self {
            predictions: Vec::new(),
            targets: Vec::new(),
            _backend: PhantomData,
        }
    }

    /// Append one batch of scores.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::LengthMismatch`] if the two tensors hold a
    /// different number of elements, or [`MetricError::TensorData`] if they
    /// cannot be read back as floats. Nothing is appended on error.
    pub fn push<const D: usize>(
        &mut self,
        predictions: Tensor<B, D>,
        targets: Tensor<B, D>,
    ) -> MetricResult<()> {
        let predictions = flatten_scores(predictions)?;
        let targets = flatten_scores(targets)?;
        self.push_slices(&predictions, &targets)
    }

    /// Append scores that are already on the host.
    pub fn push_slices(&mut self, predictions: &[f64], targets: &[f64]) -> MetricResult<()> {
        if predictions.len() != targets.len() {
            return Err(MetricError::LengthMismatch {
                predictions: predictions.len(),
                targets: targets.len(),
            });
        }
        self.predictions.extend_from_slice(predictions);
        self.targets.extend_from_slice(targets);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    pub fn predictions(&self) -> &[f64] {
        &self.predictions
    }

    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    pub fn clear(&mut self) {
        self.predictions.clear();
        self.targets.clear();
    }

    pub fn compute(&self, metric: CorrelationMetric, fit_scale: bool) -> MetricResult<f64> {
        metric.compute(&self.predictions, &self.targets, fit_scale)
    }

    pub fn report(&self, curve_type: Option<CurveType>) -> MetricResult<CorrelationReport> {
        CorrelationReport::compute(&self.predictions, &self.targets, curve_type)
    }
}

fn flatten_scores<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> MetricResult<Vec<f64>> {
    let flat: Tensor<B, 1> = tensor.flatten(0, D - 1);
    flat.into_data()
        .convert::<f64>()
        .to_vec::<f64>()
        .map_err(|e| MetricError::TensorData {
            reason: format!("{e:?}"),
        })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use burn::{backend::NdArray, tensor::TensorData};

    use super::*;
    use crate::correlation::{calculate_krcc, calculate_plcc, calculate_rmse, calculate_srcc};

    type TestBackend = NdArray<f32>;

    #[test]
    fn matches_slice_functions_across_batches() {
        let device = Default::default();
        let mut collector = ScoreCollector::<TestBackend>::new();

        let batches = [
            (vec![0.1f32, 0.4, 0.35], vec![1.0f32, 3.0, 2.0]),
            (vec![0.8f32, 0.6], vec![4.5f32, 4.0]),
        ];
        for (pred, mos) in &batches {
            let n = pred.len();
            let pred =
                Tensor::<TestBackend, 2>::from_data(TensorData::new(pred.clone(), [n, 1]), &device);
            let mos =
                Tensor::<TestBackend, 2>::from_data(TensorData::new(mos.clone(), [n, 1]), &device);
            collector.push(pred, mos).unwrap();
        }
        assert_eq!(collector.len(), 5);

        let x: Vec<f64> = [0.1f32, 0.4, 0.35, 0.8, 0.6]
            .iter()
            .map(|&v| f64::from(v))
            .collect();
        let y = [1.0, 3.0, 2.0, 4.5, 4.0];
        let report = collector.report(None).unwrap();

        assert_abs_diff_eq!(report.rmse, calculate_rmse(&x, &y, false).unwrap(), epsilon = 1e-12);
        assert_abs_diff_eq!(report.plcc, calculate_plcc(&x, &y, false).unwrap(), epsilon = 1e-12);
        assert_abs_diff_eq!(report.srcc, calculate_srcc(&x, &y).unwrap(), epsilon = 1e-12);
        assert_abs_diff_eq!(report.krcc, calculate_krcc(&x, &y).unwrap(), epsilon = 1e-12);
        assert_abs_diff_eq!(report.srcc, 1.0, epsilon = 1e-12);
        assert_eq!(report.get(CorrelationMetric::Srcc), report.srcc);
    }

    #[test]
    fn rejects_mismatched_batches() {
        let device = Default::default();
        let mut collector = ScoreCollector::<TestBackend>::new();
        let pred = Tensor::<TestBackend, 1>::from_floats([0.1, 0.2, 0.3], &device);
        let mos = Tensor::<TestBackend, 1>::from_floats([1.0, 2.0], &device);

        assert!(matches!(
            collector.push(pred, mos),
            Err(MetricError::LengthMismatch {
                predictions: 3,
                targets: 2
            })
        ));
        assert!(collector.is_empty());
    }

    #[test]
    fn clear_resets_state() {
        let mut collector = ScoreCollector::<TestBackend>::default();
        collector.push_slices(&[1.0, 2.0], &[2.0, 1.0]).unwrap();
        assert_eq!(collector.predictions(), &[1.0, 2.0]);
        assert_eq!(collector.targets(), &[2.0, 1.0]);

        collector.clear();
        assert!(collector.is_empty());
        assert!(matches!(
            collector.compute(CorrelationMetric::Plcc, false),
            Err(MetricError::InsufficientSamples { .. })
        ));
    }
}
