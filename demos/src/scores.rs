//! Score collection for the `correlate` tool.

use burn::tensor::{backend::Backend, Tensor, TensorData};
use iqa_burn::{MetricError, MetricResult, ScoreCollector};

/// Collect scores on the host, keeping full `f64` precision.
pub fn collect_exact<B: Backend>(
    predictions: &[f64],
    mos: &[f64],
) -> MetricResult<ScoreCollector<B>> {
    let mut collector = ScoreCollector::new();
    collector.push_slices(predictions, mos)?;
    Ok(collector)
}

/// Feed scores through the backend batch by batch, the way an evaluation loop
/// collects model outputs. Values take the backend's float element type.
pub fn collect_via_backend<B: Backend>(
    predictions: &[f64],
    mos: &[f64],
    batch_size: usize,
    device: &B::Device,
) -> MetricResult<ScoreCollector<B>> {
    if predictions.len() != mos.len() {
        return Err(MetricError::LengthMismatch {
            predictions: predictions.len(),
            targets: mos.len(),
        });
    }

    let batch_size = batch_size.max(1);
    let mut collector = ScoreCollector::new();
    for (pred, target) in predictions.chunks(batch_size).zip(mos.chunks(batch_size)) {
        collector.push(to_tensor::<B>(pred, device), to_tensor::<B>(target, device))?;
    }
    Ok(collector)
}

fn to_tensor<B: Backend>(values: &[f64], device: &B::Device) -> Tensor<B, 1> {
    Tensor::from_data(TensorData::new(values.to_vec(), [values.len()]), device)
}
