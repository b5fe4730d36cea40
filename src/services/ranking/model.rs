//! Like-probability models.
//!
//! The pipeline is agnostic to how a model was trained; it only needs a
//! per-row probability for an aligned feature matrix. The production
//! implementation wraps an ONNX export run through tract; tests plug in
//! whatever implements [`LikeModel`].

use std::path::Path;

use ndarray::Array2;
use tract_onnx::prelude::*;
use tracing::info;

use crate::services::features::{FeatureFrame, FeatureValue};
use crate::services::{RecsError, Result};

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Group-agnostic scoring interface. Implementations must return one
/// probability per input row, in input row order.
pub trait LikeModel: Send + Sync {
    fn predict_proba(&self, matrix: &FeatureFrame) -> Result<Vec<f32>>;
}

/// Number of buckets categorical strings are hashed into before being fed to
/// the model, mirroring the hashed-category encoding used at export time.
const HASH_BUCKETS: u64 = 1 << 20;

/// ONNX-backed classifier loaded once at startup.
pub struct OnnxLikeModel {
    plan: OnnxPlan,
    feature_count: usize,
}

impl OnnxLikeModel {
    /// Load an ONNX artifact expecting `feature_count` input columns.
    ///
    /// Startup calls this once per group; a load failure aborts the process
    /// rather than serving with a missing model.
    pub fn load<P: AsRef<Path>>(path: P, feature_count: usize) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let plan = tract_onnx::onnx()
            .model_for_path(path)?
            .into_optimized()?
            .into_runnable()?;

        info!(
            file = %path.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default(),
            feature_count,
            "model loaded"
        );

        Ok(Self {
            plan,
            feature_count,
        })
    }

    /// Encode the aligned frame as an f32 matrix: numeric cells pass through,
    /// categorical (string) cells are hashed into a stable bucket, nulls
    /// become NaN.
    fn encode(&self, matrix: &FeatureFrame) -> Result<Array2<f32>> {
        if matrix.columns().len() != self.feature_count {
            return Err(RecsError::Inference(format!(
                "expected {} feature columns, got {}",
                self.feature_count,
                matrix.columns().len()
            )));
        }

        let mut encoded = Array2::zeros((matrix.len(), self.feature_count));
        for row in 0..matrix.len() {
            for (col, value) in matrix.row(row).iter().enumerate() {
                encoded[[row, col]] = match value {
                    FeatureValue::Text(text) => hash_bucket(text),
                    other => other.as_f32(),
                };
            }
        }
        Ok(encoded)
    }
}

impl LikeModel for OnnxLikeModel {
    fn predict_proba(&self, matrix: &FeatureFrame) -> Result<Vec<f32>> {
        if matrix.is_empty() {
            return Ok(Vec::new());
        }

        let rows = matrix.len();
        let encoded = self.encode(matrix)?;
        let input_tensor = tract_ndarray::Array2::from_shape_fn(
            (rows, self.feature_count),
            |(i, j)| encoded[[i, j]],
        );

        let output = self
            .plan
            .run(tvec![Tensor::from(input_tensor.into_dyn()).into()])
            .map_err(|e| RecsError::Inference(format!("ONNX run failed: {e}")))?;

        let view = output[0]
            .to_array_view::<f32>()
            .map_err(|e| RecsError::Inference(format!("output extraction failed: {e}")))?;
        let flat: Vec<f32> = view.iter().copied().collect();

        // Binary classifiers export either [n] positive-class probabilities or
        // an [n, 2] class-probability matrix; take column 1 of the latter.
        let scores = if flat.len() == rows {
            flat
        } else if flat.len() == rows * 2 {
            flat.chunks_exact(2).map(|pair| pair[1]).collect()
        } else {
            return Err(RecsError::Inference(format!(
                "unexpected output shape: {} values for {} rows",
                flat.len(),
                rows
            )));
        };

        Ok(scores)
    }
}

fn hash_bucket(text: &str) -> f32 {
    let digest = md5::compute(text);
    let mut value = 0u64;
    for &byte in &digest.0[..8] {
        value = (value << 8) | u64::from(byte);
    }
    (value % HASH_BUCKETS) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_bucket_is_stable_and_bounded() {
        let a = hash_bucket("Riga");
        assert_eq!(a, hash_bucket("Riga"));
        assert_ne!(a, hash_bucket("riga"));
        assert!(a >= 0.0 && a < HASH_BUCKETS as f32);
    }
}
