use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::features::FEATURE_COUNT;

pub trait PositionModel: Send + Sync {
    fn predict_raw(&self, features: &[f64; FEATURE_COUNT]) -> f64;
}

pub trait ModelTrainer {
    type Model: PositionModel;

    fn fit(&self, x: &[[f64; FEATURE_COUNT]], y: &[f64]) -> Result<Self::Model>;
}

/// Holdout reference: always the training mean.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MeanBaseline {
    pub mean: f64,
}

impl PositionModel for MeanBaseline {
    fn predict_raw(&self, _features: &[f64; FEATURE_COUNT]) -> f64 {
        self.mean
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MeanBaselineTrainer;

impl ModelTrainer for MeanBaselineTrainer {
    type Model = MeanBaseline;

    fn fit(&self, x: &[[f64; FEATURE_COUNT]], y: &[f64]) -> Result<MeanBaseline> {
        if x.is_empty() || y.is_empty() {
            return Err(PipelineError::EmptyTrainingSet);
        }
        Ok(MeanBaseline {
            mean: y.iter().sum::<f64>() / y.len() as f64,
        })
    }
}
