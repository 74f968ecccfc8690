use tracing::info;

use crate::error::{PipelineError, Result};
use crate::features::{FeatureVector, training_matrix};
use crate::forest::RandomForest;
use crate::joiner::RaceResult;
use crate::model::{ModelTrainer, PositionModel};
use crate::ratings::RatingBook;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inference {
    pub position: u32,
    pub raw_estimate: f64,
}

/// Clamps a raw estimate to P1 or worse and rounds half away from zero.
/// NaN maps to 1; huge values saturate.
pub fn to_position(raw: f64) -> u32 {
    raw.max(1.0).round() as u32
}

// Untrained until `train` succeeds once; retraining needs a new predictor.
#[derive(Debug, Clone)]
pub struct Predictor<M = RandomForest> {
    model: Option<M>,
    trained_rows: usize,
}

impl<M> Default for Predictor<M> {
    fn default() -> Self {
        Self {
            model: None,
            trained_rows: 0,
        }
    }
}

impl<M: PositionModel> Predictor<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_model(model: M, trained_rows: usize) -> Self {
        Self {
            model: Some(model),
            trained_rows,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    pub fn trained_rows(&self) -> usize {
        self.trained_rows
    }

    pub fn model(&self) -> Option<&M> {
        self.model.as_ref()
    }

    pub fn into_model(self) -> Option<M> {
        self.model
    }

    pub fn train<T>(&mut self, trainer: &T, rows: &[RaceResult], book: &RatingBook) -> Result<()>
    where
        T: ModelTrainer<Model = M>,
    {
        if self.model.is_some() {
            return Err(PipelineError::AlreadyTrained);
        }
        if rows.is_empty() {
            return Err(PipelineError::EmptyTrainingSet);
        }
        let (x, y) = training_matrix(rows, book);
        let model = trainer.fit(&x, &y)?;
        self.model = Some(model);
        self.trained_rows = rows.len();
        info!(rows = rows.len(), "predictor trained");
        Ok(())
    }

    pub fn infer(&self, features: &FeatureVector) -> Result<Inference> {
        let model = self.model.as_ref().ok_or(PipelineError::ModelNotReady)?;
        let raw_estimate = model.predict_raw(&features.to_array());
        Ok(Inference {
            position: to_position(raw_estimate),
            raw_estimate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Predictor, to_position};
    use crate::error::PipelineError;
    use crate::features::FeatureVector;
    use crate::model::{MeanBaseline, MeanBaselineTrainer};
    use crate::ratings::RatingBook;

    #[test]
    fn rounding_clamps_and_rounds_half_away() {
        assert_eq!(to_position(-3.2), 1);
        assert_eq!(to_position(0.4), 1);
        assert_eq!(to_position(1.49), 1);
        assert_eq!(to_position(2.5), 3);
        assert_eq!(to_position(7.51), 8);
        assert_eq!(to_position(f64::NAN), 1);
    }

    #[test]
    fn untrained_predictor_is_not_ready() {
        let predictor: Predictor<MeanBaseline> = Predictor::new();
        let fv = FeatureVector {
            year: 2020,
            driver_perf: 3.0,
            const_perf: 4.0,
            circuit_perf: 9.0,
        };
        assert!(matches!(
            predictor.infer(&fv),
            Err(PipelineError::ModelNotReady)
        ));
    }

    #[test]
    fn empty_rows_do_not_train() {
        let mut predictor: Predictor<MeanBaseline> = Predictor::new();
        let book = RatingBook::build(&[]);
        let err = predictor
            .train(&MeanBaselineTrainer, &[], &book)
            .expect_err("empty table");
        assert!(matches!(err, PipelineError::EmptyTrainingSet));
        assert!(!predictor.is_trained());
    }
}
