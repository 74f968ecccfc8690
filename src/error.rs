use std::path::PathBuf;

use thiserror::Error;

// Unresolvable queries are not errors; see `PredictionOutcome::NotFound`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(
        "table `{table}` has no column for `{field}` (tried {candidates:?}); available columns: {available:?}"
    )]
    SchemaMismatch {
        table: String,
        field: &'static str,
        candidates: Vec<&'static str>,
        available: Vec<String>,
    },

    #[error("model not ready: predictor has not been trained")]
    ModelNotReady,

    #[error("predictor is already trained; build a new predictor to retrain")]
    AlreadyTrained,

    #[error("training table is empty after joining and filtering")]
    EmptyTrainingSet,

    #[error("csv error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model artifact error: {0}")]
    Artifact(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
