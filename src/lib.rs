//! Formula 1 finishing-position prediction from historical race results.

pub mod artifact;
pub mod config;
pub mod context;
pub mod error;
pub mod export;
pub mod features;
pub mod forest;
pub mod joiner;
pub mod model;
pub mod predictor;
pub mod ratings;
pub mod resolver;
pub mod summary;
pub mod table;

pub use context::{PredictionOutcome, ServingContext};
pub use error::PipelineError;
pub use joiner::RaceResult;
