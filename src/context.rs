use serde::Serialize;
use tracing::info;

use crate::artifact::ModelArtifact;
use crate::error::Result;
use crate::features::{FeatureVector, assemble_from_book};
use crate::forest::{ForestParams, RandomForest};
use crate::joiner::RaceResult;
use crate::predictor::Predictor;
use crate::ratings::{EntityKind, RatingBook};
use crate::resolver::{Resolution, ResolverOptions, resolve_with};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinishPrediction {
    pub driver: String,
    pub constructor: String,
    pub circuit: String,
    pub year: i32,
    pub predicted_position: u32,
    pub raw_estimate: f64,
    pub features: FeatureVector,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityNotFound {
    pub kind: EntityKind,
    pub query: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PredictionOutcome {
    Predicted(FinishPrediction),
    /// Every query that failed to resolve, in driver, constructor, circuit order.
    NotFound(Vec<EntityNotFound>),
}

#[derive(Debug, Clone)]
pub struct ServingContext {
    ratings: RatingBook,
    predictor: Predictor<RandomForest>,
    drivers: Vec<String>,
    constructors: Vec<String>,
    circuits: Vec<String>,
    resolver: ResolverOptions,
}

impl ServingContext {
    pub fn train(rows: &[RaceResult], params: ForestParams, resolver: ResolverOptions) -> Result<Self> {
        let ratings = RatingBook::build(rows);
        let mut predictor = Predictor::new();
        predictor.train(&params, rows, &ratings)?;
        Ok(Self::assemble(ratings, predictor, resolver))
    }

    pub fn from_artifact(artifact: ModelArtifact, resolver: ResolverOptions) -> Self {
        info!(
            generated_at = %artifact.generated_at,
            trained_rows = artifact.trained_rows,
            "serving from saved artifact"
        );
        let predictor = Predictor::from_model(artifact.forest, artifact.trained_rows);
        Self::assemble(artifact.ratings, predictor, resolver)
    }

    fn assemble(ratings: RatingBook, predictor: Predictor<RandomForest>, resolver: ResolverOptions) -> Self {
        Self {
            drivers: ratings.drivers.sorted_names(),
            constructors: ratings.constructors.sorted_names(),
            circuits: ratings.circuits.sorted_names(),
            ratings,
            predictor,
            resolver,
        }
    }

    pub fn to_artifact(&self) -> Option<ModelArtifact> {
        let forest = self.predictor.model()?.clone();
        Some(ModelArtifact::new(
            self.ratings.clone(),
            forest,
            self.predictor.trained_rows(),
        ))
    }

    pub fn ratings(&self) -> &RatingBook {
        &self.ratings
    }

    pub fn predictor(&self) -> &Predictor<RandomForest> {
        &self.predictor
    }

    // Sorted; resolver tie-breaks depend on this order.
    pub fn choices(&self, kind: EntityKind) -> &[String] {
        match kind {
            EntityKind::Driver => &self.drivers,
            EntityKind::Constructor => &self.constructors,
            EntityKind::Circuit => &self.circuits,
        }
    }

    pub fn resolve(&self, kind: EntityKind, query: &str) -> Resolution {
        resolve_with(query, self.choices(kind), self.resolver)
    }

    pub fn predict_finish(
        &self,
        driver_query: &str,
        constructor_query: &str,
        circuit_query: &str,
        year: i32,
    ) -> Result<PredictionOutcome> {
        let driver = self.resolve(EntityKind::Driver, driver_query);
        let constructor = self.resolve(EntityKind::Constructor, constructor_query);
        let circuit = self.resolve(EntityKind::Circuit, circuit_query);

        let (driver, constructor, circuit) = match (driver, constructor, circuit) {
            (
                Resolution::Found { name: driver, .. },
                Resolution::Found {
                    name: constructor, ..
                },
                Resolution::Found { name: circuit, .. },
            ) => (driver, constructor, circuit),
            (driver, constructor, circuit) => {
                let missing = [
                    (EntityKind::Driver, driver_query, driver),
                    (EntityKind::Constructor, constructor_query, constructor),
                    (EntityKind::Circuit, circuit_query, circuit),
                ]
                .into_iter()
                .filter_map(|(kind, query, res)| match res {
                    Resolution::Found { .. } => None,
                    Resolution::NotFound { suggestions } => Some(EntityNotFound {
                        kind,
                        query: query.to_string(),
                        suggestions,
                    }),
                })
                .collect();
                return Ok(PredictionOutcome::NotFound(missing));
            }
        };

        let features = assemble_from_book(&self.ratings, &driver, &constructor, &circuit, year);
        let inference = self.predictor.infer(&features)?;
        Ok(PredictionOutcome::Predicted(FinishPrediction {
            driver,
            constructor,
            circuit,
            year,
            predicted_position: inference.position,
            raw_estimate: inference.raw_estimate,
            features,
        }))
    }
}
