use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::joiner::RaceResult;
use crate::ratings::{EntityRatings, RatingBook};

pub const FEATURE_COUNT: usize = 4;

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] =
    ["year", "driver_perf", "const_perf", "circuit_perf"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub year: i32,
    pub driver_perf: f64,
    pub const_perf: f64,
    pub circuit_perf: f64,
}

impl FeatureVector {
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            f64::from(self.year),
            self.driver_perf,
            self.const_perf,
            self.circuit_perf,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

pub fn assemble(
    driver: &str,
    constructor: &str,
    circuit: &str,
    year: i32,
    driver_ratings: &EntityRatings,
    constructor_ratings: &EntityRatings,
    circuit_ratings: &EntityRatings,
) -> FeatureVector {
    FeatureVector {
        year,
        driver_perf: perf_or_mean(driver_ratings, driver),
        const_perf: perf_or_mean(constructor_ratings, constructor),
        circuit_perf: perf_or_mean(circuit_ratings, circuit),
    }
}

pub fn assemble_from_book(
    book: &RatingBook,
    driver: &str,
    constructor: &str,
    circuit: &str,
    year: i32,
) -> FeatureVector {
    assemble(
        driver,
        constructor,
        circuit,
        year,
        &book.drivers,
        &book.constructors,
        &book.circuits,
    )
}

// Unseen entities get the kind-wide mean; an empty table falls back to 0.0.
fn perf_or_mean(ratings: &EntityRatings, name: &str) -> f64 {
    match ratings.get(name) {
        Some(perf) => perf,
        None => {
            debug!(kind = %ratings.kind, name, "no rating, using kind mean");
            ratings.mean().unwrap_or_default()
        }
    }
}

pub fn training_matrix(
    rows: &[RaceResult],
    book: &RatingBook,
) -> (Vec<[f64; FEATURE_COUNT]>, Vec<f64>) {
    rows.iter()
        .map(|row| {
            let fv = assemble_from_book(book, &row.driver, &row.constructor, &row.circuit, row.year);
            (fv.to_array(), f64::from(row.position))
        })
        .unzip()
}
