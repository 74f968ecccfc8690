use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::joiner::RaceResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Driver,
    Constructor,
    Circuit,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Driver,
        EntityKind::Constructor,
        EntityKind::Circuit,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Driver => "driver",
            EntityKind::Constructor => "constructor",
            EntityKind::Circuit => "circuit",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Mean historical finishing position per entity of one kind. Lower is stronger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRatings {
    pub kind: EntityKind,
    perf: HashMap<String, f64>,
}

impl EntityRatings {
    pub fn from_map(kind: EntityKind, perf: HashMap<String, f64>) -> Self {
        Self { kind, perf }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.perf.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.perf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.perf.is_empty()
    }

    /// Mean of all ratings of this kind; `None` when the table is empty.
    pub fn mean(&self) -> Option<f64> {
        if self.perf.is_empty() {
            return None;
        }
        Some(self.perf.values().sum::<f64>() / self.perf.len() as f64)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.perf.iter().map(|(name, perf)| (name.as_str(), *perf))
    }

    pub fn sorted_names(&self) -> Vec<String> {
        let mut names = self.perf.keys().cloned().collect::<Vec<_>>();
        names.sort_unstable();
        names
    }
}

pub fn build_ratings(rows: &[RaceResult], kind: EntityKind) -> EntityRatings {
    let mut acc: HashMap<&str, (f64, usize)> = HashMap::new();
    for row in rows {
        if row.position == 0 {
            continue;
        }
        let slot = acc.entry(row.entity(kind)).or_insert((0.0, 0));
        slot.0 += f64::from(row.position);
        slot.1 += 1;
    }

    let perf = acc
        .into_iter()
        .map(|(name, (sum, n))| (name.to_string(), sum / n as f64))
        .collect();
    EntityRatings { kind, perf }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingBook {
    pub drivers: EntityRatings,
    pub constructors: EntityRatings,
    pub circuits: EntityRatings,
}

impl RatingBook {
    pub fn build(rows: &[RaceResult]) -> Self {
        let book = Self {
            drivers: build_ratings(rows, EntityKind::Driver),
            constructors: build_ratings(rows, EntityKind::Constructor),
            circuits: build_ratings(rows, EntityKind::Circuit),
        };
        info!(
            drivers = book.drivers.len(),
            constructors = book.constructors.len(),
            circuits = book.circuits.len(),
            "built entity ratings"
        );
        book
    }

    pub fn ratings(&self, kind: EntityKind) -> &EntityRatings {
        match kind {
            EntityKind::Driver => &self.drivers,
            EntityKind::Constructor => &self.constructors,
            EntityKind::Circuit => &self.circuits,
        }
    }
}
