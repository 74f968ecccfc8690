use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::ratings::EntityKind;
use crate::table::{RawTable, SourceTables};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub driver: String,
    pub constructor: String,
    pub circuit: String,
    pub position: u32,
    pub year: i32,
}

impl RaceResult {
    pub fn entity(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Driver => &self.driver,
            EntityKind::Constructor => &self.constructor,
            EntityKind::Circuit => &self.circuit,
        }
    }
}

// Candidate column names per logical field; the first present wins. Rules are only looked
// up in the field's own table so circuit `name` never collides with race `name`.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub candidates: &'static [&'static str],
}

pub const RACE_ID: FieldRule = FieldRule {
    field: "race id",
    candidates: &["raceId", "race_id"],
};
pub const DRIVER_ID: FieldRule = FieldRule {
    field: "driver id",
    candidates: &["driverId", "driver_id"],
};
pub const CONSTRUCTOR_ID: FieldRule = FieldRule {
    field: "constructor id",
    candidates: &["constructorId", "constructor_id"],
};
pub const CIRCUIT_ID: FieldRule = FieldRule {
    field: "circuit id",
    candidates: &["circuitId", "circuit_id"],
};
pub const POSITION: FieldRule = FieldRule {
    field: "position",
    candidates: &["positionOrder", "position_order", "order", "position"],
};
pub const YEAR: FieldRule = FieldRule {
    field: "year",
    candidates: &["year", "season"],
};
pub const DRIVER_NAME: FieldRule = FieldRule {
    field: "driver name",
    candidates: &["driverRef", "driver_ref", "driver", "surname"],
};
pub const CONSTRUCTOR_NAME: FieldRule = FieldRule {
    field: "constructor name",
    candidates: &["constructorRef", "constructor_ref", "constructor", "name"],
};
pub const CIRCUIT_NAME: FieldRule = FieldRule {
    field: "circuit name",
    candidates: &["circuitRef", "circuit_ref", "circuit", "name_circuit", "name"],
};

impl FieldRule {
    pub fn find(&self, table: &RawTable) -> Option<usize> {
        self.candidates
            .iter()
            .find_map(|candidate| table.column_index(candidate))
    }

    pub fn require(&self, table: &RawTable) -> Result<usize> {
        self.find(table).ok_or_else(|| self.mismatch(table))
    }

    fn mismatch(&self, table: &RawTable) -> PipelineError {
        PipelineError::SchemaMismatch {
            table: table.name.clone(),
            field: self.field,
            candidates: self.candidates.to_vec(),
            available: table.columns.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitPath {
    ViaRaces(usize),
    ViaResults(usize),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JoinReport {
    pub source_rows: usize,
    pub joined_rows: usize,
    pub unclassified: usize,
    pub unmatched_keys: usize,
}

pub fn join_tables(tables: &SourceTables) -> Result<Vec<RaceResult>> {
    join_tables_with_report(tables).map(|(rows, _)| rows)
}

pub fn join_tables_with_report(tables: &SourceTables) -> Result<(Vec<RaceResult>, JoinReport)> {
    let results = &tables.results;
    let races = &tables.races;

    let res_race = RACE_ID.require(results)?;
    let res_driver = DRIVER_ID.require(results)?;
    let res_constructor = CONSTRUCTOR_ID.require(results)?;
    let res_position = POSITION.require(results)?;

    let race_key = RACE_ID.require(races)?;
    let race_year = YEAR.require(races)?;
    let circuit_path = match (CIRCUIT_ID.find(races), CIRCUIT_ID.find(results)) {
        (Some(col), _) => CircuitPath::ViaRaces(col),
        (None, Some(col)) => CircuitPath::ViaResults(col),
        (None, None) => return Err(CIRCUIT_ID.mismatch(races)),
    };
    debug!(?circuit_path, "circuit join path");

    let drivers = name_lookup(&tables.drivers, DRIVER_ID, DRIVER_NAME)?;
    let constructors = name_lookup(&tables.constructors, CONSTRUCTOR_ID, CONSTRUCTOR_NAME)?;
    let circuits = name_lookup(&tables.circuits, CIRCUIT_ID, CIRCUIT_NAME)?;

    let mut race_info: HashMap<&str, (Option<i32>, Option<&str>)> =
        HashMap::with_capacity(races.len());
    for row in 0..races.len() {
        let Some(id) = races.cell(row, race_key) else {
            continue;
        };
        let year = races.cell(row, race_year).and_then(parse_int::<i32>);
        let circuit = match circuit_path {
            CircuitPath::ViaRaces(col) => races.cell(row, col),
            CircuitPath::ViaResults(_) => None,
        };
        race_info.insert(id, (year, circuit));
    }

    let mut report = JoinReport {
        source_rows: results.len(),
        ..Default::default()
    };
    let mut out = Vec::with_capacity(results.len());

    for row in 0..results.len() {
        let Some(position) = results
            .cell(row, res_position)
            .and_then(parse_int::<i64>)
            .filter(|p| *p >= 1)
            .and_then(|p| u32::try_from(p).ok())
        else {
            report.unclassified += 1;
            continue;
        };

        let joined = (|| {
            let (year, race_circuit) = race_info.get(results.cell(row, res_race)?)?;
            let circuit_id = match circuit_path {
                CircuitPath::ViaRaces(_) => (*race_circuit)?,
                CircuitPath::ViaResults(col) => results.cell(row, col)?,
            };
            Some(RaceResult {
                driver: drivers.get(results.cell(row, res_driver)?)?.clone(),
                constructor: constructors
                    .get(results.cell(row, res_constructor)?)?
                    .clone(),
                circuit: circuits.get(circuit_id)?.clone(),
                position,
                year: (*year)?,
            })
        })();

        match joined {
            Some(result) => out.push(result),
            None => report.unmatched_keys += 1,
        }
    }

    report.joined_rows = out.len();
    if report.unmatched_keys > 0 {
        debug!(
            dropped = report.unmatched_keys,
            "dropped results with unresolved foreign keys"
        );
    }
    info!(
        source = report.source_rows,
        joined = report.joined_rows,
        unclassified = report.unclassified,
        "joined race results"
    );
    Ok((out, report))
}

fn name_lookup(
    table: &RawTable,
    id_rule: FieldRule,
    name_rule: FieldRule,
) -> Result<HashMap<String, String>> {
    let id_col = id_rule.require(table)?;
    let name_col = name_rule.require(table)?;
    let mut map = HashMap::with_capacity(table.len());
    for row in 0..table.len() {
        if let (Some(id), Some(name)) = (table.cell(row, id_col), table.cell(row, name_col)) {
            map.insert(id.to_string(), name.to_string());
        }
    }
    Ok(map)
}

/// Accepts plain integers and integral floats ("3", "3.0"); anything else is `None`.
fn parse_int<T: TryFrom<i64>>(raw: &str) -> Option<T> {
    let raw = raw.trim();
    let value = match raw.parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            let f = raw.parse::<f64>().ok()?;
            if !f.is_finite() || f.fract() != 0.0 {
                return None;
            }
            f as i64
        }
    };
    T::try_from(value).ok()
}

#[cfg(test)]
mod tests {
    use super::{POSITION, parse_int};
    use crate::table::RawTable;

    #[test]
    fn first_candidate_present_wins() {
        let table = RawTable::new(
            "results",
            vec!["position".to_string(), "positionOrder".to_string()],
            vec![],
        );
        assert_eq!(POSITION.find(&table), Some(1));
    }

    #[test]
    fn parse_int_rejects_fractions() {
        assert_eq!(parse_int::<i64>("3"), Some(3));
        assert_eq!(parse_int::<i64>("3.0"), Some(3));
        assert_eq!(parse_int::<i64>("3.5"), None);
        assert_eq!(parse_int::<i64>("R"), None);
        assert_eq!(parse_int::<u8>("-1"), None);
    }
}
