use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{PipelineError, Result};

const MISSING_MARKERS: [&str; 4] = ["", "\\N", "na", "nan"];

#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn from_reader<R: Read>(name: &str, rdr: R) -> std::result::Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(rdr);
        let columns = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect::<Vec<_>>();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self::new(name, columns, rows))
    }

    pub fn from_path(name: &str, path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(name, file).map_err(|source| PipelineError::Csv {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell value, `None` for short rows and missing-value markers.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        let value = self.rows.get(row)?.get(col)?.trim();
        if is_missing(value) { None } else { Some(value) }
    }
}

pub fn is_missing(value: &str) -> bool {
    let value = value.trim();
    MISSING_MARKERS
        .iter()
        .any(|marker| value.eq_ignore_ascii_case(marker))
}

#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    pub results: RawTable,
    pub races: RawTable,
    pub drivers: RawTable,
    pub constructors: RawTable,
    pub circuits: RawTable,
}

impl SourceTables {
    pub const FILE_NAMES: [&'static str; 5] =
        ["results", "races", "drivers", "constructors", "circuits"];

    pub fn load_dir(dir: &Path) -> Result<Self> {
        let load = |name: &str| -> Result<RawTable> {
            let path: PathBuf = dir.join(format!("{name}.csv"));
            let table = RawTable::from_path(name, &path)?;
            info!(table = name, rows = table.len(), path = %path.display(), "loaded table");
            Ok(table)
        };
        Ok(Self {
            results: load("results")?,
            races: load("races")?,
            drivers: load("drivers")?,
            constructors: load("constructors")?,
            circuits: load("circuits")?,
        })
    }
}
