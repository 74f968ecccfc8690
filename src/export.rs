use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::joiner::RaceResult;
use crate::ratings::{EntityKind, RatingBook};
use crate::summary::{sorted_win_counts, win_counts};

pub struct ExportReport {
    pub sheets: usize,
    pub rows: usize,
}

enum Cell {
    Text(String),
    Number(f64),
}

/// Writes win counts and entity ratings to an xlsx workbook for charting.
pub fn export_summary(path: &Path, rows: &[RaceResult], book: &RatingBook) -> Result<ExportReport> {
    let mut sheets: Vec<(String, Vec<Vec<Cell>>)> = Vec::new();

    for kind in [EntityKind::Driver, EntityKind::Constructor] {
        let mut out = vec![vec![
            Cell::Text(capitalize(kind.label())),
            Cell::Text("Wins".to_string()),
        ]];
        for (name, wins) in sorted_win_counts(&win_counts(rows, kind)) {
            out.push(vec![Cell::Text(name), Cell::Number(wins as f64)]);
        }
        sheets.push((format!("{} wins", capitalize(kind.label())), out));
    }

    for kind in EntityKind::ALL {
        let ratings = book.ratings(kind);
        let mut entries = ratings.iter().collect::<Vec<_>>();
        entries.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        let mut out = vec![vec![
            Cell::Text(capitalize(kind.label())),
            Cell::Text("Mean finish".to_string()),
        ]];
        for (name, perf) in entries {
            out.push(vec![Cell::Text(name.to_string()), Cell::Number(perf)]);
        }
        sheets.push((format!("{} ratings", capitalize(kind.label())), out));
    }

    let mut workbook = Workbook::new();
    let mut total_rows = 0usize;
    for (name, rows) in &sheets {
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(name)
            .with_context(|| format!("name sheet {name}"))?;
        write_rows(sheet, rows)?;
        total_rows += rows.len().saturating_sub(1);
    }
    workbook
        .save(path)
        .with_context(|| format!("save workbook {}", path.display()))?;

    Ok(ExportReport {
        sheets: sheets.len(),
        rows: total_rows,
    })
}

fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<Cell>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            match value {
                Cell::Text(text) => worksheet
                    .write_string(row_idx as u32, col_idx as u16, text)
                    .map(|_| ()),
                Cell::Number(n) => worksheet
                    .write_number(row_idx as u32, col_idx as u16, *n)
                    .map(|_| ()),
            }
            .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
