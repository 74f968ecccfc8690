use std::collections::HashMap;

use crate::error::Result;
use crate::features::assemble_from_book;
use crate::joiner::RaceResult;
use crate::model::PositionModel;
use crate::predictor::Predictor;
use crate::ratings::{EntityKind, RatingBook};

/// Race wins (rows with `position == 1`) per entity. Unordered.
pub fn win_counts(rows: &[RaceResult], kind: EntityKind) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for row in rows.iter().filter(|r| r.position == 1) {
        *counts.entry(row.entity(kind).to_string()).or_insert(0) += 1;
    }
    counts
}

pub fn sorted_win_counts(counts: &HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut out = counts
        .iter()
        .map(|(name, n)| (name.clone(), *n))
        .collect::<Vec<_>>();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metrics {
    pub samples: usize,
    pub mae: f64,
    pub rmse: f64,
    /// Share of rows where the rounded prediction hit the actual position.
    pub exact_rate: f64,
}

pub fn evaluate<M: PositionModel>(
    predictor: &Predictor<M>,
    rows: &[RaceResult],
    book: &RatingBook,
) -> Result<Metrics> {
    if rows.is_empty() {
        return Ok(Metrics::default());
    }

    let mut abs_sum = 0.0_f64;
    let mut sq_sum = 0.0_f64;
    let mut exact = 0usize;
    for row in rows {
        let fv = assemble_from_book(book, &row.driver, &row.constructor, &row.circuit, row.year);
        let inference = predictor.infer(&fv)?;
        let err = inference.raw_estimate - f64::from(row.position);
        abs_sum += err.abs();
        sq_sum += err * err;
        if inference.position == row.position {
            exact += 1;
        }
    }

    let n = rows.len() as f64;
    Ok(Metrics {
        samples: rows.len(),
        mae: abs_sum / n,
        rmse: (sq_sum / n).sqrt(),
        exact_rate: exact as f64 / n,
    })
}

/// `(train, holdout)` with the latest seasons held out; empty holdout for a single season.
pub fn split_by_year(rows: &[RaceResult], holdout_fraction: f64) -> (Vec<RaceResult>, Vec<RaceResult>) {
    let mut years = rows.iter().map(|r| r.year).collect::<Vec<_>>();
    years.sort_unstable();
    years.dedup();
    if years.len() < 2 || holdout_fraction <= 0.0 {
        return (rows.to_vec(), Vec::new());
    }

    let target = (rows.len() as f64 * holdout_fraction.clamp(0.0, 0.9)).round() as usize;
    let mut per_year: HashMap<i32, usize> = HashMap::new();
    for row in rows {
        *per_year.entry(row.year).or_insert(0) += 1;
    }

    // Walk back from the latest season, never taking the earliest one.
    let mut cutoff = years[years.len() - 1];
    let mut taken = 0usize;
    for year in years.iter().skip(1).rev() {
        cutoff = *year;
        taken += per_year.get(year).copied().unwrap_or(0);
        if taken >= target {
            break;
        }
    }

    rows.iter()
        .cloned()
        .partition(|row| row.year < cutoff)
}

#[cfg(test)]
mod tests {
    use super::{sorted_win_counts, split_by_year, win_counts};
    use crate::joiner::RaceResult;
    use crate::ratings::EntityKind;

    fn row(driver: &str, constructor: &str, position: u32, year: i32) -> RaceResult {
        RaceResult {
            driver: driver.to_string(),
            constructor: constructor.to_string(),
            circuit: "monza".to_string(),
            position,
            year,
        }
    }

    #[test]
    fn counts_only_wins() {
        let rows = vec![
            row("hamilton", "mercedes", 1, 2019),
            row("hamilton", "mercedes", 1, 2020),
            row("bottas", "mercedes", 1, 2020),
            row("verstappen", "red_bull", 2, 2020),
        ];
        let drivers = win_counts(&rows, EntityKind::Driver);
        assert_eq!(drivers.get("hamilton"), Some(&2));
        assert_eq!(drivers.get("verstappen"), None);

        let constructors = win_counts(&rows, EntityKind::Constructor);
        assert_eq!(
            sorted_win_counts(&constructors),
            vec![("mercedes".to_string(), 3)]
        );
    }

    #[test]
    fn holdout_takes_latest_seasons() {
        let rows = (2010..2020)
            .map(|y| row("a", "b", 3, y))
            .collect::<Vec<_>>();
        let (train, holdout) = split_by_year(&rows, 0.2);
        assert_eq!(holdout.len(), 2);
        assert!(holdout.iter().all(|r| r.year >= 2018));
        assert!(train.iter().all(|r| r.year < 2018));
    }

    #[test]
    fn single_season_has_no_holdout() {
        let rows = vec![row("a", "b", 1, 2020), row("c", "d", 2, 2020)];
        let (train, holdout) = split_by_year(&rows, 0.5);
        assert_eq!(train.len(), 2);
        assert!(holdout.is_empty());
    }
}
