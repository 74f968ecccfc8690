use std::collections::HashMap;
use std::path::PathBuf;

use f1_finish::features::{FEATURE_COUNT, assemble, training_matrix};
use f1_finish::joiner::{RaceResult, join_tables};
use f1_finish::ratings::{EntityKind, RatingBook, build_ratings};
use f1_finish::table::SourceTables;

fn modern_rows() -> Vec<RaceResult> {
    let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    dir.push("tests");
    dir.push("fixtures");
    dir.push("modern");
    let tables = SourceTables::load_dir(&dir).expect("fixture tables load");
    join_tables(&tables).expect("join succeeds")
}

#[test]
fn ratings_are_mean_positions_within_observed_range() {
    let rows = modern_rows();
    let max_pos = rows.iter().map(|r| r.position).max().expect("rows present");

    for kind in EntityKind::ALL {
        let ratings = build_ratings(&rows, kind);
        let mut grouped: HashMap<&str, Vec<u32>> = HashMap::new();
        for row in &rows {
            grouped.entry(row.entity(kind)).or_default().push(row.position);
        }
        assert_eq!(ratings.len(), grouped.len());
        for (name, positions) in grouped {
            let expected =
                positions.iter().map(|p| f64::from(*p)).sum::<f64>() / positions.len() as f64;
            let perf = ratings.get(name).expect("rated entity");
            assert!((perf - expected).abs() < 1e-12, "{kind} {name}");
            assert!(perf >= 1.0 && perf <= f64::from(max_pos));
        }
    }
}

#[test]
fn hand_checked_ratings() {
    let book = RatingBook::build(&modern_rows());
    let close = |a: f64, b: f64| (a - b).abs() < 1e-9;

    assert!(close(book.drivers.get("max_verstappen").expect("rated"), 12.0 / 9.0));
    assert!(close(book.drivers.get("charles_leclerc").expect("rated"), 22.0 / 8.0));
    assert!(close(book.constructors.get("mclaren").expect("rated"), 27.0 / 8.0));
    assert!(close(book.circuits.get("spa").expect("rated"), 2.2));
    assert!(close(book.circuits.get("monza").expect("rated"), 2.5));
    // Listed in constructors.csv but never raced.
    assert_eq!(book.constructors.get("williams"), None);
}

#[test]
fn unseen_constructor_falls_back_to_kind_mean() {
    let book = RatingBook::build(&modern_rows());
    let fv = assemble(
        "lewis_hamilton",
        "williams",
        "monza",
        2024,
        &book.drivers,
        &book.constructors,
        &book.circuits,
    );

    let values = book.constructors.iter().map(|(_, v)| v).collect::<Vec<_>>();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    assert!((fv.const_perf - mean).abs() < 1e-12);
    assert_eq!(Some(fv.const_perf), book.constructors.mean());

    assert_eq!(fv.year, 2024);
    assert_eq!(Some(fv.driver_perf), book.drivers.get("lewis_hamilton"));
    assert_eq!(Some(fv.circuit_perf), book.circuits.get("monza"));
}

#[test]
fn training_matrix_follows_feature_order() {
    let rows = modern_rows();
    let book = RatingBook::build(&rows);
    let (x, y) = training_matrix(&rows, &book);

    assert_eq!(x.len(), rows.len());
    assert_eq!(y.len(), rows.len());
    let first = x[0];
    assert_eq!(first.len(), FEATURE_COUNT);
    assert_eq!(first[0], 2021.0);
    assert_eq!(Some(first[1]), book.drivers.get("max_verstappen"));
    assert_eq!(Some(first[2]), book.constructors.get("red_bull"));
    assert_eq!(Some(first[3]), book.circuits.get("silverstone"));
    assert_eq!(y[0], 1.0);
}
