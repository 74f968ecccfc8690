use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use f1_finish::artifact::ModelArtifact;
use f1_finish::config::{self, AppConfig};
use f1_finish::forest::RandomForest;
use f1_finish::joiner::join_tables_with_report;
use f1_finish::model::{MeanBaseline, MeanBaselineTrainer};
use f1_finish::predictor::Predictor;
use f1_finish::ratings::RatingBook;
use f1_finish::summary::{Metrics, evaluate, split_by_year};
use f1_finish::table::SourceTables;

fn main() -> Result<()> {
    config::load_dotenv();
    config::init_logging();

    let mut cfg = AppConfig::from_env();
    if let Some(dir) = parse_path_arg("--data") {
        cfg.data_dir = dir;
    }
    if let Some(path) = parse_path_arg("--out") {
        cfg.model_path = path;
    }
    if let Some(n) = parse_usize_arg("--trees") {
        cfg.forest.n_trees = n.max(1);
    }

    let tables = SourceTables::load_dir(&cfg.data_dir)
        .with_context(|| format!("load csv tables from {}", cfg.data_dir.display()))?;
    let (rows, report) = join_tables_with_report(&tables).context("join source tables")?;
    if rows.is_empty() {
        return Err(anyhow!("no classified results after join"));
    }
    println!(
        "Joined {} of {} results ({} unclassified, {} unmatched)",
        report.joined_rows, report.source_rows, report.unclassified, report.unmatched_keys
    );

    // Holdout pass: ratings and model only ever see the earlier seasons.
    let (train, holdout) = split_by_year(&rows, cfg.holdout_fraction);
    if !holdout.is_empty() {
        let book = RatingBook::build(&train);
        let mut forest: Predictor<RandomForest> = Predictor::new();
        forest.train(&cfg.forest, &train, &book)?;
        let mut baseline: Predictor<MeanBaseline> = Predictor::new();
        baseline.train(&MeanBaselineTrainer, &train, &book)?;

        println!(
            "Holdout: {} train rows, {} holdout rows",
            train.len(),
            holdout.len()
        );
        print_metrics("forest", evaluate(&forest, &holdout, &book)?);
        print_metrics("baseline", evaluate(&baseline, &holdout, &book)?);
    }

    // Final model on every row.
    let book = RatingBook::build(&rows);
    let mut predictor: Predictor<RandomForest> = Predictor::new();
    predictor.train(&cfg.forest, &rows, &book)?;
    let forest = predictor
        .into_model()
        .context("predictor holds no model after training")?;

    println!("Feature importances:");
    for (name, value) in forest.feature_importances() {
        println!("  {name:<14} {value:.4}");
    }

    let artifact = ModelArtifact::new(book, forest, rows.len()).with_data_dir(&cfg.data_dir);
    artifact
        .save(&cfg.model_path)
        .with_context(|| format!("write {}", cfg.model_path.display()))?;
    println!("Saved model to {}", cfg.model_path.display());

    Ok(())
}

fn print_metrics(label: &str, m: Metrics) {
    println!(
        "  {label:<9} n={} mae={:.3} rmse={:.3} exact={:.1}%",
        m.samples,
        m.mae,
        m.rmse,
        m.exact_rate * 100.0
    );
}

fn parse_path_arg(flag: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&prefix) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}

fn parse_usize_arg(flag: &str) -> Option<usize> {
    parse_path_arg(flag).and_then(|p| p.to_str()?.trim().parse::<usize>().ok())
}
