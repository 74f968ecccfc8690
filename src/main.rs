use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use f1_finish::artifact::ModelArtifact;
use f1_finish::config::{self, AppConfig};
use f1_finish::context::{PredictionOutcome, ServingContext};
use f1_finish::export::export_summary;
use f1_finish::joiner::{RaceResult, join_tables};
use f1_finish::ratings::{EntityKind, RatingBook};
use f1_finish::resolver::ResolverOptions;
use f1_finish::summary::{sorted_win_counts, win_counts};
use f1_finish::table::SourceTables;

const WINS_SHOWN: usize = 10;

fn main() -> Result<()> {
    config::load_dotenv();
    config::init_logging();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut cfg = AppConfig::from_env();
    if let Some(dir) = parse_str_arg(&args, "--data") {
        cfg.data_dir = PathBuf::from(dir);
    }
    if let Some(path) = parse_str_arg(&args, "--model") {
        cfg.model_path = PathBuf::from(path);
    }
    let resolver = ResolverOptions {
        tolerance: cfg.fuzzy_tolerance,
        suggestion_limit: cfg.suggestion_limit,
    };

    let Command::Run {
        query,
        want_wins,
        export_path,
    } = parse_command(&args)
    else {
        println!(
            "usage: f1_predict --driver <name> --constructor <name> --circuit <name> --year <yyyy> [--wins] [--export <file.xlsx>]"
        );
        return Ok(());
    };
    let needs_rows = want_wins || export_path.is_some();

    // Win counts and the export need the flat table; predictions can run off the artifact.
    let rows = if needs_rows {
        Some(load_rows(&cfg.data_dir)?)
    } else {
        None
    };

    if let Some(rows) = rows.as_deref() {
        if want_wins {
            print_wins(rows);
        }
        if let Some(path) = export_path {
            let book = RatingBook::build(rows);
            let report = export_summary(&path, rows, &book)?;
            println!(
                "Exported {} sheets ({} rows) to {}",
                report.sheets,
                report.rows,
                path.display()
            );
        }
    }

    if let Some(q) = query {
        let ctx = serving_context(&cfg, rows.as_deref(), resolver)?;
        let outcome = ctx
            .predict_finish(&q.driver, &q.constructor, &q.circuit, q.year)
            .context("predict finish")?;
        print_outcome(&outcome);
    }

    Ok(())
}

// Reuses the artifact only when it was trained from `cfg.data_dir`.
fn serving_context(
    cfg: &AppConfig,
    rows: Option<&[RaceResult]>,
    resolver: ResolverOptions,
) -> Result<ServingContext> {
    let stored = match ModelArtifact::load_for(&cfg.model_path, &cfg.data_dir) {
        Ok(found) => found,
        Err(err) => {
            if cfg.model_path.exists() {
                warn!("could not load {}: {err}; retraining", cfg.model_path.display());
            }
            None
        }
    };
    if let Some(artifact) = stored {
        return Ok(ServingContext::from_artifact(artifact, resolver));
    }

    let loaded;
    let rows = match rows {
        Some(rows) => rows,
        None => {
            loaded = load_rows(&cfg.data_dir)?;
            loaded.as_slice()
        }
    };
    let ctx = ServingContext::train(rows, cfg.forest, resolver).context("train model from csv data")?;
    if let Some(artifact) = ctx.to_artifact() {
        artifact
            .with_data_dir(&cfg.data_dir)
            .save(&cfg.model_path)
            .context("save model artifact")?;
    }
    Ok(ctx)
}

#[derive(Debug, PartialEq)]
enum Command {
    Usage,
    Run {
        query: Option<Query>,
        want_wins: bool,
        export_path: Option<PathBuf>,
    },
}

// Nothing to do means usage; no data is loaded and no model is trained.
fn parse_command(args: &[String]) -> Command {
    let query = parse_query(args);
    let want_wins = has_flag(args, "--wins");
    let export_path = parse_str_arg(args, "--export").map(PathBuf::from);
    if query.is_none() && !want_wins && export_path.is_none() {
        return Command::Usage;
    }
    Command::Run {
        query,
        want_wins,
        export_path,
    }
}

#[derive(Debug, PartialEq)]
struct Query {
    driver: String,
    constructor: String,
    circuit: String,
    year: i32,
}

fn parse_query(args: &[String]) -> Option<Query> {
    let driver = parse_str_arg(args, "--driver")?;
    let constructor = parse_str_arg(args, "--constructor")?;
    let circuit = parse_str_arg(args, "--circuit")?;
    let year = parse_str_arg(args, "--year")?.trim().parse::<i32>().ok()?;
    Some(Query {
        driver,
        constructor,
        circuit,
        year,
    })
}

fn load_rows(dir: &Path) -> Result<Vec<RaceResult>> {
    let tables = SourceTables::load_dir(dir)
        .with_context(|| format!("load csv tables from {}", dir.display()))?;
    let rows = join_tables(&tables).context("join source tables")?;
    info!(rows = rows.len(), "flat table ready");
    Ok(rows)
}

fn print_outcome(outcome: &PredictionOutcome) {
    match outcome {
        PredictionOutcome::Predicted(p) => {
            println!("Driver:      {}", p.driver);
            println!("Constructor: {}", p.constructor);
            println!("Circuit:     {}", p.circuit);
            println!("Year:        {}", p.year);
            println!(
                "Predicted finish: P{} (raw {:.2})",
                p.predicted_position, p.raw_estimate
            );
        }
        PredictionOutcome::NotFound(missing) => {
            for item in missing {
                println!("No {} matches \"{}\".", item.kind, item.query);
                if !item.suggestions.is_empty() {
                    println!("  Known {}s include: {}", item.kind, item.suggestions.join(", "));
                }
            }
        }
    }
}

fn print_wins(rows: &[RaceResult]) {
    for kind in [EntityKind::Driver, EntityKind::Constructor] {
        println!("Top {} wins:", kind);
        for (name, wins) in sorted_win_counts(&win_counts(rows, kind))
            .into_iter()
            .take(WINS_SHOWN)
        {
            println!("  {name:<24} {wins}");
        }
    }
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.clone());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{Command, Query, parse_command};

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn data_and_model_alone_print_usage() {
        let cmd = parse_command(&args(&["--data", "tests/fixtures/modern", "--model", "m.json"]));
        assert_eq!(cmd, Command::Usage);
    }

    #[test]
    fn incomplete_query_prints_usage() {
        let cmd = parse_command(&args(&["--driver", "ham", "--circuit", "monza", "--year", "2020"]));
        assert_eq!(cmd, Command::Usage);
    }

    #[test]
    fn full_query_runs() {
        let cmd = parse_command(&args(&[
            "--driver=ham",
            "--constructor",
            "mercedes",
            "--circuit",
            "monza",
            "--year",
            "2020",
        ]));
        assert_eq!(
            cmd,
            Command::Run {
                query: Some(Query {
                    driver: "ham".to_string(),
                    constructor: "mercedes".to_string(),
                    circuit: "monza".to_string(),
                    year: 2020,
                }),
                want_wins: false,
                export_path: None,
            }
        );
    }

    #[test]
    fn export_without_query_runs() {
        let cmd = parse_command(&args(&["--export", "out.xlsx"]));
        assert_eq!(
            cmd,
            Command::Run {
                query: None,
                want_wins: false,
                export_path: Some(PathBuf::from("out.xlsx")),
            }
        );
    }
}
