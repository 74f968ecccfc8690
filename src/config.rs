use std::path::PathBuf;

use crate::forest::ForestParams;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_MODEL_PATH: &str = "artifacts/f1_model.json";
pub const DEFAULT_SUGGESTIONS: usize = 12;
pub const DEFAULT_FUZZY_TOLERANCE: f64 = 0.2;
pub const DEFAULT_HOLDOUT_FRACTION: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub model_path: PathBuf,
    pub forest: ForestParams,
    pub suggestion_limit: usize,
    pub fuzzy_tolerance: f64,
    pub holdout_fraction: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            forest: ForestParams::default(),
            suggestion_limit: DEFAULT_SUGGESTIONS,
            fuzzy_tolerance: DEFAULT_FUZZY_TOLERANCE,
            holdout_fraction: DEFAULT_HOLDOUT_FRACTION,
        }
    }
}

impl AppConfig {
    /// Unset or unparsable `F1_*` variables keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let forest = ForestParams {
            n_trees: env_parse::<usize>("F1_TREES")
                .unwrap_or(defaults.forest.n_trees)
                .max(1),
            max_depth: env_parse::<usize>("F1_MAX_DEPTH").filter(|d| *d > 0),
            min_samples_leaf: env_parse::<usize>("F1_MIN_SAMPLES_LEAF")
                .unwrap_or(defaults.forest.min_samples_leaf)
                .max(1),
            seed: env_parse::<u64>("F1_SEED").unwrap_or(defaults.forest.seed),
        };

        Self {
            data_dir: env_path("F1_DATA_DIR").unwrap_or(defaults.data_dir),
            model_path: env_path("F1_MODEL_PATH").unwrap_or(defaults.model_path),
            forest,
            suggestion_limit: env_parse::<usize>("F1_SUGGESTIONS")
                .unwrap_or(defaults.suggestion_limit)
                .max(1),
            fuzzy_tolerance: env_parse::<f64>("F1_FUZZY_TOLERANCE")
                .filter(|v| v.is_finite())
                .unwrap_or(defaults.fuzzy_tolerance)
                .clamp(0.0, 1.0),
            holdout_fraction: env_parse::<f64>("F1_HOLDOUT_FRACTION")
                .filter(|v| v.is_finite())
                .unwrap_or(defaults.holdout_fraction)
                .clamp(0.0, 0.9),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<T>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
        .map(PathBuf::from)
}

/// Loads `.env.local` then `.env`; missing files are fine.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
