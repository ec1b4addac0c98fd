use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

const CSV_FILE_NAME: &str = "expenses.csv";
const DEFAULT_DB_NAME: &str = "mybudgetdb";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StorageEngine {
    /// Ephemeral SQLite, selected by `TEST_MODE=true`.
    InMemory,
    File(PathBuf),
}

/// Everything resolved from the environment at startup.
#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub(crate) csv_path: PathBuf,
    pub(crate) storage: StorageEngine,
}

impl Config {
    pub(crate) fn from_env() -> Result<Self> {
        let data_dir = data_dir()?;

        let mut candidates = csv_candidates(Path::new("."));
        candidates.push(data_dir.join(CSV_FILE_NAME));
        let csv_path = resolve_csv_path(env::var("CSV_FILE").ok(), &candidates);

        let storage = if is_truthy(env::var("TEST_MODE").ok().as_deref()) {
            StorageEngine::InMemory
        } else if let Ok(path) = env::var("EXPENSES_DB_PATH") {
            StorageEngine::File(PathBuf::from(path))
        } else {
            let name = env::var("EXPENSES_DB_NAME").unwrap_or_else(|_| DEFAULT_DB_NAME.into());
            StorageEngine::File(data_dir.join(format!("{name}.db")))
        };

        Ok(Self { csv_path, storage })
    }
}

fn data_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "expenses", "Expenses")
        .context("Could not determine data directory")?;
    Ok(proj_dirs.data_dir().to_path_buf())
}

/// CSV locations probed when `CSV_FILE` is unset, relative to `base`.
pub(crate) fn csv_candidates(base: &Path) -> Vec<PathBuf> {
    vec![
        base.join("..").join("data").join(CSV_FILE_NAME),
        base.join("data").join(CSV_FILE_NAME),
        base.join(CSV_FILE_NAME),
    ]
}

/// An explicit path always wins; otherwise the first existing candidate,
/// falling back to the first candidate when none exist.
pub(crate) fn resolve_csv_path(explicit: Option<String>, candidates: &[PathBuf]) -> PathBuf {
    if let Some(path) = explicit.filter(|p| !p.trim().is_empty()) {
        return PathBuf::from(path);
    }
    candidates
        .iter()
        .find(|p| p.is_file())
        .or_else(|| candidates.first())
        .cloned()
        .unwrap_or_else(|| PathBuf::from(CSV_FILE_NAME))
}

fn is_truthy(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}
