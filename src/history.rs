//! Run history persistence.
//!
//! Completed runs are appended to a JSON file so later cross-analysis
//! can compare configurations across sessions.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::optimize::RunRecord;

/// Storage for completed simulation runs.
pub trait RunRepository {
    fn load(&self) -> Result<Vec<RunRecord>>;
    fn save(&self, records: &[RunRecord]) -> Result<()>;
}

/// Flat-file repository holding the full history as one JSON array.
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append a run to the stored history.
    pub fn append(&self, record: RunRecord) -> Result<()> {
        let mut records = self.load()?;
        records.push(record);
        self.save(&records)?;
        info!(
            path = %self.path.display(),
            runs = records.len(),
            "Run recorded to history"
        );
        Ok(())
    }
}

impl RunRepository for JsonFileRepository {
    fn load(&self) -> Result<Vec<RunRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read history file {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse history file {}", self.path.display()))
    }

    fn save(&self, records: &[RunRecord]) -> Result<()> {
        let serialized =
            serde_json::to_string_pretty(records).context("Failed to serialize run history")?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write history file {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StrategyConfig;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("copysim-history-{}-{}.json", tag, std::process::id()))
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let repo = JsonFileRepository::new(temp_path("missing"));
        assert!(repo.load().unwrap().is_empty());
    }

    #[test]
    fn test_append_round_trips() {
        let path = temp_path("append");
        let repo = JsonFileRepository::new(&path);

        let record = RunRecord {
            name: Some("baseline".to_string()),
            config: StrategyConfig::default(),
            trades: Vec::new(),
        };
        repo.append(record.clone()).unwrap();
        repo.append(record.clone()).unwrap();

        let loaded = repo.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], record);

        let _ = fs::remove_file(&path);
    }
}
