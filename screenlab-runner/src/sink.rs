//! Where finished screen outcomes go.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Result of one screener over one universe. For ranking rules `matches`
/// is ordered best-first; for filters it follows catalog order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreenOutcome {
    pub screener_id: String,
    pub matches: Vec<String>,
    /// Symbols actually evaluated (or scored).
    pub evaluated: usize,
    /// Symbols dropped for missing/short history or evaluation failure.
    pub skipped: usize,
}

pub trait ResultSink {
    fn publish(&self, outcome: &ScreenOutcome) -> Result<()>;
}

/// Logs a one-line summary per screener.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ResultSink for LogSink {
    fn publish(&self, outcome: &ScreenOutcome) -> Result<()> {
        tracing::info!(
            screener = %outcome.screener_id,
            matches = outcome.matches.len(),
            evaluated = outcome.evaluated,
            skipped = outcome.skipped,
            symbols = ?outcome.matches,
            "screen finished"
        );
        Ok(())
    }
}

/// Writes `<dir>/<id>.json` per screener, overwriting previous runs.
#[derive(Debug, Clone)]
pub struct JsonDirSink {
    dir: PathBuf,
}

impl JsonDirSink {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        Ok(Self { dir })
    }
}

impl ResultSink for JsonDirSink {
    fn publish(&self, outcome: &ScreenOutcome) -> Result<()> {
        let path = self.dir.join(format!("{}.json", outcome.screener_id));
        let json =
            serde_json::to_string_pretty(outcome).context("failed to serialize outcome")?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}
