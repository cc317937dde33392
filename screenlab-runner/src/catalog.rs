//! Symbol catalogs: the universe a screener runs over.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One listed symbol. Catalog order is load order and is the tie-break for
/// rankings, so catalogs must enumerate deterministically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    pub symbol: String,
    pub region: String,
    /// Precomputed relative-strength percentile, when the catalog source
    /// carries one. Symbols without it drop out of RS rankings.
    #[serde(default)]
    pub ibd_relative_strength: Option<f64>,
}

pub trait SymbolCatalog: Send + Sync {
    fn entries(&self) -> &[CatalogEntry];

    fn for_region(&self, region: Option<&str>) -> Vec<CatalogEntry> {
        match region {
            None => self.entries().to_vec(),
            Some(r) => self
                .entries()
                .iter()
                .filter(|e| e.region.eq_ignore_ascii_case(r))
                .cloned()
                .collect(),
        }
    }
}

/// Catalog backed by a CSV file with `symbol,region[,ibd_relative_strength]`
/// columns.
#[derive(Debug, Clone)]
pub struct CsvSymbolCatalog {
    entries: Vec<CatalogEntry>,
}

impl CsvSymbolCatalog {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open catalog {}", path.display()))?;
        let mut entries = Vec::new();
        for row in reader.deserialize::<CatalogEntry>() {
            entries.push(row.with_context(|| format!("bad catalog row in {}", path.display()))?);
        }
        Ok(Self { entries })
    }
}

impl SymbolCatalog for CsvSymbolCatalog {
    fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }
}

/// Fixed catalog for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: Vec<CatalogEntry>,
}

impl StaticCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Region-less convenience constructor.
    pub fn from_symbols(symbols: &[&str]) -> Self {
        Self {
            entries: symbols
                .iter()
                .map(|s| CatalogEntry {
                    symbol: s.to_string(),
                    region: String::new(),
                    ibd_relative_strength: None,
                })
                .collect(),
        }
    }
}

impl SymbolCatalog for StaticCatalog {
    fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }
}
