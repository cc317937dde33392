//! Translation persistence.
//!
//! A translation is deterministic given the expression, so the store keys
//! each entry by screener id and pins it to a fingerprint of the raw
//! text. A stale fingerprint reads as a miss and the rule is simply
//! retranslated; nothing in the store is ever trusted over the text.

use anyhow::{Context, Result};
use screenlab_core::lang::Translation;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub trait TranslationStore: Send + Sync {
    fn load(&self, id: &str, fingerprint: &str) -> Result<Option<Translation>>;
    fn save(&self, id: &str, fingerprint: &str, translation: &Translation) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredTranslation {
    fingerprint: String,
    translation: Translation,
}

/// One pretty-printed JSON file per screener id.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create store directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

impl TranslationStore for JsonFileStore {
    fn load(&self, id: &str, fingerprint: &str) -> Result<Option<Translation>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read stored translation {}", path.display()))?;
        let stored: StoredTranslation = match serde_json::from_str(&text) {
            Ok(s) => s,
            Err(err) => {
                // A corrupt entry is a miss, not a failure.
                tracing::warn!(id, %err, "discarding unreadable stored translation");
                return Ok(None);
            }
        };
        if stored.fingerprint != fingerprint {
            tracing::debug!(id, "stored translation is stale");
            return Ok(None);
        }
        Ok(Some(stored.translation))
    }

    fn save(&self, id: &str, fingerprint: &str, translation: &Translation) -> Result<()> {
        let stored = StoredTranslation {
            fingerprint: fingerprint.to_string(),
            translation: translation.clone(),
        };
        let json = serde_json::to_string_pretty(&stored)
            .context("failed to serialize translation")?;
        let path = self.path_for(id);
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

/// Store that never hits, for one-shot runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl TranslationStore for NullStore {
    fn load(&self, _id: &str, _fingerprint: &str) -> Result<Option<Translation>> {
        Ok(None)
    }

    fn save(&self, _id: &str, _fingerprint: &str, _translation: &Translation) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use screenlab_core::indicators::IndicatorRegistry;
    use screenlab_core::lang::{compile, Translator};
    use screenlab_core::patterns::PatternRegistry;

    fn translation(expression: &str) -> Translation {
        let translator =
            Translator::new(&IndicatorRegistry::builtin(), &PatternRegistry::builtin());
        compile(expression, &translator).unwrap()
    }

    #[test]
    fn round_trips_by_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        let t = translation("close is above MA(50)");
        store.save("s1", "fp-a", &t).unwrap();
        let loaded = store.load("s1", "fp-a").unwrap().unwrap();
        assert_eq!(loaded.statements.len(), 1);
        assert_eq!(loaded.expr, t.expr);
    }

    #[test]
    fn stale_fingerprint_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        let t = translation("close is above MA(50)");
        store.save("s1", "fp-a", &t).unwrap();
        assert!(store.load("s1", "fp-b").unwrap().is_none());
        assert!(store.load("other", "fp-a").unwrap().is_none());
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("s1.json"), "not json").unwrap();
        assert!(store.load("s1", "fp-a").unwrap().is_none());
    }
}
