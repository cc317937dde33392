//! Serializable screener definitions.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One screener: a stable id, a display name, the raw rule text, and the
/// regions it applies to (empty = everywhere).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreenerDef {
    pub id: String,
    pub name: String,
    pub expression: String,
    #[serde(default)]
    pub regions: Vec<String>,
    /// Explicit universe override; empty = the whole catalog.
    #[serde(default)]
    pub symbols: Vec<String>,
}

impl ScreenerDef {
    /// Content hash of the rule text. Two definitions with the same
    /// expression share a fingerprint, so a stored translation is reused
    /// exactly until the expression changes.
    pub fn fingerprint(&self) -> String {
        blake3::hash(self.expression.as_bytes()).to_hex().to_string()
    }

    pub fn applies_to(&self, region: &str) -> bool {
        self.regions.is_empty() || self.regions.iter().any(|r| r.eq_ignore_ascii_case(region))
    }
}

/// Top-level runner configuration, loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunnerConfig {
    #[serde(default)]
    pub screeners: Vec<ScreenerDef>,
    /// Worker threads for the evaluation pool; `None` = rayon default.
    #[serde(default)]
    pub workers: Option<usize>,
}

impl RunnerConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_tracks_the_expression_only() {
        let a = ScreenerDef {
            id: "s1".into(),
            name: "Uptrend".into(),
            expression: "close is above MA(50)".into(),
            regions: vec![],
            symbols: vec![],
        };
        let mut b = a.clone();
        b.name = "Renamed".into();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.expression = "close is below MA(50)".into();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn region_filter_defaults_to_everywhere() {
        let def = ScreenerDef {
            id: "s1".into(),
            name: "n".into(),
            expression: "close is above 5".into(),
            regions: vec![],
            symbols: vec![],
        };
        assert!(def.applies_to("US"));
        let scoped = ScreenerDef {
            regions: vec!["US".into()],
            ..def
        };
        assert!(scoped.applies_to("us"));
        assert!(!scoped.applies_to("IN"));
    }

    #[test]
    fn parses_toml_config() {
        let text = r#"
workers = 4

[[screeners]]
id = "golden-cross"
name = "Golden Cross"
expression = "MA(50) crossed above MA(200) within the last 5 days"
regions = ["US"]
"#;
        let config: RunnerConfig = toml::from_str(text).unwrap();
        assert_eq!(config.workers, Some(4));
        assert_eq!(config.screeners.len(), 1);
        assert_eq!(config.screeners[0].id, "golden-cross");
        assert_eq!(config.screeners[0].regions, vec!["US".to_string()]);
    }
}
