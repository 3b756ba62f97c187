//! Detection and redaction configuration
//!
//! Every threshold and keyword used by the detector lives in [`WatermarkConfig`].
//! The defaults match the stamps produced by common mobile scanner apps; tests
//! and callers can override any field without touching global state.

use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::layout::Zone;

/// Keyword sets searched for in page text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordSets {
    /// Chinese fragments (brand names and labels), matched as-is
    pub zh: Vec<String>,
    /// English phrases, matched case-insensitively
    pub en: Vec<String>,
}

impl Default for KeywordSets {
    fn default() -> Self {
        Self {
            zh: ["全能", "扫描", "创建", "王"].iter().map(|s| s.to_string()).collect(),
            en: ["CamScanner", "Scanned with", "Created by", "scan"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Geometric bounds for classifying an image placement as a stamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionThresholds {
    /// Placement must start right of this fraction of the page width
    pub min_rel_x: f32,
    /// Placement must start below this fraction of the page height
    pub min_rel_y: f32,
    /// Placement area must stay under this many square points
    pub max_area: f32,
    /// Placement height must stay under this fraction of the page height
    pub max_rel_height: f32,
}

impl Default for RegionThresholds {
    fn default() -> Self {
        Self {
            min_rel_x: 0.65,
            min_rel_y: 0.70,
            max_area: 20_000.0,
            max_rel_height: 0.12,
        }
    }
}

/// Full configuration shared by the redactor, the scanner and the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    pub keywords: KeywordSets,
    pub region: RegionThresholds,
    /// Area covered when page text matches a keyword
    pub text_zone: Zone,
    /// Areas covered on every processed page, whether or not anything matched
    pub safety_net: Vec<Zone>,
    /// Cap on the short-text samples collected by a scan
    pub max_text_samples: usize,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            keywords: KeywordSets::default(),
            region: RegionThresholds::default(),
            text_zone: Zone::new(0.45, 0.88, 5.0),
            safety_net: vec![Zone::new(0.50, 0.85, 2.0), Zone::new(0.75, 0.85, 2.0)],
            max_text_samples: 5,
        }
    }
}

impl WatermarkConfig {
    /// Load a configuration from a JSON file
    ///
    /// Missing fields fall back to their defaults, so a file may override
    /// only the values it cares about.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let config = WatermarkConfig::default();
        assert_eq!(config.region.min_rel_x, 0.65);
        assert_eq!(config.region.min_rel_y, 0.70);
        assert_eq!(config.region.max_area, 20_000.0);
        assert_eq!(config.region.max_rel_height, 0.12);
        assert_eq!(config.safety_net.len(), 2);
        assert_eq!(config.keywords.zh.len(), 4);
        assert!(config.keywords.en.contains(&"CamScanner".to_string()));
    }

    #[test]
    fn test_partial_json_override() {
        let config = WatermarkConfig::from_json_str(
            r#"{ "region": { "max_area": 5000.0 }, "keywords": { "en": ["Adobe Scan"] } }"#,
        )
        .unwrap();

        assert_eq!(config.region.max_area, 5000.0);
        assert_eq!(config.region.min_rel_x, 0.65);
        assert_eq!(config.keywords.en, vec!["Adobe Scan".to_string()]);
        // untouched sub-fields keep their defaults
        assert_eq!(config.keywords.zh, KeywordSets::default().zh);
        assert_eq!(config.text_zone, Zone::new(0.45, 0.88, 5.0));
    }

    #[test]
    fn test_invalid_json() {
        let result = WatermarkConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_config_file() {
        let result = WatermarkConfig::from_json_file(Path::new("no-such-config.json"));
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }
}
