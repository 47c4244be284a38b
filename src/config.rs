//! Engine configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Settings shared by every evaluation of one engine.
///
/// Missing JSON fields take their defaults:
///
/// ```json
/// { "grid_dir": "grids", "extension": "asc", "cell_size": 30.0,
///   "unmapped_condition": "unmapped condition" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding every element's output grid.
    pub grid_dir: PathBuf,
    /// File extension of output grids, without the dot.
    pub extension: String,
    /// Ground size of one cell, in the units of adjacency distances.
    pub cell_size: f64,
    /// Relationship label that exempts an object from readiness.
    pub unmapped_condition: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_dir: PathBuf::from("grids"),
            extension: "asc".into(),
            cell_size: 30.0,
            unmapped_condition: "unmapped condition".into(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json_str(r#"{"grid_dir": "/data/mw", "cell_size": 10}"#).unwrap();
        assert_eq!(config.grid_dir, PathBuf::from("/data/mw"));
        assert_eq!(config.cell_size, 10.0);
        assert_eq!(config.extension, "asc");
        assert_eq!(config.unmapped_condition, "unmapped condition");
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("muirweb.json");
        std::fs::write(&path, r#"{"extension": "tif"}"#).unwrap();
        let config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(config, EngineConfig { extension: "tif".into(), ..EngineConfig::default() });
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(EngineConfig::from_json_str("{"), Err(crate::Error::Json(_))));
    }
}
