use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::BoxplotError;

/// Tunables for the quartile plots. Every field has a default so a partial
/// JSON file is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxplotConfig {
    /// Experiments with at most this many samples default to the box view.
    pub boxes_max_samples: usize,
    pub default_whisker_distance: f64,
    pub display_width: u32,
    pub display_height: u32,
    /// Height in pixels of the interactive quartile chart.
    pub chart_height: u32,
    pub export_width: u32,
    pub export_height: u32,
    pub export_filename: String,
    pub ylab_wrap_width: usize,
    pub help_asset: String,
}

impl Default for BoxplotConfig {
    fn default() -> Self {
        Self {
            boxes_max_samples: 20,
            default_whisker_distance: 1.5,
            display_width: 1000,
            display_height: 600,
            chart_height: 600,
            export_width: 800,
            export_height: 600,
            export_filename: "boxplot.png".to_string(),
            ylab_wrap_width: 30,
            help_asset: "boxplot.md".to_string(),
        }
    }
}

impl BoxplotConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BoxplotError> {
        let path = path.as_ref();
        info!("Reading boxplot config from {}", path.display());
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), BoxplotError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: BoxplotConfig = serde_json::from_str(r#"{ "boxes_max_samples": 50 }"#).unwrap();
        assert_eq!(cfg.boxes_max_samples, 50);
        assert_eq!(cfg.export_filename, "boxplot.png");
        assert_eq!((cfg.export_width, cfg.export_height), (800, 600));
        assert_eq!(cfg.chart_height, 600);
    }

    #[test]
    fn written_config_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boxplot.json");
        let cfg = BoxplotConfig {
            ylab_wrap_width: 12,
            ..BoxplotConfig::default()
        };
        cfg.write_json(&path).unwrap();
        assert_eq!(BoxplotConfig::from_json_file(&path).unwrap(), cfg);
    }
}
