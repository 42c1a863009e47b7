//! Framework-neutral view descriptors.
//!
//! Panels are plain serialisable trees of [`Widget`]s; whatever front end
//! hosts the module turns them into real controls. Every id is namespaced
//! with [`ns`] so several instances can live on one page.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::BoxplotError;

pub mod controls;
pub mod output;

const BUNDLED_HELP: &str = include_str!("../../assets/boxplot.md");

/// Prefix `id` with the module namespace.
pub fn ns(namespace: &str, id: &str) -> String {
    if namespace.is_empty() {
        id.to_string()
    } else {
        format!("{namespace}-{id}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choice {
    pub label: String,
    pub value: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// Label and value are the same text.
    pub fn plain(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum Widget {
    RadioButtons {
        id: String,
        label: String,
        choices: Vec<Choice>,
        selected: String,
    },
    NumericInput {
        id: String,
        label: String,
        value: f64,
        min: Option<f64>,
        step: Option<f64>,
    },
    Select {
        id: String,
        label: String,
        choices: Vec<Choice>,
        selected: Vec<String>,
        multiple: bool,
    },
    FieldSet {
        id: String,
        legend: String,
        children: Vec<Widget>,
    },
    DownloadButton {
        id: String,
        label: String,
        filename: String,
    },
    HelpTrigger {
        id: String,
        target: String,
    },
    HelpModal {
        id: String,
        title: String,
        markdown: String,
    },
    Heading {
        level: u8,
        text: String,
    },
    Placeholder {
        id: String,
    },
    StaticPlot {
        id: String,
        width: u32,
        height: u32,
    },
    InteractiveChart {
        id: String,
        height: u32,
    },
    Panel {
        children: Vec<Widget>,
    },
}

impl Widget {
    /// The widget's id, if it has one.
    pub fn id(&self) -> Option<&str> {
        match self {
            Widget::RadioButtons { id, .. }
            | Widget::NumericInput { id, .. }
            | Widget::Select { id, .. }
            | Widget::FieldSet { id, .. }
            | Widget::DownloadButton { id, .. }
            | Widget::HelpTrigger { id, .. }
            | Widget::HelpModal { id, .. }
            | Widget::Placeholder { id }
            | Widget::StaticPlot { id, .. }
            | Widget::InteractiveChart { id, .. } => Some(id.as_str()),
            Widget::Heading { .. } | Widget::Panel { .. } => None,
        }
    }

    /// Depth-first search for the widget with the given id.
    pub fn find(&self, wanted: &str) -> Option<&Widget> {
        if self.id() == Some(wanted) {
            return Some(self);
        }
        match self {
            Widget::FieldSet { children, .. } | Widget::Panel { children } => {
                children.iter().find_map(|c| c.find(wanted))
            }
            _ => None,
        }
    }
}

/// Loads static assets (help text) by name.
pub trait AssetLoader {
    fn load(&self, name: &str) -> Result<String, BoxplotError>;
}

/// Assets compiled into the binary, plus any registered at runtime.
#[derive(Debug, Clone)]
pub struct EmbeddedAssets {
    assets: HashMap<String, String>,
}

impl Default for EmbeddedAssets {
    fn default() -> Self {
        Self {
            assets: HashMap::from([("boxplot.md".to_string(), BUNDLED_HELP.to_string())]),
        }
    }
}

impl EmbeddedAssets {
    pub fn with_asset(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.assets.insert(name.into(), content.into());
        self
    }
}

impl AssetLoader for EmbeddedAssets {
    fn load(&self, name: &str) -> Result<String, BoxplotError> {
        self.assets
            .get(name)
            .cloned()
            .ok_or_else(|| BoxplotError::AssetNotFound(name.to_string()))
    }
}

/// Reads assets from a directory on disk.
#[derive(Debug, Clone)]
pub struct DirAssetLoader {
    pub root: PathBuf,
}

impl AssetLoader for DirAssetLoader {
    fn load(&self, name: &str) -> Result<String, BoxplotError> {
        let path = self.root.join(name);
        if !path.is_file() {
            return Err(BoxplotError::AssetNotFound(path.display().to_string()));
        }
        Ok(fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespacing() {
        assert_eq!(ns("expression", "plotType"), "expression-plotType");
        assert_eq!(ns("", "plotType"), "plotType");
    }

    #[test]
    fn bundled_help_is_available() {
        let help = EmbeddedAssets::default().load("boxplot.md").unwrap();
        assert!(help.contains("whisker distance"));
        assert!(matches!(
            EmbeddedAssets::default().load("pca.md"),
            Err(BoxplotError::AssetNotFound(_))
        ));
    }

    #[test]
    fn directory_assets() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("boxplot.md"), "custom help").unwrap();
        let loader = DirAssetLoader {
            root: dir.path().to_path_buf(),
        };
        assert_eq!(loader.load("boxplot.md").unwrap(), "custom help");
        assert!(loader.load("missing.md").is_err());
    }

    #[test]
    fn widgets_serialise_with_a_type_tag() {
        let w = Widget::Placeholder {
            id: ns("bp", "quartilesPlot"),
        };
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["widget"], "placeholder");
        assert_eq!(json["id"], "bp-quartilesPlot");
    }

    #[test]
    fn find_descends_into_children() {
        let tree = Widget::Panel {
            children: vec![Widget::FieldSet {
                id: "fs".into(),
                legend: "Plot".into(),
                children: vec![Widget::Placeholder { id: "inner".into() }],
            }],
        };
        assert!(tree.find("inner").is_some());
        assert!(tree.find("outer").is_none());
    }
}
