//! Widget type catalog.
//!
//! Recognition is driven entirely by this table: any identifier that matches a
//! catalog entry is treated as a widget constructor, whether it is a stock Qt
//! type or a project-specific composite registered from config. Detection logic
//! never special-cases a type name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Whether a widget type can own children.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    Container,
    Leaf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub capability: Capability,
    pub themed: bool,
}

/// Catalog entry supplied through config to extend the built-in table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogExtension {
    pub name: String,
    pub capability: Capability,
    #[serde(default)]
    pub themed: bool,
}

#[derive(Debug, Clone)]
pub struct WidgetCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl WidgetCatalog {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, capability: Capability, themed: bool) {
        self.entries
            .insert(name.into(), CatalogEntry { capability, themed });
    }

    pub fn get(&self, name: &str) -> Option<CatalogEntry> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn is_container(&self, name: &str) -> bool {
        matches!(
            self.get(name),
            Some(CatalogEntry {
                capability: Capability::Container,
                ..
            })
        )
    }

    pub fn is_themed(&self, name: &str) -> bool {
        self.get(name).map(|e| e.themed).unwrap_or(false)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl Default for WidgetCatalog {
    fn default() -> Self {
        let mut catalog = Self::empty();
        for name in [
            "QMainWindow",
            "QWidget",
            "QDialog",
            "QGroupBox",
            "QFrame",
            "QScrollArea",
            "QSplitter",
            "QTabWidget",
            "QDockWidget",
            "QToolBar",
            "QMenuBar",
            "QStatusBar",
            "QVBoxLayout",
            "QHBoxLayout",
            "QGridLayout",
            "QFormLayout",
            "QStackedLayout",
        ] {
            catalog.register(name, Capability::Container, false);
        }
        for name in [
            "QLabel",
            "QPushButton",
            "QLineEdit",
            "QTextEdit",
            "QComboBox",
            "QCheckBox",
            "QRadioButton",
            "QSpinBox",
            "QDoubleSpinBox",
            "QSlider",
            "QProgressBar",
            "QListWidget",
            "QTreeWidget",
            "QTableWidget",
        ] {
            catalog.register(name, Capability::Leaf, false);
        }
        for (name, capability) in [
            ("ThemedCard", Capability::Container),
            ("ThemedLabel", Capability::Leaf),
            ("ThemedButton", Capability::Leaf),
            ("InfoCard", Capability::Container),
            ("StatusIndicator", Capability::Leaf),
            ("StatBadge", Capability::Leaf),
            ("LotDisplayCard", Capability::Container),
            ("StatsCard", Capability::Container),
        ] {
            catalog.register(name, capability, true);
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_tags_capabilities() {
        let catalog = WidgetCatalog::default();
        assert!(catalog.is_container("QMainWindow"));
        assert!(catalog.is_container("QVBoxLayout"));
        assert!(!catalog.is_container("QLabel"));
        assert!(catalog.contains("QPushButton"));
        assert!(!catalog.contains("QNope"));
    }

    #[test]
    fn themed_types_are_flagged() {
        let catalog = WidgetCatalog::default();
        assert!(catalog.is_themed("ThemedCard"));
        assert!(!catalog.is_themed("QLabel"));
    }

    #[test]
    fn registration_extends_the_table() {
        let mut catalog = WidgetCatalog::default();
        catalog.register("LotCard", Capability::Container, true);
        assert!(catalog.is_container("LotCard"));
        assert!(catalog.is_themed("LotCard"));
    }
}
