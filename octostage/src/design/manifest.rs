//! Design manifest: which pages and artboards exist, without their content.

use crate::error::StageError;
use crate::ids::{ArtboardId, ComponentId, PageId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Index of a design's pages and artboards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub pages: Vec<PageEntry>,
    #[serde(default)]
    pub artboards: Vec<ArtboardEntry>,
}

/// Manifest entry for a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEntry {
    pub id: PageId,
    #[serde(default)]
    pub name: String,
}

/// Manifest entry for an artboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtboardEntry {
    pub id: ArtboardId,
    /// Set when the artboard defines a reusable component
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<ComponentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<PageId>,
    #[serde(default)]
    pub name: String,
    /// False when the design service cannot provide the artboard's content
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl ArtboardEntry {
    pub fn new(id: impl Into<ArtboardId>) -> Self {
        Self {
            id: id.into(),
            component_id: None,
            page_id: None,
            name: String::new(),
            available: true,
        }
    }

    pub fn with_component(mut self, component_id: impl Into<ComponentId>) -> Self {
        self.component_id = Some(component_id.into());
        self
    }

    pub fn with_page(mut self, page_id: impl Into<PageId>) -> Self {
        self.page_id = Some(page_id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl PageEntry {
    pub fn new(id: impl Into<PageId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl Manifest {
    /// Parses a manifest from JSON bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, StageError> {
        serde_json::from_slice(data)
            .map_err(|e| StageError::Corrupt(format!("invalid manifest: {}", e)))
    }

    /// Checks the structural invariants of the manifest.
    ///
    /// Page, artboard and component ids must be unique and every artboard's
    /// page id must reference a declared page.
    pub fn validate(&self) -> Result<(), StageError> {
        let mut pages = HashSet::new();
        for page in &self.pages {
            if !pages.insert(&page.id) {
                return Err(StageError::Corrupt(format!("duplicate page id '{}'", page.id)));
            }
        }

        let mut artboards = HashSet::new();
        let mut components = HashSet::new();
        for artboard in &self.artboards {
            if !artboards.insert(&artboard.id) {
                return Err(StageError::Corrupt(format!(
                    "duplicate artboard id '{}'",
                    artboard.id
                )));
            }
            if let Some(component_id) = &artboard.component_id {
                if !components.insert(component_id) {
                    return Err(StageError::Corrupt(format!(
                        "component '{}' is defined by more than one artboard",
                        component_id
                    )));
                }
            }
            if let Some(page_id) = &artboard.page_id {
                if !pages.contains(page_id) {
                    return Err(StageError::Corrupt(format!(
                        "artboard '{}' references unknown page '{}'",
                        artboard.id, page_id
                    )));
                }
            }
        }

        Ok(())
    }
}
