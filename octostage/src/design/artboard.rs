//! Artboards and their content state.

use super::assets::{collect_assets, AssetCollection};
use super::layer::Layer;
use super::manifest::ArtboardEntry;
use super::octopus::OctopusDocument;
use crate::content::ContentHandle;
use crate::ids::{ArtboardId, ComponentId, LayerId, PageId};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Whether an artboard's content is present in memory.
///
/// Moves forward `Absent → Loading → Loaded`. `Loaded → Absent` happens on
/// explicit unload, and a failed or cancelled load falls back from
/// `Loading` to `Absent` so the next request starts fresh.
#[derive(Debug, Clone, Default)]
pub enum ContentState {
    #[default]
    Absent,
    Loading,
    Loaded(Arc<ArtboardContent>),
}

impl ContentState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn content(&self) -> Option<&Arc<ArtboardContent>> {
        match self {
            Self::Loaded(content) => Some(content),
            _ => None,
        }
    }
}

/// A single canvas of a design.
#[derive(Debug, Clone)]
pub struct Artboard {
    pub id: ArtboardId,
    /// Set when this artboard defines a reusable component
    pub component_id: Option<ComponentId>,
    pub page_id: Option<PageId>,
    pub name: String,
    /// False when the design service cannot provide this artboard's content
    pub available: bool,
    pub content: ContentState,
}

impl Artboard {
    pub(crate) fn from_entry(entry: &ArtboardEntry) -> Self {
        Self {
            id: entry.id.clone(),
            component_id: entry.component_id.clone(),
            page_id: entry.page_id.clone(),
            name: entry.name.clone(),
            available: entry.available,
            content: ContentState::Absent,
        }
    }

    /// Updates manifest metadata, keeping the content state.
    pub(crate) fn apply_entry(&mut self, entry: &ArtboardEntry) {
        self.component_id = entry.component_id.clone();
        self.page_id = entry.page_id.clone();
        self.name = entry.name.clone();
        self.available = entry.available;
    }

    pub fn is_component(&self) -> bool {
        self.component_id.is_some()
    }

    pub fn is_loaded(&self) -> bool {
        self.content.is_loaded()
    }
}

/// Loaded content of an artboard: its layer tree and content handle.
#[derive(Debug)]
pub struct ArtboardContent {
    pub artboard_id: ArtboardId,
    /// Location of the document handed to the rendering backend
    pub handle: ContentHandle,
    /// Root layers, top-most first
    pub layers: Vec<Layer>,
}

impl ArtboardContent {
    pub fn from_document(
        artboard_id: ArtboardId,
        handle: ContentHandle,
        document: OctopusDocument,
    ) -> Self {
        Self {
            artboard_id,
            handle,
            layers: document.layers.into_iter().map(Layer::from).collect(),
        }
    }

    /// Finds a layer anywhere in the tree.
    pub fn find_layer(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find_map(|layer| layer.find(id))
    }

    pub fn root_layer_ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|layer| layer.id.clone()).collect()
    }

    /// Components instantiated anywhere in the layer tree.
    pub fn referenced_components(&self) -> BTreeSet<ComponentId> {
        let mut components = BTreeSet::new();
        for root in &self.layers {
            root.walk(None, &mut |layer: &Layer, _| {
                if let Some(component_id) = &layer.component_id {
                    components.insert(component_id.clone());
                }
            });
        }
        components
    }

    /// Asset usage of the whole artboard, attributed to this artboard.
    pub fn assets(&self, max_depth: Option<usize>) -> AssetCollection {
        let mut assets = collect_assets(&self.layers, max_depth);
        assets.attribute_to(&self.artboard_id);
        assets
    }

    pub fn layer_count(&self) -> usize {
        self.layers.iter().map(Layer::subtree_len).sum()
    }
}
