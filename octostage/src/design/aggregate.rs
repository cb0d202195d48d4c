//! The `Design` aggregate root.
//!
//! A design owns its pages and artboards and the indices used to look them
//! up. Derived views (flattened layer lists, component artboard lists) are
//! memoized per design and invalidated whenever the manifest or the set of
//! loaded artboards changes.

use super::artboard::{Artboard, ArtboardContent, ContentState};
use super::assets::AssetCollection;
use super::layer::{Layer, LayerKind};
use super::manifest::Manifest;
use crate::error::{EntityKind, StageError};
use crate::ids::{ArtboardId, ComponentId, DesignId, LayerId, PageId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// A page of a design. Pages group artboards and carry no content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub id: PageId,
    pub name: String,
}

/// Changes produced by applying a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDiff {
    pub added: Vec<ArtboardId>,
    pub removed: Vec<ArtboardId>,
    /// Persisting artboards whose page assignment changed
    pub page_changes: Vec<(ArtboardId, Option<PageId>)>,
}

impl ManifestDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.page_changes.is_empty()
    }
}

/// One entry of the flattened layer view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatLayer {
    pub artboard_id: ArtboardId,
    pub layer_id: LayerId,
    pub kind: LayerKind,
    pub visible: bool,
    /// Nesting depth below the artboard root (roots are 0)
    pub depth: usize,
}

#[derive(Debug, Default)]
struct DerivedViews {
    flattened_layers: Option<Arc<Vec<FlatLayer>>>,
    component_artboards: Option<Arc<Vec<ArtboardId>>>,
}

/// Aggregate root of a design document.
#[derive(Debug)]
pub struct Design {
    id: DesignId,
    pages: Vec<Page>,
    artboards: HashMap<ArtboardId, Artboard>,
    /// Manifest order of artboards
    artboard_order: Vec<ArtboardId>,
    by_component: HashMap<ComponentId, ArtboardId>,
    by_page: HashMap<PageId, Vec<ArtboardId>>,
    views: Mutex<DerivedViews>,
}

impl Design {
    /// Creates a design from its manifest.
    pub fn new(id: DesignId, manifest: &Manifest) -> Result<Self, StageError> {
        let mut design = Self {
            id,
            pages: Vec::new(),
            artboards: HashMap::new(),
            artboard_order: Vec::new(),
            by_component: HashMap::new(),
            by_page: HashMap::new(),
            views: Mutex::new(DerivedViews::default()),
        };
        design.apply_manifest(manifest)?;
        Ok(design)
    }

    pub fn id(&self) -> &DesignId {
        &self.id
    }

    /// Applies a (new version of the) manifest.
    ///
    /// Artboards whose id persists keep their content state; artboards no
    /// longer listed are dropped together with their layers. All derived
    /// views are invalidated. The manifest is validated first and the design
    /// is left untouched if validation fails.
    pub fn apply_manifest(&mut self, manifest: &Manifest) -> Result<ManifestDiff, StageError> {
        manifest.validate()?;

        let mut diff = ManifestDiff::default();
        let listed: HashSet<&ArtboardId> = manifest.artboards.iter().map(|a| &a.id).collect();

        let mut removed: Vec<ArtboardId> = self
            .artboard_order
            .iter()
            .filter(|id| !listed.contains(id))
            .cloned()
            .collect();
        for id in &removed {
            self.artboards.remove(id);
        }
        diff.removed.append(&mut removed);

        for entry in &manifest.artboards {
            match self.artboards.get_mut(&entry.id) {
                Some(artboard) => {
                    if artboard.page_id != entry.page_id {
                        diff.page_changes
                            .push((entry.id.clone(), entry.page_id.clone()));
                    }
                    artboard.apply_entry(entry);
                }
                None => {
                    self.artboards
                        .insert(entry.id.clone(), Artboard::from_entry(entry));
                    diff.added.push(entry.id.clone());
                }
            }
        }

        self.pages = manifest
            .pages
            .iter()
            .map(|p| Page {
                id: p.id.clone(),
                name: p.name.clone(),
            })
            .collect();
        self.artboard_order = manifest.artboards.iter().map(|a| a.id.clone()).collect();
        self.rebuild_indices();
        self.invalidate_views();

        debug!(
            design = %self.id,
            pages = self.pages.len(),
            artboards = self.artboard_order.len(),
            added = diff.added.len(),
            removed = diff.removed.len(),
            "Applied manifest"
        );

        Ok(diff)
    }

    fn rebuild_indices(&mut self) {
        self.by_component.clear();
        self.by_page.clear();
        for id in &self.artboard_order {
            let Some(artboard) = self.artboards.get(id) else {
                continue;
            };
            if let Some(component_id) = &artboard.component_id {
                self.by_component.insert(component_id.clone(), id.clone());
            }
            if let Some(page_id) = &artboard.page_id {
                self.by_page
                    .entry(page_id.clone())
                    .or_default()
                    .push(id.clone());
            }
        }
    }

    /// Drops every memoized view.
    pub fn invalidate_views(&self) {
        let mut views = self.views.lock();
        views.flattened_layers = None;
        views.component_artboards = None;
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, id: &PageId) -> Option<&Page> {
        self.pages.iter().find(|p| &p.id == id)
    }

    pub fn artboard(&self, id: &ArtboardId) -> Option<&Artboard> {
        self.artboards.get(id)
    }

    /// Returns the artboard or a `NotFound` error.
    pub fn require_artboard(&self, id: &ArtboardId) -> Result<&Artboard, StageError> {
        self.artboards
            .get(id)
            .ok_or_else(|| StageError::not_found(EntityKind::Artboard, id))
    }

    /// Artboards in manifest order.
    pub fn artboards(&self) -> impl Iterator<Item = &Artboard> {
        self.artboard_order
            .iter()
            .filter_map(|id| self.artboards.get(id))
    }

    pub fn artboard_ids(&self) -> Vec<ArtboardId> {
        self.artboard_order.clone()
    }

    /// Artboards assigned to a page, in manifest order.
    pub fn page_artboards(&self, page_id: &PageId) -> Result<Vec<ArtboardId>, StageError> {
        if self.page(page_id).is_none() {
            return Err(StageError::not_found(EntityKind::Page, page_id));
        }
        Ok(self.by_page.get(page_id).cloned().unwrap_or_default())
    }

    /// Artboard defining the given component.
    pub fn artboard_by_component(&self, component_id: &ComponentId) -> Option<&ArtboardId> {
        self.by_component.get(component_id)
    }

    pub fn loaded_content(&self, id: &ArtboardId) -> Option<Arc<ArtboardContent>> {
        self.artboards
            .get(id)
            .and_then(|a| a.content.content().cloned())
    }

    // =========================================================================
    // Content state transitions
    // =========================================================================

    /// Marks an artboard as loading. Returns the current content if it is
    /// already loaded.
    pub(crate) fn begin_loading(
        &mut self,
        id: &ArtboardId,
    ) -> Result<Option<Arc<ArtboardContent>>, StageError> {
        let artboard = self
            .artboards
            .get_mut(id)
            .ok_or_else(|| StageError::not_found(EntityKind::Artboard, id))?;

        if let ContentState::Loaded(content) = &artboard.content {
            return Ok(Some(Arc::clone(content)));
        }
        artboard.content = ContentState::Loading;
        Ok(None)
    }

    /// Stores loaded content. Ignored if the artboard left the manifest
    /// while its content was loading.
    pub(crate) fn finish_loading(&mut self, id: &ArtboardId, content: Arc<ArtboardContent>) {
        if let Some(artboard) = self.artboards.get_mut(id) {
            artboard.content = ContentState::Loaded(content);
            self.invalidate_views();
        }
    }

    /// Reverts a failed or cancelled load.
    pub(crate) fn abort_loading(&mut self, id: &ArtboardId) {
        if let Some(artboard) = self.artboards.get_mut(id) {
            if matches!(artboard.content, ContentState::Loading) {
                artboard.content = ContentState::Absent;
            }
        }
    }

    /// Discards an artboard's layer tree. Returns true if content was loaded.
    pub(crate) fn unload_content(&mut self, id: &ArtboardId) -> Result<bool, StageError> {
        let artboard = self
            .artboards
            .get_mut(id)
            .ok_or_else(|| StageError::not_found(EntityKind::Artboard, id))?;

        let was_loaded = artboard.content.is_loaded();
        artboard.content = ContentState::Absent;
        if was_loaded {
            self.invalidate_views();
        }
        Ok(was_loaded)
    }

    /// Moves an artboard to another page (or to no page).
    pub(crate) fn set_artboard_page(
        &mut self,
        id: &ArtboardId,
        page_id: Option<PageId>,
    ) -> Result<(), StageError> {
        if let Some(page_id) = &page_id {
            if self.page(page_id).is_none() {
                return Err(StageError::not_found(EntityKind::Page, page_id));
            }
        }
        let artboard = self
            .artboards
            .get_mut(id)
            .ok_or_else(|| StageError::not_found(EntityKind::Artboard, id))?;
        artboard.page_id = page_id;

        self.rebuild_indices();
        self.invalidate_views();
        Ok(())
    }

    // =========================================================================
    // Derived views
    // =========================================================================

    /// Every layer of every loaded artboard, in manifest and tree order.
    pub fn flattened_layers(&self) -> Arc<Vec<FlatLayer>> {
        let mut views = self.views.lock();
        if let Some(layers) = &views.flattened_layers {
            return Arc::clone(layers);
        }

        let mut layers = Vec::new();
        for artboard in self.artboards() {
            let Some(content) = artboard.content.content() else {
                continue;
            };
            for root in &content.layers {
                root.walk(None, &mut |layer: &Layer, depth| {
                    layers.push(FlatLayer {
                        artboard_id: artboard.id.clone(),
                        layer_id: layer.id.clone(),
                        kind: layer.kind,
                        visible: layer.visible,
                        depth,
                    });
                });
            }
        }

        let layers = Arc::new(layers);
        views.flattened_layers = Some(Arc::clone(&layers));
        layers
    }

    /// Artboards that define a component, in manifest order.
    pub fn component_artboards(&self) -> Arc<Vec<ArtboardId>> {
        let mut views = self.views.lock();
        if let Some(ids) = &views.component_artboards {
            return Arc::clone(ids);
        }

        let ids: Arc<Vec<ArtboardId>> = Arc::new(
            self.artboards()
                .filter(|a| a.is_component())
                .map(|a| a.id.clone())
                .collect(),
        );
        views.component_artboards = Some(Arc::clone(&ids));
        ids
    }

    /// Asset usage across all loaded artboards.
    pub fn assets(&self, max_depth: Option<usize>) -> AssetCollection {
        let mut assets = AssetCollection::new();
        for artboard in self.artboards() {
            if let Some(content) = artboard.content.content() {
                assets.merge(&content.assets(max_depth));
            }
        }
        assets
    }
}
