//! Bitmap and font usage descriptors.
//!
//! Descriptors identify an asset by its key (bitmap file name or font
//! PostScript name) and record which layers, and at design scope which
//! artboards, reference it. Merging two descriptors with the same key unions
//! their sets, so aggregation is idempotent and independent of visit order.

use super::layer::Layer;
use crate::ids::{ArtboardId, LayerId};
use std::collections::{BTreeMap, BTreeSet};

/// A bitmap asset and the layers that use it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapAssetDescriptor {
    /// Asset file name as referenced by the document
    pub name: String,
    pub layer_ids: BTreeSet<LayerId>,
    pub artboard_ids: BTreeSet<ArtboardId>,
}

impl BitmapAssetDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layer_ids: BTreeSet::new(),
            artboard_ids: BTreeSet::new(),
        }
    }

    /// Unions another descriptor for the same asset into this one.
    pub fn merge(&mut self, other: &Self) {
        debug_assert_eq!(self.name, other.name);
        self.layer_ids.extend(other.layer_ids.iter().cloned());
        self.artboard_ids.extend(other.artboard_ids.iter().cloned());
    }
}

/// A font and the layers that use it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontDescriptor {
    pub postscript_name: String,
    /// Font technologies the document declares for this font
    pub usage_types: BTreeSet<String>,
    pub layer_ids: BTreeSet<LayerId>,
    pub artboard_ids: BTreeSet<ArtboardId>,
}

impl FontDescriptor {
    pub fn new(postscript_name: impl Into<String>) -> Self {
        Self {
            postscript_name: postscript_name.into(),
            usage_types: BTreeSet::new(),
            layer_ids: BTreeSet::new(),
            artboard_ids: BTreeSet::new(),
        }
    }

    /// Unions another descriptor for the same font into this one.
    pub fn merge(&mut self, other: &Self) {
        debug_assert_eq!(self.postscript_name, other.postscript_name);
        self.usage_types.extend(other.usage_types.iter().cloned());
        self.layer_ids.extend(other.layer_ids.iter().cloned());
        self.artboard_ids.extend(other.artboard_ids.iter().cloned());
    }
}

/// Deduplicated bitmap and font descriptors keyed by asset name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetCollection {
    bitmaps: BTreeMap<String, BitmapAssetDescriptor>,
    fonts: BTreeMap<String, FontDescriptor>,
}

impl AssetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a bitmap descriptor, merging with an existing one of the same name.
    pub fn add_bitmap(&mut self, descriptor: BitmapAssetDescriptor) {
        match self.bitmaps.get_mut(&descriptor.name) {
            Some(existing) => existing.merge(&descriptor),
            None => {
                self.bitmaps.insert(descriptor.name.clone(), descriptor);
            }
        }
    }

    /// Adds a font descriptor, merging with an existing one of the same name.
    pub fn add_font(&mut self, descriptor: FontDescriptor) {
        match self.fonts.get_mut(&descriptor.postscript_name) {
            Some(existing) => existing.merge(&descriptor),
            None => {
                self.fonts
                    .insert(descriptor.postscript_name.clone(), descriptor);
            }
        }
    }

    /// Merges every descriptor of another collection into this one.
    pub fn merge(&mut self, other: &AssetCollection) {
        for bitmap in other.bitmaps.values() {
            self.add_bitmap(bitmap.clone());
        }
        for font in other.fonts.values() {
            self.add_font(font.clone());
        }
    }

    /// Records `artboard_id` as a user of every asset in the collection.
    pub fn attribute_to(&mut self, artboard_id: &ArtboardId) {
        for bitmap in self.bitmaps.values_mut() {
            bitmap.artboard_ids.insert(artboard_id.clone());
        }
        for font in self.fonts.values_mut() {
            font.artboard_ids.insert(artboard_id.clone());
        }
    }

    pub fn bitmaps(&self) -> impl Iterator<Item = &BitmapAssetDescriptor> {
        self.bitmaps.values()
    }

    pub fn fonts(&self) -> impl Iterator<Item = &FontDescriptor> {
        self.fonts.values()
    }

    pub fn bitmap(&self, name: &str) -> Option<&BitmapAssetDescriptor> {
        self.bitmaps.get(name)
    }

    pub fn font(&self, postscript_name: &str) -> Option<&FontDescriptor> {
        self.fonts.get(postscript_name)
    }

    pub fn bitmap_count(&self) -> usize {
        self.bitmaps.len()
    }

    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bitmaps.is_empty() && self.fonts.is_empty()
    }
}

/// Aggregates asset usage across the given subtrees.
///
/// `max_depth` limits the walk below each root (`None` is unbounded).
pub fn collect_assets<'a>(
    roots: impl IntoIterator<Item = &'a Layer>,
    max_depth: Option<usize>,
) -> AssetCollection {
    let mut collection = AssetCollection::new();

    for root in roots {
        root.walk(max_depth, &mut |layer: &Layer, _depth| {
            for name in &layer.bitmaps {
                let mut descriptor = BitmapAssetDescriptor::new(name.clone());
                descriptor.layer_ids.insert(layer.id.clone());
                collection.add_bitmap(descriptor);
            }
            for usage in &layer.fonts {
                let mut descriptor = FontDescriptor::new(usage.postscript_name.clone());
                descriptor.layer_ids.insert(layer.id.clone());
                if let Some(font_type) = &usage.font_type {
                    descriptor.usage_types.insert(font_type.clone());
                }
                collection.add_font(descriptor);
            }
        });
    }

    collection
}
