//! Layer tree of a loaded artboard.

use super::octopus::{BitmapRef, OctopusLayer};
use crate::ids::{ComponentId, LayerId};

/// Kind of a layer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Bitmap layer
    Bitmap,
    Shape,
    Text,
    Group,
    /// Any type this crate does not distinguish
    Other,
}

impl LayerKind {
    fn from_octopus(kind: Option<&str>) -> Self {
        match kind {
            Some("layer") | None => Self::Bitmap,
            Some("shapeLayer") => Self::Shape,
            Some("textLayer") => Self::Text,
            Some("groupLayer") => Self::Group,
            Some(_) => Self::Other,
        }
    }
}

/// A font referenced by a text layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontUsage {
    pub postscript_name: String,
    /// Font technology as declared by the document (e.g. "TrueType")
    pub font_type: Option<String>,
}

/// A node in an artboard's layer tree.
///
/// Layers are exclusively owned by their artboard's content and are dropped
/// together with it when the artboard is unloaded.
#[derive(Debug, Clone)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub kind: LayerKind,
    pub visible: bool,
    /// Component instantiated by this layer, if any
    pub component_id: Option<ComponentId>,
    /// Bitmap asset names referenced directly by this layer
    pub bitmaps: Vec<String>,
    /// Fonts referenced directly by this layer
    pub fonts: Vec<FontUsage>,
    pub children: Vec<Layer>,
}

impl Layer {
    /// Visits this layer and its descendants depth-first.
    ///
    /// `max_depth` limits how deep the walk descends below this layer:
    /// `Some(0)` visits only this layer, `None` walks the whole subtree.
    /// The visitor receives each layer with its depth relative to this one.
    pub fn walk<'a, F>(&'a self, max_depth: Option<usize>, visit: &mut F)
    where
        F: FnMut(&'a Layer, usize),
    {
        self.walk_at(0, max_depth, visit);
    }

    fn walk_at<'a, F>(&'a self, depth: usize, max_depth: Option<usize>, visit: &mut F)
    where
        F: FnMut(&'a Layer, usize),
    {
        visit(self, depth);
        if max_depth.is_some_and(|max| depth >= max) {
            return;
        }
        for child in &self.children {
            child.walk_at(depth + 1, max_depth, visit);
        }
    }

    /// Finds a layer by id within this subtree.
    pub fn find(&self, id: &LayerId) -> Option<&Layer> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Number of layers in this subtree, including this one.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Layer::subtree_len).sum::<usize>()
    }
}

impl From<OctopusLayer> for Layer {
    fn from(layer: OctopusLayer) -> Self {
        let mut bitmaps = Vec::new();
        let mut push_bitmap = |bitmap: Option<BitmapRef>| {
            if let Some(name) = bitmap.and_then(|b| b.filename) {
                if !name.is_empty() && !bitmaps.contains(&name) {
                    bitmaps.push(name);
                }
            }
        };
        push_bitmap(layer.bitmap);
        push_bitmap(layer.bitmap_mask);
        if let Some(effects) = layer.effects {
            for fill in effects.fills {
                push_bitmap(fill.pattern);
            }
        }

        let mut fonts: Vec<FontUsage> = Vec::new();
        if let Some(text) = layer.text {
            let styles = text.default_style.into_iter().chain(text.styles);
            for font in styles.filter_map(|style| style.font) {
                let Some(postscript_name) = font.post_script_name.filter(|n| !n.is_empty()) else {
                    continue;
                };
                let usage = FontUsage {
                    postscript_name,
                    font_type: font.font_type,
                };
                if !fonts.contains(&usage) {
                    fonts.push(usage);
                }
            }
        }

        Self {
            id: layer.id,
            name: layer.name,
            kind: LayerKind::from_octopus(layer.kind.as_deref()),
            visible: layer.visible,
            component_id: layer.symbol_id,
            bitmaps,
            fonts,
            children: layer.layers.into_iter().map(Layer::from).collect(),
        }
    }
}
