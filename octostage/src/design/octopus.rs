//! Serde model of the octopus document format.
//!
//! Only the parts of an octopus document that staging depends on are
//! modeled: the layer tree, bitmap references, font references and
//! component instances. Unknown fields are ignored so newer documents still
//! load.

use crate::ids::{ComponentId, LayerId};
use serde::Deserialize;

/// An artboard's octopus document as stored by the content store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OctopusDocument {
    /// Root layers of the artboard (top-most first)
    #[serde(default)]
    pub layers: Vec<OctopusLayer>,
}

impl OctopusDocument {
    /// Parses a document from JSON bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

/// A layer node as it appears in the document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OctopusLayer {
    pub id: LayerId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub layers: Vec<OctopusLayer>,
    #[serde(default)]
    pub bitmap: Option<BitmapRef>,
    #[serde(default)]
    pub bitmap_mask: Option<BitmapRef>,
    #[serde(default)]
    pub effects: Option<Effects>,
    #[serde(default)]
    pub text: Option<TextContent>,
    /// Component instantiated by this layer
    #[serde(rename = "symbolID", default)]
    pub symbol_id: Option<ComponentId>,
}

fn default_visible() -> bool {
    true
}

/// Reference to a bitmap asset by file name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BitmapRef {
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Effects {
    #[serde(default)]
    pub fills: Vec<Fill>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fill {
    #[serde(default)]
    pub pattern: Option<BitmapRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    #[serde(default)]
    pub default_style: Option<TextStyle>,
    #[serde(default)]
    pub styles: Vec<TextStyle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextStyle {
    #[serde(default)]
    pub font: Option<FontRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontRef {
    #[serde(default)]
    pub post_script_name: Option<String>,
    #[serde(rename = "type", default)]
    pub font_type: Option<String>,
}
