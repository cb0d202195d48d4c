//! Commands exchanged with the rendering engine.
//!
//! Commands serialize as flat JSON objects tagged by `cmd`:
//!
//! ```text
//! {"cmd":"load-artboard","designId":"d1","artboardId":"a1","file":"/cache/d1/content/a1.json"}
//! {"ok":true,"pendingSymbols":["sym-1"]}
//! ```

use crate::ids::{ArtboardId, ComponentId, DesignId, PageId};
use serde::{Deserialize, Serialize};

/// Position of an artboard on its page.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

/// A command for the rendering engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum RenderCommand {
    CreateDesign {
        design_id: DesignId,
    },
    LoadArtboard {
        design_id: DesignId,
        artboard_id: ArtboardId,
        /// Content handle of the artboard document
        file: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        symbol_id: Option<ComponentId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        page_id: Option<PageId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bitmap_asset_directory: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        font_directory: Option<String>,
    },
    GetArtboardDependencies {
        design_id: DesignId,
        artboard_id: ArtboardId,
    },
    LoadImage {
        design_id: DesignId,
        image_name: String,
        file_path: String,
    },
    LoadFont {
        design_id: DesignId,
        postscript_name: String,
        file_path: String,
    },
    FinalizeArtboard {
        design_id: DesignId,
        artboard_id: ArtboardId,
    },
    SetArtboardPage {
        design_id: DesignId,
        artboard_id: ArtboardId,
        page_id: Option<PageId>,
    },
    SetArtboardOffset {
        design_id: DesignId,
        artboard_id: ArtboardId,
        offset: Offset,
    },
    UnloadArtboard {
        design_id: DesignId,
        artboard_id: ArtboardId,
    },
    UnloadDesign {
        design_id: DesignId,
    },
}

impl RenderCommand {
    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateDesign { .. } => "create-design",
            Self::LoadArtboard { .. } => "load-artboard",
            Self::GetArtboardDependencies { .. } => "get-artboard-dependencies",
            Self::LoadImage { .. } => "load-image",
            Self::LoadFont { .. } => "load-font",
            Self::FinalizeArtboard { .. } => "finalize-artboard",
            Self::SetArtboardPage { .. } => "set-artboard-page",
            Self::SetArtboardOffset { .. } => "set-artboard-offset",
            Self::UnloadArtboard { .. } => "unload-artboard",
            Self::UnloadDesign { .. } => "unload-design",
        }
    }

    /// Artboard the command targets, if any.
    pub fn artboard_id(&self) -> Option<&ArtboardId> {
        match self {
            Self::LoadArtboard { artboard_id, .. }
            | Self::GetArtboardDependencies { artboard_id, .. }
            | Self::FinalizeArtboard { artboard_id, .. }
            | Self::SetArtboardPage { artboard_id, .. }
            | Self::SetArtboardOffset { artboard_id, .. }
            | Self::UnloadArtboard { artboard_id, .. } => Some(artboard_id),
            _ => None,
        }
    }
}

/// Response to a [`RenderCommand`].
///
/// A response without `"ok": true` is a failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Components an artboard references that are not staged yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_symbols: Option<Vec<ComponentId>>,
    /// Dependency list returned by `get-artboard-dependencies`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<ComponentId>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RenderResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            ..Default::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_pending_symbols(mut self, symbols: Vec<ComponentId>) -> Self {
        self.pending_symbols = Some(symbols);
        self
    }

    pub fn with_symbols(mut self, symbols: Vec<ComponentId>) -> Self {
        self.symbols = Some(symbols);
        self
    }

    /// Pending component ids from either `pendingSymbols` or `symbols`.
    pub fn dependency_ids(&self) -> Vec<ComponentId> {
        self.pending_symbols
            .as_ref()
            .or(self.symbols.as_ref())
            .cloned()
            .unwrap_or_default()
    }
}
