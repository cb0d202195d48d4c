//! In-memory document model.
//!
//! ```text
//! Design ─┬─ Page*
//!         └─ Artboard+ ── ContentState ── ArtboardContent ── Layer tree
//! ```
//!
//! The manifest decides which pages and artboards exist; artboard content is
//! loaded lazily by the loader and parsed from octopus documents.

mod aggregate;
mod artboard;
mod assets;
mod layer;
mod manifest;
mod octopus;

pub use aggregate::{Design, FlatLayer, ManifestDiff, Page};
pub use artboard::{Artboard, ArtboardContent, ContentState};
pub use assets::{collect_assets, AssetCollection, BitmapAssetDescriptor, FontDescriptor};
pub use layer::{FontUsage, Layer, LayerKind};
pub use manifest::{ArtboardEntry, Manifest, PageEntry};
pub use octopus::OctopusDocument;
