//! Artboard content and bitmap storage.
//!
//! The loader reads artboard documents and bitmap files through a
//! [`ContentStore`]. When the store misses, content is fetched from an
//! optional [`RemoteContentSource`] and written back to the store before it
//! is used.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────┐
//!   DesignLoader ─┤ ContentStore (local) │── miss ──► RemoteContentSource
//!                 └──────────┬───────────┘                  │
//!                            ▲          write_*_stream       │
//!                            └──────────────────────────────┘
//! ```
//!
//! Both traits return boxed futures so they can be used as trait objects.

mod local;
mod memory;

pub use local::LocalContentCache;
pub use memory::MemoryContentStore;

use crate::design::{BitmapAssetDescriptor, OctopusDocument};
use crate::error::StageError;
use crate::ids::{ArtboardId, DesignId};
use bytes::Bytes;
use futures::Stream;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;

/// Boxed future returned by collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A byte stream of artboard content or bitmap data.
pub type ContentStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Wraps a single buffer in a [`ContentStream`].
pub fn stream_from_bytes(data: impl Into<Bytes>) -> ContentStream {
    let data = data.into();
    Box::pin(futures::stream::once(async move { Ok(data) }))
}

/// Location of an artboard document as handed to the rendering backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHandle(PathBuf);

impl ContentHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// The path as a string for wire commands.
    pub fn to_wire(&self) -> String {
        self.0.to_string_lossy().into_owned()
    }
}

/// Result of looking a bitmap up in the content store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapResolution {
    /// True when the file is present locally
    pub available: bool,
    /// Where the bitmap is, or would be written
    pub filename: PathBuf,
}

/// Local storage for artboard documents and bitmap assets.
pub trait ContentStore: Send + Sync {
    /// Returns true if the artboard document is stored locally.
    fn has_content(
        &self,
        design_id: &DesignId,
        artboard_id: &ArtboardId,
    ) -> BoxFuture<'_, Result<bool, StageError>>;

    /// Reads and parses an artboard document.
    ///
    /// Fails with `NotFound` when the document is absent and `Corrupt` when
    /// it cannot be parsed.
    fn read_content(
        &self,
        design_id: &DesignId,
        artboard_id: &ArtboardId,
    ) -> BoxFuture<'_, Result<OctopusDocument, StageError>>;

    /// Persists an artboard document from a byte stream.
    fn write_content_stream(
        &self,
        design_id: &DesignId,
        artboard_id: &ArtboardId,
        stream: ContentStream,
    ) -> BoxFuture<'_, Result<(), StageError>>;

    /// Handle under which the rendering backend can read the document.
    fn content_handle(&self, design_id: &DesignId, artboard_id: &ArtboardId) -> ContentHandle;

    /// Looks a bitmap asset up by the name the document references.
    fn resolve_bitmap_asset(
        &self,
        design_id: &DesignId,
        name: &str,
    ) -> BoxFuture<'_, Result<BitmapResolution, StageError>>;

    /// Persists a bitmap asset and returns its local path.
    fn write_bitmap_stream(
        &self,
        design_id: &DesignId,
        name: &str,
        stream: ContentStream,
    ) -> BoxFuture<'_, Result<PathBuf, StageError>>;

    /// Directory containing the design's bitmap assets.
    fn bitmap_directory(&self, design_id: &DesignId) -> PathBuf;
}

/// Remote design service used when the local store misses.
pub trait RemoteContentSource: Send + Sync {
    fn fetch_artboard_content(
        &self,
        design_id: &DesignId,
        artboard_id: &ArtboardId,
    ) -> BoxFuture<'_, Result<ContentStream, StageError>>;

    fn fetch_bitmap_asset(
        &self,
        design_id: &DesignId,
        descriptor: &BitmapAssetDescriptor,
    ) -> BoxFuture<'_, Result<ContentStream, StageError>>;
}

/// Encodes an asset name or id as a single path component.
///
/// Every byte outside `[A-Za-z0-9.-]` becomes `%XX`, as does a leading dot,
/// so distinct names always map to distinct files. The empty name maps to a
/// lone `%`, which no other name produces.
pub(crate) fn encode_file_name(name: &str) -> String {
    if name.is_empty() {
        return "%".to_string();
    }
    let mut encoded = String::with_capacity(name.len());
    for (i, byte) in name.bytes().enumerate() {
        let keep = byte.is_ascii_alphanumeric() || byte == b'-' || (byte == b'.' && i > 0);
        if keep {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}
