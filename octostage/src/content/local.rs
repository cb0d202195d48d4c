//! On-disk content cache.
//!
//! # File Layout
//!
//! ```text
//! {root}/{design}/manifest.json
//! {root}/{design}/content/{artboard}.json
//! {root}/{design}/bitmaps/{asset name}
//! ```
//!
//! Ids and asset names are percent-encoded into single path components. Writes go
//! to a temp file first and are renamed into place, so readers never observe
//! a partially written document.

use super::{
    encode_file_name, BitmapResolution, BoxFuture, ContentHandle, ContentStore, ContentStream,
};
use crate::design::{Manifest, OctopusDocument};
use crate::error::{EntityKind, StageError};
use crate::ids::{ArtboardId, DesignId};
use futures::TryStreamExt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;
use tracing::debug;

const MANIFEST_FILE: &str = "manifest.json";
const CONTENT_DIR: &str = "content";
const BITMAP_DIR: &str = "bitmaps";

/// Content store backed by a local directory tree.
#[derive(Debug, Clone)]
pub struct LocalContentCache {
    root: PathBuf,
}

impl LocalContentCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn design_directory(&self, design_id: &DesignId) -> PathBuf {
        self.root.join(encode_file_name(design_id.as_str()))
    }

    pub fn manifest_path(&self, design_id: &DesignId) -> PathBuf {
        self.design_directory(design_id).join(MANIFEST_FILE)
    }

    pub fn content_path(&self, design_id: &DesignId, artboard_id: &ArtboardId) -> PathBuf {
        self.design_directory(design_id)
            .join(CONTENT_DIR)
            .join(format!("{}.json", encode_file_name(artboard_id.as_str())))
    }

    pub fn bitmap_path(&self, design_id: &DesignId, name: &str) -> PathBuf {
        self.design_directory(design_id)
            .join(BITMAP_DIR)
            .join(encode_file_name(name))
    }

    /// Reads the cached manifest of a design.
    pub async fn read_manifest(&self, design_id: &DesignId) -> Result<Manifest, StageError> {
        let path = self.manifest_path(design_id);
        let data = read_file(&path, || {
            StageError::not_found(EntityKind::Content, format!("{}/{}", design_id, MANIFEST_FILE))
        })
        .await?;
        Manifest::from_slice(&data)
    }

    /// Writes a design manifest into the cache.
    pub async fn write_manifest(
        &self,
        design_id: &DesignId,
        manifest: &Manifest,
    ) -> Result<(), StageError> {
        let path = self.manifest_path(design_id);
        let data = serde_json::to_vec_pretty(manifest)
            .map_err(|e| StageError::Corrupt(format!("cannot serialize manifest: {}", e)))?;
        write_atomic(&path, futures::stream::iter([Ok(bytes::Bytes::from(data))])).await
    }
}

/// Reads a whole file, mapping `NotFound` through `missing`.
async fn read_file(
    path: &Path,
    missing: impl FnOnce() -> StageError,
) -> Result<Vec<u8>, StageError> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(data),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(missing()),
        Err(e) => Err(StageError::io(path, e)),
    }
}

/// Streams data into a temp file next to `path` and renames it into place.
///
/// Each write gets its own temp name, so concurrent writers of one path
/// never share a temp file. The temp file is removed if the write fails or
/// the future is dropped before the rename.
async fn write_atomic<S>(path: &Path, mut stream: S) -> Result<(), StageError>
where
    S: futures::Stream<Item = std::io::Result<bytes::Bytes>> + Unpin,
{
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StageError::io(parent, e))?;
    }

    let temp = TempFile::next_to(path);
    let mut file = tokio::fs::File::create(temp.path())
        .await
        .map_err(|e| StageError::io(temp.path(), e))?;
    while let Some(chunk) = stream
        .try_next()
        .await
        .map_err(|e| StageError::io(path, e))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| StageError::io(temp.path(), e))?;
    }
    file.flush()
        .await
        .map_err(|e| StageError::io(temp.path(), e))?;
    drop(file);

    tokio::fs::rename(temp.path(), path)
        .await
        .map_err(|e| StageError::io(path, e))?;
    temp.persisted();
    Ok(())
}

/// Temp file that is deleted on drop unless it was renamed into place.
struct TempFile {
    path: PathBuf,
    persisted: bool,
}

impl TempFile {
    fn next_to(path: &Path) -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);

        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(
            ".{}-{}.tmp",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::Relaxed)
        ));
        Self {
            path: path.with_file_name(name),
            persisted: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn persisted(mut self) {
        self.persisted = true;
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.persisted {
            // May not exist yet if creation failed
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

impl ContentStore for LocalContentCache {
    fn has_content(
        &self,
        design_id: &DesignId,
        artboard_id: &ArtboardId,
    ) -> BoxFuture<'_, Result<bool, StageError>> {
        let path = self.content_path(design_id, artboard_id);
        Box::pin(async move {
            tokio::fs::try_exists(&path)
                .await
                .map_err(|e| StageError::io(&path, e))
        })
    }

    fn read_content(
        &self,
        design_id: &DesignId,
        artboard_id: &ArtboardId,
    ) -> BoxFuture<'_, Result<OctopusDocument, StageError>> {
        let path = self.content_path(design_id, artboard_id);
        let artboard_id = artboard_id.clone();
        Box::pin(async move {
            let data = read_file(&path, || {
                StageError::not_found(EntityKind::Content, &artboard_id)
            })
            .await?;
            OctopusDocument::from_slice(&data).map_err(|e| {
                StageError::Corrupt(format!("invalid content for artboard '{}': {}", artboard_id, e))
            })
        })
    }

    fn write_content_stream(
        &self,
        design_id: &DesignId,
        artboard_id: &ArtboardId,
        stream: ContentStream,
    ) -> BoxFuture<'_, Result<(), StageError>> {
        let path = self.content_path(design_id, artboard_id);
        Box::pin(async move {
            write_atomic(&path, stream).await?;
            debug!(path = %path.display(), "Cached artboard content");
            Ok(())
        })
    }

    fn content_handle(&self, design_id: &DesignId, artboard_id: &ArtboardId) -> ContentHandle {
        ContentHandle::new(self.content_path(design_id, artboard_id))
    }

    fn resolve_bitmap_asset(
        &self,
        design_id: &DesignId,
        name: &str,
    ) -> BoxFuture<'_, Result<BitmapResolution, StageError>> {
        let filename = self.bitmap_path(design_id, name);
        Box::pin(async move {
            let available = tokio::fs::try_exists(&filename)
                .await
                .map_err(|e| StageError::io(&filename, e))?;
            Ok(BitmapResolution {
                available,
                filename,
            })
        })
    }

    fn write_bitmap_stream(
        &self,
        design_id: &DesignId,
        name: &str,
        stream: ContentStream,
    ) -> BoxFuture<'_, Result<PathBuf, StageError>> {
        let path = self.bitmap_path(design_id, name);
        Box::pin(async move {
            write_atomic(&path, stream).await?;
            debug!(path = %path.display(), "Cached bitmap asset");
            Ok(path)
        })
    }

    fn bitmap_directory(&self, design_id: &DesignId) -> PathBuf {
        self.design_directory(design_id).join(BITMAP_DIR)
    }
}
