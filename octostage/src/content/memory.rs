//! In-memory content store.

use super::{BitmapResolution, BoxFuture, ContentHandle, ContentStore, ContentStream};
use crate::design::OctopusDocument;
use crate::error::{EntityKind, StageError};
use crate::ids::{ArtboardId, DesignId};
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use futures::TryStreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Content store that keeps documents and bitmaps in memory.
///
/// Handles and bitmap paths are virtual paths below a configurable root; no
/// file is ever created. Read and write counters make the store useful for
/// observing loader behavior.
#[derive(Debug)]
pub struct MemoryContentStore {
    root: PathBuf,
    content: DashMap<(DesignId, ArtboardId), Bytes>,
    bitmaps: DashMap<(DesignId, String), Bytes>,
    content_reads: AtomicUsize,
    content_writes: AtomicUsize,
    bitmap_writes: AtomicUsize,
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::with_root("memory")
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            content: DashMap::new(),
            bitmaps: DashMap::new(),
            content_reads: AtomicUsize::new(0),
            content_writes: AtomicUsize::new(0),
            bitmap_writes: AtomicUsize::new(0),
        }
    }

    /// Stores an artboard document.
    pub fn insert_content(
        &self,
        design_id: impl Into<DesignId>,
        artboard_id: impl Into<ArtboardId>,
        data: impl Into<Bytes>,
    ) {
        self.content
            .insert((design_id.into(), artboard_id.into()), data.into());
    }

    /// Stores a bitmap asset.
    pub fn insert_bitmap(
        &self,
        design_id: impl Into<DesignId>,
        name: impl Into<String>,
        data: impl Into<Bytes>,
    ) {
        self.bitmaps
            .insert((design_id.into(), name.into()), data.into());
    }

    pub fn bitmap_data(&self, design_id: &DesignId, name: &str) -> Option<Bytes> {
        self.bitmaps
            .get(&(design_id.clone(), name.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Number of `read_content` calls.
    pub fn content_reads(&self) -> usize {
        self.content_reads.load(Ordering::Relaxed)
    }

    /// Number of artboard documents written through the store.
    pub fn content_writes(&self) -> usize {
        self.content_writes.load(Ordering::Relaxed)
    }

    /// Number of bitmap assets written through the store.
    pub fn bitmap_writes(&self) -> usize {
        self.bitmap_writes.load(Ordering::Relaxed)
    }

    fn bitmap_path(&self, design_id: &DesignId, name: &str) -> PathBuf {
        self.bitmap_directory(design_id).join(name)
    }
}

async fn collect(stream: ContentStream) -> Result<Bytes, std::io::Error> {
    let buffer = stream
        .try_fold(BytesMut::new(), |mut buffer, chunk| async move {
            buffer.extend_from_slice(&chunk);
            Ok(buffer)
        })
        .await?;
    Ok(buffer.freeze())
}

impl ContentStore for MemoryContentStore {
    fn has_content(
        &self,
        design_id: &DesignId,
        artboard_id: &ArtboardId,
    ) -> BoxFuture<'_, Result<bool, StageError>> {
        let present = self
            .content
            .contains_key(&(design_id.clone(), artboard_id.clone()));
        Box::pin(async move { Ok(present) })
    }

    fn read_content(
        &self,
        design_id: &DesignId,
        artboard_id: &ArtboardId,
    ) -> BoxFuture<'_, Result<OctopusDocument, StageError>> {
        let key = (design_id.clone(), artboard_id.clone());
        Box::pin(async move {
            self.content_reads.fetch_add(1, Ordering::Relaxed);
            let data = self
                .content
                .get(&key)
                .map(|entry| entry.value().clone())
                .ok_or_else(|| StageError::not_found(EntityKind::Content, &key.1))?;
            OctopusDocument::from_slice(&data).map_err(|e| {
                StageError::Corrupt(format!("invalid content for artboard '{}': {}", key.1, e))
            })
        })
    }

    fn write_content_stream(
        &self,
        design_id: &DesignId,
        artboard_id: &ArtboardId,
        stream: ContentStream,
    ) -> BoxFuture<'_, Result<(), StageError>> {
        let key = (design_id.clone(), artboard_id.clone());
        let path = self.content_handle(design_id, artboard_id).path().to_path_buf();
        Box::pin(async move {
            let data = collect(stream)
                .await
                .map_err(|e| StageError::io(path, e))?;
            self.content.insert(key, data);
            self.content_writes.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
    }

    fn content_handle(&self, design_id: &DesignId, artboard_id: &ArtboardId) -> ContentHandle {
        ContentHandle::new(
            self.root
                .join(design_id.as_str())
                .join("content")
                .join(format!("{}.json", artboard_id)),
        )
    }

    fn resolve_bitmap_asset(
        &self,
        design_id: &DesignId,
        name: &str,
    ) -> BoxFuture<'_, Result<BitmapResolution, StageError>> {
        let available = self
            .bitmaps
            .contains_key(&(design_id.clone(), name.to_string()));
        let filename = self.bitmap_path(design_id, name);
        Box::pin(async move {
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
        let key = (design_id.clone(), name.to_string());
        let path = self.bitmap_path(design_id, name);
        Box::pin(async move {
            let data = collect(stream)
                .await
                .map_err(|e| StageError::io(&path, e))?;
            self.bitmaps.insert(key, data);
            self.bitmap_writes.fetch_add(1, Ordering::Relaxed);
            Ok(path)
        })
    }

    fn bitmap_directory(&self, design_id: &DesignId) -> PathBuf {
        self.root.join(design_id.as_str()).join("bitmaps")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::stream_from_bytes;

    #[tokio::test]
    async fn test_insert_and_read() {
        let store = MemoryContentStore::new();
        let design = DesignId::from("d");
        let artboard = ArtboardId::from("a");

        assert!(!store.has_content(&design, &artboard).await.unwrap());
        store.insert_content("d", "a", &br#"{ "layers": [ { "id": "x" } ] }"#[..]);
        assert!(store.has_content(&design, &artboard).await.unwrap());

        let doc = store.read_content(&design, &artboard).await.unwrap();
        assert_eq!(doc.layers.len(), 1);
        assert_eq!(store.content_reads(), 1);
    }

    #[tokio::test]
    async fn test_missing_and_corrupt_content() {
        let store = MemoryContentStore::new();
        let design = DesignId::from("d");

        let missing = store
            .read_content(&design, &ArtboardId::from("nope"))
            .await
            .unwrap_err();
        assert!(matches!(missing, StageError::NotFound { .. }));

        store.insert_content("d", "bad", &b"[1, 2"[..]);
        let corrupt = store
            .read_content(&design, &ArtboardId::from("bad"))
            .await
            .unwrap_err();
        assert!(matches!(corrupt, StageError::Corrupt(_)));
    }

    #[tokio::test]
    async fn test_stream_writes_are_counted() {
        let store = MemoryContentStore::new();
        let design = DesignId::from("d");

        store
            .write_content_stream(
                &design,
                &ArtboardId::from("a"),
                stream_from_bytes(&br#"{ "layers": [] }"#[..]),
            )
            .await
            .unwrap();
        let path = store
            .write_bitmap_stream(&design, "img.png", stream_from_bytes(&b"png"[..]))
            .await
            .unwrap();

        assert_eq!(store.content_writes(), 1);
        assert_eq!(store.bitmap_writes(), 1);
        assert_eq!(path, PathBuf::from("memory/d/bitmaps/img.png"));
        assert_eq!(
            store.bitmap_data(&design, "img.png"),
            Some(Bytes::from_static(b"png"))
        );
        assert!(
            store
                .resolve_bitmap_asset(&design, "img.png")
                .await
                .unwrap()
                .available
        );
    }
}
