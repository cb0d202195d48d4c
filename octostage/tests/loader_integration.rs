//! Integration tests for the design loader.
//!
//! These tests drive a `DesignLoader` against an in-memory content store and
//! a recording engine double, verifying:
//! - Deduplication of concurrent readiness requests
//! - Component dependency ordering
//! - Idempotence once an artboard is ready
//! - Asset re-use within a design session
//! - Cancellation and retry by coalesced waiters
//! - Missing components and dependency cycles, within one call and across callers
//! - Engine rejections during finalize
//! - Remote fetch on a cache miss
//! - Manifest updates against staged artboards

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use octostage::content::{
    stream_from_bytes, BoxFuture, ContentStream, MemoryContentStore, RemoteContentSource,
};
use octostage::design::{ArtboardEntry, BitmapAssetDescriptor, Manifest, PageEntry};
use octostage::fonts::{DirectoryFontSource, FontSource};
use octostage::orchestrator::DesignLoader;
use octostage::render::{ArtboardReadiness, RenderBackend, RenderCommand, RenderResponse};
use octostage::{ArtboardId, ComponentId, DesignId, EntityKind, PageId, StageError};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Test Helpers
// =============================================================================

/// Engine double that records every command it receives.
#[derive(Default)]
struct MockEngine {
    log: Mutex<Vec<RenderCommand>>,
    /// Component ids reported as pending when an artboard is loaded
    pending: Mutex<HashMap<ArtboardId, Vec<ComponentId>>>,
    /// Cancels the token when the named command arrives
    cancel_on: Mutex<Option<(&'static str, CancellationToken)>>,
    /// Remaining rejections per command name
    rejections: Mutex<HashMap<String, usize>>,
    latency: Duration,
}

impl MockEngine {
    fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    fn depends(&self, artboard: &str, components: &[&str]) {
        self.pending.lock().insert(
            ArtboardId::from(artboard),
            components.iter().map(|c| ComponentId::from(*c)).collect(),
        );
    }

    fn cancel_on(&self, command: &'static str, token: CancellationToken) {
        *self.cancel_on.lock() = Some((command, token));
    }

    /// Answers the next `times` commands with the given name with `ok: false`.
    fn reject(&self, command: &str, times: usize) {
        self.rejections.lock().insert(command.to_string(), times);
    }

    fn commands(&self) -> Vec<RenderCommand> {
        self.log.lock().clone()
    }

    fn count(&self, name: &str) -> usize {
        self.log.lock().iter().filter(|c| c.name() == name).count()
    }

    /// Index of the first command with the given name for the given artboard.
    fn position(&self, name: &str, artboard: &str) -> Option<usize> {
        self.log.lock().iter().position(|c| {
            c.name() == name && c.artboard_id().map(ArtboardId::as_str) == Some(artboard)
        })
    }

    fn image_position(&self, image: &str) -> Option<usize> {
        self.log.lock().iter().position(|c| {
            matches!(c, RenderCommand::LoadImage { image_name, .. } if image_name == image)
        })
    }
}

impl RenderBackend for MockEngine {
    fn execute(&self, command: RenderCommand) -> BoxFuture<'_, Result<RenderResponse, StageError>> {
        let response = match &command {
            RenderCommand::LoadArtboard { artboard_id, .. }
            | RenderCommand::GetArtboardDependencies { artboard_id, .. } => {
                let pending = self
                    .pending
                    .lock()
                    .get(artboard_id)
                    .cloned()
                    .unwrap_or_default();
                RenderResponse::ok().with_pending_symbols(pending)
            }
            _ => RenderResponse::ok(),
        };
        let response = match self.rejections.lock().get_mut(command.name()) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                RenderResponse::failure(format!("{} rejected", command.name()))
            }
            _ => response,
        };

        if let Some((name, token)) = self.cancel_on.lock().as_ref() {
            if *name == command.name() {
                token.cancel();
            }
        }
        self.log.lock().push(command);

        let latency = self.latency;
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            Ok(response)
        })
    }
}

/// Remote design service serving fixed documents and bitmaps.
#[derive(Default)]
struct MockRemote {
    documents: HashMap<ArtboardId, &'static str>,
    content_fetches: AtomicUsize,
    bitmap_fetches: AtomicUsize,
}

impl RemoteContentSource for MockRemote {
    fn fetch_artboard_content(
        &self,
        _design_id: &DesignId,
        artboard_id: &ArtboardId,
    ) -> BoxFuture<'_, Result<ContentStream, StageError>> {
        self.content_fetches.fetch_add(1, Ordering::SeqCst);
        let document = self.documents.get(artboard_id).copied();
        let artboard_id = artboard_id.clone();
        Box::pin(async move {
            document
                .map(|json| stream_from_bytes(json.as_bytes()))
                .ok_or_else(|| StageError::remote("fetch-artboard", format!("no artboard {}", artboard_id)))
        })
    }

    fn fetch_bitmap_asset(
        &self,
        _design_id: &DesignId,
        _descriptor: &BitmapAssetDescriptor,
    ) -> BoxFuture<'_, Result<ContentStream, StageError>> {
        self.bitmap_fetches.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(stream_from_bytes(&b"remote-bitmap"[..])) })
    }
}

const DESIGN: &str = "design";

/// A (page p1, uses sym1 and hero.png) and B (defines sym1, uses logo.png).
fn ab_manifest() -> Manifest {
    Manifest {
        pages: vec![PageEntry::new("p1", "Page 1"), PageEntry::new("p2", "Page 2")],
        artboards: vec![
            ArtboardEntry::new("A").with_page("p1").with_name("Screen"),
            ArtboardEntry::new("B")
                .with_component("sym1")
                .with_page("p1")
                .with_name("Button"),
        ],
    }
}

const DOC_A: &str = r#"{ "layers": [
    { "id": "hero", "bitmap": { "filename": "hero.png" } },
    { "id": "button", "symbolID": "sym1" }
] }"#;

const DOC_B: &str = r#"{ "layers": [
    { "id": "logo", "bitmap": { "filename": "logo.png" } },
    { "id": "label", "type": "textLayer",
      "text": { "defaultStyle": { "font": { "postScriptName": "Inter-Regular" } } } }
] }"#;

fn ab_store() -> Arc<MemoryContentStore> {
    let store = Arc::new(MemoryContentStore::new());
    store.insert_content(DESIGN, "A", DOC_A.as_bytes());
    store.insert_content(DESIGN, "B", DOC_B.as_bytes());
    store.insert_bitmap(DESIGN, "hero.png", &b"hero"[..]);
    store.insert_bitmap(DESIGN, "logo.png", &b"logo"[..]);
    store
}

fn fonts() -> Arc<dyn FontSource> {
    Arc::new(DirectoryFontSource::from_entries(
        [("Inter-Regular", "/fonts/Inter-Regular.ttf".into())],
        Vec::new(),
    ))
}

fn build(
    manifest: Manifest,
    engine: &Arc<MockEngine>,
    store: &Arc<MemoryContentStore>,
    remote: Option<Arc<MockRemote>>,
) -> DesignLoader {
    let mut builder = DesignLoader::builder(DesignId::from(DESIGN), manifest)
        .content_store(store.clone())
        .render_backend(engine.clone())
        .font_source(fonts());
    if let Some(remote) = remote {
        builder = builder.remote_source(remote);
    }
    builder.build().unwrap()
}

fn id(name: &str) -> ArtboardId {
    ArtboardId::from(name)
}

// =============================================================================
// Integration Tests
// =============================================================================

#[tokio::test]
async fn test_component_dependency_scenario() {
    let engine = Arc::new(MockEngine::default());
    engine.depends("A", &["sym1"]);
    let store = ab_store();
    let loader = build(ab_manifest(), &engine, &store, None);

    loader
        .ensure_artboard_ready(&id("A"), &CancellationToken::new())
        .await
        .unwrap();

    assert!(loader.is_artboard_ready(&id("A")));
    assert!(loader.is_artboard_ready(&id("B")));

    let finalize_a = engine.position("finalize-artboard", "A").unwrap();
    let finalize_b = engine.position("finalize-artboard", "B").unwrap();
    assert!(finalize_b < finalize_a, "B must be ready before A is finalized");

    // Every artboard's assets are pushed before it is finalized
    assert!(engine.image_position("logo.png").unwrap() < finalize_b);
    assert!(engine.image_position("hero.png").unwrap() < finalize_a);
    assert_eq!(engine.count("load-font"), 1);
    assert_eq!(engine.commands()[0].name(), "create-design");
}

#[tokio::test]
async fn test_concurrent_requests_share_one_load() {
    let engine = Arc::new(MockEngine::with_latency(Duration::from_millis(5)));
    let store = ab_store();
    let loader = build(ab_manifest(), &engine, &store, None);
    let cancel = CancellationToken::new();
    let b = id("B");

    let calls = (0..8).map(|_| loader.ensure_artboard_ready(&b, &cancel));
    let results = join_all(calls).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(store.content_reads(), 1);
    assert_eq!(engine.count("load-artboard"), 1);
    assert_eq!(engine.count("finalize-artboard"), 1);
    assert_eq!(engine.count("create-design"), 1);

    let stats = loader.stats();
    assert_eq!(stats.readiness.new_requests, 1);
    assert!(stats.readiness.coalesced_requests >= 1);
}

#[tokio::test]
async fn test_ready_artboard_needs_no_further_calls() {
    let engine = Arc::new(MockEngine::default());
    engine.depends("A", &["sym1"]);
    let store = ab_store();
    let loader = build(ab_manifest(), &engine, &store, None);
    let cancel = CancellationToken::new();

    loader.ensure_artboard_ready(&id("A"), &cancel).await.unwrap();
    let commands = engine.commands().len();
    let reads = store.content_reads();

    loader.ensure_artboard_ready(&id("A"), &cancel).await.unwrap();
    loader.ensure_artboard_ready(&id("B"), &cancel).await.unwrap();

    assert_eq!(engine.commands().len(), commands);
    assert_eq!(store.content_reads(), reads);
}

#[tokio::test]
async fn test_shared_bitmap_is_pushed_once() {
    let engine = Arc::new(MockEngine::default());
    let store = Arc::new(MemoryContentStore::new());
    let shared = r#"{ "layers": [ { "id": "bg", "bitmap": { "filename": "texture.png" } } ] }"#;
    store.insert_content(DESIGN, "one", shared.as_bytes());
    store.insert_content(DESIGN, "two", shared.as_bytes());
    store.insert_bitmap(DESIGN, "texture.png", &b"png"[..]);

    let manifest = Manifest {
        pages: vec![],
        artboards: vec![ArtboardEntry::new("one"), ArtboardEntry::new("two")],
    };
    let loader = build(manifest, &engine, &store, None);

    loader
        .ensure_artboards_ready(&[id("one"), id("two")], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(engine.count("load-image"), 1);
    assert_eq!(engine.count("finalize-artboard"), 2);
    assert_eq!(loader.stats().assets_loaded, 1);
}

#[tokio::test]
async fn test_cancellation_stops_further_commands() {
    let engine = Arc::new(MockEngine::default());
    let store = ab_store();
    let loader = build(ab_manifest(), &engine, &store, None);
    let cancel = CancellationToken::new();
    engine.cancel_on("load-artboard", cancel.clone());

    let err = loader
        .ensure_artboard_ready(&id("B"), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err, StageError::Cancelled);

    // Commands already acknowledged are not undone
    let names: Vec<_> = engine.commands().iter().map(RenderCommand::name).collect();
    assert_eq!(names, vec!["create-design", "load-artboard"]);
    assert_eq!(loader.readiness(&id("B")), ArtboardReadiness::PendingDependencies);
    assert!(!loader.is_artboard_ready(&id("B")));

    // A later call with a live token finishes the staging
    loader
        .ensure_artboard_ready(&id("B"), &CancellationToken::new())
        .await
        .unwrap();
    assert!(loader.is_artboard_ready(&id("B")));
    assert_eq!(engine.count("load-artboard"), 1);
    assert_eq!(engine.count("get-artboard-dependencies"), 1);
}

#[tokio::test]
async fn test_waiter_retries_when_owner_is_cancelled() {
    let engine = Arc::new(MockEngine::with_latency(Duration::from_millis(10)));
    let store = ab_store();
    let loader = build(ab_manifest(), &engine, &store, None);

    let owner_token = CancellationToken::new();
    let waiter_token = CancellationToken::new();
    engine.cancel_on("load-artboard", owner_token.clone());
    let b = id("B");

    let (owner, waiter) = tokio::join!(
        loader.ensure_artboard_ready(&b, &owner_token),
        loader.ensure_artboard_ready(&b, &waiter_token),
    );

    assert_eq!(owner, Err(StageError::Cancelled));
    assert_eq!(waiter, Ok(()));
    assert!(loader.is_artboard_ready(&id("B")));
    assert_eq!(engine.count("finalize-artboard"), 1);
}

#[tokio::test]
async fn test_pre_cancelled_token_issues_nothing() {
    let engine = Arc::new(MockEngine::default());
    let store = ab_store();
    let loader = build(ab_manifest(), &engine, &store, None);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = loader.ensure_artboard_ready(&id("A"), &cancel).await;
    assert_eq!(result, Err(StageError::Cancelled));
    assert!(engine.commands().is_empty());
    assert_eq!(store.content_reads(), 0);
}

#[tokio::test]
async fn test_missing_component_is_corrupt() {
    let engine = Arc::new(MockEngine::default());
    engine.depends("A", &["sym1", "ghost"]);
    let store = ab_store();
    let loader = build(ab_manifest(), &engine, &store, None);

    let err = loader
        .ensure_artboard_ready(&id("A"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, StageError::Corrupt(ref message) if message.contains("ghost")));
    assert!(!loader.is_artboard_ready(&id("A")));
    assert_eq!(engine.position("finalize-artboard", "A"), None);
}

#[tokio::test]
async fn test_component_cycle_is_reported() {
    let engine = Arc::new(MockEngine::default());
    engine.depends("A", &["sym-b"]);
    engine.depends("B", &["sym-a"]);

    let store = Arc::new(MemoryContentStore::new());
    store.insert_content(DESIGN, "A", &br#"{ "layers": [ { "id": "i", "symbolID": "sym-b" } ] }"#[..]);
    store.insert_content(DESIGN, "B", &br#"{ "layers": [ { "id": "i", "symbolID": "sym-a" } ] }"#[..]);

    let manifest = Manifest {
        pages: vec![],
        artboards: vec![
            ArtboardEntry::new("A").with_component("sym-a"),
            ArtboardEntry::new("B").with_component("sym-b"),
        ],
    };
    let loader = build(manifest, &engine, &store, None);

    let err = loader
        .ensure_artboard_ready(&id("A"), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        StageError::DependencyCycle(path) => {
            assert_eq!(path.first(), path.last());
            assert!(path.contains(&id("A")));
            assert!(path.contains(&id("B")));
        }
        other => panic!("expected a dependency cycle, got {other:?}"),
    }
    assert_eq!(engine.count("finalize-artboard"), 0);
}

#[tokio::test]
async fn test_self_referencing_component_is_a_cycle() {
    let engine = Arc::new(MockEngine::default());
    engine.depends("A", &["sym-a"]);
    let store = Arc::new(MemoryContentStore::new());
    store.insert_content(DESIGN, "A", &br#"{ "layers": [ { "id": "i", "symbolID": "sym-a" } ] }"#[..]);

    let manifest = Manifest {
        pages: vec![],
        artboards: vec![ArtboardEntry::new("A").with_component("sym-a")],
    };
    let loader = build(manifest, &engine, &store, None);

    let err = loader
        .ensure_artboard_ready(&id("A"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, StageError::DependencyCycle(vec![id("A"), id("A")]));
}

#[tokio::test]
async fn test_cache_miss_fetches_from_remote() {
    let engine = Arc::new(MockEngine::default());
    let store = Arc::new(MemoryContentStore::new());
    let remote = Arc::new(MockRemote {
        documents: HashMap::from([(id("B"), DOC_B)]),
        ..MockRemote::default()
    });
    let loader = build(ab_manifest(), &engine, &store, Some(remote.clone()));
    let cancel = CancellationToken::new();

    loader.ensure_artboard_ready(&id("B"), &cancel).await.unwrap();

    assert_eq!(remote.content_fetches.load(Ordering::SeqCst), 1);
    assert_eq!(store.content_writes(), 1);
    // logo.png is not cached either
    assert_eq!(remote.bitmap_fetches.load(Ordering::SeqCst), 1);
    assert_eq!(store.bitmap_writes(), 1);

    let content = loader.ensure_content_loaded(&id("B"), &cancel).await.unwrap();
    assert_eq!(content.layer_count(), 2);
    assert_eq!(remote.content_fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_remote_failure_leaves_content_absent() {
    let engine = Arc::new(MockEngine::default());
    let store = Arc::new(MemoryContentStore::new());
    let remote = Arc::new(MockRemote::default());
    let loader = build(ab_manifest(), &engine, &store, Some(remote.clone()));
    let cancel = CancellationToken::new();

    let err = loader.ensure_content_loaded(&id("A"), &cancel).await.unwrap_err();
    assert!(matches!(err, StageError::RemoteFailure { .. }));
    assert!(!loader.is_content_loaded(&id("A")));

    // The failed load is not cached
    let _ = loader.ensure_content_loaded(&id("A"), &cancel).await;
    assert_eq!(remote.content_fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_missing_font_is_skipped() {
    let engine = Arc::new(MockEngine::default());
    let store = Arc::new(MemoryContentStore::new());
    store.insert_content(
        DESIGN,
        "T",
        &br#"{ "layers": [ { "id": "t", "type": "textLayer",
            "text": { "defaultStyle": { "font": { "postScriptName": "Unknown-Bold" } } } } ] }"#[..],
    );
    let manifest = Manifest {
        pages: vec![],
        artboards: vec![ArtboardEntry::new("T")],
    };
    let loader = build(manifest, &engine, &store, None);

    loader
        .ensure_artboard_ready(&id("T"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(engine.count("load-font"), 0);
    assert!(loader.is_artboard_ready(&id("T")));
}

#[tokio::test]
async fn test_page_ready_stages_all_page_artboards() {
    let engine = Arc::new(MockEngine::default());
    engine.depends("A", &["sym1"]);
    let store = ab_store();
    let loader = build(ab_manifest(), &engine, &store, None);

    loader
        .ensure_page_ready(&PageId::from("p1"), &CancellationToken::new())
        .await
        .unwrap();
    assert!(loader.is_artboard_ready(&id("A")));
    assert!(loader.is_artboard_ready(&id("B")));
    assert_eq!(engine.count("finalize-artboard"), 2);

    let err = loader
        .ensure_page_ready(&PageId::from("nope"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StageError::NotFound { kind: EntityKind::Page, .. }));
}

#[tokio::test]
async fn test_manifest_update_syncs_staged_artboards() {
    let engine = Arc::new(MockEngine::default());
    engine.depends("A", &["sym1"]);
    let store = ab_store();
    let loader = build(ab_manifest(), &engine, &store, None);

    loader
        .ensure_artboard_ready(&id("A"), &CancellationToken::new())
        .await
        .unwrap();

    // B moves to page p2, A is removed
    let updated = Manifest {
        pages: vec![PageEntry::new("p1", "Page 1"), PageEntry::new("p2", "Page 2")],
        artboards: vec![ArtboardEntry::new("B").with_component("sym1").with_page("p2")],
    };
    let diff = loader.update_manifest(&updated).await.unwrap();

    assert_eq!(diff.removed, vec![id("A")]);
    assert_eq!(diff.page_changes, vec![(id("B"), Some(PageId::from("p2")))]);
    assert!(engine.position("unload-artboard", "A").is_some());
    assert!(matches!(
        engine.commands().last(),
        Some(RenderCommand::SetArtboardPage { page_id: Some(page), .. }) if page.as_str() == "p2"
    ));
    assert_eq!(loader.readiness(&id("A")), ArtboardReadiness::Unloaded);
    assert!(loader.is_artboard_ready(&id("B")));
}

#[tokio::test]
async fn test_unload_artboard_allows_restaging() {
    let engine = Arc::new(MockEngine::default());
    let store = ab_store();
    let loader = build(ab_manifest(), &engine, &store, None);
    let cancel = CancellationToken::new();

    loader.ensure_artboard_ready(&id("B"), &cancel).await.unwrap();
    loader.unload_artboard(&id("B")).await.unwrap();

    assert!(!loader.is_artboard_loaded(&id("B")));
    assert!(!loader.is_content_loaded(&id("B")));

    loader.ensure_artboard_ready(&id("B"), &cancel).await.unwrap();
    assert_eq!(engine.count("load-artboard"), 2);
    assert_eq!(store.content_reads(), 2);
    // Assets stay loaded for the design session
    assert_eq!(engine.count("load-image"), 1);
}

#[tokio::test]
async fn test_rejected_finalize_leaves_artboard_pending() {
    let engine = Arc::new(MockEngine::default());
    engine.reject("finalize-artboard", 1);
    let store = ab_store();
    let loader = build(ab_manifest(), &engine, &store, None);
    let cancel = CancellationToken::new();

    let err = loader.ensure_artboard_ready(&id("B"), &cancel).await.unwrap_err();
    assert!(matches!(err, StageError::RemoteFailure { .. }));
    assert!(!loader.is_artboard_ready(&id("B")));
    assert_eq!(loader.readiness(&id("B")), ArtboardReadiness::PendingDependencies);

    // The next call resumes from the staged artboard and finalizes it
    loader.ensure_artboard_ready(&id("B"), &cancel).await.unwrap();
    assert!(loader.is_artboard_ready(&id("B")));
    assert_eq!(engine.count("load-artboard"), 1);
    assert_eq!(engine.count("get-artboard-dependencies"), 1);
    assert_eq!(engine.count("finalize-artboard"), 2);
    assert_eq!(engine.count("load-image"), 1);
}

#[tokio::test]
async fn test_cycle_across_concurrent_callers_fails_instead_of_hanging() {
    let engine = Arc::new(MockEngine::with_latency(Duration::from_millis(5)));
    engine.depends("A", &["sym-b"]);
    engine.depends("B", &["sym-a"]);

    let store = Arc::new(MemoryContentStore::new());
    store.insert_content(DESIGN, "A", &br#"{ "layers": [ { "id": "i", "symbolID": "sym-b" } ] }"#[..]);
    store.insert_content(DESIGN, "B", &br#"{ "layers": [ { "id": "i", "symbolID": "sym-a" } ] }"#[..]);

    let manifest = Manifest {
        pages: vec![],
        artboards: vec![
            ArtboardEntry::new("A").with_component("sym-a"),
            ArtboardEntry::new("B").with_component("sym-b"),
        ],
    };
    let loader = build(manifest, &engine, &store, None);
    let (a, b) = (id("A"), id("B"));
    let (cancel_a, cancel_b) = (CancellationToken::new(), CancellationToken::new());

    let (result_a, result_b) = tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(
            loader.ensure_artboard_ready(&a, &cancel_a),
            loader.ensure_artboard_ready(&b, &cancel_b),
        )
    })
    .await
    .expect("mutually dependent loads deadlocked");

    assert!(matches!(result_a, Err(StageError::DependencyCycle(_))), "{result_a:?}");
    assert!(matches!(result_b, Err(StageError::DependencyCycle(_))), "{result_b:?}");
    assert_eq!(engine.count("finalize-artboard"), 0);
}

#[tokio::test]
async fn test_readiness_runs_on_a_spawned_task() {
    let engine = Arc::new(MockEngine::default());
    engine.depends("A", &["sym1"]);
    let store = ab_store();
    let loader = Arc::new(build(ab_manifest(), &engine, &store, None));

    // Requires the whole staging future, assets included, to be Send
    let task = tokio::spawn({
        let loader = loader.clone();
        async move {
            let cancel = CancellationToken::new();
            let result = loader.ensure_artboard_ready(&id("A"), &cancel).await;
            result
        }
    });

    task.await.unwrap().unwrap();
    assert!(loader.is_artboard_ready(&id("A")));
    assert_eq!(engine.count("load-image"), 2);
}
