//! The design loader: readiness orchestration for one design session.
//!
//! # Staging an artboard
//!
//! ```text
//! ensure_artboard_ready(A)
//!   │
//!   ├─ ready in engine? ──────────────────────────────► done
//!   ├─ load of A in flight? ── wait for it ───────────► done / error
//!   │
//!   └─ owner of A's load:
//!        1. content      local store, remote fetch + cache write on miss
//!        2. register     load-artboard (or get-artboard-dependencies)
//!        3. dependencies resolve component ids, ensure each ready (parallel)
//!        4. assets       bitmap and font staging (barrier)
//!        5. finalize     finalize-artboard → Ready
//! ```
//!
//! Every step checks the cancellation token first. Nothing already sent to
//! the engine or written to the cache is rolled back on cancellation.
//!
//! # Concurrency
//!
//! Readiness loads and content loads are each deduplicated per artboard
//! through an [`InFlight`] registry. A waiter whose owner was cancelled or
//! dropped retries under its own token. Dependency waits are recorded in a
//! [`WaitGraph`] so component cycles fail with `DependencyCycle` instead of
//! waiting forever.

use super::builder::LoaderConfig;
use super::resolver;
use super::wait_graph::WaitGraph;
use crate::cancel::{check, run_cancellable};
use crate::coalesce::{Abandoned, CoalescerStats, InFlight, Registration};
use crate::content::{BoxFuture, ContentStore, RemoteContentSource};
use crate::design::{ArtboardContent, Design, Manifest, ManifestDiff};
use crate::error::{Collaborator, EntityKind, StageError};
use crate::ids::{ArtboardId, DesignId, PageId};
use crate::render::{ArtboardReadiness, AssetSearchPaths, Offset, RenderingProxy};
use crate::staging::AssetPipeline;
use futures::future::try_join_all;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

type SharedResult<T> = Result<T, StageError>;

/// Coalescing statistics of a loader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// Readiness requests (`ensure_artboard_ready` and recursion)
    pub readiness: CoalescerStats,
    /// Content load requests
    pub content: CoalescerStats,
    /// Assets pushed to the engine in this session
    pub assets_loaded: usize,
}

/// Loads and stages the artboards of one design.
pub struct DesignLoader {
    design_id: DesignId,
    design: RwLock<Design>,
    store: Arc<dyn ContentStore>,
    remote: Option<Arc<dyn RemoteContentSource>>,
    proxy: Arc<RenderingProxy>,
    pipeline: AssetPipeline,
    config: LoaderConfig,
    readiness_loads: InFlight<ArtboardId, SharedResult<()>>,
    content_loads: InFlight<ArtboardId, SharedResult<Arc<ArtboardContent>>>,
    wait_graph: WaitGraph,
    /// Whether `create-design` has been acknowledged for this session
    session: Mutex<bool>,
}

/// Reverts an artboard's `Loading` state unless the load finished.
struct LoadingState<'a> {
    design: &'a RwLock<Design>,
    artboard_id: &'a ArtboardId,
    finished: bool,
}

impl Drop for LoadingState<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.design.write().abort_loading(self.artboard_id);
        }
    }
}

impl DesignLoader {
    pub(super) fn from_parts(
        design: Design,
        store: Arc<dyn ContentStore>,
        remote: Option<Arc<dyn RemoteContentSource>>,
        proxy: Arc<RenderingProxy>,
        pipeline: AssetPipeline,
        config: LoaderConfig,
    ) -> Self {
        Self {
            design_id: design.id().clone(),
            design: RwLock::new(design),
            store,
            remote,
            proxy,
            pipeline,
            config,
            readiness_loads: InFlight::new(),
            content_loads: InFlight::new(),
            wait_graph: WaitGraph::new(),
            session: Mutex::new(false),
        }
    }

    pub fn design_id(&self) -> &DesignId {
        &self.design_id
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Runs `f` against the current document model.
    pub fn with_design<R>(&self, f: impl FnOnce(&Design) -> R) -> R {
        f(&self.design.read())
    }

    // =========================================================================
    // Readiness
    // =========================================================================

    /// Makes an artboard and all artboards it depends on ready in the engine.
    ///
    /// Idempotent and safe to call concurrently: concurrent calls for the
    /// same artboard share one load.
    #[instrument(skip(self, cancel), fields(design = %self.design_id))]
    pub async fn ensure_artboard_ready(
        &self,
        artboard_id: &ArtboardId,
        cancel: &CancellationToken,
    ) -> Result<(), StageError> {
        self.ensure_ready(artboard_id.clone(), cancel).await
    }

    /// Makes several artboards ready, loading independent ones in parallel.
    #[instrument(skip(self, artboard_ids, cancel), fields(design = %self.design_id, count = artboard_ids.len()))]
    pub async fn ensure_artboards_ready(
        &self,
        artboard_ids: &[ArtboardId],
        cancel: &CancellationToken,
    ) -> Result<(), StageError> {
        let mut seen = HashSet::new();
        let loads = artboard_ids
            .iter()
            .filter(|id| seen.insert(*id))
            .map(|id| self.ensure_ready(id.clone(), cancel));
        try_join_all(loads).await?;
        Ok(())
    }

    /// Makes every artboard of a page ready.
    #[instrument(skip(self, cancel), fields(design = %self.design_id))]
    pub async fn ensure_page_ready(
        &self,
        page_id: &PageId,
        cancel: &CancellationToken,
    ) -> Result<(), StageError> {
        let artboard_ids = self.design.read().page_artboards(page_id)?;
        self.ensure_artboards_ready(&artboard_ids, cancel).await
    }

    pub fn is_artboard_ready(&self, artboard_id: &ArtboardId) -> bool {
        self.proxy.is_artboard_ready(artboard_id)
    }

    /// True while the engine holds the artboard (staged or ready).
    pub fn is_artboard_loaded(&self, artboard_id: &ArtboardId) -> bool {
        self.proxy.is_artboard_loaded(artboard_id)
    }

    pub fn readiness(&self, artboard_id: &ArtboardId) -> ArtboardReadiness {
        self.proxy.readiness(artboard_id)
    }

    /// True once the artboard's layer tree is in memory.
    pub fn is_content_loaded(&self, artboard_id: &ArtboardId) -> bool {
        self.design
            .read()
            .artboard(artboard_id)
            .is_some_and(|artboard| artboard.is_loaded())
    }

    fn ensure_ready<'a>(
        &'a self,
        artboard_id: ArtboardId,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), StageError>> {
        Box::pin(async move {
            loop {
                check(cancel)?;
                if self.proxy.is_artboard_ready(&artboard_id) {
                    return Ok(());
                }
                self.design.read().require_artboard(&artboard_id)?;

                match self.readiness_loads.register(artboard_id.clone()) {
                    Registration::Owner(guard) => {
                        // Finalized between the check above and registration
                        if self.proxy.is_artboard_ready(&artboard_id) {
                            guard.complete(Ok(()));
                            return Ok(());
                        }
                        let result = self.stage_artboard(&artboard_id, cancel).await;
                        if let Err(e) = &result {
                            if !e.is_cancelled() {
                                warn!(artboard = %artboard_id, error = %e, "Artboard staging failed");
                            }
                        }
                        guard.complete(result.clone());
                        return result;
                    }
                    Registration::Waiter(waiter) => {
                        debug!(artboard = %artboard_id, "Waiting for in-flight artboard load");
                        match wait_shared(waiter.wait(), cancel).await? {
                            Ok(result) => return result,
                            Err(Abandoned) => continue,
                        }
                    }
                }
            }
        })
    }

    /// Steps 1 to 5 for an artboard this task owns.
    async fn stage_artboard(
        &self,
        artboard_id: &ArtboardId,
        cancel: &CancellationToken,
    ) -> Result<(), StageError> {
        let content = self.ensure_content(artboard_id, cancel).await?;

        self.ensure_session(cancel).await?;
        check(cancel)?;
        let pending = if self.proxy.is_artboard_loaded(artboard_id) {
            self.proxy.get_artboard_dependencies(artboard_id).await?
        } else {
            let (component_id, page_id) = {
                let design = self.design.read();
                let artboard = design.require_artboard(artboard_id)?;
                (artboard.component_id.clone(), artboard.page_id.clone())
            };
            self.proxy
                .load_artboard(
                    artboard_id,
                    &content.handle,
                    component_id.as_ref(),
                    page_id.as_ref(),
                    &self.search_paths(),
                )
                .await?
        };

        let dependencies = resolver::resolve(&self.design.read(), artboard_id, &pending)?;
        if !dependencies.is_empty() {
            debug!(
                artboard = %artboard_id,
                dependencies = ?dependencies,
                "Staging component dependencies"
            );
            let loads = dependencies.into_iter().map(|dependency| async move {
                let _edge = self.wait_graph.enter(artboard_id, &dependency)?;
                self.ensure_ready(dependency, cancel).await
            });
            try_join_all(loads).await?;
        }

        check(cancel)?;
        let report = self.pipeline.stage_artboard_assets(&content, cancel).await?;

        check(cancel)?;
        self.proxy.finalize_artboard(artboard_id).await?;

        info!(
            artboard = %artboard_id,
            layers = content.layer_count(),
            images = report.images_loaded,
            fonts = report.fonts_loaded,
            "Artboard ready"
        );
        Ok(())
    }

    async fn ensure_session(&self, cancel: &CancellationToken) -> Result<(), StageError> {
        let mut created = self.session.lock().await;
        if !*created {
            check(cancel)?;
            self.proxy.create_design().await?;
            *created = true;
            debug!(design = %self.design_id, "Design session created");
        }
        Ok(())
    }

    fn search_paths(&self) -> AssetSearchPaths {
        AssetSearchPaths {
            bitmap_directory: Some(
                self.store
                    .bitmap_directory(&self.design_id)
                    .to_string_lossy()
                    .into_owned(),
            ),
            font_directory: self
                .config
                .font_directory
                .as_ref()
                .map(|dir| dir.to_string_lossy().into_owned()),
        }
    }

    // =========================================================================
    // Content
    // =========================================================================

    /// Loads an artboard's layer tree into memory.
    ///
    /// Reads the local store first; on a miss the content is fetched from the
    /// remote source and written to the store before it is read. Concurrent
    /// calls for the same artboard share one load.
    #[instrument(skip(self, cancel), fields(design = %self.design_id))]
    pub async fn ensure_content_loaded(
        &self,
        artboard_id: &ArtboardId,
        cancel: &CancellationToken,
    ) -> Result<Arc<ArtboardContent>, StageError> {
        self.ensure_content(artboard_id, cancel).await
    }

    async fn ensure_content(
        &self,
        artboard_id: &ArtboardId,
        cancel: &CancellationToken,
    ) -> Result<Arc<ArtboardContent>, StageError> {
        loop {
            check(cancel)?;
            {
                let design = self.design.read();
                let artboard = design.require_artboard(artboard_id)?;
                if let Some(content) = artboard.content.content() {
                    return Ok(Arc::clone(content));
                }
                if !artboard.available {
                    return Err(StageError::not_found(EntityKind::Content, artboard_id));
                }
            }

            match self.content_loads.register(artboard_id.clone()) {
                Registration::Owner(guard) => {
                    let result = self.load_content(artboard_id, cancel).await;
                    guard.complete(result.clone());
                    return result;
                }
                Registration::Waiter(waiter) => match wait_shared(waiter.wait(), cancel).await? {
                    Ok(result) => return result,
                    Err(Abandoned) => continue,
                },
            }
        }
    }

    async fn load_content(
        &self,
        artboard_id: &ArtboardId,
        cancel: &CancellationToken,
    ) -> Result<Arc<ArtboardContent>, StageError> {
        // Loaded between the check in ensure_content and registration
        if let Some(content) = self.design.write().begin_loading(artboard_id)? {
            return Ok(content);
        }
        let mut state = LoadingState {
            design: &self.design,
            artboard_id,
            finished: false,
        };

        let content = self.read_content(artboard_id, cancel).await?;
        self.design
            .write()
            .finish_loading(artboard_id, Arc::clone(&content));
        state.finished = true;

        debug!(
            artboard = %artboard_id,
            layers = content.layer_count(),
            "Artboard content loaded"
        );
        Ok(content)
    }

    async fn read_content(
        &self,
        artboard_id: &ArtboardId,
        cancel: &CancellationToken,
    ) -> Result<Arc<ArtboardContent>, StageError> {
        let cached =
            run_cancellable(cancel, self.store.has_content(&self.design_id, artboard_id)).await?;

        if !cached {
            let remote = self
                .remote
                .as_ref()
                .ok_or(StageError::NotConfigured(Collaborator::RemoteSource))?;

            info!(artboard = %artboard_id, "Content not cached, fetching from remote");
            let stream = run_cancellable(
                cancel,
                remote.fetch_artboard_content(&self.design_id, artboard_id),
            )
            .await?;
            run_cancellable(
                cancel,
                self.store
                    .write_content_stream(&self.design_id, artboard_id, stream),
            )
            .await?;
        }

        let document =
            run_cancellable(cancel, self.store.read_content(&self.design_id, artboard_id)).await?;
        let handle = self.store.content_handle(&self.design_id, artboard_id);

        Ok(Arc::new(ArtboardContent::from_document(
            artboard_id.clone(),
            handle,
            document,
        )))
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Applies a new version of the design manifest.
    ///
    /// Staged artboards that left the manifest are unloaded from the engine
    /// and staged artboards that moved to another page are moved there too.
    #[instrument(skip(self, manifest), fields(design = %self.design_id))]
    pub async fn update_manifest(&self, manifest: &Manifest) -> Result<ManifestDiff, StageError> {
        let diff = self.design.write().apply_manifest(manifest)?;

        for artboard_id in &diff.removed {
            if self.proxy.is_artboard_loaded(artboard_id) {
                self.proxy.unload_artboard(artboard_id).await?;
            }
        }
        for (artboard_id, page_id) in &diff.page_changes {
            if self.proxy.is_artboard_loaded(artboard_id) {
                self.proxy
                    .set_artboard_page(artboard_id, page_id.as_ref())
                    .await?;
            }
        }

        info!(
            added = diff.added.len(),
            removed = diff.removed.len(),
            moved = diff.page_changes.len(),
            "Manifest updated"
        );
        Ok(diff)
    }

    /// Moves an artboard to another page (or to none).
    pub async fn set_artboard_page(
        &self,
        artboard_id: &ArtboardId,
        page_id: Option<&PageId>,
    ) -> Result<(), StageError> {
        self.design
            .write()
            .set_artboard_page(artboard_id, page_id.cloned())?;
        if self.proxy.is_artboard_loaded(artboard_id) {
            self.proxy.set_artboard_page(artboard_id, page_id).await?;
        }
        Ok(())
    }

    /// Moves a staged artboard on its page.
    pub async fn set_artboard_offset(
        &self,
        artboard_id: &ArtboardId,
        offset: Offset,
    ) -> Result<(), StageError> {
        self.design.read().require_artboard(artboard_id)?;
        if !self.proxy.is_artboard_loaded(artboard_id) {
            return Err(StageError::not_found(EntityKind::StagedArtboard, artboard_id));
        }
        self.proxy.set_artboard_offset(artboard_id, offset).await
    }

    /// Releases an artboard from the engine and drops its layer tree.
    #[instrument(skip(self), fields(design = %self.design_id))]
    pub async fn unload_artboard(&self, artboard_id: &ArtboardId) -> Result<(), StageError> {
        self.design.read().require_artboard(artboard_id)?;
        if self.proxy.is_artboard_loaded(artboard_id) {
            self.proxy.unload_artboard(artboard_id).await?;
        }
        self.design.write().unload_content(artboard_id)?;
        Ok(())
    }

    /// Ends the design session.
    ///
    /// The engine releases the design, all readiness and pushed-asset
    /// bookkeeping is cleared and every layer tree is dropped. The next
    /// staging call starts a new session.
    #[instrument(skip(self), fields(design = %self.design_id))]
    pub async fn unload_design(&self) -> Result<(), StageError> {
        let mut created = self.session.lock().await;
        if *created {
            self.proxy.unload_design().await?;
            *created = false;
        }
        self.pipeline.reset();

        let mut design = self.design.write();
        for artboard_id in design.artboard_ids() {
            design.unload_content(&artboard_id)?;
        }
        info!("Design unloaded");
        Ok(())
    }

    /// Coalescing statistics.
    pub fn stats(&self) -> LoaderStats {
        LoaderStats {
            readiness: self.readiness_loads.stats(),
            content: self.content_loads.stats(),
            assets_loaded: self.pipeline.loaded_count(),
        }
    }
}

/// Waits for another task's result, under our own cancellation token.
///
/// A shared `Cancelled` means the owner's token fired, not ours, so it is
/// reported like an abandoned load and the caller retries.
async fn wait_shared<T, F>(
    wait: F,
    cancel: &CancellationToken,
) -> Result<Result<SharedResult<T>, Abandoned>, StageError>
where
    F: std::future::Future<Output = Result<SharedResult<T>, Abandoned>>,
{
    let shared = run_cancellable(cancel, async { Ok(wait.await) }).await?;
    Ok(match shared {
        Ok(Err(StageError::Cancelled)) => Err(Abandoned),
        other => other,
    })
}
