//! Asset staging for artboards.
//!
//! Before an artboard can be finalized, every bitmap and font its layers
//! reference has to be available to the rendering engine.
//!
//! # Pipeline
//!
//! ```text
//! layer roots ──► collect_assets ──┬─► bitmap: local cache ─miss─► remote fetch ─► cache write ─┐
//!                                  │                                                             ├─► load-image
//!                                  │   (hit) ────────────────────────────────────────────────────┘
//!                                  └─► font: font source ─► load-font   (miss: warn + skip)
//! ```
//!
//! Distinct assets are staged concurrently, bounded by
//! `max_concurrent_assets`; the call returns only after every asset has
//! finished. Each asset key is pushed to the engine at most once per design
//! session: pushed keys are remembered, and concurrent stagings of the same
//! key share one in-flight push.

use crate::cancel::{check, run_cancellable};
use crate::coalesce::{InFlight, Registration};
use crate::content::{BoxFuture, ContentStore, RemoteContentSource};
use crate::design::{collect_assets, ArtboardContent, BitmapAssetDescriptor, FontDescriptor, Layer};
use crate::error::{Collaborator, EntityKind, StageError};
use crate::fonts::FontSource;
use crate::ids::{DesignId, LayerId};
use crate::render::RenderingProxy;
use dashmap::DashSet;
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default number of assets staged at the same time.
pub const DEFAULT_MAX_CONCURRENT_ASSETS: usize = 8;

/// Key under which an asset is pushed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetKey {
    /// Bitmap asset name
    Bitmap(String),
    /// Font PostScript name
    Font(String),
}

/// Asset pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingConfig {
    pub max_concurrent_assets: usize,
    /// Depth limit below each layer root (`None` is unbounded)
    pub asset_depth: Option<usize>,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            max_concurrent_assets: DEFAULT_MAX_CONCURRENT_ASSETS,
            asset_depth: None,
        }
    }
}

/// What one staging call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingReport {
    /// `load-image` commands issued by this call
    pub images_loaded: usize,
    /// `load-font` commands issued by this call
    pub fonts_loaded: usize,
    /// Bitmaps fetched from the remote source on a cache miss
    pub bitmaps_fetched: usize,
    /// Assets already pushed earlier or by a concurrent call
    pub reused: usize,
    /// Fonts no font file could be found for
    pub missing_fonts: Vec<String>,
}

impl StagingReport {
    fn record(&mut self, outcome: AssetOutcome) {
        match outcome {
            AssetOutcome::ImageLoaded { fetched } => {
                self.images_loaded += 1;
                if fetched {
                    self.bitmaps_fetched += 1;
                }
            }
            AssetOutcome::FontLoaded => self.fonts_loaded += 1,
            AssetOutcome::FontMissing(name) => self.missing_fonts.push(name),
            AssetOutcome::Reused => self.reused += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AssetOutcome {
    ImageLoaded { fetched: bool },
    FontLoaded,
    FontMissing(String),
    Reused,
}

#[derive(Clone, Copy)]
enum AssetRequest<'a> {
    Bitmap(&'a BitmapAssetDescriptor),
    Font(&'a FontDescriptor),
}

impl AssetRequest<'_> {
    fn key(&self) -> AssetKey {
        match self {
            Self::Bitmap(descriptor) => AssetKey::Bitmap(descriptor.name.clone()),
            Self::Font(descriptor) => AssetKey::Font(descriptor.postscript_name.clone()),
        }
    }
}

/// Stages bitmap and font assets of one design into the rendering engine.
pub struct AssetPipeline {
    design_id: DesignId,
    store: Arc<dyn ContentStore>,
    remote: Option<Arc<dyn RemoteContentSource>>,
    fonts: Option<Arc<dyn FontSource>>,
    proxy: Arc<RenderingProxy>,
    config: StagingConfig,
    loaded: DashSet<AssetKey>,
    in_flight: InFlight<AssetKey, Result<AssetOutcome, StageError>>,
}

impl AssetPipeline {
    pub fn new(
        design_id: DesignId,
        store: Arc<dyn ContentStore>,
        remote: Option<Arc<dyn RemoteContentSource>>,
        fonts: Option<Arc<dyn FontSource>>,
        proxy: Arc<RenderingProxy>,
        config: StagingConfig,
    ) -> Self {
        Self {
            design_id,
            store,
            remote,
            fonts,
            proxy,
            config,
            loaded: DashSet::new(),
            in_flight: InFlight::new(),
        }
    }

    pub fn config(&self) -> &StagingConfig {
        &self.config
    }

    /// True once the asset has been pushed in this design session.
    pub fn is_loaded(&self, key: &AssetKey) -> bool {
        self.loaded.contains(key)
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Forgets every pushed asset. Called when the design session ends.
    pub fn reset(&self) {
        self.loaded.clear();
    }

    /// Stages the assets of a whole artboard.
    pub async fn stage_artboard_assets(
        &self,
        content: &ArtboardContent,
        cancel: &CancellationToken,
    ) -> Result<StagingReport, StageError> {
        self.stage_layers(content.layers.iter(), cancel).await
    }

    /// Stages the assets below the given layer roots of an artboard.
    pub async fn stage_assets(
        &self,
        content: &ArtboardContent,
        roots: &[LayerId],
        cancel: &CancellationToken,
    ) -> Result<StagingReport, StageError> {
        let layers = roots
            .iter()
            .map(|id| {
                content
                    .find_layer(id)
                    .ok_or_else(|| StageError::not_found(EntityKind::Layer, id))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.stage_layers(layers, cancel).await
    }

    async fn stage_layers<'a>(
        &self,
        roots: impl IntoIterator<Item = &'a Layer>,
        cancel: &CancellationToken,
    ) -> Result<StagingReport, StageError> {
        check(cancel)?;

        let assets = collect_assets(roots, self.config.asset_depth);
        if assets.font_count() > 0 && self.fonts.is_none() {
            return Err(StageError::NotConfigured(Collaborator::FontSource));
        }
        if assets.is_empty() {
            return Ok(StagingReport::default());
        }

        let requests: Vec<AssetRequest<'_>> = assets
            .bitmaps()
            .map(AssetRequest::Bitmap)
            .chain(assets.fonts().map(AssetRequest::Font))
            .collect();

        // Boxed up front: a closure-mapped stream borrowing `cancel` is not
        // Send inside the loader's recursive future
        let pushes: Vec<BoxFuture<'_, Result<AssetOutcome, StageError>>> = requests
            .into_iter()
            .map(|request| Box::pin(self.stage_asset(request, cancel)) as BoxFuture<'_, _>)
            .collect();
        let outcomes: Vec<Result<AssetOutcome, StageError>> = futures::stream::iter(pushes)
            .buffer_unordered(self.config.max_concurrent_assets.max(1))
            .collect()
            .await;

        let mut report = StagingReport::default();
        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    // Prefer a real failure over cancellation fallout
                    if first_error.as_ref().map_or(true, StageError::is_cancelled) {
                        first_error = Some(e);
                    }
                }
            }
        }
        if let Some(error) = first_error {
            return Err(error);
        }

        debug!(
            design = %self.design_id,
            images = report.images_loaded,
            fonts = report.fonts_loaded,
            reused = report.reused,
            missing_fonts = report.missing_fonts.len(),
            "Assets staged"
        );
        Ok(report)
    }

    /// Stages one asset, at most once per key and session.
    async fn stage_asset(
        &self,
        request: AssetRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<AssetOutcome, StageError> {
        let key = request.key();

        loop {
            check(cancel)?;
            if self.loaded.contains(&key) {
                return Ok(AssetOutcome::Reused);
            }

            match self.in_flight.register(key.clone()) {
                Registration::Owner(guard) => {
                    // Pushed between the check above and registration
                    if self.loaded.contains(&key) {
                        guard.complete(Ok(AssetOutcome::Reused));
                        return Ok(AssetOutcome::Reused);
                    }

                    let result = self.push_asset(request, cancel).await;
                    if matches!(
                        result,
                        Ok(AssetOutcome::ImageLoaded { .. } | AssetOutcome::FontLoaded)
                    ) {
                        self.loaded.insert(key.clone());
                    }
                    guard.complete(result.clone());
                    return result;
                }
                Registration::Waiter(waiter) => {
                    let shared = run_cancellable(cancel, async { Ok(waiter.wait().await) }).await?;
                    match shared {
                        Ok(Ok(AssetOutcome::FontMissing(name))) => {
                            return Ok(AssetOutcome::FontMissing(name))
                        }
                        Ok(Ok(_)) => return Ok(AssetOutcome::Reused),
                        // The owner gave up; try again under our own token
                        Ok(Err(StageError::Cancelled)) | Err(_) => continue,
                        Ok(Err(e)) => return Err(e),
                    }
                }
            }
        }
    }

    async fn push_asset(
        &self,
        request: AssetRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<AssetOutcome, StageError> {
        match request {
            AssetRequest::Bitmap(descriptor) => self.push_bitmap(descriptor, cancel).await,
            AssetRequest::Font(descriptor) => self.push_font(descriptor, cancel).await,
        }
    }

    async fn push_bitmap(
        &self,
        descriptor: &BitmapAssetDescriptor,
        cancel: &CancellationToken,
    ) -> Result<AssetOutcome, StageError> {
        let name = descriptor.name.as_str();
        let resolution = run_cancellable(
            cancel,
            self.store.resolve_bitmap_asset(&self.design_id, name),
        )
        .await?;

        let (path, fetched) = if resolution.available {
            (resolution.filename, false)
        } else {
            let remote = self
                .remote
                .as_ref()
                .ok_or(StageError::NotConfigured(Collaborator::RemoteSource))?;

            debug!(design = %self.design_id, bitmap = name, "Bitmap not cached, fetching");
            let stream = run_cancellable(
                cancel,
                remote.fetch_bitmap_asset(&self.design_id, descriptor),
            )
            .await?;
            let path = run_cancellable(
                cancel,
                self.store.write_bitmap_stream(&self.design_id, name, stream),
            )
            .await?;
            (path, true)
        };

        check(cancel)?;
        self.proxy.load_image(name, &path).await?;
        Ok(AssetOutcome::ImageLoaded { fetched })
    }

    async fn push_font(
        &self,
        descriptor: &FontDescriptor,
        cancel: &CancellationToken,
    ) -> Result<AssetOutcome, StageError> {
        let name = descriptor.postscript_name.as_str();
        let source = self
            .fonts
            .as_ref()
            .ok_or(StageError::NotConfigured(Collaborator::FontSource))?;

        let resolved = run_cancellable(cancel, source.resolve_font_path(name)).await?;
        let Some(resolved) = resolved else {
            warn!(
                design = %self.design_id,
                font = name,
                layers = descriptor.layer_ids.len(),
                "Font not found, text will render without it"
            );
            return Ok(AssetOutcome::FontMissing(name.to_string()));
        };

        if resolved.resolved_postscript_name != name {
            debug!(
                font = name,
                substitute = %resolved.resolved_postscript_name,
                "Staging fallback font"
            );
        }

        check(cancel)?;
        self.proxy.load_font(name, &resolved.font_filename).await?;
        Ok(AssetOutcome::FontLoaded)
    }
}
