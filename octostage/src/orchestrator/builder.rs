//! Builder for [`DesignLoader`].
//!
//! # Example
//!
//! ```ignore
//! use octostage::orchestrator::DesignLoader;
//!
//! let loader = DesignLoader::builder(design_id, manifest)
//!     .content_store(store)
//!     .remote_source(remote)
//!     .font_source(fonts)
//!     .render_backend(backend)
//!     .build()?;
//! ```

use super::loader::DesignLoader;
use crate::content::{ContentStore, RemoteContentSource};
use crate::design::{Design, Manifest};
use crate::error::{Collaborator, StageError};
use crate::fonts::FontSource;
use crate::ids::DesignId;
use crate::render::{RenderBackend, RenderingProxy};
use crate::staging::{AssetPipeline, StagingConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Loader tuning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoaderConfig {
    pub staging: StagingConfig,
    /// Font directory announced to the engine with each artboard
    pub font_directory: Option<PathBuf>,
}

/// Collects the collaborators of a [`DesignLoader`].
///
/// The content store and the render backend are required. Without a remote
/// source every artboard must already be in the store; without a font
/// source artboards that use fonts cannot be staged.
pub struct DesignLoaderBuilder {
    design_id: DesignId,
    manifest: Manifest,
    store: Option<Arc<dyn ContentStore>>,
    remote: Option<Arc<dyn RemoteContentSource>>,
    fonts: Option<Arc<dyn FontSource>>,
    backend: Option<Arc<dyn RenderBackend>>,
    config: LoaderConfig,
}

impl DesignLoader {
    pub fn builder(design_id: DesignId, manifest: Manifest) -> DesignLoaderBuilder {
        DesignLoaderBuilder {
            design_id,
            manifest,
            store: None,
            remote: None,
            fonts: None,
            backend: None,
            config: LoaderConfig::default(),
        }
    }
}

impl DesignLoaderBuilder {
    pub fn content_store(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn remote_source(mut self, remote: Arc<dyn RemoteContentSource>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn font_source(mut self, fonts: Arc<dyn FontSource>) -> Self {
        self.fonts = Some(fonts);
        self
    }

    pub fn render_backend(mut self, backend: Arc<dyn RenderBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the loader.
    ///
    /// Fails with `NotConfigured` when a required collaborator is missing and
    /// with `Corrupt` when the manifest is inconsistent.
    pub fn build(self) -> Result<DesignLoader, StageError> {
        let store = self
            .store
            .ok_or(StageError::NotConfigured(Collaborator::ContentStore))?;
        let backend = self
            .backend
            .ok_or(StageError::NotConfigured(Collaborator::RenderBackend))?;

        let design = Design::new(self.design_id.clone(), &self.manifest)?;
        let proxy = Arc::new(RenderingProxy::new(backend, self.design_id.clone()));
        let pipeline = AssetPipeline::new(
            self.design_id.clone(),
            Arc::clone(&store),
            self.remote.clone(),
            self.fonts,
            Arc::clone(&proxy),
            self.config.staging.clone(),
        );

        debug!(
            design = %self.design_id,
            artboards = self.manifest.artboards.len(),
            pages = self.manifest.pages.len(),
            remote = self.remote.is_some(),
            "Design loader built"
        );

        Ok(DesignLoader::from_parts(
            design,
            store,
            self.remote,
            proxy,
            pipeline,
            self.config,
        ))
    }
}
