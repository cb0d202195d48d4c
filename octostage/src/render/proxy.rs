//! Typed proxy over a [`RenderBackend`] with per-artboard readiness.
//!
//! # Readiness
//!
//! ```text
//! NotStaged ──load-artboard──► PendingDependencies ──finalize-artboard──► Ready
//!     ▲                                 │                                   │
//!     └──── unload-design ──────────────┴────── unload-artboard ──► Unloaded ┘
//! ```
//!
//! Readiness only advances after the backend acknowledges a command, so a
//! failed `finalize-artboard` never exposes a partially ready artboard.

use super::backend::RenderBackend;
use super::command::{Offset, RenderCommand, RenderResponse};
use crate::content::ContentHandle;
use crate::error::StageError;
use crate::ids::{ArtboardId, ComponentId, DesignId, PageId};
use dashmap::DashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Staging state of an artboard in the rendering engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtboardReadiness {
    #[default]
    NotStaged,
    /// Registered with the engine, dependencies or assets still missing
    PendingDependencies,
    Ready,
    Unloaded,
}

impl ArtboardReadiness {
    /// True while the engine holds the artboard's content.
    pub fn is_loaded(self) -> bool {
        matches!(self, Self::PendingDependencies | Self::Ready)
    }
}

/// Paths the engine uses to look up assets referenced by an artboard.
#[derive(Debug, Clone, Default)]
pub struct AssetSearchPaths {
    pub bitmap_directory: Option<String>,
    pub font_directory: Option<String>,
}

/// Proxy for one design session in the rendering engine.
pub struct RenderingProxy {
    backend: Arc<dyn RenderBackend>,
    design_id: DesignId,
    readiness: DashMap<ArtboardId, ArtboardReadiness>,
}

impl RenderingProxy {
    pub fn new(backend: Arc<dyn RenderBackend>, design_id: DesignId) -> Self {
        Self {
            backend,
            design_id,
            readiness: DashMap::new(),
        }
    }

    pub fn design_id(&self) -> &DesignId {
        &self.design_id
    }

    pub fn readiness(&self, artboard_id: &ArtboardId) -> ArtboardReadiness {
        self.readiness
            .get(artboard_id)
            .map(|state| *state)
            .unwrap_or_default()
    }

    pub fn is_artboard_ready(&self, artboard_id: &ArtboardId) -> bool {
        self.readiness(artboard_id) == ArtboardReadiness::Ready
    }

    pub fn is_artboard_loaded(&self, artboard_id: &ArtboardId) -> bool {
        self.readiness(artboard_id).is_loaded()
    }

    /// Artboards the engine currently holds.
    pub fn loaded_artboards(&self) -> Vec<ArtboardId> {
        self.readiness
            .iter()
            .filter(|entry| entry.value().is_loaded())
            .map(|entry| entry.key().clone())
            .collect()
    }

    fn set_readiness(&self, artboard_id: &ArtboardId, state: ArtboardReadiness) {
        debug!(
            design = %self.design_id,
            artboard = %artboard_id,
            state = ?state,
            "Artboard readiness changed"
        );
        self.readiness.insert(artboard_id.clone(), state);
    }

    /// Sends a command and fails unless the engine acknowledges it.
    async fn send(&self, command: RenderCommand) -> Result<RenderResponse, StageError> {
        let name = command.name();
        debug!(design = %self.design_id, command = name, "Sending render command");

        let response = self.backend.execute(command).await?;
        if !response.ok {
            let message = response
                .error
                .clone()
                .unwrap_or_else(|| "backend did not report success".to_string());
            warn!(design = %self.design_id, command = name, error = %message, "Render command failed");
            return Err(StageError::remote(name, message));
        }
        Ok(response)
    }

    // =========================================================================
    // Commands
    // =========================================================================

    pub async fn create_design(&self) -> Result<(), StageError> {
        self.send(RenderCommand::CreateDesign {
            design_id: self.design_id.clone(),
        })
        .await?;
        Ok(())
    }

    /// Registers artboard content and returns the pending component ids.
    pub async fn load_artboard(
        &self,
        artboard_id: &ArtboardId,
        handle: &ContentHandle,
        component_id: Option<&ComponentId>,
        page_id: Option<&PageId>,
        search_paths: &AssetSearchPaths,
    ) -> Result<Vec<ComponentId>, StageError> {
        let response = self
            .send(RenderCommand::LoadArtboard {
                design_id: self.design_id.clone(),
                artboard_id: artboard_id.clone(),
                file: handle.to_wire(),
                symbol_id: component_id.cloned(),
                page_id: page_id.cloned(),
                bitmap_asset_directory: search_paths.bitmap_directory.clone(),
                font_directory: search_paths.font_directory.clone(),
            })
            .await?;

        self.set_readiness(artboard_id, ArtboardReadiness::PendingDependencies);
        Ok(response.dependency_ids())
    }

    /// Asks the engine which components of a staged artboard are still missing.
    pub async fn get_artboard_dependencies(
        &self,
        artboard_id: &ArtboardId,
    ) -> Result<Vec<ComponentId>, StageError> {
        let response = self
            .send(RenderCommand::GetArtboardDependencies {
                design_id: self.design_id.clone(),
                artboard_id: artboard_id.clone(),
            })
            .await?;
        Ok(response.dependency_ids())
    }

    pub async fn load_image(&self, image_name: &str, file_path: &Path) -> Result<(), StageError> {
        self.send(RenderCommand::LoadImage {
            design_id: self.design_id.clone(),
            image_name: image_name.to_string(),
            file_path: file_path.to_string_lossy().into_owned(),
        })
        .await?;
        Ok(())
    }

    pub async fn load_font(&self, postscript_name: &str, file_path: &Path) -> Result<(), StageError> {
        self.send(RenderCommand::LoadFont {
            design_id: self.design_id.clone(),
            postscript_name: postscript_name.to_string(),
            file_path: file_path.to_string_lossy().into_owned(),
        })
        .await?;
        Ok(())
    }

    pub async fn finalize_artboard(&self, artboard_id: &ArtboardId) -> Result<(), StageError> {
        self.send(RenderCommand::FinalizeArtboard {
            design_id: self.design_id.clone(),
            artboard_id: artboard_id.clone(),
        })
        .await?;
        self.set_readiness(artboard_id, ArtboardReadiness::Ready);
        Ok(())
    }

    pub async fn set_artboard_page(
        &self,
        artboard_id: &ArtboardId,
        page_id: Option<&PageId>,
    ) -> Result<(), StageError> {
        self.send(RenderCommand::SetArtboardPage {
            design_id: self.design_id.clone(),
            artboard_id: artboard_id.clone(),
            page_id: page_id.cloned(),
        })
        .await?;
        Ok(())
    }

    pub async fn set_artboard_offset(
        &self,
        artboard_id: &ArtboardId,
        offset: Offset,
    ) -> Result<(), StageError> {
        self.send(RenderCommand::SetArtboardOffset {
            design_id: self.design_id.clone(),
            artboard_id: artboard_id.clone(),
            offset,
        })
        .await?;
        Ok(())
    }

    pub async fn unload_artboard(&self, artboard_id: &ArtboardId) -> Result<(), StageError> {
        self.send(RenderCommand::UnloadArtboard {
            design_id: self.design_id.clone(),
            artboard_id: artboard_id.clone(),
        })
        .await?;
        self.set_readiness(artboard_id, ArtboardReadiness::Unloaded);
        Ok(())
    }

    /// Releases the whole design session. Readiness of every artboard resets.
    pub async fn unload_design(&self) -> Result<(), StageError> {
        self.send(RenderCommand::UnloadDesign {
            design_id: self.design_id.clone(),
        })
        .await?;
        self.readiness.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::BoxFuture;
    use parking_lot::Mutex;

    /// Backend answering every command with a scripted response.
    struct ScriptedBackend {
        commands: Mutex<Vec<RenderCommand>>,
        respond: Box<dyn Fn(&RenderCommand) -> RenderResponse + Send + Sync>,
    }

    impl ScriptedBackend {
        fn new(respond: impl Fn(&RenderCommand) -> RenderResponse + Send + Sync + 'static) -> Arc<Self> {
            Arc::new(Self {
                commands: Mutex::new(Vec::new()),
                respond: Box::new(respond),
            })
        }

        fn names(&self) -> Vec<&'static str> {
            self.commands.lock().iter().map(RenderCommand::name).collect()
        }
    }

    impl RenderBackend for ScriptedBackend {
        fn execute(&self, command: RenderCommand) -> BoxFuture<'_, Result<RenderResponse, StageError>> {
            let response = (self.respond)(&command);
            self.commands.lock().push(command);
            Box::pin(async move { Ok(response) })
        }
    }

    fn proxy(backend: Arc<ScriptedBackend>) -> RenderingProxy {
        RenderingProxy::new(backend, DesignId::from("d"))
    }

    #[tokio::test]
    async fn test_readiness_transitions() {
        let backend = ScriptedBackend::new(|command| match command {
            RenderCommand::LoadArtboard { .. } => {
                RenderResponse::ok().with_pending_symbols(vec![ComponentId::from("sym")])
            }
            _ => RenderResponse::ok(),
        });
        let proxy = proxy(backend.clone());
        let id = ArtboardId::from("a");

        assert_eq!(proxy.readiness(&id), ArtboardReadiness::NotStaged);

        let pending = proxy
            .load_artboard(
                &id,
                &ContentHandle::new("/c/a.json"),
                None,
                None,
                &AssetSearchPaths::default(),
            )
            .await
            .unwrap();
        assert_eq!(pending, vec![ComponentId::from("sym")]);
        assert!(proxy.is_artboard_loaded(&id));
        assert!(!proxy.is_artboard_ready(&id));

        proxy.finalize_artboard(&id).await.unwrap();
        assert!(proxy.is_artboard_ready(&id));
        assert_eq!(proxy.loaded_artboards(), vec![id.clone()]);

        proxy.unload_artboard(&id).await.unwrap();
        assert_eq!(proxy.readiness(&id), ArtboardReadiness::Unloaded);
        assert!(!proxy.is_artboard_loaded(&id));

        assert_eq!(
            backend.names(),
            vec!["load-artboard", "finalize-artboard", "unload-artboard"]
        );
    }

    #[tokio::test]
    async fn test_failed_finalize_leaves_artboard_unready() {
        let backend = ScriptedBackend::new(|command| match command {
            RenderCommand::FinalizeArtboard { .. } => RenderResponse::failure("missing symbol"),
            _ => RenderResponse::ok(),
        });
        let proxy = proxy(backend);
        let id = ArtboardId::from("a");

        proxy
            .load_artboard(
                &id,
                &ContentHandle::new("/c/a.json"),
                None,
                None,
                &AssetSearchPaths::default(),
            )
            .await
            .unwrap();

        let err = proxy.finalize_artboard(&id).await.unwrap_err();
        assert_eq!(err, StageError::remote("finalize-artboard", "missing symbol"));
        assert_eq!(proxy.readiness(&id), ArtboardReadiness::PendingDependencies);
    }

    #[tokio::test]
    async fn test_response_without_success_flag_fails() {
        let backend = ScriptedBackend::new(|_| RenderResponse::default());
        let proxy = proxy(backend);

        let err = proxy.create_design().await.unwrap_err();
        assert!(matches!(err, StageError::RemoteFailure { ref command, .. } if command == "create-design"));
    }

    #[tokio::test]
    async fn test_unload_design_resets_readiness() {
        let backend = ScriptedBackend::new(|_| RenderResponse::ok());
        let proxy = proxy(backend);
        let id = ArtboardId::from("a");

        proxy
            .load_artboard(
                &id,
                &ContentHandle::new("/c/a.json"),
                None,
                None,
                &AssetSearchPaths::default(),
            )
            .await
            .unwrap();
        proxy.finalize_artboard(&id).await.unwrap();
        proxy.unload_design().await.unwrap();

        assert_eq!(proxy.readiness(&id), ArtboardReadiness::NotStaged);
    }
}
