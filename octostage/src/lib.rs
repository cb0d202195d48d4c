//! octostage - progressive loading of octopus designs into a rendering engine
//!
//! A design is described by a manifest of pages and artboards. Artboard
//! content (layer trees) is loaded on demand from a local cache, fetched from
//! a remote design service on a miss, and staged into a rendering engine
//! together with the components, bitmaps and fonts it depends on.
//!
//! # High-Level API
//!
//! ```ignore
//! use octostage::orchestrator::DesignLoader;
//! use tokio_util::sync::CancellationToken;
//!
//! let loader = DesignLoader::builder(design_id, manifest)
//!     .content_store(store)
//!     .render_backend(backend)
//!     .build()?;
//!
//! loader.ensure_artboard_ready(&artboard_id, &CancellationToken::new()).await?;
//! ```

pub mod cancel;
pub mod coalesce;
pub mod config;
pub mod content;
pub mod design;
pub mod error;
pub mod fonts;
pub mod ids;
pub mod logging;
pub mod orchestrator;
pub mod render;
pub mod staging;

pub use error::{Collaborator, EntityKind, StageError};
pub use ids::{ArtboardId, ComponentId, DesignId, LayerId, PageId};
pub use orchestrator::{DesignLoader, DesignLoaderBuilder, LoaderConfig};

/// Version of the octostage library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
