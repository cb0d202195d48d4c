//! Readiness orchestration.
//!
//! A [`DesignLoader`] owns one design session: the in-memory document model,
//! the rendering proxy and the asset pipeline. It turns "make this artboard
//! ready" into the ordered sequence of content loads, engine commands and
//! asset pushes, recursing into component dependencies.
//!
//! # Architecture
//!
//! ```text
//!                    ┌───────────────────────┐
//!  ensure_*_ready ──►│      DesignLoader     │
//!                    │ InFlight<ArtboardId>  │  one load per artboard
//!                    │ WaitGraph             │  cycle detection
//!                    └──┬────────┬────────┬──┘
//!                       │        │        │
//!            ┌──────────▼─┐  ┌───▼─────┐  ┌▼──────────────┐
//!            │ContentStore│  │Rendering│  │ AssetPipeline │
//!            │  + Remote  │  │  Proxy  │  │ bitmaps/fonts │
//!            └────────────┘  └─────────┘  └───────────────┘
//! ```

mod builder;
mod loader;
pub mod resolver;
mod wait_graph;

pub use builder::{DesignLoaderBuilder, LoaderConfig};
pub use loader::{DesignLoader, LoaderStats};
pub use wait_graph::{WaitEdge, WaitGraph};
