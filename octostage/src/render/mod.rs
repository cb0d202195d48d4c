//! Rendering backend boundary.
//!
//! The rendering engine runs out of process and is driven by structured
//! request/response commands. [`RenderingProxy`] wraps a [`RenderBackend`]
//! transport with typed command helpers and tracks per-artboard readiness;
//! [`ProcessBackend`] is the transport to an engine child process.

mod backend;
mod command;
mod process;
mod proxy;

pub use backend::RenderBackend;
pub use command::{Offset, RenderCommand, RenderResponse};
pub use process::{ProcessBackend, ProcessBackendConfig, DEFAULT_REQUEST_TIMEOUT};
pub use proxy::{ArtboardReadiness, AssetSearchPaths, RenderingProxy};
