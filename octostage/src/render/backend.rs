//! Rendering backend trait.

use super::command::{RenderCommand, RenderResponse};
use crate::content::BoxFuture;
use crate::error::StageError;

/// Transport to a rendering engine.
///
/// Implementations deliver one command and return the engine's response.
/// `Err` is reserved for transport failures; a delivered command the engine
/// rejects comes back as a response with `ok == false`.
pub trait RenderBackend: Send + Sync {
    fn execute(&self, command: RenderCommand) -> BoxFuture<'_, Result<RenderResponse, StageError>>;
}
