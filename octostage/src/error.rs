//! Error types for design loading and staging.
//!
//! Every fallible operation in the crate returns [`StageError`]. The error is
//! `Clone` because a single in-flight load broadcasts its result to every
//! coalesced waiter.

use crate::ids::ArtboardId;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A collaborator the loader depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collaborator {
    /// Local content store (artboard documents and bitmap files)
    ContentStore,
    /// Remote content source used on local cache misses
    RemoteSource,
    /// Font source used to resolve PostScript names to files
    FontSource,
    /// Out-of-process rendering engine
    RenderBackend,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ContentStore => "content store",
            Self::RemoteSource => "remote content source",
            Self::FontSource => "font source",
            Self::RenderBackend => "rendering backend",
        };
        f.write_str(name)
    }
}

/// Kind of entity an id failed to resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Artboard,
    Page,
    Component,
    Layer,
    /// An artboard that is known to the design but not staged in the backend
    StagedArtboard,
    /// Artboard content that the design service marks as unavailable
    Content,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Artboard => "artboard",
            Self::Page => "page",
            Self::Component => "component",
            Self::Layer => "layer",
            Self::StagedArtboard => "staged artboard",
            Self::Content => "artboard content",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while loading and staging a design.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StageError {
    /// A required collaborator was never supplied
    #[error("{0} is not configured")]
    NotConfigured(Collaborator),

    /// An id has no referent
    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    /// A collaborator command returned failure
    #[error("{command} failed: {message}")]
    RemoteFailure { command: String, message: String },

    /// The cancellation token fired
    #[error("operation cancelled")]
    Cancelled,

    /// The design document is malformed or incomplete
    #[error("corrupt design: {0}")]
    Corrupt(String),

    /// Component dependencies form a cycle
    #[error("component dependency cycle: {}", format_chain(.0))]
    DependencyCycle(Vec<ArtboardId>),

    /// Local cache I/O failed
    #[error("I/O error at {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

impl StageError {
    /// Creates a `NotFound` error.
    pub fn not_found(kind: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Creates a `RemoteFailure` error.
    pub fn remote(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteFailure {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Creates an `Io` error from a path and an `std::io::Error`.
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: error.to_string(),
        }
    }

    /// Returns true if this error is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

fn format_chain(chain: &[ArtboardId]) -> String {
    chain
        .iter()
        .map(ArtboardId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
