//! CLI command implementations.
//!
//! - [`config`] - Configuration file management (path, init, show)
//! - [`manifest`] - List the pages and artboards of a cached design
//! - [`stage`] - Stage artboards into the rendering engine

pub mod config;
pub mod manifest;
pub mod stage;
