//! Font resolution by PostScript name.
//!
//! Text layers reference fonts by PostScript name. Before a font can be
//! pushed to the rendering backend it has to be resolved to a font file on
//! disk. A miss is not an error: the asset pipeline logs it and the backend
//! falls back to its own default.

mod directory;

pub use directory::{DirectoryFontSource, FontSourceConfig};

use crate::content::BoxFuture;
use crate::error::StageError;
use std::path::PathBuf;

/// A font file resolved from a PostScript name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFont {
    pub font_filename: PathBuf,
    /// PostScript name of the face actually found (differs from the
    /// requested name when a fallback was used)
    pub resolved_postscript_name: String,
}

/// Resolves PostScript font names to font files.
pub trait FontSource: Send + Sync {
    /// Returns `Ok(None)` when neither the font nor any fallback is known.
    fn resolve_font_path(
        &self,
        postscript_name: &str,
    ) -> BoxFuture<'_, Result<Option<ResolvedFont>, StageError>>;
}
