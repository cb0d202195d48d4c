//! Font source backed by a fontdb index of font directories.

use super::{FontSource, ResolvedFont};
use crate::content::BoxFuture;
use crate::error::StageError;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Where fonts are discovered.
#[derive(Debug, Clone, Default)]
pub struct FontSourceConfig {
    /// Directory scanned recursively for font files
    pub directory: Option<PathBuf>,
    /// Also index the fonts installed on the system
    pub system_fonts: bool,
    /// PostScript names tried in order when a font is missing
    pub fallbacks: Vec<String>,
}

/// Font source that indexes font files by PostScript name.
///
/// The index is built once at construction; faces loaded from memory have no
/// file to hand to the backend and are skipped.
#[derive(Debug, Clone, Default)]
pub struct DirectoryFontSource {
    faces: HashMap<String, PathBuf>,
    fallbacks: Vec<String>,
}

impl DirectoryFontSource {
    /// Scans the configured locations.
    ///
    /// Scanning touches the file system synchronously; call it before the
    /// loader starts staging.
    pub fn new(config: &FontSourceConfig) -> Self {
        let mut db = fontdb::Database::new();
        if config.system_fonts {
            db.load_system_fonts();
        }
        if let Some(directory) = &config.directory {
            db.load_fonts_dir(directory);
        }

        let source = Self::from_database(&db, config.fallbacks.clone());
        info!(
            faces = source.faces.len(),
            directory = ?config.directory,
            system_fonts = config.system_fonts,
            "Font index built"
        );
        source
    }

    /// Builds the index from an already populated fontdb database.
    pub fn from_database(db: &fontdb::Database, fallbacks: Vec<String>) -> Self {
        let mut faces = HashMap::new();
        for face in db.faces() {
            let path = match &face.source {
                fontdb::Source::File(path) => path.clone(),
                fontdb::Source::SharedFile(path, _) => path.clone(),
                _ => continue,
            };
            // First face wins when several files carry the same name
            faces.entry(face.post_script_name.clone()).or_insert(path);
        }
        Self { faces, fallbacks }
    }

    /// Builds the index from explicit name/path pairs.
    pub fn from_entries<I, S>(entries: I, fallbacks: Vec<String>) -> Self
    where
        I: IntoIterator<Item = (S, PathBuf)>,
        S: Into<String>,
    {
        Self {
            faces: entries
                .into_iter()
                .map(|(name, path)| (name.into(), path))
                .collect(),
            fallbacks,
        }
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    fn lookup(&self, postscript_name: &str) -> Option<ResolvedFont> {
        if let Some(path) = self.faces.get(postscript_name) {
            return Some(ResolvedFont {
                font_filename: path.clone(),
                resolved_postscript_name: postscript_name.to_string(),
            });
        }

        self.fallbacks.iter().find_map(|fallback| {
            self.faces.get(fallback).map(|path| {
                debug!(
                    requested = postscript_name,
                    fallback = fallback.as_str(),
                    "Using fallback font"
                );
                ResolvedFont {
                    font_filename: path.clone(),
                    resolved_postscript_name: fallback.clone(),
                }
            })
        })
    }
}

impl FontSource for DirectoryFontSource {
    fn resolve_font_path(
        &self,
        postscript_name: &str,
    ) -> BoxFuture<'_, Result<Option<ResolvedFont>, StageError>> {
        let resolved = self.lookup(postscript_name);
        Box::pin(async move { Ok(resolved) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source() -> DirectoryFontSource {
        DirectoryFontSource::from_entries(
            [
                ("Inter-Regular", PathBuf::from("/fonts/Inter-Regular.ttf")),
                ("Roboto-Bold", PathBuf::from("/fonts/Roboto-Bold.ttf")),
            ],
            vec!["Missing-Fallback".to_string(), "Inter-Regular".to_string()],
        )
    }

    #[tokio::test]
    async fn test_resolves_exact_name() {
        let resolved = source()
            .resolve_font_path("Roboto-Bold")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.font_filename, PathBuf::from("/fonts/Roboto-Bold.ttf"));
        assert_eq!(resolved.resolved_postscript_name, "Roboto-Bold");
    }

    #[tokio::test]
    async fn test_falls_back_in_order() {
        let resolved = source()
            .resolve_font_path("Helvetica")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.resolved_postscript_name, "Inter-Regular");
    }

    #[tokio::test]
    async fn test_miss_without_fallbacks() {
        let source = DirectoryFontSource::from_entries(
            [("Inter-Regular", PathBuf::from("/fonts/Inter.ttf"))],
            Vec::new(),
        );
        assert!(source.resolve_font_path("Nope").await.unwrap().is_none());
    }

    #[test]
    fn test_empty_directory_has_no_faces() {
        let temp_dir = TempDir::new().unwrap();
        let source = DirectoryFontSource::new(&FontSourceConfig {
            directory: Some(temp_dir.path().to_path_buf()),
            system_fonts: false,
            fallbacks: Vec::new(),
        });
        assert_eq!(source.face_count(), 0);
    }
}
