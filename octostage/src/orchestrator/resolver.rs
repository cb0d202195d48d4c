//! Component dependency resolution.
//!
//! The rendering engine is the source of truth for which components an
//! artboard still waits for. Resolution maps those component ids back to the
//! artboards defining them through the design's component index.

use crate::design::{ArtboardContent, Design};
use crate::error::StageError;
use crate::ids::{ArtboardId, ComponentId};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Components instantiated anywhere in an artboard's layer tree.
pub fn referenced_components(content: &ArtboardContent) -> BTreeSet<ComponentId> {
    content.referenced_components()
}

/// Maps pending component ids to the artboards that define them.
///
/// Duplicates collapse and the first-seen order is kept. A component that
/// no artboard defines makes the document incomplete and fails with
/// `Corrupt`.
pub fn resolve(
    design: &Design,
    requiring: &ArtboardId,
    pending: &[ComponentId],
) -> Result<Vec<ArtboardId>, StageError> {
    let local = design
        .loaded_content(requiring)
        .map(|content| referenced_components(&content));

    let mut seen = HashSet::new();
    let mut artboards = Vec::new();

    for component_id in pending {
        if let Some(local) = &local {
            if !local.contains(component_id) {
                debug!(
                    artboard = %requiring,
                    component = %component_id,
                    "Backend reports a dependency the content does not reference"
                );
            }
        }

        let artboard_id = design.artboard_by_component(component_id).ok_or_else(|| {
            StageError::Corrupt(format!(
                "artboard '{}' depends on component '{}' which no artboard defines",
                requiring, component_id
            ))
        })?;

        if seen.insert(artboard_id.clone()) {
            artboards.push(artboard_id.clone());
        }
    }

    Ok(artboards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{ArtboardEntry, Manifest};
    use crate::ids::DesignId;

    fn design() -> Design {
        let manifest = Manifest {
            pages: vec![],
            artboards: vec![
                ArtboardEntry::new("a"),
                ArtboardEntry::new("b").with_component("sym-b"),
                ArtboardEntry::new("c").with_component("sym-c"),
            ],
        };
        Design::new(DesignId::from("d"), &manifest).unwrap()
    }

    #[test]
    fn test_resolves_and_dedups_in_order() {
        let design = design();
        let pending = vec![
            ComponentId::from("sym-c"),
            ComponentId::from("sym-b"),
            ComponentId::from("sym-c"),
        ];

        let resolved = resolve(&design, &ArtboardId::from("a"), &pending).unwrap();
        assert_eq!(resolved, vec![ArtboardId::from("c"), ArtboardId::from("b")]);
    }

    #[test]
    fn test_missing_component_is_corrupt() {
        let design = design();
        let pending = vec![ComponentId::from("sym-b"), ComponentId::from("ghost")];

        let err = resolve(&design, &ArtboardId::from("a"), &pending).unwrap_err();
        assert!(matches!(err, StageError::Corrupt(ref msg) if msg.contains("ghost")));
    }

    #[test]
    fn test_no_pending_components() {
        let design = design();
        assert!(resolve(&design, &ArtboardId::from("a"), &[]).unwrap().is_empty());
    }
}
