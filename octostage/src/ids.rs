//! Opaque identifiers for design entities.
//!
//! Every entity in a design is addressed by a string id assigned by the
//! design service. The newtypes below keep the different id spaces apart so
//! a component id can never be passed where an artboard id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an id from any string-like value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Identifies a design session (the aggregate root).
    DesignId
);
define_id!(
    /// Identifies a page of a design.
    PageId
);
define_id!(
    /// Identifies an artboard of a design.
    ArtboardId
);
define_id!(
    /// Identifies a reusable component ("symbol") defined by an artboard.
    ComponentId
);
define_id!(
    /// Identifies a layer within an artboard's layer tree.
    LayerId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_conversion() {
        let id = ArtboardId::from("a-1");
        assert_eq!(id.as_str(), "a-1");
        assert_eq!(id.to_string(), "a-1");
        assert_eq!(id, ArtboardId::new(String::from("a-1")));
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = ComponentId::from("sym1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"sym1\"");

        let parsed: ComponentId = serde_json::from_str("\"sym2\"").unwrap();
        assert_eq!(parsed.as_str(), "sym2");
    }
}
