// Domain keys partitioning independent undo histories

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one independently undoable editing surface
///
/// Each key owns its own timeline. Undoing in one domain never touches
/// another domain's stacks. A new editable surface gets a new variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DomainKey {
    /// Geometry and feature edits on the map
    Map,
    /// Page layout edits (print/export composition)
    Layout,
}

impl DomainKey {
    /// Every domain, in a stable order
    pub const ALL: [DomainKey; 2] = [DomainKey::Map, DomainKey::Layout];

    pub fn as_str(self) -> &'static str {
        match self {
            DomainKey::Map => "map",
            DomainKey::Layout => "layout",
        }
    }
}

impl fmt::Display for DomainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(DomainKey::Map.to_string(), "map");
        assert_eq!(DomainKey::Layout.to_string(), "layout");
    }

    #[test]
    fn test_all_is_distinct() {
        assert_ne!(DomainKey::ALL[0], DomainKey::ALL[1]);
    }
}
