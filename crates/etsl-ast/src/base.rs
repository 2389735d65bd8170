//! Shared base types for the syntax tree: node handles and child lists.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Index of a node in its unit's `NodeArena`.
///
/// `NodeIndex::NONE` marks an absent optional child (no `else` branch, no
/// type annotation, ...). Indices are stable for the lifetime of the arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    pub const NONE: NodeIndex = NodeIndex(u32::MAX);

    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    #[must_use]
    pub const fn is_some(self) -> bool {
        self.0 != u32::MAX
    }

    /// `None` for `NodeIndex::NONE`.
    #[inline]
    #[must_use]
    pub const fn get(self) -> Option<NodeIndex> {
        if self.is_none() { None } else { Some(self) }
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl Default for NodeIndex {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Debug for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("NodeIndex(NONE)")
        } else {
            write!(f, "NodeIndex({})", self.0)
        }
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("none")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Ordered list of child nodes (statements, arguments, members, ...).
pub type NodeList = SmallVec<[NodeIndex; 4]>;
