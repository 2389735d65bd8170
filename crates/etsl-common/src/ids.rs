//! Identity of compilation units and cross-unit declaration references.

use serde::{Deserialize, Serialize};

/// Index of a compiled unit inside a `Program`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl UnitId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Weak reference to a declaration node, possibly living in another unit.
///
/// The node index is stored as a raw `u32` so that this crate stays free of
/// the syntax tree types; `etsl_ast::NodeIndex` converts to and from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclRef {
    pub unit: UnitId,
    pub node: u32,
}

impl DeclRef {
    #[inline]
    #[must_use]
    pub const fn new(unit: UnitId, node: u32) -> Self {
        Self { unit, node }
    }
}
