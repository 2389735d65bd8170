//! Lexical scopes.

use crate::binding::BindingId;
use etsl_ast::NodeIndex;
use indexmap::IndexMap;
use serde::Serialize;

/// Index of a scope in its unit's `ScopeTable`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub const NONE: ScopeId = ScopeId(u32::MAX);

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
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ScopeKind {
    Module,
    Class,
    Interface,
    Function,
    Block,
    Loop,
    Catch,
}

impl ScopeKind {
    /// Scopes whose bindings are locals of a function body (capturable).
    #[must_use]
    pub const fn is_local(self) -> bool {
        matches!(self, Self::Function | Self::Block | Self::Loop | Self::Catch)
    }
}

/// A node of the lexical scope tree.
#[derive(Clone, Debug, Serialize)]
pub struct Scope {
    pub kind: ScopeKind,
    /// Enclosing scope (`NONE` for the module scope).
    pub parent: ScopeId,
    /// Syntax node introducing this scope.
    pub node: NodeIndex,
    /// Names declared directly in this scope, in declaration order.
    pub bindings: IndexMap<String, BindingId>,
}

impl Scope {
    #[must_use]
    pub fn new(kind: ScopeKind, parent: ScopeId, node: NodeIndex) -> Self {
        Scope {
            kind,
            parent,
            node,
            bindings: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<BindingId> {
        self.bindings.get(name).copied()
    }
}
