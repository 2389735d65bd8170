//! Per-unit type side table and the read-only view of other units.

use crate::types::TypeId;
use etsl_ast::{NodeArena, NodeIndex};
use etsl_binder::ScopeTable;
use etsl_common::{DeclRef, UnitId};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Types assigned to the nodes of one unit.
#[derive(Clone, Debug, Default, Serialize)]
pub struct NodeTypes {
    /// Node → checked type (`TypeId::ERROR` for failed nodes).
    pub types: FxHashMap<u32, TypeId>,
    /// Declaration node → type of the declared entity.
    pub decls: FxHashMap<u32, TypeId>,
    /// Member access node → member declaration it selected.
    pub members: FxHashMap<u32, DeclRef>,
}

impl NodeTypes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, node: NodeIndex) -> Option<TypeId> {
        self.types.get(&node.0).copied()
    }

    pub fn set(&mut self, node: NodeIndex, ty: TypeId) {
        self.types.insert(node.0, ty);
    }

    #[must_use]
    pub fn has_type(&self, node: NodeIndex) -> bool {
        self.types.contains_key(&node.0)
    }

    #[must_use]
    pub fn decl_type(&self, decl: NodeIndex) -> Option<TypeId> {
        self.decls.get(&decl.0).copied()
    }

    pub fn set_decl_type(&mut self, decl: NodeIndex, ty: TypeId) {
        self.decls.insert(decl.0, ty);
    }

    #[must_use]
    pub fn member_target(&self, node: NodeIndex) -> Option<DeclRef> {
        self.members.get(&node.0).copied()
    }

    pub fn set_member_target(&mut self, node: NodeIndex, decl: DeclRef) {
        self.members.insert(node.0, decl);
    }

    /// Forget the types of every node of a subtree so it is checked again.
    pub fn invalidate_subtree(&mut self, arena: &NodeArena, root: NodeIndex) {
        for node in arena.descendants(root) {
            self.types.remove(&node.0);
            self.decls.remove(&node.0);
            self.members.remove(&node.0);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Read-only access to the units of a program other than the one being
/// checked. Declarations of imported units are looked up through it.
pub trait ProgramView {
    fn arena(&self, unit: UnitId) -> Option<&NodeArena>;
    fn scopes(&self, unit: UnitId) -> Option<&ScopeTable>;
    fn types(&self, unit: UnitId) -> Option<&NodeTypes>;
    fn unit_name(&self, unit: UnitId) -> Option<&str>;
}

/// A program consisting of the checked unit only.
impl ProgramView for () {
    fn arena(&self, _unit: UnitId) -> Option<&NodeArena> {
        None
    }

    fn scopes(&self, _unit: UnitId) -> Option<&ScopeTable> {
        None
    }

    fn types(&self, _unit: UnitId) -> Option<&NodeTypes> {
        None
    }

    fn unit_name(&self, _unit: UnitId) -> Option<&str> {
        None
    }
}
