//! The per-unit scope/binding table.

use crate::binding::{Binding, BindingFlags, BindingId, BindingKind};
use crate::scope::{Scope, ScopeId, ScopeKind};
use etsl_ast::{NodeArena, NodeIndex};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::trace;

/// Result of declaring a name in a scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclareOutcome {
    /// A new binding was created.
    Declared(BindingId),
    /// The declaration was already bound (re-run over a processed subtree).
    Existing(BindingId),
    /// The name is already bound to another declaration in this scope.
    Duplicate(BindingId),
    /// The target scope does not exist.
    NoScope,
}

impl DeclareOutcome {
    #[must_use]
    pub const fn binding(self) -> Option<BindingId> {
        match self {
            Self::Declared(id) | Self::Existing(id) | Self::Duplicate(id) => Some(id),
            Self::NoScope => None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ScopeTable {
    pub scopes: Vec<Scope>,
    pub bindings: Vec<Binding>,
    /// Map from AST node (that creates a scope) to its ScopeId
    pub node_scope_ids: FxHashMap<u32, ScopeId>,
    /// Declaration node → binding it declares
    pub decl_bindings: FxHashMap<u32, BindingId>,
    /// Reference node (identifier or type reference) → resolved binding
    pub resolutions: FxHashMap<u32, BindingId>,
    /// Reference identifiers already diagnosed as unresolved
    pub unresolved: FxHashSet<u32>,
    /// Declarations already diagnosed as duplicates
    pub duplicates: FxHashSet<u32>,
    /// Module scope of the unit
    pub root: Option<ScopeId>,
}

impl ScopeTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        if id.is_none() {
            return None;
        }
        self.scopes.get(id.0 as usize)
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> Option<&mut Scope> {
        if id.is_none() {
            return None;
        }
        self.scopes.get_mut(id.0 as usize)
    }

    #[must_use]
    pub fn binding(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.get(id.0 as usize)
    }

    pub fn binding_mut(&mut self, id: BindingId) -> Option<&mut Binding> {
        self.bindings.get_mut(id.0 as usize)
    }

    /// Scope introduced by `node`, if any.
    #[must_use]
    pub fn scope_of_node(&self, node: NodeIndex) -> Option<ScopeId> {
        self.node_scope_ids.get(&node.0).copied()
    }

    /// Binding declared by `decl`, if any.
    #[must_use]
    pub fn binding_of_decl(&self, decl: NodeIndex) -> Option<BindingId> {
        self.decl_bindings.get(&decl.0).copied()
    }

    /// Binding a reference node resolved to.
    #[must_use]
    pub fn resolution(&self, node: NodeIndex) -> Option<BindingId> {
        self.resolutions.get(&node.0).copied()
    }

    /// Resolved binding data for a reference node.
    #[must_use]
    pub fn resolved_binding(&self, node: NodeIndex) -> Option<&Binding> {
        self.resolution(node).and_then(|id| self.binding(id))
    }

    pub fn set_resolution(&mut self, node: NodeIndex, binding: BindingId) {
        self.unresolved.remove(&node.0);
        self.resolutions.insert(node.0, binding);
    }

    /// Create the scope for `node`, or return the existing one.
    pub fn ensure_scope(&mut self, kind: ScopeKind, parent: ScopeId, node: NodeIndex) -> ScopeId {
        if let Some(existing) = self.scope_of_node(node) {
            return existing;
        }
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(kind, parent, node));
        self.node_scope_ids.insert(node.0, id);
        if kind == ScopeKind::Module && parent.is_none() && self.root.is_none() {
            self.root = Some(id);
        }
        trace!(scope = id.0, ?kind, node = node.0, "scope created");
        id
    }

    /// Declare `name` in `scope` for `decl`.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: BindingKind,
        flags: BindingFlags,
        decl: NodeIndex,
    ) -> DeclareOutcome {
        if let Some(existing) = self.binding_of_decl(decl) {
            return DeclareOutcome::Existing(existing);
        }
        let Some(scope_data) = self.scope(scope) else {
            return DeclareOutcome::NoScope;
        };
        if let Some(other) = scope_data.get(name) {
            // A binding re-pointed at this declaration (e.g. enum replaced by
            // its class) is reused rather than reported.
            if self.binding(other).is_some_and(|b| b.decl == decl) {
                self.decl_bindings.insert(decl.0, other);
                return DeclareOutcome::Existing(other);
            }
            return DeclareOutcome::Duplicate(other);
        }
        let id = BindingId(self.bindings.len() as u32);
        self.bindings.push(Binding {
            name: name.to_string(),
            kind,
            flags,
            decl,
            scope,
            origin: None,
        });
        if let Some(scope_data) = self.scope_mut(scope) {
            scope_data.bindings.insert(name.to_string(), id);
        }
        self.decl_bindings.insert(decl.0, id);
        trace!(binding = id.0, name, ?kind, scope = scope.0, "binding declared");
        DeclareOutcome::Declared(id)
    }

    /// Point an existing binding at a replacement declaration.
    ///
    /// Used when a synthetic declaration subsumes the original one (an enum
    /// replaced by its class); references resolved to the binding stay valid.
    pub fn repoint(
        &mut self,
        binding: BindingId,
        new_decl: NodeIndex,
        kind: BindingKind,
        add_flags: BindingFlags,
    ) {
        let Some(data) = self.binding_mut(binding) else {
            return;
        };
        let old_decl = data.decl;
        data.decl = new_decl;
        data.kind = kind;
        data.flags |= add_flags;
        self.decl_bindings.remove(&old_decl.0);
        self.decl_bindings.insert(new_decl.0, binding);
    }

    /// Erase a binding from its scope (the binding slot itself stays allocated).
    pub fn erase(&mut self, binding: BindingId) {
        let Some(data) = self.binding(binding).cloned() else {
            return;
        };
        if let Some(scope) = self.scope_mut(data.scope)
            && scope.get(&data.name) == Some(binding)
        {
            scope.bindings.shift_remove(&data.name);
        }
        self.decl_bindings.remove(&data.decl.0);
    }

    /// Look a name up in `scope` only.
    #[must_use]
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<BindingId> {
        self.scope(scope).and_then(|s| s.get(name))
    }

    /// Look a name up from `scope` outwards, accepting bindings matching `accept`.
    #[must_use]
    pub fn lookup(
        &self,
        scope: ScopeId,
        name: &str,
        accept: impl Fn(&Binding) -> bool,
    ) -> Option<BindingId> {
        let mut current = scope;
        while let Some(data) = self.scope(current) {
            if let Some(id) = data.get(name)
                && self.binding(id).is_some_and(&accept)
            {
                return Some(id);
            }
            current = data.parent;
        }
        None
    }

    /// Exported binding of the module scope.
    #[must_use]
    pub fn exported(&self, name: &str) -> Option<BindingId> {
        let root = self.root?;
        let id = self.lookup_local(root, name)?;
        self.binding(id)
            .filter(|b| b.flags.contains(BindingFlags::EXPORTED))
            .map(|_| id)
    }

    /// Innermost scope containing `node`, including a scope `node` introduces.
    #[must_use]
    pub fn scope_for(&self, arena: &NodeArena, node: NodeIndex) -> Option<ScopeId> {
        if let Some(scope) = self.scope_of_node(node) {
            return Some(scope);
        }
        self.declaring_scope(arena, node)
    }

    /// Innermost scope enclosing `node`, excluding a scope `node` introduces.
    #[must_use]
    pub fn declaring_scope(&self, arena: &NodeArena, node: NodeIndex) -> Option<ScopeId> {
        arena
            .ancestors(node)
            .find_map(|ancestor| self.scope_of_node(ancestor))
    }

    /// Whether `ancestor` is `scope` or one of its parents.
    #[must_use]
    pub fn is_ancestor_scope(&self, ancestor: ScopeId, scope: ScopeId) -> bool {
        let mut current = scope;
        while current.is_some() {
            if current == ancestor {
                return true;
            }
            current = self.scope(current).map_or(ScopeId::NONE, |s| s.parent);
        }
        false
    }

    /// Drop every scope, binding and resolution record attached to the subtree
    /// rooted at `root`, so it can be re-scoped elsewhere (e.g. after a body
    /// moved into a synthesized method).
    pub fn unbind_subtree(&mut self, arena: &NodeArena, root: NodeIndex) {
        for node in arena.descendants(root) {
            if let Some(binding) = self.binding_of_decl(node) {
                self.erase(binding);
            }
            self.node_scope_ids.remove(&node.0);
            self.resolutions.remove(&node.0);
            self.unresolved.remove(&node.0);
            self.duplicates.remove(&node.0);
        }
    }

    /// Every resolution whose binding lives in a scope that does not enclose
    /// the reference. Empty for a well-formed table.
    #[must_use]
    pub fn misplaced_resolutions(&self, arena: &NodeArena) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .resolutions
            .iter()
            .filter_map(|(&node, &binding)| {
                let node = NodeIndex(node);
                let binding = self.binding(binding)?;
                let scope = self.scope_for(arena, node)?;
                (!self.is_ancestor_scope(binding.scope, scope)).then_some(node)
            })
            .collect();
        out.sort();
        out
    }
}
