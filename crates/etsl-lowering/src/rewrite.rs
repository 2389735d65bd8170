//! Node-rewrite utility layer.
//!
//! `UnitCx` is the split borrow of a `CompilationContext` that passes use to
//! rewrite one unit: the unit mutably, every other unit read-only, and the
//! shared interner, diagnostics and name generator. On top of the arena it
//! offers the four primitives passes are built from:
//!
//! - allocate and attach (`alloc`, `factory`, `replace_in_parent`, `insert`)
//! - re-scope a fresh subtree (`rescope`)
//! - re-resolve a fresh subtree (`reresolve`)
//! - re-check a fresh subtree (`recheck`)
//!
//! Each primitive is idempotent on already processed subtrees, so a pass can
//! call them on a subtree that mixes fresh and moved nodes.

use crate::context::NameGenerator;
use crate::phase::PhaseId;
use crate::program::{OtherUnits, ProgramUnit};
use etsl_ast::{
    ArrayTypeNode, FunctionTypeNode, NodeArena, NodeFactory, NodeIndex, NodeKind, NodeList,
    ParameterDecl, TransformHost, TypeReference, UnionTypeNode,
};
use etsl_binder::{Binding, BindingId, Resolver, ScopeBuilder, ScopeId};
use etsl_checker::{CheckedUnit, Checker, NodeTypes, TypeData, TypeId, TypeInterner};
use etsl_common::{DeclRef, DiagnosticBag, Span, UnitId};
use tracing::{trace, warn};

pub struct UnitCx<'a> {
    pub unit: &'a mut ProgramUnit,
    pub others: OtherUnits<'a>,
    pub interner: &'a mut TypeInterner,
    pub diagnostics: &'a mut DiagnosticBag,
    pub names: &'a mut NameGenerator,
    /// Phase recorded in the node history; `None` outside a pipeline run.
    pub phase: Option<PhaseId>,
    record_history: bool,
}

impl<'a> UnitCx<'a> {
    pub(crate) fn new(
        unit: &'a mut ProgramUnit,
        others: OtherUnits<'a>,
        interner: &'a mut TypeInterner,
        diagnostics: &'a mut DiagnosticBag,
        names: &'a mut NameGenerator,
        phase: Option<PhaseId>,
        record_history: bool,
    ) -> Self {
        UnitCx {
            unit,
            others,
            interner,
            diagnostics,
            names,
            phase,
            record_history,
        }
    }

    #[must_use]
    pub fn id(&self) -> UnitId {
        self.unit.id
    }

    #[must_use]
    pub fn root(&self) -> NodeIndex {
        self.unit.root
    }

    #[must_use]
    pub fn file(&self) -> &str {
        &self.unit.name
    }

    #[must_use]
    pub fn arena(&self) -> &NodeArena {
        &self.unit.arena
    }

    pub fn arena_mut(&mut self) -> &mut NodeArena {
        &mut self.unit.arena
    }

    #[must_use]
    pub fn decl_ref(&self, node: NodeIndex) -> DeclRef {
        DeclRef::new(self.unit.id, node.0)
    }

    /// Arena of the unit owning `decl` (this unit or an imported one).
    #[must_use]
    pub fn arena_of(&self, unit: UnitId) -> Option<&NodeArena> {
        if unit == self.unit.id {
            Some(&self.unit.arena)
        } else {
            self.others.get(unit).map(|u| &u.arena)
        }
    }

    // =========================================================================
    // Allocate and attach
    // =========================================================================

    /// Factory for synthetic nodes carrying `span`.
    pub fn factory(&mut self, span: Span) -> NodeFactory<'_> {
        NodeFactory::new(&mut self.unit.arena, span)
    }

    /// Allocate a synthetic node with the span of `like`.
    pub fn alloc(&mut self, kind: NodeKind, like: NodeIndex) -> NodeIndex {
        let span = self.unit.arena.span(like);
        self.unit.arena.add_synthetic(kind, span)
    }

    pub fn attach(&mut self, parent: NodeIndex, child: NodeIndex) {
        self.unit.arena.set_parent(child, parent);
    }

    /// Write `new` into the parent slot of `old` and record the replacement.
    pub fn replace_in_parent(&mut self, old: NodeIndex, new: NodeIndex) -> bool {
        let parent = self.unit.arena.parent(old);
        if parent.is_none() {
            warn!(old = old.0, "replacement of a detached node ignored");
            return false;
        }
        self.replace_child(parent, old, new)
    }

    /// Write `new` into the slot of `parent` holding `old`, even when `old`
    /// was already re-parented into the replacement.
    pub fn replace_child(&mut self, parent: NodeIndex, old: NodeIndex, new: NodeIndex) -> bool {
        self.record_replace(parent, old, new);
        self.unit.arena.replace_child(parent, old, new)
    }

    /// Insert `child` into the statement/member list of `parent`.
    pub fn insert(&mut self, parent: NodeIndex, position: usize, child: NodeIndex) -> bool {
        if !self.unit.arena.insert_child(parent, position, child) {
            return false;
        }
        if self.record_history
            && let Some(phase) = self.phase
        {
            self.unit.history.record_insert(child, phase);
        }
        true
    }

    pub fn append(&mut self, parent: NodeIndex, child: NodeIndex) -> bool {
        self.insert(parent, usize::MAX, child)
    }

    /// Remove `child` from the statement/member list of `parent`.
    pub fn remove(&mut self, parent: NodeIndex, child: NodeIndex) -> bool {
        if !self.unit.arena.remove_child(parent, child) {
            return false;
        }
        if self.record_history
            && let Some(phase) = self.phase
            && let Err(err) = self.unit.history.record_remove(parent, child, phase)
        {
            warn!(%err, "history not recorded");
        }
        true
    }

    fn record_replace(&mut self, parent: NodeIndex, old: NodeIndex, new: NodeIndex) {
        if !self.record_history {
            return;
        }
        let Some(phase) = self.phase else {
            return;
        };
        if let Err(err) = self.unit.history.record_replace(parent, old, new, phase) {
            warn!(%err, old = old.0, new = new.0, "history not recorded");
        }
    }

    pub fn clone_subtree(&mut self, node: NodeIndex) -> NodeIndex {
        self.unit.arena.clone_subtree(node)
    }

    pub fn fresh_name(&mut self, prefix: &str) -> String {
        self.names.fresh(prefix)
    }

    pub fn report(&mut self, node: NodeIndex, code: u32, args: &[&str]) {
        let span = self.unit.arena.span(node);
        self.diagnostics.report(&self.unit.name, span, code, args);
    }

    // =========================================================================
    // Re-scope / re-resolve / re-check
    // =========================================================================

    /// Innermost scope enclosing `node` (excluding a scope `node` introduces),
    /// falling back to the module scope.
    #[must_use]
    pub fn enclosing_scope(&self, node: NodeIndex) -> ScopeId {
        self.unit
            .scopes
            .declaring_scope(&self.unit.arena, node)
            .or(self.unit.scopes.root)
            .unwrap_or(ScopeId::NONE)
    }

    /// Build scopes and declare bindings for a fresh subtree.
    pub fn rescope(&mut self, subtree: NodeIndex, enclosing: ScopeId) {
        let unit = &mut *self.unit;
        ScopeBuilder::new(&unit.arena, &mut unit.scopes, self.diagnostics, &unit.name)
            .build_subtree(subtree, enclosing);
        trace!(subtree = subtree.0, scope = enclosing.0, "rescoped");
    }

    /// Resolve the references of a fresh or moved subtree.
    pub fn reresolve(&mut self, subtree: NodeIndex) -> u32 {
        let unit = &mut *self.unit;
        Resolver::new(&unit.arena, &mut unit.scopes, self.diagnostics, &unit.name)
            .resolve_subtree(subtree)
    }

    /// `rescope` in the enclosing scope, then `reresolve`.
    pub fn rebind(&mut self, subtree: NodeIndex) {
        let scope = self.enclosing_scope(subtree);
        self.rescope(subtree, scope);
        self.reresolve(subtree);
    }

    /// Type the whole unit, registering its classes first.
    pub fn check_unit(&mut self) {
        let unit = &mut *self.unit;
        let root = unit.root;
        let checked = CheckedUnit {
            id: unit.id,
            file: &unit.name,
            arena: &unit.arena,
            scopes: &unit.scopes,
        };
        Checker::new(
            checked,
            &mut unit.types,
            &self.others,
            self.interner,
            self.diagnostics,
        )
        .check_unit(root);
    }

    /// Type every untyped node of a subtree. `None` when the subtree root
    /// failed to check (the checker reported why).
    pub fn recheck(&mut self, subtree: NodeIndex) -> Option<TypeId> {
        let unit = &mut *self.unit;
        let checked = CheckedUnit {
            id: unit.id,
            file: &unit.name,
            arena: &unit.arena,
            scopes: &unit.scopes,
        };
        let mut checker = Checker::new(
            checked,
            &mut unit.types,
            &self.others,
            self.interner,
            self.diagnostics,
        );
        checker.check_subtree(subtree);
        let ty = unit.types.get(subtree)?;
        (!ty.is_error()).then_some(ty)
    }

    /// Forget the types of a subtree so `recheck` computes them again.
    pub fn invalidate(&mut self, subtree: NodeIndex) {
        let unit = &mut *self.unit;
        unit.types.invalidate_subtree(&unit.arena, subtree);
    }

    /// Forget the type of one node, keeping its children's.
    pub fn forget_type(&mut self, node: NodeIndex) {
        self.unit.types.types.remove(&node.0);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    #[must_use]
    pub fn type_of(&self, node: NodeIndex) -> Option<TypeId> {
        self.unit.types.get(node)
    }

    #[must_use]
    pub fn resolved_binding(&self, node: NodeIndex) -> Option<&Binding> {
        self.unit.scopes.resolved_binding(node)
    }

    #[must_use]
    pub fn binding_of_decl(&self, decl: NodeIndex) -> Option<BindingId> {
        self.unit.scopes.binding_of_decl(decl)
    }

    // =========================================================================
    // Type annotations
    // =========================================================================

    /// Synthesize an annotation node denoting `ty`. Every created node is
    /// pre-typed, so the checker never re-resolves synthesized names.
    pub fn type_node(&mut self, ty: TypeId, span: Span) -> NodeIndex {
        let unit = &mut *self.unit;
        build_type_node(&mut unit.arena, &mut unit.types, self.interner, ty, span)
    }
}

impl TransformHost for UnitCx<'_> {
    fn arena(&self) -> &NodeArena {
        &self.unit.arena
    }

    fn arena_mut(&mut self) -> &mut NodeArena {
        &mut self.unit.arena
    }

    fn on_replace(&mut self, old: NodeIndex, new: NodeIndex) {
        let parent = self.unit.arena.parent(old);
        if parent.is_some() {
            self.record_replace(parent, old, new);
        }
    }
}

fn build_type_node(
    arena: &mut NodeArena,
    types: &mut NodeTypes,
    interner: &TypeInterner,
    ty: TypeId,
    span: Span,
) -> NodeIndex {
    let named = |arena: &mut NodeArena, types: &mut NodeTypes, name: &str, args: &[TypeId]| {
        let type_args: NodeList = args
            .iter()
            .map(|&arg| build_type_node(arena, types, interner, arg, span))
            .collect();
        arena.add_synthetic(
            NodeKind::TypeReference(TypeReference {
                name: name.to_string(),
                type_args,
            }),
            span,
        )
    };

    let node = if let Some(kind) = ty.as_primitive() {
        arena.add_synthetic(NodeKind::PrimitiveType(kind), span)
    } else {
        match interner.lookup(ty) {
            Some(TypeData::Class(class) | TypeData::Interface(class)) => {
                named(arena, types, &class.name, &class.args)
            }
            Some(TypeData::Enum(_, name)) => named(arena, types, name, &[]),
            Some(TypeData::TypeParameter(param)) => named(arena, types, &param.name, &[]),
            Some(TypeData::Builtin(kind, args)) => named(arena, types, kind.name(), args),
            Some(TypeData::Array(element)) => {
                let element = build_type_node(arena, types, interner, *element, span);
                arena.add_synthetic(
                    NodeKind::ArrayType(ArrayTypeNode { element }),
                    span,
                )
            }
            Some(TypeData::Union(members)) => {
                let members: NodeList = members
                    .iter()
                    .map(|&member| build_type_node(arena, types, interner, member, span))
                    .collect();
                arena.add_synthetic(
                    NodeKind::UnionType(UnionTypeNode { types: members }),
                    span,
                )
            }
            Some(TypeData::Function(shape)) => {
                let mut params = NodeList::new();
                for (index, param) in shape.params.iter().enumerate() {
                    let annotation = build_type_node(arena, types, interner, param.ty, span);
                    let decl = arena.add_synthetic(
                        NodeKind::Parameter(ParameterDecl {
                            name: format!("p{index}"),
                            type_annotation: annotation,
                            init: NodeIndex::NONE,
                            optional: param.optional,
                            rest: param.rest,
                        }),
                        span,
                    );
                    types.set_decl_type(decl, param.ty);
                    params.push(decl);
                }
                let return_type = build_type_node(arena, types, interner, shape.ret, span);
                arena.add_synthetic(
                    NodeKind::FunctionType(FunctionTypeNode {
                        type_params: NodeList::new(),
                        params,
                        return_type,
                    }),
                    span,
                )
            }
            // Static sides and intrinsic non-primitives have no annotation
            // syntax; `Object` is the widest denotable type.
            _ => named(arena, types, "Object", &[]),
        }
    };
    let denoted = match interner.lookup(ty) {
        Some(TypeData::Static(..)) | None => TypeId::OBJECT,
        _ if ty.is_error() => TypeId::OBJECT,
        _ => ty,
    };
    types.set(node, denoted);
    node
}
