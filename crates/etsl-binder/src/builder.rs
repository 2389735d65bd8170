//! Scope construction.
//!
//! Walks a unit (or a freshly inserted subtree) once, creating a scope for
//! every scope-introducing node and declaring every named declaration in the
//! scope that encloses it. Re-running over an already processed subtree is a
//! no-op: existing scopes are reused and already bound declarations skipped.

use crate::binding::{BindingFlags, BindingKind};
use crate::scope::{ScopeId, ScopeKind};
use crate::table::{DeclareOutcome, ScopeTable};
use etsl_ast::{MethodKind, Modifiers, NodeArena, NodeFlags, NodeIndex, NodeKind, VarKind};
use etsl_common::DiagnosticBag;
use etsl_common::diagnostic_codes;
use etsl_common::limits::MAX_AST_DEPTH;
use tracing::{debug, warn};

pub struct ScopeBuilder<'a> {
    arena: &'a NodeArena,
    table: &'a mut ScopeTable,
    diagnostics: &'a mut DiagnosticBag,
    file: &'a str,
    depth: u32,
}

impl<'a> ScopeBuilder<'a> {
    pub fn new(
        arena: &'a NodeArena,
        table: &'a mut ScopeTable,
        diagnostics: &'a mut DiagnosticBag,
        file: &'a str,
    ) -> Self {
        ScopeBuilder {
            arena,
            table,
            diagnostics,
            file,
            depth: 0,
        }
    }

    /// Build scopes for a whole unit rooted at a `Program` node.
    pub fn build_unit(&mut self, root: NodeIndex) -> ScopeId {
        let scope = self
            .table
            .ensure_scope(ScopeKind::Module, ScopeId::NONE, root);
        self.visit_children(root, scope);
        debug!(
            scopes = self.table.scopes.len(),
            bindings = self.table.bindings.len(),
            "unit scopes built"
        );
        scope
    }

    /// Build scopes for the subtree rooted at `node`, attached to `enclosing`.
    pub fn build_subtree(&mut self, node: NodeIndex, enclosing: ScopeId) {
        self.visit(node, enclosing);
    }

    fn visit_children(&mut self, node: NodeIndex, scope: ScopeId) {
        for child in self.arena.children(node) {
            self.visit(child, scope);
        }
    }

    fn visit(&mut self, node: NodeIndex, scope: ScopeId) {
        let Some(n) = self.arena.get(node) else {
            return;
        };
        if self.depth > MAX_AST_DEPTH {
            warn!(node = node.0, "scope builder depth limit reached");
            return;
        }
        self.depth += 1;

        match &n.kind {
            NodeKind::Program(_) => {
                let inner = self
                    .table
                    .ensure_scope(ScopeKind::Module, ScopeId::NONE, node);
                self.visit_children(node, inner);
            }
            NodeKind::Class(class) => {
                let mut flags = export_flags(class.modifiers);
                if n.flags.contains(NodeFlags::ENUM_LIKE) {
                    flags |= BindingFlags::ENUM_LIKE;
                }
                if n.flags.contains(NodeFlags::SYNTHETIC) {
                    flags |= BindingFlags::SYNTHETIC;
                }
                self.declare(scope, &class.name, BindingKind::Class, flags, node);
                let inner = self.table.ensure_scope(ScopeKind::Class, scope, node);
                self.visit_children(node, inner);
            }
            NodeKind::Interface(iface) => {
                let flags = export_flags(iface.modifiers);
                self.declare(scope, &iface.name, BindingKind::Interface, flags, node);
                let inner = self.table.ensure_scope(ScopeKind::Interface, scope, node);
                self.visit_children(node, inner);
            }
            NodeKind::Enum(decl) => {
                let flags = export_flags(decl.modifiers);
                self.declare(scope, &decl.name, BindingKind::Enum, flags, node);
                let inner = self.table.ensure_scope(ScopeKind::Class, scope, node);
                self.visit_children(node, inner);
            }
            NodeKind::EnumMember(member) => {
                self.declare(
                    scope,
                    &member.name,
                    BindingKind::EnumLiteral,
                    BindingFlags::STATIC | BindingFlags::READONLY,
                    node,
                );
                self.visit_children(node, scope);
            }
            NodeKind::Function(func) => {
                let flags = export_flags(func.modifiers);
                self.declare(scope, &func.name, BindingKind::Function, flags, node);
                let inner = self.table.ensure_scope(ScopeKind::Function, scope, node);
                self.visit_children(node, inner);
            }
            NodeKind::Method(method) => {
                if method.kind == MethodKind::Method {
                    let mut flags = member_flags(method.modifiers);
                    if n.flags.contains(NodeFlags::SYNTHETIC) {
                        flags |= BindingFlags::SYNTHETIC;
                    }
                    self.declare(scope, &method.name, BindingKind::Method, flags, node);
                }
                let inner = self.table.ensure_scope(ScopeKind::Function, scope, node);
                self.visit_children(node, inner);
            }
            // Parameters of function types are scoped to the type node.
            NodeKind::Arrow(_) | NodeKind::FunctionType(_) => {
                let inner = self.table.ensure_scope(ScopeKind::Function, scope, node);
                self.visit_children(node, inner);
            }
            NodeKind::Field(field) => {
                let flags = member_flags(field.modifiers);
                self.declare(scope, &field.name, BindingKind::Field, flags, node);
                self.visit_children(node, scope);
            }
            NodeKind::Parameter(param) => {
                let mut flags = BindingFlags::empty();
                if param.optional || param.init.is_some() {
                    flags |= BindingFlags::OPTIONAL;
                }
                if param.rest {
                    flags |= BindingFlags::REST;
                }
                self.declare(scope, &param.name, BindingKind::Parameter, flags, node);
                self.visit_children(node, scope);
            }
            NodeKind::TypeParameter(tp) => {
                self.declare(
                    scope,
                    &tp.name,
                    BindingKind::TypeParameter,
                    BindingFlags::empty(),
                    node,
                );
                self.visit_children(node, scope);
            }
            NodeKind::Variable(var) => {
                let (kind, mut flags) = match var.kind {
                    VarKind::Const => (BindingKind::Const, BindingFlags::READONLY),
                    VarKind::Let => (BindingKind::Let, BindingFlags::empty()),
                    VarKind::Var => (BindingKind::Var, BindingFlags::empty()),
                };
                flags |= export_flags(var.modifiers);
                self.declare(scope, &var.name, kind, flags, node);
                self.visit_children(node, scope);
            }
            NodeKind::ImportSpecifier(spec) => {
                self.declare(
                    scope,
                    &spec.local,
                    BindingKind::Import,
                    BindingFlags::empty(),
                    node,
                );
            }
            NodeKind::Block(_) => {
                let inner = self.table.ensure_scope(ScopeKind::Block, scope, node);
                self.visit_children(node, inner);
            }
            NodeKind::For(_) | NodeKind::ForOf(_) => {
                let inner = self.table.ensure_scope(ScopeKind::Loop, scope, node);
                self.visit_children(node, inner);
            }
            NodeKind::Catch(clause) => {
                let inner = self.table.ensure_scope(ScopeKind::Catch, scope, node);
                if let Some(param) = &clause.param {
                    self.declare(inner, param, BindingKind::Let, BindingFlags::empty(), node);
                }
                self.visit_children(node, inner);
            }
            _ => self.visit_children(node, scope),
        }

        self.depth -= 1;
    }

    fn declare(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: BindingKind,
        flags: BindingFlags,
        decl: NodeIndex,
    ) {
        match self.table.declare(scope, name, kind, flags, decl) {
            DeclareOutcome::Duplicate(_) => {
                if self.table.duplicates.insert(decl.0) {
                    self.diagnostics.report(
                        self.file,
                        self.arena.span(decl),
                        diagnostic_codes::DUPLICATE_IDENTIFIER,
                        &[name],
                    );
                }
            }
            DeclareOutcome::NoScope => {
                warn!(name, scope = scope.0, "declaration outside of any scope");
            }
            DeclareOutcome::Declared(_) | DeclareOutcome::Existing(_) => {}
        }
    }
}

fn export_flags(modifiers: Modifiers) -> BindingFlags {
    if modifiers.contains(Modifiers::EXPORT) {
        BindingFlags::EXPORTED
    } else {
        BindingFlags::empty()
    }
}

fn member_flags(modifiers: Modifiers) -> BindingFlags {
    let mut flags = BindingFlags::empty();
    if modifiers.contains(Modifiers::STATIC) {
        flags |= BindingFlags::STATIC;
    }
    if modifiers.contains(Modifiers::READONLY) {
        flags |= BindingFlags::READONLY;
    }
    flags
}
