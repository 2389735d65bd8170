//! Reference resolution.
//!
//! Binds every `Identifier` (value namespace) and `TypeReference` (type
//! namespace) to the innermost visible binding. Unresolved identifiers are
//! diagnosed once; unresolved type references are left to the checker, which
//! knows the builtin type names.

use crate::binding::Binding;
use crate::table::ScopeTable;
use etsl_ast::{NodeArena, NodeIndex, NodeKind};
use etsl_common::DiagnosticBag;
use etsl_common::diagnostic_codes;
use etsl_common::limits::MAX_AST_DEPTH;
use tracing::{trace, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Namespace {
    Value,
    Type,
}

impl Namespace {
    #[must_use]
    pub fn accepts(self, binding: &Binding) -> bool {
        match self {
            Self::Value => binding.kind.is_value(),
            Self::Type => binding.kind.is_type(),
        }
    }
}

pub struct Resolver<'a> {
    arena: &'a NodeArena,
    table: &'a mut ScopeTable,
    diagnostics: &'a mut DiagnosticBag,
    file: &'a str,
    depth: u32,
    resolved: u32,
}

impl<'a> Resolver<'a> {
    pub fn new(
        arena: &'a NodeArena,
        table: &'a mut ScopeTable,
        diagnostics: &'a mut DiagnosticBag,
        file: &'a str,
    ) -> Self {
        Resolver {
            arena,
            table,
            diagnostics,
            file,
            depth: 0,
            resolved: 0,
        }
    }

    /// Resolve every reference of the unit. Returns the number of new bindings.
    pub fn resolve_unit(&mut self, root: NodeIndex) -> u32 {
        self.visit(root);
        trace!(resolved = self.resolved, "unit references resolved");
        self.resolved
    }

    /// Resolve the references inside a freshly inserted or moved subtree.
    pub fn resolve_subtree(&mut self, node: NodeIndex) -> u32 {
        self.visit(node);
        self.resolved
    }

    /// Look `name` up from the scope enclosing `node`.
    #[must_use]
    pub fn lookup_from(
        table: &ScopeTable,
        arena: &NodeArena,
        node: NodeIndex,
        name: &str,
        namespace: Namespace,
    ) -> Option<crate::BindingId> {
        let scope = table.declaring_scope(arena, node)?;
        table.lookup(scope, name, |b| namespace.accepts(b))
    }

    fn visit(&mut self, node: NodeIndex) {
        let Some(n) = self.arena.get(node) else {
            return;
        };
        if self.depth > MAX_AST_DEPTH {
            warn!(node = node.0, "resolver depth limit reached");
            return;
        }
        match &n.kind {
            NodeKind::Identifier(ident) => {
                self.resolve(node, &ident.name, Namespace::Value, true);
            }
            NodeKind::TypeReference(type_ref) => {
                self.resolve(node, &type_ref.name, Namespace::Type, false);
            }
            _ => {}
        }
        self.depth += 1;
        for child in self.arena.children(node) {
            self.visit(child);
        }
        self.depth -= 1;
    }

    fn resolve(&mut self, node: NodeIndex, name: &str, namespace: Namespace, report: bool) {
        if let Some(existing) = self.table.resolution(node)
            && self
                .table
                .binding(existing)
                .is_some_and(|b| self.table.binding_of_decl(b.decl) == Some(existing))
        {
            return;
        }
        match Self::lookup_from(self.table, self.arena, node, name, namespace) {
            Some(binding) => {
                self.table.set_resolution(node, binding);
                self.resolved += 1;
            }
            None => {
                self.table.resolutions.remove(&node.0);
                if report && self.table.unresolved.insert(node.0) {
                    self.diagnostics.report(
                        self.file,
                        self.arena.span(node),
                        diagnostic_codes::UNRESOLVED_IDENTIFIER,
                        &[name],
                    );
                }
            }
        }
    }
}
