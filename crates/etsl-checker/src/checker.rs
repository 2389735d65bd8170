//! Checker state and dispatch.
//!
//! The checker types one unit at a time. It reads the unit's arena and scope
//! table, writes the unit's `NodeTypes`, and reads other units through a
//! `ProgramView`. Checking is idempotent: a node that already has a type is
//! not checked again, so passes can re-run it over synthesized subtrees.
//!
//! The `impl Checker` blocks are split by concern:
//! - `checker.rs`: state, `check` dispatch, unit/subtree entry points
//! - `declarations.rs`: declared types, signatures, class registry
//! - `expr.rs`: operators, literals, assignments
//! - `call_checker.rs`: calls, `new`, generic argument inference
//! - `property_checker.rs`: member lookup and builtin members
//! - `statements.rs`: statements and return contexts
//! - `type_nodes.rs`: type annotation resolution

use crate::format::format_type;
use crate::intern::TypeInterner;
use crate::node_types::{NodeTypes, ProgramView};
use crate::recursion::{RecursionGuard, RecursionProfile, RecursionResult};
use crate::relation::Relation;
use crate::types::TypeId;
use etsl_ast::{NodeArena, NodeIndex, NodeKind};
use etsl_binder::ScopeTable;
use etsl_common::{DeclRef, DiagnosticBag, Span, UnitId, diagnostic_codes};
use tracing::{debug, trace, warn};

/// Expected return type of the function body being checked.
#[derive(Clone, Debug)]
pub(crate) struct ReturnContext {
    /// Declared return type; `None` while inferring it from the body.
    pub expected: Option<TypeId>,
    /// Types of checked `return` expressions.
    pub collected: Vec<TypeId>,
}

/// The unit being checked.
#[derive(Clone, Copy)]
pub struct CheckedUnit<'a> {
    pub id: UnitId,
    pub file: &'a str,
    pub arena: &'a NodeArena,
    pub scopes: &'a ScopeTable,
}

pub struct Checker<'a> {
    pub(crate) unit: UnitId,
    pub(crate) file: &'a str,
    pub(crate) arena: &'a NodeArena,
    pub(crate) scopes: &'a ScopeTable,
    pub(crate) types: &'a mut NodeTypes,
    pub(crate) others: &'a dyn ProgramView,
    pub(crate) interner: &'a mut TypeInterner,
    pub(crate) diagnostics: &'a mut DiagnosticBag,
    pub(crate) check_guard: RecursionGuard<NodeIndex>,
    pub(crate) decl_guard: RecursionGuard<NodeIndex>,
    pub(crate) returns: Vec<ReturnContext>,
}

impl<'a> Checker<'a> {
    pub fn new(
        unit: CheckedUnit<'a>,
        types: &'a mut NodeTypes,
        others: &'a dyn ProgramView,
        interner: &'a mut TypeInterner,
        diagnostics: &'a mut DiagnosticBag,
    ) -> Self {
        Checker {
            unit: unit.id,
            file: unit.file,
            arena: unit.arena,
            scopes: unit.scopes,
            types,
            others,
            interner,
            diagnostics,
            check_guard: RecursionGuard::with_profile(RecursionProfile::ExpressionCheck),
            decl_guard: RecursionGuard::with_profile(RecursionProfile::ExpressionCheck),
            returns: Vec::new(),
        }
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    /// Type every node of the unit rooted at `root`.
    pub fn check_unit(&mut self, root: NodeIndex) {
        self.register_classes(root);
        self.check_subtree(root);
        debug!(
            unit = self.unit.0,
            typed = self.types.len(),
            "unit checked"
        );
    }

    /// Type every node of a subtree that has no type yet.
    pub fn check_subtree(&mut self, root: NodeIndex) {
        self.check(root);
        // Nodes a parent check skipped (e.g. after an error) still get a type.
        for node in self.arena.descendants(root) {
            if !self.types.has_type(node) {
                self.check(node);
            }
        }
    }

    /// Type of `node`, checking it on first request.
    pub fn check(&mut self, node: NodeIndex) -> TypeId {
        self.check_node(node, None)
    }

    /// Type of `node` checked against a contextual type.
    ///
    /// Object literals take a `Record`/`Map`/class expected type, array
    /// literals an expected element type, and arrow functions the parameter
    /// types of an expected function type.
    pub fn check_with_expected(&mut self, node: NodeIndex, expected: TypeId) -> TypeId {
        self.check_node(node, Some(expected))
    }

    fn check_node(&mut self, node: NodeIndex, expected: Option<TypeId>) -> TypeId {
        if let Some(ty) = self.types.get(node) {
            return ty;
        }
        if self.arena.get(node).is_none() {
            return TypeId::ERROR;
        }
        match self.check_guard.enter(node) {
            RecursionResult::Entered => {}
            RecursionResult::Cycle => return TypeId::ERROR,
            RecursionResult::DepthExceeded | RecursionResult::IterationExceeded => {
                warn!(node = node.0, "checker depth limit reached");
                self.types.set(node, TypeId::ERROR);
                return TypeId::ERROR;
            }
        }
        let ty = self.compute_type(node, expected);
        self.check_guard.leave(node);
        self.types.set(node, ty);
        trace!(node = node.0, ty = ty.0, "checked");
        ty
    }

    fn compute_type(&mut self, node: NodeIndex, expected: Option<TypeId>) -> TypeId {
        let arena = self.arena;
        let Some(kind) = arena.kind(node) else {
            return TypeId::ERROR;
        };
        match kind {
            NodeKind::Literal(value) => Self::literal_type(value),
            NodeKind::Identifier(_) => self.check_identifier(node),
            NodeKind::This => self.check_this(node),
            NodeKind::Super => self.check_super(node),
            NodeKind::Paren(paren) => {
                let inner = paren.expr;
                match expected {
                    Some(expected) => self.check_with_expected(inner, expected),
                    None => self.check(inner),
                }
            }
            NodeKind::Binary(_) => self.check_binary(node),
            NodeKind::Unary(_) => self.check_unary(node),
            NodeKind::Update(_) => self.check_update(node),
            NodeKind::Assignment(_) => self.check_assignment(node),
            NodeKind::Conditional(_) => self.check_conditional(node, expected),
            NodeKind::Call(_) => self.check_call(node),
            NodeKind::New(_) => self.check_new(node),
            NodeKind::Member(_) => self.check_member(node),
            NodeKind::Index(_) => self.check_index(node),
            NodeKind::Arrow(_) => self.check_arrow(node, expected),
            NodeKind::ObjectLiteral(_) => self.check_object_literal(node, expected),
            NodeKind::ArrayLiteral(_) => self.check_array_literal(node, expected),
            NodeKind::Property(property) => {
                let value = property.value;
                match expected {
                    Some(expected) => self.check_with_expected(value, expected),
                    None => self.check(value),
                }
            }
            NodeKind::Spread(spread) => {
                let inner = spread.expr;
                self.check(inner)
            }
            NodeKind::As(_) => self.check_as(node),

            NodeKind::Class(_) => self.check_class(node),
            NodeKind::Interface(_) => self.check_interface(node),
            NodeKind::Enum(_) => self.check_enum(node),
            NodeKind::Function(_) | NodeKind::Method(_) => self.check_function_like(node),
            NodeKind::Field(_) => self.check_field(node),
            NodeKind::Variable(_) => self.check_variable(node),
            NodeKind::Parameter(_)
            | NodeKind::TypeParameter(_)
            | NodeKind::EnumMember(_)
            | NodeKind::ImportSpecifier(_) => self.check_simple_declaration(node),

            NodeKind::PrimitiveType(_)
            | NodeKind::TypeReference(_)
            | NodeKind::FunctionType(_)
            | NodeKind::ArrayType(_)
            | NodeKind::UnionType(_) => self.resolve_type_reference(node),

            NodeKind::Program(_)
            | NodeKind::Import(_)
            | NodeKind::Annotation(_)
            | NodeKind::Block(_)
            | NodeKind::ExprStmt(_)
            | NodeKind::Return(_)
            | NodeKind::If(_)
            | NodeKind::While(_)
            | NodeKind::DoWhile(_)
            | NodeKind::For(_)
            | NodeKind::ForOf(_)
            | NodeKind::Break(_)
            | NodeKind::Continue(_)
            | NodeKind::Throw(_)
            | NodeKind::Try(_)
            | NodeKind::Catch(_)
            | NodeKind::Switch(_)
            | NodeKind::SwitchCase(_)
            | NodeKind::Empty => self.check_statement(node),
        }
    }

    // =========================================================================
    // Shared helpers
    // =========================================================================

    pub(crate) fn decl_ref(&self, node: NodeIndex) -> DeclRef {
        DeclRef::new(self.unit, node.0)
    }

    /// Arena of the unit a declaration lives in.
    pub(crate) fn arena_of(&self, unit: UnitId) -> Option<&'a NodeArena> {
        let others = self.others;
        if unit == self.unit {
            Some(self.arena)
        } else {
            others.arena(unit)
        }
    }

    pub(crate) fn format(&self, ty: TypeId) -> String {
        format_type(&*self.interner, ty)
    }

    pub(crate) fn relation(&mut self) -> Relation<'_> {
        Relation::new(self.interner)
    }

    pub(crate) fn is_assignable(&mut self, source: TypeId, target: TypeId) -> bool {
        self.relation().is_assignable(source, target)
    }

    pub(crate) fn report(&mut self, node: NodeIndex, code: u32, args: &[&str]) {
        let span = self.arena.span(node);
        self.report_at(span, code, args);
    }

    pub(crate) fn report_at(&mut self, span: Span, code: u32, args: &[&str]) {
        self.diagnostics.report(self.file, span, code, args);
    }

    /// Report `TYPE_NOT_ASSIGNABLE` unless `source` is assignable to `target`.
    pub(crate) fn check_assignable(&mut self, node: NodeIndex, source: TypeId, target: TypeId) -> bool {
        if self.is_assignable(source, target) {
            return true;
        }
        let source_text = self.format(source);
        let target_text = self.format(target);
        self.report(
            node,
            diagnostic_codes::TYPE_NOT_ASSIGNABLE,
            &[&source_text, &target_text],
        );
        false
    }

    /// Check `node` against `expected` and report when it is not assignable.
    pub(crate) fn check_expression_against(&mut self, node: NodeIndex, expected: TypeId) -> TypeId {
        let ty = self.check_with_expected(node, expected);
        self.check_assignable(node, ty, expected);
        ty
    }

    pub(crate) fn check_children(&mut self, node: NodeIndex) {
        let arena = self.arena;
        for child in arena.children(node) {
            self.check(child);
        }
    }
}
