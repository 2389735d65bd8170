//! Constant folding.
//!
//! Post-order rewrite of the whole unit:
//! - unary, binary and logical operators over literal operands fold to a
//!   literal (or, for `&&`, `||` and `??`, to the operand they yield)
//! - a conditional with a literal test becomes the chosen branch
//! - in constant contexts, names of constants become their value
//!
//! Constant contexts are annotation arguments, enum member initializers,
//! switch-case tests and the initializers of `const` variables and
//! `static readonly` fields. References to enum members (`E.A`) are only
//! substituted inside enum member initializers; elsewhere they stay typed
//! by their enum.

use super::const_eval::{
    ConstEvaluator, EvalError, FoldError, Pick, fold_binary, fold_unary, is_truthy, pick_logical,
};
use super::with_unit;
use crate::context::CompilationContext;
use crate::phase::{Phase, PhaseScope};
use crate::rewrite::UnitCx;
use etsl_ast::{
    LiteralValue, Modifiers, NodeArena, NodeIndex, NodeKind, PropertyKey, TreeTransform, VarKind,
    apply_transform,
};
use etsl_binder::BindingKind;
use etsl_common::{UnitId, diagnostic_codes};
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

pub struct ConstantFoldingPhase;

impl Phase for ConstantFoldingPhase {
    fn name(&self) -> &'static str {
        "constant-folding"
    }

    fn scope(&self) -> PhaseScope {
        PhaseScope::Declarations
    }

    fn perform(&self, ctx: &mut CompilationContext, unit: UnitId) -> bool {
        with_unit(ctx, unit, |cx| {
            let root = cx.root();
            let mut folder = Folder::default();
            apply_transform(&mut folder, cx, root);
            let rejected = check_annotation_arguments(cx);
            debug!(folded = folder.folded, rejected, "constants folded");
        })
        .is_some()
    }

    /// Folding is idempotent: nothing foldable over literals is left.
    fn postcondition(&self, ctx: &CompilationContext, unit: UnitId) -> bool {
        let Some(data) = ctx.program.unit(unit) else {
            return false;
        };
        let arena = &data.arena;
        arena
            .descendants(data.root)
            .into_iter()
            .all(|node| !is_foldable(arena, node))
    }
}

/// Where a constant expression sits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ConstContext {
    Annotation,
    EnumInit,
    CaseTest,
    Initializer,
}

/// The constant context enclosing the expression `node`, if any.
fn constant_context(arena: &NodeArena, node: NodeIndex) -> Option<ConstContext> {
    let mut child = node;
    for ancestor in arena.ancestors(node) {
        match arena.kind(ancestor)? {
            NodeKind::Annotation(_) => return Some(ConstContext::Annotation),
            NodeKind::EnumMember(member) => {
                return (member.init == child).then_some(ConstContext::EnumInit);
            }
            NodeKind::SwitchCase(case) => {
                return (case.test == child).then_some(ConstContext::CaseTest);
            }
            NodeKind::Variable(var) => {
                return (var.kind == VarKind::Const && var.init == child)
                    .then_some(ConstContext::Initializer);
            }
            NodeKind::Field(field) => {
                return (field.init == child
                    && field.modifiers.contains(Modifiers::STATIC | Modifiers::READONLY))
                .then_some(ConstContext::Initializer);
            }
            NodeKind::Property(_) => {}
            kind if kind.is_expression() && !kind.is_function_like() => {}
            _ => return None,
        }
        child = ancestor;
    }
    None
}

/// Whether `node` names an enum member (`E.A`, possibly through an import).
fn is_enum_member_ref(cx: &UnitCx<'_>, node: NodeIndex) -> bool {
    let Some(member) = cx.arena().kind(node).and_then(NodeKind::as_member) else {
        return false;
    };
    let Some(binding) = cx.resolved_binding(member.object) else {
        return false;
    };
    match (binding.kind, binding.origin) {
        (BindingKind::Enum, _) => true,
        (BindingKind::Import, Some(origin)) => cx
            .arena_of(origin.unit)
            .and_then(|arena| arena.kind(NodeIndex(origin.node)))
            .is_some_and(|kind| matches!(kind, NodeKind::Enum(_))),
        _ => false,
    }
}

fn literal_of(arena: &NodeArena, node: NodeIndex) -> Option<&LiteralValue> {
    arena.literal(node)
}

/// A node the folder would still rewrite.
fn is_foldable(arena: &NodeArena, node: NodeIndex) -> bool {
    match arena.kind(node) {
        Some(NodeKind::Paren(paren)) => literal_of(arena, paren.expr).is_some(),
        Some(NodeKind::Unary(unary)) => {
            literal_of(arena, unary.operand).is_some_and(|v| fold_unary(unary.op, v).is_ok())
        }
        Some(NodeKind::Binary(binary)) => {
            let Some(left) = literal_of(arena, binary.left) else {
                return false;
            };
            if pick_logical(binary.op, left).is_some() {
                return true;
            }
            literal_of(arena, binary.right)
                .is_some_and(|right| fold_binary(binary.op, left, right).is_ok())
        }
        Some(NodeKind::Conditional(cond)) => literal_of(arena, cond.test).is_some(),
        _ => false,
    }
}

#[derive(Default)]
struct Folder {
    folded: u32,
    /// Nodes already diagnosed; a node is reported once.
    reported: FxHashSet<u32>,
    /// Declarations on an already reported cycle.
    cyclic: FxHashSet<(UnitId, NodeIndex)>,
}

impl Folder {
    fn literal(&mut self, cx: &mut UnitCx<'_>, value: LiteralValue, like: NodeIndex) -> NodeIndex {
        self.folded += 1;
        trace!(node = like.0, %value, "folded");
        cx.alloc(NodeKind::Literal(value), like)
    }

    fn report_once(&mut self, cx: &mut UnitCx<'_>, node: NodeIndex, code: u32, args: &[&str]) {
        if self.reported.insert(node.0) {
            cx.report(node, code, args);
        }
    }

    fn fold_error(
        &mut self,
        cx: &mut UnitCx<'_>,
        node: NodeIndex,
        err: FoldError,
        unsupported: (u32, &[&str]),
    ) {
        match err {
            FoldError::DivisionByZero => {
                self.report_once(cx, node, diagnostic_codes::DIVISION_BY_ZERO, &[]);
            }
            FoldError::Unsupported => {
                let (code, args) = unsupported;
                if constant_context(cx.arena(), node).is_some() {
                    self.report_once(cx, node, code, args);
                }
            }
        }
    }

    fn fold_unary(&mut self, cx: &mut UnitCx<'_>, node: NodeIndex) -> Option<NodeIndex> {
        let unary = cx.arena().kind(node).and_then(NodeKind::as_unary)?;
        let op = unary.op;
        let operand = literal_of(cx.arena(), unary.operand)?.clone();
        match fold_unary(op, &operand) {
            Ok(value) => Some(self.literal(cx, value, node)),
            Err(err) => {
                let args: &[&str] = &[op.as_str(), operand.kind_name()];
                self.fold_error(
                    cx,
                    node,
                    err,
                    (diagnostic_codes::UNARY_OPERATOR_NOT_APPLICABLE, args),
                );
                None
            }
        }
    }

    fn fold_binary(&mut self, cx: &mut UnitCx<'_>, node: NodeIndex) -> Option<NodeIndex> {
        let binary = cx.arena().kind(node).and_then(NodeKind::as_binary)?.clone();
        let left = literal_of(cx.arena(), binary.left)?.clone();
        if let Some(pick) = pick_logical(binary.op, &left) {
            self.folded += 1;
            return Some(match pick {
                Pick::Left => binary.left,
                Pick::Right => binary.right,
            });
        }
        let right = literal_of(cx.arena(), binary.right)?.clone();
        match fold_binary(binary.op, &left, &right) {
            Ok(value) => Some(self.literal(cx, value, node)),
            Err(err) => {
                let args: &[&str] = &[binary.op.as_str(), left.kind_name(), right.kind_name()];
                self.fold_error(
                    cx,
                    node,
                    err,
                    (diagnostic_codes::UNSUPPORTED_CONSTANT_OPERATOR, args),
                );
                None
            }
        }
    }

    fn fold_conditional(&mut self, cx: &mut UnitCx<'_>, node: NodeIndex) -> Option<NodeIndex> {
        let cond = cx.arena().kind(node).and_then(NodeKind::as_conditional)?;
        let test = literal_of(cx.arena(), cond.test)?;
        let branch = if is_truthy(test) {
            cond.consequent
        } else {
            cond.alternate
        };
        self.folded += 1;
        Some(branch)
    }

    /// Substitute a constant name by its value.
    fn fold_reference(&mut self, cx: &mut UnitCx<'_>, node: NodeIndex) -> Option<NodeIndex> {
        let context = constant_context(cx.arena(), node)?;
        if context != ConstContext::EnumInit && is_enum_member_ref(cx, node) {
            return None;
        }
        let name = match cx.arena().kind(node)? {
            NodeKind::Identifier(ident) => ident.name.clone(),
            NodeKind::Member(member) => member.property.clone(),
            _ => return None,
        };
        let unit = cx.id();
        let result = ConstEvaluator::new(&*cx, &mut self.cyclic).eval(unit, node);
        match result {
            Ok(value) => Some(self.literal(cx, value, node)),
            Err(EvalError::Cycle { reported: false }) => {
                self.report_once(cx, node, diagnostic_codes::CONSTANT_CYCLE, &[&name]);
                None
            }
            Err(EvalError::DivisionByZero) => {
                // Diagnosed at the declaration that divides.
                trace!(node = node.0, %name, "constant divides by zero");
                None
            }
            Err(_) => None,
        }
    }
}

impl<'a> TreeTransform<UnitCx<'a>> for Folder {
    fn transform(&mut self, cx: &mut UnitCx<'a>, node: NodeIndex) -> Option<NodeIndex> {
        match cx.arena().kind(node)? {
            NodeKind::Paren(paren) => {
                let inner = paren.expr;
                literal_of(cx.arena(), inner).is_some().then_some(inner)
            }
            NodeKind::Unary(_) => self.fold_unary(cx, node),
            NodeKind::Binary(_) => self.fold_binary(cx, node),
            NodeKind::Conditional(_) => self.fold_conditional(cx, node),
            NodeKind::Identifier(_) | NodeKind::Member(_) => self.fold_reference(cx, node),
            _ => None,
        }
    }
}

/// Whether an annotation argument is a compile-time constant.
fn is_constant_argument(cx: &UnitCx<'_>, node: NodeIndex) -> bool {
    match cx.arena().kind(node) {
        Some(NodeKind::Literal(_)) => true,
        Some(NodeKind::ArrayLiteral(array)) => {
            array.elements.iter().all(|&e| is_constant_argument(cx, e))
        }
        Some(NodeKind::Member(_)) => is_enum_member_ref(cx, node),
        _ => false,
    }
}

/// Report annotation arguments that did not fold. Returns their number.
fn check_annotation_arguments(cx: &mut UnitCx<'_>) -> u32 {
    let root = cx.root();
    let mut rejected: Vec<(NodeIndex, String)> = Vec::new();
    for node in cx.arena().descendants(root) {
        let Some(annotation) = cx.arena().kind(node).and_then(NodeKind::as_annotation) else {
            continue;
        };
        for &property in &annotation.properties {
            let Some(prop) = cx.arena().kind(property).and_then(NodeKind::as_property) else {
                continue;
            };
            if is_constant_argument(cx, prop.value) {
                continue;
            }
            let key = match &prop.key {
                PropertyKey::Name(name) => name.clone(),
                PropertyKey::Literal(value) => value.to_string(),
            };
            rejected.push((prop.value, key));
        }
    }
    let count = rejected.len() as u32;
    for (value, key) in rejected {
        cx.report(value, diagnostic_codes::NOT_A_CONSTANT, &[&key]);
    }
    count
}
