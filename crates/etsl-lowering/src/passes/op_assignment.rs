//! Compound assignments become plain ones.
//!
//! `x op= v` is rewritten to `x = x op v` when re-evaluating `x` has no
//! effect: an identifier, or a member of an identifier, `this` or `super`.
//! Other targets keep the compound form.

use super::with_unit;
use crate::context::CompilationContext;
use crate::phase::Phase;
use crate::rewrite::UnitCx;
use etsl_ast::syntax::transform_utils::collect_kind;
use etsl_ast::{AssignOp, NodeArena, NodeIndex, NodeKind};
use etsl_common::UnitId;
use tracing::{debug, trace};

pub struct OpAssignmentPhase;

impl Phase for OpAssignmentPhase {
    fn name(&self) -> &'static str {
        "op-assignment"
    }

    fn perform(&self, ctx: &mut CompilationContext, unit: UnitId) -> bool {
        with_unit(ctx, unit, |cx| {
            let root = cx.root();
            let assignments = collect_kind(cx.arena(), root, |k| {
                k.as_assignment().is_some_and(|a| a.op != AssignOp::Assign)
            });
            let mut rewritten = 0u32;
            for node in assignments {
                if lower_assignment(cx, node) {
                    rewritten += 1;
                }
            }
            debug!(rewritten, "compound assignments");
        })
        .is_some()
    }

    fn postcondition(&self, ctx: &CompilationContext, unit: UnitId) -> bool {
        let Some(data) = ctx.program.unit(unit) else {
            return false;
        };
        let arena = &data.arena;
        collect_kind(arena, data.root, |k| {
            k.as_assignment().is_some_and(|a| a.op != AssignOp::Assign)
        })
        .into_iter()
        .all(|node| {
            arena
                .kind(node)
                .and_then(NodeKind::as_assignment)
                .is_none_or(|a| !is_simple_target(arena, a.target))
        })
    }
}

fn is_simple_target(arena: &NodeArena, target: NodeIndex) -> bool {
    match arena.kind(target) {
        Some(NodeKind::Identifier(_)) => true,
        Some(NodeKind::Member(member)) => matches!(
            arena.kind(member.object),
            Some(NodeKind::Identifier(_) | NodeKind::This | NodeKind::Super)
        ),
        _ => false,
    }
}

fn lower_assignment(cx: &mut UnitCx<'_>, node: NodeIndex) -> bool {
    let Some(assignment) = cx.arena().kind(node).and_then(NodeKind::as_assignment).cloned() else {
        return false;
    };
    let Some(op) = assignment.op.binary_op() else {
        return false;
    };
    if !is_simple_target(cx.arena(), assignment.target) {
        trace!(node = node.0, "compound assignment target kept");
        return false;
    }

    let span = cx.arena().span(node);
    let read = cx.clone_subtree(assignment.target);
    let mut f = cx.factory(span);
    let value = f.binary(op, read, assignment.value);
    let plain = f.assign(assignment.target, value);
    cx.replace_in_parent(node, plain)
}
