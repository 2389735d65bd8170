//! Reference resolution.

use super::with_unit;
use crate::context::CompilationContext;
use crate::phase::{Phase, PhaseScope};
use etsl_ast::{NodeIndex, NodeKind};
use etsl_common::UnitId;
use tracing::debug;

pub struct ResolveIdentifiersPhase;

impl Phase for ResolveIdentifiersPhase {
    fn name(&self) -> &'static str {
        "resolve-identifiers"
    }

    fn scope(&self) -> PhaseScope {
        PhaseScope::Declarations
    }

    fn precondition(&self, ctx: &CompilationContext, unit: UnitId) -> bool {
        ctx.program
            .unit(unit)
            .is_some_and(|u| u.scopes.scope_of_node(u.root).is_some())
    }

    fn perform(&self, ctx: &mut CompilationContext, unit: UnitId) -> bool {
        with_unit(ctx, unit, |cx| {
            let root = cx.root();
            let resolved = cx.reresolve(root);
            debug!(resolved, unresolved = cx.unit.scopes.unresolved.len(), "identifiers resolved");
        })
        .is_some()
    }

    /// Every identifier is either bound or was diagnosed.
    fn postcondition(&self, ctx: &CompilationContext, unit: UnitId) -> bool {
        let Some(data) = ctx.program.unit(unit) else {
            return false;
        };
        data.arena.descendants(data.root).into_iter().all(|node| {
            !matches!(data.arena.kind(node), Some(NodeKind::Identifier(_)))
                || data.scopes.resolution(node).is_some()
                || data.scopes.unresolved.contains(&node.0)
        })
    }

    fn perform_on(&self, ctx: &mut CompilationContext, unit: UnitId, node: NodeIndex) -> bool {
        with_unit(ctx, unit, |cx| {
            cx.reresolve(node);
        })
        .is_some()
    }
}
