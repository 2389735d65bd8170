//! Type checking as a pipeline phase.
//!
//! Runs after the declaration-level lowerings, so imports are linked again
//! first: an imported enum now names the class that replaced it.

use super::init_scopes::link_imports;
use super::with_unit;
use crate::context::CompilationContext;
use crate::phase::{Phase, PhaseScope};
use etsl_ast::NodeIndex;
use etsl_common::UnitId;
use tracing::debug;

pub struct CheckerPhase;

impl Phase for CheckerPhase {
    fn name(&self) -> &'static str {
        "checker"
    }

    fn scope(&self) -> PhaseScope {
        PhaseScope::Declarations
    }

    fn perform(&self, ctx: &mut CompilationContext, unit: UnitId) -> bool {
        with_unit(ctx, unit, |cx| {
            let relinked = link_imports(cx, false);
            cx.check_unit();
            debug!(relinked, typed = cx.unit.types.len(), "unit typed");
        })
        .is_some()
    }

    /// Every node of the unit carries a type.
    fn postcondition(&self, ctx: &CompilationContext, unit: UnitId) -> bool {
        ctx.program.unit(unit).is_some_and(|data| {
            data.arena
                .descendants(data.root)
                .into_iter()
                .all(|node| data.types.has_type(node))
        })
    }

    fn perform_on(&self, ctx: &mut CompilationContext, unit: UnitId, node: NodeIndex) -> bool {
        with_unit(ctx, unit, |cx| {
            cx.recheck(node);
        })
        .is_some()
    }
}
