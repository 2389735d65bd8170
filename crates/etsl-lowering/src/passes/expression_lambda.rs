//! Expression-bodied arrows get block bodies.
//!
//! ```text
//! (x: int): int => x + 1     ->  (x: int): int => { return x + 1; }
//! (x: int): void => log(x)   ->  (x: int): void => { log(x); }
//! ```

use super::with_unit;
use crate::context::CompilationContext;
use crate::phase::Phase;
use crate::rewrite::UnitCx;
use etsl_ast::syntax::transform_utils::collect_kind;
use etsl_ast::{NodeIndex, NodeKind, PrimitiveKind};
use etsl_common::UnitId;
use smallvec::smallvec;
use tracing::debug;

pub struct ExpressionLambdaPhase;

impl Phase for ExpressionLambdaPhase {
    fn name(&self) -> &'static str {
        "expression-lambda"
    }

    fn perform(&self, ctx: &mut CompilationContext, unit: UnitId) -> bool {
        with_unit(ctx, unit, |cx| {
            let root = cx.root();
            let arrows = collect_kind(cx.arena(), root, |k| matches!(k, NodeKind::Arrow(_)));
            let mut rewritten = 0u32;
            for arrow in arrows {
                if wrap_body(cx, arrow) {
                    rewritten += 1;
                }
            }
            debug!(rewritten, "expression lambdas");
        })
        .is_some()
    }

    fn postcondition(&self, ctx: &CompilationContext, unit: UnitId) -> bool {
        let Some(data) = ctx.program.unit(unit) else {
            return false;
        };
        collect_kind(&data.arena, data.root, |k| matches!(k, NodeKind::Arrow(_)))
            .into_iter()
            .all(|arrow| {
                data.arena
                    .kind(arrow)
                    .and_then(NodeKind::as_arrow)
                    .is_some_and(|a| matches!(data.arena.kind(a.body), Some(NodeKind::Block(_))))
            })
    }
}

fn wrap_body(cx: &mut UnitCx<'_>, arrow: NodeIndex) -> bool {
    let Some((body, return_type)) = cx
        .arena()
        .kind(arrow)
        .and_then(NodeKind::as_arrow)
        .map(|a| (a.body, a.return_type))
    else {
        return false;
    };
    if body.is_none() || matches!(cx.arena().kind(body), Some(NodeKind::Block(_))) {
        return false;
    }
    let is_void = matches!(
        cx.arena().kind(return_type),
        Some(NodeKind::PrimitiveType(PrimitiveKind::Void))
    );
    let span = cx.arena().span(body);
    let mut f = cx.factory(span);
    let statement = if is_void {
        f.expr_stmt(body)
    } else {
        f.ret(body)
    };
    let block = f.block(smallvec![statement]);
    cx.replace_child(arrow, body, block)
}
