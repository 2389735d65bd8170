//! Desugaring passes, in pipeline order.
//!
//! ```text
//! expression-lambda    arrow expression bodies become blocks
//! op-assignment        `x op= v` becomes `x = x op v`
//! init-scopes          scopes, bindings and import origins
//! resolve-identifiers  references to bindings
//! constant-folding     literal folding and const substitution
//! enum-lowering        enums become final classes
//! checker              types for every node
//! enum-post-check      switches over enum-like classes use ordinals
//! record-lowering      Map/Record object literals become `set` chains
//! lambda-lowering      arrows become lambda classes and callees
//! ```

mod checker_phase;
mod const_eval;
mod constant_folding;
mod enum_lowering;
mod enum_post_check;
mod expression_lambda;
mod free_vars;
mod init_scopes;
mod lambda_lowering;
mod op_assignment;
mod record_lowering;
mod resolve_identifiers;

pub use checker_phase::CheckerPhase;
pub use const_eval::{FoldError, fold_binary, fold_unary, is_truthy};
pub use constant_folding::ConstantFoldingPhase;
pub use enum_lowering::EnumLoweringPhase;
pub use enum_post_check::EnumPostCheckPhase;
pub use expression_lambda::ExpressionLambdaPhase;
pub use free_vars::{Capture, free_variables};
pub use init_scopes::InitScopesPhase;
pub use lambda_lowering::LambdaLoweringPhase;
pub use op_assignment::OpAssignmentPhase;
pub use record_lowering::RecordLoweringPhase;
pub use resolve_identifiers::ResolveIdentifiersPhase;

use crate::context::CompilationContext;
use crate::error::PipelineError;
use crate::rewrite::UnitCx;
use etsl_common::UnitId;

/// Run `f` on the rewrite view of `unit`. An unknown unit is recorded as the
/// phase failure and yields `None`.
pub(crate) fn with_unit<R>(
    ctx: &mut CompilationContext,
    unit: UnitId,
    f: impl FnOnce(&mut UnitCx<'_>) -> R,
) -> Option<R> {
    match ctx.unit_cx(unit) {
        Some(mut cx) => Some(f(&mut cx)),
        None => {
            ctx.fail(PipelineError::UnknownUnit(unit));
            None
        }
    }
}
