//! Free-variable analysis for arrow functions.
//!
//! A capture is a local of an enclosing function (variable, parameter or
//! catch parameter) referenced inside the arrow. `this` is tracked
//! separately by the lambda lowering.

use crate::rewrite::UnitCx;
use etsl_ast::{NodeIndex, NodeKind};
use etsl_binder::BindingId;
use etsl_checker::TypeId;

/// A local captured by an arrow, in first-reference order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Capture {
    pub name: String,
    pub binding: BindingId,
    /// Declaring node of the captured local.
    pub decl: NodeIndex,
    /// Declared type of the local; `OBJECT` when it has none.
    pub ty: TypeId,
}

/// Locals of enclosing scopes referenced inside `arrow`.
#[must_use]
pub fn free_variables(cx: &UnitCx<'_>, arrow: NodeIndex) -> Vec<Capture> {
    let arena = cx.arena();
    let scopes = &cx.unit.scopes;
    let mut captures: Vec<Capture> = Vec::new();
    for node in arena.descendants(arrow) {
        if !matches!(arena.kind(node), Some(NodeKind::Identifier(_))) {
            continue;
        }
        let Some(id) = scopes.resolution(node) else {
            continue;
        };
        if captures.iter().any(|c| c.binding == id) {
            continue;
        }
        let Some(binding) = scopes.binding(id) else {
            continue;
        };
        if !binding.kind.is_variable() {
            continue;
        }
        let Some(scope) = scopes.scope(binding.scope) else {
            continue;
        };
        if !scope.kind.is_local() || arena.is_within(scope.node, arrow) {
            continue;
        }
        let ty = cx
            .unit
            .types
            .decl_type(binding.decl)
            .filter(|ty| !ty.is_error())
            .unwrap_or(TypeId::OBJECT);
        captures.push(Capture {
            name: binding.name.clone(),
            binding: id,
            decl: binding.decl,
            ty,
        });
    }
    captures
}

/// Writes inside `arrow` to one of `captures`: the written identifier and
/// the capture's name. The lambda receives a copy, so such writes are lost
/// to the enclosing function.
#[must_use]
pub fn reassigned_captures(
    cx: &UnitCx<'_>,
    arrow: NodeIndex,
    captures: &[Capture],
) -> Vec<(NodeIndex, String)> {
    let arena = cx.arena();
    let mut out = Vec::new();
    for node in arena.descendants(arrow) {
        let target = match arena.kind(node) {
            Some(NodeKind::Assignment(assign)) => assign.target,
            Some(NodeKind::Update(update)) => update.operand,
            _ => continue,
        };
        let Some(id) = cx.unit.scopes.resolution(target) else {
            continue;
        };
        if let Some(capture) = captures.iter().find(|c| c.binding == id) {
            out.push((target, capture.name.clone()));
        }
    }
    out
}
