//! Switches over enum-like classes dispatch on ordinals.
//!
//! ```text
//! switch (c) { case Color.Red: ... }
//! ```
//! becomes
//! ```text
//! switch (c.getOrdinal()) { case 0: ... }
//! ```
//!
//! Case tests that do not name a member of the switched enum are left alone;
//! the checker already reported them.

use super::with_unit;
use crate::context::CompilationContext;
use crate::phase::Phase;
use crate::rewrite::UnitCx;
use etsl_ast::syntax::transform_utils::collect_kind;
use etsl_ast::{LiteralValue, NodeFlags, NodeIndex, NodeKind, NodeList};
use etsl_checker::{TypeData, TypeId, TypeInterner};
use etsl_common::{DeclRef, UnitId};
use tracing::{debug, trace};

pub struct EnumPostCheckPhase;

impl Phase for EnumPostCheckPhase {
    fn name(&self) -> &'static str {
        "enum-post-check"
    }

    fn perform(&self, ctx: &mut CompilationContext, unit: UnitId) -> bool {
        with_unit(ctx, unit, |cx| {
            let root = cx.root();
            let switches = collect_kind(cx.arena(), root, |k| matches!(k, NodeKind::Switch(_)));
            let mut rewritten = 0u32;
            for switch in switches {
                if lower_switch(cx, switch) {
                    rewritten += 1;
                }
            }
            debug!(rewritten, "enum switches rewritten");
        })
        .is_some()
    }

    /// No switch discriminant is still typed by an enum-like class.
    fn postcondition(&self, ctx: &CompilationContext, unit: UnitId) -> bool {
        let Some(data) = ctx.program.unit(unit) else {
            return false;
        };
        let enum_like = |decl: DeclRef| {
            ctx.program.unit(decl.unit).is_some_and(|owner| {
                owner
                    .arena
                    .flags(NodeIndex(decl.node))
                    .contains(NodeFlags::ENUM_LIKE)
            })
        };
        collect_kind(&data.arena, data.root, |k| matches!(k, NodeKind::Switch(_)))
            .into_iter()
            .filter_map(|node| data.arena.kind(node).and_then(NodeKind::as_switch))
            .filter_map(|switch| data.types.get(switch.discriminant))
            .filter_map(|ty| enum_class_of(&ctx.interner, ty))
            .all(|decl| !enum_like(decl))
    }
}

/// Declaration of the class type `ty`, if it is a class.
fn enum_class_of(interner: &TypeInterner, ty: TypeId) -> Option<DeclRef> {
    match interner.lookup(ty) {
        Some(TypeData::Class(class)) => Some(class.decl),
        _ => None,
    }
}

fn is_enum_like(cx: &UnitCx<'_>, decl: DeclRef) -> bool {
    cx.arena_of(decl.unit)
        .is_some_and(|arena| arena.flags(NodeIndex(decl.node)).contains(NodeFlags::ENUM_LIKE))
}

/// Ordinal of the enum constant a case test names: the first argument of
/// the `new E(ordinal, value)` initializing the static field.
fn case_ordinal(cx: &UnitCx<'_>, enum_decl: DeclRef, test: NodeIndex) -> Option<i32> {
    let target = cx.unit.types.member_target(test)?;
    if target.unit != enum_decl.unit {
        return None;
    }
    let arena = cx.arena_of(target.unit)?;
    let field_node = NodeIndex(target.node);
    if arena.parent(field_node) != NodeIndex(enum_decl.node) {
        return None;
    }
    let field = arena.kind(field_node).and_then(NodeKind::as_field)?;
    let new_expr = arena.kind(field.init).and_then(NodeKind::as_new)?;
    match arena.literal(*new_expr.args.first()?)? {
        LiteralValue::Int(ordinal) => Some(*ordinal),
        _ => None,
    }
}

fn lower_switch(cx: &mut UnitCx<'_>, switch: NodeIndex) -> bool {
    let Some(data) = cx.arena().kind(switch).and_then(NodeKind::as_switch).cloned() else {
        return false;
    };
    let Some(enum_decl) = cx
        .type_of(data.discriminant)
        .and_then(|ty| enum_class_of(&*cx.interner, ty))
        .filter(|&decl| is_enum_like(cx, decl))
    else {
        return false;
    };

    let mut ordinals: Vec<(NodeIndex, i32)> = Vec::with_capacity(data.cases.len());
    for &case in &data.cases {
        let Some(test) = cx
            .arena()
            .kind(case)
            .and_then(NodeKind::as_switch_case)
            .map(|c| c.test)
            .filter(|t| t.is_some())
        else {
            continue;
        };
        if let Some(ordinal) = case_ordinal(cx, enum_decl, test) {
            ordinals.push((case, ordinal));
        } else {
            trace!(case = case.0, "case test is not an enum constant");
        }
    }

    let span = cx.arena().span(data.discriminant);
    let discriminant = data.discriminant;
    let call = {
        let mut f = cx.factory(span);
        f.call_method(discriminant, "getOrdinal", NodeList::new())
    };
    cx.replace_child(switch, discriminant, call);

    for (case, ordinal) in ordinals {
        let Some(test) = cx.arena().kind(case).and_then(NodeKind::as_switch_case).map(|c| c.test)
        else {
            continue;
        };
        let literal = cx.alloc(NodeKind::Literal(LiteralValue::Int(ordinal)), test);
        cx.replace_child(case, test, literal);
    }

    cx.forget_type(switch);
    cx.recheck(switch);
    trace!(switch = switch.0, "switch dispatches on ordinals");
    true
}
