//! `Map`/`Record` object literals become `set` chains.
//!
//! ```text
//! let r: Record<string, int> = { a: 1, "b": 2 };
//! ```
//! becomes
//! ```text
//! let r: Record<string, int> = new Record<string, int>().set("a", 1).set("b", 2);
//! ```
//!
//! Nested literals are lowered innermost first, so an outer chain receives
//! already lowered values.

use super::with_unit;
use crate::context::CompilationContext;
use crate::phase::Phase;
use crate::rewrite::UnitCx;
use etsl_ast::syntax::transform_utils::collect_kind;
use etsl_ast::{LiteralValue, NewExpr, NodeArena, NodeIndex, NodeKind, NodeList, PropertyKey, smallvec};
use etsl_checker::{BuiltinKind, TypeId, TypeInterner};
use etsl_common::UnitId;
use tracing::{debug, trace};

pub struct RecordLoweringPhase;

impl Phase for RecordLoweringPhase {
    fn name(&self) -> &'static str {
        "record-lowering"
    }

    fn perform(&self, ctx: &mut CompilationContext, unit: UnitId) -> bool {
        with_unit(ctx, unit, |cx| {
            let root = cx.root();
            let mut literals =
                collect_kind(cx.arena(), root, |k| matches!(k, NodeKind::ObjectLiteral(_)));
            // Pre-order reversed visits nested literals before their parents.
            literals.reverse();
            let mut lowered = 0u32;
            for literal in literals {
                if lower_literal(cx, literal) {
                    lowered += 1;
                }
            }
            debug!(lowered, "record literals lowered");
        })
        .is_some()
    }

    /// No object literal typed as a keyed collection is left.
    fn postcondition(&self, ctx: &CompilationContext, unit: UnitId) -> bool {
        let Some(data) = ctx.program.unit(unit) else {
            return false;
        };
        collect_kind(&data.arena, data.root, |k| matches!(k, NodeKind::ObjectLiteral(_)))
            .into_iter()
            .filter(|&node| lowerable(&data.arena, node))
            .all(|node| {
                data.types
                    .get(node)
                    .is_none_or(|ty| keyed_collection(&ctx.interner, ty).is_none())
            })
    }
}

fn keyed_collection(interner: &TypeInterner, ty: TypeId) -> Option<BuiltinKind> {
    interner
        .builtin_kind(ty)
        .map(|(kind, _)| kind)
        .filter(|kind| kind.is_keyed_collection())
}

/// Only literals made of plain properties are rewritten.
fn lowerable(arena: &NodeArena, node: NodeIndex) -> bool {
    arena
        .kind(node)
        .and_then(NodeKind::as_object_literal)
        .is_some_and(|object| {
            object
                .properties
                .iter()
                .all(|&p| matches!(arena.kind(p), Some(NodeKind::Property(_))))
        })
}

fn lower_literal(cx: &mut UnitCx<'_>, literal: NodeIndex) -> bool {
    let Some(ty) = cx.type_of(literal) else {
        return false;
    };
    if keyed_collection(&*cx.interner, ty).is_none() {
        return false;
    }
    if !lowerable(cx.arena(), literal) {
        trace!(node = literal.0, "record literal with spread kept");
        return false;
    }
    let Some(properties) = cx
        .arena()
        .kind(literal)
        .and_then(NodeKind::as_object_literal)
        .map(|o| o.properties.clone())
    else {
        return false;
    };

    let span = cx.arena().span(literal);
    let type_ref = cx.type_node(ty, span);
    let mut chain = cx.alloc(
        NodeKind::New(NewExpr {
            type_ref,
            args: NodeList::new(),
        }),
        literal,
    );
    for property in properties {
        let Some(prop) = cx.arena().kind(property).and_then(NodeKind::as_property).cloned() else {
            continue;
        };
        let key = match prop.key {
            PropertyKey::Name(name) => LiteralValue::String(name),
            PropertyKey::Literal(value) => value,
        };
        let key = cx.alloc(NodeKind::Literal(key), property);
        let prop_span = cx.arena().span(property);
        let mut f = cx.factory(prop_span);
        chain = f.call_method(chain, "set", smallvec![key, prop.value]);
    }

    if !cx.replace_in_parent(literal, chain) {
        return false;
    }
    cx.rebind(chain);
    cx.recheck(chain);
    trace!(node = literal.0, "record literal lowered");
    true
}
