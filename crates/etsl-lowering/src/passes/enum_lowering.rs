//! Enum declarations become final classes.
//!
//! ```text
//! enum Color { Red, Green = 5 }
//! ```
//! becomes
//! ```text
//! final class Color extends BaseEnum<int> {
//!     private readonly _ordinal: int;
//!     public static readonly Red: Color = new Color(0, 0);
//!     public static readonly Green: Color = new Color(1, 5);
//!     private static readonly #NamesArray: string[] = ["Red", "Green"];
//!     private static readonly #ValuesArray: int[] = [0, 5];
//!     private static readonly #StringValuesArray: string[] = ["0", "5"];
//!     private static readonly #ItemsArray: Color[] = [Color.Red, Color.Green];
//!     private constructor(ordinal: int, value: int) { super(value); this._ordinal = ordinal; }
//!     public static getName(ordinal: int): string { ... }
//!     public static getValueOf(name: string): Color { ... }
//!     public static fromValue(value: int): Color { ... }
//!     public valueOf(): int { ... }
//!     public toString(): string { ... }
//!     public static values(): Color[] { ... }
//!     public getOrdinal(): int { ... }
//! }
//! ```
//!
//! Every synthesized node carries a zero-width span at the start of the enum.
//! The enum binding is re-pointed at the class, so references resolved
//! before the rewrite stay valid.

use super::with_unit;
use crate::context::CompilationContext;
use crate::phase::{Phase, PhaseScope};
use crate::rewrite::UnitCx;
use etsl_ast::syntax::transform_utils::collect_kind;
use etsl_ast::{
    BinaryOp, ClassDecl, EnumDecl, LiteralValue, Modifiers, NodeFactory, NodeFlags, NodeIndex,
    NodeKind, NodeList, PrimitiveKind, UpdateOp, VarKind, smallvec,
};
use etsl_binder::{BindingFlags, BindingKind};
use etsl_common::{DiagnosticCategory, UnitId, diagnostic_codes};
use tracing::{debug, trace};

const ORDINAL_FIELD: &str = "_ordinal";
const NAMES_ARRAY: &str = "#NamesArray";
const VALUES_ARRAY: &str = "#ValuesArray";
const STRING_VALUES_ARRAY: &str = "#StringValuesArray";
const ITEMS_ARRAY: &str = "#ItemsArray";

pub struct EnumLoweringPhase;

impl Phase for EnumLoweringPhase {
    fn name(&self) -> &'static str {
        "enum-lowering"
    }

    fn scope(&self) -> PhaseScope {
        PhaseScope::Declarations
    }

    fn perform(&self, ctx: &mut CompilationContext, unit: UnitId) -> bool {
        with_unit(ctx, unit, |cx| {
            let root = cx.root();
            let enums = collect_kind(cx.arena(), root, |k| matches!(k, NodeKind::Enum(_)));
            let total = enums.len();
            let mut lowered = 0usize;
            for node in enums {
                if lower_enum(cx, node) {
                    lowered += 1;
                }
            }
            debug!(lowered, rejected = total - lowered, "enums lowered");
        })
        .is_some()
    }

    /// Every enum still in the tree was rejected with an error.
    fn postcondition(&self, ctx: &CompilationContext, unit: UnitId) -> bool {
        let Some(data) = ctx.program.unit(unit) else {
            return false;
        };
        let arena = &data.arena;
        collect_kind(arena, data.root, |k| matches!(k, NodeKind::Enum(_)))
            .into_iter()
            .all(|node| {
                let span = arena.span(node);
                ctx.diagnostics.iter().any(|d| {
                    d.category == DiagnosticCategory::Error
                        && d.file == data.name
                        && d.start >= span.start
                        && d.start <= span.end
                })
            })
    }
}

/// Underlying value type of a well-formed enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EnumKind {
    Int,
    Long,
    String,
}

impl EnumKind {
    const fn primitive(self) -> PrimitiveKind {
        match self {
            EnumKind::Int => PrimitiveKind::Int,
            EnumKind::Long => PrimitiveKind::Long,
            EnumKind::String => PrimitiveKind::String,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum MemberValue {
    Numeric(i64),
    String(String),
}

impl MemberValue {
    fn literal(&self, kind: EnumKind) -> LiteralValue {
        match (self, kind) {
            (MemberValue::Numeric(v), EnumKind::Int) => LiteralValue::Int(*v as i32),
            (MemberValue::Numeric(v), _) => LiteralValue::Long(*v),
            (MemberValue::String(s), _) => LiteralValue::String(s.clone()),
        }
    }

    fn text(&self) -> String {
        match self {
            MemberValue::Numeric(v) => v.to_string(),
            MemberValue::String(s) => s.clone(),
        }
    }
}

struct EnumShape {
    kind: EnumKind,
    members: Vec<(String, MemberValue)>,
}

/// Member values of `decl`, or `None` (after reporting) when the enum
/// cannot be lowered.
fn classify(cx: &mut UnitCx<'_>, node: NodeIndex, decl: &EnumDecl) -> Option<EnumShape> {
    let mut members: Vec<(String, MemberValue)> = Vec::with_capacity(decl.members.len());
    let mut previous: Option<MemberValue> = None;
    let mut has_long = false;
    let mut valid = true;

    for &member in &decl.members {
        let Some(data) = cx.arena().kind(member).and_then(NodeKind::as_enum_member).cloned() else {
            continue;
        };
        if cx.unit.scopes.duplicates.contains(&member.0) {
            // Reported by the binder.
            valid = false;
            continue;
        }
        let value = if data.init.is_none() {
            match &previous {
                None => MemberValue::Numeric(0),
                Some(MemberValue::Numeric(v)) => MemberValue::Numeric(v.wrapping_add(1)),
                Some(MemberValue::String(_)) => {
                    cx.report(
                        member,
                        diagnostic_codes::ENUM_STRING_MEMBER_WITHOUT_INITIALIZER,
                        &[&data.name, &decl.name],
                    );
                    valid = false;
                    continue;
                }
            }
        } else {
            match cx.arena().literal(data.init).cloned() {
                Some(LiteralValue::Char(c)) => MemberValue::Numeric(i64::from(c)),
                Some(LiteralValue::Int(i)) => MemberValue::Numeric(i64::from(i)),
                Some(LiteralValue::Long(l)) => {
                    has_long = true;
                    MemberValue::Numeric(l)
                }
                Some(LiteralValue::String(s)) => MemberValue::String(s),
                _ => {
                    cx.report(
                        data.init,
                        diagnostic_codes::ENUM_INVALID_INITIALIZER,
                        &[&data.name],
                    );
                    valid = false;
                    continue;
                }
            }
        };
        if let MemberValue::Numeric(v) = &value
            && i32::try_from(*v).is_err()
        {
            has_long = true;
        }
        previous = Some(value.clone());
        members.push((data.name, value));
    }

    let numeric = members.iter().any(|(_, v)| matches!(v, MemberValue::Numeric(_)));
    let string = members.iter().any(|(_, v)| matches!(v, MemberValue::String(_)));
    if numeric && string {
        cx.report(node, diagnostic_codes::ENUM_MIXED_INITIALIZERS, &[&decl.name]);
        return None;
    }
    if !valid {
        return None;
    }
    let kind = if string {
        EnumKind::String
    } else if has_long {
        EnumKind::Long
    } else {
        EnumKind::Int
    };
    Some(EnumShape { kind, members })
}

fn lower_enum(cx: &mut UnitCx<'_>, node: NodeIndex) -> bool {
    let Some(decl) = cx.arena().kind(node).and_then(NodeKind::as_enum).cloned() else {
        return false;
    };
    let Some(shape) = classify(cx, node, &decl) else {
        trace!(name = %decl.name, "enum left in place");
        return false;
    };

    let span = cx.arena().span(node).start_point();
    let class = build_class(&mut cx.factory(span), &decl, &shape);
    if !cx.replace_in_parent(node, class) {
        return false;
    }

    if let Some(binding) = cx.binding_of_decl(node) {
        cx.unit
            .scopes
            .repoint(binding, class, BindingKind::Class, BindingFlags::ENUM_LIKE);
    }
    let unit = &mut *cx.unit;
    unit.scopes.unbind_subtree(&unit.arena, node);
    let scope = cx.enclosing_scope(class);
    cx.rescope(class, scope);
    cx.reresolve(class);
    trace!(name = %decl.name, kind = ?shape.kind, members = shape.members.len(), "enum lowered");
    true
}

fn build_class(f: &mut NodeFactory<'_>, decl: &EnumDecl, shape: &EnumShape) -> NodeIndex {
    let name = decl.name.as_str();
    let value_kind = shape.kind.primitive();
    let private_static = Modifiers::PRIVATE | Modifiers::STATIC | Modifiers::READONLY;
    let mut members = NodeList::new();

    let int_type = f.primitive(PrimitiveKind::Int);
    members.push(f.field(
        Modifiers::PRIVATE | Modifiers::READONLY,
        ORDINAL_FIELD,
        int_type,
        NodeIndex::NONE,
    ));

    for (ordinal, (member, value)) in shape.members.iter().enumerate() {
        let ordinal = f.int(ordinal as i32);
        let value = f.literal(value.literal(shape.kind));
        let init = f.new_instance(name, NodeList::new(), smallvec![ordinal, value]);
        let ty = f.type_ref(name, NodeList::new());
        members.push(f.field(
            Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::READONLY,
            member.as_str(),
            ty,
            init,
        ));
    }

    let names: NodeList = shape.members.iter().map(|(m, _)| f.string(m.as_str())).collect();
    let values: NodeList = shape
        .members
        .iter()
        .map(|(_, v)| f.literal(v.literal(shape.kind)))
        .collect();
    let texts: NodeList = shape.members.iter().map(|(_, v)| f.string(v.text())).collect();
    let items: NodeList = shape
        .members
        .iter()
        .map(|(m, _)| f.static_member(name, m.as_str()))
        .collect();
    let name_type = f.primitive(PrimitiveKind::String);
    let value_type = f.primitive(value_kind);
    let text_type = f.primitive(PrimitiveKind::String);
    let item_type = f.type_ref(name, NodeList::new());
    let arrays = [
        (NAMES_ARRAY, name_type, names),
        (VALUES_ARRAY, value_type, values),
        (STRING_VALUES_ARRAY, text_type, texts),
        (ITEMS_ARRAY, item_type, items),
    ];
    for (field, element, elements) in arrays {
        let ty = f.array_type(element);
        let init = f.array(elements);
        members.push(f.field(private_static, field, ty, init));
    }

    members.push(build_constructor(f, value_kind));
    members.push(build_get_name(f, name));
    members.push(build_lookup(
        f,
        name,
        ("getValueOf", "name", PrimitiveKind::String),
        NAMES_ARRAY,
        format!("No enum constant {name}."),
    ));
    members.push(build_lookup(
        f,
        name,
        ("fromValue", "value", value_kind),
        VALUES_ARRAY,
        format!("No enum {name} with value "),
    ));
    members.push(build_instance_getter(f, name, "valueOf", value_kind, VALUES_ARRAY));
    members.push(build_instance_getter(
        f,
        name,
        "toString",
        PrimitiveKind::String,
        STRING_VALUES_ARRAY,
    ));
    members.push(build_values(f, name));
    members.push(build_get_ordinal(f));

    let value_type = f.primitive(value_kind);
    let extends = f.type_ref("BaseEnum", smallvec![value_type]);
    f.class(
        ClassDecl {
            modifiers: Modifiers::FINAL | (decl.modifiers & (Modifiers::EXPORT | Modifiers::DECLARE)),
            name: decl.name.clone(),
            type_params: NodeList::new(),
            extends,
            implements: NodeList::new(),
            members,
            annotations: NodeList::new(),
        },
        NodeFlags::ENUM_LIKE,
    )
}

/// `private constructor(ordinal: int, value: T) { super(value); this._ordinal = ordinal; }`
fn build_constructor(f: &mut NodeFactory<'_>, value_kind: PrimitiveKind) -> NodeIndex {
    let int_type = f.primitive(PrimitiveKind::Int);
    let ordinal = f.param("ordinal", int_type);
    let value_type = f.primitive(value_kind);
    let value = f.param("value", value_type);

    let callee = f.super_();
    let arg = f.ident("value");
    let super_call = f.call(callee, smallvec![arg]);
    let super_stmt = f.expr_stmt(super_call);
    let target = f.this_member(ORDINAL_FIELD);
    let source = f.ident("ordinal");
    let assign = f.assign(target, source);
    let assign_stmt = f.expr_stmt(assign);
    let body = f.block(smallvec![super_stmt, assign_stmt]);
    f.constructor(Modifiers::PRIVATE, smallvec![ordinal, value], body)
}

/// `E.#Array[index]`
fn array_element(f: &mut NodeFactory<'_>, class: &str, array: &str, index: NodeIndex) -> NodeIndex {
    let array = f.static_member(class, array);
    f.index(array, index)
}

/// `public static getName(ordinal: int): string { return E.#NamesArray[ordinal]; }`
fn build_get_name(f: &mut NodeFactory<'_>, class: &str) -> NodeIndex {
    let int_type = f.primitive(PrimitiveKind::Int);
    let param = f.param("ordinal", int_type);
    let index = f.ident("ordinal");
    let element = array_element(f, class, NAMES_ARRAY, index);
    let ret = f.ret(element);
    let body = f.block(smallvec![ret]);
    let string_type = f.primitive(PrimitiveKind::String);
    f.simple_method(
        Modifiers::PUBLIC | Modifiers::STATIC,
        "getName",
        smallvec![param],
        string_type,
        body,
    )
}

/// Static lookup over one of the arrays, throwing when nothing matches:
///
/// ```text
/// public static getValueOf(name: string): E {
///     for (let i: int = 0; i < E.#NamesArray.length; i++) {
///         if (name == E.#NamesArray[i]) { return E.#ItemsArray[i]; }
///     }
///     throw new Error("No enum constant E." + name);
/// }
/// ```
fn build_lookup(
    f: &mut NodeFactory<'_>,
    class: &str,
    (method, param_name, param_kind): (&str, &str, PrimitiveKind),
    array: &str,
    message: String,
) -> NodeIndex {
    let param_type = f.primitive(param_kind);
    let param = f.param(param_name, param_type);

    let int_type = f.primitive(PrimitiveKind::Int);
    let zero = f.int(0);
    let init = f.var(VarKind::Let, "i", int_type, zero);
    let counter = f.ident("i");
    let array_ref = f.static_member(class, array);
    let length = f.member(array_ref, "length");
    let test = f.binary(BinaryOp::Lt, counter, length);
    let counter = f.ident("i");
    let update = f.update(UpdateOp::Increment, false, counter);

    let lookup = f.ident(param_name);
    let counter = f.ident("i");
    let candidate = array_element(f, class, array, counter);
    let matches = f.binary(BinaryOp::Eq, lookup, candidate);
    let counter = f.ident("i");
    let item = array_element(f, class, ITEMS_ARRAY, counter);
    let found = f.ret(item);
    let found = f.block(smallvec![found]);
    let check = f.if_(matches, found, NodeIndex::NONE);
    let loop_body = f.block(smallvec![check]);
    let search = f.for_(init, test, update, loop_body);

    let prefix = f.string(message);
    let lookup = f.ident(param_name);
    let message = f.binary(BinaryOp::Add, prefix, lookup);
    let fail = f.throw_error(message);

    let body = f.block(smallvec![search, fail]);
    let ret_type = f.type_ref(class, NodeList::new());
    f.simple_method(
        Modifiers::PUBLIC | Modifiers::STATIC,
        method,
        smallvec![param],
        ret_type,
        body,
    )
}

/// `public name(): T { return E.#Array[this._ordinal]; }`
fn build_instance_getter(
    f: &mut NodeFactory<'_>,
    class: &str,
    method: &str,
    ret_kind: PrimitiveKind,
    array: &str,
) -> NodeIndex {
    let ordinal = f.this_member(ORDINAL_FIELD);
    let element = array_element(f, class, array, ordinal);
    let ret = f.ret(element);
    let body = f.block(smallvec![ret]);
    let ret_type = f.primitive(ret_kind);
    f.simple_method(Modifiers::PUBLIC, method, NodeList::new(), ret_type, body)
}

/// `public static values(): E[] { return E.#ItemsArray; }`
fn build_values(f: &mut NodeFactory<'_>, class: &str) -> NodeIndex {
    let items = f.static_member(class, ITEMS_ARRAY);
    let ret = f.ret(items);
    let body = f.block(smallvec![ret]);
    let element = f.type_ref(class, NodeList::new());
    let ret_type = f.array_type(element);
    f.simple_method(
        Modifiers::PUBLIC | Modifiers::STATIC,
        "values",
        NodeList::new(),
        ret_type,
        body,
    )
}

/// `public getOrdinal(): int { return this._ordinal; }`
fn build_get_ordinal(f: &mut NodeFactory<'_>) -> NodeIndex {
    let ordinal = f.this_member(ORDINAL_FIELD);
    let ret = f.ret(ordinal);
    let body = f.block(smallvec![ret]);
    let int_type = f.primitive(PrimitiveKind::Int);
    f.simple_method(Modifiers::PUBLIC, "getOrdinal", NodeList::new(), int_type, body)
}

