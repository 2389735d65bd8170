//! Closure conversion.
//!
//! Runs in three steps over the unit:
//!
//! 1. References to functions and methods used as values are wrapped in an
//!    equivalent arrow: `run(f)` becomes `run((p0: int): int => { return f(p0); })`.
//! 2. Calls through function-typed values use the `invoke` family:
//!    `g(1, 2)` becomes `g.invoke2(1, 2)`, and with a rest parameter
//!    `g(1, 2, 3)` becomes `g.invoke1R(1, [2, 3])`.
//! 3. Every arrow, innermost first, becomes an instance of a lambda class:
//!
//! ```text
//! class C {
//!     m(k: int): (x: int) => int { return (x: int): int => { return x + k; }; }
//! }
//! ```
//! becomes
//! ```text
//! class C {
//!     m(k: int): (x: int) => int { return new LambdaObject$0(k); }
//!     private static lambda$invoke$0(k: int, x: int): int { return x + k; }
//! }
//! final class LambdaObject$0 implements (p0: int) => int {
//!     private readonly k: int;
//!     constructor(k: int) { this.k = k; }
//!     public invoke1(x: int): int { return C.lambda$invoke$0(this.k, x); }
//!     public invoke(args: Object[]): Object { return C.lambda$invoke$0(this.k, args[0] as int) as Object; }
//! }
//! ```
//!
//! The callee is an instance method reached through a `$this` field when the
//! arrow uses `this` or `super`, and a module-level function when there is no
//! enclosing class. Type parameters of the enclosing generic method (and of
//! the class, where the arrow can see them) are cloned into the lambda class
//! and the callee.

use super::free_vars::{Capture, free_variables, reassigned_captures};
use super::with_unit;
use crate::context::CompilationContext;
use crate::phase::Phase;
use crate::rewrite::UnitCx;
use etsl_ast::syntax::transform_utils::{collect_kind, contains_this_reference, enclosing_class};
use etsl_ast::{
    ArrayLiteral, ArrowFunction, CallExpr, ClassDecl, FunctionDecl, MethodDecl, MethodKind,
    Modifiers, NewExpr, NodeArena, NodeFlags, NodeIndex, NodeKind, NodeList, PrimitiveKind,
    smallvec,
};
use etsl_binder::BindingKind;
use etsl_checker::{FunctionShape, TypeId};
use etsl_common::{Span, UnitId, diagnostic_codes};
use tracing::{debug, trace};

const THIS_FIELD: &str = "$this";
const CALLEE_PREFIX: &str = "lambda$invoke";
const CLASS_PREFIX: &str = "LambdaObject";
const GENERIC_INVOKE_PARAM: &str = "args";

pub struct LambdaLoweringPhase;

impl Phase for LambdaLoweringPhase {
    fn name(&self) -> &'static str {
        "lambda-lowering"
    }

    fn perform(&self, ctx: &mut CompilationContext, unit: UnitId) -> bool {
        with_unit(ctx, unit, |cx| {
            let wrapped = wrap_function_references(cx);
            let calls = rewrite_indirect_calls(cx);
            let root = cx.root();
            let mut arrows = collect_kind(cx.arena(), root, |k| matches!(k, NodeKind::Arrow(_)));
            // Reversed pre-order lowers nested arrows before the arrows
            // containing them.
            arrows.reverse();
            let mut converted = 0u32;
            for arrow in arrows {
                if lower_arrow(cx, arrow) {
                    converted += 1;
                }
            }
            debug!(wrapped, calls, converted, "lambdas lowered");
        })
        .is_some()
    }

    /// No arrow function is reachable from the root.
    fn postcondition(&self, ctx: &CompilationContext, unit: UnitId) -> bool {
        ctx.program.unit(unit).is_some_and(|data| {
            collect_kind(&data.arena, data.root, |k| matches!(k, NodeKind::Arrow(_))).is_empty()
        })
    }
}

// =============================================================================
// Function references and indirect calls
// =============================================================================

/// Whether `node` names a function or method declaration directly.
fn is_direct_reference(cx: &UnitCx<'_>, node: NodeIndex) -> bool {
    match cx.arena().kind(node) {
        Some(NodeKind::Identifier(_)) => match cx.resolved_binding(node) {
            Some(binding) if binding.kind == BindingKind::Function => true,
            Some(binding) if binding.kind == BindingKind::Import => {
                binding.origin.is_some_and(|origin| {
                    cx.arena_of(origin.unit)
                        .and_then(|arena| arena.kind(NodeIndex(origin.node)))
                        .is_some_and(|kind| matches!(kind, NodeKind::Function(_)))
                })
            }
            _ => false,
        },
        Some(NodeKind::Member(_)) => cx.unit.types.member_target(node).is_some_and(|target| {
            cx.arena_of(target.unit)
                .and_then(|arena| arena.kind(NodeIndex(target.node)))
                .and_then(NodeKind::as_method)
                .is_some_and(|method| method.kind == MethodKind::Method)
        }),
        _ => false,
    }
}

fn is_callee(arena: &NodeArena, node: NodeIndex) -> bool {
    arena
        .kind(arena.parent(node))
        .and_then(NodeKind::as_call)
        .is_some_and(|call| call.callee == node)
}

fn is_member_object(arena: &NodeArena, node: NodeIndex) -> bool {
    arena
        .kind(arena.parent(node))
        .and_then(NodeKind::as_member)
        .is_some_and(|member| member.object == node)
}

fn function_shape(cx: &UnitCx<'_>, node: NodeIndex) -> Option<FunctionShape> {
    let ty = cx.type_of(node)?;
    cx.interner.function_shape(ty).cloned()
}

/// Wrap value uses of functions and methods in arrows. Returns the number
/// of wrapped references.
fn wrap_function_references(cx: &mut UnitCx<'_>) -> u32 {
    let root = cx.root();
    let candidates: Vec<NodeIndex> = collect_kind(cx.arena(), root, |k| {
        matches!(k, NodeKind::Identifier(_) | NodeKind::Member(_))
    })
    .into_iter()
    .filter(|&node| {
        !is_callee(cx.arena(), node)
            && !is_member_object(cx.arena(), node)
            && is_direct_reference(cx, node)
    })
    .collect();

    let mut wrapped = 0u32;
    for node in candidates {
        let Some(shape) = function_shape(cx, node) else {
            continue;
        };
        if !shape.type_params.is_empty() {
            trace!(node = node.0, "generic function reference kept");
            continue;
        }
        if wrap_reference(cx, node, &shape) {
            wrapped += 1;
        }
    }
    wrapped
}

fn wrap_reference(cx: &mut UnitCx<'_>, node: NodeIndex, shape: &FunctionShape) -> bool {
    let parent = cx.arena().parent(node);
    if parent.is_none() {
        return false;
    }
    let span = cx.arena().span(node);
    let annotations: Vec<NodeIndex> = shape
        .params
        .iter()
        .map(|param| cx.type_node(param.ty, span))
        .collect();
    let return_type = cx.type_node(shape.ret, span);

    let mut f = cx.factory(span);
    let mut params = NodeList::new();
    let mut args = NodeList::new();
    for (index, (param, annotation)) in shape.params.iter().zip(annotations).enumerate() {
        let name = format!("p{index}");
        let decl = if param.rest {
            f.rest_param(name.as_str(), annotation)
        } else {
            f.param(name.as_str(), annotation)
        };
        if param.optional
            && let Some(NodeKind::Parameter(p)) = f.arena().kind_mut(decl)
        {
            p.optional = true;
        }
        params.push(decl);
        let arg = f.ident(name);
        args.push(if param.rest { f.spread(arg) } else { arg });
    }
    let call = f.call(node, args);
    let statement = if shape.ret == TypeId::VOID {
        f.expr_stmt(call)
    } else {
        f.ret(call)
    };
    let body = f.block(smallvec![statement]);
    let arrow = f.node(NodeKind::Arrow(ArrowFunction {
        type_params: NodeList::new(),
        params,
        return_type,
        body,
    }));

    if !cx.replace_child(parent, node, arrow) {
        return false;
    }
    cx.rebind(arrow);
    cx.recheck(arrow);
    trace!(node = node.0, arrow = arrow.0, "function reference wrapped");
    true
}

/// `invoke` method selected for a call with `args` against `shape`, and
/// whether the trailing arguments are packed into a rest array.
fn select_invoke(cx: &UnitCx<'_>, shape: &FunctionShape, args: &[NodeIndex]) -> Option<(String, bool)> {
    let fixed = shape.fixed_count();
    let is_spread = |arg: &NodeIndex| matches!(cx.arena().kind(*arg), Some(NodeKind::Spread(_)));
    if args.iter().take(fixed).any(is_spread) {
        return None;
    }
    let spreads_rest = args.iter().skip(fixed).any(is_spread);
    if shape.rest().is_some() && (args.len() > fixed || spreads_rest) {
        return Some((format!("invoke{fixed}R"), true));
    }
    if spreads_rest || args.len() < shape.required_count() || args.len() > fixed {
        return None;
    }
    Some((format!("invoke{}", args.len()), false))
}

/// Rewrite calls whose callee is a function-typed value. Returns the number
/// of rewritten calls.
fn rewrite_indirect_calls(cx: &mut UnitCx<'_>) -> u32 {
    let root = cx.root();
    let calls = collect_kind(cx.arena(), root, |k| matches!(k, NodeKind::Call(_)));
    let mut rewritten = 0u32;
    for call in calls {
        if rewrite_call(cx, call) {
            rewritten += 1;
        }
    }
    rewritten
}

fn rewrite_call(cx: &mut UnitCx<'_>, call: NodeIndex) -> bool {
    let Some(data) = cx.arena().kind(call).and_then(NodeKind::as_call).cloned() else {
        return false;
    };
    if matches!(cx.arena().kind(data.callee), Some(NodeKind::Super))
        || is_direct_reference(cx, data.callee)
    {
        return false;
    }
    let Some(shape) = function_shape(cx, data.callee) else {
        return false;
    };
    let Some((method, packs_rest)) = select_invoke(cx, &shape, &data.args) else {
        trace!(call = call.0, "call arity has no invoke method");
        return false;
    };

    let span = cx.arena().span(call);
    let mut args: NodeList = data.args.iter().copied().take(shape.fixed_count()).collect();
    if packs_rest {
        let rest = &data.args[shape.fixed_count()..];
        let single_spread = match rest {
            [only] => cx
                .arena()
                .kind(*only)
                .and_then(|k| match k {
                    NodeKind::Spread(spread) => Some(spread.expr),
                    _ => None,
                }),
            _ => None,
        };
        let packed = match single_spread {
            Some(expr) => expr,
            None => cx.factory(span).node(NodeKind::ArrayLiteral(ArrayLiteral {
                elements: rest.iter().copied().collect(),
            })),
        };
        args.push(packed);
    }

    let replacement = {
        let mut f = cx.factory(span);
        let callee = f.member(data.callee, method.as_str());
        f.node(NodeKind::Call(CallExpr {
            callee,
            type_args: data.type_args.clone(),
            args,
        }))
    };
    if !cx.replace_in_parent(call, replacement) {
        return false;
    }
    cx.recheck(replacement);
    trace!(call = call.0, %method, "indirect call rewritten");
    true
}

// =============================================================================
// Arrow conversion
// =============================================================================

/// Where a type annotation for a synthesized declaration comes from.
#[derive(Clone, Copy, Debug)]
enum TypeSource {
    /// Clone of an annotation written in the source.
    Node(NodeIndex),
    /// Annotation synthesized from a checked type.
    Type(TypeId),
}

impl TypeSource {
    fn build(self, cx: &mut UnitCx<'_>, span: Span) -> NodeIndex {
        match self {
            TypeSource::Node(node) => cx.clone_subtree(node),
            TypeSource::Type(ty) => cx.type_node(ty, span),
        }
    }
}

struct ParamSig {
    name: String,
    ty: TypeSource,
    optional: bool,
    rest: bool,
}

/// Call signature of the arrow being converted.
struct Signature {
    params: Vec<ParamSig>,
    ret: TypeSource,
    is_void: bool,
}

impl Signature {
    fn fixed(&self) -> impl Iterator<Item = &ParamSig> {
        self.params.iter().filter(|p| !p.rest)
    }

    fn fixed_count(&self) -> usize {
        self.fixed().count()
    }

    fn required_count(&self) -> usize {
        self.fixed().take_while(|p| !p.optional).count()
    }

    fn rest(&self) -> Option<&ParamSig> {
        self.params.iter().find(|p| p.rest)
    }
}

/// Read the signature of `arrow`, annotating unannotated parameters and the
/// return type with their checked types so the moved body keeps them.
fn signature_of(cx: &mut UnitCx<'_>, arrow: NodeIndex, data: &mut ArrowFunction) -> Signature {
    let span = cx.arena().span(arrow).start_point();
    let shape = function_shape(cx, arrow);
    let mut params = Vec::with_capacity(data.params.len());
    for (index, &param) in data.params.iter().enumerate() {
        let Some(decl) = cx.arena().kind(param).and_then(NodeKind::as_parameter).cloned() else {
            continue;
        };
        let checked = shape
            .as_ref()
            .and_then(|s| s.params.get(index))
            .map_or(TypeId::OBJECT, |p| p.ty);
        let ty = if decl.type_annotation.is_some() {
            TypeSource::Node(decl.type_annotation)
        } else {
            let annotation = cx.type_node(checked, span);
            if let Some(NodeKind::Parameter(p)) = cx.arena_mut().kind_mut(param) {
                p.type_annotation = annotation;
            }
            cx.attach(param, annotation);
            TypeSource::Type(checked)
        };
        params.push(ParamSig {
            name: decl.name,
            ty,
            optional: decl.optional || decl.init.is_some(),
            rest: decl.rest,
        });
    }

    let checked_ret = shape.as_ref().map_or(TypeId::OBJECT, |s| s.ret);
    let is_void = match cx.arena().kind(data.return_type) {
        Some(NodeKind::PrimitiveType(kind)) => *kind == PrimitiveKind::Void,
        _ => checked_ret == TypeId::VOID,
    };
    let ret = if data.return_type.is_some() {
        TypeSource::Node(data.return_type)
    } else {
        data.return_type = cx.type_node(checked_ret, span);
        TypeSource::Type(checked_ret)
    };
    Signature { params, ret, is_void }
}

/// How lambda-class methods reach the callee.
enum CalleeOwner {
    /// `C.lambda$invoke$N(...)`
    Static(String),
    /// `this.$this.lambda$invoke$N(...)`
    Instance,
    /// `lambda$invoke$N(...)`
    Module,
}

/// Lexical surroundings of an arrow.
struct LambdaEnv {
    class: Option<NodeIndex>,
    class_name: String,
    /// Type parameters of the enclosing class visible at the arrow.
    class_type_params: NodeList,
    /// Type parameters of the nearest enclosing function or method.
    method_type_params: NodeList,
    captures_this: bool,
}

impl LambdaEnv {
    fn of(arena: &NodeArena, arrow: NodeIndex) -> Self {
        let class = enclosing_class(arena, arrow);
        let class_decl = class.and_then(|c| arena.kind(c)).and_then(NodeKind::as_class);
        let mut method_type_params = NodeList::new();
        let mut is_static = false;
        for ancestor in arena.ancestors(arrow) {
            match arena.kind(ancestor) {
                Some(NodeKind::Function(function)) => {
                    method_type_params = function.type_params.clone();
                    break;
                }
                Some(NodeKind::Method(method)) => {
                    method_type_params = method.type_params.clone();
                    is_static = method.modifiers.contains(Modifiers::STATIC);
                    break;
                }
                Some(NodeKind::Field(field)) => {
                    is_static = field.modifiers.contains(Modifiers::STATIC);
                    break;
                }
                _ => {}
            }
        }
        let class_type_params = match class_decl {
            Some(decl) if !is_static => decl.type_params.clone(),
            _ => NodeList::new(),
        };
        LambdaEnv {
            class,
            class_name: class_decl.map(|d| d.name.clone()).unwrap_or_default(),
            class_type_params,
            method_type_params,
            captures_this: class.is_some() && !is_static && contains_this_reference(arena, arrow),
        }
    }

    fn owner(&self) -> CalleeOwner {
        match self.class {
            None => CalleeOwner::Module,
            Some(_) if self.captures_this => CalleeOwner::Instance,
            Some(_) => CalleeOwner::Static(self.class_name.clone()),
        }
    }

    /// Type parameters the lambda class declares, in order.
    fn lambda_type_params(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.method_type_params
            .iter()
            .chain(&self.class_type_params)
            .copied()
    }

    /// Type parameters the callee declares: the class ones are only needed
    /// when the callee is not an instance method.
    fn callee_type_params(&self) -> NodeList {
        if self.captures_this {
            self.method_type_params.clone()
        } else {
            self.lambda_type_params().collect()
        }
    }
}

fn type_param_names(arena: &NodeArena, params: impl IntoIterator<Item = NodeIndex>) -> Vec<String> {
    params
        .into_iter()
        .filter_map(|tp| arena.kind(tp).and_then(NodeKind::as_type_parameter))
        .map(|tp| tp.name.clone())
        .collect()
}

fn clone_all(cx: &mut UnitCx<'_>, nodes: impl IntoIterator<Item = NodeIndex>) -> NodeList {
    nodes.into_iter().map(|node| cx.clone_subtree(node)).collect()
}

/// Annotation of the local a capture refers to.
fn capture_type(cx: &UnitCx<'_>, capture: &Capture) -> TypeSource {
    let annotation = match cx.arena().kind(capture.decl) {
        Some(NodeKind::Parameter(param)) => param.type_annotation,
        Some(NodeKind::Variable(var)) => var.type_annotation,
        _ => NodeIndex::NONE,
    };
    if annotation.is_some() {
        TypeSource::Node(annotation)
    } else {
        TypeSource::Type(capture.ty)
    }
}

/// `TypeReference` nodes naming `names`.
fn type_refs(cx: &mut UnitCx<'_>, span: Span, names: &[String]) -> NodeList {
    let mut f = cx.factory(span);
    names
        .iter()
        .map(|name| f.type_ref(name.as_str(), NodeList::new()))
        .collect()
}

/// Everything lambda-class methods need to forward a call to the callee.
struct Forward<'s> {
    callee: &'s str,
    owner: &'s CalleeOwner,
    type_args: &'s [String],
    captures: &'s [Capture],
    is_void: bool,
}

impl Forward<'_> {
    /// `target<type_args>(this.c0, ..., args...)`
    fn call(&self, cx: &mut UnitCx<'_>, span: Span, args: NodeList) -> NodeIndex {
        let type_args = type_refs(cx, span, self.type_args);
        let mut f = cx.factory(span);
        let callee = match self.owner {
            CalleeOwner::Static(class) => f.static_member(class, self.callee),
            CalleeOwner::Instance => {
                let this = f.this_member(THIS_FIELD);
                f.member(this, self.callee)
            }
            CalleeOwner::Module => f.ident(self.callee),
        };
        let mut all_args: NodeList = self
            .captures
            .iter()
            .map(|capture| f.this_member(capture.name.as_str()))
            .collect();
        all_args.extend(args);
        f.node(NodeKind::Call(CallExpr {
            callee,
            type_args,
            args: all_args,
        }))
    }

    /// Method forwarding `params` (already built) to the callee.
    fn method(
        &self,
        cx: &mut UnitCx<'_>,
        span: Span,
        name: &str,
        params: NodeList,
        args: NodeList,
        return_type: NodeIndex,
    ) -> NodeIndex {
        let call = self.call(cx, span, args);
        let mut f = cx.factory(span);
        let statement = if self.is_void {
            f.expr_stmt(call)
        } else {
            f.ret(call)
        };
        let body = f.block(smallvec![statement]);
        f.simple_method(Modifiers::PUBLIC, name, params, return_type, body)
    }
}

/// `invoke{n}` for every arity from the required to the fixed parameter
/// count.
fn build_arity_invokes(cx: &mut UnitCx<'_>, span: Span, sig: &Signature, fwd: &Forward<'_>) -> Vec<NodeIndex> {
    let mut methods = Vec::new();
    let fixed: Vec<(String, TypeSource)> = sig.fixed().map(|p| (p.name.clone(), p.ty)).collect();
    for arity in sig.required_count()..=sig.fixed_count() {
        let mut params = NodeList::new();
        let mut args = NodeList::new();
        for (name, ty) in &fixed[..arity] {
            let annotation = ty.build(cx, span);
            let mut f = cx.factory(span);
            params.push(f.param(name.as_str(), annotation));
            args.push(f.ident(name.as_str()));
        }
        let return_type = sig.ret.build(cx, span);
        methods.push(fwd.method(cx, span, &format!("invoke{arity}"), params, args, return_type));
    }
    methods
}

/// `invoke{k}R(fixed..., rest: T[])` forwarding the rest array spread.
fn build_rest_invoke(cx: &mut UnitCx<'_>, span: Span, sig: &Signature, fwd: &Forward<'_>) -> Option<NodeIndex> {
    let rest = sig.rest()?;
    let mut params = NodeList::new();
    let mut args = NodeList::new();
    for param in sig.fixed() {
        let annotation = param.ty.build(cx, span);
        let mut f = cx.factory(span);
        params.push(f.param(param.name.as_str(), annotation));
        args.push(f.ident(param.name.as_str()));
    }
    let annotation = rest.ty.build(cx, span);
    {
        let mut f = cx.factory(span);
        params.push(f.param(rest.name.as_str(), annotation));
        let rest_ref = f.ident(rest.name.as_str());
        args.push(f.spread(rest_ref));
    }
    let return_type = sig.ret.build(cx, span);
    let name = format!("invoke{}R", sig.fixed_count());
    Some(fwd.method(cx, span, &name, params, args, return_type))
}

/// `invoke(args: Object[]): Object`, unboxing every argument with `as`.
fn build_generic_invoke(cx: &mut UnitCx<'_>, span: Span, sig: &Signature, fwd: &Forward<'_>) -> NodeIndex {
    let mut args = NodeList::new();
    for (index, param) in sig.fixed().enumerate() {
        let annotation = param.ty.build(cx, span);
        let mut f = cx.factory(span);
        let array = f.ident(GENERIC_INVOKE_PARAM);
        let position = f.int(index as i32);
        let element = f.index(array, position);
        args.push(f.as_cast(element, annotation));
    }
    if let Some(rest) = sig.rest() {
        let annotation = rest.ty.build(cx, span);
        let mut f = cx.factory(span);
        let array = f.ident(GENERIC_INVOKE_PARAM);
        let start = f.int(sig.fixed_count() as i32);
        let tail = f.call_method(array, "slice", smallvec![start]);
        let cast = f.as_cast(tail, annotation);
        args.push(f.spread(cast));
    }
    let call = fwd.call(cx, span, args);

    let mut f = cx.factory(span);
    let body = if fwd.is_void {
        let statement = f.expr_stmt(call);
        let undefined = f.undefined();
        let ret = f.ret(undefined);
        f.block(smallvec![statement, ret])
    } else {
        let object = f.type_ref("Object", NodeList::new());
        let boxed = f.as_cast(call, object);
        let ret = f.ret(boxed);
        f.block(smallvec![ret])
    };
    let element = f.type_ref("Object", NodeList::new());
    let param_type = f.array_type(element);
    let param = f.param(GENERIC_INVOKE_PARAM, param_type);
    let return_type = f.type_ref("Object", NodeList::new());
    f.simple_method(Modifiers::PUBLIC, "invoke", smallvec![param], return_type, body)
}

/// The function type the lambda class implements.
fn build_function_type(cx: &mut UnitCx<'_>, span: Span, sig: &Signature) -> NodeIndex {
    let mut params = NodeList::new();
    for (index, param) in sig.params.iter().enumerate() {
        let annotation = param.ty.build(cx, span);
        let mut f = cx.factory(span);
        let name = format!("p{index}");
        let decl = if param.rest {
            f.rest_param(name, annotation)
        } else {
            f.param(name, annotation)
        };
        if param.optional
            && let Some(NodeKind::Parameter(p)) = f.arena().kind_mut(decl)
        {
            p.optional = true;
        }
        params.push(decl);
    }
    let ret = sig.ret.build(cx, span);
    cx.factory(span).function_type(params, ret)
}

fn lower_arrow(cx: &mut UnitCx<'_>, arrow: NodeIndex) -> bool {
    let Some(mut data) = cx.arena().kind(arrow).and_then(NodeKind::as_arrow).cloned() else {
        return false;
    };
    if cx.arena().parent(arrow).is_none() {
        return false;
    }
    let span = cx.arena().span(arrow).start_point();

    let captures = free_variables(cx, arrow);
    for (node, name) in reassigned_captures(cx, arrow, &captures) {
        cx.report(node, diagnostic_codes::CAPTURED_VARIABLE_REASSIGNED, &[name.as_str()]);
    }
    let env = LambdaEnv::of(cx.arena(), arrow);
    let sig = signature_of(cx, arrow, &mut data);
    let capture_types: Vec<TypeSource> = captures.iter().map(|c| capture_type(cx, c)).collect();

    let callee_name = cx.fresh_name(CALLEE_PREFIX);
    let class_name = cx.fresh_name(CLASS_PREFIX);
    let lambda_tp_names = type_param_names(cx.arena(), env.lambda_type_params());
    let callee_tp_names = type_param_names(cx.arena(), env.callee_type_params());
    let class_tp_names = type_param_names(cx.arena(), env.class_type_params.iter().copied());

    // The body moves into the callee: forget what was derived for it.
    cx.invalidate(arrow);
    {
        let unit = &mut *cx.unit;
        unit.scopes.unbind_subtree(&unit.arena, arrow);
    }

    // Call site.
    let replacement = {
        let type_args = type_refs(cx, span, &lambda_tp_names);
        let mut f = cx.factory(span);
        let mut args = NodeList::new();
        if env.captures_this {
            args.push(f.this());
        }
        for capture in &captures {
            args.push(f.ident(capture.name.as_str()));
        }
        let type_ref = f.type_ref(class_name.as_str(), type_args);
        f.node(NodeKind::New(NewExpr { type_ref, args }))
    };
    if !cx.replace_in_parent(arrow, replacement) {
        return false;
    }

    // Callee holding the body, captures first.
    let callee = {
        let type_params = clone_all(cx, env.callee_type_params());
        let mut params = NodeList::new();
        for (capture, ty) in captures.iter().zip(&capture_types) {
            let annotation = ty.build(cx, span);
            params.push(cx.factory(span).param(capture.name.as_str(), annotation));
        }
        params.extend(data.params.iter().copied());
        let mut f = cx.factory(span);
        match env.class {
            Some(_) => {
                let mut modifiers = Modifiers::PRIVATE;
                if !env.captures_this {
                    modifiers |= Modifiers::STATIC;
                }
                f.node_with_flags(
                    NodeKind::Method(MethodDecl {
                        modifiers,
                        kind: MethodKind::Method,
                        name: callee_name.clone(),
                        type_params,
                        params,
                        return_type: data.return_type,
                        body: data.body,
                        annotations: NodeList::new(),
                    }),
                    NodeFlags::LAMBDA_CALLEE,
                )
            }
            None => f.node_with_flags(
                NodeKind::Function(FunctionDecl {
                    modifiers: Modifiers::empty(),
                    name: callee_name.clone(),
                    type_params,
                    params,
                    return_type: data.return_type,
                    body: data.body,
                    annotations: NodeList::new(),
                }),
                NodeFlags::LAMBDA_CALLEE,
            ),
        }
    };
    let root = cx.root();
    let callee_parent = env.class.unwrap_or(root);
    if !cx.append(callee_parent, callee) {
        return false;
    }

    // Lambda class.
    let owner = env.owner();
    let fwd = Forward {
        callee: &callee_name,
        owner: &owner,
        type_args: &callee_tp_names,
        captures: &captures,
        is_void: sig.is_void,
    };
    let mut members = NodeList::new();
    let mut ctor_params = NodeList::new();
    let mut ctor_body = NodeList::new();
    let private_readonly = Modifiers::PRIVATE | Modifiers::READONLY;
    let this_type = |cx: &mut UnitCx<'_>| {
        let args = type_refs(cx, span, &class_tp_names);
        cx.factory(span).type_ref(env.class_name.as_str(), args)
    };
    let mut stored: Vec<(&str, NodeIndex, NodeIndex)> = Vec::new();
    if env.captures_this {
        stored.push((THIS_FIELD, this_type(cx), this_type(cx)));
    }
    for (capture, ty) in captures.iter().zip(&capture_types) {
        stored.push((capture.name.as_str(), ty.build(cx, span), ty.build(cx, span)));
    }
    for (name, field_type, param_type) in stored {
        let mut f = cx.factory(span);
        members.push(f.field(private_readonly, name, field_type, NodeIndex::NONE));
        ctor_params.push(f.param(name, param_type));
        let target = f.this_member(name);
        let value = f.ident(name);
        let assign = f.assign(target, value);
        ctor_body.push(f.expr_stmt(assign));
    }
    {
        let mut f = cx.factory(span);
        let body = f.block(ctor_body);
        members.push(f.constructor(Modifiers::PUBLIC, ctor_params, body));
    }
    members.extend(build_arity_invokes(cx, span, &sig, &fwd));
    if let Some(method) = build_rest_invoke(cx, span, &sig, &fwd) {
        members.push(method);
    }
    members.push(build_generic_invoke(cx, span, &sig, &fwd));

    let implemented = build_function_type(cx, span, &sig);
    let type_params = clone_all(cx, env.lambda_type_params());
    let lambda_class = cx.factory(span).class(
        ClassDecl {
            modifiers: Modifiers::FINAL,
            name: class_name.clone(),
            type_params,
            extends: NodeIndex::NONE,
            implements: smallvec![implemented],
            members,
            annotations: NodeList::new(),
        },
        NodeFlags::LAMBDA_CLASS,
    );
    if !cx.append(root, lambda_class) {
        return false;
    }

    // Bind and type everything that moved or was created.
    cx.rebind(lambda_class);
    cx.rebind(callee);
    cx.rebind(replacement);
    cx.recheck(lambda_class);
    cx.recheck(callee);
    cx.recheck(replacement);
    trace!(
        arrow = arrow.0,
        class = %class_name,
        callee = %callee_name,
        captures = captures.len(),
        captures_this = env.captures_this,
        "arrow converted"
    );
    true
}
