//! Calls, `new` expressions and generic argument inference.

use crate::checker::Checker;
use crate::types::{BuiltinKind, FunctionShape, ParamInfo, TypeData, TypeId, TypeList};
use etsl_ast::{MethodKind, Modifiers, NodeIndex, NodeKind};
use etsl_common::limits::MAX_INHERITANCE_DEPTH;
use etsl_common::{DeclRef, diagnostic_codes};
use rustc_hash::FxHashMap;
use tracing::trace;

impl<'a> Checker<'a> {
    pub(crate) fn check_call(&mut self, node: NodeIndex) -> TypeId {
        let arena = self.arena;
        let Some(NodeKind::Call(call)) = arena.kind(node) else {
            return TypeId::ERROR;
        };
        let (callee, type_args, args) = (call.callee, &call.type_args, &call.args);

        // `super(...)` runs the base constructor.
        if matches!(arena.kind(callee), Some(NodeKind::Super)) {
            let base = self.check(callee);
            match self.constructor_shape(base) {
                Some(shape) => self.check_arguments(node, &shape, args),
                None => self.check_untyped_arguments(args),
            }
            return TypeId::VOID;
        }

        let callee_ty = self.check(callee);
        if callee_ty.is_error() {
            self.check_untyped_arguments(args);
            return TypeId::ERROR;
        }
        let Some(shape) = self.interner.function_shape(callee_ty).cloned() else {
            let text = self.format(callee_ty);
            self.report(callee, diagnostic_codes::NOT_CALLABLE, &[&text]);
            self.check_untyped_arguments(args);
            return TypeId::ERROR;
        };

        let shape = if shape.type_params.is_empty() {
            shape
        } else {
            let map: FxHashMap<TypeId, TypeId> = if type_args.is_empty() {
                self.infer_type_arguments(&shape, args)
            } else {
                let explicit: Vec<TypeId> =
                    type_args.iter().map(|&arg| self.check(arg)).collect();
                shape
                    .type_params
                    .iter()
                    .copied()
                    .zip(explicit)
                    .collect()
            };
            self.instantiate(&shape, &map)
        };
        self.check_arguments(node, &shape, args);
        shape.ret
    }

    /// Check call arguments against an instantiated signature.
    pub(crate) fn check_arguments(&mut self, node: NodeIndex, shape: &FunctionShape, args: &[NodeIndex]) {
        if !shape.accepts_arity(args.len()) && !self.has_spread(args) {
            let expected = expected_arity_text(shape);
            let got = args.len().to_string();
            self.report(
                node,
                diagnostic_codes::ARGUMENT_COUNT_MISMATCH,
                &[&expected, &got],
            );
        }
        let fixed = shape.fixed_count();
        let rest = shape.rest().copied();
        for (index, &arg) in args.iter().enumerate() {
            let is_spread = matches!(self.arena.kind(arg), Some(NodeKind::Spread(_)));
            let expected = if index < fixed {
                Some(shape.params[index].ty)
            } else {
                rest.map(|rest| {
                    if is_spread {
                        rest.ty
                    } else {
                        self.element_type(rest.ty)
                    }
                })
            };
            match expected {
                Some(expected) if !expected.is_error() => {
                    self.check_expression_against(arg, expected);
                }
                _ => {
                    self.check(arg);
                }
            }
        }
    }

    fn check_untyped_arguments(&mut self, args: &[NodeIndex]) {
        for &arg in args {
            self.check(arg);
        }
    }

    fn has_spread(&self, args: &[NodeIndex]) -> bool {
        args.iter()
            .any(|&arg| matches!(self.arena.kind(arg), Some(NodeKind::Spread(_))))
    }

    /// Replace the type parameters of a generic signature.
    fn instantiate(&mut self, shape: &FunctionShape, map: &FxHashMap<TypeId, TypeId>) -> FunctionShape {
        let params = shape
            .params
            .iter()
            .map(|p| ParamInfo {
                ty: self.interner.substitute(p.ty, map),
                ..*p
            })
            .collect();
        FunctionShape {
            type_params: TypeList::new(),
            params,
            ret: self.interner.substitute(shape.ret, map),
        }
    }

    // =========================================================================
    // Inference
    // =========================================================================

    /// Infer type arguments from the argument types. Arrow arguments are
    /// checked last so they see the parameter types inferred from the others.
    fn infer_type_arguments(&mut self, shape: &FunctionShape, args: &[NodeIndex]) -> FxHashMap<TypeId, TypeId> {
        let mut map = FxHashMap::default();
        let arena = self.arena;
        let fixed = shape.fixed_count();
        let mut deferred = Vec::new();
        for (index, &arg) in args.iter().enumerate() {
            let is_spread = matches!(arena.kind(arg), Some(NodeKind::Spread(_)));
            let param = if index < fixed {
                shape.params[index].ty
            } else {
                match shape.rest() {
                    Some(rest) if is_spread => rest.ty,
                    Some(rest) => self.element_type(rest.ty),
                    None => continue,
                }
            };
            if matches!(arena.kind(arg), Some(NodeKind::Arrow(_))) {
                deferred.push((arg, param));
                continue;
            }
            let arg_ty = self.check(arg);
            self.unify(shape, param, arg_ty, &mut map);
        }
        for (arg, param) in deferred {
            let expected = self.interner.substitute(param, &map);
            let arg_ty = self.check_with_expected(arg, expected);
            self.unify(shape, param, arg_ty, &mut map);
        }
        trace!(inferred = map.len(), "type arguments inferred");
        map
    }

    fn unify(&mut self, shape: &FunctionShape, param: TypeId, arg: TypeId, map: &mut FxHashMap<TypeId, TypeId>) {
        if arg.is_error() {
            return;
        }
        if shape.type_params.contains(&param) {
            let inferred = match map.get(&param) {
                Some(&previous) => self.relation().common_supertype(previous, arg),
                None => arg,
            };
            map.insert(param, inferred);
            return;
        }
        let (Some(param_data), Some(arg_data)) = (
            self.interner.lookup(param).cloned(),
            self.interner.lookup(arg).cloned(),
        ) else {
            return;
        };
        match (param_data, arg_data) {
            (TypeData::Array(p), TypeData::Array(a)) => self.unify(shape, p, a, map),
            (
                TypeData::Class(p) | TypeData::Interface(p),
                TypeData::Class(a) | TypeData::Interface(a),
            ) if p.decl == a.decl => {
                for (&p, &a) in p.args.iter().zip(a.args.iter()) {
                    self.unify(shape, p, a, map);
                }
            }
            (TypeData::Builtin(pk, pa), TypeData::Builtin(ak, aa)) if pk == ak => {
                for (&p, &a) in pa.iter().zip(aa.iter()) {
                    self.unify(shape, p, a, map);
                }
            }
            (TypeData::Function(p), TypeData::Function(a)) => {
                for (p, a) in p.params.iter().zip(a.params.iter()) {
                    self.unify(shape, p.ty, a.ty, map);
                }
                self.unify(shape, p.ret, a.ret, map);
            }
            _ => {}
        }
    }

    // =========================================================================
    // `new`
    // =========================================================================

    pub(crate) fn check_new(&mut self, node: NodeIndex) -> TypeId {
        let arena = self.arena;
        let Some(NodeKind::New(new_expr)) = arena.kind(node) else {
            return TypeId::ERROR;
        };
        let (type_ref, args) = (new_expr.type_ref, &new_expr.args);
        let ty = self.check(type_ref);
        if ty.is_error() {
            self.check_untyped_arguments(args);
            return TypeId::ERROR;
        }
        if !self.is_constructible(ty) {
            let text = self.format(ty);
            self.report(type_ref, diagnostic_codes::NOT_CONSTRUCTIBLE, &[&text]);
            self.check_untyped_arguments(args);
            return TypeId::ERROR;
        }
        match self.constructor_shape(ty) {
            Some(shape) => self.check_arguments(node, &shape, args),
            None => self.check_untyped_arguments(args),
        }
        ty
    }

    fn is_constructible(&self, ty: TypeId) -> bool {
        match self.interner.lookup(ty) {
            Some(TypeData::Class(class)) => {
                let decl = class.decl;
                !self
                    .arena_of(decl.unit)
                    .and_then(|arena| arena.kind(NodeIndex(decl.node)))
                    .is_some_and(|kind| kind.modifiers().contains(Modifiers::ABSTRACT))
            }
            Some(TypeData::Builtin(kind, _)) => *kind != BuiltinKind::BaseEnum,
            _ => false,
        }
    }

    /// Constructor signature of an instance type, with the class type
    /// arguments substituted. Classes without a constructor inherit the base
    /// constructor.
    pub(crate) fn constructor_shape(&mut self, ty: TypeId) -> Option<FunctionShape> {
        let mut current = ty;
        for _ in 0..=MAX_INHERITANCE_DEPTH {
            match self.interner.lookup(current).cloned()? {
                TypeData::Class(class) => {
                    let map = self.interner.class_substitution(&class);
                    if let Some(ctor) = self.find_constructor(class.decl) {
                        let ctor_ty = self.member_decl_type(ctor);
                        let ctor_ty = self.interner.substitute(ctor_ty, &map);
                        return self.interner.function_shape(ctor_ty).cloned();
                    }
                    let Some(extends) = self.ensure_class_info(class.decl)?.extends else {
                        return Some(FunctionShape {
                            type_params: TypeList::new(),
                            params: Vec::new(),
                            ret: TypeId::VOID,
                        });
                    };
                    current = self.interner.substitute(extends, &map);
                }
                TypeData::Builtin(BuiltinKind::Error, _) => {
                    return Some(FunctionShape {
                        type_params: TypeList::new(),
                        params: vec![ParamInfo {
                            ty: TypeId::STRING,
                            optional: true,
                            rest: false,
                        }],
                        ret: TypeId::VOID,
                    });
                }
                TypeData::Builtin(BuiltinKind::BaseEnum, args) => {
                    let value = args.first().copied().unwrap_or(TypeId::OBJECT);
                    return Some(FunctionShape {
                        type_params: TypeList::new(),
                        params: vec![ParamInfo::required(value)],
                        ret: TypeId::VOID,
                    });
                }
                TypeData::Builtin(..) => {
                    return Some(FunctionShape {
                        type_params: TypeList::new(),
                        params: Vec::new(),
                        ret: TypeId::VOID,
                    });
                }
                _ => return None,
            }
        }
        None
    }

    fn find_constructor(&self, class: DeclRef) -> Option<DeclRef> {
        let arena = self.arena_of(class.unit)?;
        let Some(NodeKind::Class(decl)) = arena.kind(NodeIndex(class.node)) else {
            return None;
        };
        decl.members
            .iter()
            .copied()
            .find(|&member| {
                matches!(
                    arena.kind(member),
                    Some(NodeKind::Method(m)) if m.kind == MethodKind::Constructor
                )
            })
            .map(|member| DeclRef::new(class.unit, member.0))
    }
}

/// `"2"`, `"1-3"` or `"at least 1"` for diagnostics.
fn expected_arity_text(shape: &FunctionShape) -> String {
    let (required, fixed) = (shape.required_count(), shape.fixed_count());
    if shape.rest().is_some() {
        format!("at least {required}")
    } else if required == fixed {
        required.to_string()
    } else {
        format!("{required}-{fixed}")
    }
}
