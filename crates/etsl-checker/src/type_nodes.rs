//! Resolution of type annotation nodes to `TypeId`s.

use crate::checker::Checker;
use crate::types::{BuiltinKind, FunctionShape, ParamInfo, TypeId, TypeList};
use etsl_ast::{NodeIndex, NodeKind};
use etsl_binder::BindingKind;
use etsl_common::{DeclRef, diagnostic_codes};

impl<'a> Checker<'a> {
    /// Type denoted by a type annotation node. Unknown names report
    /// `CANNOT_FIND_TYPE` and resolve to the error type.
    pub fn resolve_type_reference(&mut self, node: NodeIndex) -> TypeId {
        if let Some(ty) = self.types.get(node) {
            return ty;
        }
        let arena = self.arena;
        let ty = match arena.kind(node) {
            Some(NodeKind::PrimitiveType(kind)) => TypeId::from_primitive(*kind),
            Some(NodeKind::TypeReference(reference)) => {
                let args: TypeList = reference
                    .type_args
                    .iter()
                    .map(|&arg| self.resolve_type_reference(arg))
                    .collect();
                self.resolve_named_type(node, &reference.name, args)
            }
            Some(NodeKind::ArrayType(array)) => {
                let element = self.resolve_type_reference(array.element);
                self.interner.array(element)
            }
            Some(NodeKind::UnionType(union)) => {
                let members: TypeList = union
                    .types
                    .iter()
                    .map(|&member| self.resolve_type_reference(member))
                    .collect();
                self.interner.union(members)
            }
            Some(NodeKind::FunctionType(function)) => {
                let type_params: TypeList = function
                    .type_params
                    .iter()
                    .map(|&tp| self.declared_type(tp))
                    .collect();
                let params = function
                    .params
                    .iter()
                    .map(|&param| {
                        let (optional, rest) = match arena.kind(param) {
                            Some(NodeKind::Parameter(p)) => (p.optional || p.init.is_some(), p.rest),
                            _ => (false, false),
                        };
                        ParamInfo {
                            ty: self.declared_type(param),
                            optional,
                            rest,
                        }
                    })
                    .collect();
                let ret = self.resolve_type_reference(function.return_type);
                self.interner.function(FunctionShape {
                    type_params,
                    params,
                    ret,
                })
            }
            _ => TypeId::ERROR,
        };
        self.types.set(node, ty);
        ty
    }

    fn resolve_named_type(&mut self, node: NodeIndex, name: &str, args: TypeList) -> TypeId {
        let scopes = self.scopes;
        if let Some(binding) = scopes.resolved_binding(node) {
            let decl = match binding.kind {
                BindingKind::Import => binding.origin,
                _ => Some(self.decl_ref(binding.decl)),
            };
            if let Some(decl) = decl
                && let Some(ty) = self.declared_type_reference(decl, args.clone())
            {
                return ty;
            }
        }
        match name {
            "Object" => TypeId::OBJECT,
            "Array" => {
                let element = args.first().copied().unwrap_or(TypeId::OBJECT);
                self.interner.array(element)
            }
            _ => match BuiltinKind::from_name(name) {
                Some(kind) => {
                    let args = pad_args(args, kind.arity());
                    self.interner.builtin(kind, args)
                }
                None => {
                    self.report(node, diagnostic_codes::CANNOT_FIND_TYPE, &[name]);
                    TypeId::ERROR
                }
            },
        }
    }

    /// Instance type named by a class, interface, enum or type parameter
    /// declaration, in this unit or another one.
    fn declared_type_reference(&mut self, decl: DeclRef, args: TypeList) -> Option<TypeId> {
        let arena = self.arena_of(decl.unit)?;
        match arena.kind(NodeIndex(decl.node))? {
            NodeKind::Class(_) | NodeKind::Interface(_) => {
                let info = self.ensure_class_info(decl)?;
                let args = pad_args(args, info.type_params.len());
                Some(if info.is_interface {
                    self.interner.interface(decl, info.name, args)
                } else {
                    self.interner.class(decl, info.name, args)
                })
            }
            NodeKind::Enum(e) => Some(self.interner.enum_member(decl, e.name.clone())),
            NodeKind::TypeParameter(tp) => Some(self.interner.type_param(decl, tp.name.clone())),
            _ => None,
        }
    }
}

/// Missing type arguments default to `Object`; extra ones are dropped.
fn pad_args(mut args: TypeList, arity: usize) -> TypeList {
    args.truncate(arity);
    while args.len() < arity {
        args.push(TypeId::OBJECT);
    }
    args
}
