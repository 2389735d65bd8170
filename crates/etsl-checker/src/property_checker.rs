//! Member lookup: declared members through the heritage chain, static and
//! enum members, members of builtin types, and the `invoke` methods of
//! function types.

use crate::checker::Checker;
use crate::types::{BuiltinKind, ClassRef, FunctionShape, ParamInfo, TypeData, TypeId, TypeList};
use etsl_ast::{MethodKind, Modifiers, NodeIndex, NodeKind};
use etsl_common::limits::MAX_INHERITANCE_DEPTH;
use etsl_common::{DeclRef, diagnostic_codes};

/// Result of a member lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemberInfo {
    /// Member type with the receiver's type arguments substituted.
    pub ty: TypeId,
    /// Declaring node; `None` for builtin and synthetic members.
    pub decl: Option<DeclRef>,
}

impl MemberInfo {
    const fn builtin(ty: TypeId) -> Self {
        MemberInfo { ty, decl: None }
    }
}

impl<'a> Checker<'a> {
    pub(crate) fn check_member(&mut self, node: NodeIndex) -> TypeId {
        let Some(NodeKind::Member(member)) = self.arena.kind(node) else {
            return TypeId::ERROR;
        };
        let (object, property) = (member.object, member.property.as_str());
        let object_ty = self.check(object);
        if object_ty.is_error() {
            return TypeId::ERROR;
        }
        match self.lookup_member(object_ty, property) {
            Some(found) => {
                if let Some(decl) = found.decl {
                    self.types.set_member_target(node, decl);
                }
                found.ty
            }
            None => {
                let type_text = self.format(object_ty);
                self.report(
                    node,
                    diagnostic_codes::PROPERTY_NOT_FOUND,
                    &[property, &type_text],
                );
                TypeId::ERROR
            }
        }
    }

    pub(crate) fn check_index(&mut self, node: NodeIndex) -> TypeId {
        let Some(NodeKind::Index(index)) = self.arena.kind(node) else {
            return TypeId::ERROR;
        };
        let (object, index) = (index.object, index.index);
        let object_ty = self.check(object);
        let index_ty = self.check(index);
        if object_ty.is_error() || index_ty.is_error() {
            return TypeId::ERROR;
        }
        if object_ty == TypeId::STRING {
            self.check_assignable(index, index_ty, TypeId::INT);
            return TypeId::STRING;
        }
        if let Some(element) = self.interner.array_element(object_ty) {
            self.check_assignable(index, index_ty, TypeId::INT);
            return element;
        }
        if let Some((kind, args)) = self.interner.builtin_kind(object_ty)
            && kind.is_keyed_collection()
        {
            let key = args.first().copied().unwrap_or(TypeId::ERROR);
            let value = args.get(1).copied().unwrap_or(TypeId::ERROR);
            self.check_assignable(index, index_ty, key);
            return value;
        }
        let type_text = self.format(object_ty);
        let index_text = self.format(index_ty);
        self.report(
            node,
            diagnostic_codes::OPERATOR_NOT_APPLICABLE,
            &["[]", &type_text, &index_text],
        );
        TypeId::ERROR
    }

    /// Look up `name` on a value of type `receiver`.
    pub fn lookup_member(&mut self, receiver: TypeId, name: &str) -> Option<MemberInfo> {
        self.lookup_member_at_depth(receiver, name, 0)
    }

    fn lookup_member_at_depth(&mut self, receiver: TypeId, name: &str, depth: u32) -> Option<MemberInfo> {
        if depth > MAX_INHERITANCE_DEPTH {
            return None;
        }
        if receiver == TypeId::STRING {
            return (name == "length").then(|| MemberInfo::builtin(TypeId::INT));
        }
        let data = self.interner.lookup(receiver).cloned()?;
        match data {
            TypeData::Class(class) | TypeData::Interface(class) => {
                self.lookup_instance_member(&class, name, depth)
            }
            TypeData::Static(decl, _) => self.lookup_static_member(decl, name, depth),
            TypeData::Array(element) => self.array_member(receiver, element, name),
            TypeData::Builtin(kind, args) => self.builtin_member(receiver, kind, &args, name),
            TypeData::Function(shape) => self.invoke_member(&shape, name),
            TypeData::Union(members) => {
                let mut types = TypeList::new();
                let mut decl = None;
                for member in members {
                    let found = self.lookup_member_at_depth(member, name, depth + 1)?;
                    decl = decl.or(found.decl);
                    types.push(found.ty);
                }
                let ty = self.interner.union(types);
                Some(MemberInfo { ty, decl })
            }
            // Enum members have the members of `BaseEnum` once lowered.
            TypeData::Enum(..) => match name {
                "toString" | "getName" => Some(MemberInfo::builtin(self.nullary(TypeId::STRING))),
                "getOrdinal" => Some(MemberInfo::builtin(self.nullary(TypeId::INT))),
                _ => None,
            },
            TypeData::Intrinsic(_) | TypeData::TypeParameter(_) => None,
        }
    }

    /// Instance member declared on `class` or inherited from its supertypes.
    fn lookup_instance_member(&mut self, class: &ClassRef, name: &str, depth: u32) -> Option<MemberInfo> {
        if let Some(decl) = self.find_declared_member(class.decl, name, false) {
            let ty = self.member_decl_type(decl);
            let map = self.interner.class_substitution(class);
            let ty = self.interner.substitute(ty, &map);
            return Some(MemberInfo { ty, decl: Some(decl) });
        }
        let info = self.ensure_class_info(class.decl)?;
        let map = self.interner.class_substitution(class);
        let supertypes = info.extends.into_iter().chain(info.implements);
        for supertype in supertypes {
            let supertype = self.interner.substitute(supertype, &map);
            if let Some(found) = self.lookup_member_at_depth(supertype, name, depth + 1) {
                return Some(found);
            }
        }
        None
    }

    /// Static member of a class, or a member of an enum.
    fn lookup_static_member(&mut self, decl: DeclRef, name: &str, depth: u32) -> Option<MemberInfo> {
        if depth > MAX_INHERITANCE_DEPTH {
            return None;
        }
        let arena = self.arena_of(decl.unit)?;
        match arena.kind(NodeIndex(decl.node))? {
            NodeKind::Enum(e) => {
                let member = e.members.iter().copied().find(|&member| {
                    matches!(arena.kind(member), Some(NodeKind::EnumMember(m)) if m.name == name)
                })?;
                let ty = self.interner.enum_member(decl, e.name.clone());
                Some(MemberInfo {
                    ty,
                    decl: Some(DeclRef::new(decl.unit, member.0)),
                })
            }
            NodeKind::Class(_) => {
                if let Some(member) = self.find_declared_member(decl, name, true) {
                    let ty = self.member_decl_type(member);
                    return Some(MemberInfo { ty, decl: Some(member) });
                }
                // Statics are inherited from the superclass.
                let extends = self.ensure_class_info(decl)?.extends?;
                let base = self.interner.class_ref(extends)?.clone();
                self.lookup_static_member(base.decl, name, depth + 1)
            }
            _ => None,
        }
    }

    /// Field or method named `name` declared directly on a class or
    /// interface.
    fn find_declared_member(&self, class: DeclRef, name: &str, is_static: bool) -> Option<DeclRef> {
        let arena = self.arena_of(class.unit)?;
        let members = match arena.kind(NodeIndex(class.node))? {
            NodeKind::Class(c) => &c.members,
            NodeKind::Interface(i) => &i.members,
            _ => return None,
        };
        members
            .iter()
            .copied()
            .find(|&member| {
                let Some(kind) = arena.kind(member) else {
                    return false;
                };
                let named = match kind {
                    NodeKind::Field(field) => field.name == name,
                    NodeKind::Method(method) => {
                        method.kind == MethodKind::Method && method.name == name
                    }
                    _ => false,
                };
                named && kind.modifiers().contains(Modifiers::STATIC) == is_static
            })
            .map(|member| DeclRef::new(class.unit, member.0))
    }

    /// Declared type of a member node, in this unit or another one.
    pub(crate) fn member_decl_type(&mut self, decl: DeclRef) -> TypeId {
        let node = NodeIndex(decl.node);
        if decl.unit == self.unit {
            return self.declared_type(node);
        }
        let others = self.others;
        others
            .types(decl.unit)
            .and_then(|types| types.decl_type(node))
            .unwrap_or(TypeId::ERROR)
    }

    // =========================================================================
    // Builtin members
    // =========================================================================

    fn nullary(&mut self, ret: TypeId) -> TypeId {
        self.interner.function(FunctionShape {
            type_params: TypeList::new(),
            params: Vec::new(),
            ret,
        })
    }

    fn method_type(&mut self, params: Vec<ParamInfo>, ret: TypeId) -> TypeId {
        self.interner.function(FunctionShape {
            type_params: TypeList::new(),
            params,
            ret,
        })
    }

    fn array_member(&mut self, receiver: TypeId, _element: TypeId, name: &str) -> Option<MemberInfo> {
        let ty = match name {
            "length" => TypeId::INT,
            "slice" => self.method_type(
                vec![
                    ParamInfo::required(TypeId::INT),
                    ParamInfo {
                        ty: TypeId::INT,
                        optional: true,
                        rest: false,
                    },
                ],
                receiver,
            ),
            _ => return None,
        };
        Some(MemberInfo::builtin(ty))
    }

    fn builtin_member(
        &mut self,
        receiver: TypeId,
        kind: BuiltinKind,
        args: &TypeList,
        name: &str,
    ) -> Option<MemberInfo> {
        let arg = |index: usize| args.get(index).copied().unwrap_or(TypeId::ERROR);
        let ty = match (kind, name) {
            (BuiltinKind::Map | BuiltinKind::Record, "set") => self.method_type(
                vec![ParamInfo::required(arg(0)), ParamInfo::required(arg(1))],
                receiver,
            ),
            (BuiltinKind::Map | BuiltinKind::Record, "get") => {
                self.method_type(vec![ParamInfo::required(arg(0))], arg(1))
            }
            (BuiltinKind::Map | BuiltinKind::Record, "has") => {
                self.method_type(vec![ParamInfo::required(arg(0))], TypeId::BOOLEAN)
            }
            (BuiltinKind::Map | BuiltinKind::Record, "size") => TypeId::INT,
            (BuiltinKind::Error, "message") => TypeId::STRING,
            (BuiltinKind::BaseEnum, "valueOf") => self.nullary(arg(0)),
            (BuiltinKind::BaseEnum, "toString") => self.nullary(TypeId::STRING),
            _ => return None,
        };
        Some(MemberInfo::builtin(ty))
    }

    /// `invoke{n}`, `invoke{k}R` and `invoke` on a function-typed value.
    fn invoke_member(&mut self, shape: &FunctionShape, name: &str) -> Option<MemberInfo> {
        let suffix = name.strip_prefix("invoke")?;
        if suffix.is_empty() {
            let object_array = self.interner.object_array();
            let ty = self.method_type(vec![ParamInfo::required(object_array)], TypeId::OBJECT);
            return Some(MemberInfo::builtin(ty));
        }
        let fixed: Vec<ParamInfo> = shape
            .params
            .iter()
            .filter(|p| !p.rest)
            .map(|p| ParamInfo::required(p.ty))
            .collect();
        if let Some(count) = suffix.strip_suffix('R') {
            let count: usize = count.parse().ok()?;
            let rest = shape.rest()?;
            if count != fixed.len() {
                return None;
            }
            let mut params = fixed;
            params.push(ParamInfo::required(rest.ty));
            let ty = self.method_type(params, shape.ret);
            return Some(MemberInfo::builtin(ty));
        }
        let count: usize = suffix.parse().ok()?;
        if count < shape.required_count() || count > fixed.len() {
            return None;
        }
        let params = fixed.into_iter().take(count).collect();
        let ty = self.method_type(params, shape.ret);
        Some(MemberInfo::builtin(ty))
    }
}
