//! Type interning.
//!
//! Every structurally distinct `TypeData` is stored once; constructors return
//! the existing `TypeId` when the same structure is interned again. The
//! interner also owns the class registry (type parameters and heritage of
//! every class and interface seen so far), which is shared by all units of a
//! program so that relations can walk inheritance across unit boundaries.

use crate::types::*;
use etsl_common::DeclRef;
use rustc_hash::FxHashMap;
use smallvec::smallvec;
use tracing::trace;

/// Type parameters and heritage of a class or interface declaration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: String,
    pub is_interface: bool,
    /// `TypeParameter` types, in declaration order.
    pub type_params: TypeList,
    /// Superclass type in terms of `type_params`.
    pub extends: Option<TypeId>,
    /// Implemented (or extended, for interfaces) types in terms of `type_params`.
    pub implements: Vec<TypeId>,
}

#[derive(Clone, Debug)]
pub struct TypeInterner {
    types: Vec<TypeData>,
    map: FxHashMap<TypeData, TypeId>,
    classes: FxHashMap<DeclRef, ClassInfo>,
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeInterner {
    #[must_use]
    pub fn new() -> Self {
        let mut interner = TypeInterner {
            types: Vec::with_capacity(256),
            map: FxHashMap::default(),
            classes: FxHashMap::default(),
        };
        for kind in IntrinsicKind::ALL {
            interner.intern(TypeData::Intrinsic(kind));
        }
        debug_assert_eq!(interner.types.len() as u32, TypeId::INTRINSIC_COUNT);
        interner
    }

    pub fn intern(&mut self, data: TypeData) -> TypeId {
        if let Some(&id) = self.map.get(&data) {
            return id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(data.clone());
        self.map.insert(data, id);
        id
    }

    #[must_use]
    pub fn lookup(&self, id: TypeId) -> Option<&TypeData> {
        self.types.get(id.0 as usize)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    // =========================================================================
    // Constructors
    // =========================================================================

    pub fn array(&mut self, element: TypeId) -> TypeId {
        self.intern(TypeData::Array(element))
    }

    pub fn function(&mut self, shape: FunctionShape) -> TypeId {
        self.intern(TypeData::Function(shape))
    }

    pub fn class(&mut self, decl: DeclRef, name: impl Into<String>, args: TypeList) -> TypeId {
        self.intern(TypeData::Class(ClassRef {
            decl,
            name: name.into(),
            args,
        }))
    }

    pub fn interface(&mut self, decl: DeclRef, name: impl Into<String>, args: TypeList) -> TypeId {
        self.intern(TypeData::Interface(ClassRef {
            decl,
            name: name.into(),
            args,
        }))
    }

    pub fn builtin(&mut self, kind: BuiltinKind, args: TypeList) -> TypeId {
        self.intern(TypeData::Builtin(kind, args))
    }

    pub fn type_param(&mut self, decl: DeclRef, name: impl Into<String>) -> TypeId {
        self.intern(TypeData::TypeParameter(TypeParamRef {
            decl,
            name: name.into(),
        }))
    }

    pub fn static_of(&mut self, decl: DeclRef, name: impl Into<String>) -> TypeId {
        self.intern(TypeData::Static(decl, name.into()))
    }

    pub fn enum_member(&mut self, decl: DeclRef, name: impl Into<String>) -> TypeId {
        self.intern(TypeData::Enum(decl, name.into()))
    }

    /// Normalized union: nested unions are flattened, duplicates and `never`
    /// removed, `error` absorbs everything, a single member is returned as is
    /// and an empty union is `never`.
    pub fn union(&mut self, members: impl IntoIterator<Item = TypeId>) -> TypeId {
        let mut flat: TypeList = TypeList::new();
        for member in members {
            if member == TypeId::ERROR {
                return TypeId::ERROR;
            }
            if member == TypeId::NEVER {
                continue;
            }
            match self.lookup(member) {
                Some(TypeData::Union(inner)) => {
                    for &ty in inner {
                        if !flat.contains(&ty) {
                            flat.push(ty);
                        }
                    }
                }
                _ => {
                    if !flat.contains(&member) {
                        flat.push(member);
                    }
                }
            }
        }
        match flat.len() {
            0 => TypeId::NEVER,
            1 => flat[0],
            _ => {
                flat.sort();
                self.intern(TypeData::Union(flat))
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    #[must_use]
    pub fn function_shape(&self, id: TypeId) -> Option<&FunctionShape> {
        match self.lookup(id) {
            Some(TypeData::Function(shape)) => Some(shape),
            _ => None,
        }
    }

    #[must_use]
    pub fn class_ref(&self, id: TypeId) -> Option<&ClassRef> {
        match self.lookup(id) {
            Some(TypeData::Class(class) | TypeData::Interface(class)) => Some(class),
            _ => None,
        }
    }

    #[must_use]
    pub fn array_element(&self, id: TypeId) -> Option<TypeId> {
        match self.lookup(id) {
            Some(&TypeData::Array(element)) => Some(element),
            _ => None,
        }
    }

    #[must_use]
    pub fn builtin_kind(&self, id: TypeId) -> Option<(BuiltinKind, &TypeList)> {
        match self.lookup(id) {
            Some(TypeData::Builtin(kind, args)) => Some((*kind, args)),
            _ => None,
        }
    }

    #[must_use]
    pub fn union_members(&self, id: TypeId) -> Option<&TypeList> {
        match self.lookup(id) {
            Some(TypeData::Union(members)) => Some(members),
            _ => None,
        }
    }

    /// Whether values of this type are references (can hold `null`/`undefined`
    /// and are passed through `Object` without boxing).
    #[must_use]
    pub fn is_reference(&self, id: TypeId) -> bool {
        match self.lookup(id) {
            Some(TypeData::Intrinsic(kind)) => {
                matches!(kind, IntrinsicKind::String | IntrinsicKind::Object)
            }
            Some(TypeData::Union(members)) => members.iter().any(|&m| self.is_reference(m)),
            Some(_) => true,
            None => false,
        }
    }

    #[must_use]
    pub fn contains_type_parameters(&self, id: TypeId) -> bool {
        match self.lookup(id) {
            Some(TypeData::TypeParameter(_)) => true,
            Some(TypeData::Class(class) | TypeData::Interface(class)) => {
                class.args.iter().any(|&a| self.contains_type_parameters(a))
            }
            Some(TypeData::Builtin(_, args) | TypeData::Union(args)) => {
                args.iter().any(|&a| self.contains_type_parameters(a))
            }
            Some(&TypeData::Array(element)) => self.contains_type_parameters(element),
            Some(TypeData::Function(shape)) => {
                self.contains_type_parameters(shape.ret)
                    || shape
                        .params
                        .iter()
                        .any(|p| self.contains_type_parameters(p.ty))
            }
            _ => false,
        }
    }

    // =========================================================================
    // Class registry
    // =========================================================================

    pub fn register_class(&mut self, decl: DeclRef, info: ClassInfo) {
        trace!(unit = decl.unit.0, node = decl.node, name = %info.name, "class registered");
        self.classes.insert(decl, info);
    }

    #[must_use]
    pub fn class_info(&self, decl: DeclRef) -> Option<&ClassInfo> {
        self.classes.get(&decl)
    }

    #[must_use]
    pub fn has_class(&self, decl: DeclRef) -> bool {
        self.classes.contains_key(&decl)
    }

    /// Mapping from the declared type parameters of `class` to its arguments.
    #[must_use]
    pub fn class_substitution(&self, class: &ClassRef) -> FxHashMap<TypeId, TypeId> {
        let Some(info) = self.class_info(class.decl) else {
            return FxHashMap::default();
        };
        info.type_params
            .iter()
            .copied()
            .zip(class.args.iter().copied())
            .collect()
    }

    // =========================================================================
    // Substitution
    // =========================================================================

    /// Replace type parameters according to `map`.
    pub fn substitute(&mut self, id: TypeId, map: &FxHashMap<TypeId, TypeId>) -> TypeId {
        if map.is_empty() || id.is_intrinsic() {
            return id;
        }
        if let Some(&replacement) = map.get(&id) {
            return replacement;
        }
        let Some(data) = self.lookup(id).cloned() else {
            return id;
        };
        match data {
            TypeData::Class(mut class) => {
                class.args = self.substitute_list(&class.args, map);
                self.intern(TypeData::Class(class))
            }
            TypeData::Interface(mut class) => {
                class.args = self.substitute_list(&class.args, map);
                self.intern(TypeData::Interface(class))
            }
            TypeData::Builtin(kind, args) => {
                let args = self.substitute_list(&args, map);
                self.builtin(kind, args)
            }
            TypeData::Array(element) => {
                let element = self.substitute(element, map);
                self.array(element)
            }
            TypeData::Union(members) => {
                let members = self.substitute_list(&members, map);
                self.union(members)
            }
            TypeData::Function(shape) => {
                let params = shape
                    .params
                    .iter()
                    .map(|p| ParamInfo {
                        ty: self.substitute(p.ty, map),
                        ..*p
                    })
                    .collect();
                let ret = self.substitute(shape.ret, map);
                self.function(FunctionShape {
                    type_params: shape.type_params,
                    params,
                    ret,
                })
            }
            TypeData::Intrinsic(_)
            | TypeData::Enum(..)
            | TypeData::Static(..)
            | TypeData::TypeParameter(_) => id,
        }
    }

    fn substitute_list(&mut self, list: &TypeList, map: &FxHashMap<TypeId, TypeId>) -> TypeList {
        list.iter().map(|&ty| self.substitute(ty, map)).collect()
    }

    /// `Object[]`, the parameter type of the generic `invoke` method.
    pub fn object_array(&mut self) -> TypeId {
        self.array(TypeId::OBJECT)
    }

    /// `Record<K, V>` / `Map<K, V>` helper.
    pub fn keyed(&mut self, kind: BuiltinKind, key: TypeId, value: TypeId) -> TypeId {
        self.builtin(kind, smallvec![key, value])
    }
}

#[cfg(test)]
#[path = "tests/intern_tests.rs"]
mod tests;
