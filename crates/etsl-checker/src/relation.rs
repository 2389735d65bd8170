//! Type relations: subtyping, assignability and type parameter substitution.
//!
//! Class-like types are related nominally through the heritage recorded in
//! the interner's class registry; functions, arrays and unions structurally.
//! Assignability additionally allows numeric widening (char < int < long <
//! float < double) and boxing of any value into `Object`.

use crate::intern::TypeInterner;
use crate::recursion::{RecursionGuard, RecursionProfile, RecursionResult};
use crate::types::{ClassRef, FunctionShape, TypeData, TypeId};
use rustc_hash::FxHashMap;
use tracing::trace;

pub struct Relation<'a> {
    interner: &'a mut TypeInterner,
    guard: RecursionGuard<(TypeId, TypeId)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Subtype,
    Assignable,
}

impl<'a> Relation<'a> {
    pub fn new(interner: &'a mut TypeInterner) -> Self {
        Relation {
            interner,
            guard: RecursionGuard::with_profile(RecursionProfile::SubtypeCheck),
        }
    }

    /// Whether `source` is a subtype of `target` (no widening, no boxing of
    /// primitives).
    pub fn is_subtype(&mut self, source: TypeId, target: TypeId) -> bool {
        self.relate(source, target, Mode::Subtype)
    }

    /// Whether a value of type `source` may be stored in a `target` slot.
    pub fn is_assignable(&mut self, source: TypeId, target: TypeId) -> bool {
        self.relate(source, target, Mode::Assignable)
    }

    /// Replace type parameters according to `map`.
    pub fn substitute(&mut self, ty: TypeId, map: &FxHashMap<TypeId, TypeId>) -> TypeId {
        self.interner.substitute(ty, map)
    }

    /// The narrowest type both `a` and `b` are assignable to.
    pub fn common_supertype(&mut self, a: TypeId, b: TypeId) -> TypeId {
        if a == b {
            return a;
        }
        if let (Some(ra), Some(rb)) = (a.numeric_rank(), b.numeric_rank()) {
            return TypeId::from_numeric_rank(ra.max(rb));
        }
        if self.is_subtype(a, b) {
            return b;
        }
        if self.is_subtype(b, a) {
            return a;
        }
        self.interner.union([a, b])
    }

    fn relate(&mut self, source: TypeId, target: TypeId, mode: Mode) -> bool {
        if source == target
            || source.is_error()
            || target.is_error()
            || source == TypeId::NEVER
        {
            return true;
        }
        match self.guard.enter((source, target)) {
            RecursionResult::Entered => {
                let result = self.relate_inner(source, target, mode);
                self.guard.leave((source, target));
                trace!(source = source.0, target = target.0, ?mode, result, "relation");
                result
            }
            // Assume the relation holds on a cycle (coinductive).
            RecursionResult::Cycle => true,
            RecursionResult::DepthExceeded | RecursionResult::IterationExceeded => false,
        }
    }

    fn relate_inner(&mut self, source: TypeId, target: TypeId, mode: Mode) -> bool {
        if target == TypeId::OBJECT {
            return match mode {
                Mode::Assignable => source != TypeId::VOID,
                Mode::Subtype => self.interner.is_reference(source) || source.is_nullish(),
            };
        }
        if let (Some(rs), Some(rt)) = (source.numeric_rank(), target.numeric_rank()) {
            return mode == Mode::Assignable && rs <= rt;
        }

        let source_data = self.interner.lookup(source).cloned();
        let target_data = self.interner.lookup(target).cloned();

        if let Some(TypeData::Union(members)) = &source_data {
            return members.iter().all(|&m| self.relate(m, target, mode));
        }
        if let Some(TypeData::Union(members)) = &target_data {
            return members.iter().any(|&m| self.relate(source, m, mode));
        }

        match (source_data, target_data) {
            (Some(TypeData::Array(s)), Some(TypeData::Array(t))) => self.relate(s, t, mode),
            (Some(TypeData::Function(s)), Some(TypeData::Function(t))) => {
                self.relate_functions(&s, &t, mode)
            }
            (Some(TypeData::Builtin(sk, sa)), Some(TypeData::Builtin(tk, ta))) => {
                sk == tk && sa.len() == ta.len() && sa.iter().zip(ta.iter()).all(|(&a, &b)| {
                    a == b || a.is_error() || b.is_error()
                })
            }
            (
                Some(TypeData::Class(class) | TypeData::Interface(class)),
                Some(_),
            ) => self.relate_class(&class, target, mode),
            _ => false,
        }
    }

    fn relate_functions(&mut self, source: &FunctionShape, target: &FunctionShape, mode: Mode) -> bool {
        // The source must not require more arguments than the target supplies.
        if source.required_count() > target.fixed_count() && target.rest().is_none() {
            return false;
        }
        for (index, target_param) in target.params.iter().enumerate() {
            let source_param = match source.params.get(index) {
                Some(param) => param,
                None => match source.rest() {
                    Some(rest) => rest,
                    // Extra target arguments are ignored by the source.
                    None => break,
                },
            };
            // Parameters are contravariant.
            if !self.relate(target_param.ty, source_param.ty, mode) {
                return false;
            }
        }
        target.ret == TypeId::VOID || self.relate(source.ret, target.ret, mode)
    }

    fn relate_class(&mut self, class: &ClassRef, target: TypeId, mode: Mode) -> bool {
        if let Some(target_class) = self.interner.class_ref(target).cloned()
            && target_class.decl == class.decl
        {
            return class.args.len() == target_class.args.len()
                && class
                    .args
                    .iter()
                    .zip(target_class.args.iter())
                    .all(|(&a, &b)| a == b || a.is_error() || b.is_error());
        }
        let Some(info) = self.interner.class_info(class.decl).cloned() else {
            return false;
        };
        let map = self.interner.class_substitution(class);
        let supertypes = info.extends.into_iter().chain(info.implements);
        for supertype in supertypes {
            let supertype = self.interner.substitute(supertype, &map);
            if self.relate(supertype, target, mode) {
                return true;
            }
        }
        false
    }
}

/// Convenience wrapper for one-off assignability queries.
pub fn is_assignable(interner: &mut TypeInterner, source: TypeId, target: TypeId) -> bool {
    Relation::new(interner).is_assignable(source, target)
}
