//! Declared types, signatures and the class registry.

use crate::checker::{Checker, ReturnContext};
use crate::intern::ClassInfo;
use crate::recursion::RecursionResult;
use crate::types::{BuiltinKind, FunctionShape, ParamInfo, TypeData, TypeId, TypeList};
use etsl_ast::syntax::transform_utils::enclosing_class;
use etsl_ast::{MethodKind, NodeIndex, NodeKind};
use etsl_binder::BindingKind;
use etsl_common::{DeclRef, diagnostic_codes};
use tracing::trace;

impl<'a> Checker<'a> {
    // =========================================================================
    // References
    // =========================================================================

    pub(crate) fn check_identifier(&mut self, node: NodeIndex) -> TypeId {
        let scopes = self.scopes;
        let Some(binding) = scopes.resolved_binding(node) else {
            // Unresolved names were diagnosed by the resolver.
            return TypeId::ERROR;
        };
        match binding.kind {
            BindingKind::Class | BindingKind::Enum | BindingKind::Interface => {
                let decl = self.decl_ref(binding.decl);
                self.interner.static_of(decl, binding.name.clone())
            }
            BindingKind::Import => match binding.origin {
                Some(origin) => self.foreign_value_type(origin),
                None => TypeId::ERROR,
            },
            BindingKind::Field | BindingKind::Method | BindingKind::TypeParameter => TypeId::ERROR,
            _ => self.declared_type(binding.decl),
        }
    }

    /// Value type of a declaration that may live in another unit.
    pub(crate) fn foreign_value_type(&mut self, decl: DeclRef) -> TypeId {
        if decl.unit == self.unit {
            let node = NodeIndex(decl.node);
            return match self.arena.kind(node) {
                Some(NodeKind::Class(class)) => {
                    let name = class.name.clone();
                    self.interner.static_of(decl, name)
                }
                Some(NodeKind::Enum(decl_data)) => {
                    let name = decl_data.name.clone();
                    self.interner.static_of(decl, name)
                }
                _ => self.declared_type(node),
            };
        }
        let others = self.others;
        let node = NodeIndex(decl.node);
        match others.arena(decl.unit).and_then(|arena| arena.kind(node)) {
            Some(NodeKind::Class(class)) => self.interner.static_of(decl, class.name.clone()),
            Some(NodeKind::Enum(e)) => self.interner.static_of(decl, e.name.clone()),
            _ => others
                .types(decl.unit)
                .and_then(|types| types.decl_type(node))
                .unwrap_or(TypeId::ERROR),
        }
    }

    /// Instance type of a class declaration of this unit, parameterized by its
    /// own type parameters.
    pub(crate) fn instance_type(&mut self, class_node: NodeIndex) -> TypeId {
        let decl = self.decl_ref(class_node);
        let Some(info) = self.ensure_class_info(decl) else {
            return TypeId::ERROR;
        };
        if info.is_interface {
            self.interner.interface(decl, info.name, info.type_params)
        } else {
            self.interner.class(decl, info.name, info.type_params)
        }
    }

    pub(crate) fn check_this(&mut self, node: NodeIndex) -> TypeId {
        match enclosing_class(self.arena, node) {
            Some(class) => self.instance_type(class),
            None => {
                self.report(node, diagnostic_codes::THIS_OUTSIDE_CLASS, &["this"]);
                TypeId::ERROR
            }
        }
    }

    pub(crate) fn check_super(&mut self, node: NodeIndex) -> TypeId {
        let Some(class) = enclosing_class(self.arena, node) else {
            self.report(node, diagnostic_codes::THIS_OUTSIDE_CLASS, &["super"]);
            return TypeId::ERROR;
        };
        let decl = self.decl_ref(class);
        self.ensure_class_info(decl)
            .and_then(|info| info.extends)
            .unwrap_or(TypeId::OBJECT)
    }

    // =========================================================================
    // Declared types
    // =========================================================================

    /// Type of the entity a declaration node of this unit declares.
    pub fn declared_type(&mut self, decl: NodeIndex) -> TypeId {
        if let Some(ty) = self.types.decl_type(decl) {
            return ty;
        }
        match self.decl_guard.enter(decl) {
            RecursionResult::Entered => {}
            RecursionResult::Cycle => return TypeId::ERROR,
            RecursionResult::DepthExceeded | RecursionResult::IterationExceeded => {
                return TypeId::ERROR;
            }
        }
        let ty = self.compute_declared_type(decl);
        self.decl_guard.leave(decl);
        self.types.set_decl_type(decl, ty);
        trace!(decl = decl.0, ty = ty.0, "declared type");
        ty
    }

    fn compute_declared_type(&mut self, decl: NodeIndex) -> TypeId {
        let arena = self.arena;
        let Some(kind) = arena.kind(decl) else {
            return TypeId::ERROR;
        };
        match kind {
            NodeKind::Variable(var) => {
                if var.type_annotation.is_some() {
                    return self.resolve_type_reference(var.type_annotation);
                }
                if var.init.is_some() {
                    return self.check(var.init);
                }
                // `for (const x of xs)` takes the element type of `xs`.
                let parent = arena.parent(decl);
                if let Some(NodeKind::ForOf(for_of)) = arena.kind(parent)
                    && for_of.decl == decl
                {
                    let iterable = self.check(for_of.iterable);
                    return self.element_type(iterable);
                }
                TypeId::OBJECT
            }
            NodeKind::Parameter(param) => {
                // Contextual parameter types are stored before this runs.
                if param.type_annotation.is_some() {
                    self.resolve_type_reference(param.type_annotation)
                } else if param.init.is_some() {
                    self.check(param.init)
                } else {
                    TypeId::OBJECT
                }
            }
            NodeKind::Field(field) => {
                if field.type_annotation.is_some() {
                    self.resolve_type_reference(field.type_annotation)
                } else if field.init.is_some() {
                    self.check(field.init)
                } else {
                    TypeId::ERROR
                }
            }
            NodeKind::Function(_) | NodeKind::Method(_) | NodeKind::Arrow(_) => {
                self.signature_type(decl)
            }
            NodeKind::Class(class) => {
                let decl_ref = self.decl_ref(decl);
                self.ensure_class_info(decl_ref);
                self.interner.static_of(decl_ref, class.name.clone())
            }
            NodeKind::Interface(iface) => {
                let decl_ref = self.decl_ref(decl);
                self.ensure_class_info(decl_ref);
                self.interner.static_of(decl_ref, iface.name.clone())
            }
            NodeKind::Enum(e) => {
                let decl_ref = self.decl_ref(decl);
                self.interner.static_of(decl_ref, e.name.clone())
            }
            NodeKind::EnumMember(_) => {
                let parent = arena.parent(decl);
                match arena.kind(parent) {
                    Some(NodeKind::Enum(e)) => {
                        let enum_ref = self.decl_ref(parent);
                        self.interner.enum_member(enum_ref, e.name.clone())
                    }
                    _ => TypeId::ERROR,
                }
            }
            NodeKind::TypeParameter(tp) => {
                let decl_ref = self.decl_ref(decl);
                self.interner.type_param(decl_ref, tp.name.clone())
            }
            NodeKind::ImportSpecifier(_) => {
                let scopes = self.scopes;
                match scopes
                    .binding_of_decl(decl)
                    .and_then(|b| scopes.binding(b))
                    .and_then(|b| b.origin)
                {
                    Some(origin) => self.foreign_value_type(origin),
                    None => TypeId::ERROR,
                }
            }
            // The binding of a catch clause parameter points at the clause.
            NodeKind::Catch(_) => self.interner.builtin(BuiltinKind::Error, TypeList::new()),
            _ => TypeId::ERROR,
        }
    }

    /// Function type of a function, method or arrow declaration.
    pub(crate) fn signature_type(&mut self, node: NodeIndex) -> TypeId {
        let arena = self.arena;
        let (type_params, params, return_type, body, is_constructor) = match arena.kind(node) {
            Some(NodeKind::Function(f)) => (&f.type_params, &f.params, f.return_type, f.body, false),
            Some(NodeKind::Method(m)) => (
                &m.type_params,
                &m.params,
                m.return_type,
                m.body,
                m.kind == MethodKind::Constructor,
            ),
            Some(NodeKind::Arrow(a)) => (&a.type_params, &a.params, a.return_type, a.body, false),
            _ => return TypeId::ERROR,
        };

        let type_params: TypeList = type_params
            .iter()
            .map(|&tp| self.declared_type(tp))
            .collect();
        let params: Vec<ParamInfo> = params
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

        let ret = if is_constructor {
            TypeId::VOID
        } else if return_type.is_some() {
            self.resolve_type_reference(return_type)
        } else if body.is_some() {
            self.infer_return_type(body)
        } else {
            TypeId::VOID
        };

        self.interner.function(FunctionShape {
            type_params,
            params,
            ret,
        })
    }

    /// Return type of a body without a return annotation.
    fn infer_return_type(&mut self, body: NodeIndex) -> TypeId {
        if !matches!(self.arena.kind(body), Some(NodeKind::Block(_))) {
            // Expression body.
            return self.check(body);
        }
        self.returns.push(ReturnContext {
            expected: None,
            collected: Vec::new(),
        });
        self.check(body);
        let context = self.returns.pop();
        let collected = context.map(|c| c.collected).unwrap_or_default();
        if collected.is_empty() {
            return TypeId::VOID;
        }
        let mut result = collected[0];
        for &ty in &collected[1..] {
            result = self.relation().common_supertype(result, ty);
        }
        result
    }

    // =========================================================================
    // Class registry
    // =========================================================================

    /// Register every class and interface of the subtree.
    pub(crate) fn register_classes(&mut self, root: NodeIndex) {
        let arena = self.arena;
        for node in arena.descendants(root) {
            if matches!(
                arena.kind(node),
                Some(NodeKind::Class(_) | NodeKind::Interface(_))
            ) {
                let decl = self.decl_ref(node);
                self.ensure_class_info(decl);
            }
        }
    }

    /// Class info of `decl`, computing it for classes of this unit.
    pub(crate) fn ensure_class_info(&mut self, decl: DeclRef) -> Option<ClassInfo> {
        if let Some(info) = self.interner.class_info(decl) {
            return Some(info.clone());
        }
        if decl.unit != self.unit {
            return None;
        }
        let node = NodeIndex(decl.node);
        let arena = self.arena;
        let (name, is_interface, type_param_nodes, extends_nodes, implements_nodes) =
            match arena.kind(node) {
                Some(NodeKind::Class(class)) => (
                    class.name.clone(),
                    false,
                    class.type_params.clone(),
                    class.extends.is_some().then_some(class.extends),
                    class.implements.clone(),
                ),
                Some(NodeKind::Interface(iface)) => (
                    iface.name.clone(),
                    true,
                    iface.type_params.clone(),
                    None,
                    iface.extends.clone(),
                ),
                _ => return None,
            };

        let type_params: TypeList = type_param_nodes
            .iter()
            .map(|&tp| self.declared_type(tp))
            .collect();
        // Placeholder first: heritage resolution may reach this class again.
        let mut info = ClassInfo {
            name,
            is_interface,
            type_params,
            extends: None,
            implements: Vec::new(),
        };
        self.interner.register_class(decl, info.clone());

        info.extends = extends_nodes.map(|n| self.resolve_type_reference(n));
        info.implements = implements_nodes
            .iter()
            .map(|&n| self.resolve_type_reference(n))
            .collect();
        self.interner.register_class(decl, info.clone());
        Some(info)
    }

    // =========================================================================
    // Declaration checks
    // =========================================================================

    pub(crate) fn check_class(&mut self, node: NodeIndex) -> TypeId {
        let ty = self.declared_type(node);
        self.check_children(node);
        ty
    }

    pub(crate) fn check_interface(&mut self, node: NodeIndex) -> TypeId {
        let ty = self.declared_type(node);
        self.check_children(node);
        ty
    }

    pub(crate) fn check_enum(&mut self, node: NodeIndex) -> TypeId {
        let ty = self.declared_type(node);
        self.check_children(node);
        ty
    }

    pub(crate) fn check_simple_declaration(&mut self, node: NodeIndex) -> TypeId {
        let ty = self.declared_type(node);
        let arena = self.arena;
        match arena.kind(node) {
            Some(NodeKind::Parameter(param)) => {
                if param.type_annotation.is_some() {
                    self.check(param.type_annotation);
                }
                if param.init.is_some() {
                    self.check_expression_against(param.init, ty);
                }
            }
            _ => self.check_children(node),
        }
        ty
    }

    pub(crate) fn check_variable(&mut self, node: NodeIndex) -> TypeId {
        let ty = self.declared_type(node);
        let Some(NodeKind::Variable(var)) = self.arena.kind(node) else {
            return ty;
        };
        let (annotation, init) = (var.type_annotation, var.init);
        if annotation.is_some() {
            self.check(annotation);
            if init.is_some() {
                self.check_expression_against(init, ty);
            }
        } else if init.is_some() {
            self.check(init);
        }
        ty
    }

    pub(crate) fn check_field(&mut self, node: NodeIndex) -> TypeId {
        let ty = self.declared_type(node);
        let Some(NodeKind::Field(field)) = self.arena.kind(node) else {
            return ty;
        };
        let (annotation, init, annotations) =
            (field.type_annotation, field.init, field.annotations.clone());
        for annotation_node in annotations {
            self.check(annotation_node);
        }
        if annotation.is_some() {
            self.check(annotation);
            if init.is_some() {
                self.check_expression_against(init, ty);
            }
        } else if init.is_some() {
            self.check(init);
        }
        ty
    }

    /// Check a function or method: signature first, then the body against the
    /// declared return type.
    pub(crate) fn check_function_like(&mut self, node: NodeIndex) -> TypeId {
        let ty = self.declared_type(node);
        let arena = self.arena;
        let (annotations, type_params, params, return_type, body) = match arena.kind(node) {
            Some(NodeKind::Function(f)) => (
                &f.annotations,
                &f.type_params,
                &f.params,
                f.return_type,
                f.body,
            ),
            Some(NodeKind::Method(m)) => (
                &m.annotations,
                &m.type_params,
                &m.params,
                m.return_type,
                m.body,
            ),
            _ => return ty,
        };
        for &child in annotations.iter().chain(type_params).chain(params) {
            self.check(child);
        }
        if return_type.is_some() {
            self.check(return_type);
        }
        if body.is_some() {
            let ret = self
                .interner
                .function_shape(ty)
                .map_or(TypeId::ERROR, |shape| shape.ret);
            self.check_body(body, ret);
        }
        ty
    }

    pub(crate) fn check_arrow(&mut self, node: NodeIndex, expected: Option<TypeId>) -> TypeId {
        let arena = self.arena;
        let Some(NodeKind::Arrow(arrow)) = arena.kind(node) else {
            return TypeId::ERROR;
        };
        // Contextual parameter types for unannotated parameters.
        if let Some(expected) = expected
            && let Some(shape) = self.interner.function_shape(expected).cloned()
        {
            for (index, &param) in arrow.params.iter().enumerate() {
                let annotated = matches!(
                    arena.kind(param),
                    Some(NodeKind::Parameter(p)) if p.type_annotation.is_some()
                );
                if !annotated
                    && self.types.decl_type(param).is_none()
                    && let Some(info) = shape.params.get(index)
                {
                    self.types.set_decl_type(param, info.ty);
                }
            }
        }
        let ty = self.declared_type(node);
        for &child in arrow.type_params.iter().chain(&arrow.params) {
            self.check(child);
        }
        if arrow.return_type.is_some() {
            self.check(arrow.return_type);
        }
        let ret = self
            .interner
            .function_shape(ty)
            .map_or(TypeId::ERROR, |shape| shape.ret);
        let body = arrow.body;
        if matches!(arena.kind(body), Some(NodeKind::Block(_))) {
            self.check_body(body, ret);
        } else {
            let body_ty = self.check_with_expected(body, ret);
            if ret != TypeId::VOID {
                self.check_assignable(body, body_ty, ret);
            }
        }
        ty
    }

    /// Check a block body with `ret` as the expected return type.
    pub(crate) fn check_body(&mut self, body: NodeIndex, ret: TypeId) {
        self.returns.push(ReturnContext {
            expected: Some(ret),
            collected: Vec::new(),
        });
        self.check(body);
        self.returns.pop();
    }

    /// Element type of an iterable (array or string).
    pub(crate) fn element_type(&self, iterable: TypeId) -> TypeId {
        if iterable == TypeId::STRING {
            return TypeId::STRING;
        }
        match self.interner.lookup(iterable) {
            Some(&TypeData::Array(element)) => element,
            _ => TypeId::ERROR,
        }
    }
}
