//! Operators, literals, assignments and literal aggregates.

use crate::checker::Checker;
use crate::types::{BuiltinKind, TypeData, TypeId};
use etsl_ast::syntax::transform_utils::enclosing_function;
use etsl_ast::{
    BinaryOp, LiteralValue, MethodKind, Modifiers, NodeIndex, NodeKind, PropertyKey, UnaryOp,
};
use etsl_common::diagnostic_codes;

impl<'a> Checker<'a> {
    pub(crate) fn literal_type(value: &LiteralValue) -> TypeId {
        match value {
            LiteralValue::Char(_) => TypeId::CHAR,
            LiteralValue::Int(_) => TypeId::INT,
            LiteralValue::Long(_) => TypeId::LONG,
            LiteralValue::Float(_) => TypeId::FLOAT,
            LiteralValue::Double(_) => TypeId::DOUBLE,
            LiteralValue::Boolean(_) => TypeId::BOOLEAN,
            LiteralValue::String(_) => TypeId::STRING,
            LiteralValue::Null => TypeId::NULL,
            LiteralValue::Undefined => TypeId::UNDEFINED,
        }
    }

    // =========================================================================
    // Operators
    // =========================================================================

    pub(crate) fn check_binary(&mut self, node: NodeIndex) -> TypeId {
        let Some(NodeKind::Binary(binary)) = self.arena.kind(node) else {
            return TypeId::ERROR;
        };
        let (op, left, right) = (binary.op, binary.left, binary.right);
        let left_ty = self.check(left);
        let right_ty = self.check(right);
        self.binary_result(node, op, left_ty, right_ty)
    }

    /// Result type of `left op right`, reporting inapplicable operators.
    pub(crate) fn binary_result(
        &mut self,
        node: NodeIndex,
        op: BinaryOp,
        left: TypeId,
        right: TypeId,
    ) -> TypeId {
        if left.is_error() || right.is_error() {
            return TypeId::ERROR;
        }
        let result = match op {
            BinaryOp::Add if left == TypeId::STRING || right == TypeId::STRING => {
                Some(TypeId::STRING)
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                arithmetic_result(left, right)
            }
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor
                if left == TypeId::BOOLEAN && right == TypeId::BOOLEAN =>
            {
                Some(TypeId::BOOLEAN)
            }
            BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::UShr => integral_result(left, right),
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                Some(self.relation().common_supertype(left, right))
            }
            BinaryOp::Nullish => {
                let non_null = self.non_nullish(left);
                Some(self.relation().common_supertype(non_null, right))
            }
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => {
                Some(TypeId::BOOLEAN)
            }
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
                let comparable = (left.is_numeric() && right.is_numeric())
                    || (left == TypeId::STRING && right == TypeId::STRING);
                comparable.then_some(TypeId::BOOLEAN)
            }
            BinaryOp::InstanceOf => Some(TypeId::BOOLEAN),
        };
        match result {
            Some(ty) => ty,
            None => {
                let left_text = self.format(left);
                let right_text = self.format(right);
                self.report(
                    node,
                    diagnostic_codes::OPERATOR_NOT_APPLICABLE,
                    &[op.as_str(), &left_text, &right_text],
                );
                TypeId::ERROR
            }
        }
    }

    /// `ty` without its `null`/`undefined` members.
    fn non_nullish(&mut self, ty: TypeId) -> TypeId {
        match self.interner.union_members(ty).cloned() {
            Some(members) => {
                let kept: Vec<TypeId> = members.into_iter().filter(|m| !m.is_nullish()).collect();
                self.interner.union(kept)
            }
            None => ty,
        }
    }

    pub(crate) fn check_unary(&mut self, node: NodeIndex) -> TypeId {
        let Some(NodeKind::Unary(unary)) = self.arena.kind(node) else {
            return TypeId::ERROR;
        };
        let (op, operand) = (unary.op, unary.operand);
        let operand_ty = self.check(operand);
        if operand_ty.is_error() {
            return TypeId::ERROR;
        }
        let result = match op {
            UnaryOp::Not => Some(TypeId::BOOLEAN),
            UnaryOp::Plus | UnaryOp::Minus => operand_ty.is_numeric().then(|| promote(operand_ty)),
            UnaryOp::BitNot => operand_ty.is_integral().then(|| promote(operand_ty)),
        };
        result.unwrap_or_else(|| {
            let text = self.format(operand_ty);
            self.report(
                node,
                diagnostic_codes::UNARY_OPERATOR_NOT_APPLICABLE,
                &[op.as_str(), &text],
            );
            TypeId::ERROR
        })
    }

    pub(crate) fn check_update(&mut self, node: NodeIndex) -> TypeId {
        let Some(NodeKind::Update(update)) = self.arena.kind(node) else {
            return TypeId::ERROR;
        };
        let (op, operand) = (update.op, update.operand);
        let operand_ty = self.check(operand);
        if operand_ty.is_error() {
            return TypeId::ERROR;
        }
        if !operand_ty.is_numeric() {
            let text = self.format(operand_ty);
            self.report(
                node,
                diagnostic_codes::UNARY_OPERATOR_NOT_APPLICABLE,
                &[op.as_str(), &text],
            );
            return TypeId::ERROR;
        }
        self.check_writable(operand);
        operand_ty
    }

    // =========================================================================
    // Assignment
    // =========================================================================

    pub(crate) fn check_assignment(&mut self, node: NodeIndex) -> TypeId {
        let Some(NodeKind::Assignment(assignment)) = self.arena.kind(node) else {
            return TypeId::ERROR;
        };
        let (op, target, value) = (assignment.op, assignment.target, assignment.value);
        let target_ty = self.check(target);
        self.check_writable(target);
        match op.binary_op() {
            None => {
                let value_ty = self.check_with_expected(value, target_ty);
                if !target_ty.is_error() {
                    self.check_assignable(value, value_ty, target_ty);
                }
            }
            Some(binary) => {
                let value_ty = self.check(value);
                let result = self.binary_result(node, binary, target_ty, value_ty);
                // `s += x` keeps `s` a string; `i += 1.5` is a narrowing store.
                if !result.is_error() && !target_ty.is_error() {
                    self.check_assignable(value, result, target_ty);
                }
            }
        }
        target_ty
    }

    /// Report assignments to constants and read-only members outside
    /// constructors.
    fn check_writable(&mut self, target: NodeIndex) {
        let arena = self.arena;
        let name = match arena.kind(target) {
            Some(NodeKind::Identifier(ident)) => {
                let scopes = self.scopes;
                match scopes.resolved_binding(target) {
                    Some(binding) if binding.is_const() => ident.name.clone(),
                    _ => return,
                }
            }
            Some(NodeKind::Member(member)) => {
                let Some(decl) = self.types.member_target(target) else {
                    return;
                };
                let readonly = self
                    .arena_of(decl.unit)
                    .and_then(|decl_arena| decl_arena.kind(NodeIndex(decl.node)))
                    .is_some_and(|kind| {
                        matches!(kind, NodeKind::Field(_) | NodeKind::EnumMember(_))
                            && (kind.modifiers().contains(Modifiers::READONLY)
                                || matches!(kind, NodeKind::EnumMember(_)))
                    });
                if !readonly || self.in_constructor(target) {
                    return;
                }
                member.property.clone()
            }
            _ => return,
        };
        self.report(target, diagnostic_codes::ASSIGNMENT_TO_READONLY, &[&name]);
    }

    fn in_constructor(&self, node: NodeIndex) -> bool {
        enclosing_function(self.arena, node).is_some_and(|function| {
            matches!(
                self.arena.kind(function),
                Some(NodeKind::Method(method)) if method.kind == MethodKind::Constructor
            )
        })
    }

    // =========================================================================
    // Conditional and casts
    // =========================================================================

    pub(crate) fn check_conditional(&mut self, node: NodeIndex, expected: Option<TypeId>) -> TypeId {
        let Some(NodeKind::Conditional(conditional)) = self.arena.kind(node) else {
            return TypeId::ERROR;
        };
        let (test, consequent, alternate) =
            (conditional.test, conditional.consequent, conditional.alternate);
        self.check_condition(test);
        let (then_ty, else_ty) = match expected {
            Some(expected) => (
                self.check_with_expected(consequent, expected),
                self.check_with_expected(alternate, expected),
            ),
            None => (self.check(consequent), self.check(alternate)),
        };
        if then_ty.is_error() || else_ty.is_error() {
            return TypeId::ERROR;
        }
        self.relation().common_supertype(then_ty, else_ty)
    }

    /// Check a test expression. Any value can be tested for truthiness except
    /// `void`.
    pub(crate) fn check_condition(&mut self, test: NodeIndex) -> TypeId {
        let ty = self.check(test);
        if ty == TypeId::VOID {
            let text = self.format(ty);
            self.report(test, diagnostic_codes::CONDITION_NOT_BOOLEAN, &[&text]);
        }
        ty
    }

    pub(crate) fn check_as(&mut self, node: NodeIndex) -> TypeId {
        let Some(NodeKind::As(cast)) = self.arena.kind(node) else {
            return TypeId::ERROR;
        };
        let (expr, annotation) = (cast.expr, cast.type_annotation);
        self.check(expr);
        // Casts are checked at run time.
        self.check(annotation)
    }

    // =========================================================================
    // Literal aggregates
    // =========================================================================

    pub(crate) fn check_object_literal(&mut self, node: NodeIndex, expected: Option<TypeId>) -> TypeId {
        let arena = self.arena;
        let Some(NodeKind::ObjectLiteral(object)) = arena.kind(node) else {
            return TypeId::ERROR;
        };
        let Some(expected) = expected.filter(|e| !e.is_error()) else {
            for &property in &object.properties {
                self.check(property);
            }
            return TypeId::OBJECT;
        };

        if let Some((kind, args)) = self.interner.builtin_kind(expected)
            && kind.is_keyed_collection()
        {
            let (key, value) = (args.first().copied(), args.get(1).copied());
            let (key, value) = (key.unwrap_or(TypeId::ERROR), value.unwrap_or(TypeId::ERROR));
            for &property in &object.properties {
                let Some(NodeKind::Property(prop)) = arena.kind(property) else {
                    self.check(property);
                    continue;
                };
                let key_ty = match &prop.key {
                    PropertyKey::Name(_) => TypeId::STRING,
                    PropertyKey::Literal(literal) => Self::literal_type(literal),
                };
                if !self.is_assignable(key_ty, key) {
                    let key_text = self.format(key_ty);
                    let expected_text = self.format(key);
                    self.report(
                        property,
                        diagnostic_codes::TYPE_NOT_ASSIGNABLE,
                        &[&key_text, &expected_text],
                    );
                }
                let value_ty = self.check_with_expected(property, value);
                self.check_assignable(prop.value, value_ty, value);
            }
            return expected;
        }

        if let Some(class) = self.interner.class_ref(expected).cloned() {
            for &property in &object.properties {
                let Some(NodeKind::Property(prop)) = arena.kind(property) else {
                    self.check(property);
                    continue;
                };
                let name = match &prop.key {
                    PropertyKey::Name(name) => name.clone(),
                    PropertyKey::Literal(literal) => literal.to_string(),
                };
                match self.lookup_member(expected, &name) {
                    Some(member) => {
                        let value_ty = self.check_with_expected(property, member.ty);
                        self.check_assignable(prop.value, value_ty, member.ty);
                    }
                    None => {
                        self.check(property);
                        self.report(
                            property,
                            diagnostic_codes::PROPERTY_NOT_FOUND,
                            &[&name, &class.name],
                        );
                    }
                }
            }
            return expected;
        }

        for &property in &object.properties {
            self.check(property);
        }
        TypeId::OBJECT
    }

    pub(crate) fn check_array_literal(&mut self, node: NodeIndex, expected: Option<TypeId>) -> TypeId {
        let arena = self.arena;
        let Some(NodeKind::ArrayLiteral(array)) = arena.kind(node) else {
            return TypeId::ERROR;
        };
        let expected_element = expected.and_then(|e| self.interner.array_element(e));

        if let Some(element) = expected_element {
            for &item in &array.elements {
                let item_ty = self.check_array_item(item, Some(element));
                self.check_assignable(item, item_ty, element);
            }
            return self.interner.array(element);
        }

        let mut element: Option<TypeId> = None;
        for &item in &array.elements {
            let item_ty = self.check_array_item(item, None);
            if item_ty.is_error() {
                continue;
            }
            element = Some(match element {
                Some(previous) => self.relation().common_supertype(previous, item_ty),
                None => item_ty,
            });
        }
        self.interner.array(element.unwrap_or(TypeId::OBJECT))
    }

    /// Type an array literal element; spread elements contribute their
    /// element type.
    fn check_array_item(&mut self, item: NodeIndex, element: Option<TypeId>) -> TypeId {
        if let Some(NodeKind::Spread(spread)) = self.arena.kind(item) {
            let inner = spread.expr;
            let spread_ty = match element {
                Some(element) => {
                    let expected = self.interner.array(element);
                    self.check_with_expected(inner, expected)
                }
                None => self.check(inner),
            };
            self.types.set(item, spread_ty);
            return self.element_type(spread_ty);
        }
        match element {
            Some(element) => self.check_with_expected(item, element),
            None => self.check(item),
        }
    }

    /// Whether `ty` is an instance of the builtin `kind`.
    pub(crate) fn is_builtin(&self, ty: TypeId, kind: BuiltinKind) -> bool {
        matches!(self.interner.lookup(ty), Some(TypeData::Builtin(k, _)) if *k == kind)
    }
}

/// Binary numeric promotion: `char` operands compute in `int`.
fn promote(ty: TypeId) -> TypeId {
    if ty == TypeId::CHAR { TypeId::INT } else { ty }
}

fn arithmetic_result(left: TypeId, right: TypeId) -> Option<TypeId> {
    let (l, r) = (left.numeric_rank()?, right.numeric_rank()?);
    Some(promote(TypeId::from_numeric_rank(l.max(r))))
}

fn integral_result(left: TypeId, right: TypeId) -> Option<TypeId> {
    let result = arithmetic_result(left, right)?;
    // Floating operands are truncated to `long`.
    Some(if result.is_integral() { result } else { TypeId::LONG })
}
