//! End-to-end tests for the reference checker: bind a small unit built with
//! the node factory, check it, and inspect node types and diagnostics.

use etsl_ast::*;
use etsl_binder::{Resolver, ScopeBuilder, ScopeTable};
use etsl_checker::*;
use etsl_common::{DiagnosticBag, Span, UnitId, diagnostic_codes};

const FILE: &str = "test.ets";

struct Checked {
    arena: NodeArena,
    root: NodeIndex,
    types: NodeTypes,
    interner: TypeInterner,
    diagnostics: DiagnosticBag,
}

impl Checked {
    fn ty(&self, node: NodeIndex) -> TypeId {
        self.types.get(node).expect("node was not typed")
    }

    fn text(&self, node: NodeIndex) -> String {
        format_type(&self.interner, self.ty(node))
    }

    fn count(&self, code: u32) -> usize {
        self.diagnostics.count_code(code)
    }
}

/// Build a program from the statements returned by `build`, then bind and
/// check it.
fn check_program(build: impl FnOnce(&mut NodeFactory<'_>) -> NodeList) -> Checked {
    let mut arena = NodeArena::new();
    let root = {
        let mut f = NodeFactory::plain(&mut arena, Span::new(0, 100));
        let statements = build(&mut f);
        f.node(NodeKind::Program(ProgramDecl { statements }))
    };
    let mut scopes = ScopeTable::new();
    let mut diagnostics = DiagnosticBag::new();
    ScopeBuilder::new(&arena, &mut scopes, &mut diagnostics, FILE).build_unit(root);
    Resolver::new(&arena, &mut scopes, &mut diagnostics, FILE).resolve_unit(root);

    let mut types = NodeTypes::new();
    let mut interner = TypeInterner::new();
    {
        let unit = CheckedUnit {
            id: UnitId(0),
            file: FILE,
            arena: &arena,
            scopes: &scopes,
        };
        let mut checker = Checker::new(unit, &mut types, &(), &mut interner, &mut diagnostics);
        checker.check_unit(root);
    }
    Checked {
        arena,
        root,
        types,
        interner,
        diagnostics,
    }
}

fn function(
    f: &mut NodeFactory<'_>,
    name: &str,
    type_params: NodeList,
    params: NodeList,
    return_type: NodeIndex,
    body: NodeIndex,
) -> NodeIndex {
    f.node(NodeKind::Function(FunctionDecl {
        modifiers: Modifiers::empty(),
        name: name.to_string(),
        type_params,
        params,
        return_type,
        body,
        annotations: NodeList::new(),
    }))
}

fn class(
    f: &mut NodeFactory<'_>,
    name: &str,
    extends: NodeIndex,
    members: NodeList,
) -> NodeIndex {
    f.class(
        ClassDecl {
            modifiers: Modifiers::empty(),
            name: name.to_string(),
            type_params: NodeList::new(),
            extends,
            implements: NodeList::new(),
            members,
            annotations: NodeList::new(),
        },
        NodeFlags::empty(),
    )
}

// =============================================================================
// Expressions
// =============================================================================

#[test]
fn test_binary_numeric_rank_is_max_of_operands() {
    let mut sum = NodeIndex::NONE;
    let mut chars = NodeIndex::NONE;
    let mut concat = NodeIndex::NONE;
    let checked = check_program(|f| {
        let one = f.int(1);
        let two = f.literal(LiteralValue::Long(2));
        sum = f.binary(BinaryOp::Add, one, two);
        let a = f.literal(LiteralValue::Char(u16::from(b'a')));
        let b = f.literal(LiteralValue::Char(u16::from(b'b')));
        chars = f.binary(BinaryOp::Mul, a, b);
        let s = f.string("n = ");
        let n = f.literal(LiteralValue::Double(1.5));
        concat = f.binary(BinaryOp::Add, s, n);
        let s1 = f.expr_stmt(sum);
        let s2 = f.expr_stmt(chars);
        let s3 = f.expr_stmt(concat);
        smallvec![s1, s2, s3]
    });
    assert_eq!(checked.ty(sum), TypeId::LONG);
    assert_eq!(checked.ty(chars), TypeId::INT);
    assert_eq!(checked.ty(concat), TypeId::STRING);
    assert!(checked.diagnostics.is_empty());
}

#[test]
fn test_inapplicable_operator_reports_once() {
    let mut bad = NodeIndex::NONE;
    let mut outer = NodeIndex::NONE;
    let checked = check_program(|f| {
        let t = f.boolean(true);
        let one = f.int(1);
        bad = f.binary(BinaryOp::Sub, t, one);
        let two = f.int(2);
        outer = f.binary(BinaryOp::Mul, bad, two);
        let stmt = f.expr_stmt(outer);
        smallvec![stmt]
    });
    assert_eq!(checked.ty(bad), TypeId::ERROR);
    // Error operands propagate without a second report.
    assert_eq!(checked.ty(outer), TypeId::ERROR);
    assert_eq!(checked.count(diagnostic_codes::OPERATOR_NOT_APPLICABLE), 1);
}

#[test]
fn test_unary_operators() {
    let mut negated = NodeIndex::NONE;
    let mut not = NodeIndex::NONE;
    let mut bad = NodeIndex::NONE;
    let checked = check_program(|f| {
        let c = f.literal(LiteralValue::Char(65));
        negated = f.unary(UnaryOp::Minus, c);
        let s = f.string("x");
        not = f.unary(UnaryOp::Not, s);
        let d = f.literal(LiteralValue::Double(1.0));
        bad = f.unary(UnaryOp::BitNot, d);
        let s1 = f.expr_stmt(negated);
        let s2 = f.expr_stmt(not);
        let s3 = f.expr_stmt(bad);
        smallvec![s1, s2, s3]
    });
    assert_eq!(checked.ty(negated), TypeId::INT);
    assert_eq!(checked.ty(not), TypeId::BOOLEAN);
    assert_eq!(checked.ty(bad), TypeId::ERROR);
    assert_eq!(checked.count(diagnostic_codes::UNARY_OPERATOR_NOT_APPLICABLE), 1);
}

#[test]
fn test_conditional_takes_common_supertype() {
    let mut cond = NodeIndex::NONE;
    let checked = check_program(|f| {
        let t = f.boolean(true);
        let one = f.int(1);
        let half = f.literal(LiteralValue::Double(0.5));
        cond = f.node(NodeKind::Conditional(ConditionalExpr {
            test: t,
            consequent: one,
            alternate: half,
        }));
        let stmt = f.expr_stmt(cond);
        smallvec![stmt]
    });
    assert_eq!(checked.ty(cond), TypeId::DOUBLE);
}

// =============================================================================
// Declarations and assignability
// =============================================================================

#[test]
fn test_annotated_variable_checks_initializer() {
    let checked = check_program(|f| {
        let string_ty = f.primitive(PrimitiveKind::String);
        let one = f.int(1);
        let bad = f.var(VarKind::Let, "s", string_ty, one);
        let double_ty = f.primitive(PrimitiveKind::Double);
        let two = f.int(2);
        let widened = f.var(VarKind::Let, "d", double_ty, two);
        smallvec![bad, widened]
    });
    assert_eq!(checked.count(diagnostic_codes::TYPE_NOT_ASSIGNABLE), 1);
    let message = &checked.diagnostics.iter().next().expect("diagnostic").message_text;
    assert!(message.contains("'int'") && message.contains("'string'"), "{message}");
}

#[test]
fn test_unannotated_variable_takes_initializer_type() {
    let mut x_ref = NodeIndex::NONE;
    let checked = check_program(|f| {
        let long = f.literal(LiteralValue::Long(7));
        let x = f.var(VarKind::Const, "x", NodeIndex::NONE, long);
        x_ref = f.ident("x");
        let stmt = f.expr_stmt(x_ref);
        smallvec![x, stmt]
    });
    assert_eq!(checked.ty(x_ref), TypeId::LONG);
}

#[test]
fn test_assignment_to_const_is_reported() {
    let checked = check_program(|f| {
        let one = f.int(1);
        let k = f.var(VarKind::Const, "K", NodeIndex::NONE, one);
        let target = f.ident("K");
        let two = f.int(2);
        let assign = f.assign(target, two);
        let stmt = f.expr_stmt(assign);
        smallvec![k, stmt]
    });
    assert_eq!(checked.count(diagnostic_codes::ASSIGNMENT_TO_READONLY), 1);
}

#[test]
fn test_function_return_type_inferred_from_body() {
    let mut call = NodeIndex::NONE;
    let checked = check_program(|f| {
        let int_ty = f.primitive(PrimitiveKind::Int);
        let a = f.param("a", int_ty);
        let a_ref = f.ident("a");
        let half = f.literal(LiteralValue::Float(0.5));
        let product = f.binary(BinaryOp::Mul, a_ref, half);
        let ret = f.ret(product);
        let body = f.block(smallvec![ret]);
        let func = function(f, "scale", NodeList::new(), smallvec![a], NodeIndex::NONE, body);
        let callee = f.ident("scale");
        let three = f.int(3);
        call = f.call(callee, smallvec![three]);
        let stmt = f.expr_stmt(call);
        smallvec![func, stmt]
    });
    assert_eq!(checked.ty(call), TypeId::FLOAT);
    assert!(checked.diagnostics.is_empty());
}

#[test]
fn test_return_checked_against_declared_type() {
    let checked = check_program(|f| {
        let int_ty = f.primitive(PrimitiveKind::Int);
        let s = f.string("no");
        let ret = f.ret(s);
        let body = f.block(smallvec![ret]);
        let func = function(f, "f", NodeList::new(), NodeList::new(), int_ty, body);
        smallvec![func]
    });
    assert_eq!(checked.count(diagnostic_codes::TYPE_NOT_ASSIGNABLE), 1);
}

// =============================================================================
// Calls
// =============================================================================

#[test]
fn test_call_arity_mismatch() {
    let checked = check_program(|f| {
        let int_ty = f.primitive(PrimitiveKind::Int);
        let a = f.param("a", int_ty);
        let int_ty2 = f.primitive(PrimitiveKind::Int);
        let b = f.node(NodeKind::Parameter(ParameterDecl {
            name: "b".to_string(),
            type_annotation: int_ty2,
            init: NodeIndex::NONE,
            optional: true,
            rest: false,
        }));
        let ret_ty = f.primitive(PrimitiveKind::Void);
        let body = f.block(NodeList::new());
        let func = function(f, "f", NodeList::new(), smallvec![a, b], ret_ty, body);
        let c1 = f.ident("f");
        let none = f.call(c1, NodeList::new());
        let c2 = f.ident("f");
        let one = f.int(1);
        let ok = f.call(c2, smallvec![one]);
        let c3 = f.ident("f");
        let (x, y, z) = (f.int(1), f.int(2), f.int(3));
        let many = f.call(c3, smallvec![x, y, z]);
        let s1 = f.expr_stmt(none);
        let s2 = f.expr_stmt(ok);
        let s3 = f.expr_stmt(many);
        smallvec![func, s1, s2, s3]
    });
    assert_eq!(checked.count(diagnostic_codes::ARGUMENT_COUNT_MISMATCH), 2);
}

#[test]
fn test_generic_call_infers_type_argument() {
    let mut call = NodeIndex::NONE;
    let checked = check_program(|f| {
        let t = f.type_param("T", NodeIndex::NONE, NodeIndex::NONE);
        let t_ref = f.type_ref("T", NodeList::new());
        let v = f.param("v", t_ref);
        let ret_ty = f.type_ref("T", NodeList::new());
        let v_ref = f.ident("v");
        let ret = f.ret(v_ref);
        let body = f.block(smallvec![ret]);
        let func = function(f, "id", smallvec![t], smallvec![v], ret_ty, body);
        let callee = f.ident("id");
        let s = f.string("x");
        call = f.call(callee, smallvec![s]);
        let stmt = f.expr_stmt(call);
        smallvec![func, stmt]
    });
    assert_eq!(checked.ty(call), TypeId::STRING);
    assert!(checked.diagnostics.is_empty());
}

#[test]
fn test_calling_non_function_reports() {
    let checked = check_program(|f| {
        let one = f.int(1);
        let x = f.var(VarKind::Let, "x", NodeIndex::NONE, one);
        let callee = f.ident("x");
        let call = f.call(callee, NodeList::new());
        let stmt = f.expr_stmt(call);
        smallvec![x, stmt]
    });
    assert_eq!(checked.count(diagnostic_codes::NOT_CALLABLE), 1);
}

#[test]
fn test_function_typed_value_has_invoke_members() {
    let mut invoke = NodeIndex::NONE;
    let checked = check_program(|f| {
        let int_ty = f.primitive(PrimitiveKind::Int);
        let p = f.param("x", int_ty);
        let ret_ty = f.primitive(PrimitiveKind::Int);
        let fn_ty = f.function_type(smallvec![p], ret_ty);
        let v = f.var(VarKind::Let, "g", fn_ty, NodeIndex::NONE);
        let g = f.ident("g");
        let two = f.int(2);
        invoke = f.call_method(g, "invoke1", smallvec![two]);
        let g2 = f.ident("g");
        let missing = f.member(g2, "invoke0");
        let s1 = f.expr_stmt(invoke);
        let s2 = f.expr_stmt(missing);
        smallvec![v, s1, s2]
    });
    assert_eq!(checked.ty(invoke), TypeId::INT);
    assert_eq!(checked.count(diagnostic_codes::PROPERTY_NOT_FOUND), 1);
}

// =============================================================================
// Classes
// =============================================================================

#[test]
fn test_inherited_member_lookup() {
    let mut access = NodeIndex::NONE;
    let checked = check_program(|f| {
        let int_ty = f.primitive(PrimitiveKind::Int);
        let zero = f.int(0);
        let x = f.field(Modifiers::empty(), "x", int_ty, zero);
        let base = class(f, "Base", NodeIndex::NONE, smallvec![x]);
        let extends = f.type_ref("Base", NodeList::new());
        let derived = class(f, "Derived", extends, NodeList::new());
        let instance = f.new_instance("Derived", NodeList::new(), NodeList::new());
        let d = f.var(VarKind::Const, "d", NodeIndex::NONE, instance);
        let d_ref = f.ident("d");
        access = f.member(d_ref, "x");
        let d_ref2 = f.ident("d");
        let missing = f.member(d_ref2, "y");
        let s1 = f.expr_stmt(access);
        let s2 = f.expr_stmt(missing);
        smallvec![base, derived, d, s1, s2]
    });
    assert_eq!(checked.ty(access), TypeId::INT);
    assert_eq!(checked.count(diagnostic_codes::PROPERTY_NOT_FOUND), 1);
    assert!(checked.types.member_target(access).is_some());
}

#[test]
fn test_derived_class_assignable_to_base() {
    let checked = check_program(|f| {
        let base = class(f, "Base", NodeIndex::NONE, NodeList::new());
        let extends = f.type_ref("Base", NodeList::new());
        let derived = class(f, "Derived", extends, NodeList::new());
        let base_ty = f.type_ref("Base", NodeList::new());
        let instance = f.new_instance("Derived", NodeList::new(), NodeList::new());
        let ok = f.var(VarKind::Let, "b", base_ty, instance);
        let derived_ty = f.type_ref("Derived", NodeList::new());
        let base_instance = f.new_instance("Base", NodeList::new(), NodeList::new());
        let bad = f.var(VarKind::Let, "d", derived_ty, base_instance);
        smallvec![base, derived, ok, bad]
    });
    assert_eq!(checked.count(diagnostic_codes::TYPE_NOT_ASSIGNABLE), 1);
}

#[test]
fn test_this_outside_class_is_reported() {
    let mut this = NodeIndex::NONE;
    let checked = check_program(|f| {
        this = f.this();
        let stmt = f.expr_stmt(this);
        smallvec![stmt]
    });
    assert_eq!(checked.ty(this), TypeId::ERROR);
    assert_eq!(checked.count(diagnostic_codes::THIS_OUTSIDE_CLASS), 1);
}

#[test]
fn test_this_member_inside_method() {
    let mut access = NodeIndex::NONE;
    let checked = check_program(|f| {
        let string_ty = f.primitive(PrimitiveKind::String);
        let empty = f.string("");
        let name = f.field(Modifiers::empty(), "name", string_ty, empty);
        access = f.this_member("name");
        let ret = f.ret(access);
        let body = f.block(smallvec![ret]);
        let ret_ty = f.primitive(PrimitiveKind::String);
        let method = f.simple_method(Modifiers::empty(), "getName", NodeList::new(), ret_ty, body);
        let decl = class(f, "Named", NodeIndex::NONE, smallvec![name, method]);
        smallvec![decl]
    });
    assert_eq!(checked.ty(access), TypeId::STRING);
    assert!(checked.diagnostics.is_empty());
}

// =============================================================================
// Builtins and literals
// =============================================================================

#[test]
fn test_record_object_literal_takes_expected_type() {
    let mut literal = NodeIndex::NONE;
    let checked = check_program(|f| {
        let key = f.primitive(PrimitiveKind::String);
        let value = f.primitive(PrimitiveKind::Int);
        let record_ty = f.type_ref("Record", smallvec![key, value]);
        let one = f.int(1);
        let prop = f.node(NodeKind::Property(Property {
            key: PropertyKey::Name("a".to_string()),
            value: one,
        }));
        let bad_value = f.string("two");
        let bad = f.node(NodeKind::Property(Property {
            key: PropertyKey::Name("b".to_string()),
            value: bad_value,
        }));
        literal = f.node(NodeKind::ObjectLiteral(ObjectLiteral {
            properties: smallvec![prop, bad],
        }));
        let r = f.var(VarKind::Const, "r", record_ty, literal);
        smallvec![r]
    });
    assert_eq!(checked.text(literal), "Record<string, int>");
    assert_eq!(checked.count(diagnostic_codes::TYPE_NOT_ASSIGNABLE), 1);
}

#[test]
fn test_array_literal_element_type() {
    let mut array = NodeIndex::NONE;
    let mut empty = NodeIndex::NONE;
    let checked = check_program(|f| {
        let (a, b) = (f.int(1), f.literal(LiteralValue::Long(2)));
        array = f.array(smallvec![a, b]);
        empty = f.array(NodeList::new());
        let s1 = f.expr_stmt(array);
        let s2 = f.expr_stmt(empty);
        smallvec![s1, s2]
    });
    assert_eq!(checked.text(array), "long[]");
    assert_eq!(checked.text(empty), "Object[]");
}

#[test]
fn test_unknown_type_reference_is_reported() {
    let checked = check_program(|f| {
        let ty = f.type_ref("Missing", NodeList::new());
        let v = f.var(VarKind::Let, "m", ty, NodeIndex::NONE);
        smallvec![v]
    });
    assert_eq!(checked.count(diagnostic_codes::CANNOT_FIND_TYPE), 1);
}

#[test]
fn test_every_expression_is_typed() {
    let checked = check_program(|f| {
        let int_ty = f.primitive(PrimitiveKind::Int);
        let a = f.param("a", int_ty);
        let a_ref = f.ident("a");
        let one = f.int(1);
        let cmp = f.binary(BinaryOp::Gt, a_ref, one);
        let a_ref2 = f.ident("a");
        let ret_a = f.ret(a_ref2);
        let zero = f.int(0);
        let ret_zero = f.ret(zero);
        let branch = f.if_(cmp, ret_a, ret_zero);
        let body = f.block(smallvec![branch]);
        let ret_ty = f.primitive(PrimitiveKind::Int);
        let func = function(f, "clamp", NodeList::new(), smallvec![a], ret_ty, body);
        smallvec![func]
    });
    let untyped: Vec<NodeIndex> = checked
        .arena
        .descendants(checked.root)
        .into_iter()
        .filter(|&n| checked.arena.kind(n).is_some_and(NodeKind::is_expression))
        .filter(|&n| !checked.types.has_type(n))
        .collect();
    assert!(untyped.is_empty(), "untyped expressions: {untyped:?}");
    assert!(checked.diagnostics.is_empty());
}

#[test]
fn test_check_is_idempotent() {
    let checked = check_program(|f| {
        let one = f.int(1);
        let x = f.var(VarKind::Const, "x", NodeIndex::NONE, one);
        smallvec![x]
    });
    let before = checked.types.len();
    let mut types = checked.types.clone();
    let mut interner = checked.interner.clone();
    let mut diagnostics = DiagnosticBag::new();
    let mut scopes = ScopeTable::new();
    let mut bind_diagnostics = DiagnosticBag::new();
    ScopeBuilder::new(&checked.arena, &mut scopes, &mut bind_diagnostics, FILE)
        .build_unit(checked.root);
    let unit = CheckedUnit {
        id: UnitId(0),
        file: FILE,
        arena: &checked.arena,
        scopes: &scopes,
    };
    Checker::new(unit, &mut types, &(), &mut interner, &mut diagnostics).check_unit(checked.root);
    assert_eq!(types.len(), before);
    assert!(diagnostics.is_empty());
}
