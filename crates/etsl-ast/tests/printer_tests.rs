//! Printer output tests.

use etsl_ast::*;
use etsl_common::Span;

#[test]
fn test_print_annotation_usage() {
    let mut arena = NodeArena::new();
    let mut f = NodeFactory::plain(&mut arena, Span::at(0));
    let zero = f.int(0);
    let five = f.int(5);
    let a = f.node(NodeKind::Property(Property {
        key: PropertyKey::Name("a".into()),
        value: zero,
    }));
    let d = f.node(NodeKind::Property(Property {
        key: PropertyKey::Name("d".into()),
        value: five,
    }));
    let anno = f.node(NodeKind::Annotation(AnnotationUsage {
        name: "Anno".into(),
        properties: smallvec![a, d],
    }));
    assert_eq!(print_node(&arena, anno), "@Anno({a = 0, d = 5})");
}

#[test]
fn test_print_parenthesizes_by_precedence() {
    let mut arena = NodeArena::new();
    let mut f = NodeFactory::plain(&mut arena, Span::at(0));
    let a = f.ident("a");
    let b = f.ident("b");
    let c = f.ident("c");
    let sum = f.binary(BinaryOp::Add, a, b);
    let product = f.binary(BinaryOp::Mul, sum, c);
    assert_eq!(print_node(f.arena(), product), "(a + b) * c");

    let x = f.ident("x");
    let y = f.ident("y");
    let z = f.ident("z");
    let mul = f.binary(BinaryOp::Mul, y, z);
    let add = f.binary(BinaryOp::Add, x, mul);
    assert_eq!(print_node(&arena, add), "x + y * z");
}

#[test]
fn test_print_class_with_members() {
    let mut arena = NodeArena::new();
    let mut f = NodeFactory::plain(&mut arena, Span::at(0));
    let int_ty = f.primitive(PrimitiveKind::Int);
    let field = f.field(Modifiers::PRIVATE | Modifiers::READONLY, "_ordinal", int_ty, NodeIndex::NONE);
    let member = f.this_member("_ordinal");
    let ret = f.ret(member);
    let body = f.block(smallvec![ret]);
    let int_ty2 = f.primitive(PrimitiveKind::Int);
    let method = f.simple_method(Modifiers::PUBLIC, "getOrdinal", NodeList::new(), int_ty2, body);
    let class = f.class(
        ClassDecl {
            modifiers: Modifiers::FINAL,
            name: "E".into(),
            type_params: NodeList::new(),
            extends: NodeIndex::NONE,
            implements: NodeList::new(),
            members: smallvec![field, method],
            annotations: NodeList::new(),
        },
        NodeFlags::empty(),
    );
    let expected = "final class E {\n    private readonly _ordinal: int;\n    public getOrdinal(): int {\n        return this._ordinal;\n    }\n}";
    assert_eq!(print_node(&arena, class), expected);
}

#[test]
fn test_mapper_hides_and_substitutes_children() {
    let mut arena = NodeArena::new();
    let one = arena.add_literal(LiteralValue::Int(1), Span::at(0));
    let two = arena.add_literal(LiteralValue::Int(2), Span::at(0));
    let old = arena.add_identifier("old", Span::at(0));
    let array = arena.add_kind(
        NodeKind::ArrayLiteral(ArrayLiteral {
            elements: smallvec![one, two],
        }),
        Span::at(0),
    );
    let mapper = move |_parent: NodeIndex, n: NodeIndex| {
        if n == one {
            Some(old)
        } else if n == two {
            None
        } else {
            Some(n)
        }
    };
    let printed = Printer::with_mapper(&arena, &mapper).print(array);
    assert_eq!(printed, "[old]");
}
