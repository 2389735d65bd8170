//! Tests for arena creation, parent links, slot writes and cloning.

use etsl_ast::*;
use etsl_common::Span;

fn sample_call(arena: &mut NodeArena) -> (NodeIndex, NodeIndex, NodeIndex) {
    let callee = arena.add_identifier("f", Span::new(0, 1));
    let arg = arena.add_literal(LiteralValue::Int(2), Span::new(2, 3));
    let call = arena.add_call(callee, smallvec![arg], Span::new(0, 4));
    (call, callee, arg)
}

#[test]
fn test_add_sets_parent_links() {
    let mut arena = NodeArena::new();
    let (call, callee, arg) = sample_call(&mut arena);
    assert_eq!(arena.parent(callee), call);
    assert_eq!(arena.parent(arg), call);
    assert!(arena.parent(call).is_none());
    assert_eq!(arena.children(call).as_slice(), &[callee, arg]);
}

#[test]
fn test_replace_child_detaches_old_node() {
    let mut arena = NodeArena::new();
    let (call, _, arg) = sample_call(&mut arena);
    let new_arg = arena.add_literal(LiteralValue::Int(3), Span::new(2, 3));
    assert!(arena.replace_child(call, arg, new_arg));
    assert_eq!(arena.parent(new_arg), call);
    assert!(arena.parent(arg).is_none());
    let args = &arena.kind(call).and_then(NodeKind::as_call).unwrap().args;
    assert_eq!(args.as_slice(), &[new_arg]);
    // A node that is not a child is not written anywhere.
    assert!(!arena.replace_child(call, arg, new_arg));
}

#[test]
fn test_append_and_remove_statement() {
    let mut arena = NodeArena::new();
    let program = arena.add_program(NodeList::new(), Span::new(0, 10));
    let stmt = arena.add_kind(NodeKind::Empty, Span::at(0));
    assert!(arena.append_child(program, stmt));
    assert_eq!(arena.parent(stmt), program);
    assert!(arena.remove_child(program, stmt));
    assert!(arena.children(program).is_empty());
    assert!(arena.parent(stmt).is_none());
}

#[test]
fn test_clone_subtree_is_deep_and_detached() {
    let mut arena = NodeArena::new();
    let (call, callee, arg) = sample_call(&mut arena);
    let copy = arena.clone_subtree(call);
    assert_ne!(copy, call);
    assert!(arena.parent(copy).is_none());
    let children = arena.children(copy);
    assert_eq!(children.len(), 2);
    assert!(!children.contains(&callee));
    assert!(!children.contains(&arg));
    assert_eq!(arena.identifier_name(children[0]), Some("f"));
    assert_eq!(arena.parent(children[1]), copy);
    assert_eq!(print_node(&arena, copy), print_node(&arena, call));
}

#[test]
fn test_rebuild_parents_after_deserialize() {
    let mut arena = NodeArena::new();
    let (call, callee, _) = sample_call(&mut arena);
    let json = serde_json::to_string(&arena).unwrap();
    let restored: NodeArena = serde_json::from_str(&json).unwrap();
    // Parent links are not serialized.
    assert!(restored.parent(callee).is_none());
    let mut restored = restored;
    restored.rebuild_parents();
    assert_eq!(restored.parent(callee), call);
}

#[test]
fn test_ancestors_and_descendants() {
    let mut arena = NodeArena::new();
    let (call, callee, arg) = sample_call(&mut arena);
    let stmt = arena.add_expr_stmt(call, Span::new(0, 5));
    let block = arena.add_block(smallvec![stmt], Span::new(0, 6));
    let ancestors: Vec<_> = arena.ancestors(arg).collect();
    assert_eq!(ancestors, vec![call, stmt, block]);
    assert_eq!(arena.descendants(block), vec![block, stmt, call, callee, arg]);
    assert!(arena.is_within(arg, block));
    assert!(!arena.is_within(block, arg));
}

#[test]
fn test_factory_marks_nodes_synthetic() {
    let mut arena = NodeArena::new();
    let mut f = NodeFactory::new(&mut arena, Span::at(7));
    let this = f.this();
    let member = f.member(this, "_ordinal");
    let ret = f.ret(member);
    assert!(arena.get(ret).unwrap().is_synthetic());
    assert_eq!(arena.span(member), Span::at(7));
    assert_eq!(print_node(&arena, ret), "return this._ordinal;");
}

#[test]
fn test_contains_this_reference_skips_nested_functions() {
    use etsl_ast::syntax::transform_utils::contains_this_reference;

    let mut arena = NodeArena::new();
    let mut f = NodeFactory::plain(&mut arena, Span::at(0));
    let this = f.this();
    let inner_ret = f.ret(this);
    let inner_body = f.block(smallvec![inner_ret]);
    let inner = f.simple_method(
        Modifiers::empty(),
        "m",
        NodeList::new(),
        NodeIndex::NONE,
        inner_body,
    );
    let outer_this = f.this();
    let arrow_body = f.block(smallvec![]);
    let arrow = f.node(NodeKind::Arrow(ArrowFunction {
        type_params: NodeList::new(),
        params: NodeList::new(),
        return_type: NodeIndex::NONE,
        body: arrow_body,
    }));
    assert!(contains_this_reference(&arena, outer_this));
    assert!(!contains_this_reference(&arena, inner));
    assert!(!contains_this_reference(&arena, arrow));
}
