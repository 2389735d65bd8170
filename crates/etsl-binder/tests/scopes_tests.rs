//! Tests for scope construction and identifier resolution.

use etsl_ast::*;
use etsl_binder::*;
use etsl_common::{DiagnosticBag, Span, diagnostic_codes};

const FILE: &str = "test.ets";

struct Fixture {
    arena: NodeArena,
    root: NodeIndex,
}

/// ```text
/// const K = 1;
/// function f(p: int) {
///     let x = K;
///     { let y = p + x; }
/// }
/// ```
fn function_fixture() -> Fixture {
    let mut arena = NodeArena::new();
    let mut f = NodeFactory::plain(&mut arena, Span::new(0, 80));
    let one = f.int(1);
    let k = f.var(VarKind::Const, "K", NodeIndex::NONE, one);
    let int_ty = f.primitive(PrimitiveKind::Int);
    let p = f.param("p", int_ty);
    let k_ref = f.ident("K");
    let x = f.var(VarKind::Let, "x", NodeIndex::NONE, k_ref);
    let p_ref = f.ident("p");
    let x_ref = f.ident("x");
    let sum = f.binary(BinaryOp::Add, p_ref, x_ref);
    let y = f.var(VarKind::Let, "y", NodeIndex::NONE, sum);
    let inner = f.block(smallvec![y]);
    let body = f.block(smallvec![x, inner]);
    let func = f.node(NodeKind::Function(FunctionDecl {
        modifiers: Modifiers::empty(),
        name: "f".to_string(),
        type_params: NodeList::new(),
        params: smallvec![p],
        return_type: NodeIndex::NONE,
        body,
        annotations: NodeList::new(),
    }));
    let root = f.node(NodeKind::Program(ProgramDecl {
        statements: smallvec![k, func],
    }));
    Fixture { arena, root }
}

fn bind(fixture: &Fixture) -> (ScopeTable, DiagnosticBag) {
    let mut table = ScopeTable::new();
    let mut diagnostics = DiagnosticBag::new();
    ScopeBuilder::new(&fixture.arena, &mut table, &mut diagnostics, FILE)
        .build_unit(fixture.root);
    Resolver::new(&fixture.arena, &mut table, &mut diagnostics, FILE).resolve_unit(fixture.root);
    (table, diagnostics)
}

fn find_ident(arena: &NodeArena, root: NodeIndex, name: &str) -> NodeIndex {
    arena
        .descendants(root)
        .into_iter()
        .find(|&n| arena.identifier_name(n) == Some(name))
        .expect("identifier present")
}

#[test]
fn test_scope_tree_shape() {
    let fixture = function_fixture();
    let (table, diagnostics) = bind(&fixture);
    assert!(diagnostics.is_empty());

    let module = table.root.expect("module scope");
    assert_eq!(table.scope(module).unwrap().kind, ScopeKind::Module);
    let names: Vec<_> = table.scope(module).unwrap().bindings.keys().cloned().collect();
    assert_eq!(names, vec!["K".to_string(), "f".to_string()]);

    let kinds: Vec<_> = table.scopes.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ScopeKind::Module,
            ScopeKind::Function,
            ScopeKind::Block,
            ScopeKind::Block
        ]
    );
}

#[test]
fn test_resolution_respects_scope_ancestry() {
    let fixture = function_fixture();
    let (table, _) = bind(&fixture);
    let arena = &fixture.arena;

    let p_ref = find_ident(arena, fixture.root, "p");
    let binding = table.resolved_binding(p_ref).expect("p resolved");
    assert_eq!(binding.kind, BindingKind::Parameter);

    let k_ref = find_ident(arena, fixture.root, "K");
    let binding = table.resolved_binding(k_ref).expect("K resolved");
    assert!(binding.is_const());
    assert_eq!(Some(binding.scope), table.root);

    assert!(table.misplaced_resolutions(arena).is_empty());
}

#[test]
fn test_unresolved_identifier_reported_once() {
    let mut arena = NodeArena::new();
    let mut f = NodeFactory::plain(&mut arena, Span::new(0, 10));
    let missing = f.ident("missing");
    let stmt = f.expr_stmt(missing);
    let root = f.node(NodeKind::Program(ProgramDecl {
        statements: smallvec![stmt],
    }));
    let fixture = Fixture { arena, root };
    let (mut table, mut diagnostics) = bind(&fixture);
    assert_eq!(diagnostics.count_code(diagnostic_codes::UNRESOLVED_IDENTIFIER), 1);

    // Resolving again does not duplicate the diagnostic.
    Resolver::new(&fixture.arena, &mut table, &mut diagnostics, FILE).resolve_unit(root);
    assert_eq!(diagnostics.count_code(diagnostic_codes::UNRESOLVED_IDENTIFIER), 1);
}

#[test]
fn test_duplicate_declaration_reported() {
    let mut arena = NodeArena::new();
    let mut f = NodeFactory::plain(&mut arena, Span::new(0, 20));
    let a = f.var(VarKind::Let, "a", NodeIndex::NONE, NodeIndex::NONE);
    let b = f.var(VarKind::Let, "a", NodeIndex::NONE, NodeIndex::NONE);
    let root = f.node(NodeKind::Program(ProgramDecl {
        statements: smallvec![a, b],
    }));
    let fixture = Fixture { arena, root };
    let (table, diagnostics) = bind(&fixture);
    assert_eq!(diagnostics.count_code(diagnostic_codes::DUPLICATE_IDENTIFIER), 1);
    assert!(table.binding_of_decl(a).is_some());
    assert!(table.binding_of_decl(b).is_none());
}

#[test]
fn test_rebuilding_is_idempotent() {
    let fixture = function_fixture();
    let (mut table, mut diagnostics) = bind(&fixture);
    let scopes = table.scopes.len();
    let bindings = table.bindings.len();

    ScopeBuilder::new(&fixture.arena, &mut table, &mut diagnostics, FILE)
        .build_unit(fixture.root);
    Resolver::new(&fixture.arena, &mut table, &mut diagnostics, FILE).resolve_unit(fixture.root);

    assert_eq!(table.scopes.len(), scopes);
    assert_eq!(table.bindings.len(), bindings);
    assert!(diagnostics.is_empty());
}

#[test]
fn test_subtree_rescope_after_insertion() {
    let mut fixture = function_fixture();
    let (mut table, mut diagnostics) = bind(&fixture);

    // Append `let z = K;` to the function body and bind only that statement.
    let body = fixture
        .arena
        .descendants(fixture.root)
        .into_iter()
        .find(|&n| matches!(fixture.arena.kind(n), Some(NodeKind::Block(_))))
        .unwrap();
    let mut f = NodeFactory::new(&mut fixture.arena, Span::at(40));
    let k_ref = f.ident("K");
    let z = f.var(VarKind::Let, "z", NodeIndex::NONE, k_ref);
    fixture.arena.append_child(body, z);

    let enclosing = table.scope_of_node(body).unwrap();
    ScopeBuilder::new(&fixture.arena, &mut table, &mut diagnostics, FILE)
        .build_subtree(z, enclosing);
    Resolver::new(&fixture.arena, &mut table, &mut diagnostics, FILE).resolve_subtree(z);

    assert!(table.lookup_local(enclosing, "z").is_some());
    let binding = table.resolved_binding(k_ref).unwrap();
    assert_eq!(binding.name, "K");
}

#[test]
fn test_unbind_subtree_erases_bindings() {
    let fixture = function_fixture();
    let (mut table, _) = bind(&fixture);
    let module = table.root.unwrap();
    let func = fixture.arena.children(fixture.root)[1];

    table.unbind_subtree(&fixture.arena, func);

    assert!(table.lookup_local(module, "f").is_none());
    assert!(table.scope_of_node(func).is_none());
    let p_ref = find_ident(&fixture.arena, fixture.root, "p");
    assert!(table.resolution(p_ref).is_none());
    assert!(table.lookup_local(module, "K").is_some());
}

#[test]
fn test_repoint_keeps_references_valid() {
    let mut arena = NodeArena::new();
    let mut f = NodeFactory::plain(&mut arena, Span::new(0, 30));
    let member = f.node(NodeKind::EnumMember(EnumMember {
        name: "A".to_string(),
        init: NodeIndex::NONE,
    }));
    let decl = f.node(NodeKind::Enum(EnumDecl {
        modifiers: Modifiers::empty(),
        name: "Color".to_string(),
        members: smallvec![member],
    }));
    let reference = f.ident("Color");
    let stmt = f.expr_stmt(reference);
    let root = f.node(NodeKind::Program(ProgramDecl {
        statements: smallvec![decl, stmt],
    }));
    let fixture = Fixture { arena, root };
    let (mut table, _) = bind(&fixture);

    let binding = table.binding_of_decl(decl).unwrap();
    let class = NodeIndex(fixture.arena.len() as u32);
    table.repoint(binding, class, BindingKind::Class, BindingFlags::ENUM_LIKE);

    assert_eq!(table.binding_of_decl(class), Some(binding));
    assert!(table.binding_of_decl(decl).is_none());
    let resolved = table.resolved_binding(reference).unwrap();
    assert_eq!(resolved.kind, BindingKind::Class);
    assert!(resolved.flags.contains(BindingFlags::ENUM_LIKE));
}
