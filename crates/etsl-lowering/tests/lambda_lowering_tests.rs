//! Closure conversion: arrows become lambda classes, function references
//! are wrapped and indirect calls go through `invoke` methods.

mod common;

use common::{Fixture, arrow, class, function, int_type};
use etsl_ast::*;
use etsl_common::{DiagnosticCategory, diagnostic_codes};

/// `(x: int) => int`
fn int_to_int(f: &mut NodeFactory<'_>) -> NodeIndex {
    let param_ty = int_type(f);
    let param = f.param("x", param_ty);
    let ret = int_type(f);
    f.function_type(smallvec![param], ret)
}

/// `(x: int): int => { return x + <addend>; }`
fn add_arrow(f: &mut NodeFactory<'_>, addend: NodeIndex) -> NodeIndex {
    let ty = int_type(f);
    let x = f.param("x", ty);
    let x_ref = f.ident("x");
    let sum = f.binary(BinaryOp::Add, x_ref, addend);
    let ret = f.ret(sum);
    let ret_ty = int_type(f);
    arrow(f, smallvec![x], ret_ty, smallvec![ret])
}

fn method(
    f: &mut NodeFactory<'_>,
    name: &str,
    params: NodeList,
    return_type: NodeIndex,
    statements: NodeList,
) -> NodeIndex {
    let body = f.block(statements);
    f.simple_method(Modifiers::empty(), name, params, return_type, body)
}

fn method_decl<'a>(fx: &'a Fixture, class: &str, name: &str) -> Option<&'a MethodDecl> {
    let arena = fx.arena();
    fx.class(class)?
        .members
        .iter()
        .filter_map(|&m| arena.kind(m).and_then(NodeKind::as_method))
        .find(|m| m.name == name)
}

#[test]
fn test_module_arrow_becomes_function_and_class() {
    // let inc: (x: int) => int = (x: int): int => { return x + 1; };
    let mut fx = Fixture::single(|f| {
        let ty = int_to_int(f);
        let one = f.int(1);
        let init = add_arrow(f, one);
        smallvec![f.var(VarKind::Let, "inc", ty, init)]
    });
    fx.run().unwrap();
    let printed = fx.print();
    assert!(
        printed.contains("let inc: (x: int) => int = new LambdaObject$0();"),
        "{printed}"
    );
    assert!(printed.contains("function lambda$invoke$0(x: int): int {"), "{printed}");
    assert!(
        printed.contains("final class LambdaObject$0 implements (p0: int) => int {"),
        "{printed}"
    );
    assert!(printed.contains("return lambda$invoke$0(x);"), "{printed}");
    assert_eq!(
        fx.member_names("LambdaObject$0"),
        vec!["constructor", "invoke1", "invoke"]
    );
}

#[test]
fn test_lambda_class_and_callee_are_flagged() {
    let mut fx = Fixture::single(|f| {
        let ty = int_to_int(f);
        let one = f.int(1);
        let init = add_arrow(f, one);
        smallvec![f.var(VarKind::Let, "inc", ty, init)]
    });
    fx.run().unwrap();
    let arena = fx.arena();
    let flagged = |wanted: NodeFlags| {
        arena
            .children(fx.root())
            .into_iter()
            .filter(|&n| arena.flags(n).contains(wanted))
            .count()
    };
    assert_eq!(flagged(NodeFlags::LAMBDA_CLASS), 1);
    assert_eq!(flagged(NodeFlags::LAMBDA_CALLEE), 1);
}

#[test]
fn test_captures_become_fields_and_static_callee() {
    // class C { m(k: int): (x: int) => int { return (x: int): int => { return x + k; }; } }
    let mut fx = Fixture::single(|f| {
        let k_ty = int_type(f);
        let k = f.param("k", k_ty);
        let k_ref = f.ident("k");
        let lambda = add_arrow(f, k_ref);
        let ret = f.ret(lambda);
        let ret_ty = int_to_int(f);
        let m = method(f, "m", smallvec![k], ret_ty, smallvec![ret]);
        smallvec![class(f, "C", smallvec![m])]
    });
    fx.run().unwrap();
    let printed = fx.print();
    assert!(printed.contains("return new LambdaObject$0(k);"), "{printed}");
    assert!(
        printed.contains("private static lambda$invoke$0(k: int, x: int): int {"),
        "{printed}"
    );
    assert!(printed.contains("private readonly k: int;"), "{printed}");
    assert!(
        printed.contains("return C.lambda$invoke$0(this.k, x);"),
        "{printed}"
    );
    assert_eq!(
        fx.member_names("LambdaObject$0"),
        vec!["k", "constructor", "invoke1", "invoke"]
    );
    assert_eq!(fx.member_names("C"), vec!["m", "lambda$invoke$0"]);
}

#[test]
fn test_this_capture_uses_instance_callee() {
    // class C { base: int = 0; m(): (x: int) => int { return (x: int): int => { return x + this.base; }; } }
    let mut fx = Fixture::single(|f| {
        let base_ty = int_type(f);
        let zero = f.int(0);
        let base = f.field(Modifiers::empty(), "base", base_ty, zero);
        let this_base = f.this_member("base");
        let lambda = add_arrow(f, this_base);
        let ret = f.ret(lambda);
        let ret_ty = int_to_int(f);
        let m = method(f, "m", NodeList::new(), ret_ty, smallvec![ret]);
        smallvec![class(f, "C", smallvec![base, m])]
    });
    fx.run().unwrap();
    let printed = fx.print();
    assert!(printed.contains("return new LambdaObject$0(this);"), "{printed}");
    assert!(printed.contains("private readonly $this: C;"), "{printed}");
    assert!(printed.contains("this.$this.lambda$invoke$0(x)"), "{printed}");
    let callee = method_decl(&fx, "C", "lambda$invoke$0").unwrap();
    assert!(callee.modifiers.contains(Modifiers::PRIVATE));
    assert!(!callee.modifiers.contains(Modifiers::STATIC));
}

#[test]
fn test_reassigned_capture_is_warned() {
    // function f(): void { let n: int = 0; let g: () => void = (): void => { n = n + 1; }; }
    let mut fx = Fixture::single(|f| {
        let n_ty = int_type(f);
        let zero = f.int(0);
        let n = f.var(VarKind::Let, "n", n_ty, zero);
        let target = f.ident("n");
        let n_ref = f.ident("n");
        let one = f.int(1);
        let sum = f.binary(BinaryOp::Add, n_ref, one);
        let assign = f.assign(target, sum);
        let stmt = f.expr_stmt(assign);
        let void = f.primitive(PrimitiveKind::Void);
        let lambda = arrow(f, NodeList::new(), void, smallvec![stmt]);
        let g_ret = f.primitive(PrimitiveKind::Void);
        let g_ty = f.function_type(NodeList::new(), g_ret);
        let g = f.var(VarKind::Let, "g", g_ty, lambda);
        let ret_ty = f.primitive(PrimitiveKind::Void);
        smallvec![function(f, "f", NodeList::new(), ret_ty, smallvec![n, g])]
    });
    fx.run().unwrap();
    assert_eq!(fx.count(diagnostic_codes::CAPTURED_VARIABLE_REASSIGNED), 1);
    let warning = fx
        .ctx
        .diagnostics
        .iter()
        .find(|d| d.code == diagnostic_codes::CAPTURED_VARIABLE_REASSIGNED)
        .unwrap();
    assert_eq!(warning.category, DiagnosticCategory::Warning);
    assert!(fx.print().contains("new LambdaObject$0(n)"), "{}", fx.print());
}

#[test]
fn test_indirect_calls_use_invoke_methods() {
    // function apply(g: (x: int) => int): int { return g(1); }
    // function applyAll(h: (a: int, ...rest: int[]) => int): int { return h(1, 2, 3); }
    let mut fx = Fixture::single(|f| {
        let g_ty = int_to_int(f);
        let g = f.param("g", g_ty);
        let g_ref = f.ident("g");
        let one = f.int(1);
        let call = f.call(g_ref, smallvec![one]);
        let ret = f.ret(call);
        let ret_ty = int_type(f);
        let apply = function(f, "apply", smallvec![g], ret_ty, smallvec![ret]);

        let a_ty = int_type(f);
        let a = f.param("a", a_ty);
        let element = int_type(f);
        let rest_ty = f.array_type(element);
        let rest = f.rest_param("rest", rest_ty);
        let h_ret = int_type(f);
        let h_ty = f.function_type(smallvec![a, rest], h_ret);
        let h = f.param("h", h_ty);
        let h_ref = f.ident("h");
        let (one, two, three) = (f.int(1), f.int(2), f.int(3));
        let call = f.call(h_ref, smallvec![one, two, three]);
        let ret = f.ret(call);
        let ret_ty = int_type(f);
        let apply_all = function(f, "applyAll", smallvec![h], ret_ty, smallvec![ret]);
        smallvec![apply, apply_all]
    });
    fx.run().unwrap();
    let printed = fx.print();
    assert!(printed.contains("return g.invoke1(1);"), "{printed}");
    assert!(printed.contains("return h.invoke1R(1, [2, 3]);"), "{printed}");
}

#[test]
fn test_function_reference_is_wrapped() {
    // function double(x: int): int { return x * 2; }
    // function apply(g: (x: int) => int): int { return g(1); }
    // let r: int = apply(double);
    let mut fx = Fixture::single(|f| {
        let x_ty = int_type(f);
        let x = f.param("x", x_ty);
        let x_ref = f.ident("x");
        let two = f.int(2);
        let product = f.binary(BinaryOp::Mul, x_ref, two);
        let ret = f.ret(product);
        let ret_ty = int_type(f);
        let double = function(f, "double", smallvec![x], ret_ty, smallvec![ret]);

        let g_ty = int_to_int(f);
        let g = f.param("g", g_ty);
        let g_ref = f.ident("g");
        let one = f.int(1);
        let call = f.call(g_ref, smallvec![one]);
        let ret = f.ret(call);
        let ret_ty = int_type(f);
        let apply = function(f, "apply", smallvec![g], ret_ty, smallvec![ret]);

        let apply_ref = f.ident("apply");
        let double_ref = f.ident("double");
        let call = f.call(apply_ref, smallvec![double_ref]);
        let r_ty = int_type(f);
        let r = f.var(VarKind::Let, "r", r_ty, call);
        smallvec![double, apply, r]
    });
    fx.run().unwrap();
    let printed = fx.print();
    assert!(
        printed.contains("let r: int = apply(new LambdaObject$0());"),
        "{printed}"
    );
    assert!(printed.contains("function lambda$invoke$0(p0: int): int {"), "{printed}");
    assert!(printed.contains("return double(p0);"), "{printed}");
    // Direct calls are not rewritten.
    assert!(!printed.contains("apply.invoke"), "{printed}");
}

#[test]
fn test_nested_arrows_are_lowered_innermost_first() {
    // function outer(): () => () => int { return (): () => int => { return (): int => { return 1; }; }; }
    let mut fx = Fixture::single(|f| {
        let one = f.int(1);
        let ret_one = f.ret(one);
        let inner_ret = int_type(f);
        let inner = arrow(f, NodeList::new(), inner_ret, smallvec![ret_one]);
        let ret_inner = f.ret(inner);
        let int_ret = int_type(f);
        let outer_ret = f.function_type(NodeList::new(), int_ret);
        let outer = arrow(f, NodeList::new(), outer_ret, smallvec![ret_inner]);
        let ret_outer = f.ret(outer);
        let int_ret = int_type(f);
        let middle = f.function_type(NodeList::new(), int_ret);
        let fn_ret = f.function_type(NodeList::new(), middle);
        smallvec![function(f, "outer", NodeList::new(), fn_ret, smallvec![ret_outer])]
    });
    fx.run().unwrap();
    let printed = fx.print();
    assert!(fx.class("LambdaObject$0").is_some(), "{printed}");
    assert!(fx.class("LambdaObject$1").is_some(), "{printed}");
    assert!(printed.contains("return new LambdaObject$0();"), "{printed}");
    assert!(printed.contains("return new LambdaObject$1();"), "{printed}");
    assert!(
        printed.contains("final class LambdaObject$1 implements () => () => int {"),
        "{printed}"
    );
}

#[test]
fn test_generic_method_type_params_are_carried() {
    // class Box { map<T>(v: T): () => T { return (): T => { return v; }; } }
    let mut fx = Fixture::single(|f| {
        let t = f.type_param("T", NodeIndex::NONE, NodeIndex::NONE);
        let v_ty = f.type_ref("T", NodeList::new());
        let v = f.param("v", v_ty);
        let v_ref = f.ident("v");
        let ret_v = f.ret(v_ref);
        let arrow_ret = f.type_ref("T", NodeList::new());
        let lambda = arrow(f, NodeList::new(), arrow_ret, smallvec![ret_v]);
        let ret = f.ret(lambda);
        let t_ref = f.type_ref("T", NodeList::new());
        let map_ret = f.function_type(NodeList::new(), t_ref);
        let body = f.block(smallvec![ret]);
        let map = f.method(MethodDecl {
            modifiers: Modifiers::empty(),
            kind: MethodKind::Method,
            name: "map".to_string(),
            type_params: smallvec![t],
            params: smallvec![v],
            return_type: map_ret,
            body,
            annotations: NodeList::new(),
        });
        smallvec![class(f, "Box", smallvec![map])]
    });
    fx.run().unwrap();
    let printed = fx.print();
    assert_eq!(fx.class("LambdaObject$0").unwrap().type_params.len(), 1);
    assert!(
        printed.contains("final class LambdaObject$0<T> implements () => T {"),
        "{printed}"
    );
    assert!(printed.contains("return new LambdaObject$0<T>(v);"), "{printed}");
    assert!(
        printed.contains("private static lambda$invoke$0<T>(v: T): T {"),
        "{printed}"
    );
}
