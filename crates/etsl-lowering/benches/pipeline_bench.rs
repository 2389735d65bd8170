//! Lowering pipeline benchmarks.
//!
//! Generated units mix the constructs every desugaring pass handles:
//! constants, enums with a switch over them, and classes returning
//! capturing arrows. Each group measures a prefix of the pipeline so the
//! cost of individual phases can be read off the differences.

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use etsl_ast::*;
use etsl_common::Span;
use etsl_lowering::{CompilationContext, LoweringOptions, PhaseManager, Program, UnitSource};
use std::time::Duration;

fn int_type(f: &mut NodeFactory<'_>) -> NodeIndex {
    f.primitive(PrimitiveKind::Int)
}

/// `const C{i}: int = {i} * 2 + 1;`
fn constant(f: &mut NodeFactory<'_>, i: usize) -> NodeIndex {
    let value = f.int(i as i32);
    let two = f.int(2);
    let product = f.binary(BinaryOp::Mul, value, two);
    let one = f.int(1);
    let sum = f.binary(BinaryOp::Add, product, one);
    let ty = int_type(f);
    f.var(VarKind::Const, format!("C{i}"), ty, sum)
}

/// `enum E{i} { A, B, C }` and a function switching over it.
fn enum_with_switch(f: &mut NodeFactory<'_>, i: usize) -> [NodeIndex; 2] {
    let name = format!("E{i}");
    let members: NodeList = ["A", "B", "C"]
        .iter()
        .map(|member| {
            f.node(NodeKind::EnumMember(EnumMember {
                name: (*member).to_string(),
                init: NodeIndex::NONE,
            }))
        })
        .collect();
    let decl = f.node(NodeKind::Enum(EnumDecl {
        modifiers: Modifiers::empty(),
        name: name.clone(),
        members,
    }));

    let ty = f.type_ref(name.as_str(), NodeList::new());
    let param = f.param("e", ty);
    let discriminant = f.ident("e");
    let cases: NodeList = ["A", "B"]
        .iter()
        .enumerate()
        .map(|(k, member)| {
            let test = f.static_member(&name, *member);
            let value = f.int(k as i32);
            let ret = f.ret(value);
            f.node(NodeKind::SwitchCase(SwitchCase {
                test,
                body: smallvec![ret],
            }))
        })
        .collect();
    let switch = f.node(NodeKind::Switch(SwitchStatement {
        discriminant,
        cases,
    }));
    let minus_one = {
        let one = f.int(1);
        f.unary(UnaryOp::Minus, one)
    };
    let fallback = f.ret(minus_one);
    let body = f.block(smallvec![switch, fallback]);
    let ret_ty = int_type(f);
    let function = f.node(NodeKind::Function(FunctionDecl {
        modifiers: Modifiers::empty(),
        name: format!("ordinal{i}"),
        type_params: NodeList::new(),
        params: smallvec![param],
        return_type: ret_ty,
        body,
        annotations: NodeList::new(),
    }));
    [decl, function]
}

/// `class K{i} { adder(k: int): (x: int) => int { return (x: int): int => x + k; } }`
fn class_with_arrow(f: &mut NodeFactory<'_>, i: usize) -> NodeIndex {
    let x_ty = int_type(f);
    let x = f.param("x", x_ty);
    let x_ref = f.ident("x");
    let k_ref = f.ident("k");
    let sum = f.binary(BinaryOp::Add, x_ref, k_ref);
    let arrow_ret = int_type(f);
    let arrow = f.node(NodeKind::Arrow(ArrowFunction {
        type_params: NodeList::new(),
        params: smallvec![x],
        return_type: arrow_ret,
        body: sum,
    }));
    let ret = f.ret(arrow);
    let body = f.block(smallvec![ret]);

    let k_ty = int_type(f);
    let k = f.param("k", k_ty);
    let fx_ty = int_type(f);
    let fx = f.param("x", fx_ty);
    let fn_ret = int_type(f);
    let ret_ty = f.function_type(smallvec![fx], fn_ret);
    let method = f.simple_method(Modifiers::empty(), "adder", smallvec![k], ret_ty, body);
    f.class(
        ClassDecl {
            modifiers: Modifiers::empty(),
            name: format!("K{i}"),
            type_params: NodeList::new(),
            extends: NodeIndex::NONE,
            implements: NodeList::new(),
            members: smallvec![method],
            annotations: NodeList::new(),
        },
        NodeFlags::empty(),
    )
}

fn generate_unit(decl_count: usize) -> UnitSource {
    let mut arena = NodeArena::new();
    let root = {
        let mut f = NodeFactory::plain(&mut arena, Span::new(0, 1));
        let mut statements = NodeList::new();
        for i in 0..decl_count {
            match i % 3 {
                0 => statements.push(constant(&mut f, i)),
                1 => statements.extend(enum_with_switch(&mut f, i)),
                _ => statements.push(class_with_arrow(&mut f, i)),
            }
        }
        f.node(NodeKind::Program(ProgramDecl { statements }))
    };
    UnitSource {
        name: "bench.ets".to_string(),
        stdlib: false,
        arena,
        root,
    }
}

fn context_for(source: &UnitSource) -> (CompilationContext, etsl_common::UnitId) {
    let mut program = Program::new();
    let unit = program.add_unit(source.clone()).expect("bench unit");
    let options = LoweringOptions {
        verify_contracts: false,
        ..LoweringOptions::default()
    };
    (CompilationContext::new(program, options), unit)
}

fn bench_pipeline_prefixes(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(30);

    let manager = PhaseManager::new();
    for decl_count in [30, 120, 480] {
        let source = generate_unit(decl_count);
        for last_phase in ["resolve-identifiers", "constant-folding", "checker", "lambda-lowering"] {
            group.bench_with_input(
                BenchmarkId::new(last_phase, decl_count),
                &source,
                |b, source| {
                    b.iter_batched(
                        || context_for(source),
                        |(mut ctx, unit)| {
                            manager
                                .run_until(&mut ctx, unit, last_phase)
                                .expect("pipeline");
                            black_box(ctx.diagnostics.len());
                        },
                        BatchSize::LargeInput,
                    );
                },
            );
        }
    }
    group.finish();
}

fn bench_history_recording(c: &mut Criterion) {
    let mut group = c.benchmark_group("history");
    group.sample_size(30);
    let manager = PhaseManager::new();
    let source = generate_unit(120);
    for record_history in [false, true] {
        group.bench_with_input(
            BenchmarkId::new("full_run", record_history),
            &source,
            |b, source| {
                b.iter_batched(
                    || {
                        let (mut ctx, unit) = context_for(source);
                        ctx.options.record_history = record_history;
                        (ctx, unit)
                    },
                    |(mut ctx, unit)| {
                        manager.run(&mut ctx, unit).expect("pipeline");
                        black_box(ctx.print_unit(unit));
                    },
                    BatchSize::LargeInput,
                );
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_pipeline_prefixes, bench_history_recording);
criterion_main!(benches);
