//! Tests for the phase manager: pipeline order, contracts, unit scoping,
//! plugins and program loading.

mod common;

use common::{Fixture, exported, function, import, int_type, unit};
use etsl_ast::*;
use etsl_common::{UnitId, diagnostic_codes};
use etsl_lowering::{
    CompilationContext, ExtensionPoint, LoadError, LoweringOptions, Phase, PhaseManager,
    PipelineError, Plugin, PluginError, Program, UnitSource,
};
use std::cell::RefCell;
use std::rc::Rc;

/// `function add(a: int, b: int): int { return a + b; }` and a call of it.
fn add_program(f: &mut NodeFactory<'_>) -> NodeList {
    let a_ty = int_type(f);
    let a = f.param("a", a_ty);
    let b_ty = int_type(f);
    let b = f.param("b", b_ty);
    let a_ref = f.ident("a");
    let b_ref = f.ident("b");
    let sum = f.binary(BinaryOp::Add, a_ref, b_ref);
    let ret = f.ret(sum);
    let ret_ty = int_type(f);
    let add = function(f, "add", smallvec![a, b], ret_ty, smallvec![ret]);
    let callee = f.ident("add");
    let one = f.int(1);
    let two = f.int(2);
    let call = f.call(callee, smallvec![one, two]);
    let x_ty = int_type(f);
    let x = f.var(VarKind::Let, "x", x_ty, call);
    smallvec![add, x]
}

// =============================================================================
// Pipeline order
// =============================================================================

#[test]
fn test_default_pipeline_order() {
    let manager = PhaseManager::new();
    assert_eq!(
        manager.phase_names(),
        vec![
            "plugins-after-parse",
            "expression-lambda",
            "op-assignment",
            "init-scopes",
            "resolve-identifiers",
            "plugins-after-bind",
            "constant-folding",
            "enum-lowering",
            "checker",
            "plugins-after-check",
            "enum-post-check",
            "record-lowering",
            "lambda-lowering",
            "plugins-after-lowering",
        ]
    );
    let checker = manager.phase_id("checker").unwrap();
    assert_eq!(manager.phase_name(checker), Some("checker"));
    assert!(manager.phase_id("enum-lowering").unwrap() < checker);
}

#[test]
fn test_full_run_processes_every_phase_once() {
    let mut fx = Fixture::single(add_program);
    fx.run().unwrap();
    let processed = fx.ctx.processed_phases(fx.main);
    assert_eq!(processed.len(), fx.manager.len());
    assert!(fx.ctx.diagnostics.is_empty(), "{:?}", fx.codes());
    assert!(fx.print().contains("function add(a: int, b: int): int {"));
}

#[test]
fn test_run_after_run_until_continues() {
    let mut fx = Fixture::single(add_program);
    let id = fx.run_until("resolve-identifiers").unwrap();
    assert_eq!(id, fx.phase("resolve-identifiers"));
    assert!(fx.ctx.is_processed(id, fx.main));
    assert!(!fx.ctx.is_processed(fx.phase("checker"), fx.main));

    fx.run().unwrap();
    assert!(fx.ctx.is_processed(fx.phase("checker"), fx.main));
    assert_eq!(fx.ctx.processed_phases(fx.main).len(), fx.manager.len());
}

#[test]
fn test_unknown_phase_and_unit_are_errors() {
    let mut fx = Fixture::single(add_program);
    assert!(matches!(
        fx.run_until("no-such-phase"),
        Err(PipelineError::UnknownPhase(name)) if name == "no-such-phase"
    ));
    assert!(matches!(
        fx.manager.run(&mut fx.ctx, UnitId(42)),
        Err(PipelineError::UnknownUnit(UnitId(42)))
    ));
}

#[test]
fn test_subtree_traversals_use_pipeline_phases() {
    let mut fx = Fixture::single(add_program);
    fx.run().unwrap();
    let root = fx.root();
    assert!(fx.manager.rebind(&mut fx.ctx, fx.main, root));
    assert!(fx.manager.recheck(&mut fx.ctx, fx.main, root));
    assert!(fx.ctx.diagnostics.is_empty(), "{:?}", fx.codes());
}

// =============================================================================
// Contracts
// =============================================================================

struct Scripted {
    pre: bool,
    perform: bool,
    post: bool,
}

impl Phase for Scripted {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn precondition(&self, _ctx: &CompilationContext, _unit: UnitId) -> bool {
        self.pre
    }

    fn perform(&self, _ctx: &mut CompilationContext, _unit: UnitId) -> bool {
        self.perform
    }

    fn postcondition(&self, _ctx: &CompilationContext, _unit: UnitId) -> bool {
        self.post
    }
}

fn run_scripted(phase: Scripted, verify: bool) -> (Result<(), PipelineError>, CompilationContext) {
    let mut program = Program::new();
    let main = program.add_unit(unit("main.ets", add_program)).unwrap();
    let options = LoweringOptions {
        verify_contracts: verify,
        ..LoweringOptions::default()
    };
    let mut ctx = CompilationContext::new(program, options);
    let manager = PhaseManager::with_phases(vec![Box::new(phase)]);
    let result = manager.run(&mut ctx, main);
    (result, ctx)
}

#[test]
fn test_failed_postcondition_stops_pipeline() {
    let phase = Scripted {
        pre: true,
        perform: true,
        post: false,
    };
    let (result, ctx) = run_scripted(phase, true);
    assert!(matches!(
        result,
        Err(PipelineError::Postcondition { phase: "scripted", .. })
    ));
    assert_eq!(ctx.diagnostics.count_code(diagnostic_codes::POSTCONDITION_FAILED), 1);
}

#[test]
fn test_failed_precondition_skips_perform() {
    let phase = Scripted {
        pre: false,
        perform: false,
        post: true,
    };
    let (result, ctx) = run_scripted(phase, true);
    assert!(matches!(
        result,
        Err(PipelineError::Precondition { phase: "scripted", .. })
    ));
    assert_eq!(ctx.diagnostics.count_code(diagnostic_codes::PRECONDITION_FAILED), 1);
}

#[test]
fn test_contracts_are_not_evaluated_when_disabled() {
    let phase = Scripted {
        pre: false,
        perform: true,
        post: false,
    };
    let (result, ctx) = run_scripted(phase, false);
    assert!(result.is_ok());
    assert!(ctx.diagnostics.is_empty());
}

#[test]
fn test_failed_perform_is_a_phase_failure() {
    let phase = Scripted {
        pre: true,
        perform: false,
        post: true,
    };
    let (result, _) = run_scripted(phase, true);
    assert!(matches!(
        result,
        Err(PipelineError::PhaseFailed { phase: "scripted", .. })
    ));
}

// =============================================================================
// Unit scoping
// =============================================================================

fn lib_and_main() -> Vec<UnitSource> {
    let lib = unit("lib.ets", |f| {
        let ty = int_type(f);
        let init = f.int(2);
        let k = f.var(VarKind::Const, "K", ty, init);
        let k = exported(f, k);
        smallvec![k]
    });
    let main = unit("main.ets", |f| {
        let imp = import(f, "lib.ets", &["K"]);
        let ty = int_type(f);
        let k = f.ident("K");
        let one = f.int(1);
        let sum = f.binary(BinaryOp::Add, k, one);
        let y = f.var(VarKind::Const, "y", ty, sum);
        smallvec![imp, y]
    });
    vec![lib, main]
}

#[test]
fn test_declaration_phases_process_imports_first() {
    let mut fx = Fixture::new(lib_and_main());
    let lib = fx.ctx.program.unit_id("lib.ets").unwrap();
    fx.run().unwrap();

    assert_eq!(fx.ctx.program.import_order(fx.main).unwrap(), vec![lib, fx.main]);
    assert!(fx.ctx.is_processed(fx.phase("init-scopes"), lib));
    assert!(fx.ctx.is_processed(fx.phase("constant-folding"), lib));
    assert!(fx.ctx.is_processed(fx.phase("checker"), lib));
    // Bodies phases skip imported units.
    assert!(!fx.ctx.is_processed(fx.phase("expression-lambda"), lib));
    assert!(!fx.ctx.is_processed(fx.phase("lambda-lowering"), lib));
    assert!(fx.ctx.diagnostics.is_empty(), "{:?}", fx.codes());
}

#[test]
fn test_imported_constant_is_substituted() {
    let mut fx = Fixture::new(lib_and_main());
    fx.run().unwrap();
    assert!(fx.print().contains("const y: int = 3;"), "{}", fx.print());
}

#[test]
fn test_stdlib_compilation_runs_bodies_phases_on_imports() {
    let options = LoweringOptions {
        verify_contracts: true,
        compiling_stdlib: true,
        ..LoweringOptions::default()
    };
    let mut fx = Fixture::with_options(lib_and_main(), options);
    let lib = fx.ctx.program.unit_id("lib.ets").unwrap();
    fx.run().unwrap();
    assert!(fx.ctx.is_processed(fx.phase("expression-lambda"), lib));
    assert!(fx.ctx.is_processed(fx.phase("lambda-lowering"), lib));
}

#[test]
fn test_import_cycle_is_reported_and_broken() {
    let a = unit("a.ets", |f| {
        let imp = import(f, "b.ets", &["B"]);
        let ty = int_type(f);
        let init = f.int(1);
        let decl = f.var(VarKind::Const, "A", ty, init);
        let decl = exported(f, decl);
        smallvec![imp, decl]
    });
    let b = unit("b.ets", |f| {
        let imp = import(f, "a.ets", &["A"]);
        let ty = int_type(f);
        let init = f.int(2);
        let decl = f.var(VarKind::Const, "B", ty, init);
        let decl = exported(f, decl);
        smallvec![imp, decl]
    });
    let mut fx = Fixture::new(vec![a, b]);
    fx.run().unwrap();
    assert_eq!(fx.count(diagnostic_codes::IMPORT_CYCLE), 1);
    // Linking walks `a` first, so the edge closing the cycle is b -> a.
    let a = fx.ctx.program.unit_id("a.ets").unwrap();
    assert_eq!(fx.ctx.program.import_order(fx.main).unwrap(), vec![fx.main]);
    assert_eq!(fx.ctx.program.import_order(a).unwrap(), vec![fx.main, a]);
}

#[test]
fn test_missing_import_unit_is_reported() {
    let mut fx = Fixture::single(|f| {
        let imp = import(f, "nowhere.ets", &["X"]);
        smallvec![imp]
    });
    fx.run().unwrap();
    assert_eq!(fx.count(diagnostic_codes::MISSING_IMPORT_UNIT), 1);
}

#[test]
fn test_unexported_import_is_reported() {
    let lib = unit("lib.ets", |f| {
        let ty = int_type(f);
        let init = f.int(2);
        let k = f.var(VarKind::Const, "K", ty, init);
        smallvec![k]
    });
    let main = unit("main.ets", |f| {
        let imp = import(f, "lib.ets", &["K"]);
        smallvec![imp]
    });
    let mut fx = Fixture::new(vec![lib, main]);
    fx.run().unwrap();
    assert_eq!(fx.count(diagnostic_codes::IMPORTED_NAME_NOT_EXPORTED), 1);
}

// =============================================================================
// Plugins
// =============================================================================

struct Recorder {
    seen: Rc<RefCell<Vec<ExtensionPoint>>>,
    fail_at: Option<ExtensionPoint>,
}

impl Plugin for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn run(
        &mut self,
        point: ExtensionPoint,
        _ctx: &mut CompilationContext,
        _unit: UnitId,
    ) -> Result<(), PluginError> {
        self.seen.borrow_mut().push(point);
        if self.fail_at == Some(point) {
            return Err(PluginError::new("refused"));
        }
        Ok(())
    }
}

#[test]
fn test_plugins_run_at_every_extension_point() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut fx = Fixture::single(add_program);
    fx.ctx.plugins.register(Box::new(Recorder {
        seen: Rc::clone(&seen),
        fail_at: None,
    }));
    fx.run().unwrap();
    assert_eq!(
        *seen.borrow(),
        vec![
            ExtensionPoint::AfterParse,
            ExtensionPoint::AfterBind,
            ExtensionPoint::AfterCheck,
            ExtensionPoint::AfterLowering,
        ]
    );
    assert_eq!(fx.ctx.plugins.names(), vec!["recorder"]);
}

#[test]
fn test_plugin_failure_stops_pipeline() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut fx = Fixture::single(add_program);
    fx.ctx.plugins.register(Box::new(Recorder {
        seen: Rc::clone(&seen),
        fail_at: Some(ExtensionPoint::AfterBind),
    }));
    let err = fx.run().unwrap_err();
    assert!(matches!(
        &err,
        PipelineError::PluginFailed { plugin, message, .. }
            if plugin == "recorder" && message == "refused"
    ));
    assert_eq!(fx.count(diagnostic_codes::PLUGIN_ERROR), 1);
    assert_eq!(seen.borrow().len(), 2);
    assert!(!fx.ctx.is_processed(fx.phase("constant-folding"), fx.main));
    // The registry survives the failed run.
    assert_eq!(fx.ctx.plugins.len(), 1);
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_unit_json_round_trip() {
    let source = unit("main.ets", add_program);
    let json = serde_json::to_string(&source).unwrap();
    let mut program = Program::new();
    let id = program.add_unit_json(&json).unwrap();
    let loaded = program.unit(id).unwrap();
    assert_eq!(loaded.name, "main.ets");
    assert_eq!(
        print_node(&loaded.arena, loaded.root),
        print_node(&source.arena, source.root)
    );
    // Parent links are rebuilt from the child links.
    let program_node = loaded.root;
    let first = loaded.arena.kind(program_node).unwrap().as_program().unwrap().statements[0];
    assert_eq!(loaded.arena.parent(first), program_node);
}

#[test]
fn test_load_errors() {
    let mut program = Program::new();
    assert!(matches!(program.add_unit_json("{"), Err(LoadError::Json(_))));

    program.add_unit(unit("main.ets", add_program)).unwrap();
    assert!(matches!(
        program.add_unit(unit("main.ets", add_program)),
        Err(LoadError::DuplicateUnit(name)) if name == "main.ets"
    ));

    let mut arena = NodeArena::new();
    let stray = arena.add_identifier("x", etsl_common::Span::at(0));
    assert!(matches!(
        program.add_tree("stray.ets", arena, stray),
        Err(LoadError::NotAProgram(name)) if name == "stray.ets"
    ));
    assert!(matches!(
        program.add_tree("empty.ets", NodeArena::new(), NodeIndex(0)),
        Err(LoadError::MissingRoot { root: 0, .. })
    ));
}
