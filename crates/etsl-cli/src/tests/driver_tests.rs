use super::*;
use clap::Parser;
use etsl_ast::*;
use etsl_common::{Span, diagnostic_codes};
use etsl_lowering::UnitSource;
use std::path::Path;
use tempfile::TempDir;

/// JSON unit with a single `const name: int = lhs op rhs;`.
fn const_unit(name: &str, stdlib: bool, lhs: i32, op: BinaryOp, rhs: i32) -> String {
    let mut arena = NodeArena::new();
    let root = {
        let mut f = NodeFactory::plain(&mut arena, Span::new(0, 100));
        let (l, r) = (f.int(lhs), f.int(rhs));
        let init = f.binary(op, l, r);
        let ty = f.primitive(PrimitiveKind::Int);
        let decl = f.var(VarKind::Const, "A", ty, init);
        f.node(NodeKind::Program(ProgramDecl {
            statements: smallvec![decl],
        }))
    };
    let source = UnitSource {
        name: name.to_string(),
        stdlib,
        arena,
        root,
    };
    serde_json::to_string(&source).expect("unit serializes")
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("failed to create test dir");
    }
    std::fs::write(&path, contents).expect("failed to write test file");
    path
}

fn args(argv: &[&str], inputs: &[&Path]) -> CliArgs {
    let mut all: Vec<String> = vec!["etslc".to_string()];
    all.extend(argv.iter().map(|s| (*s).to_string()));
    all.extend(inputs.iter().map(|p| p.display().to_string()));
    CliArgs::try_parse_from(all).expect("arguments should parse")
}

#[test]
fn clean_unit_compiles_and_prints() {
    let dir = TempDir::new().unwrap();
    let main = write_file(dir.path(), "main.json", &const_unit("main.ets", false, 2, BinaryOp::Mul, 3));

    let output = compile(&args(&["--print"], &[&main])).unwrap();
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    assert_eq!(output.exit_status(), EXIT_SUCCESS);
    assert_eq!(output.units.len(), 1);
    let printed = output.units[0].printed.as_deref().unwrap();
    assert!(printed.contains("const A: int = 6;"), "{printed}");
    assert!(output.units[0].dumped.is_none());
}

#[test]
fn errors_set_exit_status() {
    let dir = TempDir::new().unwrap();
    let main = write_file(dir.path(), "main.json", &const_unit("main.ets", false, 1, BinaryOp::Div, 0));

    let output = compile(&args(&[], &[&main])).unwrap();
    let division = output
        .diagnostics
        .iter()
        .find(|d| d.code == diagnostic_codes::DIVISION_BY_ZERO)
        .expect("division by zero reported");
    assert_eq!(division.file, "main.ets");
    assert_eq!(output.exit_status(), EXIT_ERRORS);
}

#[test]
fn exit_status_follows_worst_category() {
    let warning = Diagnostic::from_code(
        "a.ets",
        Span::new(0, 1),
        diagnostic_codes::CAPTURED_VARIABLE_REASSIGNED,
        &["n"],
    );
    let error = Diagnostic::from_code("a.ets", Span::new(0, 1), diagnostic_codes::DIVISION_BY_ZERO, &[]);

    let mut output = CompileOutput::default();
    assert_eq!(output.exit_status(), EXIT_SUCCESS);
    output.diagnostics.push(warning);
    assert_eq!(output.exit_status(), EXIT_WARNINGS);
    output.diagnostics.push(error);
    assert_eq!(output.exit_status(), EXIT_ERRORS);

    let failed = CompileOutput {
        failures: vec!["main.ets: phase 'checker' failed".to_string()],
        ..CompileOutput::default()
    };
    assert_eq!(failed.exit_status(), EXIT_ERRORS);
}

#[test]
fn directories_are_walked_in_path_order() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "b/second.json", &const_unit("second.ets", false, 1, BinaryOp::Add, 1));
    write_file(dir.path(), "a/first.json", &const_unit("first.ets", false, 1, BinaryOp::Add, 1));
    write_file(dir.path(), "a/notes.txt", "not a unit");

    let files = collect_inputs(&[dir.path().to_path_buf()]).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["first.json", "second.json"]);

    let output = compile(&args(&[], &[dir.path()])).unwrap();
    let units: Vec<_> = output.units.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(units, ["first.ets", "second.ets"]);
}

#[test]
fn missing_input_is_fatal() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.json");
    let err = collect_inputs(&[missing]).unwrap_err();
    assert!(err.to_string().contains("input not found"), "{err}");

    let empty = TempDir::new().unwrap();
    assert!(collect_inputs(&[empty.path().to_path_buf()]).is_err());
}

#[test]
fn malformed_unit_is_fatal() {
    let dir = TempDir::new().unwrap();
    let bad = write_file(dir.path(), "bad.json", "{ \"name\": ");
    let err = compile(&args(&[], &[&bad])).unwrap_err();
    assert!(format!("{err:#}").contains("failed to load unit"), "{err:#}");
}

#[test]
fn unknown_phase_is_rejected() {
    let dir = TempDir::new().unwrap();
    let main = write_file(dir.path(), "main.json", &const_unit("main.ets", false, 1, BinaryOp::Add, 1));
    let err = compile(&args(&["--until", "no-such-phase"], &[&main])).unwrap_err();
    assert!(err.to_string().contains("unknown phase 'no-such-phase'"), "{err}");
}

#[test]
fn until_stops_before_folding() {
    let dir = TempDir::new().unwrap();
    let main = write_file(dir.path(), "main.json", &const_unit("main.ets", false, 1, BinaryOp::Div, 0));

    let output = compile(&args(&["--until", "resolve-identifiers", "--print"], &[&main])).unwrap();
    assert!(output.diagnostics.is_empty());
    let printed = output.units[0].printed.as_deref().unwrap();
    assert!(printed.contains("const A: int = 1 / 0;"), "{printed}");
}

#[test]
fn dump_after_captures_intermediate_tree() {
    let dir = TempDir::new().unwrap();
    let main = write_file(dir.path(), "main.json", &const_unit("main.ets", false, 2, BinaryOp::Add, 3));

    let output = compile(&args(&["--dump-after", "checker"], &[&main])).unwrap();
    let unit = &output.units[0];
    assert!(unit.printed.is_none());
    let dumped = unit.dumped.as_deref().unwrap();
    assert!(dumped.contains("const A: int = 5;"), "{dumped}");

    let mut out = Vec::new();
    write_units(&mut out, &output).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("// main.ets (dump)\n"), "{text}");
}

#[test]
fn stdlib_units_compile_only_with_flag() {
    let dir = TempDir::new().unwrap();
    let std_unit = write_file(dir.path(), "std.json", &const_unit("std.ets", true, 1, BinaryOp::Div, 0));
    let main = write_file(dir.path(), "main.json", &const_unit("main.ets", false, 1, BinaryOp::Add, 1));

    let output = compile(&args(&[], &[&std_unit, &main])).unwrap();
    assert_eq!(output.units.len(), 1);
    assert_eq!(output.units[0].name, "main.ets");
    assert_eq!(output.exit_status(), EXIT_SUCCESS);

    let output = compile(&args(&["--compiling-stdlib"], &[&std_unit, &main])).unwrap();
    assert_eq!(output.units.len(), 2);
    assert_eq!(output.exit_status(), EXIT_ERRORS);
}

#[test]
fn isolated_inputs_merge_sorted_diagnostics() {
    let dir = TempDir::new().unwrap();
    let b = write_file(dir.path(), "b.json", &const_unit("b.ets", false, 1, BinaryOp::Div, 0));
    let a = write_file(dir.path(), "a.json", &const_unit("a.ets", false, 2, BinaryOp::Mod, 0));

    let output = compile(&args(&["--isolated"], &[&b, &a])).unwrap();
    assert_eq!(output.units.len(), 2);
    let mut files: Vec<_> = output.diagnostics.iter().map(|d| d.file.as_str()).collect();
    files.dedup();
    assert_eq!(files, ["a.ets", "b.ets"]);
}

#[test]
fn config_file_feeds_options_and_flags_win() {
    let dir = TempDir::new().unwrap();
    let config = write_file(
        dir.path(),
        "etsl.json",
        r#"{ "verify_contracts": false, "record_history": false }"#,
    );
    let main = write_file(dir.path(), "main.json", &const_unit("main.ets", false, 1, BinaryOp::Add, 1));
    let config_arg = config.display().to_string();

    let request = CompileRequest::from_args(&args(&["-c", &config_arg], &[&main])).unwrap();
    assert!(!request.options.verify_contracts);
    assert!(!request.options.record_history);
    assert!(!request.options.compiling_stdlib);

    let request =
        CompileRequest::from_args(&args(&["-c", &config_arg, "--verify"], &[&main])).unwrap();
    assert!(request.options.verify_contracts);

    let broken = write_file(dir.path(), "broken.json", "{ verify_contracts");
    let broken_arg = broken.display().to_string();
    assert!(CompileRequest::from_args(&args(&["-c", &broken_arg], &[&main])).is_err());
}
