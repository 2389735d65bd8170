//! Loading unit files and driving the pipeline over them.
//!
//! By default every input joins one `Program`, so imports resolve across
//! files and declarations phases see imported units first. `--isolated`
//! compiles each input as its own program on the rayon pool; imports between
//! isolated inputs then report a missing unit.

use crate::args::CliArgs;
use crate::config::resolve_options;
use anyhow::{Context, Result, bail};
use etsl_common::{Diagnostic, DiagnosticCategory, UnitId};
use etsl_lowering::{CompilationContext, LoweringOptions, PhaseManager, Program};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info_span, warn};
use walkdir::WalkDir;

/// Extension of unit files picked up from directories.
pub const UNIT_EXTENSION: &str = "json";

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_WARNINGS: i32 = 1;
pub const EXIT_ERRORS: i32 = 2;
/// Inputs or configuration could not be used at all.
pub const EXIT_FATAL: i32 = 3;

/// What to run and what to capture, shared by every program of a run.
#[derive(Clone, Debug)]
pub struct CompileRequest {
    pub options: LoweringOptions,
    pub until: Option<String>,
    pub print: bool,
    pub dump_after: Option<String>,
}

impl CompileRequest {
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        Ok(CompileRequest {
            options: resolve_options(args)?,
            until: args.until.clone(),
            print: args.print,
            dump_after: args.dump_after.clone(),
        })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CompiledUnit {
    pub name: String,
    /// Final tree, with `--print`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printed: Option<String>,
    /// Tree after the `--dump-after` phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dumped: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct CompileOutput {
    pub units: Vec<CompiledUnit>,
    pub diagnostics: Vec<Diagnostic>,
    /// Pipeline errors that stopped a unit early.
    pub failures: Vec<String>,
}

impl CompileOutput {
    fn merge(&mut self, other: CompileOutput) {
        self.units.extend(other.units);
        self.diagnostics.extend(other.diagnostics);
        self.failures.extend(other.failures);
    }

    /// 2 on errors or pipeline failures, 1 on warnings only, 0 otherwise.
    #[must_use]
    pub fn exit_status(&self) -> i32 {
        let worst = self.diagnostics.iter().map(|d| d.category).max();
        if !self.failures.is_empty() || worst == Some(DiagnosticCategory::Error) {
            EXIT_ERRORS
        } else if worst == Some(DiagnosticCategory::Warning) {
            EXIT_WARNINGS
        } else {
            EXIT_SUCCESS
        }
    }
}

/// Expand `inputs` into unit files: files are taken as given, directories
/// are walked for `*.json` in path order.
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        warn!(%err, "skipping unreadable entry");
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file())
                .map(walkdir::DirEntry::into_path)
                .filter(|path| is_unit_file(path))
                .collect();
            debug!(dir = %input.display(), files = found.len(), "collected unit files");
            files.append(&mut found);
        } else if input.is_file() {
            files.push(input.clone());
        } else {
            bail!("input not found: {}", input.display());
        }
    }
    if files.is_empty() {
        bail!("no unit files found in the given inputs");
    }
    Ok(files)
}

/// Read unit files into one program.
pub fn load_program(files: &[PathBuf]) -> Result<Program> {
    let mut program = Program::new();
    for file in files {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()))?;
        program
            .add_unit_json(&text)
            .with_context(|| format!("failed to load unit from {}", file.display()))?;
    }
    Ok(program)
}

/// Reject phase names the pipeline does not know before any work is done.
fn check_phase_names(manager: &PhaseManager, request: &CompileRequest) -> Result<()> {
    for name in [&request.until, &request.dump_after].into_iter().flatten() {
        if manager.phase_id(name).is_none() {
            bail!("unknown phase '{name}' (see --list-phases)");
        }
    }
    Ok(())
}

/// Compile the inputs named on the command line.
pub fn compile(args: &CliArgs) -> Result<CompileOutput> {
    let request = CompileRequest::from_args(args)?;
    check_phase_names(&PhaseManager::new(), &request)?;
    let files = collect_inputs(&args.inputs)?;

    if !args.isolated {
        return compile_files(&files, &request);
    }
    let outputs = files
        .par_iter()
        .map(|file| compile_files(std::slice::from_ref(file), &request))
        .collect::<Result<Vec<_>>>()?;
    let mut merged = CompileOutput::default();
    for output in outputs {
        merged.merge(output);
    }
    merged.diagnostics.sort_by(|a, b| {
        a.file
            .cmp(&b.file)
            .then(a.start.cmp(&b.start))
            .then(a.code.cmp(&b.code))
    });
    Ok(merged)
}

/// Compile one program made of `files`.
pub fn compile_files(files: &[PathBuf], request: &CompileRequest) -> Result<CompileOutput> {
    let program = load_program(files)?;
    Ok(compile_program(program, request))
}

/// Run the pipeline over every unit of `program` that is compiled in this
/// mode: non-stdlib units, or all units when compiling the stdlib.
#[must_use]
pub fn compile_program(program: Program, request: &CompileRequest) -> CompileOutput {
    let manager = PhaseManager::new();
    let targets: Vec<UnitId> = program
        .units()
        .filter(|unit| request.options.compiling_stdlib || !unit.stdlib)
        .map(|unit| unit.id)
        .collect();
    let mut ctx = CompilationContext::new(program, request.options.clone());
    let mut output = CompileOutput::default();

    for unit in targets {
        let name = ctx.unit_name(unit).to_string();
        let _span = info_span!("compile", unit = %name).entered();
        let result = match &request.until {
            Some(phase) => manager.run_until(&mut ctx, unit, phase).map(|_| ()),
            None => manager.run(&mut ctx, unit),
        };
        if let Err(err) = result {
            warn!(%err, unit = %name, "pipeline stopped");
            output.failures.push(format!("{name}: {err}"));
        }
        output.units.push(capture_unit(&ctx, &manager, unit, request));
    }

    output.diagnostics = ctx.diagnostics.sorted();
    output
}

fn capture_unit(
    ctx: &CompilationContext,
    manager: &PhaseManager,
    unit: UnitId,
    request: &CompileRequest,
) -> CompiledUnit {
    let printed = request.print.then(|| ctx.print_unit(unit)).flatten();
    let dumped = request
        .dump_after
        .as_deref()
        .and_then(|phase| manager.phase_id(phase))
        .and_then(|phase| ctx.print_unit_at(unit, phase));
    CompiledUnit {
        name: ctx.unit_name(unit).to_string(),
        printed,
        dumped,
    }
}

/// Write printed and dumped trees, one section per unit.
pub fn write_units(out: &mut impl std::io::Write, output: &CompileOutput) -> std::io::Result<()> {
    for unit in &output.units {
        if let Some(text) = &unit.dumped {
            writeln!(out, "// {} (dump)", unit.name)?;
            writeln!(out, "{text}")?;
        }
        if let Some(text) = &unit.printed {
            writeln!(out, "// {}", unit.name)?;
            writeln!(out, "{text}")?;
        }
    }
    Ok(())
}

/// Whether `path` looks like a unit file.
#[must_use]
pub fn is_unit_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == UNIT_EXTENSION)
}

#[cfg(test)]
#[path = "tests/driver_tests.rs"]
mod tests;
