//! Compilation context: everything one compilation shares across phases.

use crate::error::PipelineError;
use crate::phase::PhaseId;
use crate::phase_manager::PhaseManager;
use crate::plugins::PluginRegistry;
use crate::program::Program;
use crate::rewrite::UnitCx;
use etsl_ast::NodeIndex;
use etsl_checker::TypeInterner;
use etsl_common::{DiagnosticBag, UnitId};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Options of one compilation. Every field has a default so partial JSON
/// configuration files are accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoweringOptions {
    /// Evaluate phase pre/postconditions.
    pub verify_contracts: bool,
    /// The standard library itself is being compiled: bodies phases also
    /// process imported units.
    pub compiling_stdlib: bool,
    /// Record node replacements in the per-unit `NodeHistory`.
    pub record_history: bool,
}

impl Default for LoweringOptions {
    fn default() -> Self {
        LoweringOptions {
            verify_contracts: cfg!(debug_assertions),
            compiling_stdlib: false,
            record_history: true,
        }
    }
}

/// Fresh identifiers, unique per compilation: `{prefix}${n}`.
#[derive(Clone, Debug, Default)]
pub struct NameGenerator {
    counters: FxHashMap<String, u32>,
}

impl NameGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self, prefix: &str) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        let name = format!("{prefix}${counter}");
        *counter += 1;
        name
    }
}

pub struct CompilationContext {
    pub options: LoweringOptions,
    pub program: Program,
    pub interner: TypeInterner,
    pub diagnostics: DiagnosticBag,
    pub plugins: PluginRegistry,
    pub names: NameGenerator,
    /// Phase currently running; `None` outside `begin_run`/`end_run`.
    phase: Option<PhaseId>,
    /// `(phase, unit)` pairs already performed.
    processed: FxHashSet<(PhaseId, UnitId)>,
    /// Hard failure recorded by the running phase.
    failure: Option<PipelineError>,
}

impl CompilationContext {
    #[must_use]
    pub fn new(program: Program, options: LoweringOptions) -> Self {
        CompilationContext {
            options,
            program,
            interner: TypeInterner::new(),
            diagnostics: DiagnosticBag::new(),
            plugins: PluginRegistry::new(),
            names: NameGenerator::new(),
            phase: None,
            processed: FxHashSet::default(),
            failure: None,
        }
    }

    /// Link the program's imports once.
    pub fn ensure_linked(&mut self) {
        if !self.program.is_linked() {
            self.program.link(&mut self.diagnostics);
        }
    }

    // =========================================================================
    // Phase cursor
    // =========================================================================

    pub fn begin_run(&mut self) {
        self.phase = Some(PhaseId(0));
        self.failure = None;
    }

    pub fn set_phase(&mut self, phase: PhaseId) {
        debug_assert!(
            self.phase.is_none_or(|current| current <= phase),
            "phase cursor must not move backwards"
        );
        self.phase = Some(phase);
    }

    pub fn end_run(&mut self) {
        self.phase = None;
    }

    #[must_use]
    pub const fn current_phase(&self) -> Option<PhaseId> {
        self.phase
    }

    /// Mark `(phase, unit)` as performed. False when it already was.
    pub fn mark_processed(&mut self, phase: PhaseId, unit: UnitId) -> bool {
        self.processed.insert((phase, unit))
    }

    #[must_use]
    pub fn is_processed(&self, phase: PhaseId, unit: UnitId) -> bool {
        self.processed.contains(&(phase, unit))
    }

    /// Phases already performed on `unit`.
    #[must_use]
    pub fn processed_phases(&self, unit: UnitId) -> Vec<PhaseId> {
        let mut phases: Vec<PhaseId> = self
            .processed
            .iter()
            .filter(|(_, u)| *u == unit)
            .map(|(p, _)| *p)
            .collect();
        phases.sort();
        phases
    }

    /// Record a hard failure; the phase then returns false.
    pub fn fail(&mut self, error: PipelineError) {
        debug!(%error, "phase failure recorded");
        self.failure.get_or_insert(error);
    }

    pub fn take_failure(&mut self) -> Option<PipelineError> {
        self.failure.take()
    }

    // =========================================================================
    // Unit access
    // =========================================================================

    #[must_use]
    pub fn unit_name(&self, unit: UnitId) -> &str {
        self.program.unit_name(unit)
    }

    /// Split borrow of the context for rewriting `unit`.
    pub fn unit_cx(&mut self, unit: UnitId) -> Option<UnitCx<'_>> {
        let (data, others) = self.program.split_unit_mut(unit)?;
        Some(UnitCx::new(
            data,
            others,
            &mut self.interner,
            &mut self.diagnostics,
            &mut self.names,
            self.phase,
            self.options.record_history,
        ))
    }

    /// Report a diagnostic at a node of `unit`.
    pub fn report(&mut self, unit: UnitId, node: NodeIndex, code: u32, args: &[&str]) {
        let Some(data) = self.program.unit(unit) else {
            return;
        };
        let span = data.arena.span(node);
        self.diagnostics.report(&data.name, span, code, args);
    }

    /// Print a unit as it is now.
    #[must_use]
    pub fn print_unit(&self, unit: UnitId) -> Option<String> {
        let data = self.program.unit(unit)?;
        Some(etsl_ast::print_node(&data.arena, data.root))
    }

    /// Print a unit as it was after `phase`.
    #[must_use]
    pub fn print_unit_at(&self, unit: UnitId, phase: PhaseId) -> Option<String> {
        let data = self.program.unit(unit)?;
        Some(crate::history::print_at_phase(
            &data.arena,
            &data.history,
            data.root,
            phase,
        ))
    }

    /// Compile `unit` through the default pipeline.
    pub fn compile(&mut self, unit: UnitId) -> crate::error::PipelineResult<()> {
        PhaseManager::new().run(self, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_names_count_per_prefix() {
        let mut names = NameGenerator::new();
        assert_eq!(names.fresh("LambdaObject"), "LambdaObject$0");
        assert_eq!(names.fresh("LambdaObject"), "LambdaObject$1");
        assert_eq!(names.fresh("lambda$invoke"), "lambda$invoke$0");
    }

    #[test]
    fn options_accept_partial_json() {
        let options: LoweringOptions =
            serde_json::from_str(r#"{"compiling_stdlib": true}"#).unwrap();
        assert!(options.compiling_stdlib);
        assert!(options.record_history);
        assert_eq!(options.verify_contracts, cfg!(debug_assertions));
    }
}
