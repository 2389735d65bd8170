//! The phase manager: pipeline order and the three traversals.
//!
//! ```text
//! full:    every phase, in order
//! rebind:  init-scopes, resolve-identifiers          (perform_on a subtree)
//! recheck: init-scopes, resolve-identifiers, checker (perform_on a subtree)
//! ```
//!
//! Phases are identified by their position. `Declarations` phases process
//! the imports of a unit first (post-order over the import graph); every
//! `(phase, unit)` pair runs at most once per context, so `run` after
//! `run_until` continues where the first run stopped.

use crate::context::CompilationContext;
use crate::error::{PipelineError, PipelineResult};
use crate::passes::{
    CheckerPhase, ConstantFoldingPhase, EnumLoweringPhase, EnumPostCheckPhase,
    ExpressionLambdaPhase, InitScopesPhase, LambdaLoweringPhase, OpAssignmentPhase,
    RecordLoweringPhase, ResolveIdentifiersPhase,
};
use crate::phase::{Phase, PhaseId, PhaseScope};
use crate::plugins::{ExtensionPoint, PluginPhase};
use etsl_common::{UnitId, diagnostic_codes};
use tracing::{debug, info_span};

const REBIND_PHASES: &[&str] = &["init-scopes", "resolve-identifiers"];
const RECHECK_PHASES: &[&str] = &["init-scopes", "resolve-identifiers", "checker"];

pub struct PhaseManager {
    phases: Vec<Box<dyn Phase>>,
    rebind: Vec<usize>,
    recheck: Vec<usize>,
}

impl Default for PhaseManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseManager {
    /// The default lowering pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::with_phases(vec![
            Box::new(PluginPhase::new(ExtensionPoint::AfterParse)),
            Box::new(ExpressionLambdaPhase),
            Box::new(OpAssignmentPhase),
            Box::new(InitScopesPhase),
            Box::new(ResolveIdentifiersPhase),
            Box::new(PluginPhase::new(ExtensionPoint::AfterBind)),
            Box::new(ConstantFoldingPhase),
            Box::new(EnumLoweringPhase),
            Box::new(CheckerPhase),
            Box::new(PluginPhase::new(ExtensionPoint::AfterCheck)),
            Box::new(EnumPostCheckPhase),
            Box::new(RecordLoweringPhase),
            Box::new(LambdaLoweringPhase),
            Box::new(PluginPhase::new(ExtensionPoint::AfterLowering)),
        ])
    }

    /// A custom pipeline. The rebind and recheck traversals are the phases
    /// named `init-scopes`, `resolve-identifiers` and `checker`, when present.
    #[must_use]
    pub fn with_phases(phases: Vec<Box<dyn Phase>>) -> Self {
        let indices = |names: &[&str]| -> Vec<usize> {
            phases
                .iter()
                .enumerate()
                .filter(|(_, p)| names.contains(&p.name()))
                .map(|(i, _)| i)
                .collect()
        };
        let rebind = indices(REBIND_PHASES);
        let recheck = indices(RECHECK_PHASES);
        PhaseManager {
            phases,
            rebind,
            recheck,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    #[must_use]
    pub fn phase_names(&self) -> Vec<&'static str> {
        self.phases.iter().map(|p| p.name()).collect()
    }

    #[must_use]
    pub fn phase_id(&self, name: &str) -> Option<PhaseId> {
        self.phases
            .iter()
            .position(|p| p.name() == name)
            .map(|i| PhaseId(i as u32))
    }

    #[must_use]
    pub fn phase_name(&self, id: PhaseId) -> Option<&'static str> {
        self.phases.get(id.index()).map(|p| p.name())
    }

    // =========================================================================
    // Full traversal
    // =========================================================================

    /// Run the whole pipeline on `unit`.
    pub fn run(&self, ctx: &mut CompilationContext, unit: UnitId) -> PipelineResult<()> {
        if self.phases.is_empty() {
            return Ok(());
        }
        self.run_through(ctx, unit, self.phases.len() - 1)
    }

    /// Run the pipeline on `unit` up to and including the phase `name`.
    pub fn run_until(
        &self,
        ctx: &mut CompilationContext,
        unit: UnitId,
        name: &str,
    ) -> PipelineResult<PhaseId> {
        let id = self
            .phase_id(name)
            .ok_or_else(|| PipelineError::UnknownPhase(name.to_string()))?;
        self.run_through(ctx, unit, id.index())?;
        Ok(id)
    }

    fn run_through(
        &self,
        ctx: &mut CompilationContext,
        unit: UnitId,
        last: usize,
    ) -> PipelineResult<()> {
        if ctx.program.unit(unit).is_none() {
            return Err(PipelineError::UnknownUnit(unit));
        }
        ctx.ensure_linked();
        ctx.begin_run();
        let result = self.run_phases(ctx, unit, last);
        ctx.end_run();
        if let Err(err) = &result {
            debug!(%err, unit = unit.0, "pipeline stopped");
        }
        result
    }

    fn run_phases(
        &self,
        ctx: &mut CompilationContext,
        unit: UnitId,
        last: usize,
    ) -> PipelineResult<()> {
        for (index, phase) in self.phases.iter().enumerate().take(last + 1) {
            let id = PhaseId(index as u32);
            ctx.set_phase(id);
            let _span = info_span!(
                "phase",
                name = phase.name(),
                id = id.0,
                unit = %ctx.unit_name(unit)
            )
            .entered();

            let include_imports =
                phase.scope() == PhaseScope::Declarations || ctx.options.compiling_stdlib;
            let units = if include_imports {
                ctx.program.import_order(unit)?
            } else {
                vec![unit]
            };
            for target in units {
                self.run_phase(phase.as_ref(), id, ctx, target)?;
            }
        }
        Ok(())
    }

    fn run_phase(
        &self,
        phase: &dyn Phase,
        id: PhaseId,
        ctx: &mut CompilationContext,
        unit: UnitId,
    ) -> PipelineResult<()> {
        if !ctx.mark_processed(id, unit) {
            return Ok(());
        }
        let verify = ctx.options.verify_contracts;
        let unit_name = ctx.unit_name(unit).to_string();

        if verify && !phase.precondition(ctx, unit) {
            self.report_contract(ctx, unit, diagnostic_codes::PRECONDITION_FAILED, phase.name());
            return Err(PipelineError::Precondition {
                phase: phase.name(),
                unit: unit_name,
            });
        }

        if !phase.perform(ctx, unit) {
            return Err(ctx.take_failure().unwrap_or(PipelineError::PhaseFailed {
                phase: phase.name(),
                unit: unit_name,
            }));
        }

        if verify && !phase.postcondition(ctx, unit) {
            self.report_contract(ctx, unit, diagnostic_codes::POSTCONDITION_FAILED, phase.name());
            return Err(PipelineError::Postcondition {
                phase: phase.name(),
                unit: unit_name,
            });
        }
        debug!(phase = phase.name(), unit = %unit_name, "phase done");
        Ok(())
    }

    fn report_contract(&self, ctx: &mut CompilationContext, unit: UnitId, code: u32, phase: &str) {
        let Some(root) = ctx.program.unit(unit).map(|u| u.root) else {
            return;
        };
        let unit_name = ctx.unit_name(unit).to_string();
        ctx.report(unit, root, code, &[phase, &unit_name]);
    }

    // =========================================================================
    // Subtree traversals
    // =========================================================================

    /// Re-scope and re-resolve a subtree of `unit`.
    pub fn rebind(
        &self,
        ctx: &mut CompilationContext,
        unit: UnitId,
        node: etsl_ast::NodeIndex,
    ) -> bool {
        self.perform_on(&self.rebind, ctx, unit, node)
    }

    /// Re-scope, re-resolve and re-check a subtree of `unit`.
    pub fn recheck(
        &self,
        ctx: &mut CompilationContext,
        unit: UnitId,
        node: etsl_ast::NodeIndex,
    ) -> bool {
        self.perform_on(&self.recheck, ctx, unit, node)
    }

    fn perform_on(
        &self,
        indices: &[usize],
        ctx: &mut CompilationContext,
        unit: UnitId,
        node: etsl_ast::NodeIndex,
    ) -> bool {
        indices.iter().all(|&index| {
            self.phases
                .get(index)
                .is_some_and(|phase| phase.perform_on(ctx, unit, node))
        })
    }
}
