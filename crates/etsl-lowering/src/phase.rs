//! The `Phase` contract.
//!
//! A phase is a named step of the lowering pipeline. Besides its transform it
//! declares which units it must see (`PhaseScope`) and two predicates the
//! `PhaseManager` evaluates around it when contract verification is on.

use crate::context::CompilationContext;
use etsl_ast::NodeIndex;
use etsl_common::UnitId;
use serde::Serialize;
use std::fmt;

/// Position of a phase in the pipeline, `0..N-1`, monotonically increasing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PhaseId(pub u32);

impl PhaseId {
    /// Sorts after every pipeline phase; "the tree as it is now".
    pub const LATEST: PhaseId = PhaseId(u32::MAX);

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which units a phase processes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PhaseScope {
    /// Also runs on every imported unit first (post-order over the import
    /// graph): declarations must be known before importers use them.
    Declarations,
    /// Runs on the compiled unit only; imported units are skipped unless the
    /// standard library itself is being compiled.
    Bodies,
}

pub trait Phase {
    fn name(&self) -> &'static str;

    fn scope(&self) -> PhaseScope {
        PhaseScope::Bodies
    }

    /// Invariant the phase relies on. A failure aborts the unit.
    fn precondition(&self, _ctx: &CompilationContext, _unit: UnitId) -> bool {
        true
    }

    /// Transform the unit. Returning false stops the pipeline; the phase has
    /// already reported why.
    fn perform(&self, ctx: &mut CompilationContext, unit: UnitId) -> bool;

    /// Invariant the phase establishes.
    fn postcondition(&self, _ctx: &CompilationContext, _unit: UnitId) -> bool {
        true
    }

    /// Re-drive the phase over one subtree (rebind and recheck traversals).
    /// Phases outside those traversals keep the default no-op.
    fn perform_on(&self, _ctx: &mut CompilationContext, _unit: UnitId, _node: NodeIndex) -> bool {
        true
    }
}
