//! Hard failures of the lowering pipeline.
//!
//! Source problems are diagnostics in the context's `DiagnosticBag`; the
//! errors here stop the pipeline for a unit (contract violations, failed
//! phases, plugin errors) or reject input before it runs.

use crate::phase::PhaseId;
use etsl_common::UnitId;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("precondition of phase '{phase}' failed for unit '{unit}'")]
    Precondition { phase: &'static str, unit: String },

    #[error("postcondition of phase '{phase}' failed for unit '{unit}'")]
    Postcondition { phase: &'static str, unit: String },

    #[error("phase '{phase}' failed for unit '{unit}'")]
    PhaseFailed { phase: &'static str, unit: String },

    #[error("plugin '{plugin}' failed in unit '{unit}': {message}")]
    PluginFailed {
        plugin: String,
        unit: String,
        message: String,
    },

    #[error("unknown unit {0:?}")]
    UnknownUnit(UnitId),

    #[error("unknown phase '{0}'")]
    UnknownPhase(String),

    #[error("import depth limit exceeded at unit '{unit}'")]
    ImportDepthExceeded { unit: String },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors of the phase-indexed node history.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("phase {phase:?} precedes the last recorded entry {last:?} of the slot")]
    OutOfOrder { phase: PhaseId, last: PhaseId },

    #[error("node {0} has no history slot")]
    NoSlot(u32),
}

/// Errors loading upstream parser output.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("invalid unit source: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unit '{0}' is already part of the program")]
    DuplicateUnit(String),

    #[error("unit '{name}' has no root node {root}")]
    MissingRoot { name: String, root: u32 },

    #[error("root of unit '{0}' is not a program node")]
    NotAProgram(String),
}
