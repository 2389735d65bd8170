//! Phase-driven lowering pipeline.
//!
//! - `program`: units, import linking and split borrows across units
//! - `context`: `CompilationContext` and `LoweringOptions`
//! - `phase` / `phase_manager`: the `Phase` contract and the `PhaseManager`
//!   with its full, rebind and recheck traversals
//! - `history`: `NodeHistory`, the per-phase view of replaced nodes
//! - `rewrite`: `UnitCx`, the node-rewrite layer passes are written against
//! - `plugins`: extension points run as phases
//! - `passes`: the desugaring passes themselves

pub mod error;
pub use error::{HistoryError, LoadError, PipelineError, PipelineResult};

pub mod phase;
pub use phase::{Phase, PhaseId, PhaseScope};

pub mod history;
pub use history::{NodeHistory, SlotId, print_at_phase};

pub mod program;
pub use program::{OtherUnits, Program, ProgramUnit, UnitSource};

pub mod context;
pub use context::{CompilationContext, LoweringOptions, NameGenerator};

pub mod rewrite;
pub use rewrite::UnitCx;

pub mod plugins;
pub use plugins::{ExtensionPoint, Plugin, PluginError, PluginPhase, PluginRegistry};

pub mod phase_manager;
pub use phase_manager::PhaseManager;

pub mod passes;
