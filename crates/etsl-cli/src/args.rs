use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the etslc binary.
#[derive(Parser, Debug)]
#[command(
    name = "etslc",
    version,
    about = "Lower parsed etsl units through the desugaring pipeline"
)]
pub struct CliArgs {
    /// Unit files (JSON parser output) or directories containing them.
    #[arg(required_unless_present = "list_phases")]
    pub inputs: Vec<PathBuf>,

    // ==================== Configuration ====================
    /// JSON file with lowering options; flags below override it.
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Evaluate phase pre- and postconditions.
    #[arg(long, overrides_with = "no_verify")]
    pub verify: bool,

    /// Skip phase pre- and postconditions.
    #[arg(long = "no-verify")]
    pub no_verify: bool,

    /// Run bodies phases on standard library units too.
    #[arg(long = "compiling-stdlib")]
    pub compiling_stdlib: bool,

    /// Do not record the per-phase node history.
    #[arg(long = "no-history", conflicts_with = "dump_after")]
    pub no_history: bool,

    // ==================== Pipeline ====================
    /// Stop after the named phase.
    #[arg(long, value_name = "PHASE")]
    pub until: Option<String>,

    /// Compile every input as its own program, in parallel.
    #[arg(long)]
    pub isolated: bool,

    /// Print the registered phases in order and exit.
    #[arg(long = "list-phases")]
    pub list_phases: bool,

    // ==================== Output ====================
    /// Print every compiled unit after lowering.
    #[arg(long)]
    pub print: bool,

    /// Print every compiled unit as it was after the named phase.
    #[arg(long = "dump-after", value_name = "PHASE")]
    pub dump_after: Option<String>,

    /// Diagnostics format.
    #[arg(long, value_enum, default_value_t = DiagnosticFormat::Pretty)]
    pub format: DiagnosticFormat,

    /// Colorize diagnostics (defaults to whether stderr is a terminal).
    #[arg(long)]
    pub color: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DiagnosticFormat {
    /// Human-readable lines on stderr.
    Pretty,
    /// One JSON array of diagnostics on stdout.
    Json,
}

impl CliArgs {
    /// `Some(true)` / `Some(false)` when a verification flag was given.
    #[must_use]
    pub fn verify_override(&self) -> Option<bool> {
        if self.no_verify {
            Some(false)
        } else if self.verify {
            Some(true)
        } else {
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/args_tests.rs"]
mod tests;
