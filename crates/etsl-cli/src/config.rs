//! Lowering options from an optional JSON config file and command-line flags.
//!
//! ```json
//! { "verify_contracts": true, "compiling_stdlib": false, "record_history": true }
//! ```
//!
//! Every key is optional; missing keys keep their defaults. Flags given on the
//! command line win over the file.

use crate::args::CliArgs;
use anyhow::{Context, Result};
use etsl_lowering::LoweringOptions;
use std::path::Path;
use tracing::debug;

pub fn load_options_file(path: &Path) -> Result<LoweringOptions> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let options = serde_json::from_str(&text)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    Ok(options)
}

/// Options for this run: defaults, then the config file, then flags.
pub fn resolve_options(args: &CliArgs) -> Result<LoweringOptions> {
    let mut options = match &args.config {
        Some(path) => load_options_file(path)?,
        None => LoweringOptions::default(),
    };
    if let Some(verify) = args.verify_override() {
        options.verify_contracts = verify;
    }
    if args.compiling_stdlib {
        options.compiling_stdlib = true;
    }
    if args.no_history {
        options.record_history = false;
    }
    debug!(?options, "lowering options");
    Ok(options)
}
