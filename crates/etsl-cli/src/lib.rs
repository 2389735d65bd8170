//! `etslc`: loads parser output, runs the lowering pipeline and reports
//! diagnostics.

pub mod args;
pub mod config;
pub mod driver;
pub mod reporter;
pub mod tracing_config;
