//! Diagnostic tracing for `etslc` runs.
//!
//! The pipeline opens one `compile` span per target unit (driver) and,
//! inside it, one `phase` span per executed phase carrying the phase
//! `name`, its numeric `id` and the `unit` being lowered. Plugin hooks get a
//! `plugin` span. Passes log a summary per unit at `debug` and single
//! rewrites at `trace`; the node history logs recorded replacements at
//! `trace`. A filter such as `etsl_lowering::passes=debug` shows what each
//! phase changed.
//!
//! `ETSL_LOG` (falling back to `RUST_LOG`) selects what is traced. The
//! shorthand `ETSL_LOG=phases` keeps only the `compile` and `phase` spans.
//! `ETSL_LOG_FORMAT` picks the layout: `text` (flat), `tree` (spans nested
//! by unit and phase) or `json`.
//!
//! ```bash
//! ETSL_LOG=phases ETSL_LOG_FORMAT=tree etslc --print main.json
//! ETSL_LOG="etsl_lowering::passes=debug" etslc main.json
//! ```
//!
//! Nothing is installed when neither variable is set. Trace output always
//! goes to stderr; stdout carries printed units and JSON diagnostics.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Directive `ETSL_LOG=phases` expands to.
pub const PHASE_SPANS_FILTER: &str = "etsl_cli::driver=info,etsl_lowering::phase_manager=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Tree,
    Json,
}

impl LogFormat {
    /// Parse an `ETSL_LOG_FORMAT` value; anything unknown is `Text`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "tree" => Self::Tree,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Filter directive and layout resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceSettings {
    pub directive: String,
    pub format: LogFormat,
}

impl TraceSettings {
    /// `None` when tracing is off. `etsl_log` wins over `rust_log`.
    #[must_use]
    pub fn resolve(
        etsl_log: Option<String>,
        rust_log: Option<String>,
        format: Option<String>,
    ) -> Option<Self> {
        let directive = etsl_log.or(rust_log)?;
        let directive = if directive.trim() == "phases" {
            PHASE_SPANS_FILTER.to_string()
        } else {
            directive
        };
        Some(TraceSettings {
            directive,
            format: format.as_deref().map_or(LogFormat::Text, LogFormat::parse),
        })
    }

    fn from_env() -> Option<Self> {
        Self::resolve(
            std::env::var("ETSL_LOG").ok(),
            std::env::var("RUST_LOG").ok(),
            std::env::var("ETSL_LOG_FORMAT").ok(),
        )
    }
}

/// Install the global subscriber if `ETSL_LOG` or `RUST_LOG` is set.
pub fn init_tracing() {
    let Some(settings) = TraceSettings::from_env() else {
        return;
    };
    let filter = EnvFilter::builder().parse_lossy(&settings.directive);
    match settings.format {
        LogFormat::Tree => {
            let layer = tracing_tree::HierarchicalLayer::default()
                .with_writer(std::io::stderr)
                .with_indent_amount(2)
                .with_indent_lines(true)
                .with_deferred_spans(true)
                .with_targets(true);
            Registry::default().with(filter).with(layer).init();
        }
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(std::io::stderr);
            Registry::default().with(filter).with(layer).init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::parse("tree"), LogFormat::Tree);
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse(""), LogFormat::Text);
        assert_eq!(LogFormat::parse("yaml"), LogFormat::Text);
    }

    #[test]
    fn test_settings_off_without_filter() {
        assert_eq!(TraceSettings::resolve(None, None, Some("tree".into())), None);
    }

    #[test]
    fn test_etsl_log_wins_and_phases_expands() {
        let settings =
            TraceSettings::resolve(Some("phases".into()), Some("warn".into()), Some("tree".into()))
                .unwrap();
        assert_eq!(settings.directive, PHASE_SPANS_FILTER);
        assert_eq!(settings.format, LogFormat::Tree);

        let settings = TraceSettings::resolve(None, Some("debug".into()), None).unwrap();
        assert_eq!(settings.directive, "debug");
        assert_eq!(settings.format, LogFormat::Text);
    }
}
