//! Plugin boundary.
//!
//! Plugins are registered on the `CompilationContext` and run at fixed
//! extension points of the pipeline, each of which is a phase of its own.
//! Loading plugins from disk is not part of this crate.

use crate::context::CompilationContext;
use crate::error::PipelineError;
use crate::phase::{Phase, PhaseScope};
use etsl_common::{UnitId, diagnostic_codes};
use serde::Serialize;
use tracing::{debug, info_span};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ExtensionPoint {
    AfterParse,
    AfterBind,
    AfterCheck,
    AfterLowering,
}

impl ExtensionPoint {
    #[must_use]
    pub const fn phase_name(self) -> &'static str {
        match self {
            Self::AfterParse => "plugins-after-parse",
            Self::AfterBind => "plugins-after-bind",
            Self::AfterCheck => "plugins-after-check",
            Self::AfterLowering => "plugins-after-lowering",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct PluginError {
    pub message: String,
}

impl PluginError {
    pub fn new(message: impl Into<String>) -> Self {
        PluginError {
            message: message.into(),
        }
    }
}

pub trait Plugin {
    fn name(&self) -> &str;

    /// Extension points the plugin wants to run at.
    fn points(&self) -> &[ExtensionPoint] {
        &[
            ExtensionPoint::AfterParse,
            ExtensionPoint::AfterBind,
            ExtensionPoint::AfterCheck,
            ExtensionPoint::AfterLowering,
        ]
    }

    fn run(
        &mut self,
        point: ExtensionPoint,
        ctx: &mut CompilationContext,
        unit: UnitId,
    ) -> Result<(), PluginError>;
}

#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        debug!(plugin = plugin.name(), "plugin registered");
        self.plugins.push(plugin);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }
}

/// Runs every registered plugin at one extension point.
pub struct PluginPhase {
    point: ExtensionPoint,
}

impl PluginPhase {
    #[must_use]
    pub const fn new(point: ExtensionPoint) -> Self {
        PluginPhase { point }
    }
}

impl Phase for PluginPhase {
    fn name(&self) -> &'static str {
        self.point.phase_name()
    }

    fn scope(&self) -> PhaseScope {
        PhaseScope::Bodies
    }

    fn perform(&self, ctx: &mut CompilationContext, unit: UnitId) -> bool {
        if ctx.plugins.is_empty() {
            return true;
        }
        // Plugins get the whole context, so the registry is moved out while
        // they run.
        let mut registry = std::mem::take(&mut ctx.plugins);
        let mut ok = true;
        for plugin in &mut registry.plugins {
            if !plugin.points().contains(&self.point) {
                continue;
            }
            let _span = info_span!("plugin", name = plugin.name(), point = ?self.point).entered();
            if let Err(err) = plugin.run(self.point, ctx, unit) {
                let name = plugin.name().to_string();
                let root = ctx.program.unit(unit).map(|u| u.root);
                if let Some(root) = root {
                    ctx.report(unit, root, diagnostic_codes::PLUGIN_ERROR, &[&name, &err.message]);
                }
                ctx.fail(PipelineError::PluginFailed {
                    plugin: name,
                    unit: ctx.unit_name(unit).to_string(),
                    message: err.message,
                });
                ok = false;
                break;
            }
        }
        // Plugins registered during the run are kept.
        registry.plugins.append(&mut ctx.plugins.plugins);
        ctx.plugins = registry;
        ok
    }
}
