//! Scope construction and import linking.
//!
//! Builds the scope tree and bindings of a unit, then points every import
//! binding at the exported declaration of the unit it imports from.

use super::with_unit;
use crate::context::CompilationContext;
use crate::phase::{Phase, PhaseScope};
use crate::rewrite::UnitCx;
use etsl_ast::{NodeIndex, NodeKind};
use etsl_binder::ScopeBuilder;
use etsl_common::{DeclRef, UnitId, diagnostic_codes};
use tracing::{debug, trace};

pub struct InitScopesPhase;

impl Phase for InitScopesPhase {
    fn name(&self) -> &'static str {
        "init-scopes"
    }

    fn scope(&self) -> PhaseScope {
        PhaseScope::Declarations
    }

    fn precondition(&self, ctx: &CompilationContext, unit: UnitId) -> bool {
        ctx.program
            .unit(unit)
            .is_some_and(|u| matches!(u.arena.kind(u.root), Some(NodeKind::Program(_))))
    }

    fn perform(&self, ctx: &mut CompilationContext, unit: UnitId) -> bool {
        with_unit(ctx, unit, |cx| {
            let root = cx.root();
            let data = &mut *cx.unit;
            let module =
                ScopeBuilder::new(&data.arena, &mut data.scopes, cx.diagnostics, &data.name)
                    .build_unit(root);
            let linked = link_imports(cx, true);
            debug!(
                scopes = cx.unit.scopes.scopes.len(),
                bindings = cx.unit.scopes.bindings.len(),
                module = module.0,
                linked,
                "scopes built"
            );
        })
        .is_some()
    }

    fn postcondition(&self, ctx: &CompilationContext, unit: UnitId) -> bool {
        ctx.program.unit(unit).is_some_and(|u| {
            u.scopes.root.is_some() && u.scopes.scope_of_node(u.root) == u.scopes.root
        })
    }

    fn perform_on(&self, ctx: &mut CompilationContext, unit: UnitId, node: NodeIndex) -> bool {
        with_unit(ctx, unit, |cx| {
            let scope = cx.enclosing_scope(node);
            cx.rescope(node, scope);
        })
        .is_some()
    }
}

/// Set the origin of every import binding of the unit. With `report`, an
/// imported name the source unit does not export is diagnosed.
///
/// Imports of units missing from the program were reported while linking
/// the program and are skipped. Returns the number of linked bindings.
pub(crate) fn link_imports(cx: &mut UnitCx<'_>, report: bool) -> u32 {
    let mut linked = 0u32;
    for decl in cx.unit.import_decls() {
        let Some(import) = cx.arena().kind(decl).and_then(NodeKind::as_import).cloned() else {
            continue;
        };
        let Some(source) = cx
            .others
            .get_by_name(&import.source)
            .filter(|source| source.id != cx.id())
        else {
            trace!(source = %import.source, "import source not in program");
            continue;
        };
        for spec in import.specifiers {
            let Some(imported) = cx
                .arena()
                .kind(spec)
                .and_then(NodeKind::as_import_specifier)
                .map(|s| s.imported.clone())
            else {
                continue;
            };
            let Some(binding) = cx.binding_of_decl(spec) else {
                continue;
            };
            let origin = source
                .scopes
                .exported(&imported)
                .and_then(|id| source.scopes.binding(id))
                .map(|target| DeclRef::new(source.id, target.decl.0));
            if origin.is_none() && report {
                let module = source.name.clone();
                cx.report(
                    spec,
                    diagnostic_codes::IMPORTED_NAME_NOT_EXPORTED,
                    &[&module, &imported],
                );
            }
            if origin.is_some() {
                linked += 1;
            }
            if let Some(data) = cx.unit.scopes.binding_mut(binding) {
                data.origin = origin;
            }
        }
    }
    linked
}
