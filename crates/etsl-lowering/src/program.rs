//! Programs and compilation units.
//!
//! A `Program` owns every unit of one compilation: the unit being compiled
//! and the units it imports (directly or transitively). Each unit owns its
//! arena and side tables; cross-unit references (`DeclRef`, import origins)
//! are read-only lookups through `OtherUnits`.

use crate::error::{LoadError, PipelineError, PipelineResult};
use crate::history::NodeHistory;
use etsl_ast::{NodeArena, NodeIndex, NodeKind};
use etsl_binder::ScopeTable;
use etsl_checker::{NodeTypes, ProgramView};
use etsl_common::limits::MAX_IMPORT_DEPTH;
use etsl_common::{DiagnosticBag, UnitId, diagnostic_codes};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Upstream parser output for one unit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnitSource {
    pub name: String,
    /// Part of the standard library (processed by bodies phases only when
    /// compiling the standard library itself).
    #[serde(default)]
    pub stdlib: bool,
    pub arena: NodeArena,
    pub root: NodeIndex,
}

impl UnitSource {
    pub fn from_json(text: &str) -> Result<UnitSource, LoadError> {
        let mut source: UnitSource = serde_json::from_str(text)?;
        source.arena.rebuild_parents();
        Ok(source)
    }
}

#[derive(Debug)]
pub struct ProgramUnit {
    pub id: UnitId,
    pub name: String,
    pub stdlib: bool,
    pub arena: NodeArena,
    pub root: NodeIndex,
    pub scopes: ScopeTable,
    pub types: NodeTypes,
    pub history: NodeHistory,
    /// Units this unit imports, in import order, after linking.
    pub imports: Vec<UnitId>,
}

impl ProgramUnit {
    /// Snapshot of the unit in interchange form.
    #[must_use]
    pub fn to_source(&self) -> UnitSource {
        UnitSource {
            name: self.name.clone(),
            stdlib: self.stdlib,
            arena: self.arena.clone(),
            root: self.root,
        }
    }

    /// Top-level import declarations.
    #[must_use]
    pub fn import_decls(&self) -> Vec<NodeIndex> {
        match self.arena.kind(self.root) {
            Some(NodeKind::Program(program)) => program
                .statements
                .iter()
                .copied()
                .filter(|&stmt| matches!(self.arena.kind(stmt), Some(NodeKind::Import(_))))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Program {
    units: Vec<ProgramUnit>,
    by_name: FxHashMap<String, UnitId>,
    linked: bool,
}

impl Program {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> impl Iterator<Item = &ProgramUnit> {
        self.units.iter()
    }

    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&ProgramUnit> {
        self.units.get(id.index())
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut ProgramUnit> {
        self.units.get_mut(id.index())
    }

    #[must_use]
    pub fn unit_id(&self, name: &str) -> Option<UnitId> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn unit_name(&self, id: UnitId) -> &str {
        self.unit(id).map_or("<unknown>", |u| u.name.as_str())
    }

    /// Add a unit from upstream parser output.
    pub fn add_unit(&mut self, source: UnitSource) -> Result<UnitId, LoadError> {
        if self.by_name.contains_key(&source.name) {
            return Err(LoadError::DuplicateUnit(source.name));
        }
        match source.arena.kind(source.root) {
            Some(NodeKind::Program(_)) => {}
            Some(_) => return Err(LoadError::NotAProgram(source.name)),
            None => {
                return Err(LoadError::MissingRoot {
                    name: source.name,
                    root: source.root.0,
                });
            }
        }
        let id = UnitId(self.units.len() as u32);
        self.by_name.insert(source.name.clone(), id);
        self.units.push(ProgramUnit {
            id,
            name: source.name,
            stdlib: source.stdlib,
            arena: source.arena,
            root: source.root,
            scopes: ScopeTable::new(),
            types: NodeTypes::new(),
            history: NodeHistory::new(),
            imports: Vec::new(),
        });
        self.linked = false;
        debug!(unit = id.0, "unit added");
        Ok(id)
    }

    /// Add a unit from its JSON interchange form.
    pub fn add_unit_json(&mut self, text: &str) -> Result<UnitId, LoadError> {
        self.add_unit(UnitSource::from_json(text)?)
    }

    /// Add an in-memory tree (tests, tools).
    pub fn add_tree(
        &mut self,
        name: impl Into<String>,
        arena: NodeArena,
        root: NodeIndex,
    ) -> Result<UnitId, LoadError> {
        self.add_unit(UnitSource {
            name: name.into(),
            stdlib: false,
            arena,
            root,
        })
    }

    #[must_use]
    pub const fn is_linked(&self) -> bool {
        self.linked
    }

    // =========================================================================
    // Linking
    // =========================================================================

    /// Resolve import sources to units and reject import cycles.
    ///
    /// A missing unit reports `MISSING_IMPORT_UNIT` at the import declaration.
    /// An edge closing a cycle reports `IMPORT_CYCLE` and is dropped, so the
    /// import graph the phases walk is always acyclic.
    pub fn link(&mut self, diagnostics: &mut DiagnosticBag) {
        let mut edges: Vec<Vec<(UnitId, NodeIndex)>> = Vec::with_capacity(self.units.len());
        for unit in &self.units {
            let mut out: Vec<(UnitId, NodeIndex)> = Vec::new();
            for decl in unit.import_decls() {
                let Some(NodeKind::Import(import)) = unit.arena.kind(decl) else {
                    continue;
                };
                match self.by_name.get(&import.source) {
                    Some(&target) => {
                        if !out.iter().any(|&(t, _)| t == target) {
                            out.push((target, decl));
                        }
                    }
                    None => diagnostics.report(
                        &unit.name,
                        unit.arena.span(decl),
                        diagnostic_codes::MISSING_IMPORT_UNIT,
                        &[&import.source],
                    ),
                }
            }
            edges.push(out);
        }

        // Iterative DFS; an edge to a unit on the stack closes a cycle.
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            New,
            Active,
            Done,
        }
        let mut marks = vec![Mark::New; self.units.len()];
        let mut dropped: FxHashSet<(usize, usize)> = FxHashSet::default();
        for start in 0..self.units.len() {
            if marks[start] != Mark::New {
                continue;
            }
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            marks[start] = Mark::Active;
            while let Some(&mut (node, ref mut next)) = stack.last_mut() {
                if let Some(&(target, decl)) = edges[node].get(*next) {
                    *next += 1;
                    let target = target.index();
                    match marks[target] {
                        Mark::New => {
                            marks[target] = Mark::Active;
                            stack.push((target, 0));
                        }
                        Mark::Active => {
                            let unit = &self.units[node];
                            diagnostics.report(
                                &unit.name,
                                unit.arena.span(decl),
                                diagnostic_codes::IMPORT_CYCLE,
                                &[&self.units[target].name],
                            );
                            dropped.insert((node, target));
                        }
                        Mark::Done => {}
                    }
                } else {
                    marks[node] = Mark::Done;
                    stack.pop();
                }
            }
        }

        for (index, unit) in self.units.iter_mut().enumerate() {
            unit.imports = edges[index]
                .iter()
                .map(|&(target, _)| target)
                .filter(|target| !dropped.contains(&(index, target.index())))
                .collect();
        }
        self.linked = true;
        debug!(units = self.units.len(), cycles = dropped.len(), "program linked");
    }

    /// `unit` and everything it imports, imports first (post-order), each
    /// unit once.
    pub fn import_order(&self, unit: UnitId) -> PipelineResult<Vec<UnitId>> {
        let mut order = Vec::new();
        let mut seen = FxHashSet::default();
        self.collect_imports(unit, 0, &mut seen, &mut order)?;
        Ok(order)
    }

    fn collect_imports(
        &self,
        unit: UnitId,
        depth: u32,
        seen: &mut FxHashSet<UnitId>,
        order: &mut Vec<UnitId>,
    ) -> PipelineResult<()> {
        let data = self.unit(unit).ok_or(PipelineError::UnknownUnit(unit))?;
        if depth > MAX_IMPORT_DEPTH {
            warn!(unit = %data.name, "import depth limit reached");
            return Err(PipelineError::ImportDepthExceeded {
                unit: data.name.clone(),
            });
        }
        if !seen.insert(unit) {
            return Ok(());
        }
        for &import in &data.imports {
            self.collect_imports(import, depth + 1, seen, order)?;
        }
        order.push(unit);
        Ok(())
    }

    // =========================================================================
    // Split borrows
    // =========================================================================

    /// Mutable access to one unit alongside read-only access to the others.
    pub fn split_unit_mut(&mut self, id: UnitId) -> Option<(&mut ProgramUnit, OtherUnits<'_>)> {
        let index = id.index();
        if index >= self.units.len() {
            return None;
        }
        let (before, rest) = self.units.split_at_mut(index);
        let (unit, after) = rest.split_first_mut()?;
        Some((
            unit,
            OtherUnits {
                before,
                after,
                offset: index + 1,
            },
        ))
    }
}

/// Every unit of a program except the one borrowed mutably.
pub struct OtherUnits<'a> {
    before: &'a [ProgramUnit],
    after: &'a [ProgramUnit],
    offset: usize,
}

impl<'a> OtherUnits<'a> {
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&'a ProgramUnit> {
        let index = id.index();
        if index < self.before.len() {
            self.before.get(index)
        } else {
            index
                .checked_sub(self.offset)
                .and_then(|i| self.after.get(i))
        }
    }

    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&'a ProgramUnit> {
        self.before
            .iter()
            .chain(self.after.iter())
            .find(|unit| unit.name == name)
    }
}

impl ProgramView for OtherUnits<'_> {
    fn arena(&self, unit: UnitId) -> Option<&NodeArena> {
        self.get(unit).map(|u| &u.arena)
    }

    fn scopes(&self, unit: UnitId) -> Option<&ScopeTable> {
        self.get(unit).map(|u| &u.scopes)
    }

    fn types(&self, unit: UnitId) -> Option<&NodeTypes> {
        self.get(unit).map(|u| &u.types)
    }

    fn unit_name(&self, unit: UnitId) -> Option<&str> {
        self.get(unit).map(|u| u.name.as_str())
    }
}
