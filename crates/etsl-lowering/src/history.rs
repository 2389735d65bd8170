//! Phase-indexed node history.
//!
//! Passes rewrite the tree in place, but tooling (`--dump-after`, tests,
//! diagnostics of later passes) sometimes needs the tree as it was after an
//! earlier phase. Every rewrite is recorded here:
//!
//! ```text
//! slot #3 (original: n17)
//!     phase 6  -> n40        constant folding replaced n17 by n40
//!     phase 12 -> n58        lambda lowering replaced n40 by n58
//! ```
//!
//! A slot is the identity of one child position. Its entries are strictly
//! increasing in phase id, so lookups are a binary search. Every replacement
//! node remembers the slot (and parent) it was written into, so the view of a
//! subtree at phase P can be rebuilt top-down: the printer asks for each
//! `(parent, child)` pair which node occupied that position at P.
//!
//! Nodes appended to statement or member lists are recorded as insertions
//! and hidden in views before their phase.

use crate::error::HistoryError;
use crate::phase::PhaseId;
use etsl_ast::{NodeArena, NodeIndex, Printer};
use rustc_hash::FxHashMap;
use serde::Serialize;
use smallvec::SmallVec;
use tracing::trace;

/// Identity of one rewritten child position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SlotId(pub u32);

#[derive(Clone, Debug, Serialize)]
struct Slot {
    original: NodeIndex,
    /// `(phase, node)`; `None` is a tombstone (the child was removed).
    entries: Vec<(PhaseId, Option<NodeIndex>)>,
}

/// Where a replacement node was written.
#[derive(Clone, Copy, Debug, Serialize)]
struct Site {
    parent: NodeIndex,
    slot: SlotId,
    phase: PhaseId,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct NodeHistory {
    slots: Vec<Slot>,
    /// Original node of a slot → the slot.
    by_original: FxHashMap<u32, SlotId>,
    /// Replacement node → the positions it was written into.
    sites: FxHashMap<u32, SmallVec<[Site; 1]>>,
    /// Nodes added to a list, with the phase that added them.
    inserted: FxHashMap<u32, PhaseId>,
}

impl NodeHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty() && self.inserted.is_empty()
    }

    // =========================================================================
    // Recording
    // =========================================================================

    /// Record that `new` replaced `old` in a child slot of `parent` during
    /// `phase`. Returns the slot the entry was appended to.
    pub fn record_replace(
        &mut self,
        parent: NodeIndex,
        old: NodeIndex,
        new: NodeIndex,
        phase: PhaseId,
    ) -> Result<SlotId, HistoryError> {
        let slot = self.slot_for(parent, old);
        self.push_entry(slot, phase, Some(new))?;
        self.sites.entry(new.0).or_default().push(Site {
            parent,
            slot,
            phase,
        });
        trace!(slot = slot.0, old = old.0, new = new.0, phase = phase.0, "history: replace");
        Ok(slot)
    }

    /// Record that `old` was removed from `parent` during `phase`.
    pub fn record_remove(
        &mut self,
        parent: NodeIndex,
        old: NodeIndex,
        phase: PhaseId,
    ) -> Result<SlotId, HistoryError> {
        let slot = self.slot_for(parent, old);
        self.push_entry(slot, phase, None)?;
        trace!(slot = slot.0, old = old.0, phase = phase.0, "history: remove");
        Ok(slot)
    }

    /// Record that `node` was added to a list during `phase`. The first
    /// insertion wins.
    pub fn record_insert(&mut self, node: NodeIndex, phase: PhaseId) {
        self.inserted.entry(node.0).or_insert(phase);
    }

    /// The slot `old` occupies under `parent`: the slot it was written into
    /// if it is itself a replacement there, otherwise its own slot.
    fn slot_for(&mut self, parent: NodeIndex, old: NodeIndex) -> SlotId {
        if let Some(site) = self.site_at(parent, old) {
            return site.slot;
        }
        if let Some(&slot) = self.by_original.get(&old.0) {
            return slot;
        }
        let slot = SlotId(self.slots.len() as u32);
        self.slots.push(Slot {
            original: old,
            entries: Vec::new(),
        });
        self.by_original.insert(old.0, slot);
        slot
    }

    fn push_entry(
        &mut self,
        slot: SlotId,
        phase: PhaseId,
        node: Option<NodeIndex>,
    ) -> Result<(), HistoryError> {
        let data = self
            .slots
            .get_mut(slot.0 as usize)
            .ok_or(HistoryError::NoSlot(slot.0))?;
        match data.entries.last_mut() {
            Some(last) if last.0 == phase => {
                last.1 = node;
                return Ok(());
            }
            Some(last) if last.0 > phase => {
                return Err(HistoryError::OutOfOrder {
                    phase,
                    last: last.0,
                });
            }
            _ => {}
        }
        data.entries.push((phase, node));
        Ok(())
    }

    fn site_at(&self, parent: NodeIndex, node: NodeIndex) -> Option<Site> {
        self.sites
            .get(&node.0)?
            .iter()
            .rev()
            .find(|site| site.parent == parent)
            .copied()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Slot of a node: the slot it replaced into, or the slot it originated.
    #[must_use]
    pub fn slot_of(&self, node: NodeIndex) -> Option<SlotId> {
        if let Some(sites) = self.sites.get(&node.0)
            && let Some(site) = sites.last()
        {
            return Some(site.slot);
        }
        self.by_original.get(&node.0).copied()
    }

    #[must_use]
    pub fn original(&self, slot: SlotId) -> Option<NodeIndex> {
        self.slots.get(slot.0 as usize).map(|s| s.original)
    }

    /// Latest entry of `slot` not after `phase`. `None` when every entry is
    /// later (or the slot is unknown); `Some(None)` for a tombstone.
    fn latest_entry(&self, slot: SlotId, phase: PhaseId) -> Option<Option<NodeIndex>> {
        let data = self.slots.get(slot.0 as usize)?;
        let index = data.entries.partition_point(|&(p, _)| p <= phase);
        let &(_, node) = data.entries.get(index.checked_sub(1)?)?;
        Some(node)
    }

    /// Node written into `slot` by the latest entry not after `phase`.
    /// `None` before the first entry and from a tombstone on.
    #[must_use]
    pub fn at(&self, slot: SlotId, phase: PhaseId) -> Option<NodeIndex> {
        self.latest_entry(slot, phase).flatten()
    }

    /// Node occupying `slot` as of `phase`: like `at`, but the original node
    /// before the first entry.
    #[must_use]
    pub fn occupant_at(&self, slot: SlotId, phase: PhaseId) -> Option<NodeIndex> {
        match self.latest_entry(slot, phase) {
            Some(node) => node,
            None => self.original(slot),
        }
    }

    /// Node written into `slot` exactly at `phase`, if that phase rewrote it.
    #[must_use]
    pub fn at_exact(&self, slot: SlotId, phase: PhaseId) -> Option<NodeIndex> {
        let data = self.slots.get(slot.0 as usize)?;
        let index = data
            .entries
            .binary_search_by_key(&phase, |&(p, _)| p)
            .ok()?;
        data.entries[index].1
    }

    /// Phases that rewrote `slot`, in order.
    #[must_use]
    pub fn phases_of(&self, slot: SlotId) -> Vec<PhaseId> {
        self.slots
            .get(slot.0 as usize)
            .map(|s| s.entries.iter().map(|&(p, _)| p).collect())
            .unwrap_or_default()
    }

    /// Node that occupied the position of `node` under `parent` as of `phase`.
    /// `None` when the position did not exist yet (or had been removed).
    #[must_use]
    pub fn resolve_in(&self, parent: NodeIndex, node: NodeIndex, phase: PhaseId) -> Option<NodeIndex> {
        if let Some(site) = self.site_at(parent, node)
            && site.phase > phase
        {
            return self.occupant_at(site.slot, phase);
        }
        if self.inserted.get(&node.0).is_some_and(|&added| added > phase) {
            return None;
        }
        Some(node)
    }

    /// `resolve_in` with the current parent of `node`.
    #[must_use]
    pub fn resolve(&self, arena: &NodeArena, node: NodeIndex, phase: PhaseId) -> Option<NodeIndex> {
        self.resolve_in(arena.parent(node), node, phase)
    }
}

/// Print the subtree rooted at `root` as it was after `phase` ran.
#[must_use]
pub fn print_at_phase(arena: &NodeArena, history: &NodeHistory, root: NodeIndex, phase: PhaseId) -> String {
    let mapper = move |parent: NodeIndex, child: NodeIndex| {
        if parent.is_none() {
            return history.resolve(arena, child, phase);
        }
        history.resolve_in(parent, child, phase)
    };
    Printer::with_mapper(arena, &mapper).print(root)
}
