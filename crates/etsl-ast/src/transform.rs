//! Generic tree-transform driver.
//!
//! A lowering pass is written as a partial function `Node -> Node`: the
//! `TreeTransform::transform` hook inspects one node and either returns a
//! replacement index or `None` to keep the node. The driver walks the tree in
//! the order the pass declares, writes replacements into the parent slot and
//! notifies the host through `TransformHost::on_replace` (used for history).
//!
//! ```text
//! PostOrder: children first, then transform(node)
//! PreOrder:  transform(node), then the children of the (possibly new) node
//! ```

use crate::base::NodeIndex;
use crate::node_arena::NodeArena;
use etsl_common::limits::MAX_AST_DEPTH;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraversalOrder {
    PreOrder,
    PostOrder,
}

/// Whatever owns the arena a transform runs over.
pub trait TransformHost {
    fn arena(&self) -> &NodeArena;
    fn arena_mut(&mut self) -> &mut NodeArena;

    /// Called once for each replacement, before the parent slot is written.
    fn on_replace(&mut self, _old: NodeIndex, _new: NodeIndex) {}
}

impl TransformHost for NodeArena {
    fn arena(&self) -> &NodeArena {
        self
    }

    fn arena_mut(&mut self) -> &mut NodeArena {
        self
    }
}

pub trait TreeTransform<H: TransformHost + ?Sized> {
    fn order(&self) -> TraversalOrder {
        TraversalOrder::PostOrder
    }

    /// Whether to descend into the children of `node`.
    fn enter(&mut self, _host: &mut H, _node: NodeIndex) -> bool {
        true
    }

    /// Called after the children of an entered node were visited.
    fn leave(&mut self, _host: &mut H, _node: NodeIndex) {}

    /// Replacement for `node`, or `None` to keep it.
    fn transform(&mut self, host: &mut H, node: NodeIndex) -> Option<NodeIndex>;
}

/// Run `transform` over the subtree rooted at `root`.
///
/// Returns the (possibly replaced) root; writing a replaced root into its
/// own parent is the caller's job.
pub fn apply_transform<H, T>(transform: &mut T, host: &mut H, root: NodeIndex) -> NodeIndex
where
    H: TransformHost + ?Sized,
    T: TreeTransform<H> + ?Sized,
{
    visit(transform, host, root, 0)
}

fn visit<H, T>(transform: &mut T, host: &mut H, node: NodeIndex, depth: u32) -> NodeIndex
where
    H: TransformHost + ?Sized,
    T: TreeTransform<H> + ?Sized,
{
    if host.arena().get(node).is_none() {
        return node;
    }
    if depth > MAX_AST_DEPTH {
        warn!(node = node.0, "tree transform depth limit reached; subtree skipped");
        return node;
    }

    let order = transform.order();
    let mut current = node;

    if order == TraversalOrder::PreOrder {
        current = replace(transform, host, current);
    }

    if transform.enter(host, current) {
        for child in host.arena().children(current) {
            // An earlier sibling rewrite may have moved this child elsewhere.
            if host.arena().parent(child) != current {
                continue;
            }
            let new_child = visit(transform, host, child, depth + 1);
            if new_child != child {
                host.arena_mut().replace_child(current, child, new_child);
            }
        }
        transform.leave(host, current);
    }

    if order == TraversalOrder::PostOrder {
        current = replace(transform, host, current);
    }

    current
}

fn replace<H, T>(transform: &mut T, host: &mut H, node: NodeIndex) -> NodeIndex
where
    H: TransformHost + ?Sized,
    T: TreeTransform<H> + ?Sized,
{
    match transform.transform(host, node) {
        Some(new) if new != node && new.is_some() => {
            host.on_replace(node, new);
            new
        }
        _ => node,
    }
}
