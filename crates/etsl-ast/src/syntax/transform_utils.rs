//! Transform utilities for syntax analysis.
//!
//! Queries over subtrees that several lowering passes need: `this` capture
//! detection, enclosing declarations and kind searches.

use crate::base::NodeIndex;
use crate::node::{Modifiers, NodeKind};
use crate::node_arena::NodeArena;

/// Check if an AST node contains a reference to `this` or `super`.
///
/// Nested functions, methods and classes bind their own `this` and are not
/// searched; arrow functions inherit the enclosing `this` and are.
#[must_use]
pub fn contains_this_reference(arena: &NodeArena, node_idx: NodeIndex) -> bool {
    let Some(node) = arena.get(node_idx) else {
        return false;
    };

    match &node.kind {
        NodeKind::This | NodeKind::Super => true,
        NodeKind::Function(_) | NodeKind::Method(_) | NodeKind::Class(_) => false,
        kind => kind
            .children()
            .into_iter()
            .any(|child| contains_this_reference(arena, child)),
    }
}

/// Whether any node of the subtree (including `root`) satisfies `pred`.
#[must_use]
pub fn contains_kind(
    arena: &NodeArena,
    root: NodeIndex,
    pred: impl Fn(&NodeKind) -> bool,
) -> bool {
    arena
        .descendants(root)
        .into_iter()
        .any(|node| arena.kind(node).is_some_and(&pred))
}

/// Every node of the subtree whose kind satisfies `pred`, pre-order.
#[must_use]
pub fn collect_kind(
    arena: &NodeArena,
    root: NodeIndex,
    pred: impl Fn(&NodeKind) -> bool,
) -> Vec<NodeIndex> {
    arena
        .descendants(root)
        .into_iter()
        .filter(|&node| arena.kind(node).is_some_and(&pred))
        .collect()
}

/// Nearest enclosing class declaration.
#[must_use]
pub fn enclosing_class(arena: &NodeArena, node: NodeIndex) -> Option<NodeIndex> {
    arena.find_ancestor(node, |n| matches!(n.kind, NodeKind::Class(_)))
}

/// Nearest enclosing function, method or arrow function.
#[must_use]
pub fn enclosing_function(arena: &NodeArena, node: NodeIndex) -> Option<NodeIndex> {
    arena.find_ancestor(node, |n| n.kind.is_function_like())
}

/// Whether `node` sits in a static context (static method/field or no class).
#[must_use]
pub fn is_static_context(arena: &NodeArena, node: NodeIndex) -> bool {
    for ancestor in arena.ancestors(node) {
        match arena.kind(ancestor) {
            Some(NodeKind::Method(_) | NodeKind::Field(_)) => {
                return arena
                    .kind(ancestor)
                    .is_some_and(|k| k.modifiers().contains(Modifiers::STATIC));
            }
            Some(NodeKind::Function(_)) => return true,
            Some(NodeKind::Class(_)) => return false,
            _ => {}
        }
    }
    true
}

/// Root of the tree containing `node`.
#[must_use]
pub fn tree_root(arena: &NodeArena, node: NodeIndex) -> NodeIndex {
    arena.ancestors(node).last().unwrap_or(node)
}
