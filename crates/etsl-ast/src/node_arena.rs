//! Arena storage for syntax nodes.
//!
//! Nodes are stored contiguously and referenced by `NodeIndex`. They are never
//! freed individually; a rewrite allocates the replacement and writes its
//! index into the parent slot. Parent links are kept in a parallel vector and
//! maintained by every creation and slot-write helper.

use crate::base::{NodeIndex, NodeList};
use crate::node::*;
use crate::node_access::ChildList;
use etsl_common::Span;
use etsl_common::limits::MAX_AST_DEPTH;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeArena {
    nodes: Vec<Node>,
    /// Parent of each node (`NONE` for roots and detached nodes).
    #[serde(skip)]
    parents: Vec<NodeIndex>,
}

impl NodeArena {
    /// Maximum pre-allocation to avoid capacity overflow on huge inputs.
    const MAX_NODE_PREALLOC: usize = 5_000_000;

    #[must_use]
    pub fn new() -> NodeArena {
        NodeArena::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> NodeArena {
        let capacity = capacity.min(Self::MAX_NODE_PREALLOC);
        NodeArena {
            nodes: Vec::with_capacity(capacity),
            parents: Vec::with_capacity(capacity),
        }
    }

    /// Build an arena from raw nodes (e.g. deserialized parser output) and
    /// derive parent links from the child slots.
    #[must_use]
    pub fn from_nodes(nodes: Vec<Node>) -> NodeArena {
        let mut arena = NodeArena {
            nodes,
            parents: Vec::new(),
        };
        arena.rebuild_parents();
        arena
    }

    /// Recompute every parent link from the child slots.
    pub fn rebuild_parents(&mut self) {
        self.parents = vec![NodeIndex::NONE; self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            for child in node.kind.children() {
                if let Some(slot) = self.parents.get_mut(child.as_usize()) {
                    *slot = NodeIndex(index as u32);
                }
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: NodeIndex) -> Option<&Node> {
        if index.is_none() {
            None
        } else {
            self.nodes.get(index.as_usize())
        }
    }

    #[inline]
    pub fn get_mut(&mut self, index: NodeIndex) -> Option<&mut Node> {
        if index.is_none() {
            None
        } else {
            self.nodes.get_mut(index.as_usize())
        }
    }

    #[inline]
    #[must_use]
    pub fn kind(&self, index: NodeIndex) -> Option<&NodeKind> {
        self.get(index).map(|node| &node.kind)
    }

    #[inline]
    pub fn kind_mut(&mut self, index: NodeIndex) -> Option<&mut NodeKind> {
        self.get_mut(index).map(|node| &mut node.kind)
    }

    /// Span of a node; the default span for absent nodes.
    #[inline]
    #[must_use]
    pub fn span(&self, index: NodeIndex) -> Span {
        self.get(index).map(|node| node.span).unwrap_or_default()
    }

    #[inline]
    #[must_use]
    pub fn flags(&self, index: NodeIndex) -> NodeFlags {
        self.get(index).map(|node| node.flags).unwrap_or_default()
    }

    pub fn add_flags(&mut self, index: NodeIndex, flags: NodeFlags) {
        if let Some(node) = self.get_mut(index) {
            node.flags |= flags;
        }
    }

    /// Name of an identifier node.
    #[must_use]
    pub fn identifier_name(&self, index: NodeIndex) -> Option<&str> {
        self.kind(index)
            .and_then(NodeKind::as_identifier)
            .map(|ident| ident.name.as_str())
    }

    #[must_use]
    pub fn literal(&self, index: NodeIndex) -> Option<&LiteralValue> {
        self.kind(index).and_then(NodeKind::as_literal)
    }

    // ============================================================================
    // Parent Mapping Helpers
    // ============================================================================

    #[inline]
    #[must_use]
    pub fn parent(&self, index: NodeIndex) -> NodeIndex {
        if index.is_none() {
            return NodeIndex::NONE;
        }
        self.parents
            .get(index.as_usize())
            .copied()
            .unwrap_or(NodeIndex::NONE)
    }

    /// Record `parent` as the owner of `child`.
    #[inline]
    pub fn set_parent(&mut self, child: NodeIndex, parent: NodeIndex) {
        if child.is_none() {
            return;
        }
        if let Some(slot) = self.parents.get_mut(child.as_usize()) {
            *slot = parent;
        }
    }

    /// Re-establish parent links for every current child of `parent`.
    pub fn attach_children(&mut self, parent: NodeIndex) {
        for child in self.children(parent) {
            self.set_parent(child, parent);
        }
    }

    /// Enclosing nodes of `index`, nearest first.
    pub fn ancestors(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        let mut current = self.parent(index);
        std::iter::from_fn(move || {
            if current.is_none() {
                return None;
            }
            let out = current;
            current = self.parent(current);
            Some(out)
        })
    }

    /// Nearest ancestor matching `pred`.
    pub fn find_ancestor(
        &self,
        index: NodeIndex,
        mut pred: impl FnMut(&Node) -> bool,
    ) -> Option<NodeIndex> {
        self.ancestors(index)
            .find(|&ancestor| self.get(ancestor).is_some_and(&mut pred))
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    #[must_use]
    pub fn is_within(&self, node: NodeIndex, ancestor: NodeIndex) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    #[must_use]
    pub fn children(&self, index: NodeIndex) -> ChildList {
        self.kind(index)
            .map(NodeKind::children)
            .unwrap_or_default()
    }

    /// Every node of the subtree rooted at `root`, pre-order.
    #[must_use]
    pub fn descendants(&self, root: NodeIndex) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        if self.get(root).is_none() {
            return out;
        }
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            out.push(node);
            let children = self.children(node);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    // ============================================================================
    // Slot Writes
    // ============================================================================

    /// Write `new` into the slot of `parent` that currently holds `old`.
    ///
    /// The old node is detached (its parent becomes `NONE`) and the new node is
    /// parented. Returns false when `old` is not a child of `parent`.
    pub fn replace_child(&mut self, parent: NodeIndex, old: NodeIndex, new: NodeIndex) -> bool {
        if old.is_none() || new.is_none() {
            return false;
        }
        let Some(kind) = self.kind_mut(parent) else {
            return false;
        };
        let mut written = false;
        for slot in kind.child_slots_mut() {
            if *slot == old {
                *slot = new;
                written = true;
                break;
            }
        }
        if written {
            if self.parent(old) == parent {
                self.set_parent(old, NodeIndex::NONE);
            }
            self.set_parent(new, parent);
        }
        written
    }

    /// Append `child` to the statement/member list of `parent`.
    pub fn append_child(&mut self, parent: NodeIndex, child: NodeIndex) -> bool {
        self.insert_child(parent, usize::MAX, child)
    }

    /// Insert `child` at `position` (clamped) of the statement/member list of `parent`.
    pub fn insert_child(&mut self, parent: NodeIndex, position: usize, child: NodeIndex) -> bool {
        if child.is_none() {
            return false;
        }
        let Some(list) = self.kind_mut(parent).and_then(NodeKind::body_list_mut) else {
            return false;
        };
        let position = position.min(list.len());
        list.insert(position, child);
        self.set_parent(child, parent);
        true
    }

    /// Remove `child` from the statement/member list of `parent`.
    pub fn remove_child(&mut self, parent: NodeIndex, child: NodeIndex) -> bool {
        let Some(list) = self.kind_mut(parent).and_then(NodeKind::body_list_mut) else {
            return false;
        };
        let Some(position) = list.iter().position(|&c| c == child) else {
            return false;
        };
        list.remove(position);
        self.set_parent(child, NodeIndex::NONE);
        true
    }

    // ============================================================================
    // Node Creation Methods
    // ============================================================================

    /// Add a node; its current children are parented to it.
    ///
    /// Children are created before their parents, so every child index is
    /// already valid here.
    pub fn add(&mut self, node: Node) -> NodeIndex {
        let index = NodeIndex(self.nodes.len() as u32);
        let children = node.kind.children();
        self.nodes.push(node);
        self.parents.push(NodeIndex::NONE);
        for child in children {
            self.set_parent(child, index);
        }
        index
    }

    pub fn add_kind(&mut self, kind: NodeKind, span: Span) -> NodeIndex {
        self.add(Node::new(kind, span))
    }

    /// Add a node flagged `SYNTHETIC`.
    pub fn add_synthetic(&mut self, kind: NodeKind, span: Span) -> NodeIndex {
        self.add(Node::new(kind, span).with_flags(NodeFlags::SYNTHETIC))
    }

    pub fn add_identifier(&mut self, name: impl Into<String>, span: Span) -> NodeIndex {
        self.add_kind(NodeKind::Identifier(Identifier { name: name.into() }), span)
    }

    pub fn add_literal(&mut self, value: LiteralValue, span: Span) -> NodeIndex {
        self.add_kind(NodeKind::Literal(value), span)
    }

    pub fn add_binary(
        &mut self,
        op: BinaryOp,
        left: NodeIndex,
        right: NodeIndex,
        span: Span,
    ) -> NodeIndex {
        self.add_kind(NodeKind::Binary(BinaryExpr { op, left, right }), span)
    }

    pub fn add_unary(&mut self, op: UnaryOp, operand: NodeIndex, span: Span) -> NodeIndex {
        self.add_kind(NodeKind::Unary(UnaryExpr { op, operand }), span)
    }

    pub fn add_conditional(
        &mut self,
        test: NodeIndex,
        consequent: NodeIndex,
        alternate: NodeIndex,
        span: Span,
    ) -> NodeIndex {
        self.add_kind(
            NodeKind::Conditional(ConditionalExpr {
                test,
                consequent,
                alternate,
            }),
            span,
        )
    }

    pub fn add_call(&mut self, callee: NodeIndex, args: NodeList, span: Span) -> NodeIndex {
        self.add_kind(
            NodeKind::Call(CallExpr {
                callee,
                type_args: NodeList::new(),
                args,
            }),
            span,
        )
    }

    pub fn add_member(
        &mut self,
        object: NodeIndex,
        property: impl Into<String>,
        span: Span,
    ) -> NodeIndex {
        self.add_kind(
            NodeKind::Member(MemberExpr {
                object,
                property: property.into(),
            }),
            span,
        )
    }

    pub fn add_block(&mut self, statements: NodeList, span: Span) -> NodeIndex {
        self.add_kind(NodeKind::Block(Block { statements }), span)
    }

    pub fn add_expr_stmt(&mut self, expr: NodeIndex, span: Span) -> NodeIndex {
        self.add_kind(NodeKind::ExprStmt(ExprStatement { expr }), span)
    }

    pub fn add_return(&mut self, expr: NodeIndex, span: Span) -> NodeIndex {
        self.add_kind(NodeKind::Return(ReturnStatement { expr }), span)
    }

    pub fn add_type_ref(
        &mut self,
        name: impl Into<String>,
        type_args: NodeList,
        span: Span,
    ) -> NodeIndex {
        self.add_kind(
            NodeKind::TypeReference(TypeReference {
                name: name.into(),
                type_args,
            }),
            span,
        )
    }

    pub fn add_primitive_type(&mut self, kind: PrimitiveKind, span: Span) -> NodeIndex {
        self.add_kind(NodeKind::PrimitiveType(kind), span)
    }

    pub fn add_program(&mut self, statements: NodeList, span: Span) -> NodeIndex {
        self.add_kind(NodeKind::Program(ProgramDecl { statements }), span)
    }

    // ============================================================================
    // Cloning
    // ============================================================================

    /// Deep copy of the subtree rooted at `index`; the copy is detached.
    ///
    /// Spans and flags are preserved. Subtrees nested deeper than
    /// `MAX_AST_DEPTH` are shared rather than copied.
    pub fn clone_subtree(&mut self, index: NodeIndex) -> NodeIndex {
        self.clone_subtree_at_depth(index, 0)
    }

    fn clone_subtree_at_depth(&mut self, index: NodeIndex, depth: u32) -> NodeIndex {
        let Some(node) = self.get(index).cloned() else {
            return NodeIndex::NONE;
        };
        if depth > MAX_AST_DEPTH {
            return index;
        }
        let mut copy = node;
        let originals = copy.kind.children();
        let mut clones: ChildList = ChildList::new();
        for &child in &originals {
            clones.push(self.clone_subtree_at_depth(child, depth + 1));
        }
        for (slot, clone) in copy.kind.child_slots_mut().into_iter().zip(clones) {
            *slot = clone;
        }
        self.add(copy)
    }
}
