//! Arena-owned syntax tree for the etsl lowering pipeline.
//!
//! - `base`: `NodeIndex` handles and child lists
//! - `node`: the closed `NodeKind` sum type and its payloads
//! - `node_arena`: `NodeArena` storage, parent links and `add_*` creation
//! - `node_access`: source-order child enumeration
//! - `transform`: the generic `Node -> Node` tree-transform driver
//! - `factory`: `NodeFactory` for synthesized subtrees
//! - `printer`: source-like printer with optional node mapping

pub mod base;
pub use base::{NodeIndex, NodeList};

pub mod node;
pub use node::*;

pub mod node_access;
pub use node_access::ChildList;

pub mod node_arena;
pub use node_arena::NodeArena;

pub mod transform;
pub use transform::{TransformHost, TraversalOrder, TreeTransform, apply_transform};

pub mod factory;
pub use factory::NodeFactory;

pub mod printer;
pub use printer::{NodeMapper, Printer, print_node};

pub mod syntax;

pub use smallvec::smallvec;
