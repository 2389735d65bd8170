//! Centralized limits and thresholds for the lowering pipeline.
//!
//! Recursive walkers over the syntax tree, the scope tree and `const`
//! initializer chains all bail out at a fixed depth instead of overflowing the
//! stack on pathological input.

/// Maximum recursion depth for syntax tree traversal.
///
/// Used by the tree-transform driver, the binder walkers and the checker.
/// Subtrees nested deeper than this are left untouched.
pub const MAX_AST_DEPTH: u32 = 500;

/// Maximum depth of `const` initializer chains followed during folding.
///
/// ```text
/// const A = B + 1;
/// const B = C + 1;
/// // ... 64 levels ...
/// ```
///
/// Cycles are caught earlier by the evaluator's visited set; this bound only
/// protects against extremely long acyclic chains.
pub const MAX_CONST_RESOLUTION_DEPTH: u32 = 64;

/// Maximum depth of class inheritance chains walked by member lookup.
pub const MAX_INHERITANCE_DEPTH: u32 = 32;

/// Maximum depth of the import graph walked by declarations phases.
pub const MAX_IMPORT_DEPTH: u32 = 128;

/// Maximum number of diagnostics printed by the CLI before truncating.
pub const MAX_REPORTED_DIAGNOSTICS: usize = 1_000;
