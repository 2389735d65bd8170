//! Scope and binding tables.
//!
//! The scope tree and the name bindings of a unit live in side tables keyed
//! by `NodeIndex`, so syntax nodes never own scope data and scope links are
//! weak lookups:
//! - `ScopeTable` holds scopes, bindings, node→scope, decl→binding and
//!   identifier→binding maps
//! - `ScopeBuilder` creates scopes and declares bindings (whole unit or a
//!   freshly inserted subtree; idempotent)
//! - `Resolver` binds reference identifiers and type references (whole unit or
//!   subtree; idempotent)

pub mod binding;
pub use binding::{Binding, BindingFlags, BindingId, BindingKind};

pub mod scope;
pub use scope::{Scope, ScopeId, ScopeKind};

pub mod table;
pub use table::{DeclareOutcome, ScopeTable};

pub mod builder;
pub use builder::ScopeBuilder;

pub mod resolver;
pub use resolver::{Namespace, Resolver};
