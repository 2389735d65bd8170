//! Reference type checker for the etsl lowering pipeline.
//!
//! - `types` / `intern`: `TypeId`, `TypeData` and the `TypeInterner` with its
//!   class registry
//! - `relation`: subtyping, assignability and substitution
//! - `format`: `TypeFormatter` for diagnostics
//! - `node_types`: the per-unit `NodeTypes` side table and `ProgramView`
//! - `checker`: the `Checker` (`check`, `check_with_expected`,
//!   `resolve_type_reference`), split across `declarations`, `expr`,
//!   `call_checker`, `property_checker`, `statements` and `type_nodes`
//! - `recursion`: `RecursionGuard` shared with constant folding

pub mod types;
pub use types::{
    BuiltinKind, ClassRef, FunctionShape, IntrinsicKind, ParamInfo, TypeData, TypeId, TypeList,
    TypeParamRef,
};

pub mod intern;
pub use intern::{ClassInfo, TypeInterner};

pub mod recursion;
pub use recursion::{RecursionGuard, RecursionProfile, RecursionResult};

pub mod format;
pub use format::{TypeFormatter, format_type};

pub mod relation;
pub use relation::{Relation, is_assignable};

pub mod node_types;
pub use node_types::{NodeTypes, ProgramView};

pub mod checker;
pub use checker::{CheckedUnit, Checker};

mod call_checker;
mod declarations;
mod expr;
pub mod property_checker;
pub use property_checker::MemberInfo;
mod statements;
mod type_nodes;
