//! Name bindings (declarations visible through a scope).

use crate::scope::ScopeId;
use bitflags::bitflags;
use etsl_ast::NodeIndex;
use etsl_common::DeclRef;
use serde::Serialize;

/// Index of a binding in its unit's `ScopeTable`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BindingId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum BindingKind {
    Const,
    Let,
    Var,
    Parameter,
    Function,
    Class,
    Interface,
    Enum,
    EnumLiteral,
    TypeParameter,
    Field,
    Method,
    Import,
}

impl BindingKind {
    /// Kinds a bare identifier in expression position may refer to.
    #[must_use]
    pub const fn is_value(self) -> bool {
        matches!(
            self,
            Self::Const
                | Self::Let
                | Self::Var
                | Self::Parameter
                | Self::Function
                | Self::Class
                | Self::Enum
                | Self::EnumLiteral
                | Self::Import
        )
    }

    /// Kinds a type reference may refer to.
    #[must_use]
    pub const fn is_type(self) -> bool {
        matches!(
            self,
            Self::Class | Self::Interface | Self::Enum | Self::TypeParameter | Self::Import
        )
    }

    /// Local variable-like kinds.
    #[must_use]
    pub const fn is_variable(self) -> bool {
        matches!(self, Self::Const | Self::Let | Self::Var | Self::Parameter)
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
    pub struct BindingFlags: u32 {
        const STATIC = 1 << 0;
        const READONLY = 1 << 1;
        const EXPORTED = 1 << 2;
        /// Class binding that was an enum before lowering.
        const ENUM_LIKE = 1 << 3;
        const SYNTHETIC = 1 << 4;
        const OPTIONAL = 1 << 5;
        const REST = 1 << 6;
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    pub flags: BindingFlags,
    /// Declaration node in this unit.
    pub decl: NodeIndex,
    /// Scope that declares this binding.
    pub scope: ScopeId,
    /// Declaration in another unit, for import bindings.
    pub origin: Option<DeclRef>,
}

impl Binding {
    #[must_use]
    pub fn is_const(&self) -> bool {
        self.kind == BindingKind::Const
            || (self.flags.contains(BindingFlags::READONLY)
                && matches!(self.kind, BindingKind::Field | BindingKind::EnumLiteral))
    }
}
