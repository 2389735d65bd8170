//! Type representation.
//!
//! Types are interned: a `TypeId` is an index into the `TypeInterner`, so type
//! equality is an integer comparison. Class-like types are nominal and refer
//! to their declaration through a `DeclRef`, which may point into another unit.

use etsl_ast::PrimitiveKind;
use etsl_common::DeclRef;
use serde::Serialize;
use smallvec::SmallVec;

/// Handle to an interned type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(pub u32);

impl TypeId {
    /// Error marker: assigned to nodes whose checking failed.
    pub const ERROR: TypeId = TypeId(0);
    pub const VOID: TypeId = TypeId(1);
    pub const UNDEFINED: TypeId = TypeId(2);
    pub const NULL: TypeId = TypeId(3);
    pub const BOOLEAN: TypeId = TypeId(4);
    pub const CHAR: TypeId = TypeId(5);
    pub const INT: TypeId = TypeId(6);
    pub const LONG: TypeId = TypeId(7);
    pub const FLOAT: TypeId = TypeId(8);
    pub const DOUBLE: TypeId = TypeId(9);
    pub const STRING: TypeId = TypeId(10);
    pub const NEVER: TypeId = TypeId(11);
    /// Root of the reference type hierarchy; every value boxes to it.
    pub const OBJECT: TypeId = TypeId(12);

    /// Number of pre-interned intrinsic types.
    pub const INTRINSIC_COUNT: u32 = 13;

    #[inline]
    #[must_use]
    pub const fn is_error(self) -> bool {
        self.0 == Self::ERROR.0
    }

    #[inline]
    #[must_use]
    pub const fn is_intrinsic(self) -> bool {
        self.0 < Self::INTRINSIC_COUNT
    }

    /// Numeric rank in the widening order char < int < long < float < double.
    #[must_use]
    pub const fn numeric_rank(self) -> Option<u8> {
        match self {
            Self::CHAR => Some(0),
            Self::INT => Some(1),
            Self::LONG => Some(2),
            Self::FLOAT => Some(3),
            Self::DOUBLE => Some(4),
            _ => None,
        }
    }

    #[must_use]
    pub const fn from_numeric_rank(rank: u8) -> TypeId {
        match rank {
            0 => Self::CHAR,
            1 => Self::INT,
            2 => Self::LONG,
            3 => Self::FLOAT,
            _ => Self::DOUBLE,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        self.numeric_rank().is_some()
    }

    #[inline]
    #[must_use]
    pub const fn is_integral(self) -> bool {
        matches!(self, Self::CHAR | Self::INT | Self::LONG)
    }

    /// Value types that are boxed when passed through `Object`.
    #[inline]
    #[must_use]
    pub const fn is_primitive(self) -> bool {
        self.is_numeric() || matches!(self, Self::BOOLEAN)
    }

    #[inline]
    #[must_use]
    pub const fn is_nullish(self) -> bool {
        matches!(self, Self::NULL | Self::UNDEFINED)
    }

    #[must_use]
    pub const fn from_primitive(kind: PrimitiveKind) -> TypeId {
        match kind {
            PrimitiveKind::Boolean => Self::BOOLEAN,
            PrimitiveKind::Char => Self::CHAR,
            PrimitiveKind::Int => Self::INT,
            PrimitiveKind::Long => Self::LONG,
            PrimitiveKind::Float => Self::FLOAT,
            PrimitiveKind::Double => Self::DOUBLE,
            PrimitiveKind::String => Self::STRING,
            PrimitiveKind::Void => Self::VOID,
            PrimitiveKind::Null => Self::NULL,
            PrimitiveKind::Undefined => Self::UNDEFINED,
            PrimitiveKind::Never => Self::NEVER,
        }
    }

    /// Primitive type keyword for this intrinsic, if it has one.
    #[must_use]
    pub const fn as_primitive(self) -> Option<PrimitiveKind> {
        Some(match self {
            Self::BOOLEAN => PrimitiveKind::Boolean,
            Self::CHAR => PrimitiveKind::Char,
            Self::INT => PrimitiveKind::Int,
            Self::LONG => PrimitiveKind::Long,
            Self::FLOAT => PrimitiveKind::Float,
            Self::DOUBLE => PrimitiveKind::Double,
            Self::STRING => PrimitiveKind::String,
            Self::VOID => PrimitiveKind::Void,
            Self::NULL => PrimitiveKind::Null,
            Self::UNDEFINED => PrimitiveKind::Undefined,
            Self::NEVER => PrimitiveKind::Never,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum IntrinsicKind {
    Error,
    Void,
    Undefined,
    Null,
    Boolean,
    Char,
    Int,
    Long,
    Float,
    Double,
    String,
    Never,
    Object,
}

impl IntrinsicKind {
    pub const ALL: [IntrinsicKind; 13] = [
        Self::Error,
        Self::Void,
        Self::Undefined,
        Self::Null,
        Self::Boolean,
        Self::Char,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
        Self::String,
        Self::Never,
        Self::Object,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Void => "void",
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Char => "char",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Never => "never",
            Self::Object => "Object",
        }
    }
}

/// Builtin generic classes known to the checker without a declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum BuiltinKind {
    Error,
    BaseEnum,
    Map,
    Record,
}

impl BuiltinKind {
    #[must_use]
    pub fn from_name(name: &str) -> Option<BuiltinKind> {
        Some(match name {
            "Error" => Self::Error,
            "BaseEnum" => Self::BaseEnum,
            "Map" => Self::Map,
            "Record" => Self::Record,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::BaseEnum => "BaseEnum",
            Self::Map => "Map",
            Self::Record => "Record",
        }
    }

    /// Number of type arguments the builtin takes.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::Error => 0,
            Self::BaseEnum => 1,
            Self::Map | Self::Record => 2,
        }
    }

    /// Builtins whose object literals are lowered to `set` chains.
    #[must_use]
    pub const fn is_keyed_collection(self) -> bool {
        matches!(self, Self::Map | Self::Record)
    }
}

pub type TypeList = SmallVec<[TypeId; 4]>;

/// A nominal reference to a class or interface, with type arguments.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ClassRef {
    pub decl: DeclRef,
    pub name: String,
    pub args: TypeList,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ParamInfo {
    pub ty: TypeId,
    pub optional: bool,
    pub rest: bool,
}

impl ParamInfo {
    #[must_use]
    pub const fn required(ty: TypeId) -> Self {
        ParamInfo {
            ty,
            optional: false,
            rest: false,
        }
    }
}

/// Call signature of functions, methods, arrows and function type nodes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct FunctionShape {
    pub type_params: TypeList,
    pub params: Vec<ParamInfo>,
    pub ret: TypeId,
}

impl FunctionShape {
    /// Number of leading parameters that must be supplied.
    #[must_use]
    pub fn required_count(&self) -> usize {
        self.params
            .iter()
            .take_while(|p| !p.optional && !p.rest)
            .count()
    }

    /// Number of non-rest parameters.
    #[must_use]
    pub fn fixed_count(&self) -> usize {
        self.params.iter().filter(|p| !p.rest).count()
    }

    #[must_use]
    pub fn rest(&self) -> Option<&ParamInfo> {
        self.params.last().filter(|p| p.rest)
    }

    #[must_use]
    pub fn accepts_arity(&self, count: usize) -> bool {
        count >= self.required_count() && (self.rest().is_some() || count <= self.fixed_count())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TypeParamRef {
    pub decl: DeclRef,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TypeData {
    Intrinsic(IntrinsicKind),
    /// Instance type of a class.
    Class(ClassRef),
    Interface(ClassRef),
    /// Member type of a (not yet lowered) enum.
    Enum(DeclRef, String),
    /// The class or enum itself used as a value (`E` in `E.A`).
    Static(DeclRef, String),
    Function(FunctionShape),
    Array(TypeId),
    Union(TypeList),
    TypeParameter(TypeParamRef),
    Builtin(BuiltinKind, TypeList),
}
