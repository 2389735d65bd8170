//! Syntax node definitions.
//!
//! A `Node` is a closed tagged union (`NodeKind`) plus the span and flags every
//! node carries. Child links are `NodeIndex` handles into the owning
//! `NodeArena`; parent links live in the arena, never in the payload.

use crate::base::{NodeIndex, NodeList};
use bitflags::bitflags;
use etsl_common::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Flags attached to nodes by lowering passes.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct NodeFlags: u32 {
        /// Node was created by a pass, not by the parser.
        const SYNTHETIC = 1 << 0;
        /// Class synthesized from an enum declaration.
        const ENUM_LIKE = 1 << 1;
        /// Class synthesized by closure conversion.
        const LAMBDA_CLASS = 1 << 2;
        /// Method holding the body of a converted closure.
        const LAMBDA_CALLEE = 1 << 3;
    }
}

bitflags! {
    /// Declaration modifiers.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Modifiers: u32 {
        const STATIC = 1 << 0;
        const READONLY = 1 << 1;
        const EXPORT = 1 << 2;
        const PRIVATE = 1 << 3;
        const PROTECTED = 1 << 4;
        const PUBLIC = 1 << 5;
        const ABSTRACT = 1 << 6;
        const FINAL = 1 << 7;
        const CONST = 1 << 8;
        const DECLARE = 1 << 9;
    }
}

impl Modifiers {
    /// Keywords in source order, for printing.
    #[must_use]
    pub fn keywords(self) -> Vec<&'static str> {
        const ORDER: &[(Modifiers, &str)] = &[
            (Modifiers::EXPORT, "export"),
            (Modifiers::DECLARE, "declare"),
            (Modifiers::PUBLIC, "public"),
            (Modifiers::PROTECTED, "protected"),
            (Modifiers::PRIVATE, "private"),
            (Modifiers::ABSTRACT, "abstract"),
            (Modifiers::FINAL, "final"),
            (Modifiers::STATIC, "static"),
            (Modifiers::READONLY, "readonly"),
        ];
        ORDER
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, kw)| *kw)
            .collect()
    }
}

// =============================================================================
// Literals and operators
// =============================================================================

/// Literal value carried by a `NodeKind::Literal` node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
    Null,
    Undefined,
}

impl LiteralValue {
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Char(_) | Self::Int(_) | Self::Long(_) | Self::Float(_) | Self::Double(_)
        )
    }

    #[must_use]
    pub const fn is_integral(&self) -> bool {
        matches!(self, Self::Char(_) | Self::Int(_) | Self::Long(_))
    }

    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Char(_) => "char",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Boolean(_) => "boolean",
            Self::String(_) => "string",
            Self::Null => "null",
            Self::Undefined => "undefined",
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(c) => match char::from_u32(u32::from(*c)) {
                Some(ch) => write!(f, "c'{}'", ch.escape_default()),
                None => write!(f, "c'\\u{{{c:x}}}'"),
            },
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}f"),
            Self::Double(v) => write!(f, "{v:?}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "\"{}\"", s.escape_default()),
            Self::Null => f.write_str("null"),
            Self::Undefined => f.write_str("undefined"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    LogicalAnd,
    LogicalOr,
    Nullish,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    Le,
    Ge,
    InstanceOf,
}

impl BinaryOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::UShr => ">>>",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
            Self::Nullish => "??",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::StrictEq => "===",
            Self::StrictNotEq => "!==",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::InstanceOf => "instanceof",
        }
    }

    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq
                | Self::NotEq
                | Self::StrictEq
                | Self::StrictNotEq
                | Self::Lt
                | Self::Gt
                | Self::Le
                | Self::Ge
        )
    }

    #[must_use]
    pub const fn is_logical(self) -> bool {
        matches!(self, Self::LogicalAnd | Self::LogicalOr | Self::Nullish)
    }

    #[must_use]
    pub const fn is_shift(self) -> bool {
        matches!(self, Self::Shl | Self::Shr | Self::UShr)
    }

    #[must_use]
    pub const fn is_bitwise(self) -> bool {
        matches!(self, Self::BitAnd | Self::BitOr | Self::BitXor)
    }

    /// Printing precedence; higher binds tighter.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Nullish => 1,
            Self::LogicalOr => 2,
            Self::LogicalAnd => 3,
            Self::BitOr => 4,
            Self::BitXor => 5,
            Self::BitAnd => 6,
            Self::Eq | Self::NotEq | Self::StrictEq | Self::StrictNotEq => 7,
            Self::Lt | Self::Gt | Self::Le | Self::Ge | Self::InstanceOf => 8,
            Self::Shl | Self::Shr | Self::UShr => 9,
            Self::Add | Self::Sub => 10,
            Self::Mul | Self::Div | Self::Mod => 11,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Plus,
    Minus,
    BitNot,
    Not,
}

impl UnaryOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::BitNot => "~",
            Self::Not => "!",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

impl UpdateOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Increment => "++",
            Self::Decrement => "--",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
}

impl AssignOp {
    /// The binary operator a compound assignment applies, `None` for `=`.
    #[must_use]
    pub const fn binary_op(self) -> Option<BinaryOp> {
        Some(match self {
            Self::Assign => return None,
            Self::Add => BinaryOp::Add,
            Self::Sub => BinaryOp::Sub,
            Self::Mul => BinaryOp::Mul,
            Self::Div => BinaryOp::Div,
            Self::Mod => BinaryOp::Mod,
            Self::Shl => BinaryOp::Shl,
            Self::Shr => BinaryOp::Shr,
            Self::UShr => BinaryOp::UShr,
            Self::BitAnd => BinaryOp::BitAnd,
            Self::BitOr => BinaryOp::BitOr,
            Self::BitXor => BinaryOp::BitXor,
        })
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::Add => "+=",
            Self::Sub => "-=",
            Self::Mul => "*=",
            Self::Div => "/=",
            Self::Mod => "%=",
            Self::Shl => "<<=",
            Self::Shr => ">>=",
            Self::UShr => ">>>=",
            Self::BitAnd => "&=",
            Self::BitOr => "|=",
            Self::BitXor => "^=",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Boolean,
    Char,
    Int,
    Long,
    Float,
    Double,
    String,
    Void,
    Null,
    Undefined,
    Never,
}

impl PrimitiveKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Char => "char",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Void => "void",
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::Never => "never",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarKind {
    Const,
    Let,
    Var,
}

impl VarKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Const => "const",
            Self::Let => "let",
            Self::Var => "var",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodKind {
    #[default]
    Method,
    Constructor,
}

/// Key of an object-literal or annotation property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PropertyKey {
    Name(String),
    Literal(LiteralValue),
}

// =============================================================================
// Payloads
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: NodeIndex,
    pub right: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateExpr {
    pub op: UpdateOp,
    pub prefix: bool,
    pub operand: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssignmentExpr {
    pub op: AssignOp,
    pub target: NodeIndex,
    pub value: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConditionalExpr {
    pub test: NodeIndex,
    pub consequent: NodeIndex,
    pub alternate: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallExpr {
    pub callee: NodeIndex,
    #[serde(default)]
    pub type_args: NodeList,
    pub args: NodeList,
}

/// `new T<A>(args)`; `type_ref` is a `TypeReference` node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewExpr {
    pub type_ref: NodeIndex,
    pub args: NodeList,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberExpr {
    pub object: NodeIndex,
    pub property: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexExpr {
    pub object: NodeIndex,
    pub index: NodeIndex,
}

/// Closure literal `(params): R => body`; `body` is a block or an expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArrowFunction {
    #[serde(default)]
    pub type_params: NodeList,
    pub params: NodeList,
    #[serde(default)]
    pub return_type: NodeIndex,
    pub body: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectLiteral {
    pub properties: NodeList,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArrayLiteral {
    pub elements: NodeList,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub key: PropertyKey,
    pub value: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpreadElement {
    pub expr: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AsExpr {
    pub expr: NodeIndex,
    pub type_annotation: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParenExpr {
    pub expr: NodeIndex,
}

/// Root of a compiled unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgramDecl {
    pub statements: NodeList,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImportDecl {
    pub specifiers: NodeList,
    /// Name of the imported unit.
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImportSpecifier {
    pub imported: String,
    pub local: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    #[serde(default)]
    pub modifiers: Modifiers,
    pub name: String,
    #[serde(default)]
    pub type_params: NodeList,
    #[serde(default)]
    pub extends: NodeIndex,
    #[serde(default)]
    pub implements: NodeList,
    pub members: NodeList,
    #[serde(default)]
    pub annotations: NodeList,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDecl {
    #[serde(default)]
    pub modifiers: Modifiers,
    pub name: String,
    #[serde(default)]
    pub type_params: NodeList,
    #[serde(default)]
    pub extends: NodeList,
    pub members: NodeList,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    #[serde(default)]
    pub modifiers: Modifiers,
    pub name: String,
    pub members: NodeList,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: String,
    #[serde(default)]
    pub init: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    #[serde(default)]
    pub modifiers: Modifiers,
    pub name: String,
    #[serde(default)]
    pub type_params: NodeList,
    pub params: NodeList,
    #[serde(default)]
    pub return_type: NodeIndex,
    #[serde(default)]
    pub body: NodeIndex,
    #[serde(default)]
    pub annotations: NodeList,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub kind: MethodKind,
    pub name: String,
    #[serde(default)]
    pub type_params: NodeList,
    pub params: NodeList,
    #[serde(default)]
    pub return_type: NodeIndex,
    #[serde(default)]
    pub body: NodeIndex,
    #[serde(default)]
    pub annotations: NodeList,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    #[serde(default)]
    pub modifiers: Modifiers,
    pub name: String,
    #[serde(default)]
    pub type_annotation: NodeIndex,
    #[serde(default)]
    pub init: NodeIndex,
    #[serde(default)]
    pub annotations: NodeList,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterDecl {
    pub name: String,
    #[serde(default)]
    pub type_annotation: NodeIndex,
    #[serde(default)]
    pub init: NodeIndex,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub rest: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeParameterDecl {
    pub name: String,
    #[serde(default)]
    pub constraint: NodeIndex,
    #[serde(default)]
    pub default: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub kind: VarKind,
    #[serde(default)]
    pub modifiers: Modifiers,
    pub name: String,
    #[serde(default)]
    pub type_annotation: NodeIndex,
    #[serde(default)]
    pub init: NodeIndex,
}

/// `@Name({key = value, ...})`; every property is a `Property` node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotationUsage {
    pub name: String,
    #[serde(default)]
    pub properties: NodeList,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub statements: NodeList,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExprStatement {
    pub expr: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReturnStatement {
    #[serde(default)]
    pub expr: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IfStatement {
    pub test: NodeIndex,
    pub consequent: NodeIndex,
    #[serde(default)]
    pub alternate: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WhileStatement {
    pub test: NodeIndex,
    pub body: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DoWhileStatement {
    pub body: NodeIndex,
    pub test: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForStatement {
    #[serde(default)]
    pub init: NodeIndex,
    #[serde(default)]
    pub test: NodeIndex,
    #[serde(default)]
    pub update: NodeIndex,
    pub body: NodeIndex,
}

/// `for (decl of iterable) body`; `decl` is a `Variable` node without initializer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForOfStatement {
    pub decl: NodeIndex,
    pub iterable: NodeIndex,
    pub body: NodeIndex,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JumpStatement {
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThrowStatement {
    pub expr: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TryStatement {
    pub block: NodeIndex,
    #[serde(default)]
    pub handler: NodeIndex,
    #[serde(default)]
    pub finalizer: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    #[serde(default)]
    pub param: Option<String>,
    pub body: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwitchStatement {
    pub discriminant: NodeIndex,
    pub cases: NodeList,
}

/// A `case test:` clause; `test` is `NONE` for `default:`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    #[serde(default)]
    pub test: NodeIndex,
    pub body: NodeList,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeReference {
    pub name: String,
    #[serde(default)]
    pub type_args: NodeList,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionTypeNode {
    #[serde(default)]
    pub type_params: NodeList,
    pub params: NodeList,
    pub return_type: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArrayTypeNode {
    pub element: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnionTypeNode {
    pub types: NodeList,
}

// =============================================================================
// NodeKind
// =============================================================================

/// Closed set of syntax node kinds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    // Expressions
    Literal(LiteralValue),
    Identifier(Identifier),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Update(UpdateExpr),
    Assignment(AssignmentExpr),
    Conditional(ConditionalExpr),
    Call(CallExpr),
    New(NewExpr),
    Member(MemberExpr),
    Index(IndexExpr),
    Arrow(ArrowFunction),
    ObjectLiteral(ObjectLiteral),
    ArrayLiteral(ArrayLiteral),
    Property(Property),
    Spread(SpreadElement),
    As(AsExpr),
    This,
    Super,
    Paren(ParenExpr),

    // Declarations
    Program(ProgramDecl),
    Import(ImportDecl),
    ImportSpecifier(ImportSpecifier),
    Class(ClassDecl),
    Interface(InterfaceDecl),
    Enum(EnumDecl),
    EnumMember(EnumMember),
    Function(FunctionDecl),
    Method(MethodDecl),
    Field(FieldDecl),
    Parameter(ParameterDecl),
    TypeParameter(TypeParameterDecl),
    Variable(VariableDecl),
    Annotation(AnnotationUsage),

    // Statements
    Block(Block),
    ExprStmt(ExprStatement),
    Return(ReturnStatement),
    If(IfStatement),
    While(WhileStatement),
    DoWhile(DoWhileStatement),
    For(ForStatement),
    ForOf(ForOfStatement),
    Break(JumpStatement),
    Continue(JumpStatement),
    Throw(ThrowStatement),
    Try(TryStatement),
    Catch(CatchClause),
    Switch(SwitchStatement),
    SwitchCase(SwitchCase),
    Empty,

    // Type annotations
    PrimitiveType(PrimitiveKind),
    TypeReference(TypeReference),
    FunctionType(FunctionTypeNode),
    ArrayType(ArrayTypeNode),
    UnionType(UnionTypeNode),
}

macro_rules! kind_accessors {
    ($($variant:ident => $payload:ty, $get:ident, $get_mut:ident;)*) => {
        impl NodeKind {
            $(
                #[inline]
                #[must_use]
                pub const fn $get(&self) -> Option<&$payload> {
                    match self {
                        NodeKind::$variant(data) => Some(data),
                        _ => None,
                    }
                }

                #[inline]
                pub fn $get_mut(&mut self) -> Option<&mut $payload> {
                    match self {
                        NodeKind::$variant(data) => Some(data),
                        _ => None,
                    }
                }
            )*
        }
    };
}

kind_accessors! {
    Literal => LiteralValue, as_literal, as_literal_mut;
    Identifier => Identifier, as_identifier, as_identifier_mut;
    Binary => BinaryExpr, as_binary, as_binary_mut;
    Unary => UnaryExpr, as_unary, as_unary_mut;
    Assignment => AssignmentExpr, as_assignment, as_assignment_mut;
    Conditional => ConditionalExpr, as_conditional, as_conditional_mut;
    Call => CallExpr, as_call, as_call_mut;
    New => NewExpr, as_new, as_new_mut;
    Member => MemberExpr, as_member, as_member_mut;
    Index => IndexExpr, as_index, as_index_mut;
    Arrow => ArrowFunction, as_arrow, as_arrow_mut;
    ObjectLiteral => ObjectLiteral, as_object_literal, as_object_literal_mut;
    Property => Property, as_property, as_property_mut;
    Paren => ParenExpr, as_paren, as_paren_mut;
    Program => ProgramDecl, as_program, as_program_mut;
    Import => ImportDecl, as_import, as_import_mut;
    ImportSpecifier => ImportSpecifier, as_import_specifier, as_import_specifier_mut;
    Class => ClassDecl, as_class, as_class_mut;
    Enum => EnumDecl, as_enum, as_enum_mut;
    EnumMember => EnumMember, as_enum_member, as_enum_member_mut;
    Function => FunctionDecl, as_function, as_function_mut;
    Method => MethodDecl, as_method, as_method_mut;
    Field => FieldDecl, as_field, as_field_mut;
    Parameter => ParameterDecl, as_parameter, as_parameter_mut;
    TypeParameter => TypeParameterDecl, as_type_parameter, as_type_parameter_mut;
    Variable => VariableDecl, as_variable, as_variable_mut;
    Annotation => AnnotationUsage, as_annotation, as_annotation_mut;
    Block => Block, as_block, as_block_mut;
    Switch => SwitchStatement, as_switch, as_switch_mut;
    SwitchCase => SwitchCase, as_switch_case, as_switch_case_mut;
    TypeReference => TypeReference, as_type_reference, as_type_reference_mut;
    FunctionType => FunctionTypeNode, as_function_type, as_function_type_mut;
}

impl NodeKind {
    /// Short kind name used in logs and dumps.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Literal(_) => "Literal",
            Self::Identifier(_) => "Identifier",
            Self::Binary(_) => "Binary",
            Self::Unary(_) => "Unary",
            Self::Update(_) => "Update",
            Self::Assignment(_) => "Assignment",
            Self::Conditional(_) => "Conditional",
            Self::Call(_) => "Call",
            Self::New(_) => "New",
            Self::Member(_) => "Member",
            Self::Index(_) => "Index",
            Self::Arrow(_) => "Arrow",
            Self::ObjectLiteral(_) => "ObjectLiteral",
            Self::ArrayLiteral(_) => "ArrayLiteral",
            Self::Property(_) => "Property",
            Self::Spread(_) => "Spread",
            Self::As(_) => "As",
            Self::This => "This",
            Self::Super => "Super",
            Self::Paren(_) => "Paren",
            Self::Program(_) => "Program",
            Self::Import(_) => "Import",
            Self::ImportSpecifier(_) => "ImportSpecifier",
            Self::Class(_) => "Class",
            Self::Interface(_) => "Interface",
            Self::Enum(_) => "Enum",
            Self::EnumMember(_) => "EnumMember",
            Self::Function(_) => "Function",
            Self::Method(_) => "Method",
            Self::Field(_) => "Field",
            Self::Parameter(_) => "Parameter",
            Self::TypeParameter(_) => "TypeParameter",
            Self::Variable(_) => "Variable",
            Self::Annotation(_) => "Annotation",
            Self::Block(_) => "Block",
            Self::ExprStmt(_) => "ExprStmt",
            Self::Return(_) => "Return",
            Self::If(_) => "If",
            Self::While(_) => "While",
            Self::DoWhile(_) => "DoWhile",
            Self::For(_) => "For",
            Self::ForOf(_) => "ForOf",
            Self::Break(_) => "Break",
            Self::Continue(_) => "Continue",
            Self::Throw(_) => "Throw",
            Self::Try(_) => "Try",
            Self::Catch(_) => "Catch",
            Self::Switch(_) => "Switch",
            Self::SwitchCase(_) => "SwitchCase",
            Self::Empty => "Empty",
            Self::PrimitiveType(_) => "PrimitiveType",
            Self::TypeReference(_) => "TypeReference",
            Self::FunctionType(_) => "FunctionType",
            Self::ArrayType(_) => "ArrayType",
            Self::UnionType(_) => "UnionType",
        }
    }

    /// Value-producing expression kinds (the nodes the checker must type).
    #[must_use]
    pub const fn is_expression(&self) -> bool {
        matches!(
            self,
            Self::Literal(_)
                | Self::Identifier(_)
                | Self::Binary(_)
                | Self::Unary(_)
                | Self::Update(_)
                | Self::Assignment(_)
                | Self::Conditional(_)
                | Self::Call(_)
                | Self::New(_)
                | Self::Member(_)
                | Self::Index(_)
                | Self::Arrow(_)
                | Self::ObjectLiteral(_)
                | Self::ArrayLiteral(_)
                | Self::As(_)
                | Self::This
                | Self::Super
                | Self::Paren(_)
        )
    }

    #[must_use]
    pub const fn is_type_node(&self) -> bool {
        matches!(
            self,
            Self::PrimitiveType(_)
                | Self::TypeReference(_)
                | Self::FunctionType(_)
                | Self::ArrayType(_)
                | Self::UnionType(_)
        )
    }

    /// Function-like nodes that own a parameter list.
    #[must_use]
    pub const fn is_function_like(&self) -> bool {
        matches!(self, Self::Function(_) | Self::Method(_) | Self::Arrow(_))
    }

    /// Declared name for named declarations.
    #[must_use]
    pub fn decl_name(&self) -> Option<&str> {
        match self {
            Self::Class(d) => Some(&d.name),
            Self::Interface(d) => Some(&d.name),
            Self::Enum(d) => Some(&d.name),
            Self::EnumMember(d) => Some(&d.name),
            Self::Function(d) => Some(&d.name),
            Self::Method(d) => Some(&d.name),
            Self::Field(d) => Some(&d.name),
            Self::Parameter(d) => Some(&d.name),
            Self::TypeParameter(d) => Some(&d.name),
            Self::Variable(d) => Some(&d.name),
            Self::ImportSpecifier(d) => Some(&d.local),
            _ => None,
        }
    }

    #[must_use]
    pub const fn modifiers(&self) -> Modifiers {
        match self {
            Self::Class(d) => d.modifiers,
            Self::Interface(d) => d.modifiers,
            Self::Enum(d) => d.modifiers,
            Self::Function(d) => d.modifiers,
            Self::Method(d) => d.modifiers,
            Self::Field(d) => d.modifiers,
            Self::Variable(d) => d.modifiers,
            _ => Modifiers::empty(),
        }
    }
}

/// A syntax node: kind payload, source span and pass flags.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    #[serde(default)]
    pub span: Span,
    #[serde(default)]
    pub flags: NodeFlags,
}

impl Node {
    #[must_use]
    pub const fn new(kind: NodeKind, span: Span) -> Node {
        Node {
            kind,
            span,
            flags: NodeFlags::empty(),
        }
    }

    #[must_use]
    pub const fn with_flags(mut self, flags: NodeFlags) -> Node {
        self.flags = flags;
        self
    }

    #[inline]
    #[must_use]
    pub const fn is_synthetic(&self) -> bool {
        self.flags.contains(NodeFlags::SYNTHETIC)
    }
}
