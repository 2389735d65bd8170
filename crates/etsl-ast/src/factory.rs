//! Node factory used by lowering passes to synthesize subtrees.
//!
//! Every node created through a factory gets the factory's span (normally the
//! span of the construct being replaced, or a zero-width span at the start of
//! the originating declaration) and its flags (`SYNTHETIC` by default).

use crate::base::{NodeIndex, NodeList};
use crate::node::*;
use crate::node_arena::NodeArena;
use etsl_common::Span;
use smallvec::smallvec;

pub struct NodeFactory<'a> {
    arena: &'a mut NodeArena,
    span: Span,
    flags: NodeFlags,
}

impl<'a> NodeFactory<'a> {
    pub fn new(arena: &'a mut NodeArena, span: Span) -> Self {
        NodeFactory {
            arena,
            span,
            flags: NodeFlags::SYNTHETIC,
        }
    }

    /// Factory whose nodes carry no flags (used for parser-equivalent input).
    pub fn plain(arena: &'a mut NodeArena, span: Span) -> Self {
        NodeFactory {
            arena,
            span,
            flags: NodeFlags::empty(),
        }
    }

    #[must_use]
    pub const fn span(&self) -> Span {
        self.span
    }

    pub fn set_span(&mut self, span: Span) {
        self.span = span;
    }

    pub fn arena(&mut self) -> &mut NodeArena {
        self.arena
    }

    pub fn node(&mut self, kind: NodeKind) -> NodeIndex {
        self.arena
            .add(Node::new(kind, self.span).with_flags(self.flags))
    }

    pub fn node_with_flags(&mut self, kind: NodeKind, flags: NodeFlags) -> NodeIndex {
        self.arena
            .add(Node::new(kind, self.span).with_flags(self.flags | flags))
    }

    // ---------------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------------

    pub fn ident(&mut self, name: impl Into<String>) -> NodeIndex {
        self.node(NodeKind::Identifier(Identifier { name: name.into() }))
    }

    pub fn literal(&mut self, value: LiteralValue) -> NodeIndex {
        self.node(NodeKind::Literal(value))
    }

    pub fn int(&mut self, value: i32) -> NodeIndex {
        self.literal(LiteralValue::Int(value))
    }

    pub fn string(&mut self, value: impl Into<String>) -> NodeIndex {
        self.literal(LiteralValue::String(value.into()))
    }

    pub fn boolean(&mut self, value: bool) -> NodeIndex {
        self.literal(LiteralValue::Boolean(value))
    }

    pub fn undefined(&mut self) -> NodeIndex {
        self.literal(LiteralValue::Undefined)
    }

    pub fn this(&mut self) -> NodeIndex {
        self.node(NodeKind::This)
    }

    pub fn super_(&mut self) -> NodeIndex {
        self.node(NodeKind::Super)
    }

    pub fn binary(&mut self, op: BinaryOp, left: NodeIndex, right: NodeIndex) -> NodeIndex {
        self.node(NodeKind::Binary(BinaryExpr { op, left, right }))
    }

    pub fn unary(&mut self, op: UnaryOp, operand: NodeIndex) -> NodeIndex {
        self.node(NodeKind::Unary(UnaryExpr { op, operand }))
    }

    pub fn update(&mut self, op: UpdateOp, prefix: bool, operand: NodeIndex) -> NodeIndex {
        self.node(NodeKind::Update(UpdateExpr {
            op,
            prefix,
            operand,
        }))
    }

    pub fn assign(&mut self, target: NodeIndex, value: NodeIndex) -> NodeIndex {
        self.node(NodeKind::Assignment(AssignmentExpr {
            op: AssignOp::Assign,
            target,
            value,
        }))
    }

    pub fn member(&mut self, object: NodeIndex, property: impl Into<String>) -> NodeIndex {
        self.node(NodeKind::Member(MemberExpr {
            object,
            property: property.into(),
        }))
    }

    /// `Name.property` where `Name` is a fresh identifier.
    pub fn static_member(&mut self, object: &str, property: impl Into<String>) -> NodeIndex {
        let object = self.ident(object);
        self.member(object, property)
    }

    /// `this.property`
    pub fn this_member(&mut self, property: impl Into<String>) -> NodeIndex {
        let this = self.this();
        self.member(this, property)
    }

    pub fn index(&mut self, object: NodeIndex, index: NodeIndex) -> NodeIndex {
        self.node(NodeKind::Index(IndexExpr { object, index }))
    }

    pub fn call(&mut self, callee: NodeIndex, args: NodeList) -> NodeIndex {
        self.node(NodeKind::Call(CallExpr {
            callee,
            type_args: NodeList::new(),
            args,
        }))
    }

    /// `object.method(args)`
    pub fn call_method(
        &mut self,
        object: NodeIndex,
        method: impl Into<String>,
        args: NodeList,
    ) -> NodeIndex {
        let callee = self.member(object, method);
        self.call(callee, args)
    }

    /// `new Name<type_args>(args)`
    pub fn new_instance(
        &mut self,
        class_name: impl Into<String>,
        type_args: NodeList,
        args: NodeList,
    ) -> NodeIndex {
        let type_ref = self.type_ref(class_name, type_args);
        self.node(NodeKind::New(NewExpr { type_ref, args }))
    }

    pub fn array(&mut self, elements: NodeList) -> NodeIndex {
        self.node(NodeKind::ArrayLiteral(ArrayLiteral { elements }))
    }

    pub fn as_cast(&mut self, expr: NodeIndex, type_annotation: NodeIndex) -> NodeIndex {
        self.node(NodeKind::As(AsExpr {
            expr,
            type_annotation,
        }))
    }

    pub fn spread(&mut self, expr: NodeIndex) -> NodeIndex {
        self.node(NodeKind::Spread(SpreadElement { expr }))
    }

    // ---------------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------------

    pub fn block(&mut self, statements: NodeList) -> NodeIndex {
        self.node(NodeKind::Block(Block { statements }))
    }

    pub fn expr_stmt(&mut self, expr: NodeIndex) -> NodeIndex {
        self.node(NodeKind::ExprStmt(ExprStatement { expr }))
    }

    pub fn ret(&mut self, expr: NodeIndex) -> NodeIndex {
        self.node(NodeKind::Return(ReturnStatement { expr }))
    }

    pub fn if_(&mut self, test: NodeIndex, consequent: NodeIndex, alternate: NodeIndex) -> NodeIndex {
        self.node(NodeKind::If(IfStatement {
            test,
            consequent,
            alternate,
        }))
    }

    pub fn throw(&mut self, expr: NodeIndex) -> NodeIndex {
        self.node(NodeKind::Throw(ThrowStatement { expr }))
    }

    /// `throw new Error(message)`
    pub fn throw_error(&mut self, message: NodeIndex) -> NodeIndex {
        let error = self.new_instance("Error", NodeList::new(), smallvec![message]);
        self.throw(error)
    }

    pub fn for_(
        &mut self,
        init: NodeIndex,
        test: NodeIndex,
        update: NodeIndex,
        body: NodeIndex,
    ) -> NodeIndex {
        self.node(NodeKind::For(ForStatement {
            init,
            test,
            update,
            body,
        }))
    }

    pub fn var(
        &mut self,
        kind: VarKind,
        name: impl Into<String>,
        type_annotation: NodeIndex,
        init: NodeIndex,
    ) -> NodeIndex {
        self.node(NodeKind::Variable(VariableDecl {
            kind,
            modifiers: Modifiers::empty(),
            name: name.into(),
            type_annotation,
            init,
        }))
    }

    // ---------------------------------------------------------------------
    // Types
    // ---------------------------------------------------------------------

    pub fn primitive(&mut self, kind: PrimitiveKind) -> NodeIndex {
        self.node(NodeKind::PrimitiveType(kind))
    }

    pub fn type_ref(&mut self, name: impl Into<String>, type_args: NodeList) -> NodeIndex {
        self.node(NodeKind::TypeReference(TypeReference {
            name: name.into(),
            type_args,
        }))
    }

    pub fn array_type(&mut self, element: NodeIndex) -> NodeIndex {
        self.node(NodeKind::ArrayType(ArrayTypeNode { element }))
    }

    pub fn union_type(&mut self, types: NodeList) -> NodeIndex {
        self.node(NodeKind::UnionType(UnionTypeNode { types }))
    }

    pub fn function_type(&mut self, params: NodeList, return_type: NodeIndex) -> NodeIndex {
        self.node(NodeKind::FunctionType(FunctionTypeNode {
            type_params: NodeList::new(),
            params,
            return_type,
        }))
    }

    // ---------------------------------------------------------------------
    // Declarations
    // ---------------------------------------------------------------------

    pub fn param(&mut self, name: impl Into<String>, type_annotation: NodeIndex) -> NodeIndex {
        self.node(NodeKind::Parameter(ParameterDecl {
            name: name.into(),
            type_annotation,
            init: NodeIndex::NONE,
            optional: false,
            rest: false,
        }))
    }

    pub fn rest_param(&mut self, name: impl Into<String>, type_annotation: NodeIndex) -> NodeIndex {
        self.node(NodeKind::Parameter(ParameterDecl {
            name: name.into(),
            type_annotation,
            init: NodeIndex::NONE,
            optional: false,
            rest: true,
        }))
    }

    pub fn type_param(
        &mut self,
        name: impl Into<String>,
        constraint: NodeIndex,
        default: NodeIndex,
    ) -> NodeIndex {
        self.node(NodeKind::TypeParameter(TypeParameterDecl {
            name: name.into(),
            constraint,
            default,
        }))
    }

    pub fn field(
        &mut self,
        modifiers: Modifiers,
        name: impl Into<String>,
        type_annotation: NodeIndex,
        init: NodeIndex,
    ) -> NodeIndex {
        self.node(NodeKind::Field(FieldDecl {
            modifiers,
            name: name.into(),
            type_annotation,
            init,
            annotations: NodeList::new(),
        }))
    }

    pub fn method(&mut self, decl: MethodDecl) -> NodeIndex {
        self.node(NodeKind::Method(decl))
    }

    /// Method without type parameters or annotations.
    pub fn simple_method(
        &mut self,
        modifiers: Modifiers,
        name: impl Into<String>,
        params: NodeList,
        return_type: NodeIndex,
        body: NodeIndex,
    ) -> NodeIndex {
        self.method(MethodDecl {
            modifiers,
            kind: MethodKind::Method,
            name: name.into(),
            type_params: NodeList::new(),
            params,
            return_type,
            body,
            annotations: NodeList::new(),
        })
    }

    pub fn constructor(&mut self, modifiers: Modifiers, params: NodeList, body: NodeIndex) -> NodeIndex {
        self.method(MethodDecl {
            modifiers,
            kind: MethodKind::Constructor,
            name: "constructor".to_string(),
            type_params: NodeList::new(),
            params,
            return_type: NodeIndex::NONE,
            body,
            annotations: NodeList::new(),
        })
    }

    pub fn class(&mut self, decl: ClassDecl, flags: NodeFlags) -> NodeIndex {
        self.node_with_flags(NodeKind::Class(decl), flags)
    }
}
