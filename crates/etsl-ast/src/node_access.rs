//! Child enumeration for syntax nodes.
//!
//! Children are listed in source order. Both the read-only and the mutable
//! views are generated from the same slot table so that traversal order and
//! slot rewriting can never disagree.

use crate::base::NodeIndex;
use crate::node::NodeKind;
use smallvec::SmallVec;

/// Child list returned by `NodeKind::children`.
pub type ChildList = SmallVec<[NodeIndex; 8]>;

macro_rules! push_ref {
    ($out:ident, $slot:expr) => {
        $out.push(&$slot)
    };
}

macro_rules! extend_ref {
    ($out:ident, $list:expr) => {
        $out.extend($list.iter())
    };
}

macro_rules! push_mut {
    ($out:ident, $slot:expr) => {
        $out.push(&mut $slot)
    };
}

macro_rules! extend_mut {
    ($out:ident, $list:expr) => {
        $out.extend($list.iter_mut())
    };
}

macro_rules! collect_slots {
    ($kind:expr, $one:ident, $many:ident) => {{
        let mut out = SmallVec::new();
        match $kind {
            NodeKind::Literal(_)
            | NodeKind::Identifier(_)
            | NodeKind::This
            | NodeKind::Super
            | NodeKind::ImportSpecifier(_)
            | NodeKind::Break(_)
            | NodeKind::Continue(_)
            | NodeKind::Empty
            | NodeKind::PrimitiveType(_) => {}
            NodeKind::Binary(n) => {
                $one!(out, n.left);
                $one!(out, n.right);
            }
            NodeKind::Unary(n) => $one!(out, n.operand),
            NodeKind::Update(n) => $one!(out, n.operand),
            NodeKind::Assignment(n) => {
                $one!(out, n.target);
                $one!(out, n.value);
            }
            NodeKind::Conditional(n) => {
                $one!(out, n.test);
                $one!(out, n.consequent);
                $one!(out, n.alternate);
            }
            NodeKind::Call(n) => {
                $one!(out, n.callee);
                $many!(out, n.type_args);
                $many!(out, n.args);
            }
            NodeKind::New(n) => {
                $one!(out, n.type_ref);
                $many!(out, n.args);
            }
            NodeKind::Member(n) => $one!(out, n.object),
            NodeKind::Index(n) => {
                $one!(out, n.object);
                $one!(out, n.index);
            }
            NodeKind::Arrow(n) => {
                $many!(out, n.type_params);
                $many!(out, n.params);
                $one!(out, n.return_type);
                $one!(out, n.body);
            }
            NodeKind::ObjectLiteral(n) => $many!(out, n.properties),
            NodeKind::ArrayLiteral(n) => $many!(out, n.elements),
            NodeKind::Property(n) => $one!(out, n.value),
            NodeKind::Spread(n) => $one!(out, n.expr),
            NodeKind::As(n) => {
                $one!(out, n.expr);
                $one!(out, n.type_annotation);
            }
            NodeKind::Paren(n) => $one!(out, n.expr),
            NodeKind::Program(n) => $many!(out, n.statements),
            NodeKind::Import(n) => $many!(out, n.specifiers),
            NodeKind::Class(n) => {
                $many!(out, n.annotations);
                $many!(out, n.type_params);
                $one!(out, n.extends);
                $many!(out, n.implements);
                $many!(out, n.members);
            }
            NodeKind::Interface(n) => {
                $many!(out, n.type_params);
                $many!(out, n.extends);
                $many!(out, n.members);
            }
            NodeKind::Enum(n) => $many!(out, n.members),
            NodeKind::EnumMember(n) => $one!(out, n.init),
            NodeKind::Function(n) => {
                $many!(out, n.annotations);
                $many!(out, n.type_params);
                $many!(out, n.params);
                $one!(out, n.return_type);
                $one!(out, n.body);
            }
            NodeKind::Method(n) => {
                $many!(out, n.annotations);
                $many!(out, n.type_params);
                $many!(out, n.params);
                $one!(out, n.return_type);
                $one!(out, n.body);
            }
            NodeKind::Field(n) => {
                $many!(out, n.annotations);
                $one!(out, n.type_annotation);
                $one!(out, n.init);
            }
            NodeKind::Parameter(n) => {
                $one!(out, n.type_annotation);
                $one!(out, n.init);
            }
            NodeKind::TypeParameter(n) => {
                $one!(out, n.constraint);
                $one!(out, n.default);
            }
            NodeKind::Variable(n) => {
                $one!(out, n.type_annotation);
                $one!(out, n.init);
            }
            NodeKind::Annotation(n) => $many!(out, n.properties),
            NodeKind::Block(n) => $many!(out, n.statements),
            NodeKind::ExprStmt(n) => $one!(out, n.expr),
            NodeKind::Return(n) => $one!(out, n.expr),
            NodeKind::If(n) => {
                $one!(out, n.test);
                $one!(out, n.consequent);
                $one!(out, n.alternate);
            }
            NodeKind::While(n) => {
                $one!(out, n.test);
                $one!(out, n.body);
            }
            NodeKind::DoWhile(n) => {
                $one!(out, n.body);
                $one!(out, n.test);
            }
            NodeKind::For(n) => {
                $one!(out, n.init);
                $one!(out, n.test);
                $one!(out, n.update);
                $one!(out, n.body);
            }
            NodeKind::ForOf(n) => {
                $one!(out, n.decl);
                $one!(out, n.iterable);
                $one!(out, n.body);
            }
            NodeKind::Throw(n) => $one!(out, n.expr),
            NodeKind::Try(n) => {
                $one!(out, n.block);
                $one!(out, n.handler);
                $one!(out, n.finalizer);
            }
            NodeKind::Catch(n) => $one!(out, n.body),
            NodeKind::Switch(n) => {
                $one!(out, n.discriminant);
                $many!(out, n.cases);
            }
            NodeKind::SwitchCase(n) => {
                $one!(out, n.test);
                $many!(out, n.body);
            }
            NodeKind::TypeReference(n) => $many!(out, n.type_args),
            NodeKind::FunctionType(n) => {
                $many!(out, n.type_params);
                $many!(out, n.params);
                $one!(out, n.return_type);
            }
            NodeKind::ArrayType(n) => $one!(out, n.element),
            NodeKind::UnionType(n) => $many!(out, n.types),
        }
        out
    }};
}

impl NodeKind {
    /// Present children in source order (absent optional slots are skipped).
    #[must_use]
    pub fn children(&self) -> ChildList {
        let slots: SmallVec<[&NodeIndex; 8]> = collect_slots!(self, push_ref, extend_ref);
        slots
            .into_iter()
            .copied()
            .filter(|child| child.is_some())
            .collect()
    }

    /// Mutable references to every present child slot, in source order.
    pub fn child_slots_mut(&mut self) -> SmallVec<[&mut NodeIndex; 8]> {
        let mut slots: SmallVec<[&mut NodeIndex; 8]> = collect_slots!(self, push_mut, extend_mut);
        slots.retain(|slot| slot.is_some());
        slots
    }

    /// The growable statement or member list of container nodes.
    pub fn body_list_mut(&mut self) -> Option<&mut crate::base::NodeList> {
        match self {
            NodeKind::Program(n) => Some(&mut n.statements),
            NodeKind::Block(n) => Some(&mut n.statements),
            NodeKind::Class(n) => Some(&mut n.members),
            NodeKind::Interface(n) => Some(&mut n.members),
            _ => None,
        }
    }
}
