//! Statements. Every statement has type `void`; checking one types its
//! expressions and validates `return` values against the enclosing body.

use crate::checker::Checker;
use crate::types::TypeId;
use etsl_ast::{NodeIndex, NodeKind};
use etsl_common::diagnostic_codes;

impl<'a> Checker<'a> {
    pub(crate) fn check_statement(&mut self, node: NodeIndex) -> TypeId {
        let arena = self.arena;
        let Some(kind) = arena.kind(node) else {
            return TypeId::ERROR;
        };
        match kind {
            NodeKind::Return(ret) => self.check_return(node, ret.expr),
            NodeKind::If(stmt) => {
                self.check_condition(stmt.test);
                self.check(stmt.consequent);
                if stmt.alternate.is_some() {
                    self.check(stmt.alternate);
                }
            }
            NodeKind::While(stmt) => {
                self.check_condition(stmt.test);
                self.check(stmt.body);
            }
            NodeKind::DoWhile(stmt) => {
                self.check(stmt.body);
                self.check_condition(stmt.test);
            }
            NodeKind::For(stmt) => {
                if stmt.init.is_some() {
                    self.check(stmt.init);
                }
                if stmt.test.is_some() {
                    self.check_condition(stmt.test);
                }
                if stmt.update.is_some() {
                    self.check(stmt.update);
                }
                self.check(stmt.body);
            }
            NodeKind::ForOf(stmt) => {
                let iterable = self.check(stmt.iterable);
                if !iterable.is_error() && self.element_type(iterable).is_error() {
                    let text = self.format(iterable);
                    self.report(
                        stmt.iterable,
                        diagnostic_codes::TYPE_NOT_ASSIGNABLE,
                        &[&text, "Object[]"],
                    );
                }
                self.check(stmt.decl);
                self.check(stmt.body);
            }
            NodeKind::Switch(stmt) => {
                let discriminant = self.check(stmt.discriminant);
                for &case in &stmt.cases {
                    let Some(NodeKind::SwitchCase(clause)) = arena.kind(case) else {
                        continue;
                    };
                    if clause.test.is_some() {
                        let test = self.check_with_expected(clause.test, discriminant);
                        if !discriminant.is_error() && !test.is_error() {
                            self.check_assignable(clause.test, test, discriminant);
                        }
                    }
                    for &stmt in &clause.body {
                        self.check(stmt);
                    }
                    self.types.set(case, TypeId::VOID);
                }
            }
            NodeKind::Catch(clause) => {
                // The catch parameter is typed through its binding.
                self.declared_type(node);
                self.check(clause.body);
            }
            NodeKind::Program(_)
            | NodeKind::Import(_)
            | NodeKind::Annotation(_)
            | NodeKind::Block(_)
            | NodeKind::ExprStmt(_)
            | NodeKind::Throw(_)
            | NodeKind::Try(_)
            | NodeKind::SwitchCase(_) => self.check_children(node),
            _ => {}
        }
        TypeId::VOID
    }

    fn check_return(&mut self, node: NodeIndex, expr: NodeIndex) {
        let expected = self.returns.last().and_then(|context| context.expected);
        let ty = if expr.is_none() {
            TypeId::VOID
        } else {
            match expected {
                Some(expected) if expected != TypeId::VOID => {
                    self.check_expression_against(expr, expected)
                }
                _ => self.check(expr),
            }
        };
        if expr.is_none()
            && let Some(expected) = expected
            && expected != TypeId::VOID
            && !expected.is_error()
        {
            self.check_assignable(node, TypeId::VOID, expected);
        }
        if let Some(context) = self.returns.last_mut() {
            context.collected.push(ty);
        }
    }
}
