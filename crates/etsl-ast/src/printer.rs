//! Source-like printer for syntax trees.
//!
//! Used for `--print`/`--dump-after` output, test assertions and history
//! dumps. An optional node mapper substitutes each child before it is printed;
//! the history view uses it to print a subtree as it was at an earlier phase.

use crate::base::{NodeIndex, NodeList};
use crate::node::*;
use crate::node_arena::NodeArena;
use etsl_common::limits::MAX_AST_DEPTH;

/// Maps `(parent, child)` to the node to print in the child's place (`None`
/// hides it). `parent` is the node being printed, `NONE` for the top node.
pub type NodeMapper<'a> = dyn Fn(NodeIndex, NodeIndex) -> Option<NodeIndex> + 'a;

pub struct Printer<'a> {
    arena: &'a NodeArena,
    mapper: Option<&'a NodeMapper<'a>>,
    current: NodeIndex,
    out: String,
    indent: usize,
    depth: u32,
}

/// Print the subtree rooted at `node`.
#[must_use]
pub fn print_node(arena: &NodeArena, node: NodeIndex) -> String {
    Printer::new(arena).print(node)
}

impl<'a> Printer<'a> {
    #[must_use]
    pub fn new(arena: &'a NodeArena) -> Self {
        Printer {
            arena,
            mapper: None,
            current: NodeIndex::NONE,
            out: String::new(),
            indent: 0,
            depth: 0,
        }
    }

    #[must_use]
    pub fn with_mapper(arena: &'a NodeArena, mapper: &'a NodeMapper<'a>) -> Self {
        Printer {
            mapper: Some(mapper),
            ..Printer::new(arena)
        }
    }

    /// Print `node` (itself subject to the mapper) and return the text.
    #[must_use]
    pub fn print(mut self, node: NodeIndex) -> String {
        if let Some(node) = self.resolve(node) {
            self.emit(node);
        }
        self.out
    }

    fn resolve(&self, node: NodeIndex) -> Option<NodeIndex> {
        if node.is_none() {
            return None;
        }
        match self.mapper {
            Some(mapper) => mapper(self.current, node),
            None => Some(node),
        }
    }

    fn resolve_list(&self, list: &NodeList) -> Vec<NodeIndex> {
        list.iter().filter_map(|&n| self.resolve(n)).collect()
    }

    fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    /// Emit an optional child; returns whether anything was printed.
    fn emit_child(&mut self, node: NodeIndex) -> bool {
        match self.resolve(node) {
            Some(node) => {
                self.emit(node);
                true
            }
            None => false,
        }
    }

    fn emit_comma_list(&mut self, list: &NodeList) {
        let items = self.resolve_list(list);
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.emit(item);
        }
    }

    fn emit_type_params(&mut self, list: &NodeList) {
        if self.resolve_list(list).is_empty() {
            return;
        }
        self.write("<");
        self.emit_comma_list(list);
        self.write(">");
    }

    fn emit_type_annotation(&mut self, node: NodeIndex) {
        if self.resolve(node).is_some() {
            self.write(": ");
            self.emit_child(node);
        }
    }

    fn emit_modifiers(&mut self, modifiers: Modifiers) {
        for kw in modifiers.keywords() {
            self.write(kw);
            self.write(" ");
        }
    }

    fn emit_annotations(&mut self, list: &NodeList) {
        for annotation in self.resolve_list(list) {
            self.emit(annotation);
            self.newline();
        }
    }

    fn emit_statements(&mut self, list: &NodeList) {
        for stmt in self.resolve_list(list) {
            self.newline();
            self.emit(stmt);
        }
    }

    fn emit_body_block(&mut self, list: &NodeList) {
        self.write("{");
        self.indent += 1;
        self.emit_statements(list);
        self.indent -= 1;
        if !self.resolve_list(list).is_empty() {
            self.newline();
        }
        self.write("}");
    }

    fn precedence(&self, node: NodeIndex) -> u8 {
        match self.arena.kind(node) {
            Some(NodeKind::Assignment(_) | NodeKind::Arrow(_)) => 0,
            Some(NodeKind::Conditional(_)) => 1,
            Some(NodeKind::Binary(b)) => b.op.precedence() + 1,
            Some(NodeKind::As(_)) => 13,
            Some(NodeKind::Unary(_) | NodeKind::Update(_)) => 14,
            _ => 20,
        }
    }

    /// Emit an operand, parenthesized when it binds looser than `min`.
    fn emit_operand(&mut self, node: NodeIndex, min: u8) {
        let Some(node) = self.resolve(node) else {
            return;
        };
        if self.precedence(node) < min {
            self.write("(");
            self.emit(node);
            self.write(")");
        } else {
            self.emit(node);
        }
    }

    fn emit_params(&mut self, params: &NodeList) {
        self.write("(");
        self.emit_comma_list(params);
        self.write(")");
    }

    fn emit_variable(&mut self, decl: &VariableDecl) {
        self.emit_modifiers(decl.modifiers);
        self.write(decl.kind.as_str());
        self.write(" ");
        self.write(&decl.name);
        self.emit_type_annotation(decl.type_annotation);
        if self.resolve(decl.init).is_some() {
            self.write(" = ");
            self.emit_child(decl.init);
        }
    }

    fn emit_property_key(&mut self, key: &PropertyKey) {
        match key {
            PropertyKey::Name(name) => self.write(name),
            PropertyKey::Literal(value) => self.write(&value.to_string()),
        }
    }

    fn emit_function_like(
        &mut self,
        name: &str,
        type_params: &NodeList,
        params: &NodeList,
        return_type: NodeIndex,
        body: NodeIndex,
    ) {
        self.write(name);
        self.emit_type_params(type_params);
        self.emit_params(params);
        self.emit_type_annotation(return_type);
        if self.resolve(body).is_some() {
            self.write(" ");
            self.emit_child(body);
        } else {
            self.write(";");
        }
    }

    fn emit(&mut self, node: NodeIndex) {
        let arena = self.arena;
        let Some(n) = arena.get(node) else {
            return;
        };
        if self.depth > MAX_AST_DEPTH {
            self.write("...");
            return;
        }
        self.depth += 1;
        let parent = std::mem::replace(&mut self.current, node);
        match &n.kind {
            NodeKind::Literal(value) => self.write(&value.to_string()),
            NodeKind::Identifier(ident) => self.write(&ident.name),
            NodeKind::Binary(b) => {
                let prec = b.op.precedence() + 1;
                self.emit_operand(b.left, prec);
                self.write(" ");
                self.write(b.op.as_str());
                self.write(" ");
                self.emit_operand(b.right, prec + 1);
            }
            NodeKind::Unary(u) => {
                self.write(u.op.as_str());
                self.emit_operand(u.operand, 14);
            }
            NodeKind::Update(u) => {
                if u.prefix {
                    self.write(u.op.as_str());
                    self.emit_operand(u.operand, 15);
                } else {
                    self.emit_operand(u.operand, 15);
                    self.write(u.op.as_str());
                }
            }
            NodeKind::Assignment(a) => {
                self.emit_operand(a.target, 1);
                self.write(" ");
                self.write(a.op.as_str());
                self.write(" ");
                self.emit_operand(a.value, 0);
            }
            NodeKind::Conditional(c) => {
                self.emit_operand(c.test, 2);
                self.write(" ? ");
                self.emit_operand(c.consequent, 1);
                self.write(" : ");
                self.emit_operand(c.alternate, 1);
            }
            NodeKind::Call(c) => {
                self.emit_operand(c.callee, 15);
                if !c.type_args.is_empty() {
                    self.emit_type_params(&c.type_args);
                }
                self.emit_params(&c.args);
            }
            NodeKind::New(n) => {
                self.write("new ");
                self.emit_child(n.type_ref);
                self.emit_params(&n.args);
            }
            NodeKind::Member(m) => {
                self.emit_operand(m.object, 15);
                self.write(".");
                self.write(&m.property);
            }
            NodeKind::Index(i) => {
                self.emit_operand(i.object, 15);
                self.write("[");
                self.emit_child(i.index);
                self.write("]");
            }
            NodeKind::Arrow(a) => {
                self.emit_type_params(&a.type_params);
                self.emit_params(&a.params);
                self.emit_type_annotation(a.return_type);
                self.write(" => ");
                self.emit_operand(a.body, 1);
            }
            NodeKind::ObjectLiteral(o) => {
                self.write("{");
                self.emit_comma_list(&o.properties);
                self.write("}");
            }
            NodeKind::ArrayLiteral(a) => {
                self.write("[");
                self.emit_comma_list(&a.elements);
                self.write("]");
            }
            NodeKind::Property(p) => {
                self.emit_property_key(&p.key);
                let in_annotation = matches!(
                    arena.kind(arena.parent(node)),
                    Some(NodeKind::Annotation(_))
                );
                self.write(if in_annotation { " = " } else { ": " });
                self.emit_child(p.value);
            }
            NodeKind::Spread(s) => {
                self.write("...");
                self.emit_operand(s.expr, 14);
            }
            NodeKind::As(a) => {
                self.emit_operand(a.expr, 13);
                self.write(" as ");
                self.emit_child(a.type_annotation);
            }
            NodeKind::This => self.write("this"),
            NodeKind::Super => self.write("super"),
            NodeKind::Paren(p) => {
                self.write("(");
                self.emit_child(p.expr);
                self.write(")");
            }
            NodeKind::Program(p) => {
                for (i, stmt) in self.resolve_list(&p.statements).into_iter().enumerate() {
                    if i > 0 {
                        self.newline();
                    }
                    self.emit(stmt);
                }
            }
            NodeKind::Import(i) => {
                self.write("import { ");
                self.emit_comma_list(&i.specifiers);
                self.write(" } from \"");
                self.write(&i.source);
                self.write("\";");
            }
            NodeKind::ImportSpecifier(s) => {
                self.write(&s.imported);
                if s.local != s.imported {
                    self.write(" as ");
                    self.write(&s.local);
                }
            }
            NodeKind::Class(c) => {
                self.emit_annotations(&c.annotations);
                self.emit_modifiers(c.modifiers);
                self.write("class ");
                self.write(&c.name);
                self.emit_type_params(&c.type_params);
                if self.resolve(c.extends).is_some() {
                    self.write(" extends ");
                    self.emit_child(c.extends);
                }
                if !self.resolve_list(&c.implements).is_empty() {
                    self.write(" implements ");
                    self.emit_comma_list(&c.implements);
                }
                self.write(" ");
                self.emit_body_block(&c.members);
            }
            NodeKind::Interface(i) => {
                self.emit_modifiers(i.modifiers);
                self.write("interface ");
                self.write(&i.name);
                self.emit_type_params(&i.type_params);
                if !self.resolve_list(&i.extends).is_empty() {
                    self.write(" extends ");
                    self.emit_comma_list(&i.extends);
                }
                self.write(" ");
                self.emit_body_block(&i.members);
            }
            NodeKind::Enum(e) => {
                self.emit_modifiers(e.modifiers);
                self.write("enum ");
                self.write(&e.name);
                self.write(" {");
                self.indent += 1;
                let members = self.resolve_list(&e.members);
                let count = members.len();
                for (i, member) in members.into_iter().enumerate() {
                    self.newline();
                    self.emit(member);
                    if i + 1 < count {
                        self.write(",");
                    }
                }
                self.indent -= 1;
                if count > 0 {
                    self.newline();
                }
                self.write("}");
            }
            NodeKind::EnumMember(m) => {
                self.write(&m.name);
                if self.resolve(m.init).is_some() {
                    self.write(" = ");
                    self.emit_child(m.init);
                }
            }
            NodeKind::Function(f) => {
                self.emit_annotations(&f.annotations);
                self.emit_modifiers(f.modifiers);
                self.write("function ");
                self.emit_function_like(&f.name, &f.type_params, &f.params, f.return_type, f.body);
            }
            NodeKind::Method(m) => {
                self.emit_annotations(&m.annotations);
                self.emit_modifiers(m.modifiers);
                let name = match m.kind {
                    MethodKind::Constructor => "constructor",
                    MethodKind::Method => m.name.as_str(),
                };
                self.emit_function_like(name, &m.type_params, &m.params, m.return_type, m.body);
            }
            NodeKind::Field(f) => {
                self.emit_annotations(&f.annotations);
                self.emit_modifiers(f.modifiers);
                self.write(&f.name);
                self.emit_type_annotation(f.type_annotation);
                if self.resolve(f.init).is_some() {
                    self.write(" = ");
                    self.emit_child(f.init);
                }
                self.write(";");
            }
            NodeKind::Parameter(p) => {
                if p.rest {
                    self.write("...");
                }
                self.write(&p.name);
                if p.optional {
                    self.write("?");
                }
                self.emit_type_annotation(p.type_annotation);
                if self.resolve(p.init).is_some() {
                    self.write(" = ");
                    self.emit_child(p.init);
                }
            }
            NodeKind::TypeParameter(t) => {
                self.write(&t.name);
                if self.resolve(t.constraint).is_some() {
                    self.write(" extends ");
                    self.emit_child(t.constraint);
                }
                if self.resolve(t.default).is_some() {
                    self.write(" = ");
                    self.emit_child(t.default);
                }
            }
            NodeKind::Variable(v) => {
                self.emit_variable(v);
                if !matches!(
                    arena.kind(arena.parent(node)),
                    Some(NodeKind::For(_) | NodeKind::ForOf(_))
                ) {
                    self.write(";");
                }
            }
            NodeKind::Annotation(a) => {
                self.write("@");
                self.write(&a.name);
                if !a.properties.is_empty() {
                    self.write("({");
                    self.emit_comma_list(&a.properties);
                    self.write("})");
                }
            }
            NodeKind::Block(b) => self.emit_body_block(&b.statements),
            NodeKind::ExprStmt(e) => {
                self.emit_child(e.expr);
                self.write(";");
            }
            NodeKind::Return(r) => {
                self.write("return");
                if self.resolve(r.expr).is_some() {
                    self.write(" ");
                    self.emit_child(r.expr);
                }
                self.write(";");
            }
            NodeKind::If(i) => {
                self.write("if (");
                self.emit_child(i.test);
                self.write(") ");
                self.emit_child(i.consequent);
                if self.resolve(i.alternate).is_some() {
                    self.write(" else ");
                    self.emit_child(i.alternate);
                }
            }
            NodeKind::While(w) => {
                self.write("while (");
                self.emit_child(w.test);
                self.write(") ");
                self.emit_child(w.body);
            }
            NodeKind::DoWhile(d) => {
                self.write("do ");
                self.emit_child(d.body);
                self.write(" while (");
                self.emit_child(d.test);
                self.write(");");
            }
            NodeKind::For(f) => {
                self.write("for (");
                self.emit_child(f.init);
                self.write("; ");
                self.emit_child(f.test);
                self.write("; ");
                self.emit_child(f.update);
                self.write(") ");
                self.emit_child(f.body);
            }
            NodeKind::ForOf(f) => {
                self.write("for (");
                self.emit_child(f.decl);
                self.write(" of ");
                self.emit_child(f.iterable);
                self.write(") ");
                self.emit_child(f.body);
            }
            NodeKind::Break(j) | NodeKind::Continue(j) => {
                self.write(if matches!(n.kind, NodeKind::Break(_)) {
                    "break"
                } else {
                    "continue"
                });
                if let Some(label) = &j.label {
                    self.write(" ");
                    self.write(label);
                }
                self.write(";");
            }
            NodeKind::Throw(t) => {
                self.write("throw ");
                self.emit_child(t.expr);
                self.write(";");
            }
            NodeKind::Try(t) => {
                self.write("try ");
                self.emit_child(t.block);
                if self.resolve(t.handler).is_some() {
                    self.write(" ");
                    self.emit_child(t.handler);
                }
                if self.resolve(t.finalizer).is_some() {
                    self.write(" finally ");
                    self.emit_child(t.finalizer);
                }
            }
            NodeKind::Catch(c) => {
                self.write("catch ");
                if let Some(param) = &c.param {
                    self.write("(");
                    self.write(param);
                    self.write(") ");
                }
                self.emit_child(c.body);
            }
            NodeKind::Switch(s) => {
                self.write("switch (");
                self.emit_child(s.discriminant);
                self.write(") ");
                self.emit_body_block(&s.cases);
            }
            NodeKind::SwitchCase(c) => {
                if self.resolve(c.test).is_some() {
                    self.write("case ");
                    self.emit_child(c.test);
                    self.write(":");
                } else {
                    self.write("default:");
                }
                self.indent += 1;
                self.emit_statements(&c.body);
                self.indent -= 1;
            }
            NodeKind::Empty => self.write(";"),
            NodeKind::PrimitiveType(p) => self.write(p.as_str()),
            NodeKind::TypeReference(t) => {
                self.write(&t.name);
                self.emit_type_params(&t.type_args);
            }
            NodeKind::FunctionType(f) => {
                self.emit_type_params(&f.type_params);
                self.emit_params(&f.params);
                self.write(" => ");
                self.emit_child(f.return_type);
            }
            NodeKind::ArrayType(a) => {
                let wrap = matches!(
                    self.resolve(a.element).and_then(|e| arena.kind(e)),
                    Some(NodeKind::UnionType(_) | NodeKind::FunctionType(_))
                );
                if wrap {
                    self.write("(");
                }
                self.emit_child(a.element);
                if wrap {
                    self.write(")");
                }
                self.write("[]");
            }
            NodeKind::UnionType(u) => {
                let items = self.resolve_list(&u.types);
                for (i, item) in items.into_iter().enumerate() {
                    if i > 0 {
                        self.write(" | ");
                    }
                    self.emit(item);
                }
            }
        }
        self.current = parent;
        self.depth -= 1;
    }
}
