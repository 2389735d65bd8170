//! Shared fixtures for the pipeline tests: units are built with the node
//! factory (the pipeline consumes parser output, there is no parser here)
//! and compiled through a `PhaseManager`.

#![allow(dead_code)]

use etsl_ast::*;
use etsl_common::{Span, UnitId};
use etsl_lowering::{
    CompilationContext, LoweringOptions, PhaseId, PhaseManager, PipelineResult, Program, UnitSource,
};

/// Build a unit from the top-level statements returned by `build`.
pub fn unit(name: &str, build: impl FnOnce(&mut NodeFactory<'_>) -> NodeList) -> UnitSource {
    let mut arena = NodeArena::new();
    let root = {
        let mut f = NodeFactory::plain(&mut arena, Span::new(0, 1000));
        let statements = build(&mut f);
        f.node(NodeKind::Program(ProgramDecl { statements }))
    };
    UnitSource {
        name: name.to_string(),
        stdlib: false,
        arena,
        root,
    }
}

pub struct Fixture {
    pub ctx: CompilationContext,
    pub manager: PhaseManager,
    pub main: UnitId,
}

impl Fixture {
    /// Program of `units`; the last one is compiled.
    pub fn new(units: Vec<UnitSource>) -> Self {
        Self::with_options(units, LoweringOptions {
            verify_contracts: true,
            ..LoweringOptions::default()
        })
    }

    pub fn with_options(units: Vec<UnitSource>, options: LoweringOptions) -> Self {
        let mut program = Program::new();
        let mut main = UnitId(0);
        for source in units {
            main = program.add_unit(source).expect("unit rejected");
        }
        Fixture {
            ctx: CompilationContext::new(program, options),
            manager: PhaseManager::new(),
            main,
        }
    }

    pub fn single(build: impl FnOnce(&mut NodeFactory<'_>) -> NodeList) -> Self {
        Self::new(vec![unit("main.ets", build)])
    }

    pub fn run(&mut self) -> PipelineResult<()> {
        self.manager.run(&mut self.ctx, self.main)
    }

    pub fn run_until(&mut self, phase: &str) -> PipelineResult<PhaseId> {
        self.manager.run_until(&mut self.ctx, self.main, phase)
    }

    pub fn phase(&self, name: &str) -> PhaseId {
        self.manager.phase_id(name).expect("unknown phase")
    }

    pub fn arena(&self) -> &NodeArena {
        &self.ctx.program.unit(self.main).expect("main unit").arena
    }

    pub fn root(&self) -> NodeIndex {
        self.ctx.program.unit(self.main).expect("main unit").root
    }

    pub fn print(&self) -> String {
        self.ctx.print_unit(self.main).expect("main unit")
    }

    pub fn print_at(&self, phase: &str) -> String {
        self.ctx
            .print_unit_at(self.main, self.phase(phase))
            .expect("main unit")
    }

    pub fn count(&self, code: u32) -> usize {
        self.ctx.diagnostics.count_code(code)
    }

    pub fn codes(&self) -> Vec<u32> {
        self.ctx.diagnostics.iter().map(|d| d.code).collect()
    }

    /// Top-level class named `name`.
    pub fn class(&self, name: &str) -> Option<&ClassDecl> {
        let arena = self.arena();
        let program = arena.kind(self.root())?.as_program()?;
        program
            .statements
            .iter()
            .filter_map(|&s| arena.kind(s).and_then(NodeKind::as_class))
            .find(|c| c.name == name)
    }

    /// Field and method names of class `name`, in member order.
    pub fn member_names(&self, class: &str) -> Vec<String> {
        let arena = self.arena();
        self.class(class)
            .map(|c| {
                c.members
                    .iter()
                    .filter_map(|&m| match arena.kind(m) {
                        Some(NodeKind::Field(field)) => Some(field.name.clone()),
                        Some(NodeKind::Method(method)) => Some(method.name.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

// =============================================================================
// Builders
// =============================================================================

pub fn int_type(f: &mut NodeFactory<'_>) -> NodeIndex {
    f.primitive(PrimitiveKind::Int)
}

pub fn function(
    f: &mut NodeFactory<'_>,
    name: &str,
    params: NodeList,
    return_type: NodeIndex,
    statements: NodeList,
) -> NodeIndex {
    let body = f.block(statements);
    f.node(NodeKind::Function(FunctionDecl {
        modifiers: Modifiers::empty(),
        name: name.to_string(),
        type_params: NodeList::new(),
        params,
        return_type,
        body,
        annotations: NodeList::new(),
    }))
}

pub fn class(f: &mut NodeFactory<'_>, name: &str, members: NodeList) -> NodeIndex {
    f.class(
        ClassDecl {
            modifiers: Modifiers::empty(),
            name: name.to_string(),
            type_params: NodeList::new(),
            extends: NodeIndex::NONE,
            implements: NodeList::new(),
            members,
            annotations: NodeList::new(),
        },
        NodeFlags::empty(),
    )
}

pub fn enum_decl(
    f: &mut NodeFactory<'_>,
    name: &str,
    members: &[(&str, Option<LiteralValue>)],
) -> NodeIndex {
    let members: NodeList = members
        .iter()
        .map(|(member, init)| {
            let init = match init {
                Some(value) => f.literal(value.clone()),
                None => NodeIndex::NONE,
            };
            f.node(NodeKind::EnumMember(EnumMember {
                name: (*member).to_string(),
                init,
            }))
        })
        .collect();
    f.node(NodeKind::Enum(EnumDecl {
        modifiers: Modifiers::empty(),
        name: name.to_string(),
        members,
    }))
}

/// `(params): ret => { statements }`
pub fn arrow(
    f: &mut NodeFactory<'_>,
    params: NodeList,
    return_type: NodeIndex,
    statements: NodeList,
) -> NodeIndex {
    let body = f.block(statements);
    f.node(NodeKind::Arrow(ArrowFunction {
        type_params: NodeList::new(),
        params,
        return_type,
        body,
    }))
}

pub fn import(f: &mut NodeFactory<'_>, source: &str, names: &[&str]) -> NodeIndex {
    let specifiers: NodeList = names
        .iter()
        .map(|name| {
            f.node(NodeKind::ImportSpecifier(ImportSpecifier {
                imported: (*name).to_string(),
                local: (*name).to_string(),
            }))
        })
        .collect();
    f.node(NodeKind::Import(ImportDecl {
        specifiers,
        source: source.to_string(),
    }))
}

/// Mark a declaration `export`.
pub fn exported(f: &mut NodeFactory<'_>, node: NodeIndex) -> NodeIndex {
    match f.arena().kind_mut(node) {
        Some(NodeKind::Enum(decl)) => decl.modifiers |= Modifiers::EXPORT,
        Some(NodeKind::Class(decl)) => decl.modifiers |= Modifiers::EXPORT,
        Some(NodeKind::Function(decl)) => decl.modifiers |= Modifiers::EXPORT,
        Some(NodeKind::Variable(decl)) => decl.modifiers |= Modifiers::EXPORT,
        _ => {}
    }
    node
}
