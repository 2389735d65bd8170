//! Type formatting for diagnostics and debug output.

use crate::intern::TypeInterner;
use crate::types::{TypeData, TypeId};

pub struct TypeFormatter<'a> {
    interner: &'a TypeInterner,
    depth: u32,
}

impl<'a> TypeFormatter<'a> {
    const MAX_DEPTH: u32 = 8;

    #[must_use]
    pub fn new(interner: &'a TypeInterner) -> Self {
        TypeFormatter { interner, depth: 0 }
    }

    #[must_use]
    pub fn format(&mut self, id: TypeId) -> String {
        if self.depth > Self::MAX_DEPTH {
            return "...".to_string();
        }
        self.depth += 1;
        let interner = self.interner;
        let text = match interner.lookup(id) {
            None => format!("<unknown {}>", id.0),
            Some(TypeData::Intrinsic(kind)) => kind.name().to_string(),
            Some(TypeData::Class(class) | TypeData::Interface(class)) => {
                self.with_args(&class.name, &class.args)
            }
            Some(TypeData::Enum(_, name)) => name.clone(),
            Some(TypeData::Static(_, name)) => format!("typeof {name}"),
            Some(TypeData::TypeParameter(tp)) => tp.name.clone(),
            Some(TypeData::Builtin(kind, args)) => self.with_args(kind.name(), args),
            Some(&TypeData::Array(element)) => {
                let inner = self.format(element);
                if matches!(
                    interner.lookup(element),
                    Some(TypeData::Union(_) | TypeData::Function(_))
                ) {
                    format!("({inner})[]")
                } else {
                    format!("{inner}[]")
                }
            }
            Some(TypeData::Union(members)) => members
                .iter()
                .map(|&m| self.format(m))
                .collect::<Vec<_>>()
                .join(" | "),
            Some(TypeData::Function(shape)) => {
                let params: Vec<String> = shape
                    .params
                    .iter()
                    .enumerate()
                    .map(|(i, p)| {
                        let ty = self.format(p.ty);
                        if p.rest {
                            format!("...p{i}: {ty}")
                        } else if p.optional {
                            format!("p{i}?: {ty}")
                        } else {
                            format!("p{i}: {ty}")
                        }
                    })
                    .collect();
                let ret = self.format(shape.ret);
                format!("({}) => {ret}", params.join(", "))
            }
        };
        self.depth -= 1;
        text
    }

    fn with_args(&mut self, name: &str, args: &[TypeId]) -> String {
        if args.is_empty() {
            return name.to_string();
        }
        let args: Vec<String> = args.iter().map(|&a| self.format(a)).collect();
        format!("{name}<{}>", args.join(", "))
    }
}

/// Format a single type.
#[must_use]
pub fn format_type(interner: &TypeInterner, id: TypeId) -> String {
    TypeFormatter::new(interner).format(id)
}
