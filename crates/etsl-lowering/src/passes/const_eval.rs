//! Constant evaluation.
//!
//! Two layers:
//! - `fold_binary` / `fold_unary`: operator semantics over literal values
//! - `ConstEvaluator`: read-only evaluation of expressions that name
//!   constants (`const` variables, `static readonly` fields, enum members),
//!   following declarations across units
//!
//! Numeric operands live on the rank lattice `char < int < long < float <
//! double`; an operator computes at the highest rank of its operands.

use crate::rewrite::UnitCx;
use etsl_ast::{
    BinaryOp, LiteralValue, MemberExpr, Modifiers, NodeArena, NodeIndex, NodeKind, PrimitiveKind,
    UnaryOp,
};
use etsl_binder::{Binding, BindingKind, ScopeTable};
use etsl_checker::{RecursionGuard, RecursionProfile, RecursionResult};
use etsl_common::UnitId;
use rustc_hash::FxHashSet;
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FoldError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("operator not applicable to the operands")]
    Unsupported,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl Rank {
    fn of(value: &LiteralValue) -> Option<Rank> {
        Some(match value {
            LiteralValue::Char(_) => Rank::Char,
            LiteralValue::Int(_) => Rank::Int,
            LiteralValue::Long(_) => Rank::Long,
            LiteralValue::Float(_) => Rank::Float,
            LiteralValue::Double(_) => Rank::Double,
            _ => return None,
        })
    }

    fn of_primitive(kind: PrimitiveKind) -> Option<Rank> {
        Some(match kind {
            PrimitiveKind::Char => Rank::Char,
            PrimitiveKind::Int => Rank::Int,
            PrimitiveKind::Long => Rank::Long,
            PrimitiveKind::Float => Rank::Float,
            PrimitiveKind::Double => Rank::Double,
            _ => return None,
        })
    }

    const fn is_integral(self) -> bool {
        matches!(self, Rank::Char | Rank::Int | Rank::Long)
    }

    /// Integer value at this rank (wrapping).
    fn integral(self, value: i64) -> LiteralValue {
        match self {
            Rank::Char => LiteralValue::Char(value as u16),
            Rank::Int => LiteralValue::Int(value as i32),
            Rank::Long => LiteralValue::Long(value),
            Rank::Float => LiteralValue::Float(value as f32),
            Rank::Double => LiteralValue::Double(value as f64),
        }
    }

    fn floating(self, value: f64) -> LiteralValue {
        match self {
            Rank::Float => LiteralValue::Float(value as f32),
            Rank::Double => LiteralValue::Double(value),
            integral => integral.integral(value as i64),
        }
    }
}

fn as_i64(value: &LiteralValue) -> Option<i64> {
    Some(match *value {
        LiteralValue::Char(c) => i64::from(c),
        LiteralValue::Int(i) => i64::from(i),
        LiteralValue::Long(l) => l,
        LiteralValue::Float(f) => f as i64,
        LiteralValue::Double(d) => d as i64,
        _ => return None,
    })
}

fn as_f64(value: &LiteralValue) -> Option<f64> {
    Some(match *value {
        LiteralValue::Char(c) => f64::from(c),
        LiteralValue::Int(i) => f64::from(i),
        LiteralValue::Long(l) => l as f64,
        LiteralValue::Float(f) => f64::from(f),
        LiteralValue::Double(d) => d,
        _ => return None,
    })
}

/// Extended truthiness: `null`, `undefined`, `""`, numeric zero, NaN and
/// `false` are falsy.
#[must_use]
pub fn is_truthy(value: &LiteralValue) -> bool {
    match value {
        LiteralValue::Boolean(b) => *b,
        LiteralValue::Char(c) => *c != 0,
        LiteralValue::Int(i) => *i != 0,
        LiteralValue::Long(l) => *l != 0,
        LiteralValue::Float(f) => *f != 0.0 && !f.is_nan(),
        LiteralValue::Double(d) => *d != 0.0 && !d.is_nan(),
        LiteralValue::String(s) => !s.is_empty(),
        LiteralValue::Null | LiteralValue::Undefined => false,
    }
}

/// Operand a logical operator yields, given its left operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Pick {
    Left,
    Right,
}

pub(crate) fn pick_logical(op: BinaryOp, left: &LiteralValue) -> Option<Pick> {
    let left_wins = match op {
        BinaryOp::LogicalAnd => !is_truthy(left),
        BinaryOp::LogicalOr => is_truthy(left),
        BinaryOp::Nullish => !matches!(left, LiteralValue::Null | LiteralValue::Undefined),
        _ => return None,
    };
    Some(if left_wins { Pick::Left } else { Pick::Right })
}

/// Text of a literal as string concatenation sees it.
fn concat_text(value: &LiteralValue) -> String {
    match value {
        LiteralValue::String(s) => s.clone(),
        LiteralValue::Char(c) => char::from_u32(u32::from(*c)).map_or_else(String::new, String::from),
        LiteralValue::Int(i) => i.to_string(),
        LiteralValue::Long(l) => l.to_string(),
        LiteralValue::Float(f) => float_text(f64::from(*f)),
        LiteralValue::Double(d) => float_text(*d),
        LiteralValue::Boolean(b) => b.to_string(),
        LiteralValue::Null => "null".to_string(),
        LiteralValue::Undefined => "undefined".to_string(),
    }
}

fn float_text(value: f64) -> String {
    if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if value.is_nan() {
        "NaN".to_string()
    } else {
        value.to_string()
    }
}

/// Fold `left op right` over literal operands.
pub fn fold_binary(
    op: BinaryOp,
    left: &LiteralValue,
    right: &LiteralValue,
) -> Result<LiteralValue, FoldError> {
    if let Some(pick) = pick_logical(op, left) {
        return Ok(match pick {
            Pick::Left => left.clone(),
            Pick::Right => right.clone(),
        });
    }
    if op == BinaryOp::Add
        && (matches!(left, LiteralValue::String(_)) || matches!(right, LiteralValue::String(_)))
    {
        return Ok(LiteralValue::String(concat_text(left) + &concat_text(right)));
    }
    if op.is_comparison() {
        return compare(op, left, right).map(LiteralValue::Boolean);
    }
    if op.is_bitwise()
        && let (LiteralValue::Boolean(a), LiteralValue::Boolean(b)) = (left, right)
    {
        return Ok(LiteralValue::Boolean(match op {
            BinaryOp::BitAnd => a & b,
            BinaryOp::BitOr => a | b,
            _ => a ^ b,
        }));
    }

    let rank = Rank::of(left)
        .zip(Rank::of(right))
        .map(|(a, b)| a.max(b))
        .ok_or(FoldError::Unsupported)?;
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic(op, rank, left, right)
        }
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => shift(op, rank, left, right),
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
            // Float ranks operate as long.
            let rank = if rank.is_integral() { rank } else { Rank::Long };
            let (a, b) = integral_operands(left, right)?;
            Ok(rank.integral(match op {
                BinaryOp::BitAnd => a & b,
                BinaryOp::BitOr => a | b,
                _ => a ^ b,
            }))
        }
        _ => Err(FoldError::Unsupported),
    }
}

fn integral_operands(left: &LiteralValue, right: &LiteralValue) -> Result<(i64, i64), FoldError> {
    as_i64(left).zip(as_i64(right)).ok_or(FoldError::Unsupported)
}

fn arithmetic(
    op: BinaryOp,
    rank: Rank,
    left: &LiteralValue,
    right: &LiteralValue,
) -> Result<LiteralValue, FoldError> {
    if rank.is_integral() {
        let (a, b) = integral_operands(left, right)?;
        if matches!(op, BinaryOp::Div | BinaryOp::Mod) && b == 0 {
            return Err(FoldError::DivisionByZero);
        }
        let value = match op {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::Div => a.wrapping_div(b),
            _ => a.wrapping_rem(b),
        };
        return Ok(rank.integral(value));
    }
    let a = as_f64(left).ok_or(FoldError::Unsupported)?;
    let b = as_f64(right).ok_or(FoldError::Unsupported)?;
    if rank == Rank::Float {
        let (a, b) = (a as f32, b as f32);
        let value = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            _ => a % b,
        };
        return Ok(LiteralValue::Float(value));
    }
    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        _ => a % b,
    };
    Ok(rank.floating(value))
}

fn shift(
    op: BinaryOp,
    rank: Rank,
    left: &LiteralValue,
    right: &LiteralValue,
) -> Result<LiteralValue, FoldError> {
    let rank = if rank.is_integral() { rank } else { Rank::Long };
    let (a, b) = integral_operands(left, right)?;
    if rank == Rank::Long {
        let amount = (b & 0x3f) as u32;
        let value = match op {
            BinaryOp::Shl => a.wrapping_shl(amount),
            BinaryOp::Shr => a >> amount,
            _ => ((a as u64) >> amount) as i64,
        };
        return Ok(Rank::Long.integral(value));
    }
    let amount = (b & 0x1f) as u32;
    let a = a as i32;
    let value = match op {
        BinaryOp::Shl => a.wrapping_shl(amount),
        BinaryOp::Shr => a >> amount,
        _ => ((a as u32) >> amount) as i32,
    };
    Ok(rank.integral(i64::from(value)))
}

fn compare(op: BinaryOp, left: &LiteralValue, right: &LiteralValue) -> Result<bool, FoldError> {
    let equality = matches!(
        op,
        BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq
    );
    let negated = matches!(op, BinaryOp::NotEq | BinaryOp::StrictNotEq);
    let strict = matches!(op, BinaryOp::StrictEq | BinaryOp::StrictNotEq);

    let ordering = match (left, right) {
        (l, r) if l.is_numeric() && r.is_numeric() => {
            let rank = Rank::of(l).max(Rank::of(r)).ok_or(FoldError::Unsupported)?;
            if rank.is_integral() {
                let (a, b) = integral_operands(l, r)?;
                Some(a.cmp(&b))
            } else {
                let a = as_f64(l).ok_or(FoldError::Unsupported)?;
                let b = as_f64(r).ok_or(FoldError::Unsupported)?;
                a.partial_cmp(&b)
            }
        }
        (LiteralValue::String(a), LiteralValue::String(b)) => Some(a.cmp(b)),
        (LiteralValue::Boolean(a), LiteralValue::Boolean(b)) if equality => Some(a.cmp(b)),
        (
            LiteralValue::Null | LiteralValue::Undefined,
            LiteralValue::Null | LiteralValue::Undefined,
        ) if equality => {
            let same = !strict || std::mem::discriminant(left) == std::mem::discriminant(right);
            return Ok(same != negated);
        }
        (LiteralValue::Null | LiteralValue::Undefined, _)
        | (_, LiteralValue::Null | LiteralValue::Undefined)
            if equality =>
        {
            return Ok(negated);
        }
        _ if strict => return Ok(negated),
        _ => return Err(FoldError::Unsupported),
    };

    // NaN compares unordered: only `!=` holds.
    let Some(ordering) = ordering else {
        return Ok(negated);
    };
    Ok(match op {
        BinaryOp::Eq | BinaryOp::StrictEq => ordering == Ordering::Equal,
        BinaryOp::NotEq | BinaryOp::StrictNotEq => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Le => ordering != Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}

/// Fold `op operand` over a literal operand.
pub fn fold_unary(op: UnaryOp, operand: &LiteralValue) -> Result<LiteralValue, FoldError> {
    match op {
        UnaryOp::Not => Ok(LiteralValue::Boolean(!is_truthy(operand))),
        UnaryOp::Plus if operand.is_numeric() => Ok(operand.clone()),
        UnaryOp::Minus => Ok(match *operand {
            LiteralValue::Char(c) => LiteralValue::Char(c.wrapping_neg()),
            LiteralValue::Int(i) => LiteralValue::Int(i.wrapping_neg()),
            LiteralValue::Long(l) => LiteralValue::Long(l.wrapping_neg()),
            LiteralValue::Float(f) => LiteralValue::Float(-f),
            LiteralValue::Double(d) => LiteralValue::Double(-d),
            _ => return Err(FoldError::Unsupported),
        }),
        UnaryOp::BitNot => Ok(match *operand {
            LiteralValue::Char(c) => LiteralValue::Char(!c),
            LiteralValue::Int(i) => LiteralValue::Int(!i),
            LiteralValue::Long(l) => LiteralValue::Long(!l),
            LiteralValue::Float(f) => LiteralValue::Long(!(f as i64)),
            LiteralValue::Double(d) => LiteralValue::Long(!(d as i64)),
            _ => return Err(FoldError::Unsupported),
        }),
        UnaryOp::Plus => Err(FoldError::Unsupported),
    }
}

/// `value` converted to the numeric rank declared by `annotation`, when both
/// are numeric.
pub(crate) fn coerce_to_annotation(
    arena: &NodeArena,
    annotation: NodeIndex,
    value: LiteralValue,
) -> LiteralValue {
    let Some(NodeKind::PrimitiveType(kind)) = arena.kind(annotation) else {
        return value;
    };
    let Some(target) = Rank::of_primitive(*kind) else {
        return value;
    };
    match Rank::of(&value) {
        Some(rank) if rank.is_integral() => as_i64(&value).map_or(value, |v| target.integral(v)),
        Some(_) => as_f64(&value).map_or(value, |v| target.floating(v)),
        None => value,
    }
}

// =============================================================================
// Evaluation through declarations
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EvalError {
    NotConstant,
    /// A declaration was reached again while evaluating itself.
    Cycle { reported: bool },
    DivisionByZero,
    Unsupported,
}

impl From<FoldError> for EvalError {
    fn from(err: FoldError) -> Self {
        match err {
            FoldError::DivisionByZero => EvalError::DivisionByZero,
            FoldError::Unsupported => EvalError::Unsupported,
        }
    }
}

type DeclKey = (UnitId, NodeIndex);

/// Read-only evaluator over the unit being folded and the units it imports.
pub(crate) struct ConstEvaluator<'c, 'a> {
    cx: &'c UnitCx<'a>,
    guard: RecursionGuard<DeclKey>,
    stack: Vec<DeclKey>,
    /// Declarations on a cycle that was already reported.
    cyclic: &'c mut FxHashSet<DeclKey>,
}

impl<'c, 'a> ConstEvaluator<'c, 'a> {
    pub(crate) fn new(cx: &'c UnitCx<'a>, cyclic: &'c mut FxHashSet<DeclKey>) -> Self {
        ConstEvaluator {
            cx,
            guard: RecursionGuard::with_profile(RecursionProfile::ConstResolution),
            stack: Vec::new(),
            cyclic,
        }
    }

    fn tables(&self, unit: UnitId) -> Option<(&'c NodeArena, &'c ScopeTable)> {
        let cx: &'c UnitCx<'a> = self.cx;
        if unit == cx.id() {
            Some((&cx.unit.arena, &cx.unit.scopes))
        } else {
            cx.others.get(unit).map(|u| (&u.arena, &u.scopes))
        }
    }

    /// Value of the expression `node` of `unit`.
    pub(crate) fn eval(&mut self, unit: UnitId, node: NodeIndex) -> Result<LiteralValue, EvalError> {
        let (arena, scopes) = self.tables(unit).ok_or(EvalError::NotConstant)?;
        match arena.kind(node).ok_or(EvalError::NotConstant)? {
            NodeKind::Literal(value) => Ok(value.clone()),
            NodeKind::Paren(paren) => self.eval(unit, paren.expr),
            NodeKind::Unary(unary) => {
                let operand = self.eval(unit, unary.operand)?;
                Ok(fold_unary(unary.op, &operand)?)
            }
            NodeKind::Binary(binary) => {
                let left = self.eval(unit, binary.left)?;
                match pick_logical(binary.op, &left) {
                    Some(Pick::Left) => Ok(left),
                    Some(Pick::Right) => self.eval(unit, binary.right),
                    None => {
                        let right = self.eval(unit, binary.right)?;
                        Ok(fold_binary(binary.op, &left, &right)?)
                    }
                }
            }
            NodeKind::Conditional(cond) => {
                let test = self.eval(unit, cond.test)?;
                let branch = if is_truthy(&test) {
                    cond.consequent
                } else {
                    cond.alternate
                };
                self.eval(unit, branch)
            }
            NodeKind::Identifier(_) => {
                let binding = scopes.resolved_binding(node).ok_or(EvalError::NotConstant)?;
                self.binding_value(unit, binding)
            }
            NodeKind::Member(member) => self.member_value(unit, member),
            _ => Err(EvalError::NotConstant),
        }
    }

    /// Value of a binding naming a constant.
    pub(crate) fn binding_value(
        &mut self,
        unit: UnitId,
        binding: &Binding,
    ) -> Result<LiteralValue, EvalError> {
        match binding.kind {
            BindingKind::Import => {
                let origin = binding.origin.ok_or(EvalError::NotConstant)?;
                self.decl_value(origin.unit, NodeIndex(origin.node))
            }
            BindingKind::Const | BindingKind::EnumLiteral => self.decl_value(unit, binding.decl),
            BindingKind::Field if binding.is_const() => self.decl_value(unit, binding.decl),
            _ => Err(EvalError::NotConstant),
        }
    }

    fn decl_value(&mut self, unit: UnitId, decl: NodeIndex) -> Result<LiteralValue, EvalError> {
        let key = (unit, decl);
        match self.guard.enter(key) {
            RecursionResult::Entered => {}
            RecursionResult::Cycle => {
                let reported = self.cyclic.contains(&key);
                self.cyclic.extend(self.stack.iter().copied());
                return Err(EvalError::Cycle { reported });
            }
            RecursionResult::DepthExceeded | RecursionResult::IterationExceeded => {
                return Err(EvalError::NotConstant);
            }
        }
        self.stack.push(key);
        let value = self.declared_value(unit, decl);
        self.stack.pop();
        self.guard.leave(key);
        value
    }

    fn declared_value(&mut self, unit: UnitId, decl: NodeIndex) -> Result<LiteralValue, EvalError> {
        let (arena, _) = self.tables(unit).ok_or(EvalError::NotConstant)?;
        match arena.kind(decl).ok_or(EvalError::NotConstant)? {
            NodeKind::Variable(var) if var.init.is_some() => {
                let value = self.eval(unit, var.init)?;
                Ok(coerce_to_annotation(arena, var.type_annotation, value))
            }
            NodeKind::Field(field)
                if field.init.is_some()
                    && field.modifiers.contains(Modifiers::STATIC | Modifiers::READONLY) =>
            {
                let value = self.eval(unit, field.init)?;
                Ok(coerce_to_annotation(arena, field.type_annotation, value))
            }
            NodeKind::EnumMember(_) => self.enum_member_value(unit, decl),
            _ => Err(EvalError::NotConstant),
        }
    }

    /// Value of an enum member: its initializer, or the previous integer
    /// plus one (0 for the first member).
    fn enum_member_value(&mut self, unit: UnitId, member: NodeIndex) -> Result<LiteralValue, EvalError> {
        let (arena, _) = self.tables(unit).ok_or(EvalError::NotConstant)?;
        let enum_node = arena.parent(member);
        let members = arena
            .kind(enum_node)
            .and_then(NodeKind::as_enum)
            .map(|e| e.members.clone())
            .ok_or(EvalError::NotConstant)?;
        let mut previous: Option<LiteralValue> = None;
        for candidate in members {
            let init = arena
                .kind(candidate)
                .and_then(NodeKind::as_enum_member)
                .map(|m| m.init)
                .ok_or(EvalError::NotConstant)?;
            let value = if init.is_some() {
                self.eval(unit, init)?
            } else {
                match previous {
                    None => LiteralValue::Int(0),
                    Some(LiteralValue::Int(i)) => LiteralValue::Int(i.wrapping_add(1)),
                    Some(LiteralValue::Long(l)) => LiteralValue::Long(l.wrapping_add(1)),
                    Some(_) => return Err(EvalError::NotConstant),
                }
            };
            if candidate == member {
                return Ok(value);
            }
            previous = Some(value);
        }
        Err(EvalError::NotConstant)
    }

    /// `E.A` for an enum member, `C.X` for a `static readonly` field.
    fn member_value(&mut self, unit: UnitId, member: &MemberExpr) -> Result<LiteralValue, EvalError> {
        let (arena, scopes) = self.tables(unit).ok_or(EvalError::NotConstant)?;
        if !matches!(arena.kind(member.object), Some(NodeKind::Identifier(_))) {
            return Err(EvalError::NotConstant);
        }
        let binding = scopes
            .resolved_binding(member.object)
            .ok_or(EvalError::NotConstant)?;
        let (owner_unit, owner) = match (binding.kind, binding.origin) {
            (BindingKind::Import, Some(origin)) => (origin.unit, NodeIndex(origin.node)),
            (BindingKind::Class | BindingKind::Enum, _) => (unit, binding.decl),
            _ => return Err(EvalError::NotConstant),
        };
        let (owner_arena, _) = self.tables(owner_unit).ok_or(EvalError::NotConstant)?;
        let target = match owner_arena.kind(owner) {
            Some(NodeKind::Enum(decl)) => decl.members.iter().copied().find(|&m| {
                owner_arena
                    .kind(m)
                    .and_then(NodeKind::as_enum_member)
                    .is_some_and(|m| m.name == member.property)
            }),
            Some(NodeKind::Class(decl)) => decl.members.iter().copied().find(|&m| {
                owner_arena.kind(m).and_then(NodeKind::as_field).is_some_and(|f| {
                    f.name == member.property
                        && f.modifiers.contains(Modifiers::STATIC | Modifiers::READONLY)
                })
            }),
            _ => None,
        };
        let target = target.ok_or(EvalError::NotConstant)?;
        self.decl_value(owner_unit, target)
    }
}

#[cfg(test)]
#[path = "../tests/const_eval_tests.rs"]
mod tests;
