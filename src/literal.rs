//! Compile-time folding of integer literals, constant expressions, and
//! array dimensions.

use anyhow::Result;
use num_traits::Bounded;

use crate::ast::{BinaryOp, Expr, Pos, UnaryOp};
use crate::codegen_bail;
use crate::ty::{self, BaseType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralBase {
    Decimal,
    Hex,
    Binary,
}

/// A parsed integer literal: value, lexical base and optional suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldedInt {
    pub value: i128,
    pub base: LiteralBase,
    pub suffix: Option<BaseType>,
}

/// Parse the literal grammar `^-?\d+$`, `^0[xX][0-9a-fA-F]+$`,
/// `^0[bB][01]+$` with optional type suffix.
pub fn parse_int(text: &str) -> Option<FoldedInt> {
    let (body, suffix) = match ty::split_type_suffix(text) {
        Some((body, base)) => (body, Some(base)),
        None => (text, None),
    };
    if let Some(hex) = body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
    {
        let value = i128::from_str_radix(hex, 16).ok()?;
        return Some(FoldedInt {
            value,
            base: LiteralBase::Hex,
            suffix,
        });
    }
    if let Some(bin) = body
        .strip_prefix("0b")
        .or_else(|| body.strip_prefix("0B"))
    {
        let value = i128::from_str_radix(bin, 2).ok()?;
        return Some(FoldedInt {
            value,
            base: LiteralBase::Binary,
            suffix,
        });
    }
    let body_ok = {
        let digits = body.strip_prefix('-').unwrap_or(body);
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
    };
    if !body_ok {
        return None;
    }
    let value: i128 = body.parse().ok()?;
    Some(FoldedInt {
        value,
        base: LiteralBase::Decimal,
        suffix,
    })
}

fn fits_in<T>(value: i128) -> bool
where
    T: Bounded + Into<i128>,
{
    value >= T::min_value().into() && value <= T::max_value().into()
}

/// Whether `value` is representable in the integer type `target`.
pub fn fits(value: i128, target: &BaseType) -> bool {
    match target {
        BaseType::U8 => fits_in::<u8>(value),
        BaseType::U16 => fits_in::<u16>(value),
        BaseType::U32 => fits_in::<u32>(value),
        BaseType::U64 => fits_in::<u64>(value),
        BaseType::I8 => fits_in::<i8>(value),
        BaseType::I16 => fits_in::<i16>(value),
        BaseType::I32 => fits_in::<i32>(value),
        BaseType::I64 => fits_in::<i64>(value),
        BaseType::Bool => value == 0 || value == 1,
        BaseType::Char => fits_in::<u8>(value),
        _ => false,
    }
}

/// Fold a constant expression to an integer, or `None` when any leaf
/// is not compile-time known. Used for dimensions, shift amounts,
/// subscripts and capacity checks.
pub fn fold(expr: &Expr) -> Option<i128> {
    match expr {
        Expr::IntLit { text, .. } => parse_int(text).map(|f| f.value),
        Expr::BoolLit { value, .. } => Some(i128::from(*value)),
        Expr::Unary { op, operand, .. } => {
            let v = fold(operand)?;
            match op {
                UnaryOp::Neg => Some(-v),
                UnaryOp::BitNot => Some(!v),
                UnaryOp::Not => Some(i128::from(v == 0)),
            }
        }
        Expr::Binary { op, lhs, rhs, .. } => {
            let l = fold(lhs)?;
            let r = fold(rhs)?;
            match op {
                BinaryOp::Add => l.checked_add(r),
                BinaryOp::Sub => l.checked_sub(r),
                BinaryOp::Mul => l.checked_mul(r),
                BinaryOp::Div => l.checked_div(r),
                BinaryOp::Mod => l.checked_rem(r),
                BinaryOp::BitAnd => Some(l & r),
                BinaryOp::BitOr => Some(l | r),
                BinaryOp::BitXor => Some(l ^ r),
                BinaryOp::Shl => {
                    u32::try_from(r).ok().and_then(|r| l.checked_shl(r))
                }
                BinaryOp::Shr => {
                    u32::try_from(r).ok().and_then(|r| l.checked_shr(r))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Resolves declared array dimensions to concrete sizes. An empty
/// dimension folds to 0 (unknown, to be inferred from the initializer).
pub struct ArrayDimensionParser;

impl ArrayDimensionParser {
    pub fn parse(dims: &[Option<Expr>], pos: Pos) -> Result<Vec<u32>> {
        let mut out = Vec::with_capacity(dims.len());
        for dim in dims {
            match dim {
                None => out.push(0),
                Some(expr) => {
                    let Some(value) = fold(expr) else {
                        // runtime-sized dimensions never reach the
                        // generator; treat as unknown
                        out.push(0);
                        continue;
                    };
                    let Ok(value) = u32::try_from(value) else {
                        codegen_bail!(
                            ArraySizeMismatch,
                            pos,
                            "array dimension must be a nonnegative integer, got {value}"
                        );
                    };
                    out.push(value);
                }
            }
        }
        Ok(out)
    }
}
