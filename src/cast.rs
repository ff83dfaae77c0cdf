//! MISRA cast insertion: the integer-promotion model and the wrapping
//! rules for 10.3 (narrowing after promotion) and 10.5 (bool).

use anyhow::Result;

use crate::ast::{Expr, Pos};
use crate::codegen_bail;
use crate::literal;
use crate::ty::BaseType;

/// The C type an operand takes once integer promotion applies:
/// anything narrower than 32 bits becomes `int`.
pub fn promote(base: &BaseType) -> BaseType {
    match base {
        BaseType::U8
        | BaseType::U16
        | BaseType::I8
        | BaseType::I16
        | BaseType::Bool
        | BaseType::Char => BaseType::I32,
        other => other.clone(),
    }
}

/// Whether assigning a value of (already promoted) type `src` into
/// `tgt` requires an explicit cast.
pub fn needs_cast(src: &BaseType, tgt: &BaseType) -> bool {
    if *tgt == BaseType::Bool {
        return *src != BaseType::Bool;
    }
    if src.bit_width() == 0 || tgt.bit_width() == 0 {
        return false;
    }
    src.bit_width() > tgt.bit_width()
}

/// Wrap `expr` in the MISRA-conformant conversion to `tgt`. The caller
/// parenthesizes composite expressions.
pub fn wrap(expr: &str, tgt: &BaseType, cpp: bool) -> String {
    if *tgt == BaseType::Bool {
        return format!("(({expr}) != 0U)");
    }
    if cpp {
        format!("static_cast<{}>({expr})", tgt.c_type())
    } else {
        format!("({}){expr}", tgt.c_type())
    }
}

/// MISRA 12.2: shift amounts must be nonnegative and smaller than the
/// width of the (unpromoted) left operand.
pub fn validate_shift_amount(
    lhs_type: &BaseType,
    amount: &Expr,
    pos: Pos,
) -> Result<()> {
    let Some(value) = literal::fold(amount) else {
        return Ok(());
    };
    if value < 0 {
        codegen_bail!(NegativeShift, pos, "shift amount {value} is negative");
    }
    let width = i128::from(lhs_type.bit_width());
    if width > 0 && value >= width {
        codegen_bail!(
            ShiftExceedsWidth,
            pos,
            "shift amount {value} exceeds the {width}-bit operand"
        );
    }
    Ok(())
}
