//! Assignment lowering: classification dispatch and the contracts
//! shared by every kind-specific emitter.

pub(crate) mod array;
pub(crate) mod atomic;
pub(crate) mod bitmap;
pub(crate) mod bits;
pub(crate) mod classify;
pub(crate) mod float_bits;
pub(crate) mod overflow;
pub(crate) mod simple;
pub(crate) mod string_ops;

pub use classify::{classify, AssignmentKind};

use anyhow::Result;

use crate::ast::{AssignStmt, Expr, Pos, PostfixChain};
use crate::cast;
use crate::codegen_bail;
use crate::gen::Codegen;
use crate::ty::TypeInfo;

impl Codegen<'_> {
    pub(crate) fn emit_assign(&mut self, stmt: &AssignStmt) -> Result<()> {
        use AssignmentKind::*;
        let kind = classify(self.symbols, &self.state, stmt);
        let lines = match kind {
            Simple | ThisMember | GlobalMember | MemberChain | ThisArray
            | GlobalArray => self.lower_simple(stmt)?,
            IntegerBit | IntegerBitRange => self.lower_integer_bit(stmt)?,
            FloatBit | FloatBitRange => self.lower_float_bit(stmt)?,
            RegisterBit | RegisterBitRange | ScopedRegisterBit
            | ScopedRegisterBitRange => self.lower_register_bit(stmt)?,
            BitmapFieldSingleBit | BitmapFieldMultiBit
            | BitmapArrayElementField | RegisterMemberBitmapField
            | ScopedRegisterMemberBitmapField | StructMemberBitmapField => {
                self.lower_bitmap_field(stmt, kind)?
            }
            StringSimple | StringStructField | StringConcat
            | StringSubstring => self.lower_string(stmt, kind)?,
            ArrayElement | MultiDimArrayElement => {
                self.lower_array_element(stmt)?
            }
            ArraySlice => self.lower_array_slice(stmt)?,
            ArrayElementBit => self.lower_array_element_bit(stmt)?,
            AtomicRmw => self.lower_atomic_rmw(stmt)?,
            OverflowClamp => self.lower_overflow(stmt, true)?,
            OverflowWrap => self.lower_overflow(stmt, false)?,
        };
        self.flush_pending();
        for line in lines {
            self.line(&line);
        }
        self.flush_pending_cpp_assignments();
        Ok(())
    }

    /// Generate and validate the RHS for a typed target: expected type
    /// in force, conversion checked, MISRA cast applied when the
    /// promoted source is wider than the target.
    pub(crate) fn assign_rhs(
        &mut self,
        target: &TypeInfo,
        value: &Expr,
        pos: Pos,
    ) -> Result<String> {
        if target.is_enum {
            self.validate_enum_assignment(target, value, pos)?;
            return self.gen_expr_expecting(value, Some(target.clone()));
        }
        let previous = self.state.swap_expected(Some(target.clone()));
        let value_type = self.resolver().expr_type(value);
        let generated = self.gen_expr(value);
        self.state.swap_expected(previous);
        let text = generated?;

        let is_literal = matches!(
            value,
            Expr::IntLit { .. } | Expr::FloatLit { .. } | Expr::BoolLit { .. }
        );
        if !is_literal {
            self.resolver().validate_conversion(
                target,
                value_type.as_ref(),
                pos,
            )?;
        }
        if target.base.is_integer() || target.base == crate::ty::BaseType::Bool
        {
            if let Some(source) = &value_type {
                let promoted = match value {
                    Expr::Binary { op, .. } if op.is_numeric() => {
                        cast::promote(&source.base)
                    }
                    Expr::Unary { .. } => cast::promote(&source.base),
                    _ => source.base.clone(),
                };
                if cast::needs_cast(&promoted, &target.base) {
                    // the bool form parenthesizes on its own
                    if target.base == crate::ty::BaseType::Bool {
                        return Ok(cast::wrap(&text, &target.base, self.cpp()));
                    }
                    return Ok(cast::wrap(
                        &format!("({text})"),
                        &target.base,
                        self.cpp(),
                    ));
                }
            }
        }
        Ok(text)
    }

    /// Reject writes through const targets.
    pub(crate) fn check_const_target(
        &self,
        chain: &PostfixChain,
        target: Option<&TypeInfo>,
        pos: Pos,
    ) -> Result<()> {
        let root = &chain.segments[0].name;
        if let Some(param) = self.state.parameter(root) {
            if param.ty.is_const {
                codegen_bail!(
                    ConstParameterAssignment,
                    pos,
                    "cannot assign to const parameter `{root}`"
                );
            }
        }
        if target.is_some_and(|t| t.is_const) {
            codegen_bail!(
                ConstAssignment,
                pos,
                "cannot assign to const `{root}`"
            );
        }
        Ok(())
    }
}
