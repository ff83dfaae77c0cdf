//! Read-modify-write lowering for single-bit and bit-range stores on
//! integers, register members and array elements.

use anyhow::{anyhow, Result};

use crate::ast::{AssignStmt, Expr, Pos, PostfixChain, Segment, SubscriptGroup};
use crate::cast;
use crate::expr::member::{bit_suffix, mask_literal};
use crate::gen::Codegen;
use crate::literal;
use crate::ty::BaseType;

impl Codegen<'_> {
    pub(crate) fn lower_integer_bit(
        &mut self,
        stmt: &AssignStmt,
    ) -> Result<Vec<String>> {
        let pos = stmt.pos;
        let bare = strip_subscripts(&stmt.target);
        let lv = self.gen_chain(&bare, true)?;
        let ty = lv
            .ty
            .ok_or_else(|| anyhow!("bit write target has unknown type"))?;
        self.check_const_target(&stmt.target, Some(&ty), pos)?;
        let group = &stmt.target.segments[0].subscripts[0];
        let line = self.bit_write_line(
            &lv.text,
            &ty.base,
            ty.bit_width,
            group,
            &stmt.value,
            pos,
        )?;
        Ok(vec![line])
    }

    pub(crate) fn lower_register_bit(
        &mut self,
        stmt: &AssignStmt,
    ) -> Result<Vec<String>> {
        let pos = stmt.pos;
        let bare = strip_subscripts(&stmt.target);
        let lv = self.gen_chain(&bare, true)?;
        let ty = lv
            .ty
            .ok_or_else(|| anyhow!("register member has unknown type"))?;
        let group = &stmt.target.segments[1].subscripts[0];
        let line = self.bit_write_line(
            &lv.text,
            &ty.base,
            ty.bit_width,
            group,
            &stmt.value,
            pos,
        )?;
        Ok(vec![line])
    }

    pub(crate) fn lower_array_element_bit(
        &mut self,
        stmt: &AssignStmt,
    ) -> Result<Vec<String>> {
        let pos = stmt.pos;
        // all groups but the last index the element; the last is the bit
        let segment = &stmt.target.segments[0];
        let mut element_seg = Segment::plain(&segment.name);
        element_seg.subscripts = segment.subscripts
            [..segment.subscripts.len() - 1]
            .to_vec();
        let element_chain = PostfixChain {
            prefix: stmt.target.prefix,
            segments: vec![element_seg],
            pos,
        };
        let lv = self.gen_chain(&element_chain, true)?;
        let ty = lv
            .ty
            .ok_or_else(|| anyhow!("array element has unknown type"))?;
        self.check_const_target(&stmt.target, Some(&ty), pos)?;
        let group = segment.subscripts.last().expect("classified with groups");
        let line = self.bit_write_line(
            &lv.text,
            &ty.base,
            ty.base.bit_width(),
            group,
            &stmt.value,
            pos,
        )?;
        Ok(vec![line])
    }

    /// `lhs = (lhs & ~(mask << start)) | ((U(rhs) & mask) << start);`
    /// with the outer MISRA cast when promotion widens the store type.
    pub(crate) fn bit_write_line(
        &mut self,
        lhs: &str,
        store_base: &BaseType,
        width_bits: u16,
        group: &SubscriptGroup,
        rhs: &Expr,
        pos: Pos,
    ) -> Result<String> {
        let (start, mask) = match group.exprs.as_slice() {
            [bit] => {
                self.validate_bit_position(bit, width_bits, pos)?;
                let start = self.gen_expr_expecting(bit, None)?;
                let suffix = bit_suffix(width_bits > 32);
                (start, format!("1{suffix}"))
            }
            [start, width] => {
                self.validate_bit_range(start, width, width_bits, pos)?;
                let suffix = bit_suffix(width_bits > 32);
                let mask = match literal::fold(width) {
                    Some(width) => {
                        format!("{}{suffix}", mask_literal(width, width_bits > 32))
                    }
                    None => {
                        let width = self.gen_expr_expecting(width, None)?;
                        format!("((1{suffix} << {width}) - 1{suffix})")
                    }
                };
                let start = self.gen_expr_expecting(start, None)?;
                (start, mask)
            }
            _ => {
                return Err(anyhow!(
                    "subscript groups hold one or two expressions"
                ))
            }
        };
        self.rmw_line(lhs, store_base, width_bits, &start, &mask, rhs)
    }

    /// Shared masked-store shape, also used by bitmap field writes.
    pub(crate) fn rmw_line(
        &mut self,
        lhs: &str,
        store_base: &BaseType,
        width_bits: u16,
        start: &str,
        mask: &str,
        rhs: &Expr,
    ) -> Result<String> {
        let unsigned = BaseType::unsigned_of_width(width_bits);
        let rhs_cast = self.cast_rhs(&unsigned, rhs)?;
        let keep = format!("({lhs} & ~({mask} << {start}))");
        let insert = format!("(({rhs_cast} & {mask}) << {start})");
        let store_type = if store_base.is_primitive() {
            store_base.clone()
        } else {
            unsigned.clone()
        };
        let promoted = cast::promote(&store_type);
        if cast::needs_cast(&promoted, &store_type) {
            let c_type = self.c_type_of(&store_type);
            if self.cpp() {
                Ok(format!(
                    "{lhs} = static_cast<{c_type}>({keep} | {insert});"
                ))
            } else {
                Ok(format!("{lhs} = ({c_type})({keep} | {insert});"))
            }
        } else {
            Ok(format!("{lhs} = {keep} | {insert};"))
        }
    }

    /// `(U)rhs`, parenthesizing composite expressions.
    pub(crate) fn cast_rhs(
        &mut self,
        unsigned: &BaseType,
        rhs: &Expr,
    ) -> Result<String> {
        let text = self.gen_expr_expecting(rhs, None)?;
        let text = match rhs {
            Expr::Binary { .. } | Expr::Ternary { .. } => format!("({text})"),
            _ => text,
        };
        let c_type = self.c_type_of(unsigned);
        if self.cpp() {
            Ok(format!("static_cast<{c_type}>({text})"))
        } else {
            Ok(format!("({c_type}){text}"))
        }
    }
}

/// The chain with every subscript group removed, leaving the bare
/// lvalue the masked store writes through.
pub(crate) fn strip_subscripts(chain: &PostfixChain) -> PostfixChain {
    PostfixChain {
        prefix: chain.prefix,
        segments: chain
            .segments
            .iter()
            .map(|segment| Segment::plain(&segment.name))
            .collect(),
        pos: chain.pos,
    }
}
