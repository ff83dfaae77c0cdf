//! Bitmap field stores, on scalars, array elements, register members
//! and struct members.

use anyhow::{anyhow, Result};

use crate::assign::AssignmentKind;
use crate::ast::{AssignStmt, Pos, PostfixChain, Prefix};
use crate::codegen_bail;
use crate::expr::member::{bit_suffix, mask_literal};
use crate::gen::Codegen;
use crate::literal;
use crate::symbol::BitmapField;
use crate::ty::BaseType;

impl Codegen<'_> {
    pub(crate) fn lower_bitmap_field(
        &mut self,
        stmt: &AssignStmt,
        kind: AssignmentKind,
    ) -> Result<Vec<String>> {
        let pos = stmt.pos;
        let segments = &stmt.target.segments;

        // locate the lvalue chain (everything but the field name) and
        // the bitmap type the field lives in
        let (lvalue_chain, bitmap, field_name) = match kind {
            AssignmentKind::BitmapFieldSingleBit
            | AssignmentKind::BitmapFieldMultiBit
            | AssignmentKind::BitmapArrayElementField => {
                let root = self
                    .resolver()
                    .root_type(&stmt.target)
                    .ok_or_else(|| anyhow!("bitmap target has unknown type"))?;
                let bitmap = root
                    .bitmap_type
                    .clone()
                    .ok_or_else(|| anyhow!("bitmap without a type name"))?;
                let chain = PostfixChain {
                    prefix: stmt.target.prefix,
                    segments: vec![segments[0].clone()],
                    pos,
                };
                (chain, bitmap, segments[1].name.clone())
            }
            AssignmentKind::RegisterMemberBitmapField => {
                let bitmap = self
                    .symbols
                    .register_member(&segments[0].name, &segments[1].name)
                    .and_then(|m| m.bitmap_type.clone())
                    .ok_or_else(|| anyhow!("register member is not a bitmap"))?;
                let chain = PostfixChain {
                    prefix: stmt.target.prefix,
                    segments: segments[..2].to_vec(),
                    pos,
                };
                (chain, bitmap, segments[2].name.clone())
            }
            AssignmentKind::ScopedRegisterMemberBitmapField => {
                // `this.REG.MEMBER.field` or `Scope.REG.MEMBER.field`
                let (reg, member, field) = if stmt.target.prefix == Prefix::This
                {
                    (0usize, 1usize, 2usize)
                } else {
                    (1, 2, 3)
                };
                let bitmap = self
                    .symbols
                    .register_member(
                        &segments[reg].name,
                        &segments[member].name,
                    )
                    .and_then(|m| m.bitmap_type.clone())
                    .ok_or_else(|| anyhow!("register member is not a bitmap"))?;
                let chain = PostfixChain {
                    prefix: if stmt.target.prefix == Prefix::This {
                        Prefix::This
                    } else {
                        Prefix::None
                    },
                    segments: segments[reg..=member].to_vec(),
                    pos,
                };
                (chain, bitmap, segments[field].name.clone())
            }
            AssignmentKind::StructMemberBitmapField => {
                let root = self
                    .resolver()
                    .root_type(&stmt.target)
                    .ok_or_else(|| anyhow!("struct target has unknown type"))?;
                let BaseType::Named(type_name) = &root.base else {
                    return Err(anyhow!("struct target has unknown type"));
                };
                let bitmap = self
                    .symbols
                    .struct_def(type_name)
                    .and_then(|def| def.field(&segments[1].name))
                    .and_then(|field| field.ty.bitmap_type.clone())
                    .ok_or_else(|| anyhow!("struct member is not a bitmap"))?;
                let chain = PostfixChain {
                    prefix: stmt.target.prefix,
                    segments: segments[..2].to_vec(),
                    pos,
                };
                (chain, bitmap, segments[2].name.clone())
            }
            _ => return Err(anyhow!("not a bitmap field assignment")),
        };

        let def = self
            .symbols
            .bitmap(&bitmap)
            .ok_or_else(|| anyhow!("unknown bitmap type {bitmap}"))?
            .clone();
        let field = def
            .field(&field_name)
            .ok_or_else(|| anyhow!("`{field_name}` is not a field of {bitmap}"))?
            .clone();

        self.validate_field_value(&field, &stmt.value, pos)?;

        let lv = self.gen_chain(&lvalue_chain, true)?;
        let root_ty = lv.ty.clone();
        self.check_const_target(&stmt.target, root_ty.as_ref(), pos)?;

        let wide = def.bit_width > 32;
        let suffix = bit_suffix(wide);
        let mask = format!(
            "{}{suffix}",
            mask_literal(i128::from(field.width), wide)
        );
        let start = format!("{}", field.offset);
        let store_base = BaseType::unsigned_of_width(def.bit_width);
        let line = self.rmw_line(
            &lv.text,
            &store_base,
            def.bit_width,
            &start,
            &mask,
            &stmt.value,
        )?;
        Ok(vec![line])
    }

    /// A literal store must fit the field's width.
    fn validate_field_value(
        &self,
        field: &BitmapField,
        value: &crate::ast::Expr,
        pos: Pos,
    ) -> Result<()> {
        let Some(folded) = literal::fold(value) else {
            return Ok(());
        };
        let limit = (1i128 << field.width) - 1;
        if folded < 0 || folded > limit {
            codegen_bail!(
                BitmapFieldOverflow,
                pos,
                "{value} does not fit in the {width}-bit field {name}",
                value = folded,
                width = field.width,
                name = field.name
            );
        }
        Ok(())
    }
}
