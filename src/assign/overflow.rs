//! Saturating and wrapping compound assignment on integers carrying an
//! overflow modifier.

use anyhow::{anyhow, Result};

use crate::assign::bits::strip_subscripts;
use crate::ast::{AssignOp, AssignStmt, Expr};
use crate::gen::Codegen;
use crate::ty::BaseType;

fn limit_macros(base: &BaseType) -> Option<(&'static str, &'static str)> {
    match base {
        BaseType::U8 => Some(("UINT8_MAX", "0")),
        BaseType::U16 => Some(("UINT16_MAX", "0")),
        BaseType::U32 => Some(("UINT32_MAX", "0")),
        BaseType::U64 => Some(("UINT64_MAX", "0")),
        BaseType::I8 => Some(("INT8_MAX", "INT8_MIN")),
        BaseType::I16 => Some(("INT16_MAX", "INT16_MIN")),
        BaseType::I32 => Some(("INT32_MAX", "INT32_MIN")),
        BaseType::I64 => Some(("INT64_MAX", "INT64_MIN")),
        _ => None,
    }
}

impl Codegen<'_> {
    pub(crate) fn lower_overflow(
        &mut self,
        stmt: &AssignStmt,
        clamp: bool,
    ) -> Result<Vec<String>> {
        let pos = stmt.pos;
        let bare = strip_subscripts(&stmt.target);
        let lv = self.gen_chain(&bare, true)?;
        let ty = lv
            .ty
            .ok_or_else(|| anyhow!("overflow target has unknown type"))?;
        self.check_const_target(&stmt.target, Some(&ty), pos)?;

        let rhs = self.gen_expr_expecting(&stmt.value, None)?;
        let rhs = match &stmt.value {
            Expr::Binary { .. } | Expr::Ternary { .. } => format!("({rhs})"),
            _ => rhs,
        };
        let x = &lv.text;
        let token = stmt
            .op
            .binary()
            .ok_or_else(|| anyhow!("overflow lowering needs a compound op"))?
            .c_token();

        // division and shifts cannot overflow the unsigned range; they
        // and the remaining operators keep plain emission
        let saturating_op = matches!(
            stmt.op,
            AssignOp::Add | AssignOp::Sub | AssignOp::Mul
        );
        if !saturating_op {
            return Ok(vec![format!("{x} {} {rhs};", stmt.op.c_token())]);
        }

        let (max, min) = limit_macros(&ty.base)
            .ok_or_else(|| anyhow!("overflow modifier on a non-integer"))?;

        if !clamp {
            // wrap: unsigned arithmetic with a truncating cast back
            let c_type = self.c_type_of(&ty.base);
            if ty.base.is_unsigned() {
                return Ok(vec![format!(
                    "{x} = ({c_type})({x} {token} {rhs});"
                )]);
            }
            let unsigned = ty.base.unsigned_counterpart();
            let u_type = self.c_type_of(&unsigned);
            return Ok(vec![format!(
                "{x} = ({c_type})({u_type})(({u_type}){x} {token} ({u_type}){rhs});"
            )]);
        }

        if ty.bit_width <= 32 {
            // widened intermediate, clamped, narrowed back
            let temp = self.state.next_temp();
            let c_type = self.c_type_of(&ty.base);
            let wide = self.c_type_of(&BaseType::I64);
            let min_text = if ty.base.is_unsigned() {
                "0".to_owned()
            } else {
                format!("({wide}){min}")
            };
            return Ok(vec![
                "{".to_owned(),
                format!(
                    "    {wide} {temp} = ({wide}){x} {token} ({wide}){rhs};"
                ),
                format!(
                    "    if ({temp} > ({wide}){max}) {{ {temp} = ({wide}){max}; }}"
                ),
                format!(
                    "    if ({temp} < {min_text}) {{ {temp} = {min_text}; }}"
                ),
                format!("    {x} = ({c_type}){temp};"),
                "}".to_owned(),
            ]);
        }

        // 64-bit targets: pre-checked saturation for add and sub;
        // multiplication guards through a division test
        if ty.base.is_unsigned() {
            return Ok(match stmt.op {
                AssignOp::Add => vec![
                    format!("if ({x} > {max} - {rhs}) {{"),
                    format!("    {x} = {max};"),
                    "} else {".to_owned(),
                    format!("    {x} = {x} + {rhs};"),
                    "}".to_owned(),
                ],
                AssignOp::Sub => vec![
                    format!("if ({x} < {rhs}) {{"),
                    format!("    {x} = 0U;"),
                    "} else {".to_owned(),
                    format!("    {x} = {x} - {rhs};"),
                    "}".to_owned(),
                ],
                AssignOp::Mul => vec![
                    format!("if (({rhs} != 0U) && ({x} > {max} / {rhs})) {{"),
                    format!("    {x} = {max};"),
                    "} else {".to_owned(),
                    format!("    {x} = {x} * {rhs};"),
                    "}".to_owned(),
                ],
                _ => unreachable!(),
            });
        }
        Ok(match stmt.op {
            AssignOp::Add => vec![
                format!("if (({rhs} > 0) && ({x} > {max} - {rhs})) {{"),
                format!("    {x} = {max};"),
                format!(
                    "}} else if (({rhs} < 0) && ({x} < {min} - {rhs})) {{"
                ),
                format!("    {x} = {min};"),
                "} else {".to_owned(),
                format!("    {x} = {x} + {rhs};"),
                "}".to_owned(),
            ],
            AssignOp::Sub => vec![
                format!("if (({rhs} < 0) && ({x} > {max} + {rhs})) {{"),
                format!("    {x} = {max};"),
                format!(
                    "}} else if (({rhs} > 0) && ({x} < {min} + {rhs})) {{"
                ),
                format!("    {x} = {min};"),
                "} else {".to_owned(),
                format!("    {x} = {x} - {rhs};"),
                "}".to_owned(),
            ],
            AssignOp::Mul => vec![
                format!(
                    "if (({x} != 0) && (({rhs} > {max} / {x}) || ({rhs} < {min} / {x}))) {{"
                ),
                format!(
                    "    {x} = (({x} > 0) == ({rhs} > 0)) ? {max} : {min};"
                ),
                "} else {".to_owned(),
                format!("    {x} = {x} * {rhs};"),
                "}".to_owned(),
            ],
            _ => unreachable!(),
        })
    }
}
