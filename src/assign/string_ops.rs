//! Capacity-checked bounded-string stores: copy, concatenation and
//! substring extraction.

use anyhow::{anyhow, Result};

use crate::assign::AssignmentKind;
use crate::ast::{AssignStmt, BinaryOp, Expr, Pos, PostfixChain};
use crate::codegen_bail;
use crate::gen::Codegen;
use crate::include::IncludeTag;
use crate::literal;

impl Codegen<'_> {
    pub(crate) fn lower_string(
        &mut self,
        stmt: &AssignStmt,
        kind: AssignmentKind,
    ) -> Result<Vec<String>> {
        let pos = stmt.pos;
        let lv = self.gen_chain(&stmt.target, true)?;
        let ty = lv
            .ty
            .clone()
            .ok_or_else(|| anyhow!("string target has unknown type"))?;
        self.check_const_target(&stmt.target, Some(&ty), pos)?;
        let capacity = ty
            .string_capacity
            .ok_or_else(|| anyhow!("string target without a capacity"))?;
        self.state.includes.request(IncludeTag::String);
        let dst = lv.text;

        match kind {
            AssignmentKind::StringConcat => {
                self.lower_concat(&dst, capacity, &stmt.value, pos)
            }
            AssignmentKind::StringSubstring => {
                self.lower_substring(&dst, capacity, &stmt.value, pos)
            }
            AssignmentKind::StringSimple
            | AssignmentKind::StringStructField => {
                let (src, src_capacity) = self.string_operand(&stmt.value)?;
                if let (Some(len), true) =
                    (src_capacity, matches!(stmt.value, Expr::StringLit { .. }))
                {
                    if len > capacity {
                        codegen_bail!(
                            StringLiteralOverflow,
                            pos,
                            "literal of length {len} does not fit string<{capacity}>"
                        );
                    }
                }
                Ok(vec![
                    format!("strncpy({dst}, {src}, {capacity});"),
                    format!("{dst}[{capacity}] = '\\0';"),
                ])
            }
            _ => Err(anyhow!("not a string assignment")),
        }
    }

    pub(crate) fn lower_concat(
        &mut self,
        dst: &str,
        capacity: u32,
        value: &Expr,
        pos: Pos,
    ) -> Result<Vec<String>> {
        if !self.state.in_function_body {
            codegen_bail!(
                StringConcatAtGlobalScope,
                pos,
                "string concatenation requires a function body"
            );
        }
        let mut operands = Vec::new();
        flatten_concat(value, &mut operands);
        let mut shaped = Vec::with_capacity(operands.len());
        let mut total_capacity = Some(0u32);
        for operand in &operands {
            let (text, operand_capacity) = self.string_operand(operand)?;
            total_capacity = match (total_capacity, operand_capacity) {
                (Some(total), Some(cap)) => Some(total + cap),
                _ => None,
            };
            shaped.push(text);
        }
        if let Some(total) = total_capacity {
            if total > capacity {
                codegen_bail!(
                    StringCapacityInsufficient,
                    pos,
                    "concatenation needs {total} bytes but the target holds {capacity}"
                );
            }
        }
        let mut lines = Vec::with_capacity(shaped.len() + 1);
        for (index, text) in shaped.iter().enumerate() {
            if index == 0 {
                lines.push(format!("strncpy({dst}, {text}, {capacity});"));
            } else {
                lines.push(format!(
                    "strncat({dst}, {text}, {capacity} - strlen({dst}));"
                ));
            }
        }
        lines.push(format!("{dst}[{capacity}] = '\\0';"));
        Ok(lines)
    }

    fn lower_substring(
        &mut self,
        dst: &str,
        dst_capacity: u32,
        value: &Expr,
        pos: Pos,
    ) -> Result<Vec<String>> {
        let Expr::Path(chain) = value else {
            return Err(anyhow!("substring source must be a string"));
        };
        let source_chain = PostfixChain {
            prefix: chain.prefix,
            segments: vec![crate::ast::Segment::plain(
                &chain.segments[0].name,
            )],
            pos,
        };
        let source = self.gen_chain(&source_chain, false)?;
        let source_capacity =
            source.ty.as_ref().and_then(|t| t.string_capacity);
        let group = &chain.segments[0].subscripts[0];
        let [start, length] = group.exprs.as_slice() else {
            return Err(anyhow!("substring takes [start, length]"));
        };
        if let (Some(start_v), Some(length_v)) =
            (literal::fold(start), literal::fold(length))
        {
            if start_v < 0 || length_v < 0 {
                codegen_bail!(
                    SubstringOutOfRange,
                    pos,
                    "substring bounds cannot be negative"
                );
            }
            if let Some(src_cap) = source_capacity {
                if start_v + length_v > i128::from(src_cap) {
                    codegen_bail!(
                        SubstringOutOfRange,
                        pos,
                        "substring [{start_v}, {length_v}] exceeds string<{src_cap}>"
                    );
                }
            }
            if length_v > i128::from(dst_capacity) {
                codegen_bail!(
                    SubstringDestOverflow,
                    pos,
                    "substring of length {length_v} does not fit string<{dst_capacity}>"
                );
            }
        }
        let start = self.gen_expr_expecting(start, None)?;
        let length = self.gen_expr_expecting(length, None)?;
        Ok(vec![
            format!(
                "strncpy({dst}, {src} + {start}, {length});",
                src = source.text
            ),
            format!("{dst}[{length}] = '\\0';"),
        ])
    }

    /// Text and compile-time capacity of a string-valued operand.
    pub(crate) fn string_operand(
        &mut self,
        expr: &Expr,
    ) -> Result<(String, Option<u32>)> {
        match expr {
            Expr::StringLit { value, .. } => {
                let text = self.gen_expr(expr)?;
                Ok((text, Some(value.len() as u32)))
            }
            Expr::Path(chain) => {
                let lv = self.gen_chain(chain, false)?;
                let capacity =
                    lv.ty.as_ref().and_then(|t| t.string_capacity);
                Ok((lv.text, capacity))
            }
            _ => Err(anyhow!("expected a string operand")),
        }
    }
}

fn flatten_concat<'e>(expr: &'e Expr, out: &mut Vec<&'e Expr>) {
    match expr {
        Expr::Binary {
            op: BinaryOp::Add,
            lhs,
            rhs,
            ..
        } => {
            flatten_concat(lhs, out);
            flatten_concat(rhs, out);
        }
        other => out.push(other),
    }
}
