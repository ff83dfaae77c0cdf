//! Array element and slice stores.

use anyhow::{anyhow, Result};

use crate::ast::{AssignStmt, Expr};
use crate::codegen_bail;
use crate::gen::Codegen;
use crate::include::IncludeTag;
use crate::literal;

impl Codegen<'_> {
    pub(crate) fn lower_array_element(
        &mut self,
        stmt: &AssignStmt,
    ) -> Result<Vec<String>> {
        let pos = stmt.pos;
        let lv = self.gen_chain(&stmt.target, true)?;
        let ty = lv
            .ty
            .ok_or_else(|| anyhow!("array element has unknown type"))?;
        self.check_const_target(&stmt.target, Some(&ty), pos)?;
        let rhs = self.assign_rhs(&ty, &stmt.value, pos)?;
        Ok(vec![format!("{} = {};", lv.text, rhs)])
    }

    /// `dst[start, len] <- src` copies a run of elements.
    pub(crate) fn lower_array_slice(
        &mut self,
        stmt: &AssignStmt,
    ) -> Result<Vec<String>> {
        let pos = stmt.pos;
        let root_chain = crate::assign::bits::strip_subscripts(&stmt.target);
        let lv = self.gen_chain(&root_chain, true)?;
        let ty = lv
            .ty
            .ok_or_else(|| anyhow!("array slice target has unknown type"))?;
        self.check_const_target(&stmt.target, Some(&ty), pos)?;

        let group = &stmt.target.segments[0].subscripts[0];
        let [start, length] = group.exprs.as_slice() else {
            return Err(anyhow!("array slices take [start, length]"));
        };
        if let (Some(start_v), Some(length_v), Some(&dim)) = (
            literal::fold(start),
            literal::fold(length),
            ty.array_dims.first(),
        ) {
            if dim > 0
                && (start_v < 0
                    || length_v < 0
                    || start_v + length_v > i128::from(dim))
            {
                codegen_bail!(
                    ArrayIndexOutOfBounds,
                    pos,
                    "slice [{start_v}, {length_v}] exceeds [{dim}]"
                );
            }
        }
        let source = match &stmt.value {
            Expr::Path(chain) => self.gen_chain(chain, false)?.text,
            other => self.gen_expr(other)?,
        };
        let start = self.gen_expr_expecting(start, None)?;
        let length = self.gen_expr_expecting(length, None)?;
        self.state.includes.request(IncludeTag::String);
        Ok(vec![format!(
            "memcpy(&{dst}[{start}], {source}, {length} * sizeof({dst}[0]));",
            dst = lv.text
        )])
    }
}
