//! Plain assignments: simple identifiers, scope/global members, member
//! chains and prefixed array elements.

use anyhow::Result;

use crate::ast::{AssignOp, AssignStmt};
use crate::assign::float_bits::shadow_name;
use crate::cast;
use crate::gen::Codegen;

impl Codegen<'_> {
    pub(crate) fn lower_simple(
        &mut self,
        stmt: &AssignStmt,
    ) -> Result<Vec<String>> {
        let pos = stmt.pos;
        let lv = self.gen_chain(&stmt.target, true)?;
        self.check_const_target(&stmt.target, lv.ty.as_ref(), pos)?;

        let Some(ty) = lv.ty else {
            let rhs = self.gen_expr_expecting(&stmt.value, None)?;
            return Ok(vec![format!(
                "{} {} {};",
                lv.text,
                stmt.op.c_token(),
                rhs
            )]);
        };

        if ty.is_atomic && stmt.op == AssignOp::Set {
            let rhs = self.assign_rhs(&ty, &stmt.value, pos)?;
            return Ok(vec![self.atomic_store_line(&lv.text, &rhs)]);
        }

        if stmt.op.is_compound() {
            let rhs = if matches!(stmt.op, AssignOp::Shl | AssignOp::Shr) {
                cast::validate_shift_amount(&ty.base, &stmt.value, pos)?;
                self.gen_expr_expecting(&stmt.value, None)?
            } else {
                self.assign_rhs(&ty, &stmt.value, pos)?
            };
            return Ok(vec![format!(
                "{} {} {};",
                lv.text,
                stmt.op.c_token(),
                rhs
            )]);
        }

        // a direct store makes any float shadow stale
        if ty.is_float() {
            let shadow = shadow_name(&lv.text);
            self.state.float_shadow_current.remove(&shadow);
        }

        let rhs = self.assign_rhs(&ty, &stmt.value, pos)?;
        Ok(vec![format!("{} = {};", lv.text, rhs)])
    }
}
