//! Atomic stores and read-modify-write lowering, C11 `stdatomic` in C
//! mode, `std::atomic` member calls in C++ mode.

use anyhow::{anyhow, Result};

use crate::assign::bits::strip_subscripts;
use crate::ast::{AssignOp, AssignStmt};
use crate::gen::Codegen;
use crate::include::IncludeTag;

impl Codegen<'_> {
    pub(crate) fn atomic_store_line(&mut self, lhs: &str, rhs: &str) -> String {
        self.state.includes.request(IncludeTag::Stdatomic);
        if self.cpp() {
            format!("{lhs}.store({rhs}, std::memory_order_seq_cst);")
        } else {
            format!("atomic_store_explicit(&{lhs}, {rhs}, memory_order_seq_cst);")
        }
    }

    pub(crate) fn lower_atomic_rmw(
        &mut self,
        stmt: &AssignStmt,
    ) -> Result<Vec<String>> {
        let pos = stmt.pos;
        self.state.includes.request(IncludeTag::Stdatomic);
        let bare = strip_subscripts(&stmt.target);
        let lv = self.gen_chain(&bare, true)?;
        let ty = lv
            .ty
            .ok_or_else(|| anyhow!("atomic target has unknown type"))?;
        self.check_const_target(&stmt.target, Some(&ty), pos)?;
        let rhs = self.gen_expr_expecting(&stmt.value, Some(ty.clone()))?;

        let fetch = match stmt.op {
            AssignOp::Add => Some("add"),
            AssignOp::Sub => Some("sub"),
            AssignOp::BitAnd => Some("and"),
            AssignOp::BitOr => Some("or"),
            AssignOp::BitXor => Some("xor"),
            _ => None,
        };
        if let Some(op) = fetch {
            return Ok(vec![if self.cpp() {
                format!(
                    "{lhs}.fetch_{op}({rhs}, std::memory_order_seq_cst);",
                    lhs = lv.text
                )
            } else {
                format!(
                    "atomic_fetch_{op}_explicit(&{lhs}, {rhs}, memory_order_seq_cst);",
                    lhs = lv.text
                )
            }]);
        }

        // no fetch form exists; load, apply, store
        let temp = self.state.next_temp();
        let c_type = self.c_type_of(&ty.base);
        let token = stmt.op.c_token();
        Ok(if self.cpp() {
            vec![
                format!(
                    "{c_type} {temp} = {lhs}.load(std::memory_order_seq_cst);",
                    lhs = lv.text
                ),
                format!("{temp} {token} {rhs};"),
                format!(
                    "{lhs}.store({temp}, std::memory_order_seq_cst);",
                    lhs = lv.text
                ),
            ]
        } else {
            vec![
                format!(
                    "{c_type} {temp} = atomic_load_explicit(&{lhs}, memory_order_seq_cst);",
                    lhs = lv.text
                ),
                format!("{temp} {token} {rhs};"),
                format!(
                    "atomic_store_explicit(&{lhs}, {temp}, memory_order_seq_cst);",
                    lhs = lv.text
                ),
            ]
        })
    }
}
