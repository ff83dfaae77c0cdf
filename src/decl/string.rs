//! Bounded-string declarations: `string<N>` lowers to `char [N + 1]`
//! with explicit termination.

use anyhow::{anyhow, Result};

use crate::ast::{BinaryOp, Expr, VarDecl};
use crate::codegen_bail;
use crate::gen::Codegen;
use crate::ty::TypeInfo;

impl Codegen<'_> {
    pub(crate) fn string_decl_lines(
        &mut self,
        decl: &VarDecl,
        name: &str,
        mut info: TypeInfo,
        is_static: bool,
    ) -> Result<Vec<String>> {
        let pos = decl.pos;
        let capacity = match info.string_capacity {
            Some(capacity) => capacity,
            None => match &decl.init {
                // `string` (unsized) infers from its literal, const only
                Some(Expr::StringLit { value, .. }) if info.is_const => {
                    value.len() as u32
                }
                _ => {
                    return Err(anyhow!(
                        "unsized string `{name}` needs a const literal initializer"
                    ))
                }
            },
        };
        info.string_capacity = Some(capacity);
        info.array_dims = vec![capacity + 1];

        let modifiers =
            self.modifier_prefix(&info, false, decl.init.is_some(), is_static);
        let size = capacity + 1;

        let mut lines = Vec::new();
        match &decl.init {
            Some(init @ Expr::StringLit { value, .. }) => {
                if value.len() as u32 > capacity {
                    codegen_bail!(
                        StringLiteralOverflow,
                        pos,
                        "literal of length {} does not fit string<{capacity}>",
                        value.len()
                    );
                }
                let literal = self.gen_expr(init)?;
                lines.push(format!(
                    "{modifiers}char {name}[{size}] = {literal};"
                ));
            }
            Some(init @ Expr::Binary { op: BinaryOp::Add, .. }) => {
                // concatenation initializer: declare empty, then append
                lines.push(format!("{modifiers}char {name}[{size}] = \"\";"));
                self.state.register_variable(name, info);
                lines.extend(self.lower_concat(name, capacity, init, pos)?);
                return Ok(lines);
            }
            Some(other) => {
                lines.push(format!("{modifiers}char {name}[{size}] = \"\";"));
                self.state.register_variable(name, info);
                let (src, src_capacity) = self.string_operand(other)?;
                if src_capacity.is_some_and(|c| c > capacity) {
                    codegen_bail!(
                        StringCapacityInsufficient,
                        pos,
                        "string<{src}> does not fit string<{capacity}>",
                        src = src_capacity.unwrap_or(0)
                    );
                }
                lines.push(format!("strncpy({name}, {src}, {capacity});"));
                lines.push(format!("{name}[{capacity}] = '\\0';"));
                self.state
                    .includes
                    .request(crate::include::IncludeTag::String);
                return Ok(lines);
            }
            None => {
                lines.push(format!("{modifiers}char {name}[{size}] = \"\";"));
            }
        }
        self.state.register_variable(name, info);
        Ok(lines)
    }
}
