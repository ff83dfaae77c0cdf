//! Float bit access through memcpy-type-punned shadow integers, with
//! redundant-copy suppression.

use anyhow::{anyhow, Result};

use crate::assign::bits::strip_subscripts;
use crate::ast::{AssignStmt, Pos};
use crate::codegen_bail;
use crate::expr::member::shadow_view_type;
use crate::gen::Codegen;
use crate::include::IncludeTag;
use crate::ty::TypeInfo;

/// Shadow integer name for a float lvalue; `(*p)` style reads collapse
/// to the bare identifier.
pub(crate) fn shadow_name(lvalue: &str) -> String {
    let mut name = String::from("__bits_");
    for c in lvalue.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            name.push(c);
        }
    }
    name
}

impl Codegen<'_> {
    /// Ensure the shadow for `var_text` exists and currently holds the
    /// float's bit pattern; returns the shadow name. Queues the
    /// declaration and the loading memcpy ahead of the statement.
    pub(crate) fn float_shadow_load(
        &mut self,
        var_text: &str,
        ty: &TypeInfo,
        pos: Pos,
    ) -> Result<String> {
        if !self.state.in_function_body {
            codegen_bail!(
                FloatBitAtGlobalScope,
                pos,
                "float bit access requires a function body"
            );
        }
        self.state.includes.request(IncludeTag::String);
        self.state.includes.request(IncludeTag::FloatStaticAssert);
        let shadow = shadow_name(var_text);
        if self.state.float_shadows.insert(shadow.clone()) {
            let view = shadow_view_type(ty);
            let c_type = self.c_type_of(&view.base);
            self.state
                .pending_lines
                .push(format!("{c_type} {shadow};"));
        }
        if !self.state.float_shadow_current.contains(&shadow) {
            self.state.pending_lines.push(format!(
                "memcpy(&{shadow}, &{var_text}, sizeof({var_text}));"
            ));
            self.state.float_shadow_current.insert(shadow.clone());
        }
        Ok(shadow)
    }

    pub(crate) fn lower_float_bit(
        &mut self,
        stmt: &AssignStmt,
    ) -> Result<Vec<String>> {
        let pos = stmt.pos;
        let bare = strip_subscripts(&stmt.target);
        let lv = self.gen_chain(&bare, true)?;
        let ty = lv
            .ty
            .ok_or_else(|| anyhow!("float bit target has unknown type"))?;
        self.check_const_target(&stmt.target, Some(&ty), pos)?;

        let shadow = self.float_shadow_load(&lv.text, &ty, pos)?;
        let view = shadow_view_type(&ty);
        let group = &stmt.target.segments[0].subscripts[0];
        let rmw = self.bit_write_line(
            &shadow,
            &view.base,
            view.bit_width,
            group,
            &stmt.value,
            pos,
        )?;
        let write_back = format!(
            "memcpy(&{var}, &{shadow}, sizeof({var}));",
            var = lv.text
        );
        self.state.float_shadow_current.insert(shadow);
        Ok(vec![rmw, write_back])
    }
}
