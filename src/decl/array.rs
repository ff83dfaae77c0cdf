//! Array declarations: dimension inference, fill expansion and element
//! count validation.

use anyhow::{anyhow, Result};

use crate::ast::{Expr, VarDecl};
use crate::codegen_bail;
use crate::gen::Codegen;
use crate::ty::TypeInfo;

impl Codegen<'_> {
    pub(crate) fn array_decl_lines(
        &mut self,
        decl: &VarDecl,
        name: &str,
        mut info: TypeInfo,
        is_static: bool,
    ) -> Result<Vec<String>> {
        let pos = decl.pos;
        let element = info.element();

        let init_text = match &decl.init {
            Some(init @ (Expr::ArrayLit { .. } | Expr::ArrayFill { .. })) => {
                let rendered =
                    self.gen_expr_expecting(init, Some(element.clone()))?;
                let count = self
                    .state
                    .last_array_init_count
                    .take()
                    .unwrap_or_default();
                let fill = self.state.last_array_fill.take();
                match fill {
                    None => {
                        // explicit element list
                        let declared = info.array_dims.first().copied();
                        match declared {
                            Some(0) | None => {
                                if count == 0 {
                                    codegen_bail!(
                                        ArraySizeMismatch,
                                        pos,
                                        "cannot infer the size of `{name}` from an empty initializer"
                                    );
                                }
                                if info.array_dims.is_empty() {
                                    info.array_dims.push(count as u32);
                                } else {
                                    info.array_dims[0] = count as u32;
                                }
                            }
                            Some(declared) => {
                                if count as u32 != declared {
                                    codegen_bail!(
                                        ArraySizeMismatch,
                                        pos,
                                        "`{name}` declares {declared} elements but the initializer has {count}"
                                    );
                                }
                            }
                        }
                        Some(rendered)
                    }
                    Some(fill) => {
                        // `[v*]`: `{0}` aggregate-zero stays folded,
                        // anything else expands to the declared size
                        if fill == "0" || fill == "0U" {
                            Some("{0}".to_owned())
                        } else {
                            let Some(&dim) = info.array_dims.first() else {
                                codegen_bail!(
                                    ArraySizeMismatch,
                                    pos,
                                    "fill-all initializer for `{name}` needs a declared size"
                                );
                            };
                            if dim == 0 {
                                codegen_bail!(
                                    ArraySizeMismatch,
                                    pos,
                                    "fill-all initializer for `{name}` needs a declared size"
                                );
                            }
                            let elements =
                                vec![fill.as_str(); dim as usize].join(", ");
                            Some(format!("{{{elements}}}"))
                        }
                    }
                }
            }
            Some(other) => {
                return Err(anyhow!(
                    "array `{name}` cannot initialize from {other:?}"
                ))
            }
            None => Some("{0}".to_owned()),
        };

        if info.array_dims.iter().any(|&d| d == 0) {
            codegen_bail!(
                ArraySizeMismatch,
                pos,
                "`{name}` has an unknown dimension"
            );
        }

        let modifiers =
            self.modifier_prefix(&info, false, decl.init.is_some(), is_static);
        let element_text = self.declared_type_text(&element);
        let dims: String = info
            .array_dims
            .iter()
            .map(|d| format!("[{d}]"))
            .collect();
        let line = match init_text {
            Some(init) => {
                format!("{modifiers}{element_text} {name}{dims} = {init};")
            }
            None => format!("{modifiers}{element_text} {name}{dims};"),
        };
        self.state.register_variable(name, info);
        Ok(vec![line])
    }
}
