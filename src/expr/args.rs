//! Call emission and pass-by-reference argument shaping.

use anyhow::{anyhow, Result};

use crate::ast::{CallExpr, Expr, PostfixChain, Pos};
use crate::codegen_bail;
use crate::expr::deref::parameter_mode;
use crate::gen::Codegen;
use crate::symbol::{CallbackSignature, FunctionSig, SigParam, SourceLanguage};
use crate::ty::{BaseType, ParamMode, TypeInfo};

impl Codegen<'_> {
    pub(crate) fn gen_call_expr(&mut self, call: &CallExpr) -> Result<String> {
        let name = self.resolver().callee_name(&call.callee);
        let sig = self.symbols.function(&name).cloned();

        let args = match &sig {
            Some(sig) if sig.language == SourceLanguage::CNext => {
                if sig.params.len() != call.args.len() {
                    return Err(anyhow!(
                        "{name} takes {} arguments, {} given",
                        sig.params.len(),
                        call.args.len()
                    ));
                }
                let mut shaped = Vec::with_capacity(call.args.len());
                for (formal, arg) in sig.params.iter().zip(&call.args) {
                    shaped.push(self.shape_argument(
                        &name, sig, formal, arg, call.pos,
                    )?);
                }
                shaped
            }
            _ => {
                // external (or unknown) callee keeps C semantics
                let mut plain = Vec::with_capacity(call.args.len());
                for (index, arg) in call.args.iter().enumerate() {
                    let expected = sig
                        .as_ref()
                        .and_then(|s| s.params.get(index))
                        .map(|p| p.ty.clone());
                    plain.push(self.gen_expr_expecting(arg, expected)?);
                }
                plain
            }
        };
        Ok(format!("{name}({})", args.join(", ")))
    }

    fn shape_argument(
        &mut self,
        callee: &str,
        _sig: &FunctionSig,
        formal: &SigParam,
        arg: &Expr,
        pos: Pos,
    ) -> Result<String> {
        // callbacks pass the function name verbatim, after validation
        if let BaseType::Named(typedef) = &formal.ty.base {
            if let Some(callback) = self.symbols.callback(typedef).cloned() {
                return self.shape_callback_argument(typedef, &callback, arg, pos);
            }
        }
        let by_value = self.state.param_by_value(callee, &formal.name);
        let mode = parameter_mode(
            self.symbols,
            &formal.ty,
            formal.force_pointer,
            by_value,
        );
        match mode {
            ParamMode::ByValue => {
                self.gen_expr_expecting(arg, Some(formal.ty.clone()))
            }
            ParamMode::ByReference | ParamMode::CallbackPointerPrimitive => {
                self.shape_reference_argument(formal, arg)
            }
        }
    }

    fn shape_reference_argument(
        &mut self,
        formal: &SigParam,
        arg: &Expr,
    ) -> Result<String> {
        let cpp = self.cpp();
        if let Expr::Path(chain) = arg {
            if chain.is_simple() {
                let root = &chain.segments[0].name;
                if let Some(param) = self.state.parameter(root).cloned() {
                    return Ok(match param.mode {
                        // already a pointer/reference; forward it
                        ParamMode::ByReference
                        | ParamMode::CallbackPointerPrimitive => root.clone(),
                        ParamMode::ByValue if cpp => root.clone(),
                        ParamMode::ByValue => format!("&{root}"),
                    });
                }
                if self.state.local_arrays.contains(root) {
                    return Ok(root.clone());
                }
            }
            if self.chain_is_plain_lvalue(chain) {
                let lv = self.gen_chain(chain, false)?;
                if lv.ty.as_ref().is_some_and(|t| t.is_array) {
                    return Ok(lv.text);
                }
                // a char element cannot alias a wider pointee directly
                let from_string = lv
                    .ty
                    .as_ref()
                    .is_some_and(|t| t.base == BaseType::Char)
                    && formal.ty.base != BaseType::Char
                    && formal.ty.base.is_integer();
                if from_string {
                    let c_type = self.c_type_of(&formal.ty.base);
                    return Ok(if cpp {
                        format!(
                            "*reinterpret_cast<{c_type}*>(&{text})",
                            text = lv.text
                        )
                    } else {
                        format!("({c_type}*)&{text}", text = lv.text)
                    });
                }
                if formal.ty.base == BaseType::U8
                    && self.lvalue_roots_external_struct(chain)
                {
                    return self.external_member_temp(&lv.text);
                }
                return Ok(if cpp {
                    lv.text
                } else {
                    format!("&{text}", text = lv.text)
                });
            }
        }
        // rvalue: bind through a compound literal in C, directly in C++
        let value =
            self.gen_expr_expecting(arg, Some(formal.ty.clone()))?;
        if cpp {
            Ok(value)
        } else {
            let c_type = self.c_type_of(&formal.ty.base);
            Ok(format!("&({c_type}){{{value}}}"))
        }
    }

    fn shape_callback_argument(
        &mut self,
        typedef: &str,
        callback: &CallbackSignature,
        arg: &Expr,
        pos: Pos,
    ) -> Result<String> {
        let Expr::Path(chain) = arg else {
            codegen_bail!(
                CallbackSignatureMismatch,
                pos,
                "callback arguments must name a function"
            );
        };
        let name = self.resolver().callee_name(chain);
        let Some(function) = self.symbols.function(&name) else {
            // externally declared handler; trust the header
            return Ok(name);
        };
        if let Some(nominal) = &function.callback_type {
            if nominal != typedef {
                codegen_bail!(
                    CallbackNominalMismatch,
                    pos,
                    "{name} implements {nominal}, not {typedef}"
                );
            }
        }
        if !signature_matches(function, callback) {
            codegen_bail!(
                CallbackSignatureMismatch,
                pos,
                "{name} does not match the {typedef} signature"
            );
        }
        Ok(name)
    }

    /// A chain that lowers to a plain C lvalue: struct members and
    /// array/string elements only, no bitmap fields or bit ranges.
    pub(crate) fn chain_is_plain_lvalue(&self, chain: &PostfixChain) -> bool {
        let resolver = self.resolver();
        let Some(mut ty) = resolver.root_type(chain) else {
            return false;
        };
        for (index, segment) in chain.segments.iter().enumerate() {
            if index > 0 {
                if ty.is_bitmap {
                    return false;
                }
                let BaseType::Named(type_name) = &ty.base else {
                    return false;
                };
                let Some(field) = self
                    .symbols
                    .struct_def(type_name)
                    .and_then(|def| def.field(&segment.name))
                else {
                    return false;
                };
                ty = field.ty.clone();
            }
            for group in &segment.subscripts {
                if group.exprs.len() != 1 {
                    return false;
                }
                if ty.is_string {
                    ty = TypeInfo::of(BaseType::Char);
                } else if ty.is_array {
                    ty = ty.element();
                } else {
                    // a subscript on a scalar is a bit access
                    return false;
                }
            }
        }
        true
    }

    fn lvalue_roots_external_struct(&self, chain: &PostfixChain) -> bool {
        if chain.segments.len() < 2 {
            return false;
        }
        let Some(root) = self.resolver().root_type(chain) else {
            return false;
        };
        let BaseType::Named(type_name) = &root.base else {
            return false;
        };
        self.symbols
            .struct_def(type_name)
            .is_some_and(|def| def.language != SourceLanguage::CNext)
    }

    /// `uint8_t _cnx_tmp_N = (uint8_t)(expr);` hoisted before the
    /// statement, passing `&_cnx_tmp_N`.
    fn external_member_temp(&mut self, expr: &str) -> Result<String> {
        let temp = self.state.next_temp();
        let u8_type = self.c_type_of(&BaseType::U8);
        let line = if self.cpp() {
            format!("{u8_type} {temp} = static_cast<{u8_type}>({expr});")
        } else {
            format!("{u8_type} {temp} = ({u8_type})({expr});")
        };
        self.state.pending_lines.push(line);
        Ok(format!("&{temp}"))
    }
}

fn signature_matches(
    function: &FunctionSig,
    callback: &CallbackSignature,
) -> bool {
    let return_matches = match (&function.return_type, &callback.return_type) {
        (None, None) => true,
        (Some(f), Some(c)) => f.base == *c,
        _ => false,
    };
    if !return_matches {
        return false;
    }
    if function.params.len() != callback.params.len() {
        return false;
    }
    function
        .params
        .iter()
        .zip(&callback.params)
        .all(|(f, c)| f.ty.base == c.base && f.force_pointer == c.is_pointer)
}
