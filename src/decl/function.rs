//! Function emission and the parameter formatter shared with the
//! header pass.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::ast::Function;
use crate::expr::deref::parameter_mode;
use crate::gen::Codegen;
use crate::symbol::{scoped_name, Visibility};
use crate::ty::{BaseType, ParamMode, ParameterInfo, TypeInfo};

/// Everything the formatter needs to spell one parameter.
#[derive(Debug, Clone)]
pub struct ParameterInput {
    pub name: String,
    pub ty: TypeInfo,
    pub mode: ParamMode,
    pub source_const: bool,
    pub auto_const: bool,
}

impl Codegen<'_> {
    fn function_c_name(&self, function: &Function) -> String {
        match &self.state.current_scope {
            Some(scope) => scoped_name(scope, &function.name),
            None => function.name.clone(),
        }
    }

    fn build_parameters(
        &mut self,
        c_name: &str,
        function: &Function,
    ) -> Result<Vec<ParameterInput>> {
        let sig = self.symbols.function(c_name).cloned();
        let mut inputs = Vec::with_capacity(function.params.len());
        for (index, param) in function.params.iter().enumerate() {
            let mut ty = self.type_info_from_expr(&param.ty, param.pos)?;
            ty.is_parameter = true;
            let force_pointer = sig
                .as_ref()
                .and_then(|s| s.params.get(index))
                .map(|p| p.force_pointer)
                .unwrap_or(false);
            let by_value = self.state.param_by_value(c_name, &param.name);
            let mode =
                parameter_mode(self.symbols, &ty, force_pointer, by_value);
            let modified = self.state.param_modified(c_name, &param.name);
            inputs.push(ParameterInput {
                name: param.name.clone(),
                source_const: ty.is_const,
                auto_const: !modified,
                ty,
                mode,
            });
        }
        Ok(inputs)
    }

    /// One parameter in the ADR-006 shapes of the target language.
    pub fn format_parameter(&mut self, input: &ParameterInput) -> String {
        let constness = if input.source_const || input.auto_const {
            "const "
        } else {
            ""
        };
        if let BaseType::Named(type_name) = &input.ty.base {
            if self.symbols.callback(type_name).is_some() {
                return format!("{type_name} {name}", name = input.name);
            }
        }
        if input.ty.is_string {
            return format!("{constness}char* {name}", name = input.name);
        }
        if input.ty.is_array {
            let element = self.declared_type_text(&input.ty.element());
            let dims: String = input
                .ty
                .array_dims
                .iter()
                .map(|&d| {
                    if d == 0 {
                        "[]".to_owned()
                    } else {
                        format!("[{d}]")
                    }
                })
                .collect();
            return format!(
                "{constness}{element} {name}{dims}",
                name = input.name
            );
        }
        let type_text = self.declared_type_text(&input.ty);
        match input.mode {
            ParamMode::CallbackPointerPrimitive => {
                format!("{type_text}* {name}", name = input.name)
            }
            ParamMode::ByValue => {
                format!("{constness}{type_text} {name}", name = input.name)
            }
            ParamMode::ByReference => {
                if self.cpp() {
                    format!(
                        "{constness}{type_text}& {name}",
                        name = input.name
                    )
                } else {
                    format!(
                        "{constness}{type_text}* {name}",
                        name = input.name
                    )
                }
            }
        }
    }

    fn format_signature(
        &mut self,
        scope: Option<&str>,
        function: &Function,
    ) -> Result<(String, Vec<ParameterInput>)> {
        let c_name = match scope {
            Some(scope) => scoped_name(scope, &function.name),
            None => function.name.clone(),
        };
        let inputs = self.build_parameters(&c_name, function)?;
        let params = if inputs.is_empty() {
            if self.cpp() {
                String::new()
            } else {
                "void".to_owned()
            }
        } else {
            let mut parts = Vec::with_capacity(inputs.len());
            for input in &inputs {
                parts.push(self.format_parameter(input));
            }
            parts.join(", ")
        };
        let return_text = match &function.ret {
            Some(ret) => {
                let info = self.type_info_from_expr(ret, function.pos)?;
                self.declared_type_text(&info)
            }
            None => "void".to_owned(),
        };
        let is_static = scope.is_some_and(|scope| {
            self.symbols.member_visibility(scope, &function.name)
                == Visibility::Private
        });
        let prefix = if is_static { "static " } else { "" };
        Ok((
            format!("{prefix}{return_text} {c_name}({params})"),
            inputs,
        ))
    }

    pub(crate) fn format_prototype(
        &mut self,
        scope: Option<&str>,
        function: &Function,
    ) -> Result<String> {
        let (signature, _) = self.format_signature(scope, function)?;
        Ok(format!("{signature};"))
    }

    pub(crate) fn emit_function(&mut self, function: &Function) -> Result<()> {
        let c_name = self.function_c_name(function);
        let scope = self.state.current_scope.clone();
        let (signature, inputs) =
            self.format_signature(scope.as_deref(), function)?;

        let mut parameters = BTreeMap::new();
        for input in inputs {
            let mut ty = input.ty;
            ty.is_const = ty.is_const || input.auto_const;
            parameters.insert(
                input.name.clone(),
                ParameterInfo {
                    ty,
                    mode: input.mode,
                },
            );
        }
        let return_type = match &function.ret {
            Some(ret) => Some(self.type_info_from_expr(ret, function.pos)?),
            None => None,
        };

        self.line(&format!("{signature} {{"));
        self.indent += 1;
        let frame =
            self.state
                .enter_function(&c_name, parameters, return_type);
        let result = self.emit_block_stmts(&function.body);
        self.state.exit_function(frame);
        self.indent -= 1;
        self.line("}");
        result
    }
}
