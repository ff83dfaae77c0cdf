//! Variable declarations and their zero-initialization defaults.

use anyhow::{anyhow, Result};

use crate::ast::{Expr, VarDecl};
use crate::codegen_bail;
use crate::gen::Codegen;
use crate::symbol::{scoped_name, SourceLanguage, Visibility};
use crate::ty::{BaseType, TypeInfo};

impl Codegen<'_> {
    pub(crate) fn emit_global_var(&mut self, decl: &VarDecl) -> Result<()> {
        let lines = self.var_decl_lines(decl, true)?;
        self.flush_pending();
        for line in lines {
            self.line(&line);
        }
        Ok(())
    }

    pub(crate) fn var_decl_lines(
        &mut self,
        decl: &VarDecl,
        top_level: bool,
    ) -> Result<Vec<String>> {
        let pos = decl.pos;
        self.validate_array_decl_style(decl)?;
        let mut info = self.type_info_from_expr(&decl.ty, pos)?;

        let (name, is_static) = if top_level {
            match self.state.current_scope.clone() {
                Some(scope) => {
                    let private = self
                        .symbols
                        .member_visibility(&scope, &decl.name)
                        == Visibility::Private;
                    (scoped_name(&scope, &decl.name), private)
                }
                None => (decl.name.clone(), false),
            }
        } else {
            (decl.name.clone(), false)
        };

        if info.is_string {
            return self.string_decl_lines(decl, &name, info, is_static);
        }
        if info.is_array {
            return self.array_decl_lines(decl, &name, info, is_static);
        }

        let init_text = match &decl.init {
            Some(init) => {
                // aggregate-incompatible C++ classes initialize per
                // field after the declaration
                if self.cpp()
                    && info.is_external_cpp
                    && matches!(init, Expr::ArrayLit { .. })
                {
                    return self
                        .cpp_class_decl_lines(&name, &info, init, is_static);
                }
                Some(self.assign_rhs(&info, init, pos)?)
            }
            None => self.zero_init_text(&info, top_level),
        };

        let modifiers = self.modifier_prefix(
            &info,
            top_level,
            decl.init.is_some(),
            is_static,
        );
        let type_text = self.declared_type_text(&info);
        let line = match init_text {
            Some(init) => format!("{modifiers}{type_text} {name} = {init};"),
            None => format!("{modifiers}{type_text} {name};"),
        };
        self.state.register_variable(&name, info);
        Ok(vec![line])
    }

    /// MISRA-style zero defaults; `None` means no initializer at all
    /// (extern const declarations, C++ default construction).
    fn zero_init_text(
        &mut self,
        info: &TypeInfo,
        top_level: bool,
    ) -> Option<String> {
        if info.is_const && top_level && !self.cpp() {
            // lowered as an extern declaration, the definition lives
            // elsewhere
            return None;
        }
        if info.is_enum {
            let first = info
                .enum_type
                .as_ref()
                .and_then(|name| self.symbols.enum_def(name))
                .and_then(|def| def.members.first().cloned());
            if let (Some(member), Some(enum_name)) =
                (first, info.enum_type.as_ref())
            {
                return Some(scoped_name(enum_name, &member));
            }
            return Some("0".to_owned());
        }
        if info.is_bitmap {
            return Some("0U".to_owned());
        }
        match &info.base {
            BaseType::Bool => {
                self.state
                    .includes
                    .request(crate::include::IncludeTag::Stdbool);
                Some("false".to_owned())
            }
            BaseType::F32 => Some("0.0f".to_owned()),
            BaseType::F64 => Some("0.0".to_owned()),
            BaseType::F96 => Some("0.0L".to_owned()),
            base if base.is_unsigned() => {
                Some(if base.bit_width() > 32 { "0ULL" } else { "0U" }.to_owned())
            }
            base if base.is_signed() => Some("0".to_owned()),
            BaseType::Char => Some("'\\0'".to_owned()),
            BaseType::Isr => None,
            BaseType::Named(name) => {
                if self.symbols.is_struct(name) {
                    if self.cpp()
                        && self
                            .symbols
                            .struct_def(name)
                            .is_some_and(|d| d.language == SourceLanguage::Cpp)
                    {
                        // default constructor runs
                        None
                    } else {
                        Some("{0}".to_owned())
                    }
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// `T name;` followed by per-field assignments queued for the next
    /// statement boundary.
    fn cpp_class_decl_lines(
        &mut self,
        name: &str,
        info: &TypeInfo,
        init: &Expr,
        is_static: bool,
    ) -> Result<Vec<String>> {
        let Expr::ArrayLit { elements, .. } = init else {
            return Err(anyhow!("expected an aggregate initializer"));
        };
        let BaseType::Named(type_name) = &info.base else {
            return Err(anyhow!("expected a class type"));
        };
        let def = self
            .symbols
            .struct_def(type_name)
            .ok_or_else(|| anyhow!("unknown class {type_name}"))?
            .clone();
        if def.fields.len() != elements.len() {
            codegen_bail!(
                ArraySizeMismatch,
                init.pos(),
                "{type_name} has {} fields, {} initializers given",
                def.fields.len(),
                elements.len()
            );
        }
        for (field, element) in def.fields.iter().zip(elements) {
            let value =
                self.gen_expr_expecting(element, Some(field.ty.clone()))?;
            self.state
                .pending_cpp_assignments
                .push(format!("{name}.{field} = {value};", field = field.name));
        }
        let prefix = if is_static { "static " } else { "" };
        self.state.register_variable(name, info.clone());
        Ok(vec![format!("{prefix}{type_name} {name};")])
    }

    fn validate_array_decl_style(&self, decl: &VarDecl) -> Result<()> {
        if !decl.c_style_dims {
            return Ok(());
        }
        let dims = &decl.ty.array_dims;
        let qualified =
            decl.ty.is_const || decl.ty.is_volatile || decl.ty.is_atomic;
        let multi_dim = dims.len() > 1;
        let inferred_first = dims.first().is_some_and(|d| d.is_none());
        if multi_dim || qualified || inferred_first {
            return Ok(());
        }
        codegen_bail!(
            CStyleArrayDeclaration,
            decl.pos,
            "declare `{name}` with the type-first array form",
            name = decl.name
        );
    }
}
