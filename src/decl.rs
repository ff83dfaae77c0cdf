//! Declaration emission: variables, strings, arrays, functions and
//! type definitions.

pub(crate) mod array;
pub(crate) mod function;
pub(crate) mod string;
pub(crate) mod types;
pub(crate) mod var;

use anyhow::Result;

use crate::ast::{Pos, TypeExpr};
use crate::codegen_bail;
use crate::gen::Codegen;
use crate::literal::ArrayDimensionParser;
use crate::symbol::SourceLanguage;
use crate::ty::{BaseType, TypeInfo};

impl Codegen<'_> {
    /// Resolve a declared source type against the symbol table.
    pub(crate) fn type_info_from_expr(
        &self,
        ty: &TypeExpr,
        pos: Pos,
    ) -> Result<TypeInfo> {
        if ty.is_atomic && ty.is_volatile {
            codegen_bail!(
                ModifierConflict,
                pos,
                "atomic and volatile are mutually exclusive"
            );
        }
        let mut info = if ty.base == "string" {
            let capacity = ty.string_capacity.unwrap_or(0);
            let mut info = TypeInfo::string_of(capacity);
            if capacity == 0 {
                // unsized; the emitter infers from the initializer
                info.string_capacity = None;
                info.array_dims = Vec::new();
            }
            info
        } else {
            let base = BaseType::from_name(&ty.base);
            let mut info = TypeInfo::of(base.clone());
            if let BaseType::Named(name) = &base {
                if self.symbols.is_enum(name) {
                    info.is_enum = true;
                    info.enum_type = Some(name.clone());
                } else if self.symbols.is_bitmap(name) {
                    let def = self
                        .symbols
                        .bitmap(name)
                        .expect("known bitmap has a definition");
                    info.is_bitmap = true;
                    info.bitmap_type = Some(name.clone());
                    info.bit_width = def.bit_width;
                } else if let Some(def) = self.symbols.struct_def(name) {
                    info.is_external_cpp = def.language == SourceLanguage::Cpp;
                }
            }
            info
        };
        if !ty.array_dims.is_empty() {
            info.array_dims = ArrayDimensionParser::parse(&ty.array_dims, pos)?;
            info.is_array = true;
        }
        info.is_const = ty.is_const;
        info.is_volatile = info.is_volatile || ty.is_volatile;
        info.is_atomic = ty.is_atomic;
        info.overflow = ty.overflow;
        Ok(info)
    }

    /// Modifier prefix in canonical `extern const volatile` order.
    /// `extern` appears on top-level const in C++ mode, or in C mode
    /// when there is no initializer (MISRA 8.5); `static` (scope
    /// privacy) suppresses it.
    pub(crate) fn modifier_prefix(
        &self,
        info: &TypeInfo,
        top_level: bool,
        has_init: bool,
        is_static: bool,
    ) -> String {
        let mut out = String::new();
        if is_static {
            out.push_str("static ");
        } else if top_level
            && info.is_const
            && (self.cpp() || !has_init)
        {
            out.push_str("extern ");
        }
        if info.is_const {
            out.push_str("const ");
        }
        if info.is_volatile {
            out.push_str("volatile ");
        }
        out
    }

    /// Spelled type of a scalar declaration, folding in atomics.
    pub(crate) fn declared_type_text(&mut self, info: &TypeInfo) -> String {
        let base = self.c_type_of(&info.base);
        if info.is_atomic {
            self.state
                .includes
                .request(crate::include::IncludeTag::Stdatomic);
            if self.cpp() {
                return format!("std::atomic<{base}>");
            }
            return format!("_Atomic({base})");
        }
        base
    }
}
