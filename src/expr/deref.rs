//! Parameter shaping: whether a parameter travels by value or by
//! reference, and how a read of it spells in the target language.

use crate::gen::Codegen;
use crate::symbol::SymbolTable;
use crate::ty::{BaseType, ParamMode, ParameterInfo, TypeInfo};

/// Decide how a parameter of the given type travels. `by_value_opt` is
/// the call-graph verdict for the small-primitive optimization.
pub(crate) fn parameter_mode(
    symbols: &SymbolTable,
    ty: &TypeInfo,
    force_pointer: bool,
    by_value_opt: bool,
) -> ParamMode {
    if force_pointer {
        return ParamMode::CallbackPointerPrimitive;
    }
    if ty.is_array || ty.is_string || ty.is_enum {
        return ParamMode::ByValue;
    }
    match &ty.base {
        BaseType::F32 | BaseType::F64 | BaseType::F96 => ParamMode::ByValue,
        BaseType::Isr => ParamMode::ByValue,
        BaseType::Named(name) => {
            if symbols.callback(name).is_some() {
                ParamMode::ByValue
            } else if symbols.is_struct(name) {
                ParamMode::ByReference
            } else {
                // unknown/external type: leave it alone
                ParamMode::ByValue
            }
        }
        base if base.is_integer() || *base == BaseType::Bool => {
            if by_value_opt {
                ParamMode::ByValue
            } else {
                ParamMode::ByReference
            }
        }
        _ => ParamMode::ByValue,
    }
}

impl Codegen<'_> {
    /// Spell a read of a parameter in an rvalue position.
    pub(crate) fn param_read_text(
        &self,
        name: &str,
        info: &ParameterInfo,
    ) -> String {
        match info.mode {
            ParamMode::CallbackPointerPrimitive => format!("(*{name})"),
            ParamMode::ByValue => name.to_owned(),
            ParamMode::ByReference => {
                // struct members go through `->`, never `(*p)`
                if let BaseType::Named(type_name) = &info.ty.base {
                    if self.symbols.is_struct(type_name) {
                        return name.to_owned();
                    }
                }
                if self.cpp() {
                    name.to_owned()
                } else {
                    format!("(*{name})")
                }
            }
        }
    }
}
