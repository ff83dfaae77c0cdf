use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

/// Integer widths a literal suffix may carry, `(u|i)(8|16|32|64)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u16)]
pub enum BitWidth {
    W8 = 8,
    W16 = 16,
    W32 = 32,
    W64 = 64,
}

/// The C-Next base type of a named value or expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    F96,
    Bool,
    Char,
    Isr,
    /// A user type: struct, enum, bitmap, callback typedef or external name.
    Named(String),
}

impl BaseType {
    pub fn from_name(name: &str) -> Self {
        match name {
            "u8" => Self::U8,
            "u16" => Self::U16,
            "u32" => Self::U32,
            "u64" => Self::U64,
            "i8" => Self::I8,
            "i16" => Self::I16,
            "i32" => Self::I32,
            "i64" => Self::I64,
            "f32" => Self::F32,
            "f64" => Self::F64,
            "f96" => Self::F96,
            "bool" => Self::Bool,
            "char" => Self::Char,
            "ISR" => Self::Isr,
            other => Self::Named(other.to_owned()),
        }
    }

    pub fn bit_width(&self) -> u16 {
        match self {
            Self::U8 | Self::I8 | Self::Bool | Self::Char => 8,
            Self::U16 | Self::I16 => 16,
            Self::U32 | Self::I32 | Self::F32 => 32,
            Self::U64 | Self::I64 | Self::F64 => 64,
            Self::F96 => 96,
            Self::Isr | Self::Named(_) => 0,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::U8
                | Self::U16
                | Self::U32
                | Self::U64
                | Self::I8
                | Self::I16
                | Self::I32
                | Self::I64
        )
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32 | Self::U64)
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::F32 | Self::F64 | Self::F96)
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, Self::Isr | Self::Named(_))
    }

    /// The C (or C++) spelling of this type.
    pub fn c_type(&self) -> &str {
        match self {
            Self::U8 => "uint8_t",
            Self::U16 => "uint16_t",
            Self::U32 => "uint32_t",
            Self::U64 => "uint64_t",
            Self::I8 => "int8_t",
            Self::I16 => "int16_t",
            Self::I32 => "int32_t",
            Self::I64 => "int64_t",
            Self::F32 => "float",
            Self::F64 => "double",
            Self::F96 => "long double",
            Self::Bool => "bool",
            Self::Char => "char",
            Self::Isr => "isr_handler_t",
            Self::Named(name) => name,
        }
    }

    /// The unsigned integer type of the same width, used for bit
    /// manipulation on integers and for float shadows.
    pub fn unsigned_counterpart(&self) -> BaseType {
        match self.bit_width() {
            8 => Self::U8,
            16 => Self::U16,
            64 => Self::U64,
            96 => Self::U64,
            _ => Self::U32,
        }
    }

    pub fn unsigned_of_width(width: u16) -> BaseType {
        match width {
            0..=8 => Self::U8,
            9..=16 => Self::U16,
            17..=32 => Self::U32,
            _ => Self::U64,
        }
    }

    /// Smallest signed type representing `value`, per the decimal literal
    /// rule.
    pub fn smallest_signed_for(value: i128) -> Option<BaseType> {
        match value {
            v if v >= i128::from(i8::MIN) && v <= i128::from(i8::MAX) => {
                Some(Self::I8)
            }
            v if v >= i128::from(i16::MIN) && v <= i128::from(i16::MAX) => {
                Some(Self::I16)
            }
            v if v >= i128::from(i32::MIN) && v <= i128::from(i32::MAX) => {
                Some(Self::I32)
            }
            v if v >= i128::from(i64::MIN) && v <= i128::from(i64::MAX) => {
                Some(Self::I64)
            }
            _ => None,
        }
    }

    /// Smallest unsigned type representing `value`, per the hex/binary
    /// literal rule.
    pub fn smallest_unsigned_for(value: u128) -> Option<BaseType> {
        match value {
            v if v <= u128::from(u8::MAX) => Some(Self::U8),
            v if v <= u128::from(u16::MAX) => Some(Self::U16),
            v if v <= u128::from(u32::MAX) => Some(Self::U32),
            v if v <= u128::from(u64::MAX) => Some(Self::U64),
            _ => None,
        }
    }
}

/// Split a literal's trailing type suffix, e.g. `"42u8"` into
/// `("42", U8)`. Returns `None` when no suffix is present.
pub fn split_type_suffix(text: &str) -> Option<(&str, BaseType)> {
    let idx = text.rfind(['u', 'i'])?;
    let (body, suffix) = text.split_at(idx);
    if body.is_empty() {
        return None;
    }
    let width: u16 = suffix[1..].parse().ok()?;
    let width = BitWidth::try_from(width).ok()?;
    let base = match (&suffix[..1], width) {
        ("u", BitWidth::W8) => BaseType::U8,
        ("u", BitWidth::W16) => BaseType::U16,
        ("u", BitWidth::W32) => BaseType::U32,
        ("u", BitWidth::W64) => BaseType::U64,
        ("i", BitWidth::W8) => BaseType::I8,
        ("i", BitWidth::W16) => BaseType::I16,
        ("i", BitWidth::W32) => BaseType::I32,
        ("i", BitWidth::W64) => BaseType::I64,
        _ => return None,
    };
    Some((body, base))
}

/// Behavior selected by the `wrap`/`clamp`/`error` overflow modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverflowBehavior {
    Wrap,
    Clamp,
    Error,
}

/// Canonical description of a named value's type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub base: BaseType,
    pub bit_width: u16,
    pub is_array: bool,
    pub is_const: bool,
    pub is_volatile: bool,
    pub is_enum: bool,
    pub is_bitmap: bool,
    pub is_string: bool,
    pub is_atomic: bool,
    pub is_pointer: bool,
    pub is_parameter: bool,
    pub is_external_cpp: bool,
    /// Declared rank; a dimension of 0 means unknown/unsized.
    pub array_dims: Vec<u32>,
    pub enum_type: Option<String>,
    pub bitmap_type: Option<String>,
    pub string_capacity: Option<u32>,
    pub overflow: Option<OverflowBehavior>,
}

impl TypeInfo {
    pub fn of(base: BaseType) -> Self {
        let bit_width = base.bit_width();
        Self {
            base,
            bit_width,
            is_array: false,
            is_const: false,
            is_volatile: false,
            is_enum: false,
            is_bitmap: false,
            is_string: false,
            is_atomic: false,
            is_pointer: false,
            is_parameter: false,
            is_external_cpp: false,
            array_dims: Vec::new(),
            enum_type: None,
            bitmap_type: None,
            string_capacity: None,
            overflow: None,
        }
    }

    pub fn string_of(capacity: u32) -> Self {
        let mut info = Self::of(BaseType::Char);
        info.is_string = true;
        info.is_array = true;
        info.string_capacity = Some(capacity);
        info.array_dims = vec![capacity + 1];
        info
    }

    pub fn is_integer(&self) -> bool {
        self.base.is_integer() && !self.is_array && !self.is_enum
    }

    pub fn is_float(&self) -> bool {
        self.base.is_float() && !self.is_array
    }

    /// Element type of an array, bitmap backing or plain scalar view.
    pub fn element(&self) -> TypeInfo {
        let mut elem = self.clone();
        elem.is_array = false;
        elem.array_dims = Vec::new();
        elem
    }
}

/// How a parameter travels into the function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamMode {
    /// Lowered to `T*` (C) / `T&` (C++); reads need a dereference in C.
    ByReference,
    /// Small unmodified primitives, floats, enums, strings, arrays,
    /// structs and callbacks; reads pass through unchanged.
    ByValue,
    /// A primitive forced to pointer shape by a C callback typedef;
    /// reads require `(*p)` even in C++ mode.
    CallbackPointerPrimitive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub ty: TypeInfo,
    pub mode: ParamMode,
}

impl ParameterInfo {
    pub fn forces_pointer_read(&self) -> bool {
        matches!(self.mode, ParamMode::CallbackPointerPrimitive)
    }
}
