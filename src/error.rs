use crate::ast::Pos;

/// Closed taxonomy of generation failures. Every error the generator can
/// produce carries exactly one of these kinds; there is no warning level,
/// the first error aborts the invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NarrowingConversion,
    SignConversion,
    LiteralOutOfRange,
    BitmapFieldOverflow,
    NegativeShift,
    ShiftExceedsWidth,
    ArrayIndexOutOfBounds,
    ArraySizeMismatch,
    StringLiteralOverflow,
    StringCapacityInsufficient,
    SubstringOutOfRange,
    SubstringDestOverflow,
    StringConcatAtGlobalScope,
    FloatBitAtGlobalScope,
    RegisterWriteOnlyRead,
    RegisterReadOnlyWrite,
    CrossScopePrivate,
    SelfScopeReference,
    BareIdentifierAmbiguous,
    ConstAssignment,
    ConstParameterAssignment,
    EnumMismatch,
    IntegerToEnum,
    NonEnumToEnum,
    CallbackSignatureMismatch,
    CallbackNominalMismatch,
    NonBooleanCondition,
    NestedTernary,
    FunctionCallInCondition,
    NonExhaustiveSwitch,
    DuplicateCase,
    BoolSwitch,
    SwitchTooFewClauses,
    EarlyExitInCriticalSection,
    IncludeImplementationFile,
    CnxAlternativeExists,
    ModifierConflict,
    CStyleArrayDeclaration,
    CppAggregateAtGlobal,
    UnsupportedSizeofExpression,
    SizeofArrayParameter,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        use ErrorKind::*;
        match self {
            NarrowingConversion => "NarrowingConversion",
            SignConversion => "SignConversion",
            LiteralOutOfRange => "LiteralOutOfRange",
            BitmapFieldOverflow => "BitmapFieldOverflow",
            NegativeShift => "NegativeShift",
            ShiftExceedsWidth => "ShiftExceedsWidth",
            ArrayIndexOutOfBounds => "ArrayIndexOutOfBounds",
            ArraySizeMismatch => "ArraySizeMismatch",
            StringLiteralOverflow => "StringLiteralOverflow",
            StringCapacityInsufficient => "StringCapacityInsufficient",
            SubstringOutOfRange => "SubstringOutOfRange",
            SubstringDestOverflow => "SubstringDestOverflow",
            StringConcatAtGlobalScope => "StringConcatAtGlobalScope",
            FloatBitAtGlobalScope => "FloatBitAtGlobalScope",
            RegisterWriteOnlyRead => "RegisterWriteOnlyRead",
            RegisterReadOnlyWrite => "RegisterReadOnlyWrite",
            CrossScopePrivate => "CrossScopePrivate",
            SelfScopeReference => "SelfScopeReference",
            BareIdentifierAmbiguous => "BareIdentifierAmbiguous",
            ConstAssignment => "ConstAssignment",
            ConstParameterAssignment => "ConstParameterAssignment",
            EnumMismatch => "EnumMismatch",
            IntegerToEnum => "IntegerToEnum",
            NonEnumToEnum => "NonEnumToEnum",
            CallbackSignatureMismatch => "CallbackSignatureMismatch",
            CallbackNominalMismatch => "CallbackNominalMismatch",
            NonBooleanCondition => "NonBooleanCondition",
            NestedTernary => "NestedTernary",
            FunctionCallInCondition => "FunctionCallInCondition",
            NonExhaustiveSwitch => "NonExhaustiveSwitch",
            DuplicateCase => "DuplicateCase",
            BoolSwitch => "BoolSwitch",
            SwitchTooFewClauses => "SwitchTooFewClauses",
            EarlyExitInCriticalSection => "EarlyExitInCriticalSection",
            IncludeImplementationFile => "IncludeImplementationFile",
            CnxAlternativeExists => "CnxAlternativeExists",
            ModifierConflict => "ModifierConflict",
            CStyleArrayDeclaration => "CStyleArrayDeclaration",
            CppAggregateAtGlobal => "CppAggregateAtGlobal",
            UnsupportedSizeofExpression => "UnsupportedSizeofExpression",
            SizeofArrayParameter => "SizeofArrayParameter",
        }
    }
}

/// A single fatal generation error: the taxonomy kind plus a rendered
/// message and the source position when one was available.
#[derive(Debug, Clone)]
pub struct CodegenError {
    kind: ErrorKind,
    message: String,
    pos: Option<Pos>,
}

impl CodegenError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            pos: None,
        }
    }

    pub fn with_pos(mut self, pos: Pos) -> Self {
        self.pos = Some(pos);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn pos(&self) -> Option<Pos> {
        self.pos
    }
}

impl std::fmt::Display for CodegenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.pos {
            Some(pos) => write!(
                f,
                "{} at {}:{}: {}",
                self.kind.name(),
                pos.line,
                pos.column,
                self.message
            ),
            None => write!(f, "{}: {}", self.kind.name(), self.message),
        }
    }
}

impl std::error::Error for CodegenError {}

/// Build a taxonomy error and return it from the enclosing function.
#[macro_export]
macro_rules! codegen_bail {
    ($kind:ident, $pos:expr, $($arg:tt)*) => {
        return Err($crate::error::CodegenError::new(
            $crate::error::ErrorKind::$kind,
            format!($($arg)*),
        )
        .with_pos($pos)
        .into())
    };
}

/// Build a taxonomy error value without returning.
#[macro_export]
macro_rules! codegen_error {
    ($kind:ident, $pos:expr, $($arg:tt)*) => {
        ::anyhow::Error::from(
            $crate::error::CodegenError::new(
                $crate::error::ErrorKind::$kind,
                format!($($arg)*),
            )
            .with_pos($pos),
        )
    };
}

/// Recover the taxonomy kind from an `anyhow::Error`, if it carries one.
pub fn kind_of(error: &anyhow::Error) -> Option<ErrorKind> {
    error.downcast_ref::<CodegenError>().map(CodegenError::kind)
}
