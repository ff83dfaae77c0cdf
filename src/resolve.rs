//! Expression-type inference, independent of emission, plus the
//! conversion checks of MISRA 10.3.

use anyhow::Result;

use crate::ast::{Expr, PostfixChain, Pos, Prefix, Segment, UnaryOp};
use crate::codegen_bail;
use crate::literal::{self, LiteralBase};
use crate::state::GenState;
use crate::symbol::{scoped_name, SymbolTable};
use crate::ty::{BaseType, TypeInfo};

pub struct TypeResolver<'a> {
    pub symbols: &'a SymbolTable,
    pub state: &'a GenState,
}

/// Intermediate states while stepping down an identifier chain.
enum Cursor {
    Value(TypeInfo),
    Scope(String),
    Register(String),
    Enum(String),
}

impl<'a> TypeResolver<'a> {
    pub fn new(symbols: &'a SymbolTable, state: &'a GenState) -> Self {
        Self { symbols, state }
    }

    /// Infer the C-Next type of an expression; `None` means unknown
    /// (external symbols), which downstream checks treat permissively.
    pub fn expr_type(&self, expr: &Expr) -> Option<TypeInfo> {
        match expr {
            Expr::IntLit { text, .. } => {
                let parsed = literal::parse_int(text)?;
                if let Some(suffix) = parsed.suffix {
                    return Some(TypeInfo::of(suffix));
                }
                if let Some(expected) = &self.state.expected_type {
                    if expected.is_integer() {
                        return Some(expected.clone());
                    }
                }
                let base = match parsed.base {
                    LiteralBase::Decimal => {
                        BaseType::smallest_signed_for(parsed.value)?
                    }
                    LiteralBase::Hex | LiteralBase::Binary => {
                        BaseType::smallest_unsigned_for(
                            u128::try_from(parsed.value).ok()?,
                        )?
                    }
                };
                Some(TypeInfo::of(base))
            }
            Expr::FloatLit { text, .. } => {
                let base = if text.ends_with("f64") {
                    BaseType::F64
                } else if text.ends_with("f96") {
                    BaseType::F96
                } else if let Some(expected) = &self.state.expected_type {
                    if expected.is_float() {
                        expected.base.clone()
                    } else {
                        BaseType::F32
                    }
                } else {
                    BaseType::F32
                };
                Some(TypeInfo::of(base))
            }
            Expr::StringLit { value, .. } => {
                Some(TypeInfo::string_of(value.len() as u32))
            }
            Expr::BoolLit { .. } => Some(TypeInfo::of(BaseType::Bool)),
            Expr::Path(chain) => self.chain_type(chain),
            Expr::Unary { op, operand, .. } => match op {
                UnaryOp::Not => Some(TypeInfo::of(BaseType::Bool)),
                UnaryOp::Neg | UnaryOp::BitNot => self.expr_type(operand),
            },
            Expr::Binary { op, lhs, rhs, .. } => {
                if op.is_comparison() || op.is_logical() {
                    return Some(TypeInfo::of(BaseType::Bool));
                }
                if op.is_shift() {
                    return self.expr_type(lhs);
                }
                let lt = self.expr_type(lhs)?;
                let rt = self.expr_type(rhs)?;
                if lt.base.is_float() || !rt.base.is_float() {
                    if rt.bit_width > lt.bit_width {
                        return Some(rt);
                    }
                    return Some(lt);
                }
                Some(rt)
            }
            Expr::Call(call) => {
                let name = self.callee_name(&call.callee);
                self.symbols
                    .function(&name)
                    .and_then(|sig| sig.return_type.clone())
            }
            Expr::Ternary { then_expr, .. } => self.expr_type(then_expr),
            Expr::ArrayLit { elements, .. } => {
                let mut info = self.expr_type(elements.first()?)?;
                info.is_array = true;
                info.array_dims = vec![elements.len() as u32];
                Some(info)
            }
            Expr::ArrayFill { value, .. } => {
                let mut info = self.expr_type(value)?;
                info.is_array = true;
                info.array_dims = vec![0];
                Some(info)
            }
            Expr::Sizeof { .. } => Some(TypeInfo::of(BaseType::U32)),
        }
    }

    /// The mangled C name a call resolves to.
    pub fn callee_name(&self, chain: &PostfixChain) -> String {
        let segments = &chain.segments;
        match (chain.prefix, segments.len()) {
            (Prefix::This, _) => {
                let scope = self.state.current_scope.as_deref().unwrap_or("");
                scoped_name(scope, &segments[0].name)
            }
            (_, 2..) if self.symbols.is_scope(&segments[0].name) => {
                scoped_name(&segments[0].name, &segments[1].name)
            }
            (_, 2..) if self.symbols.is_cpp_namespace(&segments[0].name) => {
                format!("{}::{}", segments[0].name, segments[1].name)
            }
            _ => {
                let name = &segments[0].name;
                if let Some(scope) = &self.state.current_scope {
                    let scoped = scoped_name(scope, name);
                    if self.symbols.function(&scoped).is_some() {
                        return scoped;
                    }
                }
                name.clone()
            }
        }
    }

    /// Resolve the type a postfix chain reads as.
    pub fn chain_type(&self, chain: &PostfixChain) -> Option<TypeInfo> {
        let mut cursor = self.root_cursor(chain)?;
        let mut first = true;
        for segment in &chain.segments {
            if first {
                first = false;
            } else {
                cursor = self.step(cursor, &segment.name)?;
            }
            for group in &segment.subscripts {
                let Cursor::Value(info) = cursor else {
                    return None;
                };
                cursor = Cursor::Value(self.subscripted(info, group.exprs.len())?);
            }
        }
        match cursor {
            Cursor::Value(info) => Some(info),
            _ => None,
        }
    }

    fn root_cursor(&self, chain: &PostfixChain) -> Option<Cursor> {
        let name = &chain.segments[0].name;
        match chain.prefix {
            Prefix::This => {
                let scope = self.state.current_scope.as_deref()?;
                if self.symbols.is_register(name) {
                    return Some(Cursor::Register(name.clone()));
                }
                if self.symbols.is_enum(name) {
                    return Some(Cursor::Enum(name.clone()));
                }
                self.state
                    .lookup(&scoped_name(scope, name))
                    .cloned()
                    .map(Cursor::Value)
            }
            Prefix::Global => {
                if self.symbols.is_scope(name) {
                    return Some(Cursor::Scope(name.clone()));
                }
                if self.symbols.is_register(name) {
                    return Some(Cursor::Register(name.clone()));
                }
                if self.symbols.is_enum(name) {
                    return Some(Cursor::Enum(name.clone()));
                }
                self.state.lookup(name).cloned().map(Cursor::Value)
            }
            Prefix::None => {
                if let Some(param) = self.state.parameter(name) {
                    return Some(Cursor::Value(param.ty.clone()));
                }
                if let Some(info) = self.state.lookup(name) {
                    return Some(Cursor::Value(info.clone()));
                }
                if let Some(scope) = &self.state.current_scope {
                    if let Some(info) =
                        self.state.lookup(&scoped_name(scope, name))
                    {
                        return Some(Cursor::Value(info.clone()));
                    }
                }
                if self.symbols.is_register(name) {
                    return Some(Cursor::Register(name.clone()));
                }
                if self.symbols.is_scope(name) {
                    return Some(Cursor::Scope(name.clone()));
                }
                if self.symbols.is_enum(name) {
                    return Some(Cursor::Enum(name.clone()));
                }
                None
            }
        }
    }

    fn step(&self, cursor: Cursor, member: &str) -> Option<Cursor> {
        match cursor {
            Cursor::Value(info) => {
                if info.is_bitmap {
                    let bitmap = info.bitmap_type.as_deref()?;
                    let field = self.symbols.bitmap_field(bitmap, member)?;
                    return Some(Cursor::Value(TypeInfo::of(
                        BaseType::unsigned_of_width(field.width),
                    )));
                }
                if let BaseType::Named(type_name) = &info.base {
                    let def = self.symbols.struct_def(type_name)?;
                    return Some(Cursor::Value(def.field(member)?.ty.clone()));
                }
                None
            }
            Cursor::Scope(scope) => {
                if self.symbols.is_register(member) {
                    return Some(Cursor::Register(member.to_owned()));
                }
                if self.symbols.is_enum(member) {
                    return Some(Cursor::Enum(member.to_owned()));
                }
                self.state
                    .lookup(&scoped_name(&scope, member))
                    .cloned()
                    .map(Cursor::Value)
            }
            Cursor::Register(register) => {
                let info = self.symbols.register_member(&register, member)?;
                let mut member_type = match &info.bitmap_type {
                    Some(bitmap) => {
                        let def = self.symbols.bitmap(bitmap)?;
                        let mut t = TypeInfo::of(BaseType::unsigned_of_width(
                            def.bit_width,
                        ));
                        t.is_bitmap = true;
                        t.bitmap_type = Some(bitmap.clone());
                        t
                    }
                    None => TypeInfo::of(BaseType::U32),
                };
                member_type.is_volatile = true;
                Some(Cursor::Value(member_type))
            }
            Cursor::Enum(enum_name) => {
                let def = self.symbols.enum_def(&enum_name)?;
                if !def.has_member(member) {
                    return None;
                }
                let mut info = TypeInfo::of(BaseType::Named(enum_name.clone()));
                info.is_enum = true;
                info.enum_type = Some(enum_name);
                Some(Cursor::Value(info))
            }
        }
    }

    /// Type of `base` after applying one subscript group.
    fn subscripted(&self, info: TypeInfo, exprs: usize) -> Option<TypeInfo> {
        if info.is_string && !info.is_pointer {
            if exprs == 2 {
                // substring read keeps string typing; capacity checked
                // at the assignment site
                return Some(info);
            }
            return Some(TypeInfo::of(BaseType::Char));
        }
        if info.is_array {
            let mut element = info.clone();
            if element.array_dims.len() <= 1 {
                element.is_array = false;
                element.array_dims = Vec::new();
            } else {
                element.array_dims.remove(0);
            }
            return Some(element);
        }
        if info.is_integer() || info.is_float() {
            // bit or bit-range read
            return Some(TypeInfo::of(BaseType::U8));
        }
        None
    }

    /// Bit-range reads resolve to the smallest unsigned type that fits
    /// the width when it folds, else the root's unsigned counterpart.
    pub fn bit_range_read_type(
        &self,
        root: &TypeInfo,
        width: Option<i128>,
    ) -> BaseType {
        match width {
            Some(width @ 1..) => BaseType::unsigned_of_width(width as u16),
            _ => root.base.unsigned_counterpart(),
        }
    }

    pub fn is_narrowing(src: &BaseType, tgt: &BaseType) -> bool {
        let (sw, tw) = (src.bit_width(), tgt.bit_width());
        sw != 0 && tw != 0 && tw < sw
    }

    pub fn is_sign_conversion(src: &BaseType, tgt: &BaseType) -> bool {
        (src.is_signed() && tgt.is_unsigned())
            || (src.is_unsigned() && tgt.is_signed())
    }

    /// MISRA 10.3 at the C-Next level: assigning `src` into `tgt`.
    pub fn validate_conversion(
        &self,
        tgt: &TypeInfo,
        src: Option<&TypeInfo>,
        pos: Pos,
    ) -> Result<()> {
        let Some(src) = src else { return Ok(()) };
        if !src.base.is_primitive() || !tgt.base.is_primitive() {
            return Ok(());
        }
        if src.base == BaseType::Bool || tgt.base == BaseType::Bool {
            return Ok(());
        }
        if src.base.is_float() != tgt.base.is_float() {
            // int/float mixing surfaces as a sign/width issue
            codegen_bail!(
                NarrowingConversion,
                pos,
                "cannot assign {} to {}",
                src.base.c_type(),
                tgt.base.c_type()
            );
        }
        if Self::is_narrowing(&src.base, &tgt.base) {
            codegen_bail!(
                NarrowingConversion,
                pos,
                "narrowing assignment of {} to {}",
                src.base.c_type(),
                tgt.base.c_type()
            );
        }
        if src.base.is_integer() && Self::is_sign_conversion(&src.base, &tgt.base)
        {
            codegen_bail!(
                SignConversion,
                pos,
                "sign conversion from {} to {}",
                src.base.c_type(),
                tgt.base.c_type()
            );
        }
        Ok(())
    }

    /// MISRA 7.2/10.3 for literal RHS: the value must be representable.
    pub fn validate_literal_fits(
        &self,
        text: &str,
        tgt: &BaseType,
        pos: Pos,
    ) -> Result<()> {
        let Some(parsed) = literal::parse_int(text) else {
            return Ok(());
        };
        if tgt.is_integer() && !literal::fits(parsed.value, tgt) {
            codegen_bail!(
                LiteralOutOfRange,
                pos,
                "literal {} does not fit in {}",
                parsed.value,
                tgt.c_type()
            );
        }
        Ok(())
    }

    /// Whether an expression produces a boolean, per MISRA 14.4.
    pub fn is_boolean_producing(&self, expr: &Expr) -> bool {
        match expr {
            Expr::BoolLit { .. } => true,
            Expr::Unary { op, .. } => *op == UnaryOp::Not,
            Expr::Binary { op, .. } => op.is_comparison() || op.is_logical(),
            Expr::Path(_) | Expr::Call(_) => self
                .expr_type(expr)
                .is_some_and(|t| t.base == BaseType::Bool),
            Expr::Ternary { .. } => false,
            _ => false,
        }
    }

    /// Find the segment the root identifier resolves to for assignment
    /// classification.
    pub fn root_type(&self, chain: &PostfixChain) -> Option<TypeInfo> {
        let root = Segment::plain(&chain.segments[0].name);
        let probe = PostfixChain {
            prefix: chain.prefix,
            segments: vec![root],
            pos: chain.pos,
        };
        self.chain_type(&probe)
    }
}
