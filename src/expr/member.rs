//! Identifier-chain generation: separator selection, scope and
//! register validation, subscript application, and bit reads.

use anyhow::{anyhow, Result};

use crate::ast::{PostfixChain, Pos, Prefix, SubscriptGroup};
use crate::cast;
use crate::codegen_bail;
use crate::gen::Codegen;
use crate::include::IncludeTag;
use crate::literal;
use crate::symbol::{scoped_name, RegisterAccess, Visibility};
use crate::ty::{BaseType, TypeInfo};

/// A generated lvalue or value text plus its inferred type.
#[derive(Debug, Clone)]
pub(crate) struct Lvalue {
    pub text: String,
    pub ty: Option<TypeInfo>,
}

/// Cursor while stepping down a chain.
enum Cur {
    Val {
        text: String,
        ty: TypeInfo,
        sep: &'static str,
    },
    Scope(String),
    Reg(String),
    Enum(String),
    Opaque(String),
}

impl Codegen<'_> {
    /// Generate the full chain; `as_target` marks assignment targets,
    /// which flips the register access validation and rejects value
    /// rewrites (bitmap/bit reads) that have write-specific lowerings.
    pub(crate) fn gen_chain(
        &mut self,
        chain: &PostfixChain,
        as_target: bool,
    ) -> Result<Lvalue> {
        let pos = chain.pos;
        let mut cur = self.chain_root(chain)?;
        for (index, segment) in chain.segments.iter().enumerate() {
            if index > 0 {
                cur = self.chain_step(cur, &segment.name, pos, as_target)?;
            }
            for group in &segment.subscripts {
                cur = self.chain_subscript(cur, group, pos, as_target)?;
            }
        }
        match cur {
            Cur::Val { text, ty, .. } => {
                // rvalue reads of atomics go through an explicit load
                if !as_target && ty.is_atomic {
                    self.state.includes.request(IncludeTag::Stdatomic);
                    let text = if self.cpp() {
                        format!("{text}.load(std::memory_order_seq_cst)")
                    } else {
                        format!(
                            "atomic_load_explicit(&{text}, memory_order_seq_cst)"
                        )
                    };
                    return Ok(Lvalue { text, ty: Some(ty) });
                }
                Ok(Lvalue { text, ty: Some(ty) })
            }
            Cur::Opaque(text) => Ok(Lvalue { text, ty: None }),
            Cur::Scope(name) | Cur::Reg(name) | Cur::Enum(name) => {
                Err(anyhow!("`{name}` is not a value"))
            }
        }
    }

    fn chain_root(&mut self, chain: &PostfixChain) -> Result<Cur> {
        let name = &chain.segments[0].name;
        let pos = chain.pos;
        match chain.prefix {
            Prefix::This => {
                let Some(scope) = self.state.current_scope.clone() else {
                    return Err(anyhow!(
                        "`this.{name}` used outside of a scope"
                    ));
                };
                if self.symbols.is_register(name) {
                    return Ok(Cur::Reg(name.clone()));
                }
                if self.symbols.is_enum(name) {
                    return Ok(Cur::Enum(name.clone()));
                }
                let mangled = scoped_name(&scope, name);
                if let Some(ty) = self.state.lookup(&mangled) {
                    return Ok(Cur::Val {
                        text: mangled,
                        ty: ty.clone(),
                        sep: ".",
                    });
                }
                if self.symbols.function(&mangled).is_some() {
                    return Ok(Cur::Opaque(mangled));
                }
                Err(anyhow!("`this.{name}` does not name a scope member"))
            }
            Prefix::Global => {
                if self.symbols.is_scope(name) {
                    return Ok(Cur::Scope(name.clone()));
                }
                if self.symbols.is_register(name) {
                    return Ok(Cur::Reg(name.clone()));
                }
                if self.symbols.is_enum(name) {
                    return Ok(Cur::Enum(name.clone()));
                }
                if let Some(ty) = self.state.lookup(name) {
                    return Ok(Cur::Val {
                        text: name.clone(),
                        ty: ty.clone(),
                        sep: ".",
                    });
                }
                Err(anyhow!("`global.{name}` does not name a global"))
            }
            Prefix::None => self.chain_root_bare(name, pos),
        }
    }

    fn chain_root_bare(&mut self, name: &str, pos: Pos) -> Result<Cur> {
        if let Some(param) = self.state.parameter(name).cloned() {
            let is_struct = match &param.ty.base {
                BaseType::Named(type_name) => self.symbols.is_struct(type_name),
                _ => false,
            };
            let sep = if is_struct && !self.cpp() { "->" } else { "." };
            let text = self.param_read_text(name, &param);
            return Ok(Cur::Val {
                text,
                ty: param.ty,
                sep,
            });
        }
        if self.state.local_variables.contains(name) {
            let ty = self
                .state
                .lookup(name)
                .cloned()
                .ok_or_else(|| anyhow!("untracked local `{name}`"))?;
            return Ok(Cur::Val {
                text: name.to_owned(),
                ty,
                sep: ".",
            });
        }
        // unqualified enum member, resolved against the expected type
        if let Some(expected) = self.state.expected_type.clone() {
            if let Some(enum_name) = &expected.enum_type {
                if self
                    .symbols
                    .enum_def(enum_name)
                    .is_some_and(|def| def.has_member(name))
                {
                    return Ok(Cur::Val {
                        text: scoped_name(enum_name, name),
                        ty: expected,
                        sep: ".",
                    });
                }
            }
        }
        let scoped_hit = self.state.current_scope.as_ref().and_then(|scope| {
            let mangled = scoped_name(scope, name);
            self.state.lookup(&mangled).cloned().map(|ty| (mangled, ty))
        });
        let global_hit = self.state.lookup(name).cloned();
        match (scoped_hit, global_hit) {
            (Some(_), Some(_)) => codegen_bail!(
                BareIdentifierAmbiguous,
                pos,
                "`{name}` names both a scope member and a global; qualify with this. or global."
            ),
            (Some((mangled, ty)), None) => {
                return Ok(Cur::Val {
                    text: mangled,
                    ty,
                    sep: ".",
                })
            }
            (None, Some(ty)) => {
                return Ok(Cur::Val {
                    text: name.to_owned(),
                    ty,
                    sep: ".",
                })
            }
            (None, None) => {}
        }
        if self.symbols.is_cpp_namespace(name) {
            return Ok(Cur::Opaque(name.to_owned()));
        }
        if self.symbols.is_register(name) {
            return Ok(Cur::Reg(name.to_owned()));
        }
        if self.symbols.is_scope(name) {
            if self.state.current_scope.as_deref() == Some(name) {
                codegen_bail!(
                    SelfScopeReference,
                    pos,
                    "`{name}` is the current scope; use this. instead"
                );
            }
            return Ok(Cur::Scope(name.to_owned()));
        }
        if self.symbols.is_enum(name) {
            return Ok(Cur::Enum(name.to_owned()));
        }
        if let Some(scope) = self.state.current_scope.clone() {
            let mangled = scoped_name(&scope, name);
            if self.symbols.function(&mangled).is_some() {
                return Ok(Cur::Opaque(mangled));
            }
        }
        if self.symbols.function(name).is_some() {
            return Ok(Cur::Opaque(name.to_owned()));
        }
        Err(anyhow!("unknown identifier `{name}`"))
    }

    fn chain_step(
        &mut self,
        cur: Cur,
        member: &str,
        pos: Pos,
        as_target: bool,
    ) -> Result<Cur> {
        match cur {
            Cur::Val { text, ty, sep } => {
                if ty.is_bitmap {
                    let bitmap = ty
                        .bitmap_type
                        .clone()
                        .ok_or_else(|| anyhow!("bitmap without a type name"))?;
                    let field = self
                        .symbols
                        .bitmap_field(&bitmap, member)
                        .ok_or_else(|| {
                            anyhow!("`{member}` is not a field of {bitmap}")
                        })?
                        .clone();
                    if as_target {
                        return Err(anyhow!(
                            "bitmap field write must go through its own lowering"
                        ));
                    }
                    let suffix = bit_suffix(ty.bit_width > 32);
                    let mask =
                        mask_literal(i128::from(field.width), ty.bit_width > 32);
                    let read = format!(
                        "(({text} >> {offset}) & {mask}{suffix})",
                        offset = field.offset
                    );
                    return Ok(Cur::Val {
                        text: read,
                        ty: TypeInfo::of(BaseType::unsigned_of_width(
                            field.width,
                        )),
                        sep: ".",
                    });
                }
                if let BaseType::Named(type_name) = &ty.base {
                    if let Some(def) = self.symbols.struct_def(type_name) {
                        let field = def.field(member).ok_or_else(|| {
                            anyhow!("`{member}` is not a field of {type_name}")
                        })?;
                        return Ok(Cur::Val {
                            text: format!("{text}{sep}{member}"),
                            ty: field.ty.clone(),
                            sep: ".",
                        });
                    }
                }
                Err(anyhow!("`{text}` has no member `{member}`"))
            }
            Cur::Scope(scope) => {
                if self.symbols.is_register(member) {
                    return Ok(Cur::Reg(member.to_owned()));
                }
                if self.state.current_scope.as_deref() != Some(&scope)
                    && self.symbols.member_visibility(&scope, member)
                        == Visibility::Private
                {
                    codegen_bail!(
                        CrossScopePrivate,
                        pos,
                        "`{scope}.{member}` is private to {scope}"
                    );
                }
                let mangled = scoped_name(&scope, member);
                if let Some(ty) = self.state.lookup(&mangled) {
                    return Ok(Cur::Val {
                        text: mangled,
                        ty: ty.clone(),
                        sep: ".",
                    });
                }
                if self.symbols.is_enum(member) {
                    return Ok(Cur::Enum(member.to_owned()));
                }
                if self.symbols.function(&mangled).is_some() {
                    return Ok(Cur::Opaque(mangled));
                }
                Err(anyhow!("`{member}` is not a member of scope {scope}"))
            }
            Cur::Reg(register) => {
                let info = self
                    .symbols
                    .register_member(&register, member)
                    .cloned()
                    .ok_or_else(|| {
                        anyhow!("`{member}` is not a member of register {register}")
                    })?;
                if as_target && info.access == RegisterAccess::ReadOnly {
                    codegen_bail!(
                        RegisterReadOnlyWrite,
                        pos,
                        "register member {register}.{member} is read-only"
                    );
                }
                if !as_target && info.access == RegisterAccess::WriteOnly {
                    codegen_bail!(
                        RegisterWriteOnlyRead,
                        pos,
                        "register member {register}.{member} is write-only"
                    );
                }
                let mut ty = match &info.bitmap_type {
                    Some(bitmap) => {
                        let def =
                            self.symbols.bitmap(bitmap).ok_or_else(|| {
                                anyhow!("unknown bitmap type {bitmap}")
                            })?;
                        let mut t = TypeInfo::of(BaseType::unsigned_of_width(
                            def.bit_width,
                        ));
                        t.bit_width = def.bit_width;
                        t.is_bitmap = true;
                        t.bitmap_type = Some(bitmap.clone());
                        t
                    }
                    None => TypeInfo::of(BaseType::U32),
                };
                ty.is_volatile = true;
                self.state.includes.request(IncludeTag::Stdint);
                Ok(Cur::Val {
                    text: scoped_name(&register, member),
                    ty,
                    sep: ".",
                })
            }
            Cur::Enum(enum_name) => {
                let known = self
                    .symbols
                    .enum_def(&enum_name)
                    .is_some_and(|def| def.has_member(member));
                if !known {
                    return Err(anyhow!(
                        "`{member}` is not a member of enum {enum_name}"
                    ));
                }
                let mut ty = TypeInfo::of(BaseType::Named(enum_name.clone()));
                ty.is_enum = true;
                ty.enum_type = Some(enum_name.clone());
                Ok(Cur::Val {
                    text: scoped_name(&enum_name, member),
                    ty,
                    sep: ".",
                })
            }
            Cur::Opaque(text) => {
                let sep = if text.contains("::") || !self.cpp() {
                    "."
                } else {
                    "::"
                };
                let sep = if self.symbols.is_cpp_namespace(&text) {
                    "::"
                } else {
                    sep
                };
                Ok(Cur::Opaque(format!("{text}{sep}{member}")))
            }
        }
    }

    fn chain_subscript(
        &mut self,
        cur: Cur,
        group: &SubscriptGroup,
        pos: Pos,
        as_target: bool,
    ) -> Result<Cur> {
        let (text, ty) = match cur {
            Cur::Val { text, ty, .. } => (text, ty),
            Cur::Opaque(text) => {
                let index = self.gen_expr_expecting(&group.exprs[0], None)?;
                return Ok(Cur::Opaque(format!("{text}[{index}]")));
            }
            _ => return Err(anyhow!("cannot subscript a non-value")),
        };
        if ty.is_string && group.exprs.len() == 1 {
            let index = self.gen_expr_expecting(&group.exprs[0], None)?;
            if let (Some(idx), Some(capacity)) =
                (literal::fold(&group.exprs[0]), ty.string_capacity)
            {
                if idx < 0 || idx > i128::from(capacity) {
                    codegen_bail!(
                        ArrayIndexOutOfBounds,
                        pos,
                        "index {idx} is outside string<{capacity}>"
                    );
                }
            }
            return Ok(Cur::Val {
                text: format!("{text}[{index}]"),
                ty: TypeInfo::of(BaseType::Char),
                sep: ".",
            });
        }
        if ty.is_array && !ty.is_string {
            if group.exprs.len() != 1 {
                return Err(anyhow!(
                    "array slices are only valid in assignments"
                ));
            }
            let index = self.gen_expr_expecting(&group.exprs[0], None)?;
            if let (Some(idx), Some(&dim)) =
                (literal::fold(&group.exprs[0]), ty.array_dims.first())
            {
                if dim > 0 && (idx < 0 || idx >= i128::from(dim)) {
                    codegen_bail!(
                        ArrayIndexOutOfBounds,
                        pos,
                        "index {idx} is outside [0, {dim})"
                    );
                }
            }
            let mut element = ty.clone();
            if element.array_dims.len() <= 1 {
                element.is_array = false;
                element.array_dims = Vec::new();
            } else {
                element.array_dims.remove(0);
            }
            return Ok(Cur::Val {
                text: format!("{text}[{index}]"),
                ty: element,
                sep: ".",
            });
        }
        if ty.is_integer() || (ty.is_bitmap && !ty.is_array) {
            if as_target {
                return Err(anyhow!(
                    "bit write must go through its own lowering"
                ));
            }
            let (read, read_ty) = self.bit_read(&text, &ty, group, pos)?;
            return Ok(Cur::Val {
                text: read,
                ty: read_ty,
                sep: ".",
            });
        }
        if ty.is_float() {
            if as_target {
                return Err(anyhow!(
                    "float bit write must go through its own lowering"
                ));
            }
            let shadow = self.float_shadow_load(&text, &ty, pos)?;
            let shadow_ty = shadow_view_type(&ty);
            let (read, read_ty) =
                self.bit_read(&shadow, &shadow_ty, group, pos)?;
            return Ok(Cur::Val {
                text: read,
                ty: read_ty,
                sep: ".",
            });
        }
        Err(anyhow!("`{text}` cannot be subscripted"))
    }

    /// `((base >> bit) & 1U)` and `((base >> start) & maskU)` reads.
    pub(crate) fn bit_read(
        &mut self,
        base_text: &str,
        ty: &TypeInfo,
        group: &SubscriptGroup,
        pos: Pos,
    ) -> Result<(String, TypeInfo)> {
        let wide = ty.bit_width > 32;
        let suffix = bit_suffix(wide);
        match group.exprs.as_slice() {
            [bit] => {
                cast::validate_shift_amount(&ty.base, bit, pos)?;
                self.validate_bit_position(bit, ty.bit_width, pos)?;
                let bit = self.gen_expr_expecting(bit, None)?;
                Ok((
                    format!("(({base_text} >> {bit}) & 1{suffix})"),
                    TypeInfo::of(BaseType::U8),
                ))
            }
            [start, width] => {
                cast::validate_shift_amount(&ty.base, start, pos)?;
                self.validate_bit_range(start, width, ty.bit_width, pos)?;
                let width_value = literal::fold(width);
                let read_base = self
                    .resolver()
                    .bit_range_read_type(ty, width_value);
                let mask = match width_value {
                    Some(width) => {
                        format!("{}{suffix}", mask_literal(width, wide))
                    }
                    None => {
                        let width = self.gen_expr_expecting(width, None)?;
                        format!("((1{suffix} << {width}) - 1{suffix})")
                    }
                };
                let start = self.gen_expr_expecting(start, None)?;
                Ok((
                    format!("(({base_text} >> {start}) & {mask})"),
                    TypeInfo::of(read_base),
                ))
            }
            _ => Err(anyhow!("subscript groups hold one or two expressions")),
        }
    }

    pub(crate) fn validate_bit_position(
        &self,
        bit: &crate::ast::Expr,
        width: u16,
        pos: Pos,
    ) -> Result<()> {
        if let Some(value) = literal::fold(bit) {
            if value < 0 {
                codegen_bail!(NegativeShift, pos, "bit {value} is negative");
            }
            if width > 0 && value >= i128::from(width) {
                codegen_bail!(
                    ShiftExceedsWidth,
                    pos,
                    "bit {value} exceeds the {width}-bit value"
                );
            }
        }
        Ok(())
    }

    pub(crate) fn validate_bit_range(
        &self,
        start: &crate::ast::Expr,
        width: &crate::ast::Expr,
        bits: u16,
        pos: Pos,
    ) -> Result<()> {
        let (Some(start), Some(width)) =
            (literal::fold(start), literal::fold(width))
        else {
            return Ok(());
        };
        if start < 0 || width < 0 {
            codegen_bail!(
                NegativeShift,
                pos,
                "bit range [{start}, {width}] is negative"
            );
        }
        if bits > 0 && start + width > i128::from(bits) {
            codegen_bail!(
                ShiftExceedsWidth,
                pos,
                "bit range [{start}, {width}] exceeds the {bits}-bit value"
            );
        }
        Ok(())
    }
}

/// Literal bit mask for a compile-time width, e.g. width 3 -> `7`.
pub(crate) fn mask_literal(width: i128, _wide: bool) -> String {
    let mask = (1u128 << width.clamp(0, 127)) - 1;
    format!("{mask}")
}

pub(crate) fn bit_suffix(wide: bool) -> &'static str {
    if wide {
        "ULL"
    } else {
        "U"
    }
}

/// The unsigned integer view of a float for shadow manipulation.
pub(crate) fn shadow_view_type(float_ty: &TypeInfo) -> TypeInfo {
    let mut ty = TypeInfo::of(float_ty.base.unsigned_counterpart());
    ty.bit_width = ty.base.bit_width();
    ty
}
