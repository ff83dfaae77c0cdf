//! Ordered, first-match classification of assignment targets into the
//! closed kind set the lowerers dispatch on. Pure with respect to the
//! generation state.

use crate::ast::{AssignStmt, BinaryOp, Expr, PostfixChain, Prefix};
use crate::resolve::TypeResolver;
use crate::state::GenState;
use crate::symbol::SymbolTable;
use crate::ty::{BaseType, OverflowBehavior, TypeInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentKind {
    Simple,
    MemberChain,
    ThisMember,
    ThisArray,
    GlobalMember,
    GlobalArray,
    BitmapFieldSingleBit,
    BitmapFieldMultiBit,
    BitmapArrayElementField,
    RegisterMemberBitmapField,
    ScopedRegisterMemberBitmapField,
    StructMemberBitmapField,
    IntegerBit,
    IntegerBitRange,
    FloatBit,
    FloatBitRange,
    RegisterBit,
    RegisterBitRange,
    ScopedRegisterBit,
    ScopedRegisterBitRange,
    StringSimple,
    StringStructField,
    StringConcat,
    StringSubstring,
    ArrayElement,
    ArraySlice,
    MultiDimArrayElement,
    ArrayElementBit,
    AtomicRmw,
    OverflowClamp,
    OverflowWrap,
}

pub fn classify(
    symbols: &SymbolTable,
    state: &GenState,
    stmt: &AssignStmt,
) -> AssignmentKind {
    let resolver = TypeResolver::new(symbols, state);
    let chain = &stmt.target;
    let segments = &chain.segments;
    let root = resolver.root_type(chain);

    // 1. special compound targets
    if stmt.op.is_compound() && chain_is_bare(chain) {
        if let Some(root) = &root {
            if root.is_atomic {
                return AssignmentKind::AtomicRmw;
            }
            if root.is_integer() {
                match root.overflow {
                    Some(OverflowBehavior::Clamp) => {
                        return AssignmentKind::OverflowClamp
                    }
                    Some(OverflowBehavior::Wrap) => {
                        return AssignmentKind::OverflowWrap
                    }
                    _ => {}
                }
            }
        }
    }

    // 2. bitmap field on a scalar bitmap variable
    if segments.len() == 2
        && chain.subscript_count() == 0
        && chain.prefix != Prefix::Global
    {
        if let Some(root) = &root {
            if root.is_bitmap && !root.is_array {
                if let Some(field) =
                    bitmap_field_width(symbols, root, &segments[1].name)
                {
                    return if field == 1 {
                        AssignmentKind::BitmapFieldSingleBit
                    } else {
                        AssignmentKind::BitmapFieldMultiBit
                    };
                }
            }
        }
    }

    // 3. bitmap array element field
    if segments.len() == 2
        && segments[0].subscripts.len() == 1
        && segments[0].subscripts[0].exprs.len() == 1
        && segments[1].subscripts.is_empty()
    {
        if let Some(root) = &root {
            if root.is_bitmap && root.is_array {
                if bitmap_field_width(symbols, root, &segments[1].name)
                    .is_some()
                {
                    return AssignmentKind::BitmapArrayElementField;
                }
            }
        }
    }

    // 4. register member bitmap field, optionally scope-qualified
    if chain.subscript_count() == 0 {
        match (chain.prefix, segments.len()) {
            (Prefix::None, 3) => {
                if register_bitmap_field(
                    symbols,
                    &segments[0].name,
                    &segments[1].name,
                    &segments[2].name,
                ) {
                    return AssignmentKind::RegisterMemberBitmapField;
                }
            }
            (Prefix::None, 4) => {
                if symbols.is_scope(&segments[0].name)
                    && register_bitmap_field(
                        symbols,
                        &segments[1].name,
                        &segments[2].name,
                        &segments[3].name,
                    )
                {
                    return AssignmentKind::ScopedRegisterMemberBitmapField;
                }
            }
            (Prefix::This, 3) => {
                if register_bitmap_field(
                    symbols,
                    &segments[0].name,
                    &segments[1].name,
                    &segments[2].name,
                ) {
                    return AssignmentKind::ScopedRegisterMemberBitmapField;
                }
            }
            _ => {}
        }
    }

    // 5. struct member holding a bitmap-typed field
    if segments.len() == 3 && chain.subscript_count() == 0 {
        if let Some(root) = &root {
            if let BaseType::Named(type_name) = &root.base {
                let field_is_bitmap = symbols
                    .struct_def(type_name)
                    .and_then(|def| def.field(&segments[1].name))
                    .filter(|field| field.ty.is_bitmap)
                    .and_then(|field| field.ty.bitmap_type.clone())
                    .map(|bitmap| {
                        symbols
                            .bitmap_field(&bitmap, &segments[2].name)
                            .is_some()
                    })
                    .unwrap_or(false);
                if field_is_bitmap {
                    return AssignmentKind::StructMemberBitmapField;
                }
            }
        }
    }

    // 6. integer/float bit writes
    if segments.len() == 1 && segments[0].subscripts.len() == 1 {
        if let Some(root) = &root {
            let exprs = segments[0].subscripts[0].exprs.len();
            if root.is_integer() && !root.is_array {
                if exprs == 1 {
                    return AssignmentKind::IntegerBit;
                }
                if exprs == 2 {
                    return AssignmentKind::IntegerBitRange;
                }
            }
            if root.is_float() {
                if exprs == 1 {
                    return AssignmentKind::FloatBit;
                }
                if exprs == 2 {
                    return AssignmentKind::FloatBitRange;
                }
            }
        }
    }

    // 7. register member bit writes
    if segments.len() == 2
        && segments[0].subscripts.is_empty()
        && segments[1].subscripts.len() == 1
        && symbols.is_register(&segments[0].name)
        && symbols
            .register_member(&segments[0].name, &segments[1].name)
            .is_some()
    {
        let exprs = segments[1].subscripts[0].exprs.len();
        let scoped = chain.prefix == Prefix::This;
        match (exprs, scoped) {
            (1, false) => return AssignmentKind::RegisterBit,
            (2, false) => return AssignmentKind::RegisterBitRange,
            (1, true) => return AssignmentKind::ScopedRegisterBit,
            (2, true) => return AssignmentKind::ScopedRegisterBitRange,
            _ => {}
        }
    }

    // 8. string writes
    if let Some(root) = &root {
        if root.is_string && segments.len() == 1 {
            if segments[0].subscripts.is_empty() {
                if is_string_concat(&stmt.value) {
                    return AssignmentKind::StringConcat;
                }
                if is_substring_read(&resolver, &stmt.value) {
                    return AssignmentKind::StringSubstring;
                }
                return AssignmentKind::StringSimple;
            }
        }
        if segments.len() == 2
            && chain.subscript_count() == 0
            && struct_field_is_string(symbols, root, &segments[1].name)
        {
            return AssignmentKind::StringStructField;
        }
    }

    // 9. array element writes
    if segments.len() == 1 && !segments[0].subscripts.is_empty() {
        if let Some(root) = &root {
            if root.is_array && !root.is_string {
                let groups = &segments[0].subscripts;
                let rank = root.array_dims.len().max(1);
                if groups.len() == 1 {
                    if groups[0].exprs.len() == 2 {
                        return AssignmentKind::ArraySlice;
                    }
                    if chain.prefix == Prefix::This {
                        return AssignmentKind::ThisArray;
                    }
                    if chain.prefix == Prefix::Global {
                        return AssignmentKind::GlobalArray;
                    }
                    return AssignmentKind::ArrayElement;
                }
                if groups.len() == rank + 1
                    && root.base.is_integer()
                    && groups.last().is_some_and(|g| g.exprs.len() == 1)
                {
                    return AssignmentKind::ArrayElementBit;
                }
                return AssignmentKind::MultiDimArrayElement;
            }
        }
    }

    // 10. residual prefix forms
    if segments.len() == 1 {
        match chain.prefix {
            Prefix::This if chain.subscript_count() == 0 => {
                return AssignmentKind::ThisMember
            }
            Prefix::This => return AssignmentKind::ThisArray,
            Prefix::Global if chain.subscript_count() == 0 => {
                return AssignmentKind::GlobalMember
            }
            Prefix::Global => return AssignmentKind::GlobalArray,
            Prefix::None => {}
        }
    }

    // 11. any remaining member chain
    if segments.len() > 1 {
        return AssignmentKind::MemberChain;
    }

    // 12. fallback
    AssignmentKind::Simple
}

fn chain_is_bare(chain: &PostfixChain) -> bool {
    chain.segments.len() == 1 && chain.subscript_count() == 0
}

fn bitmap_field_width(
    symbols: &SymbolTable,
    root: &TypeInfo,
    field: &str,
) -> Option<u16> {
    let bitmap = root.bitmap_type.as_deref()?;
    symbols.bitmap_field(bitmap, field).map(|f| f.width)
}

fn register_bitmap_field(
    symbols: &SymbolTable,
    register: &str,
    member: &str,
    field: &str,
) -> bool {
    if !symbols.is_register(register) {
        return false;
    }
    symbols
        .register_member(register, member)
        .and_then(|info| info.bitmap_type.as_deref())
        .and_then(|bitmap| symbols.bitmap_field(bitmap, field))
        .is_some()
}

fn struct_field_is_string(
    symbols: &SymbolTable,
    root: &TypeInfo,
    field: &str,
) -> bool {
    let BaseType::Named(type_name) = &root.base else {
        return false;
    };
    symbols
        .struct_def(type_name)
        .and_then(|def| def.field(field))
        .is_some_and(|f| f.ty.is_string)
}

/// `dst <- a + b` with a string destination concatenates.
fn is_string_concat(value: &Expr) -> bool {
    matches!(value, Expr::Binary { op: BinaryOp::Add, .. })
}

/// `dst <- src[start, length]` on a string source.
fn is_substring_read(resolver: &TypeResolver<'_>, value: &Expr) -> bool {
    let Expr::Path(chain) = value else { return false };
    if chain.segments.len() != 1 {
        return false;
    }
    let groups = &chain.segments[0].subscripts;
    if groups.len() != 1 || groups[0].exprs.len() != 2 {
        return false;
    }
    resolver
        .root_type(chain)
        .is_some_and(|ty| ty.is_string)
}
