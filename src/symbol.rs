use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ty::{BaseType, TypeInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Function,
    Struct,
    Class,
    Enum,
    Bitmap,
    Register,
    Scope,
    Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceLanguage {
    CNext,
    C,
    Cpp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub language: SourceLanguage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
}

/// A named bit run inside a bitmap type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitmapField {
    pub name: String,
    pub offset: u16,
    pub width: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitmapDef {
    pub bit_width: u16,
    /// Declaration order preserved.
    pub fields: Vec<BitmapField>,
}

impl BitmapDef {
    pub fn field(&self, name: &str) -> Option<&BitmapField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisterAccess {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl RegisterAccess {
    pub fn readable(&self) -> bool {
        !matches!(self, Self::WriteOnly)
    }

    pub fn writable(&self) -> bool {
        !matches!(self, Self::ReadOnly)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterMember {
    pub access: RegisterAccess,
    pub bitmap_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackParam {
    pub base: BaseType,
    pub is_pointer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackSignature {
    /// `None` means `void`.
    pub return_type: Option<BaseType>,
    pub params: Vec<CallbackParam>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EnumDef {
    /// Declaration order preserved; exhaustiveness checks count these.
    pub members: Vec<String>,
}

impl EnumDef {
    pub fn has_member(&self, name: &str) -> bool {
        self.members.iter().any(|m| m == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructFieldDef {
    pub name: String,
    pub ty: TypeInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    pub fields: Vec<StructFieldDef>,
    pub language: SourceLanguage,
}

impl StructDef {
    pub fn field(&self, name: &str) -> Option<&StructFieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigParam {
    pub name: String,
    pub ty: TypeInfo,
    /// Set when a C callback typedef forces this primitive into pointer
    /// shape; reads then always dereference.
    pub force_pointer: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSig {
    /// `None` means `void`.
    pub return_type: Option<TypeInfo>,
    pub params: Vec<SigParam>,
    /// Nominal callback typedef this function implements, if any.
    pub callback_type: Option<String>,
    pub language: SourceLanguage,
    pub scope: Option<String>,
}

/// The populated symbol table handed over by the collector pass. The
/// generator only reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolTable {
    pub symbols: BTreeMap<String, Vec<Symbol>>,
    pub known_scopes: BTreeSet<String>,
    pub known_registers: BTreeSet<String>,
    pub known_structs: BTreeSet<String>,
    pub known_bitmaps: BTreeSet<String>,
    pub known_enums: BTreeSet<String>,
    pub scope_members: BTreeMap<String, BTreeSet<String>>,
    pub scope_member_visibility: BTreeMap<String, BTreeMap<String, Visibility>>,
    pub bitmaps: BTreeMap<String, BitmapDef>,
    /// Keyed `"REG_MEMBER"`.
    pub register_members: BTreeMap<String, RegisterMember>,
    pub callback_types: BTreeMap<String, CallbackSignature>,
    pub enums: BTreeMap<String, EnumDef>,
    pub structs: BTreeMap<String, StructDef>,
    /// Keyed by the mangled C name (`fn` or `Scope_fn`).
    pub functions: BTreeMap<String, FunctionSig>,
}

/// Mangled C name of a scoped member.
pub fn scoped_name(scope: &str, name: &str) -> String {
    format!("{scope}_{name}")
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_scope(&self, name: &str) -> bool {
        self.known_scopes.contains(name)
    }

    pub fn is_register(&self, name: &str) -> bool {
        self.known_registers.contains(name)
    }

    pub fn is_struct(&self, name: &str) -> bool {
        self.known_structs.contains(name)
    }

    pub fn is_bitmap(&self, name: &str) -> bool {
        self.known_bitmaps.contains(name)
    }

    pub fn is_enum(&self, name: &str) -> bool {
        self.known_enums.contains(name)
    }

    pub fn is_cpp_namespace(&self, name: &str) -> bool {
        self.symbols.get(name).is_some_and(|overloads| {
            overloads.iter().any(|s| {
                s.kind == SymbolKind::Scope && s.language == SourceLanguage::Cpp
            })
        })
    }

    pub fn bitmap(&self, name: &str) -> Option<&BitmapDef> {
        self.bitmaps.get(name)
    }

    pub fn bitmap_field(&self, bitmap: &str, field: &str) -> Option<&BitmapField> {
        self.bitmaps.get(bitmap).and_then(|def| def.field(field))
    }

    pub fn register_member(
        &self,
        register: &str,
        member: &str,
    ) -> Option<&RegisterMember> {
        self.register_members.get(&scoped_name(register, member))
    }

    pub fn scope_has_member(&self, scope: &str, name: &str) -> bool {
        self.scope_members
            .get(scope)
            .is_some_and(|members| members.contains(name))
    }

    pub fn member_visibility(&self, scope: &str, name: &str) -> Visibility {
        self.scope_member_visibility
            .get(scope)
            .and_then(|members| members.get(name))
            .copied()
            .unwrap_or(Visibility::Public)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionSig> {
        self.functions.get(name)
    }

    pub fn callback(&self, name: &str) -> Option<&CallbackSignature> {
        self.callback_types.get(name)
    }

    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enums.get(name)
    }

    pub fn struct_def(&self, name: &str) -> Option<&StructDef> {
        self.structs.get(name)
    }

    // Builder-style mutators, used by the collector and by tests.

    pub fn add_symbol(&mut self, name: &str, symbol: Symbol) {
        self.symbols.entry(name.to_owned()).or_default().push(symbol);
    }

    pub fn add_scope(&mut self, name: &str) {
        self.known_scopes.insert(name.to_owned());
        self.add_symbol(
            name,
            Symbol {
                kind: SymbolKind::Scope,
                language: SourceLanguage::CNext,
            },
        );
    }

    pub fn add_scope_member(
        &mut self,
        scope: &str,
        member: &str,
        visibility: Visibility,
    ) {
        self.scope_members
            .entry(scope.to_owned())
            .or_default()
            .insert(member.to_owned());
        self.scope_member_visibility
            .entry(scope.to_owned())
            .or_default()
            .insert(member.to_owned(), visibility);
    }

    pub fn add_bitmap(&mut self, name: &str, def: BitmapDef) {
        self.known_bitmaps.insert(name.to_owned());
        self.bitmaps.insert(name.to_owned(), def);
        self.add_symbol(
            name,
            Symbol {
                kind: SymbolKind::Bitmap,
                language: SourceLanguage::CNext,
            },
        );
    }

    pub fn add_enum(&mut self, name: &str, members: &[&str]) {
        self.known_enums.insert(name.to_owned());
        self.enums.insert(
            name.to_owned(),
            EnumDef {
                members: members.iter().map(|m| (*m).to_owned()).collect(),
            },
        );
        self.add_symbol(
            name,
            Symbol {
                kind: SymbolKind::Enum,
                language: SourceLanguage::CNext,
            },
        );
    }

    pub fn add_struct(&mut self, name: &str, def: StructDef) {
        self.known_structs.insert(name.to_owned());
        self.structs.insert(name.to_owned(), def);
        self.add_symbol(
            name,
            Symbol {
                kind: SymbolKind::Struct,
                language: SourceLanguage::CNext,
            },
        );
    }

    pub fn add_register(&mut self, name: &str) {
        self.known_registers.insert(name.to_owned());
        self.add_symbol(
            name,
            Symbol {
                kind: SymbolKind::Register,
                language: SourceLanguage::CNext,
            },
        );
    }

    pub fn add_register_member(
        &mut self,
        register: &str,
        member: &str,
        info: RegisterMember,
    ) {
        self.register_members
            .insert(scoped_name(register, member), info);
    }

    pub fn add_callback(&mut self, name: &str, signature: CallbackSignature) {
        self.callback_types.insert(name.to_owned(), signature);
        self.add_symbol(
            name,
            Symbol {
                kind: SymbolKind::Type,
                language: SourceLanguage::CNext,
            },
        );
    }

    pub fn add_function(&mut self, name: &str, sig: FunctionSig) {
        self.functions.insert(name.to_owned(), sig);
        self.add_symbol(
            name,
            Symbol {
                kind: SymbolKind::Function,
                language: SourceLanguage::CNext,
            },
        );
    }
}
