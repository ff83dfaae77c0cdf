//! Type declarations: typed enums, bitmap typedefs and structs.

use anyhow::Result;

use crate::ast::{BitmapDecl, EnumDecl, StructDecl};
use crate::gen::Codegen;
use crate::symbol::scoped_name;
use crate::ty::BaseType;

impl Codegen<'_> {
    pub(crate) fn emit_enum_decl(&mut self, decl: &EnumDecl) -> Result<()> {
        self.line("typedef enum {");
        for (index, member) in decl.members.iter().enumerate() {
            let comma = if index + 1 == decl.members.len() { "" } else { "," };
            self.line(&format!(
                "    {}{comma}",
                scoped_name(&decl.name, member)
            ));
        }
        self.line(&format!("}} {};", decl.name));
        self.blank();
        Ok(())
    }

    pub(crate) fn emit_bitmap_decl(&mut self, decl: &BitmapDecl) -> Result<()> {
        let backing = BaseType::from_name(&decl.backing);
        let backing = if backing.is_integer() {
            backing.unsigned_counterpart()
        } else {
            BaseType::U8
        };
        let c_type = self.c_type_of(&backing);
        self.line(&format!("typedef {c_type} {};", decl.name));
        self.blank();
        Ok(())
    }

    pub(crate) fn emit_struct_decl(&mut self, decl: &StructDecl) -> Result<()> {
        self.line("typedef struct {");
        for field in &decl.fields {
            let info = self.type_info_from_expr(&field.ty, field.pos)?;
            if info.is_string {
                let capacity = info.string_capacity.unwrap_or(0);
                self.line(&format!(
                    "    char {}[{}];",
                    field.name,
                    capacity + 1
                ));
                continue;
            }
            let type_text = self.declared_type_text(&info);
            if info.is_array {
                let dims: String = info
                    .array_dims
                    .iter()
                    .map(|d| format!("[{d}]"))
                    .collect();
                self.line(&format!("    {type_text} {}{dims};", field.name));
            } else {
                self.line(&format!("    {type_text} {};", field.name));
            }
        }
        self.line(&format!("}} {};", decl.name));
        self.blank();
        Ok(())
    }
}
