//! The generation driver: owns the mutable state and the output
//! buffer, walks the unit, and assembles the final source text.

use anyhow::Result;

use crate::ast::{Function, Item, Pos, Unit};
use crate::callgraph;
use crate::codegen_bail;
use crate::include::IncludeTag;
use crate::resolve::TypeResolver;
use crate::state::GenState;
use crate::symbol::SymbolTable;
use crate::ty::BaseType;

#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub cpp_mode: bool,
}

#[derive(Debug, Clone)]
pub struct Output {
    pub source: String,
    pub includes: Vec<IncludeTag>,
}

pub struct Codegen<'a> {
    pub(crate) symbols: &'a SymbolTable,
    pub(crate) opts: Options,
    pub(crate) state: GenState,
    pub(crate) out: String,
    pub(crate) indent: usize,
}

/// Lower one unit to target-language text. The generator keeps no state
/// between invocations.
pub fn generate(
    unit: &Unit,
    symbols: &SymbolTable,
    opts: Options,
) -> Result<Output> {
    let mut codegen = Codegen::new(symbols, opts);
    codegen.emit_unit(unit)?;
    Ok(codegen.finish())
}

impl<'a> Codegen<'a> {
    pub fn new(symbols: &'a SymbolTable, opts: Options) -> Self {
        Self {
            symbols,
            opts,
            state: GenState::new(),
            out: String::new(),
            indent: 0,
        }
    }

    pub(crate) fn cpp(&self) -> bool {
        self.opts.cpp_mode
    }

    pub(crate) fn resolver(&self) -> TypeResolver<'_> {
        TypeResolver::new(self.symbols, &self.state)
    }

    pub(crate) fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    pub(crate) fn blank(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    /// The C spelling of a base type, requesting the headers it needs.
    pub(crate) fn c_type_of(&mut self, base: &BaseType) -> String {
        match base {
            b if b.is_integer() => {
                self.state.includes.request(IncludeTag::Stdint);
            }
            BaseType::Bool => {
                self.state.includes.request(IncludeTag::Stdbool);
            }
            BaseType::Isr => {
                self.state.includes.request(IncludeTag::Isr);
            }
            _ => {}
        }
        base.c_type().to_owned()
    }

    /// Flush declarations queued up by the expression walkers so they
    /// precede the statement that produced them.
    pub(crate) fn flush_pending(&mut self) {
        let pending = std::mem::take(&mut self.state.pending_lines);
        for line in pending {
            self.line(&line);
        }
    }

    pub(crate) fn flush_pending_cpp_assignments(&mut self) {
        let pending = std::mem::take(&mut self.state.pending_cpp_assignments);
        for line in pending {
            self.line(&line);
        }
    }

    fn emit_unit(&mut self, unit: &Unit) -> Result<()> {
        let analysis = callgraph::analyze(unit, self.symbols);
        self.state.modified_params = analysis.modified;
        self.state.pass_by_value = analysis.pass_by_value;

        // user includes and type declarations first, then globals
        for item in &unit.items {
            match item {
                Item::Include {
                    path,
                    cnx_sibling,
                    pos,
                } => self.emit_include(path, *cnx_sibling, *pos)?,
                Item::EnumDecl(decl) => self.emit_enum_decl(decl)?,
                Item::BitmapDecl(decl) => self.emit_bitmap_decl(decl)?,
                Item::StructDecl(decl) => self.emit_struct_decl(decl)?,
                Item::VarDecl(decl) => self.emit_global_var(decl)?,
                Item::Scope { name, items, .. } => {
                    self.emit_scope_declarations(name, items)?
                }
                Item::Function(_) => {}
            }
        }

        // prototypes give every function a declaration before any call
        let functions = collect_functions(unit);
        if !functions.is_empty() {
            self.blank();
        }
        for (scope, function) in &functions {
            let proto = self.format_prototype(scope.as_deref(), function)?;
            self.line(&proto);
        }
        for (scope, function) in &functions {
            self.blank();
            let previous = scope
                .as_deref()
                .map(|name| self.state.enter_scope(name));
            let result = self.emit_function(function);
            if let Some(previous) = previous {
                self.state.exit_scope(previous);
            }
            result?;
        }

        if !self.state.pending_cpp_assignments.is_empty() {
            codegen_bail!(
                CppAggregateAtGlobal,
                Pos::default(),
                "class member initialization is not allowed at file scope"
            );
        }
        Ok(())
    }

    fn emit_scope_declarations(
        &mut self,
        name: &str,
        items: &[Item],
    ) -> Result<()> {
        let previous = self.state.enter_scope(name);
        let result = self.emit_scope_declarations_inner(items);
        self.state.exit_scope(previous);
        result
    }

    fn emit_scope_declarations_inner(&mut self, items: &[Item]) -> Result<()> {
        for item in items {
            match item {
                Item::EnumDecl(decl) => self.emit_enum_decl(decl)?,
                Item::BitmapDecl(decl) => self.emit_bitmap_decl(decl)?,
                Item::StructDecl(decl) => self.emit_struct_decl(decl)?,
                Item::VarDecl(decl) => self.emit_global_var(decl)?,
                Item::Function(_) => {}
                Item::Include { path, pos, .. } => codegen_bail!(
                    IncludeImplementationFile,
                    *pos,
                    "include of \"{path}\" is not allowed inside a scope"
                ),
                Item::Scope { name, items, .. } => {
                    // nested scopes flatten with the inner name winning
                    self.emit_scope_declarations(name, items)?
                }
            }
        }
        Ok(())
    }

    fn emit_include(
        &mut self,
        path: &str,
        cnx_sibling: bool,
        pos: Pos,
    ) -> Result<()> {
        let lowered = path.to_ascii_lowercase();
        for ext in [".c", ".cpp", ".cc", ".cxx"] {
            if lowered.ends_with(ext) {
                codegen_bail!(
                    IncludeImplementationFile,
                    pos,
                    "cannot include implementation file \"{path}\""
                );
            }
        }
        if (lowered.ends_with(".h") || lowered.ends_with(".hpp")) && cnx_sibling
        {
            codegen_bail!(
                CnxAlternativeExists,
                pos,
                "\"{path}\" has a .cnx version; include that instead"
            );
        }
        self.line(&format!("#include \"{path}\""));
        Ok(())
    }

    fn finish(self) -> Output {
        let includes = self.state.includes.tags();
        let header = self.state.includes.render(self.opts.cpp_mode);
        let source = if header.is_empty() {
            self.out
        } else if self.out.is_empty() {
            header
        } else {
            format!("{header}\n{body}", body = self.out)
        };
        Output { source, includes }
    }
}

/// All functions in the unit paired with their enclosing scope, in
/// declaration order.
fn collect_functions(unit: &Unit) -> Vec<(Option<String>, &Function)> {
    fn walk<'u>(
        items: &'u [Item],
        scope: Option<&str>,
        out: &mut Vec<(Option<String>, &'u Function)>,
    ) {
        for item in items {
            match item {
                Item::Function(function) => {
                    out.push((scope.map(str::to_owned), function));
                }
                Item::Scope { name, items, .. } => {
                    walk(items, Some(name.as_str()), out);
                }
                _ => {}
            }
        }
    }
    let mut out = Vec::new();
    walk(&unit.items, None, &mut out);
    out
}
