//! Statement emission and the control-flow validations of MISRA 14.4,
//! 16.6 and 16.7.

use std::collections::BTreeSet;

use anyhow::{anyhow, Result};

use crate::ast::{Expr, Pos, Stmt, SwitchStmt};
use crate::codegen_bail;
use crate::gen::Codegen;
use crate::include::IncludeTag;
use crate::literal;
use crate::ty::BaseType;

impl Codegen<'_> {
    pub(crate) fn emit_block_stmts(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.emit_stmt(stmt)?;
        }
        Ok(())
    }

    pub(crate) fn emit_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::VarDecl(decl) => {
                let lines = self.var_decl_lines(decl, false)?;
                self.flush_pending();
                for line in lines {
                    self.line(&line);
                }
                self.flush_pending_cpp_assignments();
                Ok(())
            }
            Stmt::Assign(assign) => self.emit_assign(assign),
            Stmt::Call(call) => {
                let text = self.gen_call_expr(call)?;
                self.flush_pending();
                self.line(&format!("{text};"));
                Ok(())
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
                pos,
            } => {
                let cond = self.gen_condition(cond, *pos)?;
                self.flush_pending();
                self.line(&format!("if ({cond}) {{"));
                self.indent += 1;
                self.emit_block_stmts(then_body)?;
                self.indent -= 1;
                if let Some(else_body) = else_body {
                    self.line("} else {");
                    self.indent += 1;
                    self.emit_block_stmts(else_body)?;
                    self.indent -= 1;
                }
                self.line("}");
                Ok(())
            }
            Stmt::While { cond, body, pos } => {
                let cond = self.gen_condition(cond, *pos)?;
                self.flush_pending();
                self.line(&format!("while ({cond}) {{"));
                self.indent += 1;
                self.emit_block_stmts(body)?;
                self.indent -= 1;
                self.line("}");
                Ok(())
            }
            Stmt::DoWhile { body, cond, pos } => {
                self.line("do {");
                self.indent += 1;
                self.emit_block_stmts(body)?;
                self.indent -= 1;
                let cond = self.gen_condition(cond, *pos)?;
                self.flush_pending();
                self.line(&format!("}} while ({cond});"));
                Ok(())
            }
            Stmt::Switch(switch) => self.emit_switch(switch),
            Stmt::Return { value, pos } => self.emit_return(value, *pos),
            Stmt::CriticalSection { body, pos } => {
                self.validate_no_early_exit(body, *pos)?;
                self.state.includes.request(IncludeTag::Isr);
                self.line("isr_critical_enter();");
                self.line("{");
                self.indent += 1;
                let result = self.emit_block_stmts(body);
                self.indent -= 1;
                self.line("}");
                self.line("isr_critical_exit();");
                result
            }
            Stmt::Break { .. } => {
                self.line("break;");
                Ok(())
            }
            Stmt::Continue { .. } => {
                self.line("continue;");
                Ok(())
            }
        }
    }

    fn emit_return(&mut self, value: &Option<Expr>, pos: Pos) -> Result<()> {
        match (value, self.state.current_return_type.clone()) {
            (None, None) => {
                self.line("return;");
                Ok(())
            }
            (Some(value), Some(return_type)) => {
                let rhs = self.assign_rhs(&return_type, value, pos)?;
                self.flush_pending();
                self.line(&format!("return {rhs};"));
                Ok(())
            }
            (Some(_), None) => {
                Err(anyhow!("void function cannot return a value"))
            }
            (None, Some(_)) => {
                Err(anyhow!("function must return a value"))
            }
        }
    }

    fn emit_switch(&mut self, switch: &SwitchStmt) -> Result<()> {
        let pos = switch.pos;
        let selector_type = self.resolver().expr_type(&switch.selector);

        if selector_type
            .as_ref()
            .is_some_and(|t| t.base == BaseType::Bool)
        {
            codegen_bail!(
                BoolSwitch,
                pos,
                "boolean selectors belong in an if statement"
            );
        }
        let clause_count =
            switch.cases.len() + usize::from(switch.default_body.is_some());
        if clause_count < 2 {
            codegen_bail!(
                SwitchTooFewClauses,
                pos,
                "switch needs at least two clauses"
            );
        }

        // duplicate detection over folded values and member names
        let mut seen = BTreeSet::new();
        for case in &switch.cases {
            for label in &case.labels {
                let key = match literal::fold(label) {
                    Some(value) => format!("#{value}"),
                    None => label_name(label)
                        .unwrap_or_else(|| format!("{label:?}")),
                };
                if !seen.insert(key) {
                    codegen_bail!(
                        DuplicateCase,
                        case.pos,
                        "duplicate case label"
                    );
                }
            }
        }

        // enum selectors must cover every variant
        if let Some(enum_name) = selector_type
            .as_ref()
            .and_then(|t| t.enum_type.clone())
        {
            let def = self
                .symbols
                .enum_def(&enum_name)
                .ok_or_else(|| anyhow!("unknown enum {enum_name}"))?
                .clone();
            let mut covered = BTreeSet::new();
            for case in &switch.cases {
                for label in &case.labels {
                    if let Some(member) = label_name(label) {
                        covered.insert(member);
                    }
                }
            }
            let missing: Vec<&String> = def
                .members
                .iter()
                .filter(|m| !covered.contains(m.as_str()))
                .collect();
            match (&switch.default_body, switch.default_covers) {
                (None, _) if !missing.is_empty() => codegen_bail!(
                    NonExhaustiveSwitch,
                    pos,
                    "switch on {enum_name} misses {count} variant(s): {names}",
                    count = missing.len(),
                    names = missing
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                (Some(_), Some(declared))
                    if declared as usize != missing.len() =>
                {
                    codegen_bail!(
                        NonExhaustiveSwitch,
                        pos,
                        "default({declared}) does not match the {count} uncovered variant(s)",
                        count = missing.len()
                    )
                }
                _ => {}
            }
        }

        let selector =
            self.gen_expr_expecting(&switch.selector, None)?;
        self.flush_pending();
        self.line(&format!("switch ({selector}) {{"));
        self.indent += 1;
        for case in &switch.cases {
            for label in &case.labels {
                let text = self
                    .gen_expr_expecting(label, selector_type.clone())?;
                self.line(&format!("case {text}:"));
            }
            self.indent += 1;
            self.emit_block_stmts(&case.body)?;
            self.line("break;");
            self.indent -= 1;
        }
        if let Some(default_body) = &switch.default_body {
            self.line("default:");
            self.indent += 1;
            self.emit_block_stmts(default_body)?;
            self.line("break;");
            self.indent -= 1;
        }
        self.indent -= 1;
        self.line("}");
        Ok(())
    }
}

/// The trailing member name of a label path, for enum coverage.
fn label_name(label: &Expr) -> Option<String> {
    match label {
        Expr::Path(chain) => {
            chain.segments.last().map(|s| s.name.clone())
        }
        _ => None,
    }
}
