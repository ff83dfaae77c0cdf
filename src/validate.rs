//! Cross-cutting validators: enum assignment shapes and critical
//! section discipline.

use anyhow::Result;

use crate::ast::{Expr, Pos, Prefix, Stmt};
use crate::codegen_bail;
use crate::gen::Codegen;
use crate::ty::TypeInfo;

impl Codegen<'_> {
    /// Enum targets accept only members of the same enum: qualified
    /// (`Color.Red`, `this.Color.Red`, `global.Color.Red`,
    /// `Scope.Color.Red`), unqualified members resolved through the
    /// expected type, or values already of the enum.
    pub(crate) fn validate_enum_assignment(
        &self,
        target: &TypeInfo,
        value: &Expr,
        pos: Pos,
    ) -> Result<()> {
        let enum_name = target
            .enum_type
            .as_deref()
            .unwrap_or("enum");
        match value {
            Expr::IntLit { .. } => codegen_bail!(
                IntegerToEnum,
                pos,
                "cannot assign an integer to {enum_name}"
            ),
            Expr::Path(chain) => {
                // bare member, resolved against the expected enum
                if chain.prefix == Prefix::None && chain.segments.len() == 1 {
                    let member = &chain.segments[0].name;
                    let is_member = self
                        .symbols
                        .enum_def(enum_name)
                        .is_some_and(|def| def.has_member(member));
                    if is_member {
                        return Ok(());
                    }
                }
                let value_type = self.resolver().chain_type(chain);
                match value_type {
                    Some(ty) if ty.is_enum => {
                        if ty.enum_type.as_deref() == Some(enum_name) {
                            Ok(())
                        } else {
                            codegen_bail!(
                                EnumMismatch,
                                pos,
                                "cannot assign {other} to {enum_name}",
                                other = ty
                                    .enum_type
                                    .as_deref()
                                    .unwrap_or("a different enum")
                            )
                        }
                    }
                    Some(ty) if ty.is_integer() => codegen_bail!(
                        IntegerToEnum,
                        pos,
                        "cannot assign an integer to {enum_name}"
                    ),
                    Some(_) => codegen_bail!(
                        NonEnumToEnum,
                        pos,
                        "cannot assign a non-enum value to {enum_name}"
                    ),
                    None => codegen_bail!(
                        NonEnumToEnum,
                        pos,
                        "cannot assign an unknown value to {enum_name}"
                    ),
                }
            }
            Expr::Call(call) => {
                let name = self.resolver().callee_name(&call.callee);
                let returns_same = self
                    .symbols
                    .function(&name)
                    .and_then(|sig| sig.return_type.as_ref())
                    .is_some_and(|ret| {
                        ret.is_enum
                            && ret.enum_type.as_deref() == Some(enum_name)
                    });
                if returns_same {
                    Ok(())
                } else {
                    codegen_bail!(
                        NonEnumToEnum,
                        pos,
                        "call does not return {enum_name}"
                    )
                }
            }
            Expr::Ternary {
                then_expr,
                else_expr,
                ..
            } => {
                self.validate_enum_assignment(target, then_expr, pos)?;
                self.validate_enum_assignment(target, else_expr, pos)
            }
            _ => codegen_bail!(
                NonEnumToEnum,
                pos,
                "cannot assign a non-enum value to {enum_name}"
            ),
        }
    }

    /// `return` is forbidden anywhere transitively inside a critical
    /// section.
    pub(crate) fn validate_no_early_exit(
        &self,
        body: &[Stmt],
        pos: Pos,
    ) -> Result<()> {
        for stmt in body {
            match stmt {
                Stmt::Return { pos: return_pos, .. } => codegen_bail!(
                    EarlyExitInCriticalSection,
                    *return_pos,
                    "return would leave the critical section locked"
                ),
                Stmt::If {
                    then_body,
                    else_body,
                    ..
                } => {
                    self.validate_no_early_exit(then_body, pos)?;
                    if let Some(else_body) = else_body {
                        self.validate_no_early_exit(else_body, pos)?;
                    }
                }
                Stmt::While { body, .. }
                | Stmt::DoWhile { body, .. }
                | Stmt::CriticalSection { body, .. } => {
                    self.validate_no_early_exit(body, pos)?;
                }
                Stmt::Switch(switch) => {
                    for case in &switch.cases {
                        self.validate_no_early_exit(&case.body, pos)?;
                    }
                    if let Some(default_body) = &switch.default_body {
                        self.validate_no_early_exit(default_body, pos)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}
