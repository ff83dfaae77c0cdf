//! Expression generation: literals with MISRA 7.2 suffixes, identifier
//! resolution, operators with cast insertion, and calls.

pub(crate) mod args;
pub(crate) mod deref;
pub(crate) mod member;

use anyhow::{anyhow, Result};

use crate::ast::{BinaryOp, Expr, Pos, UnaryOp};
use crate::cast;
use crate::codegen_bail;
use crate::gen::Codegen;
use crate::include::IncludeTag;
use crate::literal::{self, LiteralBase};
use crate::ty::{BaseType, TypeInfo};

impl Codegen<'_> {
    /// Generate an expression with a specific expected target type in
    /// force, restoring the previous one on every exit path.
    pub(crate) fn gen_expr_expecting(
        &mut self,
        expr: &Expr,
        expected: Option<TypeInfo>,
    ) -> Result<String> {
        let previous = self.state.swap_expected(expected);
        let result = self.gen_expr(expr);
        self.state.swap_expected(previous);
        result
    }

    pub(crate) fn gen_expr(&mut self, expr: &Expr) -> Result<String> {
        match expr {
            Expr::IntLit { text, pos } => self.render_int_literal(text, *pos),
            Expr::FloatLit { text, .. } => Ok(render_float_literal(text)),
            Expr::StringLit { value, .. } => Ok(render_string_literal(value)),
            Expr::BoolLit { value, .. } => {
                self.state.includes.request(IncludeTag::Stdbool);
                Ok(if *value { "true" } else { "false" }.to_owned())
            }
            Expr::Path(chain) => Ok(self.gen_chain(chain, false)?.text),
            Expr::Unary { op, operand, pos } => {
                if *op == UnaryOp::Neg || *op == UnaryOp::BitNot {
                    let inner = self.gen_expr(operand)?;
                    return Ok(format!(
                        "{}{}",
                        op.c_token(),
                        parenthesize(operand, inner)
                    ));
                }
                // logical negation operates on a boolean operand
                let resolver_is_bool = self
                    .resolver()
                    .is_boolean_producing(operand);
                if !resolver_is_bool {
                    codegen_bail!(
                        NonBooleanCondition,
                        *pos,
                        "`!` requires a boolean operand"
                    );
                }
                let inner = self.gen_expr(operand)?;
                Ok(format!("!{}", parenthesize(operand, inner)))
            }
            Expr::Binary { op, lhs, rhs, pos } => {
                self.gen_binary(*op, lhs, rhs, *pos)
            }
            Expr::Call(call) => self.gen_call_expr(call),
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
                pos,
            } => self.gen_ternary(cond, then_expr, else_expr, *pos),
            Expr::ArrayLit { elements, .. } => {
                let mut parts = Vec::with_capacity(elements.len());
                for element in elements {
                    parts.push(self.gen_expr(element)?);
                }
                self.state.last_array_init_count = Some(elements.len());
                self.state.last_array_fill = None;
                Ok(format!("{{{}}}", parts.join(", ")))
            }
            Expr::ArrayFill { value, .. } => {
                let fill = self.gen_expr(value)?;
                self.state.last_array_init_count = Some(0);
                self.state.last_array_fill = Some(fill.clone());
                Ok(format!("{{{fill}}}"))
            }
            Expr::Sizeof { operand, pos } => self.gen_sizeof(operand, *pos),
        }
    }

    fn render_int_literal(&mut self, text: &str, pos: Pos) -> Result<String> {
        let parsed = literal::parse_int(text)
            .ok_or_else(|| anyhow!("malformed integer literal `{text}`"))?;
        let target = match &parsed.suffix {
            Some(base) => Some(base.clone()),
            None => self
                .state
                .expected_type
                .as_ref()
                .map(|t| t.base.clone()),
        };
        if let Some(target) = &target {
            if target.is_integer() && !literal::fits(parsed.value, target) {
                codegen_bail!(
                    LiteralOutOfRange,
                    pos,
                    "literal {} does not fit in {}",
                    parsed.value,
                    target.c_type()
                );
            }
        }
        let body = match parsed.base {
            LiteralBase::Decimal => format!("{}", parsed.value),
            // C has no binary literals; both render as hex
            LiteralBase::Hex | LiteralBase::Binary => {
                format!("0x{:X}", parsed.value)
            }
        };
        // MISRA 7.2: unsigned targets take an unsigned suffix
        let suffix = match &target {
            Some(base) if base.is_unsigned() => {
                member::bit_suffix(base.bit_width() > 32)
            }
            _ => "",
        };
        Ok(format!("{body}{suffix}"))
    }

    fn gen_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        pos: Pos,
    ) -> Result<String> {
        if op.is_shift() {
            let lhs_type = self
                .resolver()
                .expr_type(lhs)
                .map(|t| t.base)
                .unwrap_or(BaseType::U32);
            cast::validate_shift_amount(&lhs_type, rhs, pos)?;
            let left = self.gen_expr(lhs)?;
            // shift amounts carry no suffix
            let right = self.gen_expr_expecting(rhs, None)?;
            return Ok(format!(
                "{} {} {}",
                parenthesize(lhs, left),
                op.c_token(),
                right
            ));
        }
        if op.is_comparison() || op.is_logical() {
            // operands resolve their own types; no target suffix leaks in
            let lhs_expected = self.resolver().expr_type(rhs);
            let left = self.gen_expr_expecting(lhs, lhs_expected)?;
            let rhs_expected = self.resolver().expr_type(lhs);
            let right = self.gen_expr_expecting(rhs, rhs_expected)?;
            return Ok(format!(
                "{} {} {}",
                parenthesize(lhs, left),
                op.c_token(),
                parenthesize(rhs, right)
            ));
        }
        let left = self.gen_expr(lhs)?;
        let right = self.gen_expr(rhs)?;
        Ok(format!(
            "{} {} {}",
            parenthesize(lhs, left),
            op.c_token(),
            parenthesize(rhs, right)
        ))
    }

    fn gen_ternary(
        &mut self,
        cond: &Expr,
        then_expr: &Expr,
        else_expr: &Expr,
        pos: Pos,
    ) -> Result<String> {
        if !self.resolver().is_boolean_producing(cond) {
            codegen_bail!(
                NonBooleanCondition,
                pos,
                "ternary condition must be boolean"
            );
        }
        if contains_call(cond) {
            codegen_bail!(
                FunctionCallInCondition,
                pos,
                "ternary conditions cannot call functions"
            );
        }
        if matches!(then_expr, Expr::Ternary { .. })
            || matches!(else_expr, Expr::Ternary { .. })
        {
            codegen_bail!(
                NestedTernary,
                pos,
                "ternary expressions cannot nest"
            );
        }
        let cond = self.gen_expr_expecting(cond, None)?;
        let then_text = self.gen_expr(then_expr)?;
        let else_text = self.gen_expr(else_expr)?;
        Ok(format!("({cond}) ? {then_text} : {else_text}"))
    }

    fn gen_sizeof(&mut self, operand: &Expr, pos: Pos) -> Result<String> {
        let Expr::Path(chain) = operand else {
            codegen_bail!(
                UnsupportedSizeofExpression,
                pos,
                "sizeof takes a plain identifier"
            );
        };
        if !chain.is_simple() {
            codegen_bail!(
                UnsupportedSizeofExpression,
                pos,
                "sizeof takes a plain identifier"
            );
        }
        let name = &chain.segments[0].name;
        if let Some(param) = self.state.parameter(name) {
            if param.ty.is_array {
                codegen_bail!(
                    SizeofArrayParameter,
                    pos,
                    "array parameters decay; sizeof({name}) would measure a pointer"
                );
            }
        }
        let lv = self.gen_chain(chain, false)?;
        Ok(format!("sizeof({})", lv.text))
    }

    /// Generate a boolean condition, enforcing MISRA 14.4.
    pub(crate) fn gen_condition(
        &mut self,
        cond: &Expr,
        pos: Pos,
    ) -> Result<String> {
        if !self.resolver().is_boolean_producing(cond) {
            codegen_bail!(
                NonBooleanCondition,
                pos,
                "condition must produce a boolean"
            );
        }
        self.gen_expr_expecting(cond, None)
    }
}

/// Wrap composite operands so operator precedence never leaks.
fn parenthesize(expr: &Expr, text: String) -> String {
    match expr {
        Expr::Binary { .. } | Expr::Ternary { .. } => format!("({text})"),
        _ => text,
    }
}

pub(crate) fn contains_call(expr: &Expr) -> bool {
    match expr {
        Expr::Call(_) => true,
        Expr::Unary { operand, .. } => contains_call(operand),
        Expr::Binary { lhs, rhs, .. } => {
            contains_call(lhs) || contains_call(rhs)
        }
        Expr::Ternary {
            cond,
            then_expr,
            else_expr,
            ..
        } => {
            contains_call(cond)
                || contains_call(then_expr)
                || contains_call(else_expr)
        }
        _ => false,
    }
}

fn render_float_literal(text: &str) -> String {
    let (body, base) = if let Some(body) = text.strip_suffix("f32") {
        (body, BaseType::F32)
    } else if let Some(body) = text.strip_suffix("f64") {
        (body, BaseType::F64)
    } else if let Some(body) = text.strip_suffix("f96") {
        (body, BaseType::F96)
    } else {
        (text, BaseType::F32)
    };
    let body = if body.contains('.') {
        body.to_owned()
    } else {
        format!("{body}.0")
    };
    match base {
        BaseType::F32 => format!("{body}f"),
        BaseType::F96 => format!("{body}L"),
        _ => body,
    }
}

fn render_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}
