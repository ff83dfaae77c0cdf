//! Fixed-point propagation of parameter modification across the call
//! graph, feeding auto-`const` inference and the small-primitive
//! pass-by-value optimization.

use std::collections::{BTreeMap, BTreeSet};

use crate::ast::{Expr, Function, Item, Prefix, Stmt, Unit};
use crate::symbol::{scoped_name, SymbolTable};
use crate::ty::BaseType;

#[derive(Debug, Default)]
pub struct CallGraphAnalysis {
    /// Function name -> parameters it (transitively) modifies.
    pub modified: BTreeMap<String, BTreeSet<String>>,
    /// Function name -> parameters eligible for by-value passing.
    pub pass_by_value: BTreeMap<String, BTreeSet<String>>,
}

/// One argument position that forwards a bare caller parameter.
#[derive(Debug)]
struct CallEdge {
    caller: String,
    callee: String,
    arg_index: usize,
    caller_param: String,
}

pub fn analyze(unit: &Unit, symbols: &SymbolTable) -> CallGraphAnalysis {
    let mut modified: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut edges: Vec<CallEdge> = Vec::new();
    let mut param_lists: BTreeMap<String, Vec<String>> = BTreeMap::new();

    collect(&unit.items, None, symbols, &mut modified, &mut edges, &mut param_lists);

    // monotone growth over a finite universe; terminates
    loop {
        let mut changed = false;
        for edge in &edges {
            let callee_param = symbols
                .function(&edge.callee)
                .and_then(|sig| sig.params.get(edge.arg_index))
                .map(|p| p.name.clone());
            let Some(callee_param) = callee_param else { continue };
            let callee_modifies = modified
                .get(&edge.callee)
                .is_some_and(|set| set.contains(&callee_param));
            if callee_modifies {
                let set = modified.entry(edge.caller.clone()).or_default();
                changed |= set.insert(edge.caller_param.clone());
            }
        }
        if !changed {
            break;
        }
    }

    let mut pass_by_value: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (function, params) in &param_lists {
        let Some(sig) = symbols.function(function) else { continue };
        let by_value = pass_by_value.entry(function.clone()).or_default();
        for name in params {
            let Some(param) = sig.params.iter().find(|p| &p.name == name)
            else {
                continue;
            };
            let is_modified = modified
                .get(function)
                .is_some_and(|set| set.contains(name));
            if is_modified || param.force_pointer {
                continue;
            }
            let small_integer = (param.ty.base.is_integer()
                && param.ty.bit_width <= 32)
                || param.ty.base == BaseType::Bool;
            if small_integer && !param.ty.is_array && !param.ty.is_string {
                by_value.insert(name.clone());
            }
        }
    }

    CallGraphAnalysis {
        modified,
        pass_by_value,
    }
}

fn collect(
    items: &[Item],
    scope: Option<&str>,
    symbols: &SymbolTable,
    modified: &mut BTreeMap<String, BTreeSet<String>>,
    edges: &mut Vec<CallEdge>,
    param_lists: &mut BTreeMap<String, Vec<String>>,
) {
    for item in items {
        match item {
            Item::Function(function) => {
                let name = match scope {
                    Some(scope) => scoped_name(scope, &function.name),
                    None => function.name.clone(),
                };
                seed_function(&name, scope, function, symbols, modified, edges);
                param_lists.insert(
                    name,
                    function.params.iter().map(|p| p.name.clone()).collect(),
                );
            }
            Item::Scope { name, items, .. } => {
                collect(
                    items,
                    Some(name.as_str()),
                    symbols,
                    modified,
                    edges,
                    param_lists,
                );
            }
            _ => {}
        }
    }
}

fn seed_function(
    name: &str,
    scope: Option<&str>,
    function: &Function,
    symbols: &SymbolTable,
    modified: &mut BTreeMap<String, BTreeSet<String>>,
    edges: &mut Vec<CallEdge>,
) {
    let params: BTreeSet<&str> =
        function.params.iter().map(|p| p.name.as_str()).collect();
    let mut locals = BTreeSet::new();
    collect_locals(&function.body, &mut locals);

    let mut seeds = BTreeSet::new();
    walk_stmts(
        &function.body,
        &mut |stmt| {
            if let Stmt::Assign(assign) = stmt {
                if assign.target.prefix == Prefix::None {
                    let root = assign.target.segments[0].name.as_str();
                    if params.contains(root) && !locals.contains(root) {
                        seeds.insert(root.to_owned());
                    }
                }
            }
        },
        &mut |_| {},
    );
    walk_stmts(
        &function.body,
        &mut |_| {},
        &mut |expr| {
            if let Expr::Call(call) = expr {
                let callee = resolve_callee(&call.callee, scope, symbols);
                for (arg_index, arg) in call.args.iter().enumerate() {
                    let Expr::Path(chain) = arg else { continue };
                    if !chain.is_simple() {
                        continue;
                    }
                    let root = chain.segments[0].name.as_str();
                    if !params.contains(root) || locals.contains(root) {
                        continue;
                    }
                    if symbols.function(&callee).is_some() {
                        edges.push(CallEdge {
                            caller: name.to_owned(),
                            callee: callee.clone(),
                            arg_index,
                            caller_param: root.to_owned(),
                        });
                    } else {
                        // unknown callee: assume the worst
                        seeds.insert(root.to_owned());
                    }
                }
            }
        },
    );

    modified.entry(name.to_owned()).or_default().extend(seeds);
}

fn resolve_callee(
    callee: &crate::ast::PostfixChain,
    scope: Option<&str>,
    symbols: &SymbolTable,
) -> String {
    let segments = &callee.segments;
    if callee.prefix == Prefix::This {
        return scoped_name(scope.unwrap_or(""), &segments[0].name);
    }
    if segments.len() >= 2 && symbols.is_scope(&segments[0].name) {
        return scoped_name(&segments[0].name, &segments[1].name);
    }
    if let Some(scope) = scope {
        let scoped = scoped_name(scope, &segments[0].name);
        if symbols.function(&scoped).is_some() {
            return scoped;
        }
    }
    segments[0].name.clone()
}

fn collect_locals(stmts: &[Stmt], out: &mut BTreeSet<String>) {
    walk_stmts(
        stmts,
        &mut |stmt| {
            if let Stmt::VarDecl(decl) = stmt {
                out.insert(decl.name.clone());
            }
        },
        &mut |_| {},
    );
}

/// Depth-first walk over statements and every contained expression.
fn walk_stmts(
    stmts: &[Stmt],
    on_stmt: &mut impl FnMut(&Stmt),
    on_expr: &mut impl FnMut(&Expr),
) {
    for stmt in stmts {
        on_stmt(stmt);
        match stmt {
            Stmt::VarDecl(decl) => {
                if let Some(init) = &decl.init {
                    walk_expr(init, on_expr);
                }
            }
            Stmt::Assign(assign) => {
                for segment in &assign.target.segments {
                    for group in &segment.subscripts {
                        for expr in &group.exprs {
                            walk_expr(expr, on_expr);
                        }
                    }
                }
                walk_expr(&assign.value, on_expr);
            }
            Stmt::Call(call) => {
                walk_expr(&Expr::Call(call.clone()), on_expr);
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
                ..
            } => {
                walk_expr(cond, on_expr);
                walk_stmts(then_body, on_stmt, on_expr);
                if let Some(body) = else_body {
                    walk_stmts(body, on_stmt, on_expr);
                }
            }
            Stmt::While { cond, body, .. }
            | Stmt::DoWhile { body, cond, .. } => {
                walk_expr(cond, on_expr);
                walk_stmts(body, on_stmt, on_expr);
            }
            Stmt::Switch(switch) => {
                walk_expr(&switch.selector, on_expr);
                for case in &switch.cases {
                    for label in &case.labels {
                        walk_expr(label, on_expr);
                    }
                    walk_stmts(&case.body, on_stmt, on_expr);
                }
                if let Some(body) = &switch.default_body {
                    walk_stmts(body, on_stmt, on_expr);
                }
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    walk_expr(value, on_expr);
                }
            }
            Stmt::CriticalSection { body, .. } => {
                walk_stmts(body, on_stmt, on_expr);
            }
            Stmt::Break { .. } | Stmt::Continue { .. } => {}
        }
    }
}

fn walk_expr(expr: &Expr, on_expr: &mut impl FnMut(&Expr)) {
    on_expr(expr);
    match expr {
        Expr::Unary { operand, .. } => walk_expr(operand, on_expr),
        Expr::Binary { lhs, rhs, .. } => {
            walk_expr(lhs, on_expr);
            walk_expr(rhs, on_expr);
        }
        Expr::Call(call) => {
            for arg in &call.args {
                walk_expr(arg, on_expr);
            }
        }
        Expr::Ternary {
            cond,
            then_expr,
            else_expr,
            ..
        } => {
            walk_expr(cond, on_expr);
            walk_expr(then_expr, on_expr);
            walk_expr(else_expr, on_expr);
        }
        Expr::ArrayLit { elements, .. } => {
            for element in elements {
                walk_expr(element, on_expr);
            }
        }
        Expr::ArrayFill { value, .. } => walk_expr(value, on_expr),
        Expr::Sizeof { operand, .. } => walk_expr(operand, on_expr),
        Expr::Path(chain) => {
            for segment in &chain.segments {
                for group in &segment.subscripts {
                    for inner in &group.exprs {
                        walk_expr(inner, on_expr);
                    }
                }
            }
        }
        _ => {}
    }
}
