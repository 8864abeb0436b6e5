#![forbid(unsafe_code)]

use std::collections::HashSet;

use pulse_ast::{Block, Expr, ExprKind, FunctionDef, Stmt};

use crate::error::{InlineError, Result};

/// Returns the parameters of `def` that are never reassigned anywhere in its
/// body. Assignment targets and `for`-loop targets both count as
/// reassignment. Read-only parameters can be folded into the output instead
/// of being materialized as variables.
///
/// The scan covers exactly one definition: a nested `FuncDef` in the body is
/// `MalformedInput`.
pub fn read_only_params(def: &FunctionDef) -> Result<HashSet<String>> {
    let mut params: HashSet<String> = def.params.iter().map(|p| p.node.clone()).collect();
    scan_block(&def.body, &mut params)?;
    Ok(params)
}

fn scan_block(block: &Block, params: &mut HashSet<String>) -> Result<()> {
    for stmt in &block.stmts {
        scan_stmt(stmt, params)?;
    }
    Ok(())
}

fn scan_stmt(stmt: &Stmt, params: &mut HashSet<String>) -> Result<()> {
    match stmt {
        Stmt::Assign(assign) => {
            remove_store_target(&assign.target, params);
            Ok(())
        }
        Stmt::If(if_stmt) => {
            scan_block(&if_stmt.then_block, params)?;
            if let Some(else_block) = &if_stmt.else_block {
                scan_block(else_block, params)?;
            }
            Ok(())
        }
        Stmt::While(while_stmt) => scan_block(&while_stmt.body, params),
        Stmt::For(for_stmt) => {
            remove_store_target(&for_stmt.target, params);
            scan_block(&for_stmt.body, params)
        }
        Stmt::FuncDef(inner) => Err(InlineError::MalformedInput {
            message: format!(
                "more than one function definition: `{}` is nested in the body",
                inner.name.node
            ),
            span: inner.span,
        }),
        Stmt::Return(_) | Stmt::Pass(_) | Stmt::ExprStmt(_) => Ok(()),
    }
}

fn remove_store_target(target: &Expr, params: &mut HashSet<String>) {
    if let ExprKind::Ident(ident) = &target.kind {
        params.remove(&ident.node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_ast::{AssignStmt, ForStmt, Ident, IfStmt, span};

    fn ident(text: &str) -> Ident {
        Ident::new(span(0, text.len()), text.to_string())
    }

    fn name(text: &str) -> Expr {
        Expr {
            span: span(0, text.len()),
            kind: ExprKind::Ident(ident(text)),
        }
    }

    fn assign(target: &str, value: Expr) -> Stmt {
        Stmt::Assign(AssignStmt {
            span: span(0, 1),
            target: name(target),
            value,
        })
    }

    fn def_with_body(params: &[&str], stmts: Vec<Stmt>) -> FunctionDef {
        FunctionDef {
            span: span(0, 1),
            name: ident("f"),
            decorators: vec![ident("kernel")],
            params: params.iter().map(|p| ident(p)).collect(),
            body: Block {
                span: span(0, 1),
                stmts,
            },
        }
    }

    #[test]
    fn untouched_params_are_read_only() {
        let def = def_with_body(&["self", "x"], vec![Stmt::ExprStmt(name("x"))]);
        let read_only = read_only_params(&def).unwrap();
        assert!(read_only.contains("self"));
        assert!(read_only.contains("x"));
    }

    #[test]
    fn assigned_params_are_mutable() {
        let def = def_with_body(&["self", "y"], vec![assign("y", name("y"))]);
        let read_only = read_only_params(&def).unwrap();
        assert!(read_only.contains("self"));
        assert!(!read_only.contains("y"));
    }

    #[test]
    fn assignment_in_a_branch_counts() {
        let branch = Stmt::If(IfStmt {
            span: span(0, 1),
            cond: name("x"),
            then_block: Block {
                span: span(0, 1),
                stmts: vec![assign("x", name("x"))],
            },
            else_block: None,
        });
        let def = def_with_body(&["self", "x"], vec![branch]);
        assert!(!read_only_params(&def).unwrap().contains("x"));
    }

    #[test]
    fn loop_targets_count_as_stores() {
        let body = Stmt::For(ForStmt {
            span: span(0, 1),
            target: name("i"),
            iter: name("n"),
            body: Block {
                span: span(0, 1),
                stmts: vec![],
            },
        });
        let def = def_with_body(&["self", "i", "n"], vec![body]);
        let read_only = read_only_params(&def).unwrap();
        assert!(!read_only.contains("i"));
        assert!(read_only.contains("n"));
    }

    #[test]
    fn nested_definitions_are_rejected() {
        let nested = Stmt::FuncDef(def_with_body(&["self"], vec![]));
        let def = def_with_body(&["self"], vec![nested]);
        let err = read_only_params(&def).unwrap_err();
        assert!(matches!(err, InlineError::MalformedInput { .. }));
    }
}
