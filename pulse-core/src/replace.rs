#![forbid(unsafe_code)]

use pulse_ast::{
    AssignStmt, Block, Expr, ExprKind, ForStmt, FunctionDef, IfStmt, ReturnStmt, Span, Stmt,
    WhileStmt,
};
use pulse_host::{Builtin, Callable, Host, HostFnId, KernelRef, OwnerId, Value};

use crate::encode::ident_expr;
use crate::error::{InlineError, Result};
use crate::eval::{describe_ref, eval_static};
use crate::inline::{Arg, InlineConfig, inline_at_depth};
use crate::session::Session;

/// Rewrites one function body in place of one inlining level: references go
/// through the session's resolver, and every call site is classified as
/// embeddable, inlinable, or remote. Inlinable calls recurse into the
/// orchestrator on the shared session.
pub(crate) struct Replacer<'a> {
    pub(crate) host: &'a Host,
    pub(crate) session: &'a mut Session,
    pub(crate) owner: OwnerId,
    pub(crate) func: String,
    pub(crate) config: &'a InlineConfig,
    pub(crate) depth: usize,
}

impl Replacer<'_> {
    /// Drops decorator metadata and rewrites the whole body.
    pub(crate) fn rewrite_function(&mut self, def: &mut FunctionDef) -> Result<()> {
        def.decorators.clear();
        let stmts = std::mem::take(&mut def.body.stmts);
        def.body.stmts = self.rewrite_stmts(stmts)?;
        Ok(())
    }

    fn rewrite_stmts(&mut self, stmts: Vec<Stmt>) -> Result<Vec<Stmt>> {
        let mut out = Vec::new();
        for stmt in stmts {
            self.rewrite_stmt(stmt, &mut out)?;
        }
        Ok(out)
    }

    fn rewrite_block(&mut self, block: Block) -> Result<Block> {
        Ok(Block {
            span: block.span,
            stmts: self.rewrite_stmts(block.stmts)?,
        })
    }

    fn rewrite_stmt(&mut self, stmt: Stmt, out: &mut Vec<Stmt>) -> Result<()> {
        match stmt {
            Stmt::Assign(assign) => {
                let mut hoisted = Vec::new();
                // the target resolves before the right-hand side
                let target = self.rewrite_expr(assign.target, true, &mut hoisted)?;
                let value = self.rewrite_expr(assign.value, false, &mut hoisted)?;
                out.extend(hoisted);
                out.push(Stmt::Assign(AssignStmt {
                    span: assign.span,
                    target,
                    value,
                }));
                Ok(())
            }
            Stmt::If(if_stmt) => {
                let mut hoisted = Vec::new();
                let cond = self.rewrite_expr(if_stmt.cond, false, &mut hoisted)?;
                let then_block = self.rewrite_block(if_stmt.then_block)?;
                let else_block = match if_stmt.else_block {
                    Some(block) => Some(self.rewrite_block(block)?),
                    None => None,
                };
                out.extend(hoisted);
                out.push(Stmt::If(IfStmt {
                    span: if_stmt.span,
                    cond,
                    then_block,
                    else_block,
                }));
                Ok(())
            }
            Stmt::While(while_stmt) => {
                let cond_span = while_stmt.cond.span;
                let mut hoisted = Vec::new();
                let cond = self.rewrite_expr(while_stmt.cond, false, &mut hoisted)?;
                if !hoisted.is_empty() {
                    // hoisting would evaluate the callee once instead of per
                    // iteration
                    return Err(InlineError::MalformedInput {
                        message: "a kernel call in a loop condition cannot be flattened"
                            .to_string(),
                        span: cond_span,
                    });
                }
                let body = self.rewrite_block(while_stmt.body)?;
                out.push(Stmt::While(WhileStmt {
                    span: while_stmt.span,
                    cond,
                    body,
                }));
                Ok(())
            }
            Stmt::For(for_stmt) => {
                let mut hoisted = Vec::new();
                let target = self.rewrite_expr(for_stmt.target, true, &mut hoisted)?;
                let iter = self.rewrite_expr(for_stmt.iter, false, &mut hoisted)?;
                let body = self.rewrite_block(for_stmt.body)?;
                out.extend(hoisted);
                out.push(Stmt::For(ForStmt {
                    span: for_stmt.span,
                    target,
                    iter,
                    body,
                }));
                Ok(())
            }
            Stmt::Return(ret) => {
                let mut hoisted = Vec::new();
                let value = match ret.value {
                    Some(value) => Some(self.rewrite_expr(value, false, &mut hoisted)?),
                    None => None,
                };
                out.extend(hoisted);
                out.push(Stmt::Return(ReturnStmt {
                    span: ret.span,
                    value,
                }));
                Ok(())
            }
            Stmt::Pass(pass) => {
                out.push(Stmt::Pass(pass));
                Ok(())
            }
            // nested definitions are already rejected by the read-only scan;
            // a body must never be rewritten under the outer function's scope
            Stmt::FuncDef(def) => Err(InlineError::MalformedInput {
                message: format!(
                    "more than one function definition: `{}` is nested in the body",
                    def.name.node
                ),
                span: def.span,
            }),
            Stmt::ExprStmt(expr) => {
                let span = expr.span;
                match expr.kind {
                    ExprKind::Call { callee, args } => {
                        self.rewrite_call_stmt(span, *callee, args, out)
                    }
                    kind => {
                        let mut hoisted = Vec::new();
                        let expr = self.rewrite_expr(Expr { span, kind }, false, &mut hoisted)?;
                        out.extend(hoisted);
                        out.push(Stmt::ExprStmt(expr));
                        Ok(())
                    }
                }
            }
        }
    }

    /// Rewrites an expression in value position. Statements produced by
    /// inlined value-producing calls accumulate in `hoisted` and belong
    /// before the statement under rewrite.
    fn rewrite_expr(&mut self, expr: Expr, store: bool, hoisted: &mut Vec<Stmt>) -> Result<Expr> {
        let span = expr.span;
        match expr.kind {
            kind @ (ExprKind::Ident(_) | ExprKind::Member { .. } | ExprKind::Index { .. }) => {
                let target = Expr { span, kind };
                self.session
                    .resolve(self.host, self.owner, &self.func, &target, store)
            }
            kind @ (ExprKind::IntLit(_) | ExprKind::FloatLit(_) | ExprKind::StringLit(_)) => {
                Ok(Expr { span, kind })
            }
            ExprKind::Unary { op, expr } => {
                let expr = self.rewrite_expr(*expr, false, hoisted)?;
                Ok(Expr {
                    span,
                    kind: ExprKind::Unary {
                        op,
                        expr: Box::new(expr),
                    },
                })
            }
            ExprKind::Binary { left, op, right } => {
                let left = self.rewrite_expr(*left, false, hoisted)?;
                let right = self.rewrite_expr(*right, false, hoisted)?;
                Ok(Expr {
                    span,
                    kind: ExprKind::Binary {
                        left: Box::new(left),
                        op,
                        right: Box::new(right),
                    },
                })
            }
            ExprKind::Call { callee, args } => self.rewrite_call_expr(span, *callee, args, hoisted),
        }
    }

    /// Resolves a call target to its callable descriptor and rewrites the
    /// argument list. The target expression itself is only evaluated, never
    /// rewritten; the environment is the function's folded constants plus
    /// its module bindings.
    fn classify_call(
        &mut self,
        callee: Expr,
        args: Vec<Expr>,
        hoisted: &mut Vec<Stmt>,
    ) -> Result<(Callable, Vec<Expr>)> {
        let module = self.host.owner_module(self.owner);
        let constants = self.session.constants_of(self.owner, &self.func);
        let callable = match eval_static(self.host, module, &constants, &callee) {
            Some(Value::Callable(callable)) => callable,
            _ => {
                return Err(InlineError::UnresolvedReference {
                    name: describe_ref(&callee),
                    owner: self.host.owner_name(self.owner).to_string(),
                    func: self.func.clone(),
                    span: callee.span,
                });
            }
        };
        let mut resolved = Vec::with_capacity(args.len());
        for arg in args {
            resolved.push(self.rewrite_expr(arg, false, hoisted)?);
        }
        Ok((callable, resolved))
    }

    /// A call in value position: embeddable and remote calls stay call
    /// expressions; an inlined kernel body is hoisted and its trailing
    /// return supplies the value.
    fn rewrite_call_expr(
        &mut self,
        span: Span,
        callee: Expr,
        args: Vec<Expr>,
        hoisted: &mut Vec<Stmt>,
    ) -> Result<Expr> {
        let (callable, args) = self.classify_call(callee, args, hoisted)?;
        match callable {
            Callable::Embeddable(builtin) => Ok(embedded_call(span, builtin, args)),
            Callable::HostFn(host_fn) => Ok(self.remote_call(span, host_fn, args)),
            Callable::Kernel(kref) => {
                let mut body = self.inline_kernel(kref, args)?;
                match body.pop() {
                    Some(Stmt::Return(ReturnStmt {
                        value: Some(value), ..
                    })) => {
                        hoisted.extend(body);
                        Ok(value)
                    }
                    _ => {
                        let name = self.host.function_def(kref.function).name.node.clone();
                        Err(InlineError::MalformedInput {
                            message: format!(
                                "`{name}` does not end in a value-carrying return and cannot supply a value here"
                            ),
                            span,
                        })
                    }
                }
            }
        }
    }

    /// A call as its own statement: an inlined kernel body is spliced
    /// verbatim in place of the call.
    fn rewrite_call_stmt(
        &mut self,
        span: Span,
        callee: Expr,
        args: Vec<Expr>,
        out: &mut Vec<Stmt>,
    ) -> Result<()> {
        let mut hoisted = Vec::new();
        let (callable, args) = self.classify_call(callee, args, &mut hoisted)?;
        out.extend(hoisted);
        match callable {
            Callable::Embeddable(builtin) => {
                out.push(Stmt::ExprStmt(embedded_call(span, builtin, args)));
            }
            Callable::HostFn(host_fn) => {
                let call = self.remote_call(span, host_fn, args);
                out.push(Stmt::ExprStmt(call));
            }
            Callable::Kernel(kref) => {
                let body = self.inline_kernel(kref, args)?;
                out.extend(body);
            }
        }
        Ok(())
    }

    fn inline_kernel(&mut self, kref: KernelRef, args: Vec<Expr>) -> Result<Vec<Stmt>> {
        let mut call_args = Vec::with_capacity(args.len() + 1);
        call_args.push(Arg::Value(Value::Object(kref.owner)));
        call_args.extend(args.into_iter().map(Arg::Expr));
        inline_at_depth(
            self.host,
            self.session,
            self.config,
            self.depth + 1,
            kref.function,
            call_args,
        )
    }

    /// `syscall("rpc", <id>, <args>...)` — ids are assigned after the
    /// arguments are rewritten, so remote calls nested in the argument list
    /// receive theirs first.
    fn remote_call(&mut self, span: Span, host_fn: HostFnId, args: Vec<Expr>) -> Expr {
        let id = self.session.rpc_id(host_fn);
        let mut rpc_args = Vec::with_capacity(args.len() + 2);
        rpc_args.push(Expr {
            span,
            kind: ExprKind::StringLit("rpc".to_string()),
        });
        rpc_args.push(Expr {
            span,
            kind: ExprKind::IntLit(i64::from(id)),
        });
        rpc_args.extend(args);
        embedded_call(span, Builtin::Syscall, rpc_args)
    }
}

fn embedded_call(span: Span, builtin: Builtin, args: Vec<Expr>) -> Expr {
    Expr {
        span,
        kind: ExprKind::Call {
            callee: Box::new(ident_expr(span, builtin.name())),
            args,
        },
    }
}
