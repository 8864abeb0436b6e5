#![forbid(unsafe_code)]

use pulse_ast::{AssignStmt, Expr, ExprKind, Ident, Stmt};
use pulse_host::{FunctionId, Host, Value};

use crate::analyze::read_only_params;
use crate::encode::encode_value;
use crate::error::{InlineError, Result};
use crate::replace::Replacer;
use crate::session::{RpcRegistry, Session};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InlineConfig {
    /// How deep kernel calls may nest before the session is aborted.
    pub max_depth: usize,
}

impl Default for InlineConfig {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

/// One concrete argument at a kernel call site: a host value for the
/// top-level invocation, or an already-resolved expression when the call
/// site itself sits inside a body being inlined.
#[derive(Clone, Debug)]
pub enum Arg {
    Value(Value),
    Expr(Expr),
}

/// Flattens the kernel function `function` invoked with `args` (the bound
/// owner first) into a single statement sequence with globally unique
/// variable names, plus the registry of calls that stay on the host.
///
/// The whole call graph reachable through kernel-to-kernel calls is inlined
/// into the result; failures abort the session with nothing kept.
pub fn inline(host: &Host, function: FunctionId, args: Vec<Arg>) -> Result<(Vec<Stmt>, RpcRegistry)> {
    inline_with_config(host, function, args, &InlineConfig::default())
}

pub fn inline_with_config(
    host: &Host,
    function: FunctionId,
    args: Vec<Arg>,
    config: &InlineConfig,
) -> Result<(Vec<Stmt>, RpcRegistry)> {
    let mut session = Session::new();
    let stmts = inline_at_depth(host, &mut session, config, 0, function, args)?;
    Ok((stmts, session.into_rpc_registry()))
}

/// One inlining level. Nested kernel calls re-enter here through the
/// replacer with the same session, so names and remote ids stay unique
/// across the whole flattened output.
pub(crate) fn inline_at_depth(
    host: &Host,
    session: &mut Session,
    config: &InlineConfig,
    depth: usize,
    function: FunctionId,
    args: Vec<Arg>,
) -> Result<Vec<Stmt>> {
    let mut def = host.function_def(function).clone();
    let func_name = def.name.node.clone();

    let owner = match args.first() {
        Some(Arg::Value(Value::Object(owner))) => *owner,
        _ => {
            return Err(InlineError::MalformedInput {
                message: format!(
                    "`{func_name}` must be invoked with its owner object as the first argument"
                ),
                span: def.span,
            });
        }
    };
    if args.len() != def.params.len() {
        return Err(InlineError::MalformedInput {
            message: format!(
                "`{func_name}` takes {} arguments, {} were supplied",
                def.params.len(),
                args.len()
            ),
            span: def.span,
        });
    }
    if depth >= config.max_depth {
        return Err(InlineError::RecursionLimitExceeded {
            owner: host.owner_name(owner).to_string(),
            func: func_name,
            limit: config.max_depth,
        });
    }

    let read_only = read_only_params(&def)?;

    let mut init = Vec::new();
    for (param, arg) in def.params.iter().zip(args) {
        if read_only.contains(&param.node) {
            match arg {
                Arg::Value(value) => session.bind_constant(owner, &func_name, &param.node, value),
                Arg::Expr(expr) => session.bind_subtree(owner, &func_name, &param.node, expr),
            }
            continue;
        }
        let target = session.resolve(host, owner, &func_name, &param_ref(param), true)?;
        let value = match arg {
            Arg::Expr(expr) => expr,
            Arg::Value(value) => match encode_value(&value, param.span) {
                Some(expr) => expr,
                None => {
                    return Err(InlineError::UnrepresentableValue {
                        value: value.display(),
                        owner: host.owner_name(owner).to_string(),
                        func: func_name.clone(),
                        span: param.span,
                    });
                }
            },
        };
        init.push(Stmt::Assign(AssignStmt {
            span: param.span,
            target,
            value,
        }));
    }

    let mut replacer = Replacer {
        host,
        session,
        owner,
        func: func_name,
        config,
        depth,
    };
    replacer.rewrite_function(&mut def)?;

    let mut stmts = init;
    stmts.append(&mut def.body.stmts);
    Ok(stmts)
}

fn param_ref(param: &Ident) -> Expr {
    Expr {
        span: param.span,
        kind: ExprKind::Ident(param.clone()),
    }
}
