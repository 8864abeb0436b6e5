#![forbid(unsafe_code)]

use std::collections::HashMap;

use pulse_ast::{Expr, ExprKind};
use pulse_host::{Host, ModuleId, Value};

/// Static evaluation over the foldable expression shapes: name lookup,
/// member access on a host object, and plain literals. Anything else is not
/// foldable and yields `None`.
///
/// Names are looked up in the module environment first, then in the folded
/// constants.
pub(crate) fn eval_static(
    host: &Host,
    module: ModuleId,
    constants: &HashMap<String, Value>,
    expr: &Expr,
) -> Option<Value> {
    match &expr.kind {
        ExprKind::Ident(ident) => host
            .binding(module, &ident.node)
            .or_else(|| constants.get(&ident.node))
            .cloned(),
        ExprKind::Member { base, member } => {
            match eval_static(host, module, constants, base)? {
                Value::Object(owner) => host.attr(owner, &member.node).cloned(),
                _ => None,
            }
        }
        ExprKind::IntLit(v) => Some(Value::Int(*v)),
        ExprKind::FloatLit(v) => Some(Value::Float(*v)),
        ExprKind::StringLit(s) => Some(Value::Str(s.clone())),
        _ => None,
    }
}

/// Renders a reference expression for diagnostics, e.g. `self.dds.set`.
pub(crate) fn describe_ref(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Ident(ident) => ident.node.clone(),
        ExprKind::Member { base, member } => {
            format!("{}.{}", describe_ref(base), member.node)
        }
        ExprKind::Index { base, .. } => format!("{}[..]", describe_ref(base)),
        _ => "<expression>".to_string(),
    }
}
