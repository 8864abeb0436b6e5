#![forbid(unsafe_code)]

use pulse_ast::{Expr, ExprKind, Ident, Span};
use pulse_host::{Builtin, Value};

/// Encodes a host value as a literal syntax node, or `None` when the value
/// has no literal form (host objects, callables). Callers decide whether
/// `None` is fatal.
///
/// Quantities become a constructor call over the amount and the base-unit
/// constant, so `10 ms` encodes as `Quantity(0.01, base_s_unit)`.
pub fn encode_value(value: &Value, span: Span) -> Option<Expr> {
    let kind = match value {
        Value::Int(v) => ExprKind::IntLit(*v),
        Value::Float(v) => ExprKind::FloatLit(*v),
        Value::Str(s) => ExprKind::StringLit(s.clone()),
        Value::Singleton(s) => return Some(ident_expr(span, s.name())),
        Value::Quantity(q) => ExprKind::Call {
            callee: Box::new(ident_expr(span, Builtin::Quantity.name())),
            args: vec![
                Expr {
                    span,
                    kind: ExprKind::FloatLit(q.amount),
                },
                ident_expr(span, q.unit.base_constant()),
            ],
        },
        Value::Object(_) | Value::Callable(_) => return None,
    };
    Some(Expr { span, kind })
}

pub(crate) fn ident_expr(span: Span, name: &str) -> Expr {
    Expr {
        span,
        kind: ExprKind::Ident(Ident::new(span, name.to_string())),
    }
}
