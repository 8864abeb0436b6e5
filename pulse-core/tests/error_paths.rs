use pulse_ast::{AssignStmt, Block, Expr, ExprKind, FunctionDef, Ident, Span, Stmt, span};
use pulse_core::{Arg, InlineError, inline};
use pulse_host::{Host, OwnerId, Value};

fn sp() -> Span {
    span(0, 0)
}

fn ident(text: &str) -> Ident {
    Ident::new(sp(), text.to_string())
}

fn name(text: &str) -> Expr {
    Expr {
        span: sp(),
        kind: ExprKind::Ident(ident(text)),
    }
}

fn int(v: i64) -> Expr {
    Expr {
        span: sp(),
        kind: ExprKind::IntLit(v),
    }
}

fn call_stmt(callee: Expr, args: Vec<Expr>) -> Stmt {
    Stmt::ExprStmt(Expr {
        span: sp(),
        kind: ExprKind::Call {
            callee: Box::new(callee),
            args,
        },
    })
}

fn assign(target: &str, value: Expr) -> Stmt {
    Stmt::Assign(AssignStmt {
        span: sp(),
        target: name(target),
        value,
    })
}

fn kernel_def(fn_name: &str, params: &[&str], stmts: Vec<Stmt>) -> FunctionDef {
    FunctionDef {
        span: sp(),
        name: ident(fn_name),
        decorators: vec![ident("kernel")],
        params: params.iter().map(|p| ident(p)).collect(),
        body: Block { span: sp(), stmts },
    }
}

fn experiment_host() -> (Host, OwnerId) {
    let mut host = Host::new();
    let module = host.new_module();
    let owner = host.new_owner(module, "experiment");
    (host, owner)
}

#[test]
fn unbound_load_with_no_global_is_unresolved() {
    let (mut host, owner) = experiment_host();
    let f = host.register_function(kernel_def(
        "f",
        &["self"],
        vec![Stmt::ExprStmt(name("missing"))],
    ));

    let err = inline(&host, f, vec![Arg::Value(Value::Object(owner))]).unwrap_err();
    assert!(matches!(
        err,
        InlineError::UnresolvedReference { ref name, .. } if name == "missing"
    ));
}

#[test]
fn call_target_resolving_to_a_non_callable_is_unresolved() {
    let (mut host, owner) = experiment_host();
    let module = host.owner_module(owner);
    host.bind(module, "calibration", Value::Float(1.25));
    let f = host.register_function(kernel_def(
        "f",
        &["self"],
        vec![call_stmt(name("calibration"), vec![])],
    ));

    let err = inline(&host, f, vec![Arg::Value(Value::Object(owner))]).unwrap_err();
    assert!(matches!(err, InlineError::UnresolvedReference { .. }));
}

#[test]
fn unencodable_argument_for_a_mutable_param_is_fatal() {
    let (mut host, owner) = experiment_host();
    let module = host.owner_module(owner);
    let device = host.new_owner(module, "dds");
    let f = host.register_function(kernel_def(
        "f",
        &["self", "d"],
        vec![assign("d", int(0))],
    ));

    let err = inline(
        &host,
        f,
        vec![
            Arg::Value(Value::Object(owner)),
            Arg::Value(Value::Object(device)),
        ],
    )
    .unwrap_err();
    assert!(matches!(err, InlineError::UnrepresentableValue { .. }));
}

#[test]
fn unencodable_constant_at_a_use_site_is_fatal() {
    let (mut host, owner) = experiment_host();
    let module = host.owner_module(owner);
    let device = host.new_owner(module, "dds");
    let f = host.register_function(kernel_def(
        "f",
        &["self", "d"],
        vec![Stmt::ExprStmt(name("d"))],
    ));

    let err = inline(
        &host,
        f,
        vec![
            Arg::Value(Value::Object(owner)),
            Arg::Value(Value::Object(device)),
        ],
    )
    .unwrap_err();
    assert!(matches!(err, InlineError::UnrepresentableValue { .. }));
}

#[test]
fn arity_mismatch_is_malformed() {
    let (mut host, owner) = experiment_host();
    let f = host.register_function(kernel_def("f", &["self", "x"], vec![]));

    let err = inline(&host, f, vec![Arg::Value(Value::Object(owner))]).unwrap_err();
    assert!(matches!(err, InlineError::MalformedInput { .. }));
}

#[test]
fn missing_owner_argument_is_malformed() {
    let (mut host, _) = experiment_host();
    let f = host.register_function(kernel_def("f", &["self"], vec![]));

    let err = inline(&host, f, vec![Arg::Value(Value::Int(1))]).unwrap_err();
    assert!(matches!(err, InlineError::MalformedInput { .. }));
}

#[test]
fn nested_function_definition_is_malformed() {
    let (mut host, owner) = experiment_host();
    let nested = kernel_def("helper", &["self"], vec![]);
    let f = host.register_function(kernel_def(
        "f",
        &["self"],
        vec![Stmt::FuncDef(nested)],
    ));

    let err = inline(&host, f, vec![Arg::Value(Value::Object(owner))]).unwrap_err();
    assert!(matches!(err, InlineError::MalformedInput { .. }));
}

#[test]
fn valueless_kernel_call_in_value_position_is_malformed() {
    let (mut host, owner) = experiment_host();
    let step = host.register_function(kernel_def(
        "step",
        &["self"],
        vec![Stmt::Pass(pulse_ast::PassStmt { span: sp() })],
    ));
    host.set_attr(owner, "step", Value::kernel(owner, step));
    let f = host.register_function(kernel_def(
        "f",
        &["self"],
        vec![assign(
            "z",
            Expr {
                span: sp(),
                kind: ExprKind::Call {
                    callee: Box::new(Expr {
                        span: sp(),
                        kind: ExprKind::Member {
                            base: Box::new(name("self")),
                            member: ident("step"),
                        },
                    }),
                    args: vec![],
                },
            },
        )],
    ));

    let err = inline(&host, f, vec![Arg::Value(Value::Object(owner))]).unwrap_err();
    assert!(matches!(err, InlineError::MalformedInput { .. }));
}

#[test]
fn store_to_a_member_target_is_unresolved() {
    let (mut host, owner) = experiment_host();
    let f = host.register_function(kernel_def(
        "f",
        &["self"],
        vec![Stmt::Assign(AssignStmt {
            span: sp(),
            target: Expr {
                span: sp(),
                kind: ExprKind::Member {
                    base: Box::new(name("self")),
                    member: ident("freq"),
                },
            },
            value: int(0),
        })],
    ));

    let err = inline(&host, f, vec![Arg::Value(Value::Object(owner))]).unwrap_err();
    assert!(matches!(err, InlineError::UnresolvedReference { .. }));
}
