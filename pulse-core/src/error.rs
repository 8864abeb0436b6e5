#![forbid(unsafe_code)]

use pulse_ast::Span;
use miette::Diagnostic;
use thiserror::Error;

/// Everything that can abort an inlining session. All variants are fatal:
/// the session's partial state is discarded and nothing is retried.
#[derive(Debug, Error, Diagnostic)]
pub enum InlineError {
    #[error("cannot resolve `{name}` in `{owner}.{func}`")]
    #[diagnostic(code(pulse::inline::unresolved))]
    UnresolvedReference {
        name: String,
        owner: String,
        func: String,
        #[label]
        span: Span,
    },

    #[error("cannot encode {value} as a literal in `{owner}.{func}`")]
    #[diagnostic(code(pulse::inline::unrepresentable))]
    UnrepresentableValue {
        value: String,
        owner: String,
        func: String,
        #[label]
        span: Span,
    },

    #[error("cannot assign to `{name}` in `{owner}.{func}`: it is bound to a constant")]
    #[diagnostic(code(pulse::inline::immutable_rebind))]
    ImmutableRebind {
        name: String,
        owner: String,
        func: String,
        #[label]
        span: Span,
    },

    #[error("malformed inline request: {message}")]
    #[diagnostic(code(pulse::inline::malformed))]
    MalformedInput {
        message: String,
        #[label]
        span: Span,
    },

    #[error("inlining `{owner}.{func}` exceeded the call nesting limit of {limit}")]
    #[diagnostic(code(pulse::inline::recursion_limit))]
    RecursionLimitExceeded {
        owner: String,
        func: String,
        limit: usize,
    },
}

pub type Result<T> = std::result::Result<T, InlineError>;
