#![forbid(unsafe_code)]

mod analyze;
mod encode;
mod error;
mod eval;
mod inline;
mod replace;
mod session;

pub use analyze::read_only_params;
pub use encode::encode_value;
pub use error::{InlineError, Result};
pub use inline::{Arg, InlineConfig, inline, inline_with_config};
pub use session::{RpcRegistry, Session};
