use thiserror::Error;

use crate::temp::TempIdx;

/// Errors raised while building a `Context` from caller-supplied data.
///
/// Internal optimizer invariants (malformed op shapes the optimizer
/// itself would only see if it had a bug) stay as `debug_assert!`/
/// `panic!` inside the pass, per this crate's error-handling design;
/// this type covers the one real external boundary, constructing IR.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("temp {0:?} referenced before it was registered")]
    UnknownTemp(TempIdx),
    #[error("globals and locals must be registered before anonymous temps")]
    GlobalAfterLocal,
    #[error("label {0} referenced before it was created")]
    UnknownLabel(u32),
}
