//! Runtime errors

use thiserror::Error;

use crate::heap::Ref;

/// Runtime result
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Runtime errors
///
/// Every variant is a programming error in generated code, caught at
/// runtime. Library internals propagate these as `Result`; the ABI layer
/// converts them into an unrecoverable process exit via [`trap`].
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Allocation failed: {0} bytes")]
    AllocFailed(usize),

    #[error("Use after free: {0}")]
    UseAfterFree(Ref),

    #[error("Null dereference")]
    NullDeref,

    #[error("Reference count underflow: {0}")]
    RefUnderflow(Ref),

    #[error("Owner released twice: {0}")]
    DoubleRelease(Ref),

    #[error("Lock on dead block: {0}")]
    LockOnDead(Ref),

    #[error("Lock count underflow: {0}")]
    LockUnderflow(Ref),

    #[error("Scalar/array kind mismatch: {0}")]
    KindMismatch(Ref),

    #[error("Index out of bounds: index {index}, length {len}")]
    IndexOutOfBounds { index: i64, len: i64 },

    #[error("String length {len} exceeds capacity {capacity}")]
    StrLenOutOfRange { len: i64, capacity: i64 },

    #[error("Missing string terminator at offset {0}")]
    StrBadTerminator(i64),

    #[error("Payload access out of range: offset {offset}, size {size}, payload {payload}")]
    PayloadOutOfRange {
        offset: usize,
        size: usize,
        payload: usize,
    },

    #[error("Deadlock: {waiting} task(s) waiting, none ready")]
    Deadlock { waiting: usize },
}

/// Exit code used for every fatal runtime violation.
pub const TRAP_EXIT_CODE: i32 = 1;

/// Terminate the process on an unrecoverable runtime violation.
///
/// There is no recoverable-error channel at the ABI: bounds and liveness
/// are supposed to be proven by the calling code, so a violation here is
/// an assertion of last resort.
pub fn trap(err: RuntimeError) -> ! {
    tracing::error!("fatal runtime violation: {err}");
    std::process::exit(TRAP_EXIT_CODE);
}
