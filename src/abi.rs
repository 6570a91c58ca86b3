//! Interface consumed by generated code
//!
//! The Veld code generator lowers allocations, reference copies, scope
//! exits and array accesses to these calls. There is no recoverable-error
//! channel here: null-tolerant operations are silent no-ops on
//! [`Ref::NULL`], every other violation terminates the process via
//! [`trap`]. Yield points are not a function in this surface — a task body
//! returns a [`crate::sched::Step`] to the scheduler instead
//! (`Step::Yield` ≙ `yield(false)`, `Step::Wait` ≙ `yield(true)`,
//! `Step::Done` ≙ falling off the task's end).

use crate::errors::{trap, RuntimeError};
use crate::heap::{ArrayDestructor, Destructor, Heap, Ref};
use crate::runtime::Runtime;
use crate::util::config::RuntimeConfig;

fn size_from(size: i64) -> usize {
    match usize::try_from(size) {
        Ok(size) => size,
        Err(_) => trap(RuntimeError::AllocFailed(0)),
    }
}

/// Allocate a zeroed scalar block; fatal if the request cannot be
/// satisfied.
pub fn alloc(
    heap: &mut Heap,
    size: i64,
) -> Ref {
    heap.alloc(size_from(size))
}

/// Allocate a zeroed array block of `count` elements.
pub fn alloc_arr(
    heap: &mut Heap,
    count: i64,
    elem_size: i64,
) -> Ref {
    heap.alloc_arr(count, size_from(elem_size))
        .unwrap_or_else(|e| trap(e))
}

/// Add a reference; returns the handle unchanged for call-site chaining.
pub fn incref(
    heap: &mut Heap,
    r: Ref,
) -> Ref {
    heap.incref(r).unwrap_or_else(|e| trap(e))
}

/// Array analogue of [`incref`].
pub fn incref_arr(
    heap: &mut Heap,
    r: Ref,
) -> Ref {
    heap.incref_arr(r).unwrap_or_else(|e| trap(e))
}

/// Remove a reference; may run the destructor and free the block.
pub fn decref(
    heap: &mut Heap,
    r: Ref,
    dtr: Option<Destructor>,
) {
    heap.decref(r, dtr).unwrap_or_else(|e| trap(e));
}

/// Array analogue of [`decref`].
pub fn decref_arr(
    heap: &mut Heap,
    r: Ref,
    dtr: Option<ArrayDestructor>,
) {
    heap.decref_arr(r, dtr).unwrap_or_else(|e| trap(e));
}

/// The owning slot goes out of scope (freeze when shared references
/// persist).
pub fn release(
    heap: &mut Heap,
    r: Ref,
    dtr: Option<Destructor>,
) {
    heap.release(r, dtr).unwrap_or_else(|e| trap(e));
}

/// Array analogue of [`release`].
pub fn release_arr(
    heap: &mut Heap,
    r: Ref,
    dtr: Option<ArrayDestructor>,
) {
    heap.release_arr(r, dtr).unwrap_or_else(|e| trap(e));
}

/// Logical liveness query; never fatal.
pub fn is_null(
    heap: &Heap,
    r: Ref,
) -> bool {
    heap.is_null(r)
}

/// Array analogue of [`is_null`].
pub fn is_null_arr(
    heap: &Heap,
    r: Ref,
) -> bool {
    heap.is_null_arr(r)
}

/// Liveness assertion; fatal on a dead reference.
pub fn notnull_ref(
    heap: &Heap,
    r: Ref,
) {
    heap.notnull_ref(r).unwrap_or_else(|e| trap(e));
}

/// Pin a block; fatal on a dead reference.
pub fn lock(
    heap: &mut Heap,
    r: Ref,
) {
    heap.lock(r).unwrap_or_else(|e| trap(e));
}

/// Drop a pin; performs a deferred release when it was the last hold.
pub fn unlock(
    heap: &mut Heap,
    r: Ref,
    dtr: Option<Destructor>,
) {
    heap.unlock(r, dtr).unwrap_or_else(|e| trap(e));
}

/// Element count of an array; 0 for null.
pub fn len_arr(
    heap: &Heap,
    r: Ref,
) -> i64 {
    heap.len_arr(r).unwrap_or_else(|e| trap(e))
}

/// String length excluding the stored terminator; 0 for null.
pub fn len_str(
    heap: &Heap,
    r: Ref,
) -> i64 {
    heap.len_str(r).unwrap_or_else(|e| trap(e))
}

/// Finalize a byte array into a string; fatal when the length window or
/// terminator is invalid.
pub fn arr_to_str(
    heap: &mut Heap,
    array: Ref,
    data: Ref,
    len: i64,
) -> Ref {
    heap.arr_to_str(array, data, len).unwrap_or_else(|e| trap(e))
}

/// Array bounds assertion; fatal on violation.
pub fn check_bounds(
    heap: &Heap,
    r: Ref,
    index: i64,
) {
    heap.check_bounds(r, index).unwrap_or_else(|e| trap(e));
}

/// Smaller of two values.
#[inline]
pub fn min(
    a: i64,
    b: i64,
) -> i64 {
    if a < b {
        a
    } else {
        b
    }
}

/// Larger of two values.
#[inline]
pub fn max(
    a: i64,
    b: i64,
) -> i64 {
    if a > b {
        a
    } else {
        b
    }
}

/// Component-main start: a fresh runtime instance.
pub fn component_main_start() -> Runtime {
    Runtime::with_config(&RuntimeConfig::load())
}

/// Component-main end: run every remaining task; deadlock is fatal.
pub fn component_main_end(runtime: &mut Runtime) {
    runtime.finish().unwrap_or_else(|e| trap(e));
}

/// Fixed per-task stack size in bytes, header overhead included.
pub fn stacksize(runtime: &Runtime) -> i64 {
    runtime.stacksize() as i64
}
