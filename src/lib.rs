//! Veld Runtime
//!
//! Runtime support library for the Veld programming language: the
//! reference-counted heap and the cooperative task scheduler every
//! compiled Veld component links against. The compiler lowers
//! allocations, reference copies, scope exits and array accesses to the
//! calls in [`abi`]; embedders drive the [`runtime::Runtime`] lifecycle
//! directly.
//!
//! # Example
//!
//! ```rust
//! use veld_runtime::sched::Step;
//! use veld_runtime::Runtime;
//!
//! let mut rt = Runtime::new();
//! let greeting = rt.heap_mut().alloc(16);
//! rt.spawn(move |ctx| {
//!     ctx.heap().write::<u64>(greeting, 0, 42).unwrap();
//!     Step::Done
//! });
//! rt.finish().unwrap();
//! ```

#![doc(html_root_url = "https://docs.rs/veld-runtime")]
#![warn(rust_2018_idioms)]

// Public modules
pub mod abi;
pub mod errors;
pub mod heap;
pub mod runtime;
pub mod sched;

// Utility modules
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use thiserror::Error;

pub use errors::{RuntimeError, RuntimeResult};
pub use heap::{Heap, Ref};
pub use runtime::Runtime;
pub use sched::Scheduler;
pub use util::config::RuntimeConfig;

/// Runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runtime name
pub const NAME: &str = "Veld Runtime";
