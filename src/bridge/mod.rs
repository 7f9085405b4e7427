//! # Asynchronous dispatch bridge
//!
//! Turns a packed-argument call into one engine task with correct
//! dependency metadata.
//!
//! ## Submodules
//!
//! - [`classify`]: finds array arguments and splits them into reads and writes
//! - [`dedup`]: makes the read/write sets unique and disjoint
//! - [`functor`]: per-call state and the code the engine worker runs
//! - [`wrapper`]: the entry point callers hold
//! - [`stream`]: GPU stream hand-off around one invocation
//!
//! ## Flow
//!
//! 1. `WrappedFunc::call` builds an `AsyncFunctor` (classify, take references)
//! 2. the read/write sets are deduplicated
//! 3. a submission record is pushed to the engine with both sets
//! 4. later, on an engine worker, `AsyncFunctor::run` exports tensor
//!    descriptors and invokes the callable
//! 5. the engine drops the record; the functor releases its references

pub mod classify;
pub mod dedup;
pub mod functor;
pub mod stream;
pub mod wrapper;

pub use classify::{Classified, classify};
pub use dedup::deduplicate;
pub use functor::{AccessSets, AsyncFunctor};
pub use stream::{StreamHookFn, StreamSlot};
pub use wrapper::{WrappedFunc, wrap_async_call};
