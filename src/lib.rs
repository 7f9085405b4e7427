//! mobula_glue: run Mobula operators on a host ML framework's async engine.
//!
//! A Mobula kernel is an ordinary function taking the packed calling
//! convention. The host framework owns the arrays those kernels read and write
//! and schedules every operation through a dependency-tracking engine. This
//! crate sits between the two: it turns each kernel call into a single engine
//! task annotated with exactly which arrays it reads and which it writes, so
//! the engine can order it against everything else without the caller ever
//! blocking.
//!
//! # Modules
//!
//! - [`bridge`]: classification, deduplication, the async functor and the wrapper.
//! - [`registry`]: name → wrapped function cache.
//! - [`engine`]: the capability the host engine must provide.
//! - [`packed`]: packed arguments and type codes.
//! - [`dlpack`]: zero-copy tensor descriptors handed to kernels.
//! - [`context`]: device and run contexts.
//! - [`config`]: async vs. blocking execution.
//! - [`ops`]: im2col / col2im convolution helpers.
//! - [`error`]: error types.
//!
//! # Example
//!
//! ```rust,ignore
//! use mobula_glue::{FunctionRegistry, PackedArg, packed_fn};
//!
//! let registry = FunctionRegistry::new(engine);
//! let add_one = registry.get_or_create(
//!     "add_one",
//!     packed_fn(|args| {
//!         let x = args[0].as_tensor().ok_or("expected a tensor")?;
//!         // launch the kernel on x ...
//!         Ok(())
//!     }),
//!     &[],
//! );
//! add_one.call(&[PackedArg::ndarray(x)])?; // returns before the kernel runs
//! ```

pub mod bridge;
pub mod config;
pub mod context;
pub mod dlpack;
pub mod engine;
pub mod error;
pub mod ops;
pub mod packed;
pub mod registry;

pub use bridge::{StreamHookFn, StreamSlot, WrappedFunc, wrap_async_call};
pub use config::{BridgeConfig, ExecMode};
pub use context::{Context, DeviceType, RunContext, StreamHandle};
pub use engine::{ArrayHandle, Engine, EngineTask, PushOptions, PushRequest, VarHandle};
pub use error::{BridgeError, CallError, EngineError};
pub use packed::{ArgValue, CallArg, PackedArg, PackedFn, TypeCode, packed_fn};
pub use registry::FunctionRegistry;
