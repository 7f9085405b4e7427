//! Host engine boundary.
//!
//! The bridge never talks to a scheduler directly. Everything it needs from
//! the host framework goes through the [`Engine`] capability:
//!
//! - `shallow_copy` / `free`: take and drop extra references to an array
//! - `get_context`: ask where an array lives
//! - `get_var`: resolve an array to the dependency variable the scheduler orders on
//! - `to_dlpack`: export a zero-copy tensor descriptor
//! - `push_sync`: hand a task plus its read/write sets to the scheduler
//!
//! Production code implements this over the host's function table; tests
//! implement it with a recording fake.

use core::fmt;
use std::sync::Arc;

use crate::context::{Context, RunContext};
use crate::dlpack::ManagedTensor;
use crate::error::EngineError;

/// Opaque reference to a framework-owned array.
///
/// Every shallow copy gets a handle of its own, so two handles may name the
/// same storage. Dependencies are tracked on [`VarHandle`]s instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArrayHandle(pub usize);

/// The scheduler's dependency variable for an array's storage.
///
/// All handles to the same storage, shallow copies included, resolve to the
/// same variable. Ordered by address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarHandle(pub usize);

/// Scheduling property attached to a pushed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FnProperty {
    #[default]
    Normal,
    CopyFromGpu,
    CopyToGpu,
    CpuPrioritized,
    Async,
}

/// Auxiliary scheduling hints. The bridge always submits the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushOptions {
    pub priority: i32,
    pub property: FnProperty,
    pub name: Option<String>,
}

/// A unit of work owned by the engine once pushed.
///
/// The engine calls [`run`](EngineTask::run) once, on a worker of its choosing,
/// after every conflicting task has finished. Dropping the task is its
/// cleanup; the engine drops it after running it, or straight away if it
/// refuses the push.
pub trait EngineTask: Send {
    fn run(&mut self, rctx: &RunContext);
}

/// Everything the scheduler needs to order one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRequest {
    /// Where the task runs; `None` when the call carried no arrays.
    pub ctx: Option<Context>,
    /// Variables read by the task; sorted, unique and disjoint from the writes.
    pub const_handles: Vec<VarHandle>,
    pub mutable_handles: Vec<VarHandle>,
    pub options: PushOptions,
}

/// Capability over the host framework's engine API.
pub trait Engine: Send + Sync {
    /// Takes a new reference to the same storage as `handle`.
    fn shallow_copy(&self, handle: ArrayHandle) -> Result<ArrayHandle, EngineError>;

    /// Releases a reference obtained from [`shallow_copy`](Engine::shallow_copy).
    fn free(&self, handle: ArrayHandle) -> Result<(), EngineError>;

    fn get_context(&self, handle: ArrayHandle) -> Result<Context, EngineError>;

    /// Dependency variable of the storage behind `handle`.
    fn get_var(&self, handle: ArrayHandle) -> Result<VarHandle, EngineError>;

    /// Exports `handle` as a zero-copy descriptor.
    fn to_dlpack(&self, handle: ArrayHandle) -> Result<ManagedTensor, EngineError>;

    /// Queues `task` behind every in-flight task whose access sets conflict.
    fn push_sync(&self, task: Box<dyn EngineTask>, request: PushRequest) -> Result<(), EngineError>;

    /// Blocks until all pending writes to `var` are done.
    fn wait_to_read(&self, _var: VarHandle) -> Result<(), EngineError> {
        Ok(())
    }

    /// Blocks until all pending reads and writes of `var` are done.
    fn wait_to_write(&self, _var: VarHandle) -> Result<(), EngineError> {
        Ok(())
    }
}

/// A live reference to an array, released when dropped.
///
/// Each `ArrayRef` stands for exactly one successful `shallow_copy`, so the
/// matching `free` happens exactly once whichever way the owner goes away.
pub struct ArrayRef {
    engine: Arc<dyn Engine>,
    handle: ArrayHandle,
}

impl ArrayRef {
    /// Shallow-copies `source` and takes ownership of the copy.
    pub fn acquire(engine: &Arc<dyn Engine>, source: ArrayHandle) -> Result<Self, EngineError> {
        let handle = engine.shallow_copy(source)?;
        Ok(Self { engine: Arc::clone(engine), handle })
    }

    pub fn handle(&self) -> ArrayHandle {
        self.handle
    }

    pub fn context(&self) -> Result<Context, EngineError> {
        self.engine.get_context(self.handle)
    }

    pub fn var(&self) -> Result<VarHandle, EngineError> {
        self.engine.get_var(self.handle)
    }

    pub fn to_dlpack(&self) -> Result<ManagedTensor, EngineError> {
        self.engine.to_dlpack(self.handle)
    }
}

impl Drop for ArrayRef {
    fn drop(&mut self) {
        if let Err(err) = self.engine.free(self.handle) {
            tracing::warn!(handle = self.handle.0, %err, "failed to release array reference");
        }
    }
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ArrayRef").field(&self.handle).finish()
    }
}
