//! Dispatch wrapper.
//!
//! [`WrappedFunc`] is what callers hold. Each [`call`](WrappedFunc::call)
//! builds a fresh [`AsyncFunctor`], canonicalizes its read/write sets and pushes
//! it to the engine as a single task. The caller's thread only pays for
//! classification and submission; the kernel runs whenever the engine decides
//! no conflicting task is in flight.

use std::sync::Arc;

use super::dedup::deduplicate;
use super::functor::{AccessSets, AsyncFunctor};
use super::stream::StreamHookFn;
use crate::config::ExecMode;
use crate::context::{Context, RunContext};
use crate::engine::{Engine, EngineTask, PushOptions, PushRequest};
use crate::error::{BridgeError, Result};
use crate::packed::{PackedArg, PackedFn};

/// What the engine holds on to between push and cleanup.
struct SubmissionRecord {
    ctx: Option<Context>,
    functor: Arc<AsyncFunctor>,
}

impl EngineTask for SubmissionRecord {
    fn run(&mut self, rctx: &RunContext) {
        // the submitter has long returned; all we can do is report
        if let Err(err) = self.functor.run(rctx) {
            tracing::error!(ctx = ?self.ctx, %err, "async call failed on engine worker");
        }
    }
}

/// A callable wrapped for dependency-tracked execution.
pub struct WrappedFunc {
    engine: Arc<dyn Engine>,
    func: Arc<PackedFn>,
    set_stream: Arc<StreamHookFn>,
    const_loc: Vec<usize>,
    mode: ExecMode,
}

impl WrappedFunc {
    pub fn new(
        engine: Arc<dyn Engine>,
        func: Arc<PackedFn>,
        set_stream: Arc<StreamHookFn>,
        const_loc: &[usize],
        mode: ExecMode,
    ) -> Self {
        let mut const_loc = const_loc.to_vec();
        const_loc.sort_unstable();
        const_loc.dedup();
        Self { engine, func, set_stream, const_loc, mode }
    }

    /// Sorted positions treated as read-only.
    pub fn const_loc(&self) -> &[usize] {
        &self.const_loc
    }

    pub fn mode(&self) -> ExecMode {
        self.mode
    }

    /// Calls the wrapped function with `args`.
    ///
    /// In async mode this returns once the task is queued; the arguments may
    /// be dropped or reused straight away. Classification errors are returned
    /// before anything is pushed.
    pub fn call(&self, args: &[PackedArg]) -> Result<()> {
        let (functor, mut sets) = AsyncFunctor::init(
            &self.engine,
            Arc::clone(&self.func),
            Arc::clone(&self.set_stream),
            args,
            &self.const_loc,
        )?;
        deduplicate(&mut sets.const_handles, &mut sets.mutable_handles);

        match self.mode {
            ExecMode::Async => self.submit(functor, sets),
            ExecMode::Blocking => self.run_inline(&functor, &sets),
        }
    }

    fn submit(&self, functor: AsyncFunctor, sets: AccessSets) -> Result<()> {
        let ctx = functor.ctx();
        tracing::debug!(
            ?ctx,
            reads = sets.const_handles.len(),
            writes = sets.mutable_handles.len(),
            "pushing async call"
        );
        let record = SubmissionRecord { ctx, functor: Arc::new(functor) };
        let request = PushRequest {
            ctx,
            const_handles: sets.const_handles,
            mutable_handles: sets.mutable_handles,
            options: PushOptions::default(),
        };
        self.engine
            .push_sync(Box::new(record), request)
            .map_err(BridgeError::Submission)
    }

    fn run_inline(&self, functor: &AsyncFunctor, sets: &AccessSets) -> Result<()> {
        for &var in &sets.const_handles {
            self.engine
                .wait_to_read(var)
                .map_err(|source| BridgeError::Engine { op: "wait_to_read", source })?;
        }
        for &var in &sets.mutable_handles {
            self.engine
                .wait_to_write(var)
                .map_err(|source| BridgeError::Engine { op: "wait_to_write", source })?;
        }

        let ctx = functor.ctx().unwrap_or(Context::cpu(0));
        tracing::debug!(%ctx, "running call inline");
        functor.run(&RunContext { ctx, stream: None })
    }
}

impl core::fmt::Debug for WrappedFunc {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WrappedFunc")
            .field("const_loc", &self.const_loc)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Wraps `func` for asynchronous execution through `engine`.
pub fn wrap_async_call(
    engine: Arc<dyn Engine>,
    func: Arc<PackedFn>,
    set_stream: Arc<StreamHookFn>,
    const_loc: &[usize],
) -> WrappedFunc {
    WrappedFunc::new(engine, func, set_stream, const_loc, ExecMode::Async)
}
