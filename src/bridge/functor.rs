//! The per-call async functor.
//!
//! [`AsyncFunctor::init`] runs on the submitting thread: it classifies the
//! arguments and keeps a private copy of them with every array slot replaced by
//! an index into the functor's own array references. [`AsyncFunctor::run`]
//! runs later on an engine worker: it exports each array as a tensor
//! descriptor, invokes the callable and releases the descriptors again.
//!
//! Descriptors are created per invocation and never stored, since they must
//! not outlive the call they were made for.

use std::sync::Arc;

use super::classify::classify;
use super::stream::{StreamGuard, StreamHookFn};
use crate::context::{Context, RunContext};
use crate::dlpack::ManagedTensor;
use crate::engine::{ArrayRef, Engine, VarHandle};
use crate::error::{BridgeError, Result};
use crate::packed::{CallArg, PackedArg, PackedFn};

#[derive(Debug, Clone, Copy)]
enum Slot {
    Pod(PackedArg),
    /// Index into `AsyncFunctor::arrays`.
    Array(usize),
}

/// Read and write sets produced by [`AsyncFunctor::init`], as dependency variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessSets {
    pub const_handles: Vec<VarHandle>,
    pub mutable_handles: Vec<VarHandle>,
}

pub struct AsyncFunctor {
    func: Arc<PackedFn>,
    set_stream: Arc<StreamHookFn>,
    slots: Vec<Slot>,
    arrays: Vec<ArrayRef>,
    ctx: Option<Context>,
}

impl AsyncFunctor {
    /// Classifies `args` and captures everything `run` will need.
    ///
    /// `const_loc` must be sorted ascending.
    pub fn init(
        engine: &Arc<dyn Engine>,
        func: Arc<PackedFn>,
        set_stream: Arc<StreamHookFn>,
        args: &[PackedArg],
        const_loc: &[usize],
    ) -> Result<(Self, AccessSets)> {
        let classified = classify(engine, args, const_loc)?;

        let mut slots: Vec<Slot> = args.iter().copied().map(Slot::Pod).collect();
        for (index, &pos) in classified.array_loc.iter().enumerate() {
            slots[pos] = Slot::Array(index);
        }

        let functor = Self {
            func,
            set_stream,
            slots,
            arrays: classified.arrays,
            ctx: classified.ctx,
        };
        let sets = AccessSets {
            const_handles: classified.const_handles,
            mutable_handles: classified.mutable_handles,
        };
        Ok((functor, sets))
    }

    /// Context shared by the call's arrays, `None` if it had none.
    pub fn ctx(&self) -> Option<Context> {
        self.ctx
    }

    /// Array references held, one per array argument, aliases included.
    pub fn num_arrays(&self) -> usize {
        self.arrays.len()
    }

    /// Invokes the callable with the run context chosen by the engine.
    ///
    /// GPU calls see `rctx.stream` through the stream hook for the duration of
    /// the invocation only; it is cleared again even if the callable fails or
    /// panics.
    pub fn run(&self, rctx: &RunContext) -> Result<()> {
        let dlms = self
            .arrays
            .iter()
            .map(ArrayRef::to_dlpack)
            .collect::<Result<Vec<ManagedTensor>, _>>()
            .map_err(|source| BridgeError::Engine { op: "to_dlpack", source })?;

        let args: Vec<CallArg<'_>> = self
            .slots
            .iter()
            .map(|slot| match *slot {
                Slot::Pod(arg) => CallArg::Pod(arg),
                Slot::Array(i) => CallArg::Tensor(dlms[i].tensor()),
            })
            .collect();

        let result = if self.ctx.is_some_and(|ctx| ctx.is_gpu()) {
            let _stream = StreamGuard::set(&*self.set_stream, rctx.ctx.device_id, rctx.stream);
            (self.func)(&args)
        } else {
            (self.func)(&args)
        };

        drop(args);
        // runs every descriptor deleter
        drop(dlms);

        result.map_err(BridgeError::from)
    }
}

impl core::fmt::Debug for AsyncFunctor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AsyncFunctor")
            .field("slots", &self.slots)
            .field("arrays", &self.arrays)
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}
