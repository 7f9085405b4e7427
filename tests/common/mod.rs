//! Recording fake of the host engine.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mobula_glue::context::{Context, RunContext, StreamHandle};
use mobula_glue::dlpack::{DataType, DlTensor, ManagedTensor};
use mobula_glue::engine::{ArrayHandle, Engine, EngineTask, PushRequest, VarHandle};
use mobula_glue::error::EngineError;

#[derive(Debug, Default)]
pub struct Stats {
    shallow_copies: AtomicUsize,
    frees: AtomicUsize,
    conversions: AtomicUsize,
    deleter_runs: AtomicUsize,
    wait_reads: AtomicUsize,
    wait_writes: AtomicUsize,
}

impl Stats {
    pub fn shallow_copies(&self) -> usize {
        self.shallow_copies.load(Ordering::SeqCst)
    }

    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::SeqCst)
    }

    /// Successful `to_dlpack` exports.
    pub fn conversions(&self) -> usize {
        self.conversions.load(Ordering::SeqCst)
    }

    pub fn deleter_runs(&self) -> usize {
        self.deleter_runs.load(Ordering::SeqCst)
    }

    pub fn wait_reads(&self) -> usize {
        self.wait_reads.load(Ordering::SeqCst)
    }

    pub fn wait_writes(&self) -> usize {
        self.wait_writes.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct Entry {
    storage: usize,
    ctx: Context,
    shape: Vec<i64>,
    is_copy: bool,
}

#[derive(Default)]
struct State {
    next_handle: usize,
    entries: HashMap<usize, Entry>,
    buffers: HashMap<usize, Arc<Mutex<Vec<f32>>>>,
    pending: Vec<(Box<dyn EngineTask>, PushRequest)>,
    pushes: Vec<PushRequest>,
}

#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<State>,
    pub stats: Arc<Stats>,
    reject_push: Option<i32>,
    fail_get_context: bool,
    dlpack_limit: Option<usize>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// An engine whose `push_sync` always fails with `code`.
    pub fn rejecting(code: i32) -> Arc<Self> {
        Arc::new(Self { reject_push: Some(code), ..Self::default() })
    }

    pub fn failing_context() -> Arc<Self> {
        Arc::new(Self { fail_get_context: true, ..Self::default() })
    }

    /// An engine whose `to_dlpack` fails once `exports` descriptors have been made.
    pub fn failing_dlpack_after(exports: usize) -> Arc<Self> {
        Arc::new(Self { dlpack_limit: Some(exports), ..Self::default() })
    }

    pub fn as_engine(self: &Arc<Self>) -> Arc<dyn Engine> {
        self.clone()
    }

    /// Creates a framework array holding `data` on `ctx`.
    pub fn create_array(&self, ctx: Context, data: Vec<f32>) -> ArrayHandle {
        let mut state = self.state.lock().unwrap();
        state.next_handle += 1;
        let handle = 0x1000 * state.next_handle;
        let shape = vec![data.len() as i64];
        state.buffers.insert(handle, Arc::new(Mutex::new(data)));
        state.entries.insert(handle, Entry { storage: handle, ctx, shape, is_copy: false });
        ArrayHandle(handle)
    }

    /// Dependency variable of `handle`; copies share their source's.
    pub fn var_of(&self, handle: ArrayHandle) -> VarHandle {
        VarHandle(self.storage_of(handle))
    }

    /// Storage behind `handle` (for a copy, its source's storage).
    pub fn storage_of(&self, handle: ArrayHandle) -> usize {
        self.state.lock().unwrap().entries[&handle.0].storage
    }

    /// The buffer at data address `data`, as seen in a `DlTensor`.
    pub fn buffer(&self, data: usize) -> Arc<Mutex<Vec<f32>>> {
        self.state.lock().unwrap().buffers[&data].clone()
    }

    pub fn read(&self, handle: ArrayHandle) -> Vec<f32> {
        let storage = self.storage_of(handle);
        self.buffer(storage).lock().unwrap().clone()
    }

    /// Number of shallow copies not yet freed.
    pub fn live_copies(&self) -> usize {
        self.state.lock().unwrap().entries.values().filter(|e| e.is_copy).count()
    }

    pub fn pushes(&self) -> Vec<PushRequest> {
        self.state.lock().unwrap().pushes.clone()
    }

    pub fn pending(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    /// Runs every queued task on a separate worker thread, then drops it.
    pub fn run_pending(&self, stream: Option<StreamHandle>) {
        let tasks = std::mem::take(&mut self.state.lock().unwrap().pending);
        std::thread::spawn(move || {
            for (mut task, request) in tasks {
                let rctx = RunContext { ctx: request.ctx.unwrap_or(Context::cpu(0)), stream };
                task.run(&rctx);
                drop(task);
            }
        })
        .join()
        .unwrap();
    }

    /// Drops every queued task without running it.
    pub fn discard_pending(&self) {
        let tasks = std::mem::take(&mut self.state.lock().unwrap().pending);
        drop(tasks);
    }
}

impl Engine for FakeEngine {
    fn shallow_copy(&self, handle: ArrayHandle) -> Result<ArrayHandle, EngineError> {
        let mut state = self.state.lock().unwrap();
        let Some(source) = state.entries.get(&handle.0).cloned() else {
            return Err(EngineError::new(-1, format!("unknown array {:#x}", handle.0)));
        };
        state.next_handle += 1;
        let copy = 0x1000 * state.next_handle;
        state.entries.insert(copy, Entry { is_copy: true, ..source });
        self.stats.shallow_copies.fetch_add(1, Ordering::SeqCst);
        Ok(ArrayHandle(copy))
    }

    fn free(&self, handle: ArrayHandle) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        match state.entries.get(&handle.0) {
            Some(entry) if entry.is_copy => {
                state.entries.remove(&handle.0);
                self.stats.frees.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            _ => Err(EngineError::new(-1, format!("double free of {:#x}", handle.0))),
        }
    }

    fn get_context(&self, handle: ArrayHandle) -> Result<Context, EngineError> {
        if self.fail_get_context {
            return Err(EngineError::new(-2, "context unavailable"));
        }
        let state = self.state.lock().unwrap();
        state
            .entries
            .get(&handle.0)
            .map(|e| e.ctx)
            .ok_or_else(|| EngineError::new(-1, "unknown array"))
    }

    fn get_var(&self, handle: ArrayHandle) -> Result<VarHandle, EngineError> {
        let state = self.state.lock().unwrap();
        state
            .entries
            .get(&handle.0)
            .map(|e| VarHandle(e.storage))
            .ok_or_else(|| EngineError::new(-1, "unknown array"))
    }

    fn to_dlpack(&self, handle: ArrayHandle) -> Result<ManagedTensor, EngineError> {
        if self.dlpack_limit.is_some_and(|limit| self.stats.conversions() >= limit) {
            return Err(EngineError::new(-3, "export failed"));
        }
        let state = self.state.lock().unwrap();
        let entry = state.entries.get(&handle.0).ok_or_else(|| EngineError::new(-1, "unknown array"))?;
        let tensor = DlTensor {
            data: entry.storage,
            device: entry.ctx,
            dtype: DataType::F32,
            shape: entry.shape.clone(),
            strides: None,
            byte_offset: 0,
        };
        self.stats.conversions.fetch_add(1, Ordering::SeqCst);
        let stats = Arc::clone(&self.stats);
        Ok(ManagedTensor::new(tensor, move |_| {
            stats.deleter_runs.fetch_add(1, Ordering::SeqCst);
        }))
    }

    fn push_sync(&self, task: Box<dyn EngineTask>, request: PushRequest) -> Result<(), EngineError> {
        if let Some(code) = self.reject_push {
            return Err(EngineError::new(code, "engine is shutting down"));
        }
        let mut state = self.state.lock().unwrap();
        state.pushes.push(request.clone());
        state.pending.push((task, request));
        Ok(())
    }

    fn wait_to_read(&self, _var: VarHandle) -> Result<(), EngineError> {
        self.stats.wait_reads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn wait_to_write(&self, _var: VarHandle) -> Result<(), EngineError> {
        self.stats.wait_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Installs a test log subscriber once; later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
