//! Named cache of wrapped functions.
//!
//! Operators look their kernels up by name on every call; the first lookup
//! wraps the kernel and every later one gets the same [`WrappedFunc`] back.
//! The registry is an ordinary value owned by whoever drives the engine, not a
//! process global, and insertion is guarded by an internal lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::bridge::{StreamHookFn, StreamSlot, WrappedFunc};
use crate::config::BridgeConfig;
use crate::engine::Engine;
use crate::packed::{PackedFn, TypeCode, func_idcode};

pub struct FunctionRegistry {
    engine: Arc<dyn Engine>,
    config: BridgeConfig,
    stream_slot: Arc<StreamSlot>,
    set_stream: Arc<StreamHookFn>,
    functions: Mutex<HashMap<String, Arc<WrappedFunc>>>,
}

impl FunctionRegistry {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self::with_config(engine, BridgeConfig::default())
    }

    pub fn with_config(engine: Arc<dyn Engine>, config: BridgeConfig) -> Self {
        let stream_slot = StreamSlot::new();
        let set_stream = stream_slot.hook();
        Self {
            engine,
            config,
            stream_slot,
            set_stream,
            functions: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the stream hook handed to functions wrapped from now on.
    pub fn with_stream_hook(mut self, set_stream: Arc<StreamHookFn>) -> Self {
        self.set_stream = set_stream;
        self
    }

    /// The slot the default stream hook writes to.
    pub fn stream_slot(&self) -> &Arc<StreamSlot> {
        &self.stream_slot
    }

    pub fn config(&self) -> BridgeConfig {
        self.config
    }

    /// Returns the function registered as `name`, wrapping `func` first if
    /// there is none.
    ///
    /// Once a name is taken, later `func` and `const_loc` arguments are ignored.
    pub fn get_or_create(&self, name: &str, func: Arc<PackedFn>, const_loc: &[usize]) -> Arc<WrappedFunc> {
        let mut functions = self.functions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = functions.get(name) {
            return Arc::clone(existing);
        }

        tracing::debug!(name, ?const_loc, mode = ?self.config.exec_mode, "wrapping function");
        let wrapped = Arc::new(WrappedFunc::new(
            Arc::clone(&self.engine),
            func,
            Arc::clone(&self.set_stream),
            const_loc,
            self.config.exec_mode,
        ));
        functions.insert(name.to_string(), Arc::clone(&wrapped));
        wrapped
    }

    /// Like [`get_or_create`](Self::get_or_create), keyed by the id code of
    /// `name` instantiated for `arg_types`.
    pub fn get_or_create_typed(
        &self,
        name: &str,
        arg_types: &[TypeCode],
        func: Arc<PackedFn>,
        const_loc: &[usize],
    ) -> Arc<WrappedFunc> {
        self.get_or_create(&func_idcode(name, arg_types), func, const_loc)
    }

    pub fn get(&self, name: &str) -> Option<Arc<WrappedFunc>> {
        self.functions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.functions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl core::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("config", &self.config)
            .field("functions", &self.len())
            .finish_non_exhaustive()
    }
}
