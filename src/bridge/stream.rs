//! Stream hand-off for GPU calls.
//!
//! A GPU task learns its stream from the engine only when it runs. The bridge
//! forwards it through a [`StreamHookFn`] right before invoking the callable and
//! clears it right after, so the callable sees the stream for exactly one
//! invocation.

use std::sync::{Arc, Mutex, PoisonError};

use crate::context::{DeviceType, StreamHandle};

/// Receives `(device type, device id, stream)`; `None` clears the stream.
pub type StreamHookFn = dyn Fn(DeviceType, i32, Option<StreamHandle>) + Send + Sync;

/// Sets the stream on creation and clears it on drop, including during unwinding.
pub(crate) struct StreamGuard<'a> {
    hook: &'a StreamHookFn,
    device_id: i32,
}

impl<'a> StreamGuard<'a> {
    pub(crate) fn set(hook: &'a StreamHookFn, device_id: i32, stream: Option<StreamHandle>) -> Self {
        hook(DeviceType::Gpu, device_id, stream);
        Self { hook, device_id }
    }
}

impl Drop for StreamGuard<'_> {
    fn drop(&mut self) {
        (self.hook)(DeviceType::Gpu, self.device_id, None);
    }
}

/// The stream currently handed to kernels, as an explicit shared object.
///
/// Kernels that launch work themselves read [`current`](StreamSlot::current)
/// while they run.
#[derive(Debug, Default)]
pub struct StreamSlot {
    current: Mutex<Option<(i32, StreamHandle)>>,
}

impl StreamSlot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Device id and stream of the invocation in progress, if any.
    pub fn current(&self) -> Option<(i32, StreamHandle)> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A hook writing into this slot.
    pub fn hook(self: &Arc<Self>) -> Arc<StreamHookFn> {
        let slot = Arc::clone(self);
        Arc::new(move |_device_type: DeviceType, device_id: i32, stream: Option<StreamHandle>| {
            *slot.current.lock().unwrap_or_else(PoisonError::into_inner) =
                stream.map(|s| (device_id, s));
        })
    }
}
