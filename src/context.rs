//! Device context description.
//!
//! This module defines where an array's storage lives, as reported by the host
//! engine, and the run context the engine hands to a task when it finally
//! executes it.
//!
//! # Device Types
//!
//! - `Cpu`: host memory (default).
//! - `Gpu`: device memory; tasks on it receive a stream from the engine.
//! - `CpuPinned`: page-locked host memory.
//!
//! The numeric values follow the host engine's encoding, so a raw device code
//! coming back from [`Engine::get_context`](crate::engine::Engine::get_context)
//! converts with [`DeviceType::try_from`].

use core::fmt;

/// Enumeration of device types understood by the host engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum DeviceType {
    /// Plain host memory (default).
    #[default]
    Cpu = 1,
    /// Accelerator memory.
    Gpu = 2,
    /// Page-locked host memory.
    CpuPinned = 3,
}

impl TryFrom<i32> for DeviceType {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Cpu),
            2 => Ok(Self::Gpu),
            3 => Ok(Self::CpuPinned),
            other => Err(other),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Gpu => write!(f, "gpu"),
            Self::CpuPinned => write!(f, "cpu_pinned"),
        }
    }
}

/// Device type plus ordinal identifying where an array lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Context {
    pub device_type: DeviceType,
    pub device_id: i32,
}

impl Context {
    /// A host context with the given ordinal.
    pub const fn cpu(device_id: i32) -> Self {
        Self { device_type: DeviceType::Cpu, device_id }
    }

    /// An accelerator context with the given ordinal.
    pub const fn gpu(device_id: i32) -> Self {
        Self { device_type: DeviceType::Gpu, device_id }
    }

    /// Returns `true` if work on this context must be bracketed with a stream.
    pub fn is_gpu(&self) -> bool {
        self.device_type == DeviceType::Gpu
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.device_type, self.device_id)
    }
}

/// Opaque stream handle handed out by the engine for GPU tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle(pub usize);

/// What the engine passes to a task when it executes it.
///
/// This may arrive on a different thread, and much later, than the call that
/// submitted the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    pub ctx: Context,
    pub stream: Option<StreamHandle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_codes_match_engine_encoding() {
        assert_eq!(DeviceType::try_from(1), Ok(DeviceType::Cpu));
        assert_eq!(DeviceType::try_from(2), Ok(DeviceType::Gpu));
        assert_eq!(DeviceType::try_from(3), Ok(DeviceType::CpuPinned));
        assert_eq!(DeviceType::try_from(7), Err(7));
    }

    #[test]
    fn context_display() {
        assert_eq!(Context::gpu(1).to_string(), "gpu:1");
        assert_eq!(Context::cpu(0).to_string(), "cpu:0");
    }
}
