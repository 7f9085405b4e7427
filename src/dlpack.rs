//! Zero-copy tensor exchange descriptors.
//!
//! The engine exports an array as a [`ManagedTensor`]: a plain description of
//! shape, strides, element type and data address, plus a deleter that releases
//! whatever the engine allocated to back the description. The buffer itself is
//! never copied.
//!
//! A `ManagedTensor` lives for exactly one invocation of a wrapped callable.
//! Dropping it runs the deleter, so each exported descriptor is released once.

use core::fmt;

use crate::context::Context;

/// Element type code of an exchanged tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataTypeCode {
    Int = 0,
    UInt = 1,
    Float = 2,
    BFloat = 4,
}

/// Element type: code, bit width and vector lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataType {
    pub code: DataTypeCode,
    pub bits: u8,
    pub lanes: u16,
}

impl DataType {
    pub const F32: Self = Self { code: DataTypeCode::Float, bits: 32, lanes: 1 };
    pub const F64: Self = Self { code: DataTypeCode::Float, bits: 64, lanes: 1 };
    pub const I32: Self = Self { code: DataTypeCode::Int, bits: 32, lanes: 1 };

    /// Size of one element in bytes.
    pub fn size_of(&self) -> usize {
        (usize::from(self.bits) * usize::from(self.lanes)).div_ceil(8)
    }
}

/// Borrowed view of an array's storage.
#[derive(Debug, Clone, PartialEq)]
pub struct DlTensor {
    /// Base address of the underlying buffer.
    pub data: usize,
    pub device: Context,
    pub dtype: DataType,
    pub shape: Vec<i64>,
    /// `None` means compact row-major.
    pub strides: Option<Vec<i64>>,
    pub byte_offset: u64,
}

impl DlTensor {
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements described by `shape`.
    pub fn numel(&self) -> usize {
        self.shape.iter().map(|&d| d.max(0) as usize).product()
    }
}

type Deleter = Box<dyn FnOnce(&mut DlTensor) + Send>;

/// A [`DlTensor`] plus the engine-specific deleter that owns its backing descriptor.
pub struct ManagedTensor {
    tensor: DlTensor,
    deleter: Option<Deleter>,
}

impl ManagedTensor {
    pub fn new(tensor: DlTensor, deleter: impl FnOnce(&mut DlTensor) + Send + 'static) -> Self {
        Self { tensor, deleter: Some(Box::new(deleter)) }
    }

    /// A descriptor with nothing to release.
    pub fn unmanaged(tensor: DlTensor) -> Self {
        Self { tensor, deleter: None }
    }

    pub fn tensor(&self) -> &DlTensor {
        &self.tensor
    }
}

impl Drop for ManagedTensor {
    fn drop(&mut self) {
        if let Some(deleter) = self.deleter.take() {
            deleter(&mut self.tensor);
        }
    }
}

impl fmt::Debug for ManagedTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedTensor")
            .field("tensor", &self.tensor)
            .field("managed", &self.deleter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample() -> DlTensor {
        DlTensor {
            data: 0x1000,
            device: Context::cpu(0),
            dtype: DataType::F32,
            shape: vec![2, 3],
            strides: None,
            byte_offset: 0,
        }
    }

    #[test]
    fn deleter_runs_once_on_drop() {
        let runs = Arc::new(AtomicUsize::new(0));
        let seen = runs.clone();
        let managed = ManagedTensor::new(sample(), move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(managed.tensor().numel(), 6);
        drop(managed);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unmanaged_descriptor_drops_quietly() {
        let tensor = DlTensor { dtype: DataType::I32, ..sample() };
        let managed = ManagedTensor::unmanaged(tensor.clone());
        assert_eq!(managed.tensor(), &tensor);
        assert!(format!("{managed:?}").contains("managed: false"));
        drop(managed);
    }

    #[test]
    fn element_sizes() {
        assert_eq!(DataType::F32.size_of(), 4);
        assert_eq!(DataType::F64.size_of(), 8);
        assert_eq!(DataType::I32.size_of(), 4);
        assert_ne!(DataType::I32, DataType::F32);
        let half = DataType { code: DataTypeCode::Float, bits: 16, lanes: 1 };
        assert_eq!(half.size_of(), 2);
    }
}
