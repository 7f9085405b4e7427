//! The packed calling convention.
//!
//! A call is a flat list of tagged values. Each [`PackedArg`] pairs a raw
//! [`ArgValue`] with a [`TypeCode`] telling the callee how to read it, which is
//! what lets one generic entry point forward to any kernel signature.
//!
//! Inside the async bridge only two families of codes are legal:
//!
//! - POD scalars and raw pointers (`Int`, `UInt`, `Float`, `Handle`, `Null`)
//! - framework array handles (`NdArrayHandle`)
//!
//! By the time the callable runs, every array handle has been replaced with a
//! borrowed tensor descriptor ([`CallArg::Tensor`], code `ArrayHandle`).

use std::sync::Arc;

use crate::dlpack::DlTensor;
use crate::engine::ArrayHandle;
use crate::error::CallError;

/// Type tag of a packed argument, numbered as the packed-function ABI numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum TypeCode {
    Int = 0,
    UInt = 1,
    Float = 2,
    Handle = 3,
    Null = 4,
    DataType = 5,
    Context = 6,
    ArrayHandle = 7,
    ObjectHandle = 8,
    ModuleHandle = 9,
    FuncHandle = 10,
    Str = 11,
    Bytes = 12,
    NdArrayHandle = 13,
}

impl TypeCode {
    /// POD codes are the ones numbered below `DataType`.
    pub fn is_pod(self) -> bool {
        (self as i32) < (Self::DataType as i32)
    }

    /// Short name used when building function id codes.
    pub fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Float => "float",
            Self::Handle => "handle",
            Self::Null => "null",
            Self::DataType => "dtype",
            Self::Context => "ctx",
            Self::ArrayHandle => "tensor",
            Self::ObjectHandle => "object",
            Self::ModuleHandle => "module",
            Self::FuncHandle => "func",
            Self::Str => "str",
            Self::Bytes => "bytes",
            Self::NdArrayHandle => "ndarray",
        }
    }
}

/// Raw payload of a packed argument. How it is read depends on the [`TypeCode`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArgValue {
    Int(i64),
    Float(f64),
    Handle(usize),
}

/// One slot of a packed call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackedArg {
    pub value: ArgValue,
    pub code: TypeCode,
}

impl PackedArg {
    pub fn int(v: i64) -> Self {
        Self { value: ArgValue::Int(v), code: TypeCode::Int }
    }

    pub fn float(v: f64) -> Self {
        Self { value: ArgValue::Float(v), code: TypeCode::Float }
    }

    pub fn handle(ptr: usize) -> Self {
        Self { value: ArgValue::Handle(ptr), code: TypeCode::Handle }
    }

    pub fn null() -> Self {
        Self { value: ArgValue::Handle(0), code: TypeCode::Null }
    }

    /// A framework array handle.
    pub fn ndarray(handle: ArrayHandle) -> Self {
        Self { value: ArgValue::Handle(handle.0), code: TypeCode::NdArrayHandle }
    }

    /// Any other tagged value, e.g. a string pointer coming from a foreign caller.
    pub fn raw(value: ArgValue, code: TypeCode) -> Self {
        Self { value, code }
    }

    /// The array handle carried by this slot, if it is one.
    pub fn as_ndarray(&self) -> Option<ArrayHandle> {
        match (self.code, self.value) {
            (TypeCode::NdArrayHandle, ArgValue::Handle(p)) => Some(ArrayHandle(p)),
            _ => None,
        }
    }
}

/// An argument as seen by the callable at invocation time.
#[derive(Debug, Clone, Copy)]
pub enum CallArg<'a> {
    /// A POD value, passed through untouched.
    Pod(PackedArg),
    /// Zero-copy view of an array argument, valid only for this invocation.
    Tensor(&'a DlTensor),
}

impl<'a> CallArg<'a> {
    pub fn type_code(&self) -> TypeCode {
        match self {
            Self::Pod(arg) => arg.code,
            Self::Tensor(_) => TypeCode::ArrayHandle,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Pod(PackedArg { value: ArgValue::Int(v), .. }) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Pod(PackedArg { value: ArgValue::Float(v), .. }) => Some(*v),
            _ => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&'a DlTensor> {
        match self {
            Self::Tensor(t) => Some(*t),
            Self::Pod(_) => None,
        }
    }
}

/// A callable taking the packed convention.
pub type PackedFn = dyn Fn(&[CallArg<'_>]) -> Result<(), CallError> + Send + Sync;

/// Boxes a closure as a shareable [`PackedFn`].
pub fn packed_fn<F>(f: F) -> Arc<PackedFn>
where
    F: Fn(&[CallArg<'_>]) -> Result<(), CallError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Builds the id code keying one typed instantiation of a kernel,
/// e.g. `"softmax:ndarray,int,ndarray"`.
pub fn func_idcode(name: &str, arg_types: &[TypeCode]) -> String {
    let types = arg_types.iter().map(|c| c.name()).collect::<Vec<_>>().join(",");
    format!("{name}:{types}")
}
