//! Error types for the dispatch bridge.
//!
//! Every check that would abort the process in a plain C glue layer is a
//! [`BridgeError`] here, raised on the calling thread before anything reaches
//! the engine. Failures that happen later, on an engine worker, are logged
//! because the submitting call has already returned.

use briny::prelude::ValidationError;
use thiserror::Error;

use crate::context::Context;
use crate::packed::TypeCode;

/// A failure reported by the host engine through its integer return code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("engine returned {code}: {message}")]
pub struct EngineError {
    pub code: i32,
    pub message: String,
}

impl EngineError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// A failure raised by the wrapped callable itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CallError(pub String);

impl From<&str> for CallError {
    fn from(msg: &str) -> Self {
        Self(msg.to_string())
    }
}

impl From<String> for CallError {
    fn from(msg: String) -> Self {
        Self(msg)
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Two array arguments of one call live on different devices.
    #[error("inconsistent context at argument {position}: expected {expected}, found {found}")]
    Configuration {
        expected: Context,
        found: Context,
        position: usize,
    },

    /// An argument slot is neither POD nor an array handle.
    #[error("argument {position} has type code {code:?}; only POD and array arguments are allowed in an async call")]
    InvalidArgumentType { position: usize, code: TypeCode },

    /// The engine refused the task.
    #[error("engine rejected task submission: {0}")]
    Submission(#[source] EngineError),

    /// Any other engine call (copy, context query, conversion, wait) failed.
    #[error("engine call `{op}` failed: {source}")]
    Engine {
        op: &'static str,
        #[source]
        source: EngineError,
    },

    /// The wrapped callable reported an error.
    #[error("callable failed: {0}")]
    Call(#[from] CallError),

    /// Kernel geometry is degenerate.
    #[error("invalid convolution geometry: {0}")]
    Geometry(ValidationError),

    /// A kernel buffer does not match the geometry.
    #[error("buffer holds {found} elements, geometry needs {expected}")]
    BufferSize { expected: usize, found: usize },
}

impl From<ValidationError> for BridgeError {
    fn from(err: ValidationError) -> Self {
        Self::Geometry(err)
    }
}

pub type Result<T, E = BridgeError> = core::result::Result<T, E>;
