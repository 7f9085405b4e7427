//! Argument classification.
//!
//! Walks a packed call once, taking a private reference to every array
//! argument and sorting its dependency variable into the read set or the write
//! set. Positions listed in the (ascending) const locations are reads; every
//! other array is assumed to be written, which can only over-serialize and
//! never race.
//!
//! The const cursor only moves on a match. An entry naming a non-array slot
//! therefore stops it, and every later array is classified as written.

use std::sync::Arc;

use crate::context::Context;
use crate::engine::{ArrayRef, Engine, VarHandle};
use crate::error::{BridgeError, Result};
use crate::packed::PackedArg;

/// Result of classifying one call.
#[derive(Debug, Default)]
pub struct Classified {
    /// Variables of read-only arrays, in call order.
    pub const_handles: Vec<VarHandle>,
    /// Variables of arrays the call may write, in call order.
    pub mutable_handles: Vec<VarHandle>,
    /// Device shared by every array; `None` if the call has none.
    pub ctx: Option<Context>,
    /// The references backing both sets, in call order.
    pub arrays: Vec<ArrayRef>,
    /// Argument position of each entry of `arrays`.
    pub array_loc: Vec<usize>,
}

/// Classifies `args` against the sorted `const_loc`.
///
/// On error every reference taken so far is released before returning, and
/// nothing has been submitted anywhere.
pub fn classify(engine: &Arc<dyn Engine>, args: &[PackedArg], const_loc: &[usize]) -> Result<Classified> {
    let mut out = Classified::default();
    let mut const_ptr = 0;

    for (i, arg) in args.iter().enumerate() {
        let Some(source) = arg.as_ndarray() else {
            if !arg.code.is_pod() {
                return Err(BridgeError::InvalidArgumentType { position: i, code: arg.code });
            }
            continue;
        };

        let array = ArrayRef::acquire(engine, source)
            .map_err(|source| BridgeError::Engine { op: "shallow_copy", source })?;
        let ctx = array
            .context()
            .map_err(|source| BridgeError::Engine { op: "get_context", source })?;

        match out.ctx {
            Some(expected) if expected != ctx => {
                return Err(BridgeError::Configuration { expected, found: ctx, position: i });
            }
            _ => out.ctx = Some(ctx),
        }

        let var = array
            .var()
            .map_err(|source| BridgeError::Engine { op: "get_var", source })?;
        if const_loc.get(const_ptr) == Some(&i) {
            const_ptr += 1;
            out.const_handles.push(var);
            tracing::trace!(position = i, var = var.0, "const array");
        } else {
            out.mutable_handles.push(var);
            tracing::trace!(position = i, var = var.0, "mutable array");
        }
        out.arrays.push(array);
        out.array_loc.push(i);
    }

    Ok(out)
}
