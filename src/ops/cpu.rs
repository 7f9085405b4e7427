//! Parallel CPU im2col / col2im.
//!
//! Both kernels are gathers: every output element computes its own value from
//! the input, so `rayon` can hand out output elements freely with no
//! synchronization.

use briny::prelude::*;
use rayon::prelude::*;

use super::{ConvGeometry, DType};
use crate::error::{BridgeError, Result};

fn check_len(found: usize, expected: usize) -> Result<()> {
    if found != expected {
        return Err(BridgeError::BufferSize { expected, found });
    }
    Ok(())
}

/// Unrolls `image` (`[C, H, W]`) into columns (`[C*kh*kw, height_col*width_col]`).
///
/// Taps falling into the padding read as zero.
///
/// # Errors
/// - [`BridgeError::Geometry`] if `geom` is degenerate
/// - [`BridgeError::BufferSize`] if `image` does not hold `C*H*W` elements
///
/// # Example
/// ```rust
/// use mobula_glue::ops::{im2col, ConvGeometry};
///
/// let g = ConvGeometry::new(1, 2, 2, 1);
/// let col = im2col(&[1.0, 2.0, 3.0, 4.0], &g).unwrap();
/// assert_eq!(col, vec![1.0, 2.0, 3.0, 4.0]);
/// ```
pub fn im2col(image: &[DType], geom: &ConvGeometry) -> Result<Vec<DType>> {
    geom.validate()?;
    check_len(image.len(), geom.image_len())?;

    let g = *geom;
    let height_col = g.height_col();
    let width_col = g.width_col();
    let plane = height_col * width_col;
    let taps = g.kernel_h * g.kernel_w;

    let mut col = vec![0.0; g.col_len()];
    col.par_iter_mut().enumerate().for_each(|(index, out)| {
        let c_col = index / plane;
        let h_col = (index / width_col) % height_col;
        let w_col = index % width_col;
        let c_im = c_col / taps;
        let i = (c_col % taps) / g.kernel_w;
        let j = c_col % g.kernel_w;

        let h_im = (h_col * g.stride_h + i * g.dilation_h) as isize - g.pad_h as isize;
        let w_im = (w_col * g.stride_w + j * g.dilation_w) as isize - g.pad_w as isize;
        if h_im >= 0 && w_im >= 0 && (h_im as usize) < g.height && (w_im as usize) < g.width {
            *out = image[(c_im * g.height + h_im as usize) * g.width + w_im as usize];
        }
    });

    Ok(col)
}

/// Folds columns back into image layout, summing overlapping taps.
///
/// This is the adjoint of [`im2col`]: for any image `x` and columns `y`,
/// `dot(im2col(x), y) == dot(x, col2im(y))`.
///
/// # Errors
/// - [`BridgeError::Geometry`] if `geom` is degenerate
/// - [`BridgeError::BufferSize`] if `col` does not match the geometry
pub fn col2im(col: &[DType], geom: &ConvGeometry) -> Result<Vec<DType>> {
    geom.validate()?;
    check_len(col.len(), geom.col_len())?;

    let g = *geom;
    let height_col = g.height_col();
    let width_col = g.width_col();
    let extent_h = g.dilation_h * (g.kernel_h - 1) + 1;
    let extent_w = g.dilation_w * (g.kernel_w - 1) + 1;

    let mut image = vec![0.0; g.image_len()];
    image.par_iter_mut().enumerate().for_each(|(index, out)| {
        // coordinates in the padded image
        let w_im = index % g.width + g.pad_w;
        let h_im = (index / g.width) % g.height + g.pad_h;
        let c_im = index / (g.width * g.height);

        let w_col_start = if w_im < extent_w { 0 } else { (w_im - extent_w) / g.stride_w + 1 };
        let w_col_end = (w_im / g.stride_w + 1).min(width_col);
        let h_col_start = if h_im < extent_h { 0 } else { (h_im - extent_h) / g.stride_h + 1 };
        let h_col_end = (h_im / g.stride_h + 1).min(height_col);

        let mut val = 0.0;
        for h_col in h_col_start..h_col_end {
            for w_col in w_col_start..w_col_end {
                let h_k = h_im - h_col * g.stride_h;
                let w_k = w_im - w_col * g.stride_w;
                if h_k % g.dilation_h == 0 && w_k % g.dilation_w == 0 {
                    let h_k = h_k / g.dilation_h;
                    let w_k = w_k / g.dilation_w;
                    let col_index = (((c_im * g.kernel_h + h_k) * g.kernel_w + w_k) * height_col + h_col)
                        * width_col
                        + w_col;
                    val += col[col_index];
                }
            }
        }
        *out = val;
    });

    Ok(image)
}
