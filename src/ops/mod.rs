//! # Convolution helper kernels
//!
//! im2col unrolls every receptive field of an image into a column so a
//! convolution becomes one matrix multiplication; col2im is its adjoint and
//! scatters (sums) columns back into image layout, as the backward pass needs.
//!
//! ## Submodules
//!
//! - [`cpu`]: `rayon` implementations, one work item per output element
//!
//! Accelerator versions of these kernels are supplied by the host through
//! the bridge and are not part of this crate.
//!
//! ## Layout
//!
//! - image: `[channels, height, width]`, row-major
//! - columns: `[channels * kernel_h * kernel_w, height_col * width_col]`, row-major

pub mod cpu;

pub use cpu::{col2im, im2col};

use briny::prelude::*;

/// Element type of both kernels.
pub type DType = f32;

/// Shape, padding, stride and dilation of one im2col/col2im transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvGeometry {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
    pub kernel_h: usize,
    pub kernel_w: usize,
    pub pad_h: usize,
    pub pad_w: usize,
    pub stride_h: usize,
    pub stride_w: usize,
    pub dilation_h: usize,
    pub dilation_w: usize,
}

impl ConvGeometry {
    /// Square kernel, unit stride and dilation, no padding.
    pub fn new(channels: usize, height: usize, width: usize, kernel: usize) -> Self {
        Self {
            channels,
            height,
            width,
            kernel_h: kernel,
            kernel_w: kernel,
            pad_h: 0,
            pad_w: 0,
            stride_h: 1,
            stride_w: 1,
            dilation_h: 1,
            dilation_w: 1,
        }
    }

    pub fn with_pad(mut self, pad_h: usize, pad_w: usize) -> Self {
        self.pad_h = pad_h;
        self.pad_w = pad_w;
        self
    }

    pub fn with_stride(mut self, stride_h: usize, stride_w: usize) -> Self {
        self.stride_h = stride_h;
        self.stride_w = stride_w;
        self
    }

    pub fn with_dilation(mut self, dilation_h: usize, dilation_w: usize) -> Self {
        self.dilation_h = dilation_h;
        self.dilation_w = dilation_w;
        self
    }

    fn extent_h(&self) -> usize {
        self.dilation_h * (self.kernel_h - 1) + 1
    }

    fn extent_w(&self) -> usize {
        self.dilation_w * (self.kernel_w - 1) + 1
    }

    /// Number of kernel positions along the height.
    pub fn height_col(&self) -> usize {
        (self.height + 2 * self.pad_h - self.extent_h()) / self.stride_h + 1
    }

    /// Number of kernel positions along the width.
    pub fn width_col(&self) -> usize {
        (self.width + 2 * self.pad_w - self.extent_w()) / self.stride_w + 1
    }

    /// Element count of the image buffer.
    pub fn image_len(&self) -> usize {
        self.channels * self.height * self.width
    }

    /// Element count of the column buffer.
    pub fn col_len(&self) -> usize {
        self.channels * self.kernel_h * self.kernel_w * self.height_col() * self.width_col()
    }
}

impl Validate for ConvGeometry {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.kernel_h == 0 || self.kernel_w == 0 {
            return Err(ValidationError);
        }
        if self.stride_h == 0 || self.stride_w == 0 || self.dilation_h == 0 || self.dilation_w == 0 {
            return Err(ValidationError);
        }
        // the dilated kernel has to fit in the padded image at least once
        if self.height + 2 * self.pad_h < self.extent_h() || self.width + 2 * self.pad_w < self.extent_w() {
            return Err(ValidationError);
        }
        Ok(())
    }
}
