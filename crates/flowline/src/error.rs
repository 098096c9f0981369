//! Error types for the flowline wire contract.
//!
//! Construction of an [`NdArray`](crate::NdArray) fails with [`ShapeError`]
//! when the flat data does not match the declared shape. Decoding an
//! [`EncodedArray`](crate::EncodedArray) fails with [`DecodeError`] only for
//! malformed payloads; every well-formed payload decodes without error.

use crate::{Dtype, Quantization};

pub type Result<T, E = DecodeError> = core::result::Result<T, E>;

/// The flat element data of an array does not match its declared shape.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
#[error("shape {shape:?} requires {expected} elements, data holds {elements}")]
pub struct ShapeError {
    pub shape: Vec<usize>,
    pub expected: usize,
    pub elements: usize,
}

/// A malformed [`EncodedArray`](crate::EncodedArray) payload.
///
/// Decoding never raises for well-formed payloads, including the degenerate
/// empty-buffer / declared-shape case, which yields a zero-filled array.
#[derive(Clone, thiserror::Error, Debug, PartialEq)]
pub enum DecodeError {
    /// The buffer length is not a multiple of the stored element width.
    #[error("buffer of {len} bytes is not a multiple of {dtype} element width {width}")]
    BufferWidth {
        len: usize,
        width: usize,
        dtype: Dtype,
    },

    /// The element count does not match the declared shape product.
    #[error("buffer holds {elements} elements, shape {shape:?} requires {expected}")]
    ShapeProduct {
        elements: usize,
        expected: usize,
        shape: Vec<usize>,
    },

    /// A quantized payload is stored at an unexpected dtype.
    #[error("{quantization} payload stored as {dtype}, expected {expected}")]
    StorageDtype {
        quantization: Quantization,
        dtype: Dtype,
        expected: Dtype,
    },

    /// A quantized payload does not declare the dtype to reconstruct.
    #[error("{quantization} payload is missing its original dtype")]
    MissingOriginalDtype { quantization: Quantization },

    /// A quantized payload declares a non-float reconstruction dtype.
    #[error("{quantization} payload cannot be upcast to {dtype}")]
    UnsupportedUpcast {
        quantization: Quantization,
        dtype: Dtype,
    },

    /// A uint8 payload does not carry its min/max/scale parameters.
    #[error("uint8 payload is missing its min/max/scale parameters")]
    MissingParams,
}
