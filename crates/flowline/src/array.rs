//! Dense, row-major numeric arrays.
//!
//! [`NdArray`] is the logical array model carried through the request
//! pipeline: an element type, an ordered shape, and a flat buffer of
//! elements in row-major order. The on-wire form is produced by the codec in
//! [`crate::codec`].

use crate::{Dtype, ShapeError};
use half::f16;

/// Number of elements implied by a shape.
///
/// An empty shape denotes the empty array, not a zero-rank scalar, so its
/// element count is zero.
pub(crate) fn element_count(shape: &[usize]) -> usize {
    if shape.is_empty() {
        0
    } else {
        shape.iter().product()
    }
}

/// Typed flat element storage for an [`NdArray`].
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    F64(Vec<f64>),
    F32(Vec<f32>),
    F16(Vec<f16>),
    I64(Vec<i64>),
    I32(Vec<i32>),
    U8(Vec<u8>),
}

impl ArrayData {
    /// The dtype of the stored elements.
    pub const fn dtype(&self) -> Dtype {
        match self {
            Self::F64(_) => Dtype::F64,
            Self::F32(_) => Dtype::F32,
            Self::F16(_) => Dtype::F16,
            Self::I64(_) => Dtype::I64,
            Self::I32(_) => Dtype::I32,
            Self::U8(_) => Dtype::U8,
        }
    }

    /// Number of stored elements.
    pub fn len(&self) -> usize {
        match self {
            Self::F64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F16(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::U8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serializes every element as little-endian bytes.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            Self::F64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::F32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::F16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::I64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::I32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::U8(v) => v.clone(),
        }
    }

    /// Reinterprets a little-endian byte buffer at the given dtype.
    ///
    /// The caller must have verified that `bytes.len()` is a multiple of the
    /// dtype's element width.
    pub(crate) fn from_le_bytes(dtype: Dtype, bytes: &[u8]) -> Self {
        fn chunked<const N: usize, T>(bytes: &[u8], f: impl Fn([u8; N]) -> T) -> Vec<T> {
            bytes
                .chunks_exact(N)
                .map(|c| f(c.try_into().expect("chunk width checked")))
                .collect()
        }
        match dtype {
            Dtype::F64 => Self::F64(chunked(bytes, f64::from_le_bytes)),
            Dtype::F32 => Self::F32(chunked(bytes, f32::from_le_bytes)),
            Dtype::F16 => Self::F16(chunked(bytes, f16::from_le_bytes)),
            Dtype::I64 => Self::I64(chunked(bytes, i64::from_le_bytes)),
            Dtype::I32 => Self::I32(chunked(bytes, i32::from_le_bytes)),
            Dtype::U8 => Self::U8(bytes.to_vec()),
        }
    }

    /// A zero-filled buffer of `count` elements at the given dtype.
    pub(crate) fn zeros(dtype: Dtype, count: usize) -> Self {
        match dtype {
            Dtype::F64 => Self::F64(vec![0.0; count]),
            Dtype::F32 => Self::F32(vec![0.0; count]),
            Dtype::F16 => Self::F16(vec![f16::ZERO; count]),
            Dtype::I64 => Self::I64(vec![0; count]),
            Dtype::I32 => Self::I32(vec![0; count]),
            Dtype::U8 => Self::U8(vec![0; count]),
        }
    }
}

/// A dense numeric array: dtype, row-major shape, and flat element data.
///
/// Immutable once constructed. The element count must equal the shape
/// product (an empty shape implies zero elements).
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    data: ArrayData,
}

impl NdArray {
    /// Constructs an array from typed data and a row-major shape.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError`] if the element count does not match the shape
    /// product.
    pub fn new(data: ArrayData, shape: Vec<usize>) -> Result<Self, ShapeError> {
        let expected = element_count(&shape);
        if data.len() != expected {
            return Err(ShapeError {
                expected,
                elements: data.len(),
                shape,
            });
        }
        Ok(Self { shape, data })
    }

    /// Constructs an array whose element count is already known to match the
    /// shape product.
    pub(crate) fn from_parts(data: ArrayData, shape: Vec<usize>) -> Self {
        debug_assert_eq!(data.len(), element_count(&shape));
        Self { shape, data }
    }

    /// The empty array of the given dtype (empty shape, zero elements).
    pub fn empty(dtype: Dtype) -> Self {
        Self {
            shape: Vec::new(),
            data: ArrayData::zeros(dtype, 0),
        }
    }

    /// A zero-filled array of the given dtype and shape.
    pub fn zeros(dtype: Dtype, shape: Vec<usize>) -> Self {
        let data = ArrayData::zeros(dtype, element_count(&shape));
        Self { shape, data }
    }

    pub fn from_f64(data: Vec<f64>, shape: Vec<usize>) -> Result<Self, ShapeError> {
        Self::new(ArrayData::F64(data), shape)
    }

    pub fn from_f32(data: Vec<f32>, shape: Vec<usize>) -> Result<Self, ShapeError> {
        Self::new(ArrayData::F32(data), shape)
    }

    pub fn from_f16(data: Vec<f16>, shape: Vec<usize>) -> Result<Self, ShapeError> {
        Self::new(ArrayData::F16(data), shape)
    }

    pub fn from_i64(data: Vec<i64>, shape: Vec<usize>) -> Result<Self, ShapeError> {
        Self::new(ArrayData::I64(data), shape)
    }

    pub fn from_i32(data: Vec<i32>, shape: Vec<usize>) -> Result<Self, ShapeError> {
        Self::new(ArrayData::I32(data), shape)
    }

    pub fn from_u8(data: Vec<u8>, shape: Vec<usize>) -> Result<Self, ShapeError> {
        Self::new(ArrayData::U8(data), shape)
    }

    pub const fn dtype(&self) -> Dtype {
        self.data.dtype()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub const fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_product_must_match_data_len() {
        let err = NdArray::from_f32(vec![1.0, 2.0, 3.0], vec![2, 2]).unwrap_err();
        assert_eq!(err.expected, 4);
        assert_eq!(err.elements, 3);

        let ok = NdArray::from_f32(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]).unwrap();
        assert_eq!(ok.shape(), &[2, 2]);
        assert_eq!(ok.dtype(), Dtype::F32);
    }

    #[test]
    fn empty_shape_means_zero_elements() {
        let err = NdArray::from_f64(vec![1.0], vec![]).unwrap_err();
        assert_eq!(err.expected, 0);

        let empty = NdArray::empty(Dtype::F64);
        assert!(empty.is_empty());
        assert!(empty.shape().is_empty());
    }

    #[test]
    fn zero_extent_dimension_is_legal() {
        let arr = NdArray::from_u8(vec![], vec![3, 0]).unwrap();
        assert!(arr.is_empty());
        assert_eq!(arr.shape(), &[3, 0]);
    }

    #[test]
    fn le_byte_round_trip() {
        let data = ArrayData::I32(vec![-1, 0, 7]);
        let bytes = data.to_le_bytes();
        assert_eq!(bytes.len(), 12);
        assert_eq!(ArrayData::from_le_bytes(Dtype::I32, &bytes), data);
    }
}
