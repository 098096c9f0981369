//! Quantizing codec for dense numeric arrays.
//!
//! This module defines [`EncodedArray`], the self-describing on-wire form of
//! an [`NdArray`], and the [`encode`] / [`decode`] pair that converts between
//! the two. The codec trades fidelity for wire size:
//!
//! - [`CodecMode::None`] stores elements verbatim at their native width.
//! - [`CodecMode::Fp32`] narrows `float64` input to `float32`.
//! - [`CodecMode::Fp16`] casts `float32`/`float64` input to `float16`; the
//!   original dtype is recorded so decoding upcasts back to full width.
//! - [`CodecMode::Uint8`] maps float input onto 256 affine buckets derived
//!   from the observed min/max; reconstruction error is bounded by the
//!   bucket width.
//!
//! Encoding never fails: a dtype unsupported by the requested mode falls
//! back to the verbatim representation. Decoding fails only on malformed
//! payloads. The codec is pure and stateless, and safe to share across
//! concurrent pipeline runs.

use crate::array::element_count;
use crate::{ArrayData, DecodeError, Dtype, NdArray, Result};
use bytes::Bytes;
use core::fmt;
use half::f16;
use serde::{Deserialize, Serialize};

/// Requested fidelity/size trade-off for [`encode`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecMode {
    /// Store elements verbatim at their native width.
    #[default]
    None,
    /// Narrow `float64` elements to `float32`.
    Fp32,
    /// Cast float elements to `float16`, upcast on decode.
    Fp16,
    /// Affine-quantize float elements to `uint8`.
    Uint8,
}

/// Quantization marker stored in an [`EncodedArray`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Quantization {
    #[default]
    None,
    Fp32,
    Fp16,
    Uint8,
}

impl Quantization {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Fp32 => "FP32",
            Self::Fp16 => "FP16",
            Self::Uint8 => "UINT8",
        }
    }
}

impl fmt::Display for Quantization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reconstruction parameters carried by uint8-quantized payloads.
///
/// Invariant: `scale == (max_val - min_val) / 256`. A `scale` of zero marks
/// a constant array; every element reconstructs to `min_val`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantParams {
    pub min_val: f64,
    pub max_val: f64,
    pub scale: f64,
}

/// The self-describing on-wire representation of a dense numeric array.
///
/// Constructed once per request by [`encode`], read-only thereafter. The
/// buffer holds little-endian elements of `dtype`; `original_dtype` is
/// present exactly when `quantization` is not [`Quantization::None`], and
/// the min/max/scale parameters exactly for [`Quantization::Uint8`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedArray {
    pub buffer: Bytes,
    pub dtype: Dtype,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_dtype: Option<Dtype>,
    pub shape: Vec<usize>,
    pub quantization: Quantization,
    #[serde(flatten, default, skip_serializing_if = "Option::is_none")]
    pub params: Option<QuantParams>,
}

/// Encodes an array for the wire with the requested codec mode.
///
/// # Behavior
///
/// - `Fp32` applies only to `float64` input, `Fp16` to `float32`/`float64`,
///   and `Uint8` to any float dtype.
/// - Any other mode/dtype combination falls back to the verbatim `NONE`
///   representation rather than failing.
/// - The produced payload always round-trips through [`decode`].
pub fn encode(array: &NdArray, mode: CodecMode) -> EncodedArray {
    let original = array.dtype();
    let (data, quantization, params) = match (mode, array.data()) {
        (CodecMode::Fp32, ArrayData::F64(v)) => (
            ArrayData::F32(v.iter().map(|&x| x as f32).collect()),
            Quantization::Fp32,
            None,
        ),
        (CodecMode::Fp16, ArrayData::F32(v)) => (
            ArrayData::F16(v.iter().map(|&x| f16::from_f32(x)).collect()),
            Quantization::Fp16,
            None,
        ),
        (CodecMode::Fp16, ArrayData::F64(v)) => (
            ArrayData::F16(v.iter().map(|&x| f16::from_f64(x)).collect()),
            Quantization::Fp16,
            None,
        ),
        (CodecMode::Uint8, ArrayData::F64(v)) => quantize_u8(v.iter().copied()),
        (CodecMode::Uint8, ArrayData::F32(v)) => quantize_u8(v.iter().map(|&x| f64::from(x))),
        (CodecMode::Uint8, ArrayData::F16(v)) => quantize_u8(v.iter().map(|x| x.to_f64())),
        // Unsupported dtype for the requested mode: store verbatim.
        _ => (array.data().clone(), Quantization::None, None),
    };

    EncodedArray {
        buffer: Bytes::from(data.to_le_bytes()),
        dtype: data.dtype(),
        original_dtype: (quantization != Quantization::None).then_some(original),
        shape: array.shape().to_vec(),
        quantization,
        params,
    }
}

/// Affine-quantizes float values onto 256 buckets between their extrema.
fn quantize_u8(values: impl Iterator<Item = f64>) -> (ArrayData, Quantization, Option<QuantParams>) {
    let values: Vec<f64> = values.collect();
    let (min_val, max_val) = if values.is_empty() {
        // No extrema to observe; zero parameters keep the payload well
        // formed.
        (0.0, 0.0)
    } else {
        values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                (lo.min(x), hi.max(x))
            })
    };
    let scale = (max_val - min_val) / 256.0;

    let codes = if scale == 0.0 {
        vec![0_u8; values.len()]
    } else {
        values
            .iter()
            .map(|&x| ((x - min_val) / scale).round().clamp(0.0, 255.0) as u8)
            .collect()
    };

    (
        ArrayData::U8(codes),
        Quantization::Uint8,
        Some(QuantParams {
            min_val,
            max_val,
            scale,
        }),
    )
}

/// Decodes an on-wire payload back into an [`NdArray`].
///
/// An empty buffer with an empty shape yields the empty array; an empty
/// buffer with a declared shape yields a zero-filled array of that shape.
/// Quantized payloads are upcast to their recorded original dtype.
///
/// # Errors
///
/// Returns [`DecodeError`] if the buffer length is not a multiple of the
/// stored element width, the element count does not match the shape product,
/// or a quantized payload is missing its reconstruction metadata.
pub fn decode(encoded: &EncodedArray) -> Result<NdArray> {
    if encoded.buffer.is_empty() {
        let dtype = encoded.original_dtype.unwrap_or(encoded.dtype);
        if encoded.shape.is_empty() {
            return Ok(NdArray::empty(dtype));
        }
        // An array whose shape was declared but whose value was never
        // populated: legal, reconstructs as zeros.
        return Ok(NdArray::zeros(dtype, encoded.shape.clone()));
    }

    let width = encoded.dtype.width();
    if encoded.buffer.len() % width != 0 {
        return Err(DecodeError::BufferWidth {
            len: encoded.buffer.len(),
            width,
            dtype: encoded.dtype,
        });
    }
    let elements = encoded.buffer.len() / width;
    let expected = element_count(&encoded.shape);
    if elements != expected {
        return Err(DecodeError::ShapeProduct {
            elements,
            expected,
            shape: encoded.shape.clone(),
        });
    }

    let stored = ArrayData::from_le_bytes(encoded.dtype, &encoded.buffer);
    let data = match encoded.quantization {
        // FP32 payloads were narrowed at encode time and stay at float32.
        Quantization::None | Quantization::Fp32 => stored,
        Quantization::Fp16 => upcast_f16(encoded, stored)?,
        Quantization::Uint8 => dequantize_u8(encoded, stored)?,
    };

    Ok(NdArray::from_parts(data, encoded.shape.clone()))
}

fn upcast_f16(encoded: &EncodedArray, stored: ArrayData) -> Result<ArrayData> {
    let ArrayData::F16(values) = stored else {
        return Err(DecodeError::StorageDtype {
            quantization: Quantization::Fp16,
            dtype: encoded.dtype,
            expected: Dtype::F16,
        });
    };
    let original = encoded
        .original_dtype
        .ok_or(DecodeError::MissingOriginalDtype {
            quantization: Quantization::Fp16,
        })?;
    match original {
        Dtype::F64 => Ok(ArrayData::F64(values.iter().map(|x| x.to_f64()).collect())),
        Dtype::F32 => Ok(ArrayData::F32(values.iter().map(|x| x.to_f32()).collect())),
        Dtype::F16 => Ok(ArrayData::F16(values)),
        other => Err(DecodeError::UnsupportedUpcast {
            quantization: Quantization::Fp16,
            dtype: other,
        }),
    }
}

fn dequantize_u8(encoded: &EncodedArray, stored: ArrayData) -> Result<ArrayData> {
    let ArrayData::U8(codes) = stored else {
        return Err(DecodeError::StorageDtype {
            quantization: Quantization::Uint8,
            dtype: encoded.dtype,
            expected: Dtype::U8,
        });
    };
    let params = encoded.params.ok_or(DecodeError::MissingParams)?;
    let original = encoded
        .original_dtype
        .ok_or(DecodeError::MissingOriginalDtype {
            quantization: Quantization::Uint8,
        })?;

    let recon = |code: u8| -> f64 {
        if params.scale == 0.0 {
            params.min_val
        } else {
            f64::from(code) * params.scale + params.min_val
        }
    };
    match original {
        Dtype::F64 => Ok(ArrayData::F64(codes.iter().map(|&c| recon(c)).collect())),
        Dtype::F32 => Ok(ArrayData::F32(
            codes.iter().map(|&c| recon(c) as f32).collect(),
        )),
        Dtype::F16 => Ok(ArrayData::F16(
            codes.iter().map(|&c| f16::from_f64(recon(c))).collect(),
        )),
        other => Err(DecodeError::UnsupportedUpcast {
            quantization: Quantization::Uint8,
            dtype: other,
        }),
    }
}
