use core::fmt;
use serde::{Deserialize, Serialize};

/// Element type of a dense numeric array.
///
/// The wire representation is the lowercase type name (`"float32"`,
/// `"uint8"`, ...), matching the `dtype` / `original_dtype` string fields of
/// [`EncodedArray`](crate::EncodedArray).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dtype {
    #[serde(rename = "float64")]
    F64,
    #[serde(rename = "float32")]
    F32,
    #[serde(rename = "float16")]
    F16,
    #[serde(rename = "int64")]
    I64,
    #[serde(rename = "int32")]
    I32,
    #[serde(rename = "uint8")]
    U8,
}

impl Dtype {
    /// Width of a single element in bytes.
    pub const fn width(self) -> usize {
        match self {
            Self::F64 | Self::I64 => 8,
            Self::F32 | Self::I32 => 4,
            Self::F16 => 2,
            Self::U8 => 1,
        }
    }

    /// The wire name of this dtype.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::F64 => "float64",
            Self::F32 => "float32",
            Self::F16 => "float16",
            Self::I64 => "int64",
            Self::I32 => "int32",
            Self::U8 => "uint8",
        }
    }

    /// Whether this dtype is a floating-point type.
    ///
    /// Quantized codec modes only apply to floating-point inputs; everything
    /// else is stored verbatim.
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F64 | Self::F32 | Self::F16)
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
