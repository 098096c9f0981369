#![doc = include_str!("../README.md")]

// Public re-export so downstream crates can name `Bytes` without a direct
// dependency on `bytes`.
pub use bytes;

mod array;
pub mod codec;
mod dtype;
mod error;
mod message;

pub use crate::array::*;
pub use crate::codec::*;
pub use crate::dtype::*;
pub use crate::error::*;
pub use crate::message::*;
