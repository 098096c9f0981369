#![doc = include_str!("../README.md")]

mod builder;
mod config;
mod dispatch;
mod error;
mod input;
mod pipeline;
mod validate;

pub use crate::builder::*;
pub use crate::config::*;
pub use crate::dispatch::*;
pub use crate::error::*;
pub use crate::input::*;
pub use crate::pipeline::*;
pub use crate::validate::*;
// Public re-export so downstream crates can access the wire contract via
// `flowline_client::flowline`
pub use flowline;
