//! Protocol units exchanged with the processing gateway.
//!
//! A [`RequestMessage`] is an ordered, opaque unit of work: a target
//! endpoint plus one [`DataPart`] per batched input item. Parts carry
//! encoded arrays (by field name) alongside verbatim scalar fields. Messages
//! are immutable once built and owned by the pipeline until handed to the
//! transport.

use crate::EncodedArray;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// The implicit root endpoint used when none is configured.
pub const ROOT_ENDPOINT: &str = "/";

/// A scalar payload field, copied verbatim from the input item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Bytes),
}

/// The encoded form of one input item inside a [`RequestMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPart {
    /// Caller-supplied item identifier, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Array fields, encoded for the wire, in input order.
    pub arrays: Vec<(String, EncodedArray)>,
    /// Non-array fields, copied verbatim, in input order.
    pub scalars: Vec<(String, ScalarValue)>,
}

/// An ordered unit of work sent to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMessage {
    /// Target endpoint identifier.
    pub endpoint: String,
    /// One part per batched input item, in input order.
    pub parts: Vec<DataPart>,
}

/// A gateway response paired 1:1 with a submitted [`RequestMessage`].
///
/// Opaque to the pipeline; only routed to result callbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Endpoint the paired request targeted.
    pub endpoint: String,
    /// Result parts produced by the gateway.
    pub parts: Vec<DataPart>,
    /// Gateway-reported status line.
    pub status: String,
}
