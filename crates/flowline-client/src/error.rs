//! Error types for the client request pipeline.
//!
//! This module defines the central [`Error`] enum, which captures all
//! reportable failure cases of a pipeline run.
//!
//! ## Error Cases
//! - `Validation`: The input source is fundamentally unsupported (e.g. an
//!   async stream handed to the blocking validator).
//! - `BadInput`: A concrete item failed to build into a request; wraps the
//!   underlying cause.
//! - `Build`: The request builder could not interpret an item's payload
//!   shape.
//! - `Decode`: A malformed array payload, surfaced from the wire crate.
//! - `Transport`: An opaque failure reported by the transport collaborator.
//! - `Cancelled`: The run was cancelled between batches.

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Unified error type for the client request pipeline.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The input source is fundamentally unsupported.
    #[error("invalid input source: {reason}")]
    Validation { reason: String },

    /// A concrete input item failed to resolve or build into a request.
    #[error("inputs are not valid")]
    BadInput {
        #[source]
        source: Box<dyn core::error::Error + Send + Sync>,
    },

    /// An item could not be interpreted as a supported request payload.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// A malformed array payload.
    #[error(transparent)]
    Decode(#[from] flowline::DecodeError),

    /// The transport collaborator reported a failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The run was cancelled between batches.
    #[error("run cancelled between batches")]
    Cancelled,
}

/// An input item that cannot be interpreted as a request payload.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum BuildError {
    /// The item carries no fields at all.
    #[error("item has no fields to build a request from")]
    EmptyItem,

    /// Two fields of one item share a name.
    #[error("duplicate field name in item: {name}")]
    DuplicateField { name: String },
}

/// An opaque per-request failure reported by the transport collaborator.
///
/// The pipeline never inspects the reason; it is routed to the `on_error`
/// callback and counted in the run summary.
#[derive(thiserror::Error, Debug)]
#[error("transport error: {reason}")]
pub struct TransportError {
    pub reason: String,
    #[source]
    pub source: Option<Box<dyn core::error::Error + Send + Sync>>,
}

impl TransportError {
    /// A transport error with a human-readable reason and no cause.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            source: None,
        }
    }

    /// Attaches the underlying cause.
    pub fn with_source(
        reason: impl Into<String>,
        source: impl core::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }
}
