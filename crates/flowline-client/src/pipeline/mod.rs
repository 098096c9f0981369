//! Lazy, ordered batching of input items into request messages.
//!
//! [`RequestPipeline`] is the dispatcher's production side. It consumes a
//! resolved [`InputSource`](crate::InputSource) and groups consecutive items
//! into batches of the configured size, building one
//! [`RequestMessage`](flowline::RequestMessage) per batch, in strict input
//! order. The final batch may be short.
//!
//! ## Execution disciplines
//!
//! Batching logic is shared; only the suspension points differ:
//!
//! - [`RequestIter`] (blocking): a plain iterator pulled by one calling
//!   thread, building each batch inline.
//! - [`RequestStream`] (cooperative): production inside a single-threaded
//!   event loop, yielding control back to the loop before each batch build.
//!   No additional thread is spawned.
//!
//! A run starts in one discipline and never switches. Each run walks the
//! states `Created -> Validating -> Streaming -> {Completed, Failed}`:
//! validation dry-runs the first item before any request is produced, a
//! per-item build failure is terminal (no skip-and-continue), and
//! cancellation is observed between batches only - in-flight work always
//! runs to completion.

mod coop;
mod sync;

pub use coop::RequestStream;
pub use sync::RequestIter;

use crate::{ClientConfig, Error, InputSource, RequestBuilder, Result};
use tokio_util::sync::CancellationToken;

/// Phase of a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Configuration held, no source consumed yet.
    Created,
    /// Dry-running the first item.
    Validating,
    /// Producing batches.
    Streaming,
    /// All batches produced and consumed without construction errors.
    Completed,
    /// Validation failed, a build failed, or the run was cancelled.
    Failed,
}

/// Expected batch count for a source of known arity.
///
/// Unknown arity stays unknown; it is never estimated.
pub(crate) fn expected_batches(len: Option<usize>, batch_size: usize) -> Option<u64> {
    len.map(|n| ((n as u64).div_ceil(batch_size as u64)).max(1))
}

/// Configured batching dispatcher for one or more runs.
///
/// The pipeline itself holds no per-run state; each call to [`requests`] or
/// [`request_stream`] starts an independent run over its own source. The
/// shared [`CancellationToken`] cancels runs between batches.
///
/// [`requests`]: RequestPipeline::requests
/// [`request_stream`]: RequestPipeline::request_stream
#[derive(Debug, Clone)]
pub struct RequestPipeline {
    batch_size: usize,
    builder: RequestBuilder,
    mode: flowline::CodecMode,
    cancel: CancellationToken,
}

impl RequestPipeline {
    /// Builds a pipeline from a resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the configuration is invalid.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let config = config.clone().validated()?;
        Ok(Self {
            batch_size: config.batch_size,
            builder: RequestBuilder::new(config.endpoint, config.codec_mode),
            mode: config.codec_mode,
            cancel: CancellationToken::new(),
        })
    }

    /// A token that cancels active runs between batches.
    ///
    /// Cancellation never aborts a batch already handed to the transport.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Starts a blocking-discipline run, validating the source up front.
    ///
    /// Validation failures surface here, synchronously, before any request
    /// is produced.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the resolved source is an async stream,
    ///   which the blocking discipline cannot drain.
    /// - [`Error::BadInput`] if the first item fails its dry-run build.
    pub fn requests(&self, source: InputSource) -> Result<RequestIter> {
        sync::start(self, source)
    }

    /// Starts a cooperative-discipline run.
    ///
    /// Validation of the first item happens on first poll (the source may
    /// be async); a failure is yielded as the terminal stream element.
    pub fn request_stream(&self, source: InputSource) -> RequestStream {
        coop::start(self, source)
    }

    pub(crate) fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub(crate) fn builder(&self) -> &RequestBuilder {
        &self.builder
    }

    pub(crate) fn mode(&self) -> flowline::CodecMode {
        self.mode
    }

    pub(crate) fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Maps a mid-stream build failure to the terminal run error.
pub(crate) fn terminal_build_error(e: crate::BuildError) -> Error {
    #[cfg(feature = "tracing")]
    tracing::error!("request build failed, aborting run: {e}");
    Error::Build(e)
}
