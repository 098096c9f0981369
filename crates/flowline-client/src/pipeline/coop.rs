//! Cooperative-discipline batch production.
//!
//! Production happens inside a single-threaded event loop: every call to
//! [`RequestStream::next_request`] yields control back to the loop before
//! building the next batch, so other scheduled work can interleave. No
//! additional thread is spawned.

use super::{RequestPipeline, RunState, expected_batches, terminal_build_error};
use crate::validate::probe_item;
use crate::{DataItem, Error, InputSource, RequestBuilder, ResolvedItems, Result};
use flowline::{CodecMode, RequestMessage};
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

/// Resolves a source into a cooperative run.
pub(super) fn start(pipeline: &RequestPipeline, source: InputSource) -> RequestStream {
    let (items, len) = source.into_resolved();
    RequestStream {
        items,
        lookahead: None,
        builder: pipeline.builder().clone(),
        mode: pipeline.mode(),
        batch_size: pipeline.batch_size(),
        expected: expected_batches(len, pipeline.batch_size()),
        state: RunState::Created,
        cancel: pipeline.cancel().clone(),
    }
}

/// Cooperative-discipline run: an async producer of request messages.
///
/// The first poll validates the first resolvable item (the source may be
/// async, so this cannot happen at construction); a validation failure is
/// yielded as the terminal element before any request is produced. After a
/// terminal error the stream is fused.
pub struct RequestStream {
    items: ResolvedItems,
    lookahead: Option<DataItem>,
    builder: RequestBuilder,
    mode: CodecMode,
    batch_size: usize,
    expected: Option<u64>,
    state: RunState,
    cancel: CancellationToken,
}

impl RequestStream {
    /// Expected batch count, or `None` for sources of unknown arity.
    pub fn expected_batches(&self) -> Option<u64> {
        self.expected
    }

    /// Current phase of this run.
    pub fn state(&self) -> RunState {
        self.state
    }

    async fn pull_item(&mut self) -> Option<DataItem> {
        if let Some(item) = self.lookahead.take() {
            return Some(item);
        }
        match &mut self.items {
            ResolvedItems::Iter(iter) => iter.next(),
            ResolvedItems::Stream(stream) => stream.next().await,
        }
    }

    /// Produces the next request message, suspending between batches.
    ///
    /// Returns `None` once the source is drained or after a terminal error
    /// has been yielded.
    pub async fn next_request(&mut self) -> Option<Result<RequestMessage>> {
        if matches!(self.state, RunState::Completed | RunState::Failed) {
            return None;
        }
        if self.cancel.is_cancelled() {
            self.state = RunState::Failed;
            #[cfg(feature = "tracing")]
            tracing::warn!("run cancelled between batches");
            return Some(Err(Error::Cancelled));
        }

        // Suspension point: hand control back to the event loop before any
        // batch-building work.
        tokio::task::yield_now().await;

        if self.state == RunState::Created {
            self.state = RunState::Validating;
            match self.pull_item().await {
                Some(first) => {
                    if let Err(e) = probe_item(&first, self.mode) {
                        self.state = RunState::Failed;
                        return Some(Err(e));
                    }
                    self.lookahead = Some(first);
                }
                None => {
                    self.state = RunState::Completed;
                    return None;
                }
            }
            self.state = RunState::Streaming;
        }

        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            match self.pull_item().await {
                Some(item) => batch.push(item),
                None => break,
            }
        }
        if batch.is_empty() {
            self.state = RunState::Completed;
            return None;
        }

        match self.builder.build(&batch) {
            Ok(request) => Some(Ok(request)),
            Err(e) => {
                self.state = RunState::Failed;
                Some(Err(terminal_build_error(e)))
            }
        }
    }

    /// Adapts the run into a [`Stream`] of request messages.
    pub fn into_stream(self) -> impl Stream<Item = Result<RequestMessage>> + Send {
        futures::stream::unfold(self, |mut run| async move {
            run.next_request().await.map(|item| (item, run))
        })
    }
}
