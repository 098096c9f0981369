//! Blocking-discipline batch production.

use super::{RequestPipeline, RunState, expected_batches, terminal_build_error};
use crate::{DataItem, Error, InputSource, ItemIter, RequestBuilder, ResolvedItems, Result};
use crate::validate::probe_item;
use flowline::RequestMessage;
use tokio_util::sync::CancellationToken;

/// Resolves and validates a source, returning the streaming iterator.
pub(super) fn start(pipeline: &RequestPipeline, source: InputSource) -> Result<RequestIter> {
    // VALIDATING: resolve the source and dry-run its first item.
    let (items, len) = source.into_resolved();
    let mut items = match items {
        ResolvedItems::Iter(iter) => iter,
        ResolvedItems::Stream(_) => {
            let reason =
                "async stream sources cannot be drained by a blocking run".to_owned();
            #[cfg(feature = "tracing")]
            tracing::error!("{reason}");
            return Err(Error::Validation { reason });
        }
    };

    // The dry-run item is kept as lookahead, not lost.
    let lookahead = items.next();
    if let Some(first) = &lookahead {
        probe_item(first, pipeline.mode())?;
    }

    Ok(RequestIter {
        items,
        lookahead,
        builder: pipeline.builder().clone(),
        batch_size: pipeline.batch_size(),
        expected: expected_batches(len, pipeline.batch_size()),
        state: RunState::Streaming,
        cancel: pipeline.cancel().clone(),
    })
}

/// Blocking-discipline run: a lazy iterator of request messages.
///
/// Each pull performs the next batch's building work inline and may block
/// on the underlying producer. After a terminal error (build failure or
/// cancellation) the iterator is fused.
pub struct RequestIter {
    items: ItemIter,
    lookahead: Option<DataItem>,
    builder: RequestBuilder,
    batch_size: usize,
    expected: Option<u64>,
    state: RunState,
    cancel: CancellationToken,
}

impl RequestIter {
    /// Expected batch count, or `None` for sources of unknown arity.
    pub fn expected_batches(&self) -> Option<u64> {
        self.expected
    }

    /// Current phase of this run.
    pub fn state(&self) -> RunState {
        self.state
    }

    fn pull_item(&mut self) -> Option<DataItem> {
        self.lookahead.take().or_else(|| self.items.next())
    }
}

impl Iterator for RequestIter {
    type Item = Result<RequestMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, RunState::Completed | RunState::Failed) {
            return None;
        }
        if self.cancel.is_cancelled() {
            self.state = RunState::Failed;
            #[cfg(feature = "tracing")]
            tracing::warn!("run cancelled between batches");
            return Some(Err(Error::Cancelled));
        }

        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            match self.pull_item() {
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientConfig;
    use flowline::ScalarValue;

    fn item(label: &str) -> DataItem {
        DataItem::new().with_scalar("label", ScalarValue::Text(label.to_owned()))
    }

    fn labels(message: &RequestMessage) -> Vec<String> {
        message
            .parts
            .iter()
            .map(|part| match &part.scalars[0].1 {
                ScalarValue::Text(s) => s.clone(),
                other => panic!("unexpected scalar {other:?}"),
            })
            .collect()
    }

    fn pipeline(batch_size: usize) -> RequestPipeline {
        RequestPipeline::new(&ClientConfig {
            batch_size,
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn seven_items_batch_three_yields_3_3_1_in_order() {
        let items: Vec<DataItem> = (0..7).map(|i| item(&format!("i{i}"))).collect();
        let iter = pipeline(3).requests(InputSource::from(items)).unwrap();
        assert_eq!(iter.expected_batches(), Some(3));

        let batches: Vec<RequestMessage> = iter.map(Result::unwrap).collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(labels(&batches[0]), ["i0", "i1", "i2"]);
        assert_eq!(labels(&batches[1]), ["i3", "i4", "i5"]);
        assert_eq!(labels(&batches[2]), ["i6"]);
    }

    #[test]
    fn unknown_length_producer_reports_unknown_but_drains_ordered() {
        let source = InputSource::producer((0..5).map(|i| item(&format!("p{i}"))));
        let iter = pipeline(2).requests(source).unwrap();
        assert_eq!(iter.expected_batches(), None);

        let batches: Vec<RequestMessage> = iter.map(Result::unwrap).collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(labels(&batches[0]), ["p0", "p1"]);
        assert_eq!(labels(&batches[2]), ["p4"]);
    }

    #[test]
    fn run_completes_after_last_batch() {
        let mut iter = pipeline(2)
            .requests(InputSource::from(vec![item("a")]))
            .unwrap();
        assert_eq!(iter.state(), RunState::Streaming);
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());
        assert_eq!(iter.state(), RunState::Completed);
        // Fused after completion.
        assert!(iter.next().is_none());
    }

    #[test]
    fn stream_source_is_rejected_up_front() {
        let source = InputSource::stream(futures::stream::iter(vec![item("a")]));
        assert!(matches!(
            pipeline(1).requests(source),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn bad_first_item_fails_validation_before_streaming() {
        let source = InputSource::from(vec![DataItem::new(), item("b")]);
        assert!(matches!(
            pipeline(1).requests(source),
            Err(Error::BadInput { .. })
        ));
    }

    #[test]
    fn mid_run_build_failure_is_terminal() {
        // First batch is fine; the empty item surfaces in the second batch
        // and aborts the run.
        let source = InputSource::from(vec![item("a"), item("b"), DataItem::new(), item("d")]);
        let mut iter = pipeline(2).requests(source).unwrap();

        assert!(iter.next().unwrap().is_ok());
        assert!(matches!(iter.next(), Some(Err(Error::Build(_)))));
        assert_eq!(iter.state(), RunState::Failed);
        assert!(iter.next().is_none());
    }

    #[test]
    fn cancellation_stops_the_run_between_batches() {
        let pipeline = pipeline(1);
        let token = pipeline.cancellation_token();
        let source = InputSource::from(vec![item("a"), item("b"), item("c")]);
        let mut iter = pipeline.requests(source).unwrap();

        assert!(iter.next().unwrap().is_ok());
        token.cancel();
        assert!(matches!(iter.next(), Some(Err(Error::Cancelled))));
        assert_eq!(iter.state(), RunState::Failed);
        assert!(iter.next().is_none());
    }

    #[test]
    fn factory_source_resolves_and_reports_known_arity() {
        let source =
            InputSource::factory(|| InputSource::from(vec![item("a"), item("b"), item("c")]));
        let iter = pipeline(2).requests(source).unwrap();
        assert_eq!(iter.expected_batches(), Some(2));
        assert_eq!(iter.count(), 2);
    }
}
