//! One-shot dry-run validation of an input source.
//!
//! [`check_input`] confirms that a raw source is well-formed before a caller
//! commits to a full pipeline run: it resolves the source, then constructs
//! exactly one request from the first resolvable item against the implicit
//! root endpoint. The check consumes its source; factory-backed sources are
//! therefore invoked once here and once more when the real run resolves its
//! own copy.

use crate::{DataItem, Error, InputSource, RequestBuilder, ResolvedItems, Result};
use flowline::{CodecMode, ROOT_ENDPOINT};

/// Validates an input source by dry-running the first request.
///
/// An absent source is trivially valid (a no-op run). Async stream sources
/// cannot be drained synchronously and are rejected rather than silently
/// skipped.
///
/// # Errors
///
/// - [`Error::Validation`] if the resolved source is an async stream.
/// - [`Error::BadInput`] if the first item fails to build into a request;
///   the underlying cause is attached.
pub fn check_input(source: Option<InputSource>, mode: CodecMode) -> Result<()> {
    let Some(source) = source else {
        // Empty inputs are considered valid.
        return Ok(());
    };

    let (items, _len) = source.into_resolved();
    let mut items = match items {
        ResolvedItems::Iter(iter) => iter,
        ResolvedItems::Stream(_) => {
            let reason =
                "checking the validity of an async stream source is not supported".to_owned();
            #[cfg(feature = "tracing")]
            tracing::error!("{reason}");
            return Err(Error::Validation { reason });
        }
    };

    match items.next() {
        Some(first) => probe_item(&first, mode),
        // A source that yields nothing is valid; the run is a no-op.
        None => Ok(()),
    }
}

/// Dry-run builds one item against the root endpoint, wrapping any failure
/// as [`Error::BadInput`].
pub(crate) fn probe_item(item: &DataItem, mode: CodecMode) -> Result<()> {
    let builder = RequestBuilder::new(ROOT_ENDPOINT, mode);
    if let Err(e) = builder.build(core::slice::from_ref(item)) {
        #[cfg(feature = "tracing")]
        tracing::error!("inputs are not valid: {e}");
        return Err(Error::BadInput {
            source: Box::new(e),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BuildError;
    use flowline::ScalarValue;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn item(label: &str) -> DataItem {
        DataItem::new().with_scalar("label", ScalarValue::Text(label.to_owned()))
    }

    #[test]
    fn absent_source_is_valid() {
        assert!(check_input(None, CodecMode::None).is_ok());
    }

    #[test]
    fn empty_collection_is_valid() {
        assert!(check_input(Some(InputSource::from(vec![])), CodecMode::None).is_ok());
    }

    #[test]
    fn well_formed_first_item_passes() {
        let source = InputSource::from(vec![item("a"), item("b")]);
        assert!(check_input(Some(source), CodecMode::None).is_ok());
    }

    #[test]
    fn factory_is_invoked_exactly_once_per_check() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let source = InputSource::factory(move || {
            counted.fetch_add(1, Ordering::SeqCst);
            InputSource::from(item("a"))
        });

        assert!(check_input(Some(source), CodecMode::None).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stream_source_is_rejected_not_hung() {
        let source = InputSource::stream(futures::stream::iter(vec![item("a")]));
        assert!(matches!(
            check_input(Some(source), CodecMode::None),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn factory_yielding_stream_is_rejected() {
        let source = InputSource::factory(|| {
            InputSource::stream(futures::stream::iter(vec![item("a")]))
        });
        assert!(matches!(
            check_input(Some(source), CodecMode::None),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn unbuildable_first_item_wraps_the_cause() {
        let source = InputSource::from(DataItem::new());
        let err = check_input(Some(source), CodecMode::None).unwrap_err();
        let Error::BadInput { source: cause } = err else {
            panic!("expected BadInput, got {err:?}");
        };
        assert_eq!(
            cause.downcast_ref::<BuildError>(),
            Some(&BuildError::EmptyItem)
        );
    }
}
