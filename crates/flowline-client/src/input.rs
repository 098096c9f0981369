//! Input items and the closed union of supported input sources.
//!
//! [`InputSource`] models every input shape the pipeline accepts: a single
//! item, a finite collection, a lazy producer, a deferred factory, or an
//! async stream. The shape is resolved exactly once at the pipeline
//! boundary; downstream code only ever sees an item iterator (or stream),
//! never performs runtime shape inspection of its own.
//!
//! Ownership: a source is exclusively owned and mutated by the single run
//! that consumes it. Factories are invoked once per resolution, so a
//! factory-backed source handed to both [`check_input`](crate::check_input)
//! and a pipeline run is invoked at least twice; callers that need
//! exactly-once construction must cache the product themselves.

use core::fmt;
use core::pin::Pin;
use flowline::{NdArray, ScalarValue};
use futures::Stream;

/// A payload field of a [`DataItem`]: either a dense array (routed through
/// the codec) or a scalar copied verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Array(NdArray),
    Scalar(ScalarValue),
}

/// One logical input item: an optional identifier plus ordered named
/// fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataItem {
    pub id: Option<String>,
    pub fields: Vec<(String, FieldValue)>,
}

impl DataItem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_array(mut self, name: impl Into<String>, array: NdArray) -> Self {
        self.fields.push((name.into(), FieldValue::Array(array)));
        self
    }

    pub fn with_scalar(mut self, name: impl Into<String>, value: ScalarValue) -> Self {
        self.fields.push((name.into(), FieldValue::Scalar(value)));
        self
    }
}

/// Boxed lazy producer of input items.
pub type ItemIter = Box<dyn Iterator<Item = DataItem> + Send>;

/// Boxed asynchronous producer of input items.
pub type ItemStream = Pin<Box<dyn Stream<Item = DataItem> + Send>>;

/// Boxed zero-argument source factory, invoked once per resolution.
pub type SourceFactory = Box<dyn FnOnce() -> InputSource + Send>;

/// A raw input source, resolved once at the pipeline boundary.
///
/// Arity is known for `Single` and `Items`, unknown (reported as such,
/// never estimated) for `Producer` and `Stream`, and determined after
/// invocation for `Factory`.
pub enum InputSource {
    /// A single input item.
    Single(DataItem),
    /// A finite, ordered collection with known arity.
    Items(Vec<DataItem>),
    /// A lazy producer with unknown arity.
    Producer(ItemIter),
    /// A deferred factory yielding the concrete source on invocation.
    Factory(SourceFactory),
    /// An async producer, consumable only by the cooperative pipeline.
    Stream(ItemStream),
}

/// A source resolved down to its item-yielding form.
pub(crate) enum ResolvedItems {
    Iter(ItemIter),
    Stream(ItemStream),
}

impl InputSource {
    pub fn single(item: DataItem) -> Self {
        Self::Single(item)
    }

    pub fn items(items: Vec<DataItem>) -> Self {
        Self::Items(items)
    }

    pub fn producer(iter: impl Iterator<Item = DataItem> + Send + 'static) -> Self {
        Self::Producer(Box::new(iter))
    }

    pub fn factory(f: impl FnOnce() -> InputSource + Send + 'static) -> Self {
        Self::Factory(Box::new(f))
    }

    pub fn stream(stream: impl Stream<Item = DataItem> + Send + 'static) -> Self {
        Self::Stream(Box::pin(stream))
    }

    /// The number of items this source will yield, when known.
    pub fn known_len(&self) -> Option<usize> {
        match self {
            Self::Single(_) => Some(1),
            Self::Items(items) => Some(items.len()),
            Self::Producer(_) | Self::Factory(_) | Self::Stream(_) => None,
        }
    }

    /// Invokes factories until a concrete source remains.
    pub fn resolve(self) -> Self {
        let mut source = self;
        while let Self::Factory(f) = source {
            source = f();
        }
        source
    }

    /// Resolves the source into its item-yielding form plus known arity.
    pub(crate) fn into_resolved(self) -> (ResolvedItems, Option<usize>) {
        let source = self.resolve();
        let len = source.known_len();
        let items = match source {
            Self::Single(item) => ResolvedItems::Iter(Box::new(core::iter::once(item))),
            Self::Items(items) => ResolvedItems::Iter(Box::new(items.into_iter())),
            Self::Producer(iter) => ResolvedItems::Iter(iter),
            Self::Stream(stream) => ResolvedItems::Stream(stream),
            // resolve() only returns once no factory remains
            Self::Factory(_) => unreachable!("factories are unwrapped by resolve()"),
        };
        (items, len)
    }
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(item) => f.debug_tuple("Single").field(item).finish(),
            Self::Items(items) => f.debug_tuple("Items").field(&items.len()).finish(),
            Self::Producer(_) => f.write_str("Producer"),
            Self::Factory(_) => f.write_str("Factory"),
            Self::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl From<DataItem> for InputSource {
    fn from(item: DataItem) -> Self {
        Self::Single(item)
    }
}

impl From<Vec<DataItem>> for InputSource {
    fn from(items: Vec<DataItem>) -> Self {
        Self::Items(items)
    }
}
