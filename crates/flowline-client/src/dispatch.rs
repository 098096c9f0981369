//! Driving a pipeline run over a transport and routing results.
//!
//! [`ResultDispatcher`] owns a transport collaborator and a
//! [`CallbackSet`] for the lifetime of one run. It pulls request messages
//! from a [`RequestPipeline`] run, exchanges each one for exactly one
//! response (1:1, in submission order - no reordering or multiplexed
//! completion), and routes outcomes to the registered callbacks:
//!
//! - success: `on_done`, then `on_always`
//! - per-request transport error: `on_error`, then `on_always`; the run
//!   continues with the next batch
//! - pipeline-level failure (validation or build): `on_always`, then the
//!   run stops and the error is returned to the caller
//! - run end: one final `on_always`, regardless of outcome
//!
//! The transport is an opaque request-to-response function; connection
//! management, retries, and addressing are its own concern and receive
//! their configuration at its constructor, never from ambient process
//! state.

use crate::{Error, InputSource, RequestPipeline, Result, TransportError};
use core::future::Future;
use flowline::{RequestMessage, Response};

/// Blocking transport collaborator: one request in, one response out.
pub trait Transport {
    /// Exchanges a request for its response.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] for a per-request failure; the dispatcher
    /// reports it and continues the run.
    fn send(&mut self, request: &RequestMessage) -> Result<Response, TransportError>;
}

/// Cooperative transport collaborator for event-loop runs.
pub trait AsyncTransport {
    /// Exchanges a request for its response without blocking the loop.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] for a per-request failure; the dispatcher
    /// reports it and continues the run.
    fn send(
        &mut self,
        request: &RequestMessage,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send;
}

type DoneFn = Box<dyn FnMut(&Response) + Send>;
type ErrorFn = Box<dyn FnMut(&TransportError) + Send>;
type AlwaysFn = Box<dyn FnMut() + Send>;

/// Result callbacks registered for one run: at most one of each hook.
///
/// `on_always` fires after every individual response (success or error) and
/// once more at run end - callers must not assume it fires only once.
#[derive(Default)]
pub struct CallbackSet {
    on_done: Option<DoneFn>,
    on_error: Option<ErrorFn>,
    on_always: Option<AlwaysFn>,
}

impl CallbackSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the success hook.
    pub fn on_done(mut self, f: impl FnMut(&Response) + Send + 'static) -> Self {
        self.on_done = Some(Box::new(f));
        self
    }

    /// Registers the per-request error hook.
    pub fn on_error(mut self, f: impl FnMut(&TransportError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Registers the always hook.
    pub fn on_always(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_always = Some(Box::new(f));
        self
    }

    fn fire_done(&mut self, response: &Response) {
        if let Some(f) = &mut self.on_done {
            f(response);
        }
    }

    fn fire_error(&mut self, error: &TransportError) {
        if let Some(f) = &mut self.on_error {
            f(error);
        }
    }

    fn fire_always(&mut self) {
        if let Some(f) = &mut self.on_always {
            f();
        }
    }
}

/// Progress accounting for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Requests handed to the transport.
    pub requests: u64,
    /// Responses reported successful.
    pub succeeded: u64,
    /// Per-request transport failures.
    pub failed: u64,
    /// Expected batch count, when the source arity was known.
    pub expected_batches: Option<u64>,
}

/// Drives pipeline runs over a transport collaborator.
///
/// The discipline is chosen per call ([`run`] for blocking transports,
/// [`run_cooperative`] for event-loop transports) and never mixed within
/// one run.
///
/// [`run`]: ResultDispatcher::run
/// [`run_cooperative`]: ResultDispatcher::run_cooperative
pub struct ResultDispatcher<T> {
    transport: T,
    callbacks: CallbackSet,
}

impl<T> ResultDispatcher<T> {
    pub fn new(transport: T, callbacks: CallbackSet) -> Self {
        Self {
            transport,
            callbacks,
        }
    }
}

impl<T: Transport> ResultDispatcher<T> {
    /// Runs a blocking-discipline pipeline to completion.
    ///
    /// # Errors
    ///
    /// Returns the pipeline-level failure that stopped the run: validation
    /// or build errors, or cancellation. Per-request transport errors are
    /// routed to callbacks and counted, not returned.
    pub fn run(&mut self, pipeline: &RequestPipeline, source: InputSource) -> Result<RunSummary> {
        let mut requests = match pipeline.requests(source) {
            Ok(iter) => iter,
            Err(e) => {
                self.callbacks.fire_always();
                return Err(e);
            }
        };
        let mut summary = RunSummary {
            expected_batches: requests.expected_batches(),
            ..RunSummary::default()
        };

        for next in requests.by_ref() {
            match next {
                Ok(request) => {
                    summary.requests += 1;
                    match self.transport.send(&request) {
                        Ok(response) => {
                            summary.succeeded += 1;
                            self.callbacks.fire_done(&response);
                        }
                        Err(e) => {
                            summary.failed += 1;
                            #[cfg(feature = "tracing")]
                            tracing::warn!("request failed in transport: {e}");
                            self.callbacks.fire_error(&e);
                        }
                    }
                    self.callbacks.fire_always();
                }
                Err(e) => {
                    self.callbacks.fire_always();
                    return Err(e);
                }
            }
        }

        self.callbacks.fire_always();
        Ok(summary)
    }
}

impl<T: AsyncTransport> ResultDispatcher<T> {
    /// Runs a cooperative-discipline pipeline to completion.
    ///
    /// Suspends at the pipeline's batch boundaries and around each
    /// transport exchange; never blocks the shared event loop.
    ///
    /// # Errors
    ///
    /// Same contract as [`ResultDispatcher::run`].
    pub async fn run_cooperative(
        &mut self,
        pipeline: &RequestPipeline,
        source: InputSource,
    ) -> Result<RunSummary> {
        let mut run = pipeline.request_stream(source);
        let mut summary = RunSummary {
            expected_batches: run.expected_batches(),
            ..RunSummary::default()
        };

        while let Some(next) = run.next_request().await {
            match next {
                Ok(request) => {
                    summary.requests += 1;
                    match self.transport.send(&request).await {
                        Ok(response) => {
                            summary.succeeded += 1;
                            self.callbacks.fire_done(&response);
                        }
                        Err(e) => {
                            summary.failed += 1;
                            #[cfg(feature = "tracing")]
                            tracing::warn!("request failed in transport: {e}");
                            self.callbacks.fire_error(&e);
                        }
                    }
                    self.callbacks.fire_always();
                }
                Err(e) => {
                    self.callbacks.fire_always();
                    return Err(e);
                }
            }
        }

        self.callbacks.fire_always();
        Ok(summary)
    }
}
