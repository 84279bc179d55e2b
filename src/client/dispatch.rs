//! Callback storage and isolated dispatch.
//!
//! User callbacks are invoked from the poll tick, after the request store's
//! lock has been released. Each invocation runs behind `catch_unwind`: a
//! panicking callback is reported through `tracing` and never propagates into
//! the tick nor marks the originating request as failed.
//!
//! At-most-once delivery of `on_complete`/`on_error` is enforced by
//! construction: both are `FnOnce` boxes held in `Option`s and consumed with
//! `take`, and firing either clears the other.

use crate::error::PulseError;
use crate::types::{HttpResponse, RequestId};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Completion callback, fired at most once per request.
pub type OnComplete = Box<dyn FnOnce(HttpResponse) + Send + 'static>;

/// Failure callback, fired at most once per request. Receives the terminal
/// failure: a transport error, [`PulseError::Timeout`] or
/// [`PulseError::Cancelled`].
pub type OnError = Box<dyn FnOnce(PulseError) + Send + 'static>;

/// Streaming chunk callback. Fired zero or more times, strictly before the
/// terminal callback, with each newly-arrived body suffix.
pub type OnChunk = Box<dyn FnMut(&str) + Send + 'static>;

/// The caller-supplied callbacks for one request.
#[derive(Default)]
pub(crate) struct CallbackSet {
    pub(crate) on_complete: Option<OnComplete>,
    pub(crate) on_error: Option<OnError>,
    pub(crate) on_chunk: Option<OnChunk>,
}

impl CallbackSet {
    pub(crate) fn wants_chunks(&self) -> bool {
        self.on_chunk.is_some()
    }
}

/// One callback invocation owed to a request, queued during the tick and
/// delivered after the store lock is released.
pub(crate) struct Dispatch {
    pub(crate) id: RequestId,
    pub(crate) callbacks: Arc<Mutex<CallbackSet>>,
    pub(crate) event: Event,
}

pub(crate) enum Event {
    Chunk(String),
    Completed(HttpResponse),
    Failed(PulseError),
}

/// Deliver queued events in order, isolating each invocation.
///
/// `destroyed` is re-checked before every invocation: once teardown has
/// begun, no callback fires.
pub(crate) fn run(dispatches: Vec<Dispatch>, destroyed: &AtomicBool) {
    for dispatch in dispatches {
        if destroyed.load(Ordering::SeqCst) {
            return;
        }
        deliver(dispatch);
    }
}

fn deliver(dispatch: Dispatch) {
    let mut set = dispatch.callbacks.lock();
    match dispatch.event {
        Event::Chunk(chunk) => {
            if let Some(on_chunk) = set.on_chunk.as_mut() {
                invoke(&dispatch.id, "on_chunk", || on_chunk(&chunk));
            }
        }
        Event::Completed(response) => {
            if let Some(on_complete) = set.on_complete.take() {
                set.on_error = None;
                invoke(&dispatch.id, "on_complete", move || on_complete(response));
            }
        }
        Event::Failed(error) => {
            if let Some(on_error) = set.on_error.take() {
                set.on_complete = None;
                invoke(&dispatch.id, "on_error", move || on_error(error));
            }
        }
    }
}

fn invoke(id: &RequestId, kind: &str, call: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(call)).is_err() {
        tracing::error!(request = %id, callback = kind, "request callback panicked");
    }
}
