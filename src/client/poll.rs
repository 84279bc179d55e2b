//! The poll tick: one status sweep across all outstanding requests.
//!
//! Each tick queries the transport for every record in the store, applies the
//! state machine transition, recovers incremental body chunks, and discharges
//! terminal callback obligations. The poll loop owns removal: a terminal
//! record's callback is invoked here exactly once and the record is removed in
//! the same tick; the transport is never delegated callback delivery.
//!
//! # Transition rule
//!
//! A transport-reported `state` is applied verbatim (the transport is
//! authoritative once an id has been submitted). Older status shapes without a
//! `state` field are inferred: `completed` with an error means `Error`,
//! `completed` without one means `Complete`, a body without completion means
//! `Receiving`, and anything else leaves the state unchanged. Two local
//! overrides take precedence over the transport: caller cancellation and an
//! elapsed client-side `timeout_deadline` force a terminal state, after which
//! the transport is no longer consulted for that id.
//!
//! # Ordering
//!
//! Callback invocations are queued while the store lock is held and run after
//! it is released, in queue order, so chunk deliveries always precede the
//! terminal callback for the same request and a slow callback cannot stall
//! another record's bookkeeping.

use crate::client::diff::body_delta;
use crate::client::dispatch::{self, Dispatch, Event};
use crate::client::store::{RequestRecord, RequestStore};
use crate::error::PulseError;
use crate::transport::Transport;
use crate::types::{HttpResponse, RequestState, SessionId, StatusReport};
use parking_lot::Mutex;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

/// Run one poll tick over every outstanding request.
pub(crate) fn poll_once(
    transport: &dyn Transport,
    session: &SessionId,
    store: &Mutex<RequestStore>,
    destroyed: &AtomicBool,
) {
    let mut dispatches: Vec<Dispatch> = Vec::new();
    let mut finished: Vec<crate::types::RequestId> = Vec::new();

    {
        let mut store = store.lock();
        let now = Instant::now();

        store.for_each_mut(|id, record| {
            if !record.state.is_terminal() {
                let report = match transport.get_status(session, id) {
                    Ok(report) => report,
                    // A failing status query is a per-request failure, not a
                    // tick failure.
                    Err(err) => StatusReport {
                        completed: true,
                        state: Some(RequestState::Error),
                        error: Some(err.to_string()),
                        ..StatusReport::default()
                    },
                };
                apply_report(record, &report, &mut dispatches);

                if !record.state.is_terminal() && record.timed_out(now) {
                    record.state = RequestState::Timeout;
                    record.error = Some("request timed out".to_string());
                }
            }

            if record.state.is_terminal() {
                if let Some(event) = terminal_event(record) {
                    dispatches.push(Dispatch {
                        id: id.clone(),
                        callbacks: record.callbacks.clone(),
                        event,
                    });
                }
                tracing::debug!(request = %id, state = %record.state, "request finished");
                record.state = RequestState::Acknowledged;
                finished.push(id.clone());
            }
        });

        for id in &finished {
            store.remove(id);
        }
    }

    dispatch::run(dispatches, destroyed);
}

/// Apply one status report to a record: transition the state, absorb response
/// fields, and queue a chunk delivery when new body data arrived.
fn apply_report(record: &mut RequestRecord, report: &StatusReport, dispatches: &mut Vec<Dispatch>) {
    record.state = next_state(record.state, report);

    if let Some(status) = report.status {
        record.response_status = Some(status);
    }
    if let Some(headers) = &report.headers {
        record.response_headers = Some(headers.clone());
    }
    if let Some(error) = &report.error {
        record.error = Some(error.clone());
    }

    if let Some(body) = &report.body {
        let delta = body_delta(record.last_body_len, body);
        if !delta.is_empty() {
            if record.callbacks.lock().wants_chunks() {
                dispatches.push(Dispatch {
                    id: record.id.clone(),
                    callbacks: record.callbacks.clone(),
                    event: Event::Chunk(delta.to_string()),
                });
            }
            record.last_body = body.clone();
            record.last_body_len = body.len();
        }
    }
}

/// The state machine transition for one report.
pub(crate) fn next_state(current: RequestState, report: &StatusReport) -> RequestState {
    if let Some(state) = report.state {
        return state;
    }

    if report.completed {
        if report.error.is_some() {
            RequestState::Error
        } else {
            RequestState::Complete
        }
    } else if report.body.is_some() {
        RequestState::Receiving
    } else {
        current
    }
}

/// The callback owed for a record that reached a terminal state, if any.
fn terminal_event(record: &RequestRecord) -> Option<Event> {
    match record.state {
        RequestState::Complete => Some(Event::Completed(HttpResponse {
            status: record.response_status,
            headers: record.response_headers.clone().unwrap_or_default(),
            body: record.last_body.clone(),
        })),
        RequestState::Error => Some(Event::Failed(PulseError::Transport(
            record
                .error
                .clone()
                .unwrap_or_else(|| "transport error".to_string()),
        ))),
        RequestState::Timeout => Some(Event::Failed(PulseError::Timeout)),
        RequestState::Cancelled => Some(Event::Failed(PulseError::Cancelled)),
        // Callback already delivered and consumed.
        RequestState::Acknowledged => None,
        _ => None,
    }
}
