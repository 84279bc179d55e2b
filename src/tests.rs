//! End-to-end lifecycle scenarios driven through a scripted transport.
//!
//! Every scenario constructs a client with `auto_poll` disabled and drives
//! delivery through `poll_requests()`, so the tests are fully deterministic:
//! each tick consumes the next scripted status report for each request.
//!
//! These tests also pin down the cleanup policy: the poll loop owns record
//! removal and invokes callbacks itself, whether or not callbacks were
//! registered. The transport is never delegated callback delivery.

use crate::client::{ClientConfig, PulseClient, RequestConfig};
use crate::error::{PulseError, Result};
use crate::transport::Transport;
use crate::types::{RequestDescriptor, RequestId, RequestState, SessionId, StatusReport};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Transport double that replays scripted status reports.
///
/// Scripts are assigned to requests in submission order. Each status query
/// consumes the next report; the final report repeats once the script is
/// exhausted. Unscripted requests report a non-completed default forever.
#[derive(Default)]
struct ScriptedTransport {
    pending_scripts: Mutex<VecDeque<VecDeque<StatusReport>>>,
    assigned: Mutex<HashMap<RequestId, VecDeque<StatusReport>>>,
    submissions: Mutex<Vec<(RequestId, RequestDescriptor)>>,
    cancels: Mutex<Vec<RequestId>>,
    destroyed_sessions: Mutex<Vec<SessionId>>,
}

impl ScriptedTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn script(&self, reports: Vec<StatusReport>) {
        self.pending_scripts
            .lock()
            .push_back(reports.into_iter().collect());
    }

    fn submissions(&self) -> Vec<(RequestId, RequestDescriptor)> {
        self.submissions.lock().clone()
    }

    fn cancelled(&self) -> Vec<RequestId> {
        self.cancels.lock().clone()
    }

    fn destroyed_sessions(&self) -> usize {
        self.destroyed_sessions.lock().len()
    }
}

impl Transport for ScriptedTransport {
    fn create_session(&self) -> Result<SessionId> {
        Ok(SessionId::generate())
    }

    fn destroy_session(&self, session: &SessionId) -> bool {
        self.destroyed_sessions.lock().push(session.clone());
        true
    }

    fn request(
        &self,
        _session: &SessionId,
        request: &RequestId,
        descriptor: RequestDescriptor,
    ) -> Result<()> {
        self.submissions
            .lock()
            .push((request.clone(), descriptor));
        if let Some(script) = self.pending_scripts.lock().pop_front() {
            self.assigned.lock().insert(request.clone(), script);
        }
        Ok(())
    }

    fn get_status(&self, _session: &SessionId, request: &RequestId) -> Result<StatusReport> {
        let mut assigned = self.assigned.lock();
        match assigned.get_mut(request) {
            Some(script) if script.len() > 1 => Ok(script.pop_front().unwrap()),
            Some(script) => Ok(script.front().cloned().unwrap_or_default()),
            None => Ok(StatusReport::default()),
        }
    }

    fn cancel_request(&self, _session: &SessionId, request: &RequestId) -> bool {
        self.cancels.lock().push(request.clone());
        true
    }
}

fn manual_client(transport: Arc<ScriptedTransport>) -> PulseClient {
    PulseClient::with_transport(
        transport,
        ClientConfig {
            auto_poll: false,
            ..ClientConfig::default()
        },
    )
    .unwrap()
}

fn completed(status: u16, body: &str) -> StatusReport {
    StatusReport {
        completed: true,
        status: Some(status),
        body: Some(body.to_string()),
        ..StatusReport::default()
    }
}

fn receiving(body: &str) -> StatusReport {
    StatusReport {
        state: Some(RequestState::Receiving),
        body: Some(body.to_string()),
        ..StatusReport::default()
    }
}

#[test]
fn test_completed_get_delivers_response_once_and_removes() {
    let transport = ScriptedTransport::new();
    transport.script(vec![completed(200, "ok")]);
    let client = manual_client(transport.clone());

    let fired = Arc::new(AtomicUsize::new(0));
    let fired_cb = fired.clone();
    client
        .get(
            "http://test.local/data",
            RequestConfig::default()
                .header("User-Agent", "X")
                .on_complete(move |response| {
                    assert_eq!(response.status, Some(200));
                    assert_eq!(response.body, "ok");
                    fired_cb.fetch_add(1, Ordering::SeqCst);
                }),
        )
        .unwrap();

    let submissions = transport.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].1.method, "GET");
    assert_eq!(
        submissions[0].1.headers.as_ref().unwrap().get("User-Agent"),
        Some(&"X".to_string())
    );

    client.poll_requests();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(client.in_flight(), 0);

    // Further ticks must not refire anything.
    client.poll_requests();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_streaming_chunks_arrive_in_order_before_completion() {
    let transport = ScriptedTransport::new();
    transport.script(vec![
        receiving("a"),
        receiving("ab"),
        StatusReport {
            completed: true,
            body: Some("abc".to_string()),
            ..StatusReport::default()
        },
    ]);
    let client = manual_client(transport);

    let chunks = Arc::new(Mutex::new(Vec::new()));
    let chunks_cb = chunks.clone();
    let completed_after_chunks = Arc::new(Mutex::new(Vec::new()));
    let completed_cb = completed_after_chunks.clone();
    let chunks_at_completion = chunks.clone();

    client
        .get(
            "http://test.local/stream",
            RequestConfig::default()
                .stream()
                .on_chunk(move |chunk| chunks_cb.lock().push(chunk.to_string()))
                .on_complete(move |response| {
                    // Every chunk has been delivered by the time the
                    // terminal callback fires.
                    completed_cb
                        .lock()
                        .push((chunks_at_completion.lock().len(), response.body));
                }),
        )
        .unwrap();

    for _ in 0..3 {
        client.poll_requests();
    }

    assert_eq!(*chunks.lock(), vec!["a", "b", "c"]);
    assert_eq!(*completed_after_chunks.lock(), vec![(3, "abc".to_string())]);
    assert_eq!(client.in_flight(), 0);
}

#[test]
fn test_error_report_reaches_on_error_only() {
    let transport = ScriptedTransport::new();
    transport.script(vec![StatusReport {
        completed: true,
        error: Some("connection refused".to_string()),
        ..StatusReport::default()
    }]);
    let client = manual_client(transport);

    let completions = Arc::new(AtomicUsize::new(0));
    let completions_cb = completions.clone();
    let failure = Arc::new(Mutex::new(None));
    let failure_cb = failure.clone();

    client
        .get(
            "http://test.local/broken",
            RequestConfig::default()
                .on_complete(move |_| {
                    completions_cb.fetch_add(1, Ordering::SeqCst);
                })
                .on_error(move |err| {
                    *failure_cb.lock() = Some(err);
                }),
        )
        .unwrap();

    client.poll_requests();
    client.poll_requests();

    assert_eq!(completions.load(Ordering::SeqCst), 0);
    match failure.lock().take() {
        Some(PulseError::Transport(message)) => assert_eq!(message, "connection refused"),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[test]
fn test_record_without_callbacks_is_still_cleaned_up() {
    let transport = ScriptedTransport::new();
    transport.script(vec![completed(204, "")]);
    let client = manual_client(transport);

    client
        .get("http://test.local/fire-and-forget", RequestConfig::default())
        .unwrap();
    assert_eq!(client.in_flight(), 1);

    client.poll_requests();
    assert_eq!(client.in_flight(), 0);
}

#[test]
fn test_cancel_is_synchronous_and_forwarded() {
    let transport = ScriptedTransport::new();
    // The transport keeps claiming progress; local cancellation wins.
    transport.script(vec![receiving("partial")]);
    let client = manual_client(transport.clone());

    let failure = Arc::new(Mutex::new(None));
    let failure_cb = failure.clone();
    let id = client
        .get(
            "http://test.local/slow",
            RequestConfig::default().on_error(move |err| {
                *failure_cb.lock() = Some(err);
            }),
        )
        .unwrap();

    let accepted = client.cancel(&id).unwrap();
    assert!(accepted);
    assert_eq!(transport.cancelled(), vec![id]);

    client.poll_requests();
    assert!(matches!(failure.lock().take(), Some(PulseError::Cancelled)));
    assert_eq!(client.in_flight(), 0);
}

#[test]
fn test_elapsed_timeout_reaches_on_error() {
    let transport = ScriptedTransport::new();
    transport.script(vec![receiving("stuck")]);
    let client = manual_client(transport);

    let failure = Arc::new(Mutex::new(None));
    let failure_cb = failure.clone();
    client
        .get(
            "http://test.local/wedged",
            RequestConfig::default()
                .timeout(Duration::ZERO)
                .on_error(move |err| {
                    *failure_cb.lock() = Some(err);
                }),
        )
        .unwrap();

    client.poll_requests();
    assert!(matches!(failure.lock().take(), Some(PulseError::Timeout)));
    assert_eq!(client.in_flight(), 0);
}

#[test]
fn test_destroy_clears_store_and_suppresses_callbacks() {
    let transport = ScriptedTransport::new();
    transport.script(vec![completed(200, "late")]);
    let client = manual_client(transport.clone());

    let fired = Arc::new(AtomicUsize::new(0));
    let fired_cb = fired.clone();
    client
        .get(
            "http://test.local/doomed",
            RequestConfig::default().on_complete(move |_| {
                fired_cb.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

    client.destroy();
    assert_eq!(client.in_flight(), 0);
    assert_eq!(transport.destroyed_sessions(), 1);

    client.poll_requests();
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    let err = client
        .get("http://test.local/again", RequestConfig::default())
        .unwrap_err();
    assert!(matches!(err, PulseError::ClientDestroyed));
}

#[test]
fn test_panicking_chunk_callback_does_not_stall_other_requests() {
    let transport = ScriptedTransport::new();
    transport.script(vec![StatusReport {
        completed: true,
        body: Some("boom".to_string()),
        ..StatusReport::default()
    }]);
    transport.script(vec![completed(200, "fine")]);
    let client = manual_client(transport);

    client
        .get(
            "http://test.local/panics",
            RequestConfig::default()
                .stream()
                .on_chunk(|_| panic!("user chunk handler exploded")),
        )
        .unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let fired_cb = fired.clone();
    client
        .get(
            "http://test.local/healthy",
            RequestConfig::default().on_complete(move |_| {
                fired_cb.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

    client.poll_requests();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(client.in_flight(), 0);
}

#[test]
fn test_idle_report_keeps_request_alive() {
    let transport = ScriptedTransport::new();
    transport.script(vec![
        StatusReport {
            state: Some(RequestState::Idle),
            ..StatusReport::default()
        },
        completed(200, "eventually"),
    ]);
    let client = manual_client(transport);

    let fired = Arc::new(AtomicUsize::new(0));
    let fired_cb = fired.clone();
    client
        .get(
            "http://test.local/lazy",
            RequestConfig::default().on_complete(move |_| {
                fired_cb.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

    client.poll_requests();
    assert_eq!(client.in_flight(), 1);
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    client.poll_requests();
    assert_eq!(client.in_flight(), 0);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_timer_driven_polling_delivers_without_manual_ticks() {
    tokio_test::block_on(async {
        let transport = ScriptedTransport::new();
        transport.script(vec![completed(200, "ticked")]);
        let client = PulseClient::with_transport(
            transport,
            ClientConfig {
                poll_interval_ms: 10,
                auto_poll: true,
            },
        )
        .unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_cb = fired.clone();
        client
            .get(
                "http://test.local/timer",
                RequestConfig::default().on_complete(move |_| {
                    fired_cb.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        for _ in 0..100 {
            if fired.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(client.in_flight(), 0);
        client.destroy();
    });
}
