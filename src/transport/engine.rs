//! Production transport engine backed by `reqwest`.
//!
//! `HttpEngine` owns a registry of sessions, each holding the transfer state
//! for its requests. Submitting a request spawns a tokio task that performs
//! the actual transfer and writes progress into the session's registry; the
//! client observes that progress exclusively through [`Transport::get_status`].
//!
//! Response bodies are published as cumulative snapshots: streaming transfers
//! append each arriving chunk to the snapshot, non-streaming transfers publish
//! the body once at completion. Cancellation is a per-request atomic flag
//! checked between chunks, so a cancelled transfer stops at the next chunk
//! boundary rather than instantaneously.

use crate::error::{PulseError, Result};
use crate::transport::Transport;
use crate::types::{
    RequestBody, RequestDescriptor, RequestId, RequestState, SessionId, StatusReport,
};
use bytes::BytesMut;
use futures::StreamExt;
use parking_lot::Mutex;
use reqwest::{
    header::{HeaderName, HeaderValue},
    Client, Method,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Poll-based HTTP engine on top of `reqwest`.
///
/// Cheap to share: sessions live behind an `Arc`'d registry, and transfer
/// tasks hold their own handle to the session state so a destroyed session
/// simply orphans them.
pub struct HttpEngine {
    sessions: Mutex<HashMap<SessionId, Arc<SessionState>>>,
}

/// Per-session transfer registry.
struct SessionState {
    transfers: Mutex<HashMap<RequestId, TransferState>>,
    cancel_flags: Mutex<HashMap<RequestId, Arc<AtomicBool>>>,
}

/// Mutable status of one transfer, snapshotted by `get_status`.
#[derive(Debug, Clone)]
struct TransferState {
    state: RequestState,
    completed: bool,
    status: Option<u16>,
    headers: Option<HashMap<String, String>>,
    body: Option<String>,
    error: Option<String>,
}

impl TransferState {
    fn new() -> Self {
        Self {
            state: RequestState::Init,
            completed: false,
            status: None,
            headers: None,
            body: None,
            error: None,
        }
    }

    fn to_report(&self) -> StatusReport {
        StatusReport {
            completed: self.completed,
            state: Some(self.state),
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
            error: self.error.clone(),
        }
    }
}

impl HttpEngine {
    /// Create an engine with an empty session registry.
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn session(&self, id: &SessionId) -> Result<Arc<SessionState>> {
        self.sessions
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| PulseError::Transport(format!("session not found: {id}")))
    }
}

impl Default for HttpEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpEngine {
    fn create_session(&self) -> Result<SessionId> {
        let id = SessionId::generate();
        let session = Arc::new(SessionState {
            transfers: Mutex::new(HashMap::new()),
            cancel_flags: Mutex::new(HashMap::new()),
        });
        self.sessions.lock().insert(id.clone(), session);
        tracing::debug!(session = %id, "transport session created");
        Ok(id)
    }

    fn destroy_session(&self, session: &SessionId) -> bool {
        let removed = self.sessions.lock().remove(session);
        match removed {
            Some(state) => {
                // Wave off every in-flight transfer; the orphaned tasks stop
                // at their next chunk boundary.
                for flag in state.cancel_flags.lock().values() {
                    flag.store(true, Ordering::SeqCst);
                }
                tracing::debug!(session = %session, "transport session destroyed");
                true
            }
            None => false,
        }
    }

    fn request(
        &self,
        session: &SessionId,
        request: &RequestId,
        descriptor: RequestDescriptor,
    ) -> Result<()> {
        let state = self.session(session)?;

        {
            let mut transfers = state.transfers.lock();
            if let Some(existing) = transfers.get(request) {
                if !existing.state.is_terminal() {
                    return Err(PulseError::DuplicateId(request.to_string()));
                }
            }
            transfers.insert(request.clone(), TransferState::new());
        }

        let cancel = Arc::new(AtomicBool::new(false));
        state
            .cancel_flags
            .lock()
            .insert(request.clone(), cancel.clone());

        let id = request.clone();
        tokio::spawn(async move {
            run_transfer(state, id, descriptor, cancel).await;
        });

        Ok(())
    }

    fn get_status(&self, session: &SessionId, request: &RequestId) -> Result<StatusReport> {
        let state = self.session(session)?;
        let transfers = state.transfers.lock();
        match transfers.get(request) {
            Some(transfer) => Ok(transfer.to_report()),
            // Unknown ids get an error-shaped report rather than a hard
            // failure, matching the wire contract's older shape.
            None => Ok(StatusReport {
                completed: true,
                state: Some(RequestState::Error),
                error: Some(format!("request not found: {request}")),
                ..StatusReport::default()
            }),
        }
    }

    fn cancel_request(&self, session: &SessionId, request: &RequestId) -> bool {
        let Ok(state) = self.session(session) else {
            return false;
        };

        let accepted = match state.cancel_flags.lock().get(request) {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        };

        if accepted {
            let mut transfers = state.transfers.lock();
            if let Some(transfer) = transfers.get_mut(request) {
                if !transfer.completed {
                    transfer.state = RequestState::Cancelled;
                    transfer.completed = true;
                    transfer.error = Some("request was cancelled".to_string());
                }
            }
        }

        accepted
    }
}

impl SessionState {
    fn update(&self, id: &RequestId, apply: impl FnOnce(&mut TransferState)) {
        if let Some(transfer) = self.transfers.lock().get_mut(id) {
            apply(transfer);
        }
    }
}

/// Drive one transfer to a terminal state, mirroring progress into the
/// session registry.
async fn run_transfer(
    session: Arc<SessionState>,
    id: RequestId,
    descriptor: RequestDescriptor,
    cancel: Arc<AtomicBool>,
) {
    session.update(&id, |t| t.state = RequestState::Sending);

    match execute(&session, &id, descriptor, &cancel).await {
        Ok(()) => session.update(&id, |t| {
            if !t.state.is_terminal() {
                t.state = RequestState::Complete;
            }
            t.completed = true;
        }),
        Err(PulseError::Cancelled) => session.update(&id, |t| {
            t.state = RequestState::Cancelled;
            t.error = Some("request was cancelled".to_string());
            t.completed = true;
        }),
        Err(err) => {
            tracing::debug!(request = %id, error = %err, "transfer failed");
            session.update(&id, |t| {
                if !t.state.is_terminal() {
                    t.state = RequestState::Error;
                }
                t.error = Some(err.to_string());
                t.completed = true;
            });
        }
    }
}

async fn execute(
    session: &SessionState,
    id: &RequestId,
    descriptor: RequestDescriptor,
    cancel: &AtomicBool,
) -> Result<()> {
    let client = build_client(&descriptor)?;
    let method = parse_method(&descriptor.method)?;

    let mut builder = client.request(method, &descriptor.url);

    if let Some(headers) = &descriptor.headers {
        for (key, value) in headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| PulseError::InvalidConfig(format!("invalid header name: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| PulseError::InvalidConfig(format!("invalid header value: {e}")))?;
            builder = builder.header(name, value);
        }
    }

    if let Some(query) = &descriptor.query {
        builder = builder.query(query);
    }

    if let Some(body) = &descriptor.body {
        builder = match body {
            RequestBody::Raw(raw) => builder.body(raw.clone()),
            RequestBody::Json(json) => builder.json(json),
            RequestBody::File(path) => {
                let contents = tokio::fs::read_to_string(path).await?;
                builder.body(contents)
            }
        };
    }

    if let Some(form) = &descriptor.form {
        builder = builder.form(form);
    }

    if let Some(auth) = &descriptor.auth {
        builder = builder.basic_auth(&auth.username, Some(&auth.password));
    }

    let response = builder
        .send()
        .await
        .map_err(|e| PulseError::Transport(e.to_string()))?;

    let status = response.status().as_u16();
    let mut headers = HashMap::new();
    for (key, value) in response.headers() {
        if let Ok(value) = value.to_str() {
            headers.insert(key.as_str().to_string(), value.to_string());
        }
    }

    session.update(id, |t| {
        t.state = RequestState::Receiving;
        t.status = Some(status);
        t.headers = Some(headers);
    });

    let publish_chunks = descriptor.stream;
    let mut accumulated = BytesMut::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        if cancel.load(Ordering::SeqCst) {
            return Err(PulseError::Cancelled);
        }

        let chunk = chunk.map_err(|e| PulseError::Transport(e.to_string()))?;
        accumulated.extend_from_slice(&chunk);

        if publish_chunks {
            let snapshot = complete_utf8_prefix(&accumulated);
            session.update(id, |t| t.body = Some(snapshot));
        }
    }

    if cancel.load(Ordering::SeqCst) {
        return Err(PulseError::Cancelled);
    }

    let body = String::from_utf8_lossy(&accumulated).into_owned();
    session.update(id, |t| t.body = Some(body));
    Ok(())
}

/// Render the buffer as a string, holding back an incomplete trailing UTF-8
/// sequence. Published snapshots must never rewrite an already-sent prefix,
/// so a character split across chunk boundaries stays unpublished until its
/// remaining bytes arrive.
fn complete_utf8_prefix(buffer: &[u8]) -> String {
    match std::str::from_utf8(buffer) {
        Ok(text) => text.to_string(),
        Err(err) if err.error_len().is_none() => {
            String::from_utf8_lossy(&buffer[..err.valid_up_to()]).into_owned()
        }
        Err(_) => String::from_utf8_lossy(buffer).into_owned(),
    }
}

fn build_client(descriptor: &RequestDescriptor) -> Result<Client> {
    let timeout = descriptor.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
    let mut builder = Client::builder().timeout(Duration::from_secs(timeout));

    if descriptor.insecure {
        builder = builder.danger_accept_invalid_certs(true);
    }

    if let Some(proxy) = &descriptor.proxy {
        let proxy = reqwest::Proxy::all(proxy)
            .map_err(|e| PulseError::InvalidConfig(format!("invalid proxy: {e}")))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| PulseError::TransportUnavailable(e.to_string()))
}

fn parse_method(method: &str) -> Result<Method> {
    match method {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "DELETE" => Ok(Method::DELETE),
        "HEAD" => Ok(Method::HEAD),
        "OPTIONS" => Ok(Method::OPTIONS),
        "PATCH" => Ok(Method::PATCH),
        other => Err(PulseError::InvalidConfig(format!(
            "unsupported HTTP method: {other}"
        ))),
    }
}
