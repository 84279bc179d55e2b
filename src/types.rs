//! Core protocol types shared by the client façade and the transport seam.
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SessionId`] / [`RequestId`] | Opaque identifiers for transport sessions and in-flight requests |
//! | [`RequestState`] | Lifecycle state machine states with terminal classification |
//! | [`StatusReport`] | The transport's non-blocking status snapshot for one request |
//! | [`RequestDescriptor`] | Everything the transport needs to execute a request |
//! | [`HttpResponse`] | The completed response handed to `on_complete` |
//!
//! # Lifecycle States
//!
//! ```text
//! Init → Sending → Receiving → Complete
//!   │        │          │    ↘ Error
//!   │        └── Idle ───┘    ↘ Timeout
//!   └─────────────────────────↘ Cancelled
//!                                   ↓
//!                             Acknowledged (callback delivered, record removed)
//! ```
//!
//! `Complete`, `Error`, `Timeout`, `Cancelled` and `Acknowledged` are terminal:
//! no further transition occurs and the record is cleaned up once its callback
//! obligations are discharged.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Opaque identifier for a transport session.
///
/// A session scopes a group of requests; it is created once at client
/// construction, destroyed once at teardown, and never reused afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh session identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The string representation of this id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a single submitted request.
///
/// Generated at submission time; unpredictable and unique across submissions
/// within a session. A removed id is never reinserted into the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Mint a fresh request identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The string representation of this id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a request, shared between the client's records and the
/// transport's status reports.
///
/// The transport is authoritative for state once an identifier has been
/// submitted, with two local exceptions: caller cancellation and client-side
/// timeout force a terminal state without consulting the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    /// Submitted, not yet dispatched.
    Init,
    /// Request in flight, headers/body being sent.
    Sending,
    /// Response headers/body arriving.
    Receiving,
    /// Success, response available.
    Complete,
    /// Failure, error detail available.
    Error,
    /// Exceeded the configured timeout.
    Timeout,
    /// Cancelled by the caller.
    Cancelled,
    /// Transport reports inactivity without completion.
    Idle,
    /// Terminal callback has been delivered and consumed.
    Acknowledged,
}

impl RequestState {
    /// Whether this state admits no further transition.
    ///
    /// Terminal records are removed from the store once their callback
    /// obligations are discharged, never before.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestState::Complete
                | RequestState::Error
                | RequestState::Timeout
                | RequestState::Cancelled
                | RequestState::Acknowledged
        )
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestState::Init => "init",
            RequestState::Sending => "sending",
            RequestState::Receiving => "receiving",
            RequestState::Complete => "complete",
            RequestState::Error => "error",
            RequestState::Timeout => "timeout",
            RequestState::Cancelled => "cancelled",
            RequestState::Idle => "idle",
            RequestState::Acknowledged => "acknowledged",
        };
        f.write_str(name)
    }
}

/// Non-blocking status snapshot for one request, as reported by the transport.
///
/// Newer transports report `state` directly and it is applied verbatim. Older
/// status shapes carry only `completed`/`status`/`body`/`error`, from which the
/// poll loop infers the state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusReport {
    /// Whether the transfer has finished (successfully or not).
    pub completed: bool,
    /// The transport's own lifecycle state, if it reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<RequestState>,
    /// HTTP status code, once response headers have arrived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Response headers, once they have arrived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    /// Cumulative response body observed so far (never a delta).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Failure detail, present when the transfer failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request body variants accepted by the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RequestBody {
    /// Raw string payload sent as-is.
    Raw(String),
    /// JSON value, serialized and sent with `application/json`.
    Json(serde_json::Value),
    /// Path to a file whose contents become the payload.
    File(String),
}

/// Basic-auth credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthInfo {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

/// Everything the transport needs to execute a request.
///
/// This is the transport-facing half of a [`RequestConfig`](crate::RequestConfig):
/// callbacks stay on the client side, the descriptor crosses the seam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDescriptor {
    /// Target URL.
    pub url: String,
    /// HTTP method, uppercase.
    pub method: String,
    /// Extra request headers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    /// Query parameters appended to the URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<HashMap<String, String>>,
    /// Form fields, sent urlencoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<HashMap<String, String>>,
    /// Basic-auth credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthInfo>,
    /// Request body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
    /// Transport-side timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// Proxy URL for this request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Publish cumulative body snapshots while the response streams in.
    pub stream: bool,
}

/// A completed HTTP response, handed to `on_complete`.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// HTTP status code, if the transport reported one.
    pub status: Option<u16>,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Full response body.
    pub body: String,
}
