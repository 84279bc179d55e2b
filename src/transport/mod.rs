//! The transport seam: the contract the lifecycle engine consumes.
//!
//! The client façade never performs I/O itself. It submits request
//! descriptors to a [`Transport`] and learns about progress exclusively
//! through [`Transport::get_status`], a non-blocking snapshot query driven by
//! the poll loop. No futures or promises cross this boundary; the engine's
//! internal connection handling, TLS and DNS are its own business.
//!
//! # Contract
//!
//! | Operation | Guarantee |
//! |-----------|-----------|
//! | `create_session` | Allocates an opaque session owned by one client |
//! | `destroy_session` | Idempotent release; `true` if the session existed |
//! | `request` | Accepts a descriptor and starts the transfer asynchronously |
//! | `get_status` | Non-blocking; bodies are cumulative snapshots, never deltas |
//! | `cancel_request` | Best-effort; `true` if the transport accepted the cancel |
//!
//! A transport may keep reporting `Sending`/`Receiving` for a cancelled
//! request until the transfer task observes the cancel flag; the client treats
//! its own `Cancelled` state as authoritative in the meantime.
//!
//! # Implementations
//!
//! [`HttpEngine`] is the production implementation backed by `reqwest`.
//! Test suites substitute scripted implementations to drive the poll loop
//! deterministically.

mod engine;

pub use engine::HttpEngine;

use crate::error::Result;
use crate::types::{RequestDescriptor, RequestId, SessionId, StatusReport};

/// A poll-based HTTP transport engine.
///
/// Implementations must be `Send + Sync`: the poll tick may run on any
/// runtime worker. Every method is non-blocking; `request` hands the actual
/// transfer off to the engine's own execution context.
pub trait Transport: Send + Sync + 'static {
    /// Allocate a new session.
    ///
    /// # Errors
    ///
    /// [`PulseError::TransportUnavailable`](crate::PulseError::TransportUnavailable)
    /// if the engine cannot be initialized.
    fn create_session(&self) -> Result<SessionId>;

    /// Release a session and everything it owns. Idempotent.
    ///
    /// Returns `true` if the session existed.
    fn destroy_session(&self, session: &SessionId) -> bool;

    /// Start executing a request within a session.
    ///
    /// The transfer proceeds asynchronously; progress is observable only
    /// through [`get_status`](Transport::get_status).
    fn request(
        &self,
        session: &SessionId,
        request: &RequestId,
        descriptor: RequestDescriptor,
    ) -> Result<()>;

    /// Query the current status of a request. Never blocks.
    ///
    /// The returned body, when present, is the cumulative response observed
    /// so far for streaming transfers, or the full body once completed.
    fn get_status(&self, session: &SessionId, request: &RequestId) -> Result<StatusReport>;

    /// Ask the engine to abandon a transfer. Best-effort and asynchronous:
    /// the transfer may report one further non-terminal status before the
    /// engine confirms termination.
    ///
    /// Returns `true` if the engine accepted the cancellation.
    fn cancel_request(&self, session: &SessionId, request: &RequestId) -> bool;
}
