//! The client façade: submission, cancellation, polling cadence and teardown.
//!
//! `PulseClient` owns one transport session for its whole lifetime. Requests
//! are registered in the store, handed to the transport, and driven to
//! completion by a recurring poll task (or by manual
//! [`poll_requests`](PulseClient::poll_requests) calls). Cloning the client
//! clones a handle to the same session, store and poll task.
//!
//! # Examples
//!
//! ## Simple GET with a completion callback
//!
//! ```ignore
//! use pulse_http::{PulseClient, RequestConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PulseClient::new()?;
//!     client.get(
//!         "https://example.com/",
//!         RequestConfig::default()
//!             .on_complete(|response| println!("status: {:?}", response.status)),
//!     )?;
//!     // ... the poll task delivers the callback when the transfer finishes
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming chunks
//!
//! ```ignore
//! use pulse_http::{PulseClient, RequestConfig};
//!
//! let client = PulseClient::new()?;
//! client.get(
//!     "https://example.com/events",
//!     RequestConfig::default()
//!         .stream()
//!         .on_chunk(|chunk| print!("{chunk}"))
//!         .on_error(|err| eprintln!("failed: {err}")),
//! )?;
//! ```

use crate::client::config::{ClientConfig, RequestConfig};
use crate::client::poll;
use crate::client::store::{RequestRecord, RequestStore};
use crate::error::{PulseError, Result};
use crate::transport::{HttpEngine, Transport};
use crate::types::{RequestId, RequestState, SessionId};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

static GLOBAL_CLIENT: OnceCell<PulseClient> = OnceCell::new();

/// The process-wide client, lazily constructed on first use.
///
/// The instance lives for the host process's duration unless explicitly torn
/// down with [`PulseClient::destroy`]. Must first be called within a tokio
/// runtime.
///
/// # Errors
///
/// [`PulseError::TransportUnavailable`] if the default engine cannot
/// allocate a session.
pub fn get_client() -> Result<&'static PulseClient> {
    GLOBAL_CLIENT.get_or_try_init(PulseClient::new)
}

/// Callback-driven HTTP client over a poll-based transport engine.
///
/// One transport session is allocated at construction and released at
/// [`destroy`](PulseClient::destroy). All request bookkeeping runs on the
/// poll tick; user callbacks fire from that tick with isolated failure
/// domains.
#[derive(Clone)]
pub struct PulseClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    session: Mutex<Option<SessionId>>,
    store: Mutex<RequestStore>,
    destroyed: AtomicBool,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl PulseClient {
    /// Create a client backed by the default [`HttpEngine`], with the default
    /// configuration. Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`PulseError::TransportUnavailable`] if the engine cannot allocate a
    /// session.
    pub fn new() -> Result<Self> {
        Self::with_transport(Arc::new(HttpEngine::new()), ClientConfig::default())
    }

    /// Create a client over an arbitrary transport implementation.
    ///
    /// With `config.auto_poll` disabled no timer task is spawned and the
    /// caller drives delivery through [`poll_requests`](Self::poll_requests).
    pub fn with_transport(transport: Arc<dyn Transport>, config: ClientConfig) -> Result<Self> {
        let session = transport.create_session()?;
        let inner = Arc::new(ClientInner {
            transport,
            session: Mutex::new(Some(session)),
            store: Mutex::new(RequestStore::new()),
            destroyed: AtomicBool::new(false),
            poll_task: Mutex::new(None),
        });

        if config.auto_poll {
            let task = spawn_poll_task(&inner, config.poll_interval_ms);
            *inner.poll_task.lock() = Some(task);
        }

        Ok(Self { inner })
    }

    /// Submit a request.
    ///
    /// Returns the freshly generated request id; progress is delivered
    /// through the configuration's callbacks on subsequent poll ticks.
    ///
    /// # Errors
    ///
    /// [`PulseError::ClientDestroyed`] after teardown,
    /// [`PulseError::InvalidConfig`] for a malformed configuration, or a
    /// transport error if the engine rejected the submission (in which case
    /// no record is retained).
    pub fn request(&self, config: RequestConfig) -> Result<RequestId> {
        if self.inner.destroyed.load(Ordering::SeqCst) {
            return Err(PulseError::ClientDestroyed);
        }
        config.validate()?;
        let session = self
            .inner
            .session
            .lock()
            .clone()
            .ok_or(PulseError::ClientDestroyed)?;

        let (descriptor, callbacks, timeout) = config.into_parts();
        let id = RequestId::generate();
        let deadline = timeout.map(|t| Instant::now() + t);

        self.inner
            .store
            .lock()
            .insert(RequestRecord::new(id.clone(), callbacks, deadline))?;

        if let Err(err) = self.inner.transport.request(&session, &id, descriptor) {
            self.inner.store.lock().remove(&id);
            return Err(err);
        }

        tracing::debug!(request = %id, "request submitted");
        Ok(id)
    }

    /// Submit a GET request to `url`.
    pub fn get(&self, url: impl Into<String>, config: RequestConfig) -> Result<RequestId> {
        self.submit_with_method("GET", url, config)
    }

    /// Submit a POST request to `url`.
    pub fn post(&self, url: impl Into<String>, config: RequestConfig) -> Result<RequestId> {
        self.submit_with_method("POST", url, config)
    }

    /// Submit a PUT request to `url`.
    pub fn put(&self, url: impl Into<String>, config: RequestConfig) -> Result<RequestId> {
        self.submit_with_method("PUT", url, config)
    }

    /// Submit a DELETE request to `url`.
    pub fn delete(&self, url: impl Into<String>, config: RequestConfig) -> Result<RequestId> {
        self.submit_with_method("DELETE", url, config)
    }

    /// Submit a HEAD request to `url`.
    pub fn head(&self, url: impl Into<String>, config: RequestConfig) -> Result<RequestId> {
        self.submit_with_method("HEAD", url, config)
    }

    /// Submit a PATCH request to `url`.
    pub fn patch(&self, url: impl Into<String>, config: RequestConfig) -> Result<RequestId> {
        self.submit_with_method("PATCH", url, config)
    }

    fn submit_with_method(
        &self,
        method: &str,
        url: impl Into<String>,
        mut config: RequestConfig,
    ) -> Result<RequestId> {
        config.url = url.into();
        config.method = method.to_string();
        self.request(config)
    }

    /// Cancel an in-flight request.
    ///
    /// The local state becomes `Cancelled` synchronously, so subsequent polls
    /// and callers observe cancellation before the transport acknowledges,
    /// and the cancel instruction is forwarded. The request's
    /// `on_error` fires with [`PulseError::Cancelled`] on the next tick.
    /// Cancellation is best-effort: the underlying transfer may not stop
    /// instantaneously.
    ///
    /// Returns whether the transport accepted the cancellation.
    ///
    /// # Errors
    ///
    /// [`PulseError::UnknownRequest`] for an id the client does not know,
    /// [`PulseError::ClientDestroyed`] after teardown.
    pub fn cancel(&self, id: &RequestId) -> Result<bool> {
        let session = self
            .inner
            .session
            .lock()
            .clone()
            .ok_or(PulseError::ClientDestroyed)?;

        {
            let mut store = self.inner.store.lock();
            let record = store
                .get_mut(id)
                .ok_or_else(|| PulseError::UnknownRequest(id.to_string()))?;
            if !record.state.is_terminal() {
                record.state = RequestState::Cancelled;
                record.error = Some("request was cancelled".to_string());
            }
        }

        Ok(self.inner.transport.cancel_request(&session, id))
    }

    /// Run one poll tick synchronously.
    ///
    /// Callable in addition to the timer-driven cadence, e.g. from tests or
    /// hosts that drive delivery manually. Callbacks owed by this tick run on
    /// the calling thread before it returns; do not call this from inside a
    /// request callback.
    pub fn poll_requests(&self) {
        if self.inner.destroyed.load(Ordering::SeqCst) {
            return;
        }
        let Some(session) = self.inner.session.lock().clone() else {
            return;
        };
        poll::poll_once(
            &*self.inner.transport,
            &session,
            &self.inner.store,
            &self.inner.destroyed,
        );
    }

    /// Tear the client down: stop the poll task, drop all records without
    /// firing their callbacks, and release the session. Idempotent.
    ///
    /// After this call [`request`](Self::request) fails with
    /// [`PulseError::ClientDestroyed`] and no callback fires again.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = self.inner.poll_task.lock().take() {
            task.abort();
        }
        self.inner.store.lock().clear();
        if let Some(session) = self.inner.session.lock().take() {
            self.inner.transport.destroy_session(&session);
        }
        tracing::debug!("client destroyed");
    }

    /// Number of outstanding requests.
    pub fn in_flight(&self) -> usize {
        self.inner.store.lock().len()
    }

    /// Whether [`destroy`](Self::destroy) has been called.
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }
}

/// Recurring tick on the host scheduler. Holds only a weak handle so dropping
/// every client clone stops the task.
fn spawn_poll_task(inner: &Arc<ClientInner>, interval_ms: u64) -> JoinHandle<()> {
    let weak: Weak<ClientInner> = Arc::downgrade(inner);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let Some(inner) = weak.upgrade() else {
                break;
            };
            if inner.destroyed.load(Ordering::SeqCst) {
                break;
            }
            let Some(session) = inner.session.lock().clone() else {
                break;
            };
            poll::poll_once(&*inner.transport, &session, &inner.store, &inner.destroyed);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let client = PulseClient::new().unwrap();
        assert_eq!(client.in_flight(), 0);
        assert!(!client.is_destroyed());
        client.destroy();
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let client = PulseClient::new().unwrap();
        client.destroy();
        client.destroy();
        assert!(client.is_destroyed());
    }

    #[tokio::test]
    async fn test_request_after_destroy_is_rejected() {
        let client = PulseClient::new().unwrap();
        client.destroy();
        let err = client
            .request(RequestConfig::new("http://example.com/"))
            .unwrap_err();
        assert!(matches!(err, PulseError::ClientDestroyed));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_submission() {
        let client = PulseClient::new().unwrap();
        let err = client.request(RequestConfig::new("not a url")).unwrap_err();
        assert!(matches!(err, PulseError::InvalidConfig(_)));
        assert_eq!(client.in_flight(), 0);
        client.destroy();
    }

    #[tokio::test]
    async fn test_cancel_unknown_id_is_reported() {
        let client = PulseClient::new().unwrap();
        let err = client.cancel(&RequestId::from("ghost")).unwrap_err();
        assert!(matches!(err, PulseError::UnknownRequest(_)));
        client.destroy();
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let client = PulseClient::new().unwrap();
        let clone = client.clone();
        client.destroy();
        assert!(clone.is_destroyed());
    }
}
