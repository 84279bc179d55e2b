//! The request store: single-owner registry of in-flight request records.
//!
//! Records are created at submission in `Init`, mutated only by the poll tick
//! (state and body fields) and by cancellation (state), and removed by the
//! poll tick once terminal and callback-complete. A removed id is never
//! reinserted.
//!
//! The store itself is not synchronized; the owning client wraps it in a
//! mutex and treats every access as a critical section.

use crate::client::dispatch::CallbackSet;
use crate::error::{PulseError, Result};
use crate::types::{RequestId, RequestState};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Bookkeeping for one in-flight request.
pub(crate) struct RequestRecord {
    pub(crate) id: RequestId,
    pub(crate) state: RequestState,
    /// Most recently observed full response body.
    pub(crate) last_body: String,
    /// Length of `last_body`; monotonically non-decreasing while streaming.
    pub(crate) last_body_len: usize,
    pub(crate) response_status: Option<u16>,
    pub(crate) response_headers: Option<HashMap<String, String>>,
    /// Failure detail; populated only for failed states.
    pub(crate) error: Option<String>,
    /// Absent means no client-side timeout enforcement.
    pub(crate) timeout_deadline: Option<Instant>,
    pub(crate) callbacks: Arc<Mutex<CallbackSet>>,
}

impl RequestRecord {
    pub(crate) fn new(
        id: RequestId,
        callbacks: CallbackSet,
        timeout_deadline: Option<Instant>,
    ) -> Self {
        Self {
            id,
            state: RequestState::Init,
            last_body: String::new(),
            last_body_len: 0,
            response_status: None,
            response_headers: None,
            error: None,
            timeout_deadline,
            callbacks: Arc::new(Mutex::new(callbacks)),
        }
    }

    /// Whether the client-side deadline has elapsed.
    pub(crate) fn timed_out(&self, now: Instant) -> bool {
        self.timeout_deadline.is_some_and(|deadline| now >= deadline)
    }
}

/// Mapping from request id to record. Iteration order is unspecified.
#[derive(Default)]
pub(crate) struct RequestStore {
    entries: HashMap<RequestId, RequestRecord>,
}

impl RequestStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh record.
    ///
    /// # Errors
    ///
    /// [`PulseError::DuplicateId`] if the id is already present. Cannot occur
    /// under correct id generation; kept as a defensive check.
    pub(crate) fn insert(&mut self, record: RequestRecord) -> Result<()> {
        if self.entries.contains_key(&record.id) {
            return Err(PulseError::DuplicateId(record.id.to_string()));
        }
        self.entries.insert(record.id.clone(), record);
        Ok(())
    }

    pub(crate) fn get(&self, id: &RequestId) -> Option<&RequestRecord> {
        self.entries.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &RequestId) -> Option<&mut RequestRecord> {
        self.entries.get_mut(id)
    }

    /// Delete an entry; no-op if absent.
    pub(crate) fn remove(&mut self, id: &RequestId) {
        self.entries.remove(id);
    }

    /// The poll tick's sole iteration primitive.
    pub(crate) fn for_each_mut(&mut self, mut apply: impl FnMut(&RequestId, &mut RequestRecord)) {
        for (id, record) in self.entries.iter_mut() {
            apply(id, record);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
