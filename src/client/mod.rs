//! The client lifecycle engine.
//!
//! This module multiplexes many concurrent, independently-addressable HTTP
//! requests onto a single polling cadence against a poll-based transport,
//! exposing a callback-driven API:
//!
//! - **Submit** requests with per-request callbacks (`on_complete`,
//!   `on_error`, `on_chunk`)
//! - **Poll** the transport on a fixed interval, driving a per-request state
//!   machine
//! - **Reconstruct** incremental streaming output from the transport's
//!   cumulative body snapshots
//! - **Deliver** each terminal callback exactly once, with isolated failure
//!   domains
//! - **Cancel** and **time out** requests without leaking transport-side
//!   resources
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── facade   - PulseClient and the recurring poll task
//! ├── config   - ClientConfig and the RequestConfig builder
//! ├── store    - request records and the single-owner store
//! ├── poll     - the poll tick and state machine transitions
//! ├── dispatch - callback storage and isolated dispatch
//! └── diff     - cumulative-snapshot to incremental-chunk recovery
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PulseClient`] | Main client handle: submit, cancel, poll, destroy |
//! | [`RequestConfig`] | Per-request options and callbacks |
//! | [`ClientConfig`] | Poll cadence configuration |
//!
//! # Cleanup policy
//!
//! The poll loop always owns record removal: it invokes terminal callbacks
//! itself and removes the record in the same tick, whether or not callbacks
//! were registered. The transport is never delegated callback delivery.

mod config;
mod diff;
mod dispatch;
mod facade;
mod poll;
mod store;

pub use config::{ClientConfig, RequestConfig, DEFAULT_POLL_INTERVAL_MS};
pub use facade::{get_client, PulseClient};
pub use diff::body_delta;
pub use dispatch::{OnChunk, OnComplete, OnError};
