#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Pulse-HTTP: callback-driven requests over a polling transport
//!
//! This crate manages many concurrent, independently-addressable HTTP
//! requests against an external transport engine that is only reachable
//! through a non-blocking, poll-based status interface. No futures or
//! promises cross that boundary: a recurring poll tick sweeps every
//! outstanding request, drives a per-request lifecycle state machine, and
//! delivers results through user-supplied callbacks.
//!
//! ## Key Guarantees
//!
//! - **At-most-once terminal delivery**: `on_complete` and `on_error` each
//!   fire at most once per request, and never both.
//! - **Incremental streaming**: the transport reports cumulative body
//!   snapshots; the client recovers the newly-arrived suffix and hands it to
//!   `on_chunk`, strictly before the terminal callback.
//! - **Isolated callback failures**: a panicking callback is logged and never
//!   stalls other requests in the same tick.
//! - **Local cancellation and timeout**: both force a terminal state
//!   synchronously on the client side, independent of transport
//!   responsiveness; a wedged transport cannot suppress a timeout.
//! - **Leak-free teardown**: destroying the client stops the poll task,
//!   clears all records without firing their callbacks, and releases the
//!   transport session.
//!
//! ## Client Usage
//!
//! ```ignore
//! use pulse_http::{PulseClient, RequestConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PulseClient::new()?;
//!
//!     client.get(
//!         "https://example.com/api/data",
//!         RequestConfig::default()
//!             .header("User-Agent", "pulse")
//!             .on_complete(|response| println!("status: {:?}", response.status))
//!             .on_error(|err| eprintln!("failed: {err}")),
//!     )?;
//!
//!     // The recurring poll task delivers callbacks as transfers progress.
//!     tokio::time::sleep(std::time::Duration::from_secs(2)).await;
//!     client.destroy();
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming
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
//!         .on_error(|err| eprintln!("stream failed: {err}")),
//! )?;
//! ```
//!
//! ## Module Structure
//!
//! - **[client]** - the lifecycle engine: façade, store, poll tick, dispatch
//! - **[transport]** - the transport contract and the reqwest-backed engine
//! - **[types]** - shared protocol types (states, reports, descriptors)
//! - **[error]** - error taxonomy and result handling

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::{
    body_delta, get_client, ClientConfig, PulseClient, RequestConfig, DEFAULT_POLL_INTERVAL_MS,
};
pub use error::{PulseError, Result};
pub use transport::{HttpEngine, Transport};
pub use types::{
    AuthInfo, HttpResponse, RequestBody, RequestDescriptor, RequestId, RequestState, SessionId,
    StatusReport,
};

#[cfg(test)]
mod tests;
