//! Client and request configuration.
//!
//! [`RequestConfig`] enumerates every recognized request option as an explicit
//! struct with defaults, validated at submission time. Callbacks ride along
//! with the configuration and are split off into the client's records when the
//! request is submitted; everything else crosses the transport seam as a
//! [`RequestDescriptor`].
//!
//! # Examples
//!
//! ```ignore
//! use pulse_http::{PulseClient, RequestConfig};
//!
//! let client = PulseClient::new()?;
//! let id = client.request(
//!     RequestConfig::new("https://example.com/api")
//!         .method("POST")
//!         .header("User-Agent", "pulse")
//!         .json(serde_json::json!({"q": "hello"}))
//!         .timeout(std::time::Duration::from_secs(30))
//!         .on_complete(|response| println!("status: {:?}", response.status)),
//! )?;
//! ```

use crate::client::dispatch::{CallbackSet, OnChunk, OnComplete, OnError};
use crate::error::{PulseError, Result};
use crate::types::{AuthInfo, HttpResponse, RequestBody, RequestDescriptor};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Default poll interval between status sweeps, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

const SUPPORTED_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "PATCH"];

/// Client-level configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Interval between poll ticks, in milliseconds.
    pub poll_interval_ms: u64,
    /// Spawn the recurring poll task at construction. Disable to drive
    /// polling manually through
    /// [`PulseClient::poll_requests`](crate::PulseClient::poll_requests).
    pub auto_poll: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            auto_poll: true,
        }
    }
}

/// Configuration for a single request: target, transport options and
/// callbacks.
///
/// Construct with [`RequestConfig::new`] (or [`Default`] when the client verb
/// supplies the URL), chain builder methods, and submit through
/// [`PulseClient::request`](crate::PulseClient::request) or a convenience
/// verb. Validation happens at submission.
#[derive(Default)]
pub struct RequestConfig {
    /// Target URL.
    pub url: String,
    /// HTTP method; normalized to uppercase. Empty means GET.
    pub method: String,
    /// Extra request headers.
    pub headers: Option<HashMap<String, String>>,
    /// Query parameters appended to the URL.
    pub query: Option<HashMap<String, String>>,
    /// Form fields, sent urlencoded.
    pub form: Option<HashMap<String, String>>,
    /// Basic-auth credentials.
    pub auth: Option<AuthInfo>,
    /// Request body.
    pub body: Option<RequestBody>,
    /// Client-side timeout; also forwarded to the transport. Absent means no
    /// client-side enforcement (the transport's own timeout still applies).
    pub timeout: Option<Duration>,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// Proxy URL for this request.
    pub proxy: Option<String>,
    /// Deliver incremental body chunks while the response streams in.
    pub stream: bool,

    pub(crate) on_complete: Option<OnComplete>,
    pub(crate) on_error: Option<OnError>,
    pub(crate) on_chunk: Option<OnChunk>,
}

impl RequestConfig {
    /// Start a configuration for the given URL. Method defaults to GET.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Set the HTTP method (case-insensitive).
    pub fn method(mut self, method: impl AsRef<str>) -> Self {
        self.method = method.as_ref().to_uppercase();
        self
    }

    /// Add a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Add a query parameter.
    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Add a form field; the body is sent urlencoded.
    pub fn form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Use basic-auth credentials.
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(AuthInfo {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Send a JSON body.
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }

    /// Send a raw string body.
    pub fn raw_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Raw(body.into()));
        self
    }

    /// Send the contents of a file as the body.
    pub fn file_body(mut self, path: impl Into<String>) -> Self {
        self.body = Some(RequestBody::File(path.into()));
        self
    }

    /// Enforce a client-side timeout, also forwarded to the transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Skip TLS certificate verification.
    pub fn insecure(mut self) -> Self {
        self.insecure = true;
        self
    }

    /// Route the request through a proxy.
    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.proxy = Some(url.into());
        self
    }

    /// Deliver incremental body chunks through `on_chunk` while the response
    /// streams in.
    pub fn stream(mut self) -> Self {
        self.stream = true;
        self
    }

    /// Invoke `callback` once when the request completes successfully.
    pub fn on_complete(mut self, callback: impl FnOnce(HttpResponse) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Invoke `callback` once when the request fails, times out or is
    /// cancelled.
    pub fn on_error(mut self, callback: impl FnOnce(PulseError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Invoke `callback` with each newly-arrived body chunk. Implies nothing
    /// about completion; the terminal callback still fires afterwards.
    pub fn on_chunk(mut self, callback: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_chunk = Some(Box::new(callback));
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// [`PulseError::InvalidConfig`] when the URL does not parse or the
    /// method is unsupported.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.url)
            .map_err(|e| PulseError::InvalidConfig(format!("invalid URL '{}': {e}", self.url)))?;

        if !self.method.is_empty() && !SUPPORTED_METHODS.contains(&self.method.as_str()) {
            return Err(PulseError::InvalidConfig(format!(
                "unsupported HTTP method: {}",
                self.method
            )));
        }

        Ok(())
    }

    /// Split into the transport-facing descriptor, the callback set and the
    /// client-side timeout.
    pub(crate) fn into_parts(self) -> (RequestDescriptor, CallbackSet, Option<Duration>) {
        let method = if self.method.is_empty() {
            "GET".to_string()
        } else {
            self.method
        };

        let descriptor = RequestDescriptor {
            url: self.url,
            method,
            headers: self.headers,
            query: self.query,
            form: self.form,
            auth: self.auth,
            body: self.body,
            timeout: self.timeout.map(|t| t.as_secs().max(1)),
            insecure: self.insecure,
            proxy: self.proxy,
            stream: self.stream,
        };

        let callbacks = CallbackSet {
            on_complete: self.on_complete,
            on_error: self.on_error,
            on_chunk: self.on_chunk,
        };

        (descriptor, callbacks, self.timeout)
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("query", &self.query)
            .field("form", &self.form)
            .field("timeout", &self.timeout)
            .field("insecure", &self.insecure)
            .field("proxy", &self.proxy)
            .field("stream", &self.stream)
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_chunk", &self.on_chunk.is_some())
            .finish()
    }
}
