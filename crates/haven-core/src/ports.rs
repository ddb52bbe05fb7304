//! Port traits — the hexagonal architecture boundary.
//!
//! These traits are defined here in `haven-core` (pure Rust).
//! Implementations live in `haven-platform` (storage, transport, and
//! speech adapters). The core never imports platform code; it only
//! depends on these traits, which is what lets every state machine be
//! exercised against scripted fakes.

use async_trait::async_trait;
use haven_types::Result;
use serde_json::Value;

// ─── Storage Port ────────────────────────────────────────────

/// Durable key-value store. The core uses exactly three keys:
/// `authToken`, `userProfile`, and `themePreference`.
#[async_trait(?Send)]
pub trait StoragePort {
    /// Get a value by key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value; removing a missing key is not an error
    async fn remove(&self, key: &str) -> Result<()>;

    /// Name of this backend (for logging/debug)
    fn backend_name(&self) -> &str;
}

// ─── Transport Port ──────────────────────────────────────────

/// HTTP method subset the client uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// Response from the transport. A non-2xx status is not an `Err`;
/// transport errors are reserved for the request never completing.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Value,
}

impl HttpResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Human-readable reason from the body, for surfacing to the view
    pub fn message(&self) -> String {
        self.body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("An error occurred")
            .to_string()
    }
}

/// HTTP-like request/response transport. The bearer token is injected
/// by the caller when a session holds one; the transport itself is
/// stateless with respect to auth.
#[async_trait(?Send)]
pub trait TransportPort {
    async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<HttpResponse>;
}

// ─── Speech Port ─────────────────────────────────────────────

/// Speech-to-text provider driving the recording toggle.
#[async_trait(?Send)]
pub trait SpeechPort {
    /// Begin audio capture
    async fn start_capture(&self) -> Result<()>;

    /// Stop capture and resolve to the transcript
    async fn stop_capture(&self) -> Result<String>;
}
