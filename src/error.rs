//! Munin error types

/// Munin error types
#[derive(Debug, thiserror::Error)]
pub enum MuninError {
    /// Caller passed input the operation cannot act on (e.g. an empty
    /// attribute key). Actionable by the caller, never silently dropped.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Transport-side failures, carried by resource adapters
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("push delivery failed: {0}")]
    Push(String),

    /// The bound resource does not support push updates.
    ///
    /// Returned by the default
    /// [`push_events`](crate::RemoteResource::push_events) stub; the
    /// engine falls back to timer-driven refresh for such resources.
    #[error("resource does not support push updates")]
    PushUnsupported,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for munin operations
pub type Result<T> = std::result::Result<T, MuninError>;
