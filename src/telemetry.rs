//! Telemetry metric name constants.
//!
//! Centralised metric names for munin operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `munin_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `uri` — the remote resource's identifier
//! - `status` — outcome: "ok", "error", or "empty"
//! - `trigger` — what produced a notification: "push" or "fetch"
//! - `kind` — which timer fired: "liveness", "subscriber", or "stale"

/// Total fetch results handled by the engine.
///
/// Labels: `uri`, `status` ("ok" | "error").
pub const FETCHES_TOTAL: &str = "munin_fetches_total";

/// Total push notifications handled by the engine.
///
/// Labels: `uri`, `status` ("ok" | "error" | "empty").
pub const PUSHES_TOTAL: &str = "munin_pushes_total";

/// Total subscriber callbacks invoked.
///
/// Labels: `uri`, `trigger` ("push" | "fetch").
pub const NOTIFICATIONS_TOTAL: &str = "munin_notifications_total";

/// Total timer expirations routed through the engine.
///
/// Labels: `uri`, `kind` ("liveness" | "subscriber" | "stale").
pub const TIMER_FIRES_TOTAL: &str = "munin_timer_fires_total";
