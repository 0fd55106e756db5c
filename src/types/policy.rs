//! Cache state, delivery policy, and subscriber identity types.

use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::Attributes;

/// Lifecycle state of a [`ResourceCache`](crate::ResourceCache).
///
/// A cache starts `Unprimed` and becomes `Ready` on the first successful
/// fetch or data-carrying push. `Ready` is terminal — transport failures
/// and empty pushes never regress the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheState {
    /// No snapshot has been established yet; reads yield an empty result.
    Unprimed,
    /// A baseline snapshot exists and reads return a copy of it.
    Ready,
}

/// How a subscriber wants snapshot updates delivered.
///
/// This is a closed set: the notification fork in the engine matches
/// exhaustively over exactly these three cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryPolicy {
    /// Notified the instant a push notification produces a new snapshot,
    /// and on every non-priming fetch.
    ImmediateOnChange,
    /// Notified on non-priming fetches only — push updates are not
    /// forwarded; the subscriber sees them at its own cadence.
    PeriodicOrDefault,
    /// Never auto-notified; reads the snapshot explicitly when it cares.
    Suppressed,
}

/// Unique, stable identifier of a registered subscriber.
///
/// Non-zero by construction; the engine allocates these and guarantees
/// uniqueness within a live registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberId(NonZeroU64);

impl SubscriberId {
    pub(crate) fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// The raw numeric identifier.
    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One push update delivered by a [`RemoteResource`](crate::RemoteResource)
/// push stream.
#[derive(Debug)]
pub struct PushEvent {
    /// The pushed attributes, or the transport failure that stood in for
    /// them. Failures are dropped by the engine, never surfaced.
    pub payload: Result<Attributes>,
    /// Resource-assigned sequence number, carried through for logging.
    pub sequence: u64,
}

impl PushEvent {
    /// A successful push carrying `attributes`.
    pub fn data(attributes: Attributes, sequence: u64) -> Self {
        Self {
            payload: Ok(attributes),
            sequence,
        }
    }

    /// A failed push.
    pub fn failure(error: crate::MuninError, sequence: u64) -> Self {
        Self {
            payload: Err(error),
            sequence,
        }
    }
}
