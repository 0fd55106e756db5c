//! Subscriber callback seam.

use std::sync::Arc;

use crate::resource::RemoteResource;
use crate::types::Attributes;

/// Receives snapshot-update notifications from a
/// [`ResourceCache`](crate::ResourceCache).
///
/// Notifications are idempotent signals: the same logical update may be
/// delivered more than once (e.g. once via push and again via a later
/// fetch), and a listener should treat each call as "re-read the
/// snapshot", not as a delta.
///
/// Callbacks are invoked outside the engine's lock, so a listener may call
/// back into the cache — including removing itself — without deadlocking.
pub trait CacheListener: Send + Sync {
    /// Called with the resource the snapshot belongs to and a copy of the
    /// new snapshot.
    fn on_update(&self, resource: &Arc<dyn RemoteResource>, attributes: &Attributes);
}

/// Plain closures are listeners.
impl<F> CacheListener for F
where
    F: Fn(&Arc<dyn RemoteResource>, &Attributes) + Send + Sync,
{
    fn on_update(&self, resource: &Arc<dyn RemoteResource>, attributes: &Attributes) {
        self(resource, attributes)
    }
}
