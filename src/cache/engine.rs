//! The cache engine.
//!
//! [`ResourceCache`] keeps one local snapshot of a remote resource's
//! attributes fresh and fans updates out to subscribers. For push-capable
//! resources it consumes the resource's push stream and keeps a liveness
//! timer armed as a push-missed safety net; for poll-only resources each
//! subscriber's cadence timer drives its own refetch cycle.
//!
//! # Event model
//!
//! Three asynchronous events drive the engine: a push notification, a
//! fetch result, and a timer expiry. Each is handled under a single
//! per-engine lock; subscriber callbacks are invoked after the lock is
//! released, against a target list snapshotted under it, so a listener may
//! re-enter the cache (e.g. remove itself) without deadlocking.
//!
//! Driver tasks hold only a weak back-reference to the engine. An
//! event arriving after the owner dropped its last handle is discarded;
//! dropping the engine also cancels the liveness timer and every
//! subscriber timer and aborts the push pump.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::{MuninError, Result};
use crate::resource::RemoteResource;
use crate::telemetry;
use crate::timer::{TimerHandle, TimerService, TokioTimers};
use crate::types::{Attributes, CacheState, DeliveryPolicy, PushEvent, SubscriberId};

use super::listener::CacheListener;
use super::registry::{Subscriber, SubscriberRegistry, Trigger};

/// Liveness interval used when the builder does not override it.
pub const DEFAULT_LIVENESS_INTERVAL: Duration = Duration::from_secs(60);

/// Cadence used for the primary subscriber when the builder does not
/// override it.
pub const DEFAULT_CADENCE: Duration = Duration::from_secs(30);

/// Mutable engine state, guarded by one mutex per engine instance.
struct Core {
    state: CacheState,
    /// Current snapshot. Replaced wholesale on every successful update;
    /// readers get a copy, never a view into live state.
    snapshot: Arc<Attributes>,
    registry: SubscriberRegistry,
    /// The engine-level liveness timer. Armed only while the resource is
    /// push-capable; at most one outstanding at any instant.
    liveness: Option<TimerHandle>,
}

struct Inner {
    resource: Arc<dyn RemoteResource>,
    timers: Arc<dyn TimerService>,
    liveness_interval: Duration,
    core: Mutex<Core>,
    push_pump: Mutex<Option<JoinHandle<()>>>,
}

/// A caching proxy for one remote resource.
///
/// Construct with [`ResourceCache::builder`]; construction issues the
/// priming fetch and, for push-capable resources, opens the push stream
/// and arms the liveness timer. Clones share the same engine.
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use std::time::Duration;
/// # use munin::{Attributes, DeliveryPolicy, RemoteResource, ResourceCache};
/// # async fn demo(resource: Arc<dyn RemoteResource>) -> munin::Result<()> {
/// let cache = ResourceCache::builder(resource)
///     .policy(DeliveryPolicy::ImmediateOnChange)
///     .listener(Arc::new(|_: &Arc<dyn RemoteResource>, attrs: &Attributes| {
///         println!("updated: {} attributes", attrs.len());
///     }))
///     .build()?;
///
/// let snapshot = cache.cached_data(); // empty until primed
/// # let _ = snapshot;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ResourceCache {
    inner: Arc<Inner>,
}

/// Builder for [`ResourceCache`].
pub struct ResourceCacheBuilder {
    resource: Arc<dyn RemoteResource>,
    policy: DeliveryPolicy,
    cadence: Duration,
    listener: Option<Arc<dyn CacheListener>>,
    timers: Option<Arc<dyn TimerService>>,
    liveness_interval: Duration,
}

impl ResourceCacheBuilder {
    /// Delivery policy for the implicit primary subscriber.
    /// Default: [`DeliveryPolicy::PeriodicOrDefault`].
    pub fn policy(mut self, policy: DeliveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Refresh cadence for the implicit primary subscriber.
    /// Default: [`DEFAULT_CADENCE`].
    pub fn cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence;
        self
    }

    /// Callback for the implicit primary subscriber. Required.
    pub fn listener(mut self, listener: Arc<dyn CacheListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Substitute a timer service. Default: a fresh [`TokioTimers`].
    pub fn timers(mut self, timers: Arc<dyn TimerService>) -> Self {
        self.timers = Some(timers);
        self
    }

    /// Override the liveness interval for push-capable resources.
    /// Default: [`DEFAULT_LIVENESS_INTERVAL`].
    pub fn liveness_interval(mut self, interval: Duration) -> Self {
        self.liveness_interval = interval;
        self
    }

    /// Build the cache and start its drivers.
    ///
    /// Must be called from within a tokio runtime. Issues the priming
    /// fetch immediately; no subscriber is notified synchronously.
    pub fn build(self) -> Result<ResourceCache> {
        let listener = self.listener.ok_or_else(|| {
            MuninError::Configuration("a primary listener is required".into())
        })?;

        let inner = Arc::new(Inner {
            resource: self.resource,
            timers: self
                .timers
                .unwrap_or_else(|| Arc::new(TokioTimers::new()) as Arc<dyn TimerService>),
            liveness_interval: self.liveness_interval,
            core: Mutex::new(Core {
                state: CacheState::Unprimed,
                snapshot: Arc::new(Attributes::new()),
                registry: SubscriberRegistry::new(),
                liveness: None,
            }),
            push_pump: Mutex::new(None),
        });

        {
            let mut core = inner.lock_core();
            // The implicit primary subscriber polls at its own cadence
            // when the resource cannot push, same as any added later.
            let timer = if inner.resource.supports_push() {
                None
            } else {
                Some(inner.schedule_timer(self.cadence))
            };
            core.registry.insert(Subscriber {
                policy: self.policy,
                cadence: self.cadence,
                timer,
                listener,
            });
            if inner.resource.supports_push() {
                inner.rearm_liveness(&mut core);
            }
        }

        inner.spawn_fetch();
        if inner.resource.supports_push() {
            inner.spawn_push_pump();
        }

        Ok(ResourceCache { inner })
    }
}

impl ResourceCache {
    /// Start building a cache bound to `resource`.
    pub fn builder(resource: Arc<dyn RemoteResource>) -> ResourceCacheBuilder {
        ResourceCacheBuilder {
            resource,
            policy: DeliveryPolicy::PeriodicOrDefault,
            cadence: DEFAULT_CADENCE,
            listener: None,
            timers: None,
            liveness_interval: DEFAULT_LIVENESS_INTERVAL,
        }
    }

    /// Register a subscriber and return its fresh, unique, non-zero id.
    ///
    /// For poll-only resources a dedicated timer is armed at `cadence`,
    /// so this subscriber's refresh cycle proceeds independently of any
    /// other. For push-capable resources no per-subscriber timer exists;
    /// the engine's liveness timer covers refresh.
    pub fn add_subscriber(
        &self,
        policy: DeliveryPolicy,
        cadence: Duration,
        listener: Arc<dyn CacheListener>,
    ) -> SubscriberId {
        let mut core = self.inner.lock_core();
        let timer = if self.inner.resource.supports_push() {
            None
        } else {
            Some(self.inner.schedule_timer(cadence))
        };
        let id = core.registry.insert(Subscriber {
            policy,
            cadence,
            timer,
            listener,
        });
        debug!(
            uri = self.inner.resource.uri(),
            %id,
            ?policy,
            subscribers = core.registry.len(),
            "subscriber added"
        );
        id
    }

    /// Remove a subscriber, cancelling its poll timer if one is armed.
    ///
    /// Returns `Some(id)` when the subscriber was registered, `None` when
    /// the id is unknown. Safe to call from within a notification
    /// callback.
    pub fn remove_subscriber(&self, id: SubscriberId) -> Option<SubscriberId> {
        let removed = self.inner.lock_core().registry.remove(id);
        match removed {
            Some(sub) => {
                if let Some(handle) = sub.timer {
                    self.inner.timers.cancel(handle);
                }
                debug!(uri = self.inner.resource.uri(), %id, "subscriber removed");
                Some(id)
            }
            None => {
                debug!(uri = self.inner.resource.uri(), %id, "unknown subscriber id");
                None
            }
        }
    }

    /// A copy of the current snapshot, or an empty attribute set while
    /// the cache is [`Unprimed`](CacheState::Unprimed).
    pub fn cached_data(&self) -> Attributes {
        let core = self.inner.lock_core();
        match core.state {
            CacheState::Ready => (*core.snapshot).clone(),
            CacheState::Unprimed => Attributes::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CacheState {
        self.inner.lock_core().state
    }

    /// The bound resource handle.
    pub fn resource(&self) -> &Arc<dyn RemoteResource> {
        &self.inner.resource
    }
}

impl Inner {
    fn lock_core(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Schedule a one-shot timer whose expiry is routed back into the
    /// engine. The callback holds only a weak reference: firing after the
    /// engine is gone is a silent no-op.
    fn schedule_timer(self: &Arc<Self>, after: Duration) -> TimerHandle {
        let weak = Arc::downgrade(self);
        self.timers.schedule(
            after,
            Box::new(move |handle| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_timer_expired(handle);
                }
            }),
        )
    }

    /// Cancel and re-schedule the liveness timer. Every successful update
    /// resets the liveness clock, so a steady stream of pushes keeps the
    /// safety-net fetch indefinitely deferred.
    fn rearm_liveness(self: &Arc<Self>, core: &mut Core) {
        if let Some(handle) = core.liveness.take() {
            self.timers.cancel(handle);
        }
        core.liveness = Some(self.schedule_timer(self.liveness_interval));
        trace!(
            uri = self.resource.uri(),
            interval_ms = self.liveness_interval.as_millis() as u64,
            "liveness timer armed"
        );
    }

    /// Issue one fetch; the result is routed back through
    /// [`on_fetch_result`](Self::on_fetch_result). Fire-and-forget — the
    /// fetch outlives the engine harmlessly if the owner drops it.
    fn spawn_fetch(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let resource = Arc::clone(&self.resource);
        tokio::spawn(async move {
            let outcome = resource.fetch().await;
            if let Some(inner) = weak.upgrade() {
                inner.on_fetch_result(outcome);
            }
        });
    }

    /// Open the resource's push stream and pump its events into the
    /// engine until the stream ends or the engine is dropped.
    fn spawn_push_pump(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let resource = Arc::clone(&self.resource);
        let pump = tokio::spawn(async move {
            let mut stream = match resource.push_events().await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(uri = resource.uri(), error = %e, "push registration failed");
                    return;
                }
            };
            while let Some(event) = stream.next().await {
                let Some(inner) = weak.upgrade() else { return };
                inner.on_push_notification(event);
            }
            debug!(uri = resource.uri(), "push stream ended");
        });
        *self
            .push_pump
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(pump);
    }

    /// Handle one push notification.
    ///
    /// Failures and empty payloads are dropped without touching state —
    /// an empty push is noise, not "the resource became empty". A payload
    /// with data replaces the snapshot, resets the liveness clock, and
    /// notifies exactly the `ImmediateOnChange` subscribers.
    fn on_push_notification(self: &Arc<Self>, event: PushEvent) {
        let uri = self.resource.uri();
        let attributes = match event.payload {
            Ok(attributes) => attributes,
            Err(e) => {
                warn!(uri, sequence = event.sequence, error = %e, "push failed, dropping");
                metrics::counter!(telemetry::PUSHES_TOTAL,
                    "uri" => uri.to_owned(), "status" => "error")
                .increment(1);
                return;
            }
        };
        if attributes.is_empty() {
            debug!(uri, sequence = event.sequence, "empty push payload, dropping");
            metrics::counter!(telemetry::PUSHES_TOTAL,
                "uri" => uri.to_owned(), "status" => "empty")
            .increment(1);
            return;
        }

        let (snapshot, targets) = {
            let mut core = self.lock_core();
            core.state = CacheState::Ready;
            core.snapshot = Arc::new(attributes);
            if self.resource.supports_push() {
                self.rearm_liveness(&mut core);
            }
            (Arc::clone(&core.snapshot), core.registry.targets(Trigger::Push))
        };

        metrics::counter!(telemetry::PUSHES_TOTAL,
            "uri" => uri.to_owned(), "status" => "ok")
        .increment(1);
        trace!(uri, sequence = event.sequence, "snapshot replaced from push");
        self.notify(targets, &snapshot, Trigger::Push);
    }

    /// Handle the completion of a previously issued fetch.
    ///
    /// The priming fetch only establishes the baseline — no subscriber
    /// hears about it. A refresh replaces the snapshot and notifies every
    /// subscriber that is not `Suppressed`.
    fn on_fetch_result(self: &Arc<Self>, outcome: Result<Attributes>) {
        let uri = self.resource.uri();
        let attributes = match outcome {
            Ok(attributes) => attributes,
            Err(e) => {
                warn!(uri, error = %e, "fetch failed, keeping cached snapshot");
                metrics::counter!(telemetry::FETCHES_TOTAL,
                    "uri" => uri.to_owned(), "status" => "error")
                .increment(1);
                return;
            }
        };

        let (priming, snapshot, targets) = {
            let mut core = self.lock_core();
            let priming = core.state == CacheState::Unprimed;
            core.state = CacheState::Ready;
            core.snapshot = Arc::new(attributes);
            if self.resource.supports_push() {
                self.rearm_liveness(&mut core);
            }
            let targets = if priming {
                Vec::new()
            } else {
                core.registry.targets(Trigger::Fetch)
            };
            (priming, Arc::clone(&core.snapshot), targets)
        };

        metrics::counter!(telemetry::FETCHES_TOTAL,
            "uri" => uri.to_owned(), "status" => "ok")
        .increment(1);
        if priming {
            debug!(uri, "cache primed");
        } else {
            self.notify(targets, &snapshot, Trigger::Fetch);
        }
    }

    /// Route a timer expiry to the liveness branch or to the owning
    /// subscriber's poll branch. Both reissue a fetch; a handle matching
    /// neither is a stale fire (cancelled or removed concurrently) and is
    /// ignored.
    fn on_timer_expired(self: &Arc<Self>, handle: TimerHandle) {
        let uri = self.resource.uri();
        let kind = {
            let mut core = self.lock_core();
            if core.liveness == Some(handle) {
                core.liveness = Some(self.schedule_timer(self.liveness_interval));
                "liveness"
            } else if let Some((id, sub)) = core.registry.subscriber_for_timer(handle) {
                let cadence = sub.cadence;
                sub.timer = Some(self.schedule_timer(cadence));
                trace!(uri, subscriber = %id, "subscriber poll timer fired");
                "subscriber"
            } else {
                "stale"
            }
        };

        metrics::counter!(telemetry::TIMER_FIRES_TOTAL,
            "uri" => uri.to_owned(), "kind" => kind)
        .increment(1);
        match kind {
            "stale" => trace!(uri, timer = handle.get(), "stale timer fire ignored"),
            _ => self.spawn_fetch(),
        }
    }

    /// Invoke listeners outside the lock so they may re-enter the cache.
    fn notify(&self, targets: Vec<Arc<dyn CacheListener>>, snapshot: &Arc<Attributes>, trigger: Trigger) {
        if targets.is_empty() {
            return;
        }
        metrics::counter!(telemetry::NOTIFICATIONS_TOTAL,
            "uri" => self.resource.uri().to_owned(), "trigger" => trigger.as_str())
        .increment(targets.len() as u64);
        for listener in targets {
            listener.on_update(&self.resource, snapshot);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let core = self.core.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = core.liveness.take() {
            self.timers.cancel(handle);
        }
        for handle in core.registry.armed_timers() {
            self.timers.cancel(handle);
        }
        if let Some(pump) = self
            .push_pump
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            pump.abort();
        }
    }
}
