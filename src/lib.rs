//! Munin - attribute cache and change-notification engine for remote
//! resources
//!
//! This crate keeps one local snapshot of a remote resource's attributes
//! fresh — via push notifications when the resource supports them, via
//! timer-driven refresh otherwise — and fans updates out to subscribers,
//! each with its own delivery policy and cadence.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use munin::{Attributes, DeliveryPolicy, RemoteResource, ResourceCache};
//!
//! # async fn demo(resource: Arc<dyn RemoteResource>) -> munin::Result<()> {
//! let cache = ResourceCache::builder(resource)
//!     .policy(DeliveryPolicy::ImmediateOnChange)
//!     .listener(Arc::new(
//!         |_: &Arc<dyn RemoteResource>, attrs: &Attributes| {
//!             println!("snapshot updated: {attrs:?}");
//!         },
//!     ))
//!     .build()?;
//!
//! // Pull-style subscribers read the snapshot when they care.
//! let id = cache.add_subscriber(
//!     DeliveryPolicy::Suppressed,
//!     Duration::from_secs(30),
//!     Arc::new(|_: &Arc<dyn RemoteResource>, _: &Attributes| {}),
//! );
//! let snapshot = cache.cached_data(); // empty until the cache is primed
//! cache.remove_subscriber(id);
//! # let _ = snapshot;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod resource;
pub mod telemetry;
pub mod timer;
pub mod types;

// Re-export main types at crate root
pub use cache::{
    CacheListener, DEFAULT_CADENCE, DEFAULT_LIVENESS_INTERVAL, ResourceCache, ResourceCacheBuilder,
};
pub use error::{MuninError, Result};
pub use resource::{PushStream, RemoteResource};
pub use timer::{TimerCallback, TimerHandle, TimerService, TokioTimers};
pub use types::{Attributes, CacheState, DeliveryPolicy, PushEvent, SubscriberId};
