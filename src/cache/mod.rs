//! Cache engine, subscriber registry, and listener seam.

mod engine;
mod listener;
mod registry;

pub use engine::{DEFAULT_CADENCE, DEFAULT_LIVENESS_INTERVAL, ResourceCache, ResourceCacheBuilder};
pub use listener::CacheListener;
