//! Public types for the munin API.

mod attributes;
mod policy;

pub use attributes::Attributes;
pub use policy::{CacheState, DeliveryPolicy, PushEvent, SubscriberId};
