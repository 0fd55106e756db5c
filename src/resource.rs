//! The remote resource capability consumed by the cache engine.
//!
//! [`RemoteResource`] abstracts the transport that actually talks to the
//! remote endpoint. The engine only ever issues one-shot fetches and, for
//! push-capable resources, consumes a stream of [`PushEvent`]s — it never
//! blocks on a network exchange itself.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::error::{MuninError, Result};
use crate::types::{Attributes, PushEvent};

/// A boxed stream of push updates from a remote resource.
pub type PushStream = Pin<Box<dyn Stream<Item = PushEvent> + Send>>;

/// A handle to a remote resource the cache keeps a snapshot of.
///
/// Implementations wrap whatever transport performs the actual exchanges
/// (CoAP observe, HTTP long-poll, a message bus, ...). All methods must be
/// safe to call from any task; `fetch` may be called concurrently with an
/// open push stream.
#[async_trait]
pub trait RemoteResource: Send + Sync {
    /// Stable identifier of the resource, used in logs and metric labels.
    fn uri(&self) -> &str;

    /// Whether the resource can actively notify observers of changes.
    ///
    /// Governs the engine's refresh strategy: push-capable resources get a
    /// push subscription plus a liveness safety-net timer; others are
    /// polled at each subscriber's cadence.
    fn supports_push(&self) -> bool;

    /// Issue one fetch of the resource's current attributes.
    async fn fetch(&self) -> Result<Attributes>;

    /// Open the stream of push updates.
    ///
    /// The default stub returns [`MuninError::PushUnsupported`], which is
    /// correct for any resource whose [`supports_push`](Self::supports_push)
    /// is false.
    async fn push_events(&self) -> Result<PushStream> {
        Err(MuninError::PushUnsupported)
    }
}
