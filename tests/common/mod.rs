//! Shared test doubles: a scriptable remote resource and a recording
//! listener.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use munin::{
    Attributes, CacheListener, MuninError, PushEvent, PushStream, RemoteResource, Result,
};

/// Build an attribute set from `(name, value)` pairs.
pub fn attrs<V: Into<serde_json::Value>>(pairs: impl IntoIterator<Item = (&'static str, V)>) -> Attributes {
    pairs.into_iter().collect()
}

enum FetchScript {
    Ok(Attributes),
    Err(String),
}

/// A scriptable [`RemoteResource`].
///
/// Fetches consume a queue of scripted responses, falling back to a
/// "steady" response once the queue is empty. Push-capable instances hand
/// the test an unbounded sender feeding the push stream.
pub struct MockResource {
    uri: String,
    push_capable: bool,
    scripted: Mutex<VecDeque<FetchScript>>,
    steady: Mutex<Option<Attributes>>,
    fetches: AtomicUsize,
    push_rx: Mutex<Option<mpsc::UnboundedReceiver<PushEvent>>>,
}

impl MockResource {
    /// A poll-only resource.
    pub fn poll_only(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            push_capable: false,
            scripted: Mutex::new(VecDeque::new()),
            steady: Mutex::new(None),
            fetches: AtomicUsize::new(0),
            push_rx: Mutex::new(None),
        }
    }

    /// A push-capable resource plus the sender that feeds its push stream.
    pub fn push_capable(uri: &str) -> (Self, mpsc::UnboundedSender<PushEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut resource = Self::poll_only(uri);
        resource.push_capable = true;
        resource.push_rx = Mutex::new(Some(rx));
        (resource, tx)
    }

    /// Queue one successful fetch response.
    pub fn queue_fetch_ok(&self, attributes: Attributes) {
        self.scripted
            .lock()
            .unwrap()
            .push_back(FetchScript::Ok(attributes));
    }

    /// Queue one failed fetch response.
    pub fn queue_fetch_err(&self, message: &str) {
        self.scripted
            .lock()
            .unwrap()
            .push_back(FetchScript::Err(message.to_string()));
    }

    /// Response returned once the scripted queue is exhausted.
    pub fn set_steady(&self, attributes: Attributes) {
        *self.steady.lock().unwrap() = Some(attributes);
    }

    /// How many fetches the engine has issued so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteResource for MockResource {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn supports_push(&self) -> bool {
        self.push_capable
    }

    async fn fetch(&self) -> Result<Attributes> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(script) = self.scripted.lock().unwrap().pop_front() {
            return match script {
                FetchScript::Ok(attributes) => Ok(attributes),
                FetchScript::Err(message) => Err(MuninError::Fetch(message)),
            };
        }
        match self.steady.lock().unwrap().clone() {
            Some(attributes) => Ok(attributes),
            None => Err(MuninError::Fetch("no scripted response".into())),
        }
    }

    async fn push_events(&self) -> Result<PushStream> {
        let rx = self
            .push_rx
            .lock()
            .unwrap()
            .take()
            .ok_or(MuninError::PushUnsupported)?;
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }
}

/// A listener that records every delivery it receives.
#[derive(Default)]
pub struct RecordingListener {
    deliveries: Mutex<Vec<Attributes>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<Attributes> {
        self.deliveries.lock().unwrap().last().cloned()
    }
}

impl CacheListener for RecordingListener {
    fn on_update(&self, _resource: &std::sync::Arc<dyn RemoteResource>, attributes: &Attributes) {
        self.deliveries.lock().unwrap().push(attributes.clone());
    }
}
