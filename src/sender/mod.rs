//! Detached photo transfers.
//!
//! [`PhotoSender::send`] starts one transfer task per call and returns
//! immediately. The task connects to the endpoint it was given, streams the
//! referenced image as raw bytes, and closes the connection; the receiver
//! learns the photo is complete only from the connection closing.
//!
//! Outcomes are deliberately not returned to the caller. A failed transfer is
//! logged and reported to subscribers, and that is the end of it: there is no
//! retry and nothing propagates back into the capture flow.

mod carrier;
mod subscriber;

use std::sync::Arc;

use tokio::{runtime::Handle, task::JoinHandle};
use uuid::Uuid;

use crate::{
    entities::{Endpoint, SourceProvider, TransferState},
    errors::{Result, TransferError},
};
use carrier::Carrier;
use subscriber::Subscribers;

pub use subscriber::{
    TransferFinishedEvent, TransferSendingEvent, TransferStateEvent,
    TransferSubscriber,
};

/// Bytes read from the source and written to the connection per iteration.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SenderConfig {
    chunk_size: usize,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl SenderConfig {
    pub fn with_chunk_size(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(TransferError::InvalidChunkSize);
        }
        Ok(Self { chunk_size })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

/// Starts transfer tasks on a tokio runtime.
///
/// Cloning is cheap; clones share the provider and the subscriber list.
#[derive(Clone)]
pub struct PhotoSender {
    provider: Arc<dyn SourceProvider>,
    config: SenderConfig,
    runtime: Handle,
    subscribers: Subscribers,
}

impl PhotoSender {
    /// Creates a sender bound to the runtime the caller is running on.
    ///
    /// Errors:
    /// - [`TransferError::NoRuntime`] when called outside a tokio runtime.
    pub fn new(
        provider: Arc<dyn SourceProvider>,
        config: SenderConfig,
    ) -> Result<Self> {
        let runtime =
            Handle::try_current().map_err(|_| TransferError::NoRuntime)?;
        Ok(Self::with_runtime(provider, config, runtime))
    }

    /// Creates a sender that spawns onto an explicit runtime, for callers
    /// (such as UI threads) that are not themselves inside one.
    pub fn with_runtime(
        provider: Arc<dyn SourceProvider>,
        config: SenderConfig,
        runtime: Handle,
    ) -> Self {
        Self {
            provider,
            config,
            runtime,
            subscribers: Subscribers::default(),
        }
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    /// Starts a transfer of `reference` to `endpoint` and returns at once.
    ///
    /// The endpoint is taken by value: the task keeps its own copy, so later
    /// edits to the caller's configuration cannot reach it. The returned
    /// handle may be dropped; the task keeps running either way.
    pub fn send(
        &self,
        reference: impl Into<String>,
        endpoint: Endpoint,
    ) -> TransferHandle {
        let id = Uuid::new_v4().to_string();
        let carrier = Carrier {
            id: id.clone(),
            reference: reference.into(),
            endpoint,
            chunk_size: self.config.chunk_size,
            provider: self.provider.clone(),
            subscribers: self.subscribers.clone(),
            state: TransferState::Created,
            sent: 0,
        };

        log::debug!(
            "send: Spawning transfer {id} of {} to {}",
            carrier.reference,
            carrier.endpoint
        );
        let join = self.runtime.spawn(carrier.run());

        TransferHandle { id, join }
    }

    /// Register a subscriber to receive log, state, and progress events of
    /// every transfer this sender has started, including running ones.
    pub fn subscribe(&self, subscriber: Arc<dyn TransferSubscriber>) {
        let subscriber_id = subscriber.get_id();
        self.subscribers.insert(subscriber);
        log::trace!(
            "subscribe: Subscriber {subscriber_id} subscribed. Total subscribers: {}",
            self.subscribers.len()
        );
    }

    /// Remove a previously registered subscriber.
    pub fn unsubscribe(&self, subscriber: Arc<dyn TransferSubscriber>) {
        let subscriber_id = subscriber.get_id();
        if self.subscribers.remove(&subscriber_id) {
            log::trace!("unsubscribe: Subscriber {subscriber_id} removed");
        } else {
            log::trace!(
                "unsubscribe: Subscriber {subscriber_id} was not subscribed"
            );
        }
    }
}

/// Completion signal of a detached transfer.
///
/// The handle carries no result. Waiting on it only tells the caller that
/// the task reached `CLOSED`, not whether the photo arrived.
pub struct TransferHandle {
    id: String,
    join: JoinHandle<()>,
}

impl TransferHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits until the task has released its connection and source.
    pub async fn wait(self) {
        if let Err(e) = self.join.await {
            log::error!("transfer {} aborted: {e}", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryProvider;

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(matches!(
            SenderConfig::with_chunk_size(0),
            Err(TransferError::InvalidChunkSize)
        ));
        assert_eq!(SenderConfig::with_chunk_size(1).unwrap().chunk_size(), 1);
        assert_eq!(SenderConfig::default().chunk_size(), 1000);
    }

    #[test]
    fn new_requires_a_runtime() {
        let provider = Arc::new(MemoryProvider::new());
        assert!(matches!(
            PhotoSender::new(provider, SenderConfig::default()),
            Err(TransferError::NoRuntime)
        ));
    }

    #[test]
    fn with_runtime_spawns_from_outside_the_runtime() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let provider = Arc::new(MemoryProvider::new());
        let sender = PhotoSender::with_runtime(
            provider,
            SenderConfig::with_chunk_size(64).unwrap(),
            runtime.handle().clone(),
        );
        assert_eq!(sender.config().chunk_size(), 64);

        // Nothing listens on port 1; the task fails quietly on its own.
        let handle = sender.send("missing", Endpoint::new("127.0.0.1", 1));
        assert!(!handle.id().is_empty());
        runtime.block_on(handle.wait());
    }
}
