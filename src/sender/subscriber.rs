use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use crate::entities::{TransferOutcome, TransferState};

/// Observer for transfer tasks.
///
/// Subscribers are diagnostic hooks: the capture flow never waits on them and
/// a transfer behaves the same with or without any registered.
pub trait TransferSubscriber: Send + Sync {
    /// Stable identifier for this subscriber (used as a map key).
    fn get_id(&self) -> String;
    /// Receive diagnostic log messages.
    fn log(&self, _message: String) {}
    /// Notified on every state change of a task.
    fn notify_state(&self, _event: TransferStateEvent) {}
    /// Receive progress after each chunk is written.
    fn notify_sending(&self, _event: TransferSendingEvent) {}
    /// Notified once when a task reaches `CLOSED`.
    fn notify_finished(&self, _event: TransferFinishedEvent) {}
}

#[derive(Clone, Debug)]
pub struct TransferStateEvent {
    pub id: String,
    pub state: TransferState,
}

#[derive(Clone, Debug)]
pub struct TransferSendingEvent {
    pub id: String,
    pub sent: u64,
}

#[derive(Clone, Debug)]
pub struct TransferFinishedEvent {
    pub id: String,
    pub outcome: TransferOutcome,
}

/// Registry shared between a sender and every task it spawned.
#[derive(Clone, Default)]
pub(crate) struct Subscribers {
    inner: Arc<RwLock<HashMap<String, Arc<dyn TransferSubscriber>>>>,
}

impl Subscribers {
    pub(crate) fn insert(&self, subscriber: Arc<dyn TransferSubscriber>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(subscriber.get_id(), subscriber);
    }

    pub(crate) fn remove(&self, id: &str) -> bool {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Calls `f` on a snapshot of the registry, taken without holding the
    /// lock during the calls, so a callback may subscribe or unsubscribe.
    pub(crate) fn for_each(&self, f: impl Fn(&dyn TransferSubscriber)) {
        let snapshot: Vec<Arc<dyn TransferSubscriber>> = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for subscriber in snapshot {
            f(subscriber.as_ref());
        }
    }

    pub(crate) fn log(&self, message: String) {
        self.for_each(|s| s.log(message.clone()));
    }
}
