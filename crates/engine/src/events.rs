//! Change notifications for ledger mutations.
//!
//! Every successful mutation publishes a [`LedgerChange`]. The hub is a
//! small explicit publish-subscribe channel rather than a broadcast
//! primitive: emitters never block, each subscriber gets its own bounded
//! buffer, and events published while nobody is subscribed are parked in a
//! bounded pending queue handed to the first subscriber (no replay of
//! history beyond that buffer).

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::NaiveDate;
use tokio::sync::mpsc;
use uuid::Uuid;

/// What changed. Enough for collaborators to refresh the right views.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerChange {
    EntryPersisted { id: Uuid },
    EntryUpdated { id: Uuid },
    EntryDeleted { id: Uuid },
    RulePersisted { id: Uuid },
    RuleUpdated { id: Uuid, pivot: Option<NaiveDate> },
    RuleDeleted { id: Uuid },
    RuleEntriesDeleted { id: Uuid },
    Restored,
}

/// Per-subscriber buffer; events beyond it are dropped for that subscriber.
const SUBSCRIBER_BUFFER: usize = 32;
/// Events parked while no subscriber exists.
const PENDING_BUFFER: usize = 32;

#[derive(Debug, Default)]
struct HubState {
    pending: VecDeque<LedgerChange>,
    subscribers: Vec<mpsc::Sender<LedgerChange>>,
}

/// Multicast hub for [`LedgerChange`] events.
#[derive(Debug, Default)]
pub struct ChangeHub {
    state: Mutex<HubState>,
}

impl ChangeHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a change without ever blocking the emitter.
    ///
    /// Slow subscribers lose the newest events once their buffer is full;
    /// closed subscribers are dropped.
    pub fn publish(&self, change: LedgerChange) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };

        if state.subscribers.is_empty() {
            if state.pending.len() == PENDING_BUFFER {
                state.pending.pop_front();
            }
            state.pending.push_back(change);
            return;
        }

        state.subscribers.retain(|tx| match tx.try_send(change.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(?change, "dropping change for slow subscriber");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    /// Registers a new subscriber.
    ///
    /// The first subscriber drains the pending queue accumulated while
    /// nobody was listening.
    pub fn subscribe(&self) -> ChangeStream {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };

        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        for change in state.pending.drain(..) {
            // Buffer sizes match, the fresh channel cannot be full.
            let _ = tx.try_send(change);
        }
        state.subscribers.push(tx);
        ChangeStream { rx }
    }
}

/// Receiving side of the hub.
#[derive(Debug)]
pub struct ChangeStream {
    rx: mpsc::Receiver<LedgerChange>,
}

impl ChangeStream {
    /// Waits for the next change; `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<LedgerChange> {
        self.rx.recv().await
    }

    /// Non-blocking poll, for collaborators draining on their own schedule.
    pub fn try_recv(&mut self) -> Option<LedgerChange> {
        self.rx.try_recv().ok()
    }
}
