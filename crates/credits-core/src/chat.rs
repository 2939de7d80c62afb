//! Correlates a player's next chat line with the workflow waiting for it.
//!
//! A UI action that needs free text (an amount, a name) registers a pending
//! request for one player. The platform's chat listener calls
//! [`ChatCorrelator::complete`] for every line it sees; only a line from a
//! player with a pending request is consumed.
//!
//! Resolution is order-independent. A line that arrives before the
//! workflow attaches its continuation is held in the slot and handed over
//! when [`ChatCorrelator::act`] runs.
//!
//! # Superseded requests
//!
//! At most one request is pending per player. [`ChatCorrelator::add`] on a
//! player who already has one replaces it (last request wins): the earlier
//! continuation is dropped without being called and can never observe a
//! line meant for the newer request. [`ChatCorrelator::remove`] cancels the
//! same way.
//!
//! Continuations run on whichever thread completes the pair, after the
//! registry lock is released, so they may call back into the correlator.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use credits_types::UserId;
use tokio::sync::oneshot;

/// Work to run with the player's line.
pub type Continuation = Box<dyn FnOnce(String) + Send + 'static>;

/// State of one player's pending request.
enum Slot {
    /// No line yet; the continuation may or may not be attached.
    Waiting(Option<Continuation>),
    /// A line arrived before any continuation was attached.
    Resolved(String),
}

/// Registry of pending chat requests, keyed by player.
#[derive(Default)]
pub struct ChatCorrelator {
    pending: Mutex<HashMap<UserId, Slot>>,
}

impl core::fmt::Debug for ChatCorrelator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChatCorrelator")
            .field("pending", &self.len())
            .finish()
    }
}

impl ChatCorrelator {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, Slot>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open (or replace) the pending request for a player.
    pub fn add(&self, id: UserId) {
        let previous = self.lock().insert(id, Slot::Waiting(None));
        if matches!(previous, Some(Slot::Waiting(Some(_)))) {
            tracing::warn!(user = %id, "Superseded a pending chat request");
        }
    }

    /// Attach the continuation for a player's next line.
    ///
    /// If the line has already arrived, `continuation` runs immediately on
    /// the calling thread. Otherwise it runs when the line arrives. A
    /// request is opened if none is pending. Either way the request is
    /// removed once the continuation has its line.
    pub fn act<F>(&self, id: UserId, continuation: F)
    where
        F: FnOnce(String) + Send + 'static,
    {
        let text = {
            let mut pending = self.lock();
            match pending.remove(&id) {
                Some(Slot::Resolved(text)) => text,
                Some(Slot::Waiting(_)) | None => {
                    pending.insert(id, Slot::Waiting(Some(Box::new(continuation))));
                    return;
                }
            }
        };
        continuation(text);
    }

    /// Deliver a chat line from a player.
    ///
    /// Returns `true` if the line was consumed by a pending request. Lines
    /// from players without a request, or a second line for a request that
    /// is already resolved, are ignored.
    pub fn complete(&self, id: UserId, text: impl Into<String>) -> bool {
        let continuation = {
            let mut pending = self.lock();
            match pending.remove(&id) {
                None => return false,
                Some(Slot::Resolved(first)) => {
                    pending.insert(id, Slot::Resolved(first));
                    return false;
                }
                Some(Slot::Waiting(None)) => {
                    pending.insert(id, Slot::Resolved(text.into()));
                    return true;
                }
                Some(Slot::Waiting(Some(continuation))) => continuation,
            }
        };
        continuation(text.into());
        true
    }

    /// Whether a request is pending for a player.
    pub fn contains(&self, id: UserId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Cancel a player's pending request without resolving it.
    ///
    /// Returns `true` if a request was pending.
    pub fn remove(&self, id: UserId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no request is pending.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Cancel every pending request.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Open a request and return a receiver for the player's next line.
    ///
    /// The receiver yields an error if the request is superseded or
    /// removed before a line arrives.
    pub fn next_line(&self, id: UserId) -> oneshot::Receiver<String> {
        let (tx, rx) = oneshot::channel();
        self.add(id);
        self.act(id, move |text| {
            // The waiting task may have given up; nothing to deliver to.
            let _ = tx.send(text);
        });
        rx
    }
}
