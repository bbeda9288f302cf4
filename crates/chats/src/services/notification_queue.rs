//! Single-slot, self-expiring notices.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::entities::Notification;

#[derive(Default)]
struct Slot {
    current: Option<Notification>,
    generation: u64,
    expiry: Option<JoinHandle<()>>,
}

/// Holds at most one visible notice and removes it after a fixed window.
///
/// A newer notice replaces the visible one and restarts the window.
/// Must be used from within a tokio runtime.
#[derive(Clone)]
pub struct NotificationQueue {
    slot: Arc<Mutex<Slot>>,
    visible_for: Duration,
}

impl NotificationQueue {
    pub fn new(visible_for: Duration) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::default())),
            visible_for,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Display `text`, replacing whatever is visible
    pub fn show(&self, text: impl Into<String>) {
        let mut slot = self.lock();
        if let Some(expiry) = slot.expiry.take() {
            expiry.abort();
        }

        slot.generation += 1;
        slot.current = Some(Notification::new(text));

        let generation = slot.generation;
        let visible_for = self.visible_for;
        let shared = Arc::clone(&self.slot);
        slot.expiry = Some(tokio::spawn(async move {
            tokio::time::sleep(visible_for).await;
            let mut slot = shared.lock().unwrap_or_else(PoisonError::into_inner);
            // a newer notice owns the slot now
            if slot.generation == generation {
                slot.current = None;
                slot.expiry = None;
            }
        }));
    }

    /// The visible notice, if any
    pub fn current(&self) -> Option<Notification> {
        self.lock().current.clone()
    }

    /// Hide the visible notice and stop its timer
    pub fn clear(&self) {
        let mut slot = self.lock();
        if let Some(expiry) = slot.expiry.take() {
            expiry.abort();
        }
        slot.generation += 1;
        slot.current = None;
    }

    pub fn visible_for(&self) -> Duration {
        self.visible_for
    }
}
