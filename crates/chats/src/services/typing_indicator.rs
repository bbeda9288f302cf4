//! Debounced local typing signal, owned by the input surface.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::types::{RoomEvent, TypingEvent};

use super::outbox::Outbox;

/// `Idle -> Typing(timer) -> Idle`
#[derive(Default)]
enum TypingState {
    #[default]
    Idle,
    Typing(JoinHandle<()>),
}

#[derive(Default)]
pub(crate) struct TypingSlot {
    state: TypingState,
    generation: u64,
}

impl TypingSlot {
    /// Drop back to idle without publishing anything
    pub(crate) fn cancel(&mut self) {
        if let TypingState::Typing(timer) = std::mem::take(&mut self.state) {
            timer.abort();
        }
        self.generation += 1;
    }
}

/// Publishes "typing" on the first keystroke and "stopped" after the input
/// has been idle for a fixed window, or right away when the message is sent.
///
/// Dropping the indicator cancels a pending stop timer.
pub struct TypingIndicator {
    outbox: Outbox,
    user_id: String,
    idle_after: Duration,
    slot: Arc<Mutex<TypingSlot>>,
}

impl TypingIndicator {
    pub(crate) fn new(outbox: Outbox, user_id: String, idle_after: Duration) -> Self {
        Self {
            outbox,
            user_id,
            idle_after,
            slot: Arc::new(Mutex::new(TypingSlot::default())),
        }
    }

    pub(crate) fn slot(&self) -> &Arc<Mutex<TypingSlot>> {
        &self.slot
    }

    fn lock(&self) -> MutexGuard<'_, TypingSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn typing_event(user_id: &str, is_typing: bool) -> RoomEvent {
        RoomEvent::Typing(TypingEvent {
            user_id: user_id.to_string(),
            is_typing,
        })
    }

    /// Record a keystroke
    pub fn input(&self) {
        let mut slot = self.lock();
        match std::mem::take(&mut slot.state) {
            TypingState::Idle => {
                self.outbox.publish(Self::typing_event(&self.user_id, true));
            }
            TypingState::Typing(timer) => timer.abort(),
        }

        slot.generation += 1;
        let generation = slot.generation;
        let shared = Arc::clone(&self.slot);
        let outbox = self.outbox.clone();
        let user_id = self.user_id.clone();
        let idle_after = self.idle_after;

        slot.state = TypingState::Typing(tokio::spawn(async move {
            tokio::time::sleep(idle_after).await;
            let mut slot = shared.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.generation != generation {
                return;
            }
            slot.state = TypingState::Idle;
            outbox.publish(Self::typing_event(&user_id, false));
        }));
    }

    /// The message was sent: stop typing now
    pub fn message_sent(&self) {
        let mut slot = self.lock();
        if matches!(slot.state, TypingState::Typing(_)) {
            slot.cancel();
            self.outbox.publish(Self::typing_event(&self.user_id, false));
        }
    }

    pub fn is_typing(&self) -> bool {
        matches!(self.lock().state, TypingState::Typing(_))
    }

    /// Abandon the pending stop timer without publishing
    pub fn cancel(&self) {
        self.lock().cancel();
    }
}

impl Drop for TypingIndicator {
    fn drop(&mut self) {
        self.cancel();
    }
}
