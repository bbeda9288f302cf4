//! The two-party chat session orchestrator.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channel::EventChannel;
use crate::entities::{ChatMessage, FaqTable, Notification, PeerProfile, PresenceState, RoomId};
use crate::repositories::{
    EscalationHandler, HistoryRepository, LoggingEscalationHandler, ProfileDirectory,
};
use crate::types::{ChatError, ChatResult, EventKind, RoomEvent, TypingEvent};

use super::auto_responder::{AutoReply, AutoResponder, ResponderState};
use super::message_store::{DayGroup, MessageStore};
use super::notification_queue::NotificationQueue;
use super::outbox::Outbox;
use super::presence_tracker::PresenceTracker;
use super::typing_indicator::{TypingIndicator, TypingSlot};

/// Default sender identity of automated replies
pub const BOT_SENDER_ID: &str = "bot";

/// Default reply sent when no FAQ entry matches
pub const DEFAULT_FALLBACK_REPLY: &str =
    "Thanks for reaching out! Your query has been forwarded and will be handled within 24 hours.";

/// Tunables of a chat session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Delay before an automated reply is delivered
    pub reply_delay: Duration,
    /// Minimum phrase similarity for an FAQ match
    pub match_threshold: f64,
    /// Sender identity of automated replies
    pub bot_sender_id: String,
    /// Reply sent when nothing matches
    pub fallback_reply: String,
    /// How long a notice stays visible
    pub notification_ttl: Duration,
    /// Input idle window after which the typing indicator stops
    pub typing_idle: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            reply_delay: Duration::from_millis(600),
            match_threshold: 0.85,
            bot_sender_id: BOT_SENDER_ID.to_string(),
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
            notification_ttl: Duration::from_secs(3),
            typing_idle: Duration::from_millis(1_500),
        }
    }
}

/// Collaborators and settings shared by every session of a process
#[derive(Clone)]
pub struct SessionContext {
    pub channel: Arc<dyn EventChannel>,
    pub history: Arc<dyn HistoryRepository>,
    pub profiles: Option<Arc<dyn ProfileDirectory>>,
    pub escalation: Arc<dyn EscalationHandler>,
    pub faq: Arc<FaqTable>,
    pub settings: SessionSettings,
}

impl SessionContext {
    /// Context with the built-in FAQ table, default settings, and logging
    /// escalations
    pub fn new(channel: Arc<dyn EventChannel>, history: Arc<dyn HistoryRepository>) -> Self {
        Self {
            channel,
            history,
            profiles: None,
            escalation: Arc::new(LoggingEscalationHandler),
            faq: FaqTable::builtin(),
            settings: SessionSettings::default(),
        }
    }

    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileDirectory>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn with_escalation(mut self, escalation: Arc<dyn EscalationHandler>) -> Self {
        self.escalation = escalation;
        self
    }

    pub fn with_faq(mut self, faq: Arc<FaqTable>) -> Self {
        self.faq = faq;
        self
    }

    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Open a session between `local_id` and `remote_id`
    pub async fn open(
        &self,
        local_id: impl Into<String>,
        remote_id: impl Into<String>,
    ) -> ChatResult<ChatSession> {
        ChatSession::open(self, local_id, remote_id).await
    }
}

/// Snapshot of everything the presentation layer renders
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub room: RoomId,
    pub local_id: String,
    pub peer: PeerProfile,
    pub presence: PresenceState,
    pub messages: Vec<ChatMessage>,
    pub unread_count: usize,
    pub notification: Option<Notification>,
    pub error: Option<String>,
    pub responder: ResponderState,
    pub is_open: bool,
}

/// Mutable state of one session, serialized behind a single mutex
struct SessionState {
    store: MessageStore,
    presence: PresenceTracker,
    responder: AutoResponder,
    error: Option<String>,
    pending_replies: Vec<JoinHandle<()>>,
    typing_slots: Vec<Weak<Mutex<TypingSlot>>>,
    closed: bool,
}

struct Shared {
    local_id: String,
    remote_id: String,
    room: RoomId,
    peer: PeerProfile,
    settings: SessionSettings,
    notifications: NotificationQueue,
    state: Mutex<SessionState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_error(&self, error: String) {
        self.lock().error = Some(error);
    }

    /// Route one inbound event to the component that owns it
    fn dispatch(&self, event: RoomEvent) {
        let mut state = self.lock();
        if state.closed {
            return;
        }

        match event {
            RoomEvent::NewMessage(mut message) => {
                if message.room_id != self.room {
                    debug!(room = %message.room_id, "ignoring message for another room");
                    return;
                }
                // own sends are already in the store
                if message.is_from(&self.local_id) || state.store.contains(&message.id) {
                    return;
                }
                message.read = false;
                state.store.append(message);
            }
            RoomEvent::Typing(event) => {
                state.presence.on_peer_typing(&event.user_id, event.is_typing);
            }
            RoomEvent::Presence(event) => {
                state.presence.on_peer_online(&event.user_id, event.is_online);
            }
            RoomEvent::Notification(event) => {
                if event.sender != self.local_id {
                    self.notifications.show(event.body);
                }
            }
        }
    }

    /// Land a scheduled automated reply unless the session closed meanwhile
    fn deliver_reply(&self, body: String) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        let reply = ChatMessage::new(
            self.settings.bot_sender_id.clone(),
            self.local_id.clone(),
            self.room.clone(),
            body,
        )
        .into_read();
        state.store.append(reply);
    }
}

/// A live conversation between the local user and one remote peer.
///
/// Dropping the session stops its background tasks, but only
/// [`ChatSession::close`] releases the channel subscriptions.
pub struct ChatSession {
    shared: Arc<Shared>,
    channel: Arc<dyn EventChannel>,
    escalation: Arc<dyn EscalationHandler>,
    outbox: Outbox,
    publisher: Option<JoinHandle<()>>,
    listeners: Vec<(EventKind, JoinHandle<()>)>,
}

impl ChatSession {
    /// Join the room, load history, and subscribe to live events.
    ///
    /// A history failure does not abort opening: the store stays empty and
    /// the error is surfaced through [`SessionView::error`] and a notice. A
    /// failure to join or subscribe aborts, releasing any subscription
    /// already taken.
    pub async fn open(
        context: &SessionContext,
        local_id: impl Into<String>,
        remote_id: impl Into<String>,
    ) -> ChatResult<Self> {
        let local_id = local_id.into();
        let remote_id = remote_id.into();
        let room = RoomId::derive(&local_id, &remote_id);
        let channel = Arc::clone(&context.channel);

        info!(room = %room, local_id, remote_id, "opening chat session");

        channel.join(&room, &local_id).await?;

        let mut store = MessageStore::new();
        let history_error = match store.load_history(context.history.as_ref(), &room).await {
            Ok(count) => {
                debug!(room = %room, count, "message history loaded");
                None
            }
            Err(error) => {
                warn!(room = %room, %error, "failed to load message history");
                Some(error.to_string())
            }
        };

        let peer = lookup_peer(context.profiles.as_deref(), &remote_id).await;

        let settings = context.settings.clone();
        let responder = AutoResponder::new(
            Arc::clone(&context.faq),
            settings.match_threshold,
            settings.fallback_reply.clone(),
        );
        let notifications = NotificationQueue::new(settings.notification_ttl);
        if let Some(error) = &history_error {
            notifications.show(error.clone());
        }

        let shared = Arc::new(Shared {
            local_id: local_id.clone(),
            remote_id: remote_id.clone(),
            room: room.clone(),
            peer,
            settings,
            notifications,
            state: Mutex::new(SessionState {
                store,
                presence: PresenceTracker::new(remote_id),
                responder,
                error: history_error,
                pending_replies: Vec::new(),
                typing_slots: Vec::new(),
                closed: false,
            }),
        });

        let mut listeners = Vec::with_capacity(EventKind::ALL.len());
        for kind in EventKind::ALL {
            match channel.subscribe(&room, kind).await {
                Ok(receiver) => {
                    let handle = tokio::spawn(listen(kind, receiver, Arc::downgrade(&shared)));
                    listeners.push((kind, handle));
                }
                Err(error) => {
                    warn!(room = %room, %kind, %error, "subscription failed, rolling back");
                    if let Err(release_error) =
                        release_listeners(channel.as_ref(), &room, listeners).await
                    {
                        warn!(room = %room, error = %release_error, "rollback incomplete");
                    }
                    if let Err(leave_error) = channel.leave(&room, &local_id).await {
                        debug!(room = %room, error = %leave_error, "leave after failed open");
                    }
                    return Err(error);
                }
            }
        }

        let error_sink = Arc::downgrade(&shared);
        let (outbox, publisher) = Outbox::spawn(Arc::clone(&channel), room.clone(), move |error| {
            if let Some(shared) = error_sink.upgrade() {
                shared.record_error(error);
            }
        });

        info!(room = %room, "chat session ready");

        Ok(Self {
            shared,
            channel,
            escalation: Arc::clone(&context.escalation),
            outbox,
            publisher: Some(publisher),
            listeners,
        })
    }

    /// Send a message typed by the local user.
    ///
    /// Blank input is ignored and yields `Ok(None)`. The message is appended
    /// right away, published in the background, and answered by the
    /// auto-responder while it is still active.
    pub fn send(&self, text: &str) -> ChatResult<Option<ChatMessage>> {
        let body = text.trim();
        if body.is_empty() {
            return Ok(None);
        }

        let shared = &self.shared;
        let mut state = shared.lock();
        if state.closed {
            return Err(ChatError::SessionClosed);
        }

        let message = ChatMessage::new(
            shared.local_id.clone(),
            shared.remote_id.clone(),
            shared.room.clone(),
            body,
        )
        .into_read();

        state.store.append(message.clone());
        self.outbox.publish(RoomEvent::NewMessage(message.clone()));

        if let Some(reply) = state.responder.evaluate(&message, &shared.local_id) {
            state.pending_replies.retain(|handle| !handle.is_finished());
            let handle = self.schedule_reply(reply);
            state.pending_replies.push(handle);
        }

        Ok(Some(message))
    }

    fn schedule_reply(&self, reply: AutoReply) -> JoinHandle<()> {
        let AutoReply { body, escalation, .. } = reply;

        if let Some(ticket) = escalation {
            let handler = Arc::clone(&self.escalation);
            let sink = Arc::downgrade(&self.shared);
            tokio::spawn(async move {
                if let Err(error) = handler.escalate(ticket).await {
                    warn!(%error, "escalation handler failed");
                    if let Some(shared) = sink.upgrade() {
                        shared.record_error(error.to_string());
                    }
                }
            });
        }

        let delay = self.shared.settings.reply_delay;
        let shared = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = shared.upgrade() {
                shared.deliver_reply(body);
            }
        })
    }

    /// Publish the local user's typing state
    pub fn set_typing(&self, is_typing: bool) -> ChatResult<()> {
        if self.shared.lock().closed {
            return Err(ChatError::SessionClosed);
        }
        self.outbox.publish(RoomEvent::Typing(TypingEvent {
            user_id: self.shared.local_id.clone(),
            is_typing,
        }));
        Ok(())
    }

    /// Debounced typing signal for the input surface of this session
    pub fn typing_indicator(&self) -> TypingIndicator {
        let indicator = TypingIndicator::new(
            self.outbox.clone(),
            self.shared.local_id.clone(),
            self.shared.settings.typing_idle,
        );
        let mut state = self.shared.lock();
        state.typing_slots.retain(|slot| slot.strong_count() > 0);
        state.typing_slots.push(Arc::downgrade(indicator.slot()));
        indicator
    }

    /// Flag every stored message as read, returning how many changed
    pub fn mark_all_read(&self) -> usize {
        self.shared.lock().store.mark_all_read()
    }

    /// Show a notice to the local user
    pub fn notify(&self, text: impl Into<String>) {
        self.shared.notifications.show(text);
    }

    /// Forget the current error, e.g. after the user dismissed it
    pub fn dismiss_error(&self) {
        self.shared.lock().error = None;
    }

    pub fn room(&self) -> &RoomId {
        &self.shared.room
    }

    pub fn local_id(&self) -> &str {
        &self.shared.local_id
    }

    pub fn remote_id(&self) -> &str {
        &self.shared.remote_id
    }

    pub fn peer(&self) -> &PeerProfile {
        &self.shared.peer
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.shared.lock().store.messages().to_vec()
    }

    pub fn day_groups(&self) -> Vec<DayGroup> {
        self.shared.lock().store.day_groups()
    }

    pub fn unread_count(&self) -> usize {
        self.shared.lock().store.unread_count()
    }

    pub fn presence(&self) -> PresenceState {
        self.shared.lock().presence.state()
    }

    pub fn responder_state(&self) -> ResponderState {
        self.shared.lock().responder.state()
    }

    pub fn error(&self) -> Option<String> {
        self.shared.lock().error.clone()
    }

    pub fn notification(&self) -> Option<Notification> {
        self.shared.notifications.current()
    }

    pub fn is_open(&self) -> bool {
        !self.shared.lock().closed
    }

    /// Compose the full view state
    pub fn view(&self) -> SessionView {
        let shared = &self.shared;
        let notification = shared.notifications.current();
        let state = shared.lock();
        SessionView {
            room: shared.room.clone(),
            local_id: shared.local_id.clone(),
            peer: shared.peer.clone(),
            presence: state.presence.state(),
            messages: state.store.messages().to_vec(),
            unread_count: state.store.unread_count(),
            notification,
            error: state.error.clone(),
            responder: state.responder.state(),
            is_open: !state.closed,
        }
    }

    /// Tear the session down.
    ///
    /// Pending automated replies and typing timers are cancelled, queued
    /// publishes are flushed, and every subscription is released. Calling
    /// it again is a no-op.
    pub async fn close(&mut self) -> ChatResult<()> {
        {
            let mut state = self.shared.lock();
            if state.closed {
                return Ok(());
            }
            state.closed = true;
            for handle in state.pending_replies.drain(..) {
                handle.abort();
            }
            for slot in state.typing_slots.drain(..) {
                if let Some(slot) = slot.upgrade() {
                    slot.lock().unwrap_or_else(PoisonError::into_inner).cancel();
                }
            }
        }
        self.shared.notifications.clear();

        let room = self.shared.room.clone();
        self.outbox.flush_and_stop().await;
        self.publisher = None;

        let listeners = std::mem::take(&mut self.listeners);
        let released = release_listeners(self.channel.as_ref(), &room, listeners).await;

        if let Err(error) = self.channel.leave(&room, &self.shared.local_id).await {
            warn!(room = %room, %error, "failed to leave room");
        }

        info!(room = %room, "chat session closed");
        released
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.closed = true;
        for handle in state.pending_replies.drain(..) {
            handle.abort();
        }
        drop(state);

        for (_, handle) in &self.listeners {
            handle.abort();
        }
        if let Some(publisher) = self.publisher.take() {
            publisher.abort();
        }
    }
}

async fn lookup_peer(profiles: Option<&dyn ProfileDirectory>, remote_id: &str) -> PeerProfile {
    let Some(profiles) = profiles else {
        return PeerProfile::fallback(remote_id);
    };

    match profiles.lookup(remote_id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            debug!(remote_id, "peer has no profile");
            PeerProfile::fallback(remote_id)
        }
        Err(error) => {
            warn!(remote_id, %error, "peer profile lookup failed");
            PeerProfile::fallback(remote_id)
        }
    }
}

/// Forward events of one kind into the session until the channel closes
async fn listen(kind: EventKind, mut receiver: broadcast::Receiver<RoomEvent>, shared: Weak<Shared>) {
    loop {
        match receiver.recv().await {
            Ok(event) => {
                let Some(shared) = shared.upgrade() else { break };
                if event.kind() != kind {
                    continue;
                }
                shared.dispatch(event);
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(%kind, skipped, "listener lagged behind, events dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
    debug!(%kind, "listener stopped");
}

/// Stop listener tasks and release their subscriptions, reporting the first
/// failure after attempting all of them
async fn release_listeners(
    channel: &dyn EventChannel,
    room: &RoomId,
    listeners: Vec<(EventKind, JoinHandle<()>)>,
) -> ChatResult<()> {
    let mut first_error = None;
    for (kind, handle) in listeners {
        handle.abort();
        if let Err(error) = channel.unsubscribe(room, kind).await {
            warn!(room = %room, %kind, %error, "failed to unsubscribe");
            first_error.get_or_insert(error);
        }
    }
    first_error.map_or(Ok(()), Err)
}
