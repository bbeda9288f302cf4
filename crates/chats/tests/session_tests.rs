//! Integration tests for chat sessions running over the in-process channel.

use std::sync::Arc;
use std::time::Duration;

use concierge_chats::{
    ChatError, ChatMessage, EscalationStatus, EventChannel, EventKind, FaqEntry, FaqTable,
    HistoryRecord, InMemoryHistoryRepository, InMemoryProfileDirectory, LocalEventChannel,
    PeerProfile, RecordingEscalationHandler, ResponderState, RoomEvent, RoomId, SessionContext,
    SessionSettings,
};
use concierge_chats::types::NoticeEvent;

const HI_ANSWER: &str = "Hi there! How can I assist you today?";
const FALLBACK: &str = "Your query will be handled within 24 hours.";

struct Harness {
    channel: Arc<LocalEventChannel>,
    history: Arc<InMemoryHistoryRepository>,
    escalations: Arc<RecordingEscalationHandler>,
    context: SessionContext,
}

fn harness() -> Harness {
    let channel = Arc::new(LocalEventChannel::new(64));
    let history = Arc::new(InMemoryHistoryRepository::new());
    let escalations = Arc::new(RecordingEscalationHandler::new());
    let faq = FaqTable::new(vec![
        FaqEntry::new("hi", HI_ANSWER),
        FaqEntry::new("are pets allowed", "Pets are welcome."),
    ]);
    let settings = SessionSettings {
        fallback_reply: FALLBACK.to_string(),
        ..SessionSettings::default()
    };

    let context = SessionContext::new(channel.clone(), history.clone())
        .with_escalation(escalations.clone())
        .with_faq(Arc::new(faq))
        .with_settings(settings);

    Harness {
        channel,
        history,
        escalations,
        context,
    }
}

/// Let spawned publishers and listeners run; the clock is paused so this
/// only advances virtual time.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

fn bot_messages(messages: &[ChatMessage]) -> Vec<&ChatMessage> {
    messages.iter().filter(|m| m.sender_id == "bot").collect()
}

fn record(sender: Option<&str>, receiver: Option<&str>, body: Option<&str>) -> HistoryRecord {
    HistoryRecord {
        sender: sender.map(str::to_string),
        receiver: receiver.map(str::to_string),
        body: body.map(str::to_string),
        ..HistoryRecord::default()
    }
}

#[tokio::test(start_paused = true)]
async fn send_appends_one_trimmed_read_message() {
    let h = harness();
    let mut session = h.context.open("alice", "bob").await.unwrap();

    let sent = session.send("   are pets allowed   ").unwrap().unwrap();

    let messages = session.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0], sent);
    assert_eq!(sent.body, "are pets allowed");
    assert!(sent.read);
    assert_eq!(sent.sender_id, "alice");
    assert_eq!(sent.receiver_id, "bob");
    assert_eq!(sent.room_id, RoomId::derive("bob", "alice"));

    session.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn blank_input_is_ignored() {
    let h = harness();
    let mut session = h.context.open("alice", "bob").await.unwrap();

    assert!(session.send("").unwrap().is_none());
    assert!(session.send("   ").unwrap().is_none());
    assert!(session.send("\n\t").unwrap().is_none());
    settle().await;

    assert!(session.messages().is_empty());
    assert_eq!(session.responder_state(), ResponderState::Active);
    session.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn faq_match_is_answered_after_the_reply_delay() {
    let h = harness();
    let mut session = h.context.open("alice", "bob").await.unwrap();

    session.send("hi").unwrap();

    tokio::time::sleep(Duration::from_millis(599)).await;
    assert_eq!(session.messages().len(), 1);

    tokio::time::sleep(Duration::from_millis(2)).await;
    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    let reply = &messages[1];
    assert_eq!(reply.sender_id, "bot");
    assert_eq!(reply.receiver_id, "alice");
    assert_eq!(reply.body, HI_ANSWER);
    assert!(reply.read);

    assert_eq!(session.responder_state(), ResponderState::Active);
    assert!(h.escalations.tickets().is_empty());
    session.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn misspelt_greeting_is_answered_from_the_builtin_table() {
    let channel = Arc::new(LocalEventChannel::new(64));
    let escalations = Arc::new(RecordingEscalationHandler::new());
    let context = SessionContext::new(channel, Arc::new(InMemoryHistoryRepository::new()))
        .with_escalation(escalations.clone())
        .with_faq(FaqTable::builtin());
    let mut session = context.open("alice", "bob").await.unwrap();

    session.send("helo").unwrap();
    tokio::time::sleep(Duration::from_millis(700)).await;

    let messages = session.messages();
    let bots = bot_messages(&messages);
    assert_eq!(bots.len(), 1);
    assert_eq!(bots[0].body, "Hello! How can I help you with this property?");
    assert_eq!(session.responder_state(), ResponderState::Active);
    assert!(escalations.tickets().is_empty());
    session.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn unmatched_question_falls_back_and_escalates_once() {
    let h = harness();
    let mut session = h.context.open("alice", "bob").await.unwrap();

    session.send("can I repaint the bedroom").unwrap();
    assert_eq!(session.responder_state(), ResponderState::Escalated);
    tokio::time::sleep(Duration::from_millis(700)).await;

    let messages = session.messages();
    let bots = bot_messages(&messages);
    assert_eq!(bots.len(), 1);
    assert_eq!(bots[0].body, FALLBACK);

    let tickets = h.escalations.tickets();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].room_id, RoomId::derive("alice", "bob"));
    assert_eq!(tickets[0].last_message_text, "can I repaint the bedroom");
    assert_eq!(tickets[0].status, EscalationStatus::Pending);
    assert!(tickets[0].last_resolved_at.is_none());

    session.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn escalated_session_never_answers_again() {
    let h = harness();
    let mut session = h.context.open("alice", "bob").await.unwrap();

    session.send("something the bot cannot know").unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    session.send("hi").unwrap();
    session.send("are pets allowed").unwrap();
    session.send("yet another unknown question").unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let messages = session.messages();
    assert_eq!(messages.len(), 5);
    assert_eq!(bot_messages(&messages).len(), 1);
    assert_eq!(h.escalations.tickets().len(), 1);
    assert_eq!(session.responder_state(), ResponderState::Escalated);

    session.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn two_quick_misses_still_produce_one_fallback() {
    let h = harness();
    let mut session = h.context.open("alice", "bob").await.unwrap();

    session.send("first odd question").unwrap();
    session.send("second odd question").unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(bot_messages(&session.messages()).len(), 1);
    assert_eq!(h.escalations.tickets().len(), 1);
    session.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn closing_cancels_a_pending_reply() {
    let h = harness();
    let mut session = h.context.open("alice", "bob").await.unwrap();

    session.send("hi").unwrap();
    session.close().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let messages = session.messages();
    assert_eq!(messages.len(), 1);
    assert!(bot_messages(&messages).is_empty());
    assert!(!session.is_open());
    assert!(matches!(session.send("hello?"), Err(ChatError::SessionClosed)));
}

#[tokio::test(start_paused = true)]
async fn closing_inside_the_delay_still_files_the_ticket() {
    let h = harness();
    let mut session = h.context.open("alice", "bob").await.unwrap();

    session.send("can I repaint the bedroom").unwrap();
    settle().await;
    session.close().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(bot_messages(&session.messages()).is_empty());
    let tickets = h.escalations.tickets();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].last_message_text, "can I repaint the bedroom");
}

#[tokio::test(start_paused = true)]
async fn history_is_loaded_and_malformed_records_dropped() {
    let h = harness();
    let room = RoomId::derive("alice", "bob");
    h.history
        .seed(
            &room,
            vec![
                record(Some("bob"), Some("alice"), Some("Welcome!")),
                record(None, Some("alice"), Some("orphan")),
                record(Some("alice"), Some("bob"), None),
                record(Some("alice"), None, Some("to nobody")),
                record(Some("alice"), Some("bob"), Some("Thanks")),
            ],
        )
        .await;

    let mut session = h.context.open("alice", "bob").await.unwrap();

    let bodies: Vec<String> = session.messages().into_iter().map(|m| m.body).collect();
    assert_eq!(bodies, ["Welcome!", "Thanks"]);
    assert!(session.error().is_none());
    session.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn history_failure_is_surfaced_not_retried() {
    let h = harness();
    h.history.fail_with("history service unavailable").await;

    let mut session = h.context.open("alice", "bob").await.unwrap();

    assert!(session.messages().is_empty());
    let error = session.error().expect("error should be surfaced");
    assert!(error.contains("history service unavailable"), "got {error}");
    assert!(session.notification().is_some());

    // the session is still usable
    session.send("hello").unwrap();
    assert_eq!(session.messages().len(), 1);
    session.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn mark_all_read_is_idempotent() {
    let h = harness();
    let room = RoomId::derive("alice", "bob");
    h.history
        .seed(
            &room,
            vec![
                record(Some("bob"), Some("alice"), Some("one")),
                record(Some("bob"), Some("alice"), Some("two")),
            ],
        )
        .await;

    let mut session = h.context.open("alice", "bob").await.unwrap();
    assert_eq!(session.unread_count(), 2);

    assert_eq!(session.mark_all_read(), 2);
    let once = session.messages();
    assert_eq!(session.mark_all_read(), 0);

    assert_eq!(session.messages(), once);
    assert!(once.iter().all(|m| m.read));
    assert_eq!(session.unread_count(), 0);
    session.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn peers_exchange_messages_without_echo_duplicates() {
    let h = harness();
    let mut alice = h.context.open("alice", "bob").await.unwrap();
    let mut bob = h.context.open("bob", "alice").await.unwrap();
    settle().await;

    alice.send("can I repaint the bedroom").unwrap();
    settle().await;
    bob.send("Sure, any colour you like").unwrap();
    settle().await;

    let alice_humans: Vec<_> = alice
        .messages()
        .into_iter()
        .filter(|m| m.sender_id != "bot")
        .collect();
    assert_eq!(alice_humans.len(), 2);
    assert!(alice_humans[0].read);
    assert_eq!(alice_humans[1].sender_id, "bob");
    assert!(!alice_humans[1].read);

    // each side runs its own responder, bot replies stay local
    let bob_humans: Vec<_> = bob
        .messages()
        .into_iter()
        .filter(|m| m.sender_id != "bot")
        .collect();
    assert_eq!(bob_humans.len(), 2);
    assert_eq!(bob_humans[0].sender_id, "alice");
    assert!(!bob_humans[0].read);
    assert_eq!(bob.unread_count(), 1);

    alice.close().await.unwrap();
    bob.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn peer_messages_never_trigger_the_responder() {
    let h = harness();
    let mut alice = h.context.open("alice", "bob").await.unwrap();
    let mut bob = h.context.open("bob", "alice").await.unwrap();

    h.channel
        .publish(
            &RoomId::derive("alice", "bob"),
            RoomEvent::NewMessage(ChatMessage::new(
                "bob",
                "alice",
                RoomId::derive("alice", "bob"),
                "nothing in the faq looks like this",
            )),
        )
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(alice.messages().len(), 1);
    assert_eq!(alice.responder_state(), ResponderState::Active);
    assert!(h.escalations.tickets().is_empty());

    alice.close().await.unwrap();
    bob.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn foreign_and_duplicate_messages_are_ignored() {
    let h = harness();
    let room = RoomId::derive("alice", "bob");
    let mut session = h.context.open("alice", "bob").await.unwrap();

    let message = ChatMessage::new("bob", "alice", room.clone(), "only once");
    h.channel
        .publish(&room, RoomEvent::NewMessage(message.clone()))
        .await
        .unwrap();
    h.channel
        .publish(&room, RoomEvent::NewMessage(message))
        .await
        .unwrap();

    let stray = ChatMessage::new("bob", "alice", RoomId::derive("bob", "carol"), "wrong room");
    h.channel
        .publish(&room, RoomEvent::NewMessage(stray))
        .await
        .unwrap();
    settle().await;

    let bodies: Vec<String> = session.messages().into_iter().map(|m| m.body).collect();
    assert_eq!(bodies, ["only once"]);
    session.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn presence_and_typing_follow_the_peer() {
    let h = harness();
    let mut alice = h.context.open("alice", "bob").await.unwrap();
    assert!(!alice.presence().is_online);

    let mut bob = h.context.open("bob", "alice").await.unwrap();
    settle().await;
    assert!(alice.presence().is_online);

    bob.set_typing(true).unwrap();
    settle().await;
    assert!(alice.presence().is_typing);
    // own typing never shows up locally
    assert!(!bob.presence().is_typing);

    bob.set_typing(false).unwrap();
    settle().await;
    assert!(!alice.presence().is_typing);

    bob.close().await.unwrap();
    settle().await;
    assert!(!alice.presence().is_online);

    alice.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn typing_indicator_debounces_and_stops_on_send() {
    let h = harness();
    let mut alice = h.context.open("alice", "bob").await.unwrap();
    let mut bob = h.context.open("bob", "alice").await.unwrap();
    let indicator = bob.typing_indicator();

    indicator.input();
    settle().await;
    assert!(alice.presence().is_typing);

    // keystrokes keep the indicator alive past the idle window
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    indicator.input();
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert!(alice.presence().is_typing);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(!alice.presence().is_typing);
    assert!(!indicator.is_typing());

    indicator.input();
    settle().await;
    assert!(alice.presence().is_typing);
    bob.send("done typing").unwrap();
    indicator.message_sent();
    settle().await;
    assert!(!alice.presence().is_typing);

    alice.close().await.unwrap();
    bob.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn closing_cancels_the_typing_timer() {
    let h = harness();
    let mut session = h.context.open("alice", "bob").await.unwrap();
    let indicator = session.typing_indicator();

    indicator.input();
    assert!(indicator.is_typing());
    session.close().await.unwrap();

    assert!(!indicator.is_typing());
}

#[tokio::test(start_paused = true)]
async fn close_releases_every_subscription() {
    let h = harness();
    let room = RoomId::derive("alice", "bob");
    let mut session = h.context.open("alice", "bob").await.unwrap();

    for kind in EventKind::ALL {
        assert_eq!(h.channel.subscriber_count(&room, kind).await, 1, "{kind}");
    }

    session.close().await.unwrap();
    session.close().await.unwrap();

    for kind in EventKind::ALL {
        assert_eq!(h.channel.subscriber_count(&room, kind).await, 0, "{kind}");
    }
}

#[tokio::test(start_paused = true)]
async fn failed_open_releases_partial_subscriptions() {
    let h = harness();
    let room = RoomId::derive("alice", "bob");
    h.channel.fail_subscriptions_to(Some(EventKind::Presence)).await;

    let error = match h.context.open("alice", "bob").await {
        Ok(_) => panic!("open should fail when a subscription is refused"),
        Err(error) => error,
    };
    assert!(matches!(error, ChatError::Subscribe { kind: EventKind::Presence, .. }));

    for kind in EventKind::ALL {
        assert_eq!(h.channel.subscriber_count(&room, kind).await, 0, "{kind}");
    }
}

#[tokio::test(start_paused = true)]
async fn open_fails_when_the_room_cannot_be_joined() {
    let h = harness();
    let room = RoomId::derive("alice", "bob");
    h.channel.fail_publishes(Some("socket disconnected".into())).await;

    let error = match h.context.open("alice", "bob").await {
        Ok(_) => panic!("open should fail when the join is refused"),
        Err(error) => error,
    };
    match error {
        ChatError::Join { room: joined, message } => {
            assert_eq!(joined, room.to_string());
            assert!(message.contains("socket disconnected"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
    for kind in EventKind::ALL {
        assert_eq!(h.channel.subscriber_count(&room, kind).await, 0, "{kind}");
    }
}

#[tokio::test(start_paused = true)]
async fn publish_failure_keeps_the_message_and_surfaces_an_error() {
    let h = harness();
    let mut session = h.context.open("alice", "bob").await.unwrap();
    h.channel.fail_publishes(Some("socket disconnected".into())).await;

    session.send("are pets allowed").unwrap();
    settle().await;

    assert_eq!(session.messages()[0].body, "are pets allowed");
    let error = session.error().expect("publish failure should be surfaced");
    assert!(error.contains("socket disconnected"), "got {error}");

    session.dismiss_error();
    assert!(session.error().is_none());

    h.channel.fail_publishes(None).await;
    session.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn peer_notifications_are_shown_and_expire() {
    let h = harness();
    let room = RoomId::derive("alice", "bob");
    let mut session = h.context.open("alice", "bob").await.unwrap();

    h.channel
        .publish(
            &room,
            RoomEvent::Notification(NoticeEvent {
                sender: "bob".into(),
                body: "Visit confirmed for Saturday".into(),
            }),
        )
        .await
        .unwrap();
    settle().await;
    assert_eq!(session.notification().unwrap().text, "Visit confirmed for Saturday");

    tokio::time::sleep(Duration::from_millis(3_100)).await;
    assert!(session.notification().is_none());
    session.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn view_composes_profile_presence_and_messages() {
    let h = harness();
    let profiles = Arc::new(InMemoryProfileDirectory::new());
    profiles
        .insert(PeerProfile {
            user_id: "bob".into(),
            display_name: "Bob the Owner".into(),
            avatar_url: None,
        })
        .await;
    let context = h.context.clone().with_profiles(profiles);

    let mut session = context.open("alice", "bob").await.unwrap();
    session.send("hi").unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let view = session.view();
    assert_eq!(view.peer.display_name, "Bob the Owner");
    assert_eq!(view.messages.len(), 2);
    assert_eq!(view.unread_count, 0);
    assert_eq!(view.responder, ResponderState::Active);
    assert!(view.is_open);
    assert!(view.error.is_none());

    session.close().await.unwrap();
    assert!(!session.view().is_open);
}

#[tokio::test(start_paused = true)]
async fn unknown_peer_falls_back_to_its_identifier() {
    let h = harness();
    let context = h.context.clone().with_profiles(Arc::new(InMemoryProfileDirectory::new()));

    let mut session = context.open("alice", "bob").await.unwrap();
    assert_eq!(session.peer().display_name, "bob");
    session.close().await.unwrap();
}
