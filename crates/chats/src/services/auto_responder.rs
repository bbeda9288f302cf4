//! FAQ auto-responder with a one-shot escalation guard.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::entities::{ChatMessage, EscalationTicket, FaqEntry, FaqTable};
use crate::utils::phrase_similarity;

/// Lifecycle of the responder within one session.
///
/// `Escalated` is terminal: nothing moves the responder back to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponderState {
    Active,
    Escalated,
}

/// What kind of automated reply was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Answer,
    Fallback,
}

/// An automated reply the session should deliver after the reply delay
#[derive(Debug, Clone, PartialEq)]
pub struct AutoReply {
    pub kind: ReplyKind,
    pub body: String,
    /// Present only on the fallback that triggered escalation
    pub escalation: Option<EscalationTicket>,
}

/// Matches user messages against the FAQ table until the first miss
#[derive(Debug, Clone)]
pub struct AutoResponder {
    faq: Arc<FaqTable>,
    threshold: f64,
    fallback_reply: String,
    state: ResponderState,
}

impl AutoResponder {
    pub fn new(faq: Arc<FaqTable>, threshold: f64, fallback_reply: impl Into<String>) -> Self {
        Self {
            faq,
            threshold,
            fallback_reply: fallback_reply.into(),
            state: ResponderState::Active,
        }
    }

    pub fn state(&self) -> ResponderState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ResponderState::Active
    }

    /// Best FAQ entry for `text` scoring at least the threshold
    pub fn find_match(&self, text: &str) -> Option<&FaqEntry> {
        let mut best: Option<(&FaqEntry, f64)> = None;
        for entry in self.faq.entries() {
            let score = phrase_similarity(text, &entry.question);
            if score < self.threshold {
                continue;
            }
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((entry, score));
            }
        }
        best.map(|(entry, _)| entry)
    }

    /// Decide the automated reply to a freshly sent message.
    ///
    /// Only messages authored by `local_user` are considered. A miss yields
    /// the fallback reply exactly once and escalates for good.
    pub fn evaluate(&mut self, message: &ChatMessage, local_user: &str) -> Option<AutoReply> {
        if self.state == ResponderState::Escalated || !message.is_from(local_user) {
            return None;
        }

        if let Some(entry) = self.find_match(&message.body) {
            debug!(question = %entry.question, "faq entry matched");
            return Some(AutoReply {
                kind: ReplyKind::Answer,
                body: entry.answer.clone(),
                escalation: None,
            });
        }

        self.state = ResponderState::Escalated;
        info!(room = %message.room_id, "no faq entry matched, escalating conversation");

        Some(AutoReply {
            kind: ReplyKind::Fallback,
            body: self.fallback_reply.clone(),
            escalation: Some(EscalationTicket::pending(
                message.room_id.clone(),
                message.body.clone(),
            )),
        })
    }
}
