//! Outward hand-off of conversations the auto-responder could not answer.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::entities::EscalationTicket;
use crate::types::{ChatError, ChatResult};

/// Receiver of escalation tickets, typically a follow-up queue
#[async_trait]
pub trait EscalationHandler: Send + Sync {
    async fn escalate(&self, ticket: EscalationTicket) -> ChatResult<()>;
}

/// Handler that only logs the ticket
#[derive(Debug, Default)]
pub struct LoggingEscalationHandler;

#[async_trait]
impl EscalationHandler for LoggingEscalationHandler {
    async fn escalate(&self, ticket: EscalationTicket) -> ChatResult<()> {
        info!(
            room = %ticket.room_id,
            status = ?ticket.status,
            last_message = %ticket.last_message_text,
            "conversation escalated for human follow-up"
        );
        Ok(())
    }
}

/// Handler that keeps every ticket it receives
#[derive(Debug, Default)]
pub struct RecordingEscalationHandler {
    tickets: Mutex<Vec<EscalationTicket>>,
}

impl RecordingEscalationHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tickets(&self) -> Vec<EscalationTicket> {
        self.tickets
            .lock()
            .map(|tickets| tickets.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EscalationHandler for RecordingEscalationHandler {
    async fn escalate(&self, ticket: EscalationTicket) -> ChatResult<()> {
        self.tickets
            .lock()
            .map_err(|_| ChatError::escalation("ticket log is poisoned"))?
            .push(ticket);
        Ok(())
    }
}
