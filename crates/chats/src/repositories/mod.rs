//! External collaborators of the session engine.
//!
//! The session never talks to a backend directly. History, peer profiles
//! and escalations go through the traits in this module so the transport
//! can be swapped and the engine can be exercised with in-memory doubles.

pub mod escalation;
pub mod history_repository;
pub mod profile_repository;

pub use escalation::{EscalationHandler, LoggingEscalationHandler, RecordingEscalationHandler};
pub use history_repository::{HistoryRepository, HttpHistoryRepository, InMemoryHistoryRepository};
pub use profile_repository::{HttpProfileDirectory, InMemoryProfileDirectory, ProfileDirectory};

use std::time::Duration;

use crate::types::ChatResult;

/// Build the HTTP client shared by the REST-backed collaborators
pub(crate) fn http_client(request_timeout: Duration) -> ChatResult<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(request_timeout).build()?)
}

/// Join a base URL and a path without doubling or dropping the slash
pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}
