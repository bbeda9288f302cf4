use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// A canned question and the answer the auto-responder gives for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

impl FaqEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Read-only FAQ table shared by every session in the process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaqTable {
    entries: Vec<FaqEntry>,
}

impl FaqTable {
    pub fn new(entries: Vec<FaqEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The built-in table for property enquiries
    pub fn builtin() -> Arc<FaqTable> {
        Arc::clone(&BUILTIN_FAQ)
    }
}

static BUILTIN_FAQ: Lazy<Arc<FaqTable>> = Lazy::new(|| {
    Arc::new(FaqTable::new(vec![
        FaqEntry::new("hi", "Hi there! How can I assist you today?"),
        FaqEntry::new("hello", "Hello! How can I help you with this property?"),
        FaqEntry::new(
            "is the property still available",
            "Yes, the property is currently available. Would you like to schedule a visit?",
        ),
        FaqEntry::new(
            "what is the rent",
            "The monthly rent is listed on the property page. Maintenance charges are mentioned separately.",
        ),
        FaqEntry::new(
            "what is the security deposit",
            "The security deposit is usually two months of rent and is refundable at the end of the lease.",
        ),
        FaqEntry::new(
            "can i schedule a visit",
            "Sure! Please share a date and time that works for you and the owner will confirm.",
        ),
        FaqEntry::new(
            "are pets allowed",
            "Pets are allowed in most of our listings. Please check the amenities section of this property.",
        ),
        FaqEntry::new(
            "is parking available",
            "Parking availability is listed under amenities. Most properties include one covered spot.",
        ),
        FaqEntry::new(
            "is the rent negotiable",
            "The owner may consider reasonable offers. Your request will be shared once you send it here.",
        ),
        FaqEntry::new("thank you", "You're welcome! Let me know if there is anything else."),
    ]))
});
