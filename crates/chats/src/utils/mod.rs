//! Internal utilities for the chat session engine.

pub mod similarity;

pub use similarity::{phrase_similarity, tokenize};
