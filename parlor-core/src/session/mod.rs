//! Session management for conversation history
//!
//! A session is one conversation thread bound to one model. The whole
//! collection persists in a single JSON slot on disk.

pub mod history;
pub mod store;

pub use history::HistoryStore;
pub use store::{ChatMessage, ChatSession, Role};
