//! Streaming chat turn processing
//!
//! [`ChatLoop`] drives one turn at a time: it appends the user message,
//! streams the model's reply into the session, and persists the result
//! through the history store.

pub mod chat_loop;
pub mod events;

pub use chat_loop::{CancelHandle, ChatError, ChatLoop, ChatOptions, ChatResult};
pub use events::ChatEvent;
