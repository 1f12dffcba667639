//! Events emitted while a chat turn is processed

/// Streaming progress events for front-end consumers
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// Incremental assistant text output
    AssistantDelta { text: String },
    /// The turn completed; `content` is the full assistant reply
    Completed { content: String },
    /// The turn failed; output already applied is kept as-is
    Error { message: String },
}
