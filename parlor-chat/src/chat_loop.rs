//! The streaming response aggregator

use futures::StreamExt;
use parlor_core::config::ChatConfig;
use parlor_core::session::{ChatMessage, ChatSession, HistoryStore, Role};
use parlor_ollama::{ProviderError, TokenSource};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use crate::events::ChatEvent;

/// Error type for chat turn processing
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Generation failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Generation cancelled")]
    Cancelled,
}

pub type ChatResult<T> = Result<T, ChatError>;

/// Cancels in-flight generations for one session.
///
/// Bumping the generation counter makes any stream started under an
/// earlier value stop applying fragments; late output is discarded
/// instead of landing in a session the user has left.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    generation: Arc<AtomicU64>,
}

impl CancelHandle {
    /// Invalidate every stream currently in flight for the session
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Prompt construction options
#[derive(Debug, Clone)]
pub struct ChatOptions {
    /// Send the rendered prior history instead of the latest turn only
    pub send_full_history: bool,
    /// Trailing messages included when sending full history
    pub max_context_messages: usize,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            send_full_history: false,
            max_context_messages: 50,
        }
    }
}

impl From<&ChatConfig> for ChatOptions {
    fn from(config: &ChatConfig) -> Self {
        Self {
            send_full_history: config.send_full_history,
            max_context_messages: config.max_context_messages,
        }
    }
}

/// Drives chat turns: submit, stream, merge, persist.
///
/// Methods take `&mut self`, so at most one stream is driven at a time
/// and fragment effects are applied strictly in arrival order.
/// Front-ends that want to queue rapid submissions put the loop behind
/// a request channel in a single owning task.
pub struct ChatLoop {
    source: Arc<dyn TokenSource>,
    store: HistoryStore,
    options: ChatOptions,
    generations: HashMap<String, Arc<AtomicU64>>,
}

impl ChatLoop {
    /// Create a new chat loop over a token source and a history store
    pub fn new(source: Arc<dyn TokenSource>, store: HistoryStore, options: ChatOptions) -> Self {
        Self {
            source,
            store,
            options,
            generations: HashMap::new(),
        }
    }

    /// The history store this loop persists through
    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Handle for cancelling in-flight generations of `session_id`
    pub fn cancel_handle(&mut self, session_id: &str) -> CancelHandle {
        CancelHandle {
            generation: self.generation_counter(session_id),
        }
    }

    /// Submit one user turn and stream the reply into the session.
    ///
    /// The user message lands in the message list (and the store)
    /// before any network activity. A successful turn adds exactly two
    /// messages; on failure the partially accumulated assistant
    /// message is kept as-is and the error is surfaced.
    pub async fn submit(
        &mut self,
        session: &mut ChatSession,
        text: impl Into<String>,
        events: &mpsc::UnboundedSender<ChatEvent>,
    ) -> ChatResult<()> {
        let text = text.into();

        if session.messages.is_empty() {
            session.title = ChatSession::title_preview(&text);
        }
        session.push(ChatMessage::user(&text));
        self.store.save(session);

        let prompt = self.build_prompt(session);
        self.run_generation(session, prompt, events).await
    }

    /// Replace the message at `index`, discard everything after it and
    /// regenerate from the truncated history.
    ///
    /// An out-of-range `index` is a no-op, not an error.
    pub async fn edit_and_regenerate(
        &mut self,
        session: &mut ChatSession,
        index: usize,
        new_content: impl Into<String>,
        events: &mpsc::UnboundedSender<ChatEvent>,
    ) -> ChatResult<()> {
        if !session.edit_and_truncate(index, new_content) {
            debug!(
                "Edit index {} out of range for session {}, ignoring",
                index, session.id
            );
            return Ok(());
        }
        self.store.save(session);

        let prompt = self.build_prompt(session);
        self.run_generation(session, prompt, events).await
    }

    /// Stream one generation into the session.
    ///
    /// The first fragment appends the assistant message and records its
    /// index; every later fragment rewrites that message with the full
    /// accumulator. The pending index, not list position, decides what
    /// gets mutated.
    async fn run_generation(
        &mut self,
        session: &mut ChatSession,
        prompt: String,
        events: &mpsc::UnboundedSender<ChatEvent>,
    ) -> ChatResult<()> {
        let counter = self.generation_counter(&session.id);
        let generation = counter.load(Ordering::SeqCst);

        let mut stream = match self.source.generate_stream(&session.model, &prompt).await {
            Ok(stream) => stream,
            Err(e) => {
                let _ = events.send(ChatEvent::Error {
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let mut accumulator = String::new();
        let mut pending: Option<usize> = None;
        let mut outcome: ChatResult<()> = Ok(());

        while let Some(item) = stream.next().await {
            if counter.load(Ordering::SeqCst) != generation {
                debug!("Discarding stale stream output for session {}", session.id);
                outcome = Err(ChatError::Cancelled);
                break;
            }

            match item {
                Ok(fragment) => {
                    accumulator.push_str(&fragment);
                    match pending {
                        Some(index) => {
                            session.messages[index].content = accumulator.clone();
                            session.touch();
                        }
                        None => {
                            session.push(ChatMessage::assistant(accumulator.clone()));
                            pending = Some(session.messages.len() - 1);
                        }
                    }
                    let _ = events.send(ChatEvent::AssistantDelta { text: fragment });
                }
                Err(e) => {
                    outcome = Err(e.into());
                    break;
                }
            }
        }

        if outcome.is_ok() && pending.is_none() {
            // a successful turn always lands an assistant message
            session.push(ChatMessage::assistant(String::new()));
        }
        session.touch();
        self.store.save(session);

        match outcome {
            Ok(()) => {
                debug!(
                    "Turn completed for session {} ({} chars)",
                    session.id,
                    accumulator.chars().count()
                );
                let _ = events.send(ChatEvent::Completed {
                    content: accumulator,
                });
                Ok(())
            }
            Err(e) => {
                let _ = events.send(ChatEvent::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Build the prompt for the session's latest turn.
    ///
    /// Default mode sends only the latest turn, matching the generate
    /// endpoint contract; full mode prefixes a rendered transcript of
    /// the prior turns.
    fn build_prompt(&self, session: &ChatSession) -> String {
        let latest = session
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();

        if !self.options.send_full_history || session.messages.len() < 2 {
            return latest;
        }

        let end = session.messages.len() - 1;
        let start = end.saturating_sub(self.options.max_context_messages);
        let mut rendered = String::from("Previous conversation:\n");
        for msg in &session.messages[start..end] {
            let role = match msg.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            rendered.push_str(&format!("{}: {}\n", role, msg.content));
        }
        rendered.push('\n');
        rendered.push_str(&latest);
        rendered
    }

    fn generation_counter(&mut self, session_id: &str) -> Arc<AtomicU64> {
        self.generations
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .clone()
    }
}
