//! Ollama inference API client
//!
//! Consumes the HTTP API of a local Ollama-compatible server: model
//! listing, streaming text generation and streaming model pulls. The
//! [`base::TokenSource`] trait is the seam the chat layer depends on.

pub mod base;
pub mod client;

pub use base::{
    ModelInfo, ProviderError, ProviderResult, PullProgress, PullStream, TokenSource, TokenStream,
};
pub use client::OllamaClient;
