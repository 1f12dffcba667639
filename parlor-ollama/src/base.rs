//! Base types and the generation trait seam

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;

/// Error type for inference server operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API error: {0}")]
    Api(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Stream of generated text fragments
pub type TokenStream = Pin<Box<dyn Stream<Item = ProviderResult<String>> + Send>>;

/// Stream of model pull progress updates
pub type PullStream = Pin<Box<dyn Stream<Item = ProviderResult<PullProgress>> + Send>>;

/// A model known to the inference server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub modified_at: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// One progress update from a streaming model pull
#[derive(Debug, Clone, Deserialize)]
pub struct PullProgress {
    /// Server-reported phase, e.g. "pulling manifest", "success"
    #[serde(default)]
    pub status: String,
    /// Total bytes of the current layer, when known
    #[serde(default)]
    pub total: Option<u64>,
    /// Bytes completed of the current layer, when known
    #[serde(default)]
    pub completed: Option<u64>,
}

impl PullProgress {
    /// Whether this update marks the end of a successful pull
    pub fn is_done(&self) -> bool {
        self.status == "success"
    }
}

/// Trait for streaming text generation backends.
///
/// The chat layer depends on this seam rather than on the HTTP client,
/// so scripted sources can drive it in tests.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Open a streaming generation of `prompt` against `model`
    async fn generate_stream(&self, model: &str, prompt: &str) -> ProviderResult<TokenStream>;
}
