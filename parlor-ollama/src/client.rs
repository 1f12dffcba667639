//! Ollama HTTP client implementation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::base::{
    ModelInfo, ProviderError, ProviderResult, PullProgress, PullStream, TokenSource, TokenStream,
};

/// Request body for `/api/generate`
#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

/// One newline-delimited JSON object from `/api/generate`
#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Request body for `/api/pull`
#[derive(Debug, Serialize)]
struct PullRequest {
    name: String,
    stream: bool,
}

/// One newline-delimited JSON object from `/api/pull`
#[derive(Debug, Deserialize)]
struct PullChunk {
    #[serde(default)]
    status: String,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    completed: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

/// Response body of `/api/tags`
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

/// Client for an Ollama-compatible inference server
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    /// Create a new client for the server at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::builder()
                .http1_only() // some local servers mishandle HTTP/2
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url,
        }
    }

    /// Base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List the models the server has available
    pub async fn list_models(&self) -> ProviderResult<Vec<ModelInfo>> {
        let url = format!("{}/api/tags", self.base_url);
        debug!("Fetching model list from {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Api(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models)
    }

    /// Liveness probe: a 2xx from `/api/tags` means online. Never an
    /// error; any failure reads as offline.
    pub async fn ping(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Liveness probe failed: {}", e);
                false
            }
        }
    }

    /// Pull a model onto the server, streaming progress updates
    pub async fn pull_model(&self, name: &str) -> ProviderResult<PullStream> {
        let url = format!("{}/api/pull", self.base_url);
        let request = PullRequest {
            name: name.to_string(),
            stream: true,
        };
        debug!("Pulling model {} via {}", name, url);

        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Api(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut response = response;
            let mut buffer = String::new();

            loop {
                let chunk = match response.chunk().await {
                    Ok(Some(bytes)) => bytes,
                    Ok(None) => break,
                    Err(err) => {
                        let _ = tx.send(Err(ProviderError::Http(err)));
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));
                for line in drain_lines(&mut buffer) {
                    let parsed: PullChunk = match serde_json::from_str(&line) {
                        Ok(parsed) => parsed,
                        Err(e) => {
                            warn!("Skipping malformed pull update: {} ({})", line, e);
                            continue;
                        }
                    };
                    if let Some(message) = parsed.error {
                        let _ = tx.send(Err(ProviderError::Api(message)));
                        return;
                    }
                    let done = parsed.status == "success";
                    if tx
                        .send(Ok(PullProgress {
                            status: parsed.status,
                            total: parsed.total,
                            completed: parsed.completed,
                        }))
                        .is_err()
                    {
                        return;
                    }
                    if done {
                        return;
                    }
                }
            }
        });

        Ok(Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })))
    }
}

#[async_trait]
impl TokenSource for OllamaClient {
    async fn generate_stream(&self, model: &str, prompt: &str) -> ProviderResult<TokenStream> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
            stream: true,
        };
        debug!("Opening generation stream to {} with model {}", url, model);

        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Api(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut response = response;
            let mut buffer = String::new();

            loop {
                let chunk = match response.chunk().await {
                    Ok(Some(bytes)) => bytes,
                    Ok(None) => break,
                    Err(err) => {
                        let _ = tx.send(Err(ProviderError::Http(err)));
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));
                for line in drain_lines(&mut buffer) {
                    match parse_generate_line(&line) {
                        Some(parsed) => {
                            if let Some(message) = parsed.error {
                                let _ = tx.send(Err(ProviderError::Api(message)));
                                return;
                            }
                            if !parsed.response.is_empty()
                                && tx.send(Ok(parsed.response)).is_err()
                            {
                                return;
                            }
                            if parsed.done {
                                return;
                            }
                        }
                        None => {
                            warn!("Skipping malformed stream fragment: {}", line);
                        }
                    }
                }
            }

            // A final object may arrive without a trailing newline
            let rest = buffer.trim();
            if !rest.is_empty() {
                if let Some(parsed) = parse_generate_line(rest) {
                    if !parsed.response.is_empty() {
                        let _ = tx.send(Ok(parsed.response));
                    }
                } else {
                    warn!("Skipping malformed stream fragment: {}", rest);
                }
            }
        });

        Ok(Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })))
    }
}

/// Drain complete newline-terminated lines out of `buffer`, leaving any
/// partial trailing line in place. Blank lines are dropped.
fn drain_lines(buffer: &mut String) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.find('\n') {
        let raw = buffer[..pos].trim().to_string();
        buffer.drain(..pos + 1);
        if !raw.is_empty() {
            lines.push(raw);
        }
    }
    lines
}

/// Parse one generate-stream line; None means a malformed line the
/// caller should skip.
fn parse_generate_line(line: &str) -> Option<GenerateChunk> {
    serde_json::from_str(line).ok()
}
