//! Chat-completions client for OpenAI-compatible endpoints

use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::warn;

use crate::errors::Result;
use crate::errors::SupportRagError;
use crate::llm::ChatMessage;
use crate::llm::StreamingResponse;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// Client for chat completions against an OpenAI-compatible API
pub struct LlmClient {
    endpoint: String,
    api_key: String,
    client: Client,
}

impl LlmClient {
    /// Create a new LLM client from application configuration
    pub fn new(config: &crate::config::AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| SupportRagError::Http(e.to_string()))?;

        Ok(Self {
            endpoint: config.llm_endpoint().to_string(),
            api_key: config.llm_key().to_string(),
            client,
        })
    }

    /// Generate a completion for a full conversation
    pub async fn generate(&self, messages: &[ChatMessage], model: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.endpoint);
        debug!("Calling chat completions API: {} ({} messages)", url, messages.len());

        let request = CompletionRequest {
            model,
            messages,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| SupportRagError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SupportRagError::Llm(format!(
                "Chat API error ({status}): {error_text}"
            )));
        }

        let result: CompletionResponse = response
            .json()
            .await
            .map_err(|e| SupportRagError::Llm(format!("Failed to parse response: {e}")))?;

        Ok(result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    /// Generate a streamed completion.
    ///
    /// Fragments are forwarded through the returned channel in arrival
    /// order; the channel closes after the upstream `[DONE]` marker.
    /// Dropping the response cancels the transfer.
    pub async fn generate_stream(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> Result<StreamingResponse> {
        let url = format!("{}/chat/completions", self.endpoint);
        debug!("Calling streaming chat completions API: {}", url);

        let request = CompletionRequest {
            model,
            messages,
            stream: true,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| SupportRagError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SupportRagError::Llm(format!(
                "Chat API error ({status}): {error_text}"
            )));
        }

        let (tx, rx) = mpsc::channel::<Result<String>>(32);

        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut buffer = String::new();

            'outer: while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx.send(Err(SupportRagError::Http(e.to_string()))).await;
                        break;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // Process every complete line in the buffer
                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim().to_string();
                    buffer.drain(..=newline);

                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();

                    if data == "[DONE]" {
                        break 'outer;
                    }

                    match serde_json::from_str::<StreamChunk>(data) {
                        Ok(parsed) => {
                            let content = parsed
                                .choices
                                .into_iter()
                                .next()
                                .and_then(|c| c.delta.content)
                                .unwrap_or_default();
                            if !content.is_empty() && tx.send(Ok(content)).await.is_err() {
                                // Consumer dropped the channel: cancelled
                                break 'outer;
                            }
                        }
                        Err(e) => {
                            warn!("Skipping malformed stream chunk: {}", e);
                        }
                    }
                }
            }
            // tx drops here, closing the channel as the terminal marker
        });

        Ok(StreamingResponse::new(rx))
    }
}
