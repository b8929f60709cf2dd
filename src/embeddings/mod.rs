//! Embeddings generation module
//!
//! Generates text embeddings for ticket documents using an
//! OpenAI-compatible API or a local Ollama endpoint.

pub mod client;

pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;

use crate::errors::Result;

/// Maximum batch size for embedding generation
pub const MAX_BATCH_SIZE: usize = 100;

/// Configuration for embedding generation
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub dimension: usize,
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl EmbeddingConfig {
    pub fn from_app_config(config: &crate::config::AppConfig) -> Self {
        // An API key implies an OpenAI-compatible endpoint; otherwise assume
        // a local Ollama instance.
        let provider = if config.embedding_api_key().is_some()
            || config.embedding_endpoint().contains("openai")
        {
            EmbeddingProvider::OpenAI
        } else {
            EmbeddingProvider::Ollama
        };

        Self {
            provider,
            model: config.embedding_model().to_string(),
            dimension: config.embedding_dimension(),
            endpoint: config.embedding_endpoint().to_string(),
            api_key: config.embedding_api_key().map(str::to_string),
        }
    }
}

/// High-level embedding service wrapping a provider client
pub struct EmbeddingService {
    client: EmbeddingClient,
    dimension: usize,
}

impl EmbeddingService {
    /// Create a new embedding service from application configuration
    pub fn new(config: &crate::config::AppConfig) -> Result<Self> {
        let embedding_config = EmbeddingConfig::from_app_config(config);
        let dimension = embedding_config.dimension;
        let client = EmbeddingClient::new(
            embedding_config.provider,
            embedding_config.model,
            embedding_config.endpoint,
            embedding_config.api_key,
        )?;

        Ok(Self { client, dimension })
    }

    /// Generate an embedding for a single text
    pub async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        self.client.generate(text).await
    }

    /// Generate embeddings for multiple texts in one provider call
    pub async fn generate_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        self.client.generate_batch(texts).await
    }

    /// Configured embedding dimension
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }
}
