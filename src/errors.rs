use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SupportRagError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Ticket not found: {0}")]
    TicketNotFound(Uuid),

    #[error("Invalid import record for ticket {original_id}: {reason}")]
    Validation { original_id: i64, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SupportRagError>;
