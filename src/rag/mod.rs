//! RAG (Retrieval-Augmented Generation) module
//!
//! Retrieves historical support cases relevant to the user's current query
//! and assembles them into a bounded context block for the model:
//! - Keyword retrieval against the relational ticket store
//! - Semantic retrieval against the vector document store
//! - Context assembly from retrieved cases
//! - Chat orchestration with a single injected system instruction
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use supportrag::config::AppConfig;
//! use supportrag::database::Database;
//! use supportrag::llm::ChatMessage;
//! use supportrag::llm::LlmClient;
//! use supportrag::rag::KnowledgeBase;
//! use supportrag::rag::RagService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let database = Arc::new(Database::from_config(&config).await?);
//!     let source = Arc::new(KnowledgeBase::new(database, &config));
//!     let service = RagService::new(source, LlmClient::new(&config)?, &config);
//!
//!     let answer = service
//!         .chat(&[ChatMessage::user("我的订单一直没发货怎么办？")], config.llm_model())
//!         .await?;
//!     println!("{answer}");
//!
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod pipeline;

pub use context::ContextAssembler;
pub use pipeline::RagService;

use std::sync::Arc;

use async_trait::async_trait;

use crate::database::Database;
use crate::errors::Result;
use crate::models::EmbeddedDocument;
use crate::models::TicketWithReplies;
use crate::vector::VectorStore;

/// One retrieved case, request-scoped, in rank order.
///
/// The lexical path carries the full ticket with its replies inline; the
/// semantic path carries the denormalized document blob.
#[derive(Debug, Clone)]
pub enum CaseMatch {
    Ticket(TicketWithReplies),
    Document(EmbeddedDocument),
}

/// Capability interface for retrieval backends.
///
/// Both the lexical ticket store and the vector store implement this, so
/// either can be wired in (or swapped) without touching context assembly.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Return up to `limit` matches for `query`, most relevant first
    async fn search_relevant(&self, query: &str, limit: usize) -> Result<Vec<CaseMatch>>;
}

/// Lexical retrieval backend over the relational ticket store
pub struct KnowledgeBase {
    database: Arc<Database>,
    keyword_cap: usize,
}

impl KnowledgeBase {
    pub fn new(database: Arc<Database>, config: &crate::config::AppConfig) -> Self {
        Self {
            database,
            keyword_cap: config.keyword_cap(),
        }
    }
}

#[async_trait]
impl KnowledgeSource for KnowledgeBase {
    async fn search_relevant(&self, query: &str, limit: usize) -> Result<Vec<CaseMatch>> {
        let tickets = self
            .database
            .search_relevant_tickets(query, self.keyword_cap, limit as i64)
            .await?;

        Ok(tickets.into_iter().map(CaseMatch::Ticket).collect())
    }
}

#[async_trait]
impl KnowledgeSource for VectorStore {
    async fn search_relevant(&self, query: &str, limit: usize) -> Result<Vec<CaseMatch>> {
        let documents = VectorStore::search_relevant(self, query, limit as i64).await?;

        Ok(documents.into_iter().map(CaseMatch::Document).collect())
    }
}
