//! Vector store adapter for semantic ticket retrieval
//!
//! Tickets are projected into one denormalized text document each and
//! stored in a pgvector-backed table. Only rank order matters downstream;
//! similarity scores are discarded after the nearest-neighbor query.

use pgvector::Vector;
use sqlx::PgPool;
use tokio::sync::OnceCell;

use crate::embeddings::EmbeddingService;
use crate::embeddings::MAX_BATCH_SIZE;
use crate::models::EmbeddedDocument;
use crate::models::ImportReport;
use crate::models::ImportTicket;
use crate::models::ReplyOwner;
use crate::text::strip_html_flat;
use crate::Result;
use crate::SupportRagError;

/// Embedding-backed document store for nearest-neighbor ticket search
pub struct VectorStore {
    pool: PgPool,
    embeddings: EmbeddingService,
    dimension: usize,
    collection_ready: OnceCell<()>,
}

impl VectorStore {
    /// Connect the adapter with its own pool, initialized once per process
    pub async fn from_config(config: &crate::config::AppConfig) -> Result<Self> {
        let pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections())
            .acquire_timeout(std::time::Duration::from_secs(config.connection_timeout()));

        let pool = pool_options.connect(config.database_url()).await?;
        let embeddings = EmbeddingService::new(config)?;

        Ok(Self::new(pool, embeddings))
    }

    /// Build from existing parts, sharing a pool
    #[must_use]
    pub fn new(pool: PgPool, embeddings: EmbeddingService) -> Self {
        let dimension = embeddings.dimension();
        Self {
            pool,
            embeddings,
            dimension,
            collection_ready: OnceCell::new(),
        }
    }

    /// Lazily create the document collection on first use.
    ///
    /// A missing collection is a benign first-run condition, not an error;
    /// the statements are idempotent so the collection is re-creatable if
    /// it was dropped underneath us.
    async fn ensure_collection(&self) -> Result<()> {
        self.collection_ready
            .get_or_try_init(|| async {
                sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
                    .execute(&self.pool)
                    .await?;

                sqlx::query(&format!(
                    r"
                    CREATE TABLE IF NOT EXISTS kb_documents (
                        ticket_id BIGINT PRIMARY KEY,
                        title TEXT NOT NULL,
                        category TEXT,
                        content TEXT NOT NULL,
                        embedding vector({}) NOT NULL,
                        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
                    )
                    ",
                    self.dimension
                ))
                .execute(&self.pool)
                .await?;

                tracing::debug!("Vector collection ensured (dimension {})", self.dimension);
                Ok::<(), SupportRagError>(())
            })
            .await?;

        Ok(())
    }

    /// Project tickets into documents and upsert them into the index.
    ///
    /// Processed in batches of [`MAX_BATCH_SIZE`] to bound memory and
    /// request size. A failing batch is counted and logged, never fatal to
    /// the remaining batches.
    pub async fn add_documents(&self, tickets: &[ImportTicket]) -> Result<ImportReport> {
        self.ensure_collection().await?;

        let mut report = ImportReport::default();

        for batch in tickets.chunks(MAX_BATCH_SIZE) {
            let mut documents = Vec::with_capacity(batch.len());
            for ticket in batch {
                match build_document_text(ticket) {
                    Ok(content) => documents.push((ticket, content)),
                    Err(e) => {
                        tracing::error!("Skipping ticket {}: {}", ticket.id, e);
                        report.record_failure(ticket.id, e.to_string());
                    }
                }
            }

            if documents.is_empty() {
                continue;
            }

            let texts: Vec<&str> = documents.iter().map(|(_, content)| content.as_str()).collect();
            let embeddings = match self.embeddings.generate_batch(texts).await {
                Ok(embeddings) => embeddings,
                Err(e) => {
                    tracing::warn!("Embedding batch of {} documents failed: {}", documents.len(), e);
                    for (ticket, _) in &documents {
                        report.record_failure(ticket.id, format!("embedding batch failed: {e}"));
                    }
                    continue;
                }
            };

            for ((ticket, content), embedding) in documents.into_iter().zip(embeddings) {
                match self.upsert_document(ticket, &content, embedding).await {
                    Ok(()) => report.record_success(),
                    Err(e) => {
                        tracing::error!("Failed to store document for ticket {}: {}", ticket.id, e);
                        report.record_failure(ticket.id, e.to_string());
                    }
                }
            }
        }

        tracing::info!(
            "Vector import completed: {} documents stored, {} failed",
            report.success_count,
            report.error_count
        );
        Ok(report)
    }

    /// Return the `limit` nearest documents to the query by cosine
    /// distance. Only rank order is meaningful to callers.
    pub async fn search_relevant(&self, query: &str, limit: i64) -> Result<Vec<EmbeddedDocument>> {
        self.ensure_collection().await?;

        let query_embedding = self.embeddings.generate(query).await?;

        let documents: Vec<EmbeddedDocument> = sqlx::query_as(
            r"
            SELECT ticket_id, title, category, content
            FROM kb_documents
            ORDER BY embedding <=> $1
            LIMIT $2
            ",
        )
        .bind(Vector::from(query_embedding))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    /// Drop every document; the index is rebuilt wholesale on import
    pub async fn clear_documents(&self) -> Result<()> {
        self.ensure_collection().await?;

        let result = sqlx::query("DELETE FROM kb_documents")
            .execute(&self.pool)
            .await?;

        tracing::info!("Cleared {} vector documents", result.rows_affected());
        Ok(())
    }

    async fn upsert_document(
        &self,
        ticket: &ImportTicket,
        content: &str,
        embedding: Vec<f32>,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO kb_documents (ticket_id, title, category, content, embedding)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (ticket_id) DO UPDATE SET
                title = EXCLUDED.title,
                category = EXCLUDED.category,
                content = EXCLUDED.content,
                embedding = EXCLUDED.embedding
            ",
        )
        .bind(ticket.id)
        .bind(&ticket.title)
        .bind(&ticket.category)
        .bind(content)
        .bind(Vector::from(embedding))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Concatenate category, title, description, and the role-labeled
/// transcript into the single text blob that gets embedded.
pub fn build_document_text(ticket: &ImportTicket) -> Result<String> {
    let mut transcript_lines = Vec::with_capacity(ticket.replies.len());
    for (idx, reply) in ticket.replies.iter().enumerate() {
        let owner = ReplyOwner::parse(&reply.owner).ok_or_else(|| SupportRagError::Validation {
            original_id: ticket.id,
            reason: format!(
                "unrecognized reply owner \"{}\" at position {}",
                reply.owner, idx
            ),
        })?;
        transcript_lines.push(format!(
            "{}: {}",
            owner.speaker_label(),
            strip_html_flat(&reply.content)
        ));
    }

    let mut text = format!(
        "分类: {}\n问题: {}\n",
        ticket.category.as_deref().unwrap_or_default(),
        ticket.title
    );
    if let Some(description) = ticket.description.as_deref() {
        if !description.is_empty() {
            text.push_str(&format!("描述: {}\n", strip_html_flat(description)));
        }
    }
    text.push_str("对话记录:\n");
    text.push_str(&transcript_lines.join("\n"));

    Ok(text)
}
