use std::collections::HashMap;

use uuid::Uuid;

use super::Database;
use crate::models::Reply;
use crate::models::Ticket;
use crate::models::TicketWithReplies;
use crate::text::extract_keywords;
use crate::Result;
use crate::SupportRagError;

impl Database {
    /// Substring search against title or description, case-insensitive.
    ///
    /// An optional exact-category filter narrows the result; tickets are
    /// ordered by original id descending (most recent case first).
    pub async fn search_tickets(
        &self,
        query: &str,
        category: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Ticket>> {
        let pattern = format!("%{query}%");

        let tickets: Vec<Ticket> = if let Some(category) = category {
            sqlx::query_as(
                r"
                SELECT id, original_id, title, description, category, created_at
                FROM kb_tickets
                WHERE (title ILIKE $1 OR description ILIKE $1)
                AND category = $2
                ORDER BY original_id DESC
                LIMIT $3
                ",
            )
            .bind(&pattern)
            .bind(category)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                r"
                SELECT id, original_id, title, description, category, created_at
                FROM kb_tickets
                WHERE title ILIKE $1 OR description ILIKE $1
                ORDER BY original_id DESC
                LIMIT $2
                ",
            )
            .bind(&pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(tickets)
    }

    /// Keyword-OR relevance search used for context retrieval.
    ///
    /// Derives keywords from the query and matches any ticket whose title
    /// or description contains any keyword as a substring. Zero extracted
    /// keywords short-circuits to an empty result without touching the
    /// store. Recall-biased on purpose; the small `limit` keeps irrelevant
    /// hits cheap.
    pub async fn search_relevant_tickets(
        &self,
        query: &str,
        keyword_cap: usize,
        limit: i64,
    ) -> Result<Vec<TicketWithReplies>> {
        let keywords = extract_keywords(query, keyword_cap);

        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!("Relevance search with keywords: {:?}", keywords);

        let patterns: Vec<String> = keywords.iter().map(|k| format!("%{k}%")).collect();

        let tickets: Vec<Ticket> = sqlx::query_as(
            r"
            SELECT id, original_id, title, description, category, created_at
            FROM kb_tickets
            WHERE title ILIKE ANY($1) OR description ILIKE ANY($1)
            ORDER BY original_id DESC
            LIMIT $2
            ",
        )
        .bind(&patterns)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.attach_replies(tickets).await
    }

    /// Fetch one ticket plus its full conversation, replies ordered by
    /// sequence position ascending. Fails with `TicketNotFound` for an
    /// unknown id.
    pub async fn get_ticket_with_replies(&self, ticket_id: Uuid) -> Result<TicketWithReplies> {
        let ticket: Option<Ticket> = sqlx::query_as(
            r"
            SELECT id, original_id, title, description, category, created_at
            FROM kb_tickets
            WHERE id = $1
            ",
        )
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;

        let ticket = ticket.ok_or(SupportRagError::TicketNotFound(ticket_id))?;

        let replies: Vec<Reply> = sqlx::query_as(
            r"
            SELECT id, ticket_id, owner, content, sequence_order, created_at
            FROM kb_replies
            WHERE ticket_id = $1
            ORDER BY sequence_order ASC
            ",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(TicketWithReplies { ticket, replies })
    }

    /// Load replies for a batch of tickets in one round-trip, preserving
    /// the ticket order of the input.
    async fn attach_replies(&self, tickets: Vec<Ticket>) -> Result<Vec<TicketWithReplies>> {
        if tickets.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = tickets.iter().map(|t| t.id).collect();

        let replies: Vec<Reply> = sqlx::query_as(
            r"
            SELECT id, ticket_id, owner, content, sequence_order, created_at
            FROM kb_replies
            WHERE ticket_id = ANY($1)
            ORDER BY ticket_id, sequence_order ASC
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_ticket: HashMap<Uuid, Vec<Reply>> = HashMap::new();
        for reply in replies {
            by_ticket.entry(reply.ticket_id).or_default().push(reply);
        }

        Ok(tickets
            .into_iter()
            .map(|ticket| {
                let replies = by_ticket.remove(&ticket.id).unwrap_or_default();
                TicketWithReplies { ticket, replies }
            })
            .collect())
    }
}
