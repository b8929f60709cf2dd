use uuid::Uuid;

use super::Database;
use crate::models::ImportReport;
use crate::models::ImportTicket;
use crate::models::ReplyOwner;
use crate::Result;
use crate::SupportRagError;

impl Database {
    /// Bulk-insert tickets and their replies.
    ///
    /// Input is processed in batches of `batch_size` so an oversized payload
    /// never turns into one unbounded transaction. Each ticket is written in
    /// its own transaction; a malformed or failing record is logged, counted
    /// in the report, and skipped without aborting the rest of the batch.
    /// Reply sequence positions are generated from input array order.
    pub async fn import_tickets(
        &self,
        tickets: &[ImportTicket],
        batch_size: usize,
    ) -> Result<ImportReport> {
        tracing::info!("Starting import of {} tickets", tickets.len());

        let mut report = ImportReport::default();
        let mut processed = 0usize;

        for batch in tickets.chunks(batch_size.max(1)) {
            for ticket in batch {
                match self.import_one_ticket(ticket).await {
                    Ok(()) => report.record_success(),
                    Err(e) => {
                        tracing::error!("Failed to import ticket {}: {}", ticket.id, e);
                        report.record_failure(ticket.id, e.to_string());
                    }
                }

                processed += 1;
                if processed % 100 == 0 {
                    tracing::info!("Imported {}/{} tickets", processed, tickets.len());
                }
            }
        }

        tracing::info!(
            "Import completed: {} succeeded, {} failed",
            report.success_count,
            report.error_count
        );
        Ok(report)
    }

    /// Delete all replies, then all tickets (respecting the foreign-key
    /// direction). Full reset used before re-import.
    pub async fn clear_all_data(&self) -> Result<()> {
        tracing::info!("Clearing all knowledge base data");

        let replies = sqlx::query("DELETE FROM kb_replies")
            .execute(&self.pool)
            .await?;
        let tickets = sqlx::query("DELETE FROM kb_tickets")
            .execute(&self.pool)
            .await?;

        tracing::info!(
            "Cleared {} replies and {} tickets",
            replies.rows_affected(),
            tickets.rows_affected()
        );
        Ok(())
    }

    async fn import_one_ticket(&self, ticket: &ImportTicket) -> Result<()> {
        // Validate reply owners before touching the store
        for (idx, reply) in ticket.replies.iter().enumerate() {
            if ReplyOwner::parse(&reply.owner).is_none() {
                return Err(SupportRagError::Validation {
                    original_id: ticket.id,
                    reason: format!(
                        "unrecognized reply owner \"{}\" at position {}",
                        reply.owner, idx
                    ),
                });
            }
        }

        let mut tx = self.pool.begin().await?;
        let ticket_id = Uuid::new_v4();

        sqlx::query(
            r"
            INSERT INTO kb_tickets (id, original_id, title, description, category)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(ticket_id)
        .bind(ticket.id)
        .bind(&ticket.title)
        .bind(&ticket.description)
        .bind(&ticket.category)
        .execute(&mut *tx)
        .await?;

        for (idx, reply) in ticket.replies.iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO kb_replies (id, ticket_id, owner, content, sequence_order)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(Uuid::new_v4())
            .bind(ticket_id)
            .bind(&reply.owner)
            .bind(&reply.content)
            .bind(idx as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
