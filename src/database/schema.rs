use super::Database;
use crate::Result;

impl Database {
    /// Check if the ticket store schema is initialized.
    /// Returns true if all required tables exist.
    pub async fn is_schema_initialized(&self) -> Result<bool> {
        let required_tables = vec!["kb_tickets", "kb_replies"];

        for table_name in required_tables {
            let result = sqlx::query_scalar::<_, bool>(
                r"
                SELECT EXISTS (
                    SELECT FROM information_schema.tables
                    WHERE table_schema = 'public'
                    AND table_name = $1
                )
                ",
            )
            .bind(table_name)
            .fetch_one(&self.pool)
            .await?;

            if !result {
                tracing::debug!("Missing required table: {}", table_name);
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Create the ticket store tables if they do not exist.
    ///
    /// Replies reference their ticket with cascading delete; sequence
    /// positions are unique per ticket.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS kb_tickets (
                id UUID PRIMARY KEY,
                original_id BIGINT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                category TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS kb_replies (
                id UUID PRIMARY KEY,
                ticket_id UUID NOT NULL REFERENCES kb_tickets(id) ON DELETE CASCADE,
                owner TEXT NOT NULL,
                content TEXT NOT NULL,
                sequence_order INTEGER NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                UNIQUE (ticket_id, sequence_order)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_kb_tickets_original_id ON kb_tickets (original_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_kb_tickets_category ON kb_tickets (category)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_kb_replies_ticket_id ON kb_replies (ticket_id)")
            .execute(&self.pool)
            .await?;

        tracing::debug!("Ticket store schema ensured");
        Ok(())
    }
}
