pub mod database_tests;

use crate::config::AppConfig;
use crate::database::Database;
use crate::Result;

/// Test helper to create a test database connection with the schema in place
pub async fn create_test_database() -> Result<Database> {
    let config = AppConfig::load()?;
    let database = Database::from_config(&config).await?;
    database.ensure_schema().await?;
    Ok(database)
}

/// Test helper to clean up tickets created by a test run.
/// Replies go with their tickets via the cascade.
pub async fn cleanup_test_tickets(database: &Database, original_ids: &[i64]) -> Result<()> {
    sqlx::query("DELETE FROM kb_tickets WHERE original_id = ANY($1)")
        .bind(original_ids)
        .execute(database.pool())
        .await?;
    Ok(())
}
