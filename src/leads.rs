/// Lead log module
///
/// Every free-text message is appended to the `leads` table together with the
/// sender's handle, for sales follow-up outside the bot.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Append-only sink for (username, message) pairs
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Append one lead and return its sequence id
    async fn record(&self, username: Option<&str>, message: &str) -> Result<i64>;
}

/// Lead log backed by a SQLite database
pub struct SqliteLeadStore {
    db_pool: SqlitePool,
}

impl SqliteLeadStore {
    /// Open (creating if needed) the database at `database_url`
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid DATABASE_URL: {}", database_url))?
            .create_if_missing(true);

        // An in-memory database lives only as long as its connection
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let db_pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to open lead database")?;

        Ok(Self { db_pool })
    }

    /// Create the leads table if it doesn't exist
    pub async fn initialize(&self) -> Result<()> {
        log::info!("Initializing lead table...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS leads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT,
                message TEXT
            )
            "#,
        )
        .execute(&self.db_pool)
        .await
        .context("Failed to create leads table")?;

        log::info!("Lead table initialized successfully");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db_pool
    }
}

#[async_trait]
impl LeadStore for SqliteLeadStore {
    async fn record(&self, username: Option<&str>, message: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO leads (username, message) VALUES (?1, ?2)")
            .bind(username)
            .bind(message)
            .execute(&self.db_pool)
            .await
            .context("Failed to insert lead")?;

        let id = result.last_insert_rowid();
        log::debug!("Lead {} recorded for {:?}", id, username);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    async fn memory_store() -> SqliteLeadStore {
        let store = SqliteLeadStore::connect("sqlite::memory:").await.unwrap();
        store.initialize().await.unwrap();
        store
    }

    #[tokio::test]
    async fn record_assigns_increasing_ids() {
        let store = memory_store().await;
        let first = store.record(Some("alice"), "تور استانبول").await.unwrap();
        let second = store.record(Some("alice"), "تور استانبول").await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn record_keeps_raw_text_and_null_handles() {
        let store = memory_store().await;
        let text = "Robert'); DROP TABLE leads;--";
        let id = store.record(None, text).await.unwrap();

        let row = sqlx::query("SELECT username, message FROM leads WHERE id = ?1")
            .bind(id)
            .fetch_one(store.pool())
            .await
            .unwrap();

        assert_eq!(row.get::<Option<String>, _>("username"), None);
        assert_eq!(row.get::<String, _>("message"), text);
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let store = memory_store().await;
        store.record(Some("bob"), "dubai").await.unwrap();
        store.initialize().await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
