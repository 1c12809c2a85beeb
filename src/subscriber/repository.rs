//! Subscriber repository.

use chrono::{DateTime, Utc};

use super::types::Subscriber;
use crate::datetime::{format_timestamp, parse_timestamp};
use crate::db::DbPool;
use crate::{FreebiesError, Result};

/// Row type for a subscriber from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SubscriberRow {
    chat_id: i64,
    last_post: String,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = FreebiesError;

    fn try_from(row: SubscriberRow) -> Result<Self> {
        // An empty watermark means "registered, nothing delivered yet".
        if row.last_post.is_empty() {
            return Ok(Subscriber::new(row.chat_id, Utc::now()));
        }

        let last_post = parse_timestamp(&row.last_post).ok_or_else(|| {
            FreebiesError::Database(format!(
                "invalid last_post for chat {}: {:?}",
                row.chat_id, row.last_post
            ))
        })?;

        Ok(Subscriber::new(row.chat_id, last_post))
    }
}

/// Repository for subscriber operations.
pub struct SubscriberRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SubscriberRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// List all subscribers in registration order.
    pub async fn list(&self) -> Result<Vec<Subscriber>> {
        let rows = sqlx::query_as::<_, SubscriberRow>(
            r#"
            SELECT chat_id, last_post
            FROM subscribers
            ORDER BY created_at, chat_id
            "#,
        )
        .fetch_all(self.pool)
        .await
        .map_err(|e| FreebiesError::Database(e.to_string()))?;

        rows.into_iter().map(Subscriber::try_from).collect()
    }

    /// Get a subscriber by chat ID.
    pub async fn get(&self, chat_id: i64) -> Result<Option<Subscriber>> {
        let row = sqlx::query_as::<_, SubscriberRow>(
            "SELECT chat_id, last_post FROM subscribers WHERE chat_id = $1",
        )
        .bind(chat_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| FreebiesError::Database(e.to_string()))?;

        row.map(Subscriber::try_from).transpose()
    }

    /// Register a chat unless it is already subscribed.
    ///
    /// Returns `true` if a new row was created. An existing subscriber keeps
    /// its watermark.
    pub async fn create_or_ignore(&self, chat_id: i64, last_post: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO subscribers (chat_id, last_post)
            VALUES ($1, $2)
            ON CONFLICT(chat_id) DO NOTHING
            "#,
        )
        .bind(chat_id)
        .bind(format_timestamp(&last_post))
        .execute(self.pool)
        .await
        .map_err(|e| FreebiesError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a subscriber. Returns `true` if a row was deleted.
    pub async fn delete(&self, chat_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subscribers WHERE chat_id = $1")
            .bind(chat_id)
            .execute(self.pool)
            .await
            .map_err(|e| FreebiesError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Move a subscriber's watermark forward.
    ///
    /// The update only applies when `at` is not earlier than the stored
    /// value. Returns `true` if the row was updated.
    pub async fn advance_last_post(&self, chat_id: i64, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE subscribers
            SET last_post = $1
            WHERE chat_id = $2 AND last_post <= $1
            "#,
        )
        .bind(format_timestamp(&at))
        .bind(chat_id)
        .execute(self.pool)
        .await
        .map_err(|e| FreebiesError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Count subscribers.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscribers")
            .fetch_one(self.pool)
            .await
            .map_err(|e| FreebiesError::Database(e.to_string()))?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::{Duration, TimeZone};

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = setup_db().await;
        let repo = SubscriberRepository::new(db.pool());

        assert!(repo.create_or_ignore(100, t0()).await.unwrap());
        let subscriber = repo.get(100).await.unwrap().unwrap();
        assert_eq!(subscriber, Subscriber::new(100, t0()));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = setup_db().await;
        let repo = SubscriberRepository::new(db.pool());
        assert!(repo.get(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_or_ignore_keeps_watermark() {
        let db = setup_db().await;
        let repo = SubscriberRepository::new(db.pool());

        assert!(repo.create_or_ignore(100, t0()).await.unwrap());
        assert!(!repo
            .create_or_ignore(100, t0() - Duration::days(3))
            .await
            .unwrap());

        let subscriber = repo.get(100).await.unwrap().unwrap();
        assert_eq!(subscriber.last_post, t0());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_in_registration_order() {
        let db = setup_db().await;
        let repo = SubscriberRepository::new(db.pool());

        for (chat_id, created_at) in [
            (3_i64, "2024-01-01 00:00:00"),
            (1, "2024-01-02 00:00:00"),
            (2, "2024-01-02 00:00:00"),
        ] {
            sqlx::query(
                "INSERT INTO subscribers (chat_id, last_post, created_at) VALUES ($1, $2, $3)",
            )
            .bind(chat_id)
            .bind(format_timestamp(&t0()))
            .bind(created_at)
            .execute(db.pool())
            .await
            .unwrap();
        }

        let ids: Vec<i64> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.chat_id)
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = setup_db().await;
        let repo = SubscriberRepository::new(db.pool());

        repo.create_or_ignore(100, t0()).await.unwrap();
        assert!(repo.delete(100).await.unwrap());
        assert!(!repo.delete(100).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_advance_last_post_moves_forward() {
        let db = setup_db().await;
        let repo = SubscriberRepository::new(db.pool());

        repo.create_or_ignore(100, t0()).await.unwrap();
        let later = t0() + Duration::minutes(5);
        assert!(repo.advance_last_post(100, later).await.unwrap());
        assert_eq!(repo.get(100).await.unwrap().unwrap().last_post, later);
    }

    #[tokio::test]
    async fn test_advance_last_post_never_regresses() {
        let db = setup_db().await;
        let repo = SubscriberRepository::new(db.pool());

        repo.create_or_ignore(100, t0()).await.unwrap();
        assert!(!repo
            .advance_last_post(100, t0() - Duration::seconds(1))
            .await
            .unwrap());
        assert_eq!(repo.get(100).await.unwrap().unwrap().last_post, t0());
    }

    #[tokio::test]
    async fn test_advance_last_post_unknown_chat() {
        let db = setup_db().await;
        let repo = SubscriberRepository::new(db.pool());
        assert!(!repo.advance_last_post(7, t0()).await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_last_post_reads_as_now() {
        let db = setup_db().await;
        sqlx::query("INSERT INTO subscribers (chat_id, last_post) VALUES ($1, '')")
            .bind(5_i64)
            .execute(db.pool())
            .await
            .unwrap();

        let before = Utc::now();
        let subscriber = SubscriberRepository::new(db.pool())
            .get(5)
            .await
            .unwrap()
            .unwrap();
        assert!(subscriber.last_post >= before);
    }

    #[tokio::test]
    async fn test_invalid_last_post_fails_list() {
        let db = setup_db().await;
        sqlx::query("INSERT INTO subscribers (chat_id, last_post) VALUES ($1, 'yesterday')")
            .bind(5_i64)
            .execute(db.pool())
            .await
            .unwrap();

        let result = SubscriberRepository::new(db.pool()).list().await;
        assert!(matches!(result, Err(FreebiesError::Database(_))));
    }
}
