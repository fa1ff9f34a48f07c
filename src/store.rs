use sqlx::PgPool;
use uuid::Uuid;

use crate::models::participation::{STATUS_CANCELLED, STATUS_REGISTERED};
use crate::models::{Event, Participation};
use crate::services::notifications::NotificationStore;
use crate::services::registration::RegistrationStore;
use crate::utils::error::AppError;

/// Postgres-backed persistence for the workflow services.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_notification(&self, user_id: Uuid, message: &str) -> Result<(), AppError> {
        sqlx::query("INSERT INTO notifications (id, user_id, message) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(message)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn fetch_user_email(&self, user_id: Uuid) -> Result<Option<String>, AppError> {
        let email = sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(email)
    }
}

impl RegistrationStore for PgStore {
    async fn is_registered(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM participants WHERE user_id = $1 AND event_id = $2 AND status = $3",
        )
        .bind(user_id)
        .bind(event_id)
        .bind(STATUS_REGISTERED)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn find_event(&self, event_id: Uuid) -> Result<Option<Event>, AppError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    async fn user_email(&self, user_id: Uuid) -> Result<Option<String>, AppError> {
        self.fetch_user_email(user_id).await
    }

    async fn record_registration(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<Participation>, AppError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, Participation>(
            "INSERT INTO participants (id, user_id, event_id, status)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(event_id)
        .bind(STATUS_REGISTERED)
        .fetch_one(&mut *tx)
        .await;

        let participation = match inserted {
            Ok(row) => row,
            // partial unique index on active rows: another registration won
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        sqlx::query("INSERT INTO inscriptions (id, user_id, event_id) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(event_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(participation))
    }

    async fn cancel_registrations(&self, user_id: Uuid, event_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE participants SET status = $1 WHERE user_id = $2 AND event_id = $3",
        )
        .bind(STATUS_CANCELLED)
        .bind(user_id)
        .bind(event_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn add_notification(&self, user_id: Uuid, message: &str) -> Result<(), AppError> {
        self.insert_notification(user_id, message).await
    }
}

impl NotificationStore for PgStore {
    async fn add_notification(&self, user_id: Uuid, message: &str) -> Result<(), AppError> {
        self.insert_notification(user_id, message).await
    }

    async fn user_email(&self, user_id: Uuid) -> Result<Option<String>, AppError> {
        self.fetch_user_email(user_id).await
    }
}
