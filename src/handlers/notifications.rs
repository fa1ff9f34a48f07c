use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::Notification;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{empty_success, success};

#[derive(Deserialize)]
pub struct NotifyPayload {
    pub user_id: Uuid,
    pub message: String,
}

pub async fn create_notification(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NotifyPayload>,
) -> Result<Response, AppError> {
    if payload.message.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Le message est requis.".to_string(),
        ));
    }

    state
        .notifications()
        .notify(payload.user_id, &payload.message)
        .await?;

    Ok(empty_success("Notification créée").into_response())
}

pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT id, user_id, message, sent_at FROM notifications
         WHERE user_id = $1
         ORDER BY sent_at DESC",
    )
    .bind(user_id)
    .fetch_all(&state.db)
    .await?;

    Ok(success(notifications, "Notifications récupérées").into_response())
}

pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    Path(notification_id): Path<Uuid>,
) -> Result<Response, AppError> {
    sqlx::query("DELETE FROM notifications WHERE id = $1")
        .bind(notification_id)
        .execute(&state.db)
        .await?;

    Ok(empty_success("Notification supprimée").into_response())
}
