use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::user::ROLE_PARTICIPANT;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Serialize, FromRow)]
struct MonthlyCount {
    month: String,
    count: i64,
}

/// Platform signups grouped by month, oldest first.
pub async fn monthly_signups(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let months = sqlx::query_as::<_, MonthlyCount>(
        "SELECT to_char(created_at, 'YYYY-MM') AS month, COUNT(*) AS count
         FROM users
         GROUP BY 1
         ORDER BY 1",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(success(months, "Inscriptions par mois récupérées").into_response())
}

#[derive(Serialize, FromRow)]
struct CategoryCount {
    category: String,
    count: i64,
}

pub async fn category_counts(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let categories = sqlx::query_as::<_, CategoryCount>(
        "SELECT category, COUNT(*) AS count FROM events GROUP BY category ORDER BY category",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(success(categories, "Catégories récupérées").into_response())
}

#[derive(Serialize)]
struct Totals {
    participants: i64,
    events: i64,
}

pub async fn totals(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let participants =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(ROLE_PARTICIPANT)
            .fetch_one(&state.db)
            .await?;

    let events = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events")
        .fetch_one(&state.db)
        .await?;

    Ok(success(Totals { participants, events }, "Totaux récupérés").into_response())
}

#[derive(Serialize, FromRow)]
struct InscriptionDetail {
    user_name: String,
    event_title: String,
    event_date: DateTime<Utc>,
    registered_at: DateTime<Utc>,
}

/// The data behind the admin registrations table (downloaded as CSV
/// client-side).
pub async fn list_inscriptions(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let inscriptions = sqlx::query_as::<_, InscriptionDetail>(
        "SELECT users.name AS user_name,
                events.title AS event_title,
                events.date AS event_date,
                inscriptions.registered_at
         FROM participants
         JOIN users ON participants.user_id = users.id
         JOIN events ON participants.event_id = events.id
         JOIN inscriptions ON inscriptions.user_id = participants.user_id
                          AND inscriptions.event_id = participants.event_id
         ORDER BY inscriptions.registered_at DESC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(success(inscriptions, "Inscriptions récupérées").into_response())
}
