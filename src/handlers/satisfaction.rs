use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Deserialize)]
pub struct RatingPayload {
    pub user_id: Uuid,
    pub rating: i32,
}

/// Records a site-wide rating; event-specific ratings carry an event id,
/// site-wide ones a NULL.
pub async fn rate_site(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RatingPayload>,
) -> Result<Response, AppError> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::ValidationError(
            "La note doit être comprise entre 1 et 5.".to_string(),
        ));
    }

    sqlx::query(
        "INSERT INTO site_satisfaction (id, user_id, rating, event_id) VALUES ($1, $2, $3, NULL)",
    )
    .bind(Uuid::new_v4())
    .bind(payload.user_id)
    .bind(payload.rating)
    .execute(&state.db)
    .await?;

    Ok(created((), "Merci pour votre évaluation !").into_response())
}

#[derive(Serialize, FromRow)]
struct RatingCount {
    rating: i32,
    count: i64,
}

pub async fn site_satisfaction(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let histogram = sqlx::query_as::<_, RatingCount>(
        "SELECT rating, COUNT(*) AS count
         FROM site_satisfaction
         WHERE event_id IS NULL
         GROUP BY rating
         ORDER BY rating",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(success(histogram, "Évaluations récupérées").into_response())
}
