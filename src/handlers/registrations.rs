use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::empty_success;

#[derive(Deserialize)]
pub struct RegistrationPayload {
    pub user_id: Uuid,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<RegistrationPayload>,
) -> Result<Response, AppError> {
    state
        .registrations()
        .register(payload.user_id, event_id)
        .await?;

    Ok(empty_success("Inscription réussie et email envoyé !").into_response())
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<RegistrationPayload>,
) -> Result<Response, AppError> {
    state
        .registrations()
        .cancel(payload.user_id, event_id)
        .await?;

    Ok(empty_success("Inscription annulée et email envoyé !").into_response())
}
