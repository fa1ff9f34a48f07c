use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::Event;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

#[derive(Deserialize)]
pub struct EventPayload {
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub location: String,
    pub organizer_id: Uuid,
    pub image_url: Option<String>,
    pub category: String,
}

impl EventPayload {
    fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::ValidationError("Le titre est requis.".to_string()));
        }
        if self.location.trim().is_empty() {
            return Err(AppError::ValidationError("Le lieu est requis.".to_string()));
        }
        if self.category.trim().is_empty() {
            return Err(AppError::ValidationError(
                "La catégorie est requise.".to_string(),
            ));
        }
        Ok(())
    }
}

/// A venue holds one event at a time: creation is refused when another
/// event already occupies the same (date, location) slot, and the
/// organizer is told which one.
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EventPayload>,
) -> Result<Response, AppError> {
    payload.validate()?;

    let occupied = sqlx::query_scalar::<_, String>(
        "SELECT title FROM events WHERE date = $1 AND location = $2",
    )
    .bind(payload.date)
    .bind(&payload.location)
    .fetch_optional(&state.db)
    .await?;

    if let Some(existing_title) = occupied {
        state
            .notifications()
            .notify(
                payload.organizer_id,
                &format!(
                    "La salle est déjà réservée pour l'événement \"{existing_title}\" à cette date."
                ),
            )
            .await?;
        return Err(AppError::LocationConflict(
            "Impossible de créer l'événement : la salle est déjà réservée à cette date."
                .to_string(),
        ));
    }

    let event = sqlx::query_as::<_, Event>(
        "INSERT INTO events (id, organizer_id, title, description, date, location, image_url, category)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(payload.organizer_id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.date)
    .bind(&payload.location)
    .bind(&payload.image_url)
    .bind(&payload.category)
    .fetch_one(&state.db)
    .await?;

    state
        .notifications()
        .notify(
            event.organizer_id,
            &format!("Un nouvel événement a été créé : {}", event.title),
        )
        .await?;

    Ok(created(event, "Événement créé").into_response())
}

pub async fn list_events(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let events = sqlx::query_as::<_, Event>("SELECT * FROM events ORDER BY date")
        .fetch_all(&state.db)
        .await?;

    Ok(success(events, "Événements récupérés").into_response())
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::EventNotFound)?;

    Ok(success(event, "Événement récupéré").into_response())
}

pub async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<EventPayload>,
) -> Result<Response, AppError> {
    payload.validate()?;

    sqlx::query_scalar::<_, Uuid>("SELECT id FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::EventNotFound)?;

    // the slot check also applies to reschedules, minus the event itself
    let occupied = sqlx::query_scalar::<_, String>(
        "SELECT title FROM events WHERE date = $1 AND location = $2 AND id <> $3",
    )
    .bind(payload.date)
    .bind(&payload.location)
    .bind(event_id)
    .fetch_optional(&state.db)
    .await?;

    if occupied.is_some() {
        return Err(AppError::LocationConflict(
            "Impossible de modifier l'événement : la salle est déjà réservée à cette date."
                .to_string(),
        ));
    }

    let event = sqlx::query_as::<_, Event>(
        "UPDATE events
         SET title = $1, description = $2, date = $3, location = $4,
             organizer_id = $5, image_url = $6, category = $7
         WHERE id = $8
         RETURNING *",
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.date)
    .bind(&payload.location)
    .bind(payload.organizer_id)
    .bind(&payload.image_url)
    .bind(&payload.category)
    .bind(event_id)
    .fetch_one(&state.db)
    .await?;

    Ok(success(event, "Événement mis à jour").into_response())
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::EventNotFound)?;

    sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(event_id)
        .execute(&state.db)
        .await?;

    state
        .notifications()
        .notify(
            event.organizer_id,
            &format!("L'événement \"{}\" a été supprimé.", event.title),
        )
        .await?;

    Ok(empty_success("Événement supprimé").into_response())
}

pub async fn events_by_category(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> Result<Response, AppError> {
    let events = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE category = $1 ORDER BY date")
        .bind(&category)
        .fetch_all(&state.db)
        .await?;

    Ok(success(events, "Événements récupérés").into_response())
}
