use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::participation::STATUS_REGISTERED;
use crate::models::user::{ROLE_ORGANIZER, ROLE_PARTICIPANT};
use crate::models::{Event, User, UserProfile};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::password::{hash_password, verify_password};
use crate::utils::response::{created, success};

const PROFILE_COLUMNS: &str = "id, name, email, role, created_at";

#[derive(Deserialize)]
pub struct CreateUserPayload {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

fn validate_email(email: &str) -> bool {
    email.contains('@') && email.len() <= 255
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<Response, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::ValidationError("Le nom est requis.".to_string()));
    }
    if !validate_email(&payload.email) {
        return Err(AppError::ValidationError(
            "Adresse e-mail invalide.".to_string(),
        ));
    }
    if payload.password.len() < 8 {
        return Err(AppError::ValidationError(
            "Le mot de passe doit contenir au moins 8 caractères.".to_string(),
        ));
    }
    if payload.role != ROLE_ORGANIZER && payload.role != ROLE_PARTICIPANT {
        return Err(AppError::ValidationError("Rôle inconnu.".to_string()));
    }

    let existing = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::ValidationError(
            "Un utilisateur avec ce courriel existe déjà.".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;

    let profile = sqlx::query_as::<_, UserProfile>(&format!(
        "INSERT INTO users (id, name, email, password_hash, role)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&password_hash)
    .bind(&payload.role)
    .fetch_one(&state.db)
    .await?;

    Ok(created(profile, "Utilisateur créé").into_response())
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginPayload>,
) -> Result<Response, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::AuthError("Courriel ou mot de passe invalide.".to_string()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::AuthError(
            "Courriel ou mot de passe invalide.".to_string(),
        ));
    }

    let profile = UserProfile {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        created_at: user.created_at,
    };

    Ok(success(profile, "Connexion réussie").into_response())
}

pub async fn list_users(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let users = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM users ORDER BY created_at"
    ))
    .fetch_all(&state.db)
    .await?;

    Ok(success(users, "Utilisateurs récupérés").into_response())
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let profile = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Utilisateur non trouvé.".to_string()))?;

    Ok(success(profile, "Utilisateur récupéré").into_response())
}

pub async fn get_user_by_email(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Response, AppError> {
    let profile = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(&email)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Utilisateur non trouvé.".to_string()))?;

    Ok(success(profile, "Utilisateur récupéré").into_response())
}

/// Events the user currently holds an active registration for.
pub async fn user_events(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let events = sqlx::query_as::<_, Event>(
        "SELECT events.* FROM events
         INNER JOIN participants ON events.id = participants.event_id
         WHERE participants.user_id = $1 AND participants.status = $2
         ORDER BY events.date",
    )
    .bind(user_id)
    .bind(STATUS_REGISTERED)
    .fetch_all(&state.db)
    .await?;

    Ok(success(events, "Événements récupérés").into_response())
}

#[derive(Serialize)]
struct EventCount {
    count: i64,
}

pub async fn user_event_count(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM participants WHERE user_id = $1 AND status = $2",
    )
    .bind(user_id)
    .bind(STATUS_REGISTERED)
    .fetch_one(&state.db)
    .await?;

    Ok(success(EventCount { count }, "Nombre d'événements récupéré").into_response())
}
