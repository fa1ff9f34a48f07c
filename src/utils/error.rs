use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Vous êtes déjà inscrit à cet événement.")]
    AlreadyRegistered,

    #[error("Événement non trouvé.")]
    EventNotFound,

    #[error("Impossible de récupérer l'adresse e-mail de l'utilisateur.")]
    MissingContactInfo,

    #[error("{0}")]
    LocationConflict(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    AuthError(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Email delivery failed: {0}")]
    EmailError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::AlreadyRegistered => StatusCode::CONFLICT,
            AppError::EventNotFound => StatusCode::NOT_FOUND,
            AppError::MissingContactInfo => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::LocationConflict(_) => StatusCode::CONFLICT,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::EmailError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::AlreadyRegistered => "ALREADY_REGISTERED",
            AppError::EventNotFound => "EVENT_NOT_FOUND",
            AppError::MissingContactInfo => "MISSING_CONTACT_INFO",
            AppError::LocationConflict(_) => "LOCATION_CONFLICT",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::EmailError(_) => "EMAIL_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
            other => {
                error!(code = other.code(), message = %other, "Request failed");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level messages to the client
        let public_message = match &self {
            AppError::DatabaseError(_) => "Erreur serveur.".to_string(),
            other => other.to_string(),
        };

        error_response(code, public_message, None, status)
    }
}
