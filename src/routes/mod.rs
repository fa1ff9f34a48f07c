use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{
    events, health_check, notifications, registrations, satisfaction, stats, users,
};
use crate::state::AppState;

pub fn create_routes(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/events", post(events::create_event).get(events::list_events))
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/:id/register", post(registrations::register))
        .route("/events/:id/cancel", put(registrations::cancel))
        .route("/categories/:category", get(events::events_by_category))
        .route("/users", post(users::create_user).get(users::list_users))
        .route("/users/login", post(users::login))
        .route("/users/:id", get(users::get_user))
        .route("/users/email/:email", get(users::get_user_by_email))
        .route("/users/:id/events", get(users::user_events))
        .route("/users/:id/events/count", get(users::user_event_count))
        .route(
            "/users/:id/notifications",
            get(notifications::list_notifications),
        )
        .route("/notifications", post(notifications::create_notification))
        .route(
            "/notifications/:id",
            delete(notifications::delete_notification),
        )
        .route(
            "/satisfaction/site",
            post(satisfaction::rate_site).get(satisfaction::site_satisfaction),
        )
        .route("/stats/registrations/monthly", get(stats::monthly_signups))
        .route("/stats/totals", get(stats::totals))
        .route("/stats/categories", get(stats::category_counts))
        .route("/inscriptions", get(stats::list_inscriptions));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}
