//! API handlers for Sharehood REST endpoints

pub mod activities;
pub mod agreements;
pub mod borrow_requests;
pub mod health;
pub mod items;
pub mod notifications;
pub mod openapi;
pub mod return_requests;
pub mod returns;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Items
        .route("/items", get(items::list_items).post(items::create_item))
        .route(
            "/items/:id",
            get(items::get_item)
                .put(items::update_item)
                .delete(items::delete_item),
        )
        // Borrow requests
        .route("/borrowing/requests", post(borrow_requests::create_borrow_request))
        .route("/borrowing/requests/outgoing", get(borrow_requests::list_outgoing))
        .route("/borrowing/requests/incoming", get(borrow_requests::list_incoming))
        .route("/borrowing/requests/:id", get(borrow_requests::get_borrow_request))
        .route("/borrowing/requests/:id/approve", put(borrow_requests::approve_borrow_request))
        .route("/borrowing/requests/:id/reject", put(borrow_requests::reject_borrow_request))
        .route(
            "/borrowing/requests/:id/complete-return",
            put(borrow_requests::complete_return),
        )
        // Agreements
        .route(
            "/borrowing/agreements",
            get(agreements::list_agreements).post(agreements::create_agreement),
        )
        .route("/borrowing/agreements/:id", get(agreements::get_agreement))
        .route("/borrowing/agreements/:id/accept", put(agreements::accept_agreement))
        .route("/borrowing/agreements/:id/decline", put(agreements::decline_agreement))
        // Returns
        .route("/borrowing/returns/request/:item_id", post(returns::initiate_return))
        .route("/borrowing/returns/confirm/:item_id", post(returns::confirm_return))
        .route("/borrowing/returns/status/:item_id", get(returns::return_status))
        .route(
            "/borrowing/returns/return/:agreement_id/respond",
            put(returns::respond_to_return_request),
        )
        .route(
            "/borrowing/returns/send-return-request",
            post(returns::send_return_request),
        )
        // Return requests
        .route("/borrowing/return-requests", post(return_requests::create_return_request))
        .route("/borrowing/return-requests/:id", get(return_requests::get_return_request))
        .route(
            "/borrowing/return-requests/:id/status",
            put(return_requests::update_return_request_status),
        )
        // Notifications
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/:id/read", put(notifications::mark_read))
        // Activity log
        .route("/activities", get(activities::list_activities))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
