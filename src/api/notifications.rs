//! Notification inbox endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::notification::{Notification, NotificationQuery},
    AppState,
};

use super::AuthenticatedUser;

/// Notifications of the caller, newest first
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(NotificationQuery),
    responses(
        (status = 200, description = "Notifications", body = Vec<Notification>)
    )
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<NotificationQuery>,
) -> AppResult<Json<Vec<Notification>>> {
    let notifications = state
        .services
        .notifications
        .list_for_user(claims.user_id, query.unread_only)
        .await?;
    Ok(Json(notifications))
}

#[utoipa::path(
    put,
    path = "/notifications/{id}/read",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Notification marked as read", body = Notification),
        (status = 403, description = "Notification of another user"),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Notification>> {
    let notification = state.services.notifications.mark_read(claims.user_id, id).await?;
    Ok(Json(notification))
}
