//! Activity log endpoint

use axum::{extract::State, Json};

use crate::{error::AppResult, models::activity::UserActivity, AppState};

use super::AuthenticatedUser;

/// Activity history of the caller
#[utoipa::path(
    get,
    path = "/activities",
    tag = "activities",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Activity entries, newest first", body = Vec<UserActivity>)
    )
)]
pub async fn list_activities(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<UserActivity>>> {
    let activities = state.services.activities.list_for_user(claims.user_id).await?;
    Ok(Json(activities))
}
