//! Return request endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::return_request::{CreateReturnRequest, ReturnRequest, UpdateReturnRequestStatus},
    AppState,
};

use super::AuthenticatedUser;

#[utoipa::path(
    post,
    path = "/borrowing/return-requests",
    tag = "returns",
    security(("bearer_auth" = [])),
    request_body = CreateReturnRequest,
    responses(
        (status = 201, description = "Return request created", body = ReturnRequest),
        (status = 404, description = "No active borrowing found for this item"),
        (status = 409, description = "A pending return request already exists")
    )
)]
pub async fn create_return_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateReturnRequest>,
) -> AppResult<(StatusCode, Json<ReturnRequest>)> {
    let created = state
        .services
        .return_requests
        .create_return_request(claims.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/borrowing/return-requests/{id}",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Return request ID")
    ),
    responses(
        (status = 200, description = "Return request", body = ReturnRequest),
        (status = 403, description = "Not a party to the return request"),
        (status = 404, description = "Return request not found")
    )
)]
pub async fn get_return_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ReturnRequest>> {
    let request = state
        .services
        .return_requests
        .get_return_request(claims.user_id, id)
        .await?;
    Ok(Json(request))
}

#[utoipa::path(
    put,
    path = "/borrowing/return-requests/{id}/status",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Return request ID")
    ),
    request_body = UpdateReturnRequestStatus,
    responses(
        (status = 200, description = "Return request answered", body = ReturnRequest),
        (status = 403, description = "Not the lender"),
        (status = 409, description = "Return request already answered")
    )
)]
pub async fn update_return_request_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(update): Json<UpdateReturnRequestStatus>,
) -> AppResult<Json<ReturnRequest>> {
    let request = state
        .services
        .return_requests
        .update_return_request_status(claims.user_id, id, update)
        .await?;
    Ok(Json(request))
}
