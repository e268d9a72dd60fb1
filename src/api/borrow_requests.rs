//! Borrow request endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::borrow_request::{BorrowRequest, CreateBorrowRequest},
    AppState,
};

use super::AuthenticatedUser;

/// Ask to borrow an item
#[utoipa::path(
    post,
    path = "/borrowing/requests",
    tag = "borrowing",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowRequest,
    responses(
        (status = 200, description = "Borrow request created", body = BorrowRequest),
        (status = 400, description = "Dates outside the availability window"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn create_borrow_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBorrowRequest>,
) -> AppResult<Json<BorrowRequest>> {
    let created = state
        .services
        .borrow_requests
        .create_borrow_request(claims.user_id, request)
        .await?;
    Ok(Json(created))
}

/// Get a borrow request
#[utoipa::path(
    get,
    path = "/borrowing/requests/{id}",
    tag = "borrowing",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Borrow request ID")
    ),
    responses(
        (status = 200, description = "Borrow request", body = BorrowRequest),
        (status = 403, description = "Not the borrower or the item owner"),
        (status = 404, description = "Borrow request not found")
    )
)]
pub async fn get_borrow_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BorrowRequest>> {
    let request = state
        .services
        .borrow_requests
        .get_borrow_request(claims.user_id, id)
        .await?;
    Ok(Json(request))
}

/// Requests made by the caller
#[utoipa::path(
    get,
    path = "/borrowing/requests/outgoing",
    tag = "borrowing",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Outgoing requests", body = Vec<BorrowRequest>)
    )
)]
pub async fn list_outgoing(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowRequest>>> {
    let requests = state.services.borrow_requests.list_outgoing(claims.user_id).await?;
    Ok(Json(requests))
}

/// Requests on the caller's items
#[utoipa::path(
    get,
    path = "/borrowing/requests/incoming",
    tag = "borrowing",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Incoming requests", body = Vec<BorrowRequest>)
    )
)]
pub async fn list_incoming(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowRequest>>> {
    let requests = state.services.borrow_requests.list_incoming(claims.user_id).await?;
    Ok(Json(requests))
}

/// Approve a pending request
#[utoipa::path(
    put,
    path = "/borrowing/requests/{id}/approve",
    tag = "borrowing",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Borrow request ID")
    ),
    responses(
        (status = 200, description = "Request approved", body = BorrowRequest),
        (status = 403, description = "Not the item owner"),
        (status = 404, description = "Borrow request not found"),
        (status = 409, description = "Not pending, overlapping dates or concurrent change")
    )
)]
pub async fn approve_borrow_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BorrowRequest>> {
    let request = state
        .services
        .borrow_requests
        .approve_borrow_request(claims.user_id, id)
        .await?;
    Ok(Json(request))
}

/// Reject a pending request
#[utoipa::path(
    put,
    path = "/borrowing/requests/{id}/reject",
    tag = "borrowing",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Borrow request ID")
    ),
    responses(
        (status = 200, description = "Request rejected", body = BorrowRequest),
        (status = 403, description = "Not the item owner"),
        (status = 409, description = "Request is not pending")
    )
)]
pub async fn reject_borrow_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BorrowRequest>> {
    let request = state
        .services
        .borrow_requests
        .reject_borrow_request(claims.user_id, id)
        .await?;
    Ok(Json(request))
}

/// Mark an accepted request as returned
#[utoipa::path(
    put,
    path = "/borrowing/requests/{id}/complete-return",
    tag = "borrowing",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Borrow request ID")
    ),
    responses(
        (status = 200, description = "Request returned", body = BorrowRequest),
        (status = 403, description = "Not a party to the request"),
        (status = 409, description = "Request is not accepted")
    )
)]
pub async fn complete_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BorrowRequest>> {
    let request = state
        .services
        .borrow_requests
        .complete_return(claims.user_id, id)
        .await?;
    Ok(Json(request))
}
