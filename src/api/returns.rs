//! Return endpoints keyed by item or agreement

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{agreement::BorrowingAgreement, return_request::SendReturnRequest},
    services::agreements::{ReturnResponse, ReturnStatus},
    AppState,
};

use super::AuthenticatedUser;

/// Borrower starts returning an item
#[utoipa::path(
    post,
    path = "/borrowing/returns/request/{item_id}",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(
        ("item_id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Return requested", body = BorrowingAgreement),
        (status = 403, description = "Not the borrower"),
        (status = 404, description = "No active borrowing found for this item"),
        (status = 409, description = "A return is already pending")
    )
)]
pub async fn initiate_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(item_id): Path<i64>,
) -> AppResult<Json<BorrowingAgreement>> {
    let agreement = state
        .services
        .agreements
        .initiate_return(claims.user_id, item_id)
        .await?;
    Ok(Json(agreement))
}

/// Lender confirms the return of an item
#[utoipa::path(
    post,
    path = "/borrowing/returns/confirm/{item_id}",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(
        ("item_id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Return confirmed", body = BorrowingAgreement),
        (status = 403, description = "Not the lender"),
        (status = 404, description = "No return request found for this item")
    )
)]
pub async fn confirm_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(item_id): Path<i64>,
) -> AppResult<Json<BorrowingAgreement>> {
    let agreement = state
        .services
        .agreements
        .confirm_return(claims.user_id, item_id)
        .await?;
    Ok(Json(agreement))
}

/// Return state of an item for the caller
#[utoipa::path(
    get,
    path = "/borrowing/returns/status/{item_id}",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(
        ("item_id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Latest return agreement or a message", body = ReturnStatus),
        (status = 404, description = "Item not found")
    )
)]
pub async fn return_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(item_id): Path<i64>,
) -> AppResult<Json<ReturnStatus>> {
    let status = state
        .services
        .agreements
        .return_status(claims.user_id, item_id)
        .await?;
    Ok(Json(status))
}

/// Lender confirms or rejects a return by agreement
#[utoipa::path(
    put,
    path = "/borrowing/returns/return/{agreement_id}/respond",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(
        ("agreement_id" = i64, Path, description = "Agreement ID")
    ),
    request_body = ReturnResponse,
    responses(
        (status = 200, description = "Return answered", body = BorrowingAgreement),
        (status = 403, description = "Not the lender"),
        (status = 409, description = "No return awaiting an answer")
    )
)]
pub async fn respond_to_return_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(agreement_id): Path<i64>,
    Json(response): Json<ReturnResponse>,
) -> AppResult<Json<BorrowingAgreement>> {
    let agreement = state
        .services
        .agreements
        .respond_to_return_request(claims.user_id, agreement_id, response)
        .await?;
    Ok(Json(agreement))
}

/// Borrower opens a return by agreement
#[utoipa::path(
    post,
    path = "/borrowing/returns/send-return-request",
    tag = "returns",
    security(("bearer_auth" = [])),
    request_body = SendReturnRequest,
    responses(
        (status = 200, description = "Return pending", body = BorrowingAgreement),
        (status = 403, description = "Not the borrower"),
        (status = 409, description = "Agreement cannot be returned now")
    )
)]
pub async fn send_return_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<SendReturnRequest>,
) -> AppResult<Json<BorrowingAgreement>> {
    let agreement = state
        .services
        .agreements
        .create_return_request(claims.user_id, request)
        .await?;
    Ok(Json(agreement))
}
