//! Borrowing agreement endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::agreement::{BorrowingAgreement, CreateAgreement},
    AppState,
};

use super::AuthenticatedUser;

/// Propose an agreement for one of the caller's items
#[utoipa::path(
    post,
    path = "/borrowing/agreements",
    tag = "agreements",
    security(("bearer_auth" = [])),
    request_body = CreateAgreement,
    responses(
        (status = 201, description = "Agreement proposed", body = BorrowingAgreement),
        (status = 400, description = "Invalid period or borrower"),
        (status = 403, description = "Not the item owner")
    )
)]
pub async fn create_agreement(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(agreement): Json<CreateAgreement>,
) -> AppResult<(StatusCode, Json<BorrowingAgreement>)> {
    let created = state.services.agreements.create(claims.user_id, agreement).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Agreements where the caller lends or borrows
#[utoipa::path(
    get,
    path = "/borrowing/agreements",
    tag = "agreements",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Agreements of the caller", body = Vec<BorrowingAgreement>)
    )
)]
pub async fn list_agreements(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowingAgreement>>> {
    let agreements = state.services.agreements.list_for_user(claims.user_id).await?;
    Ok(Json(agreements))
}

/// Get an agreement
#[utoipa::path(
    get,
    path = "/borrowing/agreements/{id}",
    tag = "agreements",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Agreement ID")
    ),
    responses(
        (status = 200, description = "Agreement", body = BorrowingAgreement),
        (status = 403, description = "Not a party to the agreement"),
        (status = 404, description = "Agreement not found")
    )
)]
pub async fn get_agreement(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BorrowingAgreement>> {
    let agreement = state.services.agreements.get(claims.user_id, id).await?;
    Ok(Json(agreement))
}

/// Borrower accepts a proposed agreement
#[utoipa::path(
    put,
    path = "/borrowing/agreements/{id}/accept",
    tag = "agreements",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Agreement ID")
    ),
    responses(
        (status = 200, description = "Agreement accepted", body = BorrowingAgreement),
        (status = 403, description = "Not the borrower"),
        (status = 409, description = "Not pending or item already lent")
    )
)]
pub async fn accept_agreement(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BorrowingAgreement>> {
    let agreement = state.services.agreements.accept(claims.user_id, id).await?;
    Ok(Json(agreement))
}

/// Borrower declines a proposed agreement
#[utoipa::path(
    put,
    path = "/borrowing/agreements/{id}/decline",
    tag = "agreements",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Agreement ID")
    ),
    responses(
        (status = 200, description = "Agreement declined", body = BorrowingAgreement),
        (status = 403, description = "Not the borrower"),
        (status = 409, description = "Agreement is not pending")
    )
)]
pub async fn decline_agreement(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BorrowingAgreement>> {
    let agreement = state.services.agreements.decline(claims.user_id, id).await?;
    Ok(Json(agreement))
}
