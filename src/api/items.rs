//! Item endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::item::{CreateItem, Item, ItemQuery, UpdateItem},
    AppState,
};

use super::AuthenticatedUser;

/// List items, optionally filtered
#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    security(("bearer_auth" = [])),
    params(ItemQuery),
    responses(
        (status = 200, description = "List of items", body = Vec<Item>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_items(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<ItemQuery>,
) -> AppResult<Json<Vec<Item>>> {
    let items = state.services.items.list_items(&query).await?;
    Ok(Json(items))
}

/// Get item details by ID
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item details", body = Item),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_item(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Item>> {
    let item = state.services.items.get_item(id).await?;
    Ok(Json(item))
}

/// List an item for lending
#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    security(("bearer_auth" = [])),
    request_body = CreateItem,
    responses(
        (status = 201, description = "Item created", body = Item),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(item): Json<CreateItem>,
) -> AppResult<(StatusCode, Json<Item>)> {
    let created = state.services.items.create_item(claims.user_id, item).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update one of the caller's items
#[utoipa::path(
    put,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Item ID")
    ),
    request_body = UpdateItem,
    responses(
        (status = 200, description = "Item updated", body = Item),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn update_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(update): Json<UpdateItem>,
) -> AppResult<Json<Item>> {
    let item = state.services.items.update_item(claims.user_id, id, update).await?;
    Ok(Json(item))
}

/// Remove one of the caller's items
#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn delete_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.services.items.delete_item(claims.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
