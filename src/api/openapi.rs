//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{
    activities, agreements, borrow_requests, health, items, notifications, return_requests, returns,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sharehood API",
        version = "1.0.0",
        description = "Neighborhood item sharing REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Items
        items::list_items,
        items::get_item,
        items::create_item,
        items::update_item,
        items::delete_item,
        // Borrow requests
        borrow_requests::create_borrow_request,
        borrow_requests::get_borrow_request,
        borrow_requests::list_outgoing,
        borrow_requests::list_incoming,
        borrow_requests::approve_borrow_request,
        borrow_requests::reject_borrow_request,
        borrow_requests::complete_return,
        // Agreements
        agreements::create_agreement,
        agreements::list_agreements,
        agreements::get_agreement,
        agreements::accept_agreement,
        agreements::decline_agreement,
        // Returns
        returns::initiate_return,
        returns::confirm_return,
        returns::return_status,
        returns::respond_to_return_request,
        returns::send_return_request,
        return_requests::create_return_request,
        return_requests::get_return_request,
        return_requests::update_return_request_status,
        // Notifications
        notifications::list_notifications,
        notifications::mark_read,
        // Activities
        activities::list_activities,
    ),
    components(
        schemas(
            // Items
            crate::models::item::Item,
            crate::models::item::CreateItem,
            crate::models::item::UpdateItem,
            // Borrowing
            crate::models::borrow_request::BorrowRequest,
            crate::models::borrow_request::BorrowRequestStatus,
            crate::models::borrow_request::CreateBorrowRequest,
            crate::models::agreement::BorrowingAgreement,
            crate::models::agreement::AgreementStatus,
            crate::models::agreement::CreateAgreement,
            // Returns
            crate::models::return_request::ReturnRequest,
            crate::models::return_request::ReturnRequestStatus,
            crate::models::return_request::CreateReturnRequest,
            crate::models::return_request::SendReturnRequest,
            crate::models::return_request::UpdateReturnRequestStatus,
            crate::services::agreements::ReturnResponse,
            crate::services::agreements::ReturnStatus,
            // Notifications and activities
            crate::models::notification::Notification,
            crate::models::notification::NotificationType,
            crate::models::activity::UserActivity,
            crate::models::activity::ActivityType,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "items", description = "Items offered for lending"),
        (name = "borrowing", description = "Borrow requests"),
        (name = "agreements", description = "Borrowing agreements"),
        (name = "returns", description = "Item returns"),
        (name = "notifications", description = "Notification inbox"),
        (name = "activities", description = "User activity log")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_borrowing_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/borrowing/returns/confirm/{item_id}"));
        assert!(doc.paths.paths.contains_key("/borrowing/requests/{id}/approve"));
    }
}
