//! Router tests: status codes and bodies through the full HTTP stack

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{token_for, TestApp};
use sharehood_server::{api::create_router, models::User};

async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    user: Option<&User>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token_for(user)));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = create_router(app.state())
        .oneshot(request)
        .await
        .expect("route executes");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let payload = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, payload)
}

fn drill() -> Value {
    json!({
        "name": "Cordless drill",
        "category": "tools",
        "available_from": "2024-06-01",
        "available_until": "2024-06-30",
        "image_urls": ["https://img.example.org/drill.jpg"]
    })
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new().await;

    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/api/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new().await;

    let (status, body) = send(&app, Method::GET, "/api/items", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 2);
    assert_eq!(body["message"], "Missing authorization header");
}

#[tokio::test]
async fn test_item_crud() {
    let app = TestApp::new().await;

    let (status, item) = send(&app, Method::POST, "/api/items", Some(&app.lender), Some(drill())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item["owner_id"], app.lender.id);
    assert_eq!(item["image_urls"][0], "https://img.example.org/drill.jpg");
    let uri = format!("/api/items/{}", item["id"]);

    let (status, items) = send(
        &app,
        Method::GET,
        "/api/items?category=tools&available_on=2024-06-15",
        Some(&app.borrower),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(items.as_array().map(Vec::len), Some(1));

    let (status, _) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&app.stranger),
        Some(json!({ "name": "Mine now" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&app.lender),
        Some(json!({ "location": "Garage" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["location"], "Garage");
    assert_eq!(updated["name"], "Cordless drill");

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&app.lender), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &uri, Some(&app.lender), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_item_with_inverted_window_is_rejected() {
    let app = TestApp::new().await;

    let mut body = drill();
    body["available_from"] = json!("2024-07-01");
    let (status, body) = send(&app, Method::POST, "/api/items", Some(&app.lender), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 5);
}

#[tokio::test]
async fn test_borrow_request_routes() {
    let app = TestApp::new().await;
    let item = app.june_item().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/borrowing/requests",
        Some(&app.borrower),
        Some(json!({
            "item_id": item.id,
            "start_date": "2024-06-05",
            "end_date": "2024-07-10"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("between 2024-06-01 and 2024-06-30"));

    let (status, request) = send(
        &app,
        Method::POST,
        "/api/borrowing/requests",
        Some(&app.borrower),
        Some(json!({
            "item_id": item.id,
            "start_date": "2024-06-05",
            "end_date": "2024-06-10"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(request["status"], "PENDING");
    let id = request["id"].as_i64().unwrap();

    let (status, incoming) = send(
        &app,
        Method::GET,
        "/api/borrowing/requests/incoming",
        Some(&app.lender),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(incoming[0]["id"], id);

    let approve = format!("/api/borrowing/requests/{}/approve", id);
    let (status, _) = send(&app, Method::PUT, &approve, Some(&app.borrower), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, approved) = send(&app, Method::PUT, &approve, Some(&app.lender), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "ACCEPTED");

    let (status, body) = send(&app, Method::PUT, &approve, Some(&app.lender), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 7);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/borrowing/requests/{}", id),
        Some(&app.stranger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_return_routes() {
    let app = TestApp::new().await;
    let item = app.june_item().await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/borrowing/returns/request/{}", item.id),
        Some(&app.borrower),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No active borrowing found for this item");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/borrowing/returns/status/{}", item.id),
        Some(&app.borrower),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "No return request found");

    let (status, agreement) = send(
        &app,
        Method::POST,
        "/api/borrowing/agreements",
        Some(&app.lender),
        Some(json!({
            "item_id": item.id,
            "borrower_id": app.borrower.id,
            "borrowing_start": "2024-06-05T09:00:00Z",
            "borrowing_end": "2024-06-10T18:00:00Z",
            "terms": "Handle with care"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let agreement_id = agreement["id"].as_i64().unwrap();

    let (status, accepted) = send(
        &app,
        Method::PUT,
        &format!("/api/borrowing/agreements/{}/accept", agreement_id),
        Some(&app.borrower),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "ACCEPTED");

    let (status, pending) = send(
        &app,
        Method::POST,
        "/api/borrowing/returns/send-return-request",
        Some(&app.borrower),
        Some(json!({ "agreement_id": agreement_id, "note": "In your mailbox" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending["status"], "RETURN_PENDING");

    let (status, returned) = send(
        &app,
        Method::PUT,
        &format!("/api/borrowing/returns/return/{}/respond", agreement_id),
        Some(&app.lender),
        Some(json!({ "response": "CONFIRMED" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(returned["status"], "RETURNED");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/borrowing/returns/confirm/{}", item.id),
        Some(&app.lender),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No return request found for this item");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/borrowing/returns/status/{}", item.id),
        Some(&app.lender),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agreement"]["status"], "RETURNED");
}

#[tokio::test]
async fn test_notification_inbox() {
    let app = TestApp::new().await;
    let item = app.june_item().await;

    let request = app
        .services
        .borrow_requests
        .create_borrow_request(
            app.borrower.id,
            sharehood_server::models::borrow_request::CreateBorrowRequest {
                item_id: item.id,
                start_date: common::date("2024-06-05"),
                end_date: common::date("2024-06-06"),
                message: None,
            },
        )
        .await
        .unwrap();
    app.services
        .borrow_requests
        .approve_borrow_request(app.lender.id, request.id)
        .await
        .unwrap();

    let (status, inbox) = send(
        &app,
        Method::GET,
        "/api/notifications?unread_only=true",
        Some(&app.borrower),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox[0]["title"], "Borrow Request Approved");
    assert_eq!(inbox[0]["notification_type"], "BORROW_REQUEST_APPROVED");
    let read_uri = format!("/api/notifications/{}/read", inbox[0]["id"]);

    let (status, _) = send(&app, Method::PUT, &read_uri, Some(&app.lender), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, read) = send(&app, Method::PUT, &read_uri, Some(&app.borrower), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["is_read"], true);

    let (_, unread) = send(
        &app,
        Method::GET,
        "/api/notifications?unread_only=true",
        Some(&app.borrower),
        None,
    )
    .await;
    assert_eq!(unread.as_array().map(Vec::len), Some(0));

    let (status, activities) = send(&app, Method::GET, "/api/activities", Some(&app.borrower), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(activities[0]["activity_type"], "BORROWING_STARTED");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = TestApp::new().await;

    let (status, doc) = send(&app, Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["info"]["title"], "Sharehood API");
}
