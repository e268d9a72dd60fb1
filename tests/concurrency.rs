//! Concurrent workflows against a file database with several pooled
//! connections

mod common;

use std::{str::FromStr, time::Duration};

use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteConnection},
    ConnectOptions, Connection,
};

use common::{date, TestApp};
use sharehood_server::{
    models::{
        agreement::{AgreementStatus, BorrowingAgreement, CreateAgreement},
        borrow_request::CreateBorrowRequest,
        item::Item,
    },
    AppError,
};

fn at(day: &str) -> DateTime<Utc> {
    date(day).and_hms_opt(9, 0, 0).unwrap().and_utc()
}

async fn accepted_agreement(app: &TestApp, item: &Item) -> BorrowingAgreement {
    let proposed = app
        .services
        .agreements
        .create(
            app.lender.id,
            CreateAgreement {
                item_id: item.id,
                borrower_id: app.borrower.id,
                borrow_request_id: None,
                borrowing_start: at("2024-06-05"),
                borrowing_end: at("2024-06-10"),
                terms: None,
            },
        )
        .await
        .unwrap();
    app.services
        .agreements
        .accept(app.borrower.id, proposed.id)
        .await
        .unwrap()
}

async fn separate_connection(app: &TestApp) -> SqliteConnection {
    let url = app.database_url.as_deref().expect("file database");
    SqliteConnection::connect(url).await.expect("connection")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_return_initiation_has_one_winner() {
    let app = TestApp::with_file_database().await;

    for _ in 0..10 {
        let item = app.june_item().await;
        let agreement = accepted_agreement(&app, &item).await;

        let agreements = &app.services.agreements;
        let (first, second) = tokio::join!(
            agreements.initiate_return(app.borrower.id, item.id),
            agreements.initiate_return(app.borrower.id, item.id),
        );

        let (won, lost) = match (first, second) {
            (Ok(won), Err(lost)) | (Err(lost), Ok(won)) => (won, lost),
            other => panic!("expected one success and one failure: {:?}", other),
        };
        assert_eq!(won.status, AgreementStatus::ReturnRequested);
        assert_eq!(won.version, agreement.version + 1);
        assert!(matches!(lost, AppError::Conflict(_)), "unexpected error: {:?}", lost);

        let mut conn = app.repository.acquire().await.unwrap();
        let pending: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM return_requests WHERE item_id = ? AND status = 'PENDING'",
        )
        .bind(item.id)
        .fetch_one(&mut *conn)
        .await
        .unwrap();
        assert_eq!(pending, 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_approvals_of_overlapping_requests() {
    let app = TestApp::with_file_database().await;
    let item = app.june_item().await;

    let mut ids = Vec::new();
    for (start, end) in [("2024-06-05", "2024-06-10"), ("2024-06-08", "2024-06-12")] {
        let request = app
            .services
            .borrow_requests
            .create_borrow_request(
                app.borrower.id,
                CreateBorrowRequest {
                    item_id: item.id,
                    start_date: date(start),
                    end_date: date(end),
                    message: None,
                },
            )
            .await
            .unwrap();
        ids.push(request.id);
    }

    let requests = &app.services.borrow_requests;
    let (first, second) = tokio::join!(
        requests.approve_borrow_request(app.lender.id, ids[0]),
        requests.approve_borrow_request(app.lender.id, ids[1]),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(AppError::Conflict(_)))));
}

#[tokio::test]
async fn test_writes_are_visible_to_other_connections() {
    let app = TestApp::with_file_database().await;

    for _ in 0..10 {
        let item = app.june_item().await;

        let mut other = separate_connection(&app).await;
        let found = app
            .repository
            .items
            .get_by_id(&mut other, item.id)
            .await
            .unwrap();
        assert_eq!(found.name, "Cordless drill");
        other.close().await.unwrap();
    }

    let item = app.june_item().await;
    let request = app
        .services
        .borrow_requests
        .create_borrow_request(
            app.borrower.id,
            CreateBorrowRequest {
                item_id: item.id,
                start_date: date("2024-06-05"),
                end_date: date("2024-06-06"),
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
    let inbox = app
        .services
        .notifications
        .list_for_user(app.borrower.id, false)
        .await
        .unwrap();
    let read = app
        .services
        .notifications
        .mark_read(app.borrower.id, inbox[0].id)
        .await
        .unwrap();
    assert!(read.is_read);

    let mut other = separate_connection(&app).await;
    let stored = app
        .repository
        .notifications
        .get_by_id(&mut other, read.id)
        .await
        .unwrap();
    assert!(stored.is_read);
    other.close().await.unwrap();
}

#[tokio::test]
async fn test_locked_database_is_a_conflict() {
    let app = TestApp::with_file_database().await;
    let url = app.database_url.clone().unwrap();

    let mut holder = separate_connection(&app).await;
    sqlx::query("BEGIN IMMEDIATE")
        .execute(&mut holder)
        .await
        .unwrap();

    let mut impatient = SqliteConnectOptions::from_str(&url)
        .unwrap()
        .busy_timeout(Duration::ZERO)
        .connect()
        .await
        .unwrap();
    let err = sqlx::query("BEGIN IMMEDIATE")
        .execute(&mut impatient)
        .await
        .unwrap_err();
    assert!(matches!(AppError::from(err), AppError::Conflict(_)));

    sqlx::query("ROLLBACK").execute(&mut holder).await.unwrap();
    holder.close().await.unwrap();
    impatient.close().await.unwrap();
}
