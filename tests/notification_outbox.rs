//! Outbox delivery and retry tests

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use common::{date, TestApp};
use sharehood_server::{
    config::NotificationsConfig,
    models::{
        borrow_request::CreateBorrowRequest,
        notification::{Notification, OutboxStatus},
        User,
    },
    services::dispatcher::{DispatchReport, NotificationDispatcher, NotificationSender},
    AppError, AppResult,
};

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send(&self, recipient: &User, notification: &Notification) -> AppResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.username.clone(), notification.title.clone()));
        Ok(())
    }
}

struct FailingSender;

#[async_trait]
impl NotificationSender for FailingSender {
    async fn send(&self, _recipient: &User, _notification: &Notification) -> AppResult<()> {
        Err(AppError::Internal("SMTP relay unreachable".to_string()))
    }
}

fn config() -> NotificationsConfig {
    NotificationsConfig {
        max_attempts: 2,
        retry_base_delay_secs: 30,
        retry_max_delay_secs: 600,
        ..NotificationsConfig::default()
    }
}

/// Approve a request so the borrower has one queued notification
async fn queue_one(app: &TestApp) -> Notification {
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
    assert_eq!(inbox.len(), 1);
    inbox.into_iter().next().unwrap()
}

#[tokio::test]
async fn test_dispatch_delivers_once() {
    let app = TestApp::new().await;
    let notification = queue_one(&app).await;

    let sender = Arc::new(RecordingSender::default());
    let dispatcher = NotificationDispatcher::new(app.repository.clone(), sender.clone(), config());

    let report = dispatcher.dispatch_due().await.unwrap();
    assert_eq!(
        report,
        DispatchReport {
            delivered: 1,
            ..DispatchReport::default()
        }
    );
    assert_eq!(
        sender.sent.lock().unwrap().clone(),
        vec![("bruno".to_string(), "Borrow Request Approved".to_string())]
    );

    let mut conn = app.repository.acquire().await.unwrap();
    let entry = app
        .repository
        .notifications
        .outbox_for_notification(&mut conn, notification.id)
        .await
        .unwrap();
    drop(conn);
    assert_eq!(entry.status, OutboxStatus::Delivered);
    assert_eq!(entry.attempts, 1);
    assert!(entry.delivered_at.is_some());

    let report = dispatcher.dispatch_due().await.unwrap();
    assert_eq!(report, DispatchReport::default());
    assert_eq!(sender.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_delivery_is_retried_then_abandoned() {
    let app = TestApp::new().await;
    let notification = queue_one(&app).await;
    let dispatcher = NotificationDispatcher::new(app.repository.clone(), Arc::new(FailingSender), config());

    let before = Utc::now();
    let report = dispatcher.dispatch_due().await.unwrap();
    assert_eq!(report.retried, 1);

    let mut conn = app.repository.acquire().await.unwrap();
    let entry = app
        .repository
        .notifications
        .outbox_for_notification(&mut conn, notification.id)
        .await
        .unwrap();
    drop(conn);
    assert_eq!(entry.status, OutboxStatus::Pending);
    assert_eq!(entry.attempts, 1);
    assert!(entry.next_attempt_at >= before + Duration::seconds(30));
    assert!(entry
        .last_error
        .as_deref()
        .unwrap()
        .contains("SMTP relay unreachable"));

    // Not due yet
    let report = dispatcher.dispatch_due().await.unwrap();
    assert_eq!(report, DispatchReport::default());

    let mut conn = app.repository.acquire().await.unwrap();
    sqlx::query("UPDATE notification_outbox SET next_attempt_at = ? WHERE id = ?")
        .bind(Utc::now() - Duration::minutes(1))
        .bind(entry.id)
        .execute(&mut *conn)
        .await
        .unwrap();
    drop(conn);

    let report = dispatcher.dispatch_due().await.unwrap();
    assert_eq!(report.failed, 1);

    let mut conn = app.repository.acquire().await.unwrap();
    let entry = app
        .repository
        .notifications
        .outbox_for_notification(&mut conn, notification.id)
        .await
        .unwrap();
    assert_eq!(entry.status, OutboxStatus::Failed);
    assert_eq!(entry.attempts, 2);
    drop(conn);

    // The workflow outcome is unaffected by delivery
    let inbox = app
        .services
        .notifications
        .list_for_user(app.borrower.id, false)
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1);
}

#[tokio::test]
async fn test_bookkeeping_failure_does_not_stop_the_batch() {
    let app = TestApp::new().await;
    let item = app.june_item().await;

    let mut ids = Vec::new();
    for (start, end) in [("2024-06-05", "2024-06-06"), ("2024-06-20", "2024-06-21")] {
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
    app.services
        .borrow_requests
        .approve_borrow_request(app.lender.id, ids[0])
        .await
        .unwrap();
    app.services
        .borrow_requests
        .reject_borrow_request(app.lender.id, ids[1])
        .await
        .unwrap();

    let inbox = app
        .services
        .notifications
        .list_for_user(app.borrower.id, false)
        .await
        .unwrap();
    assert_eq!(inbox.len(), 2);
    let held = inbox
        .iter()
        .find(|n| n.title == "Borrow Request Approved")
        .unwrap();

    // Outbox updates for one notification fail until the trigger is dropped
    let mut conn = app.repository.acquire().await.unwrap();
    sqlx::query(&format!(
        "CREATE TRIGGER hold_outbox BEFORE UPDATE ON notification_outbox \
         WHEN OLD.notification_id = {} BEGIN SELECT RAISE(ABORT, 'outbox row held'); END",
        held.id
    ))
    .execute(&mut *conn)
    .await
    .unwrap();
    drop(conn);

    let sender = Arc::new(RecordingSender::default());
    let dispatcher = NotificationDispatcher::new(app.repository.clone(), sender.clone(), config());

    let report = dispatcher.dispatch_due().await.unwrap();
    assert_eq!(
        report,
        DispatchReport {
            delivered: 1,
            skipped: 1,
            ..DispatchReport::default()
        }
    );
    assert_eq!(sender.sent.lock().unwrap().len(), 2);

    let mut conn = app.repository.acquire().await.unwrap();
    let entry = app
        .repository
        .notifications
        .outbox_for_notification(&mut conn, held.id)
        .await
        .unwrap();
    assert_eq!(entry.status, OutboxStatus::Pending);
    sqlx::query("DROP TRIGGER hold_outbox")
        .execute(&mut *conn)
        .await
        .unwrap();
    drop(conn);

    // The held entry goes out again on the next poll
    let report = dispatcher.dispatch_due().await.unwrap();
    assert_eq!(
        report,
        DispatchReport {
            delivered: 1,
            ..DispatchReport::default()
        }
    );
    assert_eq!(sender.sent.lock().unwrap().len(), 3);
}
