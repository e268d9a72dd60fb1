//! Notifications and delivery outbox repository

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::{
    error::{AppError, AppResult},
    models::notification::{NewNotification, Notification, OutboxEntry, OutboxStatus},
};

#[derive(Clone, Copy, Debug, Default)]
pub struct NotificationsRepository;

impl NotificationsRepository {
    /// Store a notification and queue it for delivery
    pub async fn insert_with_outbox(
        &self,
        conn: &mut SqliteConnection,
        notification: &NewNotification,
    ) -> AppResult<Notification> {
        let now = Utc::now();

        let stored = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, title, message, notification_type, is_read, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            RETURNING *
            "#,
        )
        .bind(notification.user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.notification_type)
        .bind(now)
        .fetch_all(&mut *conn)
        .await?
        .pop()
        .ok_or(sqlx::Error::RowNotFound)?;

        sqlx::query(
            r#"
            INSERT INTO notification_outbox (notification_id, status, attempts, next_attempt_at, created_at)
            VALUES (?, ?, 0, ?, ?)
            "#,
        )
        .bind(stored.id)
        .bind(OutboxStatus::Pending)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(stored)
    }

    /// Get notification by ID
    pub async fn get_by_id(&self, conn: &mut SqliteConnection, id: i64) -> AppResult<Notification> {
        sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Notification with id {} not found", id)))
    }

    /// Inbox of a user, newest first
    pub async fn list_for_user(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
        unread_only: bool,
    ) -> AppResult<Vec<Notification>> {
        let sql = if unread_only {
            "SELECT * FROM notifications WHERE user_id = ? AND is_read = 0 ORDER BY created_at DESC, id DESC"
        } else {
            "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC, id DESC"
        };

        let notifications = sqlx::query_as::<_, Notification>(sql)
            .bind(user_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(notifications)
    }

    /// Mark a notification as read
    pub async fn mark_read(&self, conn: &mut SqliteConnection, id: i64) -> AppResult<Notification> {
        sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET is_read = 1 WHERE id = ? RETURNING *",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound(format!("Notification with id {} not found", id)))
    }

    /// Pending outbox rows due at `now`, oldest first
    pub async fn due_outbox(
        &self,
        conn: &mut SqliteConnection,
        now: DateTime<Utc>,
        limit: u32,
    ) -> AppResult<Vec<OutboxEntry>> {
        let entries = sqlx::query_as::<_, OutboxEntry>(
            r#"
            SELECT * FROM notification_outbox
            WHERE status = ? AND next_attempt_at <= ?
            ORDER BY next_attempt_at, id
            LIMIT ?
            "#,
        )
        .bind(OutboxStatus::Pending)
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&mut *conn)
        .await?;

        Ok(entries)
    }

    /// Outbox row of a notification
    pub async fn outbox_for_notification(
        &self,
        conn: &mut SqliteConnection,
        notification_id: i64,
    ) -> AppResult<OutboxEntry> {
        sqlx::query_as::<_, OutboxEntry>(
            "SELECT * FROM notification_outbox WHERE notification_id = ?",
        )
        .bind(notification_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No outbox entry for notification {}",
                notification_id
            ))
        })
    }

    pub async fn mark_delivered(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        attempts: i64,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE notification_outbox SET status = ?, attempts = ?, delivered_at = ?, last_error = NULL WHERE id = ?",
        )
        .bind(OutboxStatus::Delivered)
        .bind(attempts)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Record a failed attempt; `status` is `Pending` to retry or `Failed` to give up
    pub async fn mark_attempt_failed(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        attempts: i64,
        status: OutboxStatus,
        next_attempt_at: DateTime<Utc>,
        error: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE notification_outbox SET status = ?, attempts = ?, next_attempt_at = ?, last_error = ? WHERE id = ?",
        )
        .bind(status)
        .bind(attempts)
        .bind(next_attempt_at)
        .bind(error)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
