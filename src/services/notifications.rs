//! Notification inbox service
//!
//! Notifications are written in the same transaction as the state change
//! that triggers them, together with an outbox row. Delivery is left to the
//! [`dispatcher`](super::dispatcher).

use sqlx::SqliteConnection;

use crate::{
    error::{AppError, AppResult},
    models::notification::{NewNotification, Notification},
    repository::Repository,
};

#[derive(Clone)]
pub struct NotificationService {
    repository: Repository,
}

impl NotificationService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Store a notification and queue it for delivery
    pub async fn create_and_send_notification(
        &self,
        conn: &mut SqliteConnection,
        notification: NewNotification,
    ) -> AppResult<Notification> {
        let stored = self
            .repository
            .notifications
            .insert_with_outbox(conn, &notification)
            .await?;

        tracing::debug!(
            "Queued notification {} ({:?}) for user {}",
            stored.id,
            stored.notification_type,
            stored.user_id
        );
        Ok(stored)
    }

    /// Inbox of the caller
    pub async fn list_for_user(&self, user_id: i64, unread_only: bool) -> AppResult<Vec<Notification>> {
        let mut conn = self.repository.acquire().await?;
        self.repository
            .notifications
            .list_for_user(&mut conn, user_id, unread_only)
            .await
    }

    /// Mark one of the caller's notifications as read
    pub async fn mark_read(&self, user_id: i64, id: i64) -> AppResult<Notification> {
        let mut tx = self.repository.begin().await?;
        let notification = self.repository.notifications.get_by_id(&mut tx, id).await?;
        if notification.user_id != user_id {
            return Err(AppError::Forbidden(
                "This notification belongs to another user".to_string(),
            ));
        }
        let read = self.repository.notifications.mark_read(&mut tx, id).await?;
        tx.commit().await?;

        Ok(read)
    }
}
