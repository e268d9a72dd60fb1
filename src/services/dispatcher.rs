//! Background delivery of queued notifications
//!
//! Workflows only write to the outbox. This task polls it, hands each due
//! notification to a [`NotificationSender`] and reschedules failures with
//! exponential backoff until `max_attempts` is reached.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;

use crate::{
    config::{AppConfig, NotificationChannel, NotificationsConfig},
    error::AppResult,
    models::{
        notification::{Notification, OutboxEntry, OutboxStatus},
        User,
    },
    repository::Repository,
    services::email::EmailService,
};

/// Delivery channel for a stored notification
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, recipient: &User, notification: &Notification) -> AppResult<()>;
}

/// Writes notifications to the log
pub struct LogSender;

#[async_trait]
impl NotificationSender for LogSender {
    async fn send(&self, recipient: &User, notification: &Notification) -> AppResult<()> {
        tracing::info!(
            "Notification {} for {}: {} - {}",
            notification.id,
            recipient.username,
            notification.title,
            notification.message
        );
        Ok(())
    }
}

/// Sends notifications by email
pub struct EmailSender {
    email: EmailService,
}

impl EmailSender {
    pub fn new(email: EmailService) -> Self {
        Self { email }
    }
}

#[async_trait]
impl NotificationSender for EmailSender {
    async fn send(&self, recipient: &User, notification: &Notification) -> AppResult<()> {
        let Some(address) = recipient.email.as_deref() else {
            tracing::warn!(
                "User {} has no email address, notification {} not mailed",
                recipient.id,
                notification.id
            );
            return Ok(());
        };

        self.email
            .send_notification(address, &notification.title, &notification.message)
            .await
    }
}

/// Sender matching the configured channel
pub fn sender_from_config(config: &AppConfig) -> Arc<dyn NotificationSender> {
    match config.notifications.channel {
        NotificationChannel::Log => Arc::new(LogSender),
        NotificationChannel::Email => Arc::new(EmailSender::new(EmailService::new(config.email.clone()))),
    }
}

/// Outcome of one outbox poll
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub retried: usize,
    pub failed: usize,
    /// Entries whose bookkeeping could not be written; picked up next poll
    pub skipped: usize,
}

/// What happened to a single outbox entry
enum Outcome {
    Delivered,
    Retried,
    Failed,
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    repository: Repository,
    sender: Arc<dyn NotificationSender>,
    config: NotificationsConfig,
}

impl NotificationDispatcher {
    pub fn new(
        repository: Repository,
        sender: Arc<dyn NotificationSender>,
        config: NotificationsConfig,
    ) -> Self {
        Self {
            repository,
            sender,
            config,
        }
    }

    /// Deliver every outbox row that is due now
    ///
    /// Only loading the batch can fail; a broken entry is logged and the
    /// rest of the batch still goes out.
    pub async fn dispatch_due(&self) -> AppResult<DispatchReport> {
        let now = Utc::now();
        let due = {
            let mut conn = self.repository.acquire().await?;
            self.repository
                .notifications
                .due_outbox(&mut conn, now, self.config.batch_size)
                .await?
        };

        let mut report = DispatchReport::default();
        for entry in due {
            match self.process(&entry, now).await {
                Ok(Outcome::Delivered) => report.delivered += 1,
                Ok(Outcome::Retried) => report.retried += 1,
                Ok(Outcome::Failed) => report.failed += 1,
                Err(e) => {
                    tracing::error!(
                        "Could not record delivery of notification {}: {}",
                        entry.notification_id,
                        e
                    );
                    report.skipped += 1;
                }
            }
        }

        if report != DispatchReport::default() {
            tracing::debug!("Outbox poll: {:?}", report);
        }
        Ok(report)
    }

    async fn process(&self, entry: &OutboxEntry, now: DateTime<Utc>) -> AppResult<Outcome> {
        let attempts = entry.attempts + 1;
        let error = match self.deliver(entry).await {
            Ok(()) => {
                let mut conn = self.repository.acquire().await?;
                self.repository
                    .notifications
                    .mark_delivered(&mut conn, entry.id, attempts, Utc::now())
                    .await?;
                return Ok(Outcome::Delivered);
            }
            Err(e) => e,
        };

        let give_up = attempts >= i64::from(self.config.max_attempts);
        let (status, next_attempt_at) = if give_up {
            (OutboxStatus::Failed, now)
        } else {
            (OutboxStatus::Pending, next_attempt(&self.config, now, attempts))
        };

        tracing::warn!(
            "Delivery of notification {} failed (attempt {}): {}",
            entry.notification_id,
            attempts,
            error
        );

        let mut conn = self.repository.acquire().await?;
        self.repository
            .notifications
            .mark_attempt_failed(
                &mut conn,
                entry.id,
                attempts,
                status,
                next_attempt_at,
                &error.to_string(),
            )
            .await?;

        Ok(if give_up {
            Outcome::Failed
        } else {
            Outcome::Retried
        })
    }

    async fn deliver(&self, entry: &OutboxEntry) -> AppResult<()> {
        let (notification, recipient) = {
            let mut conn = self.repository.acquire().await?;
            let notification = self
                .repository
                .notifications
                .get_by_id(&mut conn, entry.notification_id)
                .await?;
            let recipient = self
                .repository
                .users
                .get_by_id(&mut conn, notification.user_id)
                .await?;
            (notification, recipient)
        };

        self.sender.send(&recipient, &notification).await
    }

    /// Poll the outbox forever on the configured interval
    pub fn spawn(self) -> JoinHandle<()> {
        let period = std::time::Duration::from_secs(self.config.poll_interval_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if let Err(e) = self.dispatch_due().await {
                    tracing::error!("Notification dispatch failed: {}", e);
                }
            }
        })
    }
}

/// Delay before attempt `attempts + 1`: base doubled per failure, capped
pub fn retry_delay(config: &NotificationsConfig, attempts: i64) -> Duration {
    let exponent = attempts.saturating_sub(1).clamp(0, 32) as u32;
    let secs = config
        .retry_base_delay_secs
        .saturating_mul(2u64.saturating_pow(exponent))
        .min(config.retry_max_delay_secs);
    Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX).min(i64::MAX / 1_000))
}

fn next_attempt(config: &NotificationsConfig, now: DateTime<Utc>, attempts: i64) -> DateTime<Utc> {
    now.checked_add_signed(retry_delay(config, attempts))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
