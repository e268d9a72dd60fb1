//! User activity log service

use sqlx::SqliteConnection;

use crate::{
    error::AppResult,
    models::activity::{ActivityType, UserActivity},
    repository::Repository,
};

#[derive(Clone)]
pub struct ActivitiesService {
    repository: Repository,
}

impl ActivitiesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Activities of a user, newest first
    pub async fn list_for_user(&self, user_id: i64) -> AppResult<Vec<UserActivity>> {
        let mut conn = self.repository.acquire().await?;
        self.repository.activities.list_for_user(&mut conn, user_id).await
    }
}

/// Record an activity inside the caller's transaction
pub(crate) async fn record(
    repository: &Repository,
    conn: &mut SqliteConnection,
    user_id: i64,
    activity_type: ActivityType,
    reference_id: Option<i64>,
) -> AppResult<()> {
    repository
        .activities
        .record(conn, user_id, activity_type, reference_id)
        .await?;
    tracing::debug!("Activity for user {}: {}", user_id, activity_type.description());
    Ok(())
}
