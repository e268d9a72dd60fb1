//! User activity repository

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    error::AppResult,
    models::activity::{ActivityType, UserActivity},
};

#[derive(Clone, Copy, Debug, Default)]
pub struct ActivitiesRepository;

impl ActivitiesRepository {
    pub async fn record(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
        activity_type: ActivityType,
        reference_id: Option<i64>,
    ) -> AppResult<UserActivity> {
        let activity = sqlx::query_as::<_, UserActivity>(
            r#"
            INSERT INTO user_activities (user_id, activity_type, description, reference_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(activity_type)
        .bind(activity_type.description())
        .bind(reference_id)
        .bind(Utc::now())
        .fetch_all(&mut *conn)
        .await?
        .pop()
        .ok_or(sqlx::Error::RowNotFound)?;

        Ok(activity)
    }

    /// Activities of a user, newest first
    pub async fn list_for_user(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
    ) -> AppResult<Vec<UserActivity>> {
        let activities = sqlx::query_as::<_, UserActivity>(
            "SELECT * FROM user_activities WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(activities)
    }
}
