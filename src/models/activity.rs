//! User activity log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    BorrowRequested,
    LendingApproved,
    BorrowingStarted,
    BorrowRequestRejected,
    ItemReturned,
}

impl ActivityType {
    pub fn description(&self) -> &'static str {
        match self {
            ActivityType::BorrowRequested => "requested to borrow",
            ActivityType::LendingApproved => "approved lending",
            ActivityType::BorrowingStarted => "started borrowing",
            ActivityType::BorrowRequestRejected => "rejected a borrow request",
            ActivityType::ItemReturned => "returned a borrowed item",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserActivity {
    pub id: i64,
    pub user_id: i64,
    pub activity_type: ActivityType,
    pub description: String,
    /// Borrow request the entry is about
    pub reference_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}
