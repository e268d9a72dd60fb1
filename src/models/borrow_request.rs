//! Borrow request model and status transitions

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Borrow request status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BorrowRequestStatus {
    Pending,
    Accepted,
    Rejected,
    Returned,
}

impl BorrowRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowRequestStatus::Pending => "PENDING",
            BorrowRequestStatus::Accepted => "ACCEPTED",
            BorrowRequestStatus::Rejected => "REJECTED",
            BorrowRequestStatus::Returned => "RETURNED",
        }
    }

    pub fn can_transition_to(self, next: BorrowRequestStatus) -> bool {
        use BorrowRequestStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted) | (Pending, Rejected) | (Accepted, Returned)
        )
    }

    /// Validate a transition, returning the new status
    pub fn transition(self, next: BorrowRequestStatus) -> AppResult<BorrowRequestStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::InvalidTransition(format!(
                "Borrow request cannot move from {} to {}",
                self, next
            )))
        }
    }
}

impl std::fmt::Display for BorrowRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Borrow request from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRequest {
    pub id: i64,
    pub item_id: i64,
    pub borrower_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub message: Option<String>,
    pub status: BorrowRequestStatus,
    /// Optimistic concurrency token
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BorrowRequest {
    /// Whether two date ranges share at least one day
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && start <= self.end_date
    }
}

/// Create borrow request payload
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBorrowRequest {
    pub item_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(length(max = 2000, message = "Message is too long"))]
    pub message: Option<String>,
}
