//! Return request log entries
//!
//! The owning agreement holds the authoritative status; a return request
//! records who asked, with which note, and how the lender answered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::agreement::AgreementStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnRequestStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl ReturnRequestStatus {
    /// Agreement status reached when the lender answers with `self`
    pub fn agreement_outcome(self) -> Option<AgreementStatus> {
        match self {
            ReturnRequestStatus::Pending => None,
            ReturnRequestStatus::Confirmed => Some(AgreementStatus::Returned),
            ReturnRequestStatus::Rejected => Some(AgreementStatus::ReturnRejected),
        }
    }
}

/// Return request from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ReturnRequest {
    pub id: i64,
    pub agreement_id: i64,
    pub item_id: i64,
    pub lender_id: i64,
    pub borrower_id: i64,
    pub note: Option<String>,
    pub rejection_reason: Option<String>,
    pub status: ReturnRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Borrower-side return request by item
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateReturnRequest {
    pub item_id: i64,
    #[validate(length(max = 2000, message = "Note is too long"))]
    pub note: Option<String>,
}

/// Borrower-side return request by agreement
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SendReturnRequest {
    pub agreement_id: i64,
    #[validate(length(max = 2000, message = "Note is too long"))]
    pub note: Option<String>,
}

/// Lender answer to a return request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateReturnRequestStatus {
    pub status: ReturnRequestStatus,
    #[validate(length(max = 2000, message = "Rejection reason is too long"))]
    pub rejection_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcomes_mirror_agreement() {
        assert_eq!(ReturnRequestStatus::Pending.agreement_outcome(), None);
        assert_eq!(
            ReturnRequestStatus::Confirmed.agreement_outcome(),
            Some(AgreementStatus::Returned)
        );
        assert_eq!(
            ReturnRequestStatus::Rejected.agreement_outcome(),
            Some(AgreementStatus::ReturnRejected)
        );
    }
}
