//! Borrowing agreement model and its state machine
//!
//! | from | to |
//! |---|---|
//! | PENDING | ACCEPTED, REJECTED |
//! | ACCEPTED | RETURN_REQUESTED, RETURN_PENDING |
//! | RETURN_REQUESTED | RETURNED, RETURN_REJECTED |
//! | RETURN_PENDING | RETURNED, RETURN_REJECTED |
//! | RETURN_REJECTED | RETURN_REQUESTED, RETURN_PENDING |
//!
//! `RETURNED` and `REJECTED` are terminal. A rejected return leaves the loan
//! running, so the borrower may ask again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Agreement status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgreementStatus {
    Pending,
    Accepted,
    Rejected,
    ReturnRequested,
    ReturnPending,
    Returned,
    ReturnRejected,
}

impl AgreementStatus {
    /// Statuses during which the item is out on loan
    pub const ACTIVE: [AgreementStatus; 4] = [
        AgreementStatus::Accepted,
        AgreementStatus::ReturnRequested,
        AgreementStatus::ReturnPending,
        AgreementStatus::ReturnRejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgreementStatus::Pending => "PENDING",
            AgreementStatus::Accepted => "ACCEPTED",
            AgreementStatus::Rejected => "REJECTED",
            AgreementStatus::ReturnRequested => "RETURN_REQUESTED",
            AgreementStatus::ReturnPending => "RETURN_PENDING",
            AgreementStatus::Returned => "RETURNED",
            AgreementStatus::ReturnRejected => "RETURN_REJECTED",
        }
    }

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AgreementStatus::Returned | AgreementStatus::Rejected)
    }

    pub fn can_transition_to(self, next: AgreementStatus) -> bool {
        use AgreementStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted)
                | (Pending, Rejected)
                | (Accepted, ReturnRequested)
                | (Accepted, ReturnPending)
                | (ReturnRequested, Returned)
                | (ReturnRequested, ReturnRejected)
                | (ReturnPending, Returned)
                | (ReturnPending, ReturnRejected)
                | (ReturnRejected, ReturnRequested)
                | (ReturnRejected, ReturnPending)
        )
    }

    /// Validate a transition, returning the new status
    pub fn transition(self, next: AgreementStatus) -> AppResult<AgreementStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::InvalidTransition(format!(
                "Agreement cannot move from {} to {}",
                self, next
            )))
        }
    }
}

impl std::fmt::Display for AgreementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of an agreement a user is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Lender,
    Borrower,
}

/// Borrowing agreement from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowingAgreement {
    pub id: i64,
    pub item_id: i64,
    pub lender_id: i64,
    pub borrower_id: i64,
    /// Accepted borrow request this agreement formalizes
    pub borrow_request_id: Option<i64>,
    pub borrowing_start: DateTime<Utc>,
    pub borrowing_end: DateTime<Utc>,
    pub terms: Option<String>,
    pub status: AgreementStatus,
    /// Optimistic concurrency token
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BorrowingAgreement {
    pub fn party_of(&self, user_id: i64) -> Option<Party> {
        if user_id == self.lender_id {
            Some(Party::Lender)
        } else if user_id == self.borrower_id {
            Some(Party::Borrower)
        } else {
            None
        }
    }

    pub fn require_lender(&self, user_id: i64) -> AppResult<()> {
        if user_id == self.lender_id {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only the lender can perform this action on the agreement".to_string(),
            ))
        }
    }

    pub fn require_borrower(&self, user_id: i64) -> AppResult<()> {
        if user_id == self.borrower_id {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only the borrower can perform this action on the agreement".to_string(),
            ))
        }
    }

    pub fn require_party(&self, user_id: i64) -> AppResult<Party> {
        self.party_of(user_id).ok_or_else(|| {
            AppError::Forbidden("You are not a party to this agreement".to_string())
        })
    }
}

/// Create agreement payload (sent by the lender)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAgreement {
    pub item_id: i64,
    pub borrower_id: i64,
    pub borrow_request_id: Option<i64>,
    pub borrowing_start: DateTime<Utc>,
    pub borrowing_end: DateTime<Utc>,
    #[validate(length(max = 4000, message = "Terms are too long"))]
    pub terms: Option<String>,
}
