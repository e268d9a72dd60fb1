//! Borrowing agreement lifecycle and return workflow
//!
//! The agreement status is the single source of truth for a loan. Opening a
//! return (by item or by agreement) always logs a pending
//! [`ReturnRequest`], and answering one always resolves that log entry in
//! the same transaction.

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        agreement::{AgreementStatus, BorrowingAgreement, CreateAgreement},
        borrow_request::BorrowRequestStatus,
        notification::{NewNotification, NotificationType},
        return_request::{ReturnRequest, ReturnRequestStatus, SendReturnRequest},
    },
    repository::Repository,
    services::{borrow_requests, expect_unique, notifications::NotificationService},
};

/// Statuses from which a borrower may ask to return the item
pub const RETURNABLE: [AgreementStatus; 2] =
    [AgreementStatus::Accepted, AgreementStatus::ReturnRejected];

/// Statuses of a loan whose return is already awaiting the lender
const RETURN_IN_PROGRESS: [AgreementStatus; 2] =
    [AgreementStatus::ReturnRequested, AgreementStatus::ReturnPending];

const NO_ACTIVE_BORROWING: &str = "No active borrowing found for this item";
const NO_RETURN_REQUEST: &str = "No return request found for this item";

/// Lender answer on the agreement-level return path
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReturnResponse {
    /// Exactly `CONFIRMED` accepts the return; any other value rejects it
    pub response: String,
    #[validate(length(max = 2000, message = "Rejection reason is too long"))]
    pub rejection_reason: Option<String>,
}

impl ReturnResponse {
    pub fn outcome(&self) -> ReturnRequestStatus {
        if self.response == "CONFIRMED" {
            ReturnRequestStatus::Confirmed
        } else {
            ReturnRequestStatus::Rejected
        }
    }
}

/// Result of polling the return state of an item
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreement: Option<BorrowingAgreement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct AgreementsService {
    repository: Repository,
    notifications: NotificationService,
}

impl AgreementsService {
    pub fn new(repository: Repository, notifications: NotificationService) -> Self {
        Self {
            repository,
            notifications,
        }
    }

    /// Lender proposes an agreement to a borrower
    pub async fn create(&self, lender_id: i64, agreement: CreateAgreement) -> AppResult<BorrowingAgreement> {
        agreement.validate()?;
        if agreement.borrowing_start > agreement.borrowing_end {
            return Err(AppError::Validation(
                "borrowing_start must not be after borrowing_end".to_string(),
            ));
        }

        let mut tx = self.repository.begin().await?;
        let item = self.repository.items.get_by_id(&mut tx, agreement.item_id).await?;
        if item.owner_id != lender_id {
            return Err(AppError::Forbidden(
                "Only the item owner can propose a borrowing agreement".to_string(),
            ));
        }
        if agreement.borrower_id == lender_id {
            return Err(AppError::Validation("You cannot lend an item to yourself".to_string()));
        }
        let lender = self.repository.users.get_by_id(&mut tx, lender_id).await?;
        self.repository.users.get_by_id(&mut tx, agreement.borrower_id).await?;

        if let Some(request_id) = agreement.borrow_request_id {
            let request = self.repository.borrow_requests.get_by_id(&mut tx, request_id).await?;
            if request.item_id != item.id || request.borrower_id != agreement.borrower_id {
                return Err(AppError::Validation(format!(
                    "Borrow request {} does not match this item and borrower",
                    request_id
                )));
            }
            if request.status != BorrowRequestStatus::Accepted {
                return Err(AppError::Validation(format!(
                    "Borrow request {} is {}, not ACCEPTED",
                    request_id, request.status
                )));
            }
        }

        let created = self.repository.agreements.create(&mut tx, lender_id, &agreement).await?;

        self.notifications
            .create_and_send_notification(
                &mut tx,
                NewNotification::new(
                    created.borrower_id,
                    "Borrowing Agreement Proposed",
                    format!(
                        "{} proposed an agreement to lend you \"{}\"",
                        lender.public_name(),
                        item.name
                    ),
                    NotificationType::AgreementProposed,
                ),
            )
            .await?;
        tx.commit().await?;

        tracing::info!(
            "Agreement {} proposed for item {} by lender {}",
            created.id,
            created.item_id,
            lender_id
        );
        Ok(created)
    }

    /// Borrower accepts a pending agreement
    pub async fn accept(&self, borrower_id: i64, id: i64) -> AppResult<BorrowingAgreement> {
        let mut tx = self.repository.begin().await?;
        let agreement = self.repository.agreements.get_by_id(&mut tx, id).await?;
        agreement.require_borrower(borrower_id)?;
        let next = agreement.status.transition(AgreementStatus::Accepted)?;

        let active = self
            .repository
            .agreements
            .find_for_item_with_status(&mut tx, agreement.item_id, &AgreementStatus::ACTIVE)
            .await?;
        if let Some(current) = active.first() {
            return Err(AppError::Conflict(format!(
                "Item is already lent out under agreement {}",
                current.id
            )));
        }

        let updated = self
            .repository
            .agreements
            .update_status(&mut tx, agreement.id, agreement.version, next)
            .await?;
        self.notify_counterparty(
            &mut tx,
            &updated,
            updated.lender_id,
            "Borrowing Agreement Accepted",
            "accepted the borrowing agreement for",
            NotificationType::AgreementAccepted,
        )
        .await?;
        tx.commit().await?;

        tracing::info!("Agreement {} accepted", id);
        Ok(updated)
    }

    /// Borrower declines a pending agreement
    pub async fn decline(&self, borrower_id: i64, id: i64) -> AppResult<BorrowingAgreement> {
        let mut tx = self.repository.begin().await?;
        let agreement = self.repository.agreements.get_by_id(&mut tx, id).await?;
        agreement.require_borrower(borrower_id)?;
        let next = agreement.status.transition(AgreementStatus::Rejected)?;

        let updated = self
            .repository
            .agreements
            .update_status(&mut tx, agreement.id, agreement.version, next)
            .await?;
        self.notify_counterparty(
            &mut tx,
            &updated,
            updated.lender_id,
            "Borrowing Agreement Declined",
            "declined the borrowing agreement for",
            NotificationType::AgreementDeclined,
        )
        .await?;
        tx.commit().await?;

        tracing::info!("Agreement {} declined", id);
        Ok(updated)
    }

    /// Borrower starts returning an item (`RETURN_REQUESTED`)
    pub async fn initiate_return(&self, borrower_id: i64, item_id: i64) -> AppResult<BorrowingAgreement> {
        let mut tx = self.repository.begin().await?;
        let candidates = self
            .repository
            .agreements
            .find_for_item_with_status(&mut tx, item_id, &RETURNABLE)
            .await?;
        if candidates.is_empty() {
            self.ensure_no_return_in_progress(&mut tx, borrower_id, item_id)
                .await?;
        }
        let agreement = expect_unique(candidates, NO_ACTIVE_BORROWING)?;
        agreement.require_borrower(borrower_id)?;

        let (updated, _) = self
            .open_return(&mut tx, &agreement, AgreementStatus::ReturnRequested, None)
            .await?;
        tx.commit().await?;

        tracing::info!("Return requested on agreement {} for item {}", updated.id, item_id);
        Ok(updated)
    }

    /// A second return request from the same borrower loses to the first
    async fn ensure_no_return_in_progress(
        &self,
        conn: &mut SqliteConnection,
        borrower_id: i64,
        item_id: i64,
    ) -> AppResult<()> {
        let in_progress = self
            .repository
            .agreements
            .find_for_item_with_status(conn, item_id, &RETURN_IN_PROGRESS)
            .await?;
        if in_progress.iter().any(|a| a.borrower_id == borrower_id) {
            return Err(AppError::Conflict(
                "A return has already been requested for this item".to_string(),
            ));
        }
        Ok(())
    }

    /// Lender confirms a `RETURN_REQUESTED` agreement of an item
    pub async fn confirm_return(&self, lender_id: i64, item_id: i64) -> AppResult<BorrowingAgreement> {
        let mut tx = self.repository.begin().await?;
        let candidates = self
            .repository
            .agreements
            .find_for_item_with_status(&mut tx, item_id, &[AgreementStatus::ReturnRequested])
            .await?;
        let agreement = expect_unique(candidates, NO_RETURN_REQUEST)?;
        agreement.require_lender(lender_id)?;

        let updated = self
            .close_return(&mut tx, &agreement, ReturnRequestStatus::Confirmed, None)
            .await?;
        tx.commit().await?;

        tracing::info!("Return confirmed on agreement {} for item {}", updated.id, item_id);
        Ok(updated)
    }

    /// Lender answers a return by agreement id
    pub async fn respond_to_return_request(
        &self,
        lender_id: i64,
        agreement_id: i64,
        response: ReturnResponse,
    ) -> AppResult<BorrowingAgreement> {
        response.validate()?;

        let mut tx = self.repository.begin().await?;
        let agreement = self.repository.agreements.get_by_id(&mut tx, agreement_id).await?;
        agreement.require_lender(lender_id)?;

        let updated = self
            .close_return(
                &mut tx,
                &agreement,
                response.outcome(),
                response.rejection_reason.as_deref(),
            )
            .await?;
        tx.commit().await?;

        tracing::info!("Agreement {} return answered: {}", agreement_id, updated.status);
        Ok(updated)
    }

    /// Borrower opens a return by agreement id (`RETURN_PENDING`)
    pub async fn create_return_request(
        &self,
        borrower_id: i64,
        request: SendReturnRequest,
    ) -> AppResult<BorrowingAgreement> {
        request.validate()?;

        let mut tx = self.repository.begin().await?;
        let agreement = self
            .repository
            .agreements
            .get_by_id(&mut tx, request.agreement_id)
            .await?;
        agreement.require_borrower(borrower_id)?;

        let (updated, _) = self
            .open_return(
                &mut tx,
                &agreement,
                AgreementStatus::ReturnPending,
                request.note.as_deref(),
            )
            .await?;
        tx.commit().await?;

        tracing::info!("Return pending on agreement {}", updated.id);
        Ok(updated)
    }

    /// Latest return-related agreement of an item for one of its parties
    pub async fn return_status(&self, caller_id: i64, item_id: i64) -> AppResult<ReturnStatus> {
        let mut conn = self.repository.acquire().await?;
        self.repository.items.get_by_id(&mut conn, item_id).await?;
        let latest = self
            .repository
            .agreements
            .latest_for_item_and_user(&mut conn, item_id, caller_id)
            .await?;

        let in_return = latest.filter(|agreement| {
            matches!(
                agreement.status,
                AgreementStatus::ReturnRequested
                    | AgreementStatus::ReturnPending
                    | AgreementStatus::ReturnRejected
                    | AgreementStatus::Returned
            )
        });

        Ok(match in_return {
            Some(agreement) => ReturnStatus {
                agreement: Some(agreement),
                message: None,
            },
            None => ReturnStatus {
                agreement: None,
                message: Some("No return request found".to_string()),
            },
        })
    }

    /// Agreement visible to its lender and borrower
    pub async fn get(&self, caller_id: i64, id: i64) -> AppResult<BorrowingAgreement> {
        let mut conn = self.repository.acquire().await?;
        let agreement = self.repository.agreements.get_by_id(&mut conn, id).await?;
        agreement.require_party(caller_id)?;
        Ok(agreement)
    }

    /// Agreements where the caller lends or borrows
    pub async fn list_for_user(&self, user_id: i64) -> AppResult<Vec<BorrowingAgreement>> {
        let mut conn = self.repository.acquire().await?;
        self.repository.agreements.list_for_user(&mut conn, user_id).await
    }

    /// Move an agreement into a return state and log a pending return request
    pub(crate) async fn open_return(
        &self,
        conn: &mut SqliteConnection,
        agreement: &BorrowingAgreement,
        target: AgreementStatus,
        note: Option<&str>,
    ) -> AppResult<(BorrowingAgreement, ReturnRequest)> {
        let next = agreement.status.transition(target)?;

        if self
            .repository
            .return_requests
            .find_pending(conn, agreement.item_id, agreement.borrower_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "A pending return request already exists for this item".to_string(),
            ));
        }

        let updated = self
            .repository
            .agreements
            .update_status(conn, agreement.id, agreement.version, next)
            .await?;
        let return_request = self
            .repository
            .return_requests
            .create(conn, &updated, note)
            .await?;

        self.notify_counterparty(
            conn,
            &updated,
            updated.lender_id,
            "Return Request",
            "wants to return",
            NotificationType::ReturnRequest,
        )
        .await?;

        Ok((updated, return_request))
    }

    /// Settle a return with the lender's answer
    ///
    /// `Confirmed` ends the loan and completes the linked borrow request;
    /// `Rejected` keeps the loan running.
    pub(crate) async fn close_return(
        &self,
        conn: &mut SqliteConnection,
        agreement: &BorrowingAgreement,
        outcome: ReturnRequestStatus,
        rejection_reason: Option<&str>,
    ) -> AppResult<BorrowingAgreement> {
        let target = outcome.agreement_outcome().ok_or_else(|| {
            AppError::Validation("A return can only be CONFIRMED or REJECTED".to_string())
        })?;
        let next = agreement.status.transition(target)?;

        let updated = self
            .repository
            .agreements
            .update_status(conn, agreement.id, agreement.version, next)
            .await?;

        let pending = self
            .repository
            .return_requests
            .find_pending_for_agreement(conn, agreement.id)
            .await?;
        if let Some(pending) = pending {
            self.repository
                .return_requests
                .resolve(conn, pending.id, outcome, rejection_reason)
                .await?;
        }

        if next == AgreementStatus::Returned {
            if let Some(request_id) = updated.borrow_request_id {
                let request = self.repository.borrow_requests.get_by_id(conn, request_id).await?;
                if request.status == BorrowRequestStatus::Accepted {
                    borrow_requests::complete_in_tx(&self.repository, conn, &request).await?;
                }
            }
            self.notify_counterparty(
                conn,
                &updated,
                updated.borrower_id,
                "Return Confirmed",
                "confirmed the return of",
                NotificationType::ReturnConfirmed,
            )
            .await?;
        } else {
            let item = self.repository.items.get_by_id(conn, updated.item_id).await?;
            let lender = self.repository.users.get_by_id(conn, updated.lender_id).await?;
            let mut message = format!(
                "{} rejected the return of \"{}\"",
                lender.public_name(),
                item.name
            );
            if let Some(reason) = rejection_reason {
                message.push_str(&format!(": {}", reason));
            }
            self.notifications
                .create_and_send_notification(
                    conn,
                    NewNotification::new(
                        updated.borrower_id,
                        "Return Rejected",
                        message,
                        NotificationType::ReturnRejected,
                    ),
                )
                .await?;
        }

        Ok(updated)
    }

    /// Tell `recipient` that the other party `verb` the item
    async fn notify_counterparty(
        &self,
        conn: &mut SqliteConnection,
        agreement: &BorrowingAgreement,
        recipient_id: i64,
        title: &str,
        verb: &str,
        notification_type: NotificationType,
    ) -> AppResult<()> {
        let actor_id = if recipient_id == agreement.lender_id {
            agreement.borrower_id
        } else {
            agreement.lender_id
        };
        let actor = self.repository.users.get_by_id(conn, actor_id).await?;
        let item = self.repository.items.get_by_id(conn, agreement.item_id).await?;

        self.notifications
            .create_and_send_notification(
                conn,
                NewNotification::new(
                    recipient_id,
                    title,
                    format!("{} {} \"{}\"", actor.public_name(), verb, item.name),
                    notification_type,
                ),
            )
            .await?;
        Ok(())
    }
}
