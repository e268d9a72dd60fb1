//! Return request tracking
//!
//! Thin entry points over [`AgreementsService`]: every change made here goes
//! through the owning agreement's state machine.

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        agreement::AgreementStatus,
        return_request::{CreateReturnRequest, ReturnRequest, ReturnRequestStatus, UpdateReturnRequestStatus},
    },
    repository::Repository,
    services::{
        agreements::{AgreementsService, RETURNABLE},
        expect_unique,
    },
};

#[derive(Clone)]
pub struct ReturnRequestsService {
    repository: Repository,
    agreements: AgreementsService,
}

impl ReturnRequestsService {
    pub fn new(repository: Repository, agreements: AgreementsService) -> Self {
        Self {
            repository,
            agreements,
        }
    }

    /// Borrower opens a return for an item they currently borrow
    pub async fn create_return_request(
        &self,
        borrower_id: i64,
        request: CreateReturnRequest,
    ) -> AppResult<ReturnRequest> {
        request.validate()?;

        let mut tx = self.repository.begin().await?;
        let existing = self
            .repository
            .return_requests
            .find_pending(&mut tx, request.item_id, borrower_id)
            .await?;
        if let Some(existing) = existing {
            return Err(AppError::Conflict(format!(
                "A pending return request ({}) already exists for this item",
                existing.id
            )));
        }

        let candidates = self
            .repository
            .agreements
            .find_for_item_with_status(&mut tx, request.item_id, &RETURNABLE)
            .await?;
        let agreement = expect_unique(candidates, "No active borrowing found for this item")?;
        agreement.require_borrower(borrower_id)?;

        let (_, created) = self
            .agreements
            .open_return(
                &mut tx,
                &agreement,
                AgreementStatus::ReturnPending,
                request.note.as_deref(),
            )
            .await?;
        tx.commit().await?;

        tracing::info!(
            "Return request {} created for item {} by user {}",
            created.id,
            created.item_id,
            borrower_id
        );
        Ok(created)
    }

    /// Lender confirms or rejects a pending return request
    pub async fn update_return_request_status(
        &self,
        lender_id: i64,
        id: i64,
        update: UpdateReturnRequestStatus,
    ) -> AppResult<ReturnRequest> {
        update.validate()?;

        let mut tx = self.repository.begin().await?;
        let request = self.repository.return_requests.get_by_id(&mut tx, id).await?;
        if request.lender_id != lender_id {
            return Err(AppError::Forbidden(
                "Only the lender can answer this return request".to_string(),
            ));
        }
        if request.status != ReturnRequestStatus::Pending {
            return Err(AppError::InvalidTransition(format!(
                "Return request {} is already {:?}",
                id, request.status
            )));
        }

        let agreement = self
            .repository
            .agreements
            .get_by_id(&mut tx, request.agreement_id)
            .await?;
        self.agreements
            .close_return(
                &mut tx,
                &agreement,
                update.status,
                update.rejection_reason.as_deref(),
            )
            .await?;

        let updated = self.repository.return_requests.get_by_id(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!("Return request {} answered: {:?}", id, updated.status);
        Ok(updated)
    }

    /// Return request visible to its lender and borrower
    pub async fn get_return_request(&self, caller_id: i64, id: i64) -> AppResult<ReturnRequest> {
        let mut conn = self.repository.acquire().await?;
        let request = self.repository.return_requests.get_by_id(&mut conn, id).await?;
        if caller_id != request.lender_id && caller_id != request.borrower_id {
            return Err(AppError::Forbidden(
                "You are not a party to this return request".to_string(),
            ));
        }
        Ok(request)
    }
}
