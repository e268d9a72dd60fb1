//! Borrow request workflow

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        activity::ActivityType,
        borrow_request::{BorrowRequest, BorrowRequestStatus, CreateBorrowRequest},
        item::Item,
        notification::{NewNotification, NotificationType},
    },
    repository::Repository,
    services::{activities, notifications::NotificationService},
};

#[derive(Clone)]
pub struct BorrowRequestsService {
    repository: Repository,
    notifications: NotificationService,
}

impl BorrowRequestsService {
    pub fn new(repository: Repository, notifications: NotificationService) -> Self {
        Self {
            repository,
            notifications,
        }
    }

    /// Propose to borrow an item for a date range
    pub async fn create_borrow_request(
        &self,
        borrower_id: i64,
        request: CreateBorrowRequest,
    ) -> AppResult<BorrowRequest> {
        request.validate()?;

        let mut tx = self.repository.begin().await?;
        let item = self.repository.items.get_by_id(&mut tx, request.item_id).await?;
        if item.owner_id == borrower_id {
            return Err(AppError::Validation("You cannot borrow your own item".to_string()));
        }
        item.ensure_covers(request.start_date, request.end_date)?;
        self.repository.users.get_by_id(&mut tx, borrower_id).await?;

        let created = self
            .repository
            .borrow_requests
            .create(&mut tx, borrower_id, &request)
            .await?;
        activities::record(
            &self.repository,
            &mut tx,
            borrower_id,
            ActivityType::BorrowRequested,
            Some(created.id),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            "User {} requested item {} from {} to {}",
            borrower_id,
            item.id,
            created.start_date,
            created.end_date
        );
        Ok(created)
    }

    /// Owner accepts a pending request
    pub async fn approve_borrow_request(&self, owner_id: i64, id: i64) -> AppResult<BorrowRequest> {
        let mut tx = self.repository.begin().await?;
        let request = self.repository.borrow_requests.get_by_id(&mut tx, id).await?;
        let item = self.repository.items.get_by_id(&mut tx, request.item_id).await?;
        ensure_item_owner(&item, owner_id, "approve")?;
        let next = request.status.transition(BorrowRequestStatus::Accepted)?;

        let accepted = self
            .repository
            .borrow_requests
            .list_for_item_with_status(&mut tx, item.id, BorrowRequestStatus::Accepted)
            .await?;
        if let Some(other) = accepted
            .iter()
            .find(|other| other.overlaps(request.start_date, request.end_date))
        {
            return Err(AppError::Conflict(format!(
                "Dates overlap with accepted request {} ({} to {})",
                other.id, other.start_date, other.end_date
            )));
        }

        let updated = self
            .repository
            .borrow_requests
            .update_status(&mut tx, request.id, request.version, next)
            .await?;

        activities::record(&self.repository, &mut tx, owner_id, ActivityType::LendingApproved, Some(id))
            .await?;
        activities::record(
            &self.repository,
            &mut tx,
            request.borrower_id,
            ActivityType::BorrowingStarted,
            Some(id),
        )
        .await?;

        self.notifications
            .create_and_send_notification(
                &mut tx,
                NewNotification::new(
                    request.borrower_id,
                    "Borrow Request Approved",
                    format!(
                        "Your request to borrow \"{}\" from {} to {} was approved",
                        item.name, request.start_date, request.end_date
                    ),
                    NotificationType::BorrowRequestApproved,
                ),
            )
            .await?;
        tx.commit().await?;

        tracing::info!("Borrow request {} approved by user {}", id, owner_id);
        Ok(updated)
    }

    /// Owner declines a pending request
    pub async fn reject_borrow_request(&self, owner_id: i64, id: i64) -> AppResult<BorrowRequest> {
        let mut tx = self.repository.begin().await?;
        let request = self.repository.borrow_requests.get_by_id(&mut tx, id).await?;
        let item = self.repository.items.get_by_id(&mut tx, request.item_id).await?;
        ensure_item_owner(&item, owner_id, "reject")?;
        let next = request.status.transition(BorrowRequestStatus::Rejected)?;

        let updated = self
            .repository
            .borrow_requests
            .update_status(&mut tx, request.id, request.version, next)
            .await?;

        activities::record(
            &self.repository,
            &mut tx,
            owner_id,
            ActivityType::BorrowRequestRejected,
            Some(id),
        )
        .await?;

        self.notifications
            .create_and_send_notification(
                &mut tx,
                NewNotification::new(
                    request.borrower_id,
                    "Borrow Request Rejected",
                    format!("Your request to borrow \"{}\" was rejected", item.name),
                    NotificationType::BorrowRequestRejected,
                ),
            )
            .await?;
        tx.commit().await?;

        tracing::info!("Borrow request {} rejected by user {}", id, owner_id);
        Ok(updated)
    }

    /// Mark an accepted request as returned; either party may do so
    pub async fn complete_return(&self, caller_id: i64, id: i64) -> AppResult<BorrowRequest> {
        let mut tx = self.repository.begin().await?;
        let request = self.repository.borrow_requests.get_by_id(&mut tx, id).await?;
        let item = self.repository.items.get_by_id(&mut tx, request.item_id).await?;
        if caller_id != request.borrower_id && caller_id != item.owner_id {
            return Err(AppError::Forbidden(
                "Only the lender or the borrower can complete this return".to_string(),
            ));
        }

        let updated = complete_in_tx(&self.repository, &mut tx, &request).await?;
        tx.commit().await?;

        tracing::info!("Borrow request {} returned", id);
        Ok(updated)
    }

    /// Request visible to its borrower and the item owner
    pub async fn get_borrow_request(&self, caller_id: i64, id: i64) -> AppResult<BorrowRequest> {
        let mut conn = self.repository.acquire().await?;
        let request = self.repository.borrow_requests.get_by_id(&mut conn, id).await?;
        if request.borrower_id != caller_id {
            let item = self.repository.items.get_by_id(&mut conn, request.item_id).await?;
            ensure_item_owner(&item, caller_id, "view")?;
        }
        Ok(request)
    }

    /// Requests the caller made
    pub async fn list_outgoing(&self, borrower_id: i64) -> AppResult<Vec<BorrowRequest>> {
        let mut conn = self.repository.acquire().await?;
        self.repository
            .borrow_requests
            .list_by_borrower(&mut conn, borrower_id)
            .await
    }

    /// Requests on the caller's items
    pub async fn list_incoming(&self, owner_id: i64) -> AppResult<Vec<BorrowRequest>> {
        let mut conn = self.repository.acquire().await?;
        self.repository
            .borrow_requests
            .list_for_owner(&mut conn, owner_id)
            .await
    }
}

/// `ACCEPTED → RETURNED` plus the borrower activity entry
pub(crate) async fn complete_in_tx(
    repository: &Repository,
    conn: &mut sqlx::SqliteConnection,
    request: &BorrowRequest,
) -> AppResult<BorrowRequest> {
    let next = request.status.transition(BorrowRequestStatus::Returned)?;
    let updated = repository
        .borrow_requests
        .update_status(conn, request.id, request.version, next)
        .await?;

    activities::record(
        repository,
        conn,
        request.borrower_id,
        ActivityType::ItemReturned,
        Some(request.id),
    )
    .await?;

    Ok(updated)
}

fn ensure_item_owner(item: &Item, caller_id: i64, action: &str) -> AppResult<()> {
    if item.owner_id == caller_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Only the item owner can {} this borrow request",
            action
        )))
    }
}
