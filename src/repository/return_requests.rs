//! Return requests repository

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    error::{AppError, AppResult},
    models::{
        agreement::BorrowingAgreement,
        return_request::{ReturnRequest, ReturnRequestStatus},
    },
};

#[derive(Clone, Copy, Debug, Default)]
pub struct ReturnRequestsRepository;

impl ReturnRequestsRepository {
    /// Get return request by ID
    pub async fn get_by_id(&self, conn: &mut SqliteConnection, id: i64) -> AppResult<ReturnRequest> {
        sqlx::query_as::<_, ReturnRequest>("SELECT * FROM return_requests WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Return request with id {} not found", id)))
    }

    /// Pending return request of a borrower for an item
    pub async fn find_pending(
        &self,
        conn: &mut SqliteConnection,
        item_id: i64,
        borrower_id: i64,
    ) -> AppResult<Option<ReturnRequest>> {
        let request = sqlx::query_as::<_, ReturnRequest>(
            "SELECT * FROM return_requests WHERE item_id = ? AND borrower_id = ? AND status = ?",
        )
        .bind(item_id)
        .bind(borrower_id)
        .bind(ReturnRequestStatus::Pending)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(request)
    }

    /// Pending return request attached to an agreement
    pub async fn find_pending_for_agreement(
        &self,
        conn: &mut SqliteConnection,
        agreement_id: i64,
    ) -> AppResult<Option<ReturnRequest>> {
        let request = sqlx::query_as::<_, ReturnRequest>(
            "SELECT * FROM return_requests WHERE agreement_id = ? AND status = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(agreement_id)
        .bind(ReturnRequestStatus::Pending)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(request)
    }

    /// Log a new pending return request for an agreement
    pub async fn create(
        &self,
        conn: &mut SqliteConnection,
        agreement: &BorrowingAgreement,
        note: Option<&str>,
    ) -> AppResult<ReturnRequest> {
        let now = Utc::now();

        let created = sqlx::query_as::<_, ReturnRequest>(
            r#"
            INSERT INTO return_requests (
                agreement_id, item_id, lender_id, borrower_id,
                note, status, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(agreement.id)
        .bind(agreement.item_id)
        .bind(agreement.lender_id)
        .bind(agreement.borrower_id)
        .bind(note)
        .bind(ReturnRequestStatus::Pending)
        .bind(now)
        .bind(now)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::Conflict(
                "A pending return request already exists for this item".to_string(),
            ),
            other => AppError::from(other),
        })?
        .pop()
        .ok_or(sqlx::Error::RowNotFound)?;

        Ok(created)
    }

    /// Close a pending return request with the lender's answer
    pub async fn resolve(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        status: ReturnRequestStatus,
        rejection_reason: Option<&str>,
    ) -> AppResult<ReturnRequest> {
        sqlx::query_as::<_, ReturnRequest>(
            r#"
            UPDATE return_requests
            SET status = ?, rejection_reason = ?, updated_at = ?
            WHERE id = ? AND status = ?
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(rejection_reason)
        .bind(Utc::now())
        .bind(id)
        .bind(ReturnRequestStatus::Pending)
        .fetch_all(&mut *conn)
        .await?
        .pop()
        .ok_or_else(|| AppError::Conflict(format!("Return request {} is no longer pending", id)))
    }
}
