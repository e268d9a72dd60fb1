//! Borrow requests repository

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    error::{AppError, AppResult},
    models::borrow_request::{BorrowRequest, BorrowRequestStatus, CreateBorrowRequest},
};

#[derive(Clone, Copy, Debug, Default)]
pub struct BorrowRequestsRepository;

impl BorrowRequestsRepository {
    /// Get borrow request by ID
    pub async fn get_by_id(&self, conn: &mut SqliteConnection, id: i64) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>("SELECT * FROM borrow_requests WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow request with id {} not found", id)))
    }

    /// Create a new pending request
    pub async fn create(
        &self,
        conn: &mut SqliteConnection,
        borrower_id: i64,
        request: &CreateBorrowRequest,
    ) -> AppResult<BorrowRequest> {
        let now = Utc::now();

        let created = sqlx::query_as::<_, BorrowRequest>(
            r#"
            INSERT INTO borrow_requests (
                item_id, borrower_id, start_date, end_date, message,
                status, version, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
            RETURNING *
            "#,
        )
        .bind(request.item_id)
        .bind(borrower_id)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(&request.message)
        .bind(BorrowRequestStatus::Pending)
        .bind(now)
        .bind(now)
        .fetch_all(&mut *conn)
        .await?
        .pop()
        .ok_or(sqlx::Error::RowNotFound)?;

        Ok(created)
    }

    /// Requests made by a borrower, newest first
    pub async fn list_by_borrower(
        &self,
        conn: &mut SqliteConnection,
        borrower_id: i64,
    ) -> AppResult<Vec<BorrowRequest>> {
        let requests = sqlx::query_as::<_, BorrowRequest>(
            "SELECT * FROM borrow_requests WHERE borrower_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(borrower_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(requests)
    }

    /// Requests on items owned by a user, newest first
    pub async fn list_for_owner(
        &self,
        conn: &mut SqliteConnection,
        owner_id: i64,
    ) -> AppResult<Vec<BorrowRequest>> {
        let requests = sqlx::query_as::<_, BorrowRequest>(
            r#"
            SELECT r.* FROM borrow_requests r
            JOIN items i ON r.item_id = i.id
            WHERE i.owner_id = ?
            ORDER BY r.created_at DESC, r.id DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(requests)
    }

    /// Requests on an item with the given status
    pub async fn list_for_item_with_status(
        &self,
        conn: &mut SqliteConnection,
        item_id: i64,
        status: BorrowRequestStatus,
    ) -> AppResult<Vec<BorrowRequest>> {
        let requests = sqlx::query_as::<_, BorrowRequest>(
            "SELECT * FROM borrow_requests WHERE item_id = ? AND status = ? ORDER BY start_date",
        )
        .bind(item_id)
        .bind(status)
        .fetch_all(&mut *conn)
        .await?;

        Ok(requests)
    }

    /// Compare-and-swap the status; fails when `expected_version` is stale
    pub async fn update_status(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        expected_version: i64,
        status: BorrowRequestStatus,
    ) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests
            SET status = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .bind(expected_version)
        .fetch_all(&mut *conn)
        .await?
        .pop()
        .ok_or_else(|| {
            AppError::Conflict(format!(
                "Borrow request {} was modified concurrently, please retry",
                id
            ))
        })
    }
}
