//! Borrowing agreements repository

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    error::{AppError, AppResult},
    models::agreement::{AgreementStatus, BorrowingAgreement, CreateAgreement},
};

use super::placeholders;

#[derive(Clone, Copy, Debug, Default)]
pub struct AgreementsRepository;

impl AgreementsRepository {
    /// Get agreement by ID
    pub async fn get_by_id(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
    ) -> AppResult<BorrowingAgreement> {
        sqlx::query_as::<_, BorrowingAgreement>("SELECT * FROM borrowing_agreements WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Agreement with id {} not found", id)))
    }

    /// Create a pending agreement
    pub async fn create(
        &self,
        conn: &mut SqliteConnection,
        lender_id: i64,
        agreement: &CreateAgreement,
    ) -> AppResult<BorrowingAgreement> {
        let now = Utc::now();

        let created = sqlx::query_as::<_, BorrowingAgreement>(
            r#"
            INSERT INTO borrowing_agreements (
                item_id, lender_id, borrower_id, borrow_request_id,
                borrowing_start, borrowing_end, terms,
                status, version, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            RETURNING *
            "#,
        )
        .bind(agreement.item_id)
        .bind(lender_id)
        .bind(agreement.borrower_id)
        .bind(agreement.borrow_request_id)
        .bind(agreement.borrowing_start)
        .bind(agreement.borrowing_end)
        .bind(&agreement.terms)
        .bind(AgreementStatus::Pending)
        .bind(now)
        .bind(now)
        .fetch_all(&mut *conn)
        .await?
        .pop()
        .ok_or(sqlx::Error::RowNotFound)?;

        Ok(created)
    }

    /// Agreements where the user is lender or borrower, newest first
    pub async fn list_for_user(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
    ) -> AppResult<Vec<BorrowingAgreement>> {
        let agreements = sqlx::query_as::<_, BorrowingAgreement>(
            r#"
            SELECT * FROM borrowing_agreements
            WHERE lender_id = ? OR borrower_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(agreements)
    }

    /// Agreements of an item whose status is one of `statuses`, newest first
    pub async fn find_for_item_with_status(
        &self,
        conn: &mut SqliteConnection,
        item_id: i64,
        statuses: &[AgreementStatus],
    ) -> AppResult<Vec<BorrowingAgreement>> {
        let sql = format!(
            "SELECT * FROM borrowing_agreements WHERE item_id = ? AND status IN ({}) ORDER BY id DESC",
            placeholders(statuses.len())
        );

        let mut builder = sqlx::query_as::<_, BorrowingAgreement>(&sql).bind(item_id);
        for status in statuses {
            builder = builder.bind(*status);
        }

        Ok(builder.fetch_all(&mut *conn).await?)
    }

    /// Most recent agreement of an item where the user is a party
    pub async fn latest_for_item_and_user(
        &self,
        conn: &mut SqliteConnection,
        item_id: i64,
        user_id: i64,
    ) -> AppResult<Option<BorrowingAgreement>> {
        let agreement = sqlx::query_as::<_, BorrowingAgreement>(
            r#"
            SELECT * FROM borrowing_agreements
            WHERE item_id = ? AND (lender_id = ? OR borrower_id = ?)
            ORDER BY updated_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(item_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(agreement)
    }

    /// Compare-and-swap the status; fails when `expected_version` is stale
    pub async fn update_status(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        expected_version: i64,
        status: AgreementStatus,
    ) -> AppResult<BorrowingAgreement> {
        sqlx::query_as::<_, BorrowingAgreement>(
            r#"
            UPDATE borrowing_agreements
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
                "Agreement {} was modified concurrently, please retry",
                id
            ))
        })
    }
}
