//! Users repository

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, User},
};

#[derive(Clone, Copy, Debug, Default)]
pub struct UsersRepository;

impl UsersRepository {
    /// Get user by ID
    pub async fn get_by_id(&self, conn: &mut SqliteConnection, id: i64) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Insert a user mirrored from the account system
    pub async fn create(&self, conn: &mut SqliteConnection, user: &CreateUser) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, display_name, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(Utc::now())
        .fetch_all(&mut *conn)
        .await?
        .pop()
        .ok_or(sqlx::Error::RowNotFound)?;

        Ok(user)
    }
}
