//! Repository layer for database operations
//!
//! Every query takes a `&mut SqliteConnection` so that a workflow can run
//! several of them inside one transaction. Plain reads pass a pooled
//! connection from [`Repository::acquire`].
//!
//! `... RETURNING *` statements are read with `fetch_all`: SQLite only
//! finishes the write once the statement has been stepped to completion.

pub mod activities;
pub mod agreements;
pub mod borrow_requests;
pub mod items;
pub mod notifications;
pub mod return_requests;
pub mod users;

use std::{str::FromStr, time::Duration};

use sqlx::{
    pool::PoolConnection,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Pool, Sqlite, Transaction,
};

use crate::{config::DatabaseConfig, error::AppResult};

/// Write statement that touches no row; it only takes the database write lock
const TAKE_WRITE_LOCK: &str = "UPDATE users SET id = id WHERE 0";

/// Open the connection pool described by `config`
pub async fn connect(config: &DatabaseConfig) -> AppResult<Pool<Sqlite>> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Sqlite>,
    pub users: users::UsersRepository,
    pub items: items::ItemsRepository,
    pub borrow_requests: borrow_requests::BorrowRequestsRepository,
    pub agreements: agreements::AgreementsRepository,
    pub return_requests: return_requests::ReturnRequestsRepository,
    pub notifications: notifications::NotificationsRepository,
    pub activities: activities::ActivitiesRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            users: users::UsersRepository,
            items: items::ItemsRepository,
            borrow_requests: borrow_requests::BorrowRequestsRepository,
            agreements: agreements::AgreementsRepository,
            return_requests: return_requests::ReturnRequestsRepository,
            notifications: notifications::NotificationsRepository,
            activities: activities::ActivitiesRepository,
            pool,
        }
    }

    /// Start a write transaction; it rolls back when dropped without commit.
    ///
    /// The write lock is taken before the first read, so concurrent
    /// workflows queue on the busy timeout and then see each other's
    /// committed versions.
    pub async fn begin(&self) -> AppResult<Transaction<'static, Sqlite>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(TAKE_WRITE_LOCK).execute(&mut *tx).await?;
        Ok(tx)
    }

    /// Borrow a connection for standalone reads
    pub async fn acquire(&self) -> AppResult<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }
}

/// `?, ?, ?` with one placeholder per value
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use super::placeholders;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
