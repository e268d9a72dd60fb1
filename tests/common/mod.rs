//! Shared fixtures for integration tests: an in-memory or file-backed
//! database, seeded users and tokens.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use tempfile::TempDir;

use sharehood_server::{
    config::{AppConfig, DatabaseConfig},
    models::{
        item::{CreateItem, Item},
        user::{CreateUser, User, UserClaims},
    },
    repository::{self, Repository},
    services::Services,
    AppState,
};

pub const JWT_SECRET: &str = "test-secret";

pub struct TestApp {
    pub repository: Repository,
    pub services: Services,
    pub config: AppConfig,
    pub lender: User,
    pub borrower: User,
    pub stranger: User,
    /// Set for file-backed databases, so tests can open their own connections
    pub database_url: Option<String>,
    _dir: Option<TempDir>,
}

impl TestApp {
    pub async fn new() -> Self {
        // One connection keeps the in-memory database alive for the whole test
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory database");
        Self::with_pool(pool, None, None).await
    }

    /// Database in a temporary file, shared by several pooled connections
    pub async fn with_file_database() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let url = format!("sqlite://{}", dir.path().join("sharehood.db").display());
        let pool = repository::connect(&DatabaseConfig {
            url: url.clone(),
            max_connections: 4,
            min_connections: 1,
            busy_timeout_secs: 5,
        })
        .await
        .expect("file database");
        Self::with_pool(pool, Some(url), Some(dir)).await
    }

    async fn with_pool(pool: Pool<Sqlite>, database_url: Option<String>, dir: Option<TempDir>) -> Self {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("migrations");

        let repository = Repository::new(pool);
        let lender = create_user(&repository, "lena", Some("Lena")).await;
        let borrower = create_user(&repository, "bruno", Some("Bruno")).await;
        let stranger = create_user(&repository, "sam", None).await;

        let mut config = AppConfig::default();
        config.auth.jwt_secret = JWT_SECRET.to_string();

        Self {
            services: Services::new(repository.clone()),
            repository,
            config,
            lender,
            borrower,
            stranger,
            database_url,
            _dir: dir,
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            config: Arc::new(self.config.clone()),
            services: Arc::new(self.services.clone()),
        }
    }

    /// Item owned by the lender, available through June 2024
    pub async fn june_item(&self) -> Item {
        self.services
            .items
            .create_item(
                self.lender.id,
                CreateItem {
                    name: "Cordless drill".to_string(),
                    description: Some("18V with two batteries".to_string()),
                    category: Some("tools".to_string()),
                    location: Some("Rue des Lilas".to_string()),
                    available_from: date("2024-06-01"),
                    available_until: date("2024-06-30"),
                    contact_preference: None,
                    image_urls: vec![],
                },
            )
            .await
            .expect("item")
    }
}

async fn create_user(repository: &Repository, username: &str, display_name: Option<&str>) -> User {
    let mut conn = repository.acquire().await.expect("connection");
    repository
        .users
        .create(
            &mut conn,
            &CreateUser {
                username: username.to_string(),
                email: Some(format!("{}@example.org", username)),
                display_name: display_name.map(str::to_string),
            },
        )
        .await
        .expect("user")
}

pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date")
}

pub fn token_for(user: &User) -> String {
    let now = Utc::now().timestamp();
    UserClaims {
        sub: user.username.clone(),
        user_id: user.id,
        exp: now + 3600,
        iat: now,
    }
    .create_token(JWT_SECRET)
    .expect("token")
}
