//! Items repository

use chrono::Utc;
use sqlx::{types::Json, SqliteConnection};

use crate::{
    error::{AppError, AppResult},
    models::item::{CreateItem, Item, ItemQuery, ItemRow},
};

#[derive(Clone, Copy, Debug, Default)]
pub struct ItemsRepository;

impl ItemsRepository {
    /// Get item by ID
    pub async fn get_by_id(&self, conn: &mut SqliteConnection, id: i64) -> AppResult<Item> {
        sqlx::query_as::<_, ItemRow>("SELECT * FROM items WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .map(Item::from)
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))
    }

    /// List items with optional filters
    pub async fn list(&self, conn: &mut SqliteConnection, query: &ItemQuery) -> AppResult<Vec<Item>> {
        let mut conditions = Vec::new();

        if query.category.is_some() {
            conditions.push("category = ?");
        }
        if query.owner_id.is_some() {
            conditions.push("owner_id = ?");
        }
        if query.available_on.is_some() {
            conditions.push("available_from <= ? AND available_until >= ?");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT * FROM items {} ORDER BY created_at DESC, id DESC",
            where_clause
        );
        let mut builder = sqlx::query_as::<_, ItemRow>(&sql);
        if let Some(ref category) = query.category {
            builder = builder.bind(category);
        }
        if let Some(owner_id) = query.owner_id {
            builder = builder.bind(owner_id);
        }
        if let Some(date) = query.available_on {
            builder = builder.bind(date).bind(date);
        }

        let rows = builder.fetch_all(&mut *conn).await?;
        Ok(rows.into_iter().map(Item::from).collect())
    }

    /// Create a new item
    pub async fn create(
        &self,
        conn: &mut SqliteConnection,
        owner_id: i64,
        item: &CreateItem,
    ) -> AppResult<Item> {
        let row = sqlx::query_as::<_, ItemRow>(
            r#"
            INSERT INTO items (
                owner_id, name, description, category, location,
                available_from, available_until, contact_preference,
                image_urls, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.category)
        .bind(&item.location)
        .bind(item.available_from)
        .bind(item.available_until)
        .bind(&item.contact_preference)
        .bind(Json(&item.image_urls))
        .bind(Utc::now())
        .fetch_all(&mut *conn)
        .await?
        .pop()
        .ok_or(sqlx::Error::RowNotFound)?;

        Ok(row.into())
    }

    /// Persist every editable field of an item
    pub async fn update(&self, conn: &mut SqliteConnection, item: &Item) -> AppResult<Item> {
        sqlx::query_as::<_, ItemRow>(
            r#"
            UPDATE items SET
                name = ?, description = ?, category = ?, location = ?,
                available_from = ?, available_until = ?,
                contact_preference = ?, image_urls = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.category)
        .bind(&item.location)
        .bind(item.available_from)
        .bind(item.available_until)
        .bind(&item.contact_preference)
        .bind(Json(&item.image_urls))
        .bind(item.id)
        .fetch_all(&mut *conn)
        .await?
        .pop()
        .map(Item::from)
        .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item.id)))
    }

    /// Delete an item; requests, agreements and return requests cascade
    pub async fn delete(&self, conn: &mut SqliteConnection, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Item with id {} not found", id)));
        }
        Ok(())
    }
}
