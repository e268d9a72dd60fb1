//! Item registry service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::item::{validate_window, CreateItem, Item, ItemQuery, UpdateItem},
    repository::Repository,
};

#[derive(Clone)]
pub struct ItemsService {
    repository: Repository,
}

impl ItemsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List a new item owned by the caller
    pub async fn create_item(&self, owner_id: i64, item: CreateItem) -> AppResult<Item> {
        item.validate()?;
        validate_window(item.available_from, item.available_until)?;

        let mut tx = self.repository.begin().await?;
        self.repository.users.get_by_id(&mut tx, owner_id).await?;
        let created = self.repository.items.create(&mut tx, owner_id, &item).await?;
        tx.commit().await?;

        tracing::info!("User {} listed item {} ({})", owner_id, created.id, created.name);
        Ok(created)
    }

    pub async fn get_item(&self, id: i64) -> AppResult<Item> {
        let mut conn = self.repository.acquire().await?;
        self.repository.items.get_by_id(&mut conn, id).await
    }

    pub async fn list_items(&self, query: &ItemQuery) -> AppResult<Vec<Item>> {
        let mut conn = self.repository.acquire().await?;
        self.repository.items.list(&mut conn, query).await
    }

    /// Update an item; only its owner may do so
    pub async fn update_item(&self, caller_id: i64, id: i64, update: UpdateItem) -> AppResult<Item> {
        update.validate()?;

        let mut tx = self.repository.begin().await?;
        let item = self.repository.items.get_by_id(&mut tx, id).await?;
        ensure_owner(&item, caller_id, "update")?;

        let item = update.apply(item);
        validate_window(item.available_from, item.available_until)?;
        let updated = self.repository.items.update(&mut tx, &item).await?;
        tx.commit().await?;

        Ok(updated)
    }

    /// Delete an item; only its owner may do so
    pub async fn delete_item(&self, caller_id: i64, id: i64) -> AppResult<()> {
        let mut tx = self.repository.begin().await?;
        let item = self.repository.items.get_by_id(&mut tx, id).await?;
        ensure_owner(&item, caller_id, "delete")?;

        self.repository.items.delete(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!("User {} removed item {}", caller_id, id);
        Ok(())
    }
}

fn ensure_owner(item: &Item, caller_id: i64, action: &str) -> AppResult<()> {
    if item.owner_id == caller_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Only the owner can {} this item",
            action
        )))
    }
}
