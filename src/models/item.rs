//! Item (lendable object) model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Item listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Item {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    /// First day the item can be borrowed (inclusive)
    pub available_from: NaiveDate,
    /// Last day the item can be borrowed (inclusive)
    pub available_until: NaiveDate,
    pub contact_preference: Option<String>,
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Whether `[start, end]` lies inside the availability window
    pub fn covers(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.available_from <= start && start <= end && end <= self.available_until
    }

    /// Fail unless `[start, end]` lies inside the availability window
    pub fn ensure_covers(&self, start: NaiveDate, end: NaiveDate) -> AppResult<()> {
        if start > end {
            return Err(AppError::Validation(format!(
                "Start date {} is after end date {}",
                start, end
            )));
        }
        if !self.covers(start, end) {
            return Err(AppError::Validation(format!(
                "Requested dates must be between {} and {}",
                self.available_from, self.available_until
            )));
        }
        Ok(())
    }
}

/// Database row for items
#[derive(Debug, Clone, FromRow)]
pub struct ItemRow {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub available_from: NaiveDate,
    pub available_until: NaiveDate,
    pub contact_preference: Option<String>,
    pub image_urls: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            description: row.description,
            category: row.category,
            location: row.location,
            available_from: row.available_from,
            available_until: row.available_until,
            contact_preference: row.contact_preference,
            image_urls: row.image_urls.0,
            created_at: row.created_at,
        }
    }
}

/// Create item request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateItem {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    pub available_from: NaiveDate,
    pub available_until: NaiveDate,
    pub contact_preference: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20, message = "At most 20 images per item"))]
    pub image_urls: Vec<String>,
}

/// Update item request; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateItem {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    pub available_from: Option<NaiveDate>,
    pub available_until: Option<NaiveDate>,
    pub contact_preference: Option<String>,
    #[validate(length(max = 20, message = "At most 20 images per item"))]
    pub image_urls: Option<Vec<String>>,
}

impl UpdateItem {
    /// Apply the changes on top of an existing item
    pub fn apply(self, mut item: Item) -> Item {
        if let Some(name) = self.name {
            item.name = name;
        }
        if self.description.is_some() {
            item.description = self.description;
        }
        if self.category.is_some() {
            item.category = self.category;
        }
        if self.location.is_some() {
            item.location = self.location;
        }
        if let Some(from) = self.available_from {
            item.available_from = from;
        }
        if let Some(until) = self.available_until {
            item.available_until = until;
        }
        if self.contact_preference.is_some() {
            item.contact_preference = self.contact_preference;
        }
        if let Some(urls) = self.image_urls {
            item.image_urls = urls;
        }
        item
    }
}

/// Item search filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ItemQuery {
    /// Exact category
    pub category: Option<String>,
    /// Owner user ID
    pub owner_id: Option<i64>,
    /// Only items whose availability window contains this date
    pub available_on: Option<NaiveDate>,
}

/// Fail unless `from <= until`
pub fn validate_window(from: NaiveDate, until: NaiveDate) -> AppResult<()> {
    if from > until {
        return Err(AppError::Validation(format!(
            "available_from ({}) must not be after available_until ({})",
            from, until
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: &str) -> NaiveDate {
        NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()
    }

    fn june_item() -> Item {
        Item {
            id: 1,
            owner_id: 1,
            name: "Drill".into(),
            description: None,
            category: None,
            location: None,
            available_from: date("2024-06-01"),
            available_until: date("2024-06-30"),
            contact_preference: None,
            image_urls: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_covers_inclusive_bounds() {
        let item = june_item();
        assert!(item.covers(date("2024-06-01"), date("2024-06-30")));
        assert!(item.covers(date("2024-06-05"), date("2024-06-10")));
        assert!(!item.covers(date("2024-05-31"), date("2024-06-10")));
        assert!(!item.covers(date("2024-06-20"), date("2024-07-01")));
        assert!(!item.covers(date("2024-06-10"), date("2024-06-05")));
    }

    #[test]
    fn test_ensure_covers_message_states_bounds() {
        let err = june_item()
            .ensure_covers(date("2024-07-01"), date("2024-07-02"))
            .unwrap_err();
        assert!(err.to_string().contains("between 2024-06-01 and 2024-06-30"));
    }

    #[test]
    fn test_update_keeps_missing_fields() {
        let item = UpdateItem {
            name: Some("Hammer".into()),
            ..Default::default()
        }
        .apply(june_item());
        assert_eq!(item.name, "Hammer");
        assert_eq!(item.available_from, date("2024-06-01"));
    }

    #[test]
    fn test_validate_window() {
        assert!(validate_window(date("2024-06-01"), date("2024-06-01")).is_ok());
        assert!(validate_window(date("2024-06-02"), date("2024-06-01")).is_err());
    }
}
