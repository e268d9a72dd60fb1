//! Business logic services

pub mod activities;
pub mod agreements;
pub mod borrow_requests;
pub mod dispatcher;
pub mod email;
pub mod items;
pub mod notifications;
pub mod return_requests;

use crate::{error::AppError, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub items: items::ItemsService,
    pub borrow_requests: borrow_requests::BorrowRequestsService,
    pub agreements: agreements::AgreementsService,
    pub return_requests: return_requests::ReturnRequestsService,
    pub notifications: notifications::NotificationService,
    pub activities: activities::ActivitiesService,
    pub repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository) -> Self {
        let notifications = notifications::NotificationService::new(repository.clone());
        let agreements =
            agreements::AgreementsService::new(repository.clone(), notifications.clone());

        Self {
            items: items::ItemsService::new(repository.clone()),
            borrow_requests: borrow_requests::BorrowRequestsService::new(
                repository.clone(),
                notifications.clone(),
            ),
            return_requests: return_requests::ReturnRequestsService::new(
                repository.clone(),
                agreements.clone(),
            ),
            agreements,
            notifications,
            activities: activities::ActivitiesService::new(repository.clone()),
            repository,
        }
    }
}

/// Exactly one row, `NotFound(missing)` for none, `Conflict` for several
pub(crate) fn expect_unique<T>(mut rows: Vec<T>, missing: &str) -> Result<T, AppError> {
    match rows.len() {
        0 => Err(AppError::NotFound(missing.to_string())),
        1 => Ok(rows.remove(0)),
        n => Err(AppError::Conflict(format!(
            "Expected a single match but found {}",
            n
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expect_unique() {
        assert_eq!(expect_unique(vec![5], "none").unwrap(), 5);
        assert!(matches!(
            expect_unique(Vec::<i32>::new(), "none"),
            Err(AppError::NotFound(msg)) if msg == "none"
        ));
        assert!(matches!(
            expect_unique(vec![1, 2], "none"),
            Err(AppError::Conflict(_))
        ));
    }
}
