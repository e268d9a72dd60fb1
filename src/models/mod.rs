//! Data models for Sharehood

pub mod activity;
pub mod agreement;
pub mod borrow_request;
pub mod item;
pub mod notification;
pub mod return_request;
pub mod user;

// Re-export commonly used types
pub use activity::{ActivityType, UserActivity};
pub use agreement::{AgreementStatus, BorrowingAgreement, Party};
pub use borrow_request::{BorrowRequest, BorrowRequestStatus};
pub use item::Item;
pub use notification::{NewNotification, Notification, NotificationType};
pub use return_request::{ReturnRequest, ReturnRequestStatus};
pub use user::{User, UserClaims};
