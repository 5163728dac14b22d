mod bookings;
mod catalog;
mod content;
mod credits;
mod email_logs;
mod offers;
mod reviews;
mod support;
mod tasks;
mod users;

pub use bookings::SqliteBookingRepo;
pub use catalog::SqliteCatalogRepo;
pub use content::SqliteContentRepo;
pub use credits::SqliteCreditRepo;
pub use email_logs::SqliteEmailLogRepo;
pub use offers::SqliteOfferRepo;
pub use reviews::SqliteReviewRepo;
pub use support::SqliteSupportRepo;
pub use tasks::SqliteTaskRepo;
pub use users::SqliteUserRepo;
