//! Repository implementations

mod notification;
mod tenant;
mod usage;

pub use notification::NotificationRepo;
pub use tenant::TenantRepo;
pub use usage::UsageRepo;
