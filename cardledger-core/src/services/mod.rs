//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod availability;
mod balance;
mod card;
mod guard;
mod identity;
pub mod logging;
pub mod migration;
mod pin;
mod transfer;

pub use availability::{AvailabilityService, BalanceAvailability};
pub use balance::BalanceService;
pub use card::CardService;
pub use guard::guarded;
pub use identity::{Caller, IdentityService};
pub use logging::{EntryPoint, LogEntry, LogEvent, LogFilter, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use pin::PinHasher;
pub use transfer::{TransferRequest, TransferService};
