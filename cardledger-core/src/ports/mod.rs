//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod notifier;
mod random;
mod repository;
mod unit_of_work;

pub use notifier::{Notifier, PinNotice};
pub use random::SecureRandom;
pub use repository::Repository;
pub use unit_of_work::{Change, UnitOfWork};
