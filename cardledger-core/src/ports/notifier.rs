//! Notification port - out-of-band delivery of issued PINs

use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::UserId;

/// What a user is told after a card is issued.
///
/// Carries the plaintext PIN; must never be logged or persisted.
#[derive(Clone, Serialize)]
pub struct PinNotice {
    pub user_id: UserId,
    pub email: String,
    pub masked_number: String,
    pub pin: String,
}

impl std::fmt::Debug for PinNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinNotice")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("masked_number", &self.masked_number)
            .field("pin", &"****")
            .finish()
    }
}

pub trait Notifier: Send + Sync {
    fn notify_pin_issued(&self, notice: &PinNotice) -> Result<()>;
}
