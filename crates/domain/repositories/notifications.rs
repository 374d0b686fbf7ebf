use anyhow::Result;
use mockall::automock;

use crate::domain::value_objects::notifications::BookingNotification;

/// Hands a notification off for delivery. Must not block on delivery itself.
#[automock]
pub trait BookingNotifier {
    fn publish(&self, notification: BookingNotification) -> Result<()>;
}
