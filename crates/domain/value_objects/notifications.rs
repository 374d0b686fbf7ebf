use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::bookings::BookingDto;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingCreated,
    BookingConfirmed,
    BookingCancelled,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BookingCreated => "booking_created",
            NotificationKind::BookingConfirmed => "booking_confirmed",
            NotificationKind::BookingCancelled => "booking_cancelled",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingNotification {
    pub kind: NotificationKind,
    pub business_id: Uuid,
    pub booking: BookingDto,
}

impl BookingNotification {
    pub fn new(kind: NotificationKind, booking: BookingDto) -> Self {
        Self {
            kind,
            business_id: booking.business_id,
            booking,
        }
    }
}
