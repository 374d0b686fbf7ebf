use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::bookings::BookingEntity,
    value_objects::{
        enums::{booking_statuses::BookingStatus, payment_statuses::PaymentStatus},
        resource_scope::ResourceScope,
    },
};

/// Distinguishes an absent JSON field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateBookingModel {
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub location_id: Option<Uuid>,
    pub staff_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub notes: Option<String>,
}

impl CreateBookingModel {
    pub fn scope(&self) -> ResourceScope {
        ResourceScope::new(self.location_id, self.staff_id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateBookingModel {
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<BookingStatus>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub staff_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl UpdateBookingModel {
    pub fn is_empty(&self) -> bool {
        self.start_time.is_none()
            && self.status.is_none()
            && self.payment_status.is_none()
            && self.staff_id.is_none()
            && self.notes.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingDto {
    pub id: Uuid,
    pub business_id: Uuid,
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub location_id: Option<Uuid>,
    pub staff_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub total_amount_minor: i64,
    pub notes: Option<String>,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BookingEntity> for BookingDto {
    fn from(entity: BookingEntity) -> Self {
        Self {
            id: entity.id,
            business_id: entity.business_id,
            client_id: entity.client_id,
            service_id: entity.service_id,
            location_id: entity.location_id,
            staff_id: entity.staff_id,
            start_time: entity.start_time,
            end_time: entity.end_time,
            status: BookingStatus::from_str(&entity.status).unwrap_or_default(),
            payment_status: PaymentStatus::from_str(&entity.payment_status).unwrap_or_default(),
            total_amount_minor: entity.total_amount_minor,
            notes: entity.notes,
            payment_reference: entity.payment_reference,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// A candidate slot as shown to a caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotDto {
    pub time: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub available: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilityQuery {
    pub service_id: Uuid,
    pub date: NaiveDate,
    pub location_id: Option<Uuid>,
    pub staff_id: Option<Uuid>,
}

impl AvailabilityQuery {
    pub fn scope(&self) -> ResourceScope {
        ResourceScope::new(self.location_id, self.staff_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicBookingModel {
    pub service_id: Uuid,
    pub location_id: Option<Uuid>,
    pub staff_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub notes: Option<String>,
    pub client: ClientContact,
    #[serde(default)]
    pub pay_online: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicBookingResponse {
    pub booking: BookingDto,
    pub checkout_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentIntentDto {
    pub booking_id: Uuid,
    pub payment_intent_id: String,
    pub client_secret: Option<String>,
    pub amount_minor: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingListFilter {
    pub date: Option<NaiveDate>,
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingSummaryDto {
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub no_show: i64,
    pub paid_amount_minor: i64,
}

impl BookingSummaryDto {
    pub fn from_bookings<'a>(bookings: impl IntoIterator<Item = &'a BookingDto>) -> Self {
        bookings.into_iter().fold(Self::default(), |mut summary, booking| {
            summary.total += 1;
            match booking.status {
                BookingStatus::Pending => summary.pending += 1,
                BookingStatus::Confirmed => summary.confirmed += 1,
                BookingStatus::Completed => summary.completed += 1,
                BookingStatus::Cancelled => summary.cancelled += 1,
                BookingStatus::NoShow => summary.no_show += 1,
            }
            if booking.payment_status == PaymentStatus::Paid {
                summary.paid_amount_minor += booking.total_amount_minor;
            }
            summary
        })
    }
}

/// The active booking that blocked a reservation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotConflict {
    pub booking_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl From<&BookingEntity> for SlotConflict {
    fn from(entity: &BookingEntity) -> Self {
        Self {
            booking_id: entity.id,
            start_time: entity.start_time,
            end_time: entity.end_time,
        }
    }
}

/// Result of an authoritative check-and-write.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotReservation {
    Reserved(BookingEntity),
    Conflict(SlotConflict),
    /// The booking is gone or no longer in the state the caller read. Nothing was written.
    Stale,
    /// The tenant already used its monthly allowance. Nothing was written.
    LimitReached { limit: i64, current: i64 },
}

/// At most `limit` non-cancelled bookings created in `[from, to)`, counted inside the
/// reservation itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlyCap {
    pub limit: i64,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}
