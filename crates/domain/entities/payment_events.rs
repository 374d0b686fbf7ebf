use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::processed_payment_events;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = processed_payment_events, primary_key(event_id))]
pub struct ProcessedPaymentEventEntity {
    pub event_id: String,
    pub booking_id: Uuid,
    pub event_type: String,
    pub outcome: String,
    pub processed_at: DateTime<Utc>,
}

/// Ledger row written in the same transaction as the booking mutation it records.
#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = processed_payment_events)]
pub struct InsertProcessedPaymentEventEntity {
    pub event_id: String,
    pub booking_id: Uuid,
    pub event_type: String,
    pub outcome: String,
    pub processed_at: DateTime<Utc>,
}
