use std::{collections::HashMap, sync::Arc};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use crates::{
    domain::{
        entities::{bookings::UpdateBookingEntity, payment_events::InsertProcessedPaymentEventEntity},
        repositories::{
            bookings::{BookingRepository, PaymentEventOutcome},
            notifications::BookingNotifier,
            view_cache::ViewCache,
        },
        value_objects::{
            booking_state::{BookingEvent, BookingState, Transition, TransitionAnomaly},
            bookings::{BookingDto, PaymentIntentDto},
            enums::{booking_statuses::BookingStatus, payment_statuses::PaymentStatus},
            iam::ActorContext,
            notifications::NotificationKind,
        },
    },
    payments::stripe_client::{
        BookingCharge, StripeCheckout, StripeClient, StripeEvent, StripePaymentIntent,
    },
};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    errors::{BookingError, UseCaseResult},
    side_effects::BookingSideEffects,
};

const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";
const PAYMENT_INTENT_FAILED: &str = "payment_intent.payment_failed";

/// A booking that moves between the read and the guarded write is re-read this many times.
const MAX_APPLY_ATTEMPTS: usize = 3;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway {
    async fn create_checkout_session(&self, charge: BookingCharge) -> Result<StripeCheckout>;

    async fn create_payment_intent(&self, charge: BookingCharge) -> Result<StripePaymentIntent>;

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<StripeEvent>;
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(&self, charge: BookingCharge) -> Result<StripeCheckout> {
        StripeClient::create_checkout_session(self, &charge).await
    }

    async fn create_payment_intent(&self, charge: BookingCharge) -> Result<StripePaymentIntent> {
        StripeClient::create_payment_intent(self, &charge).await
    }

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<StripeEvent> {
        StripeClient::verify_webhook_signature(self, payload, signature)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    Applied { booking_id: Uuid },
    Duplicate,
    Ignored,
    /// Acknowledged and recorded, but the booking could not take the transition.
    Rejected { booking_id: Uuid },
}

/// The booking a gateway event is about, and what it asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PaymentSignal {
    event_id: String,
    event_type: String,
    business_id: Uuid,
    booking_id: Uuid,
    event: BookingEvent,
    reference: Option<String>,
}

pub struct BookingPaymentUseCase<B, V, N, G>
where
    B: BookingRepository + Send + Sync + 'static,
    V: ViewCache + Send + Sync + 'static,
    N: BookingNotifier + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    booking_repo: Arc<B>,
    side_effects: Arc<BookingSideEffects<V, N>>,
    gateway: Arc<G>,
}

impl<B, V, N, G> BookingPaymentUseCase<B, V, N, G>
where
    B: BookingRepository + Send + Sync + 'static,
    V: ViewCache + Send + Sync + 'static,
    N: BookingNotifier + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    pub fn new(
        booking_repo: Arc<B>,
        side_effects: Arc<BookingSideEffects<V, N>>,
        gateway: Arc<G>,
    ) -> Self {
        Self {
            booking_repo,
            side_effects,
            gateway,
        }
    }

    pub async fn checkout_for_booking(
        &self,
        booking: &BookingDto,
        customer_email: Option<String>,
    ) -> UseCaseResult<StripeCheckout> {
        Self::ensure_chargeable(booking.status, booking.payment_status)?;

        let checkout = self
            .gateway
            .create_checkout_session(BookingCharge {
                booking_id: booking.id,
                business_id: booking.business_id,
                amount_minor: booking.total_amount_minor,
                description: "Appointment booking".to_string(),
                customer_email,
            })
            .await
            .map_err(|err| {
                error!(
                    business_id = %booking.business_id,
                    booking_id = %booking.id,
                    gateway_error = ?err,
                    "booking_payments: checkout session failed"
                );
                BookingError::Internal(err)
            })?;

        info!(
            business_id = %booking.business_id,
            booking_id = %booking.id,
            session_id = %checkout.session_id,
            amount_minor = booking.total_amount_minor,
            "booking_payments: checkout session created"
        );
        Ok(checkout)
    }

    /// Checkout for a freshly created public booking. The booking stands even when the
    /// gateway is unavailable; the caller just gets no URL.
    pub async fn public_checkout_url(
        &self,
        booking: &BookingDto,
        customer_email: String,
    ) -> Option<String> {
        match self.checkout_for_booking(booking, Some(customer_email)).await {
            Ok(checkout) => Some(checkout.url),
            Err(err) => {
                warn!(
                    booking_id = %booking.id,
                    error_code = err.error_code(),
                    "booking_payments: public booking kept without checkout"
                );
                None
            }
        }
    }

    pub async fn create_payment_intent(
        &self,
        actor: ActorContext,
        booking_id: Uuid,
    ) -> UseCaseResult<PaymentIntentDto> {
        let business_id = actor.business_id;
        if !actor.effective_permissions().can_manage_payments {
            warn!(%business_id, actor_id = %actor.actor_id, "booking_payments: permission denied");
            return Err(BookingError::Forbidden("missing can_manage_payments"));
        }

        let booking = self
            .booking_repo
            .find_by_id(business_id, booking_id)
            .await
            .map_err(|err| {
                error!(%business_id, %booking_id, db_error = ?err, "booking_payments: failed to load booking");
                BookingError::Internal(err)
            })?
            .map(BookingDto::from)
            .ok_or(BookingError::NotFound("booking"))?;

        Self::ensure_chargeable(booking.status, booking.payment_status)?;

        let intent = self
            .gateway
            .create_payment_intent(BookingCharge {
                booking_id,
                business_id,
                amount_minor: booking.total_amount_minor,
                description: "Appointment booking".to_string(),
                customer_email: None,
            })
            .await
            .map_err(|err| {
                error!(%business_id, %booking_id, gateway_error = ?err, "booking_payments: payment intent failed");
                BookingError::Internal(err)
            })?;

        let stored = self
            .booking_repo
            .update(
                business_id,
                booking_id,
                BookingState::new(booking.status, booking.payment_status),
                UpdateBookingEntity {
                    payment_reference: Some(Some(intent.id.clone())),
                    updated_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await
            .map_err(|err| {
                error!(%business_id, %booking_id, db_error = ?err, "booking_payments: failed to store payment reference");
                BookingError::Internal(err)
            })?;
        if stored.is_none() {
            warn!(
                %business_id,
                %booking_id,
                payment_intent_id = %intent.id,
                "booking_payments: booking changed while the payment intent was created"
            );
            return Err(BookingError::InvalidState(
                "booking changed while the payment intent was created".to_string(),
            ));
        }
        self.side_effects.invalidate_tenant(business_id).await;

        info!(
            %business_id,
            %booking_id,
            payment_intent_id = %intent.id,
            amount_minor = booking.total_amount_minor,
            "booking_payments: payment intent created"
        );

        Ok(PaymentIntentDto {
            booking_id,
            payment_intent_id: intent.id,
            client_secret: intent.client_secret,
            amount_minor: intent.amount.unwrap_or(booking.total_amount_minor),
        })
    }

    /// Verifies and applies a gateway event exactly once per event id.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> UseCaseResult<WebhookOutcome> {
        let signature = signature
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| BookingError::InvalidWebhook("missing Stripe-Signature header".to_string()))?;

        let event = self
            .gateway
            .verify_webhook_signature(payload, signature)
            .map_err(|err| {
                warn!(verify_error = %err, "booking_payments: webhook rejected");
                BookingError::InvalidWebhook("signature verification failed".to_string())
            })?;

        let Some(signal) = Self::signal_from(&event)? else {
            info!(event_type = %event.type_, "booking_payments: event ignored");
            return Ok(WebhookOutcome::Ignored);
        };

        let processed = self
            .booking_repo
            .is_payment_event_processed(signal.event_id.clone())
            .await
            .map_err(|err| {
                error!(event_id = %signal.event_id, db_error = ?err, "booking_payments: ledger lookup failed");
                BookingError::Internal(err)
            })?;
        if processed {
            info!(event_id = %signal.event_id, "booking_payments: duplicate event");
            return Ok(WebhookOutcome::Duplicate);
        }

        for attempt in 1..=MAX_APPLY_ATTEMPTS {
            if let Some(outcome) = self.try_apply(&signal, attempt).await? {
                return Ok(outcome);
            }
        }

        error!(
            event_id = %signal.event_id,
            booking_id = %signal.booking_id,
            "booking_payments: booking kept changing under the event"
        );
        Err(BookingError::Internal(anyhow!(
            "booking {} changed concurrently while applying {}",
            signal.booking_id,
            signal.event_id
        )))
    }

    /// `None` means the booking moved between read and write; the caller retries.
    async fn try_apply(
        &self,
        signal: &PaymentSignal,
        attempt: usize,
    ) -> UseCaseResult<Option<WebhookOutcome>> {
        let PaymentSignal {
            event_id,
            business_id,
            booking_id,
            ..
        } = signal;

        let booking = self
            .booking_repo
            .find_by_id(*business_id, *booking_id)
            .await
            .map_err(|err| {
                error!(%event_id, %booking_id, db_error = ?err, "booking_payments: failed to load booking");
                BookingError::Internal(err)
            })?;

        let Some(booking) = booking else {
            warn!(%event_id, %business_id, %booking_id, "booking_payments: event for unknown booking");
            return Ok(Some(WebhookOutcome::Ignored));
        };

        let current = booking.state().map_err(|err| {
            error!(%booking_id, state_error = ?err, "booking_payments: stored booking state is unreadable");
            BookingError::Internal(err)
        })?;

        let (transition, outcome_label) = match current.apply(signal.event) {
            Ok(transition) => {
                let label = match (transition.anomaly, transition.is_noop()) {
                    (Some(_), _) => "anomaly",
                    (None, true) => "noop",
                    (None, false) => "applied",
                };
                (Some(transition), label)
            }
            Err(err) => {
                warn!(
                    %event_id,
                    %booking_id,
                    status = %current.status,
                    payment_status = %current.payment_status,
                    transition_error = %err,
                    "booking_payments: event cannot move booking"
                );
                (None, "rejected")
            }
        };

        let ledger = InsertProcessedPaymentEventEntity {
            event_id: event_id.clone(),
            booking_id: *booking_id,
            event_type: signal.event_type.clone(),
            outcome: outcome_label.to_string(),
            processed_at: Utc::now(),
        };
        let changes = transition
            .filter(|transition| !transition.is_noop())
            .map(|transition| Self::changes_for(&transition, signal.reference.clone()));

        let outcome = self
            .booking_repo
            .apply_payment_event(ledger, *business_id, current, changes)
            .await
            .map_err(|err| {
                error!(%event_id, %booking_id, db_error = ?err, "booking_payments: failed to apply event");
                BookingError::Internal(err)
            })?;

        match outcome {
            PaymentEventOutcome::Duplicate => {
                info!(%event_id, "booking_payments: duplicate event");
                Ok(Some(WebhookOutcome::Duplicate))
            }
            PaymentEventOutcome::Stale => {
                warn!(%event_id, %booking_id, attempt, "booking_payments: booking changed, retrying");
                Ok(None)
            }
            PaymentEventOutcome::Applied(updated) => {
                let Some(transition) = transition else {
                    return Ok(Some(WebhookOutcome::Rejected {
                        booking_id: *booking_id,
                    }));
                };
                self.after_applied(event_id, transition, BookingDto::from(updated))
                    .await;
                Ok(Some(WebhookOutcome::Applied {
                    booking_id: *booking_id,
                }))
            }
        }
    }

    async fn after_applied(&self, event_id: &str, transition: Transition, booking: BookingDto) {
        if transition.is_noop() {
            info!(%event_id, booking_id = %booking.id, "booking_payments: event already reflected");
            return;
        }

        self.side_effects.invalidate_tenant(booking.business_id).await;

        if let Some(TransitionAnomaly::PaidWhileReleased) = transition.anomaly {
            warn!(
                %event_id,
                business_id = %booking.business_id,
                booking_id = %booking.id,
                status = %booking.status,
                "booking_payments: payment received for a released booking"
            );
        }

        if transition.status_changed() && transition.to.status == BookingStatus::Confirmed {
            self.side_effects
                .notify(NotificationKind::BookingConfirmed, &booking);
        }

        info!(
            %event_id,
            business_id = %booking.business_id,
            booking_id = %booking.id,
            status = %booking.status,
            payment_status = %booking.payment_status,
            "booking_payments: event applied"
        );
    }

    fn changes_for(transition: &Transition, reference: Option<String>) -> UpdateBookingEntity {
        UpdateBookingEntity {
            status: transition
                .status_changed()
                .then(|| transition.to.status.to_string()),
            payment_status: transition
                .payment_changed()
                .then(|| transition.to.payment_status.to_string()),
            payment_reference: reference.map(Some),
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    fn ensure_chargeable(status: BookingStatus, payment_status: PaymentStatus) -> UseCaseResult<()> {
        if !status.holds_slot() {
            return Err(BookingError::InvalidState(format!(
                "cannot charge a booking in status {status}"
            )));
        }
        if payment_status == PaymentStatus::Paid {
            return Err(BookingError::InvalidState("booking is already paid".to_string()));
        }
        Ok(())
    }

    /// Maps a verified gateway event onto a booking event. `Ok(None)` for events the
    /// scheduler does not act on.
    fn signal_from(event: &StripeEvent) -> UseCaseResult<Option<PaymentSignal>> {
        let (booking_event, metadata, client_reference, reference) = match event.type_.as_str() {
            CHECKOUT_COMPLETED => {
                let session = StripeClient::extract_checkout_session(event).ok_or_else(|| {
                    BookingError::InvalidWebhook("checkout session payload unreadable".to_string())
                })?;
                if session.mode.as_deref() != Some("payment")
                    || session.payment_status.as_deref() == Some("unpaid")
                {
                    return Ok(None);
                }
                (
                    BookingEvent::CheckoutCompleted,
                    session.metadata.unwrap_or_default(),
                    session.client_reference_id,
                    session.payment_intent.or(session.id),
                )
            }
            PAYMENT_INTENT_SUCCEEDED | PAYMENT_INTENT_FAILED => {
                let intent = StripeClient::extract_payment_intent(event).ok_or_else(|| {
                    BookingError::InvalidWebhook("payment intent payload unreadable".to_string())
                })?;
                let booking_event = if event.type_ == PAYMENT_INTENT_SUCCEEDED {
                    BookingEvent::PaymentSucceeded
                } else {
                    BookingEvent::PaymentFailed
                };
                (booking_event, intent.metadata, None, Some(intent.id))
            }
            _ => return Ok(None),
        };

        let event_id = event
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| BookingError::InvalidWebhook("event id missing".to_string()))?;

        let booking_id = metadata_uuid(&metadata, "booking_id")
            .or_else(|| client_reference.and_then(|value| Uuid::parse_str(&value).ok()))
            .ok_or_else(|| BookingError::InvalidWebhook("booking_id missing".to_string()))?;
        let business_id = metadata_uuid(&metadata, "business_id")
            .ok_or_else(|| BookingError::InvalidWebhook("business_id missing".to_string()))?;

        Ok(Some(PaymentSignal {
            event_id,
            event_type: event.type_.clone(),
            business_id,
            booking_id,
            event: booking_event,
            reference,
        }))
    }
}

fn metadata_uuid(metadata: &HashMap<String, String>, key: &str) -> Option<Uuid> {
    metadata
        .get(key)
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
}
