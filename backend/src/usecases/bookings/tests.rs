use super::*;
use anyhow::anyhow;
use chrono::{Duration, TimeZone};
use crates::domain::{
    entities::clients::ClientEntity,
    repositories::{
        bookings::MockBookingRepository, businesses::MockBusinessRepository,
        catalog::MockCatalogRepository, notifications::MockBookingNotifier,
        view_cache::MockViewCache,
    },
    value_objects::{
        bookings::ClientContact,
        enums::payment_statuses::PaymentStatus,
        iam::StaffPermissions,
    },
};

use crate::usecases::test_support::{
    InMemoryBookingRepository, at, owner, sample_booking, sample_business, sample_client,
    sample_service, staff_with,
};

type TestUseCase<B = InMemoryBookingRepository> = BookingUseCase<
    B,
    MockCatalogRepository,
    MockBusinessRepository,
    MockViewCache,
    MockBookingNotifier,
>;

fn catalog_for(service: ServiceEntity, client: ClientEntity) -> MockCatalogRepository {
    let mut catalog = MockCatalogRepository::new();

    catalog
        .expect_find_service()
        .returning(move |business_id, service_id| {
            Ok((service.business_id == business_id && service.id == service_id)
                .then(|| service.clone()))
        });

    let known = client.clone();
    catalog
        .expect_find_client()
        .returning(move |business_id, client_id| {
            Ok((known.business_id == business_id && known.id == client_id).then(|| known.clone()))
        });

    catalog.expect_location_exists().returning(|_, _| Ok(true));
    catalog.expect_staff_exists().returning(|_, _| Ok(true));
    catalog
        .expect_find_or_create_client()
        .returning(move |insert| {
            Ok(ClientEntity {
                id: client.id,
                business_id: insert.business_id,
                name: insert.name,
                email: insert.email,
                phone: insert.phone,
                created_at: client.created_at,
            })
        });

    catalog
}

fn quiet_cache() -> MockViewCache {
    let mut cache = MockViewCache::new();
    cache.expect_get().returning(|_| Ok(None));
    cache.expect_put().returning(|_, _| Ok(()));
    cache.expect_invalidate_prefix().returning(|_| Ok(0));
    cache
}

fn quiet_notifier() -> MockBookingNotifier {
    let mut notifier = MockBookingNotifier::new();
    notifier.expect_publish().returning(|_| Ok(()));
    notifier
}

fn build<B>(
    repo: Arc<B>,
    catalog: MockCatalogRepository,
    cache: MockViewCache,
    notifier: MockBookingNotifier,
) -> TestUseCase<B>
where
    B: BookingRepository + Send + Sync + 'static,
{
    BookingUseCase::new(
        repo,
        Arc::new(catalog),
        Arc::new(MockBusinessRepository::new()),
        Arc::new(BookingSideEffects::new(Arc::new(cache), Arc::new(notifier))),
        BookingPolicy::default(),
    )
}

struct Fixture {
    business_id: Uuid,
    service: ServiceEntity,
    client: ClientEntity,
    repo: Arc<InMemoryBookingRepository>,
}

impl Fixture {
    fn new(duration_minutes: i32, price_minor: i64) -> Self {
        let business_id = Uuid::new_v4();
        Self {
            business_id,
            service: sample_service(business_id, duration_minutes, price_minor),
            client: sample_client(business_id),
            repo: Arc::new(InMemoryBookingRepository::default()),
        }
    }

    fn use_case(&self) -> TestUseCase {
        build(
            Arc::clone(&self.repo),
            catalog_for(self.service.clone(), self.client.clone()),
            quiet_cache(),
            quiet_notifier(),
        )
    }

    fn request(&self, start_time: DateTime<Utc>) -> CreateBookingModel {
        CreateBookingModel {
            client_id: self.client.id,
            service_id: self.service.id,
            location_id: None,
            staff_id: None,
            start_time,
            notes: None,
        }
    }
}

#[tokio::test]
async fn create_snapshots_service_duration_and_price() {
    let fixture = Fixture::new(45, 3000);
    let use_case = fixture.use_case();

    let booking = use_case
        .create_booking(owner(fixture.business_id), fixture.request(at(10, 0)))
        .await
        .unwrap();

    assert_eq!(booking.end_time, at(10, 45));
    assert_eq!(booking.total_amount_minor, 3000);
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn overlapping_create_is_rejected_with_the_blocking_booking() {
    let fixture = Fixture::new(30, 2500);
    let existing = sample_booking(fixture.business_id, at(10, 0), 30, BookingStatus::Confirmed);
    let existing_id = existing.id;
    let repo = Arc::new(InMemoryBookingRepository::with_bookings(vec![existing]));
    let use_case = build(
        repo,
        catalog_for(fixture.service.clone(), fixture.client.clone()),
        quiet_cache(),
        quiet_notifier(),
    );

    let err = use_case
        .create_booking(owner(fixture.business_id), fixture.request(at(10, 15)))
        .await
        .unwrap_err();

    match err {
        BookingError::SlotUnavailable(conflict) => assert_eq!(conflict.booking_id, existing_id),
        other => panic!("expected SlotUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn back_to_back_bookings_are_allowed() {
    let fixture = Fixture::new(30, 2500);
    let use_case = fixture.use_case();
    let actor = owner(fixture.business_id);

    use_case
        .create_booking(actor, fixture.request(at(10, 0)))
        .await
        .unwrap();
    use_case
        .create_booking(actor, fixture.request(at(10, 30)))
        .await
        .unwrap();

    assert_eq!(fixture.repo.snapshot().await.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_for_one_slot_admit_exactly_one() {
    let fixture = Fixture::new(60, 2500);
    let use_case = Arc::new(fixture.use_case());
    let actor = owner(fixture.business_id);

    let first = {
        let use_case = Arc::clone(&use_case);
        let request = fixture.request(at(14, 0));
        tokio::spawn(async move { use_case.create_booking(actor, request).await })
    };
    let second = {
        let use_case = Arc::clone(&use_case);
        let request = fixture.request(at(14, 30));
        tokio::spawn(async move { use_case.create_booking(actor, request).await })
    };

    let results = [first.await.unwrap(), second.await.unwrap()];
    let created = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(BookingError::SlotUnavailable(_))))
        .count();

    assert_eq!((created, rejected), (1, 1));
    assert_eq!(fixture.repo.snapshot().await.len(), 1);
}

#[tokio::test]
async fn cancelled_booking_frees_its_slot() {
    let fixture = Fixture::new(30, 2500);
    let use_case = fixture.use_case();
    let actor = owner(fixture.business_id);

    let booking = use_case
        .create_booking(actor, fixture.request(at(11, 0)))
        .await
        .unwrap();
    let cancelled = use_case.cancel_booking(actor, booking.id).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let rebooked = use_case
        .create_booking(actor, fixture.request(at(11, 0)))
        .await
        .unwrap();
    assert_ne!(rebooked.id, booking.id);
}

#[tokio::test]
async fn cancelling_twice_is_an_invalid_state() {
    let fixture = Fixture::new(30, 2500);
    let use_case = fixture.use_case();
    let actor = owner(fixture.business_id);

    let booking = use_case
        .create_booking(actor, fixture.request(at(9, 0)))
        .await
        .unwrap();
    use_case.cancel_booking(actor, booking.id).await.unwrap();

    let err = use_case.cancel_booking(actor, booking.id).await.unwrap_err();
    assert!(matches!(err, BookingError::InvalidState(_)));
}

#[tokio::test]
async fn reschedule_keeps_snapshotted_price_and_duration() {
    let fixture = Fixture::new(45, 3000);
    let actor = owner(fixture.business_id);
    let booking = fixture
        .use_case()
        .create_booking(actor, fixture.request(at(10, 0)))
        .await
        .unwrap();

    // The catalog now prices the same service differently.
    let mut repriced = fixture.service.clone();
    repriced.price_minor = 9900;
    repriced.duration_minutes = 90;
    let use_case = build(
        Arc::clone(&fixture.repo),
        catalog_for(repriced, fixture.client.clone()),
        quiet_cache(),
        quiet_notifier(),
    );

    let moved = use_case
        .update_booking(
            actor,
            booking.id,
            UpdateBookingModel {
                start_time: Some(at(13, 0)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(moved.start_time, at(13, 0));
    assert_eq!(moved.end_time, at(13, 45));
    assert_eq!(moved.total_amount_minor, 3000);
}

#[tokio::test]
async fn reschedule_ignores_its_own_interval_but_not_others() {
    let fixture = Fixture::new(60, 2500);
    let use_case = fixture.use_case();
    let actor = owner(fixture.business_id);

    let booking = use_case
        .create_booking(actor, fixture.request(at(10, 0)))
        .await
        .unwrap();
    use_case
        .create_booking(actor, fixture.request(at(12, 0)))
        .await
        .unwrap();

    let nudged = use_case
        .update_booking(
            actor,
            booking.id,
            UpdateBookingModel {
                start_time: Some(at(10, 30)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(nudged.end_time, at(11, 30));

    let err = use_case
        .update_booking(
            actor,
            booking.id,
            UpdateBookingModel {
                start_time: Some(at(11, 30)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SlotUnavailable(_)));
}

#[tokio::test]
async fn illegal_status_transition_is_rejected() {
    let fixture = Fixture::new(30, 2500);
    let use_case = fixture.use_case();
    let actor = owner(fixture.business_id);
    let booking = use_case
        .create_booking(actor, fixture.request(at(15, 0)))
        .await
        .unwrap();

    let complete = UpdateBookingModel {
        status: Some(BookingStatus::Completed),
        ..Default::default()
    };
    let err = use_case
        .update_booking(actor, booking.id, complete)
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::InvalidTransition(_)));
}

#[tokio::test]
async fn confirming_a_booking_sends_a_confirmation() {
    let fixture = Fixture::new(30, 2500);
    let actor = owner(fixture.business_id);
    let booking = fixture
        .use_case()
        .create_booking(actor, fixture.request(at(16, 0)))
        .await
        .unwrap();

    let mut notifier = MockBookingNotifier::new();
    notifier
        .expect_publish()
        .withf(|notification| notification.kind == NotificationKind::BookingConfirmed)
        .times(1)
        .returning(|_| Ok(()));
    let use_case = build(
        Arc::clone(&fixture.repo),
        catalog_for(fixture.service.clone(), fixture.client.clone()),
        quiet_cache(),
        notifier,
    );

    let confirmed = use_case
        .update_booking(
            actor,
            booking.id,
            UpdateBookingModel {
                status: Some(BookingStatus::Confirmed),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(confirmed.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn other_tenants_bookings_are_not_found() {
    let fixture = Fixture::new(30, 2500);
    let use_case = fixture.use_case();
    let booking = use_case
        .create_booking(owner(fixture.business_id), fixture.request(at(10, 0)))
        .await
        .unwrap();

    let stranger = owner(Uuid::new_v4());
    let err = use_case.get_booking(stranger, booking.id).await.unwrap_err();
    assert!(matches!(err, BookingError::NotFound("booking")));

    let err = use_case.cancel_booking(stranger, booking.id).await.unwrap_err();
    assert!(matches!(err, BookingError::NotFound("booking")));
}

#[tokio::test]
async fn staff_without_permission_cannot_create_or_delete() {
    let fixture = Fixture::new(30, 2500);
    let use_case = fixture.use_case();
    let staff = staff_with(
        fixture.business_id,
        StaffPermissions {
            can_manage_bookings: false,
            can_view_all_bookings: true,
            ..Default::default()
        },
    );

    let err = use_case
        .create_booking(staff, fixture.request(at(10, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden(_)));

    let err = use_case.delete_booking(staff, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, BookingError::Forbidden(_)));
}

#[tokio::test]
async fn delete_of_missing_booking_is_not_found() {
    let fixture = Fixture::new(30, 2500);
    let err = fixture
        .use_case()
        .delete_booking(owner(fixture.business_id), Uuid::new_v4())
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::NotFound("booking")));
}

#[tokio::test]
async fn side_effect_failures_do_not_fail_the_write() {
    let fixture = Fixture::new(30, 2500);
    let mut cache = MockViewCache::new();
    cache
        .expect_invalidate_prefix()
        .returning(|_| Err(anyhow!("cache offline")));
    let mut notifier = MockBookingNotifier::new();
    notifier
        .expect_publish()
        .times(1)
        .returning(|_| Err(anyhow!("queue full")));

    let side_effects = Arc::new(BookingSideEffects::new(Arc::new(cache), Arc::new(notifier)));
    let use_case = BookingUseCase::new(
        Arc::clone(&fixture.repo),
        Arc::new(catalog_for(fixture.service.clone(), fixture.client.clone())),
        Arc::new(MockBusinessRepository::new()),
        Arc::clone(&side_effects),
        BookingPolicy::default(),
    );

    let booking = use_case
        .create_booking(owner(fixture.business_id), fixture.request(at(10, 0)))
        .await
        .unwrap();

    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(side_effects.failures().notifications, 1);
    assert_eq!(side_effects.failures().cache, 3);
}

/// A FREE tenant with `used` bookings already created this month, limit enforced.
fn free_tenant_with(
    fixture: &Fixture,
    used: i64,
) -> (Arc<InMemoryBookingRepository>, TestUseCase) {
    let existing = (0..used)
        .map(|i| {
            sample_booking(
                fixture.business_id,
                at(9, 0) + Duration::days(i),
                30,
                BookingStatus::Confirmed,
            )
        })
        .collect();
    let repo = Arc::new(InMemoryBookingRepository::with_bookings(existing));

    let business_id = fixture.business_id;
    let mut business_repo = MockBusinessRepository::new();
    business_repo
        .expect_find_by_id()
        .returning(move |_| Ok(Some(sample_business(business_id, "FREE"))));

    let use_case = BookingUseCase::new(
        Arc::clone(&repo),
        Arc::new(catalog_for(fixture.service.clone(), fixture.client.clone())),
        Arc::new(business_repo),
        Arc::new(BookingSideEffects::new(
            Arc::new(quiet_cache()),
            Arc::new(quiet_notifier()),
        )),
        BookingPolicy {
            enforce_monthly_limit: true,
        },
    );

    (repo, use_case)
}

#[tokio::test]
async fn free_plan_monthly_limit_blocks_creation() {
    let fixture = Fixture::new(30, 2500);
    let business_id = fixture.business_id;
    let (_, use_case) = free_tenant_with(&fixture, 50);

    let err = use_case
        .create_booking(owner(business_id), fixture.request(at(18, 0)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BookingError::MonthlyBookingLimit {
            limit: 50,
            current: 50
        }
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_cannot_overrun_the_monthly_limit() {
    let fixture = Fixture::new(30, 2500);
    let (repo, use_case) = free_tenant_with(&fixture, 49);
    let use_case = Arc::new(use_case);
    let actor = owner(fixture.business_id);

    // Different slots, so only the monthly allowance can reject one of them.
    let tasks: Vec<_> = [at(11, 0), at(15, 0)]
        .into_iter()
        .map(|start_time| {
            let use_case = Arc::clone(&use_case);
            let request = fixture.request(start_time);
            tokio::spawn(async move { use_case.create_booking(actor, request).await })
        })
        .collect();

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.unwrap());
    }
    let created = results.iter().filter(|r| r.is_ok()).count();
    let limited = results
        .iter()
        .filter(|r| {
            matches!(
                r,
                Err(BookingError::MonthlyBookingLimit {
                    limit: 50,
                    current: 50
                })
            )
        })
        .count();

    assert_eq!((created, limited), (1, 1));
    assert_eq!(repo.snapshot().await.len(), 50);
}

#[tokio::test]
async fn public_booking_normalizes_email_and_rejects_the_past() {
    let fixture = Fixture::new(30, 2500);
    let use_case = fixture.use_case();
    let model = PublicBookingModel {
        service_id: fixture.service.id,
        location_id: None,
        staff_id: None,
        start_time: at(10, 0),
        notes: None,
        client: ClientContact {
            name: "  Sam  ".to_string(),
            email: " Sam@Example.COM ".to_string(),
            phone: None,
        },
        pay_online: false,
    };

    let err = use_case
        .create_public_booking(fixture.business_id, model.clone(), at(10, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));

    let booking = use_case
        .create_public_booking(fixture.business_id, model, at(8, 0))
        .await
        .unwrap();
    assert_eq!(booking.client_id, fixture.client.id);
    assert!(booking.created_at <= Utc::now());
}

#[tokio::test]
async fn booking_list_is_served_from_cache_when_present() {
    let business_id = Uuid::new_v4();
    let cached = vec![crate::usecases::test_support::sample_booking_dto()];
    let cached_json = serde_json::to_value(&cached).unwrap();

    let mut cache = MockViewCache::new();
    cache
        .expect_get()
        .times(1)
        .returning(move |_| Ok(Some(cached_json.clone())));

    let use_case: TestUseCase<MockBookingRepository> = build(
        Arc::new(MockBookingRepository::new()),
        MockCatalogRepository::new(),
        cache,
        MockBookingNotifier::new(),
    );

    let listed = use_case
        .list_bookings(owner(business_id), BookingListFilter::default())
        .await
        .unwrap();

    assert_eq!(listed, cached);
}

#[test]
fn month_bounds_cover_the_calendar_month() {
    let now = Utc.with_ymd_and_hms(2031, 12, 17, 8, 30, 0).unwrap();
    let (from, to) = month_bounds(now).unwrap();

    assert_eq!(from, Utc.with_ymd_and_hms(2031, 12, 1, 0, 0, 0).unwrap());
    assert_eq!(to, Utc.with_ymd_and_hms(2032, 1, 1, 0, 0, 0).unwrap());
}

/// Hands out the first read of a booking, then lets another writer change it (and
/// optionally take its slot) before the caller writes back.
struct InterleavedWriter {
    inner: Arc<InMemoryBookingRepository>,
    pending: tokio::sync::Mutex<Option<(UpdateBookingEntity, Option<InsertBookingEntity>)>>,
}

impl InterleavedWriter {
    fn new(
        inner: Arc<InMemoryBookingRepository>,
        changes: UpdateBookingEntity,
        competitor: Option<InsertBookingEntity>,
    ) -> Self {
        Self {
            inner,
            pending: tokio::sync::Mutex::new(Some((changes, competitor))),
        }
    }
}

#[async_trait::async_trait]
impl BookingRepository for InterleavedWriter {
    async fn find_by_id(
        &self,
        business_id: Uuid,
        booking_id: Uuid,
    ) -> anyhow::Result<Option<BookingEntity>> {
        let found = self.inner.find_by_id(business_id, booking_id).await?;
        let interleaved = self.pending.lock().await.take();

        if let (Some(booking), Some((changes, competitor))) = (&found, interleaved) {
            self.inner
                .update(business_id, booking_id, booking.state()?, changes)
                .await?;
            if let Some(competitor) = competitor {
                self.inner.insert_if_slot_free(competitor, None).await?;
            }
        }
        Ok(found)
    }

    async fn list_for_business(
        &self,
        business_id: Uuid,
        filter: BookingListFilter,
    ) -> anyhow::Result<Vec<BookingEntity>> {
        self.inner.list_for_business(business_id, filter).await
    }

    async fn list_active_overlapping(
        &self,
        business_id: Uuid,
        scope: ResourceScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<BookingEntity>> {
        self.inner
            .list_active_overlapping(business_id, scope, from, to)
            .await
    }

    async fn insert_if_slot_free(
        &self,
        booking: InsertBookingEntity,
        cap: Option<MonthlyCap>,
    ) -> anyhow::Result<SlotReservation> {
        self.inner.insert_if_slot_free(booking, cap).await
    }

    async fn reschedule_if_slot_free(
        &self,
        business_id: Uuid,
        booking_id: Uuid,
        expected: BookingState,
        scope: ResourceScope,
        changes: UpdateBookingEntity,
    ) -> anyhow::Result<SlotReservation> {
        self.inner
            .reschedule_if_slot_free(business_id, booking_id, expected, scope, changes)
            .await
    }

    async fn update(
        &self,
        business_id: Uuid,
        booking_id: Uuid,
        expected: BookingState,
        changes: UpdateBookingEntity,
    ) -> anyhow::Result<Option<BookingEntity>> {
        self.inner
            .update(business_id, booking_id, expected, changes)
            .await
    }

    async fn delete(&self, business_id: Uuid, booking_id: Uuid) -> anyhow::Result<bool> {
        self.inner.delete(business_id, booking_id).await
    }

    async fn is_payment_event_processed(&self, event_id: String) -> anyhow::Result<bool> {
        self.inner.is_payment_event_processed(event_id).await
    }

    async fn apply_payment_event(
        &self,
        ledger: crates::domain::entities::payment_events::InsertProcessedPaymentEventEntity,
        business_id: Uuid,
        expected: BookingState,
        changes: Option<UpdateBookingEntity>,
    ) -> anyhow::Result<crates::domain::repositories::bookings::PaymentEventOutcome> {
        self.inner
            .apply_payment_event(ledger, business_id, expected, changes)
            .await
    }
}

fn cancellation() -> UpdateBookingEntity {
    UpdateBookingEntity {
        status: Some(BookingStatus::Cancelled.to_string()),
        ..Default::default()
    }
}

fn competitor_at(business_id: Uuid, start_time: DateTime<Utc>) -> InsertBookingEntity {
    let booking = sample_booking(business_id, start_time, 30, BookingStatus::Pending);
    InsertBookingEntity {
        id: booking.id,
        business_id,
        client_id: booking.client_id,
        service_id: booking.service_id,
        location_id: booking.location_id,
        staff_id: booking.staff_id,
        created_by: None,
        start_time: booking.start_time,
        end_time: booking.end_time,
        status: booking.status,
        payment_status: booking.payment_status,
        total_amount_minor: booking.total_amount_minor,
        notes: None,
        created_at: booking.created_at,
        updated_at: booking.updated_at,
    }
}

fn slot_holders_at(bookings: &[BookingEntity], start_time: DateTime<Utc>) -> usize {
    bookings
        .iter()
        .filter(|b| b.start_time == start_time && b.holds_slot())
        .count()
}

#[tokio::test]
async fn confirm_over_a_concurrent_cancel_cannot_double_book() {
    let business_id = Uuid::new_v4();
    let booking = sample_booking(business_id, at(10, 0), 30, BookingStatus::Pending);
    let store = Arc::new(InMemoryBookingRepository::with_bookings(vec![booking.clone()]));
    let repo = Arc::new(InterleavedWriter::new(
        Arc::clone(&store),
        cancellation(),
        Some(competitor_at(business_id, at(10, 0))),
    ));

    let mut notifier = MockBookingNotifier::new();
    notifier.expect_publish().never();
    let use_case = build(
        repo,
        MockCatalogRepository::new(),
        quiet_cache(),
        notifier,
    );

    let err = use_case
        .update_booking(
            owner(business_id),
            booking.id,
            UpdateBookingModel {
                status: Some(BookingStatus::Confirmed),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::InvalidTransition(_)));
    let stored = store.snapshot().await;
    assert_eq!(stored.len(), 2);
    assert_eq!(slot_holders_at(&stored, at(10, 0)), 1);
    let original = stored.iter().find(|b| b.id == booking.id).unwrap();
    assert_eq!(original.status, BookingStatus::Cancelled.to_string());
}

#[tokio::test]
async fn concurrent_cancels_notify_once() {
    let business_id = Uuid::new_v4();
    let booking = sample_booking(business_id, at(13, 0), 30, BookingStatus::Confirmed);
    let store = Arc::new(InMemoryBookingRepository::with_bookings(vec![booking.clone()]));
    let repo = Arc::new(InterleavedWriter::new(Arc::clone(&store), cancellation(), None));

    let mut notifier = MockBookingNotifier::new();
    notifier.expect_publish().never();
    let use_case = build(
        repo,
        MockCatalogRepository::new(),
        quiet_cache(),
        notifier,
    );

    let err = use_case
        .cancel_booking(owner(business_id), booking.id)
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::InvalidState(_)));
    assert_eq!(
        store.snapshot().await[0].status,
        BookingStatus::Cancelled.to_string()
    );
}

#[tokio::test]
async fn staff_payment_write_does_not_overwrite_a_concurrent_payment() {
    let business_id = Uuid::new_v4();
    let booking = sample_booking(business_id, at(15, 0), 30, BookingStatus::Pending);
    let store = Arc::new(InMemoryBookingRepository::with_bookings(vec![booking.clone()]));
    let paid = UpdateBookingEntity {
        status: Some(BookingStatus::Confirmed.to_string()),
        payment_status: Some(PaymentStatus::Paid.to_string()),
        ..Default::default()
    };
    let repo = Arc::new(InterleavedWriter::new(Arc::clone(&store), paid, None));
    let use_case = build(
        repo,
        MockCatalogRepository::new(),
        quiet_cache(),
        quiet_notifier(),
    );

    let err = use_case
        .update_booking(
            owner(business_id),
            booking.id,
            UpdateBookingModel {
                payment_status: Some(PaymentStatus::Failed),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::InvalidTransition(_)));
    assert_eq!(
        store.snapshot().await[0].payment_status,
        PaymentStatus::Paid.to_string()
    );
}

#[tokio::test]
async fn booking_that_keeps_changing_is_reported_after_retries() {
    let business_id = Uuid::new_v4();
    let booking = sample_booking(business_id, at(12, 0), 30, BookingStatus::Pending);

    let mut repo = MockBookingRepository::new();
    let found = booking.clone();
    repo.expect_find_by_id()
        .times(MAX_WRITE_ATTEMPTS)
        .returning(move |_, _| Ok(Some(found.clone())));
    repo.expect_update()
        .times(MAX_WRITE_ATTEMPTS)
        .returning(|_, _, _, _| Ok(None));

    let use_case = build(
        Arc::new(repo),
        MockCatalogRepository::new(),
        MockViewCache::new(),
        MockBookingNotifier::new(),
    );

    let err = use_case
        .update_booking(
            owner(business_id),
            booking.id,
            UpdateBookingModel {
                notes: Some(Some("running late".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::InvalidState(_)));
}
