//! Cart engine behaviour across anonymous, sign-in merge and authenticated flows.

mod common;

use std::sync::Arc;

use rust_decimal::Decimal;
use storefront_cart::{
    engine::{DEFAULT_MAX_LINE_QUANTITY, SIGN_IN_REQUIRED_MESSAGE},
    fixtures,
    gateway::MockCartGateway,
    prelude::*,
    storage::MockKeyValueStore,
};
use testresult::TestResult;
use tokio::sync::{Notify, watch};

use common::{FakeRemote, engine, new_line, signed_in_engine, storage};

const KEY: &str = "localCart";

fn local_store(storage: &Arc<MemoryStore>) -> LocalCartStore {
    LocalCartStore::new(storage.clone(), KEY)
}

async fn sign_in(engine: &CartEngine) -> Result<MergeReport, Box<dyn std::error::Error>> {
    match engine.handle_session_event(SessionEvent::SignedIn).await? {
        SessionTransition::Merged(report) => Ok(report),
        other => Err(format!("expected a merge, got {other:?}").into()),
    }
}

#[tokio::test]
async fn anonymous_adds_of_one_variant_collapse_into_one_line() -> TestResult {
    let remote = Arc::new(FakeRemote::new());
    let storage = storage();
    let engine = engine(&remote, &storage);

    for quantity in [1, 2, 3] {
        engine
            .add_item(new_line(fixtures::PLAIN_VARIANT, quantity))
            .await?;
    }

    let snapshot = engine.snapshot();

    assert_eq!(snapshot.lines().len(), 1);
    assert_eq!(snapshot.item_count(), 6);
    assert_eq!(engine.subtotal(), Decimal::from(300));
    assert_eq!(local_store(&storage).read(), snapshot.lines());
    assert_eq!(remote.add_calls(), 0);

    Ok(())
}

#[tokio::test]
async fn anonymous_engine_loads_local_cart() {
    let remote = Arc::new(FakeRemote::new());
    let storage = storage();
    let lines = vec![
        fixtures::local_line(fixtures::DISCOUNTED_VARIANT, 2, fixtures::discounted_price()),
        fixtures::local_line(fixtures::PLAIN_VARIANT, 1, fixtures::plain_price()),
    ];

    local_store(&storage).write(&lines);

    let engine = engine(&remote, &storage);

    assert_eq!(engine.mode(), EngineMode::AnonymousLocal);
    assert_eq!(engine.snapshot().lines(), lines.as_slice());
    assert_eq!(engine.subtotal(), Decimal::from(210));
    assert_eq!(engine.product_discount_total(), Decimal::from(40));
}

#[tokio::test]
async fn corrupt_local_storage_starts_empty() {
    let remote = Arc::new(FakeRemote::new());
    let storage = Arc::new(MemoryStore::with_entry(KEY, "[{\"id\":"));

    let engine = engine(&remote, &storage);

    assert!(engine.snapshot().is_empty());
}

#[tokio::test]
async fn storage_failures_never_reach_the_caller() -> TestResult {
    let mut backend = MockKeyValueStore::new();

    backend
        .expect_get()
        .returning(|_| Err(StorageError::Poisoned));
    backend
        .expect_set()
        .returning(|_, _| Err(StorageError::Poisoned));

    let engine = CartEngine::new(
        Arc::new(FakeRemote::new()),
        Arc::new(backend),
        CartSettings::default(),
    );

    engine.add_item(new_line(fixtures::PLAIN_VARIANT, 2)).await?;

    assert_eq!(engine.item_count(), 2);

    Ok(())
}

#[tokio::test]
async fn zero_quantity_update_is_rejected_without_change() -> TestResult {
    let remote = Arc::new(FakeRemote::new());
    let storage = storage();
    let engine = engine(&remote, &storage);

    let line = engine.add_item(new_line(fixtures::PLAIN_VARIANT, 2)).await?;
    let before = engine.snapshot();

    let result = engine.update_quantity(line.id(), 0).await;

    assert!(matches!(
        result,
        Err(EngineError::Cart(CartError::QuantityOutOfRange { requested: 0, .. }))
    ));
    assert_eq!(engine.snapshot().lines(), before.lines());
    assert_eq!(local_store(&storage).read(), before.lines());

    Ok(())
}

#[tokio::test]
async fn zero_quantity_update_never_reaches_the_backend() -> TestResult {
    let remote = Arc::new(FakeRemote::with_lines(fixtures::two_line_cart()));
    let engine = signed_in_engine(&remote, &storage()).await;

    let result = engine.update_quantity(&LineId::Remote(1), 0).await;

    assert!(matches!(result, Err(EngineError::Cart(_))));
    assert_eq!(remote.quantity_of(fixtures::DISCOUNTED_VARIANT), Some(2));
    assert_eq!(engine.item_count(), 3);

    Ok(())
}

#[tokio::test]
async fn quantity_ceiling_applies_to_combined_adds() -> TestResult {
    let remote = Arc::new(FakeRemote::new());
    let engine = engine(&remote, &storage());

    engine.add_item(new_line(fixtures::PLAIN_VARIANT, 8)).await?;

    let result = engine.add_item(new_line(fixtures::PLAIN_VARIANT, 3)).await;

    assert!(matches!(
        result,
        Err(EngineError::Cart(CartError::QuantityOutOfRange {
            requested: 11,
            max: 10
        }))
    ));
    assert_eq!(engine.item_count(), 8);

    Ok(())
}

#[tokio::test]
async fn anonymous_coupons_require_sign_in() {
    let remote = Arc::new(FakeRemote::new());
    let engine = engine(&remote, &storage());

    let missing = engine.apply_coupon("   ").await;
    let anonymous = engine.apply_coupon("SAVE10").await;

    assert!(matches!(missing, Err(EngineError::MissingCouponCode)));
    assert!(
        matches!(&anonymous, Err(error @ EngineError::SignInRequired) if error.user_message() == SIGN_IN_REQUIRED_MESSAGE)
    );
}

#[tokio::test]
async fn clearing_an_anonymous_cart_clears_storage() -> TestResult {
    let remote = Arc::new(FakeRemote::new());
    let storage = storage();
    let engine = engine(&remote, &storage);

    engine.add_item(new_line(fixtures::PLAIN_VARIANT, 1)).await?;
    engine.clear_cart().await?;

    assert!(engine.snapshot().is_empty());
    assert_eq!(storage.get(KEY)?, None);

    Ok(())
}

#[tokio::test]
async fn engine_exposes_its_settings() {
    let engine = engine(&Arc::new(FakeRemote::new()), &storage());

    assert_eq!(engine.settings().max_line_quantity(), DEFAULT_MAX_LINE_QUANTITY);
    assert_eq!(engine.settings().storage_key(), KEY);
}

#[tokio::test]
async fn subscribers_observe_mutations() -> TestResult {
    let remote = Arc::new(FakeRemote::new());
    let engine = engine(&remote, &storage());
    let mut snapshots = engine.subscribe();

    engine.add_item(new_line(fixtures::PLAIN_VARIANT, 1)).await?;

    assert!(snapshots.has_changed()?);
    assert_eq!(snapshots.borrow_and_update().item_count(), 1);

    Ok(())
}

#[tokio::test]
async fn sign_in_merges_local_cart_into_remote() -> TestResult {
    let remote = Arc::new(FakeRemote::new());
    let storage = storage();
    let engine = engine(&remote, &storage);
    let variant = VariantId::new(42);

    engine.add_item(new_line(variant, 3)).await?;

    let report = sign_in(&engine).await?;

    assert!(report.is_complete());
    assert_eq!(report.merged(), &[variant]);
    assert_eq!(storage.get(KEY)?, None);
    assert_eq!(remote.quantity_of(variant), Some(3));
    assert_eq!(engine.mode(), EngineMode::AuthenticatedRemote);

    let snapshot = engine.snapshot();
    let line = snapshot.lines().first().ok_or("merged line missing")?;

    assert!(!line.id().is_local());
    assert_eq!(line.variant_id(), variant);
    assert_eq!(line.quantity(), 3);

    Ok(())
}

#[tokio::test]
async fn merge_completes_when_some_lines_fail() -> TestResult {
    let remote = Arc::new(FakeRemote::new().failing_variant(fixtures::PLAIN_VARIANT));
    let storage = storage();
    let engine = engine(&remote, &storage);

    engine
        .add_item(new_line(fixtures::DISCOUNTED_VARIANT, 2))
        .await?;
    engine.add_item(new_line(fixtures::PLAIN_VARIANT, 1)).await?;

    let report = sign_in(&engine).await?;

    assert_eq!(report.merged(), &[fixtures::DISCOUNTED_VARIANT]);
    assert_eq!(report.failed().len(), 1);
    assert!(
        report
            .failed()
            .iter()
            .all(|failure| failure.variant == fixtures::PLAIN_VARIANT && failure.quantity == 1)
    );
    assert_eq!(engine.mode(), EngineMode::AuthenticatedRemote);
    assert_eq!(storage.get(KEY)?, None);
    assert_eq!(remote.quantity_of(fixtures::PLAIN_VARIANT), None);
    assert_eq!(engine.item_count(), 2);

    Ok(())
}

#[tokio::test]
async fn merged_quantities_add_to_existing_remote_lines() -> TestResult {
    let remote = Arc::new(FakeRemote::with_lines(vec![fixtures::remote_line(
        7,
        fixtures::PLAIN_VARIANT,
        2,
        fixtures::plain_price(),
    )]));
    let engine = engine(&remote, &storage());

    engine.add_item(new_line(fixtures::PLAIN_VARIANT, 3)).await?;
    engine
        .add_item(new_line(fixtures::DISCOUNTED_VARIANT, 1))
        .await?;

    sign_in(&engine).await?;

    assert_eq!(remote.quantity_of(fixtures::PLAIN_VARIANT), Some(5));
    assert_eq!(remote.quantity_of(fixtures::DISCOUNTED_VARIANT), Some(1));
    assert_eq!(engine.item_count(), 6);

    Ok(())
}

#[tokio::test]
async fn sign_in_with_empty_local_cart_fetches_directly() -> TestResult {
    let remote = Arc::new(FakeRemote::with_lines(fixtures::two_line_cart()));
    let engine = engine(&remote, &storage());

    let report = sign_in(&engine).await?;

    assert!(report.is_complete());
    assert!(report.merged().is_empty());
    assert_eq!(remote.add_calls(), 0);
    assert_eq!(engine.subtotal(), Decimal::from(210));

    Ok(())
}

#[tokio::test]
async fn repeated_sign_in_is_ignored() -> TestResult {
    let remote = Arc::new(FakeRemote::new());
    let engine = engine(&remote, &storage());

    engine.add_item(new_line(fixtures::PLAIN_VARIANT, 3)).await?;

    let (first, second) = tokio::join!(
        engine.handle_session_event(SessionEvent::SignedIn),
        engine.handle_session_event(SessionEvent::SignedIn),
    );

    let merges = [first?, second?]
        .iter()
        .filter(|transition| matches!(transition, SessionTransition::Merged(_)))
        .count();

    assert_eq!(merges, 1);
    assert_eq!(remote.add_calls(), 1);
    assert_eq!(remote.quantity_of(fixtures::PLAIN_VARIANT), Some(3));
    assert!(matches!(
        engine.handle_session_event(SessionEvent::SignedIn).await?,
        SessionTransition::Ignored
    ));

    Ok(())
}

#[tokio::test]
async fn failed_fetch_after_merge_still_signs_in() -> TestResult {
    let remote = Arc::new(FakeRemote::new());
    let storage = storage();
    let engine = engine(&remote, &storage);

    engine.add_item(new_line(fixtures::PLAIN_VARIANT, 2)).await?;
    remote.fail_fetches(true);

    let report = sign_in(&engine).await?;

    assert!(report.fetch_error().is_some());
    assert_eq!(engine.mode(), EngineMode::AuthenticatedRemote);
    assert!(engine.snapshot().is_empty());
    assert!(engine.snapshot().last_error().is_some());
    assert_eq!(storage.get(KEY)?, None);

    remote.fail_fetches(false);
    engine.refresh().await?;

    assert_eq!(engine.item_count(), 2);
    assert_eq!(engine.snapshot().last_error(), None);

    Ok(())
}

#[tokio::test]
async fn sign_out_discards_the_remote_cart() -> TestResult {
    let remote = Arc::new(FakeRemote::with_lines(fixtures::two_line_cart()));
    let storage = storage();
    let engine = signed_in_engine(&remote, &storage).await;

    engine.apply_coupon("SAVE10").await?;

    let transition = engine.handle_session_event(SessionEvent::SignedOut).await?;

    assert!(matches!(transition, SessionTransition::SignedOut));
    assert_eq!(engine.mode(), EngineMode::AnonymousLocal);
    assert!(engine.snapshot().is_empty());
    assert_eq!(engine.snapshot().coupon(), None);
    assert_eq!(storage.get(KEY)?, None);
    assert_eq!(remote.lines().len(), 2);
    assert!(matches!(
        engine.handle_session_event(SessionEvent::SignedOut).await?,
        SessionTransition::Ignored
    ));

    Ok(())
}

#[tokio::test]
async fn sign_out_during_merge_supersedes_it() -> TestResult {
    let gate = Arc::new(Notify::new());
    let remote = Arc::new(FakeRemote::new().gated(gate.clone()));
    let storage = storage();
    let engine = engine(&remote, &storage);

    engine.add_item(new_line(fixtures::PLAIN_VARIANT, 1)).await?;

    let (merged, signed_out) = tokio::join!(
        engine.handle_session_event(SessionEvent::SignedIn),
        async {
            tokio::task::yield_now().await;

            let transition = engine.handle_session_event(SessionEvent::SignedOut).await;

            gate.notify_one();

            transition
        }
    );

    assert!(matches!(merged, Err(EngineError::Superseded)));
    assert!(matches!(signed_out?, SessionTransition::SignedOut));
    assert_eq!(engine.mode(), EngineMode::AnonymousLocal);
    assert!(engine.snapshot().is_empty());
    assert_eq!(storage.get(KEY)?, None);

    Ok(())
}

#[tokio::test]
async fn sign_in_after_superseded_merge_does_not_push_lines_again() -> TestResult {
    let gate = Arc::new(Notify::new());
    let remote = Arc::new(FakeRemote::new().gated(gate.clone()));
    let storage = storage();
    let engine = engine(&remote, &storage);

    engine.add_item(new_line(fixtures::PLAIN_VARIANT, 3)).await?;

    let (first, second) = tokio::join!(
        engine.handle_session_event(SessionEvent::SignedIn),
        async {
            tokio::task::yield_now().await;

            engine.handle_session_event(SessionEvent::SignedOut).await?;

            gate.notify_one();

            engine.handle_session_event(SessionEvent::SignedIn).await
        }
    );

    assert!(matches!(first, Err(EngineError::Superseded)));
    assert!(matches!(second?, SessionTransition::Merged(report) if report.merged().is_empty()));
    assert_eq!(remote.add_calls(), 1);
    assert_eq!(remote.quantity_of(fixtures::PLAIN_VARIANT), Some(3));
    assert_eq!(engine.mode(), EngineMode::AuthenticatedRemote);
    assert_eq!(engine.item_count(), 3);
    assert_eq!(storage.get(KEY)?, None);

    Ok(())
}

#[tokio::test]
async fn sign_out_during_remote_update_discards_the_response() -> TestResult {
    let gate = Arc::new(Notify::new());
    let remote = Arc::new(FakeRemote::with_lines(fixtures::two_line_cart()).gated(gate.clone()));
    let engine = signed_in_engine(&remote, &storage()).await;

    let (updated, signed_out) = tokio::join!(
        engine.update_quantity(&LineId::Remote(2), 3),
        async {
            tokio::task::yield_now().await;

            let transition = engine.handle_session_event(SessionEvent::SignedOut).await;

            gate.notify_one();

            transition
        }
    );

    assert!(matches!(updated, Err(EngineError::Superseded)));
    assert!(matches!(signed_out?, SessionTransition::SignedOut));
    assert_eq!(engine.mode(), EngineMode::AnonymousLocal);
    assert!(engine.snapshot().is_empty());

    Ok(())
}

#[tokio::test]
async fn authenticated_totals_with_capped_coupon() -> TestResult {
    let remote = Arc::new(FakeRemote::with_lines(fixtures::two_line_cart()));
    let engine = signed_in_engine(&remote, &storage()).await;

    assert_eq!(engine.subtotal(), Decimal::from(210));
    assert_eq!(engine.product_discount_total(), Decimal::from(40));

    let totals = engine.apply_coupon(" SAVE10 ").await?;

    assert_eq!(totals.coupon_discount(), Decimal::from(15));
    assert_eq!(totals.final_total(), Decimal::from(195));
    assert_eq!(engine.coupon_discount(), Decimal::from(15));
    assert_eq!(engine.final_total(), Decimal::from(195));

    Ok(())
}

#[tokio::test]
async fn rejected_coupon_clears_coupon_state() -> TestResult {
    let mut gateway = MockCartGateway::new();

    gateway
        .expect_fetch_cart()
        .returning(|| Ok(fixtures::two_line_cart()));
    gateway
        .expect_validate_coupon()
        .times(2)
        .returning(|code, subtotal| {
            if code == "SAVE10" {
                Ok(CouponValidation {
                    coupon: fixtures::capped_percentage_coupon(),
                    discount: Some(Decimal::from(15)),
                    final_total: Some(subtotal - Decimal::from(15)),
                })
            } else {
                Err(GatewayError::Rejected("Coupon has expired.".to_string()))
            }
        });

    let engine = CartEngine::start(
        Arc::new(gateway),
        storage(),
        CartSettings::default(),
        SessionState::Authenticated,
    )
    .await;

    engine.apply_coupon("SAVE10").await?;

    let result = engine.apply_coupon("BADCODE").await;

    assert!(matches!(&result, Err(EngineError::CouponRejected(message)) if message == "Coupon has expired."));
    assert_eq!(engine.snapshot().coupon(), None);
    assert_eq!(engine.coupon_discount(), Decimal::ZERO);
    assert_eq!(engine.final_total(), Decimal::from(210));
    assert_eq!(engine.snapshot().last_error(), Some("Coupon has expired."));

    Ok(())
}

#[tokio::test]
async fn unreachable_backend_during_coupon_validation() {
    let mut gateway = MockCartGateway::new();

    gateway
        .expect_fetch_cart()
        .returning(|| Ok(fixtures::two_line_cart()));
    gateway.expect_validate_coupon().returning(|_, _| {
        Err(GatewayError::Unavailable {
            status: 502,
            body: String::new(),
        })
    });

    let engine = CartEngine::start(
        Arc::new(gateway),
        storage(),
        CartSettings::default(),
        SessionState::Authenticated,
    )
    .await;

    let result = engine.apply_coupon("SAVE10").await;

    assert!(matches!(result, Err(EngineError::Gateway(ref error)) if error.kind() == GatewayErrorKind::Network));
    assert_eq!(engine.snapshot().coupon(), None);
}

#[tokio::test]
async fn remote_add_upserts_the_returned_line() -> TestResult {
    let remote = Arc::new(FakeRemote::with_lines(fixtures::two_line_cart()));
    let engine = signed_in_engine(&remote, &storage()).await;

    let line = engine.add_item(new_line(fixtures::PLAIN_VARIANT, 2)).await?;

    assert_eq!(line.id(), &LineId::Remote(2));
    assert_eq!(line.quantity(), 3);
    assert_eq!(engine.snapshot().lines().len(), 2);
    assert_eq!(engine.item_count(), 5);

    Ok(())
}

#[tokio::test]
async fn remote_add_checks_combined_quantity_before_sending() -> TestResult {
    let remote = Arc::new(FakeRemote::with_lines(vec![fixtures::remote_line(
        1,
        fixtures::PLAIN_VARIANT,
        9,
        fixtures::plain_price(),
    )]));
    let engine = signed_in_engine(&remote, &storage()).await;

    let result = engine.add_item(new_line(fixtures::PLAIN_VARIANT, 2)).await;

    assert!(matches!(
        result,
        Err(EngineError::Cart(CartError::QuantityOutOfRange { requested: 11, .. }))
    ));
    assert_eq!(remote.add_calls(), 0);

    Ok(())
}

#[tokio::test]
async fn failed_remote_update_refetches_the_cart() -> TestResult {
    let mut gateway = MockCartGateway::new();

    gateway
        .expect_fetch_cart()
        .times(2)
        .returning(|| Ok(fixtures::two_line_cart()));
    gateway.expect_update_item().times(1).returning(|_, _| {
        Err(GatewayError::Unavailable {
            status: 500,
            body: String::new(),
        })
    });

    let engine = CartEngine::start(
        Arc::new(gateway),
        storage(),
        CartSettings::default(),
        SessionState::Authenticated,
    )
    .await;

    let result = engine.update_quantity(&LineId::Remote(1), 3).await;

    assert!(matches!(result, Err(EngineError::Gateway(_))));
    assert_eq!(engine.snapshot().lines(), fixtures::two_line_cart().as_slice());
    assert!(engine.snapshot().last_error().is_some());

    Ok(())
}

#[tokio::test]
async fn removing_every_line_drops_the_coupon() -> TestResult {
    let remote = Arc::new(FakeRemote::with_lines(fixtures::two_line_cart()));
    let engine = signed_in_engine(&remote, &storage()).await;

    engine.apply_coupon("SAVE10").await?;
    engine.remove_item(&LineId::Remote(1)).await?;

    assert!(engine.snapshot().coupon().is_some());

    engine.remove_item(&LineId::Remote(2)).await?;

    assert_eq!(engine.snapshot().coupon(), None);
    assert_eq!(engine.coupon_discount(), Decimal::ZERO);

    Ok(())
}

#[tokio::test]
async fn coupon_below_minimum_purchase_is_dropped() -> TestResult {
    let mut gateway = MockCartGateway::new();

    gateway
        .expect_fetch_cart()
        .returning(|| Ok(fixtures::two_line_cart()));
    gateway.expect_validate_coupon().returning(|_, _| {
        Ok(CouponValidation {
            coupon: Coupon::fixed_amount("FLAT20", Decimal::from(20))
                .with_min_purchase(Decimal::from(200)),
            discount: Some(Decimal::from(20)),
            final_total: None,
        })
    });
    gateway.expect_remove_item().returning(|_| Ok(()));

    let engine = CartEngine::start(
        Arc::new(gateway),
        storage(),
        CartSettings::default(),
        SessionState::Authenticated,
    )
    .await;

    engine.apply_coupon("FLAT20").await?;

    assert_eq!(engine.final_total(), Decimal::from(190));

    engine.remove_item(&LineId::Remote(2)).await?;

    assert_eq!(engine.snapshot().coupon(), None);
    assert_eq!(engine.final_total(), Decimal::from(160));

    Ok(())
}

#[tokio::test]
async fn remove_coupon_always_succeeds() -> TestResult {
    let remote = Arc::new(FakeRemote::with_lines(fixtures::two_line_cart()));
    let engine = signed_in_engine(&remote, &storage()).await;

    engine.remove_coupon();
    engine.apply_coupon("SAVE10").await?;
    engine.remove_coupon();

    assert_eq!(engine.snapshot().coupon(), None);
    assert_eq!(engine.final_total(), Decimal::from(210));

    Ok(())
}

#[tokio::test]
async fn authenticated_start_survives_a_failed_fetch() {
    let remote = Arc::new(FakeRemote::with_lines(fixtures::two_line_cart()));
    remote.fail_fetches(true);

    let engine = signed_in_engine(&remote, &storage()).await;

    assert_eq!(engine.mode(), EngineMode::AuthenticatedRemote);
    assert!(engine.snapshot().is_empty());
    assert!(engine.snapshot().last_error().is_some());
}

#[tokio::test]
async fn follow_session_turns_signals_into_transitions() -> TestResult {
    let remote = Arc::new(FakeRemote::new());
    let engine = engine(&remote, &storage());

    engine.add_item(new_line(fixtures::PLAIN_VARIANT, 2)).await?;

    let (signal, authenticated) = watch::channel(true);
    drop(signal);

    engine.follow_session(authenticated).await;

    assert_eq!(engine.mode(), EngineMode::AuthenticatedRemote);
    assert_eq!(remote.quantity_of(fixtures::PLAIN_VARIANT), Some(2));

    Ok(())
}
