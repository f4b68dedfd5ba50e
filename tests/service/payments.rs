use std::sync::atomic::Ordering;

use rust_decimal::Decimal;
use serde_json::{Value, json};

use codecritic::{
    error::{ServiceError, ServiceErrorKind},
    service::payments::{CreatePaymentRequest, UpdatePaymentRequest},
    store::RecordStore,
    types::{Payment, PaymentStatus, User},
};

use crate::support::Harness;

fn create_request(body: Value) -> CreatePaymentRequest {
    serde_json::from_value(body).expect("create request")
}

fn update_request(body: Value) -> UpdatePaymentRequest {
    serde_json::from_value(body).expect("update request")
}

async fn pending_payment(harness: &Harness, user: &User) -> Payment {
    let (_, view) = harness.evaluated_task(user).await;
    harness
        .services
        .payments
        .create(
            user,
            create_request(json!({
                "evaluationId": view.id(),
                "amount": "4.995",
                "currency": "eur"
            })),
        )
        .await
        .expect("payment")
}

#[tokio::test]
async fn given_valid_request_when_created_then_payment_is_pending_and_normalized() {
    let harness = Harness::offline();
    let user = harness.user("alice").await;
    let payment = pending_payment(&harness, &user).await;

    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, Decimal::new(500, 2));
    assert_eq!(payment.currency, "EUR");

    let json = serde_json::to_value(&payment).expect("serialize");
    assert_eq!(json["amount"], json!(5.0));
    assert_eq!(json["userId"], "alice");
}

#[tokio::test]
async fn given_invalid_create_bodies_then_validation_errors() {
    let harness = Harness::offline();
    let user = harness.user("alice").await;
    let (_, view) = harness.evaluated_task(&user).await;

    for body in [
        json!({ "amount": 5 }),
        json!({ "evaluationId": view.id() }),
        json!({ "evaluationId": view.id(), "amount": 0 }),
        json!({ "evaluationId": view.id(), "amount": 5, "currency": "EURO" }),
        json!({ "evaluationId": view.id(), "amount": 5, "status": "completed" }),
        json!({ "evaluationId": view.id(), "amount": 5, "userId": "mallory" }),
        json!({ "evaluationId": "abc", "amount": 5 }),
    ] {
        let err = harness
            .services
            .payments
            .create(&user, create_request(body.clone()))
            .await
            .expect_err("must be rejected");
        assert_eq!(err.kind, ServiceErrorKind::Validation, "body {body}");
    }
}

#[tokio::test]
async fn given_foreign_evaluation_when_paying_then_not_found() {
    let harness = Harness::offline();
    let alice = harness.user("alice").await;
    let bob = harness.user("bob").await;
    let (_, view) = harness.evaluated_task(&alice).await;

    let err = harness
        .services
        .payments
        .create(&bob, create_request(json!({ "evaluationId": view.id(), "amount": 5 })))
        .await
        .expect_err("foreign evaluation");
    assert_eq!(err.kind, ServiceErrorKind::NotFound);
}

#[tokio::test]
async fn given_pending_payment_when_completed_then_evaluation_is_unlocked() {
    let harness = Harness::offline();
    let user = harness.user("alice").await;
    let payment = pending_payment(&harness, &user).await;

    let completed = harness
        .services
        .payments
        .update(&user, payment.id, update_request(json!({ "status": "Completed" })))
        .await
        .expect("complete");
    assert_eq!(completed.status, PaymentStatus::Completed);

    let evaluation = harness
        .store
        .get_evaluation(&user.id, payment.evaluation_id)
        .await
        .expect("read")
        .expect("evaluation");
    assert!(evaluation.is_premium_unlocked);
}

#[tokio::test]
async fn given_stale_read_after_completion_then_unlock_is_reissued_and_verified() {
    let harness = Harness::offline();
    let user = harness.user("alice").await;
    let payment = pending_payment(&harness, &user).await;

    // The first verification read is stale; the second sees the unlock.
    harness.store.stale_unlock_reads.store(1, Ordering::SeqCst);
    let unlock_calls_before = harness.store.unlock_calls.load(Ordering::SeqCst);
    harness
        .services
        .payments
        .update(&user, payment.id, update_request(json!({ "status": "completed" })))
        .await
        .expect("complete");
    assert_eq!(
        harness.store.unlock_calls.load(Ordering::SeqCst),
        unlock_calls_before + 1
    );
}

#[tokio::test]
async fn given_unlock_never_observed_when_completed_then_internal_error() {
    let harness = Harness::offline();
    let user = harness.user("alice").await;
    let payment = pending_payment(&harness, &user).await;

    harness.store.stale_unlock_reads.store(10, Ordering::SeqCst);
    harness.store.fail_unlock.store(true, Ordering::SeqCst);
    let err = harness
        .services
        .payments
        .update(&user, payment.id, update_request(json!({ "status": "completed" })))
        .await
        .expect_err("unverified unlock");
    assert_eq!(err.kind, ServiceErrorKind::Internal);
}

#[tokio::test]
async fn given_payment_lifecycle_then_only_legal_transitions_apply() {
    let harness = Harness::offline();
    let user = harness.user("alice").await;
    let payment = pending_payment(&harness, &user).await;
    let payments = &harness.services.payments;

    payments
        .update(&user, payment.id, update_request(json!({ "status": "completed" })))
        .await
        .expect("complete");
    let same = payments
        .update(&user, payment.id, update_request(json!({ "status": "completed" })))
        .await
        .expect("same status is a no-op");
    assert_eq!(same.status, PaymentStatus::Completed);

    let refunded = payments
        .update(&user, payment.id, update_request(json!({ "status": "refunded" })))
        .await
        .expect("refund");
    assert_eq!(refunded.status, PaymentStatus::Refunded);

    let err = payments
        .update(&user, payment.id, update_request(json!({ "status": "completed" })))
        .await
        .expect_err("refunded cannot complete");
    assert_eq!(err.kind, ServiceErrorKind::Conflict);

    let evaluation = harness
        .store
        .get_evaluation(&user.id, payment.evaluation_id)
        .await
        .expect("read")
        .expect("evaluation");
    assert!(evaluation.is_premium_unlocked, "refund keeps the unlock");
}

#[tokio::test]
async fn given_immutable_fields_when_updating_then_validation_errors() {
    let harness = Harness::offline();
    let user = harness.user("alice").await;
    let payment = pending_payment(&harness, &user).await;

    for body in [
        json!({ "amount": 10 }),
        json!({ "currency": "USD" }),
        json!({ "evaluationId": 1 }),
        json!({ "createdAt": "2026-01-01T00:00:00Z" }),
        json!({ "userId": "bob" }),
        json!({ "status": "paid" }),
        json!({}),
    ] {
        let err = harness
            .services
            .payments
            .update(&user, payment.id, update_request(body.clone()))
            .await
            .expect_err("must be rejected");
        assert_eq!(err.kind, ServiceErrorKind::Validation, "body {body}");
    }

    let with_ref = harness
        .services
        .payments
        .update(&user, payment.id, update_request(json!({ "externalPaymentRef": " pi_123 " })))
        .await
        .expect("reference update");
    assert_eq!(with_ref.external_payment_ref.as_deref(), Some("pi_123"));
    assert_eq!(with_ref.status, PaymentStatus::Pending);
}

async fn race_updates(
    harness: &Harness,
    user: &User,
    payment: &Payment,
    first: &str,
    second: &str,
) -> (Result<Payment, ServiceError>, Result<Payment, ServiceError>) {
    // Both updates read the stored status before either writes.
    harness.store.payment_lookup_gate.arm();
    let payments = &harness.services.payments;
    tokio::join!(
        payments.update(user, payment.id, update_request(json!({ "status": first }))),
        payments.update(user, payment.id, update_request(json!({ "status": second }))),
    )
}

async fn unlocked(harness: &Harness, user: &User, payment: &Payment) -> bool {
    harness
        .store
        .get_evaluation(&user.id, payment.evaluation_id)
        .await
        .expect("read")
        .expect("evaluation")
        .is_premium_unlocked
}

#[tokio::test]
async fn given_concurrent_complete_and_fail_then_exactly_one_transition_applies() {
    let harness = Harness::offline();
    let user = harness.user("alice").await;
    let payment = pending_payment(&harness, &user).await;

    let (completed, failed) = race_updates(&harness, &user, &payment, "completed", "failed").await;

    assert_ne!(completed.is_ok(), failed.is_ok(), "exactly one update wins");
    let loser = completed.as_ref().err().or(failed.as_ref().err()).expect("one loser");
    assert_eq!(loser.kind, ServiceErrorKind::Conflict);

    let stored = harness.services.payments.get(&user, payment.id).await.expect("payment");
    let expected = if completed.is_ok() {
        PaymentStatus::Completed
    } else {
        PaymentStatus::Failed
    };
    assert_eq!(stored.status, expected);
    assert_eq!(unlocked(&harness, &user, &payment).await, completed.is_ok());
}

#[tokio::test]
async fn given_concurrent_refund_and_complete_then_refunded_payment_never_completes() {
    let harness = Harness::offline();
    let user = harness.user("alice").await;
    let payment = pending_payment(&harness, &user).await;

    let (refunded, completed) =
        race_updates(&harness, &user, &payment, "refunded", "completed").await;

    // completed -> refunded is legal, refunded -> completed is not.
    refunded.expect("refund applies in either order");
    if let Err(err) = &completed {
        assert_eq!(err.kind, ServiceErrorKind::Conflict);
    }
    let stored = harness.services.payments.get(&user, payment.id).await.expect("payment");
    assert_eq!(stored.status, PaymentStatus::Refunded);
    assert_eq!(unlocked(&harness, &user, &payment).await, completed.is_ok());
}
