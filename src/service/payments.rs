use std::{
    str::FromStr,
    sync::{Arc, OnceLock},
};

use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use crate::{
    error::{ServiceError, conflict, internal_error, not_found, validation},
    store::RecordStore,
    types::{EvaluationId, NewPayment, Payment, PaymentId, PaymentStatus, User},
};

pub const DEFAULT_CURRENCY: &str = "USD";
const UNLOCK_VERIFY_ATTEMPTS: usize = 3;

fn currency_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("^[A-Z]{3}$").expect("currency pattern is a valid regex"))
}

fn status_list() -> String {
    PaymentStatus::ALL
        .iter()
        .map(|status| status.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub evaluation_id: Option<Value>,
    pub amount: Option<Value>,
    pub currency: Option<String>,
    pub status: Option<String>,
    #[validate(length(max = 255, message = "externalPaymentRef must be at most 255 characters"))]
    pub external_payment_ref: Option<String>,
    #[serde(default, alias = "user_id")]
    pub user_id: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentRequest {
    pub status: Option<String>,
    #[validate(length(max = 255, message = "externalPaymentRef must be at most 255 characters"))]
    pub external_payment_ref: Option<String>,
    #[serde(default, alias = "user_id")]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub evaluation_id: Option<Value>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub currency: Option<Value>,
    #[serde(default)]
    pub created_at: Option<Value>,
}

fn parse_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn parse_amount(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Amount rule: strictly positive, rounded half away from zero to cents.
pub fn normalize_amount(value: &Value) -> Result<Decimal, ServiceError> {
    parse_amount(value)
        .map(|amount| amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .filter(|amount| *amount > Decimal::ZERO)
        .ok_or_else(|| validation("amount must be a positive number greater than 0"))
}

pub fn normalize_currency(raw: Option<&str>) -> Result<String, ServiceError> {
    let currency = raw
        .map(|raw| raw.trim().to_ascii_uppercase())
        .filter(|raw| !raw.is_empty())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    if !currency_pattern().is_match(&currency) {
        return Err(validation(
            "currency must be a valid 3-letter uppercase code (e.g., USD, EUR, GBP)",
        ));
    }
    Ok(currency)
}

fn check_bounds(request: &impl Validate) -> Result<(), ServiceError> {
    request
        .validate()
        .map_err(|errors| validation(errors.to_string()))
}

pub struct PaymentService {
    store: Arc<dyn RecordStore>,
}

impl PaymentService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        user: &User,
        request: CreatePaymentRequest,
    ) -> Result<Payment, ServiceError> {
        if request.user_id.is_some() {
            return Err(validation("User ID cannot be provided in request body"));
        }
        check_bounds(&request)?;
        let evaluation_id: EvaluationId = request
            .evaluation_id
            .as_ref()
            .ok_or_else(|| validation("evaluationId is required"))
            .and_then(|value| {
                parse_id(value).ok_or_else(|| validation("evaluationId must be a valid integer"))
            })?;
        let amount = request
            .amount
            .as_ref()
            .ok_or_else(|| validation("amount is required"))
            .and_then(normalize_amount)?;
        let currency = normalize_currency(request.currency.as_deref())?;
        if let Some(raw) = request.status.as_deref() {
            match PaymentStatus::parse(raw) {
                Some(PaymentStatus::Pending) => {}
                Some(_) => return Err(validation("New payments must start as pending")),
                None => {
                    return Err(validation(format!(
                        "status must be one of: {}",
                        status_list()
                    )));
                }
            }
        }

        self.store
            .get_evaluation(&user.id, evaluation_id)
            .await?
            .ok_or_else(|| not_found("Evaluation not found"))?;

        let payment = self
            .store
            .insert_payment(NewPayment {
                owner_id: user.id.clone(),
                evaluation_id,
                amount,
                currency,
                external_payment_ref: request
                    .external_payment_ref
                    .map(|reference| reference.trim().to_string())
                    .filter(|reference| !reference.is_empty()),
            })
            .await?;
        tracing::info!(
            target: "payments",
            payment_id = payment.id,
            evaluation_id = payment.evaluation_id,
            amount = %payment.amount,
            currency = %payment.currency,
            "payment_created"
        );
        Ok(payment)
    }

    pub async fn get(&self, user: &User, payment_id: PaymentId) -> Result<Payment, ServiceError> {
        self.store
            .get_payment(&user.id, payment_id)
            .await?
            .ok_or_else(|| not_found("Payment not found"))
    }

    pub async fn update(
        &self,
        user: &User,
        payment_id: PaymentId,
        request: UpdatePaymentRequest,
    ) -> Result<Payment, ServiceError> {
        for (present, message) in [
            (request.user_id.is_some(), "User ID cannot be provided in request body"),
            (request.evaluation_id.is_some(), "Evaluation ID cannot be modified"),
            (request.amount.is_some(), "Amount cannot be modified"),
            (request.currency.is_some(), "Currency cannot be modified"),
            (request.created_at.is_some(), "Created date cannot be modified"),
        ] {
            if present {
                return Err(validation(message));
            }
        }
        check_bounds(&request)?;

        let requested_status = match request.status.as_deref() {
            Some(raw) => Some(PaymentStatus::parse(raw).ok_or_else(|| {
                validation(format!("Invalid status. Must be one of: {}", status_list()))
            })?),
            None => None,
        };
        let external_payment_ref = request
            .external_payment_ref
            .map(|reference| reference.trim().to_string())
            .filter(|reference| !reference.is_empty());
        if requested_status.is_none() && external_payment_ref.is_none() {
            return Err(validation("No valid fields to update"));
        }

        let current = self.get(user, payment_id).await?;
        let status = match requested_status {
            Some(next) if next == current.status => None,
            Some(next) if current.status.can_transition_to(next) => Some(next),
            Some(next) => {
                return Err(conflict(format!(
                    "Payment status cannot change from {} to {}",
                    current.status.as_str(),
                    next.as_str()
                )));
            }
            None => None,
        };
        if status.is_none() && external_payment_ref.is_none() {
            return Ok(current);
        }

        let update = self
            .store
            .update_payment(&user.id, payment_id, status, external_payment_ref)
            .await?;
        tracing::info!(
            target: "payments",
            payment_id = payment_id,
            from = current.status.as_str(),
            to = update.payment.status.as_str(),
            "payment_updated"
        );

        if update.unlocked_evaluation.is_some() {
            self.verify_unlock(user, update.payment.evaluation_id).await?;
        }
        Ok(update.payment)
    }

    /// Reads the evaluation back after completion and re-issues the unlock
    /// until it is observed.
    async fn verify_unlock(
        &self,
        user: &User,
        evaluation_id: EvaluationId,
    ) -> Result<(), ServiceError> {
        for attempt in 1..=UNLOCK_VERIFY_ATTEMPTS {
            let unlocked = self
                .store
                .get_evaluation(&user.id, evaluation_id)
                .await?
                .is_some_and(|evaluation| evaluation.is_premium_unlocked);
            if unlocked {
                tracing::info!(
                    target: "payments",
                    evaluation_id = evaluation_id,
                    attempt = attempt,
                    "evaluation_unlock_verified"
                );
                return Ok(());
            }
            tracing::warn!(
                target: "payments",
                evaluation_id = evaluation_id,
                attempt = attempt,
                "evaluation_unlock_missing_retrying"
            );
            if let Err(err) = self
                .store
                .set_premium_unlocked(&user.id, evaluation_id)
                .await
            {
                tracing::warn!(
                    target: "payments",
                    evaluation_id = evaluation_id,
                    attempt = attempt,
                    error = %err,
                    "evaluation_unlock_retry_failed"
                );
            }
        }

        tracing::error!(
            target: "payments",
            evaluation_id = evaluation_id,
            "evaluation_unlock_unverified"
        );
        Err(internal_error(format!(
            "payment completed but unlock of evaluation {evaluation_id} could not be verified"
        )))
    }
}
