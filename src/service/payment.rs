use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::enrollment::grant_access;
use super::{ServiceError, ServiceResult};
use crate::db::{CourseExt, EnrollmentExt, PaymentExt};
use crate::dtos::PaymentStatsDto;
use crate::models::{Payment, PaymentStatus};

/// Map a provider callback status onto a payment status
///
/// Anything the provider may send besides the known success and failure words
/// leaves the payment pending.
pub fn map_provider_status(status: &str) -> PaymentStatus {
    match status {
        "success" | "completed" => PaymentStatus::Completed,
        "failed" | "error" => PaymentStatus::Failed,
        _ => PaymentStatus::Pending,
    }
}

/// Allowed status moves
///
/// PENDING settles into COMPLETED or FAILED, any payment can be REFUNDED, and
/// re-applying the current status is accepted as a no-op.
pub fn can_transition(from: PaymentStatus, to: PaymentStatus) -> bool {
    use crate::models::PaymentStatus::*;

    from == to
        || to == Refunded
        || matches!((from, to), (Pending, Completed) | (Pending, Failed))
}

/// Checkout page the learner is redirected to
pub fn checkout_path(payment_id: Uuid) -> String {
    format!("/payment/{}/checkout", payment_id)
}

/// Open a PENDING payment for the course at its current price
pub async fn create_payment<S: CourseExt + PaymentExt>(
    store: &S,
    user_id: Uuid,
    course_id: Uuid,
    payment_system: &str,
    currency: &str,
) -> ServiceResult<(Payment, String)> {
    let course = store
        .get_course(course_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Course not found".to_string()))?;

    let payment = store
        .create_payment(user_id, course.id, course.price, currency, payment_system)
        .await?;

    tracing::info!(
        payment_id = %payment.id,
        %user_id,
        %course_id,
        amount = payment.amount,
        "Payment created"
    );

    let url = checkout_path(payment.id);
    Ok((payment, url))
}

/// Move a payment to `status`, granting lifetime access when it completes
///
/// Access is granted only on the move into COMPLETED, so replaying a completed
/// callback does not touch the enrollment again. A refund leaves the
/// enrollment in place.
pub async fn update_payment_status<S: PaymentExt + EnrollmentExt>(
    store: &S,
    payment_id: Uuid,
    status: PaymentStatus,
    transaction_id: Option<&str>,
    now: DateTime<Utc>,
) -> ServiceResult<Payment> {
    let current = store
        .get_payment(payment_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Payment not found".to_string()))?;

    if !can_transition(current.status, status) {
        return Err(ServiceError::Validation(format!(
            "Cannot change payment status from {} to {}",
            current.status.to_str(),
            status.to_str()
        )));
    }

    let payment = match store
        .update_payment_status(payment_id, current.status, status, transaction_id)
        .await?
    {
        Some(payment) => payment,
        None => return Err(status_changed(store, payment_id).await),
    };

    tracing::info!(
        %payment_id,
        from = current.status.to_str(),
        to = status.to_str(),
        "Payment status updated"
    );

    if status == PaymentStatus::Completed && current.status != PaymentStatus::Completed {
        grant_access(store, payment.user_id, payment.course_id, None, now).await?;
    }

    Ok(payment)
}

/// Error for a conditional update that matched no row
async fn status_changed<S: PaymentExt>(store: &S, payment_id: Uuid) -> ServiceError {
    match store.get_payment(payment_id).await {
        Ok(Some(_)) => {
            ServiceError::Conflict("Payment status changed by another request".to_string())
        }
        Ok(None) => ServiceError::NotFound("Payment not found".to_string()),
        Err(e) => ServiceError::Database(e),
    }
}

/// Apply a provider callback
pub async fn process_webhook<S: PaymentExt + EnrollmentExt>(
    store: &S,
    payment_id: Uuid,
    provider_status: &str,
    transaction_id: Option<&str>,
    now: DateTime<Utc>,
) -> ServiceResult<Payment> {
    let status = map_provider_status(provider_status);
    if status == PaymentStatus::Pending {
        tracing::warn!(%payment_id, provider_status, "Unrecognised provider status, keeping payment pending");
    }
    update_payment_status(store, payment_id, status, transaction_id, now).await
}

pub async fn payment_stats<S: PaymentExt>(store: &S, recent: i64) -> ServiceResult<PaymentStatsDto> {
    Ok(PaymentStatsDto {
        counts: store.get_payment_counts().await?,
        recent_payments: store.get_payments(None, Some(recent)).await?,
    })
}
