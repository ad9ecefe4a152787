use super::DBClient;
use crate::dtos::PaymentCountsDto;
use crate::models::{Payment, PaymentStatus};
use uuid::Uuid;

const PAYMENT_COLUMNS: &str = "id, user_id, course_id, amount, currency, status, payment_system, \
     transaction_id, created_at, updated_at";

/// Payment database operations trait
pub trait PaymentExt {
    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, sqlx::Error>;

    /// Payments newest first, optionally for one user, optionally capped
    async fn get_payments(
        &self,
        user_id: Option<Uuid>,
        limit: Option<i64>,
    ) -> Result<Vec<Payment>, sqlx::Error>;

    /// Insert a new payment in the PENDING state
    async fn create_payment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        amount: f64,
        currency: &str,
        payment_system: &str,
    ) -> Result<Payment, sqlx::Error>;

    /// Store a new status if the payment is still in `expected`
    ///
    /// Returns None when the payment is missing or its status changed since it
    /// was read. `transaction_id = None` keeps the stored one.
    async fn update_payment_status(
        &self,
        payment_id: Uuid,
        expected: PaymentStatus,
        status: PaymentStatus,
        transaction_id: Option<&str>,
    ) -> Result<Option<Payment>, sqlx::Error>;

    async fn get_payment_counts(&self) -> Result<PaymentCountsDto, sqlx::Error>;
}

impl PaymentExt for DBClient {
    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_payments(
        &self,
        user_id: Option<Uuid>,
        limit: Option<i64>,
    ) -> Result<Vec<Payment>, sqlx::Error> {
        // LIMIT NULL means no limit in PostgreSQL
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS} FROM payments
            WHERE ($1::uuid IS NULL OR user_id = $1)
            ORDER BY created_at DESC
            LIMIT $2
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_payment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        amount: f64,
        currency: &str,
        payment_system: &str,
    ) -> Result<Payment, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments (user_id, course_id, amount, currency, status, payment_system)
            VALUES ($1, $2, $3, $4, 'PENDING', $5)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(course_id)
        .bind(amount)
        .bind(currency)
        .bind(payment_system)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_payment_status(
        &self,
        payment_id: Uuid,
        expected: PaymentStatus,
        status: PaymentStatus,
        transaction_id: Option<&str>,
    ) -> Result<Option<Payment>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments
            SET status = $1,
                transaction_id = COALESCE($2, transaction_id),
                updated_at = NOW()
            WHERE id = $3 AND status = $4
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(status)
        .bind(transaction_id)
        .bind(payment_id)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_payment_counts(&self) -> Result<PaymentCountsDto, sqlx::Error> {
        let (total, completed, pending, failed, revenue) =
            sqlx::query_as::<_, (i64, i64, i64, i64, Option<f64>)>(
                r#"
                SELECT COUNT(*),
                       COUNT(*) FILTER (WHERE status = 'COMPLETED'),
                       COUNT(*) FILTER (WHERE status = 'PENDING'),
                       COUNT(*) FILTER (WHERE status = 'FAILED'),
                       SUM(amount) FILTER (WHERE status = 'COMPLETED')
                FROM payments
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(PaymentCountsDto {
            total_payments: total,
            completed_payments: completed,
            pending_payments: pending,
            failed_payments: failed,
            total_revenue: revenue.unwrap_or(0.0),
        })
    }
}
