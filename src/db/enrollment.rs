use super::DBClient;
use crate::models::Enrollment;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Enrollment database operations trait
///
/// Rows are keyed by (user_id, course_id); the primary key guarantees at most
/// one enrollment per pair.
pub trait EnrollmentExt {
    async fn get_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<Enrollment>, sqlx::Error>;

    /// Enrollments filtered by user and/or course, most recent first
    async fn get_enrollments(
        &self,
        user_id: Option<Uuid>,
        course_id: Option<Uuid>,
    ) -> Result<Vec<Enrollment>, sqlx::Error>;

    async fn create_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Enrollment, sqlx::Error>;

    /// Insert unless the pair is already enrolled; None when the row exists
    async fn try_create_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Enrollment>, sqlx::Error>;

    /// Overwrite `expires_at` (None makes the enrollment permanent)
    async fn set_enrollment_expiry(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Enrollment>, sqlx::Error>;

    async fn delete_enrollment(&self, user_id: Uuid, course_id: Uuid) -> Result<bool, sqlx::Error>;

    /// Enrollments whose expiry falls inside [from, until], soonest first
    async fn get_expiring_enrollments(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Enrollment>, sqlx::Error>;

    async fn count_enrollments(
        &self,
        user_id: Option<Uuid>,
        course_id: Option<Uuid>,
    ) -> Result<i64, sqlx::Error>;
}

impl EnrollmentExt for DBClient {
    async fn get_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<Enrollment>, sqlx::Error> {
        sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT user_id, course_id, enrolled_at, expires_at
            FROM enrollments
            WHERE user_id = $1 AND course_id = $2
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_enrollments(
        &self,
        user_id: Option<Uuid>,
        course_id: Option<Uuid>,
    ) -> Result<Vec<Enrollment>, sqlx::Error> {
        sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT user_id, course_id, enrolled_at, expires_at
            FROM enrollments
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::uuid IS NULL OR course_id = $2)
            ORDER BY enrolled_at DESC
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Enrollment, sqlx::Error> {
        sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO enrollments (user_id, course_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING user_id, course_id, enrolled_at, expires_at
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn try_create_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Enrollment>, sqlx::Error> {
        sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO enrollments (user_id, course_id, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, course_id) DO NOTHING
            RETURNING user_id, course_id, enrolled_at, expires_at
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_enrollment_expiry(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Enrollment>, sqlx::Error> {
        sqlx::query_as::<_, Enrollment>(
            r#"
            UPDATE enrollments
            SET expires_at = $3
            WHERE user_id = $1 AND course_id = $2
            RETURNING user_id, course_id, enrolled_at, expires_at
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_enrollment(&self, user_id: Uuid, course_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM enrollments WHERE user_id = $1 AND course_id = $2")
            .bind(user_id)
            .bind(course_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_expiring_enrollments(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Enrollment>, sqlx::Error> {
        sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT user_id, course_id, enrolled_at, expires_at
            FROM enrollments
            WHERE expires_at >= $1 AND expires_at <= $2
            ORDER BY expires_at ASC
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_enrollments(
        &self,
        user_id: Option<Uuid>,
        course_id: Option<Uuid>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM enrollments
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::uuid IS NULL OR course_id = $2)
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
    }
}
