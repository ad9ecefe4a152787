use super::DBClient;
use crate::models::LessonProgress;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Lesson progress database operations trait
///
/// Writes are upserts on the (user_id, lesson_id) primary key, so concurrent
/// requests for the same pair never produce duplicate rows.
pub trait ProgressExt {
    async fn get_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<Option<LessonProgress>, sqlx::Error>;

    /// The user's progress rows for every lesson of a course
    async fn get_course_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Vec<LessonProgress>, sqlx::Error>;

    /// Upsert with completed = true
    async fn mark_lesson_complete(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<LessonProgress, sqlx::Error>;

    /// Upsert `last_watched_at` only; new rows start as not completed
    async fn touch_lesson_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<LessonProgress, sqlx::Error>;

    async fn get_recent_progress(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<LessonProgress>, sqlx::Error>;

    async fn count_completed_lessons(&self, user_id: Uuid) -> Result<i64, sqlx::Error>;

    async fn count_lesson_progress(
        &self,
        lesson_id: Uuid,
        completed_only: bool,
    ) -> Result<i64, sqlx::Error>;

    /// Completed rows across the published lessons of a course, all users
    async fn count_completed_course_progress(&self, course_id: Uuid) -> Result<i64, sqlx::Error>;
}

impl ProgressExt for DBClient {
    async fn get_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<Option<LessonProgress>, sqlx::Error> {
        sqlx::query_as::<_, LessonProgress>(
            r#"
            SELECT user_id, lesson_id, completed, last_watched_at
            FROM lesson_progress
            WHERE user_id = $1 AND lesson_id = $2
            "#,
        )
        .bind(user_id)
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_course_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Vec<LessonProgress>, sqlx::Error> {
        sqlx::query_as::<_, LessonProgress>(
            r#"
            SELECT p.user_id, p.lesson_id, p.completed, p.last_watched_at
            FROM lesson_progress p
            INNER JOIN lessons l ON l.id = p.lesson_id
            WHERE p.user_id = $1 AND l.course_id = $2
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn mark_lesson_complete(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<LessonProgress, sqlx::Error> {
        sqlx::query_as::<_, LessonProgress>(
            r#"
            INSERT INTO lesson_progress (user_id, lesson_id, completed, last_watched_at)
            VALUES ($1, $2, TRUE, $3)
            ON CONFLICT (user_id, lesson_id)
            DO UPDATE SET completed = TRUE, last_watched_at = EXCLUDED.last_watched_at
            RETURNING user_id, lesson_id, completed, last_watched_at
            "#,
        )
        .bind(user_id)
        .bind(lesson_id)
        .bind(at)
        .fetch_one(&self.pool)
        .await
    }

    async fn touch_lesson_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<LessonProgress, sqlx::Error> {
        sqlx::query_as::<_, LessonProgress>(
            r#"
            INSERT INTO lesson_progress (user_id, lesson_id, completed, last_watched_at)
            VALUES ($1, $2, FALSE, $3)
            ON CONFLICT (user_id, lesson_id)
            DO UPDATE SET last_watched_at = EXCLUDED.last_watched_at
            RETURNING user_id, lesson_id, completed, last_watched_at
            "#,
        )
        .bind(user_id)
        .bind(lesson_id)
        .bind(at)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_recent_progress(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<LessonProgress>, sqlx::Error> {
        sqlx::query_as::<_, LessonProgress>(
            r#"
            SELECT user_id, lesson_id, completed, last_watched_at
            FROM lesson_progress
            WHERE user_id = $1
            ORDER BY last_watched_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_completed_lessons(&self, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM lesson_progress WHERE user_id = $1 AND completed",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn count_lesson_progress(
        &self,
        lesson_id: Uuid,
        completed_only: bool,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM lesson_progress WHERE lesson_id = $1 AND (NOT $2 OR completed)",
        )
        .bind(lesson_id)
        .bind(completed_only)
        .fetch_one(&self.pool)
        .await
    }

    async fn count_completed_course_progress(&self, course_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM lesson_progress p
            INNER JOIN lessons l ON l.id = p.lesson_id
            WHERE l.course_id = $1 AND l.is_published AND p.completed
            "#,
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
    }
}
