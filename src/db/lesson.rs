use super::DBClient;
use crate::dtos::{CreateLessonDto, LessonOrderDto, UpdateLessonDto};
use crate::models::Lesson;
use uuid::Uuid;

const LESSON_COLUMNS: &str = r#"id, course_id, title, description, type, "order", is_published, content, video_url, duration, created_at, updated_at"#;

/// Lesson database operations trait
pub trait LessonExt {
    async fn get_lesson(&self, lesson_id: Uuid) -> Result<Option<Lesson>, sqlx::Error>;

    /// Lessons of a course ordered by `order` ascending
    async fn get_lessons_by_course(
        &self,
        course_id: Uuid,
        published_only: bool,
    ) -> Result<Vec<Lesson>, sqlx::Error>;

    async fn create_lesson(&self, lesson: &CreateLessonDto) -> Result<Lesson, sqlx::Error>;

    async fn update_lesson(
        &self,
        lesson_id: Uuid,
        lesson: &UpdateLessonDto,
    ) -> Result<Option<Lesson>, sqlx::Error>;

    async fn delete_lesson(&self, lesson_id: Uuid) -> Result<bool, sqlx::Error>;

    /// Apply every new order in one transaction
    ///
    /// Each id must belong to `course_id`. If any update touches no row the whole
    /// batch is rolled back and RowNotFound is returned.
    async fn reorder_lessons(
        &self,
        course_id: Uuid,
        orders: &[LessonOrderDto],
    ) -> Result<Vec<Lesson>, sqlx::Error>;
}

impl LessonExt for DBClient {
    async fn get_lesson(&self, lesson_id: Uuid) -> Result<Option<Lesson>, sqlx::Error> {
        sqlx::query_as::<_, Lesson>(&format!(
            "SELECT {LESSON_COLUMNS} FROM lessons WHERE id = $1"
        ))
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_lessons_by_course(
        &self,
        course_id: Uuid,
        published_only: bool,
    ) -> Result<Vec<Lesson>, sqlx::Error> {
        sqlx::query_as::<_, Lesson>(&format!(
            r#"
            SELECT {LESSON_COLUMNS} FROM lessons
            WHERE course_id = $1 AND (NOT $2 OR is_published)
            ORDER BY "order" ASC
            "#
        ))
        .bind(course_id)
        .bind(published_only)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_lesson(&self, lesson: &CreateLessonDto) -> Result<Lesson, sqlx::Error> {
        sqlx::query_as::<_, Lesson>(&format!(
            r#"
            INSERT INTO lessons (course_id, title, description, type, "order", is_published, content, video_url, duration)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {LESSON_COLUMNS}
            "#
        ))
        .bind(lesson.course_id)
        .bind(&lesson.title)
        .bind(lesson.description.as_deref())
        .bind(lesson.lesson_type)
        .bind(lesson.order)
        .bind(lesson.is_published.unwrap_or(false))
        .bind(lesson.content.as_deref())
        .bind(lesson.video_url.as_deref())
        .bind(lesson.duration)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_lesson(
        &self,
        lesson_id: Uuid,
        lesson: &UpdateLessonDto,
    ) -> Result<Option<Lesson>, sqlx::Error> {
        sqlx::query_as::<_, Lesson>(&format!(
            r#"
            UPDATE lessons
            SET title = COALESCE($1, title),
                description = COALESCE($2, description),
                type = COALESCE($3, type),
                "order" = COALESCE($4, "order"),
                is_published = COALESCE($5, is_published),
                content = COALESCE($6, content),
                video_url = COALESCE($7, video_url),
                duration = COALESCE($8, duration),
                updated_at = NOW()
            WHERE id = $9
            RETURNING {LESSON_COLUMNS}
            "#
        ))
        .bind(lesson.title.as_deref())
        .bind(lesson.description.as_deref())
        .bind(lesson.lesson_type)
        .bind(lesson.order)
        .bind(lesson.is_published)
        .bind(lesson.content.as_deref())
        .bind(lesson.video_url.as_deref())
        .bind(lesson.duration)
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_lesson(&self, lesson_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM lessons WHERE id = $1")
            .bind(lesson_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reorder_lessons(
        &self,
        course_id: Uuid,
        orders: &[LessonOrderDto],
    ) -> Result<Vec<Lesson>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        for entry in orders {
            let result = sqlx::query(
                r#"UPDATE lessons SET "order" = $1, updated_at = NOW() WHERE id = $2 AND course_id = $3"#,
            )
            .bind(entry.order)
            .bind(entry.id)
            .bind(course_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                // dropping tx without commit rolls back the earlier updates
                return Err(sqlx::Error::RowNotFound);
            }
        }

        tx.commit().await?;

        self.get_lessons_by_course(course_id, false).await
    }
}
