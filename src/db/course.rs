use super::DBClient;
use crate::dtos::{CreateCourseDto, UpdateCourseDto};
use crate::models::Course;
use uuid::Uuid;

const COURSE_COLUMNS: &str = "id, title, description, thumbnail, price, price_installment, \
     is_published, created_at, updated_at";

/// Course database operations trait
pub trait CourseExt {
    async fn get_course(&self, course_id: Uuid) -> Result<Option<Course>, sqlx::Error>;

    /// All courses, newest first. Unpublished ones only when asked for.
    async fn get_courses(&self, include_unpublished: bool) -> Result<Vec<Course>, sqlx::Error>;

    /// Courses the user holds an enrollment row for (expired ones included)
    async fn get_user_courses(&self, user_id: Uuid) -> Result<Vec<Course>, sqlx::Error>;

    async fn create_course(&self, course: &CreateCourseDto) -> Result<Course, sqlx::Error>;

    async fn update_course(
        &self,
        course_id: Uuid,
        course: &UpdateCourseDto,
    ) -> Result<Option<Course>, sqlx::Error>;

    /// Returns false when no row was deleted
    async fn delete_course(&self, course_id: Uuid) -> Result<bool, sqlx::Error>;
}

impl CourseExt for DBClient {
    async fn get_course(&self, course_id: Uuid) -> Result<Option<Course>, sqlx::Error> {
        sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_courses(&self, include_unpublished: bool) -> Result<Vec<Course>, sqlx::Error> {
        sqlx::query_as::<_, Course>(&format!(
            r#"
            SELECT {COURSE_COLUMNS} FROM courses
            WHERE $1 OR is_published
            ORDER BY created_at DESC
            "#
        ))
        .bind(include_unpublished)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_user_courses(&self, user_id: Uuid) -> Result<Vec<Course>, sqlx::Error> {
        sqlx::query_as::<_, Course>(
            r#"
            SELECT c.id, c.title, c.description, c.thumbnail, c.price, c.price_installment,
                   c.is_published, c.created_at, c.updated_at
            FROM courses c
            INNER JOIN enrollments e ON e.course_id = c.id
            WHERE e.user_id = $1
            ORDER BY e.enrolled_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_course(&self, course: &CreateCourseDto) -> Result<Course, sqlx::Error> {
        sqlx::query_as::<_, Course>(&format!(
            r#"
            INSERT INTO courses (title, description, thumbnail, price, price_installment, is_published)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COURSE_COLUMNS}
            "#
        ))
        .bind(&course.title)
        .bind(course.description.as_deref())
        .bind(course.thumbnail.as_deref())
        .bind(course.price)
        .bind(course.price_installment)
        .bind(course.is_published.unwrap_or(false))
        .fetch_one(&self.pool)
        .await
    }

    async fn update_course(
        &self,
        course_id: Uuid,
        course: &UpdateCourseDto,
    ) -> Result<Option<Course>, sqlx::Error> {
        sqlx::query_as::<_, Course>(&format!(
            r#"
            UPDATE courses
            SET title = COALESCE($1, title),
                description = COALESCE($2, description),
                thumbnail = COALESCE($3, thumbnail),
                price = COALESCE($4, price),
                price_installment = COALESCE($5, price_installment),
                is_published = COALESCE($6, is_published),
                updated_at = NOW()
            WHERE id = $7
            RETURNING {COURSE_COLUMNS}
            "#
        ))
        .bind(course.title.as_deref())
        .bind(course.description.as_deref())
        .bind(course.thumbnail.as_deref())
        .bind(course.price)
        .bind(course.price_installment)
        .bind(course.is_published)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_course(&self, course_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(course_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
